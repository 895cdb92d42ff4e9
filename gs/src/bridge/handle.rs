//! BridgeHandle - Client interface for panel and module events

use eyre::{Result, eyre};
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use super::messages::BridgeRequest;
use crate::controller::ControllerSnapshot;
use crate::link::ModulePort;
use crate::marshal::Parameter;

/// Handle for feeding events into the Bridge
///
/// Cloneable; panel frontends and module transports each hold one.
#[derive(Clone, Debug)]
pub struct BridgeHandle {
    tx: mpsc::Sender<BridgeRequest>,
}

impl BridgeHandle {
    pub(crate) fn new(tx: mpsc::Sender<BridgeRequest>) -> Self {
        Self { tx }
    }

    async fn send(&self, req: BridgeRequest) -> Result<()> {
        debug!(kind = req.kind(), "BridgeHandle::send: called");
        self.tx.send(req).await.map_err(|_| eyre!("Bridge channel closed"))
    }

    /// Signal that panel wiring is complete
    pub async fn document_ready(&self) -> Result<()> {
        self.send(BridgeRequest::DocumentReady).await
    }

    /// Signal that the module finished loading
    pub async fn module_loaded(&self, port: Box<dyn ModulePort>) -> Result<()> {
        self.send(BridgeRequest::ModuleLoaded { port }).await
    }

    /// Report a user edit of a control
    pub async fn input_changed(&self, param: Parameter, raw: &str) -> Result<()> {
        self.send(BridgeRequest::InputChanged {
            param,
            raw: raw.to_string(),
        })
        .await
    }

    pub async fn start(&self) -> Result<()> {
        self.send(BridgeRequest::StartClicked).await
    }

    pub async fn stop(&self) -> Result<()> {
        self.send(BridgeRequest::StopClicked).await
    }

    /// Deliver a raw line received from the module
    pub async fn deliver(&self, line: String) -> Result<()> {
        self.send(BridgeRequest::ModuleLine { line }).await
    }

    /// Get a snapshot of the controller state
    pub async fn snapshot(&self) -> Result<ControllerSnapshot> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(BridgeRequest::GetSnapshot { reply_tx }).await?;

        debug!("BridgeHandle::snapshot: waiting for reply");
        reply_rx.await.map_err(|_| eyre!("Bridge shutdown before reply"))
    }

    /// Ask the Bridge to stop
    pub async fn shutdown(&self) -> Result<()> {
        self.send(BridgeRequest::Shutdown).await
    }
}
