//! Main Bridge task implementation

use tokio::sync::mpsc;
use tracing::{debug, info};

use super::handle::BridgeHandle;
use super::messages::BridgeRequest;
use crate::config::BridgeConfig;
use crate::controller::{EditOrigin, SyncController};
use crate::surface::Surface;

/// The Bridge serializes every panel and module event onto one task
pub struct Bridge<S: Surface> {
    controller: SyncController<S>,
    tx: mpsc::Sender<BridgeRequest>,
    rx: mpsc::Receiver<BridgeRequest>,
}

impl<S: Surface> Bridge<S> {
    /// Create a new Bridge around a controller
    pub fn new(config: &BridgeConfig, controller: SyncController<S>) -> Self {
        let (tx, rx) = mpsc::channel(config.channel_buffer);
        Self { controller, tx, rx }
    }

    /// Get a handle for sending events to this Bridge
    pub fn handle(&self) -> BridgeHandle {
        BridgeHandle::new(self.tx.clone())
    }

    /// Run the Bridge task
    ///
    /// Consumes the Bridge and runs until shutdown is requested, then hands
    /// the controller back so callers can inspect the final state.
    pub async fn run(mut self) -> SyncController<S> {
        info!("Bridge started");
        let mut handled: u64 = 0;

        while let Some(req) = self.rx.recv().await {
            handled += 1;
            debug!(kind = req.kind(), handled, "Bridge: handling request");

            match req {
                BridgeRequest::DocumentReady => self.controller.on_document_ready(),

                BridgeRequest::ModuleLoaded { port } => self.controller.on_module_load(port),

                BridgeRequest::InputChanged { param, raw } => {
                    self.controller.on_input_change(param, &raw, EditOrigin::User)
                }

                BridgeRequest::StartClicked => self.controller.on_start(),

                BridgeRequest::StopClicked => self.controller.on_stop(),

                BridgeRequest::ModuleLine { line } => self.controller.on_module_line(&line),

                BridgeRequest::GetSnapshot { reply_tx } => {
                    let _ = reply_tx.send(self.controller.snapshot());
                }

                BridgeRequest::Shutdown => {
                    info!(handled, "Bridge shutting down");
                    break;
                }
            }
        }

        self.controller
    }
}
