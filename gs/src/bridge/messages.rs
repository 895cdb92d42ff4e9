//! Message types for the Bridge

use tokio::sync::oneshot;

use crate::controller::ControllerSnapshot;
use crate::link::ModulePort;
use crate::marshal::Parameter;

/// Requests processed by the Bridge task
#[derive(Debug)]
pub enum BridgeRequest {
    /// Panel wiring finished
    DocumentReady,

    /// The module finished loading
    ModuleLoaded { port: Box<dyn ModulePort> },

    /// A person changed a control
    InputChanged { param: Parameter, raw: String },

    /// Start trigger clicked
    StartClicked,

    /// Stop trigger clicked
    StopClicked,

    /// A raw line arrived from the module
    ModuleLine { line: String },

    /// Get a snapshot of the controller
    GetSnapshot {
        reply_tx: oneshot::Sender<ControllerSnapshot>,
    },

    /// Shutdown the bridge
    Shutdown,
}

impl BridgeRequest {
    /// Short name for logging
    pub fn kind(&self) -> &'static str {
        match self {
            BridgeRequest::DocumentReady => "document-ready",
            BridgeRequest::ModuleLoaded { .. } => "module-loaded",
            BridgeRequest::InputChanged { .. } => "input-changed",
            BridgeRequest::StartClicked => "start-clicked",
            BridgeRequest::StopClicked => "stop-clicked",
            BridgeRequest::ModuleLine { .. } => "module-line",
            BridgeRequest::GetSnapshot { .. } => "get-snapshot",
            BridgeRequest::Shutdown => "shutdown",
        }
    }
}
