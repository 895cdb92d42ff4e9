//! Module link: how the controller reaches the module
//!
//! The controller posts through the [`ModulePort`] trait and never waits for
//! delivery. [`ChannelPort`] encodes each message as a JSON line and hands it
//! to a writer task; [`spawn_module_process`] runs the module as a child
//! process speaking that protocol on stdin/stdout.

use std::fmt;
use std::process::Stdio;

use eyre::{Context, Result, eyre};
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::bridge::BridgeHandle;
use crate::protocol::{CodecError, PanelMessage, encode};

/// Errors from posting to the module
#[derive(Debug, Error)]
pub enum PortError {
    #[error("Failed to encode message: {0}")]
    Encode(#[from] CodecError),

    #[error("Module channel is full")]
    Full,

    #[error("Module channel is closed")]
    Closed,
}

/// Outgoing side of the module link
pub trait ModulePort: Send + fmt::Debug {
    /// Post a message without waiting for delivery
    fn post(&self, message: &PanelMessage) -> Result<(), PortError>;
}

/// Port that queues encoded JSON lines on an mpsc channel
#[derive(Debug, Clone)]
pub struct ChannelPort {
    tx: mpsc::Sender<String>,
}

impl ChannelPort {
    pub fn new(tx: mpsc::Sender<String>) -> Self {
        Self { tx }
    }

    /// Create a port together with the receiving end of its channel
    pub fn channel(buffer: usize) -> (Self, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(buffer);
        (Self::new(tx), rx)
    }
}

impl ModulePort for ChannelPort {
    fn post(&self, message: &PanelMessage) -> Result<(), PortError> {
        let line = encode(message)?;
        debug!(subject = message.subject(), "ChannelPort::post: queueing");
        self.tx.try_send(line).map_err(|e| match e {
            TrySendError::Full(_) => PortError::Full,
            TrySendError::Closed(_) => PortError::Closed,
        })
    }
}

/// A running module child process and its pipe tasks
pub struct ModuleProcess {
    child: Child,
    writer: JoinHandle<()>,
    reader: JoinHandle<()>,
}

impl ModuleProcess {
    /// Kill the child and stop the pipe tasks
    pub async fn shutdown(mut self) {
        debug!("ModuleProcess::shutdown: called");
        self.writer.abort();
        if let Err(e) = self.child.kill().await {
            warn!(error = %e, "Failed to kill module process");
        }
        self.reader.abort();
    }
}

/// Spawn the module command and connect it to the bridge
///
/// Every stdout line is delivered to the bridge as an inbound message. Once
/// the process is up, the bridge receives the module-loaded signal carrying a
/// [`ChannelPort`] that feeds the child's stdin.
pub async fn spawn_module_process(command_line: &str, buffer: usize, bridge: BridgeHandle) -> Result<ModuleProcess> {
    let mut parts = command_line.split_whitespace();
    let program = parts.next().ok_or_else(|| eyre!("Empty module command"))?;

    info!(%command_line, "Spawning module process");
    let mut child = Command::new(program)
        .args(parts)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .spawn()
        .context(format!("Failed to spawn module: {}", command_line))?;

    let mut stdin = child.stdin.take().ok_or_else(|| eyre!("Module stdin not piped"))?;
    let stdout = child.stdout.take().ok_or_else(|| eyre!("Module stdout not piped"))?;

    let (port, mut rx) = ChannelPort::channel(buffer);

    let writer = tokio::spawn(async move {
        while let Some(line) = rx.recv().await {
            let result = async {
                stdin.write_all(line.as_bytes()).await?;
                stdin.write_all(b"\n").await?;
                stdin.flush().await
            }
            .await;
            if let Err(e) = result {
                warn!(error = %e, "Module stdin closed");
                break;
            }
        }
        debug!("Module writer finished");
    });

    let reader_bridge = bridge.clone();
    let reader = tokio::spawn(async move {
        let mut lines = BufReader::new(stdout).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) if line.trim().is_empty() => continue,
                Ok(Some(line)) => {
                    if reader_bridge.deliver(line).await.is_err() {
                        break;
                    }
                }
                Ok(None) => {
                    info!("Module closed its output");
                    break;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to read from module");
                    break;
                }
            }
        }
    });

    bridge.module_loaded(Box::new(port)).await?;

    Ok(ModuleProcess { child, writer, reader })
}
