//! Drivers that connect a [`SimModule`] to a panel

use std::time::Duration;

use eyre::{Context, Result};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::SimModule;
use crate::bridge::BridgeHandle;
use crate::config::ModuleConfig;
use crate::link::ChannelPort;
use crate::protocol::{ModuleMessage, encode};

fn fps_ticker(config: &ModuleConfig) -> time::Interval {
    let period = Duration::from_millis(config.fps_interval_ms.max(1));
    let mut ticker = time::interval_at(time::Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    ticker
}

async fn write_message<W: AsyncWrite + Unpin>(writer: &mut W, message: &ModuleMessage) -> Result<()> {
    let line = encode(message).context("Failed to encode module message")?;
    writer.write_all(line.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await.context("Failed to flush module output")?;
    debug!(subject = message.subject(), "write_message: sent");
    Ok(())
}

/// Serve the module protocol over a line reader and writer
///
/// Returns when the reader reaches end of input.
pub async fn serve<R, W>(reader: R, mut writer: W, config: &ModuleConfig) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut module = SimModule::new();
    let mut lines = reader.lines();
    let mut ticker = fps_ticker(config);

    info!("Module serving");
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read panel input")? else {
                    info!("Panel closed input, module exiting");
                    break;
                };
                if line.trim().is_empty() {
                    continue;
                }
                if let Some(reply) = module.handle_line(&line) {
                    write_message(&mut writer, &reply).await?;
                }
            }
            _ = ticker.tick() => {
                if let Some(report) = module.fps_report() {
                    write_message(&mut writer, &report).await?;
                }
            }
        }
    }

    Ok(())
}

/// Serve the module protocol on this process's stdin/stdout
pub async fn serve_stdio(config: &ModuleConfig) -> Result<()> {
    serve(BufReader::new(tokio::io::stdin()), tokio::io::stdout(), config).await
}

/// Run a module task in this process and attach it to the bridge
///
/// The module-loaded signal is sent once the task is spawned. The task ends
/// when the bridge drops its port or stops accepting lines.
pub async fn spawn_in_process(config: &ModuleConfig, buffer: usize, bridge: BridgeHandle) -> Result<JoinHandle<()>> {
    let (port, mut rx) = ChannelPort::channel(buffer);
    let mut ticker = fps_ticker(config);
    let module_bridge = bridge.clone();

    let task = tokio::spawn(async move {
        let mut module = SimModule::new();
        loop {
            let reply = tokio::select! {
                line = rx.recv() => match line {
                    Some(line) => module.handle_line(&line),
                    None => break,
                },
                _ = ticker.tick() => module.fps_report(),
            };

            let Some(reply) = reply else {
                continue;
            };
            let line = match encode(&reply) {
                Ok(line) => line,
                Err(e) => {
                    warn!(error = %e, "Failed to encode module reply");
                    continue;
                }
            };
            if module_bridge.deliver(line).await.is_err() {
                break;
            }
        }
        debug!("In-process module finished");
    });

    bridge.module_loaded(Box::new(port)).await?;
    Ok(task)
}
