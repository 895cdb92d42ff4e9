//! glowsync - Settings bridge between a control panel and a compute module
//!
//! CLI entry point for the terminal panel and the simulated module.

use std::fs;
use std::path::PathBuf;

use clap::Parser;
use colored::Colorize;
use eyre::{Context, Result};
use tokio::io::BufReader;
use tracing::{debug, info, warn};

use glowsync::bridge::Bridge;
use glowsync::cli::{Cli, Command};
use glowsync::config::Config;
use glowsync::console::{ConsoleSurface, run_console};
use glowsync::controller::SyncController;
use glowsync::link::spawn_module_process;
use glowsync::marshal::{Parameter, marshal_named};
use glowsync::module::serve_stdio;

fn parse_level(level_str: Option<&str>) -> tracing::Level {
    let Some(s) = level_str else {
        return tracing::Level::INFO;
    };
    match s.to_uppercase().as_str() {
        "TRACE" => tracing::Level::TRACE,
        "DEBUG" => tracing::Level::DEBUG,
        "INFO" => tracing::Level::INFO,
        "WARN" | "WARNING" => tracing::Level::WARN,
        "ERROR" => tracing::Level::ERROR,
        _ => {
            eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
            tracing::Level::INFO
        }
    }
}

fn setup_logging(file_name: &str, cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("glowsync")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    // Priority: CLI --log-level > config file > default (INFO)
    let level = parse_level(cli_log_level.or(config_log_level));

    let log_file = fs::File::create(log_dir.join(file_name)).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    let log_file = match cli.command {
        Command::Module => "gs-module.log",
        _ => "gs.log",
    };
    setup_logging(log_file, cli.log_level.as_deref(), config.log_level.as_deref())
        .context("Failed to setup logging")?;

    debug!(command = ?cli.command, "main: dispatching command");
    match cli.command {
        Command::Panel { module_cmd } => {
            debug!(?module_cmd, "main: matched Panel command");
            cmd_panel(&config, module_cmd).await
        }
        Command::Module => {
            debug!("main: matched Module command");
            serve_stdio(&config.module).await
        }
        Command::Marshal { name, value } => {
            debug!(%name, %value, "main: matched Marshal command");
            cmd_marshal(&name, &value)
        }
    }
}

/// Command that starts the module when none is configured: this binary in module mode
fn default_module_command() -> Result<String> {
    let exe = std::env::current_exe().context("Failed to locate gs executable")?;
    Ok(format!("{} module", exe.display()))
}

/// Run the terminal panel against a module process
async fn cmd_panel(config: &Config, module_cmd: Option<String>) -> Result<()> {
    let command_line = match module_cmd.or_else(|| config.module.command.clone()) {
        Some(command_line) => command_line,
        None => default_module_command()?,
    };

    let surface = ConsoleSurface::new(config.elements.clone());
    let controller = SyncController::new(config.elements.clone(), surface);
    let bridge = Bridge::new(&config.bridge, controller);
    let handle = bridge.handle();
    let bridge_task = tokio::spawn(bridge.run());

    // Module start-up runs alongside panel wiring; either may finish first
    let module_buffer = config.bridge.module_buffer;
    let module_handle = handle.clone();
    let module_task =
        tokio::spawn(async move { spawn_module_process(&command_line, module_buffer, module_handle).await });

    handle.document_ready().await?;
    let module = module_task.await.context("Module start-up task failed")??;

    let console_result = run_console(&handle, BufReader::new(tokio::io::stdin())).await;

    if let Err(e) = handle.shutdown().await {
        warn!(error = %e, "Bridge already stopped");
    }
    let controller = bridge_task.await.context("Bridge task failed")?;
    info!(state = ?controller.state(), "Panel finished");
    module.shutdown().await;

    console_result
}

/// Print the value a raw control text is sent as
fn cmd_marshal(name: &str, raw: &str) -> Result<()> {
    let value = marshal_named(name, raw);
    let kind = match Parameter::from_name(name) {
        Some(param) => param.kind().to_string(),
        None => "text".to_string(),
    };
    let json = serde_json::to_string(&value).context("Failed to encode value")?;

    println!("{} = {} ({})", name.yellow(), json, kind.dimmed());
    Ok(())
}
