//! Terminal panel
//!
//! A line-oriented stand-in for the graphical panel: each command maps to one
//! panel event, and a [`ConsoleSurface`] prints what the controller shows.

use colored::Colorize;
use eyre::Result;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::debug;

use crate::bridge::BridgeHandle;
use crate::config::ElementsConfig;
use crate::controller::ControllerSnapshot;
use crate::marshal::{Parameter, UnknownParameter};
use crate::metrics::format_rate;
use crate::surface::{MemorySurface, Surface};

/// A parsed console command
#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleCommand {
    Set { param: Parameter, raw: String },
    Start,
    Stop,
    Show,
    Help,
    Quit,
}

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Empty command")]
    Empty,

    #[error("Unknown command: {0}")]
    Unknown(String),

    #[error("Usage: {0}")]
    Usage(&'static str),

    #[error(transparent)]
    Parameter(#[from] UnknownParameter),
}

/// Parse one console line
///
/// The value of `set` is everything after the parameter name, so it may be
/// empty or contain spaces just like a text input can.
pub fn parse_command(line: &str) -> Result<ConsoleCommand, CommandError> {
    let line = line.trim();
    let (cmd, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let rest = rest.trim_start();

    match cmd {
        "" => Err(CommandError::Empty),
        "set" | "s" => {
            let (name, raw) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
            if name.is_empty() {
                return Err(CommandError::Usage("set <param> <value>"));
            }
            Ok(ConsoleCommand::Set {
                param: name.parse()?,
                raw: raw.trim().to_string(),
            })
        }
        "start" => Ok(ConsoleCommand::Start),
        "stop" => Ok(ConsoleCommand::Stop),
        "show" | "status" => Ok(ConsoleCommand::Show),
        "help" | "h" | "?" => Ok(ConsoleCommand::Help),
        "quit" | "q" | "exit" => Ok(ConsoleCommand::Quit),
        other => Err(CommandError::Unknown(other.to_string())),
    }
}

/// Surface that echoes parameter monitors and visibility changes to stdout
///
/// Metric labels are recorded but not printed; use `show` to see them.
#[derive(Debug)]
pub struct ConsoleSurface {
    inner: MemorySurface,
    elements: ElementsConfig,
}

impl ConsoleSurface {
    pub fn new(elements: ElementsConfig) -> Self {
        Self {
            inner: MemorySurface::new(),
            elements,
        }
    }

    fn param_for(&self, container: &str) -> Option<Parameter> {
        Parameter::ALL.into_iter().find(|p| self.elements.param(*p) == container)
    }
}

impl Surface for ConsoleSurface {
    fn set_input(&mut self, container: &str, value: &str) {
        self.inner.set_input(container, value);
    }

    fn set_text(&mut self, container: &str, text: &str) {
        let changed = self.inner.text(container) != Some(text);
        self.inner.set_text(container, text);
        if changed && let Some(param) = self.param_for(container) {
            println!("  {} {} = {}", "~".cyan(), param.name().yellow(), text);
        }
    }

    fn set_visible(&mut self, element: &str, visible: bool) {
        let changed = self.inner.is_visible(element) != Some(visible);
        self.inner.set_visible(element, visible);
        if changed {
            let state = if visible { "shown".green() } else { "hidden".dimmed() };
            println!("  {} {}", element.bright_cyan(), state);
        }
    }
}

/// Read commands until `quit` or end of input, feeding them to the bridge
pub async fn run_console<R: AsyncBufRead + Unpin>(handle: &BridgeHandle, reader: R) -> Result<()> {
    print_welcome();
    let mut lines = reader.lines();

    while let Some(line) = lines.next_line().await? {
        let command = match parse_command(&line) {
            Ok(command) => command,
            Err(CommandError::Empty) => continue,
            Err(e) => {
                println!("{} {}", "?".yellow(), e);
                continue;
            }
        };
        debug!(?command, "run_console: parsed command");

        match command {
            ConsoleCommand::Set { param, raw } => handle.input_changed(param, &raw).await?,
            ConsoleCommand::Start => handle.start().await?,
            ConsoleCommand::Stop => handle.stop().await?,
            ConsoleCommand::Show => print_snapshot(&handle.snapshot().await?),
            ConsoleCommand::Help => print_help(),
            ConsoleCommand::Quit => break,
        }
    }

    println!("Goodbye!");
    Ok(())
}

fn print_welcome() {
    println!();
    println!("{}", "glowsync panel".bright_cyan().bold());
    println!("Type {} for help, {} to quit", "help".yellow(), "quit".yellow());
    println!();
}

fn print_help() {
    println!();
    println!("{}", "Available Commands:".bright_cyan());
    println!("  {:20} Edit a control", "set <param> <value>".yellow());
    println!("  {:20} Start the module", "start".yellow());
    println!("  {:20} Stop the module", "stop".yellow());
    println!("  {:20} Show controls and frame rates", "show".yellow());
    println!("  {:20} Exit the panel", "quit".yellow());
    println!();
    println!("{}", "Parameters:".bright_cyan());
    for param in Parameter::ALL {
        println!("  {:20} {}", param.name().yellow(), param.kind());
    }
    println!();
}

/// Print a controller snapshot as a table
pub fn print_snapshot(snapshot: &ControllerSnapshot) {
    println!();
    println!("{}: {:?}", "State".bright_cyan(), snapshot.state);
    println!(
        "Module ready: {}  Controls shown: {}",
        snapshot.module_ready, snapshot.controls_revealed
    );
    println!();
    for view in &snapshot.params {
        let marker = if view.synced { "*".green() } else { " ".normal() };
        println!("  {} {:10} {}", marker, view.param.name(), view.raw);
    }
    println!();
    for view in &snapshot.metrics {
        let value = view.value.map(format_rate).unwrap_or_else(|| "-".to_string());
        println!("  {:16} {}", view.metric.name(), value);
    }
    println!();
}
