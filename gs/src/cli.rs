//! CLI command definitions and subcommands

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// glowsync - Settings bridge between a control panel and a compute module
#[derive(Parser)]
#[command(
    name = "gs",
    about = "Settings bridge between a control panel and a compute module",
    version = env!("CARGO_PKG_VERSION"),
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(
        short = 'l',
        long = "log-level",
        global = true,
        help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)"
    )]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the interactive panel attached to a module
    Panel {
        /// Command line that starts the module (defaults to `gs module`)
        #[arg(short, long)]
        module_cmd: Option<String>,
    },

    /// Run the simulated module on stdin/stdout
    Module,

    /// Show how a raw control value is sent to the module
    Marshal {
        /// Parameter name (bleed, radius, decayExp, decayLin, fps)
        name: String,

        /// Raw value as typed into the control
        value: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_panel_with_module_cmd() {
        let cli = Cli::try_parse_from(["gs", "-l", "debug", "panel", "--module-cmd", "glow --headless"]).unwrap();

        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        match cli.command {
            Command::Panel { module_cmd } => assert_eq!(module_cmd.as_deref(), Some("glow --headless")),
            other => panic!("Wrong command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_marshal() {
        let cli = Cli::try_parse_from(["gs", "marshal", "radius", "12", "-c", "gs.yml"]).unwrap();

        assert_eq!(cli.config, Some(PathBuf::from("gs.yml")));
        match cli.command {
            Command::Marshal { name, value } => {
                assert_eq!(name, "radius");
                assert_eq!(value, "12");
            }
            other => panic!("Wrong command: {:?}", other),
        }
    }

    #[test]
    fn test_subcommand_is_required() {
        assert!(Cli::try_parse_from(["gs"]).is_err());
    }
}
