//! glowsync configuration types and loading

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::marshal::Parameter;
use crate::metrics::Metric;

/// Main glowsync configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[serde(rename = "log-level", skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,

    /// Bridge actor settings
    pub bridge: BridgeConfig,

    /// Module process settings
    pub module: ModuleConfig,

    /// Panel element ids
    pub elements: ElementsConfig,
}

impl Config {
    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Project-local config: .glowsync.yml
        let local_config = PathBuf::from(".glowsync.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // User config: ~/.config/glowsync/glowsync.yml
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("glowsync").join("glowsync.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;
        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

/// Bridge actor settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Buffer size of the bridge event channel
    #[serde(rename = "channel-buffer")]
    pub channel_buffer: usize,

    /// Buffer size of the outgoing module channel
    #[serde(rename = "module-buffer")]
    pub module_buffer: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            channel_buffer: 256,
            module_buffer: 64,
        }
    }
}

/// Module process settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModuleConfig {
    /// Command line that starts the module; defaults to `gs module`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,

    /// Interval between fps broadcasts of the simulated module
    #[serde(rename = "fps-interval-ms")]
    pub fps_interval_ms: u64,
}

impl Default for ModuleConfig {
    fn default() -> Self {
        Self {
            command: None,
            fps_interval_ms: 1000,
        }
    }
}

/// Element ids on the panel
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ElementsConfig {
    /// Loading indicator, hidden once the module is ready
    pub loader: String,

    /// Container of all parameter controls, hidden until the first broadcast
    pub controls: String,

    /// Per-parameter control containers
    pub params: BTreeMap<Parameter, String>,

    /// Per-metric label containers
    pub metrics: BTreeMap<Metric, String>,
}

impl Default for ElementsConfig {
    fn default() -> Self {
        Self {
            loader: "loader".to_string(),
            controls: "controls".to_string(),
            params: Parameter::ALL
                .into_iter()
                .map(|p| (p, p.default_element().to_string()))
                .collect(),
            metrics: Metric::ALL
                .into_iter()
                .map(|m| (m, m.default_element().to_string()))
                .collect(),
        }
    }
}

impl ElementsConfig {
    /// Container id of a parameter control
    pub fn param(&self, param: Parameter) -> String {
        self.params.get(&param).cloned().unwrap_or_else(|| {
            debug!(%param, "ElementsConfig::param: using default element");
            param.default_element().to_string()
        })
    }

    /// Container id of a metric label
    pub fn metric(&self, metric: Metric) -> String {
        self.metrics.get(&metric).cloned().unwrap_or_else(|| {
            debug!(%metric, "ElementsConfig::metric: using default element");
            metric.default_element().to_string()
        })
    }
}
