//! glowsync - Settings bridge between a control panel and a compute module
//!
//! The panel and the module run independently and talk only through JSON
//! messages. glowsync keeps the panel's controls in step with the module's
//! settings: it waits until both sides are ready, requests the current
//! settings once, mirrors broadcasts into the controls, relays user edits,
//! and displays the module's frame-rate reports.
//!
//! # Core Concepts
//!
//! - **Latched Readiness**: The module may finish loading before the panel does; the signal is never lost
//! - **Typed Marshalling**: Control text is converted to the exact numeric type each parameter expects
//! - **No Echo**: Values mirrored from a broadcast are never sent back to the module
//! - **One Actor**: All panel and module events are handled on a single task, in order
//!
//! # Modules
//!
//! - [`marshal`] - Parameter table and text-to-value conversion
//! - [`protocol`] - Message types and the JSON line codec
//! - [`settings`] - Per-parameter control state
//! - [`controller`] - Handshake state machine and message routing
//! - [`metrics`] - Frame-rate label updates
//! - [`bridge`] - Actor task and handle that drive the controller
//! - [`link`] - Outgoing module port and child-process transport
//! - [`module`] - Simulated compute module
//! - [`config`] - Configuration types and loading
//! - [`cli`] - Command-line interface

pub mod bridge;
pub mod cli;
pub mod config;
pub mod console;
pub mod controller;
pub mod link;
pub mod marshal;
pub mod metrics;
pub mod module;
pub mod protocol;
pub mod settings;
pub mod surface;

// Re-export commonly used types
pub use bridge::{Bridge, BridgeHandle, BridgeRequest};
pub use config::{BridgeConfig, Config, ElementsConfig, ModuleConfig};
pub use controller::{ControllerSnapshot, ControllerState, EditOrigin, SyncController};
pub use link::{ChannelPort, ModulePort, ModuleProcess, PortError, spawn_module_process};
pub use marshal::{ParamKind, ParamValue, Parameter, marshal, marshal_named};
pub use metrics::{Metric, MetricsSink, format_rate};
pub use protocol::{CodecError, FpsReport, ModuleMessage, ModuleRequest, PanelMessage, SettingsPatch, SettingsSnapshot};
pub use settings::{ParamDescriptor, SettingsState};
pub use surface::{MemorySurface, Surface};
