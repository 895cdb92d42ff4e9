//! Panel/module message protocol
//!
//! Every message is a single JSON object whose `subject` key names the
//! message and whose remaining keys carry the payload. Lines are exchanged
//! newline-delimited in both directions.
//!
//! - **Panel → module:** `requestSettings`, `changeSettings`, `start`, `stop`
//! - **Module → panel:** `settingsBroadcast`, `fpsBroadcast`, `error`

mod codec;
mod messages;

pub use codec::{CodecError, decode_module, decode_panel, encode};
pub use messages::{FpsReport, ModuleFault, ModuleMessage, ModuleRequest, PanelMessage, SettingsPatch, SettingsSnapshot};
