//! Simulated module
//!
//! Stands in for the external compute module: keeps its own settings,
//! answers `requestSettings` with a broadcast, validates `changeSettings`,
//! and reports frame rates while running. It does no actual processing.

mod runner;

pub use runner::{serve, serve_stdio, spawn_in_process};

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::marshal::{ParamValue, Parameter};
use crate::protocol::{FpsReport, ModuleFault, ModuleMessage, ModuleRequest, SettingsPatch, decode_panel};

/// Frame rate the renderer can present at most
const MAX_RENDER_FPS: f64 = 60.0;

/// A parameter value the module cannot accept
#[derive(Debug, Clone, PartialEq, Error)]
#[error("Invalid value for {param}: {value}")]
pub struct InvalidSetting {
    pub param: Parameter,
    pub value: ParamValue,
}

/// Module-side settings with their native widths
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleSettings {
    pub bleed: f64,
    pub radius: u32,
    pub decay_exp: f64,
    pub decay_lin: u8,
    pub fps: u8,
}

impl Default for ModuleSettings {
    fn default() -> Self {
        Self {
            bleed: 0.95,
            radius: 3,
            decay_exp: 0.02,
            decay_lin: 1,
            fps: 20,
        }
    }
}

impl ModuleSettings {
    /// Every setting as a broadcast payload
    pub fn to_patch(&self) -> SettingsPatch {
        SettingsPatch::default()
            .with(Parameter::Bleed, ParamValue::Float(self.bleed))
            .with(Parameter::Radius, ParamValue::Int(i64::from(self.radius)))
            .with(Parameter::DecayExp, ParamValue::Float(self.decay_exp))
            .with(Parameter::DecayLin, ParamValue::Int(i64::from(self.decay_lin)))
            .with(Parameter::Fps, ParamValue::Int(i64::from(self.fps)))
    }

    /// Apply every present key onto a copy of these settings
    ///
    /// Absent keys keep their value. All-or-nothing: the first bad value
    /// rejects the whole change.
    pub fn apply(&self, patch: &SettingsPatch) -> Result<Self, InvalidSetting> {
        let mut next = self.clone();
        for (param, value) in patch.iter() {
            match param {
                Parameter::Bleed => next.bleed = float_setting(param, value)?,
                Parameter::Radius => next.radius = int_setting(param, value)?,
                Parameter::DecayExp => next.decay_exp = float_setting(param, value)?,
                Parameter::DecayLin => next.decay_lin = int_setting(param, value)?,
                Parameter::Fps => next.fps = int_setting(param, value)?,
            }
        }
        Ok(next)
    }
}

fn float_setting(param: Parameter, value: &ParamValue) -> Result<f64, InvalidSetting> {
    value.as_f64().ok_or_else(|| InvalidSetting {
        param,
        value: value.clone(),
    })
}

fn int_setting<T: TryFrom<i64>>(param: Parameter, value: &ParamValue) -> Result<T, InvalidSetting> {
    let invalid = || InvalidSetting {
        param,
        value: value.clone(),
    };
    match value {
        ParamValue::Int(i) => T::try_from(*i).map_err(|_| invalid()),
        _ => Err(invalid()),
    }
}

/// Protocol state of the simulated module
#[derive(Debug, Default)]
pub struct SimModule {
    settings: ModuleSettings,
    running: bool,
}

impl SimModule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn settings(&self) -> &ModuleSettings {
        &self.settings
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Handle one line from the panel, returning the reply if there is one
    pub fn handle_line(&mut self, line: &str) -> Option<ModuleMessage> {
        match decode_panel(line) {
            Ok(message) => self.handle(message).unwrap_or_else(|e| {
                warn!(error = %e, "Rejecting settings change");
                Some(invalid_message(line))
            }),
            Err(e) => {
                warn!(error = %e, "Rejecting panel message");
                Some(invalid_message(line))
            }
        }
    }

    /// Handle a decoded panel message
    pub fn handle(&mut self, message: ModuleRequest) -> Result<Option<ModuleMessage>, InvalidSetting> {
        debug!(subject = message.subject(), "SimModule::handle: called");
        match message {
            ModuleRequest::RequestSettings => Ok(Some(ModuleMessage::SettingsBroadcast(self.settings.to_patch()))),
            ModuleRequest::ChangeSettings(patch) => {
                self.settings = self.settings.apply(&patch)?;
                info!(settings = ?self.settings, "Settings changed");
                Ok(None)
            }
            ModuleRequest::Start => {
                self.running = true;
                info!("Module started");
                Ok(None)
            }
            ModuleRequest::Stop => {
                self.running = false;
                info!("Module stopped");
                Ok(None)
            }
        }
    }

    /// Current frame rates, reported only while running
    pub fn fps_report(&self) -> Option<ModuleMessage> {
        if !self.running {
            return None;
        }
        let target = f64::from(self.settings.fps);
        Some(ModuleMessage::FpsBroadcast(FpsReport {
            processing_fps: Some(target),
            rendering_fps: Some(target.min(MAX_RENDER_FPS)),
        }))
    }
}

/// Error reply echoing the rejected message back to the panel
fn invalid_message(line: &str) -> ModuleMessage {
    let original = serde_json::from_str(line).unwrap_or_else(|_| Value::String(line.to_string()));
    ModuleMessage::Error(ModuleFault {
        message: Some("invalid message".to_string()),
        original_message: Some(original),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{PanelMessage, SettingsSnapshot};

    fn change(bleed: ParamValue, radius: ParamValue) -> String {
        let snapshot = SettingsSnapshot {
            bleed,
            radius,
            decay_exp: ParamValue::Float(0.1),
            decay_lin: ParamValue::Int(2),
            fps: ParamValue::Int(30),
        };
        serde_json::to_string(&PanelMessage::ChangeSettings(snapshot)).unwrap()
    }

    #[test]
    fn test_request_settings_broadcasts_defaults() {
        let mut module = SimModule::new();
        let reply = module.handle_line(r#"{"subject":"requestSettings"}"#).unwrap();

        let ModuleMessage::SettingsBroadcast(patch) = reply else {
            panic!("Expected settingsBroadcast");
        };
        assert_eq!(patch.get(Parameter::Bleed), Some(&ParamValue::Float(0.95)));
        assert_eq!(patch.get(Parameter::Radius), Some(&ParamValue::Int(3)));
        assert_eq!(patch.get(Parameter::Fps), Some(&ParamValue::Int(20)));
        assert_eq!(patch.iter().count(), 5);
    }

    #[test]
    fn test_change_settings_applies() {
        let mut module = SimModule::new();
        let reply = module.handle_line(&change(ParamValue::Int(1), ParamValue::Int(8)));

        assert!(reply.is_none());
        assert_eq!(module.settings().bleed, 1.0);
        assert_eq!(module.settings().radius, 8);
        assert_eq!(module.settings().fps, 30);
    }

    #[test]
    fn test_bad_value_rejects_whole_change() {
        let mut module = SimModule::new();
        let line = change(ParamValue::Float(0.5), ParamValue::NotANumber);
        let reply = module.handle_line(&line).unwrap();

        let ModuleMessage::Error(fault) = reply else {
            panic!("Expected error reply");
        };
        assert_eq!(fault.message.as_deref(), Some("invalid message"));
        assert_eq!(fault.original_message.unwrap()["subject"], "changeSettings");
        assert_eq!(module.settings(), &ModuleSettings::default());
    }

    #[test]
    fn test_partial_change_updates_only_present_keys() {
        let mut module = SimModule::new();
        let reply = module.handle_line(r#"{"subject":"changeSettings","radius":8}"#);

        assert!(reply.is_none());
        assert_eq!(
            module.settings(),
            &ModuleSettings {
                radius: 8,
                ..ModuleSettings::default()
            }
        );
    }

    #[test]
    fn test_partial_change_with_bad_key_changes_nothing() {
        let mut module = SimModule::new();
        let reply = module.handle_line(r#"{"subject":"changeSettings","bleed":0.5,"fps":2.5}"#);

        assert_eq!(reply.map(|r| r.subject()), Some("error"));
        assert_eq!(module.settings(), &ModuleSettings::default());
    }

    #[test]
    fn test_integer_range_is_enforced() {
        let mut module = SimModule::new();
        let patch = SettingsPatch::default()
            .with(Parameter::Bleed, ParamValue::Float(0.5))
            .with(Parameter::Fps, ParamValue::Int(300));

        let err = module.handle(ModuleRequest::ChangeSettings(patch)).unwrap_err();
        assert_eq!(err.param, Parameter::Fps);
        assert_eq!(module.settings().bleed, 0.95);
    }

    #[test]
    fn test_unknown_subject_gets_error() {
        let mut module = SimModule::new();
        let reply = module.handle_line("nonsense").unwrap();
        let ModuleMessage::Error(fault) = reply else {
            panic!("Expected error reply");
        };
        assert_eq!(fault.original_message, Some(Value::String("nonsense".to_string())));
    }

    #[test]
    fn test_fps_only_while_running() {
        let mut module = SimModule::new();
        assert!(module.fps_report().is_none());

        module.handle_line(r#"{"subject":"start"}"#);
        assert!(module.is_running());
        let Some(ModuleMessage::FpsBroadcast(report)) = module.fps_report() else {
            panic!("Expected fpsBroadcast");
        };
        assert_eq!(report.processing_fps, Some(20.0));

        module.handle_line(r#"{"subject":"stop"}"#);
        assert!(module.fps_report().is_none());
    }
}
