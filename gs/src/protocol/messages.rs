//! Message types for both directions of the protocol

use serde::{Deserialize, Deserializer, Serialize};

use crate::marshal::{ParamValue, Parameter};
use crate::metrics::Metric;

/// Messages posted by the panel to the module
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "subject", rename_all = "camelCase")]
pub enum PanelMessage {
    /// Ask the module to broadcast its current settings
    RequestSettings,

    /// Replace the module's settings; always carries every parameter
    ChangeSettings(SettingsSnapshot),

    /// Resume module execution
    Start,

    /// Pause module execution
    Stop,
}

impl PanelMessage {
    /// Wire subject of this message
    pub fn subject(&self) -> &'static str {
        match self {
            PanelMessage::RequestSettings => "requestSettings",
            PanelMessage::ChangeSettings(_) => "changeSettings",
            PanelMessage::Start => "start",
            PanelMessage::Stop => "stop",
        }
    }
}

/// Panel messages as the module receives them
///
/// The panel always sends every parameter, but the module accepts any subset
/// in `changeSettings` and leaves absent parameters unchanged.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "subject", rename_all = "camelCase")]
pub enum ModuleRequest {
    RequestSettings,
    ChangeSettings(SettingsPatch),
    Start,
    Stop,
}

impl ModuleRequest {
    /// Wire subject of this message
    pub fn subject(&self) -> &'static str {
        match self {
            ModuleRequest::RequestSettings => "requestSettings",
            ModuleRequest::ChangeSettings(_) => "changeSettings",
            ModuleRequest::Start => "start",
            ModuleRequest::Stop => "stop",
        }
    }
}

/// Messages broadcast by the module to the panel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "subject", rename_all = "camelCase")]
pub enum ModuleMessage {
    /// Current module settings (all or some parameters)
    SettingsBroadcast(SettingsPatch),

    /// Periodic performance report
    FpsBroadcast(FpsReport),

    /// The module rejected something we sent
    Error(ModuleFault),
}

impl ModuleMessage {
    /// Wire subject of this message
    pub fn subject(&self) -> &'static str {
        match self {
            ModuleMessage::SettingsBroadcast(_) => "settingsBroadcast",
            ModuleMessage::FpsBroadcast(_) => "fpsBroadcast",
            ModuleMessage::Error(_) => "error",
        }
    }
}

/// Full parameter set, module-typed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsSnapshot {
    pub bleed: ParamValue,
    pub radius: ParamValue,
    pub decay_exp: ParamValue,
    pub decay_lin: ParamValue,
    pub fps: ParamValue,
}

impl SettingsSnapshot {
    /// Build a snapshot by asking `value_of` for every parameter
    pub fn from_fn(mut value_of: impl FnMut(Parameter) -> ParamValue) -> Self {
        Self {
            bleed: value_of(Parameter::Bleed),
            radius: value_of(Parameter::Radius),
            decay_exp: value_of(Parameter::DecayExp),
            decay_lin: value_of(Parameter::DecayLin),
            fps: value_of(Parameter::Fps),
        }
    }

    pub fn get(&self, param: Parameter) -> &ParamValue {
        match param {
            Parameter::Bleed => &self.bleed,
            Parameter::Radius => &self.radius,
            Parameter::DecayExp => &self.decay_exp,
            Parameter::DecayLin => &self.decay_lin,
            Parameter::Fps => &self.fps,
        }
    }

    /// Parameters with their values, in panel order
    pub fn iter(&self) -> impl Iterator<Item = (Parameter, &ParamValue)> {
        Parameter::ALL.into_iter().map(move |p| (p, self.get(p)))
    }
}

/// Partial parameter set; absent fields are left alone by the receiver
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SettingsPatch {
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub bleed: Option<ParamValue>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub radius: Option<ParamValue>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub decay_exp: Option<ParamValue>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub decay_lin: Option<ParamValue>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub fps: Option<ParamValue>,
}

impl SettingsPatch {
    pub fn get(&self, param: Parameter) -> Option<&ParamValue> {
        self.slot(param).as_ref()
    }

    /// Set one parameter, builder style
    pub fn with(mut self, param: Parameter, value: ParamValue) -> Self {
        *self.slot_mut(param) = Some(value);
        self
    }

    /// Present parameters, in panel order
    pub fn iter(&self) -> impl Iterator<Item = (Parameter, &ParamValue)> {
        Parameter::ALL
            .into_iter()
            .filter_map(move |p| self.get(p).map(|v| (p, v)))
    }

    fn slot(&self, param: Parameter) -> &Option<ParamValue> {
        match param {
            Parameter::Bleed => &self.bleed,
            Parameter::Radius => &self.radius,
            Parameter::DecayExp => &self.decay_exp,
            Parameter::DecayLin => &self.decay_lin,
            Parameter::Fps => &self.fps,
        }
    }

    fn slot_mut(&mut self, param: Parameter) -> &mut Option<ParamValue> {
        match param {
            Parameter::Bleed => &mut self.bleed,
            Parameter::Radius => &mut self.radius,
            Parameter::DecayExp => &mut self.decay_exp,
            Parameter::DecayLin => &mut self.decay_lin,
            Parameter::Fps => &mut self.fps,
        }
    }
}

/// A key that is present always yields a value; `null` is the NaN sentinel
fn present<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<ParamValue>, D::Error> {
    ParamValue::deserialize(deserializer).map(Some)
}

/// Performance rates reported by the module
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FpsReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processing_fps: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rendering_fps: Option<f64>,
}

impl FpsReport {
    pub fn get(&self, metric: Metric) -> Option<f64> {
        match metric {
            Metric::ProcessingFps => self.processing_fps,
            Metric::RenderingFps => self.rendering_fps,
        }
    }
}

/// Diagnostic attached to an `error` message
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ModuleFault {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// The offending message, echoed back by the module
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_message: Option<serde_json::Value>,
}
