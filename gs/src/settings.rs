//! Settings state mirrored between panel and module

use serde::Serialize;
use tracing::debug;

use crate::config::ElementsConfig;
use crate::marshal::{ParamValue, Parameter, marshal};
use crate::protocol::SettingsSnapshot;

/// One parameter control and the value it currently holds
#[derive(Debug, Clone, Serialize)]
pub struct ParamDescriptor {
    pub param: Parameter,

    /// Element id of the control container (input + monitor)
    pub container: String,

    /// Raw text as the control holds it
    raw: String,

    /// True when the raw value last came from a module broadcast
    synced: bool,
}

impl ParamDescriptor {
    fn new(param: Parameter, container: String) -> Self {
        Self {
            param,
            container,
            raw: String::new(),
            synced: false,
        }
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn is_synced(&self) -> bool {
        self.synced
    }

    /// The raw value marshalled to the module's type
    pub fn typed(&self) -> ParamValue {
        marshal(self.param, &self.raw)
    }
}

/// Ordered descriptors for every parameter
#[derive(Debug, Clone)]
pub struct SettingsState {
    descriptors: Vec<ParamDescriptor>,
}

impl SettingsState {
    /// Create empty state; raw values stay blank until the first broadcast
    pub fn new(elements: &ElementsConfig) -> Self {
        let descriptors = Parameter::ALL
            .into_iter()
            .map(|p| ParamDescriptor::new(p, elements.param(p)))
            .collect();
        Self { descriptors }
    }

    pub fn descriptor(&self, param: Parameter) -> &ParamDescriptor {
        &self.descriptors[param.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = &ParamDescriptor> {
        self.descriptors.iter()
    }

    /// Record a new raw value for a parameter
    pub fn set_raw(&mut self, param: Parameter, raw: &str, synced: bool) {
        debug!(%param, %raw, synced, "SettingsState::set_raw: called");
        let descriptor = &mut self.descriptors[param.index()];
        descriptor.raw = raw.to_string();
        descriptor.synced = synced;
    }

    /// Marshal every parameter into a full snapshot
    pub fn snapshot(&self) -> SettingsSnapshot {
        SettingsSnapshot::from_fn(|p| self.descriptor(p).typed())
    }

    /// True once any parameter has been confirmed by the module
    pub fn is_populated(&self) -> bool {
        self.descriptors.iter().any(|d| d.synced)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> SettingsState {
        SettingsState::new(&ElementsConfig::default())
    }

    #[test]
    fn test_new_state_is_empty() {
        let state = state();
        assert_eq!(state.iter().count(), 5);
        assert!(state.iter().all(|d| d.raw().is_empty() && !d.is_synced()));
        assert!(!state.is_populated());
        assert_eq!(state.descriptor(Parameter::DecayLin).container, "decay_lin");
    }

    #[test]
    fn test_descriptors_follow_panel_order() {
        let state = state();
        let order: Vec<Parameter> = state.iter().map(|d| d.param).collect();
        assert_eq!(order, Parameter::ALL.to_vec());
    }

    #[test]
    fn test_snapshot_marshals_every_parameter() {
        let mut state = state();
        state.set_raw(Parameter::Bleed, "0.5", true);
        state.set_raw(Parameter::Radius, "4", false);

        let snapshot = state.snapshot();
        assert_eq!(snapshot.bleed, ParamValue::Float(0.5));
        assert_eq!(snapshot.radius, ParamValue::Int(4));
        // Never-populated controls still appear, as the sentinel
        assert_eq!(snapshot.fps, ParamValue::NotANumber);
        assert_eq!(snapshot.iter().count(), 5);
        assert!(state.is_populated());
    }
}
