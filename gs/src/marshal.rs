//! Value marshalling
//!
//! Controls hand us raw text; the module expects typed numbers. Each
//! parameter has a fixed kind, and malformed text turns into the
//! [`ParamValue::NotANumber`] sentinel rather than an error so that a bad
//! keystroke never interrupts the session.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

/// A parameter kept in sync between the panel and the module
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Parameter {
    Bleed,
    Radius,
    DecayExp,
    DecayLin,
    Fps,
}

impl Parameter {
    /// Every parameter, in panel order
    pub const ALL: [Parameter; 5] = [
        Parameter::Bleed,
        Parameter::Radius,
        Parameter::DecayExp,
        Parameter::DecayLin,
        Parameter::Fps,
    ];

    /// Wire name used in message payloads
    pub fn name(self) -> &'static str {
        match self {
            Parameter::Bleed => "bleed",
            Parameter::Radius => "radius",
            Parameter::DecayExp => "decayExp",
            Parameter::DecayLin => "decayLin",
            Parameter::Fps => "fps",
        }
    }

    /// The numeric kind the module expects for this parameter
    pub fn kind(self) -> ParamKind {
        match self {
            Parameter::Bleed | Parameter::DecayExp => ParamKind::Float,
            Parameter::Radius | Parameter::DecayLin | Parameter::Fps => ParamKind::Integer,
        }
    }

    /// Position in [`Parameter::ALL`]
    pub fn index(self) -> usize {
        match self {
            Parameter::Bleed => 0,
            Parameter::Radius => 1,
            Parameter::DecayExp => 2,
            Parameter::DecayLin => 3,
            Parameter::Fps => 4,
        }
    }

    /// Element id of the control container on the stock panel layout
    pub fn default_element(self) -> &'static str {
        match self {
            Parameter::Bleed => "bleed",
            Parameter::Radius => "radius",
            Parameter::DecayExp => "decay_exp",
            Parameter::DecayLin => "decay_lin",
            Parameter::Fps => "target_fps",
        }
    }

    /// Look up a parameter by its wire name
    pub fn from_name(name: &str) -> Option<Self> {
        Parameter::ALL.into_iter().find(|p| p.name() == name)
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error for a parameter name outside the known set
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown parameter: {0}")]
pub struct UnknownParameter(pub String);

impl FromStr for Parameter {
    type Err = UnknownParameter;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Parameter::from_name(s).ok_or_else(|| UnknownParameter(s.to_string()))
    }
}

/// Numeric kind of a parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    Float,
    Integer,
}

impl fmt::Display for ParamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamKind::Float => f.write_str("float"),
            ParamKind::Integer => f.write_str("integer"),
        }
    }
}

/// A module-typed parameter value
///
/// Serialized untagged so the wire carries bare JSON numbers. The
/// `NotANumber` sentinel goes out as `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Int(i64),
    Float(f64),
    Text(String),
    NotANumber,
}

impl ParamValue {
    /// False for the malformed-input sentinel and pass-through text
    pub fn is_number(&self) -> bool {
        matches!(self, ParamValue::Int(_) | ParamValue::Float(_))
    }

    /// Numeric view of the value, if it has one
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParamValue::Int(i) => Some(*i as f64),
            ParamValue::Float(f) => Some(*f),
            ParamValue::Text(_) | ParamValue::NotANumber => None,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Int(i) => write!(f, "{}", i),
            ParamValue::Float(x) => write!(f, "{}", x),
            ParamValue::Text(s) => f.write_str(s),
            ParamValue::NotANumber => f.write_str("NaN"),
        }
    }
}

/// Convert a control's raw text into the value the module expects
pub fn marshal(param: Parameter, raw: &str) -> ParamValue {
    let text = raw.trim();
    let value = match param.kind() {
        ParamKind::Float => match text.parse::<f64>() {
            Ok(x) if x.is_finite() => ParamValue::Float(x),
            _ => ParamValue::NotANumber,
        },
        ParamKind::Integer => match text.parse::<i64>() {
            Ok(i) => ParamValue::Int(i),
            Err(_) => ParamValue::NotANumber,
        },
    };

    if !value.is_number() {
        warn!(%param, %raw, "Malformed numeric input, forwarding NaN");
    } else {
        debug!(%param, %raw, %value, "marshal: converted");
    }
    value
}

/// Marshal by wire name; names outside the known set pass through as text
pub fn marshal_named(name: &str, raw: &str) -> ParamValue {
    match Parameter::from_name(name) {
        Some(param) => marshal(param, raw),
        None => {
            debug!(%name, "marshal_named: unknown parameter, passing through");
            ParamValue::Text(raw.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_float_parameters() {
        assert_eq!(marshal(Parameter::Bleed, "0.95"), ParamValue::Float(0.95));
        assert_eq!(marshal(Parameter::DecayExp, "0.02"), ParamValue::Float(0.02));
        assert_eq!(marshal(Parameter::Bleed, "1"), ParamValue::Float(1.0));
    }

    #[test]
    fn test_integer_parameters() {
        assert_eq!(marshal(Parameter::Radius, "3"), ParamValue::Int(3));
        assert_eq!(marshal(Parameter::DecayLin, "-2"), ParamValue::Int(-2));
        assert_eq!(marshal(Parameter::Fps, " 20 "), ParamValue::Int(20));
    }

    #[test]
    fn test_malformed_input_yields_sentinel() {
        assert_eq!(marshal(Parameter::Bleed, "abc"), ParamValue::NotANumber);
        assert_eq!(marshal(Parameter::Bleed, "NaN"), ParamValue::NotANumber);
        assert_eq!(marshal(Parameter::Radius, "3.5"), ParamValue::NotANumber);
        assert_eq!(marshal(Parameter::Fps, ""), ParamValue::NotANumber);
    }

    #[test]
    fn test_non_finite_input_yields_sentinel() {
        for raw in ["1e999", "-1e999", "inf", "infinity", "-inf"] {
            let value = marshal(Parameter::Bleed, raw);
            assert_eq!(value, ParamValue::NotANumber, "{}", raw);
            assert!(!value.is_number());
        }
        assert!(marshal(Parameter::DecayExp, "1e300").is_number());
    }

    #[test]
    fn test_unknown_name_passes_through() {
        assert_eq!(marshal_named("gamma", "1.5"), ParamValue::Text("1.5".to_string()));
        assert_eq!(marshal_named("radius", "4"), ParamValue::Int(4));
    }

    #[test]
    fn test_parameter_names_roundtrip() {
        for param in Parameter::ALL {
            assert_eq!(param.name().parse::<Parameter>().unwrap(), param);
            assert_eq!(Parameter::ALL[param.index()], param);
        }
        assert!("decay_exp".parse::<Parameter>().is_err());
    }

    #[test]
    fn test_sentinel_serializes_as_null() {
        let json = serde_json::to_string(&ParamValue::NotANumber).unwrap();
        assert_eq!(json, "null");
        let json = serde_json::to_string(&ParamValue::Int(7)).unwrap();
        assert_eq!(json, "7");
    }

    proptest! {
        #[test]
        fn prop_float_remarshal_is_idempotent(x in -1.0e9f64..1.0e9) {
            let first = marshal(Parameter::Bleed, &x.to_string());
            prop_assert_eq!(&first, &ParamValue::Float(x));
            let second = marshal(Parameter::Bleed, &first.to_string());
            prop_assert_eq!(first, second);
        }

        #[test]
        fn prop_integer_remarshal_is_idempotent(i in any::<i64>()) {
            let first = marshal(Parameter::Radius, &i.to_string());
            prop_assert_eq!(&first, &ParamValue::Int(i));
            let second = marshal(Parameter::Radius, &first.to_string());
            prop_assert_eq!(first, second);
        }

        #[test]
        fn prop_marshal_kind_matches_parameter(idx in 0usize..5, i in -10_000i64..10_000) {
            let param = Parameter::ALL[idx];
            match (param.kind(), marshal(param, &i.to_string())) {
                (ParamKind::Float, ParamValue::Float(_)) | (ParamKind::Integer, ParamValue::Int(_)) => {}
                (kind, value) => prop_assert!(false, "{} marshalled to {:?} for kind {}", param, value, kind),
            }
        }
    }
}
