//! JSON encoding and subject classification

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use super::messages::{ModuleMessage, ModuleRequest};

/// Subjects the panel accepts from the module
const MODULE_SUBJECTS: &[&str] = &["settingsBroadcast", "fpsBroadcast", "error"];

/// Subjects the module accepts from the panel
const PANEL_SUBJECTS: &[&str] = &["requestSettings", "changeSettings", "start", "stop"];

/// Errors from encoding or classifying a message
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Message is not a JSON object")]
    NotAnObject,

    #[error("Message has no subject")]
    MissingSubject,

    #[error("Unknown subject: {0}")]
    UnknownSubject(String),

    #[error("Invalid {subject} payload: {source}")]
    InvalidPayload {
        subject: String,
        #[source]
        source: serde_json::Error,
    },
}

impl CodecError {
    /// True when the message parsed but carried a subject we do not handle
    pub fn is_unknown_subject(&self) -> bool {
        matches!(self, CodecError::UnknownSubject(_))
    }
}

/// Serialize a message to a single JSON line (without the trailing newline)
pub fn encode<T: Serialize>(message: &T) -> Result<String, CodecError> {
    Ok(serde_json::to_string(message)?)
}

/// Classify and decode a line received from the module
pub fn decode_module(line: &str) -> Result<ModuleMessage, CodecError> {
    decode(line, MODULE_SUBJECTS)
}

/// Classify and decode a line received from the panel
pub fn decode_panel(line: &str) -> Result<ModuleRequest, CodecError> {
    decode(line, PANEL_SUBJECTS)
}

fn decode<T: DeserializeOwned>(line: &str, accepted: &[&str]) -> Result<T, CodecError> {
    let value: Value = serde_json::from_str(line.trim())?;
    let subject = match &value {
        Value::Object(map) => match map.get("subject") {
            Some(Value::String(s)) => s.clone(),
            _ => return Err(CodecError::MissingSubject),
        },
        _ => return Err(CodecError::NotAnObject),
    };

    if !accepted.contains(&subject.as_str()) {
        return Err(CodecError::UnknownSubject(subject));
    }

    debug!(%subject, "decode: classified message");
    serde_json::from_value(value).map_err(|source| CodecError::InvalidPayload { subject, source })
}
