//! Envelope construction, encoding and validation.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{MalformedReason, ProtoError, Result};
use crate::ids::new_message_id;
use crate::topic::Topic;

/// Current protocol version carried in `v`.
pub const PROTOCOL_VERSION: u32 = 1;

/// Keys every envelope must carry. `reply_to` is required even when `null`.
pub const REQUIRED_KEYS: [&str; 9] = [
    "v", "id", "ts", "from", "to", "topic", "reply_to", "trace_id", "payload",
];

/// Keys whose values must be non-blank strings.
const STRING_KEYS: [&str; 6] = ["id", "trace_id", "from", "to", "topic", "ts"];

/// One discrete protocol message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub v: u32,
    pub id: String,
    pub ts: String,
    pub from: String,
    pub to: String,
    pub topic: Topic,
    pub reply_to: Option<String>,
    pub trace_id: String,
    pub payload: Value,
}

impl Envelope {
    /// String field from the payload object, if present and a string.
    #[must_use]
    pub fn payload_str(&self, field: &str) -> Option<&str> {
        self.payload.get(field).and_then(Value::as_str)
    }
}

/// Builds envelopes stamped with a fixed sender endpoint.
#[derive(Debug, Clone)]
pub struct EnvelopeFactory {
    from: String,
}

impl EnvelopeFactory {
    pub fn new(from: impl Into<String>) -> Self {
        Self { from: from.into() }
    }

    /// Sender endpoint stamped into `from`.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.from
    }

    /// Build an envelope with a fresh id and the current timestamp.
    #[must_use]
    pub fn build(
        &self,
        topic: Topic,
        to: &str,
        payload: Value,
        trace_id: &str,
        reply_to: Option<&str>,
    ) -> Envelope {
        Envelope {
            v: PROTOCOL_VERSION,
            id: new_message_id(),
            ts: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            from: self.from.clone(),
            to: to.to_string(),
            topic,
            reply_to: reply_to.map(str::to_string),
            trace_id: trace_id.to_string(),
            payload,
        }
    }
}

/// Encode an envelope as one wire frame.
pub fn encode(envelope: &Envelope) -> Result<String> {
    Ok(serde_json::to_string(envelope)?)
}

/// Decode and validate one wire frame.
pub fn decode(text: &str) -> Result<Envelope> {
    let value: Value = serde_json::from_str(text)
        .map_err(|error| ProtoError::malformed(MalformedReason::InvalidJson, error.to_string()))?;

    {
        let object = value.as_object().ok_or_else(|| {
            ProtoError::malformed(MalformedReason::NotAnObject, "expected JSON object envelope")
        })?;

        let missing = REQUIRED_KEYS
            .iter()
            .copied()
            .filter(|key| !object.contains_key(*key))
            .collect::<Vec<_>>();
        if !missing.is_empty() {
            return Err(ProtoError::malformed(
                MalformedReason::MissingKeys,
                format!("missing keys: {}", missing.join(", ")),
            ));
        }

        let version = object.get("v").unwrap_or(&Value::Null);
        if version.as_u64() != Some(u64::from(PROTOCOL_VERSION)) {
            return Err(ProtoError::malformed(
                MalformedReason::UnsupportedVersion,
                format!("unsupported version: {version}"),
            ));
        }

        if !object.get("payload").is_some_and(Value::is_object) {
            return Err(ProtoError::malformed(
                MalformedReason::InvalidPayload,
                "payload must be an object",
            ));
        }

        if let Some(key) = STRING_KEYS.iter().copied().find(|key| {
            !object
                .get(*key)
                .and_then(Value::as_str)
                .is_some_and(|value| !value.trim().is_empty())
        }) {
            return Err(ProtoError::malformed(
                MalformedReason::InvalidField,
                format!("field {key} must be a non-empty string"),
            ));
        }
    }

    serde_json::from_value(value)
        .map_err(|error| ProtoError::malformed(MalformedReason::InvalidField, error.to_string()))
}
