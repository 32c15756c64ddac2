//! Protocol error types.

use std::fmt;

use thiserror::Error;

/// Why an inbound frame was rejected as a malformed envelope.
///
/// Codes mirror the hub validator so logs line up across services.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MalformedReason {
    InvalidJson,
    NotAnObject,
    MissingKeys,
    UnsupportedVersion,
    InvalidPayload,
    InvalidField,
}

impl MalformedReason {
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::InvalidJson => "ERR_INVALID_JSON",
            Self::NotAnObject => "ERR_NOT_AN_OBJECT",
            Self::MissingKeys => "ERR_MISSING_KEYS",
            Self::UnsupportedVersion => "ERR_UNSUPPORTED_VERSION",
            Self::InvalidPayload => "ERR_INVALID_PAYLOAD",
            Self::InvalidField => "ERR_INVALID_FIELD",
        }
    }
}

impl fmt::Display for MalformedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Protocol error type.
#[derive(Debug, Error)]
pub enum ProtoError {
    #[error("malformed envelope [{reason}]: {detail}")]
    MalformedEnvelope {
        reason: MalformedReason,
        detail: String,
    },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ProtoError {
    pub(crate) fn malformed(reason: MalformedReason, detail: impl Into<String>) -> Self {
        Self::MalformedEnvelope {
            reason,
            detail: detail.into(),
        }
    }

    /// Reason code when this is a malformed-envelope rejection.
    #[must_use]
    pub fn malformed_reason(&self) -> Option<MalformedReason> {
        match self {
            Self::MalformedEnvelope { reason, .. } => Some(*reason),
            Self::Serialization(_) => None,
        }
    }
}

/// Protocol result type.
pub type Result<T> = std::result::Result<T, ProtoError>;
