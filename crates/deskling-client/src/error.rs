//! Client error types.

use deskling_proto::ProtoError;
use thiserror::Error;

use crate::config::ConfigError;

/// Client error type.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Proto(#[from] ProtoError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("hub rejected authentication: {0}")]
    AuthRejected(String),

    #[error("transport fault: {0}")]
    Transport(String),

    #[error("not connected to ipc-hub yet")]
    NotReady,

    #[error("no plan is awaiting confirmation")]
    NoPendingPlan,

    #[error("message text is empty")]
    EmptyMessage,

    #[error("message text exceeds {max} characters")]
    MessageTooLong { max: usize },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("settings store error: {0}")]
    Settings(#[from] std::io::Error),

    #[error("client task stopped")]
    Stopped,
}

/// Client result type.
pub type Result<T> = std::result::Result<T, ClientError>;
