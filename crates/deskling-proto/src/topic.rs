//! Dotted envelope topics.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Topic selecting the payload schema and handler for an envelope.
///
/// Unrecognized topics survive decoding as [`Topic::Other`] so newer hubs can
/// introduce topics without breaking older clients.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Topic {
    AuthHello,
    AuthOk,
    AuthError,
    HeartbeatPing,
    HeartbeatPong,
    ChatUserMessage,
    ChatAssistantMessage,
    ChatAssistantPlan,
    ConfirmGrant,
    IpcError,
    Other(String),
}

impl Topic {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::AuthHello => "auth.hello",
            Self::AuthOk => "auth.ok",
            Self::AuthError => "auth.error",
            Self::HeartbeatPing => "hb.ping",
            Self::HeartbeatPong => "hb.pong",
            Self::ChatUserMessage => "chat.user_message",
            Self::ChatAssistantMessage => "chat.assistant_message",
            Self::ChatAssistantPlan => "chat.assistant_plan",
            Self::ConfirmGrant => "confirm.grant",
            Self::IpcError => "ipc.error",
            Self::Other(raw) => raw.as_str(),
        }
    }

    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw {
            "auth.hello" => Self::AuthHello,
            "auth.ok" => Self::AuthOk,
            "auth.error" => Self::AuthError,
            "hb.ping" => Self::HeartbeatPing,
            "hb.pong" => Self::HeartbeatPong,
            "chat.user_message" => Self::ChatUserMessage,
            "chat.assistant_message" => Self::ChatAssistantMessage,
            "chat.assistant_plan" => Self::ChatAssistantPlan,
            "confirm.grant" => Self::ConfirmGrant,
            "ipc.error" => Self::IpcError,
            other => Self::Other(other.to_string()),
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for Topic {
    fn from(raw: String) -> Self {
        match Self::parse(raw.as_str()) {
            Self::Other(_) => Self::Other(raw),
            known => known,
        }
    }
}

impl From<&str> for Topic {
    fn from(raw: &str) -> Self {
        Self::parse(raw)
    }
}

impl From<Topic> for String {
    fn from(topic: Topic) -> Self {
        match topic {
            Topic::Other(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}
