//! Topic payloads.
//!
//! Outbound payloads are plain serde structs. Inbound payloads come from other
//! services and are read leniently: a field with the wrong shape reads as
//! absent instead of failing the whole envelope.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Validity window of a confirmation grant.
pub const CONFIRM_TTL_SECONDS: u64 = 60;
/// Literal decision marker carried by every grant sent over the wire.
pub const GRANT_DECISION_APPROVED: &str = "approved";
/// Upper bound on chat text accepted by agent-core.
pub const MAX_TEXT_CHARS: usize = 4_000;

/// `auth.hello`: identity and capabilities declared to the hub.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthHelloPayload {
    pub service: String,
    pub service_name: String,
    pub capabilities: Vec<String>,
    pub version: String,
    pub token: String,
}

/// `hb.ping`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeartbeatPayload {
    pub source: String,
}

/// `chat.user_message` and `chat.assistant_message`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextPayload {
    pub text: String,
}

/// `confirm.grant`: authorizes execution of a pending plan's tools.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmGrant {
    pub confirm_token: String,
    pub tools: Vec<String>,
    pub ttl_seconds: u64,
    pub decision: String,
}

/// `auth.ok`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthOkPayload {
    pub session_token: Option<String>,
}

impl AuthOkPayload {
    #[must_use]
    pub fn from_payload(payload: &Value) -> Self {
        Self {
            session_token: non_empty_string(payload.get("session_token")),
        }
    }
}

/// `auth.error`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthErrorPayload {
    pub code: Option<String>,
    pub message: String,
}

impl AuthErrorPayload {
    #[must_use]
    pub fn from_payload(payload: &Value) -> Self {
        let code = non_empty_string(payload.get("code"));
        let message = non_empty_string(payload.get("message"))
            .or_else(|| code.clone())
            .unwrap_or_else(|| "authentication rejected".to_string());
        Self { code, message }
    }
}

/// `ipc.error`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IpcErrorPayload {
    pub code: String,
    pub message: Option<String>,
}

impl IpcErrorPayload {
    #[must_use]
    pub fn from_payload(payload: &Value) -> Self {
        Self {
            code: non_empty_string(payload.get("code")).unwrap_or_else(|| "unknown".to_string()),
            message: non_empty_string(payload.get("message")),
        }
    }
}

/// One proposed tool invocation inside a plan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlanTool {
    pub name: Option<String>,
    pub risk: Option<String>,
}

impl PlanTool {
    fn from_value(value: &Value) -> Self {
        Self {
            name: value.get("name").and_then(Value::as_str).map(str::to_string),
            risk: value.get("risk").and_then(Value::as_str).map(str::to_string),
        }
    }
}

/// `chat.assistant_plan`.
///
/// `proposed_tools` is `None` when the payload has no tool list or the list is
/// not an array.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssistantPlan {
    pub summary: Option<String>,
    pub proposed_tools: Option<Vec<PlanTool>>,
}

impl AssistantPlan {
    #[must_use]
    pub fn from_payload(payload: &Value) -> Self {
        Self {
            summary: non_empty_string(payload.get("summary")),
            proposed_tools: payload
                .get("proposed_tools")
                .and_then(Value::as_array)
                .map(|tools| tools.iter().map(PlanTool::from_value).collect()),
        }
    }

    /// Tools in proposal order; empty when the tool list is absent.
    #[must_use]
    pub fn tools(&self) -> &[PlanTool] {
        self.proposed_tools.as_deref().unwrap_or_default()
    }
}

fn non_empty_string(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}
