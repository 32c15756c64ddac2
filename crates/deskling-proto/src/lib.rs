//! Wire contracts for the Deskling IPC hub.
//!
//! Every frame exchanged with the hub is a single JSON [`Envelope`]. The
//! envelope carries routing (`from`/`to`), correlation (`id`, `reply_to`,
//! `trace_id`) and a topic-typed payload:
//! - [`envelope`] builds, encodes and validates envelopes
//! - [`topic`] names the dotted topics the desktop client speaks
//! - [`payload`] holds typed payloads and lenient readers for inbound ones
//! - [`ids`] generates message and trace identifiers

pub mod endpoint;
pub mod envelope;
pub mod error;
pub mod ids;
pub mod payload;
pub mod topic;

pub use envelope::{Envelope, EnvelopeFactory, PROTOCOL_VERSION, REQUIRED_KEYS, decode, encode};
pub use error::{MalformedReason, ProtoError, Result};
pub use ids::{new_message_id, new_trace_id};
pub use payload::{
    AssistantPlan, AuthErrorPayload, AuthHelloPayload, AuthOkPayload, CONFIRM_TTL_SECONDS,
    ConfirmGrant, GRANT_DECISION_APPROVED, HeartbeatPayload, IpcErrorPayload, MAX_TEXT_CHARS,
    PlanTool, TextPayload,
};
pub use topic::Topic;
