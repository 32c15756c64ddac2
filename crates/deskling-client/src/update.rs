//! Notifications published to the rendering surface.

use tokio::sync::mpsc;

use crate::session_state::SessionState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Connecting,
    Authenticating,
    Connected,
    Disconnected,
    Error,
}

impl ConnectionStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Connecting => "connecting",
            Self::Authenticating => "authenticating",
            Self::Connected => "connected",
            Self::Disconnected => "disconnected",
            Self::Error => "error",
        }
    }
}

/// A plan awaiting a human decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmationPrompt {
    pub trace_id: String,
    pub summary: String,
    /// One `name (risk)` line per proposed tool.
    pub tools: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionUpdate {
    StateChanged(SessionState),
    Status(ConnectionStatus),
    AssistantText { trace_id: String, text: String },
    PlanSummary { trace_id: String, summary: String },
    ConfirmationRequested(ConfirmationPrompt),
    ConfirmationClosed { trace_id: String, approved: bool },
    IpcError { code: String, message: Option<String> },
    AuthRejected { message: String },
    Notice(String),
}

/// Receiver of session notifications.
pub trait UpdateSink {
    fn publish(&mut self, update: SessionUpdate);
}

impl UpdateSink for Vec<SessionUpdate> {
    fn publish(&mut self, update: SessionUpdate) {
        self.push(update);
    }
}

impl UpdateSink for mpsc::UnboundedSender<SessionUpdate> {
    fn publish(&mut self, update: SessionUpdate) {
        // A dropped renderer does not stop the session.
        let _ = self.send(update);
    }
}
