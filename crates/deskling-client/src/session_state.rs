//! UI session state and its reducer.
//!
//! The reducer is pure and total: every `(state, event)` pair yields a state,
//! and events outside the transition table leave the state unchanged.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    Idle,
    Listen,
    Think,
    Speak,
    Run,
    Error,
}

impl SessionState {
    pub const ALL: [Self; 6] = [
        Self::Idle,
        Self::Listen,
        Self::Think,
        Self::Speak,
        Self::Run,
        Self::Error,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Listen => "listen",
            Self::Think => "think",
            Self::Speak => "speak",
            Self::Run => "run",
            Self::Error => "error",
        }
    }

    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|state| state.as_str() == raw)
    }
}

impl Default for SessionState {
    /// Sessions start in `error` until the hub connection is ready.
    fn default() -> Self {
        Self::Error
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionEvent {
    SocketOpen,
    AuthOk,
    AssistantMessage,
    UserMessageSent,
    VoiceCaptureStart,
    VoiceTtsStart,
    ToolExecuteStart,
    SocketError,
    SocketClose,
}

impl SessionEvent {
    pub const ALL: [Self; 9] = [
        Self::SocketOpen,
        Self::AuthOk,
        Self::AssistantMessage,
        Self::UserMessageSent,
        Self::VoiceCaptureStart,
        Self::VoiceTtsStart,
        Self::ToolExecuteStart,
        Self::SocketError,
        Self::SocketClose,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SocketOpen => "SOCKET_OPEN",
            Self::AuthOk => "AUTH_OK",
            Self::AssistantMessage => "ASSISTANT_MESSAGE",
            Self::UserMessageSent => "USER_MESSAGE_SENT",
            Self::VoiceCaptureStart => "VOICE_CAPTURE_START",
            Self::VoiceTtsStart => "VOICE_TTS_START",
            Self::ToolExecuteStart => "TOOL_EXECUTE_START",
            Self::SocketError => "SOCKET_ERROR",
            Self::SocketClose => "SOCKET_CLOSE",
        }
    }

    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|event| event.as_str() == raw)
    }
}

impl fmt::Display for SessionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Next session state for `event`.
#[must_use]
pub const fn reduce(_state: SessionState, event: SessionEvent) -> SessionState {
    match event {
        SessionEvent::SocketOpen | SessionEvent::AuthOk | SessionEvent::AssistantMessage => {
            SessionState::Idle
        }
        SessionEvent::UserMessageSent => SessionState::Think,
        SessionEvent::VoiceCaptureStart => SessionState::Listen,
        SessionEvent::VoiceTtsStart => SessionState::Speak,
        SessionEvent::ToolExecuteStart => SessionState::Run,
        SessionEvent::SocketError | SessionEvent::SocketClose => SessionState::Error,
    }
}

/// Reduce by wire name; unknown names keep `state`.
#[must_use]
pub fn reduce_named(state: SessionState, event: &str) -> SessionState {
    SessionEvent::parse(event).map_or(state, |event| reduce(state, event))
}
