//! Connection lifecycle bookkeeping for the hub client.
//!
//! Pure state: the connection task reports transitions here and reads back
//! the reconnect delay and whether the heartbeat may run.

use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionPhase {
    Closed,
    Connecting,
    /// Transport open, `auth.hello` sent, awaiting `auth.ok`.
    Open,
    Ready,
}

impl ConnectionPhase {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Closed => "closed",
            Self::Connecting => "connecting",
            Self::Open => "open",
            Self::Ready => "ready",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectReason {
    AuthRejected,
    TransportError,
    StreamClosed,
    ConnectFailed,
}

impl DisconnectReason {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AuthRejected => "auth_rejected",
            Self::TransportError => "transport_error",
            Self::StreamClosed => "stream_closed",
            Self::ConnectFailed => "connect_failed",
        }
    }

    /// Whether the session should report an error rather than a plain close.
    #[must_use]
    pub fn is_error(self) -> bool {
        !matches!(self, Self::StreamClosed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecycleSnapshot {
    pub phase: ConnectionPhase,
    pub connect_attempts: u32,
    pub reconnect_attempts: u32,
    pub next_retry_ms: Option<u64>,
    pub last_disconnect_reason: Option<DisconnectReason>,
    pub last_error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPlan {
    pub delay: Duration,
}

#[derive(Debug, Clone)]
pub struct ConnectionLifecycle {
    reconnect_delay: Duration,
    phase: ConnectionPhase,
    connect_attempts: u32,
    reconnect_attempts: u32,
    next_retry_ms: Option<u64>,
    last_disconnect_reason: Option<DisconnectReason>,
    last_error: Option<String>,
}

impl ConnectionLifecycle {
    #[must_use]
    pub fn new(reconnect_delay: Duration) -> Self {
        Self {
            reconnect_delay,
            phase: ConnectionPhase::Closed,
            connect_attempts: 0,
            reconnect_attempts: 0,
            next_retry_ms: None,
            last_disconnect_reason: None,
            last_error: None,
        }
    }

    #[must_use]
    pub fn phase(&self) -> ConnectionPhase {
        self.phase
    }

    pub fn mark_connecting(&mut self) {
        self.phase = ConnectionPhase::Connecting;
        self.connect_attempts = self.connect_attempts.saturating_add(1);
        self.next_retry_ms = None;
    }

    pub fn mark_open(&mut self) {
        self.phase = ConnectionPhase::Open;
    }

    /// Returns false when no unauthenticated transport is open.
    pub fn mark_ready(&mut self) -> bool {
        if self.phase != ConnectionPhase::Open {
            return false;
        }
        self.phase = ConnectionPhase::Ready;
        self.last_error = None;
        true
    }

    #[must_use]
    pub fn mark_disconnect(
        &mut self,
        reason: DisconnectReason,
        error: Option<String>,
    ) -> ReconnectPlan {
        let delay_ms = u64::try_from(self.reconnect_delay.as_millis()).unwrap_or(u64::MAX);
        self.phase = ConnectionPhase::Closed;
        self.reconnect_attempts = self.reconnect_attempts.saturating_add(1);
        self.last_disconnect_reason = Some(reason);
        self.last_error = error;
        self.next_retry_ms = Some(delay_ms);
        ReconnectPlan {
            delay: self.reconnect_delay,
        }
    }

    /// Final close on shutdown; no retry is scheduled.
    pub fn mark_stopped(&mut self) {
        self.phase = ConnectionPhase::Closed;
        self.next_retry_ms = None;
    }

    /// The heartbeat runs only while authenticated.
    #[must_use]
    pub fn heartbeat_armed(&self) -> bool {
        self.phase == ConnectionPhase::Ready
    }

    #[must_use]
    pub fn snapshot(&self) -> LifecycleSnapshot {
        LifecycleSnapshot {
            phase: self.phase,
            connect_attempts: self.connect_attempts,
            reconnect_attempts: self.reconnect_attempts,
            next_retry_ms: self.next_retry_ms,
            last_disconnect_reason: self.last_disconnect_reason,
            last_error: self.last_error.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::{ConnectionLifecycle, ConnectionPhase, DisconnectReason};

    #[test]
    fn lifecycle_walks_closed_to_ready() {
        let mut lifecycle = ConnectionLifecycle::new(Duration::from_millis(1_500));
        assert_eq!(lifecycle.phase(), ConnectionPhase::Closed);
        assert!(!lifecycle.mark_ready());

        lifecycle.mark_connecting();
        lifecycle.mark_open();
        assert!(!lifecycle.heartbeat_armed());
        assert!(lifecycle.mark_ready());
        assert!(lifecycle.heartbeat_armed());

        let snapshot = lifecycle.snapshot();
        assert_eq!(snapshot.phase, ConnectionPhase::Ready);
        assert_eq!(snapshot.connect_attempts, 1);
        assert_eq!(snapshot.reconnect_attempts, 0);
    }

    #[test]
    fn every_disconnect_schedules_fixed_delay() {
        let mut lifecycle = ConnectionLifecycle::new(Duration::from_millis(1_500));
        for reason in [
            DisconnectReason::AuthRejected,
            DisconnectReason::TransportError,
            DisconnectReason::StreamClosed,
            DisconnectReason::ConnectFailed,
        ] {
            lifecycle.mark_connecting();
            let plan = lifecycle.mark_disconnect(reason, Some(reason.as_str().to_string()));
            assert_eq!(plan.delay, Duration::from_millis(1_500));
            assert!(!lifecycle.heartbeat_armed());
        }

        let snapshot = lifecycle.snapshot();
        assert_eq!(snapshot.phase, ConnectionPhase::Closed);
        assert_eq!(snapshot.connect_attempts, 4);
        assert_eq!(snapshot.reconnect_attempts, 4);
        assert_eq!(snapshot.next_retry_ms, Some(1_500));
        assert_eq!(snapshot.last_disconnect_reason, Some(DisconnectReason::ConnectFailed));
        assert_eq!(snapshot.last_error.as_deref(), Some("connect_failed"));
    }

    #[test]
    fn stop_clears_pending_retry() {
        let mut lifecycle = ConnectionLifecycle::new(Duration::from_millis(10));
        lifecycle.mark_connecting();
        let _ = lifecycle.mark_disconnect(DisconnectReason::StreamClosed, None);
        lifecycle.mark_stopped();
        assert_eq!(lifecycle.snapshot().next_retry_ms, None);
        assert!(!DisconnectReason::StreamClosed.is_error());
        assert!(DisconnectReason::AuthRejected.is_error());
    }
}
