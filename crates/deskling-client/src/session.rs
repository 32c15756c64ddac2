//! Per-process session context owned by the connection task.

use deskling_proto::AssistantPlan;

use crate::session_state::{SessionEvent, SessionState, reduce};
use crate::update::{SessionUpdate, UpdateSink};

/// A plan held until the user approves or rejects it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingPlan {
    pub plan: AssistantPlan,
    /// Trace of the plan; the grant reuses it.
    pub trace_id: String,
    /// Id of the `chat.assistant_plan` envelope; the grant replies to it.
    pub envelope_id: String,
}

#[derive(Debug, Default)]
pub struct SessionContext {
    state: SessionState,
    authenticated: bool,
    session_token: Option<String>,
    pending_plan: Option<PendingPlan>,
}

impl SessionContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    #[must_use]
    pub fn session_token(&self) -> Option<&str> {
        self.session_token.as_deref()
    }

    #[must_use]
    pub fn pending_plan(&self) -> Option<&PendingPlan> {
        self.pending_plan.as_ref()
    }

    /// Reduce `event` and publish the new state when it changed.
    pub fn apply(&mut self, event: SessionEvent, sink: &mut impl UpdateSink) -> SessionState {
        let next = reduce(self.state, event);
        if next != self.state {
            self.state = next;
            sink.publish(SessionUpdate::StateChanged(next));
        }
        self.state
    }

    pub fn mark_authenticated(&mut self, session_token: Option<String>) {
        self.authenticated = true;
        self.session_token = session_token;
    }

    /// Clears authentication; a pending plan survives reconnects.
    pub fn mark_disconnected(&mut self) {
        self.authenticated = false;
        self.session_token = None;
    }

    /// Hold `plan` as pending, replacing any earlier one.
    pub fn hold_plan(&mut self, plan: PendingPlan) -> Option<PendingPlan> {
        self.pending_plan.replace(plan)
    }

    pub fn take_pending_plan(&mut self) -> Option<PendingPlan> {
        self.pending_plan.take()
    }
}

#[cfg(test)]
mod tests {
    use deskling_proto::AssistantPlan;

    use super::{PendingPlan, SessionContext};
    use crate::session_state::{SessionEvent, SessionState};
    use crate::update::SessionUpdate;

    fn pending(trace_id: &str) -> PendingPlan {
        PendingPlan {
            plan: AssistantPlan::default(),
            trace_id: trace_id.to_string(),
            envelope_id: format!("env-{trace_id}"),
        }
    }

    #[test]
    fn apply_publishes_only_real_transitions() {
        let mut context = SessionContext::new();
        let mut updates: Vec<SessionUpdate> = Vec::new();
        assert_eq!(context.state(), SessionState::Error);

        context.apply(SessionEvent::SocketOpen, &mut updates);
        context.apply(SessionEvent::AuthOk, &mut updates);
        context.apply(SessionEvent::UserMessageSent, &mut updates);

        assert_eq!(
            updates,
            [
                SessionUpdate::StateChanged(SessionState::Idle),
                SessionUpdate::StateChanged(SessionState::Think),
            ]
        );
    }

    #[test]
    fn last_plan_wins() {
        let mut context = SessionContext::new();
        assert!(context.hold_plan(pending("first")).is_none());
        let replaced = context.hold_plan(pending("second"));
        assert_eq!(replaced.map(|plan| plan.trace_id), Some("first".to_string()));
        assert_eq!(
            context.pending_plan().map(|plan| plan.trace_id.as_str()),
            Some("second")
        );
    }

    #[test]
    fn disconnect_clears_auth_but_keeps_plan() {
        let mut context = SessionContext::new();
        context.mark_authenticated(Some("sess-1".to_string()));
        context.hold_plan(pending("t"));
        assert!(context.is_authenticated());
        assert_eq!(context.session_token(), Some("sess-1"));

        context.mark_disconnected();
        assert!(!context.is_authenticated());
        assert!(context.session_token().is_none());
        assert!(context.pending_plan().is_some());
        assert!(context.take_pending_plan().is_some());
        assert!(context.pending_plan().is_none());
    }
}
