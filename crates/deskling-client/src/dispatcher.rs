//! Inbound envelope dispatch.
//!
//! Dispatch never touches the transport. It mutates the [`SessionContext`],
//! publishes renderer notifications, and reports an outcome the connection
//! task uses to drive its lifecycle.

use deskling_proto::{
    AssistantPlan, AuthErrorPayload, AuthOkPayload, Envelope, IpcErrorPayload, Topic,
};
use tracing::{debug, warn};

use crate::confirm_policy::{describe_tool, requires_confirmation};
use crate::session::{PendingPlan, SessionContext};
use crate::session_state::{SessionEvent, SessionState};
use crate::update::{ConfirmationPrompt, ConnectionStatus, SessionUpdate, UpdateSink};

pub const AUTH_SUCCESS_NOTICE: &str = "ipc-hub auth successful";
pub const EMPTY_REPLY_TEXT: &str = "[empty reply]";
pub const DEFAULT_PLAN_SUMMARY: &str = "assistant proposed a tool plan";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    Authenticated,
    AuthRejected { message: String },
    Handled,
    Ignored,
}

/// Transport-level changes observed by the connection task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportEvent {
    Opened,
    Closed { error: bool },
}

pub fn on_envelope(
    context: &mut SessionContext,
    envelope: &Envelope,
    sink: &mut impl UpdateSink,
) -> DispatchOutcome {
    debug!(
        topic = %envelope.topic,
        trace_id = %envelope.trace_id,
        from = %envelope.from,
        "dispatching envelope"
    );

    match &envelope.topic {
        Topic::AuthOk => {
            let payload = AuthOkPayload::from_payload(&envelope.payload);
            context.mark_authenticated(payload.session_token);
            context.apply(SessionEvent::AuthOk, sink);
            sink.publish(SessionUpdate::Status(ConnectionStatus::Connected));
            sink.publish(SessionUpdate::Notice(AUTH_SUCCESS_NOTICE.to_string()));
            DispatchOutcome::Authenticated
        }
        Topic::AuthError => {
            let payload = AuthErrorPayload::from_payload(&envelope.payload);
            warn!(
                trace_id = %envelope.trace_id,
                code = payload.code.as_deref().unwrap_or("unknown"),
                "hub rejected authentication"
            );
            sink.publish(SessionUpdate::AuthRejected {
                message: payload.message.clone(),
            });
            DispatchOutcome::AuthRejected {
                message: payload.message,
            }
        }
        Topic::ChatAssistantMessage => {
            let text = envelope
                .payload_str("text")
                .unwrap_or(EMPTY_REPLY_TEXT)
                .to_string();
            sink.publish(SessionUpdate::AssistantText {
                trace_id: envelope.trace_id.clone(),
                text,
            });
            context.apply(SessionEvent::AssistantMessage, sink);
            DispatchOutcome::Handled
        }
        Topic::ChatAssistantPlan => {
            on_plan(context, envelope, sink);
            DispatchOutcome::Handled
        }
        Topic::IpcError => {
            let payload = IpcErrorPayload::from_payload(&envelope.payload);
            warn!(trace_id = %envelope.trace_id, code = %payload.code, "ipc error from hub");
            sink.publish(SessionUpdate::IpcError {
                code: payload.code,
                message: payload.message,
            });
            DispatchOutcome::Handled
        }
        _ => DispatchOutcome::Ignored,
    }
}

fn on_plan(context: &mut SessionContext, envelope: &Envelope, sink: &mut impl UpdateSink) {
    let plan = AssistantPlan::from_payload(&envelope.payload);
    let summary = plan
        .summary
        .clone()
        .unwrap_or_else(|| DEFAULT_PLAN_SUMMARY.to_string());
    sink.publish(SessionUpdate::PlanSummary {
        trace_id: envelope.trace_id.clone(),
        summary: summary.clone(),
    });

    if !requires_confirmation(Some(&plan)) {
        return;
    }

    let prompt = ConfirmationPrompt {
        trace_id: envelope.trace_id.clone(),
        summary,
        tools: plan.tools().iter().map(describe_tool).collect(),
    };
    let replaced = context.hold_plan(PendingPlan {
        plan,
        trace_id: envelope.trace_id.clone(),
        envelope_id: envelope.id.clone(),
    });
    if let Some(replaced) = replaced {
        debug!(
            trace_id = %replaced.trace_id,
            "pending plan superseded by trace {}",
            envelope.trace_id
        );
    }
    sink.publish(SessionUpdate::ConfirmationRequested(prompt));
}

pub fn on_transport_event(
    context: &mut SessionContext,
    event: TransportEvent,
    sink: &mut impl UpdateSink,
) -> SessionState {
    match event {
        TransportEvent::Opened => {
            let state = context.apply(SessionEvent::SocketOpen, sink);
            sink.publish(SessionUpdate::Status(ConnectionStatus::Authenticating));
            state
        }
        TransportEvent::Closed { error } => {
            context.mark_disconnected();
            let (event, status) = if error {
                (SessionEvent::SocketError, ConnectionStatus::Error)
            } else {
                (SessionEvent::SocketClose, ConnectionStatus::Disconnected)
            };
            let state = context.apply(event, sink);
            sink.publish(SessionUpdate::Status(status));
            state
        }
    }
}

/// Events raised by the local UI rather than the hub, e.g. voice capture.
pub fn on_local_event(
    context: &mut SessionContext,
    event: SessionEvent,
    sink: &mut impl UpdateSink,
) -> SessionState {
    context.apply(event, sink)
}
