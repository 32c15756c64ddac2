//! Outbound envelopes produced by user actions and the connection lifecycle.

use deskling_proto::endpoint::{AGENT_CORE, IPC_HUB};
use deskling_proto::{
    AuthHelloPayload, Envelope, EnvelopeFactory, HeartbeatPayload, MAX_TEXT_CHARS, TextPayload,
    Topic, new_trace_id,
};

use crate::config::HubClientConfig;
use crate::confirm_policy::build_confirm_grant;
use crate::error::{ClientError, Result};
use crate::session::{PendingPlan, SessionContext};
use crate::session_state::SessionEvent;
use crate::update::{SessionUpdate, UpdateSink};

pub const GRANTED_NOTICE: &str = "confirmation granted";
pub const REJECTED_NOTICE: &str = "confirmation rejected";

/// `auth.hello` declaring this client's identity and capabilities.
pub fn hello_envelope(factory: &EnvelopeFactory, config: &HubClientConfig) -> Result<Envelope> {
    let payload = serde_json::to_value(AuthHelloPayload {
        service: factory.endpoint().to_string(),
        service_name: factory.endpoint().to_string(),
        capabilities: config.capabilities.clone(),
        version: config.version.clone(),
        token: config.token.clone(),
    })?;
    Ok(factory.build(Topic::AuthHello, IPC_HUB, payload, &new_trace_id(), None))
}

pub fn heartbeat_envelope(factory: &EnvelopeFactory) -> Result<Envelope> {
    let payload = serde_json::to_value(HeartbeatPayload {
        source: factory.endpoint().to_string(),
    })?;
    Ok(factory.build(Topic::HeartbeatPing, IPC_HUB, payload, &new_trace_id(), None))
}

/// Encode a chat message under a fresh trace and move the session to `think`.
pub fn encode_user_message(
    factory: &EnvelopeFactory,
    context: &mut SessionContext,
    text: &str,
    sink: &mut impl UpdateSink,
) -> Result<Envelope> {
    let text = text.trim();
    if text.is_empty() {
        return Err(ClientError::EmptyMessage);
    }
    if text.chars().count() > MAX_TEXT_CHARS {
        return Err(ClientError::MessageTooLong { max: MAX_TEXT_CHARS });
    }
    if !context.is_authenticated() {
        return Err(ClientError::NotReady);
    }

    let payload = serde_json::to_value(TextPayload {
        text: text.to_string(),
    })?;
    let envelope = factory.build(Topic::ChatUserMessage, AGENT_CORE, payload, &new_trace_id(), None);
    context.apply(SessionEvent::UserMessageSent, sink);
    Ok(envelope)
}

/// Encode the grant for the pending plan, reusing its trace.
///
/// The plan stays pending; call [`commit_confirm_grant`] once the envelope has
/// been written. While not ready the plan is kept so it can be approved after
/// the next successful authentication.
pub fn encode_confirm_grant(factory: &EnvelopeFactory, context: &SessionContext) -> Result<Envelope> {
    let pending = context.pending_plan().ok_or(ClientError::NoPendingPlan)?;
    if !context.is_authenticated() {
        return Err(ClientError::NotReady);
    }

    let grant = build_confirm_grant(Some(&pending.plan), &pending.trace_id);
    Ok(factory.build(
        Topic::ConfirmGrant,
        AGENT_CORE,
        serde_json::to_value(grant)?,
        &pending.trace_id,
        Some(&pending.envelope_id),
    ))
}

/// Consume the pending plan after its grant reached the hub.
pub fn commit_confirm_grant(
    context: &mut SessionContext,
    sink: &mut impl UpdateSink,
) -> Result<PendingPlan> {
    let granted = take_plan(context)?;
    context.apply(SessionEvent::ToolExecuteStart, sink);
    sink.publish(SessionUpdate::ConfirmationClosed {
        trace_id: granted.trace_id.clone(),
        approved: true,
    });
    sink.publish(SessionUpdate::Notice(GRANTED_NOTICE.to_string()));
    Ok(granted)
}

/// Drop the pending plan locally; nothing is sent to the hub.
pub fn reject_pending_plan(
    context: &mut SessionContext,
    sink: &mut impl UpdateSink,
) -> Result<PendingPlan> {
    let rejected = take_plan(context)?;
    sink.publish(SessionUpdate::ConfirmationClosed {
        trace_id: rejected.trace_id.clone(),
        approved: false,
    });
    sink.publish(SessionUpdate::Notice(REJECTED_NOTICE.to_string()));
    Ok(rejected)
}

fn take_plan(context: &mut SessionContext) -> Result<PendingPlan> {
    context.take_pending_plan().ok_or(ClientError::NoPendingPlan)
}
