//! Hub connection manager.
//!
//! One tokio task owns the WebSocket, the [`SessionContext`], the lifecycle
//! and both timers. Renderers talk to it through a cloneable
//! [`HubClientHandle`] and observe it through the update channel returned by
//! [`HubClient::spawn`].
//!
//! The task connects, sends `auth.hello`, waits for `auth.ok`, heartbeats
//! while ready, and reconnects after a fixed delay on any close or fault.
//! It stops on [`HubClientHandle::shutdown`] or once every handle is dropped.

use std::time::Duration;

use deskling_proto::{Envelope, EnvelopeFactory, decode, encode};
use futures::stream::SplitSink;
use futures::{Sink, SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior, interval_at, timeout};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info, warn};
use url::Url;

use crate::actions;
use crate::config::{HubClientConfig, validate_hub_url};
use crate::dispatcher::{self, DispatchOutcome, TransportEvent};
use crate::error::{ClientError, Result};
use crate::lifecycle::{ConnectionLifecycle, DisconnectReason, LifecycleSnapshot};
use crate::session::SessionContext;
use crate::session_state::{SessionEvent, SessionState};
use crate::update::{ConnectionStatus, SessionUpdate, UpdateSink};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsWriter = SplitSink<WsStream, Message>;

/// Point-in-time view of the client task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSnapshot {
    pub session_state: SessionState,
    pub authenticated: bool,
    pub pending_trace_id: Option<String>,
    pub lifecycle: LifecycleSnapshot,
}

enum ClientCommand {
    SendUserMessage {
        text: String,
        reply: oneshot::Sender<Result<String>>,
    },
    ApprovePlan {
        reply: oneshot::Sender<Result<String>>,
    },
    RejectPlan {
        reply: oneshot::Sender<Result<String>>,
    },
    Signal(SessionEvent),
    Snapshot {
        reply: oneshot::Sender<ClientSnapshot>,
    },
    Shutdown,
}

/// Cloneable control surface for a running client task.
#[derive(Debug, Clone)]
pub struct HubClientHandle {
    commands: mpsc::UnboundedSender<ClientCommand>,
}

impl HubClientHandle {
    /// Send a chat message; resolves to its trace id once written.
    pub async fn send_user_message(&self, text: impl Into<String>) -> Result<String> {
        let text = text.into();
        self.request(|reply| ClientCommand::SendUserMessage { text, reply })
            .await?
    }

    /// Grant the pending plan; resolves to the plan's trace id.
    pub async fn approve_pending_plan(&self) -> Result<String> {
        self.request(|reply| ClientCommand::ApprovePlan { reply })
            .await?
    }

    /// Discard the pending plan locally; resolves to the plan's trace id.
    pub async fn reject_pending_plan(&self) -> Result<String> {
        self.request(|reply| ClientCommand::RejectPlan { reply })
            .await?
    }

    /// Feed a locally originated event, e.g. voice capture, to the reducer.
    pub fn signal(&self, event: SessionEvent) -> Result<()> {
        self.commands
            .send(ClientCommand::Signal(event))
            .map_err(|_| ClientError::Stopped)
    }

    pub async fn snapshot(&self) -> Result<ClientSnapshot> {
        self.request(|reply| ClientCommand::Snapshot { reply }).await
    }

    /// Ask the task to close the transport and stop. Idempotent.
    pub fn shutdown(&self) {
        let _ = self.commands.send(ClientCommand::Shutdown);
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> ClientCommand,
    ) -> Result<T> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.commands
            .send(command(reply_tx))
            .map_err(|_| ClientError::Stopped)?;
        reply_rx.await.map_err(|_| ClientError::Stopped)
    }
}

/// A running client: its handle, update stream and task.
pub struct SpawnedHubClient {
    pub handle: HubClientHandle,
    pub updates: mpsc::UnboundedReceiver<SessionUpdate>,
    pub task: JoinHandle<()>,
}

impl SpawnedHubClient {
    /// Stop the task and wait for it to finish.
    pub async fn shutdown(self) -> Result<()> {
        self.handle.shutdown();
        self.task.await.map_err(|_| ClientError::Stopped)
    }
}

#[derive(Debug, Clone)]
pub struct HubClient {
    config: HubClientConfig,
    url: Url,
}

impl HubClient {
    pub fn new(config: HubClientConfig) -> Result<Self> {
        let url = validate_hub_url(&config.hub_url)?;
        Ok(Self { config, url })
    }

    #[must_use]
    pub fn config(&self) -> &HubClientConfig {
        &self.config
    }

    /// Start the connection task on the current tokio runtime.
    #[must_use]
    pub fn spawn(self) -> SpawnedHubClient {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        let task = ClientTask {
            factory: EnvelopeFactory::new(self.config.endpoint.clone()),
            lifecycle: ConnectionLifecycle::new(self.config.reconnect_delay),
            context: SessionContext::new(),
            config: self.config,
            url: self.url,
            commands: command_rx,
            updates: update_tx,
        };
        SpawnedHubClient {
            handle: HubClientHandle {
                commands: command_tx,
            },
            updates: update_rx,
            task: tokio::spawn(task.run()),
        }
    }
}

enum SessionEnd {
    Disconnected {
        reason: DisconnectReason,
        error: Option<String>,
    },
    Stop,
}

#[derive(Debug, PartialEq, Eq)]
enum CommandFlow {
    Continue,
    TransportFailed(String),
    Stop,
}

struct ClientTask {
    config: HubClientConfig,
    url: Url,
    factory: EnvelopeFactory,
    context: SessionContext,
    lifecycle: ConnectionLifecycle,
    commands: mpsc::UnboundedReceiver<ClientCommand>,
    updates: mpsc::UnboundedSender<SessionUpdate>,
}

impl ClientTask {
    async fn run(mut self) {
        info!(hub_url = %self.url, endpoint = self.factory.endpoint(), "hub client started");
        loop {
            match self.run_connection().await {
                SessionEnd::Stop => break,
                SessionEnd::Disconnected { reason, error } => {
                    let plan = self.lifecycle.mark_disconnect(reason, error);
                    self.updates.publish(SessionUpdate::Notice(format!(
                        "connection closed, retrying in {:.1}s",
                        plan.delay.as_secs_f64()
                    )));
                    if !self.wait_for_retry(plan.delay).await {
                        break;
                    }
                }
            }
        }
        self.lifecycle.mark_stopped();
        info!(hub_url = %self.url, "hub client stopped");
    }

    /// One connect-authenticate-serve cycle.
    async fn run_connection(&mut self) -> SessionEnd {
        self.lifecycle.mark_connecting();
        self.updates
            .publish(SessionUpdate::Status(ConnectionStatus::Connecting));
        info!(
            hub_url = %self.url,
            attempt = self.lifecycle.snapshot().connect_attempts,
            "connecting to hub"
        );

        let connect_timeout = self.config.connect_timeout;
        let hub_url = self.url.to_string();
        let connect = timeout(connect_timeout, connect_async(hub_url.as_str()));
        tokio::pin!(connect);
        let stream = loop {
            tokio::select! {
                result = &mut connect => match result {
                    Ok(Ok((stream, _response))) => break stream,
                    Ok(Err(error)) => {
                        return self.close_transport(DisconnectReason::ConnectFailed, Some(error.to_string()));
                    }
                    Err(_) => {
                        return self.close_transport(
                            DisconnectReason::ConnectFailed,
                            Some(format!("connection timeout after {connect_timeout:?}")),
                        );
                    }
                },
                command = self.commands.recv() => {
                    let Some(command) = command else {
                        return SessionEnd::Stop;
                    };
                    if let CommandFlow::Stop = self.handle_command(command, None).await {
                        return SessionEnd::Stop;
                    }
                }
            }
        };

        let (mut writer, mut reader) = stream.split();
        self.lifecycle.mark_open();
        dispatcher::on_transport_event(&mut self.context, TransportEvent::Opened, &mut self.updates);

        let hello = actions::hello_envelope(&self.factory, &self.config);
        let sent = match hello {
            Ok(hello) => send_envelope(&mut writer, &hello).await.map(|()| hello.trace_id),
            Err(error) => Err(error),
        };
        match sent {
            Ok(trace_id) => info!(trace_id = %trace_id, "sent auth.hello"),
            Err(error) => {
                return self.close_transport(DisconnectReason::TransportError, Some(error.to_string()));
            }
        }

        let period = self.config.heartbeat_interval;
        let mut heartbeat = interval_at(Instant::now() + period, period);
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                frame = reader.next() => match frame {
                    Some(Ok(Message::Text(text))) => {
                        if let Some(end) = self.on_text_frame(text.as_str(), &mut writer, &mut heartbeat).await {
                            return end;
                        }
                    }
                    Some(Ok(Message::Close(frame))) => {
                        let reason = frame.map(|frame| frame.reason.to_string());
                        return self.close_transport(DisconnectReason::StreamClosed, reason);
                    }
                    Some(Ok(Message::Ping(payload))) => {
                        debug!("received ping from hub ({} bytes)", payload.len());
                    }
                    Some(Ok(_)) => {}
                    Some(Err(error)) => {
                        return self.close_transport(DisconnectReason::TransportError, Some(error.to_string()));
                    }
                    None => return self.close_transport(DisconnectReason::StreamClosed, None),
                },
                _ = heartbeat.tick(), if self.lifecycle.heartbeat_armed() => {
                    if let Err(error) = self.send_heartbeat(&mut writer).await {
                        return self.close_transport(DisconnectReason::TransportError, Some(error.to_string()));
                    }
                }
                command = self.commands.recv() => {
                    let Some(command) = command else {
                        close_writer(&mut writer).await;
                        return SessionEnd::Stop;
                    };
                    match self.handle_command(command, Some(&mut writer)).await {
                        CommandFlow::Continue => {}
                        CommandFlow::TransportFailed(error) => {
                            return self.close_transport(DisconnectReason::TransportError, Some(error));
                        }
                        CommandFlow::Stop => {
                            close_writer(&mut writer).await;
                            return SessionEnd::Stop;
                        }
                    }
                }
            }
        }
    }

    async fn on_text_frame(
        &mut self,
        text: &str,
        writer: &mut WsWriter,
        heartbeat: &mut Interval,
    ) -> Option<SessionEnd> {
        let envelope = match decode(text) {
            Ok(envelope) => envelope,
            Err(error) => {
                warn!(%error, "dropping malformed envelope");
                return None;
            }
        };

        match dispatcher::on_envelope(&mut self.context, &envelope, &mut self.updates) {
            DispatchOutcome::Authenticated => {
                if self.lifecycle.mark_ready() {
                    heartbeat.reset();
                    info!(trace_id = %envelope.trace_id, "hub session ready");
                }
                None
            }
            DispatchOutcome::AuthRejected { message } => {
                close_writer(writer).await;
                Some(self.close_transport(DisconnectReason::AuthRejected, Some(message)))
            }
            DispatchOutcome::Handled | DispatchOutcome::Ignored => None,
        }
    }

    async fn send_heartbeat(&self, writer: &mut WsWriter) -> Result<()> {
        let ping = actions::heartbeat_envelope(&self.factory)?;
        send_envelope(writer, &ping).await?;
        debug!(trace_id = %ping.trace_id, "sent hb.ping");
        Ok(())
    }

    /// Sleep out the reconnect delay; false when the task should stop.
    async fn wait_for_retry(&mut self, delay: Duration) -> bool {
        let sleep = tokio::time::sleep(delay);
        tokio::pin!(sleep);
        loop {
            tokio::select! {
                () = &mut sleep => return true,
                command = self.commands.recv() => {
                    let Some(command) = command else {
                        return false;
                    };
                    if let CommandFlow::Stop = self.handle_command(command, None).await {
                        return false;
                    }
                }
            }
        }
    }

    async fn handle_command(
        &mut self,
        command: ClientCommand,
        writer: Option<&mut WsWriter>,
    ) -> CommandFlow {
        match command {
            ClientCommand::SendUserMessage { text, reply } => {
                let encoded = actions::encode_user_message(
                    &self.factory,
                    &mut self.context,
                    &text,
                    &mut self.updates,
                );
                let (result, flow) = transmit(encoded, writer).await;
                let _ = reply.send(result);
                flow
            }
            ClientCommand::ApprovePlan { reply } => {
                let (result, flow) =
                    approve_plan(&self.factory, &mut self.context, &mut self.updates, writer).await;
                let _ = reply.send(result);
                flow
            }
            ClientCommand::RejectPlan { reply } => {
                let result = actions::reject_pending_plan(&mut self.context, &mut self.updates)
                    .map(|plan| plan.trace_id);
                let _ = reply.send(result);
                CommandFlow::Continue
            }
            ClientCommand::Signal(event) => {
                dispatcher::on_local_event(&mut self.context, event, &mut self.updates);
                CommandFlow::Continue
            }
            ClientCommand::Snapshot { reply } => {
                let _ = reply.send(self.snapshot());
                CommandFlow::Continue
            }
            ClientCommand::Shutdown => CommandFlow::Stop,
        }
    }

    fn close_transport(&mut self, reason: DisconnectReason, error: Option<String>) -> SessionEnd {
        warn!(
            reason = reason.as_str(),
            error = error.as_deref().unwrap_or("none"),
            "hub connection closed"
        );
        dispatcher::on_transport_event(
            &mut self.context,
            TransportEvent::Closed {
                error: reason.is_error(),
            },
            &mut self.updates,
        );
        SessionEnd::Disconnected { reason, error }
    }

    fn snapshot(&self) -> ClientSnapshot {
        ClientSnapshot {
            session_state: self.context.state(),
            authenticated: self.context.is_authenticated(),
            pending_trace_id: self
                .context
                .pending_plan()
                .map(|plan| plan.trace_id.clone()),
            lifecycle: self.lifecycle.snapshot(),
        }
    }
}

/// Write the grant for the pending plan; the plan is only consumed once the
/// frame is on the wire.
async fn approve_plan<S>(
    factory: &EnvelopeFactory,
    context: &mut SessionContext,
    updates: &mut impl UpdateSink,
    writer: Option<&mut S>,
) -> (Result<String>, CommandFlow)
where
    S: Sink<Message> + Unpin,
    S::Error: std::fmt::Display,
{
    let encoded = actions::encode_confirm_grant(factory, context);
    let (sent, flow) = transmit(encoded, writer).await;
    let result = sent.and_then(|trace_id| {
        actions::commit_confirm_grant(context, updates).map(|_| trace_id)
    });
    (result, flow)
}

/// Write an encoded envelope, resolving to its trace id.
async fn transmit<S>(
    encoded: Result<Envelope>,
    writer: Option<&mut S>,
) -> (Result<String>, CommandFlow)
where
    S: Sink<Message> + Unpin,
    S::Error: std::fmt::Display,
{
    let envelope = match encoded {
        Ok(envelope) => envelope,
        Err(error) => {
            debug!(%error, "outbound action rejected");
            return (Err(error), CommandFlow::Continue);
        }
    };
    let Some(writer) = writer else {
        return (Err(ClientError::NotReady), CommandFlow::Continue);
    };

    match send_envelope(writer, &envelope).await {
        Ok(()) => {
            debug!(topic = %envelope.topic, trace_id = %envelope.trace_id, "sent envelope");
            (Ok(envelope.trace_id), CommandFlow::Continue)
        }
        Err(error) => {
            let message = error.to_string();
            (Err(error), CommandFlow::TransportFailed(message))
        }
    }
}

async fn send_envelope<S>(writer: &mut S, envelope: &Envelope) -> Result<()>
where
    S: Sink<Message> + Unpin,
    S::Error: std::fmt::Display,
{
    let text = encode(envelope)?;
    writer
        .send(Message::Text(text.into()))
        .await
        .map_err(|error| ClientError::Transport(error.to_string()))
}

async fn close_writer(writer: &mut WsWriter) {
    if let Err(error) = writer.send(Message::Close(None)).await {
        debug!(%error, "close frame not delivered");
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use deskling_proto::{AssistantPlan, EnvelopeFactory, PlanTool, Topic, decode};
    use futures::StreamExt;
    use tokio_tungstenite::tungstenite::Message;

    use super::{CommandFlow, HubClient, approve_plan};
    use crate::config::HubClientConfig;
    use crate::error::ClientError;
    use crate::lifecycle::ConnectionPhase;
    use crate::session::{PendingPlan, SessionContext};
    use crate::session_state::{SessionEvent, SessionState};
    use crate::update::SessionUpdate;

    fn context_with_plan() -> SessionContext {
        let mut context = SessionContext::new();
        context.mark_authenticated(None);
        context.hold_plan(PendingPlan {
            plan: AssistantPlan {
                summary: Some("delete files".to_string()),
                proposed_tools: Some(vec![PlanTool {
                    name: Some("files.delete".to_string()),
                    risk: Some("high".to_string()),
                }]),
            },
            trace_id: "plan-trace".to_string(),
            envelope_id: "plan-envelope".to_string(),
        });
        context
    }

    #[tokio::test]
    async fn failed_grant_write_keeps_plan_pending() {
        let factory = EnvelopeFactory::new("desktop-ui");
        let mut context = context_with_plan();
        let mut updates: Vec<SessionUpdate> = Vec::new();
        let (mut writer, reader) = futures::channel::mpsc::unbounded::<Message>();
        drop(reader);

        let (result, flow) =
            approve_plan(&factory, &mut context, &mut updates, Some(&mut writer)).await;

        assert!(matches!(result, Err(ClientError::Transport(_))));
        assert!(matches!(flow, CommandFlow::TransportFailed(_)));
        assert_eq!(
            context.pending_plan().map(|plan| plan.trace_id.as_str()),
            Some("plan-trace")
        );
        assert_eq!(context.state(), SessionState::Error);
        assert!(updates.is_empty());
    }

    #[tokio::test]
    async fn grant_without_writer_keeps_plan_pending() {
        let factory = EnvelopeFactory::new("desktop-ui");
        let mut context = context_with_plan();
        let mut updates: Vec<SessionUpdate> = Vec::new();

        let writer: Option<&mut futures::channel::mpsc::UnboundedSender<Message>> = None;

        let (result, flow) = approve_plan(&factory, &mut context, &mut updates, writer).await;

        assert!(matches!(result, Err(ClientError::NotReady)));
        assert_eq!(flow, CommandFlow::Continue);
        assert!(context.pending_plan().is_some());
        assert!(updates.is_empty());
    }

    #[tokio::test]
    async fn written_grant_consumes_plan() -> anyhow::Result<()> {
        let factory = EnvelopeFactory::new("desktop-ui");
        let mut context = context_with_plan();
        let mut updates: Vec<SessionUpdate> = Vec::new();
        let (mut writer, mut reader) = futures::channel::mpsc::unbounded::<Message>();

        let (result, flow) =
            approve_plan(&factory, &mut context, &mut updates, Some(&mut writer)).await;

        assert_eq!(result?, "plan-trace");
        assert_eq!(flow, CommandFlow::Continue);
        let Some(Message::Text(text)) = reader.next().await else {
            anyhow::bail!("grant frame missing");
        };
        let grant = decode(text.as_str())?;
        assert_eq!(grant.topic, Topic::ConfirmGrant);
        assert_eq!(grant.trace_id, "plan-trace");
        assert!(context.pending_plan().is_none());
        assert_eq!(context.state(), SessionState::Run);
        assert_eq!(updates.len(), 3);
        Ok(())
    }

    #[test]
    fn new_rejects_non_websocket_urls() {
        let config = HubClientConfig {
            hub_url: "http://127.0.0.1:17171/ws".to_string(),
            ..HubClientConfig::default()
        };
        assert!(matches!(HubClient::new(config), Err(ClientError::Config(_))));
    }

    #[tokio::test]
    async fn unreachable_hub_keeps_retrying_and_reports_not_ready() -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let address = listener.local_addr()?;
        drop(listener);

        let config = HubClientConfig {
            hub_url: format!("ws://{address}/ws"),
            reconnect_delay: Duration::from_millis(20),
            connect_timeout: Duration::from_millis(500),
            ..HubClientConfig::default()
        };
        let client = HubClient::new(config)?.spawn();

        let result = client.handle.send_user_message("hello").await;
        assert!(matches!(result, Err(ClientError::NotReady)));

        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        loop {
            let snapshot = client.handle.snapshot().await?;
            if snapshot.lifecycle.reconnect_attempts >= 2 {
                assert!(!snapshot.authenticated);
                assert_ne!(snapshot.lifecycle.phase, ConnectionPhase::Ready);
                break;
            }
            assert!(tokio::time::Instant::now() < deadline, "no reconnect observed");
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        let handle = client.handle.clone();
        client.shutdown().await?;
        assert!(matches!(handle.snapshot().await, Err(ClientError::Stopped)));
        Ok(())
    }

    #[tokio::test]
    async fn local_signal_moves_session_state() -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let address = listener.local_addr()?;
        drop(listener);

        let config = HubClientConfig {
            hub_url: format!("ws://{address}/ws"),
            reconnect_delay: Duration::from_secs(60),
            connect_timeout: Duration::from_millis(500),
            ..HubClientConfig::default()
        };
        let client = HubClient::new(config)?.spawn();

        // Wait for the first failure so the task sits in its retry delay.
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        while client.handle.snapshot().await?.lifecycle.reconnect_attempts == 0 {
            assert!(tokio::time::Instant::now() < deadline, "connect never failed");
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        client.handle.signal(SessionEvent::VoiceTtsStart)?;
        let snapshot = client.handle.snapshot().await?;
        assert_eq!(snapshot.session_state, SessionState::Speak);
        assert_eq!(snapshot.lifecycle.next_retry_ms, Some(60_000));
        client.shutdown().await?;
        Ok(())
    }
}
