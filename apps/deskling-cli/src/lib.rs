#![allow(clippy::print_stdout, clippy::print_stderr)]

//! Line-oriented terminal surface for the hub client.
//!
//! Plain lines are sent as chat messages; lines starting with `/` are local
//! commands. Session notifications are printed as they arrive.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use deskling_client::skins::{self, AppliedSkin};
use deskling_client::{
    HubClient, HubClientConfig, HubClientHandle, SessionEvent, SessionUpdate, Settings,
    SettingsStore, SpawnedHubClient, config::validate_hub_url,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "deskling")]
#[command(about = "Deskling desktop client for the local IPC hub")]
pub struct DesklingCli {
    /// Hub WebSocket URL. Overrides DESKLING_HUB_URL.
    #[arg(long)]
    pub hub_url: Option<String>,

    /// Shared hub token. Overrides DESKLING_IPC_TOKEN.
    #[arg(long)]
    pub token: Option<String>,

    /// Settings file. Defaults to the platform local data dir.
    #[arg(long)]
    pub settings_path: Option<PathBuf>,

    /// Apply and persist a skin before connecting.
    #[arg(long)]
    pub skin: Option<String>,
}

/// One line of user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputCommand {
    Say(String),
    Approve,
    Reject,
    Status,
    Skin(String),
    Settings,
    Signal(SessionEvent),
    Help,
    Quit,
    Empty,
    Unknown(String),
}

pub const HELP_TEXT: &str = "\
commands:
  <text>            send a chat message
  /approve          grant the pending tool plan
  /reject           discard the pending tool plan
  /status           show session and connection state
  /skin <id>        switch skin (default_skin, mint_wave, ember_dawn)
  /settings         show stored settings
  /signal <EVENT>   feed a local event, e.g. VOICE_CAPTURE_START
  /quit             disconnect and exit";

#[must_use]
pub fn parse_input(line: &str) -> InputCommand {
    let line = line.trim();
    if line.is_empty() {
        return InputCommand::Empty;
    }
    let Some(command) = line.strip_prefix('/') else {
        return InputCommand::Say(line.to_string());
    };

    let (name, argument) = match command.split_once(char::is_whitespace) {
        Some((name, argument)) => (name, argument.trim()),
        None => (command, ""),
    };
    match (name, argument) {
        ("approve", "") => InputCommand::Approve,
        ("reject", "") => InputCommand::Reject,
        ("status", "") => InputCommand::Status,
        ("settings", "") => InputCommand::Settings,
        ("help", "") => InputCommand::Help,
        ("quit" | "exit", "") => InputCommand::Quit,
        ("skin", id) if !id.is_empty() => InputCommand::Skin(id.to_string()),
        ("signal", event) => SessionEvent::parse(event)
            .map_or_else(|| InputCommand::Unknown(line.to_string()), InputCommand::Signal),
        _ => InputCommand::Unknown(line.to_string()),
    }
}

#[must_use]
pub fn render_update(update: &SessionUpdate) -> String {
    match update {
        SessionUpdate::StateChanged(state) => format!("[state] {state}"),
        SessionUpdate::Status(status) => format!("[status] {}", status.as_str()),
        SessionUpdate::AssistantText { text, .. } => format!("assistant: {text}"),
        SessionUpdate::PlanSummary { summary, .. } => format!("plan: {summary}"),
        SessionUpdate::ConfirmationRequested(prompt) => {
            let mut rendered = format!("confirm tool plan ({}): {}", prompt.trace_id, prompt.summary);
            for tool in &prompt.tools {
                rendered.push_str("\n  - ");
                rendered.push_str(tool);
            }
            rendered.push_str("\n  /approve or /reject");
            rendered
        }
        SessionUpdate::ConfirmationClosed { trace_id, approved } => {
            let decision = if *approved { "approved" } else { "rejected" };
            format!("[confirm] {decision} ({trace_id})")
        }
        SessionUpdate::IpcError { code, message } => match message {
            Some(message) => format!("ipc error: {code} ({message})"),
            None => format!("ipc error: {code}"),
        },
        SessionUpdate::AuthRejected { message } => format!("auth error: {message}"),
        SessionUpdate::Notice(notice) => format!("[notice] {notice}"),
    }
}

#[must_use]
pub fn render_skin(skin: &AppliedSkin) -> String {
    let properties = skin
        .palette
        .properties()
        .iter()
        .map(|(name, value)| format!("{name}: {value}"))
        .collect::<Vec<_>>()
        .join("; ");
    format!("[skin] {} {{ {properties} }}", skin.id)
}

/// Environment config with command-line overrides applied.
pub fn build_config(cli: &DesklingCli) -> Result<HubClientConfig> {
    let mut config = HubClientConfig::from_env().context("invalid hub client environment")?;
    if let Some(hub_url) = cli.hub_url.as_deref() {
        validate_hub_url(hub_url).context("invalid --hub-url")?;
        config.hub_url = hub_url.trim().to_string();
    }
    if let Some(token) = cli.token.as_deref().map(str::trim).filter(|token| !token.is_empty()) {
        config.token = token.to_string();
    }
    Ok(config)
}

pub async fn run(cli: DesklingCli) -> Result<()> {
    let mut store = match cli.settings_path.clone() {
        Some(path) => SettingsStore::load(path),
        None => SettingsStore::load_default(),
    };
    if let Some(skin_id) = cli.skin.as_deref() {
        switch_skin(&mut store, skin_id).context("failed to save skin")?;
    }
    println!("{}", render_skin(&skins::apply(&store.settings().skin_id)));

    let config = build_config(&cli)?;
    info!(hub_url = %config.hub_url, settings = %store.path().display(), "starting deskling");
    let SpawnedHubClient {
        handle,
        mut updates,
        task,
    } = HubClient::new(config)
        .context("invalid hub client config")?
        .spawn();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            update = updates.recv() => match update {
                Some(update) => println!("{}", render_update(&update)),
                None => break,
            },
            line = lines.next_line() => {
                let Some(line) = line.context("failed to read stdin")? else {
                    break;
                };
                if !handle_input(parse_input(&line), &handle, &mut store).await {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    handle.shutdown();
    task.await.context("hub client task failed")?;
    Ok(())
}

/// Act on one input line; false once the user asked to quit.
async fn handle_input(
    command: InputCommand,
    handle: &HubClientHandle,
    store: &mut SettingsStore,
) -> bool {
    match command {
        InputCommand::Say(text) => match handle.send_user_message(text).await {
            Ok(trace_id) => info!(trace_id = %trace_id, "chat message sent"),
            Err(error) => eprintln!("{error}"),
        },
        InputCommand::Approve => {
            if let Err(error) = handle.approve_pending_plan().await {
                eprintln!("{error}");
            }
        }
        InputCommand::Reject => {
            if let Err(error) = handle.reject_pending_plan().await {
                eprintln!("{error}");
            }
        }
        InputCommand::Status => match handle.snapshot().await {
            Ok(snapshot) => println!(
                "state={} authenticated={} connection={} reconnects={} pending={}",
                snapshot.session_state,
                snapshot.authenticated,
                snapshot.lifecycle.phase.as_str(),
                snapshot.lifecycle.reconnect_attempts,
                snapshot.pending_trace_id.as_deref().unwrap_or("none"),
            ),
            Err(error) => eprintln!("{error}"),
        },
        InputCommand::Skin(skin_id) => match switch_skin(store, &skin_id) {
            Ok(skin) => println!("{}", render_skin(&skin)),
            Err(error) => eprintln!("failed to save skin: {error:#}"),
        },
        InputCommand::Settings => match store.settings().serialize() {
            Ok(encoded) => println!("{encoded}"),
            Err(error) => eprintln!("{error}"),
        },
        InputCommand::Signal(event) => {
            if let Err(error) = handle.signal(event) {
                eprintln!("{error}");
            }
        }
        InputCommand::Help => println!("{HELP_TEXT}"),
        InputCommand::Quit => return false,
        InputCommand::Empty => {}
        InputCommand::Unknown(line) => eprintln!("unknown command: {line} (try /help)"),
    }
    true
}

fn switch_skin(store: &mut SettingsStore, skin_id: &str) -> Result<AppliedSkin> {
    let settings = Settings {
        skin_id: skin_id.to_string(),
        ..store.settings().clone()
    };
    let saved = store.save(settings)?;
    Ok(skins::apply(&saved.skin_id))
}
