//! Logical endpoint names routed by the hub.

/// The desktop client itself.
pub const DESKTOP_UI: &str = "desktop-ui";
/// The routing hub; authentication and heartbeats are addressed here.
pub const IPC_HUB: &str = "ipc-hub";
/// The reasoning service that answers chat and executes granted tools.
pub const AGENT_CORE: &str = "agent-core";

/// Well-known local hub WebSocket endpoint.
pub const DEFAULT_HUB_URL: &str = "ws://127.0.0.1:17171/ws";
