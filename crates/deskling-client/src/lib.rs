//! Deskling desktop client core.
//!
//! This crate owns the client side of the hub protocol:
//! - a single connection task that authenticates, heartbeats and reconnects
//! - topic dispatch into an explicit session context
//! - the confirmation policy gating risky tool plans
//! - the session state reducer consumed by renderers
//!
//! Renderers observe the session through [`SessionUpdate`] notifications and
//! act on it through [`HubClientHandle`].

pub mod actions;
pub mod config;
pub mod confirm_policy;
pub mod connection;
pub mod dispatcher;
pub mod error;
pub mod lifecycle;
pub mod session;
pub mod session_state;
pub mod settings;
pub mod skins;
pub mod update;

pub use config::{ConfigError, HubClientConfig};
pub use confirm_policy::{RiskLevel, build_confirm_grant, requires_confirmation};
pub use connection::{ClientSnapshot, HubClient, HubClientHandle, SpawnedHubClient};
pub use dispatcher::{DispatchOutcome, TransportEvent};
pub use error::{ClientError, Result};
pub use lifecycle::{ConnectionLifecycle, ConnectionPhase, DisconnectReason, LifecycleSnapshot};
pub use session::{PendingPlan, SessionContext};
pub use session_state::{SessionEvent, SessionState, reduce, reduce_named};
pub use settings::{Settings, SettingsStore};
pub use skins::{AppliedSkin, SkinPalette};
pub use update::{ConfirmationPrompt, ConnectionStatus, SessionUpdate, UpdateSink};
