use std::env;
use std::time::Duration;

use deskling_proto::endpoint::{DEFAULT_HUB_URL, DESKTOP_UI};
use thiserror::Error;
use url::Url;

pub const ENV_HUB_URL: &str = "DESKLING_HUB_URL";
pub const ENV_IPC_TOKEN: &str = "DESKLING_IPC_TOKEN";
pub const ENV_RECONNECT_DELAY_MS: &str = "DESKLING_RECONNECT_DELAY_MS";
pub const ENV_HEARTBEAT_INTERVAL_MS: &str = "DESKLING_HEARTBEAT_INTERVAL_MS";
pub const ENV_CONNECT_TIMEOUT_MS: &str = "DESKLING_CONNECT_TIMEOUT_MS";

pub const DEFAULT_IPC_TOKEN: &str = "dev-token";
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_millis(1_500);
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_millis(5_000);
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid DESKLING_HUB_URL: {0}")]
    InvalidHubUrl(String),
    #[error("invalid DESKLING_RECONNECT_DELAY_MS: {0}")]
    InvalidReconnectDelay(String),
    #[error("invalid DESKLING_HEARTBEAT_INTERVAL_MS: {0}")]
    InvalidHeartbeatInterval(String),
    #[error("invalid DESKLING_CONNECT_TIMEOUT_MS: {0}")]
    InvalidConnectTimeout(String),
}

/// Settings for one hub client process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HubClientConfig {
    pub hub_url: String,
    /// Logical endpoint stamped into `from` and declared in `auth.hello`.
    pub endpoint: String,
    pub token: String,
    pub capabilities: Vec<String>,
    pub version: String,
    pub reconnect_delay: Duration,
    pub heartbeat_interval: Duration,
    pub connect_timeout: Duration,
}

impl Default for HubClientConfig {
    fn default() -> Self {
        Self {
            hub_url: DEFAULT_HUB_URL.to_string(),
            endpoint: DESKTOP_UI.to_string(),
            token: DEFAULT_IPC_TOKEN.to_string(),
            capabilities: vec!["chat.user_message".to_string(), "confirm.grant".to_string()],
            version: env!("CARGO_PKG_VERSION").to_string(),
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }
}

impl HubClientConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary variable source; unset or blank values keep defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let mut config = Self::default();
        if let Some(hub_url) = non_empty(ENV_HUB_URL) {
            validate_hub_url(&hub_url)?;
            config.hub_url = hub_url;
        }
        if let Some(token) = non_empty(ENV_IPC_TOKEN) {
            config.token = token;
        }
        if let Some(raw) = non_empty(ENV_RECONNECT_DELAY_MS) {
            config.reconnect_delay =
                parse_millis(&raw).map_err(ConfigError::InvalidReconnectDelay)?;
        }
        if let Some(raw) = non_empty(ENV_HEARTBEAT_INTERVAL_MS) {
            let interval = parse_millis(&raw).map_err(ConfigError::InvalidHeartbeatInterval)?;
            if interval.is_zero() {
                return Err(ConfigError::InvalidHeartbeatInterval(
                    "heartbeat interval must be greater than zero".to_string(),
                ));
            }
            config.heartbeat_interval = interval;
        }
        if let Some(raw) = non_empty(ENV_CONNECT_TIMEOUT_MS) {
            let timeout = parse_millis(&raw).map_err(ConfigError::InvalidConnectTimeout)?;
            if timeout.is_zero() {
                return Err(ConfigError::InvalidConnectTimeout(
                    "connect timeout must be greater than zero".to_string(),
                ));
            }
            config.connect_timeout = timeout;
        }
        Ok(config)
    }
}

/// Hub URLs must be WebSocket URLs.
pub fn validate_hub_url(raw: &str) -> Result<Url, ConfigError> {
    let parsed = Url::parse(raw.trim())
        .map_err(|error| ConfigError::InvalidHubUrl(format!("{raw}: {error}")))?;
    if parsed.scheme() != "ws" && parsed.scheme() != "wss" {
        return Err(ConfigError::InvalidHubUrl(format!(
            "URL must use ws:// or wss:// scheme, got: {}",
            parsed.scheme()
        )));
    }
    Ok(parsed)
}

fn parse_millis(raw: &str) -> Result<Duration, String> {
    raw.parse::<u64>()
        .map(Duration::from_millis)
        .map_err(|error| format!("{raw}: {error}"))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::time::Duration;

    use super::{
        ConfigError, DEFAULT_HEARTBEAT_INTERVAL, DEFAULT_RECONNECT_DELAY, ENV_HEARTBEAT_INTERVAL_MS,
        ENV_HUB_URL, ENV_IPC_TOKEN, ENV_RECONNECT_DELAY_MS, HubClientConfig, validate_hub_url,
    };

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars = pairs
            .iter()
            .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
            .collect::<HashMap<_, _>>();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_use_fixed_protocol_constants() {
        let config = HubClientConfig::default();
        assert_eq!(config.hub_url, "ws://127.0.0.1:17171/ws");
        assert_eq!(config.endpoint, "desktop-ui");
        assert_eq!(config.token, "dev-token");
        assert_eq!(config.reconnect_delay, Duration::from_millis(1_500));
        assert_eq!(config.heartbeat_interval, Duration::from_millis(5_000));
    }

    #[test]
    fn environment_overrides_defaults() -> Result<(), ConfigError> {
        let config = HubClientConfig::from_lookup(lookup_from(&[
            (ENV_HUB_URL, "ws://127.0.0.1:9000/ws"),
            (ENV_IPC_TOKEN, " local-token "),
            (ENV_RECONNECT_DELAY_MS, "250"),
            (ENV_HEARTBEAT_INTERVAL_MS, ""),
        ]))?;
        assert_eq!(config.hub_url, "ws://127.0.0.1:9000/ws");
        assert_eq!(config.token, "local-token");
        assert_eq!(config.reconnect_delay, Duration::from_millis(250));
        assert_eq!(config.heartbeat_interval, DEFAULT_HEARTBEAT_INTERVAL);
        Ok(())
    }

    #[test]
    fn invalid_values_are_reported_by_variable() {
        let bad_delay = HubClientConfig::from_lookup(lookup_from(&[(ENV_RECONNECT_DELAY_MS, "soon")]));
        assert!(matches!(bad_delay, Err(ConfigError::InvalidReconnectDelay(_))));

        let zero_heartbeat =
            HubClientConfig::from_lookup(lookup_from(&[(ENV_HEARTBEAT_INTERVAL_MS, "0")]));
        assert!(matches!(zero_heartbeat, Err(ConfigError::InvalidHeartbeatInterval(_))));

        let http_url = HubClientConfig::from_lookup(lookup_from(&[(ENV_HUB_URL, "http://127.0.0.1")]));
        assert!(matches!(http_url, Err(ConfigError::InvalidHubUrl(_))));
    }

    #[test]
    fn zero_reconnect_delay_is_allowed() -> Result<(), ConfigError> {
        let config = HubClientConfig::from_lookup(lookup_from(&[(ENV_RECONNECT_DELAY_MS, "0")]))?;
        assert!(config.reconnect_delay.is_zero());
        assert_ne!(config.reconnect_delay, DEFAULT_RECONNECT_DELAY);
        Ok(())
    }

    #[test]
    fn hub_url_requires_websocket_scheme() {
        assert!(validate_hub_url("wss://hub.local/ws").is_ok());
        assert!(validate_hub_url("not a url").is_err());
        assert!(validate_hub_url("https://hub.local/ws").is_err());
    }
}
