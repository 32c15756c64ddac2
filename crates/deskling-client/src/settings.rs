//! Persisted UI settings.
//!
//! Settings are stored as a flat JSON object of four strings. Anything read
//! back is sanitized: non-string, blank or missing values take defaults, and
//! an unreadable file loads as all defaults.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::Result;
use crate::skins;

pub const SETTINGS_KEY: &str = "deskling_ui_settings_v1";
const SETTINGS_FILE_NAME: &str = "deskling_ui_settings_v1.json";

pub const DEFAULT_AUDIO_DEVICE: &str = "default";
pub const DEFAULT_MODEL_PATH: &str = "/models/llm/default";
pub const DEFAULT_VOICE: &str = "piper:en_US-amy-medium";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub audio_device: String,
    pub model_path: String,
    pub voice: String,
    pub skin_id: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            audio_device: DEFAULT_AUDIO_DEVICE.to_string(),
            model_path: DEFAULT_MODEL_PATH.to_string(),
            voice: DEFAULT_VOICE.to_string(),
            skin_id: skins::DEFAULT_SKIN_ID.to_string(),
        }
    }
}

impl Settings {
    /// Coerce arbitrary JSON into settings.
    #[must_use]
    pub fn sanitize(raw: &Value) -> Self {
        let field = |key: &str, fallback: &str| {
            raw.get(key)
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .unwrap_or(fallback)
                .to_string()
        };
        Self {
            audio_device: field("audio_device", DEFAULT_AUDIO_DEVICE),
            model_path: field("model_path", DEFAULT_MODEL_PATH),
            voice: field("voice", DEFAULT_VOICE),
            skin_id: field("skin_id", skins::DEFAULT_SKIN_ID),
        }
    }

    /// Parse stored text; any decode failure yields defaults.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        match serde_json::from_str::<Value>(text) {
            Ok(raw) => Self::sanitize(&raw),
            Err(error) => {
                debug!(%error, "stored settings unreadable, using defaults");
                Self::default()
            }
        }
    }

    pub fn serialize(&self) -> serde_json::Result<String> {
        let raw = serde_json::to_value(self)?;
        serde_json::to_string(&Self::sanitize(&raw))
    }
}

/// File-backed settings.
#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
    settings: Settings,
}

impl SettingsStore {
    #[must_use]
    pub fn load_default() -> Self {
        Self::load(default_settings_path())
    }

    #[must_use]
    pub fn load(path: PathBuf) -> Self {
        let settings = match fs::read_to_string(&path) {
            Ok(raw) => Settings::parse(&raw),
            Err(error) => {
                debug!(path = %path.display(), %error, "no stored settings");
                Settings::default()
            }
        };
        Self { path, settings }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Sanitize, resolve the skin and persist `settings`.
    pub fn save(&mut self, settings: Settings) -> Result<&Settings> {
        let mut settings = Settings::sanitize(&serde_json::to_value(settings)?);
        let skin = skins::apply(&settings.skin_id);
        if skin.id != settings.skin_id {
            warn!(requested = %settings.skin_id, applied = skin.id, "unknown skin id");
            settings.skin_id = skin.id.to_string();
        }

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, settings.serialize()?)?;
        self.settings = settings;
        Ok(&self.settings)
    }
}

fn default_settings_path() -> PathBuf {
    if let Some(mut data_dir) = dirs::data_local_dir() {
        data_dir.push("deskling");
        data_dir.push(SETTINGS_FILE_NAME);
        return data_dir;
    }

    if let Some(mut home_dir) = dirs::home_dir() {
        home_dir.push(".deskling");
        home_dir.push(SETTINGS_FILE_NAME);
        return home_dir;
    }

    PathBuf::from(SETTINGS_FILE_NAME)
}
