//! Settings file model and load/save helpers.
//!
//! The file is TOML with four sections:
//! - `[game]`: API key, game/SDK version, domain key, game id
//! - `[server]`: protocol, host and client-side request timeout
//! - `[client]`: debug level, token refresh switch, device id
//! - `[session]`: the last session obtained (token, refresh token, platform)

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use ll_core::{CallerRole, Platform};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::debug_level::DebugLevel;
use crate::urls::UrlSet;

pub const DEFAULT_PROTOCOL: &str = "https://";
pub const DEFAULT_HOST: &str = "api.lootlocker.io";
pub const DEFAULT_GAME_VERSION: &str = "1.0.0.0";
pub const DEFAULT_DEVICE_ID: &str = "defaultPlayerId";
const DEFAULT_REQUEST_TIMEOUT_SECS: f64 = 180.0;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub game: GameSettings,
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub client: ClientSettings,
    #[serde(default)]
    pub session: PersistedSession,
}

/// Identity of the game this client talks for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default = "default_game_version")]
    pub game_version: String,
    /// Sent as `LL-SDK-Version` when non-empty.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sdk_version: Option<String>,
    /// Prefix prepended to the host (`{domain_key}.{host}`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain_key: Option<String>,
    #[serde(default)]
    pub game_id: u64,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            game_version: default_game_version(),
            sdk_version: None,
            domain_key: None,
            game_id: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_protocol")]
    pub protocol: String,
    #[serde(default = "default_host")]
    pub host: String,
    /// Hard timeout applied to every network call.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: f64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            protocol: default_protocol(),
            host: default_host(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientSettings {
    #[serde(default)]
    pub debug_level: DebugLevel,
    #[serde(default = "default_true")]
    pub allow_token_refresh: bool,
    #[serde(default = "default_device_id")]
    pub device_id: String,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            debug_level: DebugLevel::default(),
            allow_token_refresh: true,
            device_id: default_device_id(),
        }
    }
}

/// Session material carried across process restarts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersistedSession {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub platform: Platform,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player_identifier: Option<String>,
}

fn default_game_version() -> String {
    DEFAULT_GAME_VERSION.to_string()
}

fn default_protocol() -> String {
    DEFAULT_PROTOCOL.to_string()
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_request_timeout_secs() -> f64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

fn default_device_id() -> String {
    DEFAULT_DEVICE_ID.to_string()
}

fn default_true() -> bool {
    true
}

impl Settings {
    /// Fresh settings for a game, with no session attached.
    pub fn create_new(
        api_key: impl Into<String>,
        game_version: impl Into<String>,
        domain_key: Option<String>,
        debug_level: DebugLevel,
        allow_token_refresh: bool,
    ) -> Self {
        Self {
            game: GameSettings {
                api_key: Some(api_key.into()),
                game_version: game_version.into(),
                domain_key: domain_key.filter(|key| !key.is_empty()),
                ..GameSettings::default()
            },
            client: ClientSettings {
                debug_level,
                allow_token_refresh,
                ..ClientSettings::default()
            },
            ..Self::default()
        }
    }

    /// Forget the game identity and any session, keeping server location.
    pub fn clear(&mut self) {
        self.game = GameSettings {
            game_version: String::new(),
            ..GameSettings::default()
        };
        self.client = ClientSettings::default();
        self.session = PersistedSession::default();
    }

    /// Load settings from `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings: {}", path.display()))?;
        let settings: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse settings: {}", path.display()))?;
        Ok(settings)
    }

    /// Load settings from `path`, writing a default file first if none exists.
    pub fn load_or_init(path: &Path) -> Result<Self> {
        if path.exists() {
            return Self::load(path);
        }
        let settings = Self::default();
        settings.save(path)?;
        debug!(path = %path.display(), "wrote default settings");
        Ok(settings)
    }

    /// Write settings to `path`, creating parent directories as needed.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create settings directory: {}", parent.display())
            })?;
        }
        let content = toml::to_string_pretty(self).context("Failed to serialize settings")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write settings: {}", path.display()))?;
        Ok(())
    }

    /// Default settings path (`~/.config/lootlocker/lootlocker.toml`).
    pub fn default_path() -> Result<PathBuf> {
        crate::paths::default_settings_path().context("Failed to determine config directory")
    }

    pub fn urls(&self) -> UrlSet {
        UrlSet::from_settings(self)
    }

    /// Base URL for the family selected by `role`.
    pub fn base_url(&self, role: CallerRole) -> String {
        self.urls().for_role(role).to_string()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::try_from_secs_f64(self.server.request_timeout_secs)
            .unwrap_or(Duration::from_secs_f64(DEFAULT_REQUEST_TIMEOUT_SECS))
    }

    pub fn sdk_version(&self) -> Option<&str> {
        self.game.sdk_version.as_deref().filter(|v| !v.is_empty())
    }

    pub fn is_targeting_production(&self) -> bool {
        self.server.host.is_empty() || self.server.host == DEFAULT_HOST
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.server.protocol, "https://");
        assert_eq!(settings.server.host, "api.lootlocker.io");
        assert_eq!(settings.request_timeout(), Duration::from_secs(180));
        assert!(settings.client.allow_token_refresh);
        assert_eq!(settings.client.device_id, "defaultPlayerId");
        assert_eq!(settings.game.game_version, "1.0.0.0");
        assert!(settings.is_targeting_production());
    }

    #[test]
    fn test_parse_partial_file_fills_defaults() {
        let settings: Settings = toml::from_str(
            r#"
[game]
api_key = "dev_123"
domain_key = "abc"

[client]
debug_level = "error_only"
allow_token_refresh = false

[session]
token = "tok"
platform = "guest"
"#,
        )
        .unwrap();
        assert_eq!(settings.game.api_key.as_deref(), Some("dev_123"));
        assert_eq!(settings.game.game_version, "1.0.0.0");
        assert_eq!(settings.client.debug_level, DebugLevel::ErrorOnly);
        assert!(!settings.client.allow_token_refresh);
        assert_eq!(settings.session.platform, Platform::Guest);
        assert_eq!(settings.server.host, DEFAULT_HOST);
    }

    #[test]
    fn test_save_then_load_roundtrip() {
        let tmp = tempfile::tempdir().expect("Failed to create tempdir");
        let path = tmp.path().join("nested").join("lootlocker.toml");
        let mut settings = Settings::create_new(
            "dev_key",
            "2.0.0",
            Some("mygame".into()),
            DebugLevel::NormalOnly,
            true,
        );
        settings.session.token = Some("session".into());
        settings.save(&path).expect("save should succeed");

        let loaded = Settings::load(&path).expect("load should succeed");
        assert_eq!(loaded, settings);
    }

    #[test]
    fn test_load_or_init_writes_defaults_when_missing() {
        let tmp = tempfile::tempdir().expect("Failed to create tempdir");
        let path = tmp.path().join("lootlocker.toml");
        assert!(!path.exists());

        let settings = Settings::load_or_init(&path).expect("init should succeed");
        assert!(path.exists(), "default settings file should be written");
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_load_reports_parse_errors() {
        let tmp = tempfile::tempdir().expect("Failed to create tempdir");
        let path = tmp.path().join("lootlocker.toml");
        std::fs::write(&path, "[game\napi_key = ").unwrap();
        let err = Settings::load(&path).unwrap_err();
        assert!(format!("{err:#}").contains("Failed to parse settings"));
    }

    #[test]
    fn test_clear_drops_identity_and_session() {
        let mut settings =
            Settings::create_new("key", "1.0", None, DebugLevel::Off, false);
        settings.session.refresh_token = Some("refresh".into());
        settings.clear();
        assert!(settings.game.api_key.is_none());
        assert!(settings.session.refresh_token.is_none());
        assert!(settings.client.allow_token_refresh);
        assert_eq!(settings.client.debug_level, DebugLevel::All);
    }

    #[test]
    fn test_empty_domain_key_is_ignored() {
        let settings = Settings::create_new("key", "1.0", Some(String::new()), DebugLevel::All, true);
        assert!(settings.game.domain_key.is_none());
    }

    #[test]
    fn test_sdk_version_empty_is_none() {
        let mut settings = Settings::default();
        settings.game.sdk_version = Some(String::new());
        assert_eq!(settings.sdk_version(), None);
        settings.game.sdk_version = Some("3.1.0".into());
        assert_eq!(settings.sdk_version(), Some("3.1.0"));
    }
}
