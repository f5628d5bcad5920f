use std::path::Path;

use anyhow::{Result, bail};
use ll_client::obfuscate_for_logging;
use ll_config::{DebugLevel, Settings, validate_settings};
use ll_core::OutputFormat;
use tracing::error;

use crate::cli::ConfigCommands;

pub(crate) struct InitArgs {
    pub api_key: String,
    pub game_version: String,
    pub domain_key: Option<String>,
    pub allow_token_refresh: bool,
    pub force: bool,
}

pub(crate) fn handle_init(settings_path: &Path, args: InitArgs) -> Result<i32> {
    if settings_path.exists() && !args.force {
        bail!(
            "Settings already exist at {}. Pass --force to overwrite.",
            settings_path.display()
        );
    }
    let settings = Settings::create_new(
        args.api_key,
        args.game_version,
        args.domain_key,
        DebugLevel::default(),
        args.allow_token_refresh,
    );
    validate_settings(&settings)?;
    settings.save(settings_path)?;
    eprintln!("Initialized settings at: {}", settings_path.display());
    eprintln!("API base: {}", settings.urls().user);
    Ok(0)
}

pub(crate) fn handle_config(
    cmd: ConfigCommands,
    mut settings: Settings,
    settings_path: &Path,
    format: OutputFormat,
) -> Result<i32> {
    match cmd {
        ConfigCommands::Show => {
            let masked = masked_settings(&settings)?;
            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&masked)?),
                OutputFormat::Text => print!("{}", toml::to_string_pretty(&masked)?),
            }
            Ok(0)
        }
        ConfigCommands::Validate => match validate_settings(&settings) {
            Ok(()) => {
                eprintln!("Configuration is valid: {}", settings_path.display());
                Ok(0)
            }
            Err(err) => {
                error!("Configuration is invalid: {err:#}");
                Ok(1)
            }
        },
        ConfigCommands::Path => {
            println!("{}", settings_path.display());
            Ok(0)
        }
        ConfigCommands::Clear => {
            settings.clear();
            settings.save(settings_path)?;
            eprintln!("Cleared game identity and session in {}", settings_path.display());
            Ok(0)
        }
    }
}

/// Settings as a JSON value with keys and tokens masked.
fn masked_settings(settings: &Settings) -> Result<serde_json::Value> {
    let raw = serde_json::to_string(settings)?;
    Ok(serde_json::from_str(&obfuscate_for_logging(&raw))?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn init_args(force: bool) -> InitArgs {
        InitArgs {
            api_key: "dev_0123456789abcdef".into(),
            game_version: "1.2.3".into(),
            domain_key: Some("abc123".into()),
            allow_token_refresh: false,
            force,
        }
    }

    #[test]
    fn test_init_writes_settings_and_refuses_overwrite() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nested").join("lootlocker.toml");

        assert_eq!(handle_init(&path, init_args(false)).unwrap(), 0);
        let saved = Settings::load(&path).unwrap();
        assert_eq!(saved.game.api_key.as_deref(), Some("dev_0123456789abcdef"));
        assert_eq!(saved.game.game_version, "1.2.3");
        assert!(!saved.client.allow_token_refresh);
        assert_eq!(saved.urls().user, "https://abc123.api.lootlocker.io/game");

        assert!(handle_init(&path, init_args(false)).is_err());
        assert!(handle_init(&path, init_args(true)).is_ok());
    }

    #[test]
    fn test_masked_settings_hide_credentials() {
        let mut settings = Settings::default();
        settings.game.api_key = Some("dev_0123456789abcdef".into());
        settings.session.token = Some("session-token-value".into());
        let masked = masked_settings(&settings).unwrap();

        let api_key = masked["game"]["api_key"].as_str().unwrap();
        assert_ne!(api_key, "dev_0123456789abcdef");
        assert!(api_key.contains('*'));
        let token = masked["session"]["token"].as_str().unwrap();
        assert_ne!(token, "session-token-value");
        assert_eq!(masked["server"]["host"], "api.lootlocker.io");
    }

    #[test]
    fn test_clear_keeps_server_location() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("lootlocker.toml");
        let mut settings = Settings::default();
        settings.server.host = "staging.example.test".into();
        settings.game.api_key = Some("dev_key".into());
        settings.session.token = Some("tok".into());

        let code = handle_config(ConfigCommands::Clear, settings, &path, OutputFormat::Text).unwrap();
        assert_eq!(code, 0);
        let saved = Settings::load(&path).unwrap();
        assert_eq!(saved.server.host, "staging.example.test");
        assert_eq!(saved.game.api_key, None);
        assert_eq!(saved.session.token, None);
    }
}
