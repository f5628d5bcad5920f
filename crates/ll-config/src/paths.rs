use std::path::PathBuf;

/// XDG application name used for the settings directory.
pub const APP_NAME: &str = "lootlocker";
/// File name of the settings file inside the config directory.
pub const SETTINGS_FILE: &str = "lootlocker.toml";

/// Directory holding the settings file, if the platform exposes one.
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", APP_NAME).map(|dirs| dirs.config_dir().to_path_buf())
}

/// Default location of the settings file.
pub fn default_settings_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join(SETTINGS_FILE))
}
