//! Persisted client settings (`lootlocker.toml`): game identity, server
//! location, client behaviour and the last known session.

pub mod debug_level;
pub mod paths;
pub mod settings;
pub mod urls;
pub mod validate;

pub use debug_level::DebugLevel;
pub use settings::{ClientSettings, GameSettings, PersistedSession, ServerSettings, Settings};
pub use urls::UrlSet;
pub use validate::validate_settings;
