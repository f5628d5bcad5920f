use serde::{Deserialize, Serialize};

/// How chatty the client is.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DebugLevel {
    #[default]
    All,
    ErrorOnly,
    NormalOnly,
    Off,
    /// Everything, but verbose lines are promoted to the normal level.
    AllAsNormal,
}

impl DebugLevel {
    /// `tracing_subscriber::EnvFilter` directive for this level.
    pub fn filter_directive(&self) -> &'static str {
        match self {
            Self::All | Self::AllAsNormal => "debug",
            Self::ErrorOnly => "error",
            Self::NormalOnly => "info",
            Self::Off => "off",
        }
    }
}
