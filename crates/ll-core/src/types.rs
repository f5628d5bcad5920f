use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Selects which URL family a request targets.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallerRole {
    /// Game API (`/game`).
    #[default]
    User,
    /// Admin API (`/admin`).
    Admin,
    /// Player API (`/player`).
    Player,
    /// Bare host with no appendage.
    Base,
}

impl CallerRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Admin => "admin",
            Self::Player => "player",
            Self::Base => "base",
        }
    }

    /// Path segment appended to `{protocol}{domain}.{host}` for this role.
    pub fn url_appendage(&self) -> &'static str {
        match self {
            Self::User => "/game",
            Self::Admin => "/admin",
            Self::Player => "/player",
            Self::Base => "",
        }
    }
}

impl std::fmt::Display for CallerRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// HTTP verbs understood by the pipeline, including the two form-upload variants.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
    /// POST carrying a pre-built multipart form.
    UploadFile,
    /// PUT carrying a pre-built multipart form.
    UpdateFile,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
            Self::Head => "HEAD",
            Self::Options => "OPTIONS",
            Self::UploadFile => "UPLOAD_FILE",
            Self::UpdateFile => "UPDATE_FILE",
        }
    }

    /// The verb actually put on the wire.
    pub fn wire_verb(&self) -> &'static str {
        match self {
            Self::UploadFile => "POST",
            Self::UpdateFile => "PUT",
            other => other.as_str(),
        }
    }

    /// Form-upload variants carry a multipart form instead of JSON.
    pub fn is_form_upload(&self) -> bool {
        matches!(self, Self::UploadFile | Self::UpdateFile)
    }

    /// Verbs whose body is built from the request payload.
    pub fn carries_payload(&self) -> bool {
        matches!(self, Self::Post | Self::Put | Self::Patch)
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Identity platform the current session was obtained through.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    #[default]
    None,
    Guest,
    WhiteLabel,
    AppleGameCenter,
    AppleSignIn,
    Epic,
    Google,
    Remote,
    NintendoSwitch,
    Steam,
    PlayStationNetwork,
    XboxOne,
    AmazonLuna,
}

impl Platform {
    pub const ALL: [Platform; 13] = [
        Self::None,
        Self::Guest,
        Self::WhiteLabel,
        Self::AppleGameCenter,
        Self::AppleSignIn,
        Self::Epic,
        Self::Google,
        Self::Remote,
        Self::NintendoSwitch,
        Self::Steam,
        Self::PlayStationNetwork,
        Self::XboxOne,
        Self::AmazonLuna,
    ];

    /// Human-readable name used in log lines and error messages.
    pub fn friendly_name(&self) -> &'static str {
        match self {
            Self::None => "None",
            Self::Guest => "Guest",
            Self::WhiteLabel => "White Label",
            Self::AppleGameCenter => "Apple Game Center",
            Self::AppleSignIn => "Apple Sign In",
            Self::Epic => "Epic Online Services",
            Self::Google => "Google",
            Self::Remote => "Remote",
            Self::NintendoSwitch => "Nintendo Switch",
            Self::Steam => "Steam",
            Self::PlayStationNetwork => "PlayStation Network",
            Self::XboxOne => "Xbox One",
            Self::AmazonLuna => "Amazon Luna",
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.friendly_name())
    }
}

/// Output format for CLI responses
#[derive(Clone, Copy, Debug, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}
