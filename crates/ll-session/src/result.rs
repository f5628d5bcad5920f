use serde::{Deserialize, Serialize};

/// Uniform shape every session start/refresh call returns, whatever the platform.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionResult {
    #[serde(default)]
    pub success: bool,
    #[serde(default, rename = "session_token", skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player_identifier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player_id: Option<u64>,
    /// Failure description when `success` is false.
    #[serde(skip)]
    pub error: Option<String>,
}

impl SessionResult {
    pub fn granted(token: impl Into<String>) -> Self {
        Self {
            success: true,
            token: Some(token.into()),
            ..Self::default()
        }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(reason.into()),
            ..Self::default()
        }
    }

    pub fn with_refresh_token(mut self, refresh_token: impl Into<String>) -> Self {
        self.refresh_token = Some(refresh_token.into());
        self
    }

    pub fn with_player_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.player_identifier = Some(identifier.into());
        self
    }
}

/// How a session provider is asked to obtain a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionGrant {
    /// Start a brand-new session, optionally for a known identifier.
    NewSession { identifier: Option<String> },
    /// Exchange a stored refresh token for a new session.
    RefreshToken { refresh_token: String },
}
