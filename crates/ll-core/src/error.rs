use serde::{Deserialize, Serialize};

use crate::types::Platform;

/// Failures the request pipeline can report to a caller.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    #[error("{endpoint} timed out.")]
    TransportTimeout { endpoint: String },

    #[error("Request to {endpoint} failed: {message}")]
    TransportFailure { endpoint: String, message: String },

    #[error("HTTP {status} from {endpoint}")]
    HttpFailure { endpoint: String, status: u16 },

    #[error("Token Expired")]
    TokenExpired,

    #[error("Token refresh for platform {0} not supported")]
    RefreshUnsupportedForPlatform(Platform),

    #[error("Gave up after {attempts} re-authentication attempts")]
    RetryBudgetExceeded { attempts: u32 },

    #[error("Error body for HTTP {status} is not valid JSON: {reason}")]
    MalformedErrorBody { status: u16, reason: String },

    #[error("Malformed Retry-After header value '{0}'")]
    MalformedRetryAfter(String),
}

impl ApiError {
    /// Coarse category carried on the response envelope.
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::TransportTimeout { .. } => FailureKind::Timeout,
            Self::TransportFailure { .. } => FailureKind::Transport,
            Self::HttpFailure { .. }
            | Self::MalformedErrorBody { .. }
            | Self::MalformedRetryAfter(_) => FailureKind::Http,
            // Budget exhaustion surfaces to callers as an expired token.
            Self::TokenExpired | Self::RetryBudgetExceeded { .. } => FailureKind::TokenExpired,
            Self::RefreshUnsupportedForPlatform(_) => FailureKind::RefreshUnsupported,
        }
    }

    /// Status code reported alongside this error; 0 means no HTTP exchange happened.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::TransportTimeout { .. } | Self::TransportFailure { .. } => 0,
            Self::HttpFailure { status, .. } | Self::MalformedErrorBody { status, .. } => *status,
            Self::TokenExpired
            | Self::RetryBudgetExceeded { .. }
            | Self::RefreshUnsupportedForPlatform(_) => 401,
            Self::MalformedRetryAfter(_) => 0,
        }
    }
}

/// Category of an unsuccessful response.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Timeout,
    Transport,
    Http,
    TokenExpired,
    RefreshUnsupported,
    /// The caller's completion was dropped before a response was produced.
    Abandoned,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_timeout_names_endpoint() {
        let err = ApiError::TransportTimeout {
            endpoint: "/v1/leaderboards/gl_leaderboard".into(),
        };
        assert_eq!(err.to_string(), "/v1/leaderboards/gl_leaderboard timed out.");
        assert_eq!(err.kind(), FailureKind::Timeout);
        assert_eq!(err.status_code(), 0);
    }

    #[test]
    fn test_display_refresh_unsupported() {
        let err = ApiError::RefreshUnsupportedForPlatform(Platform::None);
        assert_eq!(err.to_string(), "Token refresh for platform None not supported");
        assert_eq!(err.kind(), FailureKind::RefreshUnsupported);
        assert_eq!(err.status_code(), 401);
    }

    #[test]
    fn test_budget_exhaustion_surfaces_as_token_expired() {
        let err = ApiError::RetryBudgetExceeded { attempts: 3 };
        assert_eq!(err.kind(), FailureKind::TokenExpired);
        assert_eq!(
            err.to_string(),
            "Gave up after 3 re-authentication attempts"
        );
    }

    #[test]
    fn test_http_failure_keeps_status() {
        let err = ApiError::HttpFailure {
            endpoint: "/x".into(),
            status: 503,
        };
        assert_eq!(err.status_code(), 503);
        assert_eq!(err.kind(), FailureKind::Http);
    }

    #[test]
    fn test_error_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ApiError>();
    }
}
