use ll_core::{ApiError, FailureKind};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::obfuscate::obfuscate_for_logging;

const DOC_URL: &str = "https://docs.lootlocker.com/";

/// Structured error detail the backend returns for failed calls.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
    /// Seconds to wait before retrying, from the `Retry-After` header.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_after_seconds: Option<u64>,
}

impl ErrorData {
    pub fn from_message(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::default()
        }
    }

    /// Error detail built from what we know when the body is not an error document.
    pub fn synthetic(status: u16, body: &str) -> Self {
        Self {
            code: Some(format!("HTTP{status}")),
            doc_url: Some(format!("{DOC_URL}reference/error-codes#http-{status}")),
            message: Some(body.to_string()),
            ..Self::default()
        }
    }
}

impl std::fmt::Display for ErrorData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: {}",
            self.code.as_deref().unwrap_or("error"),
            self.message.as_deref().unwrap_or("")
        )?;
        if let Some(request_id) = &self.request_id {
            write!(f, " (request_id: {request_id})")?;
        }
        if let Some(seconds) = self.retry_after_seconds {
            write!(f, " (retry after {seconds}s)")?;
        }
        Ok(())
    }
}

/// Parse a failed call's body as [`ErrorData`], synthesizing one when that fails.
///
/// Never drops information: the raw body ends up in `message` when parsing fails.
pub fn parse_error_body(status: u16, body: &str) -> ErrorData {
    match serde_json::from_str::<ErrorData>(body) {
        Ok(parsed) if parsed != ErrorData::default() => parsed,
        Ok(_) => ErrorData::synthetic(status, body),
        Err(err) => {
            let reason = ApiError::MalformedErrorBody {
                status,
                reason: err.to_string(),
            };
            if body.trim_start().starts_with('<') {
                warn!(
                    status,
                    body = %obfuscate_for_logging(body),
                    "Response body is markup, not JSON; check the request URL"
                );
            } else {
                warn!(status, error = %reason, "Could not parse error body");
            }
            ErrorData::synthetic(status, body)
        }
    }
}

/// Outcome of one logical call, as delivered to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// HTTP status; 0 when no HTTP exchange completed.
    pub status_code: u16,
    pub success: bool,
    pub text: String,
    pub error_data: Option<ErrorData>,
    pub failure: Option<FailureKind>,
}

impl Response {
    pub fn success(status_code: u16, text: impl Into<String>) -> Self {
        Self {
            status_code,
            success: true,
            text: text.into(),
            error_data: None,
            failure: None,
        }
    }

    pub fn http_failure(status_code: u16, text: impl Into<String>, error: ErrorData) -> Self {
        Self {
            status_code,
            success: false,
            text: text.into(),
            error_data: Some(error),
            failure: Some(FailureKind::Http),
        }
    }

    /// Failure that happened on this side of the wire.
    pub fn client_error(message: impl Into<String>, kind: FailureKind) -> Self {
        let message = message.into();
        Self {
            status_code: 0,
            success: false,
            text: message.clone(),
            error_data: Some(ErrorData::from_message(message)),
            failure: Some(kind),
        }
    }

    pub fn from_error(error: &ApiError) -> Self {
        Self {
            status_code: error.status_code(),
            ..Self::client_error(error.to_string(), error.kind())
        }
    }

    pub fn token_expired() -> Self {
        Self::from_error(&ApiError::TokenExpired)
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_data.as_ref()?.message.as_deref()
    }

    /// Deserialize the body into a caller type.
    pub fn parse<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_str(&self.text)
    }
}
