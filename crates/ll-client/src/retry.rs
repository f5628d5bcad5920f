//! Retry budget and `Retry-After` parsing.

use chrono::{DateTime, Utc};
use ll_core::{ApiError, Platform};
use ll_session::AuthSnapshot;
use reqwest::header::{HeaderMap, RETRY_AFTER};

/// Bounds on automatic recovery.
///
/// `max_auth_retries` caps re-authentications within one logical call and
/// is checked on every 401/403. `max_replays` caps how often one request
/// descriptor is resubmitted and is checked after a successful refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_auth_retries: u32,
    pub max_replays: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_auth_retries: 3,
            max_replays: 4,
        }
    }
}

/// What to do about a 401/403.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthDecision {
    Reauthenticate,
    /// Refresh is not available here; report the response as a plain failure.
    ReportFailure,
    /// Out of re-authentication attempts; report an expired token.
    BudgetExhausted,
}

impl RetryPolicy {
    pub fn decide(&self, snapshot: &AuthSnapshot, auth_retries: u32) -> AuthDecision {
        if !snapshot.allow_token_refresh || snapshot.platform == Platform::Steam {
            return AuthDecision::ReportFailure;
        }
        if auth_retries >= self.max_auth_retries {
            return AuthDecision::BudgetExhausted;
        }
        AuthDecision::Reauthenticate
    }

    pub fn replay_allowed(&self, replay_count: u32) -> bool {
        replay_count < self.max_replays
    }
}

/// Seconds until a retry is allowed, from the `Retry-After` header.
///
/// Accepts delta-seconds or an HTTP date. Absent header is `Ok(None)`;
/// anything unparseable is an error so callers can report it.
pub fn parse_retry_after(headers: &HeaderMap) -> Result<Option<u64>, ApiError> {
    let Some(value) = headers.get(RETRY_AFTER) else {
        return Ok(None);
    };
    let raw = value
        .to_str()
        .map_err(|_| ApiError::MalformedRetryAfter(String::from_utf8_lossy(value.as_bytes()).into_owned()))?
        .trim();
    if raw.is_empty() {
        return Ok(None);
    }
    if let Ok(seconds) = raw.parse::<u64>() {
        return Ok(Some(seconds));
    }
    let retry_at = DateTime::parse_from_rfc2822(raw)
        .map_err(|_| ApiError::MalformedRetryAfter(raw.to_string()))?
        .with_timezone(&Utc);
    let seconds = (retry_at - Utc::now()).num_seconds().max(0) as u64;
    Ok(Some(seconds))
}
