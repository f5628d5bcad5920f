//! Guest sessions, started through the same pipeline they re-authenticate.

use anyhow::{Context, Result};
use async_trait::async_trait;
use ll_client::endpoints::GUEST_SESSION;
use ll_client::{Response, ServerApi, ServerRequest};
use ll_config::Settings;
use ll_core::Platform;
use ll_session::{SessionGrant, SessionProvider, SessionResult};
use serde::Serialize;
use tracing::{info, warn};

#[derive(Serialize)]
struct GuestSessionBody<'a> {
    game_key: &'a str,
    game_version: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    player_identifier: Option<&'a str>,
}

/// Unauthenticated `POST v2/session/guest` for `identifier` (a new guest when `None`).
pub fn session_request(settings: &Settings, identifier: Option<&str>) -> Result<ServerRequest> {
    let game_key = settings
        .game
        .api_key
        .as_deref()
        .filter(|key| !key.is_empty())
        .context("game.api_key is not set; run `ll init` first")?;
    let body = GuestSessionBody {
        game_key,
        game_version: &settings.game.game_version,
        player_identifier: identifier.filter(|id| !id.is_empty()),
    };
    let request = ServerRequest::to(&GUEST_SESSION, &[])
        .without_auth()
        .with_json(&body)
        .context("Failed to serialize guest session request")?;
    Ok(request)
}

/// Session material from a guest session response. Unsuccessful unless a token came back.
pub fn session_result_from(response: &Response) -> SessionResult {
    if !response.success {
        return SessionResult::failed(
            response
                .error_message()
                .unwrap_or("guest session request failed"),
        );
    }
    match response.parse::<SessionResult>() {
        Ok(mut result) => {
            result.success = result.token.is_some();
            if !result.success {
                result.error = Some("guest session response carried no session token".into());
            }
            result
        }
        Err(err) => SessionResult::failed(format!("unreadable guest session response: {err}")),
    }
}

/// [`SessionProvider`] that starts guest sessions with the pipeline itself.
///
/// The call is queued on the same scheduler as the request it re-authenticates,
/// so it resolves on later ticks of that scheduler.
pub struct GuestSessionProvider {
    api: ServerApi,
}

impl GuestSessionProvider {
    pub fn new(api: ServerApi) -> Self {
        Self { api }
    }
}

#[async_trait]
impl SessionProvider for GuestSessionProvider {
    async fn start_session(&self, platform: Platform, grant: SessionGrant) -> SessionResult {
        let SessionGrant::NewSession { identifier } = grant else {
            warn!(%platform, "guest sessions cannot be refreshed with a refresh token");
            return SessionResult::failed("refresh token grant is not supported for guest sessions");
        };
        let request = match session_request(self.api.settings(), identifier.as_deref()) {
            Ok(request) => request,
            Err(err) => return SessionResult::failed(format!("{err:#}")),
        };
        let pending = match self.api.enqueue(request).await {
            Ok(pending) => pending,
            Err(err) => return SessionResult::failed(err.to_string()),
        };
        let result = session_result_from(&pending.await);
        if result.success {
            info!(
                player_identifier = result.player_identifier.as_deref().unwrap_or_default(),
                "guest session started"
            );
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> Settings {
        let mut settings = Settings::default();
        settings.game.api_key = Some("dev_123".into());
        settings.game.game_version = "2.1.0".into();
        settings
    }

    #[test]
    fn test_session_request_shape() {
        let request = session_request(&settings(), Some("player-1")).unwrap();
        assert_eq!(request.endpoint, "v2/session/guest");
        assert!(!request.use_auth_token);
        assert_eq!(
            request.json_body(),
            Some(r#"{"game_key":"dev_123","game_version":"2.1.0","player_identifier":"player-1"}"#)
        );
    }

    #[test]
    fn test_new_guest_omits_identifier() {
        let request = session_request(&settings(), None).unwrap();
        assert_eq!(
            request.json_body(),
            Some(r#"{"game_key":"dev_123","game_version":"2.1.0"}"#)
        );
    }

    #[test]
    fn test_missing_api_key_is_an_error() {
        let err = session_request(&Settings::default(), None).unwrap_err();
        assert!(err.to_string().contains("api_key"));
    }

    #[test]
    fn test_session_result_from_success() {
        let response = Response::success(
            200,
            r#"{"success":true,"session_token":"tok","player_id":42,"player_identifier":"p-1"}"#,
        );
        let result = session_result_from(&response);
        assert!(result.success);
        assert_eq!(result.token.as_deref(), Some("tok"));
        assert_eq!(result.player_id, Some(42));
    }

    #[test]
    fn test_session_result_without_token_fails() {
        let result = session_result_from(&Response::success(200, r#"{"success":true}"#));
        assert!(!result.success);
        assert!(result.error.is_some());
    }

    #[test]
    fn test_failed_response_carries_message() {
        let response = Response::client_error("v2/session/guest timed out.", ll_core::FailureKind::Timeout);
        let result = session_result_from(&response);
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("v2/session/guest timed out."));
    }
}
