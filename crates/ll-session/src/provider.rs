//! Session providers and the three re-authentication behaviours.

use std::sync::Arc;

use async_trait::async_trait;
use ll_core::{ApiError, Platform};
use tracing::{info, warn};

use crate::result::{SessionGrant, SessionResult};
use crate::state::AuthSnapshot;

/// Performs the actual login/refresh for a platform.
///
/// Implementations usually call back into the request pipeline, so the
/// returned future may take several scheduler ticks to resolve.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    async fn start_session(&self, platform: Platform, grant: SessionGrant) -> SessionResult;
}

/// What the pipeline knows when a call fails authorization.
#[derive(Debug, Clone)]
pub struct ReauthContext {
    pub platform: Platform,
    pub snapshot: Arc<AuthSnapshot>,
    /// The failed call was itself a refresh-token exchange.
    pub failed_request_was_refresh: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReauthStrategy {
    StartNewSession,
    RefreshWithToken,
    NoTokenRefresh,
}

/// One re-authentication behaviour.
#[async_trait]
pub trait Reauthenticator: Send + Sync {
    fn strategy(&self) -> ReauthStrategy;

    /// Obtain a new session, or say why none can be had.
    async fn reauthenticate(&self, ctx: &ReauthContext) -> Result<SessionResult, ApiError>;
}

/// Where a new session's identifier comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentifierSource {
    /// The identifier the previous session reported.
    PlayerIdentifier,
    /// The configured device id.
    DeviceId,
    /// No identifier; the provider decides.
    None,
}

impl IdentifierSource {
    fn resolve(&self, snapshot: &AuthSnapshot) -> Option<String> {
        match self {
            Self::PlayerIdentifier => snapshot.player_identifier.clone(),
            Self::DeviceId => Some(snapshot.device_id.clone()),
            Self::None => None,
        }
    }
}

pub struct StartNewSession {
    provider: Arc<dyn SessionProvider>,
    identifier: IdentifierSource,
}

impl StartNewSession {
    pub fn new(provider: Arc<dyn SessionProvider>, identifier: IdentifierSource) -> Self {
        Self {
            provider,
            identifier,
        }
    }
}

#[async_trait]
impl Reauthenticator for StartNewSession {
    fn strategy(&self) -> ReauthStrategy {
        ReauthStrategy::StartNewSession
    }

    async fn reauthenticate(&self, ctx: &ReauthContext) -> Result<SessionResult, ApiError> {
        let identifier = self.identifier.resolve(&ctx.snapshot);
        info!(platform = %ctx.platform, "starting new session");
        let result = self
            .provider
            .start_session(ctx.platform, SessionGrant::NewSession { identifier })
            .await;
        accept(ctx.platform, result)
    }
}

/// Exchanges the stored refresh token, unless the failed call was the exchange itself.
pub struct RefreshWithToken {
    provider: Arc<dyn SessionProvider>,
}

impl RefreshWithToken {
    pub fn new(provider: Arc<dyn SessionProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl Reauthenticator for RefreshWithToken {
    fn strategy(&self) -> ReauthStrategy {
        ReauthStrategy::RefreshWithToken
    }

    async fn reauthenticate(&self, ctx: &ReauthContext) -> Result<SessionResult, ApiError> {
        let refresh_token = match ctx.snapshot.refresh_token.clone() {
            Some(token) if !ctx.failed_request_was_refresh => token,
            _ => {
                warn!(platform = %ctx.platform, "Token has expired, please refresh it");
                return Err(ApiError::TokenExpired);
            }
        };
        info!(platform = %ctx.platform, "refreshing session with stored refresh token");
        let result = self
            .provider
            .start_session(ctx.platform, SessionGrant::RefreshToken { refresh_token })
            .await;
        accept(ctx.platform, result)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoTokenRefresh;

#[async_trait]
impl Reauthenticator for NoTokenRefresh {
    fn strategy(&self) -> ReauthStrategy {
        ReauthStrategy::NoTokenRefresh
    }

    async fn reauthenticate(&self, ctx: &ReauthContext) -> Result<SessionResult, ApiError> {
        warn!(
            platform = %ctx.platform,
            "Token has expired and can not be refreshed on this platform, please start a new session"
        );
        Err(ApiError::TokenExpired)
    }
}

fn accept(platform: Platform, result: SessionResult) -> Result<SessionResult, ApiError> {
    if result.success {
        return Ok(result);
    }
    warn!(
        %platform,
        reason = result.error.as_deref().unwrap_or("unknown"),
        "Session refresh failed"
    );
    Err(ApiError::TokenExpired)
}
