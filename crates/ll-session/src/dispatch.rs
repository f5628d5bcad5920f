//! Platform -> re-authentication lookup table.

use std::collections::HashMap;
use std::sync::Arc;

use ll_core::{ApiError, Platform};
use tracing::error;

use crate::provider::{
    IdentifierSource, NoTokenRefresh, ReauthContext, ReauthStrategy, Reauthenticator,
    RefreshWithToken, SessionProvider, StartNewSession,
};
use crate::result::SessionResult;

#[derive(Default, Clone)]
pub struct PlatformDispatch {
    table: HashMap<Platform, Arc<dyn Reauthenticator>>,
}

impl PlatformDispatch {
    /// A table with no entries: every platform reports refresh as unsupported.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The stock mapping, with `provider` performing every session call.
    pub fn standard(provider: Arc<dyn SessionProvider>) -> Self {
        let refresh: Arc<dyn Reauthenticator> = Arc::new(RefreshWithToken::new(provider.clone()));
        let by_device: Arc<dyn Reauthenticator> = Arc::new(StartNewSession::new(
            provider.clone(),
            IdentifierSource::DeviceId,
        ));
        let no_refresh: Arc<dyn Reauthenticator> = Arc::new(NoTokenRefresh);

        let mut dispatch = Self::empty()
            .with(
                Platform::Guest,
                Arc::new(StartNewSession::new(
                    provider.clone(),
                    IdentifierSource::PlayerIdentifier,
                )),
            )
            .with(
                Platform::WhiteLabel,
                Arc::new(StartNewSession::new(provider, IdentifierSource::None)),
            );
        for platform in [
            Platform::AppleGameCenter,
            Platform::AppleSignIn,
            Platform::Epic,
            Platform::Google,
            Platform::Remote,
        ] {
            dispatch.insert(platform, refresh.clone());
        }
        for platform in [Platform::NintendoSwitch, Platform::Steam] {
            dispatch.insert(platform, no_refresh.clone());
        }
        for platform in [
            Platform::PlayStationNetwork,
            Platform::XboxOne,
            Platform::AmazonLuna,
        ] {
            dispatch.insert(platform, by_device.clone());
        }
        dispatch
    }

    pub fn with(mut self, platform: Platform, reauth: Arc<dyn Reauthenticator>) -> Self {
        self.insert(platform, reauth);
        self
    }

    pub fn insert(&mut self, platform: Platform, reauth: Arc<dyn Reauthenticator>) {
        self.table.insert(platform, reauth);
    }

    pub fn strategy_for(&self, platform: Platform) -> Option<ReauthStrategy> {
        self.table.get(&platform).map(|reauth| reauth.strategy())
    }

    pub async fn reauthenticate(&self, ctx: &ReauthContext) -> Result<SessionResult, ApiError> {
        let Some(reauth) = self.table.get(&ctx.platform) else {
            error!("Token refresh for platform {} not supported", ctx.platform);
            return Err(ApiError::RefreshUnsupportedForPlatform(ctx.platform));
        };
        reauth.reauthenticate(ctx).await
    }
}

impl std::fmt::Debug for PlatformDispatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut platforms: Vec<_> = self.table.keys().map(Platform::friendly_name).collect();
        platforms.sort_unstable();
        f.debug_struct("PlatformDispatch")
            .field("platforms", &platforms)
            .finish()
    }
}
