//! Session/auth state.
//!
//! Requests read an immutable [`AuthSnapshot`] when they are built; a
//! successful re-authentication swaps in a new snapshot. A request that has
//! already been built keeps the headers of the snapshot it was built from.

use std::sync::{Arc, RwLock};

use ll_config::Settings;
use ll_core::Platform;
use tracing::debug;

use crate::result::SessionResult;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSnapshot {
    pub token: Option<String>,
    pub refresh_token: Option<String>,
    pub platform: Platform,
    pub allow_token_refresh: bool,
    pub device_id: String,
    pub player_identifier: Option<String>,
}

impl AuthSnapshot {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            token: settings.session.token.clone().filter(|t| !t.is_empty()),
            refresh_token: settings.session.refresh_token.clone().filter(|t| !t.is_empty()),
            platform: settings.session.platform,
            allow_token_refresh: settings.client.allow_token_refresh,
            device_id: settings.client.device_id.clone(),
            player_identifier: settings.session.player_identifier.clone(),
        }
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    /// Snapshot after a successful session call on `platform`.
    ///
    /// Fields the result leaves empty keep their previous values.
    fn with_session(&self, platform: Platform, result: &SessionResult) -> Self {
        Self {
            token: result.token.clone().or_else(|| self.token.clone()),
            refresh_token: result
                .refresh_token
                .clone()
                .or_else(|| self.refresh_token.clone()),
            platform,
            allow_token_refresh: self.allow_token_refresh,
            device_id: self.device_id.clone(),
            player_identifier: result
                .player_identifier
                .clone()
                .or_else(|| self.player_identifier.clone()),
        }
    }
}

/// Shared handle to the current snapshot. Clones observe the same state.
#[derive(Debug, Clone)]
pub struct SessionStore {
    current: Arc<RwLock<Arc<AuthSnapshot>>>,
}

impl SessionStore {
    pub fn new(snapshot: AuthSnapshot) -> Self {
        Self {
            current: Arc::new(RwLock::new(Arc::new(snapshot))),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(AuthSnapshot::from_settings(settings))
    }

    pub fn current(&self) -> Arc<AuthSnapshot> {
        self.current
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Record a successful session call. Unsuccessful results leave the state untouched.
    pub fn apply(&self, platform: Platform, result: &SessionResult) -> Arc<AuthSnapshot> {
        if !result.success {
            return self.current();
        }
        self.replace(|old| old.with_session(platform, result))
    }

    /// Keep the active platform but reuse the current session material.
    pub fn set_platform(&self, platform: Platform) -> Arc<AuthSnapshot> {
        self.replace(|old| AuthSnapshot {
            platform,
            ..old.clone()
        })
    }

    /// Logout: drop every piece of session material.
    pub fn clear(&self) -> Arc<AuthSnapshot> {
        self.replace(|old| AuthSnapshot {
            token: None,
            refresh_token: None,
            platform: Platform::None,
            player_identifier: None,
            ..old.clone()
        })
    }

    /// Copy the session material into `settings` so it can be saved.
    pub fn persist_into(&self, settings: &mut Settings) {
        let snapshot = self.current();
        settings.session.token = snapshot.token.clone();
        settings.session.refresh_token = snapshot.refresh_token.clone();
        settings.session.platform = snapshot.platform;
        settings.session.player_identifier = snapshot.player_identifier.clone();
    }

    fn replace(&self, update: impl FnOnce(&AuthSnapshot) -> AuthSnapshot) -> Arc<AuthSnapshot> {
        let mut guard = self
            .current
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let next = Arc::new(update(&guard));
        *guard = next.clone();
        debug!(
            platform = %next.platform,
            has_token = next.has_token(),
            has_refresh_token = next.refresh_token.is_some(),
            "session state updated"
        );
        next
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
