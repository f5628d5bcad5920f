use ll_core::CallerRole;

use crate::settings::Settings;

/// Base URLs for every caller role, derived from the server settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlSet {
    pub admin: String,
    pub player: String,
    pub user: String,
    pub base: String,
}

impl UrlSet {
    /// `{protocol}{domain_key.}{host}` followed by the role appendage.
    pub fn from_settings(settings: &Settings) -> Self {
        let mut start = settings.server.protocol.clone();
        if let Some(domain_key) = settings.game.domain_key.as_deref().filter(|k| !k.is_empty()) {
            start.push_str(domain_key);
            start.push('.');
        }
        start.push_str(settings.server.host.trim_end_matches('/'));

        let with = |role: CallerRole| format!("{start}{}", role.url_appendage());
        Self {
            admin: with(CallerRole::Admin),
            player: with(CallerRole::Player),
            user: with(CallerRole::User),
            base: with(CallerRole::Base),
        }
    }

    pub fn for_role(&self, role: CallerRole) -> &str {
        match role {
            CallerRole::Admin => &self.admin,
            CallerRole::Player => &self.player,
            CallerRole::User => &self.user,
            CallerRole::Base => &self.base,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urls_without_domain_key() {
        let urls = Settings::default().urls();
        assert_eq!(urls.user, "https://api.lootlocker.io/game");
        assert_eq!(urls.admin, "https://api.lootlocker.io/admin");
        assert_eq!(urls.player, "https://api.lootlocker.io/player");
        assert_eq!(urls.base, "https://api.lootlocker.io");
    }

    #[test]
    fn test_urls_with_domain_key() {
        let mut settings = Settings::default();
        settings.game.domain_key = Some("abc123".into());
        let urls = settings.urls();
        assert_eq!(urls.for_role(CallerRole::User), "https://abc123.api.lootlocker.io/game");
        assert_eq!(urls.for_role(CallerRole::Base), "https://abc123.api.lootlocker.io");
    }

    #[test]
    fn test_custom_host_and_protocol() {
        let mut settings = Settings::default();
        settings.server.protocol = "http://".into();
        settings.server.host = "127.0.0.1:8080/".into();
        assert_eq!(settings.base_url(CallerRole::Player), "http://127.0.0.1:8080/player");
        assert!(!settings.is_targeting_production());
    }
}
