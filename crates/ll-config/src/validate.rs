use anyhow::{Result, bail};

use crate::settings::Settings;

/// Reject settings the pipeline cannot build requests from.
pub fn validate_settings(settings: &Settings) -> Result<()> {
    if !settings.server.protocol.ends_with("://") {
        bail!(
            "server.protocol must end with '://', got '{}'",
            settings.server.protocol
        );
    }
    if settings.server.host.trim().is_empty() {
        bail!("server.host must not be empty");
    }
    let timeout = settings.server.request_timeout_secs;
    if !timeout.is_finite() || timeout <= 0.0 {
        bail!("server.request_timeout_secs must be a positive number, got {timeout}");
    }
    if let Some(domain_key) = settings.game.domain_key.as_deref()
        && domain_key.contains(['/', ':', '.'])
    {
        bail!("game.domain_key must be a bare subdomain label, got '{domain_key}'");
    }
    Ok(())
}
