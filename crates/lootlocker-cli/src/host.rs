//! Stands in for a host's per-frame callback: ticks the scheduler on a
//! fixed interval until the call it is waiting for has been delivered.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use ll_client::{PendingResponse, Response, ServerApi, ServerRequest};
use ll_config::Settings;
use ll_core::Platform;
use ll_scheduler::Scheduler;
use ll_session::{IdentifierSource, PlatformDispatch, SessionProvider, StartNewSession};
use tokio::time::MissedTickBehavior;
use tracing::{debug, trace};

use crate::guest::GuestSessionProvider;

pub const TICK_INTERVAL: Duration = Duration::from_millis(16);

/// Pipeline for the binary. Only guest sessions can be re-established.
pub fn build_api(settings: Settings) -> ServerApi {
    let base = ServerApi::builder(settings).build();
    let guest: Arc<dyn SessionProvider> = Arc::new(GuestSessionProvider::new(base.clone()));
    base.with_dispatch(PlatformDispatch::empty().with(
        Platform::Guest,
        Arc::new(StartNewSession::new(guest, IdentifierSource::PlayerIdentifier)),
    ))
}

/// Queue `request` and tick until its response arrives.
pub async fn run_request(api: &ServerApi, request: ServerRequest) -> Result<Response> {
    let pending = api.enqueue(request).await?;
    drive(api.scheduler(), pending).await
}

pub async fn drive(scheduler: &Scheduler, mut pending: PendingResponse) -> Result<Response> {
    let mut interval = tokio::time::interval(TICK_INTERVAL);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut ticks = 0u64;
    loop {
        if let Some(response) = pending.try_take() {
            debug!(ticks, "response delivered");
            return Ok(response);
        }
        if scheduler.is_empty()? {
            // Nothing left that could deliver; resolves to an abandoned-call error.
            return Ok(pending.await);
        }
        interval.tick().await;
        let report = scheduler.tick().await?;
        ticks += 1;
        trace!(
            tick = ticks,
            advanced = report.advanced,
            completed = report.completed,
            remaining = report.remaining,
            "scheduler tick"
        );
    }
}

/// Write the current session back to the settings file when it changed.
pub fn persist_session(api: &ServerApi, mut settings: Settings, path: &Path) -> Result<()> {
    let before = settings.session.clone();
    api.session().persist_into(&mut settings);
    if settings.session == before {
        return Ok(());
    }
    settings.save(path)?;
    debug!(path = %path.display(), "session saved");
    Ok(())
}
