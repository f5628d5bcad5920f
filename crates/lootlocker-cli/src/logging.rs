//! Tracing subscriber setup for the `ll` binary.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use ll_config::DebugLevel;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::EnvFilter;

/// `RUST_LOG` wins; otherwise the persisted debug level decides.
pub fn env_filter(level: DebugLevel) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.filter_directive()))
}

/// Create a log writer for `{log_dir}/ll-{timestamp}.log`.
///
/// Returns a non-blocking writer and a worker guard that must be kept alive
/// for the duration of logging.
pub fn create_log_writer(log_dir: &Path) -> Result<(NonBlocking, WorkerGuard)> {
    std::fs::create_dir_all(log_dir)
        .with_context(|| format!("Failed to create log directory: {}", log_dir.display()))?;
    let file_name = format!("ll-{}.log", Utc::now().format("%Y%m%d-%H%M%S"));
    let file_appender = tracing_appender::rolling::never(log_dir, file_name);
    Ok(tracing_appender::non_blocking(file_appender))
}

/// Install the global subscriber: stderr by default, a log file when `log_dir` is set.
pub fn init(level: DebugLevel, log_dir: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let filter = env_filter(level);
    let Some(log_dir) = log_dir else {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(filter)
            .try_init()
            .ok();
        return Ok(None);
    };

    let (writer, guard) = create_log_writer(log_dir)?;
    tracing_subscriber::fmt()
        .with_writer(writer)
        .with_ansi(false)
        .with_env_filter(filter)
        .try_init()
        .ok();
    Ok(Some(guard))
}
