//! Tracing subscriber setup.
//!
//! Logs go to stderr with local timestamps. An optional log file receives the
//! same events through a non-blocking writer; keep the returned
//! [`LoggingGuard`] alive or buffered lines are lost on exit.

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::time::{FormatTime, LocalTime};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::error::OverlayError;

/// Timestamp layout for log lines.
const TIMESTAMP_FORMAT: &str =
    "[year]-[month]-[day] [hour]:[minute]:[second].[subsecond digits:3]";

/// Keeps the file writer flushing. Drop it at shutdown.
#[derive(Debug)]
pub struct LoggingGuard {
    _file: Option<WorkerGuard>,
}

/// Build the filter: `RUST_LOG` wins, otherwise `default_level`.
pub fn env_filter(default_level: &str) -> Result<EnvFilter, OverlayError> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(default_level)
            .map_err(|e| OverlayError::Logging(format!("invalid level '{}': {}", default_level, e))),
    }
}

/// Local-time timer using [`TIMESTAMP_FORMAT`].
fn local_timer() -> Result<impl FormatTime + Clone, OverlayError> {
    let format = time::format_description::parse(TIMESTAMP_FORMAT)
        .map_err(|e| OverlayError::Logging(format!("invalid timestamp format: {}", e)))?;
    Ok(LocalTime::new(format))
}

/// Install the global subscriber.
///
/// `log_file`, when given, is appended to (created if missing). Fails if a
/// global subscriber is already set.
pub fn init_logging(
    default_level: &str,
    log_file: Option<&Path>,
) -> Result<LoggingGuard, OverlayError> {
    let filter = env_filter(default_level)?;
    let timer = local_timer()?;

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_timer(timer.clone())
        .with_target(false);

    let (file_layer, file_guard) = match log_file {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let name = path.file_name().ok_or_else(|| {
                OverlayError::Logging(format!("log path has no file name: {}", path.display()))
            })?;

            let appender = tracing_appender::rolling::never(dir, name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_timer(timer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| OverlayError::Logging(e.to_string()))?;

    tracing::debug!(level = default_level, file = ?log_file, "Logging initialized");

    Ok(LoggingGuard { _file: file_guard })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_filter_accepts_levels() {
        assert!(env_filter("debug").is_ok());
        assert!(env_filter("busy_overlay=trace,warn").is_ok());
    }

    #[test]
    fn test_timestamp_format_parses() {
        assert!(local_timer().is_ok());
    }
}
