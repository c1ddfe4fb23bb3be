//! Crate-level error type.

use thiserror::Error;

use crate::config::ConfigError;
use crate::timer::SchedulerError;

/// Errors raised while assembling an overlay or its environment.
///
/// The controller itself never fails; these only come from construction,
/// configuration loading and logging setup.
#[derive(Debug, Error)]
pub enum OverlayError {
    /// Configuration could not be loaded or parsed.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// No timer scheduler could be created.
    #[error("Scheduler error: {0}")]
    Scheduler(#[from] SchedulerError),

    /// The builder was not given a presenter.
    #[error("An overlay presenter is required")]
    MissingPresenter,

    /// The tracing subscriber could not be installed.
    #[error("Failed to initialize logging: {0}")]
    Logging(String),
}
