//! CLI error type.

use busy_overlay::config::ConfigError;
use busy_overlay::OverlayError;
use thiserror::Error;

/// Errors surfaced to the user by the CLI.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("{0}")]
    Overlay(#[from] OverlayError),

    /// A line of a request script could not be parsed.
    #[error("Script line {line}: {message}")]
    Script { line: usize, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to encode JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        CliError::Overlay(OverlayError::Config(e))
    }
}
