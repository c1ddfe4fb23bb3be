//! Common types and utilities shared across CLI commands.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use busy_overlay::config::OverlayConfig;
use clap::{Args, ValueEnum};

use crate::error::CliError;

/// Configuration overrides accepted by every command.
#[derive(Debug, Clone, Default, Args)]
pub struct ConfigArgs {
    /// Path to a config.ini (default: <config dir>/busy-overlay/config.ini)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Show delay in milliseconds
    #[arg(long, value_name = "MS")]
    pub delay_in: Option<u64>,

    /// Hide delay in milliseconds
    #[arg(long, value_name = "MS")]
    pub delay_out: Option<u64>,

    /// Animation class applied to the overlay container
    #[arg(long, value_name = "CLASS")]
    pub animation: Option<String>,
}

/// Output format selection.
#[derive(Debug, Clone, Copy, Default, ValueEnum, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable text
    #[default]
    Text,
    /// JSON document
    Json,
}

/// Where the base configuration came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    File(PathBuf),
    Defaults,
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigSource::File(path) => write!(f, "{}", path.display()),
            ConfigSource::Defaults => f.write_str("built-in defaults"),
        }
    }
}

/// Default config file location.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("busy-overlay").join("config.ini"))
}

/// Resolve the overlay configuration: CLI > config file > defaults.
///
/// An explicitly given file must exist. The default location is used only
/// when present.
pub fn resolve_config(args: &ConfigArgs) -> Result<(OverlayConfig, ConfigSource), CliError> {
    let (base, source) = match &args.config {
        Some(path) => (OverlayConfig::load(path)?, ConfigSource::File(path.clone())),
        None => match default_config_path().filter(|p| p.is_file()) {
            Some(path) => (OverlayConfig::load(&path)?, ConfigSource::File(path)),
            None => (OverlayConfig::default(), ConfigSource::Defaults),
        },
    };

    Ok((apply_overrides(base, args), source))
}

fn apply_overrides(mut config: OverlayConfig, args: &ConfigArgs) -> OverlayConfig {
    if let Some(ms) = args.delay_in {
        config = config.with_delay_in(Duration::from_millis(ms));
    }
    if let Some(ms) = args.delay_out {
        config = config.with_delay_out(Duration::from_millis(ms));
    }
    if let Some(class) = &args.animation {
        config = config.with_animation(class.clone());
    }
    config
}

/// Read a text input, `-` meaning stdin.
pub fn read_input(path: &Path) -> Result<String, CliError> {
    if path == Path::new("-") {
        let mut text = String::new();
        std::io::Read::read_to_string(&mut std::io::stdin(), &mut text)?;
        Ok(text)
    } else {
        Ok(std::fs::read_to_string(path)?)
    }
}
