//! Overlay configuration.
//!
//! Each overlay instance is configured once, at construction. Values come
//! from one of three places:
//!
//! - builder methods on [`OverlayConfig`]
//! - string attributes as a host page binds them ([`OverlayConfig::from_attributes`])
//! - an INI file with an `[overlay]` section ([`OverlayConfig::load`])
//!
//! ```ini
//! [overlay]
//! delay_in_ms = 500
//! delay_out_ms = 500
//! animation = fade-in
//! ```

use std::path::Path;
use std::time::Duration;

use ini::Ini;
use thiserror::Error;

/// Default delay before the overlay appears, in milliseconds.
pub const DEFAULT_DELAY_IN_MS: u64 = 500;

/// Default grace period before the overlay disappears, in milliseconds.
pub const DEFAULT_DELAY_OUT_MS: u64 = 500;

/// INI section holding overlay settings.
pub const CONFIG_SECTION: &str = "overlay";

const KEY_DELAY_IN: &str = "delay_in_ms";
const KEY_DELAY_OUT: &str = "delay_out_ms";
const KEY_ANIMATION: &str = "animation";

/// Errors loading overlay configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration file is not valid INI.
    #[error("Failed to parse config: {0}")]
    Parse(String),

    /// A delay value is not a whole number of milliseconds.
    #[error("Invalid value for {key}: '{value}' (expected milliseconds)")]
    InvalidDelay { key: String, value: String },
}

/// Static configuration of one overlay instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlayConfig {
    /// How long requests must stay in flight before the overlay shows.
    pub delay_in: Duration,

    /// How long the overlay lingers after the last request finishes.
    pub delay_out: Duration,

    /// CSS class applied to the overlay container. Cosmetic only.
    pub animation: Option<String>,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            delay_in: Duration::from_millis(DEFAULT_DELAY_IN_MS),
            delay_out: Duration::from_millis(DEFAULT_DELAY_OUT_MS),
            animation: None,
        }
    }
}

impl OverlayConfig {
    pub fn with_delay_in(mut self, delay: Duration) -> Self {
        self.delay_in = delay;
        self
    }

    pub fn with_delay_out(mut self, delay: Duration) -> Self {
        self.delay_out = delay;
        self
    }

    pub fn with_animation(mut self, class: impl Into<String>) -> Self {
        self.animation = Some(class.into());
        self
    }

    /// Build from string attributes.
    ///
    /// Missing or blank values keep their defaults. `"0"` is a valid delay.
    ///
    /// ```
    /// use busy_overlay::config::OverlayConfig;
    /// use std::time::Duration;
    ///
    /// let config = OverlayConfig::from_attributes(Some("250"), None, Some("fade")).unwrap();
    /// assert_eq!(config.delay_in, Duration::from_millis(250));
    /// assert_eq!(config.delay_out, Duration::from_millis(500));
    /// assert_eq!(config.animation.as_deref(), Some("fade"));
    /// ```
    pub fn from_attributes(
        delay_in: Option<&str>,
        delay_out: Option<&str>,
        animation: Option<&str>,
    ) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            delay_in: parse_delay(KEY_DELAY_IN, delay_in)?.unwrap_or(defaults.delay_in),
            delay_out: parse_delay(KEY_DELAY_OUT, delay_out)?.unwrap_or(defaults.delay_out),
            animation: non_blank(animation).map(str::to_string),
        })
    }

    /// Parse INI text. Keys absent from the `[overlay]` section keep their defaults.
    pub fn from_ini_str(text: &str) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        let Some(section) = ini.section(Some(CONFIG_SECTION)) else {
            tracing::debug!("No [{}] section in config, using defaults", CONFIG_SECTION);
            return Ok(Self::default());
        };

        Self::from_attributes(
            section.get(KEY_DELAY_IN),
            section.get(KEY_DELAY_OUT),
            section.get(KEY_ANIMATION),
        )
    }

    /// Load from an INI file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_ini_str(&text)?;
        tracing::debug!(path = %path.display(), ?config, "Loaded overlay config");
        Ok(config)
    }

    /// Render as INI text that [`from_ini_str`](Self::from_ini_str) reads back.
    pub fn to_ini_string(&self) -> String {
        let mut ini = Ini::new();
        ini.set_to(
            Some(CONFIG_SECTION),
            KEY_DELAY_IN.to_string(),
            self.delay_in.as_millis().to_string(),
        );
        ini.set_to(
            Some(CONFIG_SECTION),
            KEY_DELAY_OUT.to_string(),
            self.delay_out.as_millis().to_string(),
        );
        if let Some(animation) = &self.animation {
            ini.set_to(Some(CONFIG_SECTION), KEY_ANIMATION.to_string(), animation.clone());
        }

        let mut buf = Vec::new();
        // Writing into a Vec cannot fail
        let _ = ini.write_to(&mut buf);
        String::from_utf8_lossy(&buf).into_owned()
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn parse_delay(key: &str, value: Option<&str>) -> Result<Option<Duration>, ConfigError> {
    match non_blank(value) {
        None => Ok(None),
        Some(raw) => raw
            .parse::<u64>()
            .map(|ms| Some(Duration::from_millis(ms)))
            .map_err(|_| ConfigError::InvalidDelay {
                key: key.to_string(),
                value: raw.to_string(),
            }),
    }
}
