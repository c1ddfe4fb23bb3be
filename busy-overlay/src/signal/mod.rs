//! Request signal adapters.
//!
//! Requests reach the page through unrelated mechanisms. Each adapter in this
//! module watches one of them and reports request begin/end to a
//! [`RequestObserver`], nothing more:
//!
//! ```text
//! HTTP pipeline ──► PipelineAdapter ──┐
//!                                     ├──► RequestObserver (OverlayController)
//! AJAX event bus ─► LegacyBusAdapter ─┘
//! ```
//!
//! Adapters are independent and optional. They keep no per-request state and
//! their notifications may interleave in any order.
//!
//! # Opting out
//!
//! A request whose [`RequestConfig::skip_overlay`] flag is set is invisible
//! to every adapter: it is neither counted at start nor at end.

pub mod legacy;
pub mod pipeline;

use std::fmt;

/// Receives normalized request lifecycle notifications.
pub trait RequestObserver: Send + Sync {
    /// A tracked request started.
    fn on_start(&self);

    /// A tracked request finished, successfully or not.
    fn on_end(&self);
}

/// Which mechanism a notification came from. Used for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalSource {
    Pipeline,
    LegacyBus,
}

impl SignalSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalSource::Pipeline => "pipeline",
            SignalSource::LegacyBus => "legacy-bus",
        }
    }
}

impl fmt::Display for SignalSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-request options seen by the adapters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestConfig {
    pub method: String,
    pub url: String,
    /// Exclude this request from overlay tracking.
    pub skip_overlay: bool,
}

impl RequestConfig {
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            url: url.into(),
            skip_overlay: false,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new("GET", url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new("POST", url)
    }

    /// Mark the request as excluded from overlay tracking.
    pub fn skip_overlay(mut self) -> Self {
        self.skip_overlay = true;
        self
    }

    /// Whether adapters should report this request.
    pub fn is_tracked(&self) -> bool {
        !self.skip_overlay
    }
}

/// Report a start to `observer` unless `config` opts out.
pub(crate) fn report_start(
    observer: &dyn RequestObserver,
    source: SignalSource,
    config: Option<&RequestConfig>,
) {
    match config {
        Some(config) if config.is_tracked() => {
            tracing::trace!(%source, method = %config.method, url = %config.url, "Request start");
            observer.on_start();
        }
        Some(config) => {
            tracing::trace!(%source, url = %config.url, "Skipping untracked request");
        }
        None => {}
    }
}

/// Report an end to `observer` unless `config` is missing or opts out.
pub(crate) fn report_end(
    observer: &dyn RequestObserver,
    source: SignalSource,
    config: Option<&RequestConfig>,
) {
    if let Some(config) = config.filter(|c| c.is_tracked()) {
        tracing::trace!(%source, method = %config.method, url = %config.url, "Request end");
        observer.on_end();
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::RequestObserver;

    /// Observer that counts notifications.
    #[derive(Debug, Default)]
    pub struct CountingObserver {
        starts: AtomicUsize,
        ends: AtomicUsize,
    }

    impl CountingObserver {
        pub fn starts(&self) -> usize {
            self.starts.load(Ordering::SeqCst)
        }

        pub fn ends(&self) -> usize {
            self.ends.load(Ordering::SeqCst)
        }
    }

    impl RequestObserver for CountingObserver {
        fn on_start(&self) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }

        fn on_end(&self) {
            self.ends.fetch_add(1, Ordering::SeqCst);
        }
    }
}
