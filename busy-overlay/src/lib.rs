//! busy-overlay - debounced busy indicator driven by request traffic
//!
//! Tracks requests in flight across unrelated transport mechanisms and
//! decides when a "busy" overlay should appear and disappear. Requests that
//! finish within the show delay never flash the overlay, and a request that
//! starts during the hide grace period keeps it on screen.
//!
//! # Architecture
//!
//! ```text
//! HTTP pipeline ──► PipelineAdapter ──┐
//!                                     ├──► OverlayController ──► OverlayPresenter
//! AJAX event bus ─► LegacyBusAdapter ─┘          │    ▲
//!                                                ▼    │
//!                                  TimerScheduler    MeasurementProvider
//! ```
//!
//! - [`signal`] - adapters turning each mechanism into start/end notifications
//! - [`controller`] - request counter and show/hide state machine
//! - [`timer`] - cancellable one-shot timers (tokio or manual clock)
//! - [`measure`] - viewport and content box sizes for centering
//! - [`present`] - drawing collaborator
//! - [`builder`] - explicit per-instance composition
//!
//! Configuration lives in [`config`], markup generation in [`markup`] and
//! subscriber setup in [`logging`].

pub mod builder;
pub mod config;
pub mod controller;
pub mod error;
pub mod logging;
pub mod markup;
pub mod measure;
pub mod present;
pub mod signal;
pub mod timer;

pub use builder::{Overlay, OverlayBuilder};
pub use config::OverlayConfig;
pub use controller::{OverlayController, OverlayState};
pub use error::OverlayError;
