//! Presentation collaborator.
//!
//! The controller decides *when* the overlay shows and where its content
//! goes; an [`OverlayPresenter`] does the drawing. Implementations:
//!
//! - [`TracingPresenter`] - emits structured log events only
//! - [`RecordingPresenter`] - keeps a timeline of calls, used by replay and tests

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;

use crate::measure::Position;
use crate::timer::TimerScheduler;

/// Draws the overlay.
///
/// Called while the controller holds its state lock: implementations must
/// not call back into the controller.
pub trait OverlayPresenter: Send + Sync {
    /// Move the overlay content box to `position`.
    fn render(&self, position: Position);

    /// Show or hide the overlay.
    fn set_visible(&self, visible: bool);
}

/// Presenter that only logs.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingPresenter;

impl OverlayPresenter for TracingPresenter {
    fn render(&self, position: Position) {
        tracing::debug!(top = position.top, left = position.left, "Overlay positioned");
    }

    fn set_visible(&self, visible: bool) {
        tracing::info!(visible, "Overlay visibility changed");
    }
}

/// A single presenter call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PresenterEvent {
    Render { position: Position },
    Visibility { visible: bool },
}

/// A presenter call stamped with the scheduler time it happened at.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TimedEvent {
    #[serde(rename = "at_ms", serialize_with = "serialize_millis")]
    pub at: Duration,
    #[serde(flatten)]
    pub event: PresenterEvent,
}

fn serialize_millis<S: serde::Serializer>(at: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(at.as_millis() as u64)
}

/// Presenter that records every call.
///
/// With a clock attached (see [`with_clock`](Self::with_clock)) each event is
/// stamped with the scheduler time; otherwise the stamp is zero.
#[derive(Default)]
pub struct RecordingPresenter {
    clock: Option<Arc<dyn TimerScheduler>>,
    events: Mutex<Vec<TimedEvent>>,
}

impl std::fmt::Debug for RecordingPresenter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordingPresenter")
            .field("events", &self.events.lock().len())
            .finish_non_exhaustive()
    }
}

impl RecordingPresenter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stamp recorded events with `clock`'s current time.
    pub fn with_clock(clock: Arc<dyn TimerScheduler>) -> Self {
        Self {
            clock: Some(clock),
            events: Mutex::new(Vec::new()),
        }
    }

    /// All recorded calls, oldest first.
    pub fn timeline(&self) -> Vec<TimedEvent> {
        self.events.lock().clone()
    }

    /// Recorded calls without timestamps.
    pub fn events(&self) -> Vec<PresenterEvent> {
        self.events.lock().iter().map(|e| e.event).collect()
    }

    /// Only the visibility changes, with their timestamps.
    pub fn visibility_changes(&self) -> Vec<(Duration, bool)> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e.event {
                PresenterEvent::Visibility { visible } => Some((e.at, visible)),
                PresenterEvent::Render { .. } => None,
            })
            .collect()
    }

    /// Position from the most recent render call.
    pub fn last_position(&self) -> Option<Position> {
        self.events.lock().iter().rev().find_map(|e| match e.event {
            PresenterEvent::Render { position } => Some(position),
            PresenterEvent::Visibility { .. } => None,
        })
    }

    fn record(&self, event: PresenterEvent) {
        let at = self.clock.as_ref().map(|c| c.now()).unwrap_or_default();
        self.events.lock().push(TimedEvent { at, event });
    }
}

impl OverlayPresenter for RecordingPresenter {
    fn render(&self, position: Position) {
        self.record(PresenterEvent::Render { position });
    }

    fn set_visible(&self, visible: bool) {
        self.record(PresenterEvent::Visibility { visible });
    }
}
