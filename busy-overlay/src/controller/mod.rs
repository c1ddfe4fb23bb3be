//! Debounced overlay controller.
//!
//! Counts tracked requests in flight and decides when the busy overlay
//! appears and disappears. Short requests never flash the overlay, and
//! back-to-back requests never make it blink off and on.
//!
//! # State Machine
//!
//! ```text
//! Idle --start (0→1)--> PendingShow
//! PendingShow --end (1→0) before show timer--> Idle        (show timer fires as a no-op)
//! PendingShow --show timer, pending > 0--> Visible
//! Visible --start--> Visible
//! Visible --end (→0)--> PendingHide
//! PendingHide --start (0→1) before hide timer--> Visible   (hide timer fires as a no-op)
//! PendingHide --hide timer, pending == 0--> Idle
//! ```
//!
//! Visibility only changes inside timer callbacks. Whether a callback acts is
//! decided by the pending count at fire time; there are no generation
//! counters.
//!
//! # Timers
//!
//! At most one show timer and one hide timer exist at a time. Arming a new
//! one cancels the one it supersedes. Hiding the overlay cancels an
//! outstanding show timer. A callback whose handle is no longer the armed
//! one is ignored, which covers a cancel racing a firing tokio timer.

mod state;

use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;

use crate::config::OverlayConfig;
use crate::measure::{MeasurementProvider, Position};
use crate::present::OverlayPresenter;
use crate::signal::RequestObserver;
use crate::timer::{TimerHandle, TimerId, TimerScheduler};

pub use state::{ControllerSnapshot, OverlayState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimerKind {
    Show,
    Hide,
}

impl TimerKind {
    fn as_str(&self) -> &'static str {
        match self {
            TimerKind::Show => "show",
            TimerKind::Hide => "hide",
        }
    }
}

/// Internal mutable state for the controller.
#[derive(Debug, Default)]
struct ControllerInner {
    pending: usize,
    visible: bool,
    show_timer: Option<TimerHandle>,
    hide_timer: Option<TimerHandle>,
}

impl ControllerInner {
    fn slot(&mut self, kind: TimerKind) -> &mut Option<TimerHandle> {
        match kind {
            TimerKind::Show => &mut self.show_timer,
            TimerKind::Hide => &mut self.hide_timer,
        }
    }

    /// Clear the slot if it holds timer `id`. Returns false for a stale timer.
    fn take_if_current(&mut self, kind: TimerKind, id: TimerId) -> bool {
        let slot = self.slot(kind);
        if slot.as_ref().map(TimerHandle::id) == Some(id) {
            *slot = None;
            true
        } else {
            false
        }
    }
}

/// Drives overlay visibility from request start/end notifications.
///
/// Created with [`OverlayController::new`], which returns an `Arc` because
/// armed timers hold a weak reference back to the controller. Dropping the
/// last `Arc` cancels outstanding timers.
///
/// # Example
///
/// ```
/// use busy_overlay::config::OverlayConfig;
/// use busy_overlay::controller::{OverlayController, OverlayState};
/// use busy_overlay::measure::FixedMeasurement;
/// use busy_overlay::present::RecordingPresenter;
/// use busy_overlay::timer::ManualScheduler;
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// let scheduler = Arc::new(ManualScheduler::new());
/// let presenter = Arc::new(RecordingPresenter::new());
/// let controller = OverlayController::new(
///     OverlayConfig::default(),
///     presenter.clone(),
///     Arc::new(FixedMeasurement::default()),
///     scheduler.clone(),
/// );
///
/// controller.notify_start();
/// scheduler.advance(Duration::from_millis(500));
/// assert_eq!(controller.state(), OverlayState::Visible);
///
/// controller.notify_end();
/// scheduler.advance(Duration::from_millis(500));
/// assert_eq!(controller.state(), OverlayState::Idle);
/// ```
pub struct OverlayController {
    config: OverlayConfig,
    presenter: Arc<dyn OverlayPresenter>,
    measurement: Arc<dyn MeasurementProvider>,
    scheduler: Arc<dyn TimerScheduler>,
    this: Weak<OverlayController>,
    inner: Mutex<ControllerInner>,
}

impl std::fmt::Debug for OverlayController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OverlayController")
            .field("config", &self.config)
            .field("inner", &self.inner)
            .finish_non_exhaustive()
    }
}

impl OverlayController {
    /// Create a controller with its own counter and timers.
    pub fn new(
        config: OverlayConfig,
        presenter: Arc<dyn OverlayPresenter>,
        measurement: Arc<dyn MeasurementProvider>,
        scheduler: Arc<dyn TimerScheduler>,
    ) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            config,
            presenter,
            measurement,
            scheduler,
            this: this.clone(),
            inner: Mutex::new(ControllerInner::default()),
        })
    }

    /// A tracked request started.
    ///
    /// On the first request in flight the show timer is armed for
    /// `delay_in`. A pending hide timer is left alone; it will find requests
    /// in flight when it fires and do nothing.
    pub fn notify_start(&self) {
        let mut inner = self.inner.lock();
        inner.pending += 1;
        tracing::trace!(pending = inner.pending, "Request started");

        if inner.pending == 1 {
            self.arm(&mut inner, TimerKind::Show, self.config.delay_in);
        }
    }

    /// A tracked request finished.
    ///
    /// With nothing pending this is a no-op: the counter never goes below
    /// zero. When the last request finishes the hide timer is armed for
    /// `delay_out`.
    pub fn notify_end(&self) {
        let mut inner = self.inner.lock();
        if inner.pending == 0 {
            tracing::trace!("Request end with nothing pending, ignoring");
            return;
        }

        inner.pending -= 1;
        tracing::trace!(pending = inner.pending, "Request finished");

        if inner.pending == 0 {
            self.arm(&mut inner, TimerKind::Hide, self.config.delay_out);
        }
    }

    /// Number of tracked requests in flight.
    pub fn pending_requests(&self) -> usize {
        self.inner.lock().pending
    }

    /// Whether the overlay is currently shown.
    pub fn is_visible(&self) -> bool {
        self.inner.lock().visible
    }

    /// Current logical state.
    pub fn state(&self) -> OverlayState {
        let inner = self.inner.lock();
        OverlayState::from_parts(inner.pending, inner.visible)
    }

    /// Point-in-time copy of counter, visibility and armed timers.
    pub fn snapshot(&self) -> ControllerSnapshot {
        let inner = self.inner.lock();
        ControllerSnapshot {
            pending: inner.pending,
            visible: inner.visible,
            show_armed: inner.show_timer.is_some(),
            hide_armed: inner.hide_timer.is_some(),
        }
    }

    pub fn config(&self) -> &OverlayConfig {
        &self.config
    }

    /// Arm a timer of `kind`, cancelling the one it supersedes.
    fn arm(&self, inner: &mut ControllerInner, kind: TimerKind, delay: Duration) {
        if let Some(stale) = inner.slot(kind).take() {
            stale.cancel();
            tracing::trace!(
                timer = kind.as_str(),
                timer_id = stale.id().as_u64(),
                "Superseded timer cancelled"
            );
        }

        let this = self.this.clone();
        let handle = self.scheduler.schedule(
            delay,
            Box::new(move |id: TimerId| {
                if let Some(controller) = this.upgrade() {
                    match kind {
                        TimerKind::Show => controller.on_show_timer(id),
                        TimerKind::Hide => controller.on_hide_timer(id),
                    }
                }
            }),
        );

        tracing::debug!(
            timer = kind.as_str(),
            timer_id = handle.id().as_u64(),
            delay_ms = delay.as_millis() as u64,
            "Timer armed"
        );
        *inner.slot(kind) = Some(handle);
    }

    fn on_show_timer(&self, id: TimerId) {
        let mut inner = self.inner.lock();
        if !inner.take_if_current(TimerKind::Show, id) {
            tracing::trace!(timer_id = id.as_u64(), "Stale show timer ignored");
            return;
        }

        if inner.pending == 0 {
            tracing::debug!("Requests settled before show delay, overlay stays hidden");
            return;
        }

        let viewport = self.measurement.viewport();
        let content = self.measurement.content_box();
        let position = Position::centered(viewport, content);
        self.presenter.render(position);

        if !inner.visible {
            inner.visible = true;
            self.presenter.set_visible(true);
            tracing::debug!(
                pending = inner.pending,
                top = position.top,
                left = position.left,
                "Overlay shown"
            );
        }
    }

    fn on_hide_timer(&self, id: TimerId) {
        let mut inner = self.inner.lock();
        if !inner.take_if_current(TimerKind::Hide, id) {
            tracing::trace!(timer_id = id.as_u64(), "Stale hide timer ignored");
            return;
        }

        if inner.pending > 0 {
            tracing::debug!(
                pending = inner.pending,
                "Request arrived during hide grace period, overlay stays"
            );
            return;
        }

        if let Some(show) = inner.show_timer.take() {
            show.cancel();
        }

        if inner.visible {
            inner.visible = false;
            self.presenter.set_visible(false);
            tracing::debug!("Overlay hidden");
        }
    }
}

impl RequestObserver for OverlayController {
    fn on_start(&self) {
        self.notify_start();
    }

    fn on_end(&self) {
        self.notify_end();
    }
}

impl Drop for OverlayController {
    fn drop(&mut self) {
        let inner = self.inner.get_mut();
        for timer in [inner.show_timer.take(), inner.hide_timer.take()]
            .into_iter()
            .flatten()
        {
            timer.cancel();
        }
    }
}
