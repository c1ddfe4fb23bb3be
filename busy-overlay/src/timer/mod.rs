//! Cancellable one-shot timers.
//!
//! The overlay controller never sleeps. It arms timers through the
//! [`TimerScheduler`] trait and reacts when they fire. Two schedulers are
//! provided:
//!
//! - [`TokioScheduler`] - real timers on a tokio runtime
//! - [`ManualScheduler`] - a virtual clock advanced explicitly, used for
//!   deterministic replay and tests
//!
//! # Cancellation
//!
//! Every scheduled timer is represented by a [`TimerHandle`]. Cancelling a
//! handle that has already fired or was already cancelled does nothing.
//!
//! ```
//! use busy_overlay::timer::{ManualScheduler, TimerId, TimerScheduler};
//! use std::sync::atomic::{AtomicBool, Ordering};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let scheduler = ManualScheduler::new();
//! let fired = Arc::new(AtomicBool::new(false));
//! let flag = Arc::clone(&fired);
//!
//! let handle = scheduler.schedule(
//!     Duration::from_millis(500),
//!     Box::new(move |_: TimerId| flag.store(true, Ordering::SeqCst)),
//! );
//! handle.cancel();
//! scheduler.advance(Duration::from_secs(1));
//!
//! assert!(!fired.load(Ordering::SeqCst));
//! ```

mod manual;
mod runtime;

use std::fmt;
use std::time::Duration;

use thiserror::Error;
use tokio_util::sync::CancellationToken;

pub use manual::ManualScheduler;
pub use runtime::TokioScheduler;

/// Work to run when a timer fires. Receives the id of the timer that fired.
pub type TimerCallback = Box<dyn FnOnce(TimerId) + Send + 'static>;

/// Errors raised when creating a scheduler.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// No tokio runtime is available on the current thread.
    #[error("No tokio runtime available: {0}")]
    NoRuntime(String),
}

/// Identifier of a scheduled timer, unique per scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerId(pub(crate) u64);

impl TimerId {
    /// Raw numeric value, for logging.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "timer#{}", self.0)
    }
}

/// Handle to a scheduled timer.
///
/// Dropping the handle does NOT cancel the timer; call [`cancel`](Self::cancel).
#[derive(Debug, Clone)]
pub struct TimerHandle {
    id: TimerId,
    fire_at: Duration,
    token: CancellationToken,
}

impl TimerHandle {
    pub(crate) fn new(id: TimerId, fire_at: Duration, token: CancellationToken) -> Self {
        Self { id, fire_at, token }
    }

    /// Identifier assigned by the scheduler.
    pub fn id(&self) -> TimerId {
        self.id
    }

    /// Logical fire time, measured on the scheduler's clock.
    pub fn fire_at(&self) -> Duration {
        self.fire_at
    }

    /// Cancel the timer. Safe to call more than once or after it fired.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Whether [`cancel`](Self::cancel) has been called.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// Schedules one-shot callbacks.
///
/// Implementations must never invoke the callback synchronously from
/// `schedule`; callers may hold locks while arming timers.
pub trait TimerScheduler: Send + Sync {
    /// Run `callback` once after `delay`, unless cancelled first.
    fn schedule(&self, delay: Duration, callback: TimerCallback) -> TimerHandle;

    /// Current time on this scheduler's clock, relative to its creation.
    fn now(&self) -> Duration;
}
