//! Tokio-backed scheduler.
//!
//! Each timer is a spawned task racing `tokio::time::sleep` against its
//! cancellation token.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::{SchedulerError, TimerCallback, TimerHandle, TimerId, TimerScheduler};

/// Scheduler that runs timers on a tokio runtime.
#[derive(Debug)]
pub struct TokioScheduler {
    handle: Handle,
    origin: Instant,
    next_id: AtomicU64,
}

impl TokioScheduler {
    /// Create a scheduler bound to the given runtime.
    pub fn new(handle: Handle) -> Self {
        Self {
            handle,
            origin: Instant::now(),
            next_id: AtomicU64::new(0),
        }
    }

    /// Create a scheduler bound to the runtime of the calling thread.
    pub fn current() -> Result<Self, SchedulerError> {
        let handle = Handle::try_current().map_err(|e| SchedulerError::NoRuntime(e.to_string()))?;
        Ok(Self::new(handle))
    }
}

impl TimerScheduler for TokioScheduler {
    fn schedule(&self, delay: Duration, callback: TimerCallback) -> TimerHandle {
        let id = TimerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let fire_at = self.now() + delay;
        let token = CancellationToken::new();
        let task_token = token.clone();

        self.handle.spawn(async move {
            tokio::select! {
                _ = task_token.cancelled() => {
                    tracing::trace!(timer_id = id.as_u64(), "Timer cancelled");
                }
                _ = tokio::time::sleep(delay) => {
                    // Cancellation may land in the same tick as the deadline
                    if !task_token.is_cancelled() {
                        callback(id);
                    }
                }
            }
        });

        TimerHandle::new(id, fire_at, token)
    }

    fn now(&self) -> Duration {
        Instant::now().saturating_duration_since(self.origin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;

    fn flag_callback() -> (Arc<AtomicBool>, TimerCallback) {
        let flag = Arc::new(AtomicBool::new(false));
        let set = Arc::clone(&flag);
        (flag, Box::new(move |_: TimerId| set.store(true, Ordering::SeqCst)))
    }

    #[test]
    fn test_current_without_runtime_fails() {
        let result = TokioScheduler::current();
        assert!(matches!(result, Err(SchedulerError::NoRuntime(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_fires_after_delay() {
        let scheduler = TokioScheduler::current().unwrap();
        let (fired, callback) = flag_callback();

        let handle = scheduler.schedule(Duration::from_millis(500), callback);
        assert_eq!(handle.fire_at(), Duration::from_millis(500));

        tokio::time::sleep(Duration::from_millis(499)).await;
        assert!(!fired.load(Ordering::SeqCst));

        tokio::time::sleep(Duration::from_millis(2)).await;
        assert!(fired.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_timer_does_not_fire() {
        let scheduler = TokioScheduler::current().unwrap();
        let (fired, callback) = flag_callback();

        let handle = scheduler.schedule(Duration::from_millis(100), callback);
        handle.cancel();

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(!fired.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn test_clock_tracks_runtime_time() {
        let scheduler = TokioScheduler::current().unwrap();
        tokio::time::sleep(Duration::from_millis(250)).await;
        let now = scheduler.now();
        assert!(now >= Duration::from_millis(250), "clock lagged: {:?}", now);
        assert!(now < Duration::from_millis(260), "clock ran ahead: {:?}", now);
    }
}
