//! Virtual-clock scheduler.
//!
//! Time only moves when [`ManualScheduler::advance`] or
//! [`ManualScheduler::advance_to`] is called. Due timers fire in
//! `(fire_at, id)` order, so two timers due at the same instant fire in the
//! order they were scheduled.

use std::collections::BTreeMap;
use std::time::Duration;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use super::{TimerCallback, TimerHandle, TimerId, TimerScheduler};

struct PendingTimer {
    id: TimerId,
    token: CancellationToken,
    callback: TimerCallback,
}

#[derive(Default)]
struct ManualState {
    now: Duration,
    next_id: u64,
    pending: BTreeMap<(Duration, TimerId), PendingTimer>,
}

/// Scheduler driven by an explicit virtual clock.
#[derive(Default)]
pub struct ManualScheduler {
    state: Mutex<ManualState>,
}

impl std::fmt::Debug for ManualScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("ManualScheduler")
            .field("now", &state.now)
            .field("pending", &state.pending.len())
            .finish()
    }
}

impl ManualScheduler {
    /// Create a scheduler whose clock starts at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Move the clock forward by `by`, firing every timer that falls due.
    pub fn advance(&self, by: Duration) {
        let target = self.state.lock().now + by;
        self.advance_to(target);
    }

    /// Move the clock to `target`, firing every timer due at or before it.
    ///
    /// A target in the past leaves the clock unchanged. Callbacks run without
    /// the scheduler lock held, so they may schedule new timers; those fire
    /// in the same call if they fall due before `target`.
    pub fn advance_to(&self, target: Duration) {
        loop {
            let due = {
                let mut state = self.state.lock();
                let next_key = state
                    .pending
                    .keys()
                    .next()
                    .copied()
                    .filter(|(fire_at, _)| *fire_at <= target);

                match next_key {
                    Some(key) => {
                        state.now = state.now.max(key.0);
                        state.pending.remove(&key)
                    }
                    None => {
                        state.now = state.now.max(target);
                        None
                    }
                }
            };

            match due {
                Some(timer) if !timer.token.is_cancelled() => (timer.callback)(timer.id),
                Some(_) => continue,
                None => break,
            }
        }
    }

    /// Number of timers still waiting to fire, excluding cancelled ones.
    pub fn pending(&self) -> usize {
        self.state
            .lock()
            .pending
            .values()
            .filter(|timer| !timer.token.is_cancelled())
            .count()
    }

    /// Fire time of the earliest live timer, if any.
    pub fn next_deadline(&self) -> Option<Duration> {
        self.state
            .lock()
            .pending
            .iter()
            .find(|(_, timer)| !timer.token.is_cancelled())
            .map(|((fire_at, _), _)| *fire_at)
    }
}

impl TimerScheduler for ManualScheduler {
    fn schedule(&self, delay: Duration, callback: TimerCallback) -> TimerHandle {
        let mut state = self.state.lock();
        let id = TimerId(state.next_id);
        state.next_id += 1;

        let fire_at = state.now + delay;
        let token = CancellationToken::new();
        state.pending.insert(
            (fire_at, id),
            PendingTimer {
                id,
                token: token.clone(),
                callback,
            },
        );

        TimerHandle::new(id, fire_at, token)
    }

    fn now(&self) -> Duration {
        self.state.lock().now
    }
}
