//! A clock driven by hand.

use async_trait::async_trait;
use keel_core::PhysicalClock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Clock whose time only moves when told to. `sleep` advances time by the
/// requested duration and records the request, so tests can assert on
/// enforced waits without actually waiting.
#[derive(Debug, Default)]
pub struct ManualClock {
    now_millis: AtomicU64,
    sleeps: Mutex<Vec<Duration>>,
}

impl ManualClock {
    /// Create a clock starting at Unix millisecond `now_millis`.
    pub fn starting_at(now_millis: u64) -> Self {
        Self {
            now_millis: AtomicU64::new(now_millis),
            sleeps: Mutex::new(Vec::new()),
        }
    }

    /// Advance time by `duration` without recording a sleep.
    pub fn advance(&self, duration: Duration) {
        self.now_millis
            .fetch_add(duration.as_millis() as u64, Ordering::SeqCst);
    }

    /// The sleeps requested so far.
    pub fn recorded_sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl PhysicalClock for ManualClock {
    async fn now_millis(&self) -> u64 {
        self.now_millis.load(Ordering::SeqCst)
    }

    async fn sleep(&self, duration: Duration) {
        self.sleeps
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(duration);
        self.advance(duration);
    }
}
