//! Physical wall-clock time effect.
//!
//! Flows that measure elapsed time or sleep do so through this trait so tests
//! can drive time by hand.

use async_trait::async_trait;
use std::time::Duration;

/// Wall-clock time and sleeping.
#[async_trait]
pub trait PhysicalClock: Send + Sync {
    /// Current Unix timestamp in milliseconds.
    async fn now_millis(&self) -> u64;

    /// Sleep for `duration`.
    async fn sleep(&self, duration: Duration);
}
