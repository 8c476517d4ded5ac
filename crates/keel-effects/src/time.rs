//! System clock handler.

use async_trait::async_trait;
use keel_core::PhysicalClock;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Production clock delegating to the operating system.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl SystemClock {
    /// Create a system clock.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PhysicalClock for SystemClock {
    async fn now_millis(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::ZERO)
            .as_millis() as u64
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
