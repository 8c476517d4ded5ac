//! Recovery domain configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the recovery flows.
///
/// The delay duration is chosen outside this crate (it varies by network
/// environment) and passed through to the server at initiation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecoveryConfig {
    /// Delay window communicated to the server at initiation.
    pub delay_duration: Duration,

    /// Interval between background sync ticks.
    pub sync_frequency: Duration,

    /// Enforced minimum wall-clock duration of the auth key rotation critical
    /// section, so downstream UI transitions are not jarring.
    pub minimum_rotation_duration: Duration,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            delay_duration: Duration::from_secs(7 * 24 * 60 * 60),
            sync_frequency: Duration::from_secs(30),
            minimum_rotation_duration: Duration::from_secs(2),
        }
    }
}
