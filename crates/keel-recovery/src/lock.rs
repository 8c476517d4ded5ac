//! The single mutual-exclusion gate around recovery-state mutation.
//!
//! Interactive flows and the background syncer both mutate the same two rows;
//! without serialization, a sync observing server state mid-initiation could
//! treat a not-yet-confirmed local attempt as orphaned and delete it. Every
//! read-then-write sequence holds this lock for its full duration, network
//! calls included.
//!
//! The lock is NOT re-entrant: a flow that acquires it must not call another
//! flow that acquires it again. Reads (`active_recovery`, the status stream)
//! are never gated.

use tokio::sync::{Mutex, MutexGuard};

/// One mutual-exclusion gate per account context.
#[derive(Debug, Default)]
pub struct RecoveryLock {
    inner: Mutex<()>,
}

/// Proof that the recovery lock is held. Dropping it releases the lock.
#[derive(Debug)]
pub struct RecoveryLockGuard<'a> {
    _guard: MutexGuard<'a, ()>,
}

impl RecoveryLock {
    /// Create an unlocked gate.
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the gate, waiting for any in-flight flow to finish.
    pub async fn acquire(&self) -> RecoveryLockGuard<'_> {
        RecoveryLockGuard {
            _guard: self.inner.lock().await,
        }
    }
}
