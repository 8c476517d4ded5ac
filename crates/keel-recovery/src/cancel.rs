//! Aborting a recovery, locally and remotely.

use crate::client::{CancelRecoveryClientError, RecoveryServiceClient};
use crate::lock::RecoveryLock;
use crate::store::{RecoveryDao, RecoveryStoreError};
use keel_core::HardwareProofOfPossession;
use std::sync::Arc;
use thiserror::Error;

/// Error type for cancellation.
#[derive(Debug, Error)]
pub enum CancelRecoveryError {
    /// Local persistence failed after the remote cancel succeeded.
    #[error(transparent)]
    Store(#[from] RecoveryStoreError),
    /// The remote cancel endpoint failed.
    #[error(transparent)]
    Client(#[from] CancelRecoveryClientError),
}

/// Cancels recovery attempts. Idempotent: canceling a recovery that another
/// actor already canceled still succeeds.
pub struct RecoveryCanceler {
    lock: Arc<RecoveryLock>,
    dao: Arc<RecoveryDao>,
    client: Arc<dyn RecoveryServiceClient>,
}

impl RecoveryCanceler {
    /// Create the canceler for one account context.
    pub fn new(
        lock: Arc<RecoveryLock>,
        dao: Arc<RecoveryDao>,
        client: Arc<dyn RecoveryServiceClient>,
    ) -> Self {
        Self { lock, dao, client }
    }

    /// Cancel the active recovery. A "no recovery exists" response counts as
    /// success; local state is then cleared through the same path as a server
    /// row transitioning to absent.
    pub async fn cancel(
        &self,
        proof_of_possession: Option<HardwareProofOfPossession>,
    ) -> Result<(), CancelRecoveryError> {
        let _guard = self.lock.acquire().await;
        let account_id = self.dao.account_id();

        let result = self
            .client
            .cancel(&account_id, proof_of_possession)
            .await;
        recover_when(result, |error| {
            matches!(error, CancelRecoveryClientError::NoRecoveryExists)
        })?;

        self.dao.set_active_server_recovery(None).await?;
        tracing::info!(%account_id, "recovery canceled");
        Ok(())
    }
}

/// Convert an error matching `predicate` into success; everything else
/// propagates untouched.
fn recover_when<E>(
    result: Result<(), E>,
    predicate: impl FnOnce(&E) -> bool,
) -> Result<(), E> {
    match result {
        Err(error) if predicate(&error) => Ok(()),
        other => other,
    }
}
