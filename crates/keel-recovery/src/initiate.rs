//! Beginning a recovery attempt for a lost app or lost hardware factor.
//!
//! Both initiators drive the identical sequence under the recovery lock:
//! persist the local attempt first, call the remote initiate endpoint, then
//! persist the returned server record. Persisting first means a crash after
//! the remote call is recoverable — the next sync observes the server row and
//! the reconciliation self-heals. Typed service errors propagate without
//! retry; retrying is the caller's decision.

use crate::client::{
    InitiateRecoveryClientError, InitiateRecoveryRequest, RecoveryServiceClient,
    RecoveryServiceError,
};
use crate::config::RecoveryConfig;
use crate::lock::RecoveryLock;
use crate::model::LocalRecoveryAttempt;
use crate::store::{RecoveryDao, RecoveryStoreError};
use keel_core::{AppKeyBundle, HardwareKeyBundle, HardwareProofOfPossession, LostFactor};
use std::sync::Arc;
use thiserror::Error;

/// Error type for initiation.
#[derive(Debug, Error)]
pub enum InitiateRecoveryError {
    /// Local persistence failed; the network was never touched.
    #[error(transparent)]
    Store(#[from] RecoveryStoreError),
    /// The remote initiate endpoint failed.
    #[error(transparent)]
    Client(#[from] InitiateRecoveryClientError),
}

/// Error type for the post-verification retry entry point, which does not
/// distinguish the individual service error codes.
#[derive(Debug, Error)]
pub enum RetryInitiationError {
    /// Local persistence failed.
    #[error(transparent)]
    Store(#[from] RecoveryStoreError),
    /// The remote initiate endpoint failed.
    #[error(transparent)]
    Service(#[from] RecoveryServiceError),
}

/// Request to recover from a lost app factor.
#[derive(Debug, Clone)]
pub struct LostAppRecoveryRequest {
    /// Freshly generated destination app keys.
    pub destination_app_keys: AppKeyBundle,
    /// Freshly generated destination hardware keys.
    pub destination_hardware_keys: HardwareKeyBundle,
    /// Hardware-signed proof binding the new app key to the existing
    /// hardware.
    pub proof_of_possession: HardwareProofOfPossession,
}

/// Request to recover from a lost hardware factor.
#[derive(Debug, Clone)]
pub struct LostHardwareRecoveryRequest {
    /// Freshly generated destination app keys.
    pub destination_app_keys: AppKeyBundle,
    /// Freshly generated destination hardware keys.
    pub destination_hardware_keys: HardwareKeyBundle,
}

/// Begins Lost-App recovery attempts.
pub struct LostAppRecoveryInitiator {
    lock: Arc<RecoveryLock>,
    dao: Arc<RecoveryDao>,
    client: Arc<dyn RecoveryServiceClient>,
    config: RecoveryConfig,
}

impl LostAppRecoveryInitiator {
    /// Create the initiator for one account context.
    pub fn new(
        lock: Arc<RecoveryLock>,
        dao: Arc<RecoveryDao>,
        client: Arc<dyn RecoveryServiceClient>,
        config: RecoveryConfig,
    ) -> Self {
        Self {
            lock,
            dao,
            client,
            config,
        }
    }

    /// Begin a Lost-App recovery.
    pub async fn initiate(
        &self,
        request: LostAppRecoveryRequest,
    ) -> Result<(), InitiateRecoveryError> {
        run_initiation(
            &self.lock,
            &self.dao,
            self.client.as_ref(),
            &self.config,
            LostFactor::App,
            request.destination_app_keys,
            request.destination_hardware_keys,
            Some(request.proof_of_possession),
        )
        .await
    }
}

/// Begins Lost-Hardware recovery attempts.
pub struct LostHardwareRecoveryInitiator {
    lock: Arc<RecoveryLock>,
    dao: Arc<RecoveryDao>,
    client: Arc<dyn RecoveryServiceClient>,
    config: RecoveryConfig,
}

impl LostHardwareRecoveryInitiator {
    /// Create the initiator for one account context.
    pub fn new(
        lock: Arc<RecoveryLock>,
        dao: Arc<RecoveryDao>,
        client: Arc<dyn RecoveryServiceClient>,
        config: RecoveryConfig,
    ) -> Self {
        Self {
            lock,
            dao,
            client,
            config,
        }
    }

    /// Begin a Lost-Hardware recovery. `RecoveryAlreadyExists` and
    /// `CommsVerificationRequired` surface as their own variants so the
    /// caller can branch.
    pub async fn initiate(
        &self,
        request: LostHardwareRecoveryRequest,
    ) -> Result<(), InitiateRecoveryError> {
        run_initiation(
            &self.lock,
            &self.dao,
            self.client.as_ref(),
            &self.config,
            LostFactor::Hardware,
            request.destination_app_keys,
            request.destination_hardware_keys,
            None,
        )
        .await
    }

    /// Re-attempt initiation after communications verification completed.
    /// Same sequence as [`Self::initiate`]; only the error granularity
    /// differs.
    pub async fn retry(
        &self,
        request: LostHardwareRecoveryRequest,
    ) -> Result<(), RetryInitiationError> {
        self.initiate(request).await.map_err(|error| match error {
            InitiateRecoveryError::Store(store) => RetryInitiationError::Store(store),
            InitiateRecoveryError::Client(InitiateRecoveryClientError::Service(service)) => {
                RetryInitiationError::Service(service)
            }
            InitiateRecoveryError::Client(client) => {
                RetryInitiationError::Service(RecoveryServiceError::Service(client.to_string()))
            }
        })
    }
}

#[allow(clippy::too_many_arguments)]
async fn run_initiation(
    lock: &RecoveryLock,
    dao: &RecoveryDao,
    client: &dyn RecoveryServiceClient,
    config: &RecoveryConfig,
    lost_factor: LostFactor,
    destination_app_keys: AppKeyBundle,
    destination_hardware_keys: HardwareKeyBundle,
    proof_of_possession: Option<HardwareProofOfPossession>,
) -> Result<(), InitiateRecoveryError> {
    let _guard = lock.acquire().await;
    let account_id = dao.account_id();
    tracing::info!(%account_id, %lost_factor, "initiating recovery");

    let attempt = LocalRecoveryAttempt::new(
        account_id,
        lost_factor,
        destination_app_keys,
        destination_hardware_keys,
    );
    let destination = attempt.destination();

    // Persist before the network call so a crash afterwards is recoverable.
    dao.create_attempt(attempt).await?;

    let server = client
        .initiate(
            &account_id,
            InitiateRecoveryRequest {
                lost_factor,
                destination,
                delay: config.delay_duration,
                proof_of_possession,
            },
        )
        .await?;

    // A failure from here on self-heals on the next sync cycle.
    dao.set_active_server_recovery(Some(server)).await?;
    tracing::info!(%account_id, %lost_factor, "recovery initiated");
    Ok(())
}
