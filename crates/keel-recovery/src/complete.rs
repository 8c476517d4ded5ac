//! Finalizing a recovery once the delay window has elapsed.
//!
//! Completion is two operations the caller drives in order: rotate the auth
//! keys on the server (the remote `complete` call), then prove the new keys
//! by obtaining tokens with them and mark [`LocalRecoveryProgress::RotatedAuthKeys`]
//! — the single transition that flips reconciliation into server-independent
//! mode. Nothing here retries: resuming a partially-applied key rotation
//! safely requires caller-level judgment about whether to resume or restart.

use crate::client::{CompletionAttempt, RecoveryServiceClient, RecoveryServiceError};
use crate::config::RecoveryConfig;
use crate::effects::{AccountError, AuthError, CompletionEffects, SigningError};
use crate::lock::RecoveryLock;
use crate::model::LocalRecoveryProgress;
use crate::store::{RecoveryDao, RecoveryStoreError};
use keel_core::{
    AuthTokenScope, CompletionChallenge, HardwareSignature, PhysicalClock, SealedCsek, SealedSsek,
};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Error type for the auth key rotation step.
#[derive(Debug, Error)]
pub enum CompleteRecoveryError {
    /// The challenge did not verify against the destination hardware auth
    /// key. Checked before any I/O.
    #[error("challenge was not signed by the destination hardware factor")]
    ChallengeNotSignedByHardware,
    /// No attempt row exists to complete.
    #[error("no recovery attempt is awaiting completion")]
    NoPendingAttempt,
    /// Persisting the completion milestone failed.
    #[error(transparent)]
    Store(#[from] RecoveryStoreError),
    /// Signing with the destination app key failed.
    #[error(transparent)]
    Signing(#[from] SigningError),
    /// The remote complete endpoint failed.
    #[error(transparent)]
    Service(#[from] RecoveryServiceError),
}

/// Error type for the token rotation step.
#[derive(Debug, Error)]
pub enum RotateAuthTokensError {
    /// No attempt row exists to complete.
    #[error("no recovery attempt is awaiting completion")]
    NoPendingAttempt,
    /// Token issuance or persistence failed.
    #[error(transparent)]
    Auth(#[from] AuthError),
    /// Rotating the active account's stored keys failed.
    #[error(transparent)]
    Account(#[from] AccountError),
    /// Marking the milestone failed.
    #[error(transparent)]
    Store(#[from] RecoveryStoreError),
}

/// Finalizes recovery attempts after the delay elapses.
pub struct RecoveryCompleter {
    lock: Arc<RecoveryLock>,
    dao: Arc<RecoveryDao>,
    client: Arc<dyn RecoveryServiceClient>,
    effects: CompletionEffects,
    config: RecoveryConfig,
}

impl RecoveryCompleter {
    /// Create the completer for one account context.
    pub fn new(
        lock: Arc<RecoveryLock>,
        dao: Arc<RecoveryDao>,
        client: Arc<dyn RecoveryServiceClient>,
        effects: CompletionEffects,
        config: RecoveryConfig,
    ) -> Self {
        Self {
            lock,
            dao,
            client,
            effects,
            config,
        }
    }

    /// Rotate the auth keys on the server.
    ///
    /// Verifies the hardware signature before touching anything, persists the
    /// completion milestone (capturing the sealed sweep keys) before the
    /// network call, signs the same challenge with the destination app key,
    /// and calls the remote complete endpoint with both signatures. The
    /// critical section is held to a minimum wall-clock duration.
    pub async fn rotate_auth_keys(
        &self,
        challenge: CompletionChallenge,
        hardware_signature: HardwareSignature,
        sealed_csek: SealedCsek,
        sealed_ssek: SealedSsek,
    ) -> Result<(), CompleteRecoveryError> {
        let attempt = self
            .dao
            .local_attempt()
            .await
            .ok_or(CompleteRecoveryError::NoPendingAttempt)?;

        if !self.effects.verifier.verify(
            &attempt.destination_hardware_keys.auth,
            &challenge,
            &hardware_signature,
        ) {
            return Err(CompleteRecoveryError::ChallengeNotSignedByHardware);
        }

        let account_id = self.dao.account_id();
        tracing::info!(%account_id, "rotating auth keys to complete recovery");

        with_minimum_duration(
            self.effects.clock.as_ref(),
            self.config.minimum_rotation_duration,
            async {
                let _guard = self.lock.acquire().await;

                // Capture the sealed keys durably before the network call;
                // the sweep needs them even if we crash right after the
                // server completes.
                self.dao
                    .set_local_progress(LocalRecoveryProgress::AttemptingCompletion {
                        sealed_csek,
                        sealed_ssek,
                    })
                    .await?;

                let app_signature = self
                    .effects
                    .signer
                    .sign(&attempt.destination_app_keys.auth, challenge.as_bytes())
                    .await?;

                self.client
                    .complete(
                        &account_id,
                        CompletionAttempt {
                            challenge,
                            app_signature,
                            hardware_signature,
                        },
                    )
                    .await?;
                Ok(())
            },
        )
        .await
    }

    /// Prove the new keys by obtaining fresh tokens with them, rotate the
    /// active account's stored keys when one is still active (the
    /// Lost-Hardware case), persist the tokens, and mark
    /// `RotatedAuthKeys`.
    pub async fn rotate_auth_tokens(&self) -> Result<(), RotateAuthTokensError> {
        let _guard = self.lock.acquire().await;
        let account_id = self.dao.account_id();
        let attempt = self
            .dao
            .local_attempt()
            .await
            .ok_or(RotateAuthTokensError::NoPendingAttempt)?;
        let keys = &attempt.destination_app_keys;

        let global = self
            .effects
            .auth
            .refresh_tokens(&account_id, keys, AuthTokenScope::Global)
            .await?;
        let recovery = self
            .effects
            .auth
            .refresh_tokens(&account_id, keys, AuthTokenScope::Recovery)
            .await?;

        if let Some(active) = self.effects.accounts.active_account(&account_id).await? {
            // Lost-Hardware: the full account stays active throughout its own
            // recovery and must pick up the new keys.
            self.effects
                .accounts
                .rotate_auth_keys(&active.account_id, keys)
                .await?;
        }

        self.effects
            .auth
            .store_tokens(&account_id, AuthTokenScope::Global, &global)
            .await?;
        self.effects
            .auth
            .store_tokens(&account_id, AuthTokenScope::Recovery, &recovery)
            .await?;

        self.dao
            .set_local_progress(LocalRecoveryProgress::RotatedAuthKeys)
            .await?;
        tracing::info!(%account_id, "auth keys rotated; recovery is now server-independent");
        Ok(())
    }
}

/// Run `operation` and stretch its wall-clock duration to at least `minimum`.
async fn with_minimum_duration<T>(
    clock: &dyn PhysicalClock,
    minimum: Duration,
    operation: impl Future<Output = T>,
) -> T {
    let started = clock.now_millis().await;
    let value = operation.await;
    let elapsed = Duration::from_millis(clock.now_millis().await.saturating_sub(started));
    if let Some(remaining) = minimum.checked_sub(elapsed) {
        if !remaining.is_zero() {
            clock.sleep(remaining).await;
        }
    }
    value
}
