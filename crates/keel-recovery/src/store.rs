//! Durable persistence for the recovery domain.
//!
//! [`RecoveryDao`] is a per-account handle over two durable rows (the local
//! attempt and the active server recovery) plus a side table of spending
//! keysets recovered along the way. Rows are serialized with serde_json
//! behind the [`StorageEffects`] seam and mirrored in a reactive cache; every
//! mutation recomputes the derived [`Recovery`] value and publishes it on a
//! watch channel, so observers always see an internally consistent value.
//!
//! Writers must hold the [`crate::lock::RecoveryLock`]; the dao itself does
//! not acquire it.

use crate::model::{
    LocalRecoveryAttempt, LocalRecoveryProgress, Recovery, ServerRecovery, SpendingKeyset,
};
use crate::reconcile::reconcile;
use keel_core::{AccountId, StorageEffects, StorageError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{watch, RwLock};

/// Error type for recovery persistence.
#[derive(Debug, Error)]
pub enum RecoveryStoreError {
    /// The backing store failed.
    #[error(transparent)]
    Storage(#[from] StorageError),
    /// A row could not be (de)serialized.
    #[error("serialization error: {0}")]
    Serialization(String),
    /// A milestone was marked but no attempt row exists.
    #[error("no local recovery attempt to advance")]
    NoLocalAttempt,
    /// The row belongs to a different account than this dao.
    #[error("row belongs to account {actual}, dao is bound to {expected}")]
    WrongAccount {
        /// The dao's account.
        expected: AccountId,
        /// The row's account.
        actual: AccountId,
    },
}

#[derive(Debug, Default)]
struct Rows {
    attempt: Option<LocalRecoveryAttempt>,
    server: Option<ServerRecovery>,
    keysets: Vec<SpendingKeyset>,
}

/// Per-account durable store for the recovery domain.
pub struct RecoveryDao {
    account_id: AccountId,
    storage: Arc<dyn StorageEffects>,
    rows: RwLock<Rows>,
    recovery_tx: watch::Sender<Recovery>,
}

impl RecoveryDao {
    /// Load the dao for `account_id`, hydrating rows from storage.
    pub async fn load(
        storage: Arc<dyn StorageEffects>,
        account_id: AccountId,
    ) -> Result<Self, RecoveryStoreError> {
        let attempt: Option<LocalRecoveryAttempt> =
            read_json(storage.as_ref(), &attempt_key(&account_id)).await?;
        let server: Option<ServerRecovery> =
            read_json(storage.as_ref(), &server_key(&account_id)).await?;
        let keysets: Vec<SpendingKeyset> =
            read_json(storage.as_ref(), &keysets_key(&account_id))
                .await?
                .unwrap_or_default();

        let initial = reconcile(attempt.as_ref(), server.as_ref());
        let (recovery_tx, _rx) = watch::channel(initial);
        Ok(Self {
            account_id,
            storage,
            rows: RwLock::new(Rows {
                attempt,
                server,
                keysets,
            }),
            recovery_tx,
        })
    }

    /// The account this dao is bound to.
    pub fn account_id(&self) -> AccountId {
        self.account_id
    }

    /// The current derived recovery value.
    pub fn active_recovery(&self) -> Recovery {
        self.recovery_tx.borrow().clone()
    }

    /// Subscribe to derived recovery values. The receiver observes every
    /// recomputation, including ones that produce an equal value; consumers
    /// that only care about changes should deduplicate (the syncer's status
    /// stream does).
    pub fn subscribe(&self) -> watch::Receiver<Recovery> {
        self.recovery_tx.subscribe()
    }

    /// The live attempt row, if any.
    pub async fn local_attempt(&self) -> Option<LocalRecoveryAttempt> {
        self.rows.read().await.attempt.clone()
    }

    /// The server recovery row, if any.
    pub async fn active_server_recovery(&self) -> Option<ServerRecovery> {
        self.rows.read().await.server.clone()
    }

    /// Spending keysets recovered so far.
    pub async fn spending_keysets(&self) -> Vec<SpendingKeyset> {
        self.rows.read().await.keysets.clone()
    }

    /// Start a new attempt, replacing any previous attempt row wholesale.
    pub async fn create_attempt(
        &self,
        attempt: LocalRecoveryAttempt,
    ) -> Result<(), RecoveryStoreError> {
        if attempt.account_id != self.account_id {
            return Err(RecoveryStoreError::WrongAccount {
                expected: self.account_id,
                actual: attempt.account_id,
            });
        }

        let mut rows = self.rows.write().await;
        self.storage
            .store(&attempt_key(&self.account_id), to_json(&attempt)?)
            .await?;
        tracing::debug!(account_id = %self.account_id, lost_factor = %attempt.lost_factor,
            "created local recovery attempt");
        rows.attempt = Some(attempt);
        self.publish(&rows);
        Ok(())
    }

    /// Mark a milestone on the live attempt row. Idempotent.
    pub async fn set_local_progress(
        &self,
        progress: LocalRecoveryProgress,
    ) -> Result<(), RecoveryStoreError> {
        let mut rows = self.rows.write().await;
        let mut attempt = rows
            .attempt
            .clone()
            .ok_or(RecoveryStoreError::NoLocalAttempt)?;
        attempt.advance(&progress);
        self.storage
            .store(&attempt_key(&self.account_id), to_json(&attempt)?)
            .await?;

        if let LocalRecoveryProgress::CreatedSpendingKeys { keyset } = &progress {
            if !rows.keysets.iter().any(|existing| existing.id == keyset.id) {
                let mut keysets = rows.keysets.clone();
                keysets.push(keyset.clone());
                self.storage
                    .store(&keysets_key(&self.account_id), to_json(&keysets)?)
                    .await?;
                rows.keysets = keysets;
            }
        }

        tracing::debug!(account_id = %self.account_id, ?progress, "advanced local recovery attempt");
        rows.attempt = Some(attempt);
        self.publish(&rows);
        Ok(())
    }

    /// Upsert or clear the server recovery row.
    ///
    /// When an incoming row's destination matches the live attempt, the
    /// attempt is marked acknowledged. When the row clears, a pre-rotation
    /// attempt that has not captured a sealed CSEK is purged along with it:
    /// either the recovery was canceled, or an unconfirmed attempt is assumed
    /// failed. This loses a concurrently-successful initiation if the process
    /// died between server success and local confirmation; that race is
    /// accepted, and the next sync cannot resurrect the deleted row.
    pub async fn set_active_server_recovery(
        &self,
        server: Option<ServerRecovery>,
    ) -> Result<(), RecoveryStoreError> {
        let mut rows = self.rows.write().await;
        match server {
            Some(row) => {
                if row.account_id != self.account_id {
                    return Err(RecoveryStoreError::WrongAccount {
                        expected: self.account_id,
                        actual: row.account_id,
                    });
                }
                self.storage
                    .store(&server_key(&self.account_id), to_json(&row)?)
                    .await?;

                let acknowledged = rows.attempt.as_ref().is_some_and(|attempt| {
                    !attempt.server_initiated && row.destination == attempt.destination()
                });
                rows.server = Some(row);
                if acknowledged {
                    // The server recognizes our attempt; record that durably
                    // so a later disappearance of the row reads as "no longer
                    // recovering" rather than "never started".
                    let mut attempt = rows
                        .attempt
                        .clone()
                        .ok_or(RecoveryStoreError::NoLocalAttempt)?;
                    attempt.advance(&LocalRecoveryProgress::ServerInitiated);
                    self.storage
                        .store(&attempt_key(&self.account_id), to_json(&attempt)?)
                        .await?;
                    rows.attempt = Some(attempt);
                }
            }
            None => {
                self.storage.remove(&server_key(&self.account_id)).await?;
                rows.server = None;

                let purge = rows.attempt.as_ref().is_some_and(|attempt| {
                    !attempt.auth_keys_rotated && attempt.sealed_csek.is_none()
                });
                if purge {
                    self.storage.remove(&attempt_key(&self.account_id)).await?;
                    rows.attempt = None;
                    tracing::info!(account_id = %self.account_id,
                        "purged pre-rotation local recovery attempt after server recovery cleared");
                }
            }
        }
        self.publish(&rows);
        Ok(())
    }

    /// Remove both rows; the recovered keyset side table is kept for the
    /// sweep.
    pub async fn clear(&self) -> Result<(), RecoveryStoreError> {
        let mut rows = self.rows.write().await;
        self.storage.remove(&server_key(&self.account_id)).await?;
        self.storage.remove(&attempt_key(&self.account_id)).await?;
        rows.server = None;
        rows.attempt = None;
        self.publish(&rows);
        Ok(())
    }

    fn publish(&self, rows: &Rows) {
        let recovery = reconcile(rows.attempt.as_ref(), rows.server.as_ref());
        tracing::debug!(account_id = %self.account_id, recovery = %recovery, "recovery recomputed");
        self.recovery_tx.send_replace(recovery);
    }
}

fn attempt_key(account_id: &AccountId) -> String {
    format!("recovery/{account_id}/attempt")
}

fn server_key(account_id: &AccountId) -> String {
    format!("recovery/{account_id}/server")
}

fn keysets_key(account_id: &AccountId) -> String {
    format!("recovery/{account_id}/keysets")
}

async fn read_json<T: DeserializeOwned>(
    storage: &dyn StorageEffects,
    key: &str,
) -> Result<Option<T>, RecoveryStoreError> {
    match storage.retrieve(key).await? {
        None => Ok(None),
        Some(bytes) => serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| RecoveryStoreError::Serialization(e.to_string())),
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<Vec<u8>, RecoveryStoreError> {
    serde_json::to_vec(value).map_err(|e| RecoveryStoreError::Serialization(e.to_string()))
}
