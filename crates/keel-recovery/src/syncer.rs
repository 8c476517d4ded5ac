//! Background polling of the server's recovery record.
//!
//! Each tick is a complete, idempotent unit of work: fetch the server's view
//! and write it into the store under the lock. A failed tick leaves the
//! last-known state untouched and is retried on the next tick, so shutdown
//! aborts the ticker outright with no drain.

use crate::client::{RecoveryServiceClient, RecoveryServiceError};
use crate::lock::RecoveryLock;
use crate::model::Recovery;
use crate::store::{RecoveryDao, RecoveryStoreError};
use futures::stream::{self, Stream};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Error type for one sync tick. Returned as a value, never thrown across
/// the ticker.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The status fetch failed.
    #[error(transparent)]
    Service(#[from] RecoveryServiceError),
    /// Writing the fetched state failed.
    #[error(transparent)]
    Store(#[from] RecoveryStoreError),
}

/// Handle to a launched sync loop. Dropping it leaves the loop running;
/// call [`SyncHandle::shutdown`] to stop it.
#[derive(Debug)]
pub struct SyncHandle {
    shutdown_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl SyncHandle {
    /// Stop the sync loop immediately.
    pub fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        self.handle.abort();
    }

    /// Whether the loop has exited.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

/// Pulls server recovery state into the store on a schedule.
pub struct RecoverySyncer {
    lock: Arc<RecoveryLock>,
    dao: Arc<RecoveryDao>,
    client: Arc<dyn RecoveryServiceClient>,
}

impl RecoverySyncer {
    /// Create the syncer for one account context.
    pub fn new(
        lock: Arc<RecoveryLock>,
        dao: Arc<RecoveryDao>,
        client: Arc<dyn RecoveryServiceClient>,
    ) -> Self {
        Self { lock, dao, client }
    }

    /// One sync tick: fetch the server's recovery record and write it into
    /// the store, under the lock.
    pub async fn perform_sync(&self) -> Result<(), SyncError> {
        let _guard = self.lock.acquire().await;
        let account_id = self.dao.account_id();
        let server = self.client.recovery_status(&account_id).await?;
        self.dao.set_active_server_recovery(server).await?;
        Ok(())
    }

    /// Launch the repeating sync loop. Ticks run only while `foreground`
    /// reads `true`; the first tick fires immediately.
    pub fn launch(
        self: &Arc<Self>,
        frequency: Duration,
        foreground: watch::Receiver<bool>,
    ) -> SyncHandle {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let syncer = Arc::clone(self);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(frequency);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = shutdown_rx.changed() => break,
                    _ = ticker.tick() => {
                        if !*foreground.borrow() {
                            continue;
                        }
                        if let Err(error) = syncer.perform_sync().await {
                            tracing::warn!(%error, "recovery sync tick failed");
                        }
                    }
                }
            }
        });
        SyncHandle {
            shutdown_tx,
            handle,
        }
    }

    /// Stream of derived recovery values with consecutive duplicates
    /// suppressed, so consumers do not react to no-op ticks. Yields the
    /// current value first.
    pub fn recovery_status(&self) -> impl Stream<Item = Recovery> + Send {
        let rx = self.dao.subscribe();
        stream::unfold(
            (rx, None::<Recovery>),
            |(mut rx, last)| async move {
                loop {
                    let current = rx.borrow_and_update().clone();
                    if last.as_ref() != Some(&current) {
                        return Some((current.clone(), (rx, Some(current))));
                    }
                    if rx.changed().await.is_err() {
                        return None;
                    }
                }
            },
        )
    }
}
