//! Shared rig wiring the recovery components against the testkit fakes.

#![allow(dead_code)]

use keel_core::AccountId;
use keel_effects::MemoryStorageHandler;
use keel_recovery::{
    CompletionEffects, LostAppRecoveryInitiator, LostHardwareRecoveryInitiator, RecoveryCanceler,
    RecoveryCompleter, RecoveryConfig, RecoveryDao, RecoveryLock, RecoverySyncer,
};
use keel_testkit::{
    FakeAccountService, FakeAuthTokenService, FakeRecoveryClient, ManualClock, RecordingSigner,
    StaticChallengeVerifier,
};
use std::sync::Arc;
use std::time::Duration;

pub struct RecoveryRig {
    pub account_id: AccountId,
    pub storage: Arc<MemoryStorageHandler>,
    pub lock: Arc<RecoveryLock>,
    pub dao: Arc<RecoveryDao>,
    pub client: Arc<FakeRecoveryClient>,
    pub clock: Arc<ManualClock>,
    pub signer: Arc<RecordingSigner>,
    pub auth: Arc<FakeAuthTokenService>,
    pub accounts: Arc<FakeAccountService>,
    pub config: RecoveryConfig,
}

impl RecoveryRig {
    pub async fn new() -> Self {
        Self::build(false).await
    }

    /// Rig where the full account stays active (the Lost-Hardware case).
    pub async fn with_active_account() -> Self {
        Self::build(true).await
    }

    async fn build(active_account: bool) -> Self {
        let account_id = AccountId::new();
        let accounts = if active_account {
            FakeAccountService::with_active_account(account_id)
        } else {
            FakeAccountService::inactive()
        };
        let storage = Arc::new(MemoryStorageHandler::new());
        let dao = Arc::new(
            RecoveryDao::load(storage.clone(), account_id)
                .await
                .expect("load dao"),
        );
        Self {
            account_id,
            storage,
            lock: Arc::new(RecoveryLock::new()),
            dao,
            client: Arc::new(FakeRecoveryClient::new()),
            clock: Arc::new(ManualClock::starting_at(0)),
            signer: Arc::new(RecordingSigner::new()),
            auth: Arc::new(FakeAuthTokenService::new()),
            accounts: Arc::new(accounts),
            config: RecoveryConfig {
                delay_duration: Duration::from_secs(7 * 24 * 60 * 60),
                sync_frequency: Duration::from_millis(10),
                minimum_rotation_duration: Duration::from_secs(2),
            },
        }
    }

    pub fn lost_app_initiator(&self) -> LostAppRecoveryInitiator {
        LostAppRecoveryInitiator::new(
            self.lock.clone(),
            self.dao.clone(),
            self.client.clone(),
            self.config.clone(),
        )
    }

    pub fn lost_hardware_initiator(&self) -> LostHardwareRecoveryInitiator {
        LostHardwareRecoveryInitiator::new(
            self.lock.clone(),
            self.dao.clone(),
            self.client.clone(),
            self.config.clone(),
        )
    }

    pub fn canceler(&self) -> RecoveryCanceler {
        RecoveryCanceler::new(self.lock.clone(), self.dao.clone(), self.client.clone())
    }

    pub fn syncer(&self) -> Arc<RecoverySyncer> {
        Arc::new(RecoverySyncer::new(
            self.lock.clone(),
            self.dao.clone(),
            self.client.clone(),
        ))
    }

    pub fn completer(&self, verifier: StaticChallengeVerifier) -> RecoveryCompleter {
        RecoveryCompleter::new(
            self.lock.clone(),
            self.dao.clone(),
            self.client.clone(),
            CompletionEffects {
                verifier: Arc::new(verifier),
                signer: self.signer.clone(),
                auth: self.auth.clone(),
                accounts: self.accounts.clone(),
                clock: self.clock.clone(),
            },
            self.config.clone(),
        )
    }

    /// Reload the dao from the same storage, as a restarted process would.
    pub async fn reload_dao(&self) -> RecoveryDao {
        RecoveryDao::load(self.storage.clone(), self.account_id)
            .await
            .expect("reload dao")
    }
}
