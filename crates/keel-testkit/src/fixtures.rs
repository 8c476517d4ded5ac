//! Fixture constructors for the recovery model.

use keel_core::{
    AccountId, AppGlobalAuthKey, AppKeyBundle, AppRecoveryAuthKey, AppSpendingKey,
    HardwareAuthKey, HardwareKeyBundle, HardwareSpendingKey, LostFactor, SealedCsek, SealedSsek,
    ServerSpendingKey, SpendingKeysetId,
};
use keel_recovery::{LocalRecoveryAttempt, ServerRecovery, SpendingKeyset};

/// App key bundle whose keys all carry `tag`.
pub fn app_key_bundle(tag: &str) -> AppKeyBundle {
    AppKeyBundle {
        auth: AppGlobalAuthKey(format!("app-auth-{tag}")),
        recovery_auth: AppRecoveryAuthKey(format!("app-recovery-{tag}")),
        spending: AppSpendingKey(format!("app-spend-{tag}")),
    }
}

/// Hardware key bundle whose keys all carry `tag`.
pub fn hardware_key_bundle(tag: &str) -> HardwareKeyBundle {
    HardwareKeyBundle {
        auth: HardwareAuthKey(format!("hw-auth-{tag}")),
        spending: HardwareSpendingKey(format!("hw-spend-{tag}")),
    }
}

/// Fresh attempt with destination keys tagged `tag`.
pub fn local_attempt(
    account_id: AccountId,
    lost_factor: LostFactor,
    tag: &str,
) -> LocalRecoveryAttempt {
    LocalRecoveryAttempt::new(
        account_id,
        lost_factor,
        app_key_bundle(tag),
        hardware_key_bundle(tag),
    )
}

/// Server row acknowledging `attempt`, with the given delay window.
pub fn server_recovery_for(
    attempt: &LocalRecoveryAttempt,
    delay_start_time: u64,
    delay_end_time: u64,
) -> ServerRecovery {
    ServerRecovery {
        account_id: attempt.account_id,
        delay_start_time,
        delay_end_time,
        lost_factor: attempt.lost_factor,
        destination: attempt.destination(),
    }
}

/// Spending keyset whose keys all carry `tag`.
pub fn spending_keyset(tag: &str) -> SpendingKeyset {
    SpendingKeyset {
        id: SpendingKeysetId::new(),
        app: AppSpendingKey(format!("app-spend-{tag}")),
        hardware: HardwareSpendingKey(format!("hw-spend-{tag}")),
        server: ServerSpendingKey(format!("server-spend-{tag}")),
    }
}

/// A sealed CSEK with recognizable bytes.
pub fn sealed_csek() -> SealedCsek {
    SealedCsek(b"sealed-csek".to_vec())
}

/// A sealed SSEK with recognizable bytes.
pub fn sealed_ssek() -> SealedSsek {
    SealedSsek(b"sealed-ssek".to_vec())
}
