//! Data model for delay-and-notify recovery.
//!
//! Two durable rows describe the whole domain: the local recovery attempt
//! (this device's view of its own attempt) and the active server recovery
//! (the canonical record held by the recovery service). Every observable
//! [`Recovery`] value is derived from those two rows alone.

use keel_core::{
    AccountId, AppKeyBundle, HardwareKeyBundle, LostFactor, SealedCsek, SealedSsek,
    SpendingKeysetId,
};
use keel_core::{AppGlobalAuthKey, AppRecoveryAuthKey, AppSpendingKey, HardwareAuthKey};
use keel_core::{HardwareSpendingKey, ServerSpendingKey};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Destination auth keys as the server records them.
///
/// Compared field-for-field against the local attempt's destination to decide
/// whether the server's recovery is ours.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecoveryDestination {
    /// App auth key for the Global scope.
    pub app_global_auth: AppGlobalAuthKey,
    /// App auth key for the Recovery scope.
    pub app_recovery_auth: AppRecoveryAuthKey,
    /// Hardware auth key.
    pub hardware_auth: HardwareAuthKey,
}

/// The canonical recovery record held by the server. At most one per account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerRecovery {
    /// Account under recovery.
    pub account_id: AccountId,
    /// When the delay window opened, Unix millis.
    pub delay_start_time: u64,
    /// When the delay window closes, Unix millis.
    pub delay_end_time: u64,
    /// Which factor the recovery replaces.
    pub lost_factor: LostFactor,
    /// Destination auth keys the recovery will install.
    pub destination: RecoveryDestination,
}

impl ServerRecovery {
    /// Whether the delay window has fully elapsed at `now_millis`.
    pub fn delay_complete(&self, now_millis: u64) -> bool {
        now_millis >= self.delay_end_time
    }

    /// Time left in the delay window at `now_millis`; zero once elapsed.
    pub fn remaining_delay(&self, now_millis: u64) -> Duration {
        Duration::from_millis(self.delay_end_time.saturating_sub(now_millis))
    }
}

/// This device's own recovery attempt. At most one live row.
///
/// Progress fields are monotone: once set they are never unset. Starting a
/// new attempt replaces the row wholesale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalRecoveryAttempt {
    /// Account under recovery.
    pub account_id: AccountId,
    /// Which factor this attempt replaces.
    pub lost_factor: LostFactor,
    /// Freshly generated destination app keys.
    pub destination_app_keys: AppKeyBundle,
    /// Freshly generated destination hardware keys.
    pub destination_hardware_keys: HardwareKeyBundle,
    /// Whether the server has acknowledged this attempt.
    pub server_initiated: bool,
    /// Whether auth keys were rotated; the point of no return.
    pub auth_keys_rotated: bool,
    /// Server spending keyset created after rotation, if any.
    pub server_keyset_id: Option<SpendingKeysetId>,
    /// Whether descriptor backups were uploaded.
    pub descriptor_backups_uploaded: bool,
    /// Whether the new spending keyset was activated.
    pub spending_keys_activated: bool,
    /// Whether the delegated decryption key was backed up.
    pub ddk_backed_up: bool,
    /// Whether the cloud backup completed.
    pub backed_up_to_cloud: bool,
    /// Whether a fund sweep was attempted.
    pub sweep_attempted: bool,
    /// Sealed cloud-backup key, captured once completion is attempted.
    pub sealed_csek: Option<SealedCsek>,
    /// Sealed share-backup key, captured once completion is attempted.
    pub sealed_ssek: Option<SealedSsek>,
}

impl LocalRecoveryAttempt {
    /// A fresh attempt with no progress.
    pub fn new(
        account_id: AccountId,
        lost_factor: LostFactor,
        destination_app_keys: AppKeyBundle,
        destination_hardware_keys: HardwareKeyBundle,
    ) -> Self {
        Self {
            account_id,
            lost_factor,
            destination_app_keys,
            destination_hardware_keys,
            server_initiated: false,
            auth_keys_rotated: false,
            server_keyset_id: None,
            descriptor_backups_uploaded: false,
            spending_keys_activated: false,
            ddk_backed_up: false,
            backed_up_to_cloud: false,
            sweep_attempted: false,
            sealed_csek: None,
            sealed_ssek: None,
        }
    }

    /// The destination auth keys this attempt asked the server to install.
    pub fn destination(&self) -> RecoveryDestination {
        RecoveryDestination {
            app_global_auth: self.destination_app_keys.auth.clone(),
            app_recovery_auth: self.destination_app_keys.recovery_auth.clone(),
            hardware_auth: self.destination_hardware_keys.auth.clone(),
        }
    }

    /// Apply a milestone. Idempotent; progress only ever moves forward.
    pub fn advance(&mut self, progress: &LocalRecoveryProgress) {
        match progress {
            LocalRecoveryProgress::ServerInitiated => self.server_initiated = true,
            LocalRecoveryProgress::AttemptingCompletion {
                sealed_csek,
                sealed_ssek,
            } => {
                self.sealed_csek = Some(sealed_csek.clone());
                self.sealed_ssek = Some(sealed_ssek.clone());
            }
            LocalRecoveryProgress::RotatedAuthKeys => self.auth_keys_rotated = true,
            LocalRecoveryProgress::CreatedSpendingKeys { keyset } => {
                self.server_keyset_id = Some(keyset.id);
            }
            LocalRecoveryProgress::UploadedDescriptorBackups => {
                self.descriptor_backups_uploaded = true;
            }
            LocalRecoveryProgress::ActivatedSpendingKeys => self.spending_keys_activated = true,
            LocalRecoveryProgress::DdkBackedUp => self.ddk_backed_up = true,
            LocalRecoveryProgress::BackedUpToCloud => self.backed_up_to_cloud = true,
            LocalRecoveryProgress::SweepAttempted => self.sweep_attempted = true,
        }
    }
}

/// Spending keyset created on the server during recovery, recorded for the
/// later fund sweep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpendingKeyset {
    /// Server-assigned keyset identifier.
    pub id: SpendingKeysetId,
    /// App spending key.
    pub app: AppSpendingKey,
    /// Hardware spending key.
    pub hardware: HardwareSpendingKey,
    /// Server cosigner spending key.
    pub server: ServerSpendingKey,
}

/// Milestone marks applied to the live attempt row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LocalRecoveryProgress {
    /// The server acknowledged the attempt.
    ServerInitiated,
    /// A completion call is about to be made; seal the sweep keys first.
    AttemptingCompletion {
        /// Sealed cloud-backup key.
        sealed_csek: SealedCsek,
        /// Sealed share-backup key.
        sealed_ssek: SealedSsek,
    },
    /// Auth keys rotated; recovery becomes server-independent.
    RotatedAuthKeys,
    /// The server created the new spending keyset.
    CreatedSpendingKeys {
        /// The created keyset.
        keyset: SpendingKeyset,
    },
    /// Descriptor backups uploaded.
    UploadedDescriptorBackups,
    /// New spending keyset activated.
    ActivatedSpendingKeys,
    /// Delegated decryption key backed up.
    DdkBackedUp,
    /// Cloud backup completed.
    BackedUpToCloud,
    /// Fund sweep attempted.
    SweepAttempted,
}

/// The single authoritative recovery disposition for an account.
///
/// Exactly one variant holds at any instant, derived purely from the two
/// durable rows by [`crate::reconcile::reconcile`]. The union is deliberately
/// flat so that every consumer matches exhaustively.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Recovery {
    /// Nothing in flight, locally or on the server.
    NoActiveRecovery,
    /// The server holds a recovery that is not ours.
    SomeoneElseIsRecovering {
        /// Factor the competing recovery replaces.
        lost_factor: LostFactor,
    },
    /// Our attempt was superseded or canceled.
    NoLongerRecovering {
        /// Factor the recovery replaced.
        lost_factor: LostFactor,
    },
    /// A completion was attempted and the server record has vanished: either
    /// our completion just succeeded and rotation is imminent, or we were
    /// canceled. Deliberately ambiguous; callers must poll or retry, never
    /// guess.
    MaybeNoLongerRecovering {
        /// The attempt, including the sealed keys needed to retry completion.
        attempt: LocalRecoveryAttempt,
    },
    /// The server acknowledges our attempt; the delay window is running.
    InitiatedRecovery {
        /// Our attempt.
        attempt: LocalRecoveryAttempt,
        /// The server's record of it.
        server: ServerRecovery,
    },
    /// Auth keys rotated. From here on nothing the server does can un-commit
    /// the recovery.
    RotatedAuthKeys {
        /// Our attempt.
        attempt: LocalRecoveryAttempt,
    },
    /// New spending keyset created on the server.
    CreatedSpendingKeys {
        /// Our attempt.
        attempt: LocalRecoveryAttempt,
        /// The created keyset.
        keyset_id: SpendingKeysetId,
    },
    /// Descriptor backups uploaded.
    UploadedDescriptorBackups {
        /// Our attempt.
        attempt: LocalRecoveryAttempt,
    },
    /// New spending keyset activated.
    ActivatedSpendingKeys {
        /// Our attempt.
        attempt: LocalRecoveryAttempt,
    },
    /// Delegated decryption key backed up.
    DdkBackedUp {
        /// Our attempt.
        attempt: LocalRecoveryAttempt,
    },
    /// Cloud backup completed.
    BackedUpToCloud {
        /// Our attempt.
        attempt: LocalRecoveryAttempt,
    },
    /// Fund sweep attempted.
    SweepAttempted {
        /// Our attempt.
        attempt: LocalRecoveryAttempt,
    },
}

impl Recovery {
    /// Whether this value sits on the server-independent ladder.
    pub fn server_independent(&self) -> bool {
        matches!(
            self,
            Self::RotatedAuthKeys { .. }
                | Self::CreatedSpendingKeys { .. }
                | Self::UploadedDescriptorBackups { .. }
                | Self::ActivatedSpendingKeys { .. }
                | Self::DdkBackedUp { .. }
                | Self::BackedUpToCloud { .. }
                | Self::SweepAttempted { .. }
        )
    }

    /// The lost factor this value concerns, when one applies.
    pub fn lost_factor(&self) -> Option<LostFactor> {
        match self {
            Self::NoActiveRecovery => None,
            Self::SomeoneElseIsRecovering { lost_factor }
            | Self::NoLongerRecovering { lost_factor } => Some(*lost_factor),
            Self::MaybeNoLongerRecovering { attempt }
            | Self::InitiatedRecovery { attempt, .. }
            | Self::RotatedAuthKeys { attempt }
            | Self::CreatedSpendingKeys { attempt, .. }
            | Self::UploadedDescriptorBackups { attempt }
            | Self::ActivatedSpendingKeys { attempt }
            | Self::DdkBackedUp { attempt }
            | Self::BackedUpToCloud { attempt }
            | Self::SweepAttempted { attempt } => Some(attempt.lost_factor),
        }
    }

    /// Short variant name, for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::NoActiveRecovery => "NoActiveRecovery",
            Self::SomeoneElseIsRecovering { .. } => "SomeoneElseIsRecovering",
            Self::NoLongerRecovering { .. } => "NoLongerRecovering",
            Self::MaybeNoLongerRecovering { .. } => "MaybeNoLongerRecovering",
            Self::InitiatedRecovery { .. } => "InitiatedRecovery",
            Self::RotatedAuthKeys { .. } => "RotatedAuthKeys",
            Self::CreatedSpendingKeys { .. } => "CreatedSpendingKeys",
            Self::UploadedDescriptorBackups { .. } => "UploadedDescriptorBackups",
            Self::ActivatedSpendingKeys { .. } => "ActivatedSpendingKeys",
            Self::DdkBackedUp { .. } => "DdkBackedUp",
            Self::BackedUpToCloud { .. } => "BackedUpToCloud",
            Self::SweepAttempted { .. } => "SweepAttempted",
        }
    }
}

impl fmt::Display for Recovery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}
