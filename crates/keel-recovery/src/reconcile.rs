//! Reconciliation of the two durable rows into one [`Recovery`] value.
//!
//! [`reconcile`] is a pure function: identical inputs always yield the
//! identical variant, and there is no hidden state. The dao recomputes it on
//! every row change.

use crate::model::{LocalRecoveryAttempt, Recovery, ServerRecovery};

/// Derive the current recovery disposition from the local attempt row and the
/// server recovery row.
///
/// The decision ladder:
/// 1. Auth keys rotated → server-independent: the furthest local milestone
///    wins, whatever the server row says.
/// 2. No local attempt → derived solely from the server row.
/// 3. Local attempt plus server row → ours if the destination auth keys match
///    exactly, superseded otherwise.
/// 4. Local attempt, no server row → ambiguous if a completion was attempted,
///    superseded if the server had acknowledged us, otherwise never
///    acknowledged and safe to restart.
pub fn reconcile(
    local: Option<&LocalRecoveryAttempt>,
    server: Option<&ServerRecovery>,
) -> Recovery {
    let attempt = match local {
        Some(attempt) if attempt.auth_keys_rotated => return server_independent(attempt),
        Some(attempt) => attempt,
        None => {
            return match server {
                None => Recovery::NoActiveRecovery,
                Some(row) => Recovery::SomeoneElseIsRecovering {
                    lost_factor: row.lost_factor,
                },
            }
        }
    };

    match server {
        Some(row) => {
            if row.destination == attempt.destination() {
                Recovery::InitiatedRecovery {
                    attempt: attempt.clone(),
                    server: row.clone(),
                }
            } else {
                // A competing attempt superseded ours.
                Recovery::NoLongerRecovering {
                    lost_factor: row.lost_factor,
                }
            }
        }
        None => {
            if attempt.sealed_csek.is_some() {
                Recovery::MaybeNoLongerRecovering {
                    attempt: attempt.clone(),
                }
            } else if attempt.server_initiated {
                Recovery::NoLongerRecovering {
                    lost_factor: attempt.lost_factor,
                }
            } else {
                // Never acknowledged; safe to restart.
                Recovery::NoActiveRecovery
            }
        }
    }
}

/// The furthest milestone on the post-rotation ladder, walked from the top.
fn server_independent(attempt: &LocalRecoveryAttempt) -> Recovery {
    let attempt = attempt.clone();
    if attempt.sweep_attempted {
        Recovery::SweepAttempted { attempt }
    } else if attempt.backed_up_to_cloud {
        Recovery::BackedUpToCloud { attempt }
    } else if attempt.ddk_backed_up {
        Recovery::DdkBackedUp { attempt }
    } else if attempt.spending_keys_activated {
        Recovery::ActivatedSpendingKeys { attempt }
    } else if attempt.descriptor_backups_uploaded {
        Recovery::UploadedDescriptorBackups { attempt }
    } else if let Some(keyset_id) = attempt.server_keyset_id {
        Recovery::CreatedSpendingKeys { attempt, keyset_id }
    } else {
        Recovery::RotatedAuthKeys { attempt }
    }
}
