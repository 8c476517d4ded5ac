//! RecoveryDao behavior over the in-memory storage handler.

mod support;

use assert_matches::assert_matches;
use keel_core::LostFactor;
use keel_recovery::{LocalRecoveryProgress, Recovery, RecoveryStoreError};
use keel_testkit::{
    local_attempt, sealed_csek, sealed_ssek, server_recovery_for, spending_keyset,
};
use support::RecoveryRig;

#[tokio::test]
async fn hydrates_rows_across_restart() {
    let rig = RecoveryRig::new().await;
    let attempt = local_attempt(rig.account_id, LostFactor::App, "ours");
    let server = server_recovery_for(&attempt, 0, 1_000);

    rig.dao.create_attempt(attempt.clone()).await.expect("create");
    rig.dao
        .set_active_server_recovery(Some(server.clone()))
        .await
        .expect("set server");

    let reloaded = rig.reload_dao().await;
    assert_matches!(
        reloaded.active_recovery(),
        Recovery::InitiatedRecovery { .. }
    );
    assert_eq!(reloaded.active_server_recovery().await, Some(server));
    let hydrated = reloaded.local_attempt().await.expect("attempt row");
    assert!(hydrated.server_initiated);
}

#[tokio::test]
async fn fresh_attempt_reads_as_no_active_recovery() {
    let rig = RecoveryRig::new().await;
    rig.dao
        .create_attempt(local_attempt(rig.account_id, LostFactor::App, "ours"))
        .await
        .expect("create");

    assert_eq!(rig.dao.active_recovery(), Recovery::NoActiveRecovery);
}

#[tokio::test]
async fn matching_server_row_acknowledges_the_attempt() {
    let rig = RecoveryRig::new().await;
    let attempt = local_attempt(rig.account_id, LostFactor::Hardware, "ours");
    let server = server_recovery_for(&attempt, 0, 1_000);

    rig.dao.create_attempt(attempt).await.expect("create");
    rig.dao
        .set_active_server_recovery(Some(server))
        .await
        .expect("set server");

    assert!(rig.dao.local_attempt().await.expect("row").server_initiated);
    assert_matches!(
        rig.dao.active_recovery(),
        Recovery::InitiatedRecovery { .. }
    );
}

#[tokio::test]
async fn clearing_server_row_purges_unconfirmed_attempt() {
    let rig = RecoveryRig::new().await;
    rig.dao
        .create_attempt(local_attempt(rig.account_id, LostFactor::App, "ours"))
        .await
        .expect("create");

    rig.dao
        .set_active_server_recovery(None)
        .await
        .expect("clear server");

    assert_eq!(rig.dao.local_attempt().await, None);
    assert_eq!(rig.dao.active_recovery(), Recovery::NoActiveRecovery);
    // The purge is durable, not just cached.
    assert_eq!(rig.reload_dao().await.local_attempt().await, None);
}

#[tokio::test]
async fn purge_deletes_concurrently_successful_initiation() {
    // Accepted race: the remote initiate succeeded but the process died
    // before the server row was persisted locally. A sync that then observes
    // an absent server record deletes the attempt, even though the server
    // still holds the recovery. Changing this has product implications; the
    // test documents the behavior rather than guarding a desirable outcome.
    let rig = RecoveryRig::new().await;
    let attempt = local_attempt(rig.account_id, LostFactor::App, "ours");
    rig.dao.create_attempt(attempt.clone()).await.expect("create");

    rig.dao
        .set_active_server_recovery(None)
        .await
        .expect("stale sync result");

    // The later, fresher sync can no longer attach the server row to an
    // attempt; it reads as someone else's recovery.
    let server = server_recovery_for(&attempt, 0, 1_000);
    rig.dao
        .set_active_server_recovery(Some(server))
        .await
        .expect("fresh sync result");
    assert_matches!(
        rig.dao.active_recovery(),
        Recovery::SomeoneElseIsRecovering {
            lost_factor: LostFactor::App
        }
    );
}

#[tokio::test]
async fn attempt_with_sealed_csek_survives_server_row_clearing() {
    let rig = RecoveryRig::new().await;
    let attempt = local_attempt(rig.account_id, LostFactor::App, "ours");
    let server = server_recovery_for(&attempt, 0, 1_000);
    rig.dao.create_attempt(attempt).await.expect("create");
    rig.dao
        .set_active_server_recovery(Some(server))
        .await
        .expect("set server");
    rig.dao
        .set_local_progress(LocalRecoveryProgress::AttemptingCompletion {
            sealed_csek: sealed_csek(),
            sealed_ssek: sealed_ssek(),
        })
        .await
        .expect("milestone");

    rig.dao
        .set_active_server_recovery(None)
        .await
        .expect("clear server");

    assert_matches!(
        rig.dao.active_recovery(),
        Recovery::MaybeNoLongerRecovering { .. }
    );
}

#[tokio::test]
async fn rotated_attempt_survives_server_row_clearing() {
    let rig = RecoveryRig::new().await;
    let attempt = local_attempt(rig.account_id, LostFactor::App, "ours");
    let server = server_recovery_for(&attempt, 0, 1_000);
    rig.dao.create_attempt(attempt).await.expect("create");
    rig.dao
        .set_active_server_recovery(Some(server))
        .await
        .expect("set server");
    rig.dao
        .set_local_progress(LocalRecoveryProgress::RotatedAuthKeys)
        .await
        .expect("milestone");

    rig.dao
        .set_active_server_recovery(None)
        .await
        .expect("clear server");

    assert_matches!(rig.dao.active_recovery(), Recovery::RotatedAuthKeys { .. });
}

#[tokio::test]
async fn progress_marks_are_idempotent() {
    let rig = RecoveryRig::new().await;
    rig.dao
        .create_attempt(local_attempt(rig.account_id, LostFactor::App, "ours"))
        .await
        .expect("create");

    for _ in 0..2 {
        rig.dao
            .set_local_progress(LocalRecoveryProgress::RotatedAuthKeys)
            .await
            .expect("milestone");
    }
    let attempt = rig.dao.local_attempt().await.expect("row");
    assert!(attempt.auth_keys_rotated);
}

#[tokio::test]
async fn progress_without_attempt_is_an_error() {
    let rig = RecoveryRig::new().await;
    let result = rig
        .dao
        .set_local_progress(LocalRecoveryProgress::RotatedAuthKeys)
        .await;
    assert_matches!(result, Err(RecoveryStoreError::NoLocalAttempt));
}

#[tokio::test]
async fn created_keysets_land_in_the_side_table_once() {
    let rig = RecoveryRig::new().await;
    rig.dao
        .create_attempt(local_attempt(rig.account_id, LostFactor::App, "ours"))
        .await
        .expect("create");
    rig.dao
        .set_local_progress(LocalRecoveryProgress::RotatedAuthKeys)
        .await
        .expect("milestone");

    let keyset = spending_keyset("recovered");
    for _ in 0..2 {
        rig.dao
            .set_local_progress(LocalRecoveryProgress::CreatedSpendingKeys {
                keyset: keyset.clone(),
            })
            .await
            .expect("milestone");
    }

    assert_eq!(rig.dao.spending_keysets().await, vec![keyset.clone()]);
    assert_matches!(
        rig.dao.active_recovery(),
        Recovery::CreatedSpendingKeys { keyset_id, .. } if keyset_id == keyset.id
    );
    // Survives restart alongside the rows.
    assert_eq!(rig.reload_dao().await.spending_keysets().await, vec![keyset]);
}

#[tokio::test]
async fn clear_removes_rows_but_keeps_keysets() {
    let rig = RecoveryRig::new().await;
    let attempt = local_attempt(rig.account_id, LostFactor::Hardware, "ours");
    let server = server_recovery_for(&attempt, 0, 1_000);
    rig.dao.create_attempt(attempt).await.expect("create");
    rig.dao
        .set_active_server_recovery(Some(server))
        .await
        .expect("set server");
    rig.dao
        .set_local_progress(LocalRecoveryProgress::RotatedAuthKeys)
        .await
        .expect("milestone");
    rig.dao
        .set_local_progress(LocalRecoveryProgress::CreatedSpendingKeys {
            keyset: spending_keyset("recovered"),
        })
        .await
        .expect("milestone");

    rig.dao.clear().await.expect("clear");

    assert_eq!(rig.dao.active_recovery(), Recovery::NoActiveRecovery);
    assert_eq!(rig.dao.local_attempt().await, None);
    assert_eq!(rig.dao.spending_keysets().await.len(), 1);
}

#[tokio::test]
async fn every_mutation_publishes_a_recomputed_value() {
    let rig = RecoveryRig::new().await;
    let mut rx = rig.dao.subscribe();
    assert_eq!(*rx.borrow_and_update(), Recovery::NoActiveRecovery);

    let attempt = local_attempt(rig.account_id, LostFactor::App, "ours");
    let server = server_recovery_for(&attempt, 0, 1_000);
    rig.dao.create_attempt(attempt).await.expect("create");
    rx.changed().await.expect("publish");

    rig.dao
        .set_active_server_recovery(Some(server))
        .await
        .expect("set server");
    rx.changed().await.expect("publish");
    assert_matches!(
        *rx.borrow_and_update(),
        Recovery::InitiatedRecovery { .. }
    );
}
