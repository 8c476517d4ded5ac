//! End-to-end initiation, cancellation, and completion flows against the
//! fake service.

mod support;

use assert_matches::assert_matches;
use keel_core::{CompletionChallenge, HardwareProofOfPossession, LostFactor};
use keel_recovery::{
    CancelRecoveryClientError, CancelRecoveryError, CompleteRecoveryError,
    InitiateRecoveryClientError, InitiateRecoveryError, LostAppRecoveryRequest,
    LostHardwareRecoveryRequest, Recovery, RecoveryServiceError, RetryInitiationError,
};
use keel_testkit::{
    app_key_bundle, hardware_key_bundle, local_attempt, sealed_csek, sealed_ssek,
    server_recovery_for, StaticChallengeVerifier,
};
use support::RecoveryRig;

fn lost_app_request() -> LostAppRecoveryRequest {
    LostAppRecoveryRequest {
        destination_app_keys: app_key_bundle("fresh"),
        destination_hardware_keys: hardware_key_bundle("fresh"),
        proof_of_possession: HardwareProofOfPossession(b"hw-proof".to_vec()),
    }
}

fn lost_hardware_request() -> LostHardwareRecoveryRequest {
    LostHardwareRecoveryRequest {
        destination_app_keys: app_key_bundle("fresh"),
        destination_hardware_keys: hardware_key_bundle("fresh"),
    }
}

fn challenge() -> CompletionChallenge {
    CompletionChallenge(b"complete-recovery-challenge".to_vec())
}

fn hardware_signature() -> keel_core::HardwareSignature {
    keel_core::HardwareSignature(b"hw-sig".to_vec())
}

#[tokio::test]
async fn lost_app_initiation_lands_in_initiated_recovery() {
    let rig = RecoveryRig::new().await;
    rig.lost_app_initiator()
        .initiate(lost_app_request())
        .await
        .expect("initiate");

    assert_matches!(
        rig.dao.active_recovery(),
        Recovery::InitiatedRecovery { ref attempt, ref server } => {
            assert_eq!(attempt.lost_factor, LostFactor::App);
            assert_eq!(server.destination, attempt.destination());
        }
    );

    let calls = rig.client.initiate_calls();
    assert_eq!(calls.len(), 1);
    let (account_id, request) = &calls[0];
    assert_eq!(*account_id, rig.account_id);
    assert_eq!(request.delay, rig.config.delay_duration);
    assert!(request.proof_of_possession.is_some());
}

#[tokio::test]
async fn lost_hardware_initiation_carries_no_hardware_proof() {
    let rig = RecoveryRig::new().await;
    rig.lost_hardware_initiator()
        .initiate(lost_hardware_request())
        .await
        .expect("initiate");

    let calls = rig.client.initiate_calls();
    assert_eq!(calls[0].1.lost_factor, LostFactor::Hardware);
    assert!(calls[0].1.proof_of_possession.is_none());
}

#[tokio::test]
async fn attempt_is_persisted_before_the_network_call() {
    let rig = RecoveryRig::new().await;
    rig.client.enqueue_initiate(Err(InitiateRecoveryClientError::Service(
        RecoveryServiceError::Transport("connection reset".into()),
    )));

    let result = rig.lost_app_initiator().initiate(lost_app_request()).await;
    assert_matches!(
        result,
        Err(InitiateRecoveryError::Client(
            InitiateRecoveryClientError::Service(_)
        ))
    );

    // The attempt row exists even though the network call failed, and the
    // derived value still reads as safe to restart.
    assert!(rig.dao.local_attempt().await.is_some());
    assert_eq!(rig.dao.active_recovery(), Recovery::NoActiveRecovery);
}

#[tokio::test]
async fn typed_initiate_errors_propagate_without_retry() {
    let rig = RecoveryRig::new().await;
    rig.client
        .enqueue_initiate(Err(InitiateRecoveryClientError::RecoveryAlreadyExists));
    assert_matches!(
        rig.lost_app_initiator().initiate(lost_app_request()).await,
        Err(InitiateRecoveryError::Client(
            InitiateRecoveryClientError::RecoveryAlreadyExists
        ))
    );

    rig.client
        .enqueue_initiate(Err(InitiateRecoveryClientError::CommsVerificationRequired));
    assert_matches!(
        rig.lost_hardware_initiator()
            .initiate(lost_hardware_request())
            .await,
        Err(InitiateRecoveryError::Client(
            InitiateRecoveryClientError::CommsVerificationRequired
        ))
    );
    assert_eq!(rig.client.initiate_calls().len(), 2);
}

#[tokio::test]
async fn lost_hardware_retry_collapses_error_granularity() {
    let rig = RecoveryRig::new().await;
    rig.client
        .enqueue_initiate(Err(InitiateRecoveryClientError::CommsVerificationRequired));

    let result = rig
        .lost_hardware_initiator()
        .retry(lost_hardware_request())
        .await;
    assert_matches!(result, Err(RetryInitiationError::Service(_)));
}

#[tokio::test]
async fn crash_between_server_success_and_local_confirmation_self_heals() {
    let rig = RecoveryRig::new().await;
    // Simulate the crash window: the attempt row exists, the server holds
    // the recovery, but the server row never made it into the local store.
    let attempt = local_attempt(rig.account_id, LostFactor::App, "ours");
    rig.dao.create_attempt(attempt.clone()).await.expect("create");
    rig.client
        .set_server_state(Some(server_recovery_for(&attempt, 0, 1_000)));

    rig.syncer().perform_sync().await.expect("sync");

    assert_matches!(
        rig.dao.active_recovery(),
        Recovery::InitiatedRecovery { .. }
    );
}

#[tokio::test]
async fn cancel_clears_both_sides() {
    let rig = RecoveryRig::new().await;
    rig.lost_app_initiator()
        .initiate(lost_app_request())
        .await
        .expect("initiate");

    rig.canceler().cancel(None).await.expect("cancel");

    assert_eq!(rig.dao.active_recovery(), Recovery::NoActiveRecovery);
    assert_eq!(rig.dao.local_attempt().await, None);
    assert_eq!(rig.client.server_state(), None);
}

#[tokio::test]
async fn cancel_twice_is_idempotent() {
    let rig = RecoveryRig::new().await;
    rig.lost_app_initiator()
        .initiate(lost_app_request())
        .await
        .expect("initiate");

    let canceler = rig.canceler();
    canceler.cancel(None).await.expect("first cancel");
    // The fake now answers "no recovery exists"; the flow converts that to
    // success.
    canceler.cancel(None).await.expect("second cancel");

    assert_eq!(rig.client.cancel_call_count(), 2);
    assert_eq!(rig.dao.active_recovery(), Recovery::NoActiveRecovery);
}

#[tokio::test]
async fn cancel_propagates_other_service_errors() {
    let rig = RecoveryRig::new().await;
    rig.lost_app_initiator()
        .initiate(lost_app_request())
        .await
        .expect("initiate");
    rig.client.enqueue_cancel(Err(CancelRecoveryClientError::Service(
        RecoveryServiceError::Transport("timeout".into()),
    )));

    let result = rig.canceler().cancel(None).await;
    assert_matches!(result, Err(CancelRecoveryError::Client(_)));
    // Local state is untouched on failure.
    assert_matches!(
        rig.dao.active_recovery(),
        Recovery::InitiatedRecovery { .. }
    );
}

#[tokio::test]
async fn rotate_auth_keys_signs_and_completes() {
    let rig = RecoveryRig::new().await;
    rig.lost_app_initiator()
        .initiate(lost_app_request())
        .await
        .expect("initiate");

    let completer = rig.completer(StaticChallengeVerifier::accepting());
    completer
        .rotate_auth_keys(challenge(), hardware_signature(), sealed_csek(), sealed_ssek())
        .await
        .expect("rotate auth keys");

    let attempt = rig.dao.local_attempt().await.expect("row");
    assert_eq!(attempt.sealed_csek, Some(sealed_csek()));
    assert_eq!(attempt.sealed_ssek, Some(sealed_ssek()));

    let completions = rig.client.complete_calls();
    assert_eq!(completions.len(), 1);
    assert_eq!(completions[0].1.challenge, challenge());
    assert_eq!(completions[0].1.hardware_signature, hardware_signature());
    // The app signature covers the same challenge with the destination key.
    assert_eq!(rig.signer.calls().len(), 1);
    assert_eq!(rig.signer.calls()[0].1, challenge().as_bytes());
}

#[tokio::test]
async fn rotate_auth_keys_fails_fast_on_bad_hardware_signature() {
    let rig = RecoveryRig::new().await;
    rig.lost_app_initiator()
        .initiate(lost_app_request())
        .await
        .expect("initiate");

    let completer = rig.completer(StaticChallengeVerifier::rejecting());
    let result = completer
        .rotate_auth_keys(challenge(), hardware_signature(), sealed_csek(), sealed_ssek())
        .await;
    assert_matches!(
        result,
        Err(CompleteRecoveryError::ChallengeNotSignedByHardware)
    );

    // Failed before any I/O: no milestone, no network call, no enforced wait.
    let attempt = rig.dao.local_attempt().await.expect("row");
    assert_eq!(attempt.sealed_csek, None);
    assert!(rig.client.complete_calls().is_empty());
    assert!(rig.clock.recorded_sleeps().is_empty());
}

#[tokio::test]
async fn rotate_auth_keys_enforces_the_minimum_duration() {
    let rig = RecoveryRig::new().await;
    rig.lost_app_initiator()
        .initiate(lost_app_request())
        .await
        .expect("initiate");

    rig.completer(StaticChallengeVerifier::accepting())
        .rotate_auth_keys(challenge(), hardware_signature(), sealed_csek(), sealed_ssek())
        .await
        .expect("rotate auth keys");

    // The manual clock did not advance during the critical section, so the
    // full minimum is slept off.
    assert_eq!(
        rig.clock.recorded_sleeps(),
        vec![rig.config.minimum_rotation_duration]
    );
}

#[tokio::test]
async fn sealed_keys_survive_a_failed_completion_call() {
    let rig = RecoveryRig::new().await;
    rig.lost_app_initiator()
        .initiate(lost_app_request())
        .await
        .expect("initiate");
    rig.client.enqueue_complete(Err(RecoveryServiceError::Transport(
        "connection reset".into(),
    )));

    let result = rig
        .completer(StaticChallengeVerifier::accepting())
        .rotate_auth_keys(challenge(), hardware_signature(), sealed_csek(), sealed_ssek())
        .await;
    assert_matches!(result, Err(CompleteRecoveryError::Service(_)));

    // The milestone was persisted before the network call.
    let attempt = rig.dao.local_attempt().await.expect("row");
    assert_eq!(attempt.sealed_csek, Some(sealed_csek()));

    // If the recovery is then canceled remotely, the next sync lands in the
    // deliberately ambiguous state rather than deleting the attempt.
    rig.client.set_server_state(None);
    rig.syncer().perform_sync().await.expect("sync");
    assert_matches!(
        rig.dao.active_recovery(),
        Recovery::MaybeNoLongerRecovering { .. }
    );
}

#[tokio::test]
async fn rotate_auth_tokens_flips_into_server_independence() {
    let rig = RecoveryRig::new().await;
    rig.lost_app_initiator()
        .initiate(lost_app_request())
        .await
        .expect("initiate");

    let completer = rig.completer(StaticChallengeVerifier::accepting());
    completer
        .rotate_auth_keys(challenge(), hardware_signature(), sealed_csek(), sealed_ssek())
        .await
        .expect("rotate auth keys");
    completer.rotate_auth_tokens().await.expect("rotate tokens");

    assert_matches!(rig.dao.active_recovery(), Recovery::RotatedAuthKeys { .. });
    assert_eq!(rig.auth.stored_tokens().len(), 2);
    // Lost-App: no full account is active, so no stored keys to rotate.
    assert!(rig.accounts.rotations().is_empty());

    // The server clearing its record afterwards changes nothing.
    rig.client.set_server_state(None);
    rig.syncer().perform_sync().await.expect("sync");
    assert_matches!(rig.dao.active_recovery(), Recovery::RotatedAuthKeys { .. });
}

#[tokio::test]
async fn lost_hardware_completion_rotates_the_active_account_keys() {
    let rig = RecoveryRig::with_active_account().await;
    rig.lost_hardware_initiator()
        .initiate(lost_hardware_request())
        .await
        .expect("initiate");

    let completer = rig.completer(StaticChallengeVerifier::accepting());
    completer
        .rotate_auth_keys(challenge(), hardware_signature(), sealed_csek(), sealed_ssek())
        .await
        .expect("rotate auth keys");
    completer.rotate_auth_tokens().await.expect("rotate tokens");

    // The account stayed active throughout its own recovery and picked up
    // the destination app keys.
    let rotations = rig.accounts.rotations();
    assert_eq!(rotations.len(), 1);
    assert_eq!(rotations[0].0, rig.account_id);
    assert_eq!(rotations[0].1, app_key_bundle("fresh"));
    assert_matches!(rig.dao.active_recovery(), Recovery::RotatedAuthKeys { .. });
}

#[tokio::test]
async fn rotate_auth_tokens_failure_leaves_the_milestone_unmarked() {
    let rig = RecoveryRig::new().await;
    rig.lost_app_initiator()
        .initiate(lost_app_request())
        .await
        .expect("initiate");
    let completer = rig.completer(StaticChallengeVerifier::accepting());
    completer
        .rotate_auth_keys(challenge(), hardware_signature(), sealed_csek(), sealed_ssek())
        .await
        .expect("rotate auth keys");

    rig.auth
        .enqueue_refresh_failure(keel_recovery::AuthError::Rejected("bad key".into()));
    let result = completer.rotate_auth_tokens().await;
    assert_matches!(result, Err(keel_recovery::RotateAuthTokensError::Auth(_)));

    let attempt = rig.dao.local_attempt().await.expect("row");
    assert!(!attempt.auth_keys_rotated);
    assert!(rig.auth.stored_tokens().is_empty());
}
