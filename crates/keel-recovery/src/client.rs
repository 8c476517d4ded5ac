//! The remote recovery service, consumed through a narrow seam.
//!
//! Transport wiring (HTTP, auth headers, retries at the transport layer) is
//! out of scope; this trait is the whole surface the recovery flows see.
//! Error codes the flows branch on are typed variants; everything else is a
//! service error carried through untouched.

use crate::model::{RecoveryDestination, ServerRecovery};
use async_trait::async_trait;
use keel_core::{
    AccountId, AppSignature, CompletionChallenge, HardwareProofOfPossession, HardwareSignature,
    LostFactor,
};
use std::time::Duration;
use thiserror::Error;

/// Payload for the initiate endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitiateRecoveryRequest {
    /// Which factor is being replaced.
    pub lost_factor: LostFactor,
    /// Destination auth keys to install when the delay elapses.
    pub destination: RecoveryDestination,
    /// The externally configured delay window.
    pub delay: Duration,
    /// Hardware-signed proof of possession; present for Lost-App recovery,
    /// where the surviving hardware vouches for the new app key.
    pub proof_of_possession: Option<HardwareProofOfPossession>,
}

/// Payload for the complete endpoint: the challenge and both signatures over
/// it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionAttempt {
    /// The completion challenge.
    pub challenge: CompletionChallenge,
    /// Signature by the destination app auth key.
    pub app_signature: AppSignature,
    /// Signature by the destination hardware auth key.
    pub hardware_signature: HardwareSignature,
}

/// Service-level failure on any endpoint.
#[derive(Debug, Clone, Error)]
pub enum RecoveryServiceError {
    /// The transport failed before a response was produced.
    #[error("transport error: {0}")]
    Transport(String),
    /// The service answered with an error the flows do not branch on.
    #[error("service error: {0}")]
    Service(String),
}

/// Typed errors from the initiate endpoint.
#[derive(Debug, Clone, Error)]
pub enum InitiateRecoveryClientError {
    /// A recovery already exists for this account.
    #[error("a recovery already exists for this account")]
    RecoveryAlreadyExists,
    /// The service requires out-of-band communications verification first.
    #[error("communications verification required")]
    CommsVerificationRequired,
    /// Anything else.
    #[error(transparent)]
    Service(#[from] RecoveryServiceError),
}

/// Typed errors from the cancel endpoint.
#[derive(Debug, Clone, Error)]
pub enum CancelRecoveryClientError {
    /// No recovery exists; the flows treat this as success.
    #[error("no recovery exists for this account")]
    NoRecoveryExists,
    /// Anything else.
    #[error(transparent)]
    Service(#[from] RecoveryServiceError),
}

/// The remote delay-and-notify recovery service.
#[async_trait]
pub trait RecoveryServiceClient: Send + Sync {
    /// Begin a recovery; returns the server's canonical record of it.
    async fn initiate(
        &self,
        account_id: &AccountId,
        request: InitiateRecoveryRequest,
    ) -> Result<ServerRecovery, InitiateRecoveryClientError>;

    /// Cancel the active recovery.
    async fn cancel(
        &self,
        account_id: &AccountId,
        proof_of_possession: Option<HardwareProofOfPossession>,
    ) -> Result<(), CancelRecoveryClientError>;

    /// Complete the active recovery once the delay has elapsed.
    async fn complete(
        &self,
        account_id: &AccountId,
        attempt: CompletionAttempt,
    ) -> Result<(), RecoveryServiceError>;

    /// The server's current recovery record for the account, if any.
    async fn recovery_status(
        &self,
        account_id: &AccountId,
    ) -> Result<Option<ServerRecovery>, RecoveryServiceError>;
}
