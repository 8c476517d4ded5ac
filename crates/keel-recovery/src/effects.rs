//! Collaborator seams consumed by the completion flow.
//!
//! Hardware signing/verification, app keystore signing, token issuance, and
//! account key storage all live elsewhere; the completer only needs these
//! narrow traits.

use async_trait::async_trait;
use keel_core::{
    AccountId, AppGlobalAuthKey, AppKeyBundle, AppSignature, AuthTokenScope, AuthTokens,
    CompletionChallenge, HardwareAuthKey, HardwareSignature, PhysicalClock,
};
use std::sync::Arc;
use thiserror::Error;

/// Verification of hardware signatures over completion challenges.
pub trait ChallengeVerifier: Send + Sync {
    /// Whether `signature` over `challenge` verifies against `key`.
    fn verify(
        &self,
        key: &HardwareAuthKey,
        challenge: &CompletionChallenge,
        signature: &HardwareSignature,
    ) -> bool;
}

/// Error type for app keystore signing.
#[derive(Debug, Clone, Error)]
pub enum SigningError {
    /// The private key is not present in the keystore.
    #[error("key not found in keystore: {key}")]
    KeyNotFound {
        /// The public key whose private half was missing.
        key: String,
    },
    /// The keystore failed.
    #[error("signing failed: {0}")]
    Failed(String),
}

/// Signing with an app auth key held in the local keystore.
#[async_trait]
pub trait AppAuthKeyMessageSigner: Send + Sync {
    /// Sign `message` with the private half of `key`.
    async fn sign(
        &self,
        key: &AppGlobalAuthKey,
        message: &[u8],
    ) -> Result<AppSignature, SigningError>;
}

/// Error type for auth token operations.
#[derive(Debug, Clone, Error)]
pub enum AuthError {
    /// The service rejected the new keys.
    #[error("authentication rejected: {0}")]
    Rejected(String),
    /// The transport or token store failed.
    #[error("auth operation failed: {0}")]
    Failed(String),
}

/// Issuing and persisting auth tokens.
#[async_trait]
pub trait AuthTokenService: Send + Sync {
    /// Obtain fresh tokens for `scope` by authenticating with the new app
    /// keys. Succeeding here proves the keys are authorized before anything
    /// is committed locally.
    async fn refresh_tokens(
        &self,
        account_id: &AccountId,
        keys: &AppKeyBundle,
        scope: AuthTokenScope,
    ) -> Result<AuthTokens, AuthError>;

    /// Persist tokens for `scope`.
    async fn store_tokens(
        &self,
        account_id: &AccountId,
        scope: AuthTokenScope,
        tokens: &AuthTokens,
    ) -> Result<(), AuthError>;
}

/// Error type for account storage operations.
#[derive(Debug, Clone, Error)]
pub enum AccountError {
    /// The account store failed.
    #[error("account operation failed: {0}")]
    Failed(String),
}

/// Snapshot of a full account that is still active.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveAccountSnapshot {
    /// The active account.
    pub account_id: AccountId,
}

/// The account store, for the Lost-Hardware case where the full account stays
/// active throughout its own recovery.
#[async_trait]
pub trait AccountService: Send + Sync {
    /// The active full account matching `account_id`, if one exists.
    async fn active_account(
        &self,
        account_id: &AccountId,
    ) -> Result<Option<ActiveAccountSnapshot>, AccountError>;

    /// Rotate the stored auth keys of the active account.
    async fn rotate_auth_keys(
        &self,
        account_id: &AccountId,
        keys: &AppKeyBundle,
    ) -> Result<(), AccountError>;
}

/// The collaborators the completion flow needs, bundled so callers wire them
/// up once.
#[derive(Clone)]
pub struct CompletionEffects {
    /// Hardware signature verification.
    pub verifier: Arc<dyn ChallengeVerifier>,
    /// App keystore signing.
    pub signer: Arc<dyn AppAuthKeyMessageSigner>,
    /// Token issuance and persistence.
    pub auth: Arc<dyn AuthTokenService>,
    /// Account key storage.
    pub accounts: Arc<dyn AccountService>,
    /// Wall-clock time.
    pub clock: Arc<dyn PhysicalClock>,
}
