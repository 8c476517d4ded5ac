//! Fakes for the completion flow's collaborator seams.

use async_trait::async_trait;
use keel_core::{
    AccessToken, AccountId, AppGlobalAuthKey, AppKeyBundle, AppSignature, AuthTokenScope,
    AuthTokens, CompletionChallenge, HardwareAuthKey, HardwareSignature, RefreshToken,
};
use keel_recovery::{
    AccountError, AccountService, ActiveAccountSnapshot, AppAuthKeyMessageSigner, AuthError,
    AuthTokenService, ChallengeVerifier, SigningError,
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// Verifier with a fixed answer.
#[derive(Debug, Clone, Copy)]
pub struct StaticChallengeVerifier {
    accept: bool,
}

impl StaticChallengeVerifier {
    /// Verifier that accepts every signature.
    pub fn accepting() -> Self {
        Self { accept: true }
    }

    /// Verifier that rejects every signature.
    pub fn rejecting() -> Self {
        Self { accept: false }
    }
}

impl ChallengeVerifier for StaticChallengeVerifier {
    fn verify(
        &self,
        _key: &HardwareAuthKey,
        _challenge: &CompletionChallenge,
        _signature: &HardwareSignature,
    ) -> bool {
        self.accept
    }
}

/// Signer producing deterministic signatures and recording every call.
#[derive(Debug, Default)]
pub struct RecordingSigner {
    calls: Mutex<Vec<(AppGlobalAuthKey, Vec<u8>)>>,
    failures: Mutex<VecDeque<SigningError>>,
}

impl RecordingSigner {
    /// A signer that signs everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `sign` call with `error`.
    pub fn enqueue_failure(&self, error: SigningError) {
        lock(&self.failures).push_back(error);
    }

    /// Recorded `sign` calls.
    pub fn calls(&self) -> Vec<(AppGlobalAuthKey, Vec<u8>)> {
        lock(&self.calls).clone()
    }
}

#[async_trait]
impl AppAuthKeyMessageSigner for RecordingSigner {
    async fn sign(
        &self,
        key: &AppGlobalAuthKey,
        message: &[u8],
    ) -> Result<AppSignature, SigningError> {
        lock(&self.calls).push((key.clone(), message.to_vec()));
        if let Some(error) = lock(&self.failures).pop_front() {
            return Err(error);
        }
        let mut bytes = format!("app-sig:{}:", key.0).into_bytes();
        bytes.extend_from_slice(message);
        Ok(AppSignature(bytes))
    }
}

/// Token service minting deterministic tokens and recording persistence.
#[derive(Debug, Default)]
pub struct FakeAuthTokenService {
    counter: AtomicU64,
    refresh_failures: Mutex<VecDeque<AuthError>>,
    store_failures: Mutex<VecDeque<AuthError>>,
    refreshed: Mutex<Vec<AuthTokenScope>>,
    stored: Mutex<Vec<(AuthTokenScope, AuthTokens)>>,
}

impl FakeAuthTokenService {
    /// A token service that always succeeds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `refresh_tokens` call with `error`.
    pub fn enqueue_refresh_failure(&self, error: AuthError) {
        lock(&self.refresh_failures).push_back(error);
    }

    /// Fail the next `store_tokens` call with `error`.
    pub fn enqueue_store_failure(&self, error: AuthError) {
        lock(&self.store_failures).push_back(error);
    }

    /// Scopes refreshed so far, in order.
    pub fn refreshed_scopes(&self) -> Vec<AuthTokenScope> {
        lock(&self.refreshed).clone()
    }

    /// Tokens persisted so far, in order.
    pub fn stored_tokens(&self) -> Vec<(AuthTokenScope, AuthTokens)> {
        lock(&self.stored).clone()
    }
}

#[async_trait]
impl AuthTokenService for FakeAuthTokenService {
    async fn refresh_tokens(
        &self,
        _account_id: &AccountId,
        _keys: &AppKeyBundle,
        scope: AuthTokenScope,
    ) -> Result<AuthTokens, AuthError> {
        if let Some(error) = lock(&self.refresh_failures).pop_front() {
            return Err(error);
        }
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        lock(&self.refreshed).push(scope);
        Ok(AuthTokens {
            access: AccessToken(format!("{scope}-access-{n}")),
            refresh: RefreshToken(format!("{scope}-refresh-{n}")),
        })
    }

    async fn store_tokens(
        &self,
        _account_id: &AccountId,
        scope: AuthTokenScope,
        tokens: &AuthTokens,
    ) -> Result<(), AuthError> {
        if let Some(error) = lock(&self.store_failures).pop_front() {
            return Err(error);
        }
        lock(&self.stored).push((scope, tokens.clone()));
        Ok(())
    }
}

/// Account store fake for the Lost-Hardware path.
#[derive(Debug, Default)]
pub struct FakeAccountService {
    active: Mutex<Option<ActiveAccountSnapshot>>,
    rotations: Mutex<Vec<(AccountId, AppKeyBundle)>>,
}

impl FakeAccountService {
    /// No account is active (the Lost-App case).
    pub fn inactive() -> Self {
        Self::default()
    }

    /// `account_id` is a full active account (the Lost-Hardware case).
    pub fn with_active_account(account_id: AccountId) -> Self {
        Self {
            active: Mutex::new(Some(ActiveAccountSnapshot { account_id })),
            rotations: Mutex::new(Vec::new()),
        }
    }

    /// Key rotations applied to the active account.
    pub fn rotations(&self) -> Vec<(AccountId, AppKeyBundle)> {
        lock(&self.rotations).clone()
    }
}

#[async_trait]
impl AccountService for FakeAccountService {
    async fn active_account(
        &self,
        account_id: &AccountId,
    ) -> Result<Option<ActiveAccountSnapshot>, AccountError> {
        Ok(lock(&self.active)
            .clone()
            .filter(|snapshot| snapshot.account_id == *account_id))
    }

    async fn rotate_auth_keys(
        &self,
        account_id: &AccountId,
        keys: &AppKeyBundle,
    ) -> Result<(), AccountError> {
        lock(&self.rotations).push((*account_id, keys.clone()));
        Ok(())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}
