//! Programmable fake of the remote recovery service.

use async_trait::async_trait;
use keel_core::{AccountId, HardwareProofOfPossession};
use keel_recovery::{
    CancelRecoveryClientError, CompletionAttempt, InitiateRecoveryClientError,
    InitiateRecoveryRequest, RecoveryServiceClient, RecoveryServiceError, ServerRecovery,
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;

/// In-process stand-in for the remote recovery service.
///
/// With nothing enqueued it behaves like a well-behaved server: `initiate`
/// creates a record (or rejects a duplicate), `cancel` removes it (or reports
/// that none exists), `complete` removes it, and `recovery_status` returns
/// it. Enqueued responses override the next matching call, letting tests
/// inject failures or stale views.
#[derive(Debug, Default)]
pub struct FakeRecoveryClient {
    now_millis: AtomicU64,
    server_state: Mutex<Option<ServerRecovery>>,

    initiate_responses: Mutex<VecDeque<Result<ServerRecovery, InitiateRecoveryClientError>>>,
    cancel_responses: Mutex<VecDeque<Result<(), CancelRecoveryClientError>>>,
    complete_responses: Mutex<VecDeque<Result<(), RecoveryServiceError>>>,
    status_responses: Mutex<VecDeque<Result<Option<ServerRecovery>, RecoveryServiceError>>>,

    initiate_calls: Mutex<Vec<(AccountId, InitiateRecoveryRequest)>>,
    complete_calls: Mutex<Vec<(AccountId, CompletionAttempt)>>,
    cancel_calls: AtomicUsize,
    status_calls: AtomicUsize,
}

impl FakeRecoveryClient {
    /// A fake server at time zero with no recovery record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the fake server's wall clock, used to stamp delay windows.
    pub fn set_now_millis(&self, now_millis: u64) {
        self.now_millis.store(now_millis, Ordering::SeqCst);
    }

    /// The record the fake server currently holds.
    pub fn server_state(&self) -> Option<ServerRecovery> {
        lock(&self.server_state).clone()
    }

    /// Install a record directly, as if another device had initiated.
    pub fn set_server_state(&self, server: Option<ServerRecovery>) {
        *lock(&self.server_state) = server;
    }

    /// Override the next `initiate` response.
    pub fn enqueue_initiate(&self, response: Result<ServerRecovery, InitiateRecoveryClientError>) {
        lock(&self.initiate_responses).push_back(response);
    }

    /// Override the next `cancel` response.
    pub fn enqueue_cancel(&self, response: Result<(), CancelRecoveryClientError>) {
        lock(&self.cancel_responses).push_back(response);
    }

    /// Override the next `complete` response.
    pub fn enqueue_complete(&self, response: Result<(), RecoveryServiceError>) {
        lock(&self.complete_responses).push_back(response);
    }

    /// Override the next `recovery_status` response.
    pub fn enqueue_status(&self, response: Result<Option<ServerRecovery>, RecoveryServiceError>) {
        lock(&self.status_responses).push_back(response);
    }

    /// Recorded `initiate` calls.
    pub fn initiate_calls(&self) -> Vec<(AccountId, InitiateRecoveryRequest)> {
        lock(&self.initiate_calls).clone()
    }

    /// Recorded `complete` calls.
    pub fn complete_calls(&self) -> Vec<(AccountId, CompletionAttempt)> {
        lock(&self.complete_calls).clone()
    }

    /// Number of `cancel` calls.
    pub fn cancel_call_count(&self) -> usize {
        self.cancel_calls.load(Ordering::SeqCst)
    }

    /// Number of `recovery_status` calls.
    pub fn status_call_count(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RecoveryServiceClient for FakeRecoveryClient {
    async fn initiate(
        &self,
        account_id: &AccountId,
        request: InitiateRecoveryRequest,
    ) -> Result<ServerRecovery, InitiateRecoveryClientError> {
        lock(&self.initiate_calls).push((*account_id, request.clone()));
        if let Some(response) = lock(&self.initiate_responses).pop_front() {
            return response;
        }

        let mut state = lock(&self.server_state);
        if state.is_some() {
            return Err(InitiateRecoveryClientError::RecoveryAlreadyExists);
        }
        let now = self.now_millis.load(Ordering::SeqCst);
        let server = ServerRecovery {
            account_id: *account_id,
            delay_start_time: now,
            delay_end_time: now + request.delay.as_millis() as u64,
            lost_factor: request.lost_factor,
            destination: request.destination,
        };
        *state = Some(server.clone());
        Ok(server)
    }

    async fn cancel(
        &self,
        _account_id: &AccountId,
        _proof_of_possession: Option<HardwareProofOfPossession>,
    ) -> Result<(), CancelRecoveryClientError> {
        self.cancel_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(response) = lock(&self.cancel_responses).pop_front() {
            return response;
        }

        match lock(&self.server_state).take() {
            Some(_) => Ok(()),
            None => Err(CancelRecoveryClientError::NoRecoveryExists),
        }
    }

    async fn complete(
        &self,
        account_id: &AccountId,
        attempt: CompletionAttempt,
    ) -> Result<(), RecoveryServiceError> {
        lock(&self.complete_calls).push((*account_id, attempt));
        if let Some(response) = lock(&self.complete_responses).pop_front() {
            return response;
        }

        match lock(&self.server_state).take() {
            Some(_) => Ok(()),
            None => Err(RecoveryServiceError::Service(
                "no active recovery to complete".to_string(),
            )),
        }
    }

    async fn recovery_status(
        &self,
        _account_id: &AccountId,
    ) -> Result<Option<ServerRecovery>, RecoveryServiceError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(response) = lock(&self.status_responses).pop_front() {
            return response;
        }
        Ok(lock(&self.server_state).clone())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}
