//! # Keel Recovery - Layer 5: Delay-and-Notify Account Recovery
//!
//! The protocol by which a keel wallet recovers control after losing either
//! the app factor's or the hardware factor's key material, without any single
//! party able to unilaterally move funds.
//!
//! ## Purpose
//!
//! Two independently, asynchronously updated sources of truth — the local
//! on-device recovery attempt and the server-held canonical recovery record —
//! are reconciled into one authoritative [`Recovery`] value, across delay
//! windows, contested claims, process crashes, and idempotent retries, while
//! a single lock serializes the interactive flows and the background poller.
//!
//! ## Architecture Constraints
//!
//! This crate depends on:
//! - **Layer 1** (keel-core): identifiers, key material, effect traits
//!
//! Production effect handlers come from keel-effects; the remote service,
//! hardware signing, app keystore, token issuance, and account storage are
//! consumed through the trait seams in [`client`] and [`effects`].
//!
//! ## What Belongs Here
//!
//! - The recovery data model and the pure reconciliation function
//! - Durable persistence of the two recovery rows
//! - The recovery lock serializing all mutation
//! - Initiation, cancellation, completion, and background sync flows
//!
//! ## What Does NOT Belong Here
//!
//! - UI state machines and screen flows
//! - Hardware/NFC transport and cryptographic primitives
//! - Cloud backup storage and post-recovery fund-sweep mechanics
//! - Transaction broadcast
//!
//! ## Design Principles
//!
//! - One authoritative value: every observable state is derived purely from
//!   the two durable rows; there is no hidden in-memory protocol state.
//! - Local progress is monotone, and rotation is the point of no return.
//! - The lock is coarse on purpose: one global critical section for the
//!   whole recovery domain, traded for the invariant that observed state is
//!   never a mix of two in-flight writers.
//! - No automatic retries; transient failures belong to the caller or the
//!   poller's next tick.

#![forbid(unsafe_code)]

pub mod cancel;
pub mod client;
pub mod complete;
pub mod config;
pub mod effects;
pub mod initiate;
pub mod lock;
pub mod model;
pub mod reconcile;
pub mod store;
pub mod syncer;

pub use cancel::{CancelRecoveryError, RecoveryCanceler};
pub use client::{
    CancelRecoveryClientError, CompletionAttempt, InitiateRecoveryClientError,
    InitiateRecoveryRequest, RecoveryServiceClient, RecoveryServiceError,
};
pub use complete::{CompleteRecoveryError, RecoveryCompleter, RotateAuthTokensError};
pub use config::RecoveryConfig;
pub use effects::{
    AccountError, AccountService, ActiveAccountSnapshot, AppAuthKeyMessageSigner, AuthError,
    AuthTokenService, ChallengeVerifier, CompletionEffects, SigningError,
};
pub use initiate::{
    InitiateRecoveryError, LostAppRecoveryInitiator, LostAppRecoveryRequest,
    LostHardwareRecoveryInitiator, LostHardwareRecoveryRequest, RetryInitiationError,
};
pub use lock::{RecoveryLock, RecoveryLockGuard};
pub use model::{
    LocalRecoveryAttempt, LocalRecoveryProgress, Recovery, RecoveryDestination, ServerRecovery,
    SpendingKeyset,
};
pub use reconcile::reconcile;
pub use store::{RecoveryDao, RecoveryStoreError};
pub use syncer::{RecoverySyncer, SyncError, SyncHandle};
