//! # Keel Core - Layer 1: Shared Types and Effect Traits
//!
//! Foundation crate for the keel self-custodial wallet. Holds the identifier
//! newtypes, opaque key material, auth token types, and the effect traits
//! (storage, physical time) that higher layers consume.
//!
//! ## What Belongs Here
//!
//! - Identifier newtypes (`AccountId`, `SpendingKeysetId`)
//! - Opaque public key and sealed blob newtypes
//! - The lost-factor enum shared by the recovery protocol
//! - Effect trait definitions with their error types
//!
//! ## What Does NOT Belong Here
//!
//! - Effect handler implementations (keel-effects)
//! - Protocol flows (keel-recovery)
//! - Test doubles (keel-testkit)
//!
//! Cryptographic primitives are consumed through external collaborators, so
//! key material in this crate is transported as opaque newtypes only.

#![forbid(unsafe_code)]

pub mod effects;
pub mod factor;
pub mod identifiers;
pub mod keys;
pub mod tokens;

pub use effects::{PhysicalClock, StorageEffects, StorageError};
pub use factor::LostFactor;
pub use identifiers::{AccountId, SpendingKeysetId};
pub use keys::{
    AppGlobalAuthKey, AppKeyBundle, AppRecoveryAuthKey, AppSignature, AppSpendingKey,
    CompletionChallenge, HardwareAuthKey, HardwareKeyBundle, HardwareProofOfPossession,
    HardwareSignature, HardwareSpendingKey, SealedCsek, SealedSsek, ServerSpendingKey,
};
pub use tokens::{AccessToken, AuthTokenScope, AuthTokens, RefreshToken};
