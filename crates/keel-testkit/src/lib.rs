//! # Keel Testkit - Layer 8: Test Doubles and Fixtures
//!
//! Programmable fakes for the collaborator seams and fixture constructors for
//! the recovery model. Test-only; production handlers live in keel-effects.

#![forbid(unsafe_code)]

pub mod clock;
pub mod collaborators;
pub mod fixtures;
pub mod service;

pub use clock::ManualClock;
pub use collaborators::{
    FakeAccountService, FakeAuthTokenService, RecordingSigner, StaticChallengeVerifier,
};
pub use fixtures::{
    app_key_bundle, hardware_key_bundle, local_attempt, sealed_csek, sealed_ssek,
    server_recovery_for, spending_keyset,
};
pub use service::FakeRecoveryClient;
