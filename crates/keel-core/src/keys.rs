//! Opaque key material moved through the recovery protocol.
//!
//! Signing, sealing, and verification all happen behind external
//! collaborators (keystore, hardware transport), so everything here is an
//! opaque newtype. The wrappers exist to make misuse harder: a hardware auth
//! key cannot be passed where an app auth key is expected.

use serde::{Deserialize, Serialize};

/// Public auth key for the app factor's Global scope.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AppGlobalAuthKey(pub String);

/// Public auth key for the app factor's Recovery scope.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AppRecoveryAuthKey(pub String);

/// Public spending key held by the app factor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AppSpendingKey(pub String);

/// Public auth key held by the hardware factor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HardwareAuthKey(pub String);

/// Public spending key held by the hardware factor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HardwareSpendingKey(pub String);

/// Public spending key held by the server cosigner.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ServerSpendingKey(pub String);

/// Destination application keys generated for a recovery attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppKeyBundle {
    /// Auth key for the Global scope.
    pub auth: AppGlobalAuthKey,
    /// Auth key for the Recovery scope.
    pub recovery_auth: AppRecoveryAuthKey,
    /// Spending key.
    pub spending: AppSpendingKey,
}

/// Destination hardware keys generated for a recovery attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HardwareKeyBundle {
    /// Auth key.
    pub auth: HardwareAuthKey,
    /// Spending key.
    pub spending: HardwareSpendingKey,
}

/// Cloud-backup symmetric key, sealed to the hardware factor.
///
/// Opaque until unsealed by hardware during the fund sweep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealedCsek(pub Vec<u8>);

/// Share-backup symmetric key, sealed to the hardware factor alongside the
/// CSEK when completion is attempted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealedSsek(pub Vec<u8>);

/// Signature produced by an app auth key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppSignature(pub Vec<u8>);

/// Signature produced by a hardware auth key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HardwareSignature(pub Vec<u8>);

/// Hardware-signed proof that the caller currently possesses the hardware
/// factor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HardwareProofOfPossession(pub Vec<u8>);

/// Challenge both factors sign to complete a recovery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionChallenge(pub Vec<u8>);

impl CompletionChallenge {
    /// Challenge bytes as passed to the signing collaborators.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}
