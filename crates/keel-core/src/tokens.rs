//! Auth token types handed out by the recovery service.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The authentication scope a token pair belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AuthTokenScope {
    /// Full-account scope used by everyday operations.
    Global,
    /// Restricted scope used only while a recovery is in flight.
    Recovery,
}

impl fmt::Display for AuthTokenScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Global => write!(f, "global"),
            Self::Recovery => write!(f, "recovery"),
        }
    }
}

/// Short-lived access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessToken(pub String);

/// Long-lived refresh token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshToken(pub String);

/// Token pair for one scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthTokens {
    /// Access token.
    pub access: AccessToken,
    /// Refresh token.
    pub refresh: RefreshToken,
}
