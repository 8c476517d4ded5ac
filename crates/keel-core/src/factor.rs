//! The two physical factors that hold key material for an account.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which of the two key-holding factors was lost and is being replaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LostFactor {
    /// The mobile application's key material is gone; the hardware survives.
    App,
    /// The paired hardware device's key material is gone; the app survives.
    Hardware,
}

impl LostFactor {
    /// The factor that survives and authorizes the recovery.
    pub fn surviving(&self) -> Self {
        match self {
            Self::App => Self::Hardware,
            Self::Hardware => Self::App,
        }
    }
}

impl fmt::Display for LostFactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::App => write!(f, "app"),
            Self::Hardware => write!(f, "hardware"),
        }
    }
}
