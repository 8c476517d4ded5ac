//! Storage effect consumed by daos that persist durable rows.

use async_trait::async_trait;
use thiserror::Error;

/// Error type for storage operations.
#[derive(Debug, Clone, Error)]
pub enum StorageError {
    /// The key was rejected before any I/O.
    #[error("invalid key: {reason}")]
    InvalidKey {
        /// Why the key was rejected.
        reason: String,
    },
    /// A read failed.
    #[error("read failed: {0}")]
    ReadFailed(String),
    /// A write failed.
    #[error("write failed: {0}")]
    WriteFailed(String),
    /// A delete failed.
    #[error("delete failed: {0}")]
    DeleteFailed(String),
}

/// Durable key/value storage.
///
/// Values are opaque bytes; callers own serialization. Absent keys read back
/// as `None` rather than an error.
#[async_trait]
pub trait StorageEffects: Send + Sync {
    /// Store `value` under `key`, replacing any previous value.
    async fn store(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError>;

    /// Retrieve the value under `key`, if any.
    async fn retrieve(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError>;

    /// Remove the value under `key`. Returns whether a value was present.
    async fn remove(&self, key: &str) -> Result<bool, StorageError>;
}
