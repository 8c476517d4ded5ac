//! Filesystem-based storage handler.

use async_trait::async_trait;
use keel_core::{StorageEffects, StorageError};
use std::path::PathBuf;
use tokio::fs;

/// Storage handler that keeps each value as a file under a base directory.
///
/// Stateless; every operation delegates to the filesystem. Keys may contain
/// `/` separators, which become subdirectories.
#[derive(Debug, Clone)]
pub struct FilesystemStorageHandler {
    base_path: PathBuf,
}

impl FilesystemStorageHandler {
    /// Create a handler rooted at `base_path`.
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn file_path(&self, key: &str) -> Result<PathBuf, StorageError> {
        if key.is_empty() {
            return Err(StorageError::InvalidKey {
                reason: "key cannot be empty".to_string(),
            });
        }
        if key.split('/').any(|segment| segment == "..") {
            return Err(StorageError::InvalidKey {
                reason: "key cannot traverse out of the base path".to_string(),
            });
        }
        Ok(self.base_path.join(format!("{key}.dat")))
    }
}

#[async_trait]
impl StorageEffects for FilesystemStorageHandler {
    async fn store(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError> {
        let file_path = self.file_path(key)?;
        if let Some(parent) = file_path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| StorageError::WriteFailed(format!("create directory: {e}")))?;
        }

        fs::write(&file_path, value)
            .await
            .map_err(|e| StorageError::WriteFailed(format!("write file: {e}")))?;

        Ok(())
    }

    async fn retrieve(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let file_path = self.file_path(key)?;

        match fs::read(&file_path).await {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::ReadFailed(format!("read file: {e}"))),
        }
    }

    async fn remove(&self, key: &str) -> Result<bool, StorageError> {
        let file_path = self.file_path(key)?;

        match fs::remove_file(&file_path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StorageError::DeleteFailed(format!("remove file: {e}"))),
        }
    }
}
