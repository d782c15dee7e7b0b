//! Key-value storage handlers.
//!
//! The client persists very little: a single onboarding-completion flag and
//! the offline response cache. Both go through this effect trait so tests
//! run against the in-memory handler and production against the filesystem.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::PathBuf;
use thiserror::Error;
use tokio::fs;

/// Fixed key under which the onboarding-completion flag is stored.
pub const ONBOARDING_KEY: &str = "thresholdvault.onboarding";

/// Storage failures.
#[derive(Debug, Clone, Error)]
pub enum StorageError {
    /// Key is empty or otherwise unusable.
    #[error("invalid key: {0}")]
    InvalidKey(String),
    /// Underlying read failed.
    #[error("read failed: {0}")]
    ReadFailed(String),
    /// Underlying write failed.
    #[error("write failed: {0}")]
    WriteFailed(String),
}

/// Minimal persisted key-value surface.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read a value, `None` if absent.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError>;
    /// Write a value, replacing any previous one.
    async fn put(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError>;
    /// Remove a value if present.
    async fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Filesystem-backed store; one file per key.
#[derive(Debug, Clone)]
pub struct FilesystemStore {
    base_path: PathBuf,
}

impl FilesystemStore {
    /// Create a store rooted at `base_path`.
    #[must_use]
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn file_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        if key.is_empty() {
            return Err(StorageError::InvalidKey("key cannot be empty".to_string()));
        }
        Ok(self.base_path.join(format!("{key}.dat")))
    }
}

#[async_trait]
impl KeyValueStore for FilesystemStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let path = self.file_for(key)?;
        match fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::ReadFailed(e.to_string())),
        }
    }

    async fn put(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError> {
        let path = self.file_for(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| StorageError::WriteFailed(e.to_string()))?;
        }
        fs::write(&path, value)
            .await
            .map_err(|e| StorageError::WriteFailed(e.to_string()))
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        let path = self.file_for(key)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::WriteFailed(e.to_string())),
        }
    }
}

/// In-memory store for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        if key.is_empty() {
            return Err(StorageError::InvalidKey("key cannot be empty".to_string()));
        }
        Ok(self.entries.lock().get(key).cloned())
    }

    async fn put(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError> {
        if key.is_empty() {
            return Err(StorageError::InvalidKey("key cannot be empty".to_string()));
        }
        self.entries.lock().insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.entries.lock().remove(key);
        Ok(())
    }
}
