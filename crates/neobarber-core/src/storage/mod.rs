//! Secret storage for the persisted bearer token.
//!
//! This module provides the `SecretStore` capability (get/set/delete of string
//! values by key) and its backends:
//! - `KeyringStore`: OS-level secret storage via keyring
//! - `FileStore`: Plain JSON file in the user's data directory
//! - `MemoryStore`: Process-local map, nothing survives a restart
//!
//! The backend is chosen once at startup from `StorageBackend`.

pub mod file;
pub mod keychain;
pub mod memory;

use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

pub use file::FileStore;
pub use keychain::KeyringStore;
pub use memory::MemoryStore;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Keychain error: {0}")]
    Keyring(#[from] ::keyring::Error),

    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage file is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),

    #[error("Storage task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Key/value persistence for secrets.
///
/// Absence of a key is `Ok(None)`, never an error. `delete_item` on an absent
/// key succeeds.
#[async_trait]
pub trait SecretStore: Send + Sync {
    async fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;

    async fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;

    async fn delete_item(&self, key: &str) -> Result<(), StorageError>;

    /// Short backend name for logs
    fn backend_name(&self) -> &'static str;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Keyring,
    File,
    Memory,
}

impl FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "keyring" | "keychain" | "secure" => Ok(StorageBackend::Keyring),
            "file" | "web" => Ok(StorageBackend::File),
            "memory" | "mem" => Ok(StorageBackend::Memory),
            other => Err(format!("unknown storage backend: {}", other)),
        }
    }
}

impl std::fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageBackend::Keyring => write!(f, "keyring"),
            StorageBackend::File => write!(f, "file"),
            StorageBackend::Memory => write!(f, "memory"),
        }
    }
}

/// Open the store for `backend`. `data_dir` is only used by the file backend.
pub fn open_store(backend: StorageBackend, data_dir: &Path) -> Arc<dyn SecretStore> {
    debug!(%backend, ?data_dir, "Opening secret store");
    match backend {
        StorageBackend::Keyring => Arc::new(KeyringStore::new()),
        StorageBackend::File => Arc::new(FileStore::in_dir(data_dir)),
        StorageBackend::Memory => Arc::new(MemoryStore::new()),
    }
}
