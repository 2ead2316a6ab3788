use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use keyring::Entry;

use super::{SecretStore, StorageError};

/// Keyring service name the token entries are filed under
pub const SERVICE_NAME: &str = "neobarber";

/// Stores secrets in the OS keychain (macOS Keychain, Windows Credential
/// Manager, Secret Service on Linux with the kernel keyring as a cache).
/// Keychain calls block, so they run on the tokio blocking pool.
///
/// One `Entry` is kept per key for the life of the store.
#[derive(Debug)]
pub struct KeyringStore {
    service: String,
    entries: Mutex<HashMap<String, Arc<Entry>>>,
}

impl KeyringStore {
    pub fn new() -> Self {
        Self::with_service(SERVICE_NAME)
    }

    pub fn with_service(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn entry(&self, key: &str) -> Result<Arc<Entry>, StorageError> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(entry) = entries.get(key) {
            return Ok(Arc::clone(entry));
        }
        let entry = Arc::new(Entry::new(&self.service, key)?);
        entries.insert(key.to_string(), Arc::clone(&entry));
        Ok(entry)
    }
}

impl Default for KeyringStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SecretStore for KeyringStore {
    async fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        let entry = self.entry(key)?;
        tokio::task::spawn_blocking(move || -> Result<Option<String>, StorageError> {
            match entry.get_password() {
                Ok(value) => Ok(Some(value)),
                Err(keyring::Error::NoEntry) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await?
    }

    async fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let entry = self.entry(key)?;
        let value = value.to_string();
        tokio::task::spawn_blocking(move || -> Result<(), StorageError> {
            entry.set_password(&value)?;
            Ok(())
        })
        .await?
    }

    async fn delete_item(&self, key: &str) -> Result<(), StorageError> {
        let entry = self.entry(key)?;
        tokio::task::spawn_blocking(move || -> Result<(), StorageError> {
            match entry.delete_credential() {
                Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
                Err(e) => Err(e.into()),
            }
        })
        .await?
    }

    fn backend_name(&self) -> &'static str {
        "keyring"
    }
}
