use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

use super::{SecretStore, StorageError};

/// Storage file name in the data directory
const STORAGE_FILE: &str = "storage.json";

/// Suffix of the scratch file a write goes to before it replaces the real one
const TEMP_SUFFIX: &str = "tmp";

/// Plain persistent storage: a JSON object of string keys to string values.
///
/// Not encrypted. Every write goes to a scratch file that is then renamed
/// over the real one, so a crash mid-write leaves the previous contents.
/// The lock serializes read-modify-write cycles within this process.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Store at `<dir>/storage.json`
    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join(STORAGE_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<BTreeMap<String, String>, StorageError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) if contents.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(contents) => Ok(serde_json::from_str(&contents)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, items: &BTreeMap<String, String>) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let contents = serde_json::to_string_pretty(items)?;
        let temp = self.temp_path();
        tokio::fs::write(&temp, contents).await?;
        tokio::fs::rename(&temp, &self.path).await?;
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        self.path.with_extension(TEMP_SUFFIX)
    }
}

#[async_trait]
impl SecretStore for FileStore {
    async fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        let _guard = self.lock.lock().await;
        Ok(self.load().await?.remove(key))
    }

    async fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let _guard = self.lock.lock().await;
        let mut items = self.load().await?;
        items.insert(key.to_string(), value.to_string());
        self.save(&items).await?;
        debug!(path = ?self.path, key = key, "Stored item");
        Ok(())
    }

    async fn delete_item(&self, key: &str) -> Result<(), StorageError> {
        let _guard = self.lock.lock().await;
        let mut items = self.load().await?;
        if items.remove(key).is_some() {
            self.save(&items).await?;
            debug!(path = ?self.path, key = key, "Deleted item");
        }
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "file"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_file_reads_as_empty() {
        let dir = tempfile::tempdir().expect("temp dir");
        let store = FileStore::in_dir(dir.path());
        assert_eq!(store.get_item("token").await.expect("get"), None);
        assert!(!store.path().exists());
    }

    #[tokio::test]
    async fn test_value_survives_reopen() {
        let dir = tempfile::tempdir().expect("temp dir");
        let nested = dir.path().join("neobarber");

        let store = FileStore::in_dir(&nested);
        store.set_item("token", "T1").await.expect("set");
        store.set_item("token", "T2").await.expect("overwrite");

        let reopened = FileStore::in_dir(&nested);
        assert_eq!(reopened.get_item("token").await.expect("get").as_deref(), Some("T2"));
    }

    #[tokio::test]
    async fn test_delete_twice_is_noop() {
        let dir = tempfile::tempdir().expect("temp dir");
        let store = FileStore::in_dir(dir.path());
        store.set_item("token", "T1").await.expect("set");
        store.set_item("other", "keep").await.expect("set");

        store.delete_item("token").await.expect("first delete");
        store.delete_item("token").await.expect("second delete");

        assert_eq!(store.get_item("token").await.expect("get"), None);
        assert_eq!(store.get_item("other").await.expect("get").as_deref(), Some("keep"));
    }

    #[tokio::test]
    async fn test_write_leaves_no_scratch_file() {
        let dir = tempfile::tempdir().expect("temp dir");
        let store = FileStore::in_dir(dir.path());
        store.set_item("token", "T1").await.expect("set");
        assert!(store.path().exists());
        assert!(!store.temp_path().exists());
    }

    #[tokio::test]
    async fn test_interrupted_write_keeps_previous_contents() {
        let dir = tempfile::tempdir().expect("temp dir");
        let store = FileStore::in_dir(dir.path());
        store.set_item("token", "T1").await.expect("set");

        // A crash after the scratch write but before the rename
        tokio::fs::write(store.temp_path(), "{\"token\": \"T2").await.expect("write");

        let reopened = FileStore::in_dir(dir.path());
        assert_eq!(reopened.get_item("token").await.expect("get").as_deref(), Some("T1"));

        // The next write replaces the leftover scratch file
        reopened.set_item("token", "T3").await.expect("set");
        assert_eq!(reopened.get_item("token").await.expect("get").as_deref(), Some("T3"));
        assert!(!reopened.temp_path().exists());
    }

    #[tokio::test]
    async fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        let store = FileStore::in_dir(dir.path());
        tokio::fs::write(store.path(), "{not json").await.expect("write");
        let err = store.get_item("token").await.expect_err("corrupt file");
        assert!(matches!(err, StorageError::Corrupt(_)));
    }
}
