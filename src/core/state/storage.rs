//! State storage backends
//!
//! Watermarks are persisted in a JSON state file that maps pipeline keys to
//! their [`Watermark`] entries, so several pipelines can share one file. An
//! in-memory storage backs tests and throwaway runs.

use crate::core::state::watermark::Watermark;
use crate::domain::{ReelError, Result};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// State storage trait for watermark persistence
#[async_trait]
pub trait StateStorage: Send + Sync {
    /// Load the watermark stored under `key`
    ///
    /// Returns `Ok(None)` if nothing has been stored yet.
    async fn load_watermark(&self, key: &str) -> Result<Option<Watermark>>;

    /// Insert or replace a watermark entry
    async fn save_watermark(&self, watermark: &Watermark) -> Result<()>;

    /// Every stored watermark, ordered by key
    async fn get_all_watermarks(&self) -> Result<Vec<Watermark>>;
}

/// JSON file state storage
///
/// Writes go to a sibling temporary file which is then renamed over the
/// state file, so readers never observe a half-written document.
pub struct JsonFileStorage {
    path: PathBuf,
}

impl JsonFileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_all(&self) -> Result<BTreeMap<String, Watermark>> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => {
                return Err(ReelError::State(format!(
                    "Failed to read state file {}: {e}",
                    self.path.display()
                )))
            }
        };

        if contents.trim().is_empty() {
            return Ok(BTreeMap::new());
        }

        serde_json::from_str(&contents).map_err(|e| {
            ReelError::State(format!(
                "State file {} is not valid: {e}",
                self.path.display()
            ))
        })
    }

    async fn write_all(&self, entries: &BTreeMap<String, Watermark>) -> Result<()> {
        let body = serde_json::to_string_pretty(entries)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                ReelError::State(format!(
                    "Failed to create state directory {}: {e}",
                    parent.display()
                ))
            })?;
        }

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        tokio::fs::write(&tmp, body).await.map_err(|e| {
            ReelError::State(format!("Failed to write {}: {e}", tmp.display()))
        })?;
        tokio::fs::rename(&tmp, &self.path).await.map_err(|e| {
            ReelError::State(format!(
                "Failed to replace state file {}: {e}",
                self.path.display()
            ))
        })
    }
}

#[async_trait]
impl StateStorage for JsonFileStorage {
    async fn load_watermark(&self, key: &str) -> Result<Option<Watermark>> {
        let mut entries = self.read_all().await?;
        let watermark = entries.remove(key);

        tracing::debug!(
            key = %key,
            found = watermark.is_some(),
            path = %self.path.display(),
            "Loaded watermark from state file"
        );

        Ok(watermark)
    }

    async fn save_watermark(&self, watermark: &Watermark) -> Result<()> {
        let mut entries = self.read_all().await?;
        entries.insert(watermark.key.clone(), watermark.clone());
        self.write_all(&entries).await?;

        tracing::debug!(
            key = %watermark.key,
            last_synced = %watermark.last_synced,
            status = %watermark.last_run_status,
            "Watermark saved to state file"
        );

        Ok(())
    }

    async fn get_all_watermarks(&self) -> Result<Vec<Watermark>> {
        Ok(self.read_all().await?.into_values().collect())
    }
}

/// In-memory state storage
#[derive(Default)]
pub struct MemoryStorage {
    entries: Mutex<BTreeMap<String, Watermark>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, BTreeMap<String, Watermark>>> {
        self.entries
            .lock()
            .map_err(|_| ReelError::State("In-memory state lock poisoned".to_string()))
    }
}

#[async_trait]
impl StateStorage for MemoryStorage {
    async fn load_watermark(&self, key: &str) -> Result<Option<Watermark>> {
        Ok(self.lock()?.get(key).cloned())
    }

    async fn save_watermark(&self, watermark: &Watermark) -> Result<()> {
        self.lock()?
            .insert(watermark.key.clone(), watermark.clone());
        Ok(())
    }

    async fn get_all_watermarks(&self) -> Result<Vec<Watermark>> {
        Ok(self.lock()?.values().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SyncTimestamp;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_json_file_missing_is_empty() {
        let dir = TempDir::new().unwrap();
        let storage = JsonFileStorage::new(dir.path().join("state.json"));
        assert!(storage.load_watermark("movies").await.unwrap().is_none());
        assert!(storage.get_all_watermarks().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_json_file_keeps_other_keys() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("state.json");
        let storage = JsonFileStorage::new(&path);

        let mut first = Watermark::new("movies");
        first.advance(SyncTimestamp::parse("2024-01-01 00:00:00").unwrap(), 3);
        storage.save_watermark(&first).await.unwrap();
        storage.save_watermark(&Watermark::new("series")).await.unwrap();

        let loaded = storage.load_watermark("movies").await.unwrap().unwrap();
        assert_eq!(loaded, first);
        assert_eq!(storage.get_all_watermarks().await.unwrap().len(), 2);
        assert!(!dir.path().join("nested").join("state.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_json_file_corrupt_is_state_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "{not json").unwrap();

        let storage = JsonFileStorage::new(&path);
        let err = storage.load_watermark("movies").await.unwrap_err();
        assert!(matches!(err, ReelError::State(_)));
    }

    #[tokio::test]
    async fn test_memory_storage_round_trip() {
        let storage = MemoryStorage::new();
        storage.save_watermark(&Watermark::new("movies")).await.unwrap();
        assert!(storage.load_watermark("movies").await.unwrap().is_some());
        assert!(storage.load_watermark("other").await.unwrap().is_none());
    }
}
