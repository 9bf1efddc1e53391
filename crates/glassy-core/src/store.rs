//! Persistence of the preferred opacity
//!
//! The only durable state is the last dimmed level the user chose. It lives
//! in `~/.local/share/glassy/state.json` as `{"preferredOpacity": 0.8}`.

use crate::errors::{ConfigError, StoreError};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Durable storage for the preferred opacity
pub trait PreferenceStore: Send + Sync {
    /// The stored level, or `None` if nothing was saved yet
    fn load_preferred(&self) -> impl Future<Output = Result<Option<f64>, StoreError>> + Send;

    fn save_preferred(&self, level: f64) -> impl Future<Output = Result<(), StoreError>> + Send;
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    preferred_opacity: Option<f64>,
}

/// JSON file backed [`PreferenceStore`]
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store in the user data directory
    pub fn open_default() -> Result<Self, ConfigError> {
        Ok(Self::new(Self::default_path()?))
    }

    pub fn default_path() -> Result<PathBuf, ConfigError> {
        let dir = dirs::data_dir().ok_or(ConfigError::NoHomeDir("data"))?;
        Ok(dir.join("glassy").join("state.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Lock file guarding read-modify-write cycles against this store
    pub fn lock_path(&self) -> PathBuf {
        self.path.with_extension("lock")
    }

    fn io_error(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl PreferenceStore for FileStore {
    async fn load_preferred(&self) -> Result<Option<f64>, StoreError> {
        let data = match tokio::fs::read(&self.path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.io_error(e)),
        };
        let state: StoredState = serde_json::from_slice(&data).map_err(|source| StoreError::Json {
            path: self.path.clone(),
            source,
        })?;
        Ok(state.preferred_opacity)
    }

    async fn save_preferred(&self, level: f64) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| self.io_error(e))?;
        }

        let state = StoredState {
            preferred_opacity: Some(level),
        };
        let data = serde_json::to_vec_pretty(&state).map_err(|source| StoreError::Json {
            path: self.path.clone(),
            source,
        })?;

        // Write then rename so a crash never leaves a truncated file
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, data)
            .await
            .map_err(|e| self.io_error(e))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| self.io_error(e))?;
        Ok(())
    }
}

/// In-memory [`PreferenceStore`], shared between clones
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<MemoryState>>,
}

#[derive(Debug, Default)]
struct MemoryState {
    preferred: Option<f64>,
    saves: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_preferred(level: f64) -> Self {
        let store = Self::new();
        store.inner.lock().preferred = Some(level);
        store
    }

    pub fn preferred(&self) -> Option<f64> {
        self.inner.lock().preferred
    }

    /// Number of successful saves
    pub fn saves(&self) -> usize {
        self.inner.lock().saves
    }
}

impl PreferenceStore for MemoryStore {
    async fn load_preferred(&self) -> Result<Option<f64>, StoreError> {
        Ok(self.inner.lock().preferred)
    }

    async fn save_preferred(&self, level: f64) -> Result<(), StoreError> {
        let mut state = self.inner.lock();
        state.preferred = Some(level);
        state.saves += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("state.json"));
        assert_eq!(store.load_preferred().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("nested").join("state.json"));

        store.save_preferred(0.8).await.unwrap();
        assert_eq!(store.load_preferred().await.unwrap(), Some(0.8));

        store.save_preferred(0.55).await.unwrap();
        assert_eq!(store.load_preferred().await.unwrap(), Some(0.55));
        assert!(!store.path().with_extension("json.tmp").exists());
    }

    #[tokio::test]
    async fn test_file_format() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("state.json"));
        store.save_preferred(0.7).await.unwrap();

        let text = std::fs::read_to_string(store.path()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["preferredOpacity"], 0.7);
    }

    #[tokio::test]
    async fn test_corrupt_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "{not json").unwrap();

        let err = FileStore::new(&path).load_preferred().await.unwrap_err();
        assert!(matches!(err, StoreError::Json { .. }));
    }

    #[tokio::test]
    async fn test_empty_object_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "{}").unwrap();
        assert_eq!(FileStore::new(&path).load_preferred().await.unwrap(), None);
    }

    #[test]
    fn test_lock_path_sits_next_to_state() {
        let store = FileStore::new("/tmp/glassy/state.json");
        assert_eq!(store.lock_path(), PathBuf::from("/tmp/glassy/state.lock"));
    }

    #[tokio::test]
    async fn test_memory_store_counts_saves() {
        let store = MemoryStore::new();
        assert_eq!(store.load_preferred().await.unwrap(), None);
        store.save_preferred(0.6).await.unwrap();
        assert_eq!(store.preferred(), Some(0.6));
        assert_eq!(store.saves(), 1);
    }
}
