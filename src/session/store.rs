//! Local state store
//!
//! A flat string-to-string map persisted as one JSON object. Every mutation
//! is written through immediately (temp file + rename), so the file always
//! holds the last successful write.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Keys used in the state file
pub mod keys {
    pub const TOKEN: &str = "token";
    pub const USER_EMAIL: &str = "userEmail";
    pub const THEME: &str = "theme";
    pub const LAST_DETECTION: &str = "lastDetection";
    pub const LAST_DETECTION_RESULTS: &str = "lastDetectionResults";
    pub const EMAIL_ALERTS: &str = "enableEmailAlerts";
    pub const NOTIFICATIONS: &str = "enableBrowserNotifications";
}

/// Errors from reading or writing the state file
#[derive(Error, Debug)]
pub enum StoreError {
    /// I/O operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// File exists but is not a JSON object of strings
    #[error("Corrupt state file {path:?}: {error}")]
    Corrupt { path: PathBuf, error: String },

    /// Serialization failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Persisted key/value area
#[derive(Debug, Clone)]
pub struct LocalStore {
    /// Backing file; `None` keeps everything in memory
    path: Option<PathBuf>,
    entries: BTreeMap<String, String>,
}

impl LocalStore {
    /// Open the store at `path`. A missing file is an empty store.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();

        let entries = match fs::read_to_string(&path) {
            Ok(content) if content.trim().is_empty() => BTreeMap::new(),
            Ok(content) => {
                serde_json::from_str(&content).map_err(|e| StoreError::Corrupt {
                    path: path.clone(),
                    error: e.to_string(),
                })?
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };

        tracing::debug!(path = ?path, keys = entries.len(), "Opened state store");

        Ok(Self {
            path: Some(path),
            entries,
        })
    }

    /// Store that never touches disk
    pub fn in_memory() -> Self {
        Self {
            path: None,
            entries: BTreeMap::new(),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn set(&mut self, key: &str, value: impl Into<String>) -> StoreResult<()> {
        self.apply([(key, Some(value.into()))])
    }

    pub fn remove(&mut self, key: &str) -> StoreResult<()> {
        self.apply([(key, None)])
    }

    /// Apply several sets (`Some`) and removals (`None`) with a single write
    pub fn apply<'a, I>(&mut self, changes: I) -> StoreResult<()>
    where
        I: IntoIterator<Item = (&'a str, Option<String>)>,
    {
        for (key, value) in changes {
            match value {
                Some(value) => {
                    self.entries.insert(key.to_string(), value);
                }
                None => {
                    self.entries.remove(key);
                }
            }
        }
        self.persist()
    }

    fn persist(&self) -> StoreResult<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let content = serde_json::to_string_pretty(&self.entries)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, content)?;
        fs::rename(&tmp, path)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempdir().unwrap();
        let store = LocalStore::open(dir.path().join("state.json")).unwrap();
        assert!(store.get(keys::TOKEN).is_none());
    }

    #[test]
    fn test_values_survive_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("state.json");

        {
            let mut store = LocalStore::open(&path).unwrap();
            store.set(keys::TOKEN, "abc").unwrap();
            store.set(keys::THEME, "light").unwrap();
            store.remove(keys::THEME).unwrap();
        }

        let store = LocalStore::open(&path).unwrap();
        assert_eq!(store.get(keys::TOKEN), Some("abc"));
        assert!(!store.contains(keys::THEME));
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn test_last_write_wins() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");

        let mut first = LocalStore::open(&path).unwrap();
        let mut second = LocalStore::open(&path).unwrap();
        first.set(keys::USER_EMAIL, "a@lab.io").unwrap();
        second.set(keys::USER_EMAIL, "b@lab.io").unwrap();

        let store = LocalStore::open(&path).unwrap();
        assert_eq!(store.get(keys::USER_EMAIL), Some("b@lab.io"));
    }

    #[test]
    fn test_corrupt_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "{not json").unwrap();

        let err = LocalStore::open(&path).unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { .. }));
    }

    #[test]
    fn test_in_memory_store() {
        let mut store = LocalStore::in_memory();
        store
            .apply([(keys::TOKEN, Some("t".to_string())), (keys::USER_EMAIL, None)])
            .unwrap();
        assert_eq!(store.get(keys::TOKEN), Some("t"));
        assert!(store.path().is_none());
    }
}
