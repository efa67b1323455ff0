//! Client-side persisted key/value storage.
//!
//! A small JSON file holding the handful of values the client keeps between
//! runs (the auth token and the active locale). Reads are served from memory;
//! every write is flushed to disk before returning.

use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::StorageError;

pub struct ClientStorage {
    path: Option<PathBuf>,
    entries: Mutex<BTreeMap<String, String>>,
}

impl ClientStorage {
    /// Open the storage file at `path`, creating an empty store if it doesn't exist.
    ///
    /// A corrupted file is logged and treated as empty; the next write replaces it.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        let entries = Self::read_entries(&path)?;

        tracing::debug!("Opened client storage at {:?} ({} keys)", path, entries.len());
        Ok(Self {
            path: Some(path),
            entries: Mutex::new(entries),
        })
    }

    /// Storage that lives only as long as this value. Used by tests and one-shot tools.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            entries: Mutex::new(BTreeMap::new()),
        }
    }

    fn read_entries(path: &Path) -> Result<BTreeMap<String, String>, StorageError> {
        if !path.exists() {
            return Ok(BTreeMap::new());
        }

        let json = fs::read_to_string(path).map_err(|e| StorageError::ReadFailed(e.to_string()))?;

        match serde_json::from_str(&json) {
            Ok(entries) => Ok(entries),
            Err(e) => {
                tracing::warn!("Ignoring corrupted client storage {:?}: {}", path, e);
                Ok(BTreeMap::new())
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().get(key).cloned()
    }

    pub fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.lock();
        entries.insert(key.to_string(), value.to_string());
        self.flush(&entries)
    }

    /// Remove a key. Removing a missing key is not an error.
    pub fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.lock();
        if entries.remove(key).is_none() {
            return Ok(());
        }
        self.flush(&entries)
    }

    fn flush(&self, entries: &BTreeMap<String, String>) -> Result<(), StorageError> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| StorageError::WriteFailed(e.to_string()))?;
        }

        let json = serde_json::to_string_pretty(entries)
            .map_err(|e| StorageError::WriteFailed(e.to_string()))?;

        fs::write(path, json).map_err(|e| StorageError::WriteFailed(e.to_string()))
    }
}

impl std::fmt::Debug for ClientStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Values omitted, one of them is the bearer token.
        f.debug_struct("ClientStorage")
            .field("path", &self.path)
            .field("keys", &self.entries.lock().keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_memory_roundtrip() {
        let storage = ClientStorage::in_memory();
        assert_eq!(storage.get("locale"), None);

        storage.set("locale", "en").unwrap();
        assert_eq!(storage.get("locale").as_deref(), Some("en"));

        storage.remove("locale").unwrap();
        assert_eq!(storage.get("locale"), None);
        storage.remove("locale").unwrap();
    }

    #[test]
    fn test_values_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("storage.json");

        let storage = ClientStorage::open(&path).unwrap();
        storage.set("auth_token", "abc").unwrap();
        storage.set("locale", "en").unwrap();
        drop(storage);

        let reopened = ClientStorage::open(&path).unwrap();
        assert_eq!(reopened.get("auth_token").as_deref(), Some("abc"));
        assert_eq!(reopened.get("locale").as_deref(), Some("en"));
    }

    #[test]
    fn test_corrupted_file_is_treated_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storage.json");
        fs::write(&path, "{not json").unwrap();

        let storage = ClientStorage::open(&path).unwrap();
        assert_eq!(storage.get("locale"), None);

        storage.set("locale", "rw").unwrap();
        let reopened = ClientStorage::open(&path).unwrap();
        assert_eq!(reopened.get("locale").as_deref(), Some("rw"));
    }

    #[test]
    fn test_debug_hides_values() {
        let storage = ClientStorage::in_memory();
        storage.set("auth_token", "secret-token").unwrap();
        let debug = format!("{:?}", storage);
        assert!(debug.contains("auth_token"));
        assert!(!debug.contains("secret-token"));
    }
}
