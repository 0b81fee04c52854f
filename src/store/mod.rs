//! Named persistence for collections and filters.
//!
//! Both stores sit on a small [`KeyValueStore`] seam so the rendering core
//! never depends on a file format. [`JsonFileStore`] is the durable
//! backend; [`MemoryStore`] serves tests and throwaway sessions.

mod collections;

pub use collections::{CollectionStore, FilterStore};

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::{PromptError, Result};

/// Name -> value mapping with last-write-wins semantics.
pub trait KeyValueStore<T> {
    fn get(&self, key: &str) -> Option<&T>;

    fn set(&mut self, key: &str, value: T) -> Result<()>;

    /// Returns the removed value, or `None` when the key was absent.
    fn remove(&mut self, key: &str) -> Result<Option<T>>;

    /// Keys in sorted order.
    fn keys(&self) -> Vec<&str>;

    fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }
}

#[derive(Debug, Clone)]
pub struct MemoryStore<T> {
    entries: BTreeMap<String, T>,
}

impl<T> Default for MemoryStore<T> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }
}

impl<T> MemoryStore<T> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<T> KeyValueStore<T> for MemoryStore<T> {
    fn get(&self, key: &str) -> Option<&T> {
        self.entries.get(key)
    }

    fn set(&mut self, key: &str, value: T) -> Result<()> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<Option<T>> {
        Ok(self.entries.remove(key))
    }

    fn keys(&self) -> Vec<&str> {
        self.entries.keys().map(String::as_str).collect()
    }
}

/// A JSON object on disk, cached in memory and rewritten on every change.
#[derive(Debug, Clone)]
pub struct JsonFileStore<T> {
    path: PathBuf,
    entries: BTreeMap<String, T>,
}

impl<T> JsonFileStore<T>
where
    T: Serialize + DeserializeOwned,
{
    /// Open the store, falling back to an empty one if the file is
    /// unreadable. The broken file is left alone until the next write.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match Self::load_entries(&path) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("{}; starting with an empty store", e);
                BTreeMap::new()
            }
        };
        Self { path, entries }
    }

    /// Open the store, surfacing a corrupt file as an error.
    pub fn try_open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let entries = Self::load_entries(&path)?;
        Ok(Self { path, entries })
    }

    /// Read every entry. A missing file is an empty store.
    pub fn load_entries(path: &Path) -> Result<BTreeMap<String, T>> {
        if !path.exists() {
            debug!("No store at {}, starting empty", path.display());
            return Ok(BTreeMap::new());
        }
        let content = fs::read_to_string(path).map_err(|e| PromptError::CorruptPersisted {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let entries: BTreeMap<String, T> =
            serde_json::from_str(&content).map_err(|e| PromptError::CorruptPersisted {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        debug!("Loaded {} entries from {}", entries.len(), path.display());
        Ok(entries)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(&self.entries).map_err(io::Error::other)?;
        fs::write(&self.path, content)?;
        debug!("Wrote {} entries to {}", self.entries.len(), self.path.display());
        Ok(())
    }
}

impl<T> KeyValueStore<T> for JsonFileStore<T>
where
    T: Serialize + DeserializeOwned,
{
    fn get(&self, key: &str) -> Option<&T> {
        self.entries.get(key)
    }

    fn set(&mut self, key: &str, value: T) -> Result<()> {
        self.entries.insert(key.to_string(), value);
        self.persist()
    }

    fn remove(&mut self, key: &str) -> Result<Option<T>> {
        let removed = self.entries.remove(key);
        if removed.is_some() {
            self.persist()?;
        }
        Ok(removed)
    }

    fn keys(&self) -> Vec<&str> {
        self.entries.keys().map(String::as_str).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_memory_store_last_write_wins() {
        let mut store = MemoryStore::new();
        store.set("a", 1).unwrap();
        store.set("a", 2).unwrap();
        store.set("b", 3).unwrap();
        assert_eq!(store.get("a"), Some(&2));
        assert_eq!(store.keys(), vec!["a", "b"]);
        assert_eq!(store.remove("a").unwrap(), Some(2));
        assert_eq!(store.remove("a").unwrap(), None);
    }

    #[test]
    fn test_json_store_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("store.json");
        {
            let mut store: JsonFileStore<String> = JsonFileStore::open(&path);
            store.set("greeting", "hello".to_string()).unwrap();
        }
        let store: JsonFileStore<String> = JsonFileStore::try_open(&path).unwrap();
        assert_eq!(store.get("greeting").map(String::as_str), Some("hello"));
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let store: JsonFileStore<String> =
            JsonFileStore::try_open(dir.path().join("absent.json")).unwrap();
        assert!(store.keys().is_empty());
    }

    #[test]
    fn test_corrupt_file_reports_and_falls_back() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("store.json");
        fs::write(&path, "{not json").unwrap();

        let err = JsonFileStore::<String>::try_open(&path).unwrap_err();
        assert!(matches!(err, PromptError::CorruptPersisted { .. }));

        let store = JsonFileStore::<String>::open(&path);
        assert!(store.keys().is_empty());
        // Corrupt file is untouched until the first write
        assert_eq!(fs::read_to_string(&path).unwrap(), "{not json");
    }

    #[test]
    fn test_remove_missing_key_does_not_write() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("store.json");
        let mut store: JsonFileStore<String> = JsonFileStore::open(&path);
        assert_eq!(store.remove("nothing").unwrap(), None);
        assert!(!path.exists());
    }
}
