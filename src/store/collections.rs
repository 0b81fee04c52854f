use serde_json::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::info;

use super::{JsonFileStore, KeyValueStore};
use crate::data::TagData;
use crate::error::{PromptError, Result};
use crate::filter::Filter;

fn validate_name(name: &str) -> Result<&str> {
    let name = name.trim();
    if name.is_empty() {
        return Err(PromptError::InvalidArgument(
            "name must not be empty".to_string(),
        ));
    }
    Ok(name)
}

/// Saved [`TagData`] snapshots keyed by collection name.
pub struct CollectionStore<S = JsonFileStore<TagData>> {
    backend: S,
}

impl CollectionStore {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self::new(JsonFileStore::open(path))
    }
}

impl<S: KeyValueStore<TagData>> CollectionStore<S> {
    pub fn new(backend: S) -> Self {
        Self { backend }
    }

    /// Save a copy of `data`, recording the names of the filters in use.
    /// Overwrites any collection with the same name.
    pub fn save(&mut self, name: &str, data: &TagData, filters: &[String]) -> Result<()> {
        let name = validate_name(name)?;
        let mut snapshot = data.clone();
        snapshot.other_params.insert(
            "filters".to_string(),
            Value::from(filters.to_vec()),
        );
        self.backend.set(name, snapshot)?;
        info!("Saved collection '{}' ({} items)", name, data.len());
        Ok(())
    }

    pub fn load(&self, name: &str) -> Result<TagData> {
        self.backend
            .get(name)
            .cloned()
            .ok_or_else(|| PromptError::not_found("collection", name))
    }

    pub fn delete(&mut self, name: &str) -> Result<()> {
        match self.backend.remove(name)? {
            Some(_) => {
                info!("Deleted collection '{}'", name);
                Ok(())
            }
            None => Err(PromptError::not_found("collection", name)),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.backend.contains(name)
    }

    pub fn list_names(&self) -> Vec<String> {
        self.list_names_by(|_| true)
    }

    /// Names of collections whose data satisfies `predicate`, sorted.
    pub fn list_names_by<P>(&self, predicate: P) -> Vec<String>
    where
        P: Fn(&TagData) -> bool,
    {
        self.backend
            .keys()
            .into_iter()
            .filter(|key| self.backend.get(key).is_some_and(&predicate))
            .map(str::to_string)
            .collect()
    }
}

/// Named user filters.
pub struct FilterStore<S = JsonFileStore<Filter>> {
    backend: S,
}

impl FilterStore {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self::new(JsonFileStore::open(path))
    }
}

impl<S: KeyValueStore<Filter>> FilterStore<S> {
    pub fn new(backend: S) -> Self {
        Self { backend }
    }

    pub fn save(&mut self, name: &str, filter: Filter) -> Result<()> {
        let name = validate_name(name)?;
        self.backend.set(name, filter)
    }

    pub fn load(&self, name: &str) -> Result<Filter> {
        self.backend
            .get(name)
            .cloned()
            .ok_or_else(|| PromptError::not_found("filter", name))
    }

    /// Load several filters at once, failing on the first unknown name.
    pub fn load_all<I, N>(&self, names: I) -> Result<Vec<Filter>>
    where
        I: IntoIterator<Item = N>,
        N: AsRef<str>,
    {
        names.into_iter().map(|n| self.load(n.as_ref())).collect()
    }

    pub fn delete(&mut self, name: &str) -> Result<()> {
        self.backend
            .remove(name)?
            .map(|_| ())
            .ok_or_else(|| PromptError::not_found("filter", name))
    }

    pub fn list_names(&self) -> Vec<String> {
        self.backend.keys().into_iter().map(str::to_string).collect()
    }

    /// Add filters whose names are not taken yet; existing ones are kept.
    /// Returns how many were added.
    pub fn import_filters(&mut self, filters: BTreeMap<String, Filter>) -> Result<usize> {
        let mut added = 0;
        for (name, filter) in filters {
            if name.trim().is_empty() || self.backend.contains(&name) {
                continue;
            }
            self.backend.set(&name, filter)?;
            added += 1;
        }
        if added > 0 {
            info!("Imported {} filter(s)", added);
        }
        Ok(added)
    }
}
