//! Retrieval of raw tag pages.
//!
//! Network clients live outside this crate; they implement [`TagFetcher`]
//! and hand back a fully materialised [`TagData`]. [`FileFetcher`] replays
//! a previously dumped result list from disk.

use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use tracing::debug;

use crate::data::TagData;
use crate::error::{PromptError, Result};
use crate::sources::TagSource;

pub trait TagFetcher {
    /// Fetch up to `count` raw items for `query`. Failures of the
    /// underlying transport are reported as
    /// [`PromptError::UpstreamUnavailable`].
    fn request(
        &self,
        source: &dyn TagSource,
        query: &str,
        count: usize,
        options: &BTreeMap<String, String>,
    ) -> Result<TagData>;
}

/// Reads a JSON array of raw items from a file.
#[derive(Debug, Clone)]
pub struct FileFetcher {
    path: PathBuf,
}

impl FileFetcher {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn read_items(&self) -> Result<Vec<Value>> {
        let unavailable =
            |reason: String| PromptError::UpstreamUnavailable(format!("{}: {}", self.path.display(), reason));
        let content = fs::read_to_string(&self.path).map_err(|e| unavailable(e.to_string()))?;
        serde_json::from_str(&content).map_err(|e| unavailable(e.to_string()))
    }
}

impl TagFetcher for FileFetcher {
    fn request(
        &self,
        source: &dyn TagSource,
        query: &str,
        count: usize,
        options: &BTreeMap<String, String>,
    ) -> Result<TagData> {
        let prepared = source.prepare_query(query, options);
        let mut items = self.read_items()?;
        items.truncate(count);
        debug!(
            "Read {} item(s) for {} from {}",
            items.len(),
            source.name(),
            self.path.display()
        );

        let mut other_params: Map<String, Value> = options
            .iter()
            .map(|(k, v)| (k.clone(), Value::from(v.as_str())))
            .collect();
        other_params.extend(
            prepared
                .params
                .into_iter()
                .map(|(k, v)| (k, Value::from(v))),
        );

        Ok(TagData {
            source: source.name().to_string(),
            query: prepared.query,
            raw_tags: items,
            other_params,
        })
    }
}
