use rand::seq::IndexedRandom;
use rand::Rng;
use serde_json::Value;
use tracing::debug;

use crate::data::{Rating, TagData};
use crate::error::{PromptError, Result};

/// Holds the currently active [`TagData`] and samples items from it.
#[derive(Debug, Clone, Default)]
pub struct PromptPool {
    tag_data: Option<TagData>,
}

impl PromptPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_data(tag_data: TagData) -> Self {
        Self {
            tag_data: Some(tag_data),
        }
    }

    /// Replace the active batch as a whole.
    pub fn set(&mut self, tag_data: TagData) {
        debug!(
            "Activating {} item(s) from {} (query: {})",
            tag_data.len(),
            tag_data.source,
            tag_data.query
        );
        self.tag_data = Some(tag_data);
    }

    pub fn clear(&mut self) {
        self.tag_data = None;
    }

    pub fn tag_data(&self) -> Option<&TagData> {
        self.tag_data.as_ref()
    }

    pub fn is_loaded(&self) -> bool {
        self.tag_data.is_some()
    }

    pub fn count(&self) -> usize {
        self.tag_data.as_ref().map(TagData::len).unwrap_or(0)
    }

    pub fn choose<F>(&self, n: usize, allowed_ratings: Option<&[Rating]>, rating_of: F) -> Result<Vec<Value>>
    where
        F: Fn(&Value) -> Rating,
    {
        self.choose_with(n, allowed_ratings, rating_of, &mut rand::rng())
    }

    /// Draw `n` items uniformly with replacement, optionally restricted to
    /// `allowed_ratings`. Asking for more items than are loaded yields
    /// repeats rather than an error.
    pub fn choose_with<F, R>(
        &self,
        n: usize,
        allowed_ratings: Option<&[Rating]>,
        rating_of: F,
        rng: &mut R,
    ) -> Result<Vec<Value>>
    where
        F: Fn(&Value) -> Rating,
        R: Rng + ?Sized,
    {
        let tag_data = self.tag_data.as_ref().ok_or(PromptError::NoDataLoaded)?;

        let mut candidates: Vec<&Value> = tag_data.raw_tags.iter().collect();
        if let Some(allowed) = allowed_ratings.filter(|a| restricts(a)) {
            candidates.retain(|item| allowed.contains(&rating_of(item)));
            debug!(
                "Rating filter kept {} of {} item(s)",
                candidates.len(),
                tag_data.len()
            );
            if candidates.is_empty() {
                let names: Vec<&str> = allowed.iter().map(Rating::as_str).collect();
                return Err(PromptError::InvalidArgument(format!(
                    "current collection has no prompts with selected rating(s): {}",
                    names.join(", ")
                )));
            }
        }
        if candidates.is_empty() {
            return Err(PromptError::InvalidArgument(
                "current collection is empty".to_string(),
            ));
        }

        Ok((0..n)
            .filter_map(|_| candidates.choose(rng))
            .map(|item| (*item).clone())
            .collect())
    }
}

/// True when `allowed` names a strict, non-empty subset of the known ratings.
fn restricts(allowed: &[Rating]) -> bool {
    !allowed.is_empty() && !Rating::KNOWN.iter().all(|r| allowed.contains(r))
}
