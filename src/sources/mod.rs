//! Booru tag sources.
//!
//! Each source classifies its own raw item shape into [`TagGroups`],
//! derives a coarse [`Rating`] for pre-filtering, and registers a static
//! table of [`Formatter`]s describing how each target model wants the
//! classified tags shaped. Sources are registered explicitly in
//! [`SourceRegistry::from_config`].

pub mod danbooru;
pub mod derpibooru;
pub mod e621;
pub mod flat;
pub mod structured;

use regex::Regex;
use serde_json::Value;
use std::collections::BTreeMap;
use std::str::FromStr;

use crate::config::SourcesConfig;
use crate::data::{Model, Rating, Slot, TagGroups};
use crate::error::{PromptError, Result};
use crate::pipeline::tags::TagPipeline;

pub use danbooru::Danbooru;
pub use derpibooru::Derpibooru;
pub use e621::E621;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Underscores {
    Keep,
    Replace,
    ReplaceExceptRating,
}

/// Pipeline steps a formatter runs over freshly classified tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Recipe {
    pub slots: &'static [Slot],
    /// Prefix artist tags with "by ".
    pub artist_prefix: bool,
    pub underscores: Underscores,
}

impl Recipe {
    pub fn apply(&self, groups: TagGroups) -> TagPipeline {
        let mut pipeline = TagPipeline::new(groups).select(self.slots);
        if self.artist_prefix {
            pipeline = pipeline.modify(|t| format!("by {}", t), &[Slot::Artist]);
        }
        match self.underscores {
            Underscores::Keep => pipeline,
            Underscores::Replace => pipeline.replace_underscores(true, &[]),
            Underscores::ReplaceExceptRating => pipeline.replace_underscores(true, &[Slot::Rating]),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Formatter {
    pub name: &'static str,
    pub model: Model,
    pub is_default: bool,
    pub recipe: Recipe,
}

impl Formatter {
    pub fn default_template(&self) -> &'static str {
        self.model.default_template()
    }
}

/// An extra request parameter a source understands, for UIs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryParam {
    pub name: &'static str,
    pub display_name: &'static str,
    pub options: Vec<String>,
}

/// A search query rewritten for a booru, plus any request parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreparedQuery {
    pub query: String,
    pub params: BTreeMap<String, String>,
}

pub trait TagSource: Send + Sync {
    fn name(&self) -> &'static str;

    fn syntax_help_url(&self) -> &'static str;

    fn query_hint(&self) -> &'static str;

    /// Partition one raw item into canonical slots. Denylisted tags are
    /// dropped here.
    fn classify(&self, raw: &Value) -> Result<TagGroups>;

    /// Coarse rating of one raw item; never fails.
    fn rating_of(&self, raw: &Value) -> Rating;

    fn formatters(&self) -> &'static [Formatter];

    fn query_params(&self) -> Vec<QueryParam>;

    fn prepare_query(&self, query: &str, options: &BTreeMap<String, String>) -> PreparedQuery;

    fn default_formatter(&self) -> Option<&'static Formatter> {
        let formatters = self.formatters();
        formatters
            .iter()
            .find(|f| f.is_default)
            .or_else(|| formatters.first())
    }

    fn supported_models(&self) -> Vec<&'static str> {
        self.formatters().iter().map(|f| f.name).collect()
    }

    /// Look a formatter up by name. A known model this source has no
    /// formatter for falls back to the default formatter.
    fn resolve_formatter(&self, name: &str) -> Result<&'static Formatter> {
        let wanted = name.trim();
        if let Some(f) = self
            .formatters()
            .iter()
            .find(|f| f.name.eq_ignore_ascii_case(wanted))
        {
            return Ok(f);
        }
        let model = Model::from_str(wanted)?;
        self.formatters()
            .iter()
            .find(|f| f.model == model && f.name == model.display_name())
            .or_else(|| self.default_formatter())
            .ok_or_else(|| {
                PromptError::InvalidArgument(format!("{} has no formatters", self.name()))
            })
    }

    fn format(&self, formatter: &Formatter, raw: &Value) -> Result<TagPipeline> {
        Ok(formatter.recipe.apply(self.classify(raw)?))
    }
}

/// Rewrite an image URL or bare id into an `id:<n>` search.
pub(crate) fn normalize_image_query(query: &str, image_url: &Regex) -> String {
    let trimmed = query.trim();
    match image_url.captures(trimmed).and_then(|c| c.get(1)) {
        Some(id) => format!("id:{}", id.as_str()),
        None => trimmed.to_string(),
    }
}

/// Static table of available sources, keyed by name.
pub struct SourceRegistry {
    sources: Vec<Box<dyn TagSource>>,
}

impl SourceRegistry {
    pub fn from_config(config: &SourcesConfig) -> Self {
        let sources: Vec<Box<dyn TagSource>> = vec![
            Box::new(Derpibooru::new(&config.derpibooru)),
            Box::new(E621::new(&config.e621)),
            Box::new(Danbooru::new(&config.danbooru)),
        ];
        Self::new(sources)
    }

    pub fn new(sources: Vec<Box<dyn TagSource>>) -> Self {
        Self { sources }
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.sources.iter().map(|s| s.name()).collect()
    }

    pub fn get(&self, name: &str) -> Result<&dyn TagSource> {
        self.sources
            .iter()
            .find(|s| s.name().eq_ignore_ascii_case(name.trim()))
            .map(|s| s.as_ref())
            .ok_or_else(|| PromptError::not_found("source", name))
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn TagSource> + '_ {
        self.sources.iter().map(|s| s.as_ref())
    }
}
