//! The explicit context object every front end drives.
//!
//! [`PrompterContext`] owns the configuration, the source registry, both
//! stores and the active prompt pool. It is built once by the caller and
//! passed around; nothing here is process-global.

use rand::Rng;
use std::collections::BTreeMap;
use std::str::FromStr;
use tracing::{debug, info};

use crate::config::Config;
use crate::data::{Model, Rating, TagData};
use crate::error::{PromptError, Result};
use crate::fetch::TagFetcher;
use crate::filter::Filter;
use crate::pipeline::pool::PromptPool;
use crate::pipeline::template;
use crate::sources::{Formatter, SourceRegistry, TagSource};
use crate::store::{CollectionStore, FilterStore, JsonFileStore, KeyValueStore};

/// Parameters of one `render_prompts` call.
#[derive(Debug, Clone, Default)]
pub struct RenderRequest {
    /// Formatter name or model id; the source's default formatter when unset.
    pub model: Option<String>,
    pub template: Option<String>,
    pub count: usize,
    /// Empty means every rating is allowed.
    pub ratings: Vec<Rating>,
    /// Names of saved filters to apply.
    pub filters: Vec<String>,
    /// An unsaved filter applied after the named ones.
    pub extra_filter: Option<Filter>,
}

impl RenderRequest {
    pub fn new(count: usize) -> Self {
        Self {
            count,
            ..Self::default()
        }
    }
}

pub struct PrompterContext<C = JsonFileStore<TagData>, F = JsonFileStore<Filter>> {
    config: Config,
    registry: SourceRegistry,
    collections: CollectionStore<C>,
    filters: FilterStore<F>,
    pool: PromptPool,
}

impl PrompterContext {
    /// Build a context backed by the JSON stores named in `config`.
    pub fn from_config(config: Config) -> Self {
        let collections = JsonFileStore::open(config.storage.collections_path());
        let filters = JsonFileStore::open(config.storage.filters_path());
        Self::new(config, collections, filters)
    }
}

impl<C, F> PrompterContext<C, F>
where
    C: KeyValueStore<TagData>,
    F: KeyValueStore<Filter>,
{
    pub fn new(config: Config, collections: C, filters: F) -> Self {
        let registry = SourceRegistry::from_config(&config.sources);
        Self {
            config,
            registry,
            collections: CollectionStore::new(collections),
            filters: FilterStore::new(filters),
            pool: PromptPool::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn registry(&self) -> &SourceRegistry {
        &self.registry
    }

    pub fn collections(&self) -> &CollectionStore<C> {
        &self.collections
    }

    pub fn collections_mut(&mut self) -> &mut CollectionStore<C> {
        &mut self.collections
    }

    pub fn filters(&self) -> &FilterStore<F> {
        &self.filters
    }

    pub fn filters_mut(&mut self) -> &mut FilterStore<F> {
        &mut self.filters
    }

    pub fn pool(&self) -> &PromptPool {
        &self.pool
    }

    /// Number of raw items in the active batch.
    pub fn count(&self) -> usize {
        self.pool.count()
    }

    /// Make `data` the active batch. Its source must be registered.
    pub fn set_active(&mut self, data: TagData) -> Result<usize> {
        self.registry.get(&data.source)?;
        self.pool.set(data);
        Ok(self.pool.count())
    }

    pub fn load_collection(&mut self, name: &str) -> Result<usize> {
        let data = self.collections.load(name)?;
        info!("Loaded collection '{}'", name);
        self.set_active(data)
    }

    pub fn request<T: TagFetcher + ?Sized>(
        &mut self,
        fetcher: &T,
        source_name: &str,
        query: &str,
        count: usize,
        options: &BTreeMap<String, String>,
    ) -> Result<usize> {
        let source = self.registry.get(source_name)?;
        let data = fetcher.request(source, query, count, options)?;
        self.set_active(data)
    }

    /// Save the active batch under `name` together with the filter names
    /// the caller rendered it with.
    pub fn save_active(&mut self, name: &str, filters: &[String]) -> Result<()> {
        let data = self.pool.tag_data().ok_or(PromptError::NoDataLoaded)?;
        self.collections.save(name, data, filters)
    }

    fn active_source(&self) -> Result<&dyn TagSource> {
        let data = self.pool.tag_data().ok_or(PromptError::NoDataLoaded)?;
        self.registry.get(&data.source)
    }

    /// Pick the formatter and the model whose template is rendered. A
    /// requested model keeps its own template even when the source falls
    /// back to its default formatter.
    fn resolve_formatter(
        &self,
        source: &dyn TagSource,
        model: Option<&str>,
    ) -> Result<(&'static Formatter, Model)> {
        match model {
            Some(name) => {
                let formatter = source.resolve_formatter(name)?;
                let model = Model::from_str(name).unwrap_or(formatter.model);
                Ok((formatter, model))
            }
            None => source
                .default_formatter()
                .map(|f| (f, f.model))
                .ok_or_else(|| {
                    PromptError::InvalidArgument(format!("{} has no formatters", source.name()))
                }),
        }
    }

    pub fn render_prompts(&self, request: &RenderRequest) -> Result<Vec<String>> {
        self.render_prompts_with(request, &mut rand::rng())
    }

    /// Sample `request.count` items and render each one: classify, apply
    /// the formatter's recipe, apply user filters, escape parentheses,
    /// then substitute into the template and sanitize.
    pub fn render_prompts_with<R: Rng + ?Sized>(
        &self,
        request: &RenderRequest,
        rng: &mut R,
    ) -> Result<Vec<String>> {
        let source = self.active_source()?;
        let (formatter, model) = self.resolve_formatter(source, request.model.as_deref())?;

        let mut filters = self.filters.load_all(&request.filters)?;
        filters.extend(request.extra_filter.clone());
        let user_filter = Filter::merge(&filters).compile();

        let allowed = (!request.ratings.is_empty()).then_some(request.ratings.as_slice());
        let items = self
            .pool
            .choose_with(request.count, allowed, |item| source.rating_of(item), rng)?;
        debug!(
            "Rendering {} prompt(s) from {} with '{}'",
            items.len(),
            source.name(),
            formatter.name
        );

        let separator = self.config.render.separator.as_str();
        items
            .iter()
            .map(|item| -> Result<String> {
                let flat = source
                    .format(formatter, item)?
                    .filter_compiled(&user_filter)
                    .escape_parentheses()
                    .as_flat(separator);
                Ok(template::render(
                    &flat,
                    model.default_template(),
                    request.template.as_deref(),
                    separator,
                ))
            })
            .collect()
    }
}
