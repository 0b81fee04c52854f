use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::collections::BTreeMap;

use super::structured::{compose_query, StructuredClassifier};
use super::{normalize_image_query, Formatter, PreparedQuery, QueryParam, Recipe, TagSource, Underscores};
use crate::config::StructuredSourceConfig;
use crate::data::{Model, Rating, Slot, TagGroups};
use crate::error::Result;

static IMAGE_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:https?://)?(?:danbooru\.donmai\.us/posts/)?(\d+)(\?.*)?$")
        .expect("static pattern is valid")
});

const ANIME_SLOTS: &[Slot] = &[Slot::Character, Slot::Artist, Slot::General, Slot::Meta];

// Copyright tags arrive folded into meta; there is no species category.
const OPTIONAL_CATEGORIES: &[&str] = &["species", "copyright"];

static FORMATTERS: [Formatter; 3] = [
    Formatter {
        name: "Generic Anime",
        model: Model::Anime,
        is_default: true,
        recipe: Recipe {
            slots: ANIME_SLOTS,
            artist_prefix: false,
            underscores: Underscores::Replace,
        },
    },
    Formatter {
        name: "Generic Anime (keep underscores)",
        model: Model::Anime,
        is_default: false,
        recipe: Recipe {
            slots: ANIME_SLOTS,
            artist_prefix: false,
            underscores: Underscores::Keep,
        },
    },
    Formatter {
        name: "Pony Diffusion V5(.5)/V6",
        model: Model::PonyDiffusion,
        is_default: false,
        recipe: Recipe {
            slots: &[Slot::Character, Slot::Rating, Slot::General, Slot::Meta],
            artist_prefix: false,
            underscores: Underscores::ReplaceExceptRating,
        },
    },
];

pub struct Danbooru {
    classifier: StructuredClassifier,
    rating_lookup: BTreeMap<String, String>,
    sort_params: BTreeMap<String, String>,
}

impl Danbooru {
    pub const NAME: &'static str = "Danbooru";

    pub fn new(config: &StructuredSourceConfig) -> Self {
        Self {
            classifier: StructuredClassifier::new(Self::NAME, OPTIONAL_CATEGORIES, config),
            rating_lookup: config.ratings.lookup.clone(),
            sort_params: config.sort_params.clone(),
        }
    }
}

impl TagSource for Danbooru {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn syntax_help_url(&self) -> &'static str {
        "https://danbooru.donmai.us/wiki_pages/help%3Acheatsheet"
    }

    fn query_hint(&self) -> &'static str {
        "Danbooru query or image URL"
    }

    fn classify(&self, raw: &Value) -> Result<TagGroups> {
        self.classifier.classify(raw)
    }

    fn rating_of(&self, raw: &Value) -> Rating {
        self.classifier.rating_of(raw)
    }

    fn formatters(&self) -> &'static [Formatter] {
        &FORMATTERS
    }

    fn query_params(&self) -> Vec<QueryParam> {
        vec![
            QueryParam {
                name: "rating",
                display_name: "Rating",
                options: self.rating_lookup.keys().cloned().collect(),
            },
            QueryParam {
                name: "sort_type",
                display_name: "Sort by",
                options: self.sort_params.keys().cloned().collect(),
            },
        ]
    }

    fn prepare_query(&self, query: &str, options: &BTreeMap<String, String>) -> PreparedQuery {
        let rating = options
            .get("rating")
            .and_then(|name| self.rating_lookup.get(name))
            .map(String::as_str);
        let sort = options
            .get("sort_type")
            .and_then(|name| self.sort_params.get(name))
            .map(String::as_str);
        PreparedQuery {
            query: compose_query(&normalize_image_query(query, &IMAGE_URL), rating, sort),
            params: BTreeMap::new(),
        }
    }
}
