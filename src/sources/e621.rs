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
    Regex::new(r"^(?:https?://)?(?:e621\.net/posts/)?(\d+)(\?.*)?$")
        .expect("static pattern is valid")
});

static FORMATTERS: [Formatter; 4] = [
    Formatter {
        name: "Pony Diffusion V5(.5)/V6",
        model: Model::PonyDiffusion,
        is_default: false,
        recipe: Recipe {
            slots: &[
                Slot::Character,
                Slot::Rating,
                Slot::Species,
                Slot::General,
                Slot::Meta,
            ],
            artist_prefix: false,
            underscores: Underscores::ReplaceExceptRating,
        },
    },
    Formatter {
        name: "EasyFluff",
        model: Model::EasyFluff,
        is_default: true,
        recipe: Recipe {
            slots: &[
                Slot::Character,
                Slot::Species,
                Slot::Artist,
                Slot::General,
                Slot::Meta,
            ],
            artist_prefix: true,
            underscores: Underscores::Replace,
        },
    },
    Formatter {
        name: "EasyFluff (no artist names)",
        model: Model::EasyFluff,
        is_default: false,
        recipe: Recipe {
            slots: &[Slot::Character, Slot::Species, Slot::General, Slot::Meta],
            artist_prefix: false,
            underscores: Underscores::Replace,
        },
    },
    Formatter {
        name: "SeaArt Furry v1.0",
        model: Model::SeaArt,
        is_default: false,
        recipe: Recipe {
            slots: &[
                Slot::Character,
                Slot::Species,
                Slot::General,
                Slot::Artist,
                Slot::Meta,
            ],
            artist_prefix: false,
            underscores: Underscores::Keep,
        },
    },
];

pub struct E621 {
    classifier: StructuredClassifier,
    rating_lookup: BTreeMap<String, String>,
    sort_params: BTreeMap<String, String>,
}

impl E621 {
    pub const NAME: &'static str = "E621";

    pub fn new(config: &StructuredSourceConfig) -> Self {
        Self {
            classifier: StructuredClassifier::new(Self::NAME, &[], config),
            rating_lookup: config.ratings.lookup.clone(),
            sort_params: config.sort_params.clone(),
        }
    }
}

impl TagSource for E621 {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn syntax_help_url(&self) -> &'static str {
        "https://e621.net/help/cheatsheet"
    }

    fn query_hint(&self) -> &'static str {
        "E621 query or image URL"
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
            .and_then(|name| self.rating_lookup.get(name));
        let sort = options
            .get("sort_type")
            .and_then(|name| self.sort_params.get(name));
        PreparedQuery {
            query: compose_query(
                &normalize_image_query(query, &IMAGE_URL),
                rating.map(String::as_str),
                sort.map(String::as_str),
            ),
            params: BTreeMap::new(),
        }
    }
}
