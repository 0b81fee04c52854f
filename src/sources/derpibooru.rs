use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::collections::BTreeMap;

use super::flat::FlatListClassifier;
use super::{normalize_image_query, Formatter, PreparedQuery, QueryParam, Recipe, TagSource, Underscores};
use crate::config::FlatSourceConfig;
use crate::data::{Model, Rating, Slot, TagGroups};
use crate::error::Result;

static IMAGE_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:https?://)?(?:derpibooru\.org/images/)?(\d+)(\?.*)?$")
        .expect("static pattern is valid")
});

const EASYFLUFF_SLOTS: &[Slot] = &[
    Slot::Character,
    Slot::Species,
    Slot::Artist,
    Slot::General,
    Slot::Meta,
];

// Derpibooru tags already use spaces, so no underscore handling.
static FORMATTERS: [Formatter; 3] = [
    Formatter {
        name: "Pony Diffusion V5(.5)/V6",
        model: Model::PonyDiffusion,
        is_default: true,
        recipe: Recipe {
            slots: &[
                Slot::Character,
                Slot::Species,
                Slot::Rating,
                Slot::General,
                Slot::Meta,
            ],
            artist_prefix: false,
            underscores: Underscores::Keep,
        },
    },
    Formatter {
        name: "EasyFluff",
        model: Model::EasyFluff,
        is_default: false,
        recipe: Recipe {
            slots: EASYFLUFF_SLOTS,
            artist_prefix: true,
            underscores: Underscores::Keep,
        },
    },
    Formatter {
        name: "EasyFluff (no artist names)",
        model: Model::EasyFluff,
        is_default: false,
        recipe: Recipe {
            slots: &[Slot::Character, Slot::Species, Slot::General, Slot::Meta],
            artist_prefix: false,
            underscores: Underscores::Keep,
        },
    },
];

pub struct Derpibooru {
    classifier: FlatListClassifier,
    filter_ids: BTreeMap<String, u64>,
    sort_params: BTreeMap<String, String>,
}

impl Derpibooru {
    pub const NAME: &'static str = "Derpibooru";

    pub fn new(config: &FlatSourceConfig) -> Self {
        Self {
            classifier: FlatListClassifier::new(Self::NAME, config),
            filter_ids: config.filter_ids.clone(),
            sort_params: config.sort_params.clone(),
        }
    }
}

impl TagSource for Derpibooru {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn syntax_help_url(&self) -> &'static str {
        "https://derpibooru.org/pages/search_syntax"
    }

    fn query_hint(&self) -> &'static str {
        "Derpibooru query or image URL"
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
                name: "filter_type",
                display_name: "Derpibooru Filter",
                options: self.filter_ids.keys().cloned().collect(),
            },
            QueryParam {
                name: "sort_type",
                display_name: "Sort by",
                options: self.sort_params.keys().cloned().collect(),
            },
        ]
    }

    /// Filter and sort choices become `filter_id` and `sf` request
    /// parameters; unknown option names are ignored.
    fn prepare_query(&self, query: &str, options: &BTreeMap<String, String>) -> PreparedQuery {
        let mut params = BTreeMap::new();
        if let Some(id) = options
            .get("filter_type")
            .and_then(|name| self.filter_ids.get(name))
        {
            params.insert("filter_id".to_string(), id.to_string());
        }
        if let Some(field) = options
            .get("sort_type")
            .and_then(|name| self.sort_params.get(name))
        {
            params.insert("sf".to_string(), field.clone());
        }
        PreparedQuery {
            query: normalize_image_query(query, &IMAGE_URL),
            params,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn source() -> Derpibooru {
        Derpibooru::new(&FlatSourceConfig::derpibooru())
    }

    #[test]
    fn test_default_tables_classify_real_tags() {
        let groups = source()
            .classify(&json!([
                "safe",
                "artist:somepony",
                "twilight sparkle",
                "unicorn",
                "book",
                "simple background",
                "edit"
            ]))
            .unwrap();
        assert_eq!(groups.rating, vec!["rating_safe"]);
        assert_eq!(groups.artist, vec!["somepony"]);
        assert_eq!(groups.character, vec!["twilight sparkle"]);
        assert_eq!(groups.species, vec!["unicorn"]);
        assert_eq!(groups.general, vec!["book"]);
        assert_eq!(groups.meta, vec!["simple background"]);
    }

    #[test]
    fn test_suggestive_counts_as_questionable() {
        assert_eq!(
            source().rating_of(&json!(["suggestive", "solo"])),
            Rating::Questionable
        );
    }

    #[test]
    fn test_prepare_query_maps_options() {
        let options: BTreeMap<String, String> = [
            ("filter_type".to_string(), "Everything (System)".to_string()),
            ("sort_type".to_string(), "Score".to_string()),
        ]
        .into_iter()
        .collect();
        let prepared = source().prepare_query("https://derpibooru.org/images/1234", &options);
        assert_eq!(prepared.query, "id:1234");
        assert_eq!(prepared.params["filter_id"], "56027");
        assert_eq!(prepared.params["sf"], "score");
    }

    #[test]
    fn test_prepare_query_ignores_unknown_options() {
        let options: BTreeMap<String, String> =
            [("filter_type".to_string(), "Nope".to_string())].into_iter().collect();
        let prepared = source().prepare_query("pony, solo", &options);
        assert_eq!(prepared.query, "pony, solo");
        assert!(prepared.params.is_empty());
    }

    #[test]
    fn test_query_params_list_config_options() {
        let params = source().query_params();
        assert_eq!(params[0].name, "filter_type");
        assert!(params[0].options.contains(&"Default (System)".to_string()));
        assert!(params[1].options.contains(&"Wilson Score".to_string()));
    }
}
