//! Classifier for boorus whose items arrive already split into
//! booru-native categories (`character`, `general`, `copyright`, ...).

use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::config::StructuredSourceConfig;
use crate::data::{Rating, Slot, TagGroups};
use crate::error::{PromptError, Result};
use crate::filter::{CompiledFilter, Filter};

/// Booru category -> slot. `copyright` lands in `meta` ahead of `meta`.
const CATEGORY_SLOTS: [(&str, Slot); 6] = [
    ("character", Slot::Character),
    ("species", Slot::Species),
    ("artist", Slot::Artist),
    ("general", Slot::General),
    ("copyright", Slot::Meta),
    ("meta", Slot::Meta),
];

#[derive(Debug, Clone)]
pub struct StructuredClassifier {
    source_name: &'static str,
    /// Categories this booru may omit; every other one must be present.
    optional: &'static [&'static str],
    rating_prompts: BTreeMap<String, String>,
    rating_lpp: BTreeMap<String, Rating>,
    denylist: CompiledFilter,
}

impl StructuredClassifier {
    pub fn new(
        source_name: &'static str,
        optional: &'static [&'static str],
        config: &StructuredSourceConfig,
    ) -> Self {
        Self {
            source_name,
            optional,
            rating_prompts: config.ratings.prompt.clone(),
            rating_lpp: config.ratings.lpp.clone(),
            denylist: Filter::from_lines(config.denylist()).compile(),
        }
    }

    fn object<'a>(&self, raw: &'a Value) -> Result<&'a Map<String, Value>> {
        raw.as_object()
            .ok_or_else(|| PromptError::malformed(self.source_name, "expected an object"))
    }

    fn category<'a>(
        &self,
        item: &'a Map<String, Value>,
        key: &str,
    ) -> Result<Vec<&'a str>> {
        let Some(value) = item.get(key) else {
            if !self.optional.contains(&key) {
                return Err(PromptError::malformed(
                    self.source_name,
                    format!("missing '{}'", key),
                ));
            }
            return Ok(Vec::new());
        };
        let tags = value.as_array().ok_or_else(|| {
            PromptError::malformed(self.source_name, format!("'{}' is not a list", key))
        })?;
        tags.iter()
            .map(|t| {
                t.as_str().ok_or_else(|| {
                    PromptError::malformed(self.source_name, format!("non-string tag in '{}'", key))
                })
            })
            .collect()
    }

    /// Remap booru categories onto slots, dropping denylisted tags. The
    /// rating code becomes a one-element `rating` slot.
    pub fn classify(&self, raw: &Value) -> Result<TagGroups> {
        let item = self.object(raw)?;
        let rating = item
            .get("rating")
            .and_then(Value::as_str)
            .ok_or_else(|| PromptError::malformed(self.source_name, "missing 'rating'"))?;

        let mut groups = TagGroups::default();
        for (key, slot) in CATEGORY_SLOTS {
            for tag in self.category(item, key)? {
                if let Some(kept) = self.denylist.apply(tag) {
                    groups.push(slot, kept);
                }
            }
        }
        let prompt_rating = self
            .rating_prompts
            .get(rating)
            .map(String::as_str)
            .unwrap_or(rating);
        groups.push(Slot::Rating, prompt_rating);
        Ok(groups)
    }

    pub fn rating_of(&self, raw: &Value) -> Rating {
        raw.get("rating")
            .and_then(Value::as_str)
            .and_then(|code| self.rating_lpp.get(code).copied())
            .unwrap_or(Rating::Unknown)
    }
}

/// Join a search query with the optional rating and sort tokens.
pub fn compose_query(query: &str, rating: Option<&str>, sort: Option<&str>) -> String {
    [Some(query), rating, sort]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn classifier() -> StructuredClassifier {
        StructuredClassifier::new("E621", &[], &StructuredSourceConfig::e621())
    }

    fn lenient_classifier() -> StructuredClassifier {
        StructuredClassifier::new(
            "Danbooru",
            &["species", "copyright"],
            &StructuredSourceConfig::danbooru(),
        )
    }

    fn item() -> Value {
        json!({
            "character": ["krystal"],
            "species": ["fox", "canine"],
            "artist": ["jdoe", "conditional_dnp"],
            "general": ["solo", "blue_fur"],
            "copyright": ["star_fox"],
            "meta": ["hi_res", "digital_media_(artwork)"],
            "rating": "s"
        })
    }

    #[test]
    fn test_classify_remaps_categories() {
        let groups = classifier().classify(&item()).unwrap();
        assert_eq!(groups.character, vec!["krystal"]);
        assert_eq!(groups.species, vec!["fox", "canine"]);
        assert_eq!(groups.artist, vec!["jdoe"]);
        assert_eq!(groups.general, vec!["solo", "blue_fur"]);
        assert_eq!(groups.meta, vec!["star_fox"]);
        assert_eq!(groups.rating, vec!["rating_safe"]);
    }

    #[test]
    fn test_optional_categories_default_to_empty() {
        let groups = lenient_classifier()
            .classify(&json!({
                "character": [],
                "artist": [],
                "general": ["solo"],
                "meta": [],
                "rating": "x"
            }))
            .unwrap();
        assert!(groups.species.is_empty());
        assert_eq!(groups.general, vec!["solo"]);
        // Unmapped codes pass through
        assert_eq!(groups.rating, vec!["x"]);
    }

    #[test]
    fn test_missing_required_key_is_malformed() {
        let mut raw = item();
        raw.as_object_mut().unwrap().remove("general");
        let err = classifier().classify(&raw).unwrap_err();
        assert!(matches!(err, PromptError::MalformedPayload { .. }));
        assert!(err.to_string().contains("general"));

        assert!(classifier().classify(&json!(["flat", "list"])).is_err());
        assert!(classifier().classify(&json!({"general": "solo"})).is_err());
    }

    #[test]
    fn test_categories_are_required_unless_declared_optional() {
        let sparse = json!({
            "character": [],
            "artist": [],
            "general": ["g"],
            "meta": [],
            "rating": "s"
        });
        let err = classifier().classify(&sparse).unwrap_err();
        assert!(matches!(err, PromptError::MalformedPayload { .. }));
        assert!(err.to_string().contains("species"));

        let mut no_copyright = item();
        no_copyright.as_object_mut().unwrap().remove("copyright");
        assert!(classifier().classify(&no_copyright).is_err());

        let groups = lenient_classifier().classify(&sparse).unwrap();
        assert_eq!(groups.general, vec!["g"]);
    }

    #[test]
    fn test_rating_of() {
        assert_eq!(classifier().rating_of(&item()), Rating::Safe);
        assert_eq!(classifier().rating_of(&json!({"rating": "z"})), Rating::Unknown);
        assert_eq!(classifier().rating_of(&json!([])), Rating::Unknown);
    }

    #[test]
    fn test_compose_query() {
        assert_eq!(
            compose_query("wolf", Some("rating:s"), Some("order:score")),
            "wolf rating:s order:score"
        );
        assert_eq!(compose_query(" wolf ", None, None), "wolf");
        assert_eq!(compose_query("", Some("rating:e"), None), "rating:e");
    }
}
