//! Classifier for boorus whose items are a flat list of tag strings.

use serde_json::Value;
use std::collections::BTreeMap;

use crate::config::FlatSourceConfig;
use crate::data::{Rating, Slot, TagGroups};
use crate::error::{PromptError, Result};
use crate::filter::{CompiledFilter, Filter, TagMatcher};

#[derive(Debug, Clone)]
pub struct FlatListClassifier {
    source_name: &'static str,
    rating_prompts: BTreeMap<String, String>,
    rating_lpp: BTreeMap<String, Rating>,
    characters: TagMatcher,
    species: TagMatcher,
    meta: TagMatcher,
    artist_prefixes: Vec<String>,
    denylist: CompiledFilter,
}

impl FlatListClassifier {
    pub fn new(source_name: &'static str, config: &FlatSourceConfig) -> Self {
        Self {
            source_name,
            rating_prompts: config.ratings.prompt.clone(),
            rating_lpp: config.ratings.lpp.clone(),
            characters: TagMatcher::new(&config.character_tags),
            species: TagMatcher::new(&config.species_tags),
            meta: TagMatcher::new(&config.meta_tags),
            artist_prefixes: config.artist_prefixes.clone(),
            denylist: Filter::from_lines(&config.filtered_tags).compile(),
        }
    }

    fn tags<'a>(&self, raw: &'a Value) -> Result<Vec<&'a str>> {
        let items = raw.as_array().ok_or_else(|| {
            PromptError::malformed(self.source_name, "expected an array of tags")
        })?;
        items
            .iter()
            .map(|item| {
                item.as_str().ok_or_else(|| {
                    PromptError::malformed(self.source_name, format!("non-string tag: {}", item))
                })
            })
            .collect()
    }

    fn strip_artist_prefix<'t>(&self, tag: &'t str) -> Option<&'t str> {
        self.artist_prefixes
            .iter()
            .find_map(|prefix| tag.strip_prefix(prefix.as_str()))
    }

    /// Single pass in priority order: denylist, rating, character, species,
    /// meta, artist prefix, then general. Only the first rating tag is kept.
    pub fn classify(&self, raw: &Value) -> Result<TagGroups> {
        let mut groups = TagGroups::default();
        for raw_tag in self.tags(raw)? {
            let Some(tag) = self.denylist.apply(raw_tag) else {
                continue;
            };
            if let Some(prompt_rating) = self.rating_prompts.get(&tag) {
                if groups.rating.is_empty() {
                    groups.push(Slot::Rating, prompt_rating.as_str());
                }
                continue;
            }
            let slot = if self.characters.matches(&tag) {
                Slot::Character
            } else if self.species.matches(&tag) {
                Slot::Species
            } else if self.meta.matches(&tag) {
                Slot::Meta
            } else if let Some(artist) = self.strip_artist_prefix(&tag) {
                groups.push(Slot::Artist, artist);
                continue;
            } else {
                Slot::General
            };
            groups.push(slot, tag);
        }
        Ok(groups)
    }

    pub fn rating_of(&self, raw: &Value) -> Rating {
        raw.as_array()
            .into_iter()
            .flatten()
            .filter_map(Value::as_str)
            .find_map(|tag| self.rating_lpp.get(tag).copied())
            .unwrap_or(Rating::Unknown)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FlatRatings;
    use serde_json::json;

    fn config() -> FlatSourceConfig {
        FlatSourceConfig {
            ratings: FlatRatings {
                prompt: [
                    ("explicit".to_string(), "score_9".to_string()),
                    ("safe".to_string(), "rating_safe".to_string()),
                ]
                .into_iter()
                .collect(),
                lpp: [
                    ("explicit".to_string(), Rating::Explicit),
                    ("safe".to_string(), Rating::Safe),
                ]
                .into_iter()
                .collect(),
            },
            character_tags: vec!["oc:myoc".into(), "twilight sparkle".into()],
            species_tags: vec!["unicorn".into()],
            meta_tags: vec!["*background".into(), "high res".into()],
            artist_prefixes: vec!["artist:".into()],
            filtered_tags: vec!["edit".into(), "editor:*".into(), "solo||alone".into()],
            ..FlatSourceConfig::default()
        }
    }

    #[test]
    fn test_classify_routes_each_tag() {
        let classifier = FlatListClassifier::new("Derpibooru", &config());
        let groups = classifier
            .classify(&json!(["artist:jdoe", "explicit", "oc:myoc", "running"]))
            .unwrap();
        assert_eq!(groups.character, vec!["oc:myoc"]);
        assert_eq!(groups.rating, vec!["score_9"]);
        assert_eq!(groups.artist, vec!["jdoe"]);
        assert_eq!(groups.general, vec!["running"]);
        assert!(groups.species.is_empty());
        assert!(groups.meta.is_empty());
    }

    #[test]
    fn test_only_first_rating_is_kept() {
        let classifier = FlatListClassifier::new("Derpibooru", &config());
        let groups = classifier.classify(&json!(["safe", "explicit"])).unwrap();
        assert_eq!(groups.rating, vec!["rating_safe"]);
        assert_eq!(groups.len(), 1);
    }

    #[test]
    fn test_globs_and_denylist() {
        let classifier = FlatListClassifier::new("Derpibooru", &config());
        let groups = classifier
            .classify(&json!([
                "simple background",
                "edit",
                "editor:someone",
                "unicorn",
                "solo",
                "high res"
            ]))
            .unwrap();
        assert_eq!(groups.meta, vec!["simple background", "high res"]);
        assert_eq!(groups.species, vec!["unicorn"]);
        // Denylist substitutions rewrite instead of dropping
        assert_eq!(groups.general, vec!["alone"]);
    }

    #[test]
    fn test_empty_payload_is_empty_groups() {
        let classifier = FlatListClassifier::new("Derpibooru", &config());
        assert!(classifier.classify(&json!([])).unwrap().is_empty());
    }

    #[test]
    fn test_malformed_payload() {
        let classifier = FlatListClassifier::new("Derpibooru", &config());
        assert!(matches!(
            classifier.classify(&json!({"general": []})),
            Err(PromptError::MalformedPayload { .. })
        ));
        assert!(matches!(
            classifier.classify(&json!(["ok", 3])),
            Err(PromptError::MalformedPayload { .. })
        ));
    }

    #[test]
    fn test_rating_of() {
        let classifier = FlatListClassifier::new("Derpibooru", &config());
        assert_eq!(
            classifier.rating_of(&json!(["grass", "explicit", "safe"])),
            Rating::Explicit
        );
        assert_eq!(classifier.rating_of(&json!(["grass"])), Rating::Unknown);
        assert_eq!(classifier.rating_of(&json!({"x": 1})), Rating::Unknown);
    }
}
