// End-to-end tests of the tag pipeline: classify -> transform -> render
// Covers classifier totality, filter precedence/merge, template precedence

use anyhow::Result;
use booru_prompter::config::{FlatRatings, FlatSourceConfig, SourcesConfig};
use booru_prompter::data::{Rating, Slot, TagGroups};
use booru_prompter::filter::Filter;
use booru_prompter::pipeline::tags::TagPipeline;
use booru_prompter::pipeline::template::{render, sanitize};
use booru_prompter::sources::flat::FlatListClassifier;
use booru_prompter::sources::{SourceRegistry, TagSource};
use serde_json::json;
use std::collections::BTreeMap;

// ============================================================================
// Test Utilities
// ============================================================================

fn minimal_flat_config() -> FlatSourceConfig {
    FlatSourceConfig {
        ratings: FlatRatings {
            prompt: BTreeMap::from([("explicit".to_string(), "score_9".to_string())]),
            lpp: BTreeMap::from([("explicit".to_string(), Rating::Explicit)]),
        },
        character_tags: vec!["oc:myoc".to_string()],
        artist_prefixes: vec!["artist:".to_string()],
        ..FlatSourceConfig::default()
    }
}

fn all_tags(groups: &TagGroups) -> Vec<String> {
    groups
        .iter()
        .flat_map(|(_, tags)| tags.iter().cloned())
        .collect()
}

// ============================================================================
// End-to-end
// ============================================================================

#[test]
fn test_flat_item_end_to_end() -> Result<()> {
    let classifier = FlatListClassifier::new("Derpibooru", &minimal_flat_config());
    let groups = classifier.classify(&json!(["artist:jdoe", "explicit", "oc:myoc", "running"]))?;

    assert_eq!(groups.character, vec!["oc:myoc"]);
    assert_eq!(groups.rating, vec!["score_9"]);
    assert_eq!(groups.artist, vec!["jdoe"]);
    assert_eq!(groups.general, vec!["running"]);
    assert!(groups.species.is_empty());
    assert!(groups.meta.is_empty());

    let flat = TagPipeline::new(groups)
        .modify(|t| format!("by {}", t), &[Slot::Artist])
        .as_flat(", ");
    let prompt = render(
        &flat,
        "{rating}, {character}, {artist}, {general}",
        None,
        ", ",
    );
    assert_eq!(prompt, "score_9, oc:myoc, by jdoe, running");
    Ok(())
}

#[test]
fn test_every_source_through_default_formatter() -> Result<()> {
    let registry = SourceRegistry::from_config(&SourcesConfig::default());
    let items = [
        ("Derpibooru", json!(["safe", "artist:a", "rarity", "unicorn", "gem"])),
        (
            "E621",
            json!({"character": ["c"], "species": ["s"], "artist": ["a"],
                   "general": ["g"], "copyright": [], "meta": [], "rating": "s"}),
        ),
        (
            "Danbooru",
            json!({"character": ["c"], "artist": ["a"], "general": ["g"],
                   "meta": [], "rating": "g"}),
        ),
    ];
    for (name, item) in items {
        let source = registry.get(name)?;
        let formatter = source.default_formatter().expect("every source has a default");
        let flat = source.format(formatter, &item)?.as_flat(", ");
        let prompt = render(&flat, formatter.default_template(), None, ", ");
        assert!(!prompt.is_empty(), "{} rendered nothing", name);
        assert!(!prompt.starts_with(','), "{}: {}", name, prompt);
        assert!(!prompt.ends_with(' '), "{}: {}", name, prompt);
    }
    Ok(())
}

// ============================================================================
// Classifier totality
// ============================================================================

#[test]
fn test_flat_classifier_totality_with_denylist() -> Result<()> {
    let config = SourcesConfig::default().derpibooru;
    let classifier = FlatListClassifier::new("Derpibooru", &config);
    let raw = vec![
        "twilight sparkle",
        "unicorn",
        "book",
        "reading",
        "simple background",
        "artist:somepony",
        "watermark",
        "editor:someone",
        "safe",
    ];
    let groups = classifier.classify(&json!(raw))?;
    let mut got = all_tags(&groups);
    got.sort();

    let mut expected = vec![
        "twilight sparkle".to_string(),
        "unicorn".to_string(),
        "book".to_string(),
        "reading".to_string(),
        "simple background".to_string(),
        "somepony".to_string(),
        "rating_safe".to_string(),
    ];
    expected.sort();
    assert_eq!(got, expected);
    Ok(())
}

#[test]
fn test_structured_classifier_totality() -> Result<()> {
    let registry = SourceRegistry::from_config(&SourcesConfig::default());
    let e621 = registry.get("E621")?;
    let groups = e621.classify(&json!({
        "character": ["a"],
        "species": ["b"],
        "artist": ["c", "unknown_artist"],
        "general": ["d", "e"],
        "copyright": ["f"],
        "meta": ["g", "hi_res"],
        "rating": "q"
    }))?;
    let mut got = all_tags(&groups);
    got.sort();
    assert_eq!(got, vec!["a", "b", "c", "d", "e", "f", "g", "rating_questionable"]);
    assert_eq!(groups.meta, vec!["f", "g"]);
    Ok(())
}

// ============================================================================
// Filters
// ============================================================================

#[test]
fn test_substitution_beats_drop() {
    let filter = Filter::merge(&[
        Filter::parse("*_fur", None),
        Filter::parse("blue_fur||blue fur", None),
    ]);
    let groups = TagPipeline::new(TagGroups {
        general: vec!["blue_fur".into(), "red_fur".into()],
        ..TagGroups::default()
    })
    .filter([&filter])
    .as_groups();
    assert_eq!(groups.general, vec!["blue fur"]);
}

#[test]
fn test_merge_drop_set_commutes_substitutions_right_biased() {
    let a = Filter::parse("x||from_a\nalpha\n*_res", None);
    let b = Filter::parse("x||from_b\nbeta", None);
    let ab = Filter::merge([&a, &b]);
    let ba = Filter::merge([&b, &a]);

    for tag in ["alpha", "beta", "hi_res", "gamma"] {
        assert_eq!(ab.matches(tag), ba.matches(tag), "{}", tag);
    }
    assert_eq!(ab.substitution_for("x"), Some("from_b"));
    assert_eq!(ba.substitution_for("x"), Some("from_a"));
}

#[test]
fn test_filter_text_round_trip() {
    let text = "female||mare\n*_(artwork)||\nsolo\n[a-c]at\nhigh res";
    let filter = Filter::parse(text, None);
    assert_eq!(Filter::parse(&filter.to_string(), None), filter);
    assert_eq!(filter.substitution_for("digital_(artwork)"), Some(""));
    assert_eq!(filter.substitution_for("solo"), None);
    assert!(filter.matches("bat"));
    assert!(!filter.matches("Bat"));
}

// ============================================================================
// Template precedence and sanitization
// ============================================================================

#[test]
fn test_template_precedence_cases() {
    let flat: BTreeMap<Slot, String> = Slot::ALL
        .into_iter()
        .map(|s| {
            let text = match s {
                Slot::Character => "c1",
                Slot::General => "g1",
                _ => "",
            };
            (s, text.to_string())
        })
        .collect();
    let default = "{character}, {general}";

    assert_eq!(render(&flat, default, None, ", "), "c1, g1");
    assert_eq!(
        render(&flat, default, Some("{prompt}, masterpiece"), ", "),
        "c1, g1, masterpiece"
    );
    assert_eq!(render(&flat, default, Some("{character} only"), ", "), "c1 only");
    assert_eq!(
        render(&flat, default, Some("masterpiece"), ", "),
        "c1, g1, masterpiece"
    );
}

#[test]
fn test_sanitize_idempotent_over_generated_inputs() {
    let pieces = ["", " ", ",", ", ", "a", "b c", "  ", ",,", " , "];
    for x in pieces {
        for y in pieces {
            for z in pieces {
                let input = format!("{}{}{}{}", x, y, z, x);
                let once = sanitize(&input, ", ");
                assert_eq!(sanitize(&once, ", "), once, "input: {:?}", input);
            }
        }
    }
}
