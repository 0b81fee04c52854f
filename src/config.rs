use anyhow::{Context, Result};
use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::data::Rating;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV_VAR: &str = "BOORU_PROMPTER_CONFIG";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub render: RenderConfig,
    #[serde(default)]
    pub sources: SourcesConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding saved collections and filters.
    /// Defaults to `<data_dir>/booru-prompter`, or `.` if that is unknown.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,

    #[serde(default = "default_collections_file")]
    pub collections_file: String,

    #[serde(default = "default_filters_file")]
    pub filters_file: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            collections_file: default_collections_file(),
            filters_file: default_filters_file(),
        }
    }
}

impl StorageConfig {
    pub fn resolved_data_dir(&self) -> PathBuf {
        self.data_dir
            .clone()
            .or_else(|| dirs::data_dir().map(|d| d.join("booru-prompter")))
            .unwrap_or_else(|| PathBuf::from("."))
    }

    pub fn collections_path(&self) -> PathBuf {
        self.resolved_data_dir().join(&self.collections_file)
    }

    pub fn filters_path(&self) -> PathBuf {
        self.resolved_data_dir().join(&self.filters_file)
    }
}

fn default_collections_file() -> String {
    "tag_cache.json".to_string()
}

fn default_filters_file() -> String {
    "filters.json".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Joins tags inside a slot and template fragments (default: ", ")
    #[serde(default = "default_separator")]
    pub separator: String,

    /// Prompts rendered when the caller does not ask for a count (default: 1)
    #[serde(default = "default_count")]
    pub default_count: usize,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            separator: default_separator(),
            default_count: default_count(),
        }
    }
}

fn default_separator() -> String {
    ", ".to_string()
}

fn default_count() -> usize {
    1
}

/// Per-source classification tables. A source table in the config file
/// is laid over that source's built-in defaults: nested tables merge key
/// by key, lists and scalars replace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcesConfig {
    #[serde(
        default = "FlatSourceConfig::derpibooru",
        deserialize_with = "derpibooru_overlay"
    )]
    pub derpibooru: FlatSourceConfig,

    #[serde(
        default = "StructuredSourceConfig::e621",
        deserialize_with = "e621_overlay"
    )]
    pub e621: StructuredSourceConfig,

    #[serde(
        default = "StructuredSourceConfig::danbooru",
        deserialize_with = "danbooru_overlay"
    )]
    pub danbooru: StructuredSourceConfig,
}

fn merge_tables(base: &mut toml::Value, user: toml::Value) {
    match (base, user) {
        (toml::Value::Table(base), toml::Value::Table(user)) => {
            for (key, value) in user {
                match base.get_mut(&key) {
                    Some(existing) => merge_tables(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, user) => *base = user,
    }
}

fn overlay<'de, D, T>(deserializer: D, defaults: T) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Serialize + DeserializeOwned,
{
    let user = toml::Value::deserialize(deserializer)?;
    let mut merged = toml::Value::try_from(defaults).map_err(D::Error::custom)?;
    merge_tables(&mut merged, user);
    merged.try_into().map_err(D::Error::custom)
}

fn derpibooru_overlay<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<FlatSourceConfig, D::Error> {
    overlay(deserializer, FlatSourceConfig::derpibooru())
}

fn e621_overlay<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<StructuredSourceConfig, D::Error> {
    overlay(deserializer, StructuredSourceConfig::e621())
}

fn danbooru_overlay<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<StructuredSourceConfig, D::Error> {
    overlay(deserializer, StructuredSourceConfig::danbooru())
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            derpibooru: FlatSourceConfig::derpibooru(),
            e621: StructuredSourceConfig::e621(),
            danbooru: StructuredSourceConfig::danbooru(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FlatRatings {
    /// Rating tag -> text placed in the `rating` slot.
    #[serde(default)]
    pub prompt: BTreeMap<String, String>,
    /// Rating tag -> coarse rating used for pre-filtering.
    #[serde(default)]
    pub lpp: BTreeMap<String, Rating>,
}

/// Tables for boorus whose items are a flat list of tags.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FlatSourceConfig {
    #[serde(default)]
    pub ratings: FlatRatings,
    /// Exact tags or glob patterns.
    #[serde(default)]
    pub character_tags: Vec<String>,
    #[serde(default)]
    pub species_tags: Vec<String>,
    #[serde(default)]
    pub meta_tags: Vec<String>,
    #[serde(default)]
    pub artist_prefixes: Vec<String>,
    /// Denylist in filter syntax; matching tags never reach a prompt.
    #[serde(default)]
    pub filtered_tags: Vec<String>,
    #[serde(default)]
    pub filter_ids: BTreeMap<String, u64>,
    #[serde(default)]
    pub sort_params: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StructuredRatings {
    /// Booru rating code -> text placed in the `rating` slot.
    #[serde(default)]
    pub prompt: BTreeMap<String, String>,
    /// Booru rating code -> coarse rating used for pre-filtering.
    #[serde(default)]
    pub lpp: BTreeMap<String, Rating>,
    /// Display name -> query token appended to searches.
    #[serde(default)]
    pub lookup: BTreeMap<String, String>,
}

/// Tables for boorus whose items arrive already split into categories.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StructuredSourceConfig {
    #[serde(default)]
    pub ratings: StructuredRatings,
    #[serde(default)]
    pub sort_params: BTreeMap<String, String>,
    /// Denylist grouped by booru category; flattened before use.
    #[serde(default)]
    pub filtered_tags: BTreeMap<String, Vec<String>>,
}

impl StructuredSourceConfig {
    pub fn denylist(&self) -> impl Iterator<Item = &str> + '_ {
        self.filtered_tags.values().flatten().map(String::as_str)
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn string_map(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn rating_map(pairs: &[(&str, Rating)]) -> BTreeMap<String, Rating> {
    pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
}

impl FlatSourceConfig {
    pub fn derpibooru() -> Self {
        Self {
            ratings: FlatRatings {
                prompt: string_map(&[
                    ("safe", "rating_safe"),
                    ("suggestive", "rating_questionable"),
                    ("questionable", "rating_questionable"),
                    ("explicit", "rating_explicit"),
                ]),
                lpp: rating_map(&[
                    ("safe", Rating::Safe),
                    ("suggestive", Rating::Questionable),
                    ("questionable", Rating::Questionable),
                    ("explicit", Rating::Explicit),
                ]),
            },
            character_tags: strings(&[
                "oc:*",
                "twilight sparkle",
                "rainbow dash",
                "pinkie pie",
                "fluttershy",
                "rarity",
                "applejack",
                "spike",
                "princess celestia",
                "princess luna",
                "princess cadance",
                "starlight glimmer",
                "sunset shimmer",
                "trixie",
                "derpy hooves",
                "discord",
                "apple bloom",
                "scootaloo",
                "sweetie belle",
            ]),
            species_tags: strings(&[
                "pony",
                "earth pony",
                "pegasus",
                "unicorn",
                "alicorn",
                "bat pony",
                "changeling",
                "dragon",
                "griffon",
                "hippogriff",
                "kirin",
                "zebra",
                "human",
                "anthro",
            ]),
            meta_tags: strings(&[
                "high res",
                "absurd resolution",
                "simple background",
                "transparent background",
                "white background",
                "*background",
                "animated",
                "comic",
                "screencap",
                "3d",
                "cute",
            ]),
            artist_prefixes: strings(&["artist:"]),
            filtered_tags: strings(&[
                "artist needed",
                "source needed",
                "useless source url",
                "anonymous artist",
                "derpibooru exclusive",
                "alternate version",
                "color edit",
                "edit",
                "editor:*",
                "photographer:*",
                "commissioner:*",
                "patreon*",
                "paywalled source",
                "signature",
                "watermark",
            ]),
            filter_ids: [
                ("Default (System)".to_string(), 100073),
                ("Everything (System)".to_string(), 56027),
            ]
            .into_iter()
            .collect(),
            sort_params: string_map(&[
                ("Wilson Score", "wilson_score"),
                ("Score", "score"),
                ("Upvotes", "upvotes"),
                ("Fave Count", "faves"),
                ("Upload Date", "first_seen_at"),
                ("Tag Count", "tag_count"),
            ]),
        }
    }
}

impl StructuredSourceConfig {
    pub fn e621() -> Self {
        Self {
            ratings: StructuredRatings {
                prompt: string_map(&[
                    ("s", "rating_safe"),
                    ("q", "rating_questionable"),
                    ("e", "rating_explicit"),
                ]),
                lpp: rating_map(&[
                    ("s", Rating::Safe),
                    ("q", Rating::Questionable),
                    ("e", Rating::Explicit),
                ]),
                lookup: string_map(&[
                    ("Safe", "rating:s"),
                    ("Questionable", "rating:q"),
                    ("Explicit", "rating:e"),
                ]),
            },
            sort_params: string_map(&[
                ("Score", "order:score"),
                ("Favorites", "order:favcount"),
                ("Comments", "order:comment_count"),
                ("Random", "order:random"),
            ]),
            filtered_tags: [
                (
                    "artist".to_string(),
                    strings(&[
                        "unknown_artist",
                        "anonymous_artist",
                        "conditional_dnp",
                        "sound_warning",
                        "third-party_edit",
                    ]),
                ),
                (
                    "meta".to_string(),
                    strings(&[
                        "hi_res",
                        "absurd_res",
                        "superabsurd_res",
                        "*_at_source",
                        "*_(artwork)",
                        "digital_media_*",
                        "traditional_media_*",
                        "watermark",
                        "signature",
                    ]),
                ),
            ]
            .into_iter()
            .collect(),
        }
    }

    pub fn danbooru() -> Self {
        Self {
            ratings: StructuredRatings {
                prompt: string_map(&[
                    ("g", "rating_safe"),
                    ("s", "rating_questionable"),
                    ("q", "rating_questionable"),
                    ("e", "rating_explicit"),
                ]),
                lpp: rating_map(&[
                    ("g", Rating::Safe),
                    ("s", Rating::Questionable),
                    ("q", Rating::Questionable),
                    ("e", Rating::Explicit),
                ]),
                lookup: string_map(&[
                    ("General", "rating:g"),
                    ("Sensitive", "rating:s"),
                    ("Questionable", "rating:q"),
                    ("Explicit", "rating:e"),
                ]),
            },
            sort_params: string_map(&[
                ("Score", "order:score"),
                ("Favorites", "order:favcount"),
                ("Rank", "order:rank"),
                ("Random", "order:random"),
            ]),
            filtered_tags: [
                ("artist".to_string(), strings(&["banned_artist"])),
                (
                    "meta".to_string(),
                    strings(&[
                        "highres",
                        "absurdres",
                        "lowres",
                        "commentary*",
                        "*_commentary",
                        "translated",
                        "bad_id",
                        "bad_*_id",
                        "*_request",
                    ]),
                ),
            ]
            .into_iter()
            .collect(),
        }
    }
}

impl Config {
    /// Load config from the default search paths
    pub fn load() -> Result<Self> {
        Self::load_with_path(None)
    }

    /// Load configuration from a specific path, or use default search paths
    pub fn load_with_path(path: Option<String>) -> Result<Self> {
        // Explicit paths must load; a broken explicit config is a user error
        if let Some(config_path) = path {
            debug!("Loading config from explicit path: {}", config_path);
            return Self::load_from_path(&config_path);
        }

        if let Ok(config_path) = env::var(CONFIG_ENV_VAR) {
            if !config_path.is_empty() {
                debug!("Loading config from ${}: {}", CONFIG_ENV_VAR, config_path);
                return Self::load_from_path(&config_path);
            }
        }

        if let Ok(config) = Self::load_from_path("booru-prompter.toml") {
            debug!("Loaded config from ./booru-prompter.toml");
            return Ok(config);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let config_path = config_dir.join("booru-prompter").join("config.toml");
            if let Ok(config) = Self::load_from_path(&config_path) {
                debug!("Loaded config from {:?}", config_path);
                return Ok(config);
            }
        }

        debug!("Using default config");
        Ok(Self::default())
    }

    fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(config)
    }
}
