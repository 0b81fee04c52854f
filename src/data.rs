//! Core data model: canonical tag slots, fetched tag batches, ratings and
//! the fixed set of target models.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

use crate::error::PromptError;

/// One of the six canonical tag categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Slot {
    Character,
    Species,
    Rating,
    Artist,
    General,
    Meta,
}

impl Slot {
    pub const ALL: [Slot; 6] = [
        Slot::Character,
        Slot::Species,
        Slot::Rating,
        Slot::Artist,
        Slot::General,
        Slot::Meta,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Slot::Character => "character",
            Slot::Species => "species",
            Slot::Rating => "rating",
            Slot::Artist => "artist",
            Slot::General => "general",
            Slot::Meta => "meta",
        }
    }

    /// The `{slot}` placeholder used by templates.
    pub fn token(&self) -> String {
        format!("{{{}}}", self.as_str())
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Slot {
    type Err = PromptError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Slot::ALL
            .into_iter()
            .find(|slot| slot.as_str() == s.trim().to_lowercase())
            .ok_or_else(|| PromptError::InvalidArgument(format!("unknown tag slot: {}", s)))
    }
}

/// Tags of one item partitioned into the canonical slots. Slot order is
/// the insertion order of the raw source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagGroups {
    pub character: Vec<String>,
    pub species: Vec<String>,
    pub rating: Vec<String>,
    pub artist: Vec<String>,
    pub general: Vec<String>,
    pub meta: Vec<String>,
}

impl TagGroups {
    pub fn get(&self, slot: Slot) -> &[String] {
        match slot {
            Slot::Character => &self.character,
            Slot::Species => &self.species,
            Slot::Rating => &self.rating,
            Slot::Artist => &self.artist,
            Slot::General => &self.general,
            Slot::Meta => &self.meta,
        }
    }

    pub fn get_mut(&mut self, slot: Slot) -> &mut Vec<String> {
        match slot {
            Slot::Character => &mut self.character,
            Slot::Species => &mut self.species,
            Slot::Rating => &mut self.rating,
            Slot::Artist => &mut self.artist,
            Slot::General => &mut self.general,
            Slot::Meta => &mut self.meta,
        }
    }

    pub fn push(&mut self, slot: Slot, tag: impl Into<String>) {
        self.get_mut(slot).push(tag.into());
    }

    pub fn iter(&self) -> impl Iterator<Item = (Slot, &[String])> + '_ {
        Slot::ALL.into_iter().map(move |slot| (slot, self.get(slot)))
    }

    pub fn len(&self) -> usize {
        self.iter().map(|(_, tags)| tags.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Coarse content rating used to pre-filter items before rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Rating {
    Safe,
    Questionable,
    Explicit,
    /// No rating could be determined for the item.
    Unknown,
}

impl Rating {
    /// Every rating an item can actually carry.
    pub const KNOWN: [Rating; 3] = [Rating::Safe, Rating::Questionable, Rating::Explicit];

    pub fn as_str(&self) -> &'static str {
        match self {
            Rating::Safe => "Safe",
            Rating::Questionable => "Questionable",
            Rating::Explicit => "Explicit",
            Rating::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Rating {
    type Err = PromptError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "safe" | "s" => Ok(Rating::Safe),
            "questionable" | "q" => Ok(Rating::Questionable),
            "explicit" | "e" => Ok(Rating::Explicit),
            "unknown" => Ok(Rating::Unknown),
            _ => Err(PromptError::InvalidArgument(format!("unknown rating: {}", s))),
        }
    }
}

/// Target image-generation models. Each carries one default template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Model {
    PonyDiffusion,
    EasyFluff,
    SeaArt,
    Anime,
}

impl Model {
    pub const ALL: [Model; 4] = [
        Model::PonyDiffusion,
        Model::EasyFluff,
        Model::SeaArt,
        Model::Anime,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            Model::PonyDiffusion => "pdv56",
            Model::EasyFluff => "easyfluff",
            Model::SeaArt => "seaart",
            Model::Anime => "anime",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Model::PonyDiffusion => "Pony Diffusion V5(.5)/V6",
            Model::EasyFluff => "EasyFluff",
            Model::SeaArt => "SeaArt Furry v1.0",
            Model::Anime => "Generic Anime",
        }
    }

    pub fn default_template(&self) -> &'static str {
        match self {
            Model::SeaArt => "{species}, {character}, {artist}, {general}, {meta}",
            Model::Anime => "{character}, {general}, {artist}, {meta}",
            Model::PonyDiffusion | Model::EasyFluff => {
                "{rating}, {character}, {species}, {artist}, {general}, {meta}"
            }
        }
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for Model {
    type Err = PromptError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Model::ALL
            .into_iter()
            .find(|m| m.id() == wanted || m.display_name().to_lowercase() == wanted)
            .ok_or_else(|| PromptError::InvalidArgument(format!("unknown model: {}", s)))
    }
}

/// One fetched or cached batch of results.
///
/// `raw_tags` holds source-specific payloads: a flat array of tag strings
/// or an object of booru-native categories, depending on `source`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagData {
    pub source: String,
    pub query: String,
    pub raw_tags: Vec<Value>,
    #[serde(default)]
    pub other_params: Map<String, Value>,
}

impl TagData {
    pub fn new(source: impl Into<String>, query: impl Into<String>, raw_tags: Vec<Value>) -> Self {
        Self {
            source: source.into(),
            query: query.into(),
            raw_tags,
            other_params: Map::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.raw_tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.raw_tags.is_empty()
    }

    /// Names of the filters recorded when this batch was saved.
    pub fn filter_names(&self) -> Vec<String> {
        self.other_params
            .get("filters")
            .and_then(Value::as_array)
            .map(|names| {
                names
                    .iter()
                    .filter_map(|n| n.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }
}
