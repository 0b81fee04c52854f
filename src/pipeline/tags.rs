//! Fluent transformation chain over classified tags.
//!
//! Every step consumes the pipeline and returns a new one. Steps never
//! reorder tags inside a slot and never move a tag to another slot.

use std::collections::BTreeMap;

use crate::data::{Slot, TagGroups};
use crate::filter::{CompiledFilter, Filter};

/// Slot name -> joined tag string, ready for template substitution.
pub type FlatGroups = BTreeMap<Slot, String>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagPipeline {
    groups: TagGroups,
}

impl From<TagGroups> for TagPipeline {
    fn from(groups: TagGroups) -> Self {
        Self::new(groups)
    }
}

impl TagPipeline {
    pub fn new(groups: TagGroups) -> Self {
        Self { groups }
    }

    /// Empty every slot not listed.
    pub fn select(mut self, slots: &[Slot]) -> Self {
        for slot in Slot::ALL {
            if !slots.contains(&slot) {
                self.groups.get_mut(slot).clear();
            }
        }
        self
    }

    /// Apply `modifier` to every tag of the listed slots (all slots when
    /// `slots` is empty).
    pub fn modify<F>(mut self, modifier: F, slots: &[Slot]) -> Self
    where
        F: Fn(&str) -> String,
    {
        let targets: &[Slot] = if slots.is_empty() { &Slot::ALL } else { slots };
        for slot in targets {
            let tags = self.groups.get_mut(*slot);
            *tags = tags.iter().map(|t| modifier(t)).collect();
        }
        self
    }

    pub fn replace_underscores(self, enabled: bool, exclude: &[Slot]) -> Self {
        if !enabled {
            return self;
        }
        let targets: Vec<Slot> = Slot::ALL
            .into_iter()
            .filter(|s| !exclude.contains(s))
            .collect();
        if targets.is_empty() {
            return self;
        }
        self.modify(|t| t.replace('_', " "), &targets)
    }

    /// Escape `(` and `)`; prompt syntaxes use bare parentheses for weighting.
    pub fn escape_parentheses(self) -> Self {
        self.modify(|t| t.replace('(', "\\(").replace(')', "\\)"), &[])
    }

    /// Merge `filters` and apply them to every slot. No filters is a no-op.
    pub fn filter<'a, I>(self, filters: I) -> Self
    where
        I: IntoIterator<Item = &'a Filter>,
    {
        let merged = Filter::merge(filters);
        if merged.is_empty() {
            return self;
        }
        self.filter_compiled(&merged.compile())
    }

    pub fn filter_compiled(mut self, filter: &CompiledFilter) -> Self {
        for slot in Slot::ALL {
            let tags = self.groups.get_mut(slot);
            *tags = tags.iter().filter_map(|t| filter.apply(t)).collect();
        }
        self
    }

    pub fn groups(&self) -> &TagGroups {
        &self.groups
    }

    pub fn as_groups(self) -> TagGroups {
        self.groups
    }

    pub fn as_flat(&self, separator: &str) -> FlatGroups {
        self.groups
            .iter()
            .map(|(slot, tags)| (slot, tags.join(separator)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> TagGroups {
        TagGroups {
            character: vec!["twilight_sparkle".into(), "oc:my_oc".into()],
            species: vec!["unicorn".into()],
            rating: vec!["rating_safe".into()],
            artist: vec!["jdoe".into()],
            general: vec!["solo".into(), "hat_(clothing)".into(), "grass".into()],
            meta: vec!["high_res".into()],
        }
    }

    #[test]
    fn test_select_zeroes_other_slots() {
        let groups = TagPipeline::new(sample())
            .select(&[Slot::Character, Slot::General])
            .as_groups();
        assert_eq!(groups.character.len(), 2);
        assert_eq!(groups.general.len(), 3);
        assert!(groups.species.is_empty());
        assert!(groups.rating.is_empty());
        assert!(groups.artist.is_empty());
        assert!(groups.meta.is_empty());
    }

    #[test]
    fn test_modify_named_slot_only() {
        let groups = TagPipeline::new(sample())
            .modify(|t| format!("by {}", t), &[Slot::Artist])
            .as_groups();
        assert_eq!(groups.artist, vec!["by jdoe"]);
        assert_eq!(groups.species, vec!["unicorn"]);
    }

    #[test]
    fn test_modify_defaults_to_all_slots() {
        let groups = TagPipeline::new(sample())
            .modify(|t| t.to_uppercase(), &[])
            .as_groups();
        assert_eq!(groups.meta, vec!["HIGH_RES"]);
        assert_eq!(groups.artist, vec!["JDOE"]);
    }

    #[test]
    fn test_replace_underscores_with_exclusion() {
        let groups = TagPipeline::new(sample())
            .replace_underscores(true, &[Slot::Rating])
            .as_groups();
        assert_eq!(groups.character, vec!["twilight sparkle", "oc:my oc"]);
        assert_eq!(groups.rating, vec!["rating_safe"]);
        assert_eq!(groups.meta, vec!["high res"]);
    }

    #[test]
    fn test_replace_underscores_disabled() {
        let groups = TagPipeline::new(sample())
            .replace_underscores(false, &[])
            .as_groups();
        assert_eq!(groups, sample());
    }

    #[test]
    fn test_escape_parentheses() {
        let groups = TagPipeline::new(sample()).escape_parentheses().as_groups();
        assert_eq!(groups.general[1], "hat_\\(clothing\\)");
    }

    #[test]
    fn test_filter_substitutes_then_drops() {
        let filters = [
            Filter::parse("solo||alone\nhigh_res", None),
            Filter::parse("*_(clothing)\nsol*", None),
        ];
        let groups = TagPipeline::new(sample()).filter(&filters).as_groups();
        assert_eq!(groups.general, vec!["alone", "grass"]);
        assert!(groups.meta.is_empty());
        assert_eq!(groups.character.len(), 2);
    }

    #[test]
    fn test_filter_without_filters_is_noop() {
        let groups = TagPipeline::new(sample())
            .filter(std::iter::empty::<&Filter>())
            .as_groups();
        assert_eq!(groups, sample());
    }

    #[test]
    fn test_order_and_slot_membership_preserved() {
        let groups = TagPipeline::new(sample())
            .filter(&[Filter::parse("hat_(clothing)", None)])
            .replace_underscores(true, &[])
            .as_groups();
        assert_eq!(groups.general, vec!["solo", "grass"]);
        assert_eq!(groups.character, vec!["twilight sparkle", "oc:my oc"]);
    }

    #[test]
    fn test_as_flat_joins_each_slot() {
        let flat = TagPipeline::new(sample())
            .select(&[Slot::General, Slot::Artist])
            .as_flat(", ");
        assert_eq!(flat[&Slot::General], "solo, hat_(clothing), grass");
        assert_eq!(flat[&Slot::Artist], "jdoe");
        assert_eq!(flat[&Slot::Character], "");
        assert_eq!(flat.len(), 6);
    }
}
