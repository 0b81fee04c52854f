//! Pattern-based tag filters with optional substitution.
//!
//! A filter is authored as plain text, one entry per line:
//!
//! ```text
//! pattern||replacement
//! pattern
//! ```
//!
//! Lines with `||` rewrite matching tags; plain lines drop them. Patterns
//! are anchored, case-sensitive shell globs (`*`, `?`, `[...]`).

use glob::Pattern;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

const SUBSTITUTION_DELIMITER: &str = "||";

static STAR_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\*{2,}").expect("static pattern is valid"));

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filter {
    /// Ordered pattern -> replacement pairs; the first matching pattern wins.
    substitutions: Vec<(String, String)>,
    /// Ordered set of drop patterns.
    patterns: Vec<String>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse filter text split on lines, or on `separator` when given.
    /// Never fails: empty or blank input yields an empty filter.
    pub fn parse(text: &str, separator: Option<&str>) -> Self {
        match separator {
            Some(sep) if !sep.is_empty() => Self::from_lines(text.split(sep)),
            _ => Self::from_lines(text.lines()),
        }
    }

    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut filter = Self::new();
        for line in lines {
            let line = line.as_ref().trim();
            if line.is_empty() {
                continue;
            }
            if line.contains(SUBSTITUTION_DELIMITER) {
                // Only the first split counts; anything after a second `||` is ignored.
                let mut parts = line.split(SUBSTITUTION_DELIMITER);
                let pattern = parts.next().unwrap_or_default();
                let replacement = parts.next().unwrap_or_default();
                if !pattern.is_empty() {
                    filter.add_substitution(pattern, replacement);
                }
            } else {
                filter.add_pattern(line);
            }
        }
        filter
    }

    /// Insert or overwrite a substitution. An overwritten key keeps its
    /// original position.
    pub fn add_substitution(&mut self, pattern: impl Into<String>, replacement: impl Into<String>) {
        let pattern = pattern.into();
        let replacement = replacement.into();
        match self.substitutions.iter_mut().find(|(p, _)| *p == pattern) {
            Some(entry) => entry.1 = replacement,
            None => self.substitutions.push((pattern, replacement)),
        }
    }

    pub fn add_pattern(&mut self, pattern: impl Into<String>) {
        let pattern = pattern.into();
        if !self.patterns.contains(&pattern) {
            self.patterns.push(pattern);
        }
    }

    /// Union of substitutions (rightmost filter wins on key collision) and
    /// concatenation of drop patterns.
    pub fn merge<'a, I>(filters: I) -> Self
    where
        I: IntoIterator<Item = &'a Filter>,
    {
        let mut merged = Self::new();
        for filter in filters {
            for (pattern, replacement) in &filter.substitutions {
                merged.add_substitution(pattern.clone(), replacement.clone());
            }
            for pattern in &filter.patterns {
                merged.add_pattern(pattern.clone());
            }
        }
        merged
    }

    pub fn substitutions(&self) -> &[(String, String)] {
        &self.substitutions
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    pub fn is_empty(&self) -> bool {
        self.substitutions.is_empty() && self.patterns.is_empty()
    }

    /// True if `tag` matches any plain drop pattern.
    pub fn matches(&self, tag: &str) -> bool {
        self.patterns.iter().any(|p| TagPattern::new(p).matches(tag))
    }

    /// Replacement for `tag` from the first matching substitution pattern.
    /// `Some("")` is a match with an empty replacement, distinct from `None`.
    pub fn substitution_for(&self, tag: &str) -> Option<&str> {
        self.substitutions
            .iter()
            .find(|(pattern, _)| TagPattern::new(pattern).matches(tag))
            .map(|(_, replacement)| replacement.as_str())
    }

    /// Pre-compile every pattern for repeated application.
    pub fn compile(&self) -> CompiledFilter {
        CompiledFilter {
            substitutions: self
                .substitutions
                .iter()
                .map(|(p, r)| (TagPattern::new(p), r.clone()))
                .collect(),
            drops: TagMatcher::new(&self.patterns),
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lines: Vec<String> = self
            .substitutions
            .iter()
            .map(|(p, r)| format!("{}{}{}", p, SUBSTITUTION_DELIMITER, r))
            .chain(self.patterns.iter().cloned())
            .collect();
        f.write_str(&lines.join("\n"))
    }
}

fn is_glob(pattern: &str) -> bool {
    pattern.contains(['*', '?', '['])
}

/// A single anchored pattern. `**` means the same as `*`. Text that is
/// not a valid glob (an unclosed `[`, say) is compared literally.
#[derive(Debug, Clone)]
pub enum TagPattern {
    Glob(Pattern),
    Literal(String),
}

impl TagPattern {
    pub fn new(pattern: &str) -> Self {
        if is_glob(pattern) {
            // glob only accepts `**` as a whole path component
            let collapsed = STAR_RUN.replace_all(pattern, "*");
            if let Ok(compiled) = Pattern::new(&collapsed) {
                return TagPattern::Glob(compiled);
            }
        }
        TagPattern::Literal(pattern.to_string())
    }

    pub fn matches(&self, tag: &str) -> bool {
        match self {
            TagPattern::Glob(p) => p.matches(tag),
            TagPattern::Literal(s) => s == tag,
        }
    }
}

/// Membership test against a table of exact tags and glob patterns.
#[derive(Debug, Clone, Default)]
pub struct TagMatcher {
    exact: HashSet<String>,
    globs: Vec<Pattern>,
}

impl TagMatcher {
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut matcher = Self::default();
        for pattern in patterns {
            match TagPattern::new(pattern.as_ref()) {
                TagPattern::Glob(p) => matcher.globs.push(p),
                TagPattern::Literal(s) => {
                    matcher.exact.insert(s);
                }
            }
        }
        matcher
    }

    pub fn matches(&self, tag: &str) -> bool {
        self.exact.contains(tag) || self.globs.iter().any(|p| p.matches(tag))
    }

    pub fn is_empty(&self) -> bool {
        self.exact.is_empty() && self.globs.is_empty()
    }
}

/// A [`Filter`] with its patterns compiled.
#[derive(Debug, Clone, Default)]
pub struct CompiledFilter {
    substitutions: Vec<(TagPattern, String)>,
    drops: TagMatcher,
}

impl CompiledFilter {
    /// Substitution is checked first and short-circuits; otherwise a drop
    /// match removes the tag. Returns `None` for a dropped tag.
    pub fn apply(&self, tag: &str) -> Option<String> {
        if let Some((_, replacement)) = self.substitutions.iter().find(|(p, _)| p.matches(tag)) {
            return Some(replacement.clone());
        }
        if self.drops.matches(tag) {
            return None;
        }
        Some(tag.to_string())
    }

    pub fn is_empty(&self) -> bool {
        self.substitutions.is_empty() && self.drops.is_empty()
    }
}
