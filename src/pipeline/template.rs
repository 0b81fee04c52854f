//! Token templates: turns flattened tag slots into one prompt string.
//!
//! Precedence for a caller template:
//! 1. none (or empty): the model's default template is rendered;
//! 2. contains `{prompt}`: slot tokens are stripped from the caller
//!    template, `{prompt}` expands to the default template, then slots are
//!    substituted;
//! 3. contains any `{slot}`: only the caller template is rendered;
//! 4. otherwise the caller text is appended to the default template.
//!
//! Unknown `{tokens}` are left as literal text.

use once_cell::sync::Lazy;
use regex::Regex;

use super::tags::FlatGroups;

pub const PROMPT_TOKEN: &str = "{prompt}";
pub const DEFAULT_SEPARATOR: &str = ", ";

static MULTIPLE_SPACES: Lazy<Regex> =
    Lazy::new(|| Regex::new(" {2,}").expect("static pattern is valid"));

fn replace_tokens(flat: &FlatGroups, template: &str) -> String {
    flat.iter().fold(template.to_string(), |acc, (slot, text)| {
        acc.replace(&slot.token(), text)
    })
}

/// Substitute slot tokens according to the precedence rules. The result
/// is not sanitized; see [`render`].
pub fn apply_template(
    flat: &FlatGroups,
    default_template: &str,
    template: Option<&str>,
    separator: &str,
) -> String {
    let template = match template {
        Some(t) if !t.is_empty() => t,
        _ => return replace_tokens(flat, default_template),
    };

    if template.contains(PROMPT_TOKEN) {
        let stripped = flat
            .keys()
            .fold(template.to_string(), |acc, slot| acc.replace(&slot.token(), ""));
        let expanded = stripped.replace(PROMPT_TOKEN, default_template);
        return replace_tokens(flat, &expanded);
    }

    if flat.keys().any(|slot| template.contains(&slot.token())) {
        return replace_tokens(flat, template);
    }

    replace_tokens(flat, &[default_template, template].join(separator))
}

/// Clean substitution artifacts. Idempotent for any input:
/// collapses repeated spaces, then repeated separators, then strips a
/// leading and trailing run of separator characters and whitespace.
/// The edge trim works per character, so a lone `,` (or `|` with a
/// `" | "` separator) at either end is dropped as well.
pub fn sanitize(prompt: &str, separator: &str) -> String {
    let mut result = MULTIPLE_SPACES.replace_all(prompt, " ").into_owned();

    // Compare against the space-collapsed forms so separators with
    // surrounding spaces still line up after the first rule.
    let separator_run = MULTIPLE_SPACES.replace_all(separator, " ").into_owned();
    let doubled = MULTIPLE_SPACES
        .replace_all(&separator_run.repeat(2), " ")
        .into_owned();
    if doubled.len() > separator_run.len() {
        while result.contains(&doubled) {
            result = result.replace(&doubled, &separator_run);
        }
    }

    let is_edge_char = |c: char| c.is_whitespace() || separator.contains(c);
    result
        .trim_start_matches(is_edge_char)
        .trim_end_matches(is_edge_char)
        .to_string()
}

/// Render and sanitize one prompt.
pub fn render(
    flat: &FlatGroups,
    default_template: &str,
    template: Option<&str>,
    separator: &str,
) -> String {
    sanitize(
        &apply_template(flat, default_template, template, separator),
        separator,
    )
}
