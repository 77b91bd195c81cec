//! Class-name generation for configuration nodes.

use regex::Regex;
use std::sync::OnceLock;
use unicode_segmentation::UnicodeSegmentation;

static HYPHEN_RUNS: OnceLock<Regex> = OnceLock::new();

fn hyphen_runs() -> &'static Regex {
    HYPHEN_RUNS.get_or_init(|| Regex::new(r"-+").unwrap())
}

/// Map a free-form label (duplicate-node suffix, grouping label) to a class fragment
///
/// Rules:
/// - Lowercase
/// - Whitespace, underscores and punctuation become hyphens
/// - Unicode letters and digits are kept
/// - Hyphen runs collapse, leading/trailing hyphens are trimmed
///
/// # Examples
///
/// ```
/// use dictgen_core::class_name::sanitize_suffix;
///
/// assert_eq!(sanitize_suffix("Sense (2)"), "sense-2");
/// assert_eq!(sanitize_suffix("a.b/c"), "a-b-c");
/// ```
pub fn sanitize_suffix(input: &str) -> String {
    let mapped = input
        .to_lowercase()
        .graphemes(true)
        .map(|g| {
            let Some(c) = g.chars().next() else {
                return "";
            };
            if c.is_alphanumeric() {
                g
            } else {
                "-"
            }
        })
        .collect::<String>();

    hyphen_runs()
        .replace_all(&mapped, "-")
        .trim_matches('-')
        .to_string()
}

/// Base class for a field selector: the selector lowercased with any
/// character that cannot appear in a class name dropped
pub fn selector_class(selector: &str) -> String {
    selector
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || *c == '-')
        .collect()
}

/// Compose the full class attribute for a node.
///
/// `override_class` wins outright. Otherwise the selector (plus `_subfield`)
/// is lowercased and a duplicate-node suffix is appended after an underscore.
pub fn node_class(
    selector: &str,
    sub_field: Option<&str>,
    label_suffix: Option<&str>,
    override_class: Option<&str>,
) -> String {
    if let Some(class) = override_class.filter(|c| !c.trim().is_empty()) {
        return class.trim().to_string();
    }

    let mut class = selector_class(selector);
    if let Some(sub) = sub_field.filter(|s| !s.is_empty()) {
        class.push('_');
        class.push_str(&selector_class(sub));
    }
    if let Some(suffix) = label_suffix {
        let suffix = sanitize_suffix(suffix);
        if !suffix.is_empty() {
            class.push('_');
            class.push_str(&suffix);
        }
    }
    class
}

/// Class for a grouping node ("grouping_" + sanitized label)
pub fn grouping_class(label: &str) -> String {
    format!("grouping_{}", sanitize_suffix(label))
}

/// Class for one item of a collection ("senses" -> "sense", "lexemeform" -> "lexemeformitem")
pub fn item_class(collection_class: &str) -> String {
    match collection_class.strip_suffix('s') {
        Some(stem) if !stem.is_empty() && !stem.ends_with('s') => stem.to_string(),
        _ => format!("{}item", collection_class),
    }
}
