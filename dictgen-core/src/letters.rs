//! Letter headers between groups of sorted entries.

use crate::graph::HEADWORD_FIELD;
use crate::markup::{html_escape, normalize};
use unicode_segmentation::UnicodeSegmentation;

/// Derives the sort letter of a key, honouring multigraphs ("ch", "ng", ...)
#[derive(Debug, Clone, Default)]
pub struct SortLetters {
    /// Lowercased, longest first
    multigraphs: Vec<String>,
}

impl SortLetters {
    pub fn new<S: AsRef<str>>(multigraphs: &[S]) -> Self {
        let mut multigraphs: Vec<String> = multigraphs
            .iter()
            .map(|m| normalize(m.as_ref()).to_lowercase())
            .filter(|m| !m.is_empty())
            .collect();
        multigraphs.sort_by_key(|m| std::cmp::Reverse(m.graphemes(true).count()));
        Self { multigraphs }
    }

    /// Lowercase sort letter of `key`, skipping leading affix markers and punctuation
    pub fn letter_of(&self, key: &str) -> Option<String> {
        let key = normalize(key).to_lowercase();
        let start = key
            .grapheme_indices(true)
            .find(|(_, g)| g.chars().next().is_some_and(|c| c.is_alphanumeric()))
            .map(|(i, _)| i)?;
        let rest = &key[start..];

        if let Some(multigraph) = self.multigraphs.iter().find(|m| rest.starts_with(m.as_str())) {
            return Some(multigraph.clone());
        }
        rest.graphemes(true).next().map(|g| g.to_string())
    }
}

/// One emitted header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LetterHeader {
    pub upper: String,
    pub lower: String,
}

impl LetterHeader {
    pub fn from_lower(lower: &str) -> Self {
        let mut chars = lower.chars();
        let upper = match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        };
        Self {
            upper,
            lower: lower.to_string(),
        }
    }

    /// "A a", or just the letter when case does not apply
    pub fn text(&self) -> String {
        if self.upper == self.lower {
            self.upper.clone()
        } else {
            format!("{} {}", self.upper, self.lower)
        }
    }

    pub fn to_html(&self, lang: &str, dir: &str) -> String {
        format!(
            "<div class=\"letHead\"><span class=\"letter\" lang=\"{}\" dir=\"{}\">{}</span></div>",
            html_escape(lang),
            dir,
            html_escape(&self.text())
        )
    }
}

/// Emits a header whenever the sort letter changes. State is the last emitted letter.
#[derive(Debug, Clone)]
pub struct LetterHeaderTracker {
    letters: SortLetters,
    enabled: bool,
    last: Option<String>,
}

impl LetterHeaderTracker {
    /// Headers are only meaningful on the headword axis; any other sort field disables them
    pub fn new(letters: SortLetters, sort_field: &str) -> Self {
        let enabled = sort_field == HEADWORD_FIELD;
        if !enabled {
            tracing::debug!("Sorting by '{}': letter headers suppressed", sort_field);
        }
        Self {
            letters,
            enabled,
            last: None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Header to emit before the entry with `sort_key`, if its letter differs from the last one
    pub fn next(&mut self, sort_key: &str) -> Option<LetterHeader> {
        if !self.enabled {
            return None;
        }
        let letter = self.letters.letter_of(sort_key)?;
        if self.last.as_deref() == Some(letter.as_str()) {
            return None;
        }
        let header = LetterHeader::from_lower(&letter);
        self.last = Some(letter);
        Some(header)
    }

    pub fn reset(&mut self) {
        self.last = None;
    }
}
