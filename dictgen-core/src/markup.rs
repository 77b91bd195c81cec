//! Small helpers for writing markup fragments.

use unicode_normalization::UnicodeNormalization;

pub fn html_escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// Canonical composed form (NFC) of `text`
pub fn normalize(text: &str) -> String {
    text.nfc().collect()
}

/// A text-bearing leaf: class, writing-system tag and direction, escaped content
pub fn text_span(class: Option<&str>, lang: &str, dir: &str, text: &str) -> String {
    let class_attr = class
        .map(|c| format!(" class=\"{}\"", html_escape(c)))
        .unwrap_or_default();
    format!(
        "<span{} lang=\"{}\" dir=\"{}\">{}</span>",
        class_attr,
        html_escape(lang),
        dir,
        html_escape(&normalize(text))
    )
}
