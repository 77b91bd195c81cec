//! Askama template definitions and the pages manifest.

use askama::Template;
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Failed to render template: {0}")]
    Template(#[from] askama::Error),

    #[error("Failed to serialize manifest: {0}")]
    Json(#[from] serde_json::Error),
}

/// File name of the page at `index` (the first page is the index page)
pub fn page_file(index: usize) -> String {
    if index == 0 {
        "index.html".to_string()
    } else {
        format!("page-{}.html", index + 1)
    }
}

/// A navigation button
#[derive(Debug, Clone)]
pub struct PageLink {
    pub href: String,
    pub label: String,
    pub current: bool,
}

impl PageLink {
    /// Links for every page label, marking `current`
    pub fn for_pages(labels: &[String], current: usize) -> Vec<PageLink> {
        labels
            .iter()
            .enumerate()
            .map(|(index, label)| PageLink {
                href: page_file(index),
                label: label.clone(),
                current: index == current,
            })
            .collect()
    }
}

#[derive(Template)]
#[template(path = "page.html")]
pub struct PageTemplate {
    pub title: String,
    pub description: String,
    /// Document language (default vernacular)
    pub lang: String,
    pub right_to_left: bool,

    pub page_label: String,
    pub pages: Vec<PageLink>,

    /// Rendered entries and letter headers
    pub content: String,

    pub generated_on: String,
    pub generator_version: String,
}

impl PageTemplate {
    pub fn render_html(&self) -> Result<String, RenderError> {
        Ok(self.render()?)
    }
}

/// `pages.json`: lets a viewer fetch entries by absolute index range
#[derive(Debug, Clone, Serialize)]
pub struct PagesManifest {
    pub title: String,
    pub total_entries: usize,
    pub entries_per_page: usize,
    pub pages: Vec<ManifestPage>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ManifestPage {
    pub index: usize,
    pub file: String,
    pub label: String,
    pub start: usize,
    pub end: usize,
}

impl PagesManifest {
    pub fn to_json(&self) -> Result<String, RenderError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
