//! # dictgen-render
//!
//! Page shells for generated dictionaries.
//!
//! This crate wraps rendered entry fragments in complete HTML pages using Askama.

pub mod templates;

pub use templates::{page_file, ManifestPage, PageLink, PageTemplate, PagesManifest, RenderError};
