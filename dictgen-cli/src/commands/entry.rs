//! Print a single entry fragment.

use super::Project;
use anyhow::{Context, Result};
use dictgen_core::DictionaryGenerator;
use dictgen_types::RecordId;
use std::path::Path;

pub fn show_entry(config_path: &Path, id: &str) -> Result<()> {
    let project = Project::load(config_path)?;

    // previews link media in place rather than publishing it
    let mut ctx = project.config.generator_context();
    ctx.copy_media = false;

    let generator = DictionaryGenerator::new(&project.graph, &project.view, &ctx)
        .context("Invalid record schema")?;
    let html = generator
        .generate_entry(&RecordId::new(id))
        .with_context(|| format!("Failed to render entry '{}'", id))?;

    if html.is_empty() {
        tracing::info!("Entry '{}' is not part of the active publication", id);
    }
    println!("{}", html);
    Ok(())
}
