//! Build the paginated dictionary.

use super::Project;
use anyhow::{Context, Result};
use dictgen_core::{AudioConverter, CommandConverter, DictionaryGenerator};
use dictgen_render::{page_file, ManifestPage, PageLink, PageTemplate, PagesManifest};
use std::fs;
use std::path::Path;

pub fn build_dictionary(config_path: &Path) -> Result<()> {
    let project = Project::load(config_path)?;
    let config = &project.config;

    tracing::info!("Building dictionary: {}", config.dictionary.title);

    let ctx = config.generator_context();
    let output_dir = config.output_dir();
    fs::create_dir_all(&output_dir).context("Failed to create output directory")?;

    let converter: Option<Box<dyn AudioConverter>> = Some(Box::new(CommandConverter::ffmpeg_mp3()));
    let generator = DictionaryGenerator::new(&project.graph, &project.view, &ctx)
        .context("Invalid record schema")?
        .with_audio_converter(converter);

    let options = config.batch_options();
    let output = generator
        .generate(project.root_records(), &options)
        .context("Failed to paginate entries")?;

    let labels: Vec<String> = output.pages.iter().map(|p| p.label.clone()).collect();
    let generated_on = chrono::Utc::now().format("%Y-%m-%d").to_string();

    let page_template = |index: usize, label: &str, content: String| PageTemplate {
        title: config.dictionary.title.clone(),
        description: config.dictionary.description.clone(),
        lang: ctx.default_vernacular.clone(),
        right_to_left: ctx.right_to_left,
        page_label: label.to_string(),
        pages: PageLink::for_pages(&labels, index),
        content,
        generated_on: generated_on.clone(),
        generator_version: env!("CARGO_PKG_VERSION").to_string(),
    };

    if output.pages.is_empty() {
        tracing::info!("No entries to publish; writing an empty index page");
        let html = page_template(0, "", String::new())
            .render_html()
            .context("Failed to render page template")?;
        write_page(&output_dir.join(page_file(0)), html)?;
    }

    for page in &output.pages {
        let html = page_template(page.index, &page.label, page.html.clone())
            .render_html()
            .context("Failed to render page template")?;
        write_page(&output_dir.join(page_file(page.index)), html)?;
        tracing::debug!("Rendered page {} ({})", page.index + 1, page.label);
    }

    let manifest = PagesManifest {
        title: config.dictionary.title.clone(),
        total_entries: output.entries.len(),
        entries_per_page: options.entries_per_page,
        pages: output
            .pages
            .iter()
            .map(|p| ManifestPage {
                index: p.index,
                file: page_file(p.index),
                label: p.label.clone(),
                start: p.range.start,
                end: p.range.end,
            })
            .collect(),
    };
    let manifest_path = output_dir.join("pages.json");
    fs::write(&manifest_path, manifest.to_json()?)
        .with_context(|| format!("Failed to write {:?}", manifest_path))?;

    for failure in &output.failures {
        tracing::warn!("Entry {} was left out: {}", failure.id, failure.error);
    }

    tracing::info!(
        "✓ Built {} entries on {} pages ({} failed)",
        output.entries.len() - output.failures.len(),
        output.pages.len().max(1),
        output.failures.len()
    );
    tracing::info!("✓ Output written to {:?}", output_dir);

    Ok(())
}

fn write_page(path: &Path, html: String) -> Result<()> {
    fs::write(path, html).with_context(|| format!("Failed to write {:?}", path))
}
