//! Check the view specification against the record schema.

use super::Project;
use anyhow::{bail, Context, Result};
use dictgen_core::CapabilityTable;
use std::path::Path;

/// Resolve every enabled node of the view and report the ones that do not apply.
pub fn verify_view(config_path: &Path, strict: bool) -> Result<()> {
    let project = Project::load(config_path)?;
    let table = CapabilityTable::build(&project.graph.schema).context("Invalid record schema")?;

    let root = project.view.root().field.selector();
    if root.is_empty() || table.lineage(root).is_none() {
        bail!("Root node '{}' does not name a class in the schema", root);
    }

    let invalid = table.audit(&project.view, root);
    for node in &invalid {
        tracing::warn!("Node {} does not resolve on class '{}'", node.path, node.class);
    }

    println!(
        "Verification complete: {} records, {} unresolved nodes",
        project.graph.records().len(),
        invalid.len()
    );

    if strict && !invalid.is_empty() {
        bail!("{} view nodes do not resolve", invalid.len());
    }
    Ok(())
}
