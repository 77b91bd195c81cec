//! CLI command implementations.

pub mod build;
pub mod entry;
pub mod verify;

pub use build::build_dictionary;
pub use entry::show_entry;
pub use verify::verify_view;

use anyhow::{Context, Result};
use dictgen_core::{Config, RecordGraph, ViewConfig};
use std::path::Path;

/// Everything a command needs, loaded from the config file
pub struct Project {
    pub config: Config,
    pub graph: RecordGraph,
    pub view: ViewConfig,
}

impl Project {
    pub fn load(config_path: &Path) -> Result<Self> {
        tracing::info!("Loading config from {:?}", config_path);
        let config = Config::from_file(config_path).context("Failed to load configuration")?;

        let records = config.records_path();
        let graph = RecordGraph::from_file(&records)
            .with_context(|| format!("Failed to load records from {:?}", records))?;

        let view_path = config.view_path();
        let view = ViewConfig::from_file(&view_path)
            .with_context(|| format!("Failed to load view from {:?}", view_path))?;

        Ok(Self {
            config,
            graph,
            view,
        })
    }

    /// Every record id; the generator keeps the unowned records of the root class
    pub fn root_records(&self) -> Vec<dictgen_types::RecordId> {
        self.graph.records().iter().map(|r| r.id.clone()).collect()
    }
}
