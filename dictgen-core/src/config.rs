//! Configuration parsing and management.

use crate::context::GeneratorContext;
use crate::generator::{BatchOptions, SortSpec};
use dictgen_types::WritingSystem;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    ParseError(#[from] serde_yaml::Error),

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

/// Main configuration struct matching the dictgen.yml schema
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub dictionary: DictionaryConfig,
    pub paths: PathsConfig,

    #[serde(default)]
    pub generation: GenerationConfig,

    #[serde(default)]
    pub writing_systems: Vec<WritingSystem>,

    #[serde(default = "default_vernacular")]
    pub default_vernacular: String,

    #[serde(default = "default_analysis")]
    pub default_analysis: String,

    // Internal: path to config file (for relative path resolution)
    #[serde(skip)]
    config_path: Option<PathBuf>,
}

fn default_vernacular() -> String {
    String::from("und")
}

fn default_analysis() -> String {
    String::from("en")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DictionaryConfig {
    pub title: String,

    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Record graph (JSON)
    pub records: PathBuf,
    /// View specification (YAML)
    pub view: PathBuf,
    pub output: PathBuf,

    /// Base directory for relative media paths in records
    #[serde(default)]
    pub media_root: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    #[serde(default = "default_entries_per_page")]
    pub entries_per_page: usize,

    #[serde(default = "default_true")]
    pub copy_media: bool,

    #[serde(default)]
    pub convert_audio: bool,

    #[serde(default)]
    pub right_to_left: bool,

    /// Publication to restrict output to; everything when unset
    #[serde(default)]
    pub publication: Option<String>,

    #[serde(default)]
    pub sort: SortSpec,
}

fn default_entries_per_page() -> usize {
    100
}

fn default_true() -> bool {
    true
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            entries_per_page: default_entries_per_page(),
            copy_media: true,
            convert_audio: false,
            right_to_left: false,
            publication: None,
            sort: SortSpec::default(),
        }
    }
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let mut config = Self::from_yaml_str(&contents)?;

        // Store config file path for relative path resolution
        config.config_path = Some(path.to_path_buf());

        Ok(config)
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.generation.entries_per_page == 0 {
            return Err(ConfigError::InvalidValue {
                field: "generation.entries_per_page".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Record graph file, resolved relative to config file
    pub fn records_path(&self) -> PathBuf {
        self.resolve_path(&self.paths.records)
    }

    /// View specification file, resolved relative to config file
    pub fn view_path(&self) -> PathBuf {
        self.resolve_path(&self.paths.view)
    }

    /// Output directory, resolved relative to config file
    pub fn output_dir(&self) -> PathBuf {
        self.resolve_path(&self.paths.output)
    }

    pub fn media_root(&self) -> Option<PathBuf> {
        self.paths.media_root.as_ref().map(|p| self.resolve_path(p))
    }

    /// Resolve a path relative to the config file location
    fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else if let Some(parent) = self.config_path.as_ref().and_then(|p| p.parent()) {
            parent.join(path)
        } else {
            path.to_path_buf()
        }
    }

    /// Per-run settings for the generator
    pub fn generator_context(&self) -> GeneratorContext {
        let mut ctx = GeneratorContext::new(self.output_dir()).with_writing_systems(
            self.writing_systems.clone(),
            &self.default_vernacular,
            &self.default_analysis,
        );
        if self.generation.copy_media {
            ctx = ctx.with_media(self.media_root(), self.generation.convert_audio);
        } else {
            ctx.media_root = self.media_root();
        }
        if let Some(publication) = &self.generation.publication {
            ctx = ctx.with_publication(publication);
        }
        ctx.right_to_left = self.generation.right_to_left;
        ctx
    }

    pub fn batch_options(&self) -> BatchOptions {
        BatchOptions {
            entries_per_page: self.generation.entries_per_page,
            sort: self.generation.sort.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
dictionary:
  title: Lexique
paths:
  records: data/records.json
  view: view.yml
  output: site
"#;

    #[test]
    fn test_default_values() {
        let config = Config::from_yaml_str(MINIMAL).unwrap();
        assert_eq!(config.generation.entries_per_page, 100);
        assert!(config.generation.copy_media);
        assert!(!config.generation.convert_audio);
        assert_eq!(config.generation.sort.field, "HeadWord");
        assert_eq!(config.default_vernacular, "und");
        assert!(config.generator_context().publication.is_none());
    }

    #[test]
    fn test_full_config() {
        let yaml = r#"
dictionary:
  title: Qamus
  description: Arabic-French
paths:
  records: records.json
  view: view.yml
  output: out
  media_root: /data/media
generation:
  entries_per_page: 50
  convert_audio: true
  right_to_left: true
  publication: school
  sort:
    field: HeadWord
    writing_system: vernacular
    multigraphs: [th, kh]
writing_systems:
  - id: ar
    abbreviation: Ar
    right_to_left: true
  - id: fr
default_vernacular: ar
default_analysis: fr
"#;
        let config = Config::from_yaml_str(yaml).unwrap();
        let ctx = config.generator_context();
        assert!(ctx.copy_media && ctx.convert_audio && ctx.right_to_left);
        assert_eq!(ctx.publication.as_ref().map(|p| p.as_str()), Some("school"));
        assert_eq!(ctx.direction("ar"), "rtl");
        assert_eq!(ctx.media_source("a.wav"), PathBuf::from("/data/media/a.wav"));

        let options = config.batch_options();
        assert_eq!(options.entries_per_page, 50);
        assert_eq!(options.sort.multigraphs, ["th", "kh"]);
    }

    #[test]
    fn test_zero_page_size_rejected() {
        let yaml = format!("{}generation:\n  entries_per_page: 0\n", MINIMAL);
        assert!(matches!(
            Config::from_yaml_str(&yaml),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_paths_resolve_relative_to_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dictgen.yml");
        std::fs::write(&path, MINIMAL).unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.records_path(), dir.path().join("data/records.json"));
        assert_eq!(config.output_dir(), dir.path().join("site"));
        assert_eq!(config.media_root(), None);
    }
}
