//! Per-run generator settings.

use dictgen_types::{PublicationId, WritingSystem};
use std::path::{Path, PathBuf};

/// Magic writing-system id resolving to the default vernacular
pub const VERNACULAR: &str = "vernacular";
/// Magic writing-system id resolving to the default analysis
pub const ANALYSIS: &str = "analysis";

/// Fields holding vernacular text; every other text field is analysis text
pub const VERNACULAR_FIELDS: &[&str] = &[
    "HeadWord",
    "LexemeForm",
    "CitationForm",
    "Form",
    "Example",
];

/// Settings shared by every record rendered in one batch. Read-only during generation.
#[derive(Debug, Clone)]
pub struct GeneratorContext {
    pub writing_systems: Vec<WritingSystem>,
    pub default_vernacular: String,
    pub default_analysis: String,

    /// Copy (and possibly convert) media into the output directory
    pub copy_media: bool,
    pub convert_audio: bool,
    pub output_dir: PathBuf,
    /// Base for relative media paths stored in records
    pub media_root: Option<PathBuf>,

    /// Document default direction
    pub right_to_left: bool,

    /// Active publication; `None` publishes everything
    pub publication: Option<PublicationId>,
}

impl GeneratorContext {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            writing_systems: Vec::new(),
            default_vernacular: "und".to_string(),
            default_analysis: "en".to_string(),
            copy_media: false,
            convert_audio: false,
            output_dir: output_dir.into(),
            media_root: None,
            right_to_left: false,
            publication: None,
        }
    }

    pub fn with_writing_systems(
        mut self,
        writing_systems: Vec<WritingSystem>,
        vernacular: &str,
        analysis: &str,
    ) -> Self {
        self.writing_systems = writing_systems;
        self.default_vernacular = vernacular.to_string();
        self.default_analysis = analysis.to_string();
        self
    }

    pub fn with_publication(mut self, publication: &str) -> Self {
        self.publication = Some(PublicationId::new(publication));
        self
    }

    pub fn with_media(mut self, media_root: Option<PathBuf>, convert_audio: bool) -> Self {
        self.copy_media = true;
        self.media_root = media_root;
        self.convert_audio = convert_audio;
        self
    }

    pub fn writing_system(&self, id: &str) -> Option<&WritingSystem> {
        self.writing_systems.iter().find(|ws| ws.id == id)
    }

    /// Map the magic ids to the configured defaults; concrete ids pass through
    pub fn resolve_ws<'a>(&'a self, id: &'a str) -> &'a str {
        match id {
            VERNACULAR => &self.default_vernacular,
            ANALYSIS => &self.default_analysis,
            other => other,
        }
    }

    pub fn is_rtl(&self, ws: &str) -> bool {
        self.writing_system(ws)
            .map(|w| w.right_to_left)
            .unwrap_or(false)
    }

    /// Value for the `dir` attribute of text in `ws`
    pub fn direction(&self, ws: &str) -> &'static str {
        if self.is_rtl(ws) {
            "rtl"
        } else {
            "ltr"
        }
    }

    /// Fallbacks for vernacular text: vernacular first, then analysis
    pub fn vernacular_fallbacks(&self) -> [&str; 2] {
        [&self.default_vernacular, &self.default_analysis]
    }

    /// Fallbacks for analysis text: analysis first, then vernacular
    pub fn analysis_fallbacks(&self) -> [&str; 2] {
        [&self.default_analysis, &self.default_vernacular]
    }

    /// Writing systems tried for `field` when no writing system is configured
    /// or the requested one is missing
    pub fn fallbacks_for(&self, field: &str) -> [&str; 2] {
        if VERNACULAR_FIELDS.contains(&field) {
            self.vernacular_fallbacks()
        } else {
            self.analysis_fallbacks()
        }
    }

    /// Absolute location of a media path stored in a record.
    /// Stored paths may use `\` separators.
    pub fn media_source(&self, stored: &str) -> PathBuf {
        let normalized = stored.replace('\\', "/");
        let path = Path::new(&normalized);
        match &self.media_root {
            Some(root) if path.is_relative() => root.join(path),
            _ => path.to_path_buf(),
        }
    }
}
