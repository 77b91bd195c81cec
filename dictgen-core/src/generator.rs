//! Batch generation: sorts the top-level entries, paginates them and renders
//! each page with letter headers. One failing entry never stops the batch.

use crate::context::GeneratorContext;
use crate::filter;
use crate::graph::{RecordSource, HEADWORD_FIELD};
use crate::letters::{LetterHeaderTracker, SortLetters};
use crate::markup::normalize;
use crate::media::{AudioConverter, MediaPublisher};
use crate::pagination::{Pagination, PaginationError};
use crate::schema::{CapabilityTable, SchemaError};
use crate::view::{FieldRef, ViewConfig};
use crate::writer::{DocumentWriter, GenerateError};
use dictgen_types::RecordId;
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Active sort axis of a batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    #[serde(default = "default_sort_field")]
    pub field: String,

    /// Writing system of the sort key; defaults to the vernacular
    #[serde(default)]
    pub writing_system: Option<String>,

    /// Letter sequences treated as one letter in headers
    #[serde(default)]
    pub multigraphs: Vec<String>,
}

fn default_sort_field() -> String {
    HEADWORD_FIELD.to_string()
}

impl Default for SortSpec {
    fn default() -> Self {
        Self {
            field: default_sort_field(),
            writing_system: None,
            multigraphs: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub entries_per_page: usize,
    pub sort: SortSpec,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            entries_per_page: 100,
            sort: SortSpec::default(),
        }
    }
}

/// An entry that failed to render, with the configuration error it hit
#[derive(Debug, Clone, PartialEq)]
pub struct EntryFailure {
    pub id: RecordId,
    pub error: GenerateError,
}

#[derive(Debug, Clone)]
pub struct Page {
    pub index: usize,
    /// Absolute entry indexes on this page
    pub range: Range<usize>,
    pub label: String,
    pub html: String,
}

#[derive(Debug, Clone)]
pub struct BatchOutput {
    /// Entry ids in sort order with their sort keys
    pub entries: Vec<(RecordId, String)>,
    pub pagination: Pagination,
    pub pages: Vec<Page>,
    pub failures: Vec<EntryFailure>,
}

/// Owns the per-batch state: capability table, media publisher and settings
pub struct DictionaryGenerator<'a, S: RecordSource + ?Sized> {
    source: &'a S,
    view: &'a ViewConfig,
    ctx: &'a GeneratorContext,
    table: CapabilityTable,
    media: Option<MediaPublisher>,
}

impl<'a, S: RecordSource + ?Sized> DictionaryGenerator<'a, S> {
    pub fn new(source: &'a S, view: &'a ViewConfig, ctx: &'a GeneratorContext) -> Result<Self, SchemaError> {
        let table = CapabilityTable::build(source.schema())?;
        let media = ctx
            .copy_media
            .then(|| MediaPublisher::new(ctx.output_dir.clone()));
        Ok(Self {
            source,
            view,
            ctx,
            table,
            media,
        })
    }

    /// Use `converter` for audio when the context asks for conversion
    pub fn with_audio_converter(mut self, converter: Option<Box<dyn AudioConverter>>) -> Self {
        if self.ctx.convert_audio {
            self.media = self.media.map(|m| m.with_audio_conversion(converter));
        }
        self
    }

    pub fn table(&self) -> &CapabilityTable {
        &self.table
    }

    pub fn writer(&self) -> DocumentWriter<'_, S> {
        let writer = DocumentWriter::new(self.source, self.view, &self.table, self.ctx);
        match &self.media {
            Some(media) => writer.with_media(media),
            None => writer,
        }
    }

    pub fn generate_entry(&self, id: &RecordId) -> Result<String, GenerateError> {
        self.writer().generate_entry(id)
    }

    /// Unowned records of the root class visible in the active publication
    pub fn top_level_entries(&self, ids: impl IntoIterator<Item = RecordId>) -> Vec<RecordId> {
        let root = self.view.root().field.selector();
        ids.into_iter()
            .filter(|id| {
                self.source.record(id).is_some_and(|r| {
                    r.owner.is_none() && (root.is_empty() || self.table.is_a(&r.class, root))
                })
            })
            .filter(|id| filter::is_visible_with_owners(self.source, id, self.ctx.publication.as_ref()))
            .collect()
    }

    /// Sort key of an entry on the active axis: NFC, lowercased
    pub fn sort_key(&self, id: &RecordId, sort: &SortSpec) -> String {
        let ws = sort
            .writing_system
            .as_deref()
            .map(|w| self.ctx.resolve_ws(w))
            .unwrap_or(self.ctx.default_vernacular.as_str());
        let fallbacks = self.ctx.fallbacks_for(&sort.field);
        let text = self
            .source
            .record(id)
            .and_then(|r| r.value(&FieldRef::known(sort.field.as_str())))
            .and_then(|v| v.text_in(ws, &fallbacks))
            .map(|t| t.to_string())
            .unwrap_or_else(|| {
                let vernacular = self.ctx.vernacular_fallbacks();
                self.source
                    .display_form(id, &self.ctx.default_vernacular, &vernacular)
                    .text
            });
        normalize(&text).to_lowercase()
    }

    /// Entries paired with their keys, ordered by key then id
    pub fn sort_entries(&self, ids: Vec<RecordId>, sort: &SortSpec) -> Vec<(RecordId, String)> {
        let mut keyed: Vec<(RecordId, String)> = ids
            .into_iter()
            .map(|id| {
                let key = self.sort_key(&id, sort);
                (id, key)
            })
            .collect();
        keyed.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
        keyed
    }

    /// Render `ids` (any order) into sorted, paginated output
    pub fn generate(
        &self,
        ids: impl IntoIterator<Item = RecordId>,
        options: &BatchOptions,
    ) -> Result<BatchOutput, PaginationError> {
        let entries = self.sort_entries(self.top_level_entries(ids), &options.sort);
        let pagination = Pagination::new(entries.len(), options.entries_per_page)?;
        tracing::info!(
            "Generating {} entries on {} pages",
            entries.len(),
            pagination.page_count()
        );

        let keys: Vec<&str> = entries.iter().map(|(_, k)| k.as_str()).collect();
        let mut tracker = LetterHeaderTracker::new(SortLetters::new(options.sort.multigraphs.as_slice()), &options.sort.field);
        let mut failures = Vec::new();
        let mut pages = Vec::with_capacity(pagination.page_count());

        for (index, range) in pagination.pages().iter().enumerate() {
            let html = self.render_range(&entries, range.clone(), &mut tracker, &mut failures);
            pages.push(Page {
                index,
                range: range.clone(),
                label: pagination.page_label(index, &keys).unwrap_or_default(),
                html,
            });
        }

        if !failures.is_empty() {
            tracing::warn!("{} entries failed to render", failures.len());
        }
        Ok(BatchOutput {
            entries,
            pagination,
            pages,
            failures,
        })
    }

    /// Render one index range of sorted entries, emitting letter headers as the letter changes
    pub fn render_range(
        &self,
        entries: &[(RecordId, String)],
        range: Range<usize>,
        tracker: &mut LetterHeaderTracker,
        failures: &mut Vec<EntryFailure>,
    ) -> String {
        let writer = self.writer();
        let lang = &self.ctx.default_vernacular;
        let dir = self.ctx.direction(lang);

        let mut out = String::new();
        for (id, key) in entries.get(range).unwrap_or_default() {
            match writer.generate_entry(id) {
                Ok(html) if html.is_empty() => {}
                Ok(html) => {
                    if let Some(header) = tracker.next(key) {
                        out.push_str(&header.to_html(lang, dir));
                    }
                    out.push_str(&html);
                    out.push('\n');
                }
                Err(error) => {
                    tracing::warn!("Skipping entry {}: {}", id, error);
                    failures.push(EntryFailure {
                        id: id.clone(),
                        error,
                    });
                }
            }
        }
        out
    }
}
