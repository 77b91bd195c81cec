//! Document writer: renders one top-level record against the view.
//!
//! Every node resolves its field through the capability table, filters what it
//! finds by publication visibility (and list filters where present), and
//! recurses. Nodes that resolve to nothing visible emit nothing at all. Only
//! configuration faults surface as errors.

use crate::class_name;
use crate::context::GeneratorContext;
use crate::filter::{self, FilterError};
use crate::graph::{DisplayForm, FieldValue, Record, RecordSource};
use crate::markup::{html_escape, text_span};
use crate::media::{MediaKind, MediaPublisher};
use crate::numbering::{self, SenseLevels, SenseNumber};
use crate::relations::{self, RelationGroup};
use crate::schema::{CapabilityTable, FieldKind, Resolution, ResolvedField, ValueType};
use crate::view::{ConfigNode, ViewConfig};
use dictgen_types::RecordId;
use thiserror::Error;

/// Field compared across sibling senses for the shared grammatical info display
pub const GRAMMATICAL_INFO_FIELD: &str = "MorphoSyntaxAnalysis";
/// Relation child node showing the relation label
pub const OWNER_TYPE_FIELD: &str = "OwnerType";
/// Relation child node showing the related records
pub const TARGETS_FIELD: &str = "Targets";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GenerateError {
    #[error("Root node '{selector}' does not apply to records of class '{class}'")]
    UnresolvableRoot { selector: String, class: String },

    #[error("Node '{selector}' shows selectable items but has no list filter options")]
    MissingListFilter { selector: String },

    #[error("Unknown record '{id}'")]
    UnknownRecord { id: RecordId },
}

impl From<FilterError> for GenerateError {
    fn from(err: FilterError) -> Self {
        match err {
            FilterError::MissingListFilter { selector } => {
                GenerateError::MissingListFilter { selector }
            }
        }
    }
}

type Result<T> = std::result::Result<T, GenerateError>;

pub struct DocumentWriter<'a, S: RecordSource + ?Sized> {
    source: &'a S,
    view: &'a ViewConfig,
    table: &'a CapabilityTable,
    ctx: &'a GeneratorContext,
    media: Option<&'a MediaPublisher>,
}

impl<'a, S: RecordSource + ?Sized> DocumentWriter<'a, S> {
    pub fn new(
        source: &'a S,
        view: &'a ViewConfig,
        table: &'a CapabilityTable,
        ctx: &'a GeneratorContext,
    ) -> Self {
        Self {
            source,
            view,
            table,
            ctx,
            media: None,
        }
    }

    /// Publish media through `media` instead of linking stored paths directly
    pub fn with_media(mut self, media: &'a MediaPublisher) -> Self {
        self.media = Some(media);
        self
    }

    /// Markup for one top-level record: a single `div` holding all visible fields.
    ///
    /// A record hidden from the active publication renders as an empty string.
    pub fn generate_entry(&self, id: &RecordId) -> Result<String> {
        let record = self
            .source
            .record(id)
            .ok_or_else(|| GenerateError::UnknownRecord { id: id.clone() })?;
        let root = self.view.root();

        let selector = root.field.selector();
        if !selector.is_empty() && !self.table.is_a(&record.class, selector) {
            return Err(GenerateError::UnresolvableRoot {
                selector: selector.to_string(),
                class: record.class.clone(),
            });
        }

        if !filter::is_visible_with_owners(self.source, id, self.ctx.publication.as_ref()) {
            tracing::debug!("Entry {} is excluded from the active publication", id);
            return Ok(String::new());
        }

        let inner = self.render_children(root, record, None, None)?;
        let dir = if self.ctx.right_to_left { " dir=\"rtl\"" } else { "" };
        Ok(format!(
            "<div class=\"{}\" id=\"{}\"{}>{}</div>",
            html_escape(&root.class_name()),
            html_escape(&id.anchor()),
            dir,
            inner
        ))
    }

    fn render_children(
        &self,
        node: &ConfigNode,
        record: &Record,
        number: Option<&SenseNumber>,
        skip: Option<&ConfigNode>,
    ) -> Result<String> {
        let mut out = String::new();
        for child in self.view.children_of(node) {
            if skip.is_some_and(|s| std::ptr::eq(s, child)) {
                continue;
            }
            out.push_str(&self.render_node(child, record, number)?);
        }
        Ok(out)
    }

    fn render_node(
        &self,
        node: &ConfigNode,
        record: &Record,
        number: Option<&SenseNumber>,
    ) -> Result<String> {
        if !node.enabled {
            return Ok(String::new());
        }

        if node.is_grouping() {
            let inner = self.render_children(node, record, number, None)?;
            return Ok(wrap(block_tag(node.items_in_paragraphs()), &node.class_name(), &inner));
        }

        let field = match self.table.resolve_node(node, &record.class) {
            Resolution::Resolved(field) => field,
            Resolution::Invalid => {
                tracing::debug!(
                    "Node '{}' does not resolve on class '{}'; skipping",
                    node.display_name(),
                    record.class
                );
                return Ok(String::new());
            }
        };

        match field.kind {
            FieldKind::Invalid => Ok(String::new()),
            FieldKind::Collection if field.target().def.value == ValueType::Relations => {
                self.render_relations(node, record)
            }
            FieldKind::Collection => {
                let items = self.collection_items(node, record, &field)?;
                if items.is_empty() {
                    return Ok(String::new());
                }
                if node.sense_options().is_some() {
                    self.render_senses(node, &items, number)
                } else {
                    self.render_items(node, &items, number)
                }
            }
            FieldKind::EmbeddedRecord => {
                let Some(target) = self
                    .value_of(record, &field)
                    .and_then(|v| v.record_ids().into_iter().next())
                else {
                    return Ok(String::new());
                };
                let Some(embedded) = self.visible_record(&target) else {
                    return Ok(String::new());
                };
                let inner = if self.view.children_of(node).is_empty() {
                    self.display_span(Some("headword"), &target)
                } else {
                    self.render_children(node, embedded, number, None)?
                };
                Ok(wrap("span", &node.class_name(), &inner))
            }
            FieldKind::MediaReference => {
                let stored = match self.value_of(record, &field) {
                    Some(FieldValue::Media(path)) | Some(FieldValue::Text(path)) => path.clone(),
                    _ => return Ok(String::new()),
                };
                Ok(self.render_media(node, &stored))
            }
            FieldKind::Primitive => {
                let Some(value) = self.value_of(record, &field) else {
                    return Ok(String::new());
                };
                Ok(wrap("span", &node.class_name(), &self.render_value(node, value)))
            }
        }
    }

    /// Value at the end of a resolved path, following an embedded record for sub-fields
    fn value_of<'r>(&'r self, record: &'r Record, field: &ResolvedField) -> Option<&'r FieldValue> {
        let value = record.value(&field.field().key)?;
        let Some(sub) = field.sub_field() else {
            return Some(value);
        };
        let id = value.record_ids().into_iter().next()?;
        self.visible_record(&id)?.value(&sub.key)
    }

    fn visible_record(&self, id: &RecordId) -> Option<&'a Record> {
        if !filter::is_visible_with_owners(self.source, id, self.ctx.publication.as_ref()) {
            return None;
        }
        self.source.record(id)
    }

    /// Visible (and, for typed collections with a list filter, selected) item ids
    fn collection_items(
        &self,
        node: &ConfigNode,
        record: &Record,
        field: &ResolvedField,
    ) -> Result<Vec<RecordId>> {
        let Some(value) = self.value_of(record, field) else {
            return Ok(Vec::new());
        };
        let type_field = field
            .target()
            .def
            .typed_by
            .as_deref()
            .filter(|_| node.list_filter().is_some());

        let mut items = Vec::new();
        for id in value.record_ids() {
            let Some(item) = self.visible_record(&id) else {
                continue;
            };
            if let Some(type_field) = type_field {
                if !filter::is_item_selected(node, item, type_field)? {
                    continue;
                }
            }
            items.push(id);
        }
        Ok(items)
    }

    fn render_items(
        &self,
        node: &ConfigNode,
        items: &[RecordId],
        number: Option<&SenseNumber>,
    ) -> Result<String> {
        let class = node.class_name();
        let item_class = class_name::item_class(&class);
        let tag = block_tag(node.items_in_paragraphs());
        let has_children = !self.view.children_of(node).is_empty();

        let paragraphs = node.paragraph_options();

        let mut out = String::new();
        for (index, id) in items.iter().enumerate() {
            let Some(item) = self.source.record(id) else {
                continue;
            };
            let inner = if has_children {
                self.render_children(node, item, number, None)?
            } else {
                self.display_span(Some("headword"), id)
            };
            let block_class = match paragraphs.and_then(|p| p.style_for(index)) {
                Some(style) => format!("{} {}", item_class, style),
                None => item_class.clone(),
            };
            out.push_str(&wrap(tag, &block_class, &inner));
        }
        Ok(wrap("span", &class, &out))
    }

    fn render_senses(
        &self,
        node: &ConfigNode,
        senses: &[RecordId],
        parent: Option<&SenseNumber>,
    ) -> Result<String> {
        let Some(options) = node.sense_options() else {
            return self.render_items(node, senses, parent);
        };
        let numbers = numbering::number_siblings(self, senses, node, parent);

        let gram_node = self
            .view
            .children_of(node)
            .iter()
            .find(|c| c.enabled && c.field.selector() == GRAMMATICAL_INFO_FIELD);

        let mut out = String::new();
        let mut shared = None;
        if let (true, Some(gram)) = (options.show_shared_grammar_info_first, gram_node) {
            if let Some(fragment) = self.shared_fragment(gram, senses)? {
                out.push_str(&wrap("span", "sharedgrammaticalinfo", &fragment));
                shared = Some(gram);
            }
        }

        let tag = block_tag(options.display_each_in_paragraph);
        for (id, number) in senses.iter().zip(&numbers) {
            let Some(sense) = self.source.record(id) else {
                continue;
            };
            let mut content = String::new();
            if let Some(number) = number.as_ref().filter(|n| !n.display.is_empty()) {
                let text = format!("{}{}{}", options.before_number, number.display, options.after_number);
                content.push_str(&self.analysis_span(Some("sensenumber"), &text));
            }
            let body = self.render_children(node, sense, number.as_ref(), shared)?;
            content.push_str(&format!(
                "<span class=\"sense\" id=\"{}\">{}</span>",
                html_escape(&id.anchor()),
                body
            ));
            out.push_str(&wrap(tag, "sensecontent", &content));
        }
        Ok(wrap("span", &node.class_name(), &out))
    }

    /// The grammatical-info fragment when every sense renders the same non-empty one
    fn shared_fragment(&self, gram: &ConfigNode, senses: &[RecordId]) -> Result<Option<String>> {
        let mut fragments = Vec::with_capacity(senses.len());
        for id in senses {
            let Some(sense) = self.source.record(id) else {
                continue;
            };
            fragments.push(self.render_node(gram, sense, None)?);
        }
        let Some(first) = fragments.first() else {
            return Ok(None);
        };
        if first.is_empty() || fragments.iter().any(|f| f != first) {
            return Ok(None);
        }
        Ok(Some(first.clone()))
    }

    fn render_relations(&self, node: &ConfigNode, record: &Record) -> Result<String> {
        let groups = relations::order_relations(
            self.source,
            &record.id,
            node,
            self.ctx.publication.as_ref(),
            |id| self.display_form(id).text,
        )?;
        if groups.is_empty() {
            return Ok(String::new());
        }

        let class = node.class_name();
        let item_class = class_name::item_class(&class);
        let tag = block_tag(node.items_in_paragraphs());
        let children = self.view.children_of(node);

        let mut out = String::new();
        for group in &groups {
            let inner = if children.is_empty() {
                let label = self.analysis_span(Some("ownertype_abbreviation"), group.abbreviation());
                label + &self.render_targets(None, group)?
            } else {
                let mut inner = String::new();
                for child in children.iter().filter(|c| c.enabled) {
                    match child.field.selector() {
                        OWNER_TYPE_FIELD => {
                            let text = match child.sub_field.as_deref() {
                                Some("Abbreviation") => group.abbreviation(),
                                _ => group.name(),
                            };
                            inner.push_str(&self.analysis_span(Some(&child.class_name()), text));
                        }
                        TARGETS_FIELD => inner.push_str(&self.render_targets(Some(child), group)?),
                        other => {
                            tracing::debug!("Relation node has unsupported child '{}'", other)
                        }
                    }
                }
                inner
            };
            if !inner.is_empty() {
                out.push_str(&wrap(tag, &item_class, &inner));
            }
        }
        Ok(wrap("span", &class, &out))
    }

    fn render_targets(&self, node: Option<&ConfigNode>, group: &RelationGroup) -> Result<String> {
        let class = node
            .map(|n| n.class_name())
            .unwrap_or_else(|| "targets".to_string());
        let children = node.map(|n| self.view.children_of(n)).unwrap_or_default();

        let mut out = String::new();
        for id in &group.targets {
            let Some(target) = self.source.record(id) else {
                continue;
            };
            let content = match node {
                Some(n) if !children.is_empty() => self.render_children(n, target, None, None)?,
                _ => self.display_span(Some("headword"), id),
            };
            out.push_str(&format!(
                "<span class=\"target\"><a href=\"#{}\">{}</a></span>",
                html_escape(&id.anchor()),
                content
            ));
        }
        Ok(wrap("span", &class, &out))
    }

    fn render_media(&self, node: &ConfigNode, stored: &str) -> String {
        let rel = match self.media {
            Some(media) => media.publish(&self.ctx.media_source(stored)),
            None => stored.replace('\\', "/"),
        };
        let class = html_escape(&node.class_name());
        let src = html_escape(&rel);

        match MediaKind::from_path(&rel) {
            MediaKind::Image => {
                let style = node
                    .picture_options()
                    .and_then(|p| p.maximum_width.as_deref())
                    .map(|w| format!(" style=\"max-width: {}\"", html_escape(w)))
                    .unwrap_or_default();
                format!("<img class=\"{}\" src=\"{}\" alt=\"\"{} />", class, src, style)
            }
            kind @ (MediaKind::Audio | MediaKind::Video) => {
                let element = if kind == MediaKind::Audio { "audio" } else { "video" };
                let mime = MediaKind::mime(&rel)
                    .map(|m| format!(" type=\"{}\"", m))
                    .unwrap_or_default();
                format!(
                    "<{el} class=\"{}\" controls=\"controls\" preload=\"none\"><source src=\"{}\"{} /></{el}>",
                    class,
                    src,
                    mime,
                    el = element
                )
            }
            MediaKind::Other => {
                let name = rel.rsplit('/').next().unwrap_or(&rel);
                format!(
                    "<a class=\"{}\" href=\"{}\">{}</a>",
                    class,
                    src,
                    self.analysis_span(None, name)
                )
            }
        }
    }

    /// Text leaves for a primitive value
    fn render_value(&self, node: &ConfigNode, value: &FieldValue) -> String {
        match value {
            FieldValue::MultiString(alternatives) => match node.writing_systems() {
                Some(options) => {
                    let mut out = String::new();
                    for ws in options.enabled_ids().map(|id| self.ctx.resolve_ws(id)) {
                        let Some(text) = alternatives.get(ws).filter(|t| !t.is_empty()) else {
                            continue;
                        };
                        if options.display_abbreviation {
                            let abbreviation = self
                                .ctx
                                .writing_system(ws)
                                .map(|w| w.display_abbreviation())
                                .unwrap_or(ws);
                            out.push_str(&self.analysis_span(Some("writingsystemprefix"), abbreviation));
                        }
                        out.push_str(&text_span(None, ws, self.ctx.direction(ws), text));
                    }
                    out
                }
                None => self
                    .ctx
                    .fallbacks_for(node.sub_field.as_deref().unwrap_or(node.field.selector()))
                    .into_iter()
                    .find_map(|ws| alternatives.get_key_value(ws).filter(|(_, t)| !t.is_empty()))
                    .or_else(|| alternatives.iter().find(|(_, t)| !t.is_empty()))
                    .map(|(ws, text)| text_span(None, ws, self.ctx.direction(ws), text))
                    .unwrap_or_default(),
            },
            FieldValue::Text(text) if !text.is_empty() => self.analysis_span(None, text),
            FieldValue::Text(_) => String::new(),
            FieldValue::Integer(n) => self.analysis_span(None, &n.to_string()),
            FieldValue::Boolean(true) => self.analysis_span(None, &node.label),
            FieldValue::Boolean(false) => String::new(),
            FieldValue::Strings(items) => items
                .iter()
                .filter(|s| !s.is_empty())
                .map(|s| self.analysis_span(None, s))
                .collect(),
            FieldValue::Record(_) | FieldValue::Records(_) => value
                .record_ids()
                .iter()
                .filter(|id| self.visible_record(id).is_some())
                .map(|id| self.display_span(None, id))
                .collect(),
            FieldValue::Media(_) => String::new(),
        }
    }

    fn analysis_span(&self, class: Option<&str>, text: &str) -> String {
        let ws = &self.ctx.default_analysis;
        text_span(class, ws, self.ctx.direction(ws), text)
    }

    fn display_form(&self, id: &RecordId) -> DisplayForm {
        let fallbacks = self.ctx.vernacular_fallbacks();
        self.source
            .display_form(id, &self.ctx.default_vernacular, &fallbacks)
    }

    /// Display form of `id`, tagged with the writing system it was found in
    fn display_span(&self, class: Option<&str>, id: &RecordId) -> String {
        let form = self.display_form(id);
        let ws = form
            .writing_system
            .as_deref()
            .unwrap_or(&self.ctx.default_vernacular);
        text_span(class, ws, self.ctx.direction(ws), &form.text)
    }
}

impl<'a, S: RecordSource + ?Sized> SenseLevels for DocumentWriter<'a, S> {
    fn sub_level<'n>(&'n self, sense: &RecordId, node: &'n ConfigNode) -> Option<(&'n ConfigNode, Vec<RecordId>)> {
        let record = self.visible_record(sense)?;
        let sub = self
            .view
            .children_of(node)
            .iter()
            .find(|c| c.enabled && c.sense_options().is_some())?;
        let Resolution::Resolved(field) = self.table.resolve_node(sub, &record.class) else {
            return None;
        };
        let items = self.collection_items(sub, record, &field).ok()?;
        Some((sub, items))
    }
}

/// Element used for collection items: blocks when shown one per paragraph
fn block_tag(paragraphs: bool) -> &'static str {
    if paragraphs {
        "div"
    } else {
        "span"
    }
}

/// Wrap `inner` in a classed element; nothing to wrap means no element at all
fn wrap(tag: &str, class: &str, inner: &str) -> String {
    if inner.is_empty() {
        return String::new();
    }
    format!("<{tag} class=\"{}\">{inner}</{tag}>", html_escape(class))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{RecordGraph, Relation, RelationKind, RelationType};
    use crate::schema::{ClassDef, FieldDef, Schema};
    use crate::view::{
        ListFilterOptions, NodeOptions, SenseOptions, WritingSystemOptions,
    };
    use dictgen_types::WritingSystem;
    use std::collections::BTreeMap;

    fn schema() -> Schema {
        Schema::new(vec![
            ClassDef::new("LexEntry")
                .field("HeadWord", ValueType::MultiString)
                .field("Senses", ValueType::Collection("LexSense".into()))
                .field("Relations", ValueType::Relations)
                .field("Photo", ValueType::Media)
                .with_field(
                    FieldDef::new("Variants", ValueType::Collection("Variant".into()))
                        .typed_by("Types"),
                ),
            ClassDef::new("LexSense")
                .field("Gloss", ValueType::MultiString)
                .field("MorphoSyntaxAnalysis", ValueType::Object("Msa".into()))
                .field("Senses", ValueType::Collection("LexSense".into())),
            ClassDef::new("Msa").field("PartOfSpeech", ValueType::MultiString),
            ClassDef::new("Variant")
                .field("Form", ValueType::MultiString)
                .field("Types", ValueType::StringList),
        ])
    }

    fn ctx() -> GeneratorContext {
        GeneratorContext::new("out").with_writing_systems(
            vec![
                WritingSystem::new("fr"),
                WritingSystem {
                    abbreviation: Some("Eng".into()),
                    ..WritingSystem::new("en")
                },
            ],
            "fr",
            "en",
        )
    }

    fn gloss_node() -> ConfigNode {
        ConfigNode::new("Gloss")
            .with_options(NodeOptions::WritingSystems(WritingSystemOptions::new(&["analysis"])))
    }

    fn view(children: Vec<ConfigNode>) -> ViewConfig {
        ViewConfig::new(ConfigNode::new("LexEntry").with_children(children), BTreeMap::new()).unwrap()
    }

    fn render(graph: &RecordGraph, view: &ViewConfig, ctx: &GeneratorContext, id: &str) -> Result<String> {
        let table = CapabilityTable::build(&graph.schema).unwrap();
        DocumentWriter::new(graph, view, &table, ctx).generate_entry(&RecordId::new(id))
    }

    fn chat() -> RecordGraph {
        let mut g = RecordGraph::new(schema());
        g.insert_record(
            Record::new("e1", "LexEntry")
                .with("HeadWord", FieldValue::multi(&[("fr", "chat")]))
                .with("Senses", FieldValue::records(&["s1", "s2"])),
        )
        .unwrap();
        g.insert_record(
            Record::new("s1", "LexSense")
                .owned_by("e1")
                .with("Gloss", FieldValue::multi(&[("en", "cat")])),
        )
        .unwrap();
        g.insert_record(
            Record::new("s2", "LexSense")
                .owned_by("e1")
                .with("Gloss", FieldValue::multi(&[("en", "tomcat")])),
        )
        .unwrap();
        g
    }

    #[test]
    fn test_headword_with_lang_and_dir() {
        let g = chat();
        let v = view(vec![ConfigNode::new("HeadWord").with_options(NodeOptions::WritingSystems(
            WritingSystemOptions::new(&["vernacular"]),
        ))]);
        let html = render(&g, &v, &ctx(), "e1").unwrap();
        assert_eq!(
            html,
            "<div class=\"lexentry\" id=\"ge1\"><span class=\"headword\"><span lang=\"fr\" dir=\"ltr\">chat</span></span></div>"
        );
    }

    #[test]
    fn test_writing_system_abbreviation_prefix() {
        let g = chat();
        let mut options = WritingSystemOptions::new(&["en"]);
        options.display_abbreviation = true;
        let senses = ConfigNode::new("Senses")
            .with_children(vec![ConfigNode::new("Gloss").with_options(NodeOptions::WritingSystems(options))]);
        let html = render(&g, &view(vec![senses]), &ctx(), "e1").unwrap();
        assert!(html.contains(
            "<span class=\"writingsystemprefix\" lang=\"en\" dir=\"ltr\">Eng</span><span lang=\"en\" dir=\"ltr\">cat</span>"
        ));
    }

    #[test]
    fn test_numbered_senses() {
        let g = chat();
        let senses = ConfigNode::new("Senses")
            .with_options(NodeOptions::Senses(SenseOptions::numbered("%d")))
            .with_children(vec![gloss_node()]);
        let html = render(&g, &view(vec![senses]), &ctx(), "e1").unwrap();
        assert!(html.contains("<span class=\"sensenumber\" lang=\"en\" dir=\"ltr\">1</span><span class=\"sense\" id=\"gs1\">"));
        assert!(html.contains("<span class=\"sensenumber\" lang=\"en\" dir=\"ltr\">2</span><span class=\"sense\" id=\"gs2\">"));
    }

    #[test]
    fn test_unresolvable_root_is_error() {
        let mut g = chat();
        g.insert_record(Record::new("m1", "Msa")).unwrap();
        let err = render(&g, &view(vec![]), &ctx(), "m1").unwrap_err();
        assert_eq!(
            err,
            GenerateError::UnresolvableRoot {
                selector: "LexEntry".into(),
                class: "Msa".into()
            }
        );
    }

    #[test]
    fn test_invalid_and_disabled_nodes_are_silent() {
        let g = chat();
        let v = view(vec![
            ConfigNode::new("NoSuchField"),
            ConfigNode::new("HeadWord").disabled(),
            ConfigNode::new("Photo"),
        ]);
        let html = render(&g, &v, &ctx(), "e1").unwrap();
        assert_eq!(html, "<div class=\"lexentry\" id=\"ge1\"></div>");
    }

    #[test]
    fn test_excluded_sense_hidden_in_publication() {
        let mut g = RecordGraph::new(schema());
        g.insert_record(
            Record::new("e1", "LexEntry").with("Senses", FieldValue::records(&["s1", "s2"])),
        )
        .unwrap();
        g.insert_record(
            Record::new("s1", "LexSense")
                .owned_by("e1")
                .with("Gloss", FieldValue::multi(&[("en", "visible")])),
        )
        .unwrap();
        g.insert_record(
            Record::new("s2", "LexSense")
                .owned_by("e1")
                .excluded_from("kids")
                .with("Gloss", FieldValue::multi(&[("en", "rude")])),
        )
        .unwrap();
        let senses = ConfigNode::new("Senses")
            .with_options(NodeOptions::Senses(SenseOptions::numbered("%d")))
            .with_children(vec![gloss_node()]);
        let v = view(vec![senses]);

        let scoped = ctx().with_publication("kids");
        let html = render(&g, &v, &scoped, "e1").unwrap();
        assert!(html.contains("visible"));
        assert!(!html.contains("rude"));
        assert!(!html.contains("gs2"));
        // the only remaining sense is no longer numbered
        assert!(!html.contains("sensenumber"));

        let html = render(&g, &v, &ctx(), "e1").unwrap();
        assert!(html.contains("rude"));
    }

    #[test]
    fn test_shared_grammatical_info() {
        let mut g = RecordGraph::new(schema());
        g.insert_record(
            Record::new("e1", "LexEntry").with("Senses", FieldValue::records(&["s1", "s2"])),
        )
        .unwrap();
        g.insert_record(
            Record::new("m", "Msa").with("PartOfSpeech", FieldValue::multi(&[("en", "n")])),
        )
        .unwrap();
        for id in ["s1", "s2"] {
            g.insert_record(
                Record::new(id, "LexSense")
                    .owned_by("e1")
                    .with("MorphoSyntaxAnalysis", FieldValue::Record(RecordId::new("m"))),
            )
            .unwrap();
        }

        let mut options = SenseOptions::numbered("%d");
        options.show_shared_grammar_info_first = true;
        let senses = ConfigNode::new("Senses")
            .with_options(NodeOptions::Senses(options))
            .with_children(vec![ConfigNode::new("MorphoSyntaxAnalysis")
                .with_children(vec![ConfigNode::new("PartOfSpeech")])]);
        let html = render(&g, &view(vec![senses]), &ctx(), "e1").unwrap();

        assert_eq!(html.matches("sharedgrammaticalinfo").count(), 1);
        assert_eq!(html.matches(">n</span>").count(), 1);
    }

    #[test]
    fn test_relations_require_list_filter() {
        let mut g = chat();
        g.insert_record(
            Record::new("e2", "LexEntry").with("HeadWord", FieldValue::multi(&[("fr", "minet")])),
        )
        .unwrap();
        g.add_relation_type(RelationType::new("syn", "Synonym", RelationKind::Collection));
        g.add_relation(Relation::new("r1", "syn", &["e1", "e2"])).unwrap();

        let err = render(&g, &view(vec![ConfigNode::new("Relations")]), &ctx(), "e1").unwrap_err();
        assert_eq!(
            err,
            GenerateError::MissingListFilter {
                selector: "Relations".into()
            }
        );

        let relations = ConfigNode::new("Relations")
            .with_options(NodeOptions::ListFilter(ListFilterOptions::new(&["syn"])))
            .with_children(vec![
                ConfigNode::new("OwnerType").with_sub_field("Name"),
                ConfigNode::new("Targets"),
            ]);
        let html = render(&g, &view(vec![relations]), &ctx(), "e1").unwrap();
        assert!(html.contains("<span class=\"ownertype_name\" lang=\"en\" dir=\"ltr\">Synonym</span>"));
        assert!(html.contains("<a href=\"#ge2\"><span class=\"headword\" lang=\"fr\" dir=\"ltr\">minet</span></a>"));
    }

    #[test]
    fn test_typed_collection_filtered() {
        let mut g = RecordGraph::new(schema());
        g.insert_record(
            Record::new("e1", "LexEntry").with("Variants", FieldValue::records(&["v1", "v2"])),
        )
        .unwrap();
        g.insert_record(
            Record::new("v1", "Variant")
                .with("Form", FieldValue::multi(&[("fr", "chatte")]))
                .with("Types", FieldValue::records(&["spelling"])),
        )
        .unwrap();
        g.insert_record(
            Record::new("v2", "Variant")
                .with("Form", FieldValue::multi(&[("fr", "tchat")]))
                .with("Types", FieldValue::records(&["dialect"])),
        )
        .unwrap();
        let variants = ConfigNode::new("Variants")
            .with_options(NodeOptions::ListFilter(ListFilterOptions::new(&["spelling"])))
            .with_children(vec![ConfigNode::new("Form")]);
        let html = render(&g, &view(vec![variants]), &ctx(), "e1").unwrap();
        assert!(html.contains("chatte"));
        assert!(!html.contains("tchat"));
        assert!(html.contains("<span class=\"variant\">"));
    }

    #[test]
    fn test_targets_use_vernacular_headword_and_its_tag() {
        let mut g = chat();
        g.insert_record(
            Record::new("e2", "LexEntry")
                .with("HeadWord", FieldValue::multi(&[("en", "tomcat"), ("fr", "matou")])),
        )
        .unwrap();
        g.insert_record(
            Record::new("e3", "LexEntry").with("HeadWord", FieldValue::multi(&[("en", "bigcat")])),
        )
        .unwrap();
        g.add_relation_type(RelationType::new("syn", "Synonym", RelationKind::Collection));
        g.add_relation(Relation::new("r1", "syn", &["e1", "e2", "e3"])).unwrap();

        let relations = ConfigNode::new("Relations")
            .with_options(NodeOptions::ListFilter(ListFilterOptions::new(&["syn"])));
        let html = render(&g, &view(vec![relations]), &ctx(), "e1").unwrap();
        assert!(html.contains("<a href=\"#ge2\"><span class=\"headword\" lang=\"fr\" dir=\"ltr\">matou</span></a>"));
        assert!(!html.contains("tomcat"));
        // no vernacular form: the analysis text keeps its own tag
        assert!(html.contains("<a href=\"#ge3\"><span class=\"headword\" lang=\"en\" dir=\"ltr\">bigcat</span></a>"));
    }

    #[test]
    fn test_unconfigured_writing_system_fallback_depends_on_field() {
        let mut g = RecordGraph::new(schema());
        g.insert_record(
            Record::new("e1", "LexEntry")
                .with("HeadWord", FieldValue::multi(&[("en", "cat"), ("fr", "chat")]))
                .with("Senses", FieldValue::records(&["s1"])),
        )
        .unwrap();
        g.insert_record(
            Record::new("s1", "LexSense")
                .owned_by("e1")
                .with("Gloss", FieldValue::multi(&[("en", "cat"), ("fr", "chat")])),
        )
        .unwrap();
        let v = view(vec![
            ConfigNode::new("HeadWord"),
            ConfigNode::new("Senses").with_children(vec![ConfigNode::new("Gloss")]),
        ]);
        let html = render(&g, &v, &ctx(), "e1").unwrap();
        assert!(html.contains("<span class=\"headword\"><span lang=\"fr\" dir=\"ltr\">chat</span></span>"));
        assert!(html.contains("<span class=\"gloss\"><span lang=\"en\" dir=\"ltr\">cat</span></span>"));
    }

    #[test]
    fn test_paragraph_styles_on_item_blocks() {
        let g = chat();
        let senses = ConfigNode::new("Senses")
            .with_options(NodeOptions::Paragraph(crate::view::ParagraphOptions {
                paragraph_style: Some("Dictionary-Normal".into()),
                continuation_style: Some("Dictionary-Continuation".into()),
            }))
            .with_children(vec![gloss_node()]);
        let html = render(&g, &view(vec![senses]), &ctx(), "e1").unwrap();
        let first = html.find("<div class=\"sense Dictionary-Normal\">").unwrap();
        let second = html.find("<div class=\"sense Dictionary-Continuation\">").unwrap();
        assert!(first < second);
        assert!(html[first..second].contains(">cat<"));
    }

    #[test]
    fn test_backslash_media_path_published() {
        let root = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(root.path().join("pics")).unwrap();
        std::fs::write(root.path().join("pics/cat.jpg"), b"jpeg").unwrap();

        let mut g = RecordGraph::new(schema());
        g.insert_record(
            Record::new("e1", "LexEntry").with("Photo", FieldValue::Media("pics\\cat.jpg".into())),
        )
        .unwrap();
        let v = view(vec![ConfigNode::new("Photo")]);
        let c = ctx().with_media(Some(root.path().to_path_buf()), false);
        let table = CapabilityTable::build(&g.schema).unwrap();
        let publisher = MediaPublisher::new(out.path());

        let html = DocumentWriter::new(&g, &v, &table, &c)
            .with_media(&publisher)
            .generate_entry(&RecordId::new("e1"))
            .unwrap();
        assert!(html.contains("<img class=\"photo\" src=\"media/cat.jpg\" alt=\"\" />"));
        assert_eq!(std::fs::read(out.path().join("media/cat.jpg")).unwrap(), b"jpeg");
    }

    #[test]
    fn test_media_linked_without_publisher() {
        let mut g = RecordGraph::new(schema());
        g.insert_record(
            Record::new("e1", "LexEntry").with("Photo", FieldValue::Media("pics\\cat.jpg".into())),
        )
        .unwrap();
        let photo = ConfigNode::new("Photo").with_options(NodeOptions::Picture(
            crate::view::PictureOptions {
                maximum_width: Some("1in".into()),
            },
        ));
        let html = render(&g, &view(vec![photo]), &ctx(), "e1").unwrap();
        assert!(html.contains("<img class=\"photo\" src=\"pics/cat.jpg\" alt=\"\" style=\"max-width: 1in\" />"));
    }

    #[test]
    fn test_grouping_wraps_children() {
        let g = chat();
        let group = ConfigNode::grouping("Main Line").with_children(vec![ConfigNode::new("HeadWord")]);
        let html = render(&g, &view(vec![group]), &ctx(), "e1").unwrap();
        assert!(html.contains("<span class=\"grouping_main-line\"><span class=\"headword\">"));

        let empty = ConfigNode::grouping("Nothing").with_children(vec![ConfigNode::new("Photo")]);
        let html = render(&g, &view(vec![empty]), &ctx(), "e1").unwrap();
        assert!(!html.contains("grouping_nothing"));
    }
}
