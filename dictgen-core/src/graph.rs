//! Record graph: the read-only set of linked records the generator renders.
//!
//! The generator only talks to the [`RecordSource`] trait. [`RecordGraph`] is
//! the in-memory implementation, loadable from JSON.

use crate::schema::Schema;
use crate::view::FieldRef;
use dictgen_types::{PublicationId, RecordId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GraphError {
    #[error("Failed to read record graph: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse record graph JSON: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("Duplicate record id: {0}")]
    DuplicateRecord(RecordId),

    #[error("Relation '{relation}' uses unknown relation type '{relation_type}'")]
    UnknownRelationType {
        relation: String,
        relation_type: String,
    },
}

/// Field used for display forms and the default sort key
pub const HEADWORD_FIELD: &str = "HeadWord";

/// A stored field value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldValue {
    Text(String),
    Integer(i64),
    Boolean(bool),
    /// Writing-system id -> text
    MultiString(BTreeMap<String, String>),
    Strings(Vec<String>),
    Record(RecordId),
    Records(Vec<RecordId>),
    Media(String),
}

impl FieldValue {
    pub fn multi(alternatives: &[(&str, &str)]) -> Self {
        FieldValue::MultiString(
            alternatives
                .iter()
                .map(|(ws, text)| (ws.to_string(), text.to_string()))
                .collect(),
        )
    }

    pub fn text(text: impl Into<String>) -> Self {
        FieldValue::Text(text.into())
    }

    pub fn records(ids: &[&str]) -> Self {
        FieldValue::Records(ids.iter().map(|id| RecordId::new(*id)).collect())
    }

    /// Record ids held by this value, if it is a reference of any arity
    pub fn record_ids(&self) -> Vec<RecordId> {
        match self {
            FieldValue::Record(id) => vec![id.clone()],
            FieldValue::Records(ids) => ids.clone(),
            _ => Vec::new(),
        }
    }

    /// Text in `ws`, else in the first fallback that has any, else any alternative
    pub fn text_in<'a>(&'a self, ws: &str, fallbacks: &[&str]) -> Option<&'a str> {
        self.alternative_in(ws, fallbacks).map(|(_, text)| text)
    }

    /// Like [`FieldValue::text_in`], also returning the writing system the text
    /// came from (`None` for plain text)
    pub fn alternative_in<'a>(&'a self, ws: &str, fallbacks: &[&str]) -> Option<(Option<&'a str>, &'a str)> {
        match self {
            FieldValue::Text(text) => Some((None, text.as_str())),
            FieldValue::MultiString(alts) => std::iter::once(ws)
                .chain(fallbacks.iter().copied())
                .find_map(|w| alts.get_key_value(w).filter(|(_, t)| !t.is_empty()))
                .or_else(|| alts.iter().find(|(_, t)| !t.is_empty()))
                .map(|(w, t)| (Some(w.as_str()), t.as_str())),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: RecordId,

    pub class: String,

    /// Owning record (entry for a sense, sense for a sub-sense, ...)
    #[serde(default)]
    pub owner: Option<RecordId>,

    #[serde(default)]
    pub fields: BTreeMap<String, FieldValue>,

    /// Custom field values keyed by custom field id
    #[serde(default)]
    pub custom: BTreeMap<String, FieldValue>,

    /// Publications this record must not appear in
    #[serde(default)]
    pub excluded_from: BTreeSet<PublicationId>,
}

impl Record {
    pub fn new(id: impl Into<String>, class: impl Into<String>) -> Self {
        Self {
            id: RecordId::new(id),
            class: class.into(),
            owner: None,
            fields: BTreeMap::new(),
            custom: BTreeMap::new(),
            excluded_from: BTreeSet::new(),
        }
    }

    pub fn owned_by(mut self, owner: impl Into<String>) -> Self {
        self.owner = Some(RecordId::new(owner));
        self
    }

    pub fn with(mut self, field: &str, value: FieldValue) -> Self {
        self.fields.insert(field.to_string(), value);
        self
    }

    pub fn with_custom(mut self, id: &str, value: FieldValue) -> Self {
        self.custom.insert(id.to_string(), value);
        self
    }

    pub fn excluded_from(mut self, publication: &str) -> Self {
        self.excluded_from.insert(PublicationId::new(publication));
        self
    }

    pub fn value(&self, key: &FieldRef) -> Option<&FieldValue> {
        match key {
            FieldRef::Known(name) => self.fields.get(name),
            FieldRef::Custom { custom } => self.custom.get(custom),
        }
    }
}

/// Shape of a relation type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    /// Unordered set, same label from every member
    Collection,
    Pair,
    /// Ordered set; authored order is kept
    Sequence,
    /// First target is the head, viewed forward; the other is viewed reverse
    AsymmetricPair,
    /// First target is the whole, the rest are parts
    Tree,
    Unidirectional,
}

impl RelationKind {
    pub fn is_directional(&self) -> bool {
        matches!(
            self,
            RelationKind::AsymmetricPair | RelationKind::Tree | RelationKind::Unidirectional
        )
    }

    pub fn is_sequence(&self) -> bool {
        matches!(self, RelationKind::Sequence)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationType {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub abbreviation: Option<String>,
    #[serde(default)]
    pub reverse_name: Option<String>,
    #[serde(default)]
    pub reverse_abbreviation: Option<String>,
    pub kind: RelationKind,
}

impl RelationType {
    pub fn new(id: &str, name: &str, kind: RelationKind) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            abbreviation: None,
            reverse_name: None,
            reverse_abbreviation: None,
            kind,
        }
    }

    pub fn with_reverse(mut self, reverse_name: &str) -> Self {
        self.reverse_name = Some(reverse_name.to_string());
        self
    }

    pub fn with_abbreviations(mut self, forward: &str, reverse: Option<&str>) -> Self {
        self.abbreviation = Some(forward.to_string());
        self.reverse_abbreviation = reverse.map(|r| r.to_string());
        self
    }
}

/// One stored relation instance between two or more records
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relation {
    pub id: String,
    pub relation_type: String,
    /// For directional kinds the first target is the head
    pub targets: Vec<RecordId>,
}

impl Relation {
    pub fn new(id: &str, relation_type: &str, targets: &[&str]) -> Self {
        Self {
            id: id.to_string(),
            relation_type: relation_type.to_string(),
            targets: targets.iter().map(|t| RecordId::new(*t)).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Publication {
    pub id: PublicationId,
    #[serde(default)]
    pub name: String,
}

/// Read access to a record graph
pub trait RecordSource {
    fn schema(&self) -> &Schema;

    fn record(&self, id: &RecordId) -> Option<&Record>;

    /// Relation instances that list `id` among their targets
    fn relations_of(&self, id: &RecordId) -> Vec<&Relation>;

    fn relation_type(&self, id: &str) -> Option<&RelationType>;

    /// Whether the record carries an exclusion naming `publication`
    fn is_excluded(&self, id: &RecordId, publication: &PublicationId) -> bool {
        self.record(id)
            .map(|r| r.excluded_from.contains(publication))
            .unwrap_or(false)
    }

    fn owner(&self, id: &RecordId) -> Option<&Record> {
        self.record(id)
            .and_then(|r| r.owner.as_ref())
            .and_then(|owner| self.record(owner))
    }

    /// Canonical display form: the record's headword in `ws` (or the first
    /// fallback that has one), else its owner's, else the record id
    fn display_form(&self, id: &RecordId, ws: &str, fallbacks: &[&str]) -> DisplayForm {
        let mut current = self.record(id);
        while let Some(record) = current {
            if let Some((found, text)) = record
                .fields
                .get(HEADWORD_FIELD)
                .and_then(|v| v.alternative_in(ws, fallbacks))
            {
                return DisplayForm {
                    text: text.to_string(),
                    writing_system: found.map(str::to_string),
                };
            }
            current = record.owner.as_ref().and_then(|o| self.record(o));
        }
        DisplayForm {
            text: id.to_string(),
            writing_system: None,
        }
    }
}

/// Display text of a record with the writing system it was taken from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayForm {
    pub text: String,
    /// `None` when the text is not tied to a writing system (plain text, record id)
    pub writing_system: Option<String>,
}

/// In-memory record graph
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecordGraph {
    #[serde(default)]
    pub schema: Schema,

    #[serde(default)]
    records: Vec<Record>,

    #[serde(default)]
    relation_types: Vec<RelationType>,

    #[serde(default)]
    relations: Vec<Relation>,

    #[serde(default)]
    pub publications: Vec<Publication>,

    #[serde(skip)]
    by_id: HashMap<RecordId, usize>,

    #[serde(skip)]
    relations_by_target: HashMap<RecordId, Vec<usize>>,
}

impl RecordGraph {
    pub fn new(schema: Schema) -> Self {
        Self {
            schema,
            ..Default::default()
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self, GraphError> {
        let mut graph: RecordGraph = serde_json::from_str(json)?;
        graph.reindex()?;
        tracing::debug!(
            "Loaded record graph: {} records, {} relations",
            graph.records.len(),
            graph.relations.len()
        );
        Ok(graph)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, GraphError> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&contents)
    }

    pub fn insert_record(&mut self, record: Record) -> Result<(), GraphError> {
        if self.by_id.contains_key(&record.id) {
            return Err(GraphError::DuplicateRecord(record.id));
        }
        self.by_id.insert(record.id.clone(), self.records.len());
        self.records.push(record);
        Ok(())
    }

    pub fn add_relation_type(&mut self, relation_type: RelationType) {
        self.relation_types.push(relation_type);
    }

    pub fn add_relation(&mut self, relation: Relation) -> Result<(), GraphError> {
        if !self
            .relation_types
            .iter()
            .any(|t| t.id == relation.relation_type)
        {
            return Err(GraphError::UnknownRelationType {
                relation: relation.id,
                relation_type: relation.relation_type,
            });
        }
        let index = self.relations.len();
        for target in &relation.targets {
            let slots = self.relations_by_target.entry(target.clone()).or_default();
            if !slots.contains(&index) {
                slots.push(index);
            }
        }
        self.relations.push(relation);
        Ok(())
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Ids of all records of exactly `class`, in stored order
    pub fn ids_of_class(&self, class: &str) -> Vec<RecordId> {
        self.records
            .iter()
            .filter(|r| r.class == class)
            .map(|r| r.id.clone())
            .collect()
    }

    fn reindex(&mut self) -> Result<(), GraphError> {
        let records = std::mem::take(&mut self.records);
        let relations = std::mem::take(&mut self.relations);
        self.by_id.clear();
        self.relations_by_target.clear();
        for record in records {
            self.insert_record(record)?;
        }
        for relation in relations {
            self.add_relation(relation)?;
        }
        Ok(())
    }
}

impl RecordSource for RecordGraph {
    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn record(&self, id: &RecordId) -> Option<&Record> {
        self.by_id.get(id).map(|&i| &self.records[i])
    }

    fn relations_of(&self, id: &RecordId) -> Vec<&Relation> {
        self.relations_by_target
            .get(id)
            .map(|slots| slots.iter().map(|&i| &self.relations[i]).collect())
            .unwrap_or_default()
    }

    fn relation_type(&self, id: &str) -> Option<&RelationType> {
        self.relation_types.iter().find(|t| t.id == id)
    }
}
