//! Record schema and the capability table used for field resolution.
//!
//! Classes declare fields and an ordered list of capabilities (supertypes or
//! interfaces). The [`CapabilityTable`] flattens that hierarchy once per schema
//! into a `(class, field) -> declaration` map so resolution never walks the
//! hierarchy at render time.

use crate::view::{ConfigNode, FieldRef, ViewConfig};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchemaError {
    #[error("Class '{class}' lists unknown capability '{capability}'")]
    UnknownCapability { class: String, capability: String },

    #[error("Custom field '{id}' is declared on unknown class '{class}'")]
    UnknownCustomFieldClass { id: String, class: String },

    #[error("Class '{0}' is declared more than once")]
    DuplicateClass(String),
}

/// Declared type of a field value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "class", rename_all = "snake_case")]
pub enum ValueType {
    String,
    Integer,
    Boolean,
    /// Text with one alternative per writing system
    MultiString,
    StringList,
    /// Single owned or referenced record of the given class
    Object(String),
    /// Ordered records of the given class
    Collection(String),
    /// Relation instances touching the owning record (computed, not stored)
    Relations,
    /// Path of a media file
    Media,
}

impl ValueType {
    pub fn is_enumerable(&self) -> bool {
        matches!(
            self,
            ValueType::String
                | ValueType::MultiString
                | ValueType::StringList
                | ValueType::Collection(_)
                | ValueType::Relations
        )
    }

    pub fn is_text_like(&self) -> bool {
        matches!(self, ValueType::String | ValueType::MultiString)
    }

    /// Class of the record(s) this value leads to
    pub fn result_class(&self) -> Option<&str> {
        match self {
            ValueType::Object(class) | ValueType::Collection(class) => Some(class),
            _ => None,
        }
    }

    pub fn kind(&self) -> FieldKind {
        match self {
            ValueType::Media => FieldKind::MediaReference,
            ValueType::Object(_) => FieldKind::EmbeddedRecord,
            t if t.is_enumerable() && !t.is_text_like() => FieldKind::Collection,
            _ => FieldKind::Primitive,
        }
    }
}

/// Classification of a resolved field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Primitive,
    EmbeddedRecord,
    Collection,
    MediaReference,
    Invalid,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,

    pub value: ValueType,

    /// Field on each collection item carrying its type reference(s), used by list filters
    #[serde(default)]
    pub typed_by: Option<String>,
}

impl FieldDef {
    pub fn new(name: impl Into<String>, value: ValueType) -> Self {
        Self {
            name: name.into(),
            value,
            typed_by: None,
        }
    }

    pub fn typed_by(mut self, field: impl Into<String>) -> Self {
        self.typed_by = Some(field.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassDef {
    pub name: String,

    /// Capabilities in precedence order
    #[serde(default)]
    pub capabilities: Vec<String>,

    #[serde(default)]
    pub fields: Vec<FieldDef>,
}

impl ClassDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            capabilities: Vec::new(),
            fields: Vec::new(),
        }
    }

    pub fn with_capabilities(mut self, capabilities: &[&str]) -> Self {
        self.capabilities = capabilities.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn field(mut self, name: &str, value: ValueType) -> Self {
        self.fields.push(FieldDef::new(name, value));
        self
    }

    pub fn with_field(mut self, field: FieldDef) -> Self {
        self.fields.push(field);
        self
    }
}

/// A user-defined field; carries its own value type instead of being inferred by name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomFieldDef {
    pub id: String,
    pub class: String,
    #[serde(default)]
    pub label: String,
    pub value: ValueType,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    #[serde(default)]
    pub classes: Vec<ClassDef>,

    #[serde(default)]
    pub custom_fields: Vec<CustomFieldDef>,
}

impl Schema {
    pub fn new(classes: Vec<ClassDef>) -> Self {
        Self {
            classes,
            custom_fields: Vec::new(),
        }
    }

    pub fn class(&self, name: &str) -> Option<&ClassDef> {
        self.classes.iter().find(|c| c.name == name)
    }
}

/// One step of a resolved field path
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedStep {
    /// Key under which the value is stored on the record
    pub key: FieldRef,
    pub def: FieldDef,
    /// Class (or capability) that declared the field
    pub declared_on: String,
}

/// A field resolved on a class, optionally followed by a sub-field on its result class
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedField {
    pub kind: FieldKind,
    field: ResolvedStep,
    sub_field: Option<ResolvedStep>,
}

impl ResolvedField {
    pub fn new(field: ResolvedStep, sub_field: Option<ResolvedStep>) -> Self {
        let kind = sub_field.as_ref().unwrap_or(&field).def.value.kind();
        Self {
            kind,
            field,
            sub_field,
        }
    }

    /// The field looked up on the record itself
    pub fn field(&self) -> &ResolvedStep {
        &self.field
    }

    pub fn sub_field(&self) -> Option<&ResolvedStep> {
        self.sub_field.as_ref()
    }

    /// The step whose value is rendered: the sub-field when present
    pub fn target(&self) -> &ResolvedStep {
        self.sub_field.as_ref().unwrap_or(&self.field)
    }

    /// Capability that declared the final field
    pub fn capability(&self) -> &str {
        &self.target().declared_on
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Resolved(ResolvedField),
    Invalid,
}

impl Resolution {
    pub fn kind(&self) -> FieldKind {
        match self {
            Resolution::Resolved(field) => field.kind,
            Resolution::Invalid => FieldKind::Invalid,
        }
    }

    pub fn resolved(&self) -> Option<&ResolvedField> {
        match self {
            Resolution::Resolved(field) => Some(field),
            Resolution::Invalid => None,
        }
    }
}

/// Node that failed to resolve, reported by [`CapabilityTable::audit`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidNode {
    /// Slash-separated node names from the root
    pub path: String,
    pub class: String,
}

/// Precomputed `(class, field) -> declaration` lookup honouring capability precedence
#[derive(Debug, Clone, Default)]
pub struct CapabilityTable {
    /// Class followed by its capabilities in precedence order
    lineage: HashMap<String, Vec<String>>,
    members: HashMap<(String, FieldRef), (String, FieldDef)>,
}

impl CapabilityTable {
    pub fn build(schema: &Schema) -> Result<Self, SchemaError> {
        let mut by_name: HashMap<&str, &ClassDef> = HashMap::new();
        for class in &schema.classes {
            if by_name.insert(class.name.as_str(), class).is_some() {
                return Err(SchemaError::DuplicateClass(class.name.clone()));
            }
        }

        let mut custom_by_class: HashMap<&str, Vec<&CustomFieldDef>> = HashMap::new();
        for custom in &schema.custom_fields {
            if !by_name.contains_key(custom.class.as_str()) {
                return Err(SchemaError::UnknownCustomFieldClass {
                    id: custom.id.clone(),
                    class: custom.class.clone(),
                });
            }
            custom_by_class
                .entry(custom.class.as_str())
                .or_default()
                .push(custom);
        }

        let mut table = CapabilityTable::default();
        for class in &schema.classes {
            let lineage = linearize(class, &by_name)?;

            for ancestor in &lineage {
                let Some(def) = by_name.get(ancestor.as_str()) else {
                    continue;
                };
                for field in &def.fields {
                    table
                        .members
                        .entry((class.name.clone(), FieldRef::Known(field.name.clone())))
                        .or_insert_with(|| (ancestor.clone(), field.clone()));
                }
                for custom in custom_by_class.get(ancestor.as_str()).into_iter().flatten() {
                    table
                        .members
                        .entry((class.name.clone(), FieldRef::custom(custom.id.clone())))
                        .or_insert_with(|| {
                            (
                                ancestor.clone(),
                                FieldDef::new(custom.id.clone(), custom.value.clone()),
                            )
                        });
                }
            }

            table.lineage.insert(class.name.clone(), lineage);
        }

        tracing::debug!(
            "Built capability table: {} classes, {} members",
            table.lineage.len(),
            table.members.len()
        );
        Ok(table)
    }

    /// Whether `class` is `capability` or lists it anywhere in its lineage
    pub fn is_a(&self, class: &str, capability: &str) -> bool {
        self.lineage
            .get(class)
            .map(|lineage| lineage.iter().any(|c| c == capability))
            .unwrap_or(false)
    }

    pub fn lineage(&self, class: &str) -> Option<&[String]> {
        self.lineage.get(class).map(|l| l.as_slice())
    }

    /// Look up a single field on a class
    pub fn lookup(&self, class: &str, field: &FieldRef) -> Option<ResolvedStep> {
        self.members
            .get(&(class.to_string(), field.clone()))
            .map(|(declared_on, def)| ResolvedStep {
                key: field.clone(),
                def: def.clone(),
                declared_on: declared_on.clone(),
            })
    }

    /// Resolve a field (and optional sub-field) against a record class
    pub fn resolve(&self, field: &FieldRef, sub_field: Option<&str>, class: &str) -> Resolution {
        let Some(first) = self.lookup(class, field) else {
            return Resolution::Invalid;
        };

        let Some(sub) = sub_field.filter(|s| !s.is_empty()) else {
            return Resolution::Resolved(ResolvedField::new(first, None));
        };

        // Sub-fields resolve against the single record the first field leads to
        let ValueType::Object(result_class) = &first.def.value else {
            return Resolution::Invalid;
        };
        let Some(second) = self.lookup(result_class, &FieldRef::known(sub)) else {
            return Resolution::Invalid;
        };
        Resolution::Resolved(ResolvedField::new(first, Some(second)))
    }

    pub fn resolve_node(&self, node: &ConfigNode, class: &str) -> Resolution {
        self.resolve(&node.field, node.sub_field.as_deref(), class)
    }

    /// Walk a view against a root class and report every node that fails to resolve
    pub fn audit(&self, view: &ViewConfig, root_class: &str) -> Vec<InvalidNode> {
        let mut invalid = Vec::new();
        let root = view.root();
        self.audit_children(view, root, root_class, &root.display_name(), &mut invalid);
        invalid
    }

    fn audit_children(
        &self,
        view: &ViewConfig,
        node: &ConfigNode,
        class: &str,
        path: &str,
        invalid: &mut Vec<InvalidNode>,
    ) {
        for child in view.children_of(node).iter().filter(|c| c.enabled) {
            let child_path = format!("{}/{}", path, child.display_name());
            if child.is_grouping() {
                self.audit_children(view, child, class, &child_path, invalid);
                continue;
            }
            match self.resolve_node(child, class) {
                Resolution::Invalid => invalid.push(InvalidNode {
                    path: child_path,
                    class: class.to_string(),
                }),
                Resolution::Resolved(field) => {
                    if let Some(next) = field.target().def.value.result_class() {
                        self.audit_children(view, child, next, &child_path, invalid);
                    }
                }
            }
        }
    }
}

/// Class itself, then direct capabilities in declared order, then transitive ones breadth-first
fn linearize(class: &ClassDef, by_name: &HashMap<&str, &ClassDef>) -> Result<Vec<String>, SchemaError> {
    let mut lineage = vec![class.name.clone()];
    let mut seen: HashSet<String> = HashSet::from([class.name.clone()]);
    let mut queue: VecDeque<&ClassDef> = VecDeque::from([class]);

    while let Some(current) = queue.pop_front() {
        for capability in &current.capabilities {
            let Some(def) = by_name.get(capability.as_str()) else {
                return Err(SchemaError::UnknownCapability {
                    class: current.name.clone(),
                    capability: capability.clone(),
                });
            };
            if seen.insert(capability.clone()) {
                lineage.push(capability.clone());
                queue.push_back(*def);
            }
        }
    }

    Ok(lineage)
}
