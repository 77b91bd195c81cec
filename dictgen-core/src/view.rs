//! View specification model: the tree of configuration nodes that decides
//! which fields of a record are shown, in what order and how.
//!
//! A [`ViewConfig`] is built once from raw nodes (usually parsed from YAML)
//! and is read-only afterwards. Shared subtrees live in a named registry and
//! are referenced by name, never by pointer.

use crate::class_name;
use dictgen_types::Direction;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ViewError {
    #[error("Failed to read view file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse view YAML: {0}")]
    ParseError(#[from] serde_yaml::Error),

    #[error("Node '{node}' references unknown shared node '{name}'")]
    UnknownSharedNode { node: String, name: String },

    #[error("Shared node '{0}' references itself")]
    SharedCycle(String),

    #[error("Node '{0}' has both its own children and a shared reference")]
    ReferenceWithChildren(String),
}

/// Reserved filter id selecting items that carry no type at all
pub const UNSPECIFIED_TYPE: &str = "unspecified";

/// Field selector of a node: a schema-declared member or a custom field id
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldRef {
    Known(String),
    Custom { custom: String },
}

impl FieldRef {
    pub fn known(name: impl Into<String>) -> Self {
        FieldRef::Known(name.into())
    }

    pub fn custom(id: impl Into<String>) -> Self {
        FieldRef::Custom { custom: id.into() }
    }

    /// Selector text used in class names and error messages
    pub fn selector(&self) -> &str {
        match self {
            FieldRef::Known(name) => name,
            FieldRef::Custom { custom } => custom,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.selector().is_empty()
    }
}

impl Default for FieldRef {
    fn default() -> Self {
        FieldRef::Known(String::new())
    }
}

/// One enabled/disabled entry of an option list (writing systems, list items)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListOption {
    pub id: String,

    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl ListOption {
    pub fn enabled(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            enabled: true,
        }
    }

    pub fn disabled(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            enabled: false,
        }
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WritingSystemOptions {
    /// Writing systems in display order; ids may be `vernacular` or `analysis`
    #[serde(default)]
    pub options: Vec<ListOption>,

    #[serde(default)]
    pub display_abbreviation: bool,
}

impl WritingSystemOptions {
    pub fn new(ids: &[&str]) -> Self {
        Self {
            options: ids.iter().map(|id| ListOption::enabled(*id)).collect(),
            display_abbreviation: false,
        }
    }

    pub fn enabled_ids(&self) -> impl Iterator<Item = &str> {
        self.options
            .iter()
            .filter(|o| o.enabled)
            .map(|o| o.id.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListFilterOptions {
    /// Name of the list the ids come from (informational)
    #[serde(default)]
    pub list: String,

    /// Type ids, optionally suffixed `:f` / `:r`, in display order
    #[serde(default)]
    pub options: Vec<ListOption>,
}

impl ListFilterOptions {
    pub fn new(ids: &[&str]) -> Self {
        Self {
            list: String::new(),
            options: ids.iter().map(|id| ListOption::enabled(*id)).collect(),
        }
    }

    /// Enabled entries parsed into (type id, direction), in declared order
    pub fn selected(&self) -> impl Iterator<Item = (&str, Direction)> {
        self.options
            .iter()
            .filter(|o| o.enabled)
            .map(|o| parse_filter_id(&o.id))
    }

    /// Position of the first enabled entry admitting `type_id` viewed as `direction`
    pub fn rank(&self, type_id: &str, direction: Direction) -> Option<usize> {
        self.selected()
            .position(|(id, dir)| id == type_id && dir.admits(direction))
    }

    pub fn selects(&self, type_id: &str, direction: Direction) -> bool {
        self.rank(type_id, direction).is_some()
    }

    /// Whether items without any type are selected
    pub fn selects_unspecified(&self) -> bool {
        self.selected().any(|(id, _)| id == UNSPECIFIED_TYPE)
    }
}

/// Split "type:f" / "type:r" / "type" into its id and direction
pub fn parse_filter_id(raw: &str) -> (&str, Direction) {
    match raw.rsplit_once(':') {
        Some((id, "f")) => (id, Direction::Forward),
        Some((id, "r")) => (id, Direction::Reverse),
        _ => (raw, Direction::Either),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SenseOptions {
    /// "%d", "%a", "%A", "%i", "%I", "%O" or empty for "never number"
    #[serde(default)]
    pub numbering_style: String,

    #[serde(default)]
    pub before_number: String,

    #[serde(default)]
    pub after_number: String,

    #[serde(default)]
    pub number_even_single: bool,

    /// "%." (dotted), "%j" (joined) or empty for no parent prefix
    #[serde(default)]
    pub parent_join_style: String,

    #[serde(default)]
    pub show_shared_grammar_info_first: bool,

    #[serde(default)]
    pub display_each_in_paragraph: bool,
}

impl SenseOptions {
    pub fn numbered(style: &str) -> Self {
        Self {
            numbering_style: style.to_string(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PictureOptions {
    #[serde(default)]
    pub maximum_width: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupingOptions {
    #[serde(default)]
    pub display_each_in_paragraph: bool,
}

/// One block per item; the styles become extra classes on the blocks
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParagraphOptions {
    /// Class of the first item's block (and of later ones without a continuation style)
    #[serde(default)]
    pub paragraph_style: Option<String>,

    /// Class of every block after the first
    #[serde(default)]
    pub continuation_style: Option<String>,
}

impl ParagraphOptions {
    /// Style of the item at `index`
    pub fn style_for(&self, index: usize) -> Option<&str> {
        let style = if index == 0 {
            self.paragraph_style.as_deref()
        } else {
            self.continuation_style
                .as_deref()
                .or(self.paragraph_style.as_deref())
        };
        style.map(str::trim).filter(|s| !s.is_empty())
    }
}

/// Display options attached to a node
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NodeOptions {
    #[default]
    None,
    WritingSystems(WritingSystemOptions),
    ListFilter(ListFilterOptions),
    Senses(SenseOptions),
    Picture(PictureOptions),
    Grouping(GroupingOptions),
    Paragraph(ParagraphOptions),
}

/// One node of the view specification
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigNode {
    /// Empty for grouping nodes
    #[serde(default)]
    pub field: FieldRef,

    #[serde(default)]
    pub sub_field: Option<String>,

    #[serde(default)]
    pub label: String,

    /// Distinguishes duplicated nodes of the same field
    #[serde(default)]
    pub label_suffix: Option<String>,

    #[serde(default)]
    pub css_class: Option<String>,

    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Display order is list order
    #[serde(default)]
    pub children: Vec<ConfigNode>,

    #[serde(default)]
    pub options: NodeOptions,

    /// Name of a shared subtree whose children stand in for this node's
    #[serde(default)]
    pub reference: Option<String>,
}

impl ConfigNode {
    pub fn new(field: impl Into<String>) -> Self {
        let field = field.into();
        Self {
            label: field.clone(),
            field: FieldRef::Known(field),
            enabled: true,
            ..Default::default()
        }
    }

    pub fn custom(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            field: FieldRef::custom(id),
            label: label.into(),
            enabled: true,
            ..Default::default()
        }
    }

    pub fn grouping(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            enabled: true,
            options: NodeOptions::Grouping(GroupingOptions::default()),
            ..Default::default()
        }
    }

    pub fn with_children(mut self, children: Vec<ConfigNode>) -> Self {
        self.children = children;
        self
    }

    pub fn with_options(mut self, options: NodeOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_sub_field(mut self, sub_field: impl Into<String>) -> Self {
        self.sub_field = Some(sub_field.into());
        self
    }

    pub fn with_label_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.label_suffix = Some(suffix.into());
        self
    }

    pub fn with_css_class(mut self, class: impl Into<String>) -> Self {
        self.css_class = Some(class.into());
        self
    }

    pub fn referencing(mut self, shared: impl Into<String>) -> Self {
        self.reference = Some(shared.into());
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Readable identification for diagnostics ("Senses", "Gloss_dup")
    pub fn display_name(&self) -> String {
        if self.field.is_empty() {
            return self.label.clone();
        }
        match &self.label_suffix {
            Some(suffix) => format!("{}_{}", self.field.selector(), suffix),
            None => self.field.selector().to_string(),
        }
    }

    pub fn is_grouping(&self) -> bool {
        matches!(self.options, NodeOptions::Grouping(_))
    }

    pub fn sense_options(&self) -> Option<&SenseOptions> {
        match &self.options {
            NodeOptions::Senses(opts) => Some(opts),
            _ => None,
        }
    }

    pub fn list_filter(&self) -> Option<&ListFilterOptions> {
        match &self.options {
            NodeOptions::ListFilter(opts) => Some(opts),
            _ => None,
        }
    }

    pub fn writing_systems(&self) -> Option<&WritingSystemOptions> {
        match &self.options {
            NodeOptions::WritingSystems(opts) => Some(opts),
            _ => None,
        }
    }

    pub fn paragraph_options(&self) -> Option<&ParagraphOptions> {
        match &self.options {
            NodeOptions::Paragraph(opts) => Some(opts),
            _ => None,
        }
    }

    pub fn picture_options(&self) -> Option<&PictureOptions> {
        match &self.options {
            NodeOptions::Picture(opts) => Some(opts),
            _ => None,
        }
    }

    /// Whether items (or a grouping's content) go into block elements
    pub fn items_in_paragraphs(&self) -> bool {
        match &self.options {
            NodeOptions::Paragraph(_) => true,
            NodeOptions::Senses(opts) => opts.display_each_in_paragraph,
            NodeOptions::Grouping(opts) => opts.display_each_in_paragraph,
            _ => false,
        }
    }

    /// Class attribute for the element this node emits
    pub fn class_name(&self) -> String {
        if self.is_grouping() && self.css_class.is_none() {
            return class_name::grouping_class(&self.label);
        }
        let selector = match &self.field {
            FieldRef::Known(name) => name.as_str(),
            FieldRef::Custom { .. } => self.label.as_str(),
        };
        class_name::node_class(
            selector,
            self.sub_field.as_deref(),
            self.label_suffix.as_deref(),
            self.css_class.as_deref(),
        )
    }
}

#[derive(Debug, Clone, Deserialize)]
struct RawViewConfig {
    root: ConfigNode,

    #[serde(default)]
    shared: BTreeMap<String, ConfigNode>,
}

/// Validated, immutable view specification
#[derive(Debug, Clone)]
pub struct ViewConfig {
    root: ConfigNode,
    shared: BTreeMap<String, ConfigNode>,
}

impl ViewConfig {
    /// Validate a root node and its shared-subtree registry
    pub fn new(root: ConfigNode, shared: BTreeMap<String, ConfigNode>) -> Result<Self, ViewError> {
        let config = Self { root, shared };
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self, ViewError> {
        let raw: RawViewConfig = serde_yaml::from_str(yaml)?;
        Self::new(raw.root, raw.shared)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ViewError> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml_str(&contents)
    }

    pub fn root(&self) -> &ConfigNode {
        &self.root
    }

    pub fn shared(&self, name: &str) -> Option<&ConfigNode> {
        self.shared.get(name)
    }

    /// Children to render under `node`, following a shared reference if present
    pub fn children_of<'a>(&'a self, node: &'a ConfigNode) -> &'a [ConfigNode] {
        match node.reference.as_deref().and_then(|name| self.shared.get(name)) {
            Some(shared) => &shared.children,
            None => &node.children,
        }
    }

    fn validate(&self) -> Result<(), ViewError> {
        self.check_references(&self.root)?;
        for node in self.shared.values() {
            self.check_references(node)?;
        }
        for name in self.shared.keys() {
            let mut visiting = HashSet::new();
            self.check_chain(name, &mut visiting)?;
        }
        Ok(())
    }

    fn check_references(&self, node: &ConfigNode) -> Result<(), ViewError> {
        if let Some(name) = &node.reference {
            if !self.shared.contains_key(name) {
                return Err(ViewError::UnknownSharedNode {
                    node: node.display_name(),
                    name: name.clone(),
                });
            }
            if !node.children.is_empty() {
                return Err(ViewError::ReferenceWithChildren(node.display_name()));
            }
        }
        node.children
            .iter()
            .try_for_each(|child| self.check_references(child))
    }

    /// Depth-first walk over shared references reachable from `name`
    fn check_chain<'a>(
        &'a self,
        name: &'a str,
        visiting: &mut HashSet<&'a str>,
    ) -> Result<(), ViewError> {
        if !visiting.insert(name) {
            return Err(ViewError::SharedCycle(name.to_string()));
        }
        if let Some(node) = self.shared.get(name) {
            let mut referenced = Vec::new();
            collect_references(node, &mut referenced);
            for next in referenced {
                self.check_chain(next, visiting)?;
            }
        }
        visiting.remove(name);
        Ok(())
    }
}

fn collect_references<'a>(node: &'a ConfigNode, out: &mut Vec<&'a str>) {
    if let Some(name) = &node.reference {
        out.push(name.as_str());
    }
    for child in &node.children {
        collect_references(child, out);
    }
}
