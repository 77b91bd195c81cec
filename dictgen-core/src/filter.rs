//! Publication visibility and list-filter selection.

use crate::graph::{Record, RecordSource, Relation, RelationType};
use crate::view::{ConfigNode, FieldRef};
use dictgen_types::{Direction, PublicationId, RecordId};
use std::collections::HashSet;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FilterError {
    #[error("Node '{selector}' shows selectable items but has no list filter options")]
    MissingListFilter { selector: String },
}

/// Whether `id` itself may appear under `scope` (`None` publishes everything)
pub fn is_visible<S: RecordSource + ?Sized>(
    source: &S,
    id: &RecordId,
    scope: Option<&PublicationId>,
) -> bool {
    match scope {
        Some(publication) => !source.is_excluded(id, publication),
        None => true,
    }
}

/// Visibility of an item together with its logical owners: exclusion of the
/// item or of any record owning it suppresses the item
pub fn is_visible_with_owners<S: RecordSource + ?Sized>(
    source: &S,
    id: &RecordId,
    scope: Option<&PublicationId>,
) -> bool {
    let Some(publication) = scope else {
        return true;
    };

    let mut seen = HashSet::new();
    let mut current = Some(id.clone());
    while let Some(next) = current {
        if !seen.insert(next.clone()) {
            break;
        }
        if source.is_excluded(&next, publication) {
            return false;
        }
        current = source.record(&next).and_then(|r| r.owner.clone());
    }
    true
}

/// Direction under which `owner` sees `relation`.
///
/// Directional kinds are forward from the head (first target) and reverse from
/// every other member; symmetric kinds have no direction, so `type:f` and
/// `type:r` entries select them like a plain `type`.
pub fn relation_direction(relation_type: &RelationType, relation: &Relation, owner: &RecordId) -> Direction {
    if !relation_type.kind.is_directional() {
        return Direction::Either;
    }
    match relation.targets.first() {
        Some(head) if head == owner => Direction::Forward,
        _ => Direction::Reverse,
    }
}

fn require_filter(node: &ConfigNode) -> Result<&crate::view::ListFilterOptions, FilterError> {
    node.list_filter()
        .ok_or_else(|| FilterError::MissingListFilter {
            selector: node.field.selector().to_string(),
        })
}

/// Whether a relation instance viewed from `owner` passes the node's list filter
pub fn is_relation_selected(
    node: &ConfigNode,
    relation_type: &RelationType,
    relation: &Relation,
    owner: &RecordId,
) -> Result<bool, FilterError> {
    let filter = require_filter(node)?;
    let direction = relation_direction(relation_type, relation, owner);
    Ok(filter.selects(&relation_type.id, direction))
}

/// Whether a typed collection item passes the node's list filter.
///
/// `type_field` names the item field holding its type reference(s); items
/// without any type pass only when the reserved `unspecified` id is selected.
pub fn is_item_selected(node: &ConfigNode, item: &Record, type_field: &str) -> Result<bool, FilterError> {
    let filter = require_filter(node)?;
    let types = item
        .value(&FieldRef::known(type_field))
        .map(|v| v.record_ids())
        .unwrap_or_default();

    if types.is_empty() {
        return Ok(filter.selects_unspecified());
    }
    Ok(types
        .iter()
        .any(|t| filter.selects(t.as_str(), Direction::Either)))
}
