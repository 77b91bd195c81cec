//! Ordering of relation instances (cross-references) seen from one record.
//!
//! Relations are stored as unordered back-references. This module turns the
//! relations touching an owner into display groups: grouped by relation type
//! in the order the list filter declares them, one group per distinct target
//! set, with targets sorted (or kept in authored order for sequences).

use crate::filter::{self, FilterError};
use crate::graph::{RecordSource, RelationType};
use crate::view::ConfigNode;
use dictgen_types::{Direction, PublicationId, RecordId};
use std::collections::BTreeSet;

/// One labelled run of targets
#[derive(Debug, Clone, PartialEq)]
pub struct RelationGroup {
    pub relation_type: RelationType,
    /// Direction the owner sees the relation under
    pub direction: Direction,
    pub targets: Vec<RecordId>,
}

impl RelationGroup {
    /// Label to show: reverse name on the reverse side when one exists
    pub fn name(&self) -> &str {
        match (self.direction, &self.relation_type.reverse_name) {
            (Direction::Reverse, Some(reverse)) => reverse,
            _ => &self.relation_type.name,
        }
    }

    pub fn abbreviation(&self) -> &str {
        let forward = self
            .relation_type
            .abbreviation
            .as_deref()
            .unwrap_or(&self.relation_type.name);
        match (self.direction, &self.relation_type.reverse_abbreviation) {
            (Direction::Reverse, Some(reverse)) => reverse,
            (Direction::Reverse, None) => self
                .relation_type
                .reverse_name
                .as_deref()
                .unwrap_or(forward),
            _ => forward,
        }
    }
}

struct Candidate {
    rank: usize,
    direction: Direction,
    relation_type: RelationType,
    targets: Vec<RecordId>,
    first_key: String,
}

/// Display groups for the relations touching `owner`, filtered and ordered by `node`.
///
/// `sort_key` orders targets of non-sequence relations and breaks ties between
/// instances of the same type. Fails with a configuration error when a
/// selectable relation exists but the node has no list filter.
pub fn order_relations<S, K>(
    source: &S,
    owner: &RecordId,
    node: &ConfigNode,
    scope: Option<&PublicationId>,
    sort_key: K,
) -> Result<Vec<RelationGroup>, FilterError>
where
    S: RecordSource + ?Sized,
    K: Fn(&RecordId) -> String,
{
    let relations = source.relations_of(owner);
    if relations.is_empty() {
        return Ok(Vec::new());
    }
    let Some(list_filter) = node.list_filter() else {
        return Err(FilterError::MissingListFilter {
            selector: node.field.selector().to_string(),
        });
    };

    let mut candidates: Vec<Candidate> = Vec::new();
    let mut seen: BTreeSet<(String, Direction, Vec<RecordId>)> = BTreeSet::new();

    for relation in relations {
        let Some(relation_type) = source.relation_type(&relation.relation_type) else {
            tracing::debug!("Relation {} has no known type; skipping", relation.id);
            continue;
        };
        let direction = filter::relation_direction(relation_type, relation, owner);
        let Some(rank) = list_filter.rank(&relation_type.id, direction) else {
            continue;
        };

        let exposed: Vec<RecordId> = if relation_type.kind.is_directional() {
            match direction {
                Direction::Forward => relation.targets.iter().skip(1).cloned().collect(),
                _ => relation.targets.iter().take(1).cloned().collect(),
            }
        } else {
            relation.targets.clone()
        };

        let mut targets: Vec<RecordId> = Vec::new();
        for target in exposed {
            if &target == owner || targets.contains(&target) {
                continue;
            }
            if filter::is_visible_with_owners(source, &target, scope) {
                targets.push(target);
            }
        }
        if targets.is_empty() {
            continue;
        }

        if !relation_type.kind.is_sequence() {
            targets.sort_by_cached_key(|t| (sort_key(t), t.clone()));
        }

        // distinct rows with the same type and target set collapse into one group
        let mut identity = targets.clone();
        identity.sort();
        if !seen.insert((relation_type.id.clone(), direction, identity)) {
            continue;
        }

        let first_key = targets.first().map(&sort_key).unwrap_or_default();
        candidates.push(Candidate {
            rank,
            direction,
            relation_type: relation_type.clone(),
            targets,
            first_key,
        });
    }

    // stable: ties keep encounter order after rank, direction and first target
    candidates.sort_by(|a, b| {
        a.rank
            .cmp(&b.rank)
            .then_with(|| direction_order(a.direction).cmp(&direction_order(b.direction)))
            .then_with(|| a.first_key.cmp(&b.first_key))
    });

    Ok(candidates
        .into_iter()
        .map(|c| RelationGroup {
            relation_type: c.relation_type,
            direction: c.direction,
            targets: c.targets,
        })
        .collect())
}

fn direction_order(direction: Direction) -> u8 {
    match direction {
        Direction::Forward => 0,
        Direction::Either => 1,
        Direction::Reverse => 2,
    }
}

/// Flatten groups into `(relation type id, target)` pairs in display order
pub fn flatten(groups: &[RelationGroup]) -> Vec<(String, RecordId)> {
    groups
        .iter()
        .flat_map(|g| {
            g.targets
                .iter()
                .map(move |t| (g.relation_type.id.clone(), t.clone()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{FieldValue, Record, RecordGraph, Relation, RelationKind};
    use crate::view::{ListFilterOptions, NodeOptions};

    fn entry(id: &str, headword: &str) -> Record {
        Record::new(id, "LexEntry").with("HeadWord", FieldValue::multi(&[("fr", headword)]))
    }

    fn graph() -> RecordGraph {
        let mut graph = RecordGraph::default();
        for (id, hw) in [
            ("chat", "chat"),
            ("matou", "matou"),
            ("minet", "minet"),
            ("chien", "chien"),
            ("lundi", "lundi"),
            ("mardi", "mardi"),
            ("mercredi", "mercredi"),
            ("voiture", "voiture"),
            ("roue", "roue"),
            ("porte", "porte"),
        ] {
            graph.insert_record(entry(id, hw)).unwrap();
        }
        graph.add_relation_type(RelationType::new("syn", "Synonym", RelationKind::Collection));
        graph.add_relation_type(RelationType::new("ant", "Antonym", RelationKind::Pair));
        graph.add_relation_type(RelationType::new("cal", "Calendar", RelationKind::Sequence));
        graph.add_relation_type(
            RelationType::new("pw", "Part", RelationKind::Tree)
                .with_reverse("Whole")
                .with_abbreviations("pt", Some("wh")),
        );
        graph
    }

    fn node(ids: &[&str]) -> ConfigNode {
        ConfigNode::new("LexicalRelations")
            .with_options(NodeOptions::ListFilter(ListFilterOptions::new(ids)))
    }

    fn key(graph: &RecordGraph) -> impl Fn(&RecordId) -> String + '_ {
        move |id| graph.display_form(id, "fr", &[]).text
    }

    #[test]
    fn test_groups_follow_filter_order_not_data_order() {
        let mut g = graph();
        g.add_relation(Relation::new("r1", "syn", &["chat", "minet", "matou"])).unwrap();
        g.add_relation(Relation::new("r2", "ant", &["chat", "chien"])).unwrap();

        let owner = RecordId::new("chat");
        let groups = order_relations(&g, &owner, &node(&["ant", "syn"]), None, key(&g)).unwrap();
        let types: Vec<_> = groups.iter().map(|g| g.relation_type.id.as_str()).collect();
        assert_eq!(types, ["ant", "syn"]);

        let groups = order_relations(&g, &owner, &node(&["syn", "ant"]), None, key(&g)).unwrap();
        let types: Vec<_> = groups.iter().map(|g| g.relation_type.id.as_str()).collect();
        assert_eq!(types, ["syn", "ant"]);
    }

    #[test]
    fn test_symmetric_targets_sorted_and_owner_excluded() {
        let mut g = graph();
        g.add_relation(Relation::new("r1", "syn", &["minet", "chat", "matou"])).unwrap();
        let groups = order_relations(&g, &RecordId::new("chat"), &node(&["syn"]), None, key(&g)).unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].targets, vec![RecordId::new("matou"), RecordId::new("minet")]);
    }

    #[test]
    fn test_sequence_keeps_authored_order() {
        let mut g = graph();
        g.add_relation(Relation::new("r1", "cal", &["mercredi", "lundi", "mardi"])).unwrap();
        let groups = order_relations(&g, &RecordId::new("lundi"), &node(&["cal"]), None, key(&g)).unwrap();
        assert_eq!(
            groups[0].targets,
            vec![RecordId::new("mercredi"), RecordId::new("mardi")]
        );
    }

    #[test]
    fn test_tree_directions() {
        let mut g = graph();
        g.add_relation(Relation::new("r1", "pw", &["voiture", "roue", "porte"])).unwrap();
        let both = node(&["pw"]);

        let whole = order_relations(&g, &RecordId::new("voiture"), &both, None, key(&g)).unwrap();
        assert_eq!(whole[0].direction, Direction::Forward);
        assert_eq!(whole[0].name(), "Part");
        assert_eq!(whole[0].abbreviation(), "pt");
        assert_eq!(whole[0].targets, vec![RecordId::new("porte"), RecordId::new("roue")]);

        // a part sees only the whole, never its sibling parts
        let part = order_relations(&g, &RecordId::new("roue"), &both, None, key(&g)).unwrap();
        assert_eq!(part[0].direction, Direction::Reverse);
        assert_eq!(part[0].name(), "Whole");
        assert_eq!(part[0].abbreviation(), "wh");
        assert_eq!(part[0].targets, vec![RecordId::new("voiture")]);
    }

    #[test]
    fn test_direction_tags_select_one_side() {
        let mut g = graph();
        g.add_relation(Relation::new("r1", "pw", &["voiture", "roue"])).unwrap();
        let forward = node(&["pw:f"]);
        let reverse = node(&["pw:r"]);
        let car = RecordId::new("voiture");
        let wheel = RecordId::new("roue");

        assert_eq!(order_relations(&g, &car, &forward, None, key(&g)).unwrap().len(), 1);
        assert!(order_relations(&g, &wheel, &forward, None, key(&g)).unwrap().is_empty());
        assert!(order_relations(&g, &car, &reverse, None, key(&g)).unwrap().is_empty());
        assert_eq!(order_relations(&g, &wheel, &reverse, None, key(&g)).unwrap().len(), 1);
    }

    #[test]
    fn test_identical_instances_collapse() {
        let mut g = graph();
        g.add_relation(Relation::new("r1", "syn", &["chat", "matou"])).unwrap();
        g.add_relation(Relation::new("r2", "syn", &["matou", "chat"])).unwrap();
        g.add_relation(Relation::new("r3", "syn", &["chat", "minet"])).unwrap();
        let groups = order_relations(&g, &RecordId::new("chat"), &node(&["syn"]), None, key(&g)).unwrap();
        assert_eq!(groups.len(), 2);
        assert_eq!(
            flatten(&groups),
            vec![
                ("syn".to_string(), RecordId::new("matou")),
                ("syn".to_string(), RecordId::new("minet")),
            ]
        );
    }

    #[test]
    fn test_excluded_targets_dropped() {
        let mut g = RecordGraph::default();
        g.insert_record(entry("a", "a")).unwrap();
        g.insert_record(entry("b", "b").excluded_from("kids")).unwrap();
        g.insert_record(entry("c", "c")).unwrap();
        g.add_relation_type(RelationType::new("syn", "Synonym", RelationKind::Collection));
        g.add_relation(Relation::new("r1", "syn", &["a", "b", "c"])).unwrap();
        g.add_relation(Relation::new("r2", "syn", &["a", "b"])).unwrap();

        let kids = PublicationId::new("kids");
        let groups = order_relations(&g, &RecordId::new("a"), &node(&["syn"]), Some(&kids), key(&g)).unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].targets, vec![RecordId::new("c")]);
    }

    #[test]
    fn test_missing_filter_only_fails_when_relations_exist() {
        let mut g = graph();
        let plain = ConfigNode::new("LexicalRelations");
        assert!(order_relations(&g, &RecordId::new("chat"), &plain, None, key(&g))
            .unwrap()
            .is_empty());
        g.add_relation(Relation::new("r1", "syn", &["chat", "matou"])).unwrap();
        assert!(order_relations(&g, &RecordId::new("chat"), &plain, None, key(&g)).is_err());
    }
}
