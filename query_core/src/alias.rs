//! Alias resolution and join history
//!
//! Each composer keeps a join-history table mapping normalized
//! join-property keys (`<owner_alias>.<relation>`) to the alias bound to
//! that relation's target. Multi-hop property paths resolve their owning
//! alias through this table. Nested composers receive a snapshot of the
//! parent's table, never a writable reference, so scoping stays
//! parent-to-child only.

use crate::errors::QueryError;
use crate::path::{snake_case, Selector};
use entity_graph::EntityGraph;
use std::collections::BTreeMap;

/// Property-path key to alias mapping built up by join declarations
#[derive(Debug, Clone, Default)]
pub struct JoinHistory {
    entries: BTreeMap<String, String>,
}

impl JoinHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read-only copy handed to nested composers
    pub fn snapshot(&self) -> Self {
        self.clone()
    }

    /// Record the alias assigned to a join property reference.
    /// Alias bindings are single-assignment within one compose session.
    pub fn record(&mut self, key: impl Into<String>, alias: impl Into<String>) -> Result<(), QueryError> {
        let alias = alias.into();
        if self.entries.values().any(|bound| *bound == alias) {
            return Err(QueryError::AliasRebound { alias });
        }
        self.entries.insert(key.into(), alias);
        Ok(())
    }

    /// Alias owning a relation segment, matched by substring against the
    /// recorded keys
    pub fn resolve_segment(&self, segment: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(key, _)| key.contains(segment))
            .map(|(_, alias)| alias.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Resolve a column selector to an aliased column reference.
///
/// Raw selectors pass through unchanged. Single-segment paths resolve
/// against the root alias; paths traversing a relation resolve the owning
/// alias through the join history. An unmatched relation segment fails with
/// `UnresolvedRelation` rather than silently falling back to the root.
pub fn resolve_column(
    selector: &Selector,
    root_alias: &str,
    history: &JoinHistory,
) -> Result<String, QueryError> {
    match selector {
        Selector::Raw(reference) => {
            if reference.is_empty() {
                return Err(QueryError::SelectorMissing);
            }
            Ok(reference.clone())
        }
        Selector::Path(path) => {
            let column = path.last().ok_or(QueryError::SelectorMissing)?;
            match path.second_to_last() {
                None => Ok(format!("{}.{}", root_alias, snake_case(column))),
                Some(relation) => {
                    let owner = history.resolve_segment(relation).ok_or_else(|| {
                        QueryError::UnresolvedRelation {
                            relation: relation.to_string(),
                        }
                    })?;
                    Ok(format!("{}.{}", owner, snake_case(column)))
                }
            }
        }
    }
}

/// Resolve a relation selector for a join declaration.
///
/// Returns the join property reference and the relation name. Single-hop
/// relations are validated against the declared entity's relation graph;
/// deep paths are treated as already-joined relations resolved via the join
/// history and are not re-validated.
pub fn resolve_relation(
    selector: &Selector,
    entity: &str,
    root_alias: &str,
    graph: &EntityGraph,
    history: &JoinHistory,
) -> Result<(String, String), QueryError> {
    let (reference, relation, already_joined) = match selector {
        Selector::Raw(raw) => {
            let mut parts = raw.split('.');
            let _owner = parts.next().filter(|s| !s.is_empty());
            let relation = parts.next().unwrap_or_default();
            if raw.is_empty() || relation.is_empty() {
                return Err(QueryError::SelectorMissing);
            }
            (raw.clone(), relation.to_string(), false)
        }
        Selector::Path(path) => {
            let relation = path.last().ok_or(QueryError::SelectorMissing)?.to_string();
            match path.second_to_last() {
                None => (format!("{}.{}", root_alias, relation), relation, false),
                Some(owner_segment) => {
                    let owner = history.resolve_segment(owner_segment).ok_or_else(|| {
                        QueryError::UnresolvedRelation {
                            relation: owner_segment.to_string(),
                        }
                    })?;
                    (format!("{}.{}", owner, relation), relation, true)
                }
            }
        }
    };

    if !already_joined && !graph.has_relation(entity, &relation) {
        return Err(QueryError::UnrelatedJoin {
            entity: entity.to_string(),
            relation,
        });
    }

    Ok((reference, relation))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::PropertyPath;
    use entity_graph::{Cardinality, ColumnType, EntityDef};

    fn graph() -> EntityGraph {
        EntityGraph::new()
            .register(
                EntityDef::new("User", "users")
                    .column("id", ColumnType::Uuid)
                    .relation("photos", "Photos", Cardinality::OneToMany),
            )
            .register(EntityDef::new("Photos", "photos").column("url", ColumnType::Text))
    }

    #[test]
    fn raw_selector_passes_through() {
        let history = JoinHistory::new();
        assert_eq!(
            resolve_column(&Selector::raw("t1.name"), "t1", &history).unwrap(),
            "t1.name"
        );
    }

    #[test]
    fn empty_selector_fails() {
        let history = JoinHistory::new();
        let err = resolve_column(&Selector::raw(""), "t1", &history).unwrap_err();
        assert!(matches!(err, QueryError::SelectorMissing));
    }

    #[test]
    fn single_segment_resolves_against_root() {
        let history = JoinHistory::new();
        let column = resolve_column(
            &Selector::from(PropertyPath::field("createDateTime")),
            "t1",
            &history,
        )
        .unwrap();
        assert_eq!(column, "t1.create_date_time");
    }

    #[test]
    fn relation_path_resolves_through_history() {
        let mut history = JoinHistory::new();
        history.record("t1.photos", "t2").unwrap();
        let column = resolve_column(
            &Selector::from(PropertyPath::relation("photos").field("url")),
            "t1",
            &history,
        )
        .unwrap();
        assert_eq!(column, "t2.url");
    }

    #[test]
    fn unmatched_relation_fails_loudly() {
        let history = JoinHistory::new();
        let err = resolve_column(
            &Selector::from(PropertyPath::relation("photos").field("url")),
            "t1",
            &history,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            QueryError::UnresolvedRelation { relation } if relation == "photos"
        ));
    }

    #[test]
    fn join_resolution_validates_relation_graph() {
        let history = JoinHistory::new();
        let (reference, relation) = resolve_relation(
            &Selector::from(PropertyPath::relation("photos").into_path()),
            "User",
            "t1",
            &graph(),
            &history,
        )
        .unwrap();
        assert_eq!(reference, "t1.photos");
        assert_eq!(relation, "photos");

        let err = resolve_relation(
            &Selector::from(PropertyPath::relation("branch").into_path()),
            "User",
            "t1",
            &graph(),
            &history,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            QueryError::UnrelatedJoin { entity, relation }
                if entity == "User" && relation == "branch"
        ));
    }

    #[test]
    fn deep_join_skips_revalidation() {
        let mut history = JoinHistory::new();
        history.record("t1.user", "t2").unwrap();
        // `photos` is not a relation of Branch, but the deep path goes
        // through the already-joined `user` alias.
        let (reference, relation) = resolve_relation(
            &Selector::from(PropertyPath::relation("user").relation("photos").into_path()),
            "Branch",
            "t1",
            &graph(),
            &history,
        )
        .unwrap();
        assert_eq!(reference, "t2.photos");
        assert_eq!(relation, "photos");
    }

    #[test]
    fn alias_binding_is_single_assignment() {
        let mut history = JoinHistory::new();
        history.record("t1.photos", "t2").unwrap();
        let err = history.record("t1.branch", "t2").unwrap_err();
        assert!(matches!(err, QueryError::AliasRebound { alias } if alias == "t2"));
    }
}
