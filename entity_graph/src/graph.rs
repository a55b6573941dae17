//! Entity-relationship graph
//!
//! Runtime registry of entity definitions. The query engine consumes this as
//! a read-only service: column type lookups gate aggregate operations, and
//! the relation graph validates join declarations and resolves the target
//! entity a join-condition builder is scoped to.

use crate::types::{Cardinality, ColumnType};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A declared relation from one entity to another
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelationDef {
    /// Property name on the owning entity, e.g. `photos`
    pub name: String,
    /// Target entity name, e.g. `Photos`
    pub target: String,
    pub cardinality: Cardinality,
}

/// One registered entity: its table, columns and relations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityDef {
    pub name: String,
    pub table: String,
    columns: BTreeMap<String, ColumnType>,
    relations: Vec<RelationDef>,
}

impl EntityDef {
    pub fn new(name: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table: table.into(),
            columns: BTreeMap::new(),
            relations: Vec::new(),
        }
    }

    /// Declare a column with its storage type
    pub fn column(mut self, name: impl Into<String>, ty: ColumnType) -> Self {
        self.columns.insert(name.into(), ty);
        self
    }

    /// Declare a relation to another entity
    pub fn relation(
        mut self,
        name: impl Into<String>,
        target: impl Into<String>,
        cardinality: Cardinality,
    ) -> Self {
        self.relations.push(RelationDef {
            name: name.into(),
            target: target.into(),
            cardinality,
        });
        self
    }

    pub fn column_type(&self, property: &str) -> Option<ColumnType> {
        self.columns.get(property).copied()
    }

    pub fn relations(&self) -> &[RelationDef] {
        &self.relations
    }
}

/// Registry of all entities known to the engine
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EntityGraph {
    entities: BTreeMap<String, EntityDef>,
}

impl EntityGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an entity definition. Later registrations under the same
    /// name replace earlier ones.
    pub fn register(mut self, entity: EntityDef) -> Self {
        self.entities.insert(entity.name.clone(), entity);
        self
    }

    /// Look up a registered entity by name
    pub fn entity(&self, name: &str) -> Option<&EntityDef> {
        self.entities.get(name)
    }

    /// Whether an entity with this name is registered
    pub fn contains(&self, name: &str) -> bool {
        self.entities.contains_key(name)
    }

    /// Table name backing an entity
    pub fn table_of(&self, entity: &str) -> Option<&str> {
        self.entity(entity).map(|e| e.table.as_str())
    }

    /// Declared storage type of `entity.property`, if known
    pub fn column_type(&self, entity: &str, property: &str) -> Option<ColumnType> {
        self.entity(entity).and_then(|e| e.column_type(property))
    }

    /// All relations declared on an entity
    pub fn relations(&self, entity: &str) -> &[RelationDef] {
        self.entity(entity).map(|e| e.relations()).unwrap_or(&[])
    }

    /// Whether `entity` declares a relation named `relation`
    pub fn has_relation(&self, entity: &str, relation: &str) -> bool {
        self.relations(entity).iter().any(|r| r.name == relation)
    }

    /// Target entity of `entity.relation`. Falls back to a case-insensitive
    /// scan of registered entity names when the relation is not declared on
    /// the immediate entity (deep paths join entities the root never
    /// declared directly).
    pub fn relation_target(&self, entity: &str, relation: &str) -> Option<&str> {
        if let Some(rel) = self
            .relations(entity)
            .iter()
            .find(|r| r.name == relation)
        {
            return Some(rel.target.as_str());
        }

        self.entities
            .keys()
            .find(|name| name.to_lowercase() == relation.to_lowercase())
            .map(|name| name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_graph() -> EntityGraph {
        EntityGraph::new()
            .register(
                EntityDef::new("User", "users")
                    .column("id", ColumnType::Uuid)
                    .column("name", ColumnType::Text)
                    .column("point", ColumnType::Numeric)
                    .relation("photos", "Photos", Cardinality::OneToMany),
            )
            .register(
                EntityDef::new("Photos", "photos")
                    .column("id", ColumnType::Uuid)
                    .column("url", ColumnType::Text),
            )
    }

    #[test]
    fn column_lookup() {
        let graph = sample_graph();
        assert_eq!(graph.column_type("User", "point"), Some(ColumnType::Numeric));
        assert_eq!(graph.column_type("User", "missing"), None);
        assert_eq!(graph.column_type("Ghost", "id"), None);
    }

    #[test]
    fn relation_lookup() {
        let graph = sample_graph();
        assert!(graph.has_relation("User", "photos"));
        assert!(!graph.has_relation("User", "branch"));
        assert!(!graph.has_relation("Photos", "photos"));
        assert_eq!(graph.relation_target("User", "photos"), Some("Photos"));
    }

    #[test]
    fn relation_target_falls_back_to_entity_name() {
        let graph = sample_graph();
        // Deep-path joins name entities that are not direct relations.
        assert_eq!(graph.relation_target("User", "photos"), Some("Photos"));
        assert_eq!(graph.relation_target("Ghost", "user"), Some("User"));
    }

    #[test]
    fn table_lookup() {
        let graph = sample_graph();
        assert_eq!(graph.table_of("User"), Some("users"));
        assert_eq!(graph.table_of("Ghost"), None);
    }
}
