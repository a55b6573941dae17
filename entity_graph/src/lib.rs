//! Entity metadata registry
//!
//! This crate provides the read-only entity metadata service consumed by the
//! query composition engine: column names and declared storage types per
//! entity, plus the relation graph (property name, target entity,
//! cardinality) used to validate joins and to scope join-condition builders.

pub mod graph;
pub mod types;

pub use graph::{EntityDef, EntityGraph, RelationDef};
pub use types::{Cardinality, ColumnType};
