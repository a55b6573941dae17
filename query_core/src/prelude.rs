//! Convenience re-exports for common query-composition usage

// Composer and conditions
pub use crate::composer::QueryComposer;
pub use crate::condition::ConditionBuilder;

// Selectors and property paths
pub use crate::path::{PropertyPath, Selector};

// Filter parameters
pub use crate::filter::QueryObject;

// Statement shaping
pub use crate::statement::{LockMode, SortOrder};

// Execution seam
pub use crate::executor::{collect_stream, StatementExecutor};

// Error type
pub use crate::errors::QueryError;

// Entity model
pub use entity_graph::{Cardinality, ColumnType, EntityDef, EntityGraph};

// Common external dependencies that are frequently used
pub use async_trait::async_trait;
pub use serde_json::json;
pub use sqlx::{PgPool, Row};
pub use uuid::Uuid;
