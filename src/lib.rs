//! # Querhaus
//!
//! A fluent query composition engine for PostgreSQL. Declarative filter,
//! pagination, join and aggregate specifications compose into one statement,
//! with typed predicate fragments, relation-aware alias resolution, and
//! aggregate type validation against a static entity graph.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use querhaus::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = DatabaseConfig::new(
//!         "localhost".to_string(), 5432, "querhaus".to_string(),
//!         "postgres".to_string(), "password".to_string(),
//!         1, 5, 30, 600, 3600,
//!     );
//!
//!     let graph = EntityGraph::new().register(
//!         EntityDef::new("User", "users")
//!             .column("id", ColumnType::Uuid)
//!             .column("name", ColumnType::Varchar)
//!             .column("point", ColumnType::Integer),
//!     );
//!
//!     let querhaus = Querhaus::new(config, graph).await?;
//!
//!     let rows = querhaus
//!         .composer("User", "t1", QueryObject::empty())?
//!         .and_where(PropertyPath::field("name"), |c, _| Ok(c.contains("roy", true)))?
//!         .apply_filter_pagination(None)?
//!         .exec(querhaus.pool())
//!         .await?;
//!
//!     println!("fetched {} rows", rows.len());
//!     Ok(())
//! }
//! ```

/// Conditional debug logging macros
/// These macros only compile in code when the `debug-logging` feature is enabled
#[cfg(feature = "debug-logging")]
#[macro_export]
macro_rules! debug_log {
    ($($arg:tt)*) => {
        tracing::debug!($($arg)*)
    };
}

#[cfg(not(feature = "debug-logging"))]
#[macro_export]
macro_rules! debug_log {
    ($($arg:tt)*) => {};
}

#[cfg(feature = "debug-logging")]
#[macro_export]
macro_rules! trace_log {
    ($($arg:tt)*) => {
        tracing::trace!($($arg)*)
    };
}

#[cfg(not(feature = "debug-logging"))]
#[macro_export]
macro_rules! trace_log {
    ($($arg:tt)*) => {};
}

pub mod core;
pub mod errors;
pub mod prelude;

pub use crate::core::Querhaus;
pub use crate::errors::QuerhausError;

pub use config::{AppConfig, DatabaseConfig};
pub use entity_graph::{Cardinality, ColumnType, EntityDef, EntityGraph, RelationDef};
pub use query_core::{
    ConditionBuilder, LockMode, PropertyPath, QueryComposer, QueryError, QueryObject, Selector,
    SortOrder, StatementExecutor,
};
