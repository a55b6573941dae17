//! Convenience re-exports for common Querhaus usage
//!
//! This prelude module re-exports the most commonly used items from the Querhaus ecosystem,
//! making it easier to import everything you need with a single use statement.
//!
//! # Example
//!
//! ```rust
//! use querhaus::prelude::*;
//!
//! // Now you have access to all the common Querhaus types
//! ```

// Core Querhaus components
pub use crate::core::Querhaus;
pub use crate::errors::QuerhausError;

// Re-export centralized config
pub use config::{AppConfig, DatabaseConfig};

// Re-export the entity model
pub use entity_graph::{Cardinality, ColumnType, EntityDef, EntityGraph};

// Re-export commonly used query-core types for convenience
pub use query_core::prelude::*;

// Re-export query_core module for direct access
pub use query_core;

// Common external dependencies
pub use anyhow;
pub use async_trait;
pub use sqlx;
pub use tokio;

// Commonly used sqlx types
pub use sqlx::{FromRow, PgPool, Postgres, Row, Transaction};
