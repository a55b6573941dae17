//! Error types for the Querhaus crate
//!
//! This module contains all error types that can be returned by Querhaus operations.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum QuerhausError {
    #[error("Database connection error: {0}")]
    DatabaseConnection(#[from] sqlx::Error),

    #[error("Entity not registered in the entity graph: {0}")]
    EntityNotRegistered(String),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error(transparent)]
    Query(#[from] query_core::QueryError),
}
