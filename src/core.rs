//! Core Querhaus functionality
//!
//! This module contains the main Querhaus struct, which owns the connection
//! pool and the entity graph and hands out query composers bound to both.

use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;

use config::DatabaseConfig;
use entity_graph::EntityGraph;
use query_core::{QueryComposer, QueryObject};

use crate::errors::QuerhausError;

/// Main Querhaus coordinator that manages the database connection and the
/// entity graph shared by every composer
pub struct Querhaus {
    pool: PgPool,
    graph: Arc<EntityGraph>,
}

impl Querhaus {
    /// Create new Querhaus with a database connection and an entity graph
    pub async fn new(config: DatabaseConfig, graph: EntityGraph) -> Result<Self, QuerhausError> {
        let connection_string = config.connection_string();

        let mut pool_options = sqlx::postgres::PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .idle_timeout(Duration::from_secs(config.idle_timeout_seconds));

        // Set max lifetime if specified
        if config.max_lifetime_seconds > 0 {
            pool_options =
                pool_options.max_lifetime(Duration::from_secs(config.max_lifetime_seconds));
        }

        let pool = pool_options.connect(&connection_string).await?;
        crate::debug_log!(
            host = %config.host,
            database = %config.database,
            "database pool established"
        );

        Ok(Self {
            pool,
            graph: Arc::new(graph),
        })
    }

    /// Get database pool reference
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Get the shared entity graph
    pub fn graph(&self) -> &Arc<EntityGraph> {
        &self.graph
    }

    /// Create a query composer bound to a registered entity
    pub fn composer(
        &self,
        entity: &str,
        alias: &str,
        query_object: QueryObject,
    ) -> Result<QueryComposer, QuerhausError> {
        if !self.graph.contains(entity) {
            return Err(QuerhausError::EntityNotRegistered(entity.to_string()));
        }
        crate::trace_log!(entity, alias, "creating composer");
        Ok(QueryComposer::new(
            self.graph.clone(),
            entity,
            alias,
            query_object,
        ))
    }

    /// Check database connection health
    pub async fn health_check(&self) -> Result<(), QuerhausError> {
        sqlx::query("SELECT 1").fetch_one(&self.pool).await?;
        Ok(())
    }
}
