//! Query Core - fluent query composition engine for Querhaus
//!
//! This crate turns declarative filter, pagination, join and aggregate
//! specifications into a single PostgreSQL statement. Conditions queue as
//! typed predicate fragments at declaration time and are flattened onto the
//! underlying statement only when a terminal operation compiles.

pub mod aggregate;
pub mod alias;
pub mod composer;
pub mod condition;
pub mod errors;
pub mod executor;
pub mod filter;
pub mod fragment;
pub mod path;
pub mod prelude;
pub mod scalar;
pub mod statement;

pub use aggregate::AggregateFunction;
pub use alias::JoinHistory;
pub use composer::QueryComposer;
pub use condition::ConditionBuilder;
pub use errors::QueryError;
pub use executor::{collect_stream, stream_rows, StatementExecutor};
pub use filter::{LookupFilter, QueryObject};
pub use fragment::{Combinator, Predicate, PredicateFragment};
pub use path::{snake_case, PathThroughRelation, PropertyPath, Selector};
pub use scalar::ScalarValue;
pub use statement::{JoinKind, LockMode, SelectStatement, SortOrder};

use sqlx::PgPool;

pub type DbPool = PgPool;
