//! Statement execution against PostgreSQL
//!
//! The composer stays database-agnostic; this module owns the seam to sqlx.
//! Bound parameters travel as `serde_json::Value` and are mapped onto
//! concrete Postgres types at bind time, with timestamp and UUID detection
//! for string values.

use async_trait::async_trait;
use futures::channel::mpsc;
use futures::{SinkExt, Stream, StreamExt, TryStreamExt};
use serde_json::Value;
use sqlx::postgres::{PgArguments, PgPool, PgRow};
use sqlx::Row;
use tracing::debug;

use crate::errors::QueryError;

macro_rules! bind_json_param {
    ($query:expr, $param:expr) => {
        match $param {
            Value::String(s) => {
                if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(&s) {
                    $query.bind(dt.with_timezone(&chrono::Utc))
                } else if let Ok(uuid) = uuid::Uuid::parse_str(&s) {
                    $query.bind(uuid)
                } else {
                    $query.bind(s)
                }
            }
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    if i >= i32::MIN as i64 && i <= i32::MAX as i64 {
                        $query.bind(i as i32)
                    } else {
                        $query.bind(i)
                    }
                } else if let Some(f) = n.as_f64() {
                    $query.bind(f)
                } else {
                    $query.bind(n.to_string())
                }
            }
            Value::Bool(b) => $query.bind(b),
            Value::Null => $query.bind(Option::<String>::None),
            other => $query.bind(other.to_string()),
        }
    };
}

fn bind_params<'a>(
    sql: &'a str,
    params: &'a [Value],
) -> sqlx::query::Query<'a, sqlx::Postgres, PgArguments> {
    let mut query = sqlx::query(sql);
    for param in params {
        query = bind_json_param!(query, param.clone());
    }
    query
}

/// Execution seam between the composer and the database
#[async_trait]
pub trait StatementExecutor: Send + Sync {
    async fn fetch_all(&self, sql: &str, params: &[Value]) -> Result<Vec<PgRow>, QueryError>;

    async fn fetch_one(&self, sql: &str, params: &[Value]) -> Result<PgRow, QueryError>;

    async fn fetch_optional(
        &self,
        sql: &str,
        params: &[Value],
    ) -> Result<Option<PgRow>, QueryError>;

    /// Single numeric scalar from the first column of the first row
    async fn fetch_scalar(&self, sql: &str, params: &[Value]) -> Result<i64, QueryError>;
}

#[async_trait]
impl StatementExecutor for PgPool {
    async fn fetch_all(&self, sql: &str, params: &[Value]) -> Result<Vec<PgRow>, QueryError> {
        debug!(sql, param_count = params.len(), "executing query");
        let rows = bind_params(sql, params).fetch_all(self).await?;
        Ok(rows)
    }

    async fn fetch_one(&self, sql: &str, params: &[Value]) -> Result<PgRow, QueryError> {
        debug!(sql, param_count = params.len(), "executing query");
        let row = bind_params(sql, params).fetch_one(self).await?;
        Ok(row)
    }

    async fn fetch_optional(
        &self,
        sql: &str,
        params: &[Value],
    ) -> Result<Option<PgRow>, QueryError> {
        debug!(sql, param_count = params.len(), "executing query");
        let row = bind_params(sql, params).fetch_optional(self).await?;
        Ok(row)
    }

    async fn fetch_scalar(&self, sql: &str, params: &[Value]) -> Result<i64, QueryError> {
        let row = self.fetch_one(sql, params).await?;
        let value: i64 = row.try_get(0)?;
        Ok(value)
    }
}

/// Stream rows through a caller-supplied transform.
///
/// Rows are fetched on a background task and forwarded through a channel;
/// the receiver implements `Stream`. A transform or database error is
/// forwarded once and terminates the stream, so downstream sees exactly one
/// end-of-stream signal.
pub fn stream_rows<T, F>(
    pool: PgPool,
    sql: String,
    params: Vec<Value>,
    transform: F,
) -> mpsc::Receiver<Result<T, QueryError>>
where
    T: Send + 'static,
    F: Fn(PgRow) -> Result<T, QueryError> + Send + 'static,
{
    let (sender, receiver) = mpsc::channel(32);

    tokio::spawn(async move {
        debug!(sql, "streaming query");
        let rows = bind_params(&sql, &params).fetch(&pool);
        forward_rows(rows, sender, transform).await;
    });

    receiver
}

/// Pull rows from a fallible row source, transform each, and forward the
/// results. A transform or database error is forwarded once and terminates
/// forwarding, as does receiver disconnect.
async fn forward_rows<R, S, T, F>(
    mut rows: S,
    mut sender: mpsc::Sender<Result<T, QueryError>>,
    transform: F,
) where
    S: Stream<Item = Result<R, sqlx::Error>> + Unpin,
    F: Fn(R) -> Result<T, QueryError>,
{
    loop {
        match rows.try_next().await {
            Ok(Some(row)) => {
                let item = transform(row);
                let failed = item.is_err();
                if sender.send(item).await.is_err() || failed {
                    break;
                }
            }
            Ok(None) => break,
            Err(error) => {
                let _ = sender.send(Err(QueryError::Database(error))).await;
                break;
            }
        }
    }
}

/// Drain a row stream into a vector, stopping at the first error.
pub async fn collect_stream<T>(
    mut receiver: mpsc::Receiver<Result<T, QueryError>>,
) -> Result<Vec<T>, QueryError> {
    let mut items = Vec::new();
    while let Some(item) = receiver.next().await {
        items.push(item?);
    }
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    #[tokio::test]
    async fn forwards_transformed_rows_until_end() {
        let (sender, receiver) = mpsc::channel(32);
        let rows = stream::iter([Ok::<i32, sqlx::Error>(1), Ok(2), Ok(3)]);
        forward_rows(rows, sender, |n| Ok(n * 2)).await;
        let items = collect_stream(receiver).await.unwrap();
        assert_eq!(items, vec![2, 4, 6]);
    }

    #[tokio::test]
    async fn transform_error_terminates_forwarding() {
        let (sender, mut receiver) = mpsc::channel(32);
        let rows = stream::iter([Ok::<i32, sqlx::Error>(1), Ok(2), Ok(3)]);
        forward_rows(rows, sender, |n| {
            if n == 2 {
                Err(QueryError::SelectorMissing)
            } else {
                Ok(n)
            }
        })
        .await;
        assert!(matches!(receiver.next().await, Some(Ok(1))));
        assert!(matches!(
            receiver.next().await,
            Some(Err(QueryError::SelectorMissing))
        ));
        assert!(receiver.next().await.is_none());
    }

    #[tokio::test]
    async fn database_error_is_forwarded_once() {
        let (sender, mut receiver) = mpsc::channel(32);
        let rows = stream::iter([Ok::<i32, sqlx::Error>(1), Err(sqlx::Error::RowNotFound)]);
        forward_rows(rows, sender, |n| Ok(n)).await;
        assert!(matches!(receiver.next().await, Some(Ok(1))));
        assert!(matches!(
            receiver.next().await,
            Some(Err(QueryError::Database(_)))
        ));
        assert!(receiver.next().await.is_none());
    }
}
