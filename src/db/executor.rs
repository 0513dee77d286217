//! Query execution engine.
//!
//! This module runs statements that already passed the query gate:
//! - One connection per call, dropped when the call returns
//! - The first result set is buffered completely (no paging, no row limit)
//! - Execution is bounded by the command timeout
//!
//! Column names come from the driver metadata, so an empty result set still
//! reports its columns.

use crate::db::connection::{ConnectionFactory, SqlClient, with_timeout};
use crate::db::types::{row_values, unique_column_names};
use crate::error::{DbError, DbResult};
use crate::models::{DEFAULT_QUERY_TIMEOUT_SECS, QueryResult};
use futures_util::TryStreamExt;
use std::time::{Duration, Instant};
use tiberius::QueryItem;
use tracing::debug;

/// Version and current database reported by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerInfo {
    pub version: String,
    pub database: String,
}

/// Query executor that handles database query execution.
#[derive(Debug, Clone, Copy)]
pub struct QueryExecutor {
    connections: ConnectionFactory,
    query_timeout: Duration,
}

impl QueryExecutor {
    /// Create a new query executor with default settings.
    pub fn new() -> Self {
        Self {
            connections: ConnectionFactory::default(),
            query_timeout: Duration::from_secs(DEFAULT_QUERY_TIMEOUT_SECS),
        }
    }

    /// Create a new query executor with custom settings.
    pub fn with_settings(connections: ConnectionFactory, query_timeout: Duration) -> Self {
        Self {
            connections,
            query_timeout,
        }
    }

    pub fn connections(&self) -> ConnectionFactory {
        self.connections
    }

    pub fn query_timeout(&self) -> Duration {
        self.query_timeout
    }

    /// Execute a statement and buffer its first result set.
    pub async fn execute_query(&self, connection_string: &str, sql: &str) -> DbResult<QueryResult> {
        let start = Instant::now();
        let mut client = self.connections.connect(connection_string).await?;

        debug!(
            sql = %sql,
            timeout_secs = self.query_timeout.as_secs(),
            "Executing query"
        );

        let result = with_timeout(
            "query execution",
            self.query_timeout,
            fetch_first_result(&mut client, sql),
        )
        .await?;

        debug!(
            row_count = result.row_count,
            columns = result.columns.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Query completed"
        );
        Ok(result)
    }

    /// Report server version and current database.
    pub async fn server_info(&self, connection_string: &str) -> DbResult<ServerInfo> {
        let mut client = self.connections.connect(connection_string).await?;

        with_timeout("server info", self.query_timeout, async {
            let row = client
                .simple_query(
                    "SELECT CAST(SERVERPROPERTY('ProductVersion') AS nvarchar(128)), DB_NAME()",
                )
                .await?
                .into_row()
                .await?
                .ok_or_else(|| DbError::internal("Server returned no version row"))?;

            Ok(ServerInfo {
                version: row.try_get::<&str, _>(0)?.unwrap_or_default().to_string(),
                database: row.try_get::<&str, _>(1)?.unwrap_or_default().to_string(),
            })
        })
        .await
    }
}

impl Default for QueryExecutor {
    fn default() -> Self {
        Self::new()
    }
}

/// Run `sql` as a batch and keep only the first result set.
///
/// The rest of the stream is still drained so that errors raised by later
/// statements in the batch are reported.
async fn fetch_first_result(client: &mut SqlClient, sql: &str) -> DbResult<QueryResult> {
    let mut stream = client.simple_query(sql).await?;
    let mut columns: Option<Vec<String>> = None;
    let mut rows = Vec::new();

    while let Some(item) = stream.try_next().await? {
        match item {
            QueryItem::Metadata(meta) if meta.result_index() == 0 => {
                columns = Some(unique_column_names(
                    meta.columns().iter().map(|c| c.name()),
                ));
            }
            QueryItem::Row(row) if row.result_index() == 0 => rows.push(row_values(row)),
            _ => {}
        }
    }

    Ok(match columns {
        Some(columns) => QueryResult::from_rows(columns, rows),
        None => QueryResult::empty(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_executor_defaults() {
        let executor = QueryExecutor::new();
        assert_eq!(
            executor.query_timeout(),
            Duration::from_secs(DEFAULT_QUERY_TIMEOUT_SECS)
        );
    }

    #[test]
    fn test_executor_custom_settings() {
        let executor = QueryExecutor::with_settings(
            ConnectionFactory::new(Duration::from_secs(3)),
            Duration::from_secs(90),
        );
        assert_eq!(executor.query_timeout(), Duration::from_secs(90));
    }

    #[tokio::test]
    async fn test_invalid_connection_string_fails_before_io() {
        let executor = QueryExecutor::new();
        let err = executor.execute_query("", "SELECT 1").await.unwrap_err();
        assert!(matches!(err, DbError::InvalidInput { .. }));
    }
}
