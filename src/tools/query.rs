//! Query execution tool.
//!
//! This module implements the `query` MCP tool. Every statement is classified
//! by the configured [`QueryGate`] before anything touches the database; a
//! blocked statement never opens a connection.

use crate::db::QueryExecutor;
use crate::tools::envelope::Envelope;
use crate::tools::sql_validator::{Classification, KeywordGate, QueryGate, SqlStatement};
use schemars::JsonSchema;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};

/// Input for the query tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct QueryInput {
    /// ADO.NET connection string (Server=...;Database=...;User Id=...;Password=...)
    pub connection_string: String,
    /// SQL SELECT statement to execute. Statements containing write or DDL keywords are blocked.
    pub sql: String,
}

/// Handler for query execution.
pub struct QueryToolHandler {
    gate: Arc<dyn QueryGate>,
    executor: QueryExecutor,
}

impl QueryToolHandler {
    /// Create a new query tool handler with the keyword gate and default timeouts.
    pub fn new() -> Self {
        Self::with_gate(Arc::new(KeywordGate), QueryExecutor::new())
    }

    /// Create a new query tool handler with a custom gate and executor.
    pub fn with_gate(gate: Arc<dyn QueryGate>, executor: QueryExecutor) -> Self {
        Self { gate, executor }
    }

    /// Classify, execute and serialize.
    pub async fn query(&self, input: QueryInput) -> Envelope {
        let statement = SqlStatement::classify(input.sql, self.gate.as_ref());

        if let Classification::Blocked(reason) = statement.classification() {
            info!(gate = self.gate.name(), "Query blocked");
            return Envelope::blocked(reason.clone());
        }

        match self
            .executor
            .execute_query(&input.connection_string, statement.text())
            .await
        {
            Ok(result) => {
                info!(row_count = result.row_count, "Query executed");
                Envelope::Query(result)
            }
            Err(e) => {
                warn!(error = %e, "Query failed");
                e.into()
            }
        }
    }
}

impl Default for QueryToolHandler {
    fn default() -> Self {
        Self::new()
    }
}
