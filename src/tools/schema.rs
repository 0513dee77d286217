//! Schema introspection tool.
//!
//! This module implements the `get_schema` MCP tool. Without a table name it
//! returns the table catalog; with one it returns that table's detail.

use crate::db::{QueryExecutor, SchemaInspector};
use crate::tools::envelope::Envelope;
use schemars::JsonSchema;
use serde::Deserialize;
use tracing::{info, warn};

/// Input for the get_schema tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct GetSchemaInput {
    /// ADO.NET connection string (Server=...;Database=...;User Id=...;Password=...)
    pub connection_string: String,
    /// Table to describe, optionally schema-qualified (dbo.Orders or [dbo].[Orders]).
    /// Omit to list all tables and views.
    #[serde(default)]
    pub table_name: Option<String>,
}

impl GetSchemaInput {
    /// The table to describe, or `None` for catalog mode.
    ///
    /// Blank names select catalog mode.
    pub fn target_table(&self) -> Option<&str> {
        self.table_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
    }
}

pub struct SchemaToolHandler {
    inspector: SchemaInspector,
}

impl SchemaToolHandler {
    pub fn new(executor: QueryExecutor) -> Self {
        Self {
            inspector: SchemaInspector::new(executor),
        }
    }

    pub async fn get_schema(&self, input: GetSchemaInput) -> Envelope {
        match input.target_table() {
            None => match self.inspector.list_tables(&input.connection_string).await {
                Ok(catalog) => {
                    info!(count = catalog.table_count, "Listed tables");
                    Envelope::Catalog(catalog)
                }
                Err(e) => {
                    warn!(error = %e, "Listing tables failed");
                    e.into()
                }
            },
            Some(table) => match self
                .inspector
                .describe_table(&input.connection_string, table)
                .await
            {
                Ok(detail) => {
                    info!(table = %table, columns = detail.column_count, "Described table");
                    Envelope::Detail(detail)
                }
                Err(e) => {
                    warn!(table = %table, error = %e, "Describing table failed");
                    e.into()
                }
            },
        }
    }
}

impl Default for SchemaToolHandler {
    fn default() -> Self {
        Self::new(QueryExecutor::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_get_schema_input_without_table() {
        let input: GetSchemaInput =
            serde_json::from_str(r#"{ "connection_string": "Server=localhost" }"#).unwrap();
        assert_eq!(input.table_name, None);
        assert_eq!(input.target_table(), None);
    }

    #[test]
    fn test_get_schema_input_with_table() {
        let input: GetSchemaInput = serde_json::from_str(
            r#"{ "connection_string": "Server=localhost", "table_name": "dbo.Orders" }"#,
        )
        .unwrap();
        assert_eq!(input.target_table(), Some("dbo.Orders"));
    }

    #[test]
    fn test_blank_table_name_selects_catalog() {
        let input = GetSchemaInput {
            connection_string: "Server=localhost".into(),
            table_name: Some("  ".into()),
        };
        assert_eq!(input.target_table(), None);
    }

    #[tokio::test]
    async fn test_bad_connection_is_error_envelope() {
        let handler = SchemaToolHandler::default();
        let envelope = handler
            .get_schema(GetSchemaInput {
                connection_string: String::new(),
                table_name: Some("Orders".into()),
            })
            .await;
        assert!(matches!(
            envelope,
            Envelope::Error {
                kind: ErrorKind::Error,
                ..
            }
        ));
    }
}
