//! Uniform result payloads for MCP tools.
//!
//! Every core tool returns an [`Envelope`]: one of the three success shapes or
//! an error tagged `BLOCKED` (gate rejection) or `ERROR` (runtime failure).
//! Serialization is exhaustive over the enum and always pretty-printed.

use crate::error::{DbError, ErrorKind};
use crate::models::{QueryResult, TableCatalog, TableDetail};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq)]
pub enum Envelope {
    Query(QueryResult),
    Catalog(TableCatalog),
    Detail(TableDetail),
    Error { message: String, kind: ErrorKind },
}

/// Wire shape of an error envelope.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorPayload<'a> {
    error: &'a str,
    query_type: &'static str,
}

impl Envelope {
    pub fn blocked(reason: impl Into<String>) -> Self {
        Self::Error {
            message: reason.into(),
            kind: ErrorKind::Blocked,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
            kind: ErrorKind::Error,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }

    /// Serialize to pretty-printed JSON.
    pub fn to_json(&self) -> String {
        let result = match self {
            Self::Query(result) => serde_json::to_string_pretty(result),
            Self::Catalog(catalog) => serde_json::to_string_pretty(catalog),
            Self::Detail(detail) => serde_json::to_string_pretty(detail),
            Self::Error { message, kind } => serde_json::to_string_pretty(&ErrorPayload {
                error: message,
                query_type: kind.as_str(),
            }),
        };

        // Only reachable with a broken Serialize impl; keep the envelope well-formed.
        result.unwrap_or_else(|e| {
            format!(
                "{{\n  \"error\": {},\n  \"queryType\": \"ERROR\"\n}}",
                serde_json::Value::String(e.to_string())
            )
        })
    }
}

impl From<DbError> for Envelope {
    fn from(err: DbError) -> Self {
        Self::Error {
            message: err.message(),
            kind: err.kind(),
        }
    }
}

impl From<QueryResult> for Envelope {
    fn from(result: QueryResult) -> Self {
        Self::Query(result)
    }
}

impl From<TableCatalog> for Envelope {
    fn from(catalog: TableCatalog) -> Self {
        Self::Catalog(catalog)
    }
}

impl From<TableDetail> for Envelope {
    fn from(detail: TableDetail) -> Self {
        Self::Detail(detail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ColumnDetail, ForeignKeyEntry, TableCatalogEntry};
    use serde_json::{Value, json};

    fn parse(envelope: &Envelope) -> Value {
        serde_json::from_str(&envelope.to_json()).unwrap()
    }

    #[test]
    fn test_query_shape() {
        let envelope = Envelope::from(QueryResult::from_rows(
            vec!["x".into()],
            vec![vec![json!(1)]],
        ));
        assert_eq!(
            parse(&envelope),
            json!({ "rowCount": 1, "columns": ["x"], "data": [{ "x": 1 }] })
        );
    }

    #[test]
    fn test_output_is_pretty_printed() {
        let envelope = Envelope::from(QueryResult::empty());
        assert!(envelope.to_json().contains("\n  \"rowCount\""));
    }

    #[test]
    fn test_query_field_order() {
        let text = Envelope::from(QueryResult::empty()).to_json();
        let row_count = text.find("rowCount").unwrap();
        let columns = text.find("columns").unwrap();
        let data = text.find("data").unwrap();
        assert!(row_count < columns && columns < data);
    }

    #[test]
    fn test_catalog_shape() {
        let envelope = Envelope::from(TableCatalog::new(vec![TableCatalogEntry {
            schema: "dbo".into(),
            name: "Orders".into(),
            table_type: "BASE TABLE".into(),
        }]));
        assert_eq!(
            parse(&envelope),
            json!({
                "tables": [{ "schema": "dbo", "name": "Orders", "type": "BASE TABLE" }],
                "tableCount": 1
            })
        );
    }

    #[test]
    fn test_detail_shape() {
        let detail = TableDetail::new(
            "Orders",
            vec![ColumnDetail {
                name: "CustomerId".into(),
                data_type: "int".into(),
                max_length: None,
                precision: Some(10),
                scale: Some(0),
                nullable: true,
                default_value: None,
            }],
            vec![],
            vec![ForeignKeyEntry {
                name: "FK_Orders_Customers".into(),
                column: "CustomerId".into(),
                referenced_table: "Customers".into(),
                referenced_column: "Id".into(),
            }],
        );
        let value = parse(&Envelope::from(detail));
        assert_eq!(value["tableName"], "Orders");
        assert_eq!(value["columnCount"], 1);
        assert_eq!(value["constraints"], json!([]));
        assert_eq!(value["foreignKeys"][0]["referencedTable"], "Customers");
        assert_eq!(value["columns"][0]["maxLength"], Value::Null);
    }

    #[test]
    fn test_blocked_shape() {
        let value = parse(&Envelope::blocked("nope"));
        assert_eq!(value, json!({ "error": "nope", "queryType": "BLOCKED" }));
    }

    #[test]
    fn test_error_shape() {
        let value = parse(&Envelope::error("Login failed for user 'sa'."));
        assert_eq!(
            value,
            json!({ "error": "Login failed for user 'sa'.", "queryType": "ERROR" })
        );
    }

    #[test]
    fn test_from_db_error_keeps_kind() {
        let blocked = Envelope::from(DbError::blocked("gate"));
        assert!(matches!(blocked, Envelope::Error { kind: ErrorKind::Blocked, .. }));

        let failed = Envelope::from(DbError::execution("Invalid object name 'Foo'.", Some(208)));
        assert_eq!(
            failed,
            Envelope::Error {
                message: "Invalid object name 'Foo'.".into(),
                kind: ErrorKind::Error
            }
        );
    }
}
