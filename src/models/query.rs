//! Query-related data models.
//!
//! This module defines the record set returned by the `query` tool.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Default query (command) timeout in seconds.
pub const DEFAULT_QUERY_TIMEOUT_SECS: u64 = 30;

/// A fully buffered result set.
///
/// Every record in `data` has exactly the keys in `columns`, in the same order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResult {
    pub row_count: usize,
    pub columns: Vec<String>,
    pub data: Vec<serde_json::Map<String, JsonValue>>,
}

impl QueryResult {
    /// Create an empty result (statement produced no result set).
    pub fn empty() -> Self {
        Self {
            row_count: 0,
            columns: Vec::new(),
            data: Vec::new(),
        }
    }

    /// Build a result from column names and positional row values.
    ///
    /// Rows shorter than `columns` are padded with `null`; extra values are ignored.
    pub fn from_rows(columns: Vec<String>, rows: Vec<Vec<JsonValue>>) -> Self {
        let data: Vec<_> = rows
            .into_iter()
            .map(|values| {
                let mut values = values.into_iter();
                columns
                    .iter()
                    .map(|name| (name.clone(), values.next().unwrap_or(JsonValue::Null)))
                    .collect::<serde_json::Map<_, _>>()
            })
            .collect();

        Self {
            row_count: data.len(),
            columns,
            data,
        }
    }

    /// Check if the result has no rows.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
