//! Schema-related data models.
//!
//! This module defines the catalog and detail views produced by schema introspection.

use serde::{Deserialize, Serialize};

/// One table or view in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableCatalogEntry {
    pub schema: String,
    pub name: String,
    /// "BASE TABLE" or "VIEW"
    #[serde(rename = "type")]
    pub table_type: String,
}

/// All tables and views, ordered by (schema, name).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableCatalog {
    pub tables: Vec<TableCatalogEntry>,
    pub table_count: usize,
}

impl TableCatalog {
    /// Create a catalog; the count always equals the number of entries.
    pub fn new(tables: Vec<TableCatalogEntry>) -> Self {
        let table_count = tables.len();
        Self {
            tables,
            table_count,
        }
    }
}

/// A column of the inspected table.
///
/// Optional fields serialize as `null` rather than being omitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnDetail {
    pub name: String,
    pub data_type: String,
    /// Character length; -1 for (n)varchar(max)
    pub max_length: Option<i32>,
    pub precision: Option<i32>,
    pub scale: Option<i32>,
    pub nullable: bool,
    pub default_value: Option<String>,
}

/// A key/constraint column of the inspected table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstraintEntry {
    pub column: String,
    /// "PRIMARY KEY", "FOREIGN KEY", "UNIQUE", ...
    #[serde(rename = "type")]
    pub constraint_type: String,
    pub name: String,
}

/// A foreign key where the inspected table is the referencing side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForeignKeyEntry {
    pub name: String,
    pub column: String,
    pub referenced_table: String,
    pub referenced_column: String,
}

/// Detailed metadata for one table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableDetail {
    pub table_name: String,
    pub columns: Vec<ColumnDetail>,
    pub column_count: usize,
    pub constraints: Vec<ConstraintEntry>,
    pub foreign_keys: Vec<ForeignKeyEntry>,
}

impl TableDetail {
    /// Assemble the detail view from the three lookups.
    pub fn new(
        table_name: impl Into<String>,
        columns: Vec<ColumnDetail>,
        constraints: Vec<ConstraintEntry>,
        foreign_keys: Vec<ForeignKeyEntry>,
    ) -> Self {
        let column_count = columns.len();
        Self {
            table_name: table_name.into(),
            columns,
            column_count,
            constraints,
            foreign_keys,
        }
    }
}

/// A possibly schema-qualified table reference.
///
/// `Orders`, `dbo.Orders` and `[dbo].[Orders]` are accepted. Without a schema
/// the lookups match the bare name in every schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRef {
    pub schema: Option<String>,
    pub name: String,
}

impl TableRef {
    pub fn parse(input: &str) -> Self {
        let input = input.trim();
        let parts = split_qualified(input);
        match parts.as_slice() {
            [schema, name] if !schema.is_empty() && !name.is_empty() => Self {
                schema: Some(schema.clone()),
                name: name.clone(),
            },
            [name] if input.starts_with('[') && input.ends_with(']') && !name.is_empty() => {
                Self {
                    schema: None,
                    name: name.clone(),
                }
            }
            _ => Self {
                schema: None,
                name: input.to_string(),
            },
        }
    }
}

/// Split on dots that are not inside `[...]`, dropping the brackets.
///
/// Inside brackets `]]` is an escaped `]`.
fn split_qualified(input: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut in_brackets = false;
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '[' if !in_brackets => in_brackets = true,
            ']' if in_brackets => {
                if chars.peek() == Some(&']') {
                    chars.next();
                    current.push(']');
                } else {
                    in_brackets = false;
                }
            }
            '.' if !in_brackets => parts.push(std::mem::take(&mut current)),
            _ => current.push(ch),
        }
    }
    parts.push(current);
    parts
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_catalog_count_matches() {
        let catalog = TableCatalog::new(vec![TableCatalogEntry {
            schema: "dbo".into(),
            name: "Orders".into(),
            table_type: "BASE TABLE".into(),
        }]);
        assert_eq!(catalog.table_count, catalog.tables.len());
    }

    #[test]
    fn test_column_detail_serializes_nulls() {
        let column = ColumnDetail {
            name: "Id".into(),
            data_type: "int".into(),
            max_length: None,
            precision: Some(10),
            scale: Some(0),
            nullable: false,
            default_value: None,
        };
        assert_eq!(
            serde_json::to_value(&column).unwrap(),
            json!({
                "name": "Id",
                "dataType": "int",
                "maxLength": null,
                "precision": 10,
                "scale": 0,
                "nullable": false,
                "defaultValue": null
            })
        );
    }

    #[test]
    fn test_constraint_type_field_name() {
        let entry = ConstraintEntry {
            column: "Id".into(),
            constraint_type: "PRIMARY KEY".into(),
            name: "PK_Orders".into(),
        };
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["type"], "PRIMARY KEY");
    }

    #[test]
    fn test_table_ref_bare() {
        let r = TableRef::parse("Orders");
        assert_eq!(r.schema, None);
        assert_eq!(r.name, "Orders");
    }

    #[test]
    fn test_table_ref_qualified() {
        let r = TableRef::parse("sales.Orders");
        assert_eq!(r.schema.as_deref(), Some("sales"));
        assert_eq!(r.name, "Orders");
    }

    #[test]
    fn test_table_ref_bracketed() {
        let r = TableRef::parse("[my schema].[Order.Lines]");
        assert_eq!(r.schema.as_deref(), Some("my schema"));
        assert_eq!(r.name, "Order.Lines");

        let r = TableRef::parse("[Order.Lines]");
        assert_eq!(r.schema, None);
        assert_eq!(r.name, "Order.Lines");
    }

    #[test]
    fn test_table_ref_escaped_bracket() {
        let r = TableRef::parse("[a]]b]");
        assert_eq!(r.schema, None);
        assert_eq!(r.name, "a]b");

        let r = TableRef::parse("[dbo].[x]]y.z]");
        assert_eq!(r.schema.as_deref(), Some("dbo"));
        assert_eq!(r.name, "x]y.z");
    }

    #[test]
    fn test_table_ref_malformed_falls_back_to_bare_name() {
        assert_eq!(TableRef::parse(".Orders").name, ".Orders");
        assert_eq!(TableRef::parse("a.b.c").name, "a.b.c");
    }
}
