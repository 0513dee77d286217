//! Schema introspection.
//!
//! Catalog mode lists every table and view; detail mode runs three lookups
//! (columns, key constraints, foreign keys) on one connection and combines
//! them. A failure in any lookup fails the whole call, so partial detail is
//! never returned.
//!
//! All lookups are parameterized. `@P2` carries the schema filter and is the
//! empty string when the caller gave a bare table name.

use crate::db::connection::{SqlClient, with_timeout};
use crate::db::executor::QueryExecutor;
use crate::error::{DbError, DbResult};
use crate::models::{
    ColumnDetail, ConstraintEntry, ForeignKeyEntry, TableCatalog, TableCatalogEntry, TableDetail,
    TableRef,
};
use tiberius::Row;
use tracing::debug;

const TABLES_QUERY: &str = r#"
    SELECT
        t.TABLE_SCHEMA,
        t.TABLE_NAME,
        t.TABLE_TYPE
    FROM INFORMATION_SCHEMA.TABLES t
    WHERE t.TABLE_TYPE IN ('BASE TABLE', 'VIEW')
    ORDER BY t.TABLE_SCHEMA, t.TABLE_NAME"#;

const COLUMNS_QUERY: &str = r#"
    SELECT
        c.COLUMN_NAME,
        c.DATA_TYPE,
        CAST(c.CHARACTER_MAXIMUM_LENGTH AS int) AS CHARACTER_MAXIMUM_LENGTH,
        CAST(c.NUMERIC_PRECISION AS int) AS NUMERIC_PRECISION,
        CAST(c.NUMERIC_SCALE AS int) AS NUMERIC_SCALE,
        c.IS_NULLABLE,
        c.COLUMN_DEFAULT
    FROM INFORMATION_SCHEMA.COLUMNS c
    WHERE c.TABLE_NAME = @P1
      AND (@P2 = N'' OR c.TABLE_SCHEMA = @P2)
    ORDER BY c.ORDINAL_POSITION"#;

const CONSTRAINTS_QUERY: &str = r#"
    SELECT
        kcu.COLUMN_NAME,
        tc.CONSTRAINT_TYPE,
        tc.CONSTRAINT_NAME
    FROM INFORMATION_SCHEMA.KEY_COLUMN_USAGE kcu
    JOIN INFORMATION_SCHEMA.TABLE_CONSTRAINTS tc
        ON kcu.CONSTRAINT_NAME = tc.CONSTRAINT_NAME
    WHERE kcu.TABLE_NAME = @P1
      AND (@P2 = N'' OR kcu.TABLE_SCHEMA = @P2)
    ORDER BY tc.CONSTRAINT_TYPE, kcu.ORDINAL_POSITION"#;

const FOREIGN_KEYS_QUERY: &str = r#"
    SELECT
        fk.name AS FK_NAME,
        cp.name AS PARENT_COLUMN,
        rt.name AS REFERENCED_TABLE,
        cr.name AS REFERENCED_COLUMN
    FROM sys.foreign_keys fk
    INNER JOIN sys.foreign_key_columns fkc ON fk.object_id = fkc.constraint_object_id
    INNER JOIN sys.tables t ON fkc.parent_object_id = t.object_id
    INNER JOIN sys.columns cp ON fkc.parent_object_id = cp.object_id AND fkc.parent_column_id = cp.column_id
    INNER JOIN sys.tables rt ON fkc.referenced_object_id = rt.object_id
    INNER JOIN sys.columns cr ON fkc.referenced_object_id = cr.object_id AND fkc.referenced_column_id = cr.column_id
    WHERE t.name = @P1
      AND (@P2 = N'' OR SCHEMA_NAME(t.schema_id) = @P2)
    ORDER BY fk.name, fkc.constraint_column_id"#;

/// Schema inspector for SQL Server metadata.
pub struct SchemaInspector {
    executor: QueryExecutor,
}

impl SchemaInspector {
    pub fn new(executor: QueryExecutor) -> Self {
        Self { executor }
    }

    /// List all tables and views, ordered by (schema, name).
    pub async fn list_tables(&self, connection_string: &str) -> DbResult<TableCatalog> {
        let mut client = self.executor.connections().connect(connection_string).await?;
        let tables = self
            .lookup(&mut client, "tables", TABLES_QUERY, None, table_from_row)
            .await?;

        debug!(count = tables.len(), "Listed tables");
        Ok(TableCatalog::new(tables))
    }

    /// Describe one table: columns, key constraints and outgoing foreign keys.
    pub async fn describe_table(
        &self,
        connection_string: &str,
        table_name: &str,
    ) -> DbResult<TableDetail> {
        let table = TableRef::parse(table_name);
        if table.name.is_empty() {
            return Err(DbError::invalid_input("Table name is empty"));
        }

        let mut client = self.executor.connections().connect(connection_string).await?;
        let filter = Some(&table);

        let columns = self
            .lookup(&mut client, "columns", COLUMNS_QUERY, filter, column_from_row)
            .await?;
        let constraints = self
            .lookup(
                &mut client,
                "constraints",
                CONSTRAINTS_QUERY,
                filter,
                constraint_from_row,
            )
            .await?;
        let foreign_keys = self
            .lookup(
                &mut client,
                "foreign_keys",
                FOREIGN_KEYS_QUERY,
                filter,
                foreign_key_from_row,
            )
            .await?;

        debug!(
            table = %table_name,
            columns = columns.len(),
            constraints = constraints.len(),
            foreign_keys = foreign_keys.len(),
            "Described table"
        );

        Ok(TableDetail::new(
            table_name,
            columns,
            constraints,
            foreign_keys,
        ))
    }

    /// Run one metadata query and map every row.
    async fn lookup<T>(
        &self,
        client: &mut SqlClient,
        name: &str,
        sql: &str,
        table: Option<&TableRef>,
        map: fn(&Row) -> DbResult<T>,
    ) -> DbResult<Vec<T>> {
        let fut = async {
            let stream = match table {
                Some(table) => {
                    let schema = table.schema.as_deref().unwrap_or("");
                    client.query(sql, &[&table.name.as_str(), &schema]).await?
                }
                None => client.query(sql, &[]).await?,
            };
            let rows = stream.into_first_result().await?;
            rows.iter().map(map).collect::<DbResult<Vec<T>>>()
        };

        with_timeout(name, self.executor.query_timeout(), fut)
            .await
            .map_err(|e| e.in_lookup(name))
    }
}

fn text(row: &Row, column: &str) -> DbResult<String> {
    Ok(row
        .try_get::<&str, _>(column)?
        .unwrap_or_default()
        .to_string())
}

fn table_from_row(row: &Row) -> DbResult<TableCatalogEntry> {
    Ok(TableCatalogEntry {
        schema: text(row, "TABLE_SCHEMA")?,
        name: text(row, "TABLE_NAME")?,
        table_type: text(row, "TABLE_TYPE")?,
    })
}

fn column_from_row(row: &Row) -> DbResult<ColumnDetail> {
    Ok(ColumnDetail {
        name: text(row, "COLUMN_NAME")?,
        data_type: text(row, "DATA_TYPE")?,
        max_length: row.try_get::<i32, _>("CHARACTER_MAXIMUM_LENGTH")?,
        precision: row.try_get::<i32, _>("NUMERIC_PRECISION")?,
        scale: row.try_get::<i32, _>("NUMERIC_SCALE")?,
        nullable: is_nullable(row.try_get::<&str, _>("IS_NULLABLE")?),
        default_value: row
            .try_get::<&str, _>("COLUMN_DEFAULT")?
            .map(str::to_string),
    })
}

fn constraint_from_row(row: &Row) -> DbResult<ConstraintEntry> {
    Ok(ConstraintEntry {
        column: text(row, "COLUMN_NAME")?,
        constraint_type: text(row, "CONSTRAINT_TYPE")?,
        name: text(row, "CONSTRAINT_NAME")?,
    })
}

fn foreign_key_from_row(row: &Row) -> DbResult<ForeignKeyEntry> {
    Ok(ForeignKeyEntry {
        name: text(row, "FK_NAME")?,
        column: text(row, "PARENT_COLUMN")?,
        referenced_table: text(row, "REFERENCED_TABLE")?,
        referenced_column: text(row, "REFERENCED_COLUMN")?,
    })
}

/// `IS_NULLABLE` holds "YES" or "NO".
fn is_nullable(flag: Option<&str>) -> bool {
    flag == Some("YES")
}
