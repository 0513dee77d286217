//! Data models for the SQL Server MCP Server.
//!
//! This module re-exports all model types used throughout the application.

pub mod connection;
pub mod query;
pub mod schema;

// Re-export commonly used types
pub use connection::ConnectionStringParts;
pub use query::{DEFAULT_QUERY_TIMEOUT_SECS, QueryResult};
pub use schema::{
    ColumnDetail, ConstraintEntry, ForeignKeyEntry, TableCatalog, TableCatalogEntry, TableDetail,
    TableRef,
};
