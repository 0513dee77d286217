//! Database access layer.
//!
//! This module provides SQL Server access:
//! - Per-call connections with connect and command timeouts
//! - Query execution
//! - Schema introspection
//! - Type mappings from TDS values to JSON

pub mod connection;
pub mod executor;
pub mod schema;
pub mod types;

pub use connection::{ConnectionFactory, SqlClient};
pub use executor::{QueryExecutor, ServerInfo};
pub use schema::SchemaInspector;
