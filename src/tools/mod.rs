//! MCP tool implementations.
//!
//! This module contains all tool handlers:
//! - `connection`: `hello`, `get_default_connection_string`, `test_sql_connection`,
//!   `get_connection_string`
//! - `query`: Execute gated SELECT queries
//! - `schema`: Table catalog and table detail
//! - `envelope`: Uniform JSON payloads for results and failures
//! - `sql_validator`: Query gates for read-only enforcement

pub mod connection;
pub mod envelope;
pub mod query;
pub mod schema;
pub mod sql_validator;

pub use connection::{ConnectionToolHandler, HelloInput, TestConnectionInput};
pub use envelope::Envelope;
pub use query::{QueryInput, QueryToolHandler};
pub use schema::{GetSchemaInput, SchemaToolHandler};
pub use sql_validator::{Classification, GateMode, KeywordGate, ParsingGate, QueryGate};
