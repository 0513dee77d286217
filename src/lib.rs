//! SQL Server MCP Server Library
//!
//! This library provides MCP (Model Context Protocol) tools for AI assistants
//! to run read-only queries against Microsoft SQL Server and inspect its schema.

pub mod config;
pub mod db;
pub mod error;
pub mod mcp;
pub mod models;
pub mod tools;
pub mod transport;

pub use config::{Config, Settings};
pub use error::DbError;
pub use mcp::SqlServerService;
