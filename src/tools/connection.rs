//! Connectivity and connection-string tools.
//!
//! These tools return plain text rather than an [`Envelope`], except for
//! `get_default_connection_string`, which reports a missing entry as an
//! `ERROR` envelope.

use crate::config::Settings;
use crate::db::QueryExecutor;
use crate::models::ConnectionStringParts;
use crate::tools::envelope::Envelope;
use schemars::JsonSchema;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};

/// Input for the hello tool.
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct HelloInput {
    /// Name to greet. Defaults to "World".
    #[serde(default)]
    pub name: Option<String>,
}

/// Input for the test_sql_connection tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct TestConnectionInput {
    /// ADO.NET connection string to test
    pub connection_string: String,
}

/// Greeting used to check that the server is reachable.
pub fn hello(input: HelloInput) -> String {
    format!(
        "Hello, {}! This is the SQL Server MCP Server responding.",
        input.name.as_deref().unwrap_or("World")
    )
}

/// Build a connection string from its parts.
pub fn get_connection_string(parts: ConnectionStringParts) -> String {
    parts.build()
}

/// Handler for tools that need settings or a live connection.
pub struct ConnectionToolHandler {
    settings: Arc<Settings>,
    executor: QueryExecutor,
}

impl ConnectionToolHandler {
    pub fn new(settings: Arc<Settings>) -> Self {
        let executor = settings.executor();
        Self { settings, executor }
    }

    /// The configured `Production` connection string, verbatim.
    pub fn get_default_connection_string(&self) -> String {
        match self.settings.default_connection_string() {
            Ok(connection_string) => connection_string.to_string(),
            Err(e) => {
                warn!(error = %e, "Default connection string requested but not configured");
                Envelope::from(e).to_json()
            }
        }
    }

    /// Open a connection and report server version and database.
    pub async fn test_sql_connection(&self, input: TestConnectionInput) -> String {
        match self.executor.server_info(&input.connection_string).await {
            Ok(server) => {
                info!(version = %server.version, database = %server.database, "Connection test succeeded");
                format!(
                    "Successfully connected to SQL Server!\nServer Version: {}\nDatabase: {}",
                    server.version, server.database
                )
            }
            Err(e) => {
                warn!(error = %e, "Connection test failed");
                format!("Connection failed: {}", e.message())
            }
        }
    }
}
