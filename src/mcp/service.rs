//! MCP service implementation using rmcp.
//!
//! This module defines the SqlServerService struct with all SQL Server tools
//! exposed via the MCP protocol using the rmcp framework's macros.
//!
//! Domain failures never become MCP protocol errors: every tool answers with
//! text, and core tools answer with a JSON envelope.

use crate::config::Settings;
use crate::models::ConnectionStringParts;
use crate::tools::connection::{self, ConnectionToolHandler, HelloInput, TestConnectionInput};
use crate::tools::query::{QueryInput, QueryToolHandler};
use crate::tools::schema::{GetSchemaInput, SchemaToolHandler};
use crate::tools::sql_validator::QueryGate;
use rmcp::{
    ServerHandler,
    handler::server::tool::ToolRouter,
    handler::server::wrapper::Parameters,
    model::{Implementation, ProtocolVersion, ServerCapabilities, ServerInfo},
    tool, tool_handler, tool_router,
};
use std::sync::Arc;

#[derive(Clone)]
pub struct SqlServerService {
    /// Resolved settings shared by every call
    settings: Arc<Settings>,
    /// Gate applied to every `query` call
    gate: Arc<dyn QueryGate>,
    /// Tool router for MCP tool dispatch (auto-generated)
    tool_router: ToolRouter<Self>,
}

impl SqlServerService {
    /// Create a new SqlServerService, building the gate from `settings`.
    pub fn new(settings: Arc<Settings>) -> Self {
        let gate: Arc<dyn QueryGate> = Arc::from(settings.query_gate.build());
        Self::with_gate(settings, gate)
    }

    /// Create a new SqlServerService with an explicit gate.
    pub fn with_gate(settings: Arc<Settings>, gate: Arc<dyn QueryGate>) -> Self {
        Self {
            settings,
            gate,
            tool_router: Self::tool_router(),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Name of the active query gate.
    pub fn gate_name(&self) -> &'static str {
        self.gate.name()
    }
}

#[tool_router]
impl SqlServerService {
    #[tool(description = "A simple hello world tool to test connectivity")]
    async fn hello(&self, Parameters(input): Parameters<HelloInput>) -> String {
        connection::hello(input)
    }

    #[tool(
        description = "Get the default (Production) connection string from configuration.\nReturns an ERROR envelope when none is configured."
    )]
    async fn get_default_connection_string(&self) -> String {
        ConnectionToolHandler::new(self.settings.clone()).get_default_connection_string()
    }

    #[tool(
        description = "Test a connection to SQL Server.\nReports the server version and current database, or the connection failure message."
    )]
    async fn test_sql_connection(
        &self,
        Parameters(input): Parameters<TestConnectionInput>,
    ) -> String {
        ConnectionToolHandler::new(self.settings.clone())
            .test_sql_connection(input)
            .await
    }

    #[tool(
        description = "Build a SQL Server connection string from server, database, user id and password.\nThe result trusts the server certificate and enables MultipleActiveResultSets."
    )]
    async fn get_connection_string(
        &self,
        Parameters(input): Parameters<ConnectionStringParts>,
    ) -> String {
        connection::get_connection_string(input)
    }

    #[tool(
        description = "Execute a read-only SELECT query against SQL Server.\nStatements containing INSERT, UPDATE, DELETE, DROP, CREATE, ALTER, TRUNCATE, EXEC, EXECUTE, MERGE, GRANT, REVOKE or DENY are blocked.\nReturns {rowCount, columns, data} from the first result set, or {error, queryType} on failure."
    )]
    async fn query(&self, Parameters(input): Parameters<QueryInput>) -> String {
        let handler = QueryToolHandler::with_gate(self.gate.clone(), self.settings.executor());
        handler.query(input).await.to_json()
    }

    #[tool(
        description = "Get database schema information.\nWithout table_name: lists all tables and views ({tables, tableCount}).\nWith table_name (optionally schema-qualified, e.g. dbo.Orders): returns columns, key constraints and foreign keys."
    )]
    async fn get_schema(&self, Parameters(input): Parameters<GetSchemaInput>) -> String {
        let handler = SchemaToolHandler::new(self.settings.executor());
        handler.get_schema(input).await.to_json()
    }
}

#[tool_handler]
impl ServerHandler for SqlServerService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2025_03_26,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "mssql-mcp-server".to_owned(),
                title: Some("SQL Server MCP Server".to_owned()),
                version: env!("CARGO_PKG_VERSION").to_owned(),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Read-only tools for Microsoft SQL Server.\n\
                \n\
                ## Workflow\n\
                1. Call `get_default_connection_string` or build one with `get_connection_string`\n\
                2. Check it with `test_sql_connection`\n\
                3. Explore with `get_schema` (no table_name lists tables; a table_name describes one)\n\
                4. Run SELECT statements with `query`\n\
                \n\
                ## Results\n\
                - `query`: `{rowCount, columns, data}` for the first result set only\n\
                - Errors: `{error, queryType}` where queryType is `BLOCKED` (rejected before execution)\n\
                  or `ERROR` (connection, execution or lookup failure)\n\
                \n\
                ## Notes\n\
                - Any statement containing a write or DDL keyword is blocked, even inside comments or strings\n\
                - Bare table names match every schema; use `schema.table` to disambiguate"
                    .to_string(),
            ),
        }
    }
}
