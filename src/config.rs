//! Configuration handling for the SQL Server MCP Server.
//!
//! CLI arguments and environment variables are parsed into [`Config`]. At startup
//! the config is resolved into [`Settings`], an immutable value shared with the
//! MCP service.
//!
//! Named connection strings are merged from three sources, later ones winning:
//! 1. The `ConnectionStrings` section of the settings file (`appsettings.json`)
//! 2. Environment variables `ConnectionStrings__<Name>` (and the
//!    `SQLCONNSTR_`, `SQLAZURECONNSTR_`, `CUSTOMCONNSTR_` prefixes)
//! 3. `--connection-string <NAME=VALUE>` arguments
//!
//! Names are matched case-insensitively.

use crate::db::{ConnectionFactory, QueryExecutor};
use crate::error::{DbError, DbResult};
use crate::tools::sql_validator::GateMode;
use clap::{Parser, ValueEnum};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

pub const DEFAULT_HTTP_HOST: &str = "127.0.0.1";
pub const DEFAULT_HTTP_PORT: u16 = 8080;
pub const DEFAULT_MCP_ENDPOINT: &str = "/";
pub const DEFAULT_QUERY_TIMEOUT_SECS: u64 = crate::models::DEFAULT_QUERY_TIMEOUT_SECS;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = crate::db::connection::DEFAULT_CONNECT_TIMEOUT_SECS;

/// Settings file read when `--settings` is not given. Optional.
pub const DEFAULT_SETTINGS_FILE: &str = "appsettings.json";

/// Connection name served by `get_default_connection_string`.
pub const DEFAULT_CONNECTION_NAME: &str = "Production";

/// Environment prefix for hierarchical connection string keys.
const ENV_SECTION_PREFIX: &str = "ConnectionStrings__";

/// Legacy provider-specific environment prefixes.
const ENV_PROVIDER_PREFIXES: &[&str] = &["SQLCONNSTR_", "SQLAZURECONNSTR_", "CUSTOMCONNSTR_"];

/// Transport mode for the MCP server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum TransportMode {
    /// Standard input/output (for CLI integration)
    #[default]
    Stdio,
    /// Streamable HTTP (for web clients)
    Http,
}

impl std::fmt::Display for TransportMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stdio => write!(f, "stdio"),
            Self::Http => write!(f, "http"),
        }
    }
}

/// Configuration for the SQL Server MCP Server.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "mssql-mcp-server",
    about = "MCP server for SQL Server - lets AI assistants run read-only queries and inspect schemas",
    version,
    author
)]
pub struct Config {
    /// Settings file with a "ConnectionStrings" section.
    /// Defaults to ./appsettings.json when present.
    #[arg(long = "settings", value_name = "FILE", env = "MCP_SETTINGS_FILE")]
    pub settings: Option<PathBuf>,

    /// Named connection string in NAME=VALUE form, e.g.
    /// "Production=Server=tcp:db,1433;Database=Sales;User Id=app;Password=...".
    /// Can be specified multiple times.
    #[arg(
        short = 'c',
        long = "connection-string",
        value_name = "NAME=VALUE",
        env = "MCP_CONNECTION_STRING"
    )]
    pub connection_strings: Vec<String>,

    /// Transport mode (stdio or http)
    #[arg(
        short,
        long,
        value_enum,
        default_value = "stdio",
        env = "MCP_TRANSPORT"
    )]
    pub transport: TransportMode,

    /// HTTP host to bind to (only used with http transport)
    #[arg(
        long,
        default_value = DEFAULT_HTTP_HOST,
        env = "MCP_HTTP_HOST"
    )]
    pub http_host: String,

    /// HTTP port to bind to (only used with http transport)
    #[arg(
        long,
        default_value_t = DEFAULT_HTTP_PORT,
        env = "MCP_HTTP_PORT"
    )]
    pub http_port: u16,

    /// MCP endpoint path (only used with http transport)
    #[arg(
        long,
        default_value = DEFAULT_MCP_ENDPOINT,
        env = "MCP_ENDPOINT"
    )]
    pub mcp_endpoint: String,

    /// Command timeout in seconds
    #[arg(
        long,
        default_value_t = DEFAULT_QUERY_TIMEOUT_SECS,
        env = "MCP_QUERY_TIMEOUT"
    )]
    pub query_timeout: u64,

    /// Connect and login timeout in seconds
    #[arg(
        long,
        default_value_t = DEFAULT_CONNECT_TIMEOUT_SECS,
        env = "MCP_CONNECT_TIMEOUT"
    )]
    pub connect_timeout: u64,

    /// Query gate: "keyword" (denylist scan) or "strict" (denylist plus SQL parsing)
    #[arg(long, value_enum, default_value = "keyword", env = "MCP_QUERY_GATE")]
    pub query_gate: GateMode,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "MCP_LOG_LEVEL")]
    pub log_level: String,

    /// Enable JSON logging format
    #[arg(long, env = "MCP_JSON_LOGS")]
    pub json_logs: bool,

    /// Enable logging output (disabled by default to avoid interfering with stdio transport)
    #[arg(long, env = "MCP_ENABLE_LOGS")]
    pub enable_logs: bool,
}

impl Config {
    /// Parse configuration from command line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Create a default configuration (useful for testing).
    pub fn default_config() -> Self {
        Self {
            settings: None,
            connection_strings: Vec::new(),
            transport: TransportMode::Stdio,
            http_host: DEFAULT_HTTP_HOST.to_string(),
            http_port: DEFAULT_HTTP_PORT,
            mcp_endpoint: DEFAULT_MCP_ENDPOINT.to_string(),
            query_timeout: DEFAULT_QUERY_TIMEOUT_SECS,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT_SECS,
            query_gate: GateMode::Keyword,
            log_level: "info".to_string(),
            json_logs: false,
            enable_logs: false,
        }
    }

    /// Get the HTTP bind address.
    pub fn http_bind_addr(&self) -> String {
        format!("{}:{}", self.http_host, self.http_port)
    }

    /// Get the query timeout as a Duration.
    pub fn query_timeout_duration(&self) -> Duration {
        Duration::from_secs(self.query_timeout)
    }

    /// Get the connection timeout as a Duration.
    pub fn connect_timeout_duration(&self) -> Duration {
        Duration::from_secs(self.connect_timeout)
    }

    /// Settings file to read, and whether it must exist.
    pub fn settings_file(&self) -> (PathBuf, bool) {
        match &self.settings {
            Some(path) => (path.clone(), true),
            None => (PathBuf::from(DEFAULT_SETTINGS_FILE), false),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::default_config()
    }
}

/// Named connection strings with case-insensitive lookup.
#[derive(Debug, Clone, Default)]
pub struct ConnectionStrings {
    /// Keyed by lowercased name; holds (name as given, value).
    entries: BTreeMap<String, (String, String)>,
}

impl ConnectionStrings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a connection string.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        self.entries
            .insert(name.to_lowercase(), (name, value.into()));
    }

    /// Look up a connection string. Empty values count as missing.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .get(&name.to_lowercase())
            .map(|(_, value)| value.as_str())
            .filter(|value| !value.is_empty())
    }

    /// Configured names, as given.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.values().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Read the `ConnectionStrings` section of a settings document.
    ///
    /// A document without the section yields an empty set. Non-string values are
    /// skipped.
    pub fn from_settings_json(text: &str) -> DbResult<Self> {
        let document: JsonValue = serde_json::from_str(text)
            .map_err(|e| DbError::invalid_input(format!("Settings file is not valid JSON: {e}")))?;

        let mut strings = Self::new();
        let section = document.as_object().and_then(|root| {
            root.iter()
                .find(|(key, _)| key.eq_ignore_ascii_case("ConnectionStrings"))
                .map(|(_, value)| value)
        });

        if let Some(JsonValue::Object(section)) = section {
            for (name, value) in section {
                match value {
                    JsonValue::String(value) => strings.insert(name.as_str(), value.as_str()),
                    _ => warn!(name = %name, "Ignoring non-string connection string entry"),
                }
            }
        }

        Ok(strings)
    }

    /// Load a settings file. A missing file is an error only when `required`.
    pub fn from_settings_file(path: &Path, required: bool) -> DbResult<Self> {
        match std::fs::read_to_string(path) {
            Ok(text) => Self::from_settings_json(&text).map_err(|e| {
                DbError::invalid_input(format!("{}: {}", path.display(), e.message()))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound && !required => {
                debug!(path = %path.display(), "No settings file");
                Ok(Self::new())
            }
            Err(e) => Err(DbError::config_missing(format!(
                "Cannot read settings file {}: {}",
                path.display(),
                e
            ))),
        }
    }

    /// Overlay connection strings found in environment variables.
    pub fn merge_env<I>(&mut self, vars: I)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in vars {
            if let Some(name) = env_connection_name(&key) {
                self.insert(name, value);
            }
        }
    }

    /// Overlay `NAME=VALUE` entries from the command line.
    pub fn merge_args(&mut self, entries: &[String]) -> DbResult<()> {
        for entry in entries {
            let (name, value) = parse_named_entry(entry)?;
            self.insert(name, value);
        }
        Ok(())
    }
}

/// Connection name encoded in an environment variable key, if any.
fn env_connection_name(key: &str) -> Option<&str> {
    let prefixes = std::iter::once(ENV_SECTION_PREFIX).chain(ENV_PROVIDER_PREFIXES.iter().copied());
    for prefix in prefixes {
        if key.len() > prefix.len()
            && key.is_char_boundary(prefix.len())
            && key[..prefix.len()].eq_ignore_ascii_case(prefix)
        {
            return Some(&key[prefix.len()..]);
        }
    }
    None
}

/// Split `NAME=VALUE` at the first `=`.
fn parse_named_entry(entry: &str) -> DbResult<(&str, &str)> {
    let (name, value) = entry.split_once('=').ok_or_else(|| {
        DbError::invalid_input(format!(
            "Connection string argument must be NAME=VALUE, e.g. {}=Server=...",
            DEFAULT_CONNECTION_NAME
        ))
    })?;

    let name = name.trim();
    if name.is_empty() {
        return Err(DbError::invalid_input("Connection string name is empty"));
    }
    Ok((name, value.trim()))
}

/// Resolved runtime settings, built once at startup.
#[derive(Debug, Clone)]
pub struct Settings {
    pub connection_strings: ConnectionStrings,
    pub query_timeout: Duration,
    pub connect_timeout: Duration,
    pub query_gate: GateMode,
}

impl Settings {
    /// Resolve settings from parsed arguments and the process environment.
    pub fn from_config(config: &Config) -> DbResult<Self> {
        Self::resolve(config, std::env::vars())
    }

    /// Resolve settings from parsed arguments and the given environment.
    pub fn resolve<I>(config: &Config, env: I) -> DbResult<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let (path, required) = config.settings_file();
        let mut connection_strings = ConnectionStrings::from_settings_file(&path, required)?;
        connection_strings.merge_env(env);
        connection_strings.merge_args(&config.connection_strings)?;

        let names: Vec<&str> = connection_strings.names().collect();
        debug!(names = ?names, "Resolved connection strings");

        Ok(Self {
            connection_strings,
            query_timeout: config.query_timeout_duration(),
            connect_timeout: config.connect_timeout_duration(),
            query_gate: config.query_gate,
        })
    }

    /// The `Production` connection string.
    pub fn default_connection_string(&self) -> DbResult<&str> {
        self.connection_strings
            .get(DEFAULT_CONNECTION_NAME)
            .ok_or_else(|| {
                DbError::config_missing(format!(
                    "No {} connection string found in configuration",
                    DEFAULT_CONNECTION_NAME
                ))
            })
    }

    /// Query executor carrying the configured timeouts.
    pub fn executor(&self) -> QueryExecutor {
        QueryExecutor::with_settings(
            ConnectionFactory::new(self.connect_timeout),
            self.query_timeout,
        )
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            connection_strings: ConnectionStrings::new(),
            query_timeout: Duration::from_secs(DEFAULT_QUERY_TIMEOUT_SECS),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            query_gate: GateMode::default(),
        }
    }
}
