//! Error types for the SQL Server MCP Server.
//!
//! This module defines all error types using `thiserror` for ergonomic error handling.
//! Every variant maps onto an envelope kind (`BLOCKED` or `ERROR`) so that tool
//! handlers can turn any failure into a well-formed payload instead of a protocol error.

use thiserror::Error;

/// SQL Server error number for a failed login.
const LOGIN_FAILED: u32 = 18456;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Configuration error: {message}")]
    ConfigMissing { message: String },

    #[error("Connection failed: {message}")]
    Connection { message: String, suggestion: String },

    #[error("Query blocked: {reason}")]
    Blocked { reason: String },

    #[error("Execution failed: {message}")]
    Execution {
        message: String,
        /// SQL Server error number, e.g. 208 for "Invalid object name"
        code: Option<u32>,
    },

    #[error("Schema lookup '{lookup}' failed: {message}")]
    SchemaLookup { lookup: String, message: String },

    #[error("Timeout: {operation} exceeded {elapsed_secs}s")]
    Timeout {
        operation: String,
        elapsed_secs: u64,
    },

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Discriminates a gate rejection from a runtime failure in the serialized envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Blocked,
    Error,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Blocked => "BLOCKED",
            Self::Error => "ERROR",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl DbError {
    /// Create a missing-configuration error.
    pub fn config_missing(message: impl Into<String>) -> Self {
        Self::ConfigMissing {
            message: message.into(),
        }
    }

    /// Create a connection error with a helpful suggestion.
    pub fn connection(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Create a gate rejection.
    pub fn blocked(reason: impl Into<String>) -> Self {
        Self::Blocked {
            reason: reason.into(),
        }
    }

    /// Create an execution error with an optional server error number.
    pub fn execution(message: impl Into<String>, code: Option<u32>) -> Self {
        Self::Execution {
            message: message.into(),
            code,
        }
    }

    /// Create a schema lookup error.
    pub fn schema_lookup(lookup: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SchemaLookup {
            lookup: lookup.into(),
            message: message.into(),
        }
    }

    /// Create a timeout error.
    pub fn timeout(operation: impl Into<String>, elapsed_secs: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            elapsed_secs,
        }
    }

    /// Create an invalid input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Envelope kind for this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Blocked { .. } => ErrorKind::Blocked,
            _ => ErrorKind::Error,
        }
    }

    /// The message carried to the caller, without the display prefix.
    ///
    /// Driver and server failures surface their raw message here.
    pub fn message(&self) -> String {
        match self {
            Self::ConfigMissing { message }
            | Self::Connection { message, .. }
            | Self::Execution { message, .. }
            | Self::SchemaLookup { message, .. }
            | Self::InvalidInput { message }
            | Self::Internal { message } => message.clone(),
            Self::Blocked { reason } => reason.clone(),
            Self::Timeout { .. } => self.to_string(),
        }
    }

    /// Get the suggestion for this error, if available.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::Connection { suggestion, .. } => Some(suggestion),
            _ => None,
        }
    }

    /// Check if this error is retryable.
    ///
    /// Nothing retries automatically; this is informational for the caller.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Connection { .. } | Self::Timeout { .. })
    }

    /// Re-tag a driver failure as belonging to a named schema lookup.
    pub(crate) fn in_lookup(self, lookup: &str) -> Self {
        match self {
            Self::Execution { message, .. } | Self::Internal { message } => {
                Self::schema_lookup(lookup, message)
            }
            other => other,
        }
    }
}

/// Convert tiberius errors to DbError.
impl From<tiberius::error::Error> for DbError {
    fn from(err: tiberius::error::Error) -> Self {
        use tiberius::error::Error as TdsError;

        match err {
            TdsError::Server(token) if token.code() == LOGIN_FAILED => DbError::connection(
                token.message(),
                "Check the user id and password in the connection string",
            ),
            TdsError::Server(token) => DbError::execution(token.message(), Some(token.code())),
            TdsError::Io { message, .. } => DbError::connection(
                message,
                "Check network connectivity and that SQL Server accepts TCP connections",
            ),
            TdsError::Tls(msg) => DbError::connection(
                msg,
                "Set TrustServerCertificate=True or install the server certificate",
            ),
            TdsError::Routing { host, port } => DbError::connection(
                format!("Server requested a redirect to {}:{}", host, port),
                "Retry the connection against the routed host",
            ),
            TdsError::Protocol(msg) => DbError::connection(
                format!("Protocol error: {}", msg),
                "Check SQL Server version compatibility (TDS 7.3+)",
            ),
            TdsError::Conversion(msg) => DbError::internal(format!("Conversion error: {}", msg)),
            TdsError::Encoding(msg) => DbError::internal(format!("Encoding error: {}", msg)),
            TdsError::Utf8 => DbError::internal("Invalid UTF-8 in server response"),
            TdsError::Utf16 => DbError::internal("Invalid UTF-16 in server response"),
            TdsError::ParseInt(e) => DbError::internal(format!("Integer parse error: {}", e)),
            other => DbError::internal(other.to_string()),
        }
    }
}

/// Result type alias for database operations.
pub type DbResult<T> = Result<T, DbError>;
