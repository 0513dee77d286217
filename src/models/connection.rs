//! Connection-related data models.
//!
//! This module builds ADO.NET style connection strings and provides a redacted
//! form that is safe to log.

use schemars::JsonSchema;
use serde::Deserialize;

/// Keys whose values must never reach the logs.
const SECRET_KEYS: &[&str] = &["password", "pwd"];

/// Parts of a SQL Server connection string.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ConnectionStringParts {
    /// Server host, `host,port` or `host\instance`
    pub server: String,
    /// Initial catalog (database name)
    pub database: String,
    /// SQL login name
    pub user_id: String,
    /// SQL login password
    pub password: String,
}

impl ConnectionStringParts {
    /// Build the connection string.
    ///
    /// The server certificate is trusted and MARS is enabled, matching what
    /// interactive tooling against development servers expects.
    pub fn build(&self) -> String {
        [
            ("Data Source", self.server.as_str()),
            ("Initial Catalog", self.database.as_str()),
            ("User ID", self.user_id.as_str()),
            ("Password", self.password.as_str()),
            ("MultipleActiveResultSets", "True"),
            ("TrustServerCertificate", "True"),
        ]
        .iter()
        .map(|(key, value)| format!("{}={}", key, quote_value(value)))
        .collect::<Vec<_>>()
        .join(";")
    }
}

/// Quote a connection string value the way ADO.NET does.
///
/// Values containing `;`, quotes or surrounding whitespace are wrapped in
/// double quotes (embedded double quotes doubled), or in single quotes when
/// the value holds a double quote but no single quote.
pub fn quote_value(value: &str) -> String {
    let needs_quoting = value.contains(';')
        || value.contains('\'')
        || value.contains('"')
        || value.starts_with(char::is_whitespace)
        || value.ends_with(char::is_whitespace);

    if !needs_quoting {
        return value.to_string();
    }
    if value.contains('"') && !value.contains('\'') {
        return format!("'{}'", value);
    }
    format!("\"{}\"", value.replace('"', "\"\""))
}

/// Split a connection string into `(key, value)` pairs, honouring quoted values.
pub fn parse_pairs(connection_string: &str) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    let mut chars = connection_string.chars().peekable();

    loop {
        let mut key = String::new();
        while let Some(&c) = chars.peek() {
            chars.next();
            if c == '=' {
                break;
            }
            key.push(c);
        }
        let key = key.trim().to_string();

        while chars.peek().is_some_and(|c| c.is_whitespace()) {
            chars.next();
        }

        let mut value = String::new();
        match chars.peek().copied() {
            Some(quote @ ('"' | '\'')) => {
                chars.next();
                while let Some(c) = chars.next() {
                    if c == quote {
                        if chars.peek() == Some(&quote) {
                            chars.next();
                            value.push(quote);
                        } else {
                            break;
                        }
                    } else {
                        value.push(c);
                    }
                }
                // skip to the next separator
                for c in chars.by_ref() {
                    if c == ';' {
                        break;
                    }
                }
            }
            _ => {
                for c in chars.by_ref() {
                    if c == ';' {
                        break;
                    }
                    value.push(c);
                }
                value = value.trim().to_string();
            }
        }

        if !key.is_empty() {
            pairs.push((key, value));
        }
        if chars.peek().is_none() {
            break;
        }
    }

    pairs
}

/// Render a connection string with secret values masked.
pub fn redact(connection_string: &str) -> String {
    parse_pairs(connection_string)
        .into_iter()
        .map(|(key, value)| {
            if SECRET_KEYS.contains(&key.to_ascii_lowercase().as_str()) {
                format!("{}=***", key)
            } else {
                format!("{}={}", key, quote_value(&value))
            }
        })
        .collect::<Vec<_>>()
        .join(";")
}
