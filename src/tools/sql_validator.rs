//! SQL statement validation for read-only enforcement.
//!
//! This module decides, from the raw SQL text alone, whether the `query` tool
//! may run a statement. Two gates implement [`QueryGate`]:
//!
//! - [`KeywordGate`] (default): a textual scan. Any whole-word, case-insensitive
//!   occurrence of a denylisted keyword blocks the statement wherever it
//!   appears, including inside comments and string literals. The trimmed text
//!   must then start with `SELECT`.
//! - [`ParsingGate`] (strict): the keyword scan first, then a parse with
//!   [sqlparser](https://docs.rs/sqlparser/)'s `MsSqlDialect` that only accepts
//!   plain queries. It can block more than the keyword scan, never less.
//!
//! The keyword scan is a best-effort filter, not a SQL engine. Keywords in
//! literals cause false positives; batches that hide writes behind other
//! constructs may pass.

use clap::ValueEnum;
use regex::Regex;
use sqlparser::ast::Statement;
use sqlparser::dialect::MsSqlDialect;
use sqlparser::parser::Parser;
use std::sync::LazyLock;

/// Fixed message returned for every keyword-gate rejection.
pub const BLOCKED_MESSAGE: &str =
    "Only SELECT statements are allowed for safety. This query appears to modify data.";

/// Keywords that block a statement wherever they appear.
pub const DENYLIST: &[&str] = &[
    "INSERT", "UPDATE", "DELETE", "DROP", "CREATE", "ALTER", "TRUNCATE", "EXEC", "EXECUTE",
    "MERGE", "GRANT", "REVOKE", "DENY",
];

static DENYLIST_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i)\b(?:{})\b", DENYLIST.join("|"))).expect("Invalid denylist regex")
});

static SELECT_PREFIX_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\ASELECT\b").expect("Invalid SELECT regex"));

/// Result of classifying a statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Allowed,
    Blocked(String),
}

impl Classification {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed)
    }
}

/// A statement together with its classification. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlStatement {
    text: String,
    classification: Classification,
}

impl SqlStatement {
    /// Classify `sql` with the given gate.
    pub fn classify(sql: impl Into<String>, gate: &dyn QueryGate) -> Self {
        let text = sql.into();
        let classification = gate.classify(&text);
        Self {
            text,
            classification,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn classification(&self) -> &Classification {
        &self.classification
    }
}

/// Decides whether a statement may be executed by the `query` tool.
///
/// Implementations must be deterministic and free of side effects.
pub trait QueryGate: Send + Sync {
    fn classify(&self, sql: &str) -> Classification;

    /// Name of this gate for logging.
    fn name(&self) -> &'static str;
}

/// Textual denylist scan followed by a `SELECT` prefix check.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordGate;

impl KeywordGate {
    /// First denylisted keyword found in `sql`, uppercased.
    pub fn find_denied_keyword(sql: &str) -> Option<String> {
        DENYLIST_REGEX
            .find(sql)
            .map(|m| m.as_str().to_ascii_uppercase())
    }
}

impl QueryGate for KeywordGate {
    fn classify(&self, sql: &str) -> Classification {
        let normalized = sql.trim();

        if Self::find_denied_keyword(normalized).is_some() {
            return Classification::Blocked(BLOCKED_MESSAGE.to_string());
        }

        if !SELECT_PREFIX_REGEX.is_match(normalized) {
            return Classification::Blocked(BLOCKED_MESSAGE.to_string());
        }

        Classification::Allowed
    }

    fn name(&self) -> &'static str {
        "keyword"
    }
}

/// Keyword scan plus an AST check that every statement is a plain query.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParsingGate {
    keywords: KeywordGate,
}

impl QueryGate for ParsingGate {
    fn classify(&self, sql: &str) -> Classification {
        let baseline = self.keywords.classify(sql);
        if !baseline.is_allowed() {
            return baseline;
        }

        let statements = match Parser::parse_sql(&MsSqlDialect {}, sql.trim()) {
            Ok(statements) => statements,
            Err(e) => {
                return Classification::Blocked(format!(
                    "Failed to parse SQL statement. Error: {}",
                    e
                ));
            }
        };

        for stmt in &statements {
            if !matches!(stmt, Statement::Query(_)) {
                return Classification::Blocked(format!(
                    "Only plain SELECT queries are allowed. Found: {}",
                    statement_kind(stmt)
                ));
            }
        }

        Classification::Allowed
    }

    fn name(&self) -> &'static str {
        "strict"
    }
}

/// Short label for a non-query statement, used in rejection messages.
fn statement_kind(stmt: &Statement) -> &'static str {
    match stmt {
        Statement::Insert(_) => "INSERT",
        Statement::Update { .. } => "UPDATE",
        Statement::Delete(_) => "DELETE",
        Statement::Merge { .. } => "MERGE",
        Statement::Drop { .. } => "DROP",
        Statement::Truncate { .. } => "TRUNCATE",
        Statement::Execute { .. } => "EXECUTE",
        Statement::Declare { .. } => "DECLARE",
        Statement::Set(_) => "SET",
        Statement::Use(_) => "USE",
        Statement::StartTransaction { .. } => "BEGIN TRANSACTION",
        Statement::Commit { .. } => "COMMIT",
        Statement::Rollback { .. } => "ROLLBACK",
        Statement::Grant { .. } => "GRANT",
        Statement::Revoke { .. } => "REVOKE",
        Statement::Deny { .. } => "DENY",
        _ => "non-query statement",
    }
}

/// Which gate the server uses for the `query` tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum GateMode {
    /// Textual keyword denylist (baseline)
    #[default]
    Keyword,
    /// Keyword denylist plus SQL parsing
    Strict,
}

impl GateMode {
    /// Build the gate for this mode.
    pub fn build(self) -> Box<dyn QueryGate> {
        match self {
            Self::Keyword => Box::new(KeywordGate),
            Self::Strict => Box::new(ParsingGate::default()),
        }
    }
}

impl std::fmt::Display for GateMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Keyword => write!(f, "keyword"),
            Self::Strict => write!(f, "strict"),
        }
    }
}

/// Classify with the default keyword gate.
///
/// # Examples
///
/// ```
/// use mssql_mcp_server::tools::sql_validator::{classify, Classification};
///
/// assert_eq!(classify("SELECT * FROM Orders"), Classification::Allowed);
/// assert!(!classify("DROP TABLE Orders").is_allowed());
/// ```
pub fn classify(sql: &str) -> Classification {
    KeywordGate.classify(sql)
}

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // Keyword gate
    // =========================================================================

    #[test]
    fn test_select_allowed() {
        assert!(classify("SELECT * FROM users").is_allowed());
        assert!(classify("  \n\tselect 1").is_allowed());
    }

    #[test]
    fn test_every_denylisted_keyword_blocks() {
        for keyword in DENYLIST {
            let sql = format!("SELECT 1 AS x /* {} */", keyword.to_lowercase());
            assert_eq!(
                classify(&sql),
                Classification::Blocked(BLOCKED_MESSAGE.to_string()),
                "{}",
                keyword
            );
        }
    }

    #[test]
    fn test_keyword_inside_identifier_does_not_block() {
        assert!(classify("SELECT CREATED_AT, updated_by, IsDeleted FROM t").is_allowed());
        assert!(classify("SELECT droplet FROM t").is_allowed());
    }

    #[test]
    fn test_keyword_in_string_literal_blocks() {
        assert!(!classify("SELECT * FROM logs WHERE action = 'delete'").is_allowed());
    }

    #[test]
    fn test_must_start_with_select() {
        assert!(!classify("WITH x AS (SELECT 1 AS a) SELECT * FROM x").is_allowed());
        assert!(!classify("SELECTED").is_allowed());
        assert!(!classify("").is_allowed());
        assert!(!classify("   ").is_allowed());
    }

    #[test]
    fn test_select_followed_by_symbol() {
        assert!(classify("SELECT*FROM t").is_allowed());
    }

    #[test]
    fn test_find_denied_keyword() {
        assert_eq!(
            KeywordGate::find_denied_keyword("select 1; exec sp_who"),
            Some("EXEC".to_string())
        );
        assert_eq!(KeywordGate::find_denied_keyword("SELECT 1"), None);
    }

    // =========================================================================
    // Parsing gate
    // =========================================================================

    #[test]
    fn test_parsing_gate_allows_plain_select() {
        let gate = ParsingGate::default();
        assert!(gate.classify("SELECT TOP 10 * FROM dbo.Orders").is_allowed());
    }

    #[test]
    fn test_parsing_gate_never_weaker_than_keywords() {
        let gate = ParsingGate::default();
        assert_eq!(
            gate.classify("DROP TABLE Orders"),
            Classification::Blocked(BLOCKED_MESSAGE.to_string())
        );
    }

    #[test]
    fn test_parsing_gate_blocks_unparseable() {
        let gate = ParsingGate::default();
        let result = gate.classify("SELECT ((( FROM");
        assert!(matches!(result, Classification::Blocked(ref m) if m.contains("parse")));
    }

    #[test]
    fn test_parsing_gate_blocks_trailing_statement() {
        let gate = ParsingGate::default();
        let result = gate.classify("SELECT 1; USE master");
        assert!(!result.is_allowed());
    }

    // =========================================================================
    // SqlStatement / GateMode
    // =========================================================================

    #[test]
    fn test_sql_statement_keeps_text_and_classification() {
        let stmt = SqlStatement::classify("SELECT 1", &KeywordGate);
        assert_eq!(stmt.text(), "SELECT 1");
        assert!(stmt.classification().is_allowed());
    }

    #[test]
    fn test_gate_mode_build() {
        assert_eq!(GateMode::Keyword.build().name(), "keyword");
        assert_eq!(GateMode::Strict.build().name(), "strict");
        assert_eq!(GateMode::default(), GateMode::Keyword);
    }
}
