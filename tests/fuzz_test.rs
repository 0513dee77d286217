//! Black-box fuzzing tests for the SQL Server MCP Server.
//!
//! This test suite generates random, malicious, and edge-case inputs
//! to discover panics and gate bypasses. No database is required: every
//! connection attempt fails fast against a short connect timeout.

use mssql_mcp_server::db::{ConnectionFactory, QueryExecutor};
use mssql_mcp_server::error::ErrorKind;
use mssql_mcp_server::tools::envelope::Envelope;
use mssql_mcp_server::tools::query::{QueryInput, QueryToolHandler};
use mssql_mcp_server::tools::schema::{GetSchemaInput, SchemaToolHandler};
use mssql_mcp_server::tools::sql_validator::{
    DENYLIST, KeywordGate, ParsingGate, QueryGate, classify,
};
use rand::Rng;
use rand::distributions::Alphanumeric;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// Generate random string of given length
fn random_string(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// Generate various edge-case strings
fn edge_case_strings() -> Vec<String> {
    vec![
        String::new(),                           // Empty
        " ".to_string(),                         // Single space
        "\n\r\t".to_string(),                    // Whitespace chars
        "\0".to_string(),                        // Null byte
        "üöÄ".repeat(100),                        // Unicode
        "'OR 1=1--".to_string(),                 // SQL injection
        "'; DROP TABLE users--".to_string(),     // SQL injection
        "<script>alert(1)</script>".to_string(), // XSS
        "a".repeat(10000),                       // Very long string
        random_string(100),
        "\u{0000}\u{FFFF}".to_string(), // Special unicode
        "1' UNION SELECT NULL, NULL--".to_string(),
        "{{7*7}}".to_string(), // Template injection
        ";;;;====".to_string(),
        "Server=;Database=;".to_string(),
    ]
}

/// Executor that never waits long on a connection.
fn fast_executor() -> QueryExecutor {
    QueryExecutor::with_settings(
        ConnectionFactory::new(Duration::from_secs(2)),
        Duration::from_secs(2),
    )
}

fn assert_envelope_json(envelope: &Envelope) {
    let value: Value = serde_json::from_str(&envelope.to_json()).expect("envelope is valid JSON");
    assert!(value.is_object());
}

#[test]
fn fuzz_gate_never_panics() {
    let keyword = KeywordGate;
    let strict = ParsingGate::default();
    let mut inputs = edge_case_strings();
    inputs.extend((0..50).map(|i| random_string(i * 7)));

    for sql in inputs {
        let _ = keyword.classify(&sql);
        let _ = strict.classify(&sql);
    }
}

#[test]
fn fuzz_gate_select_prefix_property() {
    // Random alphanumerics after SELECT are allowed unless they spell a keyword.
    for _ in 0..200 {
        let tail = random_string(12);
        let sql = format!("SELECT {}", tail);
        let denied = KeywordGate::find_denied_keyword(&sql).is_some();
        assert_eq!(classify(&sql).is_allowed(), !denied, "{}", sql);
    }
}

#[test]
fn fuzz_gate_injected_keyword_always_blocks() {
    let mut rng = rand::thread_rng();
    for _ in 0..200 {
        let keyword = DENYLIST[rng.gen_range(0..DENYLIST.len())];
        let sql = format!(
            "SELECT {} {} {}",
            random_string(8),
            keyword,
            random_string(8)
        );
        assert!(!classify(&sql).is_allowed(), "{}", sql);
    }
}

#[tokio::test]
async fn fuzz_query_tool_connection_string() {
    let handler = QueryToolHandler::with_gate(Arc::new(KeywordGate), fast_executor());

    for connection_string in edge_case_strings() {
        let envelope = handler
            .query(QueryInput {
                connection_string,
                sql: "SELECT 1".to_string(),
            })
            .await;
        assert_envelope_json(&envelope);
    }
}

#[tokio::test]
async fn fuzz_query_tool_sql_injection() {
    let handler = QueryToolHandler::with_gate(Arc::new(KeywordGate), fast_executor());

    let writes = vec![
        "'; DROP TABLE users; --",
        "'; EXEC xp_cmdshell('dir'); --",
        "SELECT * FROM users; DELETE FROM logs;",
        "INSERT INTO users SELECT * FROM admin_users",
        "UPDATE users SET admin=1 WHERE '1'='1",
        "SELECT 1; GRANT CONTROL SERVER TO hacker",
        "SELECT 1 /*\nTRUNCATE TABLE audit */",
        "select 1 union all select 2; merge into t using s on 1=1 when matched then delete;",
    ];

    for sql in writes {
        let envelope = handler
            .query(QueryInput {
                connection_string: "Server=tcp:127.0.0.1,1".to_string(),
                sql: sql.to_string(),
            })
            .await;
        assert!(
            matches!(
                envelope,
                Envelope::Error {
                    kind: ErrorKind::Blocked,
                    ..
                }
            ),
            "{} should be blocked",
            sql
        );
    }
}

#[tokio::test]
async fn fuzz_schema_tool_table_names() {
    let handler = SchemaToolHandler::new(fast_executor());

    for table_name in edge_case_strings() {
        let envelope = handler
            .get_schema(GetSchemaInput {
                connection_string: String::new(),
                table_name: Some(table_name),
            })
            .await;
        assert!(envelope.is_error());
        assert_envelope_json(&envelope);
    }
}
