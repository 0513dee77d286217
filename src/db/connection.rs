//! SQL Server connection handling.
//!
//! Every tool call opens its own client and drops it when the call ends, so a
//! connection is released on every exit path. There is no pooling.

use crate::error::{DbError, DbResult};
use crate::models::connection::redact;
use std::future::Future;
use std::time::Duration;
use tiberius::{Client, Config, SqlBrowser};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};
use tracing::{debug, info};

/// Default connect + login timeout in seconds.
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 15;

/// A connected TDS client.
pub type SqlClient = Client<Compat<TcpStream>>;

/// Opens connections from ADO.NET connection strings.
#[derive(Debug, Clone, Copy)]
pub struct ConnectionFactory {
    connect_timeout: Duration,
}

impl ConnectionFactory {
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }

    /// Parse the connection string into a driver configuration.
    pub fn parse(connection_string: &str) -> DbResult<Config> {
        if connection_string.trim().is_empty() {
            return Err(DbError::invalid_input("Connection string is empty"));
        }
        Config::from_ado_string(connection_string).map_err(|e| {
            DbError::connection(
                e.to_string(),
                "Use the ADO.NET format: Server=host;Database=db;User Id=user;Password=pass",
            )
        })
    }

    /// Open a client, bounded by the connect timeout.
    pub async fn connect(&self, connection_string: &str) -> DbResult<SqlClient> {
        let config = Self::parse(connection_string)?;
        debug!(connection = %redact(connection_string), "Opening SQL Server connection");

        with_timeout("connect", self.connect_timeout, open(config)).await
    }
}

impl Default for ConnectionFactory {
    fn default() -> Self {
        Self::new(Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS))
    }
}

/// Connect, following one routing redirect (Azure SQL gateway).
async fn open(config: Config) -> DbResult<SqlClient> {
    let tcp = TcpStream::connect_named(&config).await?;
    tcp.set_nodelay(true).map_err(|e| {
        DbError::connection(e.to_string(), "Check network connectivity")
    })?;

    match Client::connect(config.clone(), tcp.compat_write()).await {
        Ok(client) => Ok(client),
        Err(tiberius::error::Error::Routing { host, port }) => {
            info!(host = %host, port, "Following SQL Server routing redirect");
            let mut config = config;
            config.host(&host);
            config.port(port);

            let tcp = TcpStream::connect(config.get_addr()).await.map_err(|e| {
                DbError::connection(e.to_string(), "Check that the routed host is reachable")
            })?;
            tcp.set_nodelay(true).map_err(|e| {
                DbError::connection(e.to_string(), "Check network connectivity")
            })?;
            Ok(Client::connect(config, tcp.compat_write()).await?)
        }
        Err(e) => Err(e.into()),
    }
}

/// Run a database future under a timeout.
pub async fn with_timeout<T, F>(operation: &str, limit: Duration, fut: F) -> DbResult<T>
where
    F: Future<Output = DbResult<T>>,
{
    timeout(limit, fut)
        .await
        .map_err(|_| DbError::timeout(operation, limit.as_secs()))?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_connection_string() {
        let config = ConnectionFactory::parse(
            "Server=tcp:localhost,1433;Database=master;User Id=sa;Password=x;TrustServerCertificate=true",
        )
        .unwrap();
        assert_eq!(config.get_addr(), "localhost:1433");
    }

    #[test]
    fn test_parse_empty_connection_string() {
        let err = ConnectionFactory::parse("   ").unwrap_err();
        assert!(matches!(err, DbError::InvalidInput { .. }));
    }

    #[tokio::test]
    async fn test_with_timeout_elapses() {
        let result: DbResult<()> = with_timeout("query", Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;
        assert!(matches!(result, Err(DbError::Timeout { .. })));
    }

    #[tokio::test]
    async fn test_with_timeout_passes_through_errors() {
        let result: DbResult<()> = with_timeout("query", Duration::from_secs(5), async {
            Err(DbError::execution("boom", None))
        })
        .await;
        assert!(matches!(result, Err(DbError::Execution { .. })));
    }

    #[tokio::test]
    async fn test_connect_refused_is_connection_error() {
        // Port 1 on loopback is essentially never listening.
        let factory = ConnectionFactory::new(Duration::from_secs(5));
        let err = factory
            .connect("Server=tcp:127.0.0.1,1;User Id=sa;Password=x;TrustServerCertificate=true")
            .await
            .unwrap_err();
        assert!(
            matches!(err, DbError::Connection { .. } | DbError::Timeout { .. }),
            "{:?}",
            err
        );
    }
}
