//! SQL Server MCP Server - Main entry point.
//!
//! This server provides MCP (Model Context Protocol) tools for AI assistants
//! to run read-only queries against Microsoft SQL Server and inspect its schema.

use clap::Parser;
use mssql_mcp_server::config::{Config, Settings, TransportMode};
use mssql_mcp_server::transport::{HttpTransport, StdioTransport, Transport};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initialize the tracing subscriber for logging.
///
/// Logs go to stderr so stdout stays reserved for the stdio transport.
fn init_tracing(config: &Config) {
    if !config.enable_logs {
        return;
    }

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if config.json_logs {
        subscriber
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        subscriber
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_thread_ids(false),
            )
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse configuration from command line and environment
    let config = Config::parse();

    init_tracing(&config);

    let settings = match Settings::from_config(&config) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!();
            eprintln!("Usage: mssql-mcp-server [--settings appsettings.json]");
            eprintln!("       mssql-mcp-server --connection-string Production=<connection_string>");
            eprintln!();
            eprintln!("Examples:");
            eprintln!(
                "  mssql-mcp-server -c \"Production=Server=tcp:db,1433;Database=Sales;User Id=app;Password=secret\""
            );
            eprintln!("  mssql-mcp-server --settings /etc/mssql-mcp/appsettings.json --transport http");
            std::process::exit(1);
        }
    };

    info!(
        transport = %config.transport,
        query_gate = %settings.query_gate,
        "Starting SQL Server MCP Server v{}",
        env!("CARGO_PKG_VERSION")
    );

    if settings.default_connection_string().is_err() {
        warn!("No Production connection string configured; get_default_connection_string will report an error");
    }

    let settings = Arc::new(settings);

    let result = match config.transport {
        TransportMode::Stdio => {
            info!("Using stdio transport");
            let transport = StdioTransport::new(settings);
            transport.run().await
        }
        TransportMode::Http => {
            info!(
                host = %config.http_host,
                port = config.http_port,
                endpoint = %config.mcp_endpoint,
                "Using HTTP transport"
            );
            let transport = HttpTransport::new(
                settings,
                &config.http_host,
                config.http_port,
                &config.mcp_endpoint,
            );
            transport.run().await
        }
    };

    if let Err(e) = result {
        error!(error = %e, "Server error");
        return Err(e.into());
    }

    info!("Server shutdown complete");
    Ok(())
}
