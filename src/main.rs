//! MCP Server Entry Point
//!
//! Initializes logging, loads configuration, discovers the tool modules and
//! serves them with the configured transport. Shutdown hooks always run once
//! the transport stops, whether it stopped cleanly or not.

use anyhow::Result;
use tracing::{Level, error, info};
use tracing_subscriber::{EnvFilter, fmt};

use modular_mcp_server::core::{Config, McpServer, TransportService};
use modular_mcp_server::domains::tools::builtin_modules;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration from environment
    let config = Config::from_env()?;

    // Initialize logging
    init_logging(&config.logging.level);

    info!("Starting {} v{}", config.server.name, config.server.version);

    let transport = TransportService::new(config.transport.clone());

    // Discover modules and run startup hooks; a failing hook stops here
    let server = McpServer::bootstrap(config, builtin_modules()).await?;

    let served = transport.run(server.clone()).await;
    if let Err(e) = &served {
        error!("Transport stopped with an error: {}", e);
    }

    info!("Server shutting down");
    server.shutdown().await;

    served?;
    Ok(())
}

/// Initialize the logging subsystem.
///
/// Configures tracing with the specified log level and format. Logs go to
/// stderr so they never interleave with the STDIO transport.
fn init_logging(level: &str) {
    let level = match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .init();
}
