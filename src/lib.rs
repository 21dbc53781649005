//! Modular MCP Server Library
//!
//! A tool-execution gateway: tool modules are discovered at startup, their
//! tools are kept in a single registry, and clients list and execute them
//! over HTTP (or MCP STDIO).
//!
//! # Architecture
//!
//! - **core**: Configuration, error handling, the server and its transports
//! - **domains**: Business logic organized by bounded contexts
//!   - **tools**: Registry, module loader, lifecycle hooks, dispatcher and
//!     the built-in tool modules
//!
//! # Example
//!
//! ```rust,no_run
//! use modular_mcp_server::core::{Config, McpServer, TransportService};
//! use modular_mcp_server::domains::tools::builtin_modules;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     let transport = TransportService::new(config.transport.clone());
//!     let server = McpServer::bootstrap(config, builtin_modules()).await?;
//!     transport.run(server.clone()).await?;
//!     server.shutdown().await;
//!     Ok(())
//! }
//! ```

pub mod core;
pub mod domains;

// Re-export commonly used types for convenience
pub use core::{Config, Error, McpServer, Result};
