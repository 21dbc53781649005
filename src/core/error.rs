//! Error types and handling for the MCP server.
//!
//! This module defines a unified error type for everything outside a single
//! tool call: startup, configuration and transport failures. Errors raised
//! while executing a tool are [`ToolError`]s and are translated by the
//! transports, never propagated through this type.

use thiserror::Error;

use super::transport::TransportError;
use crate::domains::tools::{StartupError, ToolError};

/// A specialized Result type for MCP server operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for the MCP server.
#[derive(Debug, Error)]
pub enum Error {
    /// Error originating from the tools domain.
    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    /// A module's startup hook failed.
    #[error(transparent)]
    Lifecycle(#[from] StartupError),

    /// An environment variable held a value that cannot be used.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The transport failed to start or stopped with an error.
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_startup_failure_message() {
        let err: Error = StartupError {
            module: "database".to_string(),
            source: anyhow::anyhow!("unable to open database file"),
        }
        .into();
        assert_eq!(
            err.to_string(),
            "Startup hook of module 'database' failed: unable to open database file"
        );
    }

    #[test]
    fn test_tool_error_wrapping() {
        let err: Error = ToolError::not_found("ghost").into();
        assert_eq!(err.to_string(), "Tool error: Tool not found: ghost");
    }
}
