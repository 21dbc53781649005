//! Tool-specific error types.

use std::any::Any;
use thiserror::Error;

/// Errors that can occur while dispatching a tool call.
///
/// Handler-level domain failures (a rejected query, a malformed timezone) are
/// not represented here: built-in tools report those in-band as a successful
/// result string starting with `Error:`.
#[derive(Debug, Error)]
pub enum ToolError {
    /// The requested tool was not found.
    #[error("Tool not found: {0}")]
    NotFound(String),

    /// The arguments could not be bound to the tool's parameters.
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    /// The tool execution failed.
    #[error("Execution failed: {0}")]
    ExecutionFailed(String),
}

impl ToolError {
    /// Create a new "not found" error.
    pub fn not_found(name: impl Into<String>) -> Self {
        Self::NotFound(name.into())
    }

    /// Create a new "invalid arguments" error.
    pub fn invalid_arguments(msg: impl Into<String>) -> Self {
        Self::InvalidArguments(msg.into())
    }

    /// Create a new "execution failed" error.
    pub fn execution_failed(msg: impl Into<String>) -> Self {
        Self::ExecutionFailed(msg.into())
    }

    /// The underlying message without the variant prefix.
    pub fn message(&self) -> &str {
        match self {
            Self::NotFound(msg) | Self::InvalidArguments(msg) | Self::ExecutionFailed(msg) => msg,
        }
    }
}

impl From<anyhow::Error> for ToolError {
    fn from(err: anyhow::Error) -> Self {
        Self::ExecutionFailed(format!("{err:#}"))
    }
}

/// Text carried by a caught panic payload.
pub(crate) fn panic_text(payload: &(dyn Any + Send)) -> &str {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg
    } else {
        "non-string panic payload"
    }
}
