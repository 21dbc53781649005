//! Transport error types.

use thiserror::Error;

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// Why a transport could not serve, or stopped serving.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The HTTP listener could not take its address.
    #[error("Failed to bind HTTP listener to {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    /// The HTTP accept loop ended with an I/O error.
    #[error("HTTP server stopped: {0}")]
    Serve(#[source] std::io::Error),

    /// The MCP handshake over stdio failed.
    #[error("STDIO session could not start: {0}")]
    SessionStart(String),

    /// The stdio session ended abnormally.
    #[error("STDIO session ended abnormally: {0}")]
    Session(String),
}

impl TransportError {
    pub fn bind(address: impl Into<String>, source: std::io::Error) -> Self {
        Self::Bind {
            address: address.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;
    use std::io;

    #[test]
    fn test_bind_error_names_address() {
        let err = TransportError::bind(
            "127.0.0.1:8080",
            io::Error::new(io::ErrorKind::AddrInUse, "address in use"),
        );
        assert_eq!(
            err.to_string(),
            "Failed to bind HTTP listener to 127.0.0.1:8080: address in use"
        );
        assert!(err.source().is_some());
    }

    #[test]
    fn test_session_messages() {
        let err = TransportError::SessionStart("connection closed: initialize request".into());
        assert_eq!(
            err.to_string(),
            "STDIO session could not start: connection closed: initialize request"
        );
        assert!(err.source().is_none());
    }
}
