//! Transport layer for the MCP server.
//!
//! This module provides different transport implementations:
//! - **HTTP**: REST discovery and execution endpoints (default) - feature: `http`
//! - **STDIO**: Standard MCP over stdin/stdout - feature: `stdio`
//!
//! Both transports only translate between their wire format and the
//! [`Dispatcher`](crate::domains::tools::Dispatcher); neither knows about
//! individual tools.

mod config;
mod error;
mod service;

#[cfg(feature = "http")]
pub mod http;

#[cfg(feature = "stdio")]
pub mod stdio;

pub use config::TransportConfig;
pub use error::{TransportError, TransportResult};
pub use service::TransportService;

#[cfg(feature = "http")]
pub use config::HttpConfig;
