//! Configuration management for the MCP server.
//!
//! This module provides a centralized configuration structure that can be
//! populated from environment variables (and a `.env` file) or defaults.
//! The core dispatch logic never reads it; tool modules pick their own
//! section when they are loaded.

use super::error::{Error, Result};
use super::transport::TransportConfig;
use crate::domains::tools::definitions::database::TableAllowList;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{info, warn};

/// Main configuration structure for the MCP server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server identification and metadata.
    pub server: ServerConfig,

    /// Logging configuration.
    pub logging: LoggingConfig,

    /// Transport configuration.
    pub transport: TransportConfig,

    /// Settings consumed by the built-in tool modules.
    pub tools: ToolsConfig,
}

/// Server identification configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// The name of the server as reported to clients.
    pub name: String,

    /// The version of the server.
    pub version: String,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "trace").
    pub level: String,
}

/// Configuration for the built-in tool modules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Zone used by `get_current_time` when the caller passes none.
    pub default_timezone: String,

    /// Database module settings.
    pub database: DatabaseConfig,
}

/// Configuration for the database tool module.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite database file. `:memory:` opens a private in-memory database.
    /// When unset the database tools report the connection as unavailable.
    pub path: Option<PathBuf>,

    /// Per-query deadline in seconds.
    pub query_timeout_secs: u64,

    /// Optional table/column allow-list for schema introspection.
    pub allowed_tables: Option<TableAllowList>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: None,
            query_timeout_secs: 10,
            allowed_tables: None,
        }
    }
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            default_timezone: "UTC".to_string(),
            database: DatabaseConfig::default(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                name: "modular-mcp-server".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
            },
            transport: TransportConfig::default(),
            tools: ToolsConfig::default(),
        }
    }
}

/// Serializes tests that read or write process environment variables.
#[cfg(test)]
pub(crate) static ENV_TEST_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Environment variables are expected to be prefixed with `MCP_`.
    /// For example: `MCP_SERVER_NAME`, `MCP_LOG_LEVEL`, `MCP_DB_PATH`.
    ///
    /// A numeric variable that does not parse is an [`Error::Config`].
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let mut config = Self::default();

        if let Ok(name) = std::env::var("MCP_SERVER_NAME") {
            config.server.name = name;
        }

        if let Ok(level) = std::env::var("MCP_LOG_LEVEL") {
            config.logging.level = level;
        }

        // Load transport configuration from environment
        config.transport = TransportConfig::from_env()?;

        if let Ok(tz) = std::env::var("MCP_DEFAULT_TIMEZONE") {
            if !tz.trim().is_empty() {
                config.tools.default_timezone = tz;
            }
        }

        config.tools.database = DatabaseConfig::from_env()?;

        Ok(config)
    }
}

impl DatabaseConfig {
    /// Load the database section from `MCP_DB_*` variables.
    ///
    /// A malformed allow-list is ignored with a warning; a timeout that is
    /// not a positive number of seconds is an error.
    pub fn from_env() -> Result<Self> {
        let mut db = Self::default();

        if let Ok(path) = std::env::var("MCP_DB_PATH") {
            info!("Database path set to {}", path);
            db.path = Some(PathBuf::from(path));
        } else {
            warn!("MCP_DB_PATH not set - database tools will report the connection as unavailable");
        }

        if let Ok(timeout) = std::env::var("MCP_DB_QUERY_TIMEOUT") {
            db.query_timeout_secs = match timeout.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => secs,
                _ => {
                    return Err(Error::Config(format!(
                        "MCP_DB_QUERY_TIMEOUT must be a positive number of seconds, got '{}'",
                        timeout
                    )));
                }
            };
        }

        if let Ok(raw) = std::env::var("MCP_DB_TABLES") {
            match TableAllowList::from_json(&raw) {
                Ok(list) => {
                    info!("Database allow-list covers {} tables", list.len());
                    db.allowed_tables = Some(list);
                }
                Err(e) => warn!("Could not use MCP_DB_TABLES ({}). Ignoring whitelist.", e),
            }
        }

        Ok(db)
    }
}
