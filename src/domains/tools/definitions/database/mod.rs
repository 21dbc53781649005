//! Database tool definitions.
//!
//! Read-only access to a SQLite database: schema introspection filtered by an
//! optional allow-list, and `SELECT` queries with a deadline. Domain failures
//! (no database, forbidden statement, timeout) are reported in the result
//! text so the calling model can read them.

pub mod allowlist;
pub mod pool;

use anyhow::Result;
use base64::{Engine as _, engine::general_purpose};
use rusqlite::Connection;
use rusqlite::types::ValueRef;
use serde::Deserialize;
use serde_json::{Map, Number, Value, json};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, instrument, warn};

use crate::core::config::{Config, DatabaseConfig};
use crate::domains::tools::{LifecycleHook, ModuleExports, Tool, ToolDescriptor, ToolModule};

pub use allowlist::TableAllowList;
pub use pool::{DatabaseError, DatabasePool};

const UNAVAILABLE: &str = "Error: Database connection is not available.";
const FORBIDDEN: &str = "Error: Query contains forbidden keywords. Only SELECT statements are allowed.";

/// Keywords rejected anywhere in a query, as whitespace-separated tokens.
pub const FORBIDDEN_KEYWORDS: &[&str] = &[
    "INSERT", "UPDATE", "DELETE", "DROP", "CREATE", "ALTER", "TRUNCATE", "GRANT", "REVOKE",
];

const SCHEMA_SQL: &str = r#"
    SELECT m.name, p.name, p.type, p."notnull", p.pk
    FROM sqlite_master AS m
    JOIN pragma_table_info(m.name) AS p
    WHERE m.type = 'table'
      AND m.name NOT LIKE 'sqlite_%'
      AND (?1 IS NULL OR m.name = ?1)
    ORDER BY m.name, p.cid
"#;

// ============================================================================
// Shared State
// ============================================================================

/// Connection and settings shared by both tools and the hooks.
#[derive(Clone)]
pub struct Database {
    pool: DatabasePool,
    timeout: Duration,
    allowed: Option<Arc<TableAllowList>>,
}

impl Database {
    pub fn new(config: &DatabaseConfig) -> Self {
        Self {
            pool: DatabasePool::new(config.path.clone()),
            timeout: Duration::from_secs(config.query_timeout_secs),
            allowed: config
                .allowed_tables
                .clone()
                .filter(|list| !list.is_empty())
                .map(Arc::new),
        }
    }

    pub fn pool(&self) -> &DatabasePool {
        &self.pool
    }

    fn in_band(&self, err: DatabaseError) -> String {
        match err {
            e if e.is_unavailable() => {
                error!("Database unavailable: {}", e);
                UNAVAILABLE.to_string()
            }
            DatabaseError::TimedOut => {
                format!("Error: Query timed out after {} seconds.", self.timeout.as_secs())
            }
            DatabaseError::NotReadOnly => FORBIDDEN.to_string(),
            e => {
                error!("Query failed: {}", e);
                format!("Error executing query: {}", e)
            }
        }
    }
}

/// Whether `query` contains any of [`FORBIDDEN_KEYWORDS`].
pub fn contains_forbidden_keyword(query: &str) -> bool {
    query
        .split_whitespace()
        .any(|token| FORBIDDEN_KEYWORDS.iter().any(|kw| token.eq_ignore_ascii_case(kw)))
}

// ============================================================================
// Schema Information Tool
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GetSchemaInformationParams {
    #[serde(default)]
    pub table_name: Option<String>,
}

struct ColumnInfo {
    table: String,
    name: String,
    kind: String,
    not_null: bool,
    primary_key: bool,
}

pub struct GetSchemaInformationTool;

impl GetSchemaInformationTool {
    pub const NAME: &'static str = "get_schema_information";

    pub const DESCRIPTION: &'static str = "Retrieves the schema (tables and columns) of the database. If a table name is given, only that table is described.";

    pub fn descriptor() -> ToolDescriptor {
        ToolDescriptor::builder(Self::NAME, Self::DESCRIPTION)
            .param(
                "table_name",
                "string",
                "Optional name of a single table to describe.",
            )
            .build()
    }

    #[instrument(skip_all, fields(table = ?params.table_name))]
    pub async fn execute(db: &Database, params: GetSchemaInformationParams) -> String {
        let filter = params.table_name.filter(|t| !t.is_empty());

        let columns = db
            .pool
            .run(db.timeout, move |conn| read_columns(conn, filter.as_deref()))
            .await;

        let columns = match columns {
            Ok(columns) => columns,
            Err(e) => return db.in_band(e),
        };

        if columns.is_empty() {
            return format!(
                "No schema information found for database '{}'.",
                db.pool.display_name()
            );
        }

        let mut tables: BTreeMap<String, Vec<Value>> = BTreeMap::new();
        for column in columns {
            if let Some(allowed) = &db.allowed {
                if !allowed.allows_column(&column.table, &column.name) {
                    continue;
                }
            }
            tables.entry(column.table).or_default().push(json!({
                "column_name": column.name,
                "column_type": column.kind,
                "not_null": column.not_null,
                "primary_key": column.primary_key,
            }));
        }

        if tables.is_empty() {
            return "No schema information found for the tables and columns specified in the whitelist."
                .to_string();
        }

        let schema: Map<String, Value> = tables
            .into_iter()
            .map(|(table, columns)| (table, json!({ "columns": columns })))
            .collect();

        info!("Schema retrieved for {} tables", schema.len());
        serde_json::to_string_pretty(&schema).unwrap_or_else(|e| format!("Error executing query: {}", e))
    }
}

fn read_columns(conn: &Connection, table: Option<&str>) -> Result<Vec<ColumnInfo>, DatabaseError> {
    let mut stmt = conn.prepare(SCHEMA_SQL)?;
    let rows = stmt.query_map([table], |row| {
        Ok(ColumnInfo {
            table: row.get(0)?,
            name: row.get(1)?,
            kind: row.get(2)?,
            not_null: row.get::<_, i64>(3)? != 0,
            primary_key: row.get::<_, i64>(4)? != 0,
        })
    })?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

// ============================================================================
// SQL Query Tool
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunSqlQueryParams {
    pub query: String,
}

pub struct RunSqlQueryTool;

impl RunSqlQueryTool {
    pub const NAME: &'static str = "run_sql_query";

    pub const DESCRIPTION: &'static str = "Executes a read-only SQL query (SELECT) against the database and returns the rows as JSON.";

    pub fn descriptor() -> ToolDescriptor {
        ToolDescriptor::builder(Self::NAME, Self::DESCRIPTION)
            .required_param("query", "string", "The SELECT statement to execute.")
            .build()
    }

    #[instrument(skip_all)]
    pub async fn execute(db: &Database, params: RunSqlQueryParams) -> String {
        if contains_forbidden_keyword(&params.query) {
            warn!("Rejected query with forbidden keyword");
            return FORBIDDEN.to_string();
        }

        let query = params.query;
        let rows = db.pool.run(db.timeout, move |conn| select_rows(conn, &query)).await;

        match rows {
            Ok(rows) => {
                info!("Query returned {} rows", rows.len());
                serde_json::to_string_pretty(&rows)
                    .unwrap_or_else(|e| format!("Error executing query: {}", e))
            }
            Err(e) => db.in_band(e),
        }
    }
}

fn select_rows(conn: &Connection, query: &str) -> Result<Vec<Value>, DatabaseError> {
    let mut stmt = conn.prepare(query)?;
    if !stmt.readonly() {
        return Err(DatabaseError::NotReadOnly);
    }

    let names: Vec<String> = stmt.column_names().into_iter().map(str::to_string).collect();
    let mut rows = stmt.query([])?;
    let mut out = Vec::new();
    while let Some(row) = rows.next()? {
        let mut object = Map::with_capacity(names.len());
        for (i, name) in names.iter().enumerate() {
            object.insert(name.clone(), to_json(row.get_ref(i)?));
        }
        out.push(Value::Object(object));
    }
    Ok(out)
}

fn to_json(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null),
        ValueRef::Text(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => Value::String(general_purpose::STANDARD.encode(bytes)),
    }
}

// ============================================================================
// Module
// ============================================================================

/// Module exporting the database tools and the connection hooks.
pub struct DatabaseModule;

impl ToolModule for DatabaseModule {
    fn name(&self) -> &str {
        "database"
    }

    fn load(&self, config: &Config) -> Result<ModuleExports> {
        let db = Database::new(&config.tools.database);

        let schema_db = db.clone();
        let schema_tool = Tool::asynchronous(
            GetSchemaInformationTool::descriptor(),
            move |params: GetSchemaInformationParams| {
                let db = schema_db.clone();
                async move { Ok(GetSchemaInformationTool::execute(&db, params).await) }
            },
        );

        let query_db = db.clone();
        let query_tool = Tool::asynchronous(
            RunSqlQueryTool::descriptor(),
            move |params: RunSqlQueryParams| {
                let db = query_db.clone();
                async move { Ok(RunSqlQueryTool::execute(&db, params).await) }
            },
        );

        let startup_pool = db.pool().clone();
        let on_startup = LifecycleHook::new(move || {
            let pool = startup_pool.clone();
            async move {
                if !pool.is_configured() {
                    info!("No database configured, skipping connection");
                    return Ok(());
                }
                pool.open().await?;
                info!("Database connection ready: {}", pool.display_name());
                Ok(())
            }
        });

        let shutdown_pool = db.pool().clone();
        let on_shutdown = LifecycleHook::new(move || {
            let pool = shutdown_pool.clone();
            async move {
                pool.close().await;
                Ok(())
            }
        });

        Ok(ModuleExports::new()
            .with_tools([schema_tool, query_tool])
            .on_startup(on_startup)
            .on_shutdown(on_shutdown))
    }
}

// ============================================================================
// Tests
// ============================================================================
