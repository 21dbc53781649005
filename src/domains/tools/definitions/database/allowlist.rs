//! Table/column allow-list for schema introspection.

use serde::{Deserialize, Serialize};
use serde_json::error::Category;
use std::collections::BTreeMap;
use thiserror::Error;

/// Column name that allows every column of a table.
pub const WILDCARD: &str = "*";

/// Why an allow-list could not be parsed.
#[derive(Debug, Error)]
pub enum AllowListError {
    #[error("not valid JSON: {0}")]
    NotJson(#[source] serde_json::Error),

    /// Valid JSON that is not an object of string arrays.
    #[error("expected {{table: [columns]}}: {0}")]
    InvalidShape(#[source] serde_json::Error),
}

/// Map of table name to the columns that may be shown.
///
/// Parsed from JSON such as `{"users": ["id", "name"], "orders": ["*"]}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TableAllowList(BTreeMap<String, Vec<String>>);

impl TableAllowList {
    pub fn from_json(raw: &str) -> Result<Self, AllowListError> {
        serde_json::from_str(raw).map_err(|e| match e.classify() {
            Category::Data => AllowListError::InvalidShape(e),
            Category::Io | Category::Syntax | Category::Eof => AllowListError::NotJson(e),
        })
    }

    pub fn allows_table(&self, table: &str) -> bool {
        self.0.contains_key(table)
    }

    pub fn allows_column(&self, table: &str, column: &str) -> bool {
        self.0
            .get(table)
            .is_some_and(|cols| cols.iter().any(|c| c == WILDCARD || c == column))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
