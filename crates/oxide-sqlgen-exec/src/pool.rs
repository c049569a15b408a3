//! The connection pool boundary.
//!
//! The executor never talks to a driver directly. A [`ConnectionPool`] hands
//! out [`Connection`]s for reads or writes and takes them back afterwards.

use std::fmt;

use async_trait::async_trait;
use indexmap::IndexMap;
use oxide_sqlgen::{BindCollector, Dialect, Value};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Which replica a statement may run on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessMode {
    Read,
    Write,
}

impl fmt::Display for AccessMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read => write!(f, "read"),
            Self::Write => write!(f, "write"),
        }
    }
}

/// What a statement does, as declared by the caller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryType {
    Select,
    Insert,
    Update,
    Upsert,
    Delete,
    /// Anything else: DDL, transaction control, hand-written SQL.
    #[default]
    Raw,
}

impl QueryType {
    /// Only selects may go to a read replica.
    #[must_use]
    pub const fn access_mode(self) -> AccessMode {
        match self {
            Self::Select => AccessMode::Read,
            _ => AccessMode::Write,
        }
    }

    /// Whether result rows are collected by default.
    #[must_use]
    pub const fn returns_rows(self) -> bool {
        matches!(self, Self::Select | Self::Raw)
    }
}

/// Values ready to hand to a driver.
#[derive(Debug, Clone, PartialEq)]
pub enum Parameters {
    /// One value per placeholder, in placeholder order.
    Positional(Vec<Value>),
    /// Values keyed by the names used in the SQL.
    Named(IndexMap<String, Value>),
}

impl Parameters {
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Positional(values) => values.len(),
            Self::Named(values) => values.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for Parameters {
    fn default() -> Self {
        Self::Positional(Vec::new())
    }
}

/// A statement in the driver's placeholder syntax.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub parameters: Parameters,
    pub query_type: QueryType,
    /// Collect result rows rather than only the affected row count.
    pub fetch_rows: bool,
}

/// Normalized outcome of one statement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResult {
    pub rows: Vec<serde_json::Map<String, serde_json::Value>>,
    pub rows_affected: u64,
    pub last_insert_id: Option<i64>,
}

/// A live database connection.
#[async_trait]
pub trait Connection: Send {
    /// Runs one statement.
    async fn execute(&mut self, statement: &Statement) -> Result<QueryResult>;

    /// Whether the connection can still be returned to the pool.
    fn is_valid(&self) -> bool {
        true
    }
}

/// Source of connections, possibly split into read and write replicas.
#[async_trait]
pub trait ConnectionPool: Send + Sync {
    type Connection: Connection;

    /// Dialect used for replacements and bind mapping.
    fn dialect(&self) -> &'static dyn Dialect;

    /// Placeholder allocator matching what the driver accepts. Defaults to
    /// the dialect's own.
    fn bind_collector(&self) -> BindCollector {
        self.dialect().create_bind_collector()
    }

    /// Checks out a connection. `use_master` sends reads to the write
    /// replica.
    async fn acquire(&self, mode: AccessMode, use_master: bool) -> Result<Self::Connection>;

    /// Returns a healthy connection to the pool.
    async fn release(&self, connection: Self::Connection);

    /// Closes a connection instead of returning it.
    async fn destroy(&self, connection: Self::Connection);
}
