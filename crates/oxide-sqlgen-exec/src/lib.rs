//! # oxide-sqlgen-exec
//!
//! Runs SQL produced by `oxide-sqlgen` against a database.
//!
//! A [`QueryExecutor`] takes SQL text with replacements and bind values,
//! rewrites the placeholders into what the driver expects, checks a
//! connection out of a [`ConnectionPool`] and retries failures that match
//! its [`RetryPolicy`]. Generation errors are never retried.
//!
//! [`SqlitePool`] is the bundled driver, built on `sqlx`.
//!
//! ```rust,no_run
//! use oxide_sqlgen::BindValues;
//! use oxide_sqlgen_exec::{ExecutorConfig, QueryExecutor, QueryOptions, QueryType, SqlitePool};
//!
//! # async fn demo() -> oxide_sqlgen_exec::Result<()> {
//! let config = ExecutorConfig::default();
//! let pool = SqlitePool::connect("sqlite::memory:", &config).await?;
//! let executor = QueryExecutor::new(pool, config)?;
//!
//! let bind = BindValues::named([("id", 1)]);
//! let result = executor
//!     .query(
//!         "SELECT $id AS id",
//!         QueryOptions::new(QueryType::Select).bind(&bind),
//!     )
//!     .await?;
//! assert_eq!(result.rows.len(), 1);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod executor;
pub mod pool;
pub mod retry;
pub mod sqlite;

pub use config::{ExecutorConfig, RetryConfig};
pub use error::{ExecError, Result};
pub use executor::{QueryExecutor, QueryOptions};
pub use pool::{
    AccessMode, Connection, ConnectionPool, Parameters, QueryResult, QueryType, Statement,
};
pub use retry::{RetryMatch, RetryPolicy};
pub use sqlite::{SqliteConnection, SqlitePool};
