#![allow(dead_code)]

use std::path::Path;
use std::time::Duration;

use indexmap::IndexMap;
use oxide_sqlgen::{AttributeDefinition, DataType, Expression, ModelDefinition};
use oxide_sqlgen_exec::{ExecutorConfig, QueryExecutor, QueryOptions, RetryConfig, SqlitePool};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

/// A single-connection in-memory database.
pub async fn memory_pool() -> sqlx::SqlitePool {
    SqlitePoolOptions::new()
        .max_connections(1)
        .connect(":memory:")
        .await
        .expect("Failed to create in-memory SQLite pool")
}

/// A file-backed database that fails fast instead of waiting on locks.
pub async fn file_pool(path: &Path, max_connections: u32) -> sqlx::SqlitePool {
    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true)
        .busy_timeout(Duration::ZERO);
    SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await
        .expect("Failed to open SQLite file")
}

/// Retries quickly so tests stay fast.
pub fn fast_config(max: u32) -> ExecutorConfig {
    ExecutorConfig {
        retry: RetryConfig {
            max,
            backoff_base_ms: 5,
            ..RetryConfig::default()
        },
        ..ExecutorConfig::default()
    }
}

pub async fn executor() -> QueryExecutor<SqlitePool> {
    QueryExecutor::new(SqlitePool::new(memory_pool().await), fast_config(3))
        .expect("valid configuration")
}

/// `users(id pk autoincrement, email unique, firstName -> first_name, active)`.
pub fn users_model() -> ModelDefinition {
    ModelDefinition::new("users")
        .attribute(
            AttributeDefinition::new("id", DataType::Integer)
                .primary_key()
                .auto_increment(),
        )
        .attribute(
            AttributeDefinition::new("email", DataType::Varchar(Some(255)))
                .not_null()
                .unique(),
        )
        .attribute(
            AttributeDefinition::new("firstName", DataType::Varchar(None)).column("first_name"),
        )
        .attribute(AttributeDefinition::new("active", DataType::Boolean).default_value(true))
}

pub async fn create_users(executor: &QueryExecutor<SqlitePool>) {
    let sql = executor
        .generator()
        .create_table(&users_model(), &Default::default())
        .expect("users table SQL");
    executor
        .query(&sql, QueryOptions::default())
        .await
        .expect("users table created");
}

pub fn row<const N: usize>(entries: [(&str, Expression); N]) -> IndexMap<String, Expression> {
    entries
        .into_iter()
        .map(|(key, value)| (key.to_string(), value))
        .collect()
}
