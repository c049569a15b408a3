//! SQLite driver built on `sqlx`.

use std::borrow::Cow;
use std::io;

use async_trait::async_trait;
use oxide_sqlgen::{BindCollector, Dialect, DialectKind, Value};
use serde_json::Value as JsonValue;
use sqlx::pool::PoolConnection;
use sqlx::query::Query;
use sqlx::sqlite::{Sqlite, SqliteArguments, SqlitePoolOptions, SqliteRow};
use sqlx::{Column, Row, TypeInfo, ValueRef};
use tracing::{debug, warn};

use crate::config::ExecutorConfig;
use crate::error::{ExecError, Result};
use crate::pool::{
    AccessMode, Connection, ConnectionPool, Parameters, QueryResult, QueryType, Statement,
};

type SqliteQuery<'q> = Query<'q, Sqlite, SqliteArguments<'q>>;

/// A primary `sqlx` pool plus an optional read replica.
#[derive(Debug, Clone)]
pub struct SqlitePool {
    primary: sqlx::SqlitePool,
    replica: Option<sqlx::SqlitePool>,
}

impl SqlitePool {
    #[must_use]
    pub const fn new(primary: sqlx::SqlitePool) -> Self {
        Self {
            primary,
            replica: None,
        }
    }

    /// Opens `url` with the acquire timeout from `config`.
    ///
    /// # Errors
    ///
    /// Returns a classified connection error when the database cannot be
    /// opened.
    pub async fn connect(url: &str, config: &ExecutorConfig) -> Result<Self> {
        let primary = SqlitePoolOptions::new()
            .acquire_timeout(config.acquire_timeout())
            .connect(url)
            .await
            .map_err(classify)?;
        debug!(url, "Connected to SQLite");
        Ok(Self::new(primary))
    }

    /// Sends reads to `replica` unless the caller asks for the primary.
    #[must_use]
    pub fn with_read_replica(mut self, replica: sqlx::SqlitePool) -> Self {
        self.replica = Some(replica);
        self
    }

    #[must_use]
    pub const fn primary(&self) -> &sqlx::SqlitePool {
        &self.primary
    }

    const fn pool_for(&self, mode: AccessMode, use_master: bool) -> &sqlx::SqlitePool {
        match (mode, &self.replica) {
            (AccessMode::Read, Some(replica)) if !use_master => replica,
            _ => &self.primary,
        }
    }
}

#[async_trait]
impl ConnectionPool for SqlitePool {
    type Connection = SqliteConnection;

    fn dialect(&self) -> &'static dyn Dialect {
        DialectKind::Sqlite.dialect()
    }

    /// `sqlx` binds SQLite parameters by number only.
    fn bind_collector(&self) -> BindCollector {
        BindCollector::specified_ordered("$")
    }

    async fn acquire(&self, mode: AccessMode, use_master: bool) -> Result<SqliteConnection> {
        let inner = self
            .pool_for(mode, use_master)
            .acquire()
            .await
            .map_err(classify)?;
        Ok(SqliteConnection {
            inner,
            broken: false,
        })
    }

    async fn release(&self, connection: SqliteConnection) {
        drop(connection);
    }

    async fn destroy(&self, connection: SqliteConnection) {
        if let Err(e) = connection.inner.close().await {
            warn!(error = %e, "Failed to close SQLite connection");
        }
    }
}

/// A checked-out SQLite connection.
#[derive(Debug)]
pub struct SqliteConnection {
    inner: PoolConnection<Sqlite>,
    broken: bool,
}

impl SqliteConnection {
    async fn run(&mut self, statement: &Statement) -> Result<QueryResult> {
        let Parameters::Positional(values) = &statement.parameters else {
            return Err(ExecError::Unsupported(
                "named bind parameters on SQLite".to_string(),
            ));
        };
        let query = values
            .iter()
            .try_fold(sqlx::query(&statement.sql), bind_value)?;

        if statement.fetch_rows {
            let rows = query.fetch_all(&mut *self.inner).await?;
            let rows = rows.iter().map(row_to_json).collect::<Result<Vec<_>>>()?;
            return Ok(QueryResult {
                rows_affected: u64::try_from(rows.len()).unwrap_or(u64::MAX),
                rows,
                last_insert_id: None,
            });
        }

        let done = query.execute(&mut *self.inner).await?;
        let inserted = matches!(statement.query_type, QueryType::Insert | QueryType::Upsert);
        Ok(QueryResult {
            rows: Vec::new(),
            rows_affected: done.rows_affected(),
            last_insert_id: inserted.then(|| done.last_insert_rowid()),
        })
    }
}

#[async_trait]
impl Connection for SqliteConnection {
    async fn execute(&mut self, statement: &Statement) -> Result<QueryResult> {
        let result = self.run(statement).await.map_err(|e| match e {
            ExecError::Sqlx(inner) => classify(inner),
            other => other,
        });
        if matches!(&result, Err(e) if e.is_connection_error()) {
            self.broken = true;
        }
        result
    }

    fn is_valid(&self) -> bool {
        !self.broken
    }
}

fn bind_value<'q>(query: SqliteQuery<'q>, value: &Value) -> Result<SqliteQuery<'q>> {
    Ok(match value {
        Value::Null => query.bind(None::<i64>),
        Value::Bool(b) => query.bind(*b),
        Value::Int(n) => query.bind(*n),
        Value::Float(n) => query.bind(*n),
        Value::Text(text) => query.bind(text.clone()),
        Value::Bytes(bytes) => query.bind(bytes.clone()),
        Value::Date(date) => query.bind(*date),
        Value::DateTime(datetime) => query.bind(*datetime),
        Value::Json(json) => query.bind(json.to_string()),
        Value::Array(_) => {
            return Err(ExecError::Unsupported(
                "array bind parameters on SQLite".to_string(),
            ))
        }
    })
}

/// Reads a row by the storage class of each value. Blobs come back as hex.
fn row_to_json(row: &SqliteRow) -> Result<serde_json::Map<String, JsonValue>> {
    let mut object = serde_json::Map::new();
    for (index, column) in row.columns().iter().enumerate() {
        let raw = row.try_get_raw(index)?;
        let value = if raw.is_null() {
            JsonValue::Null
        } else {
            match raw.type_info().name() {
                "INTEGER" => {
                    let n: i64 = row.try_get_unchecked(index)?;
                    if column.type_info().name() == "BOOLEAN" {
                        JsonValue::Bool(n != 0)
                    } else {
                        JsonValue::from(n)
                    }
                }
                "REAL" => JsonValue::from(row.try_get_unchecked::<f64, _>(index)?),
                "BLOB" => JsonValue::String(hex::encode(
                    row.try_get_unchecked::<Vec<u8>, _>(index)?,
                )),
                _ => JsonValue::String(row.try_get_unchecked::<String, _>(index)?),
            }
        };
        object.insert(column.name().to_string(), value);
    }
    Ok(object)
}

/// Maps a primary SQLite result code to its symbolic name.
const fn result_code_name(code: i32) -> Option<&'static str> {
    Some(match code & 0xff {
        1 => "SQLITE_ERROR",
        3 => "SQLITE_PERM",
        5 => "SQLITE_BUSY",
        6 => "SQLITE_LOCKED",
        8 => "SQLITE_READONLY",
        10 => "SQLITE_IOERR",
        11 => "SQLITE_CORRUPT",
        13 => "SQLITE_FULL",
        14 => "SQLITE_CANTOPEN",
        19 => "SQLITE_CONSTRAINT",
        20 => "SQLITE_MISMATCH",
        23 => "SQLITE_AUTH",
        _ => return None,
    })
}

/// Sorts a driver error into the connection kinds the executor knows.
fn classify(error: sqlx::Error) -> ExecError {
    match error {
        sqlx::Error::PoolTimedOut => ExecError::AcquireTimeout,
        sqlx::Error::PoolClosed => ExecError::Connection("pool is closed".to_string()),
        sqlx::Error::Io(e) => match e.kind() {
            io::ErrorKind::ConnectionRefused => ExecError::ConnectionRefused,
            io::ErrorKind::PermissionDenied => ExecError::AccessDenied,
            io::ErrorKind::HostUnreachable | io::ErrorKind::NetworkUnreachable => {
                ExecError::HostUnreachable
            }
            _ => ExecError::Connection(e.to_string()),
        },
        sqlx::Error::Database(db) => {
            let numeric = db.code().and_then(|code| code.parse::<i32>().ok());
            match numeric.and_then(result_code_name) {
                Some("SQLITE_AUTH" | "SQLITE_PERM") => ExecError::AccessDenied,
                Some("SQLITE_CANTOPEN") => ExecError::Connection(db.message().to_string()),
                name => ExecError::Database {
                    code: name
                        .map(str::to_string)
                        .or_else(|| db.code().map(Cow::into_owned)),
                    message: db.message().to_string(),
                },
            }
        }
        other => ExecError::Sqlx(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn memory_pool() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(":memory:")
            .await
            .expect("Failed to create in-memory SQLite pool");
        SqlitePool::new(pool)
    }

    fn statement(sql: &str, values: Vec<Value>, query_type: QueryType) -> Statement {
        Statement {
            sql: sql.to_string(),
            parameters: Parameters::Positional(values),
            query_type,
            fetch_rows: query_type.returns_rows(),
        }
    }

    #[test]
    fn test_result_code_names() {
        assert_eq!(result_code_name(5), Some("SQLITE_BUSY"));
        // extended codes share the primary code in the low byte
        assert_eq!(result_code_name(517), Some("SQLITE_BUSY"));
        assert_eq!(result_code_name(2067), Some("SQLITE_CONSTRAINT"));
        assert_eq!(result_code_name(99), None);
    }

    #[test]
    fn test_classify_pool_errors() {
        assert!(matches!(classify(sqlx::Error::PoolTimedOut), ExecError::AcquireTimeout));
        let refused = sqlx::Error::Io(io::Error::from(io::ErrorKind::ConnectionRefused));
        assert!(matches!(classify(refused), ExecError::ConnectionRefused));
        let denied = sqlx::Error::Io(io::Error::from(io::ErrorKind::PermissionDenied));
        assert!(matches!(classify(denied), ExecError::AccessDenied));
        assert!(matches!(classify(sqlx::Error::RowNotFound), ExecError::Sqlx(_)));
    }

    #[tokio::test]
    async fn test_execute_and_fetch() {
        let pool = memory_pool().await;
        let mut connection = pool.acquire(AccessMode::Write, false).await.unwrap();
        connection
            .execute(&statement(
                "CREATE TABLE t (id INTEGER PRIMARY KEY, name TEXT, score REAL, data BLOB, flag BOOLEAN)",
                vec![],
                QueryType::Raw,
            ))
            .await
            .unwrap();

        let inserted = connection
            .execute(&statement(
                "INSERT INTO t (name, score, data, flag) VALUES ($1, $2, $3, $4)",
                vec![
                    Value::from("ann"),
                    Value::Float(1.5),
                    Value::Bytes(vec![0xde, 0xad]),
                    Value::Bool(true),
                ],
                QueryType::Insert,
            ))
            .await
            .unwrap();
        assert_eq!(inserted.rows_affected, 1);
        assert_eq!(inserted.last_insert_id, Some(1));

        let selected = connection
            .execute(&statement(
                "SELECT id, name, score, data, flag, NULL AS nothing FROM t WHERE name = $1",
                vec![Value::from("ann")],
                QueryType::Select,
            ))
            .await
            .unwrap();
        assert_eq!(selected.rows.len(), 1);
        let row = &selected.rows[0];
        assert_eq!(row["id"], JsonValue::from(1));
        assert_eq!(row["name"], JsonValue::from("ann"));
        assert_eq!(row["score"], JsonValue::from(1.5));
        assert_eq!(row["data"], JsonValue::from("dead"));
        assert_eq!(row["flag"], JsonValue::Bool(true));
        assert_eq!(row["nothing"], JsonValue::Null);
        pool.release(connection).await;
    }

    #[tokio::test]
    async fn test_database_errors_carry_symbolic_codes() {
        let pool = memory_pool().await;
        let mut connection = pool.acquire(AccessMode::Write, false).await.unwrap();
        connection
            .execute(&statement(
                "CREATE TABLE u (email TEXT UNIQUE)",
                vec![],
                QueryType::Raw,
            ))
            .await
            .unwrap();
        let insert = statement(
            "INSERT INTO u (email) VALUES ($1)",
            vec![Value::from("a@b.c")],
            QueryType::Insert,
        );
        connection.execute(&insert).await.unwrap();
        let err = connection.execute(&insert).await.unwrap_err();
        match err {
            ExecError::Database { code, message } => {
                assert_eq!(code.as_deref(), Some("SQLITE_CONSTRAINT"));
                assert!(message.contains("UNIQUE"), "{message}");
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert!(connection.is_valid());
    }

    #[tokio::test]
    async fn test_unsupported_parameters() {
        let pool = memory_pool().await;
        let mut connection = pool.acquire(AccessMode::Write, false).await.unwrap();
        let err = connection
            .execute(&statement("SELECT $1", vec![Value::array([1, 2])], QueryType::Select))
            .await
            .unwrap_err();
        assert!(matches!(err, ExecError::Unsupported(_)));

        let named = Statement {
            sql: "SELECT :a".to_string(),
            parameters: Parameters::Named([("a".to_string(), Value::Int(1))].into_iter().collect()),
            query_type: QueryType::Select,
            fetch_rows: true,
        };
        assert!(matches!(
            connection.execute(&named).await,
            Err(ExecError::Unsupported(_))
        ));
    }

    #[tokio::test]
    async fn test_destroy_closes_the_connection() {
        let pool = memory_pool().await;
        let connection = pool.acquire(AccessMode::Write, false).await.unwrap();
        pool.destroy(connection).await;
        // the single slot is free again
        let again = pool.acquire(AccessMode::Write, false).await.unwrap();
        assert!(again.is_valid());
    }
}
