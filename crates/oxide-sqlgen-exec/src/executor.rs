//! Query executor.
//!
//! Turns SQL text plus replacements and bind values into a driver
//! [`Statement`], checks a connection out for it, and retries transient
//! failures.

use std::future::Future;
use std::time::Duration;

use oxide_sqlgen::{
    inject_replacements, map_bind_parameters_with, BindValues, Dialect, QueryGenerator,
    Replacements, SqlGenError, SqlWithBind,
};
use tokio::time::{sleep, timeout, timeout_at, Instant};
use tracing::{debug, info, warn};

use crate::config::ExecutorConfig;
use crate::error::{ExecError, Result};
use crate::pool::{Connection, ConnectionPool, Parameters, QueryResult, QueryType, Statement};
use crate::retry::RetryPolicy;

/// Per-call options.
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryOptions<'a> {
    pub query_type: QueryType,
    /// Run a select on the write replica.
    pub use_master: bool,
    /// `:name` or `?` values inlined into the SQL before binding.
    pub replacements: Option<&'a Replacements>,
    /// `$name` or `$1` values sent to the driver.
    pub bind: Option<&'a BindValues>,
    /// The statement carries a `RETURNING` clause, so rows come back even
    /// though it is not a select.
    pub returning: bool,
}

impl<'a> QueryOptions<'a> {
    #[must_use]
    pub fn new(query_type: QueryType) -> Self {
        Self {
            query_type,
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn use_master(mut self) -> Self {
        self.use_master = true;
        self
    }

    #[must_use]
    pub const fn replacements(mut self, replacements: &'a Replacements) -> Self {
        self.replacements = Some(replacements);
        self
    }

    #[must_use]
    pub const fn bind(mut self, bind: &'a BindValues) -> Self {
        self.bind = Some(bind);
        self
    }

    #[must_use]
    pub const fn returning(mut self) -> Self {
        self.returning = true;
        self
    }
}

/// Runs SQL against a [`ConnectionPool`].
pub struct QueryExecutor<P: ConnectionPool> {
    pool: P,
    retry: RetryPolicy,
    config: ExecutorConfig,
}

impl<P: ConnectionPool> QueryExecutor<P> {
    /// Creates an executor over `pool`.
    ///
    /// # Errors
    ///
    /// Returns an error if the retry configuration is invalid.
    pub fn new(pool: P, config: ExecutorConfig) -> Result<Self> {
        let retry = RetryPolicy::from_config(&config.retry)?;
        Ok(Self {
            pool,
            retry,
            config,
        })
    }

    /// Replaces the retry policy built from the configuration.
    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    #[must_use]
    pub const fn pool(&self) -> &P {
        &self.pool
    }

    #[must_use]
    pub fn dialect(&self) -> &'static dyn Dialect {
        self.pool.dialect()
    }

    /// A generator for the pool's dialect.
    #[must_use]
    pub fn generator(&self) -> QueryGenerator {
        QueryGenerator::new(self.pool.dialect())
    }

    /// Runs `sql` on a pooled connection. Each attempt checks a connection
    /// out and gives it back, also when the attempt fails.
    ///
    /// # Errors
    ///
    /// Returns mapping errors before anything is sent, connection errors
    /// from the pool, and database errors once retries are used up.
    pub async fn query(&self, sql: &str, options: QueryOptions<'_>) -> Result<QueryResult> {
        let statement = self.prepare(sql, &options)?;
        self.execute(None, &statement, &options).await
    }

    /// Runs `sql` on a connection the caller owns, such as one holding an
    /// open transaction. The connection is never released here.
    ///
    /// # Errors
    ///
    /// Same as [`QueryExecutor::query`], without pool errors.
    pub async fn query_on(
        &self,
        connection: &mut P::Connection,
        sql: &str,
        options: QueryOptions<'_>,
    ) -> Result<QueryResult> {
        let statement = self.prepare(sql, &options)?;
        self.execute(Some(connection), &statement, &options).await
    }

    /// Runs a generated statement with the bind values it came with.
    ///
    /// # Errors
    ///
    /// Same as [`QueryExecutor::query`].
    pub async fn run(
        &self,
        statement: &SqlWithBind,
        options: QueryOptions<'_>,
    ) -> Result<QueryResult> {
        let bind = statement.bind.clone().map(BindValues::Named);
        let options = QueryOptions {
            bind: bind.as_ref().or(options.bind),
            ..options
        };
        self.query(&statement.query, options).await
    }

    /// Applies replacements, then rewrites bind parameters into the driver's
    /// syntax and orders their values.
    fn prepare(&self, sql: &str, options: &QueryOptions<'_>) -> Result<Statement> {
        let dialect = self.pool.dialect();
        let sql = match options.replacements {
            Some(replacements) => inject_replacements(sql, dialect, replacements)?,
            None => sql.to_string(),
        };
        let fetch_rows = options.returning || options.query_type.returns_rows();

        let Some(bind) = options.bind else {
            return Ok(Statement {
                sql,
                parameters: Parameters::default(),
                query_type: options.query_type,
                fetch_rows,
            });
        };

        let mapped = map_bind_parameters_with(&sql, dialect, self.pool.bind_collector())?;
        let value = |name: &String| {
            bind.get(name)
                .cloned()
                .ok_or_else(|| SqlGenError::MissingBindParameter { name: name.clone() })
        };
        let parameters = match &mapped.bind_order {
            Some(order) => Parameters::Positional(
                order
                    .iter()
                    .map(value)
                    .collect::<std::result::Result<_, _>>()?,
            ),
            None => Parameters::Named(
                mapped
                    .parameter_set
                    .iter()
                    .map(|name| Ok((name.clone(), value(name)?)))
                    .collect::<std::result::Result<_, SqlGenError>>()?,
            ),
        };

        Ok(Statement {
            sql: mapped.sql,
            parameters,
            query_type: options.query_type,
            fetch_rows,
        })
    }

    async fn execute(
        &self,
        connection: Option<&mut P::Connection>,
        statement: &Statement,
        options: &QueryOptions<'_>,
    ) -> Result<QueryResult> {
        if self.config.log_sql {
            debug!(
                sql = %statement.sql,
                parameters = statement.parameters.len(),
                "Executing SQL"
            );
        }
        let started = Instant::now();
        let deadline = self.retry.timeout().map(|limit| started + limit);
        let result = self
            .with_retries(connection, statement, options, deadline)
            .await?;
        info!(
            query_type = ?options.query_type,
            rows = result.rows.len(),
            rows_affected = result.rows_affected,
            elapsed_ms = millis(started.elapsed()),
            "Query completed"
        );
        Ok(result)
    }

    async fn with_retries(
        &self,
        mut connection: Option<&mut P::Connection>,
        statement: &Statement,
        options: &QueryOptions<'_>,
        deadline: Option<Instant>,
    ) -> Result<QueryResult> {
        let mut attempt = 1;
        loop {
            let result = match connection.as_deref_mut() {
                Some(connection) => self.before(deadline, connection.execute(statement)).await,
                None => self.attempt_pooled(statement, options, deadline).await,
            };
            match result {
                Ok(result) => return Ok(result),
                Err(error) => {
                    let delay = self.retry.on_failure(error, attempt)?;
                    self.before(deadline, async {
                        sleep(delay).await;
                        Ok(())
                    })
                    .await?;
                    attempt += 1;
                }
            }
        }
    }

    /// One attempt on a pooled connection. Whatever happens after the
    /// connection is acquired, it goes back to the pool or is destroyed.
    async fn attempt_pooled(
        &self,
        statement: &Statement,
        options: &QueryOptions<'_>,
        deadline: Option<Instant>,
    ) -> Result<QueryResult> {
        let mode = options.query_type.access_mode();
        let acquire = async {
            timeout(
                self.config.acquire_timeout(),
                self.pool.acquire(mode, options.use_master),
            )
            .await
            .map_err(|_| ExecError::AcquireTimeout)?
        };
        let mut connection = self.before(deadline, acquire).await?;

        let result = self.before(deadline, connection.execute(statement)).await;
        // a statement cut off mid-flight leaves the connection in an unknown state
        let broken = result.as_ref().err().is_some_and(|error| {
            error.is_connection_error() || matches!(error, ExecError::Timeout { .. })
        }) || !connection.is_valid();
        if broken {
            warn!(mode = %mode, "Discarding broken connection");
            self.pool.destroy(connection).await;
        } else {
            self.pool.release(connection).await;
        }
        result
    }

    /// Runs `work` unless the overall deadline passes first.
    async fn before<T>(
        &self,
        deadline: Option<Instant>,
        work: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        let Some(deadline) = deadline else {
            return work.await;
        };
        timeout_at(deadline, work)
            .await
            .map_err(|_| ExecError::Timeout {
                elapsed_ms: self.retry.timeout().map_or(0, millis),
            })?
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use oxide_sqlgen::{DialectKind, ErrorKind, Value};

    use super::*;
    use crate::config::RetryConfig;
    use crate::pool::AccessMode;

    /// Records what the executor asks of the pool and fails on demand.
    #[derive(Debug, Default)]
    struct Recorder {
        acquired: Mutex<Vec<(AccessMode, bool)>>,
        statements: Mutex<Vec<Statement>>,
        released: AtomicU32,
        destroyed: AtomicU32,
        failures: Mutex<Vec<ExecError>>,
        /// How long each statement takes.
        latency: Mutex<Option<Duration>>,
    }

    struct FakeConnection(Arc<Recorder>);

    #[async_trait]
    impl Connection for FakeConnection {
        async fn execute(&mut self, statement: &Statement) -> Result<QueryResult> {
            self.0.statements.lock().unwrap().push(statement.clone());
            let latency = *self.0.latency.lock().unwrap();
            if let Some(latency) = latency {
                sleep(latency).await;
            }
            if let Some(error) = self.0.failures.lock().unwrap().pop() {
                return Err(error);
            }
            Ok(QueryResult {
                rows_affected: 1,
                ..QueryResult::default()
            })
        }
    }

    struct FakePool {
        kind: DialectKind,
        recorder: Arc<Recorder>,
    }

    #[async_trait]
    impl ConnectionPool for FakePool {
        type Connection = FakeConnection;

        fn dialect(&self) -> &'static dyn Dialect {
            self.kind.dialect()
        }

        async fn acquire(&self, mode: AccessMode, use_master: bool) -> Result<FakeConnection> {
            self.recorder.acquired.lock().unwrap().push((mode, use_master));
            Ok(FakeConnection(Arc::clone(&self.recorder)))
        }

        async fn release(&self, _connection: FakeConnection) {
            self.recorder.released.fetch_add(1, Ordering::SeqCst);
        }

        async fn destroy(&self, _connection: FakeConnection) {
            self.recorder.destroyed.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn executor(kind: DialectKind) -> (QueryExecutor<FakePool>, Arc<Recorder>) {
        let recorder = Arc::new(Recorder::default());
        let pool = FakePool {
            kind,
            recorder: Arc::clone(&recorder),
        };
        let config = ExecutorConfig {
            retry: RetryConfig {
                max: 3,
                backoff_base_ms: 1,
                ..RetryConfig::default()
            },
            ..ExecutorConfig::default()
        };
        (QueryExecutor::new(pool, config).unwrap(), recorder)
    }

    fn busy() -> ExecError {
        ExecError::Database {
            code: Some("SQLITE_BUSY".to_string()),
            message: "database is locked".to_string(),
        }
    }

    #[tokio::test]
    async fn test_positional_binds_follow_placeholder_order() {
        let (executor, recorder) = executor(DialectKind::Postgres);
        let bind = BindValues::named([("b", 2), ("a", 1)]);
        executor
            .query(
                "SELECT * FROM t WHERE a = $a AND b = $b AND c = $a",
                QueryOptions::new(QueryType::Select).bind(&bind),
            )
            .await
            .unwrap();

        let statement = recorder.statements.lock().unwrap()[0].clone();
        assert_eq!(statement.sql, "SELECT * FROM t WHERE a = $1 AND b = $2 AND c = $1");
        assert_eq!(
            statement.parameters,
            Parameters::Positional(vec![Value::Int(1), Value::Int(2)])
        );
        assert!(statement.fetch_rows);
    }

    #[tokio::test]
    async fn test_named_drivers_receive_a_map() {
        let (executor, recorder) = executor(DialectKind::MsSql);
        let bind = BindValues::named([("id", 7), ("unused", 8)]);
        executor
            .query("DELETE FROM t WHERE id = $id", QueryOptions::new(QueryType::Delete).bind(&bind))
            .await
            .unwrap();

        let statement = recorder.statements.lock().unwrap()[0].clone();
        assert_eq!(statement.sql, "DELETE FROM t WHERE id = @id");
        let Parameters::Named(values) = statement.parameters else {
            panic!("expected named parameters");
        };
        assert_eq!(values.len(), 1);
        assert_eq!(values.get("id"), Some(&Value::Int(7)));
        assert!(!statement.fetch_rows);
    }

    #[tokio::test]
    async fn test_positional_bind_array() {
        let (executor, recorder) = executor(DialectKind::MySql);
        let bind = BindValues::positional(["x", "y"]);
        executor
            .query("SELECT $2, $1", QueryOptions::default().bind(&bind))
            .await
            .unwrap();
        let statement = recorder.statements.lock().unwrap()[0].clone();
        assert_eq!(statement.sql, "SELECT ?, ?");
        assert_eq!(
            statement.parameters,
            Parameters::Positional(vec![Value::from("y"), Value::from("x")])
        );
    }

    #[tokio::test]
    async fn test_missing_bind_value_is_reported_before_acquire() {
        let (executor, recorder) = executor(DialectKind::Postgres);
        let bind = BindValues::named([("a", 1)]);
        let err = executor
            .query("SELECT $a, $b", QueryOptions::default().bind(&bind))
            .await
            .unwrap_err();
        match err {
            ExecError::SqlGen(inner) => {
                assert_eq!(inner.kind(), ErrorKind::ParameterMapping);
                assert!(inner.to_string().contains("$b"));
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert!(recorder.acquired.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_replacements_are_inlined_first() {
        let (executor, recorder) = executor(DialectKind::Postgres);
        let replacements = Replacements::named([("name", "O'Brien")]);
        executor
            .query(
                "SELECT * FROM users WHERE name = :name",
                QueryOptions::new(QueryType::Select).replacements(&replacements),
            )
            .await
            .unwrap();
        let statement = recorder.statements.lock().unwrap()[0].clone();
        assert_eq!(statement.sql, "SELECT * FROM users WHERE name = 'O''Brien'");
        assert!(statement.parameters.is_empty());
    }

    #[tokio::test]
    async fn test_selects_read_unless_use_master() {
        let (executor, recorder) = executor(DialectKind::Sqlite);
        executor
            .query("SELECT 1", QueryOptions::new(QueryType::Select))
            .await
            .unwrap();
        executor
            .query("SELECT 1", QueryOptions::new(QueryType::Select).use_master())
            .await
            .unwrap();
        executor
            .query("UPDATE t SET a = 1", QueryOptions::new(QueryType::Update))
            .await
            .unwrap();
        assert_eq!(
            *recorder.acquired.lock().unwrap(),
            vec![
                (AccessMode::Read, false),
                (AccessMode::Read, true),
                (AccessMode::Write, false)
            ]
        );
        assert_eq!(recorder.released.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_transient_errors_retry_and_release_each_time() {
        let (executor, recorder) = executor(DialectKind::Sqlite);
        recorder.failures.lock().unwrap().extend([busy(), busy()]);
        let result = executor
            .query("UPDATE t SET a = 1", QueryOptions::new(QueryType::Update))
            .await
            .unwrap();
        assert_eq!(result.rows_affected, 1);
        assert_eq!(recorder.acquired.lock().unwrap().len(), 3);
        assert_eq!(recorder.released.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retries_exhausted() {
        let (executor, recorder) = executor(DialectKind::Sqlite);
        recorder
            .failures
            .lock()
            .unwrap()
            .extend([busy(), busy(), busy()]);
        let err = executor
            .query("UPDATE t SET a = 1", QueryOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ExecError::RetryExhausted { attempts: 3, .. }));
        assert_eq!(recorder.released.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_other_errors_are_not_retried() {
        let (executor, recorder) = executor(DialectKind::Sqlite);
        recorder.failures.lock().unwrap().push(ExecError::Database {
            code: Some("SQLITE_CONSTRAINT".to_string()),
            message: "UNIQUE constraint failed: t.a".to_string(),
        });
        let err = executor
            .query("INSERT INTO t (a) VALUES (1)", QueryOptions::new(QueryType::Insert))
            .await
            .unwrap_err();
        assert!(matches!(err, ExecError::Database { .. }));
        assert_eq!(recorder.statements.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_broken_connections_are_destroyed() {
        let (executor, recorder) = executor(DialectKind::Sqlite);
        recorder
            .failures
            .lock()
            .unwrap()
            .push(ExecError::Connection("reset by peer".to_string()));
        let err = executor
            .query("SELECT 1", QueryOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ExecError::Connection(_)));
        assert_eq!(recorder.destroyed.load(Ordering::SeqCst), 1);
        assert_eq!(recorder.released.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_caller_connection_is_never_released() {
        let (executor, recorder) = executor(DialectKind::Sqlite);
        let mut connection = FakeConnection(Arc::clone(&recorder));
        recorder.failures.lock().unwrap().push(busy());
        executor
            .query_on(&mut connection, "UPDATE t SET a = 1", QueryOptions::default())
            .await
            .unwrap();
        assert_eq!(recorder.statements.lock().unwrap().len(), 2);
        assert!(recorder.acquired.lock().unwrap().is_empty());
        assert_eq!(recorder.released.load(Ordering::SeqCst), 0);
        assert_eq!(recorder.destroyed.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_run_uses_generated_binds() {
        let (executor, recorder) = executor(DialectKind::Postgres);
        let generated = executor
            .generator()
            .insert(
                "t",
                &[("a".to_string(), oxide_sqlgen::sql::value(5))].into_iter().collect(),
                &oxide_sqlgen::generator::InsertOptions::default(),
            )
            .unwrap();
        executor
            .run(&generated, QueryOptions::new(QueryType::Insert))
            .await
            .unwrap();
        let statement = recorder.statements.lock().unwrap()[0].clone();
        assert_eq!(statement.sql, "INSERT INTO \"t\" (\"a\") VALUES ($1);");
        assert_eq!(statement.parameters, Parameters::Positional(vec![Value::Int(5)]));
    }

    #[tokio::test]
    async fn test_overall_timeout() {
        let (executor, recorder) = executor(DialectKind::Sqlite);
        let executor = executor.with_retry_policy(
            RetryPolicy::from_config(&RetryConfig {
                max: 10,
                backoff_base_ms: 50,
                timeout_ms: Some(20),
                ..RetryConfig::default()
            })
            .unwrap(),
        );
        recorder.failures.lock().unwrap().extend([busy(), busy(), busy()]);
        let err = executor
            .query("SELECT 1", QueryOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ExecError::Timeout { elapsed_ms: 20 }));
    }

    #[tokio::test]
    async fn test_timeout_mid_statement_gives_the_connection_back() {
        let (executor, recorder) = executor(DialectKind::Sqlite);
        let executor = executor.with_retry_policy(
            RetryPolicy::from_config(&RetryConfig {
                timeout_ms: Some(20),
                ..RetryConfig::default()
            })
            .unwrap(),
        );
        *recorder.latency.lock().unwrap() = Some(Duration::from_millis(200));
        let err = executor
            .query("SELECT 1", QueryOptions::new(QueryType::Select))
            .await
            .unwrap_err();
        assert!(matches!(err, ExecError::Timeout { elapsed_ms: 20 }));
        assert_eq!(recorder.acquired.lock().unwrap().len(), 1);
        assert_eq!(recorder.released.load(Ordering::SeqCst), 0);
        assert_eq!(recorder.destroyed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_timeout_on_a_caller_connection() {
        let (executor, recorder) = executor(DialectKind::Sqlite);
        let executor = executor.with_retry_policy(
            RetryPolicy::from_config(&RetryConfig {
                timeout_ms: Some(20),
                ..RetryConfig::default()
            })
            .unwrap(),
        );
        *recorder.latency.lock().unwrap() = Some(Duration::from_millis(200));
        let mut connection = executor
            .pool()
            .acquire(AccessMode::Write, false)
            .await
            .unwrap();
        let err = executor
            .query_on(&mut connection, "SELECT 1", QueryOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ExecError::Timeout { .. }));
        assert_eq!(recorder.released.load(Ordering::SeqCst), 0);
        assert_eq!(recorder.destroyed.load(Ordering::SeqCst), 0);
    }
}
