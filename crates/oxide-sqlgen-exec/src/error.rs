//! Error types for query execution.

use oxide_sqlgen::SqlGenError;

/// Errors raised while preparing or running a query.
#[derive(Debug, thiserror::Error)]
pub enum ExecError {
    /// Replacement injection or bind mapping failed.
    #[error(transparent)]
    SqlGen(#[from] SqlGenError),

    /// A driver error that has no more specific classification.
    #[error("Driver error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// No connection became available in time.
    #[error("Timed out while acquiring a connection from the pool")]
    AcquireTimeout,

    /// The database refused the connection.
    #[error("Connection refused")]
    ConnectionRefused,

    /// The database rejected the credentials or the file permissions.
    #[error("Access denied")]
    AccessDenied,

    /// The database host could not be reached.
    #[error("Host unreachable")]
    HostUnreachable,

    /// Any other connection failure.
    #[error("Connection error: {0}")]
    Connection(String),

    /// The database rejected the statement.
    #[error("Database error ({}): {message}", .code.as_deref().unwrap_or("unknown"))]
    Database {
        /// Driver error code, symbolic when known.
        code: Option<String>,
        /// Message reported by the database.
        message: String,
    },

    /// A value or parameter style the driver cannot send.
    #[error("Unsupported by the driver: {0}")]
    Unsupported(String),

    /// Every allowed attempt failed with a retryable error.
    #[error("Query failed after {attempts} attempts: {source}")]
    RetryExhausted {
        /// Number of attempts made.
        attempts: u32,
        /// Error of the last attempt.
        source: Box<ExecError>,
    },

    /// The retry budget's overall timeout elapsed.
    #[error("Query timed out after {elapsed_ms}ms")]
    Timeout {
        /// Configured timeout.
        elapsed_ms: u64,
    },

    /// The executor configuration is invalid.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Configuration text could not be parsed.
    #[error("Configuration parse error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ExecError {
    /// Whether the error comes from the connection layer rather than from
    /// the statement.
    #[must_use]
    pub const fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::AcquireTimeout
                | Self::ConnectionRefused
                | Self::AccessDenied
                | Self::HostUnreachable
                | Self::Connection(_)
        )
    }

    /// Whether a retry policy may consider the error at all. Errors that
    /// happen before anything reaches the database never are.
    #[must_use]
    pub const fn is_execution_error(&self) -> bool {
        !matches!(
            self,
            Self::SqlGen(_)
                | Self::Unsupported(_)
                | Self::Config(_)
                | Self::Json(_)
                | Self::RetryExhausted { .. }
                | Self::Timeout { .. }
        )
    }
}

/// Result type for query execution.
pub type Result<T> = std::result::Result<T, ExecError>;
