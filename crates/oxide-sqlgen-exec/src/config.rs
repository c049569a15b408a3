//! Executor configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Settings for a [`crate::QueryExecutor`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    pub retry: RetryConfig,
    /// How long to wait for a pooled connection.
    pub acquire_timeout_ms: u64,
    /// Log every statement at debug level.
    pub log_sql: bool,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            retry: RetryConfig::default(),
            acquire_timeout_ms: 60_000,
            log_sql: true,
        }
    }
}

impl ExecutorConfig {
    /// Parses a configuration from JSON. Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid JSON for this shape.
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    #[must_use]
    pub const fn acquire_timeout(&self) -> Duration {
        Duration::from_millis(self.acquire_timeout_ms)
    }
}

/// When and how often a failed query is tried again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts, the first one included.
    pub max: u32,
    /// Error message patterns that make an error retryable. A pattern
    /// wrapped in slashes, such as `/busy|locked/`, is a regular
    /// expression; anything else is matched as a substring.
    pub match_patterns: Vec<String>,
    pub backoff_base_ms: u64,
    pub backoff_exponent: f64,
    /// Scale each delay by a random factor between 0.5 and 1.5.
    pub jitter: bool,
    /// Upper bound for all attempts together.
    pub timeout_ms: Option<u64>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max: 5,
            match_patterns: vec![
                "SQLITE_BUSY".to_string(),
                "database is locked".to_string(),
            ],
            backoff_base_ms: 100,
            backoff_exponent: 1.1,
            jitter: false,
            timeout_ms: None,
        }
    }
}
