//! Retry policy for transient execution failures.
//!
//! Only the execution step is ever retried. Generation and bind mapping are
//! deterministic, so their errors surface on the first attempt.

use std::time::Duration;

use rand::RngExt;
use regex::Regex;
use tracing::warn;

use crate::config::RetryConfig;
use crate::error::{ExecError, Result};

/// One entry of the retry allowlist.
#[derive(Debug, Clone)]
pub enum RetryMatch {
    Substring(String),
    Pattern(Regex),
}

impl RetryMatch {
    /// Parses `/regex/` as a regular expression and anything else as a
    /// substring.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for an invalid regular expression.
    pub fn parse(pattern: &str) -> Result<Self> {
        match pattern
            .strip_prefix('/')
            .and_then(|rest| rest.strip_suffix('/'))
        {
            Some(expression) if !expression.is_empty() => Regex::new(expression)
                .map(Self::Pattern)
                .map_err(|e| ExecError::Config(format!("invalid retry pattern {pattern}: {e}"))),
            _ => Ok(Self::Substring(pattern.to_string())),
        }
    }

    #[must_use]
    pub fn matches(&self, message: &str) -> bool {
        match self {
            Self::Substring(needle) => message.contains(needle.as_str()),
            Self::Pattern(regex) => regex.is_match(message),
        }
    }
}

/// Decides whether a failed attempt is tried again and after which delay.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    matchers: Vec<RetryMatch>,
    backoff_base: Duration,
    backoff_exponent: f64,
    jitter: bool,
    timeout: Option<Duration>,
}

impl RetryPolicy {
    /// Builds a policy from configuration.
    ///
    /// # Errors
    ///
    /// Fails on an invalid pattern or a backoff exponent that is not a
    /// positive finite number.
    pub fn from_config(config: &RetryConfig) -> Result<Self> {
        if !config.backoff_exponent.is_finite() || config.backoff_exponent <= 0.0 {
            return Err(ExecError::Config(format!(
                "backoff exponent must be positive, got {}",
                config.backoff_exponent
            )));
        }
        let matchers = config
            .match_patterns
            .iter()
            .map(|pattern| RetryMatch::parse(pattern))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            max_attempts: config.max.max(1),
            matchers,
            backoff_base: Duration::from_millis(config.backoff_base_ms),
            backoff_exponent: config.backoff_exponent,
            jitter: config.jitter,
            timeout: config.timeout_ms.map(Duration::from_millis),
        })
    }

    /// A policy that never retries.
    #[must_use]
    pub const fn never() -> Self {
        Self {
            max_attempts: 1,
            matchers: Vec::new(),
            backoff_base: Duration::ZERO,
            backoff_exponent: 1.0,
            jitter: false,
            timeout: None,
        }
    }

    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    #[must_use]
    pub const fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Whether `error` is on the allowlist.
    #[must_use]
    pub fn is_retryable(&self, error: &ExecError) -> bool {
        if !error.is_execution_error() {
            return false;
        }
        let message = error.to_string();
        self.matchers.iter().any(|m| m.matches(&message))
    }

    /// Delay before attempt `attempt + 1`: `base * exponent^(attempt - 1)`.
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let power = i32::try_from(attempt.saturating_sub(1)).unwrap_or(i32::MAX);
        let mut factor = self.backoff_exponent.powi(power);
        if self.jitter {
            factor *= rand::rng().random_range(0.5..1.5);
        }
        Duration::try_from_secs_f64(self.backoff_base.as_secs_f64() * factor)
            .unwrap_or(Duration::MAX)
    }

    /// Handles a failed attempt. Returns the delay to wait before the next
    /// attempt, or the error to give up with.
    ///
    /// # Errors
    ///
    /// Returns `error` unchanged when it is not retryable, and wraps it in
    /// [`ExecError::RetryExhausted`] once the last attempt has failed.
    pub fn on_failure(&self, error: ExecError, attempt: u32) -> Result<Duration> {
        if !self.is_retryable(&error) {
            return Err(error);
        }
        if attempt >= self.max_attempts {
            return Err(ExecError::RetryExhausted {
                attempts: attempt,
                source: Box::new(error),
            });
        }
        let delay = self.delay_for(attempt);
        warn!(
            attempt,
            max_attempts = self.max_attempts,
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            error = %error,
            "Retrying query"
        );
        Ok(delay)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::never()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn busy() -> ExecError {
        ExecError::Database {
            code: Some("SQLITE_BUSY".to_string()),
            message: "database is locked".to_string(),
        }
    }

    #[test]
    fn test_substring_and_regex_patterns() {
        let substring = RetryMatch::parse("locked").unwrap();
        assert!(matches!(substring, RetryMatch::Substring(_)));
        assert!(substring.matches("database is locked"));

        let regex = RetryMatch::parse("/dead(lock)?/").unwrap();
        assert!(matches!(regex, RetryMatch::Pattern(_)));
        assert!(regex.matches("deadlock found"));
        assert!(!regex.matches("all good"));

        // a lone slash is not a regex
        assert!(matches!(RetryMatch::parse("/").unwrap(), RetryMatch::Substring(_)));
        assert!(RetryMatch::parse("/(unclosed/").is_err());
    }

    #[test]
    fn test_backoff_grows_geometrically() {
        let policy = RetryPolicy::from_config(&RetryConfig {
            backoff_base_ms: 100,
            backoff_exponent: 2.0,
            ..RetryConfig::default()
        })
        .unwrap();
        assert_eq!(policy.delay_for(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for(2), Duration::from_millis(200));
        assert_eq!(policy.delay_for(4), Duration::from_millis(800));
    }

    #[test]
    fn test_jitter_stays_in_range() {
        let policy = RetryPolicy::from_config(&RetryConfig {
            jitter: true,
            ..RetryConfig::default()
        })
        .unwrap();
        for _ in 0..20 {
            let delay = policy.delay_for(1);
            assert!(delay >= Duration::from_millis(50) && delay <= Duration::from_millis(150));
        }
    }

    #[test]
    fn test_only_matching_execution_errors_retry() {
        let policy = RetryPolicy::from_config(&RetryConfig::default()).unwrap();
        assert!(policy.is_retryable(&busy()));
        assert!(!policy.is_retryable(&ExecError::Database {
            code: Some("SQLITE_CONSTRAINT".to_string()),
            message: "UNIQUE constraint failed: users.email".to_string(),
        }));
        // errors raised before execution never retry, even when the text matches
        assert!(!policy.is_retryable(&ExecError::Config("database is locked".to_string())));
    }

    #[test]
    fn test_on_failure_gives_up_after_max() {
        let policy = RetryPolicy::from_config(&RetryConfig {
            max: 3,
            ..RetryConfig::default()
        })
        .unwrap();
        assert!(policy.on_failure(busy(), 1).is_ok());
        assert!(policy.on_failure(busy(), 2).is_ok());
        match policy.on_failure(busy(), 3) {
            Err(ExecError::RetryExhausted { attempts, source }) => {
                assert_eq!(attempts, 3);
                assert!(source.to_string().contains("database is locked"));
            }
            other => panic!("expected exhaustion, got {other:?}"),
        }

        let err = policy
            .on_failure(ExecError::Unsupported("arrays".into()), 1)
            .unwrap_err();
        assert!(matches!(err, ExecError::Unsupported(_)));
    }

    #[test]
    fn test_invalid_exponent() {
        let err = RetryPolicy::from_config(&RetryConfig {
            backoff_exponent: f64::NAN,
            ..RetryConfig::default()
        })
        .unwrap_err();
        assert!(matches!(err, ExecError::Config(_)));
    }

    #[test]
    fn test_never_policy() {
        let policy = RetryPolicy::never();
        assert_eq!(policy.max_attempts(), 1);
        assert!(matches!(policy.on_failure(busy(), 1), Err(ExecError::Database { .. })));
    }
}
