//! Transaction control and session statements.

use core::fmt;
use core::str::FromStr;

use super::QueryGenerator;
use crate::dialect::DialectKind;
use crate::error::{Result, SqlGenError};

/// Transaction isolation level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IsolationLevel {
    ReadUncommitted,
    ReadCommitted,
    RepeatableRead,
    Serializable,
}

impl IsolationLevel {
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::ReadUncommitted => "READ UNCOMMITTED",
            Self::ReadCommitted => "READ COMMITTED",
            Self::RepeatableRead => "REPEATABLE READ",
            Self::Serializable => "SERIALIZABLE",
        }
    }
}

impl fmt::Display for IsolationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

impl FromStr for IsolationLevel {
    type Err = SqlGenError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().replace('_', " ").as_str() {
            "READ UNCOMMITTED" => Ok(Self::ReadUncommitted),
            "READ COMMITTED" => Ok(Self::ReadCommitted),
            "REPEATABLE READ" => Ok(Self::RepeatableRead),
            "SERIALIZABLE" => Ok(Self::Serializable),
            _ => Err(SqlGenError::validation(format!("Unknown isolation level: {s}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StartTransactionOptions {
    pub read_only: bool,
}

impl QueryGenerator {
    /// # Errors
    ///
    /// Fails on dialects whose transactions are driven by the driver, and
    /// when `read_only` is not available.
    pub fn start_transaction(&self, options: &StartTransactionOptions) -> Result<String> {
        self.ensure_transaction_statements()?;
        let support = &self.supports().start_transaction;
        self.ensure_supported(options.read_only, support.read_only, "Read-only transactions")?;
        let keyword = if support.use_begin { "BEGIN" } else { "START" };
        let sql = if options.read_only {
            format!("{keyword} TRANSACTION READ ONLY;")
        } else {
            format!("{keyword} TRANSACTION;")
        };
        Ok(self.finish("startTransactionQuery", sql))
    }

    /// # Errors
    ///
    /// Fails on dialects whose transactions are driven by the driver.
    pub fn commit_transaction(&self) -> Result<String> {
        self.ensure_transaction_statements()?;
        Ok(self.finish("commitTransactionQuery", String::from("COMMIT;")))
    }

    /// # Errors
    ///
    /// Fails on dialects whose transactions are driven by the driver.
    pub fn rollback_transaction(&self) -> Result<String> {
        self.ensure_transaction_statements()?;
        Ok(self.finish("rollbackTransactionQuery", String::from("ROLLBACK;")))
    }

    /// # Errors
    ///
    /// Fails when the dialect cannot change the isolation level with SQL.
    pub fn set_isolation_level(&self, level: IsolationLevel) -> Result<String> {
        self.ensure_supported(true, self.supports().isolation_levels, "Isolation levels")?;
        let scope = match self.dialect().kind() {
            DialectKind::MySql | DialectKind::MariaDb => "SET SESSION TRANSACTION",
            _ => "SET TRANSACTION",
        };
        Ok(self.finish(
            "setIsolationLevelQuery",
            format!("{scope} ISOLATION LEVEL {level};"),
        ))
    }

    /// # Errors
    ///
    /// Fails on dialects without savepoints.
    pub fn create_savepoint(&self, name: &str) -> Result<String> {
        self.ensure_supported(true, self.supports().savepoints, "Savepoints")?;
        Ok(self.finish(
            "createSavepointQuery",
            format!("SAVEPOINT {};", self.quote_identifier(name)),
        ))
    }

    /// # Errors
    ///
    /// Fails on dialects without savepoints.
    pub fn rollback_savepoint(&self, name: &str) -> Result<String> {
        self.ensure_supported(true, self.supports().savepoints, "Savepoints")?;
        Ok(self.finish(
            "rollbackSavepointQuery",
            format!("ROLLBACK TO SAVEPOINT {};", self.quote_identifier(name)),
        ))
    }

    /// # Errors
    ///
    /// Fails on dialects without a session switch for foreign key checks.
    pub fn toggle_foreign_key_checks(&self, enable: bool) -> Result<String> {
        let sql = self.dialect().toggle_foreign_key_checks(enable)?;
        Ok(self.finish("getToggleForeignKeyChecksQuery", sql))
    }

    /// Statement returning the server version.
    ///
    /// # Errors
    ///
    /// Fails when the dialect has no version query.
    pub fn version(&self) -> Result<String> {
        let sql = self.dialect().version()?;
        Ok(self.finish("versionQuery", sql))
    }

    fn ensure_transaction_statements(&self) -> Result<()> {
        let supports = self.supports();
        self.ensure_supported(true, supports.transactions, "Transactions")?;
        self.ensure_supported(
            true,
            !supports.connection_transaction_methods,
            "Transaction statements",
        )
    }
}
