//! Database dialects.
//!
//! A dialect is a strategy object: it owns a shared, immutable
//! [`Capabilities`] record and renders the handful of fragments whose syntax
//! differs between engines (quoting, scalar escaping, limits, JSON access).
//! Everything else is assembled by [`crate::QueryGenerator`] from these
//! building blocks.

mod capabilities;
mod cockroachdb;
mod db2;
mod ibmi;
mod mariadb;
mod mssql;
mod mysql;
mod oracle;
mod postgres;
mod snowflake;
mod sqlite;

use core::fmt;
use core::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

pub use capabilities::{
    AutoIncrementSupport, Capabilities, ConstraintSupport, CreateSchemaSupport,
    DataTypeSupport, DeleteSupport, DropOptionsSupport, IndexSupport, InsertSupport,
    JsonExtractionSupport, ReturnValues, StartTransactionSupport, TruncateSupport,
    UpsertStyle,
};
pub use cockroachdb::CockroachDbDialect;
pub use db2::Db2Dialect;
pub use ibmi::IbmiDialect;
pub use mariadb::MariaDbDialect;
pub use mssql::MsSqlDialect;
pub use mysql::MySqlDialect;
pub use oracle::OracleDialect;
pub use postgres::PostgresDialect;
pub use snowflake::SnowflakeDialect;
pub use sqlite::SqliteDialect;

use crate::bind::BindCollector;
use crate::error::{Result, SqlGenError};
use crate::expr::JsonPathSegment;
use crate::types::DataType;

/// The closed set of supported engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DialectKind {
    Postgres,
    #[serde(rename = "mysql")]
    MySql,
    #[serde(rename = "mariadb")]
    MariaDb,
    Sqlite,
    #[serde(rename = "mssql")]
    MsSql,
    Oracle,
    Db2,
    Ibmi,
    Snowflake,
    #[serde(rename = "cockroachdb")]
    CockroachDb,
}

impl DialectKind {
    /// All dialects, in a stable order.
    pub const ALL: [Self; 10] = [
        Self::Postgres,
        Self::MySql,
        Self::MariaDb,
        Self::Sqlite,
        Self::MsSql,
        Self::Oracle,
        Self::Db2,
        Self::Ibmi,
        Self::Snowflake,
        Self::CockroachDb,
    ];

    /// Returns the dialect name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Postgres => "postgres",
            Self::MySql => "mysql",
            Self::MariaDb => "mariadb",
            Self::Sqlite => "sqlite",
            Self::MsSql => "mssql",
            Self::Oracle => "oracle",
            Self::Db2 => "db2",
            Self::Ibmi => "ibmi",
            Self::Snowflake => "snowflake",
            Self::CockroachDb => "cockroachdb",
        }
    }

    /// Returns the shared dialect implementation.
    #[must_use]
    pub fn dialect(self) -> &'static dyn Dialect {
        match self {
            Self::Postgres => &PostgresDialect,
            Self::MySql => &MySqlDialect,
            Self::MariaDb => &MariaDbDialect,
            Self::Sqlite => &SqliteDialect,
            Self::MsSql => &MsSqlDialect,
            Self::Oracle => &OracleDialect,
            Self::Db2 => &Db2Dialect,
            Self::Ibmi => &IbmiDialect,
            Self::Snowflake => &SnowflakeDialect,
            Self::CockroachDb => &CockroachDbDialect,
        }
    }
}

impl fmt::Display for DialectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DialectKind {
    type Err = SqlGenError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| SqlGenError::validation(format!("Unknown dialect \"{s}\"")))
    }
}

/// Dialect-specific rendering.
///
/// Default methods implement ANSI behavior; optional hooks return
/// [`SqlGenError::NotImplemented`] until a dialect overrides them.
pub trait Dialect: Send + Sync + fmt::Debug {
    /// Returns the dialect tag.
    fn kind(&self) -> DialectKind;

    /// Returns the dialect name.
    fn name(&self) -> &'static str {
        self.kind().name()
    }

    /// Returns the capability record shared by every generator of this dialect.
    fn supports(&self) -> &'static Capabilities;

    /// Opening and closing identifier delimiters.
    fn identifier_delimiters(&self) -> (char, char) {
        ('"', '"')
    }

    /// Quotes an identifier, doubling the closing delimiter inside it.
    fn quote_identifier(&self, name: &str) -> String {
        let (left, right) = self.identifier_delimiters();
        let escaped = name.replace(right, &format!("{right}{right}"));
        format!("{left}{escaped}{right}")
    }

    /// Whether every `'...'` string in this dialect treats `\` as an escape.
    fn can_backslash_escape(&self) -> bool {
        false
    }

    /// Renders a string literal.
    fn escape_string(&self, value: &str) -> String {
        format!("'{}'", value.replace('\'', "''"))
    }

    /// Renders a binary literal.
    fn escape_bytes(&self, bytes: &[u8]) -> String {
        format!("X'{}'", hex::encode(bytes))
    }

    fn escape_bool(&self, value: bool) -> String {
        String::from(if value { "true" } else { "false" })
    }

    fn escape_datetime(&self, value: &DateTime<Utc>) -> String {
        self.escape_string(&value.format("%Y-%m-%d %H:%M:%S%.3f +00:00").to_string())
    }

    fn escape_date(&self, value: &NaiveDate) -> String {
        self.escape_string(&value.format("%Y-%m-%d").to_string())
    }

    /// Creates the placeholder allocator for one statement.
    fn create_bind_collector(&self) -> BindCollector;

    /// Schema that is implied when none is given. Empty when the dialect has none.
    fn default_schema(&self) -> &'static str {
        ""
    }

    /// Translates a logical type to this dialect's column type.
    ///
    /// # Errors
    ///
    /// Fails when the type needs a capability the dialect lacks.
    fn data_type_sql(&self, data_type: &DataType) -> Result<String> {
        check_data_type_support(self, data_type)?;
        Ok(data_type.to_sql())
    }

    /// Column type fragment for an auto-increment column.
    ///
    /// A fragment containing `PRIMARY KEY` makes the column its own
    /// primary key declaration.
    ///
    /// # Errors
    ///
    /// Propagates [`Dialect::data_type_sql`] errors.
    fn auto_increment_column(&self, data_type: &DataType) -> Result<String> {
        Ok(format!(
            "{} GENERATED BY DEFAULT AS IDENTITY",
            self.data_type_sql(data_type)?
        ))
    }

    /// Renders `CREATE TABLE` with an existence guard.
    fn create_table_if_not_exists(&self, quoted_table: &str, body: &str) -> String {
        format!("CREATE TABLE IF NOT EXISTS {quoted_table} {body};")
    }

    /// Keyword used by `ALTER TABLE ... ADD`.
    fn add_column_keyword(&self) -> &'static str {
        "ADD COLUMN"
    }

    /// Renders a column type/nullability change.
    ///
    /// # Errors
    ///
    /// Dialects that cannot alter columns in place return an error.
    fn change_column(
        &self,
        quoted_table: &str,
        quoted_column: &str,
        type_sql: &str,
        allow_null: Option<bool>,
    ) -> Result<String> {
        let mut parts = vec![format!("ALTER COLUMN {quoted_column} SET DATA TYPE {type_sql}")];
        match allow_null {
            Some(true) => parts.push(format!("ALTER COLUMN {quoted_column} DROP NOT NULL")),
            Some(false) => parts.push(format!("ALTER COLUMN {quoted_column} SET NOT NULL")),
            None => {}
        }
        Ok(format!("ALTER TABLE {quoted_table} {};", parts.join(", ")))
    }

    /// Renders the LIMIT/OFFSET clause. `ordered` tells whether the
    /// statement already has an ORDER BY.
    ///
    /// # Errors
    ///
    /// The base implementation is always an error.
    fn limit_offset(
        &self,
        _limit: Option<u64>,
        _offset: Option<u64>,
        _ordered: bool,
    ) -> Result<String> {
        Err(self.not_implemented("addLimitAndOffset"))
    }

    /// Renders JSON extraction of `path` from an already formatted expression.
    ///
    /// # Errors
    ///
    /// Dialects without JSON support return an error.
    fn json_path_extraction(
        &self,
        _sql: &str,
        _path: &[JsonPathSegment],
        _unquote: bool,
    ) -> Result<String> {
        Err(self.not_implemented("jsonPathExtractionQuery"))
    }

    /// Renders the JSON-unquoting function around a formatted expression.
    ///
    /// # Errors
    ///
    /// Dialects without JSON support return an error.
    fn unquote_json(&self, _sql: &str) -> Result<String> {
        Err(self.not_implemented("formatUnquoteJson"))
    }

    /// Function call producing a random UUID.
    ///
    /// # Errors
    ///
    /// Fails when UUID generation is not declared.
    fn uuid_v4_call(&self) -> Result<String> {
        if !self.supports().uuid_v4_generation {
            return Err(SqlGenError::unsupported(self.name(), "UUID V4 generation"));
        }
        Err(self.not_implemented("getUuidV4FunctionCall"))
    }

    /// Statements emptying a table.
    ///
    /// # Errors
    ///
    /// The base implementation is always an error.
    fn truncate_table(
        &self,
        _quoted_table: &str,
        _cascade: bool,
        _restart_identity: bool,
    ) -> Result<Vec<String>> {
        Err(self.not_implemented("truncateTableQuery"))
    }

    /// Existence probe. Arguments are already escaped string literals; a
    /// missing schema means the connection's current schema.
    fn table_exists(&self, table_literal: &str, schema_literal: Option<&str>) -> String {
        let schema = schema_literal.unwrap_or("CURRENT_SCHEMA");
        format!(
            "SELECT TABLE_NAME FROM INFORMATION_SCHEMA.TABLES WHERE TABLE_TYPE = 'BASE TABLE' AND TABLE_NAME = {table_literal} AND TABLE_SCHEMA = {schema}"
        )
    }

    /// # Errors
    ///
    /// Fails when foreign key checks cannot be toggled.
    fn toggle_foreign_key_checks(&self, _enable: bool) -> Result<String> {
        Err(SqlGenError::unsupported(
            self.name(),
            "Toggling foreign key checks",
        ))
    }

    /// # Errors
    ///
    /// The base implementation is always an error.
    fn version(&self) -> Result<String> {
        Err(self.not_implemented("versionQuery"))
    }

    /// Builds a [`SqlGenError::NotImplemented`] for this dialect.
    fn not_implemented(&self, method: &'static str) -> SqlGenError {
        SqlGenError::NotImplemented {
            method,
            dialect: self.name(),
        }
    }
}

/// Rejects types the dialect cannot store.
pub(crate) fn check_data_type_support<D: Dialect + ?Sized>(
    dialect: &D,
    data_type: &DataType,
) -> Result<()> {
    let types = &dialect.supports().data_types;
    let supported = match data_type {
        DataType::Json => types.json,
        DataType::Jsonb => types.jsonb,
        DataType::Array(inner) => {
            check_data_type_support(dialect, inner)?;
            types.arrays
        }
        _ => true,
    };
    if supported {
        Ok(())
    } else {
        Err(SqlGenError::unsupported(
            dialect.name(),
            format!("{} columns", data_type.to_sql()),
        ))
    }
}

/// `LIMIT m OFFSET n`, with `offset_only_limit` standing in for a missing limit.
pub(crate) fn mysql_style_limit_offset(
    limit: Option<u64>,
    offset: Option<u64>,
    offset_only_limit: &str,
) -> String {
    let offset = offset.filter(|offset| *offset > 0);
    let mut fragments = Vec::new();
    match (limit, offset) {
        (Some(limit), _) => fragments.push(format!("LIMIT {limit}")),
        (None, Some(_)) => fragments.push(format!("LIMIT {offset_only_limit}")),
        (None, None) => {}
    }
    if let Some(offset) = offset {
        fragments.push(format!("OFFSET {offset}"));
    }
    fragments.join(" ")
}

/// `OFFSET n ROWS FETCH NEXT m ROWS ONLY`.
pub(crate) fn db2_style_limit_offset(limit: Option<u64>, offset: Option<u64>) -> String {
    let mut fragments = Vec::new();
    if let Some(offset) = offset.filter(|offset| *offset > 0) {
        fragments.push(format!("OFFSET {offset} ROWS"));
    }
    if let Some(limit) = limit {
        fragments.push(format!("FETCH NEXT {limit} ROWS ONLY"));
    }
    fragments.join(" ")
}

/// Builds a `$.key[0]."odd key"` path for `json_extract`-style functions.
pub(crate) fn json_path_string(path: &[JsonPathSegment]) -> String {
    let mut out = String::from("$");
    for segment in path {
        match segment {
            JsonPathSegment::Index(index) => out.push_str(&format!("[{index}]")),
            JsonPathSegment::Key(key) if is_plain_identifier(key) => {
                out.push('.');
                out.push_str(key);
            }
            JsonPathSegment::Key(key) => {
                out.push_str(".\"");
                out.push_str(&key.replace('\\', "\\\\").replace('"', "\\\""));
                out.push('"');
            }
        }
    }
    out
}

/// `[A-Za-z_][A-Za-z0-9_]*`
pub(crate) fn is_plain_identifier(value: &str) -> bool {
    let mut chars = value.chars();
    chars
        .next()
        .is_some_and(|first| first.is_ascii_alphabetic() || first == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
