//! Statement assembly.
//!
//! [`QueryGenerator`] pairs a [`Dialect`] with [`GeneratorOptions`]. Each
//! statement is built as a list of fragments joined by
//! [`join_sql_fragments`], so optional clauses vanish without leaving stray
//! whitespace.

mod constraint;
mod ddl;
mod dml;
mod select;
mod transaction;
mod where_clause;

use serde::{Deserialize, Serialize};
use tracing::trace;

pub use constraint::{ConstraintChecking, ConstraintReferences, ConstraintSpec, ConstraintType};
pub use ddl::{
    CreateSchemaOptions, CreateTableOptions, DropSchemaOptions, DropTableOptions, IndexOptions,
    RemoveColumnOptions, RemoveConstraintOptions, RemoveIndexOptions, RenameTableOptions,
    TruncateOptions,
};
pub use dml::{
    select_upsert_keys, BulkDeleteOptions, BulkInsertOptions, InsertOptions, Returning,
    SqlWithBind, UpdateOptions, UpsertOptions,
};
pub use select::{Join, JoinKind, Lock, LockStrength, OrderBy, SelectColumn, SelectOptions};
pub use transaction::{IsolationLevel, StartTransactionOptions};

use crate::dialect::{Capabilities, Dialect, DialectKind};
use crate::error::{Result, SqlGenError};
use crate::model::TableIdentifier;

/// Generator-wide settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorOptions {
    /// Drop `NULL` values from INSERT and UPDATE column lists.
    pub omit_null: bool,
    /// When `false`, lowercase plain identifiers are emitted unquoted.
    pub quote_identifiers: bool,
    /// Prefix of generated bind parameter names. Callers may not use it.
    pub bind_prefix: String,
    pub minify_aliases: bool,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        Self {
            omit_null: false,
            quote_identifiers: true,
            bind_prefix: String::from("oxide_"),
            minify_aliases: false,
        }
    }
}

/// Builds dialect-correct SQL.
///
/// The generator holds no mutable state: concurrent calls on one instance
/// are independent.
///
/// # Example
///
/// ```
/// use oxide_sqlgen::{DialectKind, QueryGenerator};
///
/// let generator = QueryGenerator::for_kind(DialectKind::Postgres);
/// assert_eq!(generator.quote_identifier("users"), "\"users\"");
/// ```
#[derive(Debug, Clone)]
pub struct QueryGenerator {
    dialect: &'static dyn Dialect,
    options: GeneratorOptions,
}

impl QueryGenerator {
    #[must_use]
    pub fn new(dialect: &'static dyn Dialect) -> Self {
        Self::with_options(dialect, GeneratorOptions::default())
    }

    #[must_use]
    pub const fn with_options(dialect: &'static dyn Dialect, options: GeneratorOptions) -> Self {
        Self { dialect, options }
    }

    #[must_use]
    pub fn for_kind(kind: DialectKind) -> Self {
        Self::new(kind.dialect())
    }

    #[must_use]
    pub fn dialect(&self) -> &'static dyn Dialect {
        self.dialect
    }

    #[must_use]
    pub const fn options(&self) -> &GeneratorOptions {
        &self.options
    }

    pub(crate) fn supports(&self) -> &'static Capabilities {
        self.dialect.supports()
    }

    pub(crate) fn unsupported(&self, feature: impl Into<String>) -> SqlGenError {
        SqlGenError::unsupported(self.dialect.name(), feature)
    }

    /// Logs a finished statement and hands it back.
    pub(crate) fn finish(&self, statement: &'static str, sql: String) -> String {
        trace!(dialect = self.dialect.name(), statement, sql = %sql, "Generated SQL");
        sql
    }

    /// Rejects an option the caller set when the dialect cannot honor it.
    pub(crate) fn ensure_supported(
        &self,
        requested: bool,
        supported: bool,
        feature: &str,
    ) -> Result<()> {
        if requested && !supported {
            return Err(self.unsupported(feature));
        }
        Ok(())
    }

    /// Quotes an identifier with the dialect's delimiters.
    #[must_use]
    pub fn quote_identifier(&self, name: &str) -> String {
        if !self.options.quote_identifiers
            && !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
            && !name.starts_with(|c: char| c.is_ascii_digit())
        {
            return name.to_string();
        }
        self.dialect.quote_identifier(name)
    }

    /// Fills in the dialect's default schema and delimiter.
    ///
    /// Already extracted identifiers come back unchanged.
    #[must_use]
    pub fn extract_table_details(&self, table: impl Into<TableIdentifier>) -> TableIdentifier {
        let mut table = table.into();
        if table.schema.as_deref().is_none_or(str::is_empty) {
            let default_schema = self.dialect.default_schema();
            table.schema = (!default_schema.is_empty()).then(|| default_schema.to_string());
        }
        if table.delimiter.is_none() {
            table.delimiter = Some(String::from("."));
        }
        table
    }

    /// Quotes a table reference, omitting the default schema.
    ///
    /// Dialects without schemas get a single identifier made of the schema,
    /// the delimiter and the table name.
    #[must_use]
    pub fn quote_table(&self, table: &TableIdentifier, alias: Option<&str>) -> String {
        let schema = table
            .schema
            .as_deref()
            .filter(|schema| !schema.is_empty() && *schema != self.dialect.default_schema());

        let mut sql = match schema {
            Some(schema) if self.supports().schemas => format!(
                "{}.{}",
                self.quote_identifier(schema),
                self.quote_identifier(&table.table_name)
            ),
            Some(schema) => {
                let delimiter = table.delimiter.as_deref().unwrap_or(".");
                self.quote_identifier(&format!("{schema}{delimiter}{}", table.table_name))
            }
            None => self.quote_identifier(&table.table_name),
        };

        if let Some(alias) = alias {
            sql.push_str(" AS ");
            sql.push_str(&self.quote_identifier(alias));
        }
        sql
    }
}

/// Joins SQL fragments with single spaces, skipping empty ones.
///
/// Fragments starting with `,` or `;` attach to the previous one.
pub fn join_sql_fragments<I, S>(fragments: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut sql = String::new();
    for fragment in fragments {
        let fragment = fragment.as_ref().trim();
        if fragment.is_empty() {
            continue;
        }
        if !sql.is_empty() && !fragment.starts_with([',', ';']) {
            sql.push(' ');
        }
        sql.push_str(fragment);
    }
    sql
}
