//! MySQL dialect.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use serde_json::json;

use super::{
    check_data_type_support, json_path_string, mysql_style_limit_offset, Capabilities, Dialect,
    DialectKind,
};
use crate::bind::BindCollector;
use crate::error::Result;
use crate::expr::JsonPathSegment;
use crate::types::DataType;

pub(super) static CAPABILITIES: LazyLock<Capabilities> = LazyLock::new(|| {
    Capabilities::default()
        .extend(&json!({
            "VALUES ()": true,
            "schemas": true,
            "inserts": {
                "ignoreDuplicates": " IGNORE",
                "updateOnDuplicate": "onDuplicateKeyUpdate",
            },
            "index": {
                "collate": false,
                "length": true,
                "parser": true,
                "type": true,
                "using": 1,
            },
            "indexViaAlter": true,
            "lock": true,
            "skipLocked": true,
            "forShare": "LOCK IN SHARE MODE",
            "jsonOperations": true,
            "jsonExtraction": { "unquoted": true, "quoted": true },
            "limitOnUpdate": true,
            "dataTypes": { "json": true },
        }))
        .expect("mysql capability overrides match the capability schema")
});

/// MySQL dialect.
#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlDialect;

impl MySqlDialect {
    /// Creates a new MySQL dialect.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Dialect for MySqlDialect {
    fn kind(&self) -> DialectKind {
        DialectKind::MySql
    }

    fn supports(&self) -> &'static Capabilities {
        &CAPABILITIES
    }

    fn identifier_delimiters(&self) -> (char, char) {
        ('`', '`')
    }

    fn can_backslash_escape(&self) -> bool {
        true
    }

    fn escape_string(&self, value: &str) -> String {
        escape_mysql_string(value)
    }

    fn escape_datetime(&self, value: &DateTime<Utc>) -> String {
        self.escape_string(&value.format("%Y-%m-%d %H:%M:%S%.3f").to_string())
    }

    fn create_bind_collector(&self) -> BindCollector {
        BindCollector::unspecified_ordered("?")
    }

    fn data_type_sql(&self, data_type: &DataType) -> Result<String> {
        mysql_data_type(self, data_type)
    }

    fn auto_increment_column(&self, data_type: &DataType) -> Result<String> {
        Ok(format!("{} auto_increment", self.data_type_sql(data_type)?))
    }

    fn add_column_keyword(&self) -> &'static str {
        "ADD"
    }

    fn change_column(
        &self,
        quoted_table: &str,
        quoted_column: &str,
        type_sql: &str,
        allow_null: Option<bool>,
    ) -> Result<String> {
        Ok(mysql_change_column(quoted_table, quoted_column, type_sql, allow_null))
    }

    fn limit_offset(
        &self,
        limit: Option<u64>,
        offset: Option<u64>,
        _ordered: bool,
    ) -> Result<String> {
        Ok(mysql_style_limit_offset(limit, offset, "18446744073709551615"))
    }

    fn json_path_extraction(
        &self,
        sql: &str,
        path: &[JsonPathSegment],
        unquote: bool,
    ) -> Result<String> {
        Ok(mysql_json_path(self, sql, path, unquote))
    }

    fn unquote_json(&self, sql: &str) -> Result<String> {
        Ok(format!("json_unquote({sql})"))
    }

    fn truncate_table(
        &self,
        quoted_table: &str,
        _cascade: bool,
        _restart_identity: bool,
    ) -> Result<Vec<String>> {
        Ok(vec![format!("TRUNCATE {quoted_table}")])
    }

    fn table_exists(&self, table_literal: &str, schema_literal: Option<&str>) -> String {
        let schema = schema_literal.unwrap_or("DATABASE()");
        format!(
            "SELECT TABLE_NAME FROM INFORMATION_SCHEMA.TABLES WHERE TABLE_TYPE = 'BASE TABLE' AND TABLE_NAME = {table_literal} AND TABLE_SCHEMA = {schema}"
        )
    }

    fn toggle_foreign_key_checks(&self, enable: bool) -> Result<String> {
        Ok(format!("SET FOREIGN_KEY_CHECKS={}", u8::from(enable)))
    }

    fn version(&self) -> Result<String> {
        Ok(String::from("SELECT VERSION() as `version`"))
    }
}

/// Backslash-escapes control characters, quotes and the backslash itself.
pub(super) fn escape_mysql_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('\'');
    for c in value.chars() {
        match c {
            '\0' => out.push_str("\\0"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\u{8}' => out.push_str("\\b"),
            '\t' => out.push_str("\\t"),
            '\u{1a}' => out.push_str("\\Z"),
            '\'' | '\\' => {
                out.push('\\');
                out.push(c);
            }
            _ => out.push(c),
        }
    }
    out.push('\'');
    out
}

pub(super) fn mysql_data_type<D: Dialect + ?Sized>(
    dialect: &D,
    data_type: &DataType,
) -> Result<String> {
    check_data_type_support(dialect, data_type)?;
    Ok(match data_type {
        DataType::Boolean => String::from("TINYINT(1)"),
        DataType::DateTime => String::from("DATETIME(3)"),
        DataType::Uuid => String::from("CHAR(36) BINARY"),
        other => other.to_sql(),
    })
}

pub(super) fn mysql_change_column(
    quoted_table: &str,
    quoted_column: &str,
    type_sql: &str,
    allow_null: Option<bool>,
) -> String {
    let nullability = match allow_null {
        Some(true) => " NULL",
        Some(false) => " NOT NULL",
        None => "",
    };
    format!("ALTER TABLE {quoted_table} MODIFY {quoted_column} {type_sql}{nullability};")
}

pub(super) fn mysql_json_path<D: Dialect + ?Sized>(
    dialect: &D,
    sql: &str,
    path: &[JsonPathSegment],
    unquote: bool,
) -> String {
    let extracted = format!(
        "json_extract({sql},{})",
        dialect.escape_string(&json_path_string(path))
    );
    if unquote {
        format!("json_unquote({extracted})")
    } else {
        extracted
    }
}
