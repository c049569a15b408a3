//! MariaDB dialect.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use serde_json::json;

use super::mysql::{
    self, escape_mysql_string, mysql_change_column, mysql_data_type, mysql_json_path,
};
use super::{mysql_style_limit_offset, Capabilities, Dialect, DialectKind};
use crate::bind::BindCollector;
use crate::error::Result;
use crate::expr::JsonPathSegment;
use crate::types::DataType;

static CAPABILITIES: LazyLock<Capabilities> = LazyLock::new(|| {
    mysql::CAPABILITIES
        .extend(&json!({
            "returnValues": "returning",
            "uuidV4Generation": false,
        }))
        .expect("mariadb capability overrides match the capability schema")
});

/// MariaDB dialect.
#[derive(Debug, Clone, Copy, Default)]
pub struct MariaDbDialect;

impl MariaDbDialect {
    /// Creates a new MariaDB dialect.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Dialect for MariaDbDialect {
    fn kind(&self) -> DialectKind {
        DialectKind::MariaDb
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
