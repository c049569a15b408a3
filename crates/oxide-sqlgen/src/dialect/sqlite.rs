//! SQLite dialect.

use std::sync::LazyLock;

use serde_json::json;

use super::{json_path_string, mysql_style_limit_offset, Capabilities, Dialect, DialectKind};
use crate::bind::BindCollector;
use crate::error::{Result, SqlGenError};
use crate::expr::JsonPathSegment;
use crate::types::DataType;

static CAPABILITIES: LazyLock<Capabilities> = LazyLock::new(|| {
    Capabilities::default()
        .extend(&json!({
            "DEFAULT": false,
            "DEFAULT VALUES": true,
            "isolationLevels": false,
            "startTransaction": { "useBegin": true },
            "returnValues": "returning",
            "inserts": {
                "ignoreDuplicates": " OR IGNORE",
                "updateOnDuplicate": "onConflict",
                "onConflictWhere": true,
            },
            "constraints": { "add": false, "remove": false },
            "delete": { "limit": false },
            "index": { "using": 0, "where": true },
            "jsonOperations": true,
            "jsonExtraction": { "unquoted": true, "quoted": true },
            "dataTypes": { "json": true },
        }))
        .expect("sqlite capability overrides match the capability schema")
});

/// SQLite dialect.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteDialect;

impl SqliteDialect {
    /// Creates a new SQLite dialect.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Dialect for SqliteDialect {
    fn kind(&self) -> DialectKind {
        DialectKind::Sqlite
    }

    fn supports(&self) -> &'static Capabilities {
        &CAPABILITIES
    }

    fn identifier_delimiters(&self) -> (char, char) {
        ('`', '`')
    }

    fn escape_bool(&self, value: bool) -> String {
        String::from(if value { "1" } else { "0" })
    }

    fn create_bind_collector(&self) -> BindCollector {
        BindCollector::named("$")
    }

    fn data_type_sql(&self, data_type: &DataType) -> Result<String> {
        super::check_data_type_support(self, data_type)?;
        Ok(match data_type {
            DataType::Boolean => String::from("TINYINT(1)"),
            DataType::DateTime => String::from("DATETIME"),
            DataType::Uuid => String::from("TEXT"),
            DataType::Double => String::from("DOUBLE PRECISION"),
            other => other.to_sql(),
        })
    }

    fn auto_increment_column(&self, _data_type: &DataType) -> Result<String> {
        Ok(String::from("INTEGER PRIMARY KEY AUTOINCREMENT"))
    }

    fn change_column(
        &self,
        _quoted_table: &str,
        _quoted_column: &str,
        _type_sql: &str,
        _allow_null: Option<bool>,
    ) -> Result<String> {
        Err(SqlGenError::unsupported(self.name(), "In-place column changes"))
    }

    fn limit_offset(
        &self,
        limit: Option<u64>,
        offset: Option<u64>,
        _ordered: bool,
    ) -> Result<String> {
        Ok(mysql_style_limit_offset(limit, offset, "-1"))
    }

    fn json_path_extraction(
        &self,
        sql: &str,
        path: &[JsonPathSegment],
        unquote: bool,
    ) -> Result<String> {
        let extracted = format!(
            "json_extract({sql},{})",
            self.escape_string(&json_path_string(path))
        );
        if unquote {
            Ok(extracted)
        } else {
            Ok(format!("json_quote({extracted})"))
        }
    }

    fn unquote_json(&self, sql: &str) -> Result<String> {
        Ok(format!("json_extract({sql},'$')"))
    }

    fn truncate_table(
        &self,
        quoted_table: &str,
        _cascade: bool,
        restart_identity: bool,
    ) -> Result<Vec<String>> {
        let mut statements = vec![format!("DELETE FROM {quoted_table}")];
        if restart_identity {
            let table_name = quoted_table.trim_matches('`').replace("``", "`");
            statements.push(format!(
                "DELETE FROM `sqlite_sequence` WHERE `name` = {}",
                self.escape_string(&table_name)
            ));
        }
        Ok(statements)
    }

    fn table_exists(&self, table_literal: &str, _schema_literal: Option<&str>) -> String {
        format!("SELECT name FROM sqlite_master WHERE type = 'table' AND name = {table_literal}")
    }

    fn toggle_foreign_key_checks(&self, enable: bool) -> Result<String> {
        Ok(format!(
            "PRAGMA foreign_keys = {}",
            if enable { "ON" } else { "OFF" }
        ))
    }

    fn version(&self) -> Result<String> {
        Ok(String::from("SELECT sqlite_version() as `version`"))
    }
}
