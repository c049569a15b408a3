//! Microsoft SQL Server dialect.

use std::sync::LazyLock;

use serde_json::json;

use super::{check_data_type_support, json_path_string, Capabilities, Dialect, DialectKind};
use crate::bind::BindCollector;
use crate::error::{Result, SqlGenError};
use crate::expr::JsonPathSegment;
use crate::types::DataType;

static CAPABILITIES: LazyLock<Capabilities> = LazyLock::new(|| {
    Capabilities::default()
        .extend(&json!({
            "DEFAULT VALUES": true,
            "schemas": true,
            "connectionTransactionMethods": true,
            "savepoints": false,
            "returnValues": "output",
            "autoIncrement": {
                "identityInsert": true,
                "defaultValue": false,
                "update": false,
            },
            "constraints": {
                "restrict": false,
                "default": true,
            },
            "index": { "collate": false, "using": 0, "include": true, "where": true },
            "jsonOperations": true,
            "jsonExtraction": { "unquoted": true, "quoted": false },
            "uuidV4Generation": true,
            "removeColumn": { "ifExists": true },
            "dropSchema": { "ifExists": false },
            "delete": { "limit": false },
            "dataTypes": { "uuid": true },
        }))
        .expect("mssql capability overrides match the capability schema")
});

/// Microsoft SQL Server dialect.
#[derive(Debug, Clone, Copy, Default)]
pub struct MsSqlDialect;

impl MsSqlDialect {
    /// Creates a new SQL Server dialect.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Dialect for MsSqlDialect {
    fn kind(&self) -> DialectKind {
        DialectKind::MsSql
    }

    fn supports(&self) -> &'static Capabilities {
        &CAPABILITIES
    }

    fn identifier_delimiters(&self) -> (char, char) {
        ('[', ']')
    }

    /// Strings are always national (`N'...'`).
    fn escape_string(&self, value: &str) -> String {
        format!("N'{}'", value.replace('\'', "''"))
    }

    fn escape_bytes(&self, bytes: &[u8]) -> String {
        format!("0x{}", hex::encode(bytes))
    }

    fn escape_bool(&self, value: bool) -> String {
        String::from(if value { "1" } else { "0" })
    }

    fn create_bind_collector(&self) -> BindCollector {
        BindCollector::named("@")
    }

    fn default_schema(&self) -> &'static str {
        "dbo"
    }

    fn data_type_sql(&self, data_type: &DataType) -> Result<String> {
        check_data_type_support(self, data_type)?;
        Ok(match data_type {
            DataType::Text => String::from("NVARCHAR(MAX)"),
            DataType::Varchar(len) => format!("NVARCHAR({})", len.unwrap_or(255)),
            DataType::Boolean => String::from("BIT"),
            DataType::DateTime => String::from("DATETIMEOFFSET"),
            DataType::Blob => String::from("VARBINARY(MAX)"),
            DataType::Uuid => String::from("UNIQUEIDENTIFIER"),
            DataType::Double => String::from("FLOAT"),
            other => other.to_sql(),
        })
    }

    fn auto_increment_column(&self, data_type: &DataType) -> Result<String> {
        Ok(format!("{} IDENTITY(1,1)", self.data_type_sql(data_type)?))
    }

    fn create_table_if_not_exists(&self, quoted_table: &str, body: &str) -> String {
        format!(
            "IF OBJECT_ID({}, 'U') IS NULL CREATE TABLE {quoted_table} {body};",
            self.escape_string(quoted_table)
        )
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
        let nullability = match allow_null {
            Some(true) => " NULL",
            Some(false) => " NOT NULL",
            None => "",
        };
        Ok(format!(
            "ALTER TABLE {quoted_table} ALTER COLUMN {quoted_column} {type_sql}{nullability};"
        ))
    }

    /// OFFSET/FETCH is only valid after ORDER BY.
    fn limit_offset(
        &self,
        limit: Option<u64>,
        offset: Option<u64>,
        ordered: bool,
    ) -> Result<String> {
        if limit.is_none() && offset.is_none() {
            return Ok(String::new());
        }
        let mut fragments = Vec::new();
        if !ordered {
            fragments.push(String::from("ORDER BY (SELECT NULL)"));
        }
        fragments.push(format!("OFFSET {} ROWS", offset.unwrap_or(0)));
        if let Some(limit) = limit {
            fragments.push(format!("FETCH NEXT {limit} ROWS ONLY"));
        }
        Ok(fragments.join(" "))
    }

    fn json_path_extraction(
        &self,
        sql: &str,
        path: &[JsonPathSegment],
        unquote: bool,
    ) -> Result<String> {
        if !unquote {
            return Err(SqlGenError::unsupported(self.name(), "Quoted JSON extractions"));
        }
        Ok(format!(
            "JSON_VALUE({sql}, {})",
            self.escape_string(&json_path_string(path))
        ))
    }

    fn unquote_json(&self, sql: &str) -> Result<String> {
        Ok(format!("JSON_VALUE({sql}, N'$')"))
    }

    fn uuid_v4_call(&self) -> Result<String> {
        Ok(String::from("NEWID()"))
    }

    fn truncate_table(
        &self,
        quoted_table: &str,
        _cascade: bool,
        _restart_identity: bool,
    ) -> Result<Vec<String>> {
        Ok(vec![format!("TRUNCATE TABLE {quoted_table}")])
    }

    fn toggle_foreign_key_checks(&self, enable: bool) -> Result<String> {
        Ok(format!(
            "EXEC sp_msforeachtable \"ALTER TABLE ? {} CONSTRAINT all\"",
            if enable { "WITH CHECK CHECK" } else { "NOCHECK" }
        ))
    }

    fn version(&self) -> Result<String> {
        Ok(String::from(
            "SELECT CAST(SERVERPROPERTY('ProductVersion') AS NVARCHAR(128)) AS [version]",
        ))
    }
}
