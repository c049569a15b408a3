//! Oracle dialect.

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, Utc};
use serde_json::json;

use super::{check_data_type_support, db2_style_limit_offset, Capabilities, Dialect, DialectKind};
use crate::bind::BindCollector;
use crate::error::Result;
use crate::types::DataType;

static CAPABILITIES: LazyLock<Capabilities> = LazyLock::new(|| {
    Capabilities::default()
        .extend(&json!({
            "schemas": true,
            "connectionTransactionMethods": true,
            "constraints": {
                "restrict": false,
                "onUpdate": false,
                "deferrable": true,
            },
            "index": { "collate": false, "using": 0 },
            "lock": true,
            "lockOf": true,
            "skipLocked": true,
            "dropTable": { "ifExists": false, "cascade": true },
            "delete": { "limit": false },
        }))
        .expect("oracle capability overrides match the capability schema")
});

/// Oracle dialect.
#[derive(Debug, Clone, Copy, Default)]
pub struct OracleDialect;

impl OracleDialect {
    /// Creates a new Oracle dialect.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Dialect for OracleDialect {
    fn kind(&self) -> DialectKind {
        DialectKind::Oracle
    }

    fn supports(&self) -> &'static Capabilities {
        &CAPABILITIES
    }

    fn escape_bool(&self, value: bool) -> String {
        String::from(if value { "1" } else { "0" })
    }

    fn escape_datetime(&self, value: &DateTime<Utc>) -> String {
        format!(
            "TO_TIMESTAMP_TZ({}, 'YYYY-MM-DD HH24:MI:SS.FF3 TZH:TZM')",
            self.escape_string(&value.format("%Y-%m-%d %H:%M:%S%.3f +00:00").to_string())
        )
    }

    fn escape_date(&self, value: &NaiveDate) -> String {
        format!(
            "TO_DATE({}, 'YYYY-MM-DD')",
            self.escape_string(&value.format("%Y-%m-%d").to_string())
        )
    }

    fn create_bind_collector(&self) -> BindCollector {
        BindCollector::named(":")
    }

    fn data_type_sql(&self, data_type: &DataType) -> Result<String> {
        check_data_type_support(self, data_type)?;
        Ok(match data_type {
            DataType::Text => String::from("CLOB"),
            DataType::Varchar(len) => format!("VARCHAR2({})", len.unwrap_or(255)),
            DataType::Integer => String::from("INTEGER"),
            DataType::Bigint => String::from("NUMBER(19)"),
            DataType::Boolean => String::from("CHAR(1)"),
            DataType::DateTime => String::from("TIMESTAMP WITH LOCAL TIME ZONE"),
            DataType::Uuid => String::from("VARCHAR2(36)"),
            other => other.to_sql(),
        })
    }

    fn create_table_if_not_exists(&self, quoted_table: &str, body: &str) -> String {
        format!("CREATE TABLE {quoted_table} {body}")
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
            "ALTER TABLE {quoted_table} MODIFY {quoted_column} {type_sql}{nullability}"
        ))
    }

    fn limit_offset(
        &self,
        limit: Option<u64>,
        offset: Option<u64>,
        _ordered: bool,
    ) -> Result<String> {
        Ok(db2_style_limit_offset(limit, offset))
    }

    fn truncate_table(
        &self,
        quoted_table: &str,
        cascade: bool,
        _restart_identity: bool,
    ) -> Result<Vec<String>> {
        let mut sql = format!("TRUNCATE TABLE {quoted_table}");
        if cascade {
            sql.push_str(" CASCADE");
        }
        Ok(vec![sql])
    }

    fn table_exists(&self, table_literal: &str, schema_literal: Option<&str>) -> String {
        let schema = schema_literal.unwrap_or("USER");
        format!("SELECT TABLE_NAME FROM ALL_TABLES WHERE TABLE_NAME = {table_literal} AND OWNER = {schema}")
    }

    fn version(&self) -> Result<String> {
        Ok(String::from(
            "SELECT VERSION_FULL FROM PRODUCT_COMPONENT_VERSION WHERE PRODUCT LIKE 'Oracle%'",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dates_use_conversion_functions() {
        let date = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        assert_eq!(
            OracleDialect::new().escape_date(&date),
            "TO_DATE('2024-02-29', 'YYYY-MM-DD')"
        );
    }
}
