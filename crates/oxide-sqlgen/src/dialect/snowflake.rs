//! Snowflake dialect.

use std::sync::LazyLock;

use serde_json::json;

use super::{check_data_type_support, Capabilities, Dialect, DialectKind};
use crate::bind::BindCollector;
use crate::error::Result;
use crate::types::DataType;

static CAPABILITIES: LazyLock<Capabilities> = LazyLock::new(|| {
    Capabilities::default()
        .extend(&json!({
            "VALUES ()": true,
            "schemas": true,
            "savepoints": false,
            "isolationLevels": false,
            "constraints": {
                "check": false,
                "deferrable": true,
            },
            "index": { "collate": false, "using": 0 },
            "createSchema": { "ifNotExists": true, "replace": true },
            "dropSchema": { "ifExists": true, "cascade": true },
            "dropTable": { "cascade": true },
            "delete": { "limit": false },
            "dataTypes": { "json": true, "arrays": false },
        }))
        .expect("snowflake capability overrides match the capability schema")
});

/// Snowflake dialect.
#[derive(Debug, Clone, Copy, Default)]
pub struct SnowflakeDialect;

impl SnowflakeDialect {
    /// Creates a new Snowflake dialect.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Dialect for SnowflakeDialect {
    fn kind(&self) -> DialectKind {
        DialectKind::Snowflake
    }

    fn supports(&self) -> &'static Capabilities {
        &CAPABILITIES
    }

    fn create_bind_collector(&self) -> BindCollector {
        BindCollector::unspecified_ordered("?")
    }

    fn default_schema(&self) -> &'static str {
        "PUBLIC"
    }

    fn data_type_sql(&self, data_type: &DataType) -> Result<String> {
        check_data_type_support(self, data_type)?;
        Ok(match data_type {
            DataType::Json => String::from("VARIANT"),
            DataType::DateTime => String::from("TIMESTAMP_TZ"),
            DataType::Blob => String::from("BINARY"),
            DataType::Uuid => String::from("VARCHAR(36)"),
            other => other.to_sql(),
        })
    }

    fn auto_increment_column(&self, data_type: &DataType) -> Result<String> {
        Ok(format!("{} AUTOINCREMENT", self.data_type_sql(data_type)?))
    }

    fn limit_offset(
        &self,
        limit: Option<u64>,
        offset: Option<u64>,
        _ordered: bool,
    ) -> Result<String> {
        let offset = offset.filter(|offset| *offset > 0);
        let mut fragments = Vec::new();
        match (limit, offset) {
            (Some(limit), _) => fragments.push(format!("LIMIT {limit}")),
            (None, Some(_)) => fragments.push(String::from("LIMIT NULL")),
            (None, None) => {}
        }
        if let Some(offset) = offset {
            fragments.push(format!("OFFSET {offset}"));
        }
        Ok(fragments.join(" "))
    }

    fn truncate_table(
        &self,
        quoted_table: &str,
        _cascade: bool,
        _restart_identity: bool,
    ) -> Result<Vec<String>> {
        Ok(vec![format!("TRUNCATE {quoted_table}")])
    }

    fn version(&self) -> Result<String> {
        Ok(String::from("SELECT CURRENT_VERSION() AS \"version\""))
    }
}
