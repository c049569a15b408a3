//! IBM Db2 (LUW) dialect.

use std::sync::LazyLock;

use serde_json::json;

use super::{check_data_type_support, db2_style_limit_offset, Capabilities, Dialect, DialectKind};
use crate::bind::BindCollector;
use crate::error::Result;
use crate::types::DataType;

static CAPABILITIES: LazyLock<Capabilities> = LazyLock::new(|| {
    Capabilities::default()
        .extend(&json!({
            "schemas": true,
            "finalTable": true,
            "autoIncrement": { "defaultValue": false, "update": false },
            "constraints": {
                "onUpdate": false,
            },
            "index": { "collate": false, "using": 0, "include": true, "where": true },
            "lock": true,
            "dropTable": { "ifExists": false },
            "delete": { "limit": false },
        }))
        .expect("db2 capability overrides match the capability schema")
});

/// IBM Db2 dialect.
#[derive(Debug, Clone, Copy, Default)]
pub struct Db2Dialect;

impl Db2Dialect {
    /// Creates a new Db2 dialect.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Dialect for Db2Dialect {
    fn kind(&self) -> DialectKind {
        DialectKind::Db2
    }

    fn supports(&self) -> &'static Capabilities {
        &CAPABILITIES
    }

    fn escape_bytes(&self, bytes: &[u8]) -> String {
        format!("BLOB(X'{}')", hex::encode(bytes))
    }

    fn create_bind_collector(&self) -> BindCollector {
        BindCollector::unspecified_ordered("?")
    }

    fn data_type_sql(&self, data_type: &DataType) -> Result<String> {
        db2_data_type(self, data_type)
    }

    fn create_table_if_not_exists(&self, quoted_table: &str, body: &str) -> String {
        format!("CREATE TABLE {quoted_table} {body};")
    }

    fn add_column_keyword(&self) -> &'static str {
        "ADD"
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
        _cascade: bool,
        _restart_identity: bool,
    ) -> Result<Vec<String>> {
        Ok(vec![format!("TRUNCATE TABLE {quoted_table} IMMEDIATE")])
    }

    fn table_exists(&self, table_literal: &str, schema_literal: Option<&str>) -> String {
        let schema = schema_literal.unwrap_or("CURRENT SCHEMA");
        format!(
            "SELECT TABNAME FROM SYSCAT.TABLES WHERE TABNAME = {table_literal} AND TABSCHEMA = {schema}"
        )
    }

    fn version(&self) -> Result<String> {
        Ok(String::from(
            "select service_level as \"version\" from TABLE (sysproc.env_get_inst_info()) as A",
        ))
    }
}

pub(super) fn db2_data_type<D: Dialect + ?Sized>(
    dialect: &D,
    data_type: &DataType,
) -> Result<String> {
    check_data_type_support(dialect, data_type)?;
    Ok(match data_type {
        DataType::Text => String::from("CLOB(2147483647)"),
        DataType::Blob => String::from("BLOB(1M)"),
        DataType::DateTime => String::from("TIMESTAMP"),
        DataType::Double => String::from("DOUBLE"),
        DataType::Uuid => String::from("CHAR(36) FOR BIT DATA"),
        other => other.to_sql(),
    })
}
