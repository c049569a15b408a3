//! IBM i (Db2 for i) dialect.

use std::sync::LazyLock;

use serde_json::json;

use super::db2::db2_data_type;
use super::{db2_style_limit_offset, Capabilities, Dialect, DialectKind};
use crate::bind::BindCollector;
use crate::error::Result;
use crate::types::DataType;

static CAPABILITIES: LazyLock<Capabilities> = LazyLock::new(|| {
    Capabilities::default()
        .extend(&json!({
            "schemas": true,
            "connectionTransactionMethods": true,
            "autoIncrement": { "defaultValue": false, "update": false },
            "constraints": {
                "onUpdate": false,
            },
            "index": { "collate": false, "using": 0, "where": true },
            "dropTable": { "ifExists": false },
            "delete": { "limit": false },
        }))
        .expect("ibmi capability overrides match the capability schema")
});

/// IBM i dialect.
#[derive(Debug, Clone, Copy, Default)]
pub struct IbmiDialect;

impl IbmiDialect {
    /// Creates a new IBM i dialect.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Dialect for IbmiDialect {
    fn kind(&self) -> DialectKind {
        DialectKind::Ibmi
    }

    fn supports(&self) -> &'static Capabilities {
        &CAPABILITIES
    }

    /// The hex literal is a character string on IBM i; it has to be cast.
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
        format!("CREATE TABLE {quoted_table} {body}")
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
            "SELECT TABLE_NAME FROM QSYS2.SYSTABLES WHERE TABLE_NAME = {table_literal} AND TABLE_SCHEMA = {schema}"
        )
    }

    fn version(&self) -> Result<String> {
        Ok(String::from(
            "SELECT CONCAT(OS_VERSION, CONCAT('.', OS_RELEASE)) AS \"version\" FROM SYSIBMADM.ENV_SYS_INFO",
        ))
    }
}
