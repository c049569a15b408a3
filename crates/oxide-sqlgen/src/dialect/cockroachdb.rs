//! CockroachDB dialect.
//!
//! Wire compatible with PostgreSQL; its record is derived from the Postgres
//! one rather than from the universal default.

use std::sync::LazyLock;

use serde_json::json;

use super::postgres::{self, postgres_data_type, postgres_json_path, postgres_limit_offset};
use super::{Capabilities, Dialect, DialectKind};
use crate::bind::BindCollector;
use crate::error::Result;
use crate::expr::JsonPathSegment;
use crate::types::DataType;

static CAPABILITIES: LazyLock<Capabilities> = LazyLock::new(|| {
    postgres::CAPABILITIES
        .extend(&json!({
            "constraints": { "deferrable": false },
            "lockKey": false,
            "index": { "concurrently": false, "operator": false },
            "truncate": { "restartIdentity": false },
        }))
        .expect("cockroachdb capability overrides match the capability schema")
});

/// CockroachDB dialect.
#[derive(Debug, Clone, Copy, Default)]
pub struct CockroachDbDialect;

impl CockroachDbDialect {
    /// Creates a new CockroachDB dialect.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Dialect for CockroachDbDialect {
    fn kind(&self) -> DialectKind {
        DialectKind::CockroachDb
    }

    fn supports(&self) -> &'static Capabilities {
        &CAPABILITIES
    }

    fn escape_bytes(&self, bytes: &[u8]) -> String {
        format!("'\\x{}'", hex::encode(bytes))
    }

    fn create_bind_collector(&self) -> BindCollector {
        BindCollector::specified_ordered("$")
    }

    fn default_schema(&self) -> &'static str {
        "public"
    }

    fn data_type_sql(&self, data_type: &DataType) -> Result<String> {
        postgres_data_type(self, data_type)
    }

    fn auto_increment_column(&self, data_type: &DataType) -> Result<String> {
        Ok(format!("{} DEFAULT unique_rowid()", self.data_type_sql(data_type)?))
    }

    fn limit_offset(
        &self,
        limit: Option<u64>,
        offset: Option<u64>,
        _ordered: bool,
    ) -> Result<String> {
        Ok(postgres_limit_offset(limit, offset))
    }

    fn json_path_extraction(
        &self,
        sql: &str,
        path: &[JsonPathSegment],
        unquote: bool,
    ) -> Result<String> {
        Ok(postgres_json_path(self, sql, path, unquote))
    }

    fn unquote_json(&self, sql: &str) -> Result<String> {
        Ok(format!("{sql}#>>ARRAY[]::TEXT[]"))
    }

    fn uuid_v4_call(&self) -> Result<String> {
        Ok(String::from("gen_random_uuid()"))
    }

    fn truncate_table(
        &self,
        quoted_table: &str,
        cascade: bool,
        _restart_identity: bool,
    ) -> Result<Vec<String>> {
        let mut sql = format!("TRUNCATE {quoted_table}");
        if cascade {
            sql.push_str(" CASCADE");
        }
        Ok(vec![sql])
    }

    fn version(&self) -> Result<String> {
        Ok(String::from("SELECT version()"))
    }
}
