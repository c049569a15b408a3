//! PostgreSQL dialect.

use std::sync::LazyLock;

use serde_json::json;

use super::{check_data_type_support, Capabilities, Dialect, DialectKind};
use crate::bind::BindCollector;
use crate::error::Result;
use crate::expr::JsonPathSegment;
use crate::types::DataType;

pub(super) static CAPABILITIES: LazyLock<Capabilities> = LazyLock::new(|| {
    Capabilities::default()
        .extend(&json!({
            "DEFAULT VALUES": true,
            "bulkDefault": true,
            "schemas": true,
            "returnValues": "returning",
            "startTransaction": { "readOnly": true },
            "inserts": {
                "updateOnDuplicate": "onConflict",
                "onConflictDoNothing": " ON CONFLICT DO NOTHING",
                "onConflictWhere": true,
            },
            "constraints": {
                "deferrable": true,
                "removeOptions": { "ifExists": true, "cascade": true },
            },
            "index": {
                "concurrently": true,
                "using": 2,
                "include": true,
                "operator": true,
                "where": true,
            },
            "lock": true,
            "lockOf": true,
            "lockKey": true,
            "skipLocked": true,
            "forShare": "FOR SHARE",
            "escapeStringConstants": true,
            "jsonOperations": true,
            "jsonExtraction": { "unquoted": true, "quoted": true },
            "uuidV4Generation": true,
            "removeColumn": { "ifExists": true, "cascade": true },
            "dropTable": { "cascade": true },
            "dropSchema": { "ifExists": true, "cascade": true },
            "createSchema": { "ifNotExists": true, "authorization": true },
            "delete": { "limit": false },
            "truncate": { "cascade": true, "restartIdentity": true },
            "dataTypes": { "json": true, "jsonb": true, "arrays": true, "uuid": true },
        }))
        .expect("postgres capability overrides match the capability schema")
});

/// PostgreSQL dialect.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresDialect;

impl PostgresDialect {
    /// Creates a new PostgreSQL dialect.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Dialect for PostgresDialect {
    fn kind(&self) -> DialectKind {
        DialectKind::Postgres
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
        Ok(match data_type {
            DataType::Smallint => String::from("SMALLSERIAL"),
            DataType::Bigint => String::from("BIGSERIAL"),
            _ => String::from("SERIAL"),
        })
    }

    fn change_column(
        &self,
        quoted_table: &str,
        quoted_column: &str,
        type_sql: &str,
        allow_null: Option<bool>,
    ) -> Result<String> {
        let mut parts = vec![format!(
            "ALTER COLUMN {quoted_column} TYPE {type_sql} USING ({quoted_column}::{type_sql})"
        )];
        match allow_null {
            Some(true) => parts.push(format!("ALTER COLUMN {quoted_column} DROP NOT NULL")),
            Some(false) => parts.push(format!("ALTER COLUMN {quoted_column} SET NOT NULL")),
            None => {}
        }
        Ok(format!("ALTER TABLE {quoted_table} {};", parts.join(", ")))
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
        restart_identity: bool,
    ) -> Result<Vec<String>> {
        let mut sql = format!("TRUNCATE {quoted_table}");
        if restart_identity {
            sql.push_str(" RESTART IDENTITY");
        }
        if cascade {
            sql.push_str(" CASCADE");
        }
        Ok(vec![sql])
    }

    fn table_exists(&self, table_literal: &str, schema_literal: Option<&str>) -> String {
        let schema = schema_literal.unwrap_or("'public'");
        format!(
            "SELECT table_name FROM information_schema.tables WHERE table_schema = {schema} AND table_name = {table_literal}"
        )
    }

    fn version(&self) -> Result<String> {
        Ok(String::from("SHOW SERVER_VERSION"))
    }
}

pub(super) fn postgres_data_type<D: Dialect + ?Sized>(
    dialect: &D,
    data_type: &DataType,
) -> Result<String> {
    check_data_type_support(dialect, data_type)?;
    Ok(match data_type {
        DataType::Blob => String::from("BYTEA"),
        DataType::Array(inner) => format!("{}[]", postgres_data_type(dialect, inner)?),
        other => other.to_sql(),
    })
}

pub(super) fn postgres_limit_offset(limit: Option<u64>, offset: Option<u64>) -> String {
    let mut fragments = Vec::new();
    if let Some(limit) = limit {
        fragments.push(format!("LIMIT {limit}"));
    }
    if let Some(offset) = offset.filter(|offset| *offset > 0) {
        fragments.push(format!("OFFSET {offset}"));
    }
    fragments.join(" ")
}

/// `->`/`->>` for a single step, `#>`/`#>>` with a path array otherwise.
pub(super) fn postgres_json_path<D: Dialect + ?Sized>(
    dialect: &D,
    sql: &str,
    path: &[JsonPathSegment],
    unquote: bool,
) -> String {
    let segment = |segment: &JsonPathSegment| match segment {
        JsonPathSegment::Key(key) => dialect.escape_string(key),
        JsonPathSegment::Index(index) => index.to_string(),
    };

    if let [single] = path {
        let operator = if unquote { "->>" } else { "->" };
        return format!("({sql}{operator}{})", segment(single));
    }

    let operator = if unquote { "#>>" } else { "#>" };
    let steps: Vec<String> = path
        .iter()
        .map(|step| match step {
            JsonPathSegment::Key(key) => dialect.escape_string(key),
            JsonPathSegment::Index(index) => dialect.escape_string(&index.to_string()),
        })
        .collect();
    format!("({sql}{operator}ARRAY[{}]::VARCHAR(255)[])", steps.join(","))
}
