//! Per-dialect feature flags.
//!
//! Every dialect derives its record from [`Capabilities::default`] through
//! [`Capabilities::extend`], which deep-merges a JSON override object onto a
//! copy of the receiver. Records are built once and shared read-only.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;

/// How a dialect reports rows touched by INSERT/UPDATE.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReturnValues {
    /// No way to return rows.
    None,
    /// `RETURNING col, ...`
    Returning,
    /// `OUTPUT INSERTED.col, ...`
    Output,
}

/// Conflict handling syntax for upserts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UpsertStyle {
    /// Upserts are not expressible in one statement.
    None,
    /// `ON CONFLICT (keys) DO UPDATE SET col=EXCLUDED.col`
    OnConflict,
    /// `ON DUPLICATE KEY UPDATE col=VALUES(col)`
    OnDuplicateKeyUpdate,
}

/// The complete capability record of a dialect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
#[allow(clippy::struct_excessive_bools)]
pub struct Capabilities {
    /// The `DEFAULT` keyword is accepted as a value.
    #[serde(rename = "DEFAULT")]
    pub default_keyword: bool,
    /// `INSERT INTO t DEFAULT VALUES` is accepted.
    #[serde(rename = "DEFAULT VALUES")]
    pub default_values: bool,
    /// `INSERT INTO t VALUES ()` is accepted.
    #[serde(rename = "VALUES ()")]
    pub empty_values: bool,
    /// `DEFAULT` can be used inside multi-row inserts.
    pub bulk_default: bool,
    pub schemas: bool,
    pub transactions: bool,
    pub savepoints: bool,
    pub isolation_levels: bool,
    /// Transactions are driven through driver calls rather than SQL.
    pub connection_transaction_methods: bool,
    pub start_transaction: StartTransactionSupport,
    pub return_values: ReturnValues,
    /// `SELECT * FROM FINAL TABLE (INSERT ...)`
    pub final_table: bool,
    pub auto_increment: AutoIncrementSupport,
    pub inserts: InsertSupport,
    pub constraints: ConstraintSupport,
    pub index: IndexSupport,
    /// Indexes are created with `ALTER TABLE ... ADD INDEX`.
    pub index_via_alter: bool,
    pub lock: bool,
    pub lock_of: bool,
    pub lock_key: bool,
    pub skip_locked: bool,
    /// Clause used for shared locks, when any.
    pub for_share: Option<String>,
    /// Postgres `E'...'` strings.
    pub escape_string_constants: bool,
    pub json_operations: bool,
    pub json_extraction: JsonExtractionSupport,
    pub uuid_v4_generation: bool,
    pub remove_column: DropOptionsSupport,
    pub drop_table: DropOptionsSupport,
    pub drop_schema: DropOptionsSupport,
    pub create_schema: CreateSchemaSupport,
    pub delete: DeleteSupport,
    pub truncate: TruncateSupport,
    /// `UPDATE ... LIMIT n`
    pub limit_on_update: bool,
    pub data_types: DataTypeSupport,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct StartTransactionSupport {
    /// `BEGIN TRANSACTION` instead of `START TRANSACTION`.
    pub use_begin: bool,
    pub read_only: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AutoIncrementSupport {
    /// Explicit identity values need `SET IDENTITY_INSERT`.
    pub identity_insert: bool,
    /// Auto-increment columns accept `DEFAULT`.
    pub default_value: bool,
    /// Auto-increment columns can be updated.
    pub update: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct InsertSupport {
    /// Modifier placed after `INSERT`, such as ` IGNORE`.
    pub ignore_duplicates: String,
    pub update_on_duplicate: UpsertStyle,
    /// Suffix placed at the end of the statement, such as ` ON CONFLICT DO NOTHING`.
    pub on_conflict_do_nothing: String,
    pub on_conflict_where: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
#[allow(clippy::struct_excessive_bools)]
pub struct ConstraintSupport {
    pub restrict: bool,
    pub add: bool,
    pub remove: bool,
    pub unique: bool,
    pub default: bool,
    pub check: bool,
    pub foreign_key: bool,
    pub primary_key: bool,
    pub on_update: bool,
    pub deferrable: bool,
    pub remove_options: DropOptionsSupport,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
#[allow(clippy::struct_excessive_bools)]
pub struct IndexSupport {
    pub collate: bool,
    pub length: bool,
    pub parser: bool,
    pub concurrently: bool,
    #[serde(rename = "type")]
    pub index_type: bool,
    /// 0: no `USING`, 1: before `ON`, 2: after `ON`.
    pub using: u8,
    pub include: bool,
    pub operator: bool,
    #[serde(rename = "where")]
    pub partial: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct JsonExtractionSupport {
    pub unquoted: bool,
    pub quoted: bool,
}

/// Optional modifiers of a DROP statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DropOptionsSupport {
    pub if_exists: bool,
    pub cascade: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateSchemaSupport {
    pub if_not_exists: bool,
    pub replace: bool,
    pub authorization: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DeleteSupport {
    pub limit: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TruncateSupport {
    pub cascade: bool,
    pub restart_identity: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DataTypeSupport {
    pub json: bool,
    pub jsonb: bool,
    pub arrays: bool,
    pub uuid: bool,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            default_keyword: true,
            default_values: false,
            empty_values: false,
            bulk_default: false,
            schemas: false,
            transactions: true,
            savepoints: true,
            isolation_levels: true,
            connection_transaction_methods: false,
            start_transaction: StartTransactionSupport {
                use_begin: false,
                read_only: false,
            },
            return_values: ReturnValues::None,
            final_table: false,
            auto_increment: AutoIncrementSupport {
                identity_insert: false,
                default_value: true,
                update: true,
            },
            inserts: InsertSupport {
                ignore_duplicates: String::new(),
                update_on_duplicate: UpsertStyle::None,
                on_conflict_do_nothing: String::new(),
                on_conflict_where: false,
            },
            constraints: ConstraintSupport {
                restrict: true,
                add: true,
                remove: true,
                unique: true,
                default: false,
                check: true,
                foreign_key: true,
                primary_key: true,
                on_update: true,
                deferrable: false,
                remove_options: DropOptionsSupport {
                    if_exists: false,
                    cascade: false,
                },
            },
            index: IndexSupport {
                collate: true,
                length: false,
                parser: false,
                concurrently: false,
                index_type: false,
                using: 1,
                include: false,
                operator: false,
                partial: false,
            },
            index_via_alter: false,
            lock: false,
            lock_of: false,
            lock_key: false,
            skip_locked: false,
            for_share: None,
            escape_string_constants: false,
            json_operations: false,
            json_extraction: JsonExtractionSupport {
                unquoted: false,
                quoted: false,
            },
            uuid_v4_generation: false,
            remove_column: DropOptionsSupport {
                if_exists: false,
                cascade: false,
            },
            drop_table: DropOptionsSupport {
                if_exists: true,
                cascade: false,
            },
            drop_schema: DropOptionsSupport {
                if_exists: false,
                cascade: false,
            },
            create_schema: CreateSchemaSupport {
                if_not_exists: false,
                replace: false,
                authorization: false,
            },
            delete: DeleteSupport { limit: true },
            truncate: TruncateSupport {
                cascade: false,
                restart_identity: false,
            },
            limit_on_update: false,
            data_types: DataTypeSupport {
                json: false,
                jsonb: false,
                arrays: false,
                uuid: false,
            },
        }
    }
}

impl Capabilities {
    /// Returns a new record with `overrides` deep-merged onto a copy of `self`.
    ///
    /// Objects merge key by key; any other JSON value replaces the slot it
    /// lands on. Keys that are not part of the record are rejected.
    ///
    /// # Errors
    ///
    /// Returns [`crate::SqlGenError::Capabilities`] when the merged document
    /// does not describe a valid record.
    pub fn extend(&self, overrides: &Value) -> Result<Self> {
        let mut merged = serde_json::to_value(self)?;
        deep_merge(&mut merged, overrides);
        Ok(serde_json::from_value(merged)?)
    }
}

fn deep_merge(base: &mut Value, overrides: &Value) {
    match (base, overrides) {
        (Value::Object(base), Value::Object(overrides)) => {
            for (key, value) in overrides {
                match base.get_mut(key) {
                    Some(slot) => deep_merge(slot, value),
                    None => {
                        base.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        (slot, value) => *slot = value.clone(),
    }
}
