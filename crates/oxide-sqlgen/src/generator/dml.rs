//! Data-changing statements: INSERT, UPDATE, upserts and DELETE.

use indexmap::IndexMap;

use super::{join_sql_fragments, QueryGenerator};
use crate::bind::{assert_no_reserved_bind, combine_binds, BindParams, BindValues, Replacements};
use crate::dialect::{ReturnValues, UpsertStyle};
use crate::error::{Result, SqlGenError};
use crate::expr::{Condition, Expression, Value};
use crate::format::EscapeOptions;
use crate::model::{ModelDefinition, TableIdentifier};

/// Rows an INSERT or UPDATE hands back.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Returning {
    #[default]
    None,
    All,
    Columns(Vec<String>),
}

impl Returning {
    const fn is_requested(&self) -> bool {
        !matches!(self, Self::None)
    }
}

/// A statement together with the values of its bind parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlWithBind {
    pub query: String,
    /// `None` when the statement has no bind parameters.
    pub bind: Option<IndexMap<String, Value>>,
}

#[derive(Debug, Clone, Default)]
pub struct InsertOptions<'a> {
    pub model: Option<&'a ModelDefinition>,
    pub returning: Returning,
    pub ignore_duplicates: bool,
    pub replacements: Option<&'a Replacements>,
    /// Caller binds, merged into the generated ones.
    pub bind: Option<BindValues>,
    /// Escape values into the SQL text instead of binding them.
    pub inline_values: bool,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateOptions<'a> {
    pub model: Option<&'a ModelDefinition>,
    pub returning: Returning,
    pub limit: Option<u64>,
    pub replacements: Option<&'a Replacements>,
    pub bind: Option<BindValues>,
    pub inline_values: bool,
}

/// Options of an INSERT ... ON CONFLICT / ON DUPLICATE KEY statement.
#[derive(Debug, Clone)]
pub struct UpsertOptions<'a> {
    pub model: &'a ModelDefinition,
    /// Attribute names forming the conflict target. Derived from the model
    /// when empty, see [`select_upsert_keys`].
    pub conflict_fields: Vec<String>,
    pub conflict_where: Option<Condition>,
    pub returning: Returning,
    pub replacements: Option<&'a Replacements>,
    pub bind: Option<BindValues>,
    pub inline_values: bool,
}

impl<'a> UpsertOptions<'a> {
    #[must_use]
    pub const fn new(model: &'a ModelDefinition) -> Self {
        Self {
            model,
            conflict_fields: Vec::new(),
            conflict_where: None,
            returning: Returning::None,
            replacements: None,
            bind: None,
            inline_values: false,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct BulkInsertOptions<'a> {
    pub model: Option<&'a ModelDefinition>,
    pub ignore_duplicates: bool,
    /// Attribute names overwritten when a row already exists.
    pub update_on_duplicate: Vec<String>,
    /// Conflict target columns for `ON CONFLICT`.
    pub upsert_keys: Vec<String>,
    pub conflict_where: Option<Condition>,
    pub returning: Returning,
    pub replacements: Option<&'a Replacements>,
}

#[derive(Debug, Clone, Default)]
pub struct BulkDeleteOptions<'a> {
    pub model: Option<&'a ModelDefinition>,
    pub where_clause: Option<Condition>,
    pub limit: Option<u64>,
    pub replacements: Option<&'a Replacements>,
}

/// Conflict handling attached to an INSERT. Fields are column names.
struct OnConflict<'c> {
    update_columns: &'c [String],
    upsert_keys: &'c [String],
    conflict_where: Option<&'c Condition>,
}

/// Picks the conflict target of an upsert.
///
/// Explicit `conflict_fields` win. Otherwise the first unique index, in
/// declaration order, that contains one of `update_fields` (checked in
/// order) is used. The primary key is used when nothing matched or when an
/// updated field is part of it. Both inputs and the result are column names.
#[must_use]
pub fn select_upsert_keys(
    model: &ModelDefinition,
    update_fields: &[String],
    conflict_fields: &[String],
) -> Vec<String> {
    let mut keys: Vec<String> = conflict_fields
        .iter()
        .map(|field| model.column_name(field).to_string())
        .collect();

    if keys.is_empty() {
        let primary_keys = model.primary_key_columns();
        if let Some(index) = update_fields
            .iter()
            .find_map(|field| model.unique_indexes().find(|index| index.fields.contains(field)))
        {
            keys.clone_from(&index.fields);
        }
        let updates_primary_key = update_fields
            .iter()
            .any(|field| primary_keys.contains(&field.as_str()));
        if keys.is_empty() || updates_primary_key {
            keys = primary_keys.into_iter().map(String::from).collect();
        }
    }

    let mut unique = Vec::with_capacity(keys.len());
    for key in keys {
        if !unique.contains(&key) {
            unique.push(key);
        }
    }
    unique
}

impl QueryGenerator {
    /// `INSERT INTO` for one row.
    ///
    /// Plain values become bind parameters unless `inline_values` is set.
    ///
    /// # Errors
    ///
    /// Fails on reserved bind names, on options the dialect cannot honor and
    /// when a value cannot be escaped.
    pub fn insert(
        &self,
        table: impl Into<TableIdentifier>,
        values: &IndexMap<String, Expression>,
        options: &InsertOptions<'_>,
    ) -> Result<SqlWithBind> {
        if let Some(bind) = &options.bind {
            assert_no_reserved_bind(bind, &self.options().bind_prefix)?;
        }
        let table = self.extract_table_details(table);
        let params = self.bind_params(options.inline_values);
        let query = self.insert_statement(&table, values, options, params.as_ref(), None)?;
        Ok(self.with_bind("insertQuery", query, params, options.bind.clone()))
    }

    /// `UPDATE ... SET`.
    ///
    /// # Errors
    ///
    /// Fails when no column is left to set, on reserved bind names and on
    /// options the dialect cannot honor.
    pub fn update(
        &self,
        table: impl Into<TableIdentifier>,
        values: &IndexMap<String, Expression>,
        where_clause: Option<&Condition>,
        options: &UpdateOptions<'_>,
    ) -> Result<SqlWithBind> {
        if let Some(bind) = &options.bind {
            assert_no_reserved_bind(bind, &self.options().bind_prefix)?;
        }
        let supports = self.supports();
        self.ensure_supported(
            options.limit.is_some(),
            supports.limit_on_update,
            "LIMIT clauses in UPDATE",
        )?;

        let table = self.extract_table_details(table);
        let params = self.bind_params(options.inline_values);
        let escape_options = EscapeOptions {
            model: options.model,
            replacements: options.replacements,
            bind: params.as_ref(),
            ..EscapeOptions::default()
        };

        let mut assignments = Vec::with_capacity(values.len());
        for (key, value) in values {
            if self.options().omit_null && value.is_null() {
                continue;
            }
            let attribute = options.model.and_then(|model| model.find(key));
            if attribute.is_some_and(|attribute| attribute.auto_increment)
                && !supports.auto_increment.update
            {
                continue;
            }
            let column = attribute.map_or(key.as_str(), |attribute| attribute.column_name.as_str());
            let value_options = match attribute {
                Some(attribute) => escape_options.with_data_type(&attribute.data_type),
                None => escape_options,
            };
            assignments.push(format!(
                "{}={}",
                self.quote_identifier(column),
                self.escape(value, value_options)?
            ));
        }
        if assignments.is_empty() {
            return Err(SqlGenError::validation(
                "An UPDATE statement needs at least one column to set",
            ));
        }

        let (output, returning) = self.returning_fragments(&options.returning)?;
        let query = join_sql_fragments([
            format!("UPDATE {} SET {}", self.quote_table(&table, None), assignments.join(",")),
            output,
            self.where_query(where_clause, escape_options)?,
            options.limit.map(|limit| format!("LIMIT {limit}")).unwrap_or_default(),
            returning,
        ]);
        Ok(self.with_bind("updateQuery", query, params, options.bind.clone()))
    }

    /// INSERT that updates the existing row on a key conflict.
    ///
    /// # Errors
    ///
    /// Fails on dialects without single-statement upserts and when no
    /// conflict target can be derived.
    pub fn upsert(
        &self,
        table: impl Into<TableIdentifier>,
        insert_values: &IndexMap<String, Expression>,
        update_values: &IndexMap<String, Expression>,
        options: &UpsertOptions<'_>,
    ) -> Result<SqlWithBind> {
        if self.supports().inserts.update_on_duplicate == UpsertStyle::None {
            return Err(self.unsupported("Upserts"));
        }
        if let Some(bind) = &options.bind {
            assert_no_reserved_bind(bind, &self.options().bind_prefix)?;
        }

        let model = options.model;
        let update_columns: Vec<String> = update_values
            .keys()
            .map(|key| model.column_name(key).to_string())
            .collect();
        let upsert_keys = select_upsert_keys(model, &update_columns, &options.conflict_fields);
        let conflict = OnConflict {
            update_columns: &update_columns,
            upsert_keys: &upsert_keys,
            conflict_where: options.conflict_where.as_ref(),
        };

        let table = self.extract_table_details(table);
        let params = self.bind_params(options.inline_values);
        let insert_options = InsertOptions {
            model: Some(model),
            returning: options.returning.clone(),
            ignore_duplicates: false,
            replacements: options.replacements,
            bind: None,
            inline_values: options.inline_values,
        };
        let query = self.insert_statement(
            &table,
            insert_values,
            &insert_options,
            params.as_ref(),
            Some(&conflict),
        )?;
        Ok(self.with_bind("upsertQuery", query, params, options.bind.clone()))
    }

    /// Multi-row `INSERT INTO ... VALUES (...),(...)` with inlined values.
    ///
    /// # Errors
    ///
    /// Fails on an empty row list and on options the dialect cannot honor.
    pub fn bulk_insert(
        &self,
        table: impl Into<TableIdentifier>,
        rows: &[IndexMap<String, Expression>],
        options: &BulkInsertOptions<'_>,
    ) -> Result<String> {
        if rows.is_empty() {
            return Err(SqlGenError::validation("A bulk insert needs at least one row"));
        }
        let supports = self.supports();
        let table = self.extract_table_details(table);
        let escape_options = EscapeOptions {
            model: options.model,
            replacements: options.replacements,
            ..EscapeOptions::default()
        };

        let mut keys: Vec<&str> = Vec::new();
        for row in rows {
            for key in row.keys() {
                if !keys.contains(&key.as_str()) {
                    keys.push(key);
                }
            }
        }
        let attributes: Vec<_> = keys
            .iter()
            .map(|key| options.model.and_then(|model| model.find(key)))
            .collect();

        let mut tuples = Vec::with_capacity(rows.len());
        for row in rows {
            let mut escaped = Vec::with_capacity(keys.len());
            for (key, attribute) in keys.iter().zip(&attributes) {
                let value = row.get(*key).filter(|value| !value.is_null());
                let serial = attribute.is_some_and(|attribute| attribute.auto_increment);
                let sql = match value {
                    None if serial && supports.bulk_default => String::from("DEFAULT"),
                    None => String::from("NULL"),
                    Some(value) => {
                        let value_options = match attribute {
                            Some(attribute) => escape_options.with_data_type(&attribute.data_type),
                            None => escape_options,
                        };
                        self.escape(value, value_options)?
                    }
                };
                escaped.push(sql);
            }
            tuples.push(format!("({})", escaped.join(",")));
        }

        let columns: Vec<String> = keys
            .iter()
            .zip(&attributes)
            .map(|(key, attribute)| {
                let column = attribute.map_or(*key, |attribute| attribute.column_name.as_str());
                self.quote_identifier(column)
            })
            .collect();

        let update_columns: Vec<String> = options
            .update_on_duplicate
            .iter()
            .map(|field| {
                options
                    .model
                    .map_or(field.as_str(), |model| model.column_name(field))
                    .to_string()
            })
            .collect();
        let conflict_sql = if update_columns.is_empty() {
            String::new()
        } else {
            let conflict = OnConflict {
                update_columns: &update_columns,
                upsert_keys: &options.upsert_keys,
                conflict_where: options.conflict_where.as_ref(),
            };
            self.on_conflict_sql(&conflict, escape_options, |column| {
                Some(format!("VALUES({})", self.quote_identifier(column)))
            })?
        };
        let (ignore, do_nothing) = self.ignore_duplicates_fragments(options.ignore_duplicates)?;
        let (output, returning) = self.returning_fragments(&options.returning)?;

        let query = join_sql_fragments([
            format!("INSERT{ignore} INTO {}", self.quote_table(&table, None)),
            format!("({})", columns.join(",")),
            output,
            String::from("VALUES"),
            tuples.join(","),
            conflict_sql,
            do_nothing.to_string(),
            returning,
            String::from(";"),
        ]);
        Ok(self.finish("bulkInsertQuery", query))
    }

    /// `DELETE FROM` with an optional condition and row limit.
    ///
    /// Dialects without `DELETE ... LIMIT` delete by primary key through a
    /// limited subquery, which needs the model.
    ///
    /// # Errors
    ///
    /// Fails when a limit is given for such a dialect without a model or
    /// primary key.
    pub fn bulk_delete(
        &self,
        table: impl Into<TableIdentifier>,
        options: &BulkDeleteOptions<'_>,
    ) -> Result<String> {
        let table = self.extract_table_details(table);
        let quoted_table = self.quote_table(&table, None);
        let escape_options = EscapeOptions {
            model: options.model,
            replacements: options.replacements,
            ..EscapeOptions::default()
        };
        let where_sql = self.where_query(options.where_clause.as_ref(), escape_options)?;

        let query = match options.limit {
            Some(limit) if !self.supports().delete.limit => {
                let model = options.model.ok_or_else(|| {
                    SqlGenError::validation(
                        "A limited bulk delete requires a model on this dialect",
                    )
                })?;
                let primary_keys: Vec<String> = model
                    .primary_key_columns()
                    .into_iter()
                    .map(|column| self.quote_identifier(column))
                    .collect();
                if primary_keys.is_empty() {
                    return Err(SqlGenError::validation(
                        "A limited bulk delete requires a primary key on this dialect",
                    ));
                }
                let key_list = primary_keys.join(", ");
                let target = if primary_keys.len() > 1 {
                    format!("({key_list})")
                } else {
                    key_list.clone()
                };
                let subquery = join_sql_fragments([
                    format!("SELECT {key_list} FROM {quoted_table}"),
                    where_sql,
                    format!("ORDER BY {key_list}"),
                    self.dialect().limit_offset(Some(limit), None, true)?,
                ]);
                format!("DELETE FROM {quoted_table} WHERE {target} IN ({subquery})")
            }
            Some(limit) => join_sql_fragments([
                format!("DELETE FROM {quoted_table}"),
                where_sql,
                self.dialect().limit_offset(Some(limit), None, false)?,
            ]),
            None => join_sql_fragments([format!("DELETE FROM {quoted_table}"), where_sql]),
        };
        Ok(self.finish("bulkDeleteQuery", query))
    }

    fn insert_statement(
        &self,
        table: &TableIdentifier,
        values: &IndexMap<String, Expression>,
        options: &InsertOptions<'_>,
        bind: Option<&BindParams>,
        on_conflict: Option<&OnConflict<'_>>,
    ) -> Result<String> {
        let supports = self.supports();
        let quoted_table = self.quote_table(table, None);
        let escape_options = EscapeOptions {
            model: options.model,
            replacements: options.replacements,
            bind,
            ..EscapeOptions::default()
        };

        // (quoted column, escaped value) in insertion order
        let mut entries: Vec<(String, String)> = Vec::with_capacity(values.len());
        let mut identity_insert = false;
        for (key, value) in values {
            if self.options().omit_null && value.is_null() {
                continue;
            }
            let attribute = options.model.and_then(|model| model.find(key));
            let column = attribute.map_or(key.as_str(), |attribute| attribute.column_name.as_str());
            if attribute.is_some_and(|attribute| attribute.auto_increment) {
                if value.is_null() {
                    if !supports.auto_increment.default_value {
                        continue;
                    }
                    let placeholder = if supports.default_keyword { "DEFAULT" } else { "NULL" };
                    entries.push((self.quote_identifier(column), placeholder.to_string()));
                    continue;
                }
                identity_insert = true;
            }
            let value_options = match attribute {
                Some(attribute) => escape_options.with_data_type(&attribute.data_type),
                None => escape_options,
            };
            entries.push((self.quote_identifier(column), self.escape(value, value_options)?));
        }

        let conflict_sql = match on_conflict {
            Some(conflict) => self.on_conflict_sql(conflict, escape_options, |column| {
                let quoted = self.quote_identifier(column);
                entries
                    .iter()
                    .find(|(candidate, _)| *candidate == quoted)
                    .map(|(_, value)| value.clone())
            })?,
            None => String::new(),
        };
        let (ignore, do_nothing) = self.ignore_duplicates_fragments(options.ignore_duplicates)?;
        let (output, returning) = self.returning_fragments(&options.returning)?;
        let head = format!("INSERT{ignore} INTO {quoted_table}");

        let body = if entries.is_empty() {
            let empty = if supports.default_values {
                "DEFAULT VALUES"
            } else if supports.empty_values {
                "VALUES ()"
            } else {
                return Err(self.unsupported("Inserts without values"));
            };
            join_sql_fragments([
                head.as_str(),
                output.as_str(),
                empty,
                conflict_sql.as_str(),
                do_nothing,
                returning.as_str(),
            ])
        } else {
            let (columns, escaped): (Vec<String>, Vec<String>) = entries.into_iter().unzip();
            join_sql_fragments([
                head,
                format!("({})", columns.join(",")),
                output,
                String::from("VALUES"),
                format!("({})", escaped.join(",")),
                conflict_sql,
                do_nothing.to_string(),
                returning,
            ])
        };

        let mut query = if supports.final_table && options.returning.is_requested() {
            format!("SELECT * FROM FINAL TABLE ({body});")
        } else {
            format!("{body};")
        };
        if identity_insert && supports.auto_increment.identity_insert {
            query = format!("SET IDENTITY_INSERT {quoted_table} ON; {query} SET IDENTITY_INSERT {quoted_table} OFF;");
        }
        Ok(query)
    }

    /// `ON CONFLICT ... DO UPDATE` or `ON DUPLICATE KEY UPDATE`.
    ///
    /// `duplicate_value` yields the right-hand side of a MySQL-style
    /// assignment for a column name.
    fn on_conflict_sql<F>(
        &self,
        conflict: &OnConflict<'_>,
        options: EscapeOptions<'_>,
        duplicate_value: F,
    ) -> Result<String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let inserts = &self.supports().inserts;
        match inserts.update_on_duplicate {
            UpsertStyle::None => Err(self.unsupported("Upserts")),
            UpsertStyle::OnConflict => {
                if conflict.upsert_keys.is_empty() {
                    return Err(SqlGenError::validation(
                        "An ON CONFLICT clause needs at least one conflict key",
                    ));
                }
                self.ensure_supported(
                    conflict.conflict_where.is_some(),
                    inserts.on_conflict_where,
                    "WHERE clauses in ON CONFLICT",
                )?;
                let keys: Vec<String> = conflict
                    .upsert_keys
                    .iter()
                    .map(|key| self.quote_identifier(key))
                    .collect();
                let where_sql = self.where_query(conflict.conflict_where, options)?;
                let action = if conflict.update_columns.is_empty() {
                    String::from("DO NOTHING")
                } else {
                    let assignments: Vec<String> = conflict
                        .update_columns
                        .iter()
                        .map(|column| {
                            let quoted = self.quote_identifier(column);
                            format!("{quoted}=EXCLUDED.{quoted}")
                        })
                        .collect();
                    format!("DO UPDATE SET {}", assignments.join(","))
                };
                Ok(join_sql_fragments([
                    format!("ON CONFLICT ({})", keys.join(",")),
                    where_sql,
                    action,
                ]))
            }
            UpsertStyle::OnDuplicateKeyUpdate => {
                self.ensure_supported(
                    conflict.conflict_where.is_some(),
                    inserts.on_conflict_where,
                    "WHERE clauses in ON CONFLICT",
                )?;
                // without updated columns the keys are assigned to themselves,
                // which turns the conflict into a no-op
                let columns = if conflict.update_columns.is_empty() {
                    conflict.upsert_keys
                } else {
                    conflict.update_columns
                };
                if columns.is_empty() {
                    return Err(SqlGenError::validation(
                        "ON DUPLICATE KEY UPDATE needs at least one column",
                    ));
                }
                let assignments: Vec<String> = columns
                    .iter()
                    .map(|column| {
                        let quoted = self.quote_identifier(column);
                        let value = if conflict.update_columns.is_empty() {
                            quoted.clone()
                        } else {
                            duplicate_value(column).unwrap_or_else(|| format!("VALUES({quoted})"))
                        };
                        format!("{quoted}={value}")
                    })
                    .collect();
                Ok(format!("ON DUPLICATE KEY UPDATE {}", assignments.join(",")))
            }
        }
    }

    /// The keyword spliced after `INSERT` and the trailing clause that make
    /// duplicate rows a no-op.
    fn ignore_duplicates_fragments(&self, requested: bool) -> Result<(&'static str, &'static str)> {
        if !requested {
            return Ok(("", ""));
        }
        let inserts = &self.supports().inserts;
        if inserts.ignore_duplicates.is_empty() && inserts.on_conflict_do_nothing.is_empty() {
            return Err(self.unsupported("Ignoring duplicate rows"));
        }
        Ok((&inserts.ignore_duplicates, &inserts.on_conflict_do_nothing))
    }

    /// `(output clause, returning clause)`; at most one is non-empty.
    fn returning_fragments(&self, returning: &Returning) -> Result<(String, String)> {
        let columns = match returning {
            Returning::None => return Ok((String::new(), String::new())),
            Returning::All => None,
            Returning::Columns(columns) => Some(columns),
        };
        match self.supports().return_values {
            ReturnValues::Returning => {
                let list = columns.map_or_else(
                    || String::from("*"),
                    |columns| {
                        columns
                            .iter()
                            .map(|column| self.quote_identifier(column))
                            .collect::<Vec<_>>()
                            .join(", ")
                    },
                );
                Ok((String::new(), format!("RETURNING {list}")))
            }
            ReturnValues::Output => {
                let list = columns.map_or_else(
                    || String::from("INSERTED.*"),
                    |columns| {
                        columns
                            .iter()
                            .map(|column| format!("INSERTED.{}", self.quote_identifier(column)))
                            .collect::<Vec<_>>()
                            .join(", ")
                    },
                );
                Ok((format!("OUTPUT {list}"), String::new()))
            }
            // rows come back through SELECT * FROM FINAL TABLE
            ReturnValues::None if self.supports().final_table => Ok((String::new(), String::new())),
            ReturnValues::None => Err(self.unsupported("RETURNING clauses")),
        }
    }

    /// Allocator for generated binds, or `None` when values are inlined.
    fn bind_params(&self, inline_values: bool) -> Option<BindParams> {
        (!inline_values).then(|| BindParams::new(self.options().bind_prefix.clone()))
    }

    fn with_bind(
        &self,
        statement: &'static str,
        query: String,
        params: Option<BindParams>,
        user: Option<BindValues>,
    ) -> SqlWithBind {
        let generated = params.map(BindParams::into_values).unwrap_or_default();
        let bind = if generated.is_empty() && user.is_none() {
            None
        } else {
            Some(combine_binds(user, generated))
        };
        SqlWithBind {
            query: self.finish(statement, query),
            bind,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::DialectKind;
    use crate::error::ErrorKind;
    use crate::expr::Operator;
    use crate::model::{AttributeDefinition, IndexDefinition};
    use crate::sql;
    use crate::types::DataType;

    fn generator(kind: DialectKind) -> QueryGenerator {
        QueryGenerator::for_kind(kind)
    }

    fn users() -> ModelDefinition {
        ModelDefinition::new("users")
            .attribute(
                AttributeDefinition::new("id", DataType::Integer)
                    .primary_key()
                    .auto_increment(),
            )
            .attribute(AttributeDefinition::new("email", DataType::Varchar(None)).unique())
            .attribute(
                AttributeDefinition::new("firstName", DataType::Varchar(None)).column("first_name"),
            )
    }

    fn values<const N: usize>(entries: [(&str, Expression); N]) -> IndexMap<String, Expression> {
        entries
            .into_iter()
            .map(|(key, value)| (key.to_string(), value))
            .collect()
    }

    #[test]
    fn test_insert_binds_values() {
        let model = users();
        let result = generator(DialectKind::Postgres)
            .insert(
                "users",
                &values([
                    ("firstName", sql::value("Ann")),
                    ("email", sql::value("ann@example.com")),
                ]),
                &InsertOptions {
                    model: Some(&model),
                    ..InsertOptions::default()
                },
            )
            .unwrap();
        assert_eq!(
            result.query,
            "INSERT INTO \"users\" (\"first_name\",\"email\") VALUES ($oxide_1,$oxide_2);"
        );
        let bind = result.bind.unwrap();
        assert_eq!(bind.get("oxide_1"), Some(&Value::from("Ann")));
        assert_eq!(bind.len(), 2);
    }

    #[test]
    fn test_insert_inline_with_returning() {
        let result = generator(DialectKind::Postgres)
            .insert(
                "users",
                &values([("email", sql::value("a@b.c"))]),
                &InsertOptions {
                    returning: Returning::All,
                    inline_values: true,
                    ..InsertOptions::default()
                },
            )
            .unwrap();
        assert_eq!(
            result.query,
            "INSERT INTO \"users\" (\"email\") VALUES ('a@b.c') RETURNING *;"
        );
        assert_eq!(result.bind, None);
    }

    #[test]
    fn test_insert_merges_caller_binds() {
        let result = generator(DialectKind::Postgres)
            .insert(
                "users",
                &values([("email", sql::literal("$email"))]),
                &InsertOptions {
                    bind: Some(BindValues::named([("email", "x@y.z")])),
                    ..InsertOptions::default()
                },
            )
            .unwrap();
        assert_eq!(result.query, "INSERT INTO \"users\" (\"email\") VALUES ($email);");
        assert_eq!(result.bind.unwrap().get("email"), Some(&Value::from("x@y.z")));
    }

    #[test]
    fn test_insert_rejects_reserved_bind_names() {
        let err = generator(DialectKind::Postgres)
            .insert(
                "users",
                &values([("email", sql::value("a"))]),
                &InsertOptions {
                    bind: Some(BindValues::named([("oxide_1", 1)])),
                    ..InsertOptions::default()
                },
            )
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_insert_ignore_duplicates() {
        let options = InsertOptions {
            ignore_duplicates: true,
            inline_values: true,
            ..InsertOptions::default()
        };
        let row = values([("email", sql::value("a"))]);
        assert_eq!(
            generator(DialectKind::MySql).insert("users", &row, &options).unwrap().query,
            "INSERT IGNORE INTO `users` (`email`) VALUES ('a');"
        );
        assert_eq!(
            generator(DialectKind::Postgres).insert("users", &row, &options).unwrap().query,
            "INSERT INTO \"users\" (\"email\") VALUES ('a') ON CONFLICT DO NOTHING;"
        );
        assert_eq!(
            generator(DialectKind::Sqlite).insert("users", &row, &options).unwrap().query,
            "INSERT OR IGNORE INTO `users` (`email`) VALUES ('a');"
        );
        let err = generator(DialectKind::MsSql).insert("users", &row, &options).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CapabilityViolation);
    }

    #[test]
    fn test_insert_without_values() {
        let options = InsertOptions::default();
        let empty = IndexMap::new();
        assert_eq!(
            generator(DialectKind::Postgres).insert("users", &empty, &options).unwrap().query,
            "INSERT INTO \"users\" DEFAULT VALUES;"
        );
        assert_eq!(
            generator(DialectKind::MySql).insert("users", &empty, &options).unwrap().query,
            "INSERT INTO `users` VALUES ();"
        );
        assert!(generator(DialectKind::Oracle).insert("users", &empty, &options).is_err());
    }

    #[test]
    fn test_null_auto_increment() {
        let model = users();
        let row = values([("id", sql::value(Value::Null)), ("email", sql::value("a"))]);
        let options = InsertOptions {
            model: Some(&model),
            inline_values: true,
            ..InsertOptions::default()
        };
        assert_eq!(
            generator(DialectKind::Postgres).insert("users", &row, &options).unwrap().query,
            "INSERT INTO \"users\" (\"id\",\"email\") VALUES (DEFAULT,'a');"
        );
        assert_eq!(
            generator(DialectKind::Sqlite).insert("users", &row, &options).unwrap().query,
            "INSERT INTO `users` (`id`,`email`) VALUES (NULL,'a');"
        );
        assert_eq!(
            generator(DialectKind::MsSql).insert("users", &row, &options).unwrap().query,
            "INSERT INTO [users] ([email]) VALUES (N'a');"
        );
    }

    #[test]
    fn test_identity_insert() {
        let model = users();
        let result = generator(DialectKind::MsSql)
            .insert(
                "users",
                &values([("id", sql::value(5)), ("email", sql::value("a"))]),
                &InsertOptions {
                    model: Some(&model),
                    returning: Returning::All,
                    inline_values: true,
                    ..InsertOptions::default()
                },
            )
            .unwrap();
        assert_eq!(
            result.query,
            "SET IDENTITY_INSERT [users] ON; INSERT INTO [users] ([id],[email]) OUTPUT INSERTED.* VALUES (5,N'a'); SET IDENTITY_INSERT [users] OFF;"
        );
    }

    #[test]
    fn test_final_table_returning() {
        let result = generator(DialectKind::Db2)
            .insert(
                "users",
                &values([("email", sql::value("a"))]),
                &InsertOptions {
                    returning: Returning::All,
                    inline_values: true,
                    ..InsertOptions::default()
                },
            )
            .unwrap();
        assert_eq!(
            result.query,
            "SELECT * FROM FINAL TABLE (INSERT INTO \"users\" (\"email\") VALUES ('a'));"
        );
    }

    #[test]
    fn test_returning_is_gated() {
        let err = generator(DialectKind::MySql)
            .insert(
                "users",
                &values([("email", sql::value("a"))]),
                &InsertOptions {
                    returning: Returning::Columns(vec!["id".into()]),
                    ..InsertOptions::default()
                },
            )
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CapabilityViolation);
        assert!(err.to_string().contains("mysql"));
    }

    #[test]
    fn test_update_with_where() {
        let model = users();
        let condition = Condition::eq(sql::attribute("id").unwrap(), 7);
        let result = generator(DialectKind::Postgres)
            .update(
                "users",
                &values([("firstName", sql::value("Bo"))]),
                Some(&condition),
                &UpdateOptions {
                    model: Some(&model),
                    returning: Returning::Columns(vec!["id".into()]),
                    ..UpdateOptions::default()
                },
            )
            .unwrap();
        assert_eq!(
            result.query,
            "UPDATE \"users\" SET \"first_name\"=$oxide_1 WHERE \"id\" = $oxide_2 RETURNING \"id\""
        );
        assert_eq!(result.bind.unwrap().len(), 2);
    }

    #[test]
    fn test_update_skips_identity_columns() {
        let model = users();
        let options = UpdateOptions {
            model: Some(&model),
            inline_values: true,
            ..UpdateOptions::default()
        };
        let row = values([("id", sql::value(2)), ("email", sql::value("a"))]);
        assert_eq!(
            generator(DialectKind::MsSql).update("users", &row, None, &options).unwrap().query,
            "UPDATE [users] SET [email]=N'a'"
        );
        let only_id = values([("id", sql::value(2))]);
        let err = generator(DialectKind::MsSql)
            .update("users", &only_id, None, &options)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_update_limit() {
        let options = UpdateOptions {
            limit: Some(1),
            inline_values: true,
            ..UpdateOptions::default()
        };
        let row = values([("email", sql::value("a"))]);
        assert_eq!(
            generator(DialectKind::MySql).update("users", &row, None, &options).unwrap().query,
            "UPDATE `users` SET `email`='a' LIMIT 1"
        );
        assert!(generator(DialectKind::Postgres).update("users", &row, None, &options).is_err());
    }

    #[test]
    fn test_upsert_postgres() {
        let model = users();
        let row = values([("email", sql::value("a")), ("firstName", sql::value("Ann"))]);
        let update = values([("firstName", sql::value("Ann"))]);
        let options = UpsertOptions {
            inline_values: true,
            ..UpsertOptions::new(&model)
        };
        assert_eq!(
            generator(DialectKind::Postgres)
                .upsert("users", &row, &update, &options)
                .unwrap()
                .query,
            "INSERT INTO \"users\" (\"email\",\"first_name\") VALUES ('a','Ann') ON CONFLICT (\"id\") DO UPDATE SET \"first_name\"=EXCLUDED.\"first_name\";"
        );

        let options = UpsertOptions {
            conflict_fields: vec!["email".into()],
            conflict_where: Some(Condition::compare(
                sql::attribute("email").unwrap(),
                Operator::Ne,
                Value::Null,
            )),
            inline_values: true,
            ..UpsertOptions::new(&model)
        };
        assert_eq!(
            generator(DialectKind::Postgres)
                .upsert("users", &row, &update, &options)
                .unwrap()
                .query,
            "INSERT INTO \"users\" (\"email\",\"first_name\") VALUES ('a','Ann') ON CONFLICT (\"email\") WHERE \"email\" IS NOT NULL DO UPDATE SET \"first_name\"=EXCLUDED.\"first_name\";"
        );
    }

    #[test]
    fn test_upsert_mysql_reuses_inserted_values() {
        let model = users();
        let row = values([("email", sql::value("a")), ("firstName", sql::value("Ann"))]);
        let update = values([("firstName", sql::value("Ann"))]);
        let result = generator(DialectKind::MySql)
            .upsert("users", &row, &update, &UpsertOptions::new(&model))
            .unwrap();
        assert_eq!(
            result.query,
            "INSERT INTO `users` (`email`,`first_name`) VALUES ($oxide_1,$oxide_2) ON DUPLICATE KEY UPDATE `first_name`=$oxide_2;"
        );
    }

    #[test]
    fn test_upsert_is_gated() {
        let model = users();
        let row = values([("email", sql::value("a"))]);
        let err = generator(DialectKind::MsSql)
            .upsert("users", &row, &row, &UpsertOptions::new(&model))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CapabilityViolation);
        let err = generator(DialectKind::MySql)
            .upsert(
                "users",
                &row,
                &row,
                &UpsertOptions {
                    conflict_where: Some(Condition::eq(sql::attribute("email").unwrap(), "a")),
                    ..UpsertOptions::new(&model)
                },
            )
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CapabilityViolation);
    }

    #[test]
    fn test_upsert_keys_prefer_conflict_fields() {
        let model = users();
        let keys = select_upsert_keys(
            &model,
            &["email".into()],
            &["firstName".into(), "firstName".into()],
        );
        assert_eq!(keys, vec!["first_name"]);
    }

    #[test]
    fn test_upsert_keys_take_first_unique_index_in_declaration_order() {
        let model = ModelDefinition::new("accounts")
            .attribute(AttributeDefinition::new("id", DataType::Integer).primary_key())
            .attribute(AttributeDefinition::new("slug", DataType::Text))
            .attribute(AttributeDefinition::new("tenant", DataType::Integer))
            .index(IndexDefinition::new(["tenant", "slug"]).unique())
            .index(IndexDefinition::new(["slug"]).unique());
        assert_eq!(
            select_upsert_keys(&model, &["slug".into()], &[]),
            vec!["tenant", "slug"]
        );
        assert_eq!(select_upsert_keys(&model, &["other".into()], &[]), vec!["id"]);
    }

    #[test]
    fn test_upsert_keys_fall_back_to_primary_key_when_it_is_updated() {
        let model = users();
        assert_eq!(
            select_upsert_keys(&model, &["email".into(), "id".into()], &[]),
            vec!["id"]
        );
        assert_eq!(select_upsert_keys(&model, &["email".into()], &[]), vec!["email"]);
    }

    #[test]
    fn test_bulk_insert() {
        let model = users();
        let rows = [
            values([("id", sql::value(Value::Null)), ("email", sql::value("a"))]),
            values([("email", sql::value("b")), ("firstName", sql::value("B"))]),
        ];
        let sql = generator(DialectKind::Postgres)
            .bulk_insert(
                "users",
                &rows,
                &BulkInsertOptions {
                    model: Some(&model),
                    update_on_duplicate: vec!["firstName".into()],
                    upsert_keys: vec!["email".into()],
                    ..BulkInsertOptions::default()
                },
            )
            .unwrap();
        assert_eq!(
            sql,
            "INSERT INTO \"users\" (\"id\",\"email\",\"first_name\") VALUES (DEFAULT,'a',NULL),(DEFAULT,'b','B') ON CONFLICT (\"email\") DO UPDATE SET \"first_name\"=EXCLUDED.\"first_name\";"
        );
    }

    #[test]
    fn test_bulk_insert_on_duplicate_key() {
        let rows = [values([("email", sql::value("a")), ("name", sql::value("A"))])];
        let sql = generator(DialectKind::MySql)
            .bulk_insert(
                "users",
                &rows,
                &BulkInsertOptions {
                    update_on_duplicate: vec!["name".into()],
                    ..BulkInsertOptions::default()
                },
            )
            .unwrap();
        assert_eq!(
            sql,
            "INSERT INTO `users` (`email`,`name`) VALUES ('a','A') ON DUPLICATE KEY UPDATE `name`=VALUES(`name`);"
        );
        assert!(generator(DialectKind::MySql)
            .bulk_insert("users", &[], &BulkInsertOptions::default())
            .is_err());
    }

    #[test]
    fn test_bulk_delete_with_limit() {
        let options = BulkDeleteOptions {
            where_clause: Some(Condition::eq(sql::attribute("email").unwrap(), "a")),
            limit: Some(10),
            ..BulkDeleteOptions::default()
        };
        assert_eq!(
            generator(DialectKind::MySql).bulk_delete("users", &options).unwrap(),
            "DELETE FROM `users` WHERE `email` = 'a' LIMIT 10"
        );
        let err = generator(DialectKind::Postgres).bulk_delete("users", &options).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let model = users();
        let options = BulkDeleteOptions {
            model: Some(&model),
            ..options
        };
        assert_eq!(
            generator(DialectKind::Postgres).bulk_delete("users", &options).unwrap(),
            "DELETE FROM \"users\" WHERE \"id\" IN (SELECT \"id\" FROM \"users\" WHERE \"email\" = 'a' ORDER BY \"id\" LIMIT 10)"
        );
    }

    #[test]
    fn test_bulk_delete_without_limit() {
        assert_eq!(
            generator(DialectKind::Sqlite)
                .bulk_delete("users", &BulkDeleteOptions::default())
                .unwrap(),
            "DELETE FROM `users`"
        );
    }
}
