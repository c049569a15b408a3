//! Schema-changing statements.

use super::{join_sql_fragments, QueryGenerator};
use crate::dialect::DialectKind;
use crate::error::{Result, SqlGenError};
use crate::expr::Condition;
use crate::format::EscapeOptions;
use crate::model::{AttributeDefinition, FieldSpec, ModelDefinition, TableIdentifier};
use crate::types::DataType;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateTableOptions {
    /// Defaults to `true`.
    pub if_not_exists: bool,
}

impl Default for CreateTableOptions {
    fn default() -> Self {
        Self { if_not_exists: true }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DropTableOptions {
    pub cascade: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenameTableOptions {
    /// Allows the new name to live in another schema.
    pub change_schema: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoveColumnOptions {
    pub if_exists: bool,
    pub cascade: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoveConstraintOptions {
    pub if_exists: bool,
    pub cascade: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoveIndexOptions {
    pub if_exists: bool,
    pub concurrently: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateSchemaOptions {
    pub if_not_exists: bool,
    pub replace: bool,
    pub authorization: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DropSchemaOptions {
    pub if_exists: bool,
    pub cascade: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TruncateOptions {
    pub cascade: bool,
    pub restart_identity: bool,
}

/// Description of a `CREATE INDEX` statement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndexOptions {
    pub fields: Vec<FieldSpec>,
    /// Generated from the table and field names when missing.
    pub name: Option<String>,
    pub unique: bool,
    pub concurrently: bool,
    /// Index method, such as `BTREE` or `GIN`.
    pub using: Option<String>,
    /// Index type keyword, such as `FULLTEXT`.
    pub index_type: Option<String>,
    pub parser: Option<String>,
    /// Operator class applied to fields that do not set their own.
    pub operator: Option<String>,
    /// Non-key columns stored in the index.
    pub include: Vec<String>,
    /// Makes the index partial.
    pub where_clause: Option<Condition>,
}

impl IndexOptions {
    pub fn new<I, F>(fields: I) -> Self
    where
        I: IntoIterator<Item = F>,
        F: Into<FieldSpec>,
    {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub const fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    #[must_use]
    pub const fn concurrently(mut self) -> Self {
        self.concurrently = true;
        self
    }

    #[must_use]
    pub fn using(mut self, method: impl Into<String>) -> Self {
        self.using = Some(method.into());
        self
    }

    #[must_use]
    pub fn index_type(mut self, index_type: impl Into<String>) -> Self {
        self.index_type = Some(index_type.into());
        self
    }

    #[must_use]
    pub fn parser(mut self, parser: impl Into<String>) -> Self {
        self.parser = Some(parser.into());
        self
    }

    #[must_use]
    pub fn operator(mut self, operator: impl Into<String>) -> Self {
        self.operator = Some(operator.into());
        self
    }

    #[must_use]
    pub fn include<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.include = columns.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn where_clause(mut self, condition: Condition) -> Self {
        self.where_clause = Some(condition);
        self
    }
}

impl QueryGenerator {
    /// `CREATE TABLE` for every attribute of `model`.
    ///
    /// # Errors
    ///
    /// Fails when a column type or a reference option is not supported.
    pub fn create_table(
        &self,
        model: &ModelDefinition,
        options: &CreateTableOptions,
    ) -> Result<String> {
        let table = self.extract_table_details(model);
        let quoted_table = self.quote_table(&table, None);

        let mut columns = Vec::with_capacity(model.attributes.len() + 1);
        let mut primary_keys = Vec::new();
        for attribute in model.attributes.values() {
            let definition = self.attribute_sql(attribute)?;
            let quoted_column = self.quote_identifier(&attribute.column_name);
            if attribute.primary_key && !definition.contains("PRIMARY KEY") {
                primary_keys.push(quoted_column.clone());
            }
            columns.push(format!("{quoted_column} {definition}"));
        }
        if !primary_keys.is_empty() {
            columns.push(format!("PRIMARY KEY ({})", primary_keys.join(", ")));
        }
        let body = format!("({})", columns.join(", "));

        let sql = if options.if_not_exists {
            self.dialect().create_table_if_not_exists(&quoted_table, &body)
        } else {
            format!("CREATE TABLE {quoted_table} {body};")
        };
        Ok(self.finish("createTable", sql))
    }

    /// Column definition without the column name.
    ///
    /// # Errors
    ///
    /// Fails when the type, the default value or a reference option cannot
    /// be rendered for this dialect.
    pub fn attribute_sql(&self, attribute: &AttributeDefinition) -> Result<String> {
        let mut fragments = Vec::new();
        if attribute.auto_increment {
            fragments.push(self.dialect().auto_increment_column(&attribute.data_type)?);
        } else {
            fragments.push(self.dialect().data_type_sql(&attribute.data_type)?);
        }
        if !attribute.allow_null {
            fragments.push(String::from("NOT NULL"));
        }
        if let Some(default) = attribute
            .default_value
            .as_ref()
            .filter(|_| !attribute.auto_increment)
        {
            let options = EscapeOptions::default().with_data_type(&attribute.data_type);
            fragments.push(format!("DEFAULT {}", self.escape(default, options)?));
        }
        if attribute.unique && !attribute.primary_key {
            fragments.push(String::from("UNIQUE"));
        }
        if let Some(references) = &attribute.references {
            let target = self.extract_table_details(&references.table);
            fragments.push(format!(
                "REFERENCES {} ({})",
                self.quote_table(&target, None),
                self.quote_identifier(references.column.as_deref().unwrap_or("id"))
            ));
            fragments.push(self.referential_actions(references.on_update, references.on_delete)?);
            fragments.push(self.deferrable_snippet(references.deferrable)?);
        }
        Ok(join_sql_fragments(fragments))
    }

    /// # Errors
    ///
    /// Fails when `cascade` is requested on a dialect without it.
    pub fn drop_table(
        &self,
        table: impl Into<TableIdentifier>,
        options: &DropTableOptions,
    ) -> Result<String> {
        let support = &self.supports().drop_table;
        self.ensure_supported(options.cascade, support.cascade, "CASCADE on table removal")?;
        let table = self.extract_table_details(table);
        let sql = join_sql_fragments([
            "DROP TABLE",
            if support.if_exists { "IF EXISTS" } else { "" },
            self.quote_table(&table, None).as_str(),
            if options.cascade { "CASCADE" } else { "" },
        ]);
        Ok(self.finish("dropTable", sql))
    }

    /// # Errors
    ///
    /// Moving a table to another schema requires `change_schema`.
    pub fn rename_table(
        &self,
        before: impl Into<TableIdentifier>,
        after: impl Into<TableIdentifier>,
        options: &RenameTableOptions,
    ) -> Result<String> {
        let before = self.extract_table_details(before);
        let after = self.extract_table_details(after);
        if before.schema != after.schema && !options.change_schema {
            return Err(SqlGenError::validation(
                "To move a table between schemas, you must set `change_schema` to true.",
            ));
        }
        let sql = format!(
            "ALTER TABLE {} RENAME TO {}",
            self.quote_table(&before, None),
            self.quote_table(&after, None)
        );
        Ok(self.finish("renameTable", sql))
    }

    /// # Errors
    ///
    /// See [`QueryGenerator::attribute_sql`].
    pub fn add_column(
        &self,
        table: impl Into<TableIdentifier>,
        attribute: &AttributeDefinition,
    ) -> Result<String> {
        let table = self.extract_table_details(table);
        let sql = format!(
            "ALTER TABLE {} {} {} {};",
            self.quote_table(&table, None),
            self.dialect().add_column_keyword(),
            self.quote_identifier(&attribute.column_name),
            self.attribute_sql(attribute)?
        );
        Ok(self.finish("addColumn", sql))
    }

    /// # Errors
    ///
    /// Fails when an option is not supported.
    pub fn remove_column(
        &self,
        table: impl Into<TableIdentifier>,
        column: &str,
        options: &RemoveColumnOptions,
    ) -> Result<String> {
        let support = &self.supports().remove_column;
        self.ensure_supported(options.if_exists, support.if_exists, "IF EXISTS on column removal")?;
        self.ensure_supported(options.cascade, support.cascade, "CASCADE on column removal")?;
        let table = self.extract_table_details(table);
        let sql = join_sql_fragments([
            "ALTER TABLE",
            self.quote_table(&table, None).as_str(),
            "DROP COLUMN",
            if options.if_exists { "IF EXISTS" } else { "" },
            self.quote_identifier(column).as_str(),
            if options.cascade { "CASCADE" } else { "" },
        ]);
        Ok(self.finish("removeColumn", sql))
    }

    /// Changes a column's type and, when `allow_null` is set, its nullability.
    ///
    /// # Errors
    ///
    /// Fails when the type is not supported or the dialect cannot alter
    /// columns in place.
    pub fn change_column(
        &self,
        table: impl Into<TableIdentifier>,
        column: &str,
        data_type: &DataType,
        allow_null: Option<bool>,
    ) -> Result<String> {
        let table = self.extract_table_details(table);
        let sql = self.dialect().change_column(
            &self.quote_table(&table, None),
            &self.quote_identifier(column),
            &self.dialect().data_type_sql(data_type)?,
            allow_null,
        )?;
        Ok(self.finish("changeColumn", sql))
    }

    /// The name used when an index has none: table and field names joined by `_`.
    ///
    /// # Errors
    ///
    /// Expression fields have no name to derive one from.
    pub fn index_name(&self, table: &TableIdentifier, fields: &[FieldSpec]) -> Result<String> {
        let names = fields
            .iter()
            .map(|field| {
                field.name().ok_or_else(|| {
                    SqlGenError::validation(
                        "The index name must be provided explicitly if an expression is used in the index's fields",
                    )
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(format!("{}_{}", table.table_name.replace('.', "_"), names.join("_")).to_lowercase())
    }

    /// `CREATE INDEX`, or `ALTER TABLE ... ADD INDEX` on dialects that
    /// declare indexes through ALTER.
    ///
    /// # Errors
    ///
    /// Fails when a field has no name, or when an index feature is
    /// requested on a dialect without it.
    pub fn add_index(
        &self,
        table: impl Into<TableIdentifier>,
        options: &IndexOptions,
    ) -> Result<String> {
        let support = &self.supports().index;
        let via_alter = self.supports().index_via_alter;
        self.ensure_supported(
            options.concurrently,
            support.concurrently,
            "Concurrent index creation",
        )?;
        self.ensure_supported(options.using.is_some(), support.using > 0, "Index methods (USING)")?;
        self.ensure_supported(options.index_type.is_some(), support.index_type, "Index types")?;
        self.ensure_supported(options.parser.is_some(), support.parser, "Index parsers")?;
        self.ensure_supported(
            !options.include.is_empty(),
            support.include,
            "INCLUDE columns on indexes",
        )?;
        self.ensure_supported(options.where_clause.is_some(), support.partial, "Partial indexes")?;

        let table = self.extract_table_details(table);
        let quoted_table = self.quote_table(&table, None);
        let fields_sql = options
            .fields
            .iter()
            .map(|field| self.index_field_sql(field, options.operator.as_deref()))
            .collect::<Result<Vec<_>>>()?
            .join(", ");

        let name = match &options.name {
            Some(name) => name.clone(),
            None => self.index_name(&table, &options.fields)?,
        };
        let quoted_name = match &table.schema {
            Some(schema) if self.dialect().kind() == DialectKind::Db2 => {
                self.quote_table(&TableIdentifier::new(name).with_schema(schema.clone()), None)
            }
            _ => self.quote_identifier(&name),
        };
        let using = options.using.as_deref().map(|using| format!("USING {using}"));
        let concurrently = options.concurrently.then_some("CONCURRENTLY");

        let mut fragments: Vec<String> = Vec::new();
        if via_alter {
            fragments.extend([String::from("ALTER TABLE"), quoted_table.clone()]);
            fragments.extend(concurrently.map(String::from));
            fragments.push(String::from("ADD"));
        } else {
            fragments.push(String::from("CREATE"));
        }
        if options.unique {
            fragments.push(String::from("UNIQUE"));
        }
        fragments.extend(options.index_type.clone());
        fragments.push(String::from("INDEX"));
        if !via_alter {
            fragments.extend(concurrently.map(String::from));
        }
        fragments.push(quoted_name);
        if support.using == 1 {
            fragments.extend(using.clone());
        }
        if !via_alter {
            fragments.push(format!("ON {quoted_table}"));
        }
        if support.using == 2 {
            fragments.extend(using);
        }
        fragments.push(format!("({fields_sql})"));
        if let Some(parser) = &options.parser {
            fragments.push(format!("WITH PARSER {parser}"));
        }
        if !options.include.is_empty() {
            let include = options
                .include
                .iter()
                .map(|column| self.quote_identifier(column))
                .collect::<Vec<_>>();
            fragments.push(format!("INCLUDE ({})", include.join(", ")));
        }
        fragments.push(self.where_query(options.where_clause.as_ref(), EscapeOptions::default())?);

        Ok(self.finish("addIndex", join_sql_fragments(fragments)))
    }

    /// # Errors
    ///
    /// Fails when an option is not supported.
    pub fn remove_index(
        &self,
        table: impl Into<TableIdentifier>,
        name: &str,
        options: &RemoveIndexOptions,
    ) -> Result<String> {
        let kind = self.dialect().kind();
        let on_table = self.supports().index_via_alter || kind == DialectKind::MsSql;
        self.ensure_supported(
            options.concurrently,
            self.supports().index.concurrently,
            "Concurrent index removal",
        )?;
        self.ensure_supported(
            options.if_exists,
            self.supports().drop_table.if_exists && kind != DialectKind::MySql,
            "IF EXISTS on index removal",
        )?;

        let table = self.extract_table_details(table);
        let mut fragments = vec![String::from("DROP INDEX")];
        if options.concurrently {
            fragments.push(String::from("CONCURRENTLY"));
        }
        if options.if_exists {
            fragments.push(String::from("IF EXISTS"));
        }
        if on_table {
            fragments.push(self.quote_identifier(name));
            fragments.push(format!("ON {}", self.quote_table(&table, None)));
        } else {
            let mut index = TableIdentifier::new(name);
            index.schema.clone_from(&table.schema);
            fragments.push(self.quote_table(&index, None));
        }
        Ok(self.finish("removeIndex", join_sql_fragments(fragments)))
    }

    /// # Errors
    ///
    /// Fails on dialects without schemas or when an option is not supported.
    pub fn create_schema(&self, schema: &str, options: &CreateSchemaOptions) -> Result<String> {
        if !self.supports().schemas {
            return Err(self.unsupported("Schemas"));
        }
        let support = &self.supports().create_schema;
        self.ensure_supported(
            options.if_not_exists,
            support.if_not_exists,
            "IF NOT EXISTS on schema creation",
        )?;
        self.ensure_supported(options.replace, support.replace, "OR REPLACE on schema creation")?;
        self.ensure_supported(
            options.authorization.is_some(),
            support.authorization,
            "AUTHORIZATION on schema creation",
        )?;
        let sql = join_sql_fragments([
            String::from("CREATE"),
            String::from(if options.replace { "OR REPLACE" } else { "" }),
            String::from("SCHEMA"),
            String::from(if options.if_not_exists { "IF NOT EXISTS" } else { "" }),
            self.quote_identifier(schema),
            options
                .authorization
                .as_deref()
                .map(|role| format!("AUTHORIZATION {}", self.quote_identifier(role)))
                .unwrap_or_default(),
        ]);
        Ok(self.finish("createSchema", sql))
    }

    /// # Errors
    ///
    /// Fails on dialects without schemas or when an option is not supported.
    pub fn drop_schema(&self, schema: &str, options: &DropSchemaOptions) -> Result<String> {
        if !self.supports().schemas {
            return Err(self.unsupported("Schemas"));
        }
        let support = &self.supports().drop_schema;
        self.ensure_supported(options.if_exists, support.if_exists, "IF EXISTS on schema removal")?;
        self.ensure_supported(options.cascade, support.cascade, "CASCADE on schema removal")?;
        let sql = join_sql_fragments([
            "DROP SCHEMA",
            if options.if_exists { "IF EXISTS" } else { "" },
            self.quote_identifier(schema).as_str(),
            if options.cascade { "CASCADE" } else { "" },
        ]);
        Ok(self.finish("dropSchema", sql))
    }

    /// Statements emptying a table, more than one on dialects that reset
    /// identities separately.
    ///
    /// # Errors
    ///
    /// Fails when an option is not supported.
    pub fn truncate_table(
        &self,
        table: impl Into<TableIdentifier>,
        options: &TruncateOptions,
    ) -> Result<Vec<String>> {
        let support = &self.supports().truncate;
        self.ensure_supported(options.cascade, support.cascade, "CASCADE on truncation")?;
        self.ensure_supported(
            options.restart_identity,
            support.restart_identity,
            "RESTART IDENTITY on truncation",
        )?;
        let table = self.extract_table_details(table);
        self.dialect().truncate_table(
            &self.quote_table(&table, None),
            options.cascade,
            options.restart_identity,
        )
    }

    /// Query returning one row when the table exists.
    #[must_use]
    pub fn table_exists(&self, table: impl Into<TableIdentifier>) -> String {
        let table = self.extract_table_details(table);
        let dialect = self.dialect();
        let schema = table.schema.as_deref().map(|schema| dialect.escape_string(schema));
        dialect.table_exists(&dialect.escape_string(&table.table_name), schema.as_deref())
    }

    fn index_field_sql(&self, field: &FieldSpec, default_operator: Option<&str>) -> Result<String> {
        let descriptor = match field {
            FieldSpec::Expression(expression) => {
                return self.escape(expression, EscapeOptions::default());
            }
            FieldSpec::Column(name) => {
                let mut sql = self.quote_identifier(name);
                if let Some(operator) =
                    default_operator.filter(|_| self.supports().index.operator)
                {
                    sql.push(' ');
                    sql.push_str(operator);
                }
                return Ok(sql);
            }
            FieldSpec::Descriptor(descriptor) => descriptor,
        };

        let name = descriptor.name.as_deref().ok_or_else(|| {
            SqlGenError::validation(format!(
                "The following index field has no name: {descriptor:?}"
            ))
        })?;
        let support = &self.supports().index;
        let mut sql = self.quote_identifier(name);
        if let Some(collate) = descriptor.collate.as_deref().filter(|_| support.collate) {
            sql.push_str(" COLLATE ");
            sql.push_str(&self.quote_identifier(collate));
        }
        if let Some(operator) = descriptor
            .operator
            .as_deref()
            .or(default_operator)
            .filter(|_| support.operator)
        {
            sql.push(' ');
            sql.push_str(operator);
        }
        if let Some(length) = descriptor.length.filter(|length| support.length && *length > 0) {
            sql.push_str(&format!("({length})"));
        }
        if let Some(order) = descriptor.order {
            sql.push(' ');
            sql.push_str(order.as_sql());
        }
        Ok(sql)
    }
}
