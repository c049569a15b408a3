//! Table constraints.

use core::fmt;
use core::str::FromStr;

use super::{join_sql_fragments, QueryGenerator, RemoveConstraintOptions};
use crate::error::{Result, SqlGenError};
use crate::expr::{Condition, Expression};
use crate::format::EscapeOptions;
use crate::model::{Deferrable, FieldSpec, ForeignKeyAction, TableIdentifier};

/// The constraint kinds a dialect may support.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConstraintType {
    Check,
    Unique,
    Default,
    PrimaryKey,
    ForeignKey,
}

impl ConstraintType {
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Check => "CHECK",
            Self::Unique => "UNIQUE",
            Self::Default => "DEFAULT",
            Self::PrimaryKey => "PRIMARY KEY",
            Self::ForeignKey => "FOREIGN KEY",
        }
    }

    /// Suffix of generated constraint names.
    const fn name_suffix(self) -> &'static str {
        match self {
            Self::Check => "ck",
            Self::Unique => "uk",
            Self::Default => "df",
            Self::PrimaryKey => "pk",
            Self::ForeignKey => "fk",
        }
    }

    const fn feature(self) -> &'static str {
        match self {
            Self::Check => "Check constraints",
            Self::Unique => "Unique constraints",
            Self::Default => "Default constraints",
            Self::PrimaryKey => "Primary key constraints",
            Self::ForeignKey => "Foreign key constraints",
        }
    }
}

impl fmt::Display for ConstraintType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

impl FromStr for ConstraintType {
    type Err = SqlGenError;

    /// Case-insensitive. Prefer [`QueryGenerator::constraint_type`], whose
    /// error names the dialect.
    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "CHECK" => Ok(Self::Check),
            "UNIQUE" => Ok(Self::Unique),
            "DEFAULT" => Ok(Self::Default),
            "PRIMARY KEY" => Ok(Self::PrimaryKey),
            "FOREIGN KEY" => Ok(Self::ForeignKey),
            _ => Err(SqlGenError::validation(format!("Unknown constraint type \"{s}\""))),
        }
    }
}

/// Target of a foreign key constraint: exactly one of `field` and `fields`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstraintReferences {
    pub table: TableIdentifier,
    pub field: Option<String>,
    pub fields: Vec<String>,
}

impl ConstraintReferences {
    /// References a single column.
    #[must_use]
    pub fn field(table: impl Into<TableIdentifier>, field: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            field: Some(field.into()),
            fields: Vec::new(),
        }
    }

    /// References a composite key.
    pub fn fields<I, S>(table: impl Into<TableIdentifier>, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            table: table.into(),
            field: None,
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }
}

/// Description of one constraint.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstraintSpec {
    pub kind: ConstraintType,
    pub fields: Vec<FieldSpec>,
    /// Generated from the table, the fields and the kind when missing.
    pub name: Option<String>,
    /// Body of a CHECK constraint.
    pub where_clause: Option<Condition>,
    pub references: Option<ConstraintReferences>,
    pub on_update: Option<ForeignKeyAction>,
    pub on_delete: Option<ForeignKeyAction>,
    pub deferrable: Option<Deferrable>,
    /// Value of a DEFAULT constraint.
    pub default_value: Option<Expression>,
}

impl ConstraintSpec {
    pub fn new<I, F>(kind: ConstraintType, fields: I) -> Self
    where
        I: IntoIterator<Item = F>,
        F: Into<FieldSpec>,
    {
        Self {
            kind,
            fields: fields.into_iter().map(Into::into).collect(),
            name: None,
            where_clause: None,
            references: None,
            on_update: None,
            on_delete: None,
            deferrable: None,
            default_value: None,
        }
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn where_clause(mut self, condition: Condition) -> Self {
        self.where_clause = Some(condition);
        self
    }

    #[must_use]
    pub fn references(mut self, references: ConstraintReferences) -> Self {
        self.references = Some(references);
        self
    }

    #[must_use]
    pub const fn on_update(mut self, action: ForeignKeyAction) -> Self {
        self.on_update = Some(action);
        self
    }

    #[must_use]
    pub const fn on_delete(mut self, action: ForeignKeyAction) -> Self {
        self.on_delete = Some(action);
        self
    }

    #[must_use]
    pub const fn deferrable(mut self, deferrable: Deferrable) -> Self {
        self.deferrable = Some(deferrable);
        self
    }

    #[must_use]
    pub fn default_value(mut self, value: impl Into<Expression>) -> Self {
        self.default_value = Some(value.into());
        self
    }
}

/// `SET CONSTRAINTS ... DEFERRED|IMMEDIATE`. An empty list means `ALL`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConstraintChecking {
    Deferred(Vec<String>),
    Immediate(Vec<String>),
}

impl QueryGenerator {
    /// Parses a constraint type name. Unknown names are reported against
    /// the active dialect.
    ///
    /// # Errors
    ///
    /// Returns [`SqlGenError::Unsupported`] for unknown names.
    pub fn constraint_type(&self, name: &str) -> Result<ConstraintType> {
        name.parse()
            .map_err(|_| self.unsupported(format!("{} constraints", name.to_ascii_uppercase())))
    }

    /// Renders `CONSTRAINT <name> <body>` for use in `ALTER TABLE ... ADD`.
    ///
    /// # Errors
    ///
    /// Fails when the dialect lacks the constraint kind or one of the
    /// requested modifiers, and when the description is incomplete.
    pub fn get_constraint_snippet(
        &self,
        table: impl Into<TableIdentifier>,
        spec: &ConstraintSpec,
    ) -> Result<String> {
        let support = &self.supports().constraints;
        let supported = match spec.kind {
            ConstraintType::Check => support.check,
            ConstraintType::Unique => support.unique,
            ConstraintType::Default => support.default,
            ConstraintType::PrimaryKey => support.primary_key,
            ConstraintType::ForeignKey => support.foreign_key,
        };
        if !supported {
            return Err(self.unsupported(spec.kind.feature()));
        }

        let references = match spec.kind {
            ConstraintType::ForeignKey => Some(validate_references(spec.references.as_ref())?),
            _ => None,
        };

        let quoted_fields = spec
            .fields
            .iter()
            .map(|field| self.quote_constraint_field(field))
            .collect::<Result<Vec<_>>>()?;
        let table = self.extract_table_details(table);
        let fields_sql = quoted_fields.join(", ");
        let constraint_name = |suffix: &str| -> Result<String> {
            if let Some(name) = &spec.name {
                return Ok(self.quote_identifier(name));
            }
            let parts = spec
                .fields
                .iter()
                .map(|field| {
                    field.name().ok_or_else(|| {
                        SqlGenError::validation(
                            "The constraint name must be provided explicitly if an expression is used in the constraint's fields",
                        )
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            Ok(self.quote_identifier(&format!("{}_{}_{suffix}", table.table_name, parts.join("_"))))
        };

        let snippet = match spec.kind {
            ConstraintType::Check => {
                let condition = spec.where_clause.as_ref().ok_or_else(|| {
                    SqlGenError::validation("A CHECK constraint requires a where condition")
                })?;
                let name = constraint_name(spec.kind.name_suffix())?;
                format!(
                    "CONSTRAINT {name} CHECK ({})",
                    self.where_items(condition, EscapeOptions::default())?
                )
            }
            ConstraintType::Unique | ConstraintType::PrimaryKey => {
                let name = constraint_name(spec.kind.name_suffix())?;
                join_sql_fragments([
                    format!("CONSTRAINT {name} {} ({fields_sql})", spec.kind.as_sql()),
                    self.deferrable_snippet(spec.deferrable)?,
                ])
            }
            ConstraintType::Default => {
                let value = spec.default_value.as_ref().ok_or_else(|| {
                    SqlGenError::validation(
                        "Default value must be specified for DEFAULT CONSTRAINT",
                    )
                })?;
                let column = quoted_fields.first().ok_or_else(|| {
                    SqlGenError::validation("A DEFAULT constraint requires one field")
                })?;
                let name = constraint_name(spec.kind.name_suffix())?;
                format!(
                    "CONSTRAINT {name} DEFAULT ({}) FOR {column}",
                    self.escape(value, EscapeOptions::default())?
                )
            }
            ConstraintType::ForeignKey => {
                let (references, columns) = references.ok_or_else(invalid_references)?;
                let quoted_references = columns
                    .iter()
                    .map(|column| self.quote_identifier(column))
                    .collect::<Vec<_>>()
                    .join(", ");
                let referenced_table = self.extract_table_details(&references.table);
                let name = constraint_name(&format!("{}_fk", referenced_table.table_name))?;

                let mut fragments = vec![format!(
                    "CONSTRAINT {name} FOREIGN KEY ({fields_sql}) REFERENCES {} ({quoted_references})",
                    self.quote_table(&referenced_table, None)
                )];
                fragments.push(self.referential_actions(spec.on_update, spec.on_delete)?);
                fragments.push(self.deferrable_snippet(spec.deferrable)?);
                join_sql_fragments(fragments)
            }
        };
        Ok(snippet)
    }

    /// `ALTER TABLE <table> ADD CONSTRAINT ...`
    ///
    /// # Errors
    ///
    /// See [`QueryGenerator::get_constraint_snippet`].
    pub fn add_constraint(
        &self,
        table: impl Into<TableIdentifier>,
        spec: &ConstraintSpec,
    ) -> Result<String> {
        if !self.supports().constraints.add {
            return Err(self.unsupported("Add constraint queries"));
        }
        let table = self.extract_table_details(table);
        Ok(join_sql_fragments([
            String::from("ALTER TABLE"),
            self.quote_table(&table, None),
            String::from("ADD"),
            self.get_constraint_snippet(&table, spec)?,
        ]))
    }

    /// `ALTER TABLE <table> DROP CONSTRAINT <name>`
    ///
    /// # Errors
    ///
    /// Fails when the dialect cannot drop constraints or honor an option.
    pub fn remove_constraint(
        &self,
        table: impl Into<TableIdentifier>,
        name: &str,
        options: &RemoveConstraintOptions,
    ) -> Result<String> {
        let support = &self.supports().constraints;
        if !support.remove {
            return Err(self.unsupported("Remove constraint queries"));
        }
        self.ensure_supported(
            options.if_exists,
            support.remove_options.if_exists,
            "IF EXISTS on constraint removal",
        )?;
        self.ensure_supported(
            options.cascade,
            support.remove_options.cascade,
            "CASCADE on constraint removal",
        )?;

        let table = self.extract_table_details(table);
        Ok(join_sql_fragments([
            String::from("ALTER TABLE"),
            self.quote_table(&table, None),
            String::from("DROP CONSTRAINT"),
            String::from(if options.if_exists { "IF EXISTS" } else { "" }),
            self.quote_identifier(name),
            String::from(if options.cascade { "CASCADE" } else { "" }),
        ]))
    }

    /// `SET CONSTRAINTS <names|ALL> DEFERRED|IMMEDIATE`
    ///
    /// # Errors
    ///
    /// Fails on dialects without deferrable constraints.
    pub fn set_constraint_checking(&self, checking: &ConstraintChecking) -> Result<String> {
        if !self.supports().constraints.deferrable {
            return Err(self.unsupported("Deferrable constraints"));
        }
        let (names, mode) = match checking {
            ConstraintChecking::Deferred(names) => (names, "DEFERRED"),
            ConstraintChecking::Immediate(names) => (names, "IMMEDIATE"),
        };
        let target = if names.is_empty() {
            String::from("ALL")
        } else {
            names
                .iter()
                .map(|name| self.quote_identifier(name))
                .collect::<Vec<_>>()
                .join(", ")
        };
        Ok(format!("SET CONSTRAINTS {target} {mode}"))
    }

    /// `ON UPDATE ... ON DELETE ...`, each gated on its own capability.
    pub(crate) fn referential_actions(
        &self,
        on_update: Option<ForeignKeyAction>,
        on_delete: Option<ForeignKeyAction>,
    ) -> Result<String> {
        let support = &self.supports().constraints;
        let mut fragments = Vec::new();
        if let Some(action) = on_update {
            if !support.on_update {
                return Err(self.unsupported("Foreign key constraints with ON UPDATE"));
            }
            self.check_referential_action(action)?;
            fragments.push(format!("ON UPDATE {}", action.as_sql()));
        }
        if let Some(action) = on_delete {
            self.check_referential_action(action)?;
            fragments.push(format!("ON DELETE {}", action.as_sql()));
        }
        Ok(fragments.join(" "))
    }

    pub(crate) fn deferrable_snippet(&self, deferrable: Option<Deferrable>) -> Result<String> {
        match deferrable {
            None => Ok(String::new()),
            Some(_) if !self.supports().constraints.deferrable => {
                Err(self.unsupported("Deferrable constraints"))
            }
            Some(deferrable) => Ok(deferrable.as_sql().to_string()),
        }
    }

    fn check_referential_action(&self, action: ForeignKeyAction) -> Result<()> {
        self.ensure_supported(
            action == ForeignKeyAction::Restrict,
            self.supports().constraints.restrict,
            "RESTRICT referential actions",
        )
    }

    fn quote_constraint_field(&self, field: &FieldSpec) -> Result<String> {
        match field {
            FieldSpec::Column(name) => Ok(self.quote_identifier(name)),
            FieldSpec::Expression(expression) => self.escape(expression, EscapeOptions::default()),
            FieldSpec::Descriptor(descriptor) => descriptor
                .name
                .as_deref()
                .map(|name| self.quote_identifier(name))
                .ok_or_else(|| {
                    SqlGenError::validation(format!(
                        "The following index field has no name: {descriptor:?}"
                    ))
                }),
        }
    }
}

/// The referenced table and its columns, from exactly one of `field` or `fields`.
fn validate_references(
    references: Option<&ConstraintReferences>,
) -> Result<(&ConstraintReferences, Vec<&str>)> {
    let references = references.ok_or_else(invalid_references)?;
    let columns = match (&references.field, references.fields.as_slice()) {
        (Some(field), []) => vec![field.as_str()],
        (None, fields) if !fields.is_empty() => fields.iter().map(String::as_str).collect(),
        _ => return Err(invalid_references()),
    };
    Ok((references, columns))
}

fn invalid_references() -> SqlGenError {
    SqlGenError::validation(
        "Invalid foreign key constraint options. `references` must name a table and exactly one of `field` or `fields`",
    )
}
