//! Model metadata consumed by the generator.
//!
//! A [`ModelDefinition`] maps attribute names to columns and types, and lists
//! the unique indexes used to pick upsert conflict targets.

use indexmap::IndexMap;

use crate::expr::Expression;
use crate::types::DataType;

/// A normalized table reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableIdentifier {
    pub table_name: String,
    pub schema: Option<String>,
    /// Joins schema and table for dialects without schemas.
    pub delimiter: Option<String>,
}

impl TableIdentifier {
    #[must_use]
    pub fn new(table_name: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            schema: None,
            delimiter: None,
        }
    }

    #[must_use]
    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    #[must_use]
    pub fn with_delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.delimiter = Some(delimiter.into());
        self
    }
}

impl From<&str> for TableIdentifier {
    fn from(table_name: &str) -> Self {
        Self::new(table_name)
    }
}

impl From<String> for TableIdentifier {
    fn from(table_name: String) -> Self {
        Self::new(table_name)
    }
}

/// `(schema, table)`
impl From<(&str, &str)> for TableIdentifier {
    fn from((schema, table_name): (&str, &str)) -> Self {
        Self::new(table_name).with_schema(schema)
    }
}

impl From<&TableIdentifier> for TableIdentifier {
    fn from(table: &TableIdentifier) -> Self {
        table.clone()
    }
}

impl From<&ModelDefinition> for TableIdentifier {
    fn from(model: &ModelDefinition) -> Self {
        model.table.clone()
    }
}

/// Foreign key referential action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ForeignKeyAction {
    NoAction,
    Restrict,
    Cascade,
    SetNull,
    SetDefault,
}

impl ForeignKeyAction {
    /// Returns the SQL representation of the action.
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::NoAction => "NO ACTION",
            Self::Restrict => "RESTRICT",
            Self::Cascade => "CASCADE",
            Self::SetNull => "SET NULL",
            Self::SetDefault => "SET DEFAULT",
        }
    }
}

/// Constraint deferral mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Deferrable {
    InitiallyDeferred,
    InitiallyImmediate,
    NotDeferrable,
}

impl Deferrable {
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::InitiallyDeferred => "DEFERRABLE INITIALLY DEFERRED",
            Self::InitiallyImmediate => "DEFERRABLE INITIALLY IMMEDIATE",
            Self::NotDeferrable => "NOT DEFERRABLE",
        }
    }
}

/// A column-level foreign key.
#[derive(Debug, Clone, PartialEq)]
pub struct ForeignKeyRef {
    pub table: TableIdentifier,
    /// Referenced column, `id` when not set.
    pub column: Option<String>,
    pub on_delete: Option<ForeignKeyAction>,
    pub on_update: Option<ForeignKeyAction>,
    pub deferrable: Option<Deferrable>,
}

impl ForeignKeyRef {
    #[must_use]
    pub fn new(table: impl Into<TableIdentifier>) -> Self {
        Self {
            table: table.into(),
            column: None,
            on_delete: None,
            on_update: None,
            deferrable: None,
        }
    }

    #[must_use]
    pub fn column(mut self, column: impl Into<String>) -> Self {
        self.column = Some(column.into());
        self
    }

    #[must_use]
    pub const fn on_delete(mut self, action: ForeignKeyAction) -> Self {
        self.on_delete = Some(action);
        self
    }

    #[must_use]
    pub const fn on_update(mut self, action: ForeignKeyAction) -> Self {
        self.on_update = Some(action);
        self
    }

    #[must_use]
    pub const fn deferrable(mut self, deferrable: Deferrable) -> Self {
        self.deferrable = Some(deferrable);
        self
    }
}

/// A model attribute and the column that stores it.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeDefinition {
    pub name: String,
    pub column_name: String,
    pub data_type: DataType,
    pub allow_null: bool,
    pub primary_key: bool,
    pub auto_increment: bool,
    pub unique: bool,
    pub default_value: Option<Expression>,
    pub references: Option<ForeignKeyRef>,
}

impl AttributeDefinition {
    /// Creates a nullable attribute stored in a column of the same name.
    #[must_use]
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        let name = name.into();
        Self {
            column_name: name.clone(),
            name,
            data_type,
            allow_null: true,
            primary_key: false,
            auto_increment: false,
            unique: false,
            default_value: None,
            references: None,
        }
    }

    /// Stores the attribute in a differently named column.
    #[must_use]
    pub fn column(mut self, column_name: impl Into<String>) -> Self {
        self.column_name = column_name.into();
        self
    }

    #[must_use]
    pub const fn not_null(mut self) -> Self {
        self.allow_null = false;
        self
    }

    #[must_use]
    pub const fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.allow_null = false; // Primary keys are implicitly NOT NULL
        self
    }

    #[must_use]
    pub const fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }

    #[must_use]
    pub const fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    #[must_use]
    pub fn default_value(mut self, value: impl Into<Expression>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    #[must_use]
    pub fn references(mut self, reference: ForeignKeyRef) -> Self {
        self.references = Some(reference);
        self
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// An index or constraint field given as an object.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldDescriptor {
    /// Column name. Required; a descriptor without it is rejected.
    pub name: Option<String>,
    pub collate: Option<String>,
    /// Operator class (Postgres).
    pub operator: Option<String>,
    /// Prefix length (MySQL).
    pub length: Option<u32>,
    pub order: Option<SortOrder>,
}

impl FieldDescriptor {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn collate(mut self, collate: impl Into<String>) -> Self {
        self.collate = Some(collate.into());
        self
    }

    #[must_use]
    pub fn operator(mut self, operator: impl Into<String>) -> Self {
        self.operator = Some(operator.into());
        self
    }

    #[must_use]
    pub const fn length(mut self, length: u32) -> Self {
        self.length = Some(length);
        self
    }

    #[must_use]
    pub const fn order(mut self, order: SortOrder) -> Self {
        self.order = Some(order);
        self
    }
}

/// A field of an index or a constraint.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldSpec {
    Column(String),
    Expression(Expression),
    Descriptor(FieldDescriptor),
}

impl FieldSpec {
    /// The column name, if the field has one.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Column(name) => Some(name),
            Self::Descriptor(descriptor) => descriptor.name.as_deref(),
            Self::Expression(_) => None,
        }
    }
}

impl From<&str> for FieldSpec {
    fn from(name: &str) -> Self {
        Self::Column(name.to_string())
    }
}

impl From<String> for FieldSpec {
    fn from(name: String) -> Self {
        Self::Column(name)
    }
}

impl From<Expression> for FieldSpec {
    fn from(expression: Expression) -> Self {
        Self::Expression(expression)
    }
}

impl From<FieldDescriptor> for FieldSpec {
    fn from(descriptor: FieldDescriptor) -> Self {
        Self::Descriptor(descriptor)
    }
}

/// An index declared on a model. Only the unique ones matter to upserts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexDefinition {
    pub name: Option<String>,
    /// Column names.
    pub fields: Vec<String>,
    pub unique: bool,
}

impl IndexDefinition {
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: None,
            fields: fields.into_iter().map(Into::into).collect(),
            unique: false,
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
}

/// Attribute and index metadata of one table.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelDefinition {
    pub table: TableIdentifier,
    pub attributes: IndexMap<String, AttributeDefinition>,
    /// Declaration order; unique attributes add an implicit entry here.
    pub indexes: Vec<IndexDefinition>,
}

impl ModelDefinition {
    #[must_use]
    pub fn new(table: impl Into<TableIdentifier>) -> Self {
        Self {
            table: table.into(),
            attributes: IndexMap::new(),
            indexes: Vec::new(),
        }
    }

    /// Adds an attribute. A unique attribute also declares a one-column unique index.
    #[must_use]
    pub fn attribute(mut self, attribute: AttributeDefinition) -> Self {
        if attribute.unique {
            self.indexes.push(
                IndexDefinition::new([attribute.column_name.clone()])
                    .name(format!("{}_{}_unique", self.table.table_name, attribute.column_name))
                    .unique(),
            );
        }
        self.attributes.insert(attribute.name.clone(), attribute);
        self
    }

    #[must_use]
    pub fn index(mut self, index: IndexDefinition) -> Self {
        self.indexes.push(index);
        self
    }

    /// Looks an attribute up by attribute name, then by column name.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<&AttributeDefinition> {
        self.attributes.get(name).or_else(|| {
            self.attributes
                .values()
                .find(|attribute| attribute.column_name == name)
        })
    }

    /// The column storing `name`, or `name` itself for unknown attributes.
    #[must_use]
    pub fn column_name<'a>(&'a self, name: &'a str) -> &'a str {
        self.attributes
            .get(name)
            .map_or(name, |attribute| attribute.column_name.as_str())
    }

    /// Primary key column names in declaration order.
    #[must_use]
    pub fn primary_key_columns(&self) -> Vec<&str> {
        self.attributes
            .values()
            .filter(|attribute| attribute.primary_key)
            .map(|attribute| attribute.column_name.as_str())
            .collect()
    }

    /// Unique indexes with at least one field, in declaration order.
    pub fn unique_indexes(&self) -> impl Iterator<Item = &IndexDefinition> {
        self.indexes
            .iter()
            .filter(|index| index.unique && !index.fields.is_empty())
    }
}
