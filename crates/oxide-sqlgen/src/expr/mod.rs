//! Expression AST.
//!
//! Non-literal SQL fragments are modelled as a closed set of [`Expression`]
//! variants. Nodes never carry dialect state; everything dialect specific is
//! resolved when [`crate::QueryGenerator::escape`] formats them.

mod attribute;
pub mod builders;
mod condition;
mod dialect_fn;

use chrono::{DateTime, NaiveDate, Utc};

pub use attribute::parse_attribute;
pub use condition::{Condition, Operator};
pub use dialect_fn::{DialectFn, DialectFnKind};

use crate::types::DataType;

/// A plain value, escaped by the dialect's scalar rules.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
    Date(NaiveDate),
    DateTime(DateTime<Utc>),
    /// A JSON document, always rendered as its serialized text.
    Json(serde_json::Value),
    Array(Vec<Value>),
}

impl Value {
    /// Builds a [`Value::Array`] from anything convertible to values.
    pub fn array<I, T>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Self>,
    {
        Self::Array(items.into_iter().map(Into::into).collect())
    }

    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

macro_rules! impl_from_for_value {
    ($($ty:ty => $variant:ident $(via $conv:path)?),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(value: $ty) -> Self {
                    Self::$variant($($conv)?(value))
                }
            }

            impl From<$ty> for Expression {
                fn from(value: $ty) -> Self {
                    Self::Value(Value::from(value))
                }
            }
        )*
    };
}

impl_from_for_value! {
    bool => Bool,
    i8 => Int via i64::from,
    i16 => Int via i64::from,
    i32 => Int via i64::from,
    i64 => Int,
    u8 => Int via i64::from,
    u16 => Int via i64::from,
    u32 => Int via i64::from,
    f32 => Float via f64::from,
    f64 => Float,
    String => Text,
    Vec<u8> => Bytes,
    NaiveDate => Date,
    DateTime<Utc> => DateTime,
    serde_json::Value => Json,
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<&str> for Expression {
    fn from(value: &str) -> Self {
        Self::Value(Value::from(value))
    }
}

impl<T: Into<Self>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

impl<T: Into<Value>> From<Option<T>> for Expression {
    fn from(value: Option<T>) -> Self {
        Self::Value(value.map_or(Value::Null, Into::into))
    }
}

impl From<Value> for Expression {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

impl From<Condition> for Expression {
    fn from(condition: Condition) -> Self {
        Self::Where(Box::new(condition))
    }
}

impl From<DialectFn> for Expression {
    fn from(function: DialectFn) -> Self {
        Self::DialectFn(function)
    }
}

/// One step of a JSON path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum JsonPathSegment {
    Key(String),
    Index(usize),
}

/// A piece of a [`Expression::Literal`].
#[derive(Debug, Clone, PartialEq)]
pub enum LiteralPart {
    /// Raw SQL, emitted verbatim.
    Sql(String),
    /// A nested expression, formatted in place.
    Expr(Expression),
}

/// A non-literal SQL fragment.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// A dot separated identifier, each part quoted on its own.
    Identifier(Vec<String>),
    /// A model attribute, mapped to its column when a model is known.
    Attribute(String),
    /// An attribute reached through eager-loaded associations.
    AssociationPath {
        associations: Vec<String>,
        attribute: String,
    },
    /// Extraction of a JSON sub-document.
    JsonPath {
        expression: Box<Expression>,
        path: Vec<JsonPathSegment>,
    },
    Cast {
        expression: Box<Expression>,
        target: DataType,
    },
    /// A plain function call.
    Fn { name: String, args: Vec<Expression> },
    /// A function whose rendering depends on the dialect.
    DialectFn(DialectFn),
    /// Raw SQL interleaved with nested expressions.
    Literal(Vec<LiteralPart>),
    /// A parenthesized, comma separated list.
    List(Vec<Expression>),
    Value(Value),
    Where(Box<Condition>),
    /// A column reference given as `table.column`; `*` stays unquoted.
    Col(String),
}

impl Expression {
    /// Whether this node is a plain value rather than SQL.
    #[must_use]
    pub const fn is_value(&self) -> bool {
        matches!(self, Self::Value(_))
    }

    /// Whether this node is a `NULL` value.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Value(Value::Null))
    }
}

/// Builds a [`Expression::Literal`] from a template with `{}` holes.
///
/// Every argument becomes a nested expression; plain values are therefore
/// escaped when the literal is formatted.
///
/// ```
/// use oxide_sqlgen::sql;
///
/// let literal = sql!("SELECT * FROM users WHERE id = {} AND role = {}", 5, "admin").unwrap();
/// ```
#[macro_export]
macro_rules! sql {
    ($template:expr $(, $arg:expr)* $(,)?) => {
        $crate::expr::builders::template(
            $template,
            ::std::vec![$($crate::expr::Expression::from($arg)),*],
        )
    };
}
