//! Pure constructors for [`Expression`] nodes.
//!
//! Re-exported as [`crate::sql`], so callers write `sql::col("users.id")`.

use crate::error::{Result, SqlGenError};
use crate::types::DataType;

use super::{
    parse_attribute, Condition, DialectFn, Expression, JsonPathSegment, LiteralPart, Value,
};

/// Parses the attribute mini-syntax, see [`parse_attribute`].
///
/// # Errors
///
/// Returns a validation error for malformed input.
pub fn attribute(name: &str) -> Result<Expression> {
    parse_attribute(name)
}

pub fn cast(expression: impl Into<Expression>, target: DataType) -> Expression {
    Expression::Cast {
        expression: Box::new(expression.into()),
        target,
    }
}

/// A function call. Arguments that are plain values are escaped.
pub fn func<I, A>(name: impl Into<String>, args: I) -> Expression
where
    I: IntoIterator<Item = A>,
    A: Into<Expression>,
{
    Expression::Fn {
        name: name.into(),
        args: args.into_iter().map(Into::into).collect(),
    }
}

pub fn col(name: impl Into<String>) -> Expression {
    Expression::Col(name.into())
}

pub fn identifier<I, S>(parts: I) -> Expression
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    Expression::Identifier(parts.into_iter().map(Into::into).collect())
}

/// Raw SQL, emitted verbatim.
pub fn literal(sql: impl Into<String>) -> Expression {
    Expression::Literal(vec![LiteralPart::Sql(sql.into())])
}

pub fn json_path(expression: impl Into<Expression>, path: Vec<JsonPathSegment>) -> Expression {
    Expression::JsonPath {
        expression: Box::new(expression.into()),
        path,
    }
}

pub fn list<I, A>(items: I) -> Expression
where
    I: IntoIterator<Item = A>,
    A: Into<Expression>,
{
    Expression::List(items.into_iter().map(Into::into).collect())
}

pub fn where_clause(condition: Condition) -> Expression {
    Expression::Where(Box::new(condition))
}

pub fn value(value: impl Into<Value>) -> Expression {
    Expression::Value(value.into())
}

/// Unwraps a JSON string. Extraction paths are unquoted in place.
pub fn unquote(expression: impl Into<Expression>) -> Expression {
    Expression::DialectFn(DialectFn::unquote_json(expression.into()))
}

pub const fn uuid_v4() -> Expression {
    Expression::DialectFn(DialectFn::uuid_v4())
}

/// Splits `template` on `{}` and interleaves `args`; backs the [`crate::sql!`] macro.
///
/// # Errors
///
/// Returns a validation error when the number of holes and arguments differ.
pub fn template(template: &str, args: Vec<Expression>) -> Result<Expression> {
    let pieces: Vec<&str> = template.split("{}").collect();
    if pieces.len() != args.len() + 1 {
        return Err(SqlGenError::validation(format!(
            "sql template has {} placeholder(s) but received {} argument(s)",
            pieces.len() - 1,
            args.len()
        )));
    }

    let mut parts = Vec::with_capacity(pieces.len() + args.len());
    let mut args = args.into_iter();
    for (index, piece) in pieces.into_iter().enumerate() {
        if index > 0 {
            if let Some(arg) = args.next() {
                parts.push(LiteralPart::Expr(arg));
            }
        }
        if !piece.is_empty() {
            parts.push(LiteralPart::Sql(piece.to_string()));
        }
    }
    Ok(Expression::Literal(parts))
}
