//! Condition rendering for WHERE, HAVING, ON and CHECK.

use super::QueryGenerator;
use crate::error::{Result, SqlGenError};
use crate::expr::{Condition, Expression, Operator, Value};
use crate::format::EscapeOptions;

impl QueryGenerator {
    /// Renders a condition without the `WHERE` keyword. Empty groups render
    /// as an empty string.
    ///
    /// # Errors
    ///
    /// Propagates formatting errors and rejects malformed `BETWEEN` operands.
    pub fn where_items(&self, condition: &Condition, options: EscapeOptions<'_>) -> Result<String> {
        match condition {
            Condition::And(items) => self.where_group(items, " AND ", options),
            Condition::Or(items) => self.where_group(items, " OR ", options),
            Condition::Not(inner) => {
                let sql = self.where_items(inner, options)?;
                Ok(if sql.is_empty() {
                    sql
                } else {
                    format!("NOT ({sql})")
                })
            }
            Condition::Raw(expression) => self.escape(expression, options),
            Condition::Compare { left, op, right } => {
                self.where_comparison(left, *op, right, options)
            }
        }
    }

    /// Renders `WHERE <condition>`, or nothing when the condition is empty.
    ///
    /// # Errors
    ///
    /// See [`QueryGenerator::where_items`].
    pub fn where_query(
        &self,
        condition: Option<&Condition>,
        options: EscapeOptions<'_>,
    ) -> Result<String> {
        let Some(condition) = condition else {
            return Ok(String::new());
        };
        let sql = self.where_items(condition, options)?;
        Ok(if sql.is_empty() {
            sql
        } else {
            format!("WHERE {sql}")
        })
    }

    fn where_group(
        &self,
        items: &[Condition],
        joiner: &str,
        options: EscapeOptions<'_>,
    ) -> Result<String> {
        let mut parts = Vec::with_capacity(items.len());
        for item in items {
            let sql = self.where_items(item, options)?;
            if sql.is_empty() {
                continue;
            }
            let nested_group = match item {
                Condition::And(inner) | Condition::Or(inner) => {
                    inner.iter().filter(|child| !child.is_empty()).count() > 1
                }
                _ => false,
            };
            parts.push(if nested_group { format!("({sql})") } else { sql });
        }
        Ok(parts.join(joiner))
    }

    fn where_comparison(
        &self,
        left: &Expression,
        op: Operator,
        right: &Expression,
        options: EscapeOptions<'_>,
    ) -> Result<String> {
        let left_sql = self.escape(left, options.without_type())?;

        // the attribute's type drives how the compared value is escaped
        let data_type = match (left, options.model) {
            (Expression::Attribute(name), Some(model)) => {
                model.find(name).map(|attribute| &attribute.data_type)
            }
            _ => None,
        };
        let right_options = EscapeOptions {
            data_type,
            ..options
        };

        match op {
            Operator::Eq if right.is_null() => Ok(format!("{left_sql} IS NULL")),
            Operator::Ne if right.is_null() => Ok(format!("{left_sql} IS NOT NULL")),
            Operator::In | Operator::NotIn => {
                let items = match right {
                    Expression::List(items) => Some(items.clone()),
                    Expression::Value(Value::Array(values)) => {
                        Some(values.iter().cloned().map(Expression::Value).collect())
                    }
                    _ => None,
                };
                match items {
                    Some(items) if items.is_empty() => Ok(if op == Operator::In {
                        format!("{left_sql} IN (NULL)")
                    } else {
                        String::new()
                    }),
                    Some(items) => Ok(format!(
                        "{left_sql} {} ({})",
                        op.as_str(),
                        self.escape_list(&items, right_options)?
                    )),
                    None => Ok(format!(
                        "{left_sql} {} {}",
                        op.as_str(),
                        self.escape(right, right_options)?
                    )),
                }
            }
            Operator::Between | Operator::NotBetween => {
                let Expression::List(bounds) = right else {
                    return Err(SqlGenError::validation(format!(
                        "{} expects a list of two values",
                        op.as_str()
                    )));
                };
                let [low, high] = bounds.as_slice() else {
                    return Err(SqlGenError::validation(format!(
                        "{} expects a list of two values, got {}",
                        op.as_str(),
                        bounds.len()
                    )));
                };
                Ok(format!(
                    "{left_sql} {} {} AND {}",
                    op.as_str(),
                    self.escape(low, right_options)?,
                    self.escape(high, right_options)?
                ))
            }
            Operator::Is | Operator::IsNot => {
                let value = match right {
                    Expression::Value(Value::Null) => String::from("NULL"),
                    Expression::Value(Value::Bool(value)) => self.dialect().escape_bool(*value),
                    _ => {
                        return Err(SqlGenError::validation(format!(
                            "{} only accepts NULL, true or false",
                            op.as_str()
                        )))
                    }
                };
                Ok(format!("{left_sql} {} {value}", op.as_str()))
            }
            _ => Ok(format!(
                "{left_sql} {} {}",
                op.as_str(),
                self.escape(right, right_options)?
            )),
        }
    }
}
