//! Boolean conditions used by WHERE, HAVING, ON and CHECK clauses.

use super::Expression;

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    Like,
    NotLike,
    In,
    NotIn,
    Is,
    IsNot,
    Between,
    NotBetween,
}

impl Operator {
    /// Returns the SQL representation of the operator.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "!=",
            Self::Gt => ">",
            Self::Gte => ">=",
            Self::Lt => "<",
            Self::Lte => "<=",
            Self::Like => "LIKE",
            Self::NotLike => "NOT LIKE",
            Self::In => "IN",
            Self::NotIn => "NOT IN",
            Self::Is => "IS",
            Self::IsNot => "IS NOT",
            Self::Between => "BETWEEN",
            Self::NotBetween => "NOT BETWEEN",
        }
    }
}

/// A boolean condition tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    And(Vec<Condition>),
    Or(Vec<Condition>),
    Not(Box<Condition>),
    Compare {
        left: Expression,
        op: Operator,
        right: Expression,
    },
    /// An expression used as a boolean as is.
    Raw(Expression),
}

macro_rules! comparison {
    ($($(#[$meta:meta])* $name:ident => $op:ident),* $(,)?) => {
        $(
            $(#[$meta])*
            pub fn $name(left: impl Into<Expression>, right: impl Into<Expression>) -> Self {
                Self::compare(left, Operator::$op, right)
            }
        )*
    };
}

impl Condition {
    pub fn compare(
        left: impl Into<Expression>,
        op: Operator,
        right: impl Into<Expression>,
    ) -> Self {
        Self::Compare {
            left: left.into(),
            op,
            right: right.into(),
        }
    }

    comparison! {
        /// `left = right`, or `left IS NULL` when `right` is `NULL`.
        eq => Eq,
        /// `left != right`, or `left IS NOT NULL` when `right` is `NULL`.
        ne => Ne,
        gt => Gt,
        gte => Gte,
        lt => Lt,
        lte => Lte,
        like => Like,
        not_like => NotLike,
        /// `right` must be a list or an array value.
        in_list => In,
        not_in_list => NotIn,
        is => Is,
        is_not => IsNot,
    }

    /// `expr BETWEEN low AND high`.
    pub fn between(
        expression: impl Into<Expression>,
        low: impl Into<Expression>,
        high: impl Into<Expression>,
    ) -> Self {
        Self::compare(
            expression,
            Operator::Between,
            Expression::List(vec![low.into(), high.into()]),
        )
    }

    pub fn and(conditions: impl IntoIterator<Item = Self>) -> Self {
        Self::And(conditions.into_iter().collect())
    }

    pub fn or(conditions: impl IntoIterator<Item = Self>) -> Self {
        Self::Or(conditions.into_iter().collect())
    }

    /// Whether the condition renders to nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::And(items) | Self::Or(items) => items.iter().all(Self::is_empty),
            Self::Not(inner) => inner.is_empty(),
            Self::Compare { .. } | Self::Raw(_) => false,
        }
    }
}

impl core::ops::Not for Condition {
    type Output = Self;

    fn not(self) -> Self {
        Self::Not(Box::new(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::Value;

    #[test]
    fn test_builders() {
        let condition = Condition::eq(Expression::Attribute("id".into()), 5);
        assert_eq!(
            condition,
            Condition::Compare {
                left: Expression::Attribute("id".into()),
                op: Operator::Eq,
                right: Expression::Value(Value::Int(5)),
            }
        );
    }

    #[test]
    fn test_is_empty() {
        assert!(Condition::and([]).is_empty());
        assert!(Condition::and([Condition::or([])]).is_empty());
        assert!(!Condition::and([Condition::eq(Expression::Attribute("a".into()), 1)]).is_empty());
    }
}
