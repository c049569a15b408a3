//! Functions whose SQL depends on the target dialect.

use crate::dialect::Dialect;
use crate::error::{Result, SqlGenError};

use super::Expression;

/// The dialect-aware functions known to the formatter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DialectFnKind {
    /// Unwraps a JSON string into SQL text.
    UnquoteJson,
    /// Generates a random UUID.
    UuidV4,
}

impl DialectFnKind {
    /// Inclusive bounds on the number of arguments.
    #[must_use]
    pub const fn arity(self) -> (usize, usize) {
        match self {
            Self::UnquoteJson => (1, 1),
            Self::UuidV4 => (0, 0),
        }
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::UnquoteJson => "unquote",
            Self::UuidV4 => "uuidV4",
        }
    }

    /// Feature name used when the dialect rejects the function.
    pub(crate) const fn feature(self) -> &'static str {
        match self {
            Self::UnquoteJson => "JSON unquoting functions",
            Self::UuidV4 => "UUID V4 generation functions",
        }
    }

    /// Whether `dialect` can render this function.
    #[must_use]
    pub fn supports_dialect(self, dialect: &dyn Dialect) -> bool {
        let supports = dialect.supports();
        match self {
            Self::UnquoteJson => supports.json_operations,
            Self::UuidV4 => supports.uuid_v4_generation,
        }
    }
}

/// A call to a [`DialectFnKind`].
///
/// The argument count is checked when the node is built, so formatting only
/// has to deal with dialect support.
#[derive(Debug, Clone, PartialEq)]
pub struct DialectFn {
    kind: DialectFnKind,
    args: Vec<Expression>,
}

impl DialectFn {
    /// # Errors
    ///
    /// Returns a validation error when `args` does not fit the function's arity.
    pub fn new(kind: DialectFnKind, args: Vec<Expression>) -> Result<Self> {
        let (min, max) = kind.arity();
        if args.len() < min || args.len() > max {
            let expected = if min == max {
                min.to_string()
            } else {
                format!("between {min} and {max}")
            };
            return Err(SqlGenError::validation(format!(
                "Function {} expects {expected} argument(s), but received {}",
                kind.name(),
                args.len()
            )));
        }
        Ok(Self { kind, args })
    }

    pub(crate) fn unquote_json(argument: Expression) -> Self {
        Self {
            kind: DialectFnKind::UnquoteJson,
            args: vec![argument],
        }
    }

    pub(crate) const fn uuid_v4() -> Self {
        Self {
            kind: DialectFnKind::UuidV4,
            args: Vec::new(),
        }
    }

    #[must_use]
    pub const fn kind(&self) -> DialectFnKind {
        self.kind
    }

    #[must_use]
    pub fn args(&self) -> &[Expression] {
        &self.args
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DialectKind;

    #[test]
    fn test_arity_is_checked_at_construction() {
        assert!(DialectFn::new(DialectFnKind::UnquoteJson, vec![]).is_err());
        assert!(DialectFn::new(DialectFnKind::UnquoteJson, vec![Expression::from(1)]).is_ok());
        assert!(DialectFn::new(DialectFnKind::UuidV4, vec![Expression::from(1)]).is_err());
    }

    #[test]
    fn test_dialect_support() {
        assert!(DialectFnKind::UuidV4.supports_dialect(DialectKind::Postgres.dialect()));
        assert!(!DialectFnKind::UuidV4.supports_dialect(DialectKind::Sqlite.dialect()));
        assert!(DialectFnKind::UnquoteJson.supports_dialect(DialectKind::MySql.dialect()));
        assert!(!DialectFnKind::UnquoteJson.supports_dialect(DialectKind::Oracle.dialect()));
    }
}
