//! Error types for SQL generation and parameter mapping.

/// Broad classification of a [`SqlGenError`].
///
/// Callers use this to tell "fix your input" apart from "this dialect
/// cannot do that".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The active dialect does not support the requested feature.
    CapabilityViolation,
    /// The input does not carry enough information to produce SQL.
    Validation,
    /// A placeholder could not be resolved while scanning SQL text.
    ParameterMapping,
    /// The dialect does not provide an implementation for this statement.
    NotImplemented,
}

/// Errors raised while generating SQL or mapping its parameters.
#[derive(Debug, thiserror::Error)]
pub enum SqlGenError {
    /// A feature was requested that the dialect does not declare.
    #[error("{feature} are not supported by {dialect} dialect")]
    Unsupported {
        /// Dialect name.
        dialect: &'static str,
        /// Human readable feature name.
        feature: String,
    },

    /// Input is structurally insufficient.
    #[error("{0}")]
    Validation(String),

    /// A string literal was opened but never closed.
    #[error("The following SQL query includes an unterminated string literal:\n{sql}")]
    UnterminatedString {
        /// The offending SQL.
        sql: String,
    },

    /// A `:name` replacement has no value.
    #[error("Named replacement \":{name}\" has no entry in the replacement map.")]
    MissingNamedReplacement {
        /// Name of the replacement.
        name: String,
    },

    /// A `?` replacement has no value.
    #[error(
        "Positional replacement (?) {index} has no entry in the replacement map (replacements[{index}] is undefined)."
    )]
    MissingPositionalReplacement {
        /// Zero-based index of the placeholder.
        index: usize,
    },

    /// A `?` replacement appeared inside a literal.
    #[error(
        "The following literal includes positional replacements (?). Only named replacements (:name) are allowed in literal() because we cannot guarantee the order in which they will be evaluated:\n{sql}"
    )]
    PositionalReplacementInLiteral {
        /// The literal SQL.
        sql: String,
    },

    /// A `$name` bind parameter has no value.
    #[error("Bind parameter \"${name}\" has no value in the bind map.")]
    MissingBindParameter {
        /// Name of the bind parameter.
        name: String,
    },

    /// The dialect has no implementation for this method.
    #[error("{method} has not been implemented in {dialect}.")]
    NotImplemented {
        /// Method or statement name.
        method: &'static str,
        /// Dialect name.
        dialect: &'static str,
    },

    /// Capability overrides did not match the capability schema.
    #[error("Invalid capability overrides: {0}")]
    Capabilities(#[from] serde_json::Error),
}

impl SqlGenError {
    /// Builds an [`SqlGenError::Unsupported`].
    pub fn unsupported(dialect: &'static str, feature: impl Into<String>) -> Self {
        Self::Unsupported {
            dialect,
            feature: feature.into(),
        }
    }

    /// Builds an [`SqlGenError::Validation`].
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Returns the error's classification.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Unsupported { .. } => ErrorKind::CapabilityViolation,
            Self::Validation(_) | Self::Capabilities(_) => ErrorKind::Validation,
            Self::UnterminatedString { .. }
            | Self::MissingNamedReplacement { .. }
            | Self::MissingPositionalReplacement { .. }
            | Self::PositionalReplacementInLiteral { .. }
            | Self::MissingBindParameter { .. } => ErrorKind::ParameterMapping,
            Self::NotImplemented { .. } => ErrorKind::NotImplemented,
        }
    }
}

/// Result type for SQL generation.
pub type Result<T> = std::result::Result<T, SqlGenError>;
