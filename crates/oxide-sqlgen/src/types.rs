//! Column data types.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Logical column types.
///
/// [`DataType::to_sql`] gives the ANSI spelling; dialects translate through
/// [`crate::Dialect::data_type_sql`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    // Integer types
    /// Small integer (2 bytes).
    Smallint,
    /// Integer (4 bytes).
    Integer,
    /// Big integer (8 bytes).
    Bigint,

    // Floating point
    /// Real (4-byte float).
    Real,
    /// Double precision (8-byte float).
    Double,
    /// Decimal with precision and scale.
    Decimal {
        /// Total number of digits.
        precision: Option<u16>,
        /// Number of digits after decimal point.
        scale: Option<u16>,
    },

    // String types
    /// Fixed-length character string.
    Char(Option<u32>),
    /// Variable-length character string.
    Varchar(Option<u32>),
    /// Text (variable length, no limit).
    Text,

    /// Binary large object.
    Blob,

    // Date/time types
    /// Date.
    Date,
    /// Time.
    Time,
    /// Timestamp with time zone.
    DateTime,

    /// Boolean.
    Boolean,

    /// JSON document.
    Json,
    /// Binary JSON (Postgres).
    Jsonb,
    /// UUID.
    Uuid,
    /// Array of another type.
    Array(Box<DataType>),

    /// Database-specific type, emitted verbatim.
    Custom(String),
}

impl DataType {
    /// Returns the ANSI representation of the data type.
    #[must_use]
    pub fn to_sql(&self) -> String {
        match self {
            Self::Smallint => String::from("SMALLINT"),
            Self::Integer => String::from("INTEGER"),
            Self::Bigint => String::from("BIGINT"),
            Self::Real => String::from("REAL"),
            Self::Double => String::from("DOUBLE PRECISION"),
            Self::Decimal { precision, scale } => match (precision, scale) {
                (Some(p), Some(s)) => format!("DECIMAL({p}, {s})"),
                (Some(p), None) => format!("DECIMAL({p})"),
                _ => String::from("DECIMAL"),
            },
            Self::Char(len) => match len {
                Some(n) => format!("CHAR({n})"),
                None => String::from("CHAR"),
            },
            Self::Varchar(len) => format!("VARCHAR({})", len.unwrap_or(255)),
            Self::Text => String::from("TEXT"),
            Self::Blob => String::from("BLOB"),
            Self::Date => String::from("DATE"),
            Self::Time => String::from("TIME"),
            Self::DateTime => String::from("TIMESTAMP WITH TIME ZONE"),
            Self::Boolean => String::from("BOOLEAN"),
            Self::Json => String::from("JSON"),
            Self::Jsonb => String::from("JSONB"),
            Self::Uuid => String::from("UUID"),
            Self::Array(inner) => format!("{}[]", inner.to_sql()),
            Self::Custom(name) => name.clone(),
        }
    }

    /// Whether values of this type are JSON documents.
    #[must_use]
    pub const fn is_json(&self) -> bool {
        matches!(self, Self::Json | Self::Jsonb)
    }

    /// Parses the type names accepted by `::cast` suffixes.
    ///
    /// Unknown names become [`DataType::Custom`] in upper case.
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        match name.to_ascii_uppercase().as_str() {
            "SMALLINT" => Self::Smallint,
            "INT" | "INTEGER" => Self::Integer,
            "BIGINT" => Self::Bigint,
            "REAL" | "FLOAT" => Self::Real,
            "DOUBLE" | "DOUBLE PRECISION" => Self::Double,
            "DECIMAL" | "NUMERIC" => Self::Decimal {
                precision: None,
                scale: None,
            },
            "TEXT" => Self::Text,
            "BLOB" => Self::Blob,
            "DATE" => Self::Date,
            "TIME" => Self::Time,
            "TIMESTAMP" | "DATETIME" | "TIMESTAMPTZ" => Self::DateTime,
            "BOOL" | "BOOLEAN" => Self::Boolean,
            "JSON" => Self::Json,
            "JSONB" => Self::Jsonb,
            "UUID" => Self::Uuid,
            other => Self::Custom(other.to_string()),
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_sql())
    }
}
