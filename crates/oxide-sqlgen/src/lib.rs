//! # oxide-sqlgen
//!
//! Dialect-correct SQL text from structured statement descriptions.
//!
//! This crate provides:
//! - A capability record per dialect, derived from one default record
//! - A closed expression AST with builder functions in [`sql`]
//! - Value escaping and identifier quoting per dialect
//! - DDL, DML, SELECT and transaction statement generation
//! - A comment and string aware mapper for replacements and bind parameters
//!
//! Everything here is synchronous and free of I/O. Unsupported features are
//! reported as errors instead of being dropped from the generated SQL.
//!
//! ## Generating statements
//!
//! ```rust
//! use oxide_sqlgen::generator::{ConstraintSpec, ConstraintType};
//! use oxide_sqlgen::{DialectKind, QueryGenerator};
//!
//! let generator = QueryGenerator::for_kind(DialectKind::Postgres);
//! let spec = ConstraintSpec::new(ConstraintType::Unique, ["email"]).name("uq_email");
//! assert_eq!(
//!     generator.get_constraint_snippet("users", &spec).unwrap(),
//!     "CONSTRAINT \"uq_email\" UNIQUE (\"email\")"
//! );
//! ```
//!
//! ## Bind parameters
//!
//! ```rust
//! use oxide_sqlgen::{map_bind_parameters, DialectKind};
//!
//! let mapped = map_bind_parameters(
//!     "SELECT * FROM t WHERE id = $id",
//!     DialectKind::Postgres.dialect(),
//! )
//! .unwrap();
//! assert_eq!(mapped.sql, "SELECT * FROM t WHERE id = $1");
//! assert_eq!(mapped.bind_order, Some(vec!["id".to_string()]));
//! ```

pub mod bind;
pub mod dialect;
pub mod error;
pub mod expr;
pub mod format;
pub mod generator;
pub mod model;
pub mod types;

/// Expression builders: `sql::col`, `sql::attribute`, `sql::cast`, ...
pub mod sql {
    pub use crate::expr::builders::*;
}

pub use bind::{
    assert_no_reserved_bind, combine_binds, inject_replacements, map_bind_parameters,
    map_bind_parameters_with, BindCollector, BindParams, BindValues, MappedSql, Replacements,
};
pub use dialect::{Capabilities, Dialect, DialectKind};
pub use error::{ErrorKind, Result, SqlGenError};
pub use expr::{Condition, Expression, Operator, Value};
pub use format::EscapeOptions;
pub use generator::{join_sql_fragments, GeneratorOptions, QueryGenerator, SqlWithBind};
pub use model::{
    AttributeDefinition, FieldDescriptor, FieldSpec, ForeignKeyAction, ForeignKeyRef,
    IndexDefinition, ModelDefinition, SortOrder, TableIdentifier,
};
pub use types::DataType;
