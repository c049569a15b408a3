//! Placeholders: bind parameters resolved by the driver and replacements
//! inlined by the generator.

mod collector;
mod mapper;

use core::cell::RefCell;

use indexmap::IndexMap;

pub use collector::BindCollector;
pub(crate) use mapper::inject_literal_replacements;
pub use mapper::{
    inject_replacements, map_bind_parameters, map_bind_parameters_with, MappedSql,
};

use crate::error::{Result, SqlGenError};
use crate::expr::{Expression, Value};

/// Values for `:name` or `?` replacements.
#[derive(Debug, Clone, PartialEq)]
pub enum Replacements {
    Named(IndexMap<String, Expression>),
    Positional(Vec<Expression>),
}

impl Replacements {
    pub fn named<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Expression>,
    {
        Self::Named(
            entries
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }

    pub fn positional<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Expression>,
    {
        Self::Positional(values.into_iter().map(Into::into).collect())
    }
}

/// Values for `$name` / `$1` bind parameters, as supplied by a caller.
#[derive(Debug, Clone, PartialEq)]
pub enum BindValues {
    Named(IndexMap<String, Value>),
    /// `$1` is the first entry.
    Positional(Vec<Value>),
}

impl BindValues {
    pub fn named<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        Self::Named(
            entries
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }

    pub fn positional<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self::Positional(values.into_iter().map(Into::into).collect())
    }

    /// Looks a parameter up by the name used in SQL, without the `$`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        match self {
            Self::Named(values) => values.get(name),
            Self::Positional(values) => name
                .parse::<usize>()
                .ok()
                .and_then(|position| position.checked_sub(1))
                .and_then(|index| values.get(index)),
        }
    }
}

/// Collects the bind parameters the generator creates for plain values.
///
/// Each pushed value receives the next `$<prefix><n>` name, numbered from 1.
#[derive(Debug)]
pub struct BindParams {
    prefix: String,
    values: RefCell<IndexMap<String, Value>>,
}

impl BindParams {
    #[must_use]
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            values: RefCell::new(IndexMap::new()),
        }
    }

    /// Stores `value` and returns the placeholder that refers to it.
    pub fn push(&self, value: Value) -> String {
        let mut values = self.values.borrow_mut();
        let name = format!("{}{}", self.prefix, values.len() + 1);
        let placeholder = format!("${name}");
        values.insert(name, value);
        placeholder
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.borrow().is_empty()
    }

    #[must_use]
    pub fn into_values(self) -> IndexMap<String, Value> {
        self.values.into_inner()
    }
}

/// Rejects caller bind names that collide with generated ones.
///
/// # Errors
///
/// Returns a validation error naming the reserved prefix.
pub fn assert_no_reserved_bind(bind: &BindValues, prefix: &str) -> Result<()> {
    let BindValues::Named(values) = bind else {
        return Ok(());
    };
    if values.keys().any(|key| key.starts_with(prefix)) {
        return Err(SqlGenError::validation(format!(
            "Bind parameters cannot start with \"{prefix}\", these bind parameters are reserved by the query generator."
        )));
    }
    Ok(())
}

/// Merges caller binds with generated ones. Positional caller binds become
/// `"1"`, `"2"`, ... so both can live in one map.
#[must_use]
pub fn combine_binds(
    user: Option<BindValues>,
    generated: IndexMap<String, Value>,
) -> IndexMap<String, Value> {
    let mut combined = match user {
        None => IndexMap::new(),
        Some(BindValues::Named(values)) => values,
        Some(BindValues::Positional(values)) => values
            .into_iter()
            .enumerate()
            .map(|(index, value)| ((index + 1).to_string(), value))
            .collect(),
    };
    combined.extend(generated);
    combined
}
