#![allow(dead_code)]

use indexmap::IndexMap;
use oxide_sqlgen::{
    AttributeDefinition, DataType, Dialect, DialectKind, Expression, IndexDefinition,
    ModelDefinition, QueryGenerator,
};

pub fn generator(kind: DialectKind) -> QueryGenerator {
    QueryGenerator::for_kind(kind)
}

pub fn dialect(kind: DialectKind) -> &'static dyn Dialect {
    kind.dialect()
}

/// `users(id serial pk, email unique, firstName -> first_name, active)`.
pub fn users_model() -> ModelDefinition {
    ModelDefinition::new("users")
        .attribute(
            AttributeDefinition::new("id", DataType::Integer)
                .primary_key()
                .auto_increment(),
        )
        .attribute(
            AttributeDefinition::new("email", DataType::Varchar(Some(255)))
                .not_null()
                .unique(),
        )
        .attribute(
            AttributeDefinition::new("firstName", DataType::Varchar(None)).column("first_name"),
        )
        .attribute(AttributeDefinition::new("active", DataType::Boolean).default_value(true))
}

/// A model with a composite unique index declared before a single-column one.
pub fn memberships_model() -> ModelDefinition {
    ModelDefinition::new("memberships")
        .attribute(AttributeDefinition::new("id", DataType::Bigint).primary_key())
        .attribute(AttributeDefinition::new("teamId", DataType::Integer).column("team_id"))
        .attribute(AttributeDefinition::new("userId", DataType::Integer).column("user_id"))
        .attribute(AttributeDefinition::new("role", DataType::Text))
        .index(IndexDefinition::new(["team_id", "user_id"]).unique())
        .index(IndexDefinition::new(["user_id"]).unique())
}

pub fn row<const N: usize>(entries: [(&str, Expression); N]) -> IndexMap<String, Expression> {
    entries
        .into_iter()
        .map(|(key, value)| (key.to_string(), value))
        .collect()
}

/// Reads an ANSI string literal back, optionally `N`-prefixed.
pub fn unescape_ansi(literal: &str) -> String {
    let literal = literal.strip_prefix('N').unwrap_or(literal);
    let inner = literal
        .strip_prefix('\'')
        .and_then(|rest| rest.strip_suffix('\''))
        .unwrap_or_else(|| panic!("not a string literal: {literal}"));
    inner.replace("''", "'")
}

/// Reads a MySQL-style backslash escaped string literal back.
pub fn unescape_backslash(literal: &str) -> String {
    let inner = literal
        .strip_prefix('\'')
        .and_then(|rest| rest.strip_suffix('\''))
        .unwrap_or_else(|| panic!("not a string literal: {literal}"));
    let mut out = String::new();
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('0') => out.push('\0'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('b') => out.push('\u{8}'),
            Some('t') => out.push('\t'),
            Some('Z') => out.push('\u{1a}'),
            Some(other) => out.push(other),
            None => panic!("dangling escape in {literal}"),
        }
    }
    out
}
