//! Single-pass placeholder scanner.
//!
//! The scanner walks the SQL once, tracking whether it is inside a quoted
//! identifier, a string, a dollar-quoted string or a comment, and only
//! recognizes placeholders in plain SQL.

use indexmap::IndexSet;
use tracing::debug;

use crate::dialect::Dialect;
use crate::error::{Result, SqlGenError};
use crate::format::EscapeOptions;
use crate::generator::QueryGenerator;

use super::{BindCollector, Replacements};

/// Lexical state of the scanner.
#[derive(Debug, Clone, PartialEq, Eq)]
enum LexState {
    Normal,
    QuotedIdentifier,
    StringLiteral { backslash_escapable: bool },
    DollarQuoted { tag: String },
    LineComment,
    BlockComment,
}

/// A placeholder found in plain SQL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Placeholder<'a> {
    /// `:name`
    Named(&'a str),
    /// `?`, with its zero-based position among positional placeholders.
    Positional(usize),
    /// `$name` or `$1`
    Bind(&'a str),
}

/// Which placeholder syntaxes a scan rewrites.
#[derive(Debug, Clone, Copy, Default)]
struct Recognize {
    named: bool,
    positional: bool,
    bind: bool,
}

/// SQL whose bind parameters use the dialect's native syntax.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappedSql {
    pub sql: String,
    /// Parameter names in binding order, `None` for named-parameter drivers.
    pub bind_order: Option<Vec<String>>,
    /// Every distinct parameter name found.
    pub parameter_set: IndexSet<String>,
}

/// Rewrites `$name` bind parameters into the dialect's native tokens.
///
/// # Errors
///
/// Fails on an unterminated string literal.
pub fn map_bind_parameters(sql: &str, dialect: &dyn Dialect) -> Result<MappedSql> {
    map_bind_parameters_with(sql, dialect, dialect.create_bind_collector())
}

/// Same as [`map_bind_parameters`] with a collector picked by the caller,
/// for drivers whose placeholder syntax differs from the dialect's.
///
/// # Errors
///
/// Fails on an unterminated string literal.
pub fn map_bind_parameters_with(
    sql: &str,
    dialect: &dyn Dialect,
    mut collector: BindCollector,
) -> Result<MappedSql> {
    let mut parameter_set = IndexSet::new();

    let mapped = scan(
        sql,
        dialect,
        Recognize {
            bind: true,
            ..Recognize::default()
        },
        |placeholder| match placeholder {
            Placeholder::Bind(name) => {
                parameter_set.insert(name.to_string());
                Ok(collector.collect(name))
            }
            // not recognized by this scan; kept for exhaustiveness
            Placeholder::Named(name) => Ok(format!(":{name}")),
            Placeholder::Positional(_) => Ok(String::from("?")),
        },
    )?;

    let bind_order = collector.into_bind_parameter_order();
    debug!(
        dialect = dialect.name(),
        parameters = parameter_set.len(),
        "Mapped bind parameters"
    );
    Ok(MappedSql {
        sql: mapped,
        bind_order,
        parameter_set,
    })
}

/// Inlines `:name` and `?` replacements as escaped values.
///
/// Any `?` in plain SQL is treated as a positional replacement, so named
/// replacements cannot be combined with a bare `?`.
///
/// # Errors
///
/// Fails on an unterminated string literal, a name missing from a named map,
/// or a `?` with no matching positional value.
pub fn inject_replacements(
    sql: &str,
    dialect: &'static dyn Dialect,
    replacements: &Replacements,
) -> Result<String> {
    let generator = QueryGenerator::new(dialect);
    inject(&generator, sql, replacements, false)
}

/// Replacement injection for `literal()` nodes, which only accept `:name`.
pub(crate) fn inject_literal_replacements(
    generator: &QueryGenerator,
    sql: &str,
    replacements: &Replacements,
) -> Result<String> {
    inject(generator, sql, replacements, true)
}

fn inject(
    generator: &QueryGenerator,
    sql: &str,
    replacements: &Replacements,
    in_literal: bool,
) -> Result<String> {
    let recognize = Recognize {
        named: matches!(replacements, Replacements::Named(_)),
        positional: true,
        bind: false,
    };

    scan(sql, generator.dialect(), recognize, |placeholder| {
        let value = match (placeholder, replacements) {
            (Placeholder::Positional(_), _) if in_literal => {
                return Err(SqlGenError::PositionalReplacementInLiteral {
                    sql: sql.to_string(),
                });
            }
            (Placeholder::Named(name), Replacements::Named(values)) => {
                values
                    .get(name)
                    .ok_or_else(|| SqlGenError::MissingNamedReplacement {
                        name: name.to_string(),
                    })?
            }
            (Placeholder::Positional(index), Replacements::Positional(values)) => values
                .get(index)
                .ok_or(SqlGenError::MissingPositionalReplacement { index })?,
            (Placeholder::Positional(index), Replacements::Named(_)) => {
                return Err(SqlGenError::MissingPositionalReplacement { index });
            }
            (Placeholder::Named(name), Replacements::Positional(_)) => {
                return Ok(format!(":{name}"));
            }
            (Placeholder::Bind(name), _) => return Ok(format!("${name}")),
        };
        generator.escape(value, EscapeOptions::default())
    })
}

/// Start of input, whitespace, or one of `(`, `[`, `>`, `,`, `=`.
fn can_precede_new_token(previous: Option<char>) -> bool {
    previous.is_none_or(|c| c.is_whitespace() || matches!(c, '(' | '[' | '>' | ',' | '='))
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// `[a-z_][0-9a-z_]*` starting at `start`, case-insensitive. Returns the end index.
fn match_name(chars: &[char], start: usize) -> Option<usize> {
    let first = *chars.get(start)?;
    if !(first.is_ascii_alphabetic() || first == '_') {
        return None;
    }
    let mut end = start + 1;
    while chars
        .get(end)
        .is_some_and(|c| c.is_ascii_alphanumeric() || *c == '_')
    {
        end += 1;
    }
    Some(end)
}

/// `[1-9][0-9]*` starting at `start`. Returns the end index.
fn match_number(chars: &[char], start: usize) -> Option<usize> {
    let first = *chars.get(start)?;
    if !('1'..='9').contains(&first) {
        return None;
    }
    let mut end = start + 1;
    while chars.get(end).is_some_and(char::is_ascii_digit) {
        end += 1;
    }
    Some(end)
}

/// A placeholder name must be followed by one of `) , ] ;`, whitespace, `::`
/// or the end of input.
fn is_placeholder_end(chars: &[char], at: usize) -> bool {
    match chars.get(at) {
        None => true,
        Some(c) if c.is_whitespace() => true,
        Some(')' | ',' | ']' | ';') => true,
        Some(':') => chars.get(at + 1) == Some(&':'),
        Some(_) => false,
    }
}

/// Whether the quote at `at` is escaped by an odd run of backslashes.
fn is_backslash_escaped(chars: &[char], at: usize) -> bool {
    chars[..at]
        .iter()
        .rev()
        .take_while(|c| **c == '\\')
        .count()
        % 2
        == 1
}

/// `$tag$` or `$$` starting at `start`. Returns the tag and the end index.
fn match_dollar_tag(chars: &[char], start: usize) -> Option<(String, usize)> {
    let tag_end = match_name(chars, start + 1).unwrap_or(start + 1);
    if chars.get(tag_end) != Some(&'$') {
        return None;
    }
    Some((chars[start + 1..tag_end].iter().collect(), tag_end + 1))
}

fn starts_with_at(chars: &[char], at: usize, needle: &str) -> bool {
    let mut index = at;
    for expected in needle.chars() {
        if chars.get(index) != Some(&expected) {
            return false;
        }
        index += 1;
    }
    true
}

fn scan<F>(
    sql: &str,
    dialect: &dyn Dialect,
    recognize: Recognize,
    mut on_placeholder: F,
) -> Result<String>
where
    F: FnMut(Placeholder<'_>) -> Result<String>,
{
    let chars: Vec<char> = sql.chars().collect();
    let (open_quote, close_quote) = dialect.identifier_delimiters();
    let backslash_strings = dialect.can_backslash_escape();
    let escape_string_constants = dialect.supports().escape_string_constants;

    let mut state = LexState::Normal;
    let mut out = String::with_capacity(sql.len());
    let mut positional_index = 0;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let previous = i.checked_sub(1).map(|p| chars[p]);

        match &state {
            LexState::QuotedIdentifier => {
                if c == close_quote {
                    state = LexState::Normal;
                }
                out.push(c);
                i += 1;
                continue;
            }
            LexState::StringLiteral {
                backslash_escapable,
            } => {
                if c == '\'' && !(*backslash_escapable && is_backslash_escaped(&chars, i)) {
                    state = LexState::Normal;
                }
                out.push(c);
                i += 1;
                continue;
            }
            LexState::DollarQuoted { tag } => {
                let closing = format!("${tag}$");
                if c == '$' && starts_with_at(&chars, i, &closing) {
                    out.push_str(&closing);
                    i += closing.chars().count();
                    state = LexState::Normal;
                } else {
                    out.push(c);
                    i += 1;
                }
                continue;
            }
            LexState::LineComment => {
                if c == '\n' {
                    state = LexState::Normal;
                }
                out.push(c);
                i += 1;
                continue;
            }
            LexState::BlockComment => {
                if c == '*' && chars.get(i + 1) == Some(&'/') {
                    out.push_str("*/");
                    i += 2;
                    state = LexState::Normal;
                } else {
                    out.push(c);
                    i += 1;
                }
                continue;
            }
            LexState::Normal => {}
        }

        if c == open_quote {
            state = LexState::QuotedIdentifier;
            out.push(c);
            i += 1;
            continue;
        }

        if c == '\'' {
            let e_string = escape_string_constants
                && matches!(previous, Some('E' | 'e'))
                && can_precede_new_token(i.checked_sub(2).map(|p| chars[p]));
            state = LexState::StringLiteral {
                backslash_escapable: backslash_strings || e_string,
            };
            out.push(c);
            i += 1;
            continue;
        }

        if starts_with_at(&chars, i, "-- ") {
            state = LexState::LineComment;
            out.push(c);
            i += 1;
            continue;
        }

        if starts_with_at(&chars, i, "/*") {
            state = LexState::BlockComment;
            out.push_str("/*");
            i += 2;
            continue;
        }

        if c == '$' {
            // part of an identifier such as `price$`
            if previous.is_some_and(is_word_char) {
                out.push(c);
                i += 1;
                continue;
            }

            if let Some((tag, end)) = match_dollar_tag(&chars, i) {
                out.extend(&chars[i..end]);
                i = end;
                state = LexState::DollarQuoted { tag };
                continue;
            }

            // `1+$a` and `x||$b` are left to the database
            if recognize.bind && can_precede_new_token(previous) {
                let name_end = match_name(&chars, i + 1).or_else(|| match_number(&chars, i + 1));
                if let Some(end) = name_end.filter(|end| is_placeholder_end(&chars, *end)) {
                    let name: String = chars[i + 1..end].iter().collect();
                    out.push_str(&on_placeholder(Placeholder::Bind(&name))?);
                    i = end;
                    continue;
                }
            }

            out.push(c);
            i += 1;
            continue;
        }

        if c == ':' && recognize.named && can_precede_new_token(previous) {
            if let Some(end) =
                match_name(&chars, i + 1).filter(|end| is_placeholder_end(&chars, *end))
            {
                let name: String = chars[i + 1..end].iter().collect();
                out.push_str(&on_placeholder(Placeholder::Named(&name))?);
                i = end;
                continue;
            }
        }

        if c == '?'
            && recognize.positional
            && can_precede_new_token(previous)
            && !matches!(chars.get(i + 1), Some('|' | '&'))
        {
            out.push_str(&on_placeholder(Placeholder::Positional(positional_index))?);
            positional_index += 1;
            i += 1;
            continue;
        }

        out.push(c);
        i += 1;
    }

    if matches!(state, LexState::StringLiteral { .. }) {
        return Err(SqlGenError::UnterminatedString {
            sql: sql.to_string(),
        });
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::DialectKind;
    use crate::error::ErrorKind;

    fn map(sql: &str, kind: DialectKind) -> MappedSql {
        map_bind_parameters(sql, kind.dialect()).unwrap()
    }

    fn inject_named(sql: &str, kind: DialectKind, entries: &[(&str, i64)]) -> Result<String> {
        let replacements = Replacements::named(entries.iter().map(|(k, v)| (*k, *v)));
        inject_replacements(sql, kind.dialect(), &replacements)
    }

    #[test]
    fn test_postgres_numbers_parameters() {
        let mapped = map("SELECT * FROM t WHERE id = $id", DialectKind::Postgres);
        assert_eq!(mapped.sql, "SELECT * FROM t WHERE id = $1");
        assert_eq!(mapped.bind_order, Some(vec!["id".to_string()]));
    }

    #[test]
    fn test_mysql_uses_question_marks() {
        let mapped = map("SELECT * FROM t WHERE id = $id", DialectKind::MySql);
        assert_eq!(mapped.sql, "SELECT * FROM t WHERE id = ?");
        assert_eq!(mapped.bind_order, Some(vec!["id".to_string()]));
    }

    #[test]
    fn test_repeated_parameters() {
        let sql = "SELECT $a, $b, $a";
        assert_eq!(map(sql, DialectKind::Postgres).sql, "SELECT $1, $2, $1");
        let mysql = map(sql, DialectKind::MySql);
        assert_eq!(mysql.sql, "SELECT ?, ?, ?");
        assert_eq!(
            mysql.bind_order,
            Some(vec!["a".to_string(), "b".to_string(), "a".to_string()])
        );
        assert_eq!(mysql.parameter_set.len(), 2);
    }

    #[test]
    fn test_named_drivers_have_no_order() {
        let mapped = map("SELECT $id", DialectKind::MsSql);
        assert_eq!(mapped.sql, "SELECT @id");
        assert_eq!(mapped.bind_order, None);
    }

    #[test]
    fn test_caller_supplied_collector() {
        let mapped = map_bind_parameters_with(
            "SELECT `$x` FROM t WHERE a = $b AND c = $b",
            DialectKind::Sqlite.dialect(),
            BindCollector::specified_ordered("$"),
        )
        .unwrap();
        assert_eq!(mapped.sql, "SELECT `$x` FROM t WHERE a = $1 AND c = $1");
        assert_eq!(mapped.bind_order, Some(vec!["b".to_string()]));
    }

    #[test]
    fn test_numeric_parameters_and_terminators() {
        assert_eq!(map("SELECT $1::int;", DialectKind::MySql).sql, "SELECT ?::int;");
        assert_eq!(map("SELECT ($1,$2)", DialectKind::MySql).sql, "SELECT (?,?)");
        // `$0` and `$1x` are not parameters
        assert_eq!(map("SELECT $0, $1x", DialectKind::MySql).sql, "SELECT $0, $1x");
    }

    #[test]
    fn test_parameters_inside_literals_are_ignored() {
        let sql = "SELECT '$a', \"$b\", $c -- $d\n/* $e */ $f";
        let mapped = map(sql, DialectKind::Postgres);
        assert_eq!(mapped.sql, "SELECT '$a', \"$b\", $1 -- $d\n/* $e */ $2");
    }

    #[test]
    fn test_dollar_quoted_strings() {
        let sql = "SELECT $tag$ $a $tag$, $$ $b $$, $c";
        assert_eq!(
            map(sql, DialectKind::Postgres).sql,
            "SELECT $tag$ $a $tag$, $$ $b $$, $1"
        );
    }

    #[test]
    fn test_identifier_dollar_is_not_a_parameter() {
        assert_eq!(map("SELECT price$a", DialectKind::Postgres).sql, "SELECT price$a");
    }

    #[test]
    fn test_backslash_escaped_quote() {
        // MySQL strings escape with backslashes, so the string continues
        let sql = r"SELECT 'it\'s $a', $b";
        assert_eq!(map(sql, DialectKind::MySql).sql, r"SELECT 'it\'s $a', ?");
    }

    #[test]
    fn test_ansi_string_does_not_honor_backslash() {
        let sql = r"SELECT 'C:\', $a";
        assert_eq!(map(sql, DialectKind::Postgres).sql, r"SELECT 'C:\', $1");
    }

    #[test]
    fn test_postgres_e_strings() {
        let sql = r"SELECT E'it\'s $a', $b";
        assert_eq!(map(sql, DialectKind::Postgres).sql, r"SELECT E'it\'s $a', $1");
    }

    #[test]
    fn test_bind_needs_a_token_boundary() {
        for sql in ["SELECT 1+$a, x||$b", "SELECT a::$b", "SELECT -$a"] {
            let mapped = map(sql, DialectKind::Postgres);
            assert_eq!(mapped.sql, sql);
            assert_eq!(mapped.bind_order, Some(vec![]));
            assert!(mapped.parameter_set.is_empty());
        }
        assert_eq!(map("SELECT ARRAY[$a]", DialectKind::Postgres).sql, "SELECT ARRAY[$1]");
        assert_eq!(map("SELECT 1>$a", DialectKind::MySql).sql, "SELECT 1>?");
    }

    #[test]
    fn test_e_string_after_bracket() {
        let mapped = map(r"SELECT ARRAY[E'it\'s'], $a", DialectKind::Postgres);
        assert_eq!(mapped.sql, r"SELECT ARRAY[E'it\'s'], $1");
        assert_eq!(mapped.bind_order, Some(vec!["a".to_string()]));
    }

    #[test]
    fn test_unterminated_string() {
        let err = map_bind_parameters("SELECT 'oops", DialectKind::Postgres.dialect()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ParameterMapping);
        assert!(err.to_string().contains("SELECT 'oops"));
    }

    #[test]
    fn test_named_replacement() {
        assert_eq!(
            inject_named("SELECT * FROM t WHERE a = :x", DialectKind::Postgres, &[("x", 5)])
                .unwrap(),
            "SELECT * FROM t WHERE a = 5"
        );
    }

    #[test]
    fn test_positional_without_array_fails() {
        let err = inject_named(
            "SELECT * FROM t WHERE a = :x AND b = ?",
            DialectKind::Postgres,
            &[("x", 5)],
        )
        .unwrap_err();
        assert!(matches!(err, SqlGenError::MissingPositionalReplacement { index: 0 }));
    }

    #[test]
    fn test_missing_named_replacement() {
        let err = inject_named("SELECT :y", DialectKind::Postgres, &[("x", 5)]).unwrap_err();
        assert!(matches!(err, SqlGenError::MissingNamedReplacement { ref name } if name == "y"));
    }

    #[test]
    fn test_positional_replacements() {
        let replacements = Replacements::positional(["a", "b"]);
        assert_eq!(
            inject_replacements("SELECT ?, ?", DialectKind::Postgres.dialect(), &replacements)
                .unwrap(),
            "SELECT 'a', 'b'"
        );
        let err = inject_replacements(
            "SELECT ?, ?, ?",
            DialectKind::Postgres.dialect(),
            &replacements,
        )
        .unwrap_err();
        assert!(matches!(err, SqlGenError::MissingPositionalReplacement { index: 2 }));
    }

    #[test]
    fn test_positional_keeps_json_operators() {
        let replacements = Replacements::positional([1]);
        assert_eq!(
            inject_replacements(
                "SELECT \"data\" ?| array['a','b'], \"data\" ?& array['c'] WHERE id = ?",
                DialectKind::Postgres.dialect(),
                &replacements,
            )
            .unwrap(),
            "SELECT \"data\" ?| array['a','b'], \"data\" ?& array['c'] WHERE id = 1"
        );
    }

    #[test]
    fn test_replacements_skip_strings_and_casts() {
        assert_eq!(
            inject_named(
                "SELECT 'some :x text', a::text, :x",
                DialectKind::Postgres,
                &[("x", 1)]
            )
            .unwrap(),
            "SELECT 'some :x text', a::text, 1"
        );
    }

    #[test]
    fn test_named_replacement_after_bracket() {
        assert_eq!(
            inject_named("SELECT ARRAY[:x]", DialectKind::Postgres, &[("x", 2)]).unwrap(),
            "SELECT ARRAY[2]"
        );
    }

    #[test]
    fn test_positional_map_leaves_named_syntax() {
        let replacements = Replacements::positional([3]);
        assert_eq!(
            inject_replacements("SELECT :x, ?", DialectKind::Postgres.dialect(), &replacements)
                .unwrap(),
            "SELECT :x, 3"
        );
    }
}
