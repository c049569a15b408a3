//! SELECT statements with joins, grouping, paging and row locks.

use super::{join_sql_fragments, QueryGenerator};
use crate::bind::Replacements;
use crate::error::Result;
use crate::expr::{Condition, Expression};
use crate::format::EscapeOptions;
use crate::model::{ModelDefinition, SortOrder, TableIdentifier};

/// Join type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JoinKind {
    Inner,
    Left,
    Right,
    Full,
}

impl JoinKind {
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Inner => "INNER JOIN",
            Self::Left => "LEFT OUTER JOIN",
            Self::Right => "RIGHT OUTER JOIN",
            Self::Full => "FULL OUTER JOIN",
        }
    }
}

/// A joined table. The `ON` condition is rendered without model context,
/// so columns of either side are best referenced with [`crate::sql::col`].
#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    pub kind: JoinKind,
    pub table: TableIdentifier,
    pub alias: Option<String>,
    pub on: Condition,
}

impl Join {
    #[must_use]
    pub fn new(kind: JoinKind, table: impl Into<TableIdentifier>, on: Condition) -> Self {
        Self {
            kind,
            table: table.into(),
            alias: None,
            on,
        }
    }

    #[must_use]
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }
}

/// One entry of the select list.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectColumn {
    pub expression: Expression,
    pub alias: Option<String>,
}

impl SelectColumn {
    #[must_use]
    pub fn new(expression: impl Into<Expression>) -> Self {
        Self {
            expression: expression.into(),
            alias: None,
        }
    }

    /// Selects a model attribute. It is aliased back to the attribute name
    /// when stored in a differently named column.
    #[must_use]
    pub fn attribute(name: impl Into<String>) -> Self {
        Self::new(Expression::Attribute(name.into()))
    }

    #[must_use]
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }
}

impl From<&str> for SelectColumn {
    fn from(name: &str) -> Self {
        Self::attribute(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    pub expression: Expression,
    pub order: SortOrder,
}

impl OrderBy {
    #[must_use]
    pub fn asc(expression: impl Into<Expression>) -> Self {
        Self {
            expression: expression.into(),
            order: SortOrder::Asc,
        }
    }

    #[must_use]
    pub fn desc(expression: impl Into<Expression>) -> Self {
        Self {
            expression: expression.into(),
            order: SortOrder::Desc,
        }
    }
}

/// Row lock strength.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LockStrength {
    Update,
    NoKeyUpdate,
    Share,
    KeyShare,
}

/// Row locking clause appended to a SELECT.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lock {
    pub strength: LockStrength,
    /// Restricts the lock to one table alias.
    pub of: Option<String>,
    pub skip_locked: bool,
}

impl Lock {
    #[must_use]
    pub const fn new(strength: LockStrength) -> Self {
        Self {
            strength,
            of: None,
            skip_locked: false,
        }
    }

    #[must_use]
    pub const fn update() -> Self {
        Self::new(LockStrength::Update)
    }

    #[must_use]
    pub const fn share() -> Self {
        Self::new(LockStrength::Share)
    }

    #[must_use]
    pub fn of(mut self, alias: impl Into<String>) -> Self {
        self.of = Some(alias.into());
        self
    }

    #[must_use]
    pub const fn skip_locked(mut self) -> Self {
        self.skip_locked = true;
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct SelectOptions<'a> {
    pub model: Option<&'a ModelDefinition>,
    /// Alias of the main table; attributes are qualified with it.
    pub table_alias: Option<&'a str>,
    /// `*` when empty.
    pub columns: Vec<SelectColumn>,
    pub distinct: bool,
    pub joins: Vec<Join>,
    pub where_clause: Option<Condition>,
    pub group_by: Vec<Expression>,
    pub having: Option<Condition>,
    pub order_by: Vec<OrderBy>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
    pub lock: Option<Lock>,
    pub replacements: Option<&'a Replacements>,
}

impl QueryGenerator {
    /// # Errors
    ///
    /// Fails when a lock variant or the paging syntax is not available in
    /// the dialect, or when an expression cannot be formatted.
    pub fn select(
        &self,
        table: impl Into<TableIdentifier>,
        options: &SelectOptions<'_>,
    ) -> Result<String> {
        let table = self.extract_table_details(table);
        let mut escape_options = EscapeOptions {
            model: options.model,
            replacements: options.replacements,
            ..EscapeOptions::default()
        };
        if let Some(alias) = options.table_alias {
            escape_options = escape_options.with_main_alias(alias);
        }

        let columns = self.select_list(options, escape_options)?;
        let joins = options
            .joins
            .iter()
            .map(|join| self.join_sql(join, options.replacements))
            .collect::<Result<Vec<_>>>()?;
        let group_by = self.expression_list(&options.group_by, escape_options)?;
        let having = match &options.having {
            Some(condition) => {
                let sql = self.where_items(condition, escape_options)?;
                if sql.is_empty() {
                    sql
                } else {
                    format!("HAVING {sql}")
                }
            }
            None => String::new(),
        };
        let mut order_by = Vec::with_capacity(options.order_by.len());
        for item in &options.order_by {
            order_by.push(format!(
                "{} {}",
                self.escape(&item.expression, escape_options)?,
                item.order.as_sql()
            ));
        }
        let paging = if options.limit.is_some() || options.offset.is_some() {
            self.dialect()
                .limit_offset(options.limit, options.offset, !order_by.is_empty())?
        } else {
            String::new()
        };
        let lock = options
            .lock
            .as_ref()
            .map(|lock| self.lock_sql(lock))
            .transpose()?
            .unwrap_or_default();

        let sql = join_sql_fragments([
            String::from(if options.distinct { "SELECT DISTINCT" } else { "SELECT" }),
            columns,
            format!("FROM {}", self.quote_table(&table, options.table_alias)),
            joins.join(" "),
            self.where_query(options.where_clause.as_ref(), escape_options)?,
            if group_by.is_empty() {
                String::new()
            } else {
                format!("GROUP BY {group_by}")
            },
            having,
            if order_by.is_empty() {
                String::new()
            } else {
                format!("ORDER BY {}", order_by.join(", "))
            },
            paging,
            lock,
            String::from(";"),
        ]);
        Ok(self.finish("selectQuery", sql))
    }

    fn select_list(
        &self,
        options: &SelectOptions<'_>,
        escape_options: EscapeOptions<'_>,
    ) -> Result<String> {
        if options.columns.is_empty() {
            return Ok(match options.table_alias {
                Some(alias) => format!("{}.*", self.quote_identifier(alias)),
                None => String::from("*"),
            });
        }
        let mut columns = Vec::with_capacity(options.columns.len());
        for column in &options.columns {
            let sql = self.escape(&column.expression, escape_options)?;
            let alias = column
                .alias
                .as_deref()
                .or_else(|| match (&column.expression, options.model) {
                    (Expression::Attribute(name), Some(model))
                        if model.column_name(name) != name.as_str() =>
                    {
                        Some(name.as_str())
                    }
                    _ => None,
                });
            columns.push(match alias {
                Some(alias) => format!("{sql} AS {}", self.quote_identifier(alias)),
                None => sql,
            });
        }
        Ok(columns.join(", "))
    }

    fn expression_list(&self, items: &[Expression], options: EscapeOptions<'_>) -> Result<String> {
        let mut parts = Vec::with_capacity(items.len());
        for item in items {
            parts.push(self.escape(item, options)?);
        }
        Ok(parts.join(", "))
    }

    fn join_sql(&self, join: &Join, replacements: Option<&Replacements>) -> Result<String> {
        let table = self.extract_table_details(&join.table);
        let options = EscapeOptions {
            replacements,
            ..EscapeOptions::default()
        };
        Ok(join_sql_fragments([
            join.kind.as_sql().to_string(),
            self.quote_table(&table, join.alias.as_deref()),
            format!("ON {}", self.where_items(&join.on, options)?),
        ]))
    }

    fn lock_sql(&self, lock: &Lock) -> Result<String> {
        let supports = self.supports();
        self.ensure_supported(true, supports.lock, "Row locking clauses")?;
        let strength = match lock.strength {
            LockStrength::Update => String::from("FOR UPDATE"),
            LockStrength::Share => supports
                .for_share
                .clone()
                .ok_or_else(|| self.unsupported("Shared row locks"))?,
            LockStrength::NoKeyUpdate | LockStrength::KeyShare => {
                self.ensure_supported(true, supports.lock_key, "Key row locks")?;
                String::from(if lock.strength == LockStrength::KeyShare {
                    "FOR KEY SHARE"
                } else {
                    "FOR NO KEY UPDATE"
                })
            }
        };
        self.ensure_supported(
            lock.of.is_some(),
            supports.lock_of,
            "Row locks restricted to a table",
        )?;
        self.ensure_supported(lock.skip_locked, supports.skip_locked, "SKIP LOCKED clauses")?;
        Ok(join_sql_fragments([
            strength,
            lock.of
                .as_deref()
                .map(|alias| format!("OF {}", self.quote_identifier(alias)))
                .unwrap_or_default(),
            String::from(if lock.skip_locked { "SKIP LOCKED" } else { "" }),
        ]))
    }
}
