//! Expression formatting and value escaping.

use crate::bind::{inject_literal_replacements, BindParams, Replacements};
use crate::error::{Result, SqlGenError};
use crate::expr::{DialectFn, DialectFnKind, Expression, LiteralPart, Value};
use crate::generator::QueryGenerator;
use crate::model::ModelDefinition;
use crate::types::DataType;

/// Per-call formatting context.
#[derive(Debug, Clone, Copy, Default)]
pub struct EscapeOptions<'a> {
    /// Resolves attribute names to column names.
    pub model: Option<&'a ModelDefinition>,
    /// Table alias prefixed to attribute references.
    pub main_alias: Option<&'a str>,
    /// Expected type of the value being escaped.
    pub data_type: Option<&'a DataType>,
    /// Inlined by `literal()` nodes.
    pub replacements: Option<&'a Replacements>,
    /// When set, plain values become bind parameters instead of inline SQL.
    pub bind: Option<&'a BindParams>,
}

impl<'a> EscapeOptions<'a> {
    #[must_use]
    pub const fn with_model(mut self, model: &'a ModelDefinition) -> Self {
        self.model = Some(model);
        self
    }

    #[must_use]
    pub const fn with_main_alias(mut self, alias: &'a str) -> Self {
        self.main_alias = Some(alias);
        self
    }

    #[must_use]
    pub const fn with_data_type(mut self, data_type: &'a DataType) -> Self {
        self.data_type = Some(data_type);
        self
    }

    #[must_use]
    pub const fn with_replacements(mut self, replacements: &'a Replacements) -> Self {
        self.replacements = Some(replacements);
        self
    }

    #[must_use]
    pub const fn with_bind(mut self, bind: &'a BindParams) -> Self {
        self.bind = Some(bind);
        self
    }

    /// The same context without a type hint, for arguments of casts and calls.
    #[must_use]
    pub const fn without_type(mut self) -> Self {
        self.data_type = None;
        self
    }
}

impl QueryGenerator {
    /// Renders an expression or a value as SQL.
    ///
    /// # Errors
    ///
    /// Fails when the expression needs a capability the dialect lacks, or
    /// when a value cannot be represented.
    pub fn escape(&self, expression: &Expression, options: EscapeOptions<'_>) -> Result<String> {
        match expression {
            Expression::Value(value) => match options.bind {
                Some(bind) => Ok(bind.push(value.clone())),
                None => self.escape_value(value, options),
            },
            Expression::Identifier(parts) => Ok(parts
                .iter()
                .map(|part| self.quote_identifier(part))
                .collect::<Vec<_>>()
                .join(".")),
            Expression::Attribute(name) => Ok(self.format_attribute(name, options)),
            Expression::AssociationPath {
                associations,
                attribute,
            } => Ok(format!(
                "{}.{}",
                self.quote_identifier(&associations.join("->")),
                self.quote_identifier(attribute)
            )),
            Expression::JsonPath { expression, path } => {
                if !self.supports().json_operations {
                    return Err(self.unsupported("JSON operations"));
                }
                let inner = self.escape(expression, options.without_type())?;
                self.dialect().json_path_extraction(&inner, path, false)
            }
            Expression::Cast { expression, target } => Ok(format!(
                "CAST({} AS {})",
                self.escape(expression, options.without_type())?,
                self.dialect().data_type_sql(target)?
            )),
            Expression::Fn { name, args } => Ok(format!(
                "{name}({})",
                self.escape_list(args, options.without_type())?
            )),
            Expression::DialectFn(function) => {
                self.format_dialect_fn(function, options.without_type())
            }
            Expression::Literal(parts) => self.format_literal(parts, options),
            Expression::List(items) => Ok(format!("({})", self.escape_list(items, options)?)),
            Expression::Where(condition) => self.where_items(condition, options),
            Expression::Col(name) => Ok(self.format_col(name)),
        }
    }

    /// Escapes a plain value according to the dialect's scalar rules.
    ///
    /// # Errors
    ///
    /// Non-finite floats have no SQL representation.
    pub fn escape_value(&self, value: &Value, options: EscapeOptions<'_>) -> Result<String> {
        let dialect = self.dialect();
        match value {
            Value::Null => Ok(String::from("NULL")),
            Value::Bool(value) => Ok(dialect.escape_bool(*value)),
            Value::Int(value) => Ok(value.to_string()),
            Value::Float(value) if value.is_finite() => Ok(value.to_string()),
            Value::Float(value) => Err(SqlGenError::validation(format!(
                "{value} cannot be represented as a SQL number"
            ))),
            Value::Text(text) if options.data_type.is_some_and(DataType::is_json) => {
                Ok(dialect.escape_string(&serde_json::Value::String(text.clone()).to_string()))
            }
            Value::Text(text) => Ok(dialect.escape_string(text)),
            Value::Bytes(bytes) => Ok(dialect.escape_bytes(bytes)),
            Value::Date(date) => Ok(dialect.escape_date(date)),
            Value::DateTime(datetime) => Ok(dialect.escape_datetime(datetime)),
            Value::Json(json) => Ok(dialect.escape_string(&json.to_string())),
            Value::Array(items) => self.escape_array(items, options),
        }
    }

    /// Escapes every item and joins them with `, `.
    ///
    /// # Errors
    ///
    /// Propagates the first formatting error.
    pub fn escape_list(&self, items: &[Expression], options: EscapeOptions<'_>) -> Result<String> {
        let escaped = items
            .iter()
            .map(|item| self.escape(item, options))
            .collect::<Result<Vec<_>>>()?;
        Ok(escaped.join(", "))
    }

    fn escape_array(&self, items: &[Value], options: EscapeOptions<'_>) -> Result<String> {
        let element_type = match options.data_type {
            Some(DataType::Array(inner)) => Some(inner.as_ref()),
            _ => None,
        };
        let item_options = EscapeOptions {
            data_type: element_type,
            ..options
        };
        let escaped = items
            .iter()
            .map(|item| self.escape_value(item, item_options))
            .collect::<Result<Vec<_>>>()?;

        if !self.supports().data_types.arrays {
            return Ok(escaped.join(", "));
        }

        let mut sql = format!("ARRAY[{}]", escaped.join(","));
        if let Some(array_type) = options.data_type.filter(|ty| matches!(ty, DataType::Array(_))) {
            sql.push_str("::");
            sql.push_str(&self.dialect().data_type_sql(array_type)?);
        }
        Ok(sql)
    }

    fn format_attribute(&self, name: &str, options: EscapeOptions<'_>) -> String {
        let column = options.model.map_or(name, |model| model.column_name(name));
        let quoted = self.quote_identifier(column);
        match options.main_alias {
            Some(alias) => format!("{}.{quoted}", self.quote_identifier(alias)),
            None => quoted,
        }
    }

    fn format_col(&self, name: &str) -> String {
        name.split('.')
            .map(|part| {
                if part == "*" {
                    String::from("*")
                } else {
                    self.quote_identifier(part)
                }
            })
            .collect::<Vec<_>>()
            .join(".")
    }

    fn format_dialect_fn(
        &self,
        function: &DialectFn,
        options: EscapeOptions<'_>,
    ) -> Result<String> {
        let kind = function.kind();
        if !kind.supports_dialect(self.dialect()) {
            return Err(self.unsupported(kind.feature()));
        }

        match kind {
            DialectFnKind::UuidV4 => self.dialect().uuid_v4_call(),
            DialectFnKind::UnquoteJson => {
                let Some(argument) = function.args().first() else {
                    return Err(SqlGenError::validation("unquote expects one argument"));
                };
                if let Expression::JsonPath { expression, path } = argument {
                    let inner = self.escape(expression, options)?;
                    return self.dialect().json_path_extraction(&inner, path, true);
                }
                let inner = self.escape(argument, options)?;
                self.dialect().unquote_json(&inner)
            }
        }
    }

    fn format_literal(&self, parts: &[LiteralPart], options: EscapeOptions<'_>) -> Result<String> {
        let mut sql = String::new();
        for part in parts {
            match part {
                LiteralPart::Sql(raw) => sql.push_str(raw),
                LiteralPart::Expr(expression) => sql.push_str(&self.escape(expression, options)?),
            }
        }
        match options.replacements {
            Some(replacements) => inject_literal_replacements(self, &sql, replacements),
            None => Ok(sql),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::DialectKind;
    use crate::error::ErrorKind;
    use crate::expr::{Condition, JsonPathSegment};
    use crate::model::AttributeDefinition;
    use crate::sql;

    fn escape(kind: DialectKind, expression: &Expression) -> Result<String> {
        QueryGenerator::for_kind(kind).escape(expression, EscapeOptions::default())
    }

    #[test]
    fn test_string_escaping() {
        let value = Expression::from("O'Brien");
        assert_eq!(escape(DialectKind::MySql, &value).unwrap(), "'O\\'Brien'");
        assert_eq!(escape(DialectKind::Postgres, &value).unwrap(), "'O''Brien'");
        assert_eq!(escape(DialectKind::MsSql, &value).unwrap(), "N'O''Brien'");
    }

    #[test]
    fn test_scalars() {
        let generator = QueryGenerator::for_kind(DialectKind::Sqlite);
        let options = EscapeOptions::default();
        assert_eq!(generator.escape_value(&Value::Null, options).unwrap(), "NULL");
        assert_eq!(generator.escape_value(&Value::Bool(true), options).unwrap(), "1");
        assert_eq!(generator.escape_value(&Value::Float(1.5), options).unwrap(), "1.5");
        assert!(generator
            .escape_value(&Value::Float(f64::NAN), options)
            .is_err());
        assert_eq!(
            generator
                .escape_value(&Value::Json(serde_json::json!({"a": 1})), options)
                .unwrap(),
            "'{\"a\":1}'"
        );
    }

    #[test]
    fn test_arrays() {
        let array = Value::array([1_i64, 2]);
        let postgres = QueryGenerator::for_kind(DialectKind::Postgres);
        let array_type = DataType::Array(Box::new(DataType::Integer));
        assert_eq!(
            postgres
                .escape_value(&array, EscapeOptions::default().with_data_type(&array_type))
                .unwrap(),
            "ARRAY[1,2]::INTEGER[]"
        );
        let mysql = QueryGenerator::for_kind(DialectKind::MySql);
        assert_eq!(
            mysql.escape_value(&array, EscapeOptions::default()).unwrap(),
            "1, 2"
        );
    }

    #[test]
    fn test_attribute_uses_model_and_alias() {
        let model = ModelDefinition::new("users").attribute(
            AttributeDefinition::new("firstName", DataType::Text).column("first_name"),
        );
        let generator = QueryGenerator::for_kind(DialectKind::Postgres);
        let options = EscapeOptions::default()
            .with_model(&model)
            .with_main_alias("User");
        assert_eq!(
            generator
                .escape(&sql::attribute("firstName").unwrap(), options)
                .unwrap(),
            "\"User\".\"first_name\""
        );
        assert_eq!(
            escape(DialectKind::Postgres, &Expression::Attribute("firstName".into())).unwrap(),
            "\"firstName\""
        );
    }

    #[test]
    fn test_cast_drops_outer_type_hint() {
        let generator = QueryGenerator::for_kind(DialectKind::Postgres);
        let json = DataType::Json;
        let cast = sql::cast("5", DataType::Integer);
        // the JSON hint would quote the string as a JSON document
        assert_eq!(
            generator
                .escape(&cast, EscapeOptions::default().with_data_type(&json))
                .unwrap(),
            "CAST('5' AS INTEGER)"
        );
    }

    #[test]
    fn test_functions_and_cols() {
        let call = sql::func("lower", [sql::col("users.email")]);
        assert_eq!(
            escape(DialectKind::Postgres, &call).unwrap(),
            "lower(\"users\".\"email\")"
        );
        assert_eq!(escape(DialectKind::MySql, &sql::col("*")).unwrap(), "*");
        assert_eq!(
            escape(DialectKind::MySql, &sql::identifier(["db", "t"])).unwrap(),
            "`db`.`t`"
        );
        assert_eq!(
            escape(DialectKind::MySql, &sql::list([1, 2])).unwrap(),
            "(1, 2)"
        );
    }

    #[test]
    fn test_json_path_and_unquote() {
        let path = sql::attribute("data.name").unwrap();
        assert_eq!(
            escape(DialectKind::Postgres, &path).unwrap(),
            "(\"data\"->'name')"
        );
        let unquoted = sql::attribute("data.name:unquote").unwrap();
        assert_eq!(
            escape(DialectKind::Postgres, &unquoted).unwrap(),
            "(\"data\"->>'name')"
        );
        assert_eq!(
            escape(DialectKind::MySql, &unquoted).unwrap(),
            "json_unquote(json_extract(`data`,'$.name'))"
        );
        let err = escape(DialectKind::Oracle, &path).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CapabilityViolation);
    }

    #[test]
    fn test_dialect_functions_are_gated() {
        assert_eq!(
            escape(DialectKind::Postgres, &sql::uuid_v4()).unwrap(),
            "gen_random_uuid()"
        );
        let err = escape(DialectKind::Sqlite, &sql::uuid_v4()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CapabilityViolation);
        assert!(err.to_string().contains("sqlite"));
    }

    #[test]
    fn test_literal_with_named_replacements() {
        let generator = QueryGenerator::for_kind(DialectKind::Postgres);
        let replacements = Replacements::named([("name", "bob")]);
        let options = EscapeOptions::default().with_replacements(&replacements);
        let literal = sql::literal("lower(name) = :name");
        assert_eq!(
            generator.escape(&literal, options).unwrap(),
            "lower(name) = 'bob'"
        );
    }

    #[test]
    fn test_literal_rejects_positional_replacements() {
        let generator = QueryGenerator::for_kind(DialectKind::Postgres);
        let replacements = Replacements::named([("name", "bob")]);
        let options = EscapeOptions::default().with_replacements(&replacements);
        let literal = sql::literal("name = :name AND id = ?");
        assert!(matches!(
            generator.escape(&literal, options),
            Err(SqlGenError::PositionalReplacementInLiteral { .. })
        ));
    }

    #[test]
    fn test_template_escapes_interpolated_values() {
        let literal = crate::sql!("SELECT * FROM t WHERE name = {}", "O'Brien").unwrap();
        assert_eq!(
            escape(DialectKind::Postgres, &literal).unwrap(),
            "SELECT * FROM t WHERE name = 'O''Brien'"
        );
    }

    #[test]
    fn test_values_become_bind_parameters() {
        let generator = QueryGenerator::for_kind(DialectKind::Postgres);
        let bind = BindParams::new("oxide_");
        let options = EscapeOptions::default().with_bind(&bind);
        assert_eq!(generator.escape(&Expression::from(1), options).unwrap(), "$oxide_1");
        assert_eq!(
            generator.escape(&sql::func("lower", ["A"]), options).unwrap(),
            "lower($oxide_2)"
        );
        assert_eq!(bind.into_values().len(), 2);
    }

    #[test]
    fn test_where_expression() {
        let condition = Condition::eq(Expression::Attribute("id".into()), 1);
        assert_eq!(
            escape(DialectKind::Postgres, &Expression::from(condition)).unwrap(),
            "\"id\" = 1"
        );
    }

    #[test]
    fn test_json_path_segments_escape_keys() {
        let path = sql::json_path(
            Expression::Attribute("data".into()),
            vec![JsonPathSegment::Key("it's".into())],
        );
        assert_eq!(
            escape(DialectKind::Postgres, &path).unwrap(),
            "(\"data\"->'it''s')"
        );
    }
}
