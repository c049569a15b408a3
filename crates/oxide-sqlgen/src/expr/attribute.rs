//! Parser for the attribute mini-syntax.
//!
//! ```text
//! attribute  := base json* modifier*
//! base       := name | '$' name ('.' name)* '$'
//! json       := '.' key | '."' quoted '"' | '[' digits ']'
//! modifier   := '::' type | ':unquote'
//! ```
//!
//! Modifiers apply left to right, so `data.price::integer:unquote` unquotes
//! the result of the cast.

use crate::error::{Result, SqlGenError};
use crate::types::DataType;

use super::{DialectFn, Expression, JsonPathSegment};

/// Parses `input` into an attribute, association path, JSON path or cast node.
///
/// # Errors
///
/// Returns a validation error when `input` does not follow the syntax.
pub fn parse_attribute(input: &str) -> Result<Expression> {
    Parser::new(input).parse()
}

struct Parser<'a> {
    input: &'a str,
    chars: Vec<char>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            chars: input.chars().collect(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn error(&self, message: &str) -> SqlGenError {
        SqlGenError::validation(format!(
            "Invalid attribute syntax \"{}\" at position {}: {message}",
            self.input, self.pos
        ))
    }

    fn parse(mut self) -> Result<Expression> {
        let mut expression = self.parse_base()?;

        let mut path = Vec::new();
        while let Some(segment) = self.parse_json_segment()? {
            path.push(segment);
        }
        if !path.is_empty() {
            expression = Expression::JsonPath {
                expression: Box::new(expression),
                path,
            };
        }

        while self.peek() == Some(':') {
            expression = self.parse_modifier(expression)?;
        }

        if self.pos < self.chars.len() {
            return Err(self.error("unexpected trailing characters"));
        }
        Ok(expression)
    }

    fn parse_base(&mut self) -> Result<Expression> {
        if self.peek() == Some('$') {
            self.pos += 1;
            let start = self.pos;
            while self.peek().is_some_and(|c| c != '$') {
                self.pos += 1;
            }
            if self.peek() != Some('$') {
                return Err(self.error("unterminated association path"));
            }
            let inner: String = self.chars[start..self.pos].iter().collect();
            self.pos += 1;

            let mut parts: Vec<String> = inner.split('.').map(str::to_string).collect();
            if parts.iter().any(String::is_empty) {
                return Err(self.error("empty association path segment"));
            }
            let attribute = parts.pop().unwrap_or_default();
            if parts.is_empty() {
                return Ok(Expression::Attribute(attribute));
            }
            return Ok(Expression::AssociationPath {
                associations: parts,
                attribute,
            });
        }

        let name = self.take_word();
        if name.is_empty() {
            return Err(self.error("missing attribute name"));
        }
        Ok(Expression::Attribute(name))
    }

    fn take_word(&mut self) -> String {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| !matches!(c, '.' | '[' | ':' | '"'))
        {
            self.pos += 1;
        }
        self.chars[start..self.pos].iter().collect()
    }

    fn parse_json_segment(&mut self) -> Result<Option<JsonPathSegment>> {
        match self.peek() {
            Some('.') if self.peek_at(1) == Some('"') => {
                self.pos += 2;
                let mut key = String::new();
                loop {
                    match self.peek() {
                        None => return Err(self.error("unterminated quoted key")),
                        Some('\\') => {
                            let Some(escaped) = self.peek_at(1) else {
                                return Err(self.error("dangling escape"));
                            };
                            key.push(escaped);
                            self.pos += 2;
                        }
                        Some('"') => {
                            self.pos += 1;
                            break;
                        }
                        Some(c) => {
                            key.push(c);
                            self.pos += 1;
                        }
                    }
                }
                Ok(Some(JsonPathSegment::Key(key)))
            }
            Some('.') => {
                self.pos += 1;
                let key = self.take_word();
                if key.is_empty() {
                    return Err(self.error("empty JSON key"));
                }
                Ok(Some(JsonPathSegment::Key(key)))
            }
            Some('[') => {
                self.pos += 1;
                let start = self.pos;
                while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                    self.pos += 1;
                }
                let digits: String = self.chars[start..self.pos].iter().collect();
                if digits.is_empty() || self.peek() != Some(']') {
                    return Err(self.error("array index must be a non-negative integer"));
                }
                self.pos += 1;
                let index = digits
                    .parse()
                    .map_err(|_| self.error("array index is out of range"))?;
                Ok(Some(JsonPathSegment::Index(index)))
            }
            _ => Ok(None),
        }
    }

    fn parse_modifier(&mut self, expression: Expression) -> Result<Expression> {
        if self.peek_at(1) == Some(':') {
            self.pos += 2;
            let start = self.pos;
            while self.peek().is_some_and(|c| c != ':') {
                self.pos += 1;
            }
            let type_name: String = self.chars[start..self.pos].iter().collect();
            if type_name.trim().is_empty() {
                return Err(self.error("missing cast type"));
            }
            return Ok(Expression::Cast {
                expression: Box::new(expression),
                target: DataType::from_name(type_name.trim()),
            });
        }

        self.pos += 1;
        let name = self.take_word();
        match name.as_str() {
            "unquote" => Ok(Expression::DialectFn(DialectFn::unquote_json(expression))),
            _ => Err(self.error(&format!("unknown modifier \":{name}\""))),
        }
    }
}
