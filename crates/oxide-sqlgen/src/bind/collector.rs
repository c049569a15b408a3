//! Assigns dialect-native tokens to bind parameter names.

/// Per-statement placeholder allocator.
///
/// Create one through [`crate::Dialect::create_bind_collector`] for every
/// statement and drop it once the statement has been mapped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindCollector {
    /// Every parameter is the same token and values are bound by order of
    /// appearance, such as `?`.
    UnspecifiedOrdered {
        /// The token emitted for every parameter.
        token: &'static str,
        /// Names in order of appearance, repeats included.
        order: Vec<String>,
    },
    /// Parameters are numbered, such as `$1`. A repeated name reuses the
    /// number it first received.
    SpecifiedOrdered {
        /// Prefix placed before the 1-based number.
        prefix: &'static str,
        /// Distinct names in order of first appearance.
        order: Vec<String>,
    },
    /// The driver accepts names directly, such as `@name` or `:name`.
    Named {
        /// Prefix placed before the name.
        prefix: &'static str,
    },
}

impl BindCollector {
    #[must_use]
    pub const fn unspecified_ordered(token: &'static str) -> Self {
        Self::UnspecifiedOrdered {
            token,
            order: Vec::new(),
        }
    }

    #[must_use]
    pub const fn specified_ordered(prefix: &'static str) -> Self {
        Self::SpecifiedOrdered {
            prefix,
            order: Vec::new(),
        }
    }

    #[must_use]
    pub const fn named(prefix: &'static str) -> Self {
        Self::Named { prefix }
    }

    /// Returns the token that replaces `$name` in the mapped SQL.
    pub fn collect(&mut self, name: &str) -> String {
        match self {
            Self::UnspecifiedOrdered { token, order } => {
                order.push(name.to_string());
                (*token).to_string()
            }
            Self::SpecifiedOrdered { prefix, order } => {
                let position = match order.iter().position(|known| known == name) {
                    Some(position) => position,
                    None => {
                        order.push(name.to_string());
                        order.len() - 1
                    }
                };
                format!("{prefix}{}", position + 1)
            }
            Self::Named { prefix } => format!("{prefix}{name}"),
        }
    }

    /// Returns the order in which values must be bound, or `None` when the
    /// driver takes a name to value map.
    #[must_use]
    pub fn bind_parameter_order(&self) -> Option<&[String]> {
        match self {
            Self::UnspecifiedOrdered { order, .. } | Self::SpecifiedOrdered { order, .. } => {
                Some(order)
            }
            Self::Named { .. } => None,
        }
    }

    /// Consumes the collector and returns its bind order.
    #[must_use]
    pub fn into_bind_parameter_order(self) -> Option<Vec<String>> {
        match self {
            Self::UnspecifiedOrdered { order, .. } | Self::SpecifiedOrdered { order, .. } => {
                Some(order)
            }
            Self::Named { .. } => None,
        }
    }
}
