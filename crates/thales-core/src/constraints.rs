//! Declarative constraints and documentation metadata.

use serde_json::{Map, Value};

use crate::types::{TypeInfo, TypeKind};

/// Constraints attached to a parameter or a model field.
///
/// Numeric bounds are stored as JSON numbers so that `ge(0)` documents and
/// reports as `0`, not `0.0`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Constraints {
    /// Exclusive lower bound.
    pub gt: Option<Value>,
    /// Inclusive lower bound.
    pub ge: Option<Value>,
    /// Exclusive upper bound.
    pub lt: Option<Value>,
    /// Inclusive upper bound.
    pub le: Option<Value>,
    /// Value must be a multiple of this number.
    pub multiple_of: Option<Value>,
    /// Minimum length of a string, array or map.
    pub min_length: Option<u64>,
    /// Maximum length of a string, array or map.
    pub max_length: Option<u64>,
    /// Regular expression a string must match.
    pub pattern: Option<String>,
    /// Allowed values.
    pub enum_values: Vec<Value>,
    /// Documentation title.
    pub title: Option<String>,
    /// Documentation description.
    pub description: Option<String>,
    /// Documentation examples.
    pub examples: Vec<Value>,
    /// Marks the value as deprecated in documentation.
    pub deprecated: bool,
    /// Opaque schema keywords passed through to the document generator.
    pub extra: Map<String, Value>,
}

macro_rules! bound_setter {
    ($($(#[$doc:meta])* $name:ident),* $(,)?) => {
        $(
            $(#[$doc])*
            #[must_use]
            pub fn $name(mut self, value: impl Into<Value>) -> Self {
                self.$name = Some(value.into());
                self
            }
        )*
    };
}

impl Constraints {
    /// Creates an empty constraint set.
    pub fn new() -> Self {
        Self::default()
    }

    bound_setter! {
        /// Sets an exclusive lower bound.
        gt,
        /// Sets an inclusive lower bound.
        ge,
        /// Sets an exclusive upper bound.
        lt,
        /// Sets an inclusive upper bound.
        le,
        /// Requires a multiple of the given number.
        multiple_of,
    }

    /// Sets the minimum length.
    #[must_use]
    pub fn min_length(mut self, value: u64) -> Self {
        self.min_length = Some(value);
        self
    }

    /// Sets the maximum length.
    #[must_use]
    pub fn max_length(mut self, value: u64) -> Self {
        self.max_length = Some(value);
        self
    }

    /// Sets a regular expression.
    #[must_use]
    pub fn pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    /// Restricts the value to the given set.
    #[must_use]
    pub fn enum_values(mut self, values: impl IntoIterator<Item = Value>) -> Self {
        self.enum_values = values.into_iter().collect();
        self
    }

    /// Sets the documentation title.
    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Sets the documentation description.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Adds a documentation example.
    #[must_use]
    pub fn example(mut self, example: impl Into<Value>) -> Self {
        self.examples.push(example.into());
        self
    }

    /// Marks the value as deprecated.
    #[must_use]
    pub fn deprecated(mut self) -> Self {
        self.deprecated = true;
        self
    }

    /// Adds an opaque schema keyword.
    #[must_use]
    pub fn extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// True when no validation constraint is set (documentation metadata is ignored).
    pub fn is_unconstrained(&self) -> bool {
        self.gt.is_none()
            && self.ge.is_none()
            && self.lt.is_none()
            && self.le.is_none()
            && self.multiple_of.is_none()
            && self.min_length.is_none()
            && self.max_length.is_none()
            && self.pattern.is_none()
            && self.enum_values.is_empty()
    }

    fn numeric_bounds(&self) -> impl Iterator<Item = (&'static str, &Value)> {
        [
            ("gt", &self.gt),
            ("ge", &self.ge),
            ("lt", &self.lt),
            ("le", &self.le),
            ("multiple_of", &self.multiple_of),
        ]
        .into_iter()
        .filter_map(|(name, value)| value.as_ref().map(|v| (name, v)))
    }

    /// Checks that every constraint applies to the declared type.
    ///
    /// Returns the reason on failure; callers wrap it into a configuration error.
    pub fn check_applicable(&self, type_info: &TypeInfo) -> Result<(), String> {
        let kind = &type_info.kind;
        let any = matches!(kind, TypeKind::Any);

        for (name, value) in self.numeric_bounds() {
            if !value.is_number() {
                return Err(format!("constraint '{name}' must be a number"));
            }
            if !any && !matches!(kind, TypeKind::Integer | TypeKind::Number) {
                return Err(format!("constraint '{name}' requires a numeric type"));
            }
        }

        if (self.min_length.is_some() || self.max_length.is_some())
            && !any
            && !matches!(
                kind,
                TypeKind::String | TypeKind::Array { .. } | TypeKind::Map { .. }
            )
        {
            return Err("length constraints require a string, array or map type".to_string());
        }

        if let (Some(min), Some(max)) = (self.min_length, self.max_length) {
            if min > max {
                return Err("min_length is greater than max_length".to_string());
            }
        }

        if let Some(pattern) = &self.pattern {
            if !any && !matches!(kind, TypeKind::String) {
                return Err("constraint 'pattern' requires a string type".to_string());
            }
            regex::Regex::new(pattern).map_err(|e| format!("invalid pattern: {e}"))?;
        }

        Ok(())
    }
}
