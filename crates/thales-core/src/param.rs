//! Parameter annotations and resolved parameter specifications.

use serde_json::Value;

use crate::constraints::Constraints;
use crate::dependency::Depends;
use crate::source::{Source, Style};
use crate::types::{Shape, TypeInfo};

/// Inline annotation attached to a handler parameter.
///
/// An annotation may pin the source explicitly (`Param::query()`), or leave it
/// to inference (`Param::inferred()`) and only carry constraints.
///
/// ```
/// use thales_core::{Param, Style};
///
/// let tags = Param::query()
///     .alias("tag")
///     .style(Style::PipeDelimited)
///     .explode(false)
///     .max_length(5);
/// assert_eq!(tags.alias.as_deref(), Some("tag"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct Param {
    /// Explicit source, `None` when inferred.
    pub source: Option<Source>,
    /// Wire name override.
    pub alias: Option<String>,
    /// Serialization style override.
    pub style: Option<Style>,
    /// Explode override.
    pub explode: Option<bool>,
    /// Body sub-record nested under its own key.
    pub embed: bool,
    /// Default value declared in the annotation.
    pub default: Option<Value>,
    /// Validation constraints and documentation metadata.
    pub constraints: Constraints,
    /// Dependency reference for [`Source::Dependency`].
    pub depends: Option<Depends>,
}

macro_rules! constraint_setter {
    ($($(#[$doc:meta])* $name:ident($ty:ty)),* $(,)?) => {
        $(
            $(#[$doc])*
            #[must_use]
            pub fn $name(mut self, value: $ty) -> Self {
                self.constraints = self.constraints.$name(value);
                self
            }
        )*
    };
}

impl Param {
    fn located(source: Source) -> Self {
        Self {
            source: Some(source),
            ..Self::default()
        }
    }

    /// Source left to inference.
    pub fn inferred() -> Self {
        Self::default()
    }

    /// Binds to a path placeholder.
    pub fn path() -> Self {
        Self::located(Source::Path)
    }

    /// Binds to the query string.
    pub fn query() -> Self {
        Self::located(Source::Query)
    }

    /// Binds to a header.
    pub fn header() -> Self {
        Self::located(Source::Header)
    }

    /// Binds to a cookie.
    pub fn cookie() -> Self {
        Self::located(Source::Cookie)
    }

    /// Binds to the JSON body.
    pub fn body() -> Self {
        Self::located(Source::Body)
    }

    /// Binds to the value of a dependency.
    pub fn depends(depends: Depends) -> Self {
        Self {
            depends: Some(depends),
            ..Self::located(Source::Dependency)
        }
    }

    /// Sets the wire name.
    #[must_use]
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Sets the serialization style.
    #[must_use]
    pub fn style(mut self, style: Style) -> Self {
        self.style = Some(style);
        self
    }

    /// Sets the explode flag.
    #[must_use]
    pub fn explode(mut self, explode: bool) -> Self {
        self.explode = Some(explode);
        self
    }

    /// Nests a body value under its own key.
    #[must_use]
    pub fn embed(mut self) -> Self {
        self.embed = true;
        self
    }

    /// Sets the default value.
    #[must_use]
    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Replaces all constraints.
    #[must_use]
    pub fn constraints(mut self, constraints: Constraints) -> Self {
        self.constraints = constraints;
        self
    }

    constraint_setter! {
        /// Exclusive lower bound.
        gt(impl Into<Value>),
        /// Inclusive lower bound.
        ge(impl Into<Value>),
        /// Exclusive upper bound.
        lt(impl Into<Value>),
        /// Inclusive upper bound.
        le(impl Into<Value>),
        /// Multiple of.
        multiple_of(impl Into<Value>),
        /// Minimum length.
        min_length(u64),
        /// Maximum length.
        max_length(u64),
        /// Regular expression.
        pattern(impl Into<String>),
        /// Documentation title.
        title(impl Into<String>),
        /// Documentation description.
        description(impl Into<String>),
        /// Documentation example.
        example(impl Into<Value>),
    }

    /// Allowed values.
    #[must_use]
    pub fn enum_values(mut self, values: impl IntoIterator<Item = Value>) -> Self {
        self.constraints = self.constraints.enum_values(values);
        self
    }

    /// Marks the parameter deprecated.
    #[must_use]
    pub fn deprecated(mut self) -> Self {
        self.constraints = self.constraints.deprecated();
        self
    }

    /// Adds an opaque schema keyword for documentation.
    #[must_use]
    pub fn extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.constraints = self.constraints.extra(key, value);
        self
    }

    pub(crate) fn has_binding_options(&self) -> bool {
        self.alias.is_some() || self.style.is_some() || self.explode.is_some() || self.embed
    }
}

/// A fully resolved handler parameter.
///
/// Created once at registration time by the source classifier and immutable
/// afterwards.
#[derive(Debug, Clone)]
pub struct ParameterSpec {
    /// Rust parameter name.
    pub name: String,
    /// Declared type.
    pub type_info: TypeInfo,
    /// Resolved source.
    pub source: Source,
    /// Wire name override; always `None` for path parameters and whole-body models.
    pub alias: Option<String>,
    /// Whether the value must be present.
    pub required: bool,
    /// Default used when the value is absent.
    pub default: Option<Value>,
    /// Serialization style.
    pub style: Style,
    /// Explode flag.
    pub explode: bool,
    /// Body sub-record nested under its own key.
    pub embed: bool,
    /// Constraints and opaque documentation metadata.
    pub constraints: Constraints,
    /// Dependency reference when `source` is [`Source::Dependency`].
    pub depends: Option<Depends>,
}

impl ParameterSpec {
    /// Declared type is a sequence or set.
    pub fn is_multi(&self) -> bool {
        self.type_info.shape() == Shape::Array
    }

    /// Declared type is a mapping or record.
    pub fn is_object(&self) -> bool {
        self.type_info.shape() == Shape::Object
    }

    /// The record binds to the entire JSON body.
    pub fn is_whole_body(&self) -> bool {
        self.source == Source::Body && self.type_info.is_model() && !self.embed
    }

    /// The record is a container of same-kind parameters, one per field.
    pub fn expands_fields(&self) -> bool {
        matches!(self.source, Source::Query | Source::Header | Source::Cookie)
            && self.type_info.is_model()
            && !self.embed
    }

    /// Name used on the wire; `None` for whole-body models.
    pub fn wire_name(&self) -> Option<&str> {
        if self.is_whole_body() {
            None
        } else {
            Some(self.alias.as_deref().unwrap_or(&self.name))
        }
    }
}
