//! Error types for Thales.
//!
//! Two classes of errors exist and they never mix:
//!
//! | Type | Raised | Effect |
//! |------|--------|--------|
//! | [`ConfigError`] | route registration | fatal, aborts startup |
//! | [`ValidationError`] | request binding | collected into [`ValidationErrors`] and rendered |
//!
//! Request-time errors are data rather than `Err` values of the pipeline so that
//! every violation across every source can be reported in a single response.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

use crate::source::{Source, Style};

/// Result type alias using [`ConfigError`].
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Registration-time configuration errors.
///
/// Every variant describes a structural problem in a handler declaration, a
/// dependency graph or the binding configuration. These are surfaced before
/// the server accepts traffic and are never deferred to request time.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A parameter annotation is malformed or conflicts with its declared type.
    #[error("invalid annotation for '{param}' in '{handler}': {reason}")]
    InvalidAnnotation {
        /// Handler or dependency that declares the parameter.
        handler: String,
        /// Parameter name.
        param: String,
        /// Why the annotation was rejected.
        reason: String,
    },

    /// The serialization style is not allowed for the parameter location.
    #[error("style '{style}' is not supported for {location} parameter '{param}'")]
    UnsupportedStyle {
        /// Parameter name.
        param: String,
        /// Requested style.
        style: Style,
        /// Parameter location.
        location: Source,
    },

    /// `embed` was requested on a location other than the body.
    #[error("embed is only supported for body parameters, '{param}' binds to {location}")]
    EmbedNotAllowed {
        /// Parameter name.
        param: String,
        /// Parameter location.
        location: Source,
    },

    /// The declared default and the annotation default disagree.
    #[error("default value mismatch for '{param}' in '{handler}'")]
    DefaultMismatch {
        /// Handler or dependency that declares the parameter.
        handler: String,
        /// Parameter name.
        param: String,
    },

    /// Two parameters resolve to the same wire name in the same location.
    #[error("Duplicate parameter: [name={name}, in={location}]")]
    DuplicateParameter {
        /// Wire name after alias resolution.
        name: String,
        /// Parameter location.
        location: Source,
    },

    /// A whole-body model was combined with other body parameters.
    #[error("Multiple body parameters in '{handler}'")]
    MultipleBodyParameters {
        /// Handler or dependency name.
        handler: String,
    },

    /// A path parameter does not match any placeholder of the route template.
    #[error("path parameter '{param}' does not appear in route '{rule}'")]
    UnknownPlaceholder {
        /// Parameter name.
        param: String,
        /// Route template.
        rule: String,
    },

    /// A header wire name is not a valid HTTP header name.
    #[error("'{name}' is not a valid header name")]
    InvalidHeaderName {
        /// The rejected name.
        name: String,
    },

    /// The dependency graph contains a cycle.
    #[error("dependency cycle detected: {}", .cycle.join(" -> "))]
    DependencyCycle {
        /// Dependency names along the cycle, first element repeated at the end.
        cycle: Vec<String>,
    },

    /// The same endpoint and method were registered twice.
    #[error("route '{name}' is already registered for {method}")]
    DuplicateRoute {
        /// Endpoint name.
        name: String,
        /// HTTP method.
        method: String,
    },

    /// The validator rejected a generated schema.
    #[error("failed to compile validation schema: {reason}")]
    SchemaCompilation {
        /// Reason reported by the validator.
        reason: String,
    },

    /// Invalid configuration value.
    #[error("invalid configuration value for {field}: {reason}")]
    InvalidValue {
        /// The field with the invalid value.
        field: String,
        /// Explanation of why the value is invalid.
        reason: String,
    },

    /// Configuration file not found.
    #[error("configuration file not found: {path}")]
    FileNotFound {
        /// Path to the missing file.
        path: PathBuf,
    },

    /// Failed to read configuration file.
    #[error("failed to read configuration file: {path}")]
    ReadError {
        /// Path to the file.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// TOML parsing error.
    #[error("failed to parse TOML configuration: {0}")]
    Toml(#[from] toml::de::Error),

    /// JSON parsing error.
    #[error("failed to parse JSON configuration: {0}")]
    Json(#[from] serde_json::Error),
}

impl ConfigError {
    pub(crate) fn annotation(
        handler: impl Into<String>,
        param: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidAnnotation {
            handler: handler.into(),
            param: param.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_value(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// One segment of a validation error location.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LocSegment {
    /// Object key or parameter name.
    Key(String),
    /// Array index.
    Index(usize),
}

impl fmt::Display for LocSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(key) => f.write_str(key),
            Self::Index(index) => write!(f, "{index}"),
        }
    }
}

impl From<&str> for LocSegment {
    fn from(value: &str) -> Self {
        Self::Key(value.to_string())
    }
}

impl From<String> for LocSegment {
    fn from(value: String) -> Self {
        Self::Key(value)
    }
}

impl From<usize> for LocSegment {
    fn from(value: usize) -> Self {
        Self::Index(value)
    }
}

impl From<Source> for LocSegment {
    fn from(value: Source) -> Self {
        Self::Key(value.as_str().to_string())
    }
}

/// A single request-time validation failure.
///
/// Serializes to the public error shape:
///
/// ```json
/// {"input": "abc", "loc": ["query", "skip"], "msg": "...", "type": "int_parsing"}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationError {
    /// The offending input, as received.
    pub input: Value,
    /// Location from the outermost source down to the deepest field.
    pub loc: Vec<LocSegment>,
    /// Human readable message.
    pub msg: String,
    /// Machine readable kind, e.g. `int_parsing` or `missing`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Optional machine context, e.g. `{"gt": 0}`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ctx: Option<Value>,
}

impl ValidationError {
    /// Creates a new validation error.
    pub fn new(
        loc: Vec<LocSegment>,
        kind: impl Into<String>,
        msg: impl Into<String>,
        input: Value,
    ) -> Self {
        Self {
            input,
            loc,
            msg: msg.into(),
            kind: kind.into(),
            ctx: None,
        }
    }

    /// Attaches machine context.
    #[must_use]
    pub fn with_ctx(mut self, ctx: Value) -> Self {
        self.ctx = Some(ctx);
        self
    }

    /// Returns the location joined with dots, e.g. `query.skip`.
    pub fn dotted_loc(&self) -> String {
        self.loc
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(".")
    }
}

/// Ordered collection of validation errors for one request.
#[derive(Error, Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[error("{} validation error(s)", .0.len())]
#[serde(transparent)]
pub struct ValidationErrors(Vec<ValidationError>);

impl ValidationErrors {
    /// Creates an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an error.
    pub fn push(&mut self, error: ValidationError) {
        self.0.push(error);
    }

    /// Returns true if no errors were collected.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the number of errors.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterates over the errors in collection order.
    pub fn iter(&self) -> std::slice::Iter<'_, ValidationError> {
        self.0.iter()
    }

    /// Consumes the collection.
    pub fn into_vec(self) -> Vec<ValidationError> {
        self.0
    }

    /// Renders the `{"errors": [...]}` envelope.
    pub fn to_body(&self) -> Value {
        json!({ "errors": self.0 })
    }
}

impl Extend<ValidationError> for ValidationErrors {
    fn extend<T: IntoIterator<Item = ValidationError>>(&mut self, iter: T) {
        self.0.extend(iter);
    }
}

impl From<Vec<ValidationError>> for ValidationErrors {
    fn from(errors: Vec<ValidationError>) -> Self {
        Self(errors)
    }
}

impl IntoIterator for ValidationErrors {
    type Item = ValidationError;
    type IntoIter = std::vec::IntoIter<ValidationError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a ValidationErrors {
    type Item = &'a ValidationError;
    type IntoIter = std::slice::Iter<'a, ValidationError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
