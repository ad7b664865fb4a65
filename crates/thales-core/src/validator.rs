//! Contract between the binding pipeline and a validation engine.
//!
//! The engine itself is pluggable: the pipeline hands it one JSON Schema per
//! source group at registration time and one structured instance per group at
//! request time. Engines coerce wire strings into the declared scalar types
//! and report every violation with a path relative to the instance; the
//! pipeline then prefixes that path with the originating source.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::error::{ConfigResult, LocSegment};

/// One violation reported by a validation engine.
#[derive(Debug, Clone, PartialEq)]
pub struct Violation {
    /// Path inside the validated instance.
    pub path: Vec<LocSegment>,
    /// Machine readable kind.
    pub kind: String,
    /// Human readable message.
    pub message: String,
    /// Offending input.
    pub input: Value,
    /// Optional machine context.
    pub ctx: Option<Value>,
}

/// A schema compiled once at registration time.
pub trait CompiledSchema: Send + Sync + fmt::Debug {
    /// Validates and coerces `instance`.
    ///
    /// Returns the coerced instance, or every violation found. Implementations
    /// must not stop at the first violation.
    fn validate(&self, instance: Value) -> Result<Value, Vec<Violation>>;
}

/// A validation engine.
pub trait Validator: Send + Sync {
    /// Compiles a JSON Schema document.
    fn compile(&self, schema: &Value) -> ConfigResult<Arc<dyn CompiledSchema>>;
}

impl<V: Validator + ?Sized> Validator for Arc<V> {
    fn compile(&self, schema: &Value) -> ConfigResult<Arc<dyn CompiledSchema>> {
        (**self).compile(schema)
    }
}
