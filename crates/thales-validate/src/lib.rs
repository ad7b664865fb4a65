//! # Thales Validate
//!
//! JSON Schema backed [`Validator`] for the Thales binding pipeline.
//!
//! Schemas are compiled once at registration time. At request time each
//! instance goes through two passes:
//!
//! 1. **Coercion**: wire strings are converted into the declared scalar types
//!    and missing or forbidden keys are reported.
//! 2. **Schema check**: the coerced instance is checked against the compiled
//!    schema and every failed keyword is mapped onto the public error
//!    vocabulary (`greater_than`, `string_too_long`, `enum`, ...).
//!
//! All violations of both passes are returned together.
//!
//! # Example
//!
//! ```rust
//! use serde_json::json;
//! use thales_core::Validator;
//! use thales_validate::JsonSchemaValidator;
//!
//! let schema = json!({
//!     "type": "object",
//!     "properties": {"skip": {"type": "integer", "minimum": 0}},
//! });
//! let compiled = JsonSchemaValidator::new().compile(&schema).unwrap();
//!
//! assert_eq!(compiled.validate(json!({"skip": "10"})).unwrap(), json!({"skip": 10}));
//! let violations = compiled.validate(json!({"skip": "-1"})).unwrap_err();
//! assert_eq!(violations[0].kind, "greater_than_equal");
//! ```

#![doc(html_root_url = "https://docs.rs/thales-validate/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod coerce;
mod messages;

use std::fmt;
use std::sync::Arc;

use jsonschema::Validator as JsonValidator;
use serde_json::Value;
use thales_core::{CompiledSchema, ConfigError, ConfigResult, LocSegment, Validator, Violation};

use crate::coerce::{coerce, Coercion};

/// Keywords whose failures the coercion pass already reports per key.
const COERCER_KEYWORDS: &[&str] = &["required", "additionalProperties"];

/// Validation engine built on the `jsonschema` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSchemaValidator;

impl JsonSchemaValidator {
    /// Creates the engine.
    pub fn new() -> Self {
        Self
    }
}

impl Validator for JsonSchemaValidator {
    fn compile(&self, schema: &Value) -> ConfigResult<Arc<dyn CompiledSchema>> {
        let validator = jsonschema::validator_for(schema).map_err(|e| {
            tracing::error!(error = %e, "Failed to compile JSON Schema");
            ConfigError::SchemaCompilation { reason: e.to_string() }
        })?;
        Ok(Arc::new(CompiledJsonSchema {
            schema: schema.clone(),
            validator,
        }))
    }
}

/// A compiled schema together with its source document.
///
/// The source document is kept to look up the constraint behind each failed
/// keyword and to order violations by property declaration order.
pub struct CompiledJsonSchema {
    schema: Value,
    validator: JsonValidator,
}

impl fmt::Debug for CompiledJsonSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledJsonSchema")
            .field("schema", &self.schema)
            .finish_non_exhaustive()
    }
}

impl CompiledJsonSchema {
    /// Returns the schema document this validator was compiled from.
    pub fn schema(&self) -> &Value {
        &self.schema
    }

    fn property_rank(&self, path: &[LocSegment]) -> usize {
        let Some(LocSegment::Key(first)) = path.first() else {
            return usize::MAX;
        };
        self.schema
            .get("properties")
            .and_then(Value::as_object)
            .and_then(|properties| properties.keys().position(|key| key == first))
            .unwrap_or(usize::MAX)
    }
}

impl CompiledSchema for CompiledJsonSchema {
    fn validate(&self, mut instance: Value) -> Result<Value, Vec<Violation>> {
        let mut coercion = Coercion::default();
        coerce(&self.schema, &mut instance, &mut Vec::new(), &mut coercion);

        let mut violations = coercion.violations.clone();
        for error in self.validator.iter_errors(&instance) {
            let schema_path = error.schema_path.to_string();
            let keyword = schema_path.rsplit('/').next().unwrap_or_default();
            if COERCER_KEYWORDS.contains(&keyword) {
                continue;
            }
            let path = pointer_to_loc(&instance, &error.instance_path.to_string());
            if coercion.covers(&path) {
                continue;
            }
            let failing: &Value = &error.instance;
            let rendered = messages::render(
                keyword,
                self.schema.pointer(&schema_path),
                failing,
                error.to_string(),
            );
            violations.push(Violation {
                path,
                kind: rendered.kind,
                message: rendered.message,
                input: failing.clone(),
                ctx: rendered.ctx,
            });
        }

        if violations.is_empty() {
            return Ok(instance);
        }
        violations.sort_by_key(|v| self.property_rank(&v.path));
        tracing::trace!(count = violations.len(), "Instance failed validation");
        Err(violations)
    }
}

/// Converts a JSON pointer into location segments.
///
/// Segments addressing an array element in `instance` become indices; every
/// other segment is an unescaped key.
fn pointer_to_loc(instance: &Value, pointer: &str) -> Vec<LocSegment> {
    let mut loc = Vec::new();
    let mut current = Some(instance);
    for raw in pointer.split('/').skip(1) {
        let token = raw.replace("~1", "/").replace("~0", "~");
        match current {
            Some(Value::Array(items)) => match token.parse::<usize>() {
                Ok(index) => {
                    current = items.get(index);
                    loc.push(LocSegment::Index(index));
                }
                Err(_) => {
                    current = None;
                    loc.push(LocSegment::Key(token));
                }
            },
            Some(Value::Object(map)) => {
                current = map.get(&token);
                loc.push(LocSegment::Key(token));
            }
            _ => {
                current = None;
                loc.push(LocSegment::Key(token));
            }
        }
    }
    loc
}
