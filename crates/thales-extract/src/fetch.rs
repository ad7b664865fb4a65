//! Assembly of per-source validation instances.

use serde_json::{Map, Value};
use thales_core::{GroupLayout, LocSegment, Source, SourceGroup, ValidationError};

use crate::context::RequestBindingContext;
use crate::style::{form_value, header_value, path_value};

/// Builds the instance validated against a source group's schema.
///
/// For [`GroupLayout::Fields`] the instance is an object keyed by wire name
/// holding only the values present in the request; absent values are left
/// for the validator to report or for defaults to fill. For
/// [`GroupLayout::WholeBody`] the instance is the JSON body itself, or `{}`
/// when no body was sent.
///
/// The only failure is an unparseable JSON body, reported at `["body"]`.
pub fn fetch_group(ctx: &RequestBindingContext, group: &SourceGroup) -> Result<Value, ValidationError> {
    let body = if group.source == Source::Body {
        ctx.json_body().map_err(|e| {
            ValidationError::new(
                vec![LocSegment::from(Source::Body)],
                "json_invalid",
                format!("Invalid JSON: {}", e.message),
                Value::String(String::from_utf8_lossy(ctx.body()).into_owned()),
            )
        })?
    } else {
        None
    };

    if group.layout == GroupLayout::WholeBody {
        return Ok(body.cloned().unwrap_or_else(|| Value::Object(Map::new())));
    }

    let mut instance = Map::new();
    for binding in &group.bindings {
        let wire = binding.wire.as_str();
        let shape = binding.type_info.shape();
        let value = match group.source {
            Source::Path => ctx
                .path_param(wire)
                .map(|raw| path_value(raw, shape, binding.explode)),
            Source::Query => form_value(&ctx.query_values(wire), shape, binding.style, binding.explode),
            Source::Cookie => form_value(&ctx.cookie_values(wire), shape, binding.style, binding.explode),
            Source::Header => header_value(&ctx.header_values(wire), shape, binding.explode),
            Source::Body => body.and_then(|b| b.get(wire)).cloned(),
            Source::Dependency => None,
        };
        if let Some(value) = value {
            instance.insert(binding.wire.clone(), value);
        }
    }
    Ok(Value::Object(instance))
}
