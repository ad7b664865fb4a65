//! Lax coercion of wire strings into the declared scalar types.
//!
//! Runs before schema validation. Strings are converted to integers,
//! numbers or booleans wherever the schema asks for one of those and does
//! not also accept a string. The pass also reports missing required keys
//! and keys rejected by closed records, one violation per key, and fills
//! absent record keys that declare a default.

use serde_json::{Map, Number, Value};
use thales_core::{LocSegment, Violation};

/// Outcome of a coercion pass.
#[derive(Debug, Default)]
pub(crate) struct Coercion {
    /// Violations found while coercing.
    pub violations: Vec<Violation>,
    /// Paths whose value could not be coerced; schema errors under them are noise.
    pub failed: Vec<Vec<LocSegment>>,
}

impl Coercion {
    fn fail(&mut self, path: &[LocSegment], kind: &str, message: &str, input: Value) {
        self.violations.push(Violation {
            path: path.to_vec(),
            kind: kind.to_string(),
            message: message.to_string(),
            input,
            ctx: None,
        });
        self.failed.push(path.to_vec());
    }

    /// True when `path` is at or below a failed coercion.
    pub fn covers(&self, path: &[LocSegment]) -> bool {
        self.failed.iter().any(|failed| path.starts_with(failed))
    }
}

fn declared_types(schema: &Value) -> Vec<&str> {
    match schema.get("type") {
        Some(Value::String(ty)) => vec![ty.as_str()],
        Some(Value::Array(types)) => types.iter().filter_map(Value::as_str).collect(),
        _ => Vec::new(),
    }
}

/// Accepted spellings of booleans on the wire.
pub(crate) fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" | "t" | "y" => Some(true),
        "false" | "0" | "no" | "off" | "f" | "n" => Some(false),
        _ => None,
    }
}

fn parse_integer(raw: &str) -> Option<Number> {
    let raw = raw.trim();
    raw.parse::<i64>()
        .map(Number::from)
        .or_else(|_| raw.parse::<u64>().map(Number::from))
        .ok()
}

fn parse_number(raw: &str) -> Option<Number> {
    let raw = raw.trim();
    if let Some(integer) = parse_integer(raw) {
        return Some(integer);
    }
    raw.parse::<f64>().ok().and_then(Number::from_f64)
}

/// Coerces `value` in place against `schema`.
pub(crate) fn coerce(schema: &Value, value: &mut Value, path: &mut Vec<LocSegment>, out: &mut Coercion) {
    let types = declared_types(schema);

    if let Value::String(raw) = value {
        if types.is_empty() || types.contains(&"string") {
            return;
        }
        let converted = if types.contains(&"integer") {
            parse_integer(raw).map(Value::Number).ok_or((
                "int_parsing",
                "Input should be a valid integer, unable to parse string as an integer",
            ))
        } else if types.contains(&"number") {
            parse_number(raw).map(Value::Number).ok_or((
                "float_parsing",
                "Input should be a valid number, unable to parse string as a number",
            ))
        } else if types.contains(&"boolean") {
            parse_bool(raw).map(Value::Bool).ok_or((
                "bool_parsing",
                "Input should be a valid boolean, unable to interpret input",
            ))
        } else {
            return;
        };
        match converted {
            Ok(converted) => *value = converted,
            Err((kind, message)) => {
                let input = value.clone();
                out.fail(path, kind, message, input);
            }
        }
        return;
    }

    match value {
        Value::Array(items) => {
            if let Some(item_schema) = schema.get("items") {
                for (index, item) in items.iter_mut().enumerate() {
                    path.push(LocSegment::Index(index));
                    coerce(item_schema, item, path, out);
                    path.pop();
                }
            }
        }
        Value::Object(map) => coerce_object(schema, map, path, out),
        _ => {}
    }
}

fn coerce_object(
    schema: &Value,
    map: &mut Map<String, Value>,
    path: &mut Vec<LocSegment>,
    out: &mut Coercion,
) {
    let properties = schema.get("properties").and_then(Value::as_object);

    if let Some(required) = schema.get("required").and_then(Value::as_array) {
        let input = Value::Object(map.clone());
        for key in required.iter().filter_map(Value::as_str) {
            if !map.contains_key(key) {
                path.push(LocSegment::from(key));
                out.fail(path, "missing", "Field required", input.clone());
                path.pop();
            }
        }
    }

    if let Some(properties) = properties {
        for (key, property) in properties {
            if let (false, Some(default)) = (map.contains_key(key), property.get("default")) {
                map.insert(key.clone(), default.clone());
            }
        }
    }

    let additional = schema.get("additionalProperties");
    for (key, item) in map.iter_mut() {
        path.push(LocSegment::from(key.as_str()));
        match (properties.and_then(|p| p.get(key)), additional) {
            (Some(property), _) => coerce(property, item, path, out),
            (None, Some(Value::Bool(false))) => {
                let input = item.clone();
                out.fail(path, "extra_forbidden", "Extra inputs are not permitted", input);
            }
            (None, Some(extra)) if extra.is_object() => coerce(extra, item, path, out),
            _ => {}
        }
        path.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn run(schema: Value, mut value: Value) -> (Value, Coercion) {
        let mut out = Coercion::default();
        coerce(&schema, &mut value, &mut Vec::new(), &mut out);
        (value, out)
    }

    #[test]
    fn test_scalars() {
        assert_eq!(run(json!({"type": "integer"}), json!("42")).0, json!(42));
        assert_eq!(run(json!({"type": "number"}), json!("2.5")).0, json!(2.5));
        assert_eq!(run(json!({"type": "number"}), json!("3")).0, json!(3));
        assert_eq!(run(json!({"type": "boolean"}), json!("Yes")).0, json!(true));
        assert_eq!(run(json!({"type": ["integer", "null"]}), json!("7")).0, json!(7));
        assert_eq!(run(json!({"type": "string"}), json!("42")).0, json!("42"));
        assert_eq!(run(json!({}), json!("42")).0, json!("42"));
    }

    #[test]
    fn test_parse_failures() {
        let (value, out) = run(json!({"type": "integer"}), json!("abc"));
        assert_eq!(value, json!("abc"));
        assert_eq!(out.violations[0].kind, "int_parsing");
        assert!(out.covers(&[]));

        let (_, out) = run(json!({"type": "number"}), json!("inf"));
        assert_eq!(out.violations[0].kind, "float_parsing");

        let (_, out) = run(json!({"type": "boolean"}), json!("maybe"));
        assert_eq!(out.violations[0].kind, "bool_parsing");
    }

    #[test]
    fn test_nested_paths() {
        let schema = json!({
            "type": "object",
            "properties": {
                "ids": {"type": "array", "items": {"type": "integer"}},
                "flag": {"type": "boolean"}
            },
            "required": ["ids", "flag", "name"]
        });
        let (value, out) = run(schema, json!({"ids": ["1", "x", "3"], "flag": "off"}));
        assert_eq!(value["ids"], json!([1, "x", 3]));
        assert_eq!(value["flag"], json!(false));

        let kinds: Vec<_> = out.violations.iter().map(|v| v.kind.as_str()).collect();
        assert_eq!(kinds, ["missing", "int_parsing"]);
        assert_eq!(out.violations[0].path, vec![LocSegment::from("name")]);
        assert_eq!(out.violations[1].path, vec![LocSegment::from("ids"), LocSegment::Index(1)]);
    }

    #[test]
    fn test_closed_and_open_maps() {
        let closed = json!({"type": "object", "properties": {"a": {"type": "integer"}}, "additionalProperties": false});
        let (_, out) = run(closed, json!({"a": "1", "b": 2}));
        assert_eq!(out.violations.len(), 1);
        assert_eq!(out.violations[0].kind, "extra_forbidden");
        assert_eq!(out.violations[0].input, json!(2));

        let map = json!({"type": "object", "additionalProperties": {"type": "integer"}});
        let (value, out) = run(map, json!({"x": "1", "y": "2"}));
        assert!(out.violations.is_empty());
        assert_eq!(value, json!({"x": 1, "y": 2}));
    }

    #[test]
    fn test_absent_keys_take_defaults() {
        let schema = json!({
            "type": "object",
            "properties": {
                "q": {"type": "string"},
                "page": {"type": "integer", "default": 1},
                "sort": {
                    "type": "object",
                    "properties": {"desc": {"type": "boolean", "default": false}}
                }
            },
            "required": ["q"]
        });
        let (value, out) = run(schema.clone(), json!({"q": "lamp", "sort": {}}));
        assert!(out.violations.is_empty());
        assert_eq!(value, json!({"q": "lamp", "page": 1, "sort": {"desc": false}}));

        let (value, _) = run(schema, json!({"q": "lamp", "page": "4"}));
        assert_eq!(value, json!({"q": "lamp", "page": 4}));
    }

    proptest! {
        #[test]
        fn prop_integer_strings_round_trip(n in any::<i64>()) {
            let (value, out) = run(json!({"type": "integer"}), json!(n.to_string()));
            prop_assert!(out.violations.is_empty());
            prop_assert_eq!(value, json!(n));
        }

        #[test]
        fn prop_non_numeric_strings_never_coerce(raw in "[a-z]{1,10}") {
            let (value, out) = run(json!({"type": "integer"}), json!(raw.clone()));
            prop_assert_eq!(value, json!(raw));
            prop_assert_eq!(out.violations.len(), 1);
        }
    }
}
