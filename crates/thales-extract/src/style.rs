//! Style deserializer.
//!
//! Turns raw wire strings into structured JSON values according to the
//! declared shape, serialization style and explode flag of a parameter:
//!
//! | Shape | explode | Result |
//! |-------|---------|--------|
//! | scalar | any | the string, untouched |
//! | array | `true` | one element per occurrence (query, cookie) |
//! | array | `false` | the first occurrence split on the style delimiter |
//! | object | `false` | alternating `key,value,...` tokens |
//! | object | `true` | `key=value` tokens (path, header) |
//!
//! Nothing here rejects input. Malformed shapes degrade to the closest
//! structure and the validator reports type problems uniformly.

use serde_json::{Map, Value};
use thales_core::{Shape, Style};

/// Splits on `sep`, trimming tokens and dropping empty ones.
///
/// ```
/// use thales_extract::style::split_by;
///
/// assert_eq!(split_by(" a , b ,, ", ','), ["a", "b"]);
/// assert!(split_by(",", ',').is_empty());
/// ```
pub fn split_by(raw: &str, sep: char) -> Vec<&str> {
    raw.split(sep)
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .collect()
}

/// Reads alternating `key,value` tokens.
///
/// An odd trailing token becomes a key with an empty value. A repeated key
/// keeps its last value.
///
/// ```
/// use thales_extract::style::split_pairs;
/// use serde_json::json;
///
/// let pairs = split_pairs("role,admin,name", ',');
/// assert_eq!(serde_json::Value::Object(pairs), json!({"role": "admin", "name": ""}));
/// ```
pub fn split_pairs(raw: &str, sep: char) -> Map<String, Value> {
    let tokens = split_by(raw, sep);
    let mut pairs = Map::new();
    for chunk in tokens.chunks(2) {
        let value = chunk.get(1).copied().unwrap_or("");
        pairs.insert(chunk[0].to_string(), Value::from(value));
    }
    pairs
}

/// Reads `key=value` tokens separated by `sep`.
///
/// Each token is split at its first `kv`; empty parts are dropped, so a token
/// without a usable value becomes a key with an empty value and a token with
/// nothing usable is skipped.
///
/// ```
/// use thales_extract::style::split_key_values;
/// use serde_json::json;
///
/// let pairs = split_key_values("a=1, b==2 ,c", ',', '=');
/// assert_eq!(serde_json::Value::Object(pairs), json!({"a": "1", "b": "=2", "c": ""}));
/// ```
pub fn split_key_values(raw: &str, sep: char, kv: char) -> Map<String, Value> {
    let mut pairs = Map::new();
    for token in split_by(raw, sep) {
        let mut parts = token
            .splitn(2, kv)
            .map(str::trim)
            .filter(|part| !part.is_empty());
        if let Some(key) = parts.next() {
            let value = parts.next().unwrap_or("");
            pairs.insert(key.to_string(), Value::from(value));
        }
    }
    pairs
}

fn strings<'a>(tokens: impl IntoIterator<Item = &'a str>) -> Value {
    Value::Array(tokens.into_iter().map(Value::from).collect())
}

/// Structures a path placeholder value.
///
/// ```
/// use thales_core::Shape;
/// use thales_extract::style::path_value;
/// use serde_json::json;
///
/// assert_eq!(path_value("3,4,5", Shape::Array, false), json!(["3", "4", "5"]));
/// assert_eq!(path_value("a=1,b=2", Shape::Object, true), json!({"a": "1", "b": "2"}));
/// ```
pub fn path_value(raw: &str, shape: Shape, explode: bool) -> Value {
    match shape {
        Shape::Scalar => Value::from(raw),
        Shape::Array => strings(split_by(raw, ',')),
        Shape::Object if explode => Value::Object(split_key_values(raw, ',', '=')),
        Shape::Object => Value::Object(split_pairs(raw, ',')),
    }
}

/// Structures the occurrences of a `form`-family query or cookie parameter.
///
/// Returns `None` when the parameter did not occur at all.
///
/// ```
/// use thales_core::{Shape, Style};
/// use thales_extract::style::form_value;
/// use serde_json::json;
///
/// let tags = form_value(&["a|b", "c"], Shape::Array, Style::PipeDelimited, false);
/// assert_eq!(tags, Some(json!(["a", "b"])));
///
/// let tags = form_value(&["a|b", "c"], Shape::Array, Style::PipeDelimited, true);
/// assert_eq!(tags, Some(json!(["a|b", "c"])));
/// ```
pub fn form_value(occurrences: &[&str], shape: Shape, style: Style, explode: bool) -> Option<Value> {
    let first = *occurrences.first()?;
    let value = match shape {
        Shape::Scalar => Value::from(first),
        Shape::Array if explode => strings(occurrences.iter().copied()),
        Shape::Array => strings(split_by(first, style.delimiter())),
        // An exploded object has no name of its own on the wire.
        Shape::Object if explode => Value::Object(Map::new()),
        Shape::Object if style == Style::Form => Value::Object(split_pairs(first, ',')),
        Shape::Object => Value::Object(Map::new()),
    };
    Some(value)
}

/// Structures the occurrences of a header.
///
/// Lists gather every occurrence and split each on commas, whatever the
/// explode flag says. Returns `None` when the header is absent.
///
/// ```
/// use thales_core::Shape;
/// use thales_extract::style::header_value;
/// use serde_json::json;
///
/// let tokens = header_value(&["t1, t2", "t3"], Shape::Array, false);
/// assert_eq!(tokens, Some(json!(["t1", "t2", "t3"])));
/// ```
pub fn header_value(occurrences: &[&str], shape: Shape, explode: bool) -> Option<Value> {
    let first = *occurrences.first()?;
    let value = match shape {
        Shape::Scalar => Value::from(first),
        Shape::Array => strings(occurrences.iter().flat_map(|raw| split_by(raw, ','))),
        Shape::Object if explode => Value::Object(split_key_values(first, ',', '=')),
        Shape::Object => Value::Object(split_pairs(first, ',')),
    };
    Some(value)
}
