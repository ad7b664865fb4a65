//! Mapping of schema keyword failures onto the public error vocabulary.

use serde_json::{json, Value};

/// Error type, message and context for a failed keyword.
pub(crate) struct Rendered {
    pub kind: String,
    pub message: String,
    pub ctx: Option<Value>,
}

fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn quoted(value: &Value) -> String {
    match value {
        Value::String(s) => format!("'{s}'"),
        other => other.to_string(),
    }
}

fn rendered(kind: &str, message: String, ctx: Option<Value>) -> Rendered {
    Rendered {
        kind: kind.to_string(),
        message,
        ctx,
    }
}

fn expected_list(values: &[Value]) -> String {
    let parts: Vec<String> = values.iter().map(quoted).collect();
    match parts.split_last() {
        None => String::new(),
        Some((last, [])) => last.clone(),
        Some((last, rest)) => format!("{} or {last}", rest.join(", ")),
    }
}

fn type_error(expected: &Value) -> Rendered {
    let name = match expected {
        Value::String(s) => s.as_str(),
        Value::Array(types) => types
            .iter()
            .filter_map(Value::as_str)
            .find(|t| *t != "null")
            .unwrap_or("null"),
        _ => "",
    };
    let (kind, noun) = match name {
        "string" => ("string_type", "a valid string"),
        "integer" => ("int_type", "a valid integer"),
        "number" => ("float_type", "a valid number"),
        "boolean" => ("bool_type", "a valid boolean"),
        "array" => ("list_type", "a valid list"),
        "object" => ("dict_type", "a valid dictionary"),
        "null" => ("none_required", "None"),
        _ => ("type_error", "of the declared type"),
    };
    rendered(kind, format!("Input should be {noun}"), None)
}

/// Renders a failed keyword.
///
/// `constraint` is the keyword's value in the schema; `instance` the failing
/// value; `fallback` the engine's own message, used for unmapped keywords.
pub(crate) fn render(keyword: &str, constraint: Option<&Value>, instance: &Value, fallback: String) -> Rendered {
    let Some(v) = constraint else {
        return rendered("value_error", fallback, None);
    };
    let shown = render_value(v);
    let length_noun = match instance {
        Value::Array(_) => "List",
        Value::Object(_) => "Dictionary",
        _ => "Value",
    };

    match keyword {
        "minimum" => rendered(
            "greater_than_equal",
            format!("Input should be greater than or equal to {shown}"),
            Some(json!({ "ge": v })),
        ),
        "exclusiveMinimum" => rendered(
            "greater_than",
            format!("Input should be greater than {shown}"),
            Some(json!({ "gt": v })),
        ),
        "maximum" => rendered(
            "less_than_equal",
            format!("Input should be less than or equal to {shown}"),
            Some(json!({ "le": v })),
        ),
        "exclusiveMaximum" => rendered(
            "less_than",
            format!("Input should be less than {shown}"),
            Some(json!({ "lt": v })),
        ),
        "multipleOf" => rendered(
            "multiple_of",
            format!("Input should be a multiple of {shown}"),
            Some(json!({ "multiple_of": v })),
        ),
        "minLength" => rendered(
            "string_too_short",
            format!("String should have at least {shown} characters"),
            Some(json!({ "min_length": v })),
        ),
        "maxLength" => rendered(
            "string_too_long",
            format!("String should have at most {shown} characters"),
            Some(json!({ "max_length": v })),
        ),
        "pattern" => rendered(
            "string_pattern_mismatch",
            format!("String should match pattern '{shown}'"),
            Some(json!({ "pattern": v })),
        ),
        "minItems" | "minProperties" => rendered(
            "too_short",
            format!("{length_noun} should have at least {shown} items"),
            Some(json!({ "min_length": v })),
        ),
        "maxItems" | "maxProperties" => rendered(
            "too_long",
            format!("{length_noun} should have at most {shown} items"),
            Some(json!({ "max_length": v })),
        ),
        "uniqueItems" => rendered("unique_items", "Set items should be unique".to_string(), None),
        "enum" => {
            let expected = v.as_array().map(|values| expected_list(values)).unwrap_or_default();
            rendered(
                "enum",
                format!("Input should be {expected}"),
                Some(json!({ "expected": expected })),
            )
        }
        "const" => rendered(
            "literal_error",
            format!("Input should be {}", quoted(v)),
            Some(json!({ "expected": quoted(v) })),
        ),
        "type" => type_error(v),
        _ => rendered("value_error", fallback, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds() {
        let r = render("exclusiveMinimum", Some(&json!(0)), &json!(0), String::new());
        assert_eq!(r.kind, "greater_than");
        assert_eq!(r.message, "Input should be greater than 0");
        assert_eq!(r.ctx, Some(json!({"gt": 0})));

        let r = render("maximum", Some(&json!(2.5)), &json!(3), String::new());
        assert_eq!(r.message, "Input should be less than or equal to 2.5");
    }

    #[test]
    fn test_lengths() {
        let r = render("maxLength", Some(&json!(3)), &json!("abcd"), String::new());
        assert_eq!(r.kind, "string_too_long");
        assert_eq!(r.message, "String should have at most 3 characters");

        let r = render("minItems", Some(&json!(1)), &json!([]), String::new());
        assert_eq!(r.kind, "too_short");
        assert_eq!(r.message, "List should have at least 1 items");
    }

    #[test]
    fn test_enum_and_pattern() {
        let r = render("enum", Some(&json!(["asc", "desc"])), &json!("up"), String::new());
        assert_eq!(r.message, "Input should be 'asc' or 'desc'");
        let r = render("enum", Some(&json!(["a", "b", "c"])), &json!("z"), String::new());
        assert_eq!(r.message, "Input should be 'a', 'b' or 'c'");

        let r = render("pattern", Some(&json!("^a+$")), &json!("b"), String::new());
        assert_eq!(r.message, "String should match pattern '^a+$'");
    }

    #[test]
    fn test_types() {
        assert_eq!(render("type", Some(&json!("array")), &json!("x"), String::new()).kind, "list_type");
        assert_eq!(
            render("type", Some(&json!(["object", "null"])), &json!(1), String::new()).kind,
            "dict_type"
        );
    }

    #[test]
    fn test_unknown_keyword_uses_engine_message() {
        let r = render("oneOf", Some(&json!([])), &json!(1), "engine says no".to_string());
        assert_eq!(r.kind, "value_error");
        assert_eq!(r.message, "engine says no");
    }
}
