//! JSON Schema generation and the per-route schema builder.
//!
//! [`json_schema`] renders a declared type with its constraints inline, which
//! is what validation engines consume. [`json_schema_with_refs`] renders
//! records as `$ref`s into a [`Definitions`] table, which is what the API
//! document uses.
//!
//! [`build_groups`] compiles the parameters of one route into one composite
//! object schema per source, so that all query parameters validate together
//! and report one combined error set.

use std::collections::HashSet;
use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::{json, Map, Value};

use crate::classify::check_header_name;
use crate::constraints::Constraints;
use crate::error::{ConfigError, ConfigResult};
use crate::param::ParameterSpec;
use crate::source::{Source, Style};
use crate::types::{ModelInfo, TypeInfo, TypeKind};
use crate::validator::{CompiledSchema, Validator};

/// Prefix of component references in the API document.
pub const REF_PREFIX: &str = "#/components/schemas/";

/// Record schemas collected while rendering with references.
#[derive(Debug, Clone, Default)]
pub struct Definitions {
    schemas: IndexMap<String, Value>,
    conflicts: Vec<String>,
}

impl Definitions {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a schema; a different schema under a known name is a conflict.
    pub fn insert(&mut self, name: &str, schema: Value) {
        match self.schemas.get(name) {
            Some(existing) if existing != &schema => {
                if !self.conflicts.iter().any(|c| c == name) {
                    self.conflicts.push(name.to_string());
                }
            }
            Some(_) => {}
            None => {
                self.schemas.insert(name.to_string(), schema);
            }
        }
    }

    /// Returns a schema by name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.schemas.get(name)
    }

    /// Names registered with two different structures.
    pub fn conflicts(&self) -> &[String] {
        &self.conflicts
    }

    /// Consumes the table, returning schemas in first-use order.
    pub fn into_schemas(self) -> IndexMap<String, Value> {
        self.schemas
    }
}

/// Renders a type with every record inlined.
pub fn json_schema(type_info: &TypeInfo, constraints: &Constraints) -> Value {
    render(type_info, constraints, None)
}

/// Renders a type with records as references into `definitions`.
pub fn json_schema_with_refs(
    type_info: &TypeInfo,
    constraints: &Constraints,
    definitions: &mut Definitions,
) -> Value {
    render(type_info, constraints, Some(definitions))
}

/// Renders the object schema of a record.
pub fn model_schema(model: &ModelInfo, definitions: Option<&mut Definitions>) -> Value {
    let mut definitions = definitions;
    let mut properties = Map::new();
    let mut required = Vec::new();

    for field in &model.fields {
        let mut schema = render(&field.type_info, &field.constraints, definitions.as_deref_mut());
        if let (Some(default), Value::Object(map)) = (&field.default, &mut schema) {
            map.insert("default".into(), default.clone());
        }
        properties.insert(field.wire_name().to_string(), schema);
        if field.required {
            required.push(Value::from(field.wire_name()));
        }
    }

    let mut schema = Map::new();
    schema.insert("type".into(), json!("object"));
    schema.insert("title".into(), json!(model.name));
    if let Some(description) = &model.description {
        schema.insert("description".into(), json!(description));
    }
    schema.insert("properties".into(), Value::Object(properties));
    if !required.is_empty() {
        schema.insert("required".into(), Value::Array(required));
    }
    if model.closed {
        schema.insert("additionalProperties".into(), json!(false));
    }
    Value::Object(schema)
}

fn render(
    type_info: &TypeInfo,
    constraints: &Constraints,
    mut definitions: Option<&mut Definitions>,
) -> Value {
    let mut is_ref = false;
    let mut schema = match &type_info.kind {
        TypeKind::Array { items, unique } => {
            let mut map = Map::new();
            map.insert("type".into(), json!("array"));
            map.insert(
                "items".into(),
                render(items, &Constraints::default(), definitions.as_deref_mut()),
            );
            if *unique {
                map.insert("uniqueItems".into(), json!(true));
            }
            map
        }
        TypeKind::Map { values } => {
            let mut map = Map::new();
            map.insert("type".into(), json!("object"));
            map.insert(
                "additionalProperties".into(),
                render(values, &Constraints::default(), definitions.as_deref_mut()),
            );
            map
        }
        TypeKind::Model(model) => match definitions {
            Some(definitions) => {
                let body = model_schema(model, Some(&mut *definitions));
                definitions.insert(&model.name, body);
                is_ref = true;
                let mut map = Map::new();
                map.insert("$ref".into(), json!(format!("{REF_PREFIX}{}", model.name)));
                map
            }
            None => match model_schema(model, None) {
                Value::Object(map) => map,
                _ => Map::new(),
            },
        },
        TypeKind::Any => Map::new(),
        _ => {
            let mut map = Map::new();
            if let Some(ty) = type_info.json_type() {
                map.insert("type".into(), json!(ty));
            }
            map
        }
    };

    if type_info.nullable {
        if is_ref {
            let reference = Value::Object(std::mem::take(&mut schema));
            schema.insert("anyOf".into(), json!([reference, {"type": "null"}]));
        } else if let Some(Value::String(ty)) = schema.get("type").cloned() {
            schema.insert("type".into(), json!([ty, "null"]));
        }
    }

    apply_constraints(&mut schema, type_info, constraints);
    Value::Object(schema)
}

fn apply_constraints(schema: &mut Map<String, Value>, type_info: &TypeInfo, c: &Constraints) {
    let mut put = |key: &str, value: Option<Value>| {
        if let Some(value) = value {
            schema.insert(key.to_string(), value);
        }
    };

    put("exclusiveMinimum", c.gt.clone());
    put("minimum", c.ge.clone());
    put("exclusiveMaximum", c.lt.clone());
    put("maximum", c.le.clone());
    put("multipleOf", c.multiple_of.clone());

    let (min_key, max_key) = match type_info.kind {
        TypeKind::Array { .. } => ("minItems", "maxItems"),
        TypeKind::Map { .. } | TypeKind::Model(_) => ("minProperties", "maxProperties"),
        _ => ("minLength", "maxLength"),
    };
    put(min_key, c.min_length.map(Value::from));
    put(max_key, c.max_length.map(Value::from));
    put("pattern", c.pattern.clone().map(Value::from));
    put(
        "enum",
        (!c.enum_values.is_empty()).then(|| Value::Array(c.enum_values.clone())),
    );
    put("title", c.title.clone().map(Value::from));
    put("description", c.description.clone().map(Value::from));
    put(
        "examples",
        (!c.examples.is_empty()).then(|| Value::Array(c.examples.clone())),
    );
    put("deprecated", c.deprecated.then_some(Value::Bool(true)));

    for (key, value) in &c.extra {
        schema.insert(key.clone(), value.clone());
    }
}

/// How a source group maps onto its validated instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupLayout {
    /// The instance is an object keyed by wire name.
    Fields,
    /// The instance is the whole JSON body, validated as one record.
    WholeBody,
}

/// One wire value fetched from the request.
#[derive(Debug, Clone)]
pub struct FieldBinding {
    /// Owning parameter name.
    pub param: String,
    /// Wire name; empty for whole-body bindings.
    pub wire: String,
    /// Declared type of the value.
    pub type_info: TypeInfo,
    /// Serialization style.
    pub style: Style,
    /// Explode flag.
    pub explode: bool,
    /// Whether the value must be present.
    pub required: bool,
    /// Default used when absent.
    pub default: Option<Value>,
    /// Constraints and documentation metadata.
    pub constraints: Constraints,
    /// The value is one field of a record parameter expanded into the source.
    pub model_field: bool,
}

/// All parameters of a route bound to one source, with their composite schema.
#[derive(Debug, Clone)]
pub struct SourceGroup {
    /// The source.
    pub source: Source,
    /// Instance layout.
    pub layout: GroupLayout,
    /// Wire values in declaration order.
    pub bindings: Vec<FieldBinding>,
    /// Composite JSON Schema.
    pub schema: Value,
}

/// A source group with its compiled schema.
#[derive(Debug, Clone)]
pub struct CompiledGroup {
    /// The group.
    pub group: SourceGroup,
    /// Schema compiled by the validation engine.
    pub compiled: Arc<dyn CompiledSchema>,
}

/// Groups parameters by source into composite schemas.
///
/// Fails on duplicate wire names within a source and on a whole-body record
/// combined with any other body parameter.
pub fn build_groups(handler: &str, params: &[ParameterSpec]) -> ConfigResult<Vec<SourceGroup>> {
    let mut by_source: IndexMap<Source, Vec<&ParameterSpec>> = IndexMap::new();
    for param in params.iter().filter(|p| p.source != Source::Dependency) {
        by_source.entry(param.source).or_default().push(param);
    }

    by_source
        .into_iter()
        .map(|(source, params)| build_group(handler, source, &params))
        .collect()
}

fn build_group(handler: &str, source: Source, params: &[&ParameterSpec]) -> ConfigResult<SourceGroup> {
    if let Some(whole) = params.iter().find(|p| p.is_whole_body()) {
        if params.len() > 1 {
            return Err(ConfigError::MultipleBodyParameters {
                handler: handler.to_string(),
            });
        }
        let binding = FieldBinding {
            param: whole.name.clone(),
            wire: String::new(),
            type_info: whole.type_info.clone(),
            style: whole.style,
            explode: whole.explode,
            required: whole.required,
            default: whole.default.clone(),
            constraints: whole.constraints.clone(),
            model_field: false,
        };
        return Ok(SourceGroup {
            source,
            layout: GroupLayout::WholeBody,
            bindings: vec![binding],
            schema: json_schema(&whole.type_info, &whole.constraints),
        });
    }

    let mut seen = HashSet::new();
    let mut bindings = Vec::new();
    let mut properties = Map::new();
    let mut required = Vec::new();

    let mut push = |binding: FieldBinding| -> ConfigResult<()> {
        let key = if source == Source::Header {
            check_header_name(&binding.wire)?;
            binding.wire.to_ascii_lowercase()
        } else {
            binding.wire.clone()
        };
        if !seen.insert(key) {
            return Err(ConfigError::DuplicateParameter {
                name: binding.wire,
                location: source,
            });
        }
        properties.insert(
            binding.wire.clone(),
            json_schema(&binding.type_info, &binding.constraints),
        );
        if binding.required {
            required.push(Value::from(binding.wire.as_str()));
        }
        bindings.push(binding);
        Ok(())
    };

    for param in params {
        match param.type_info.as_model() {
            Some(model) if param.expands_fields() => {
                for field in &model.fields {
                    let binding = FieldBinding {
                        param: param.name.clone(),
                        wire: field.wire_name().to_string(),
                        type_info: field.type_info.clone(),
                        style: param.style,
                        explode: param.explode,
                        required: field.required,
                        default: field.default.clone(),
                        constraints: field.constraints.clone(),
                        model_field: true,
                    };
                    push(binding)?;
                }
            }
            _ => {
                let binding = FieldBinding {
                    param: param.name.clone(),
                    wire: param.wire_name().unwrap_or(&param.name).to_string(),
                    type_info: param.type_info.clone(),
                    style: param.style,
                    explode: param.explode,
                    required: param.required,
                    default: param.default.clone(),
                    constraints: param.constraints.clone(),
                    model_field: false,
                };
                push(binding)?;
            }
        }
    }

    let mut schema = Map::new();
    schema.insert("type".into(), json!("object"));
    schema.insert("properties".into(), Value::Object(properties));
    if !required.is_empty() {
        schema.insert("required".into(), Value::Array(required));
    }

    Ok(SourceGroup {
        source,
        layout: GroupLayout::Fields,
        bindings,
        schema: Value::Object(schema),
    })
}

/// Compiles every group with the validation engine.
pub fn compile_groups(
    groups: Vec<SourceGroup>,
    validator: &dyn Validator,
) -> ConfigResult<Vec<CompiledGroup>> {
    groups
        .into_iter()
        .map(|group| {
            let compiled = validator.compile(&group.schema)?;
            Ok(CompiledGroup { group, compiled })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::classify;
    use crate::param::Param;
    use crate::signature::ParamDecl;
    use crate::types::FieldInfo;

    fn product() -> TypeInfo {
        TypeInfo::model(
            ModelInfo::new("Product")
                .field(FieldInfo::new("product_id", TypeInfo::integer()).alias("id"))
                .field(FieldInfo::new("name", TypeInfo::string()))
                .field(FieldInfo::new("description", TypeInfo::string().nullable())),
        )
    }

    fn paging() -> TypeInfo {
        TypeInfo::model(
            ModelInfo::new("Paging")
                .field(FieldInfo::new("skip", TypeInfo::integer()).default_value(0))
                .field(FieldInfo::new("sort_by", TypeInfo::string()).alias("order-by")),
        )
    }

    fn specs(decls: Vec<ParamDecl>) -> Vec<ParameterSpec> {
        classify("/items/{item_id}", &["item_id".to_string()], decls).unwrap()
    }

    #[test]
    fn test_scalar_schemas() {
        assert_eq!(json_schema(&TypeInfo::integer(), &Constraints::default()), json!({"type": "integer"}));
        assert_eq!(
            json_schema(&TypeInfo::string().nullable(), &Constraints::new().max_length(5)),
            json!({"type": ["string", "null"], "maxLength": 5})
        );
        assert_eq!(json_schema(&TypeInfo::any(), &Constraints::default()), json!({}));
    }

    #[test]
    fn test_constraint_keywords() {
        let c = Constraints::new().gt(0).le(100).description("count");
        assert_eq!(
            json_schema(&TypeInfo::integer(), &c),
            json!({"type": "integer", "exclusiveMinimum": 0, "maximum": 100, "description": "count"})
        );
        let c = Constraints::new().min_length(1).max_length(3);
        assert_eq!(
            json_schema(&TypeInfo::set(TypeInfo::string()), &c),
            json!({"type": "array", "items": {"type": "string"}, "uniqueItems": true, "minItems": 1, "maxItems": 3})
        );
    }

    #[test]
    fn test_extra_metadata_passes_through() {
        let c = Constraints::new().extra("x-internal", true).example("abc");
        let schema = json_schema(&TypeInfo::string(), &c);
        assert_eq!(schema["x-internal"], json!(true));
        assert_eq!(schema["examples"], json!(["abc"]));
    }

    #[test]
    fn test_model_inline_and_refs() {
        let inline = json_schema(&product(), &Constraints::default());
        assert_eq!(inline["title"], "Product");
        assert_eq!(inline["required"], json!(["id", "name"]));
        assert_eq!(inline["properties"]["description"]["type"], json!(["string", "null"]));

        let mut defs = Definitions::new();
        let reference = json_schema_with_refs(&TypeInfo::array(product()), &Constraints::default(), &mut defs);
        assert_eq!(reference, json!({"type": "array", "items": {"$ref": "#/components/schemas/Product"}}));
        assert_eq!(defs.get("Product"), Some(&inline));
    }

    #[test]
    fn test_definitions_dedupe_and_conflicts() {
        let mut defs = Definitions::new();
        json_schema_with_refs(&product(), &Constraints::default(), &mut defs);
        json_schema_with_refs(&product(), &Constraints::default(), &mut defs);
        assert!(defs.conflicts().is_empty());

        let other = TypeInfo::model(ModelInfo::new("Product"));
        json_schema_with_refs(&other, &Constraints::default(), &mut defs);
        assert_eq!(defs.conflicts(), ["Product".to_string()]);
        assert_eq!(defs.into_schemas().len(), 1);
    }

    #[test]
    fn test_nullable_reference() {
        let mut defs = Definitions::new();
        let schema = json_schema_with_refs(&product().nullable(), &Constraints::default(), &mut defs);
        assert_eq!(
            schema,
            json!({"anyOf": [{"$ref": "#/components/schemas/Product"}, {"type": "null"}]})
        );
    }

    #[test]
    fn test_groups_by_source_in_declaration_order() {
        let params = specs(vec![
            ParamDecl::new("item_id", TypeInfo::integer()),
            ParamDecl::new("skip", TypeInfo::integer()).default_value(0),
            ParamDecl::new("limit", TypeInfo::integer()),
            ParamDecl::new("token", TypeInfo::string()).annotation(Param::header().alias("X-Token")),
        ]);
        let groups = build_groups("h", &params).unwrap();
        let sources: Vec<_> = groups.iter().map(|g| g.source).collect();
        assert_eq!(sources, [Source::Path, Source::Query, Source::Header]);

        let query = &groups[1];
        assert_eq!(query.layout, GroupLayout::Fields);
        assert_eq!(query.schema["required"], json!(["limit"]));
        assert_eq!(query.bindings[0].default, Some(json!(0)));
        assert_eq!(groups[2].bindings[0].wire, "X-Token");
    }

    #[test]
    fn test_whole_body_group() {
        let params = specs(vec![ParamDecl::new("product", product())]);
        let groups = build_groups("h", &params).unwrap();
        assert_eq!(groups[0].layout, GroupLayout::WholeBody);
        assert_eq!(groups[0].schema["title"], "Product");
    }

    #[test]
    fn test_embedded_bodies_merge() {
        let params = specs(vec![
            ParamDecl::new("product", product()).annotation(Param::body().embed()),
            ParamDecl::new("owner", product()).annotation(Param::body().alias("user").embed()),
        ]);
        let groups = build_groups("h", &params).unwrap();
        assert_eq!(groups.len(), 1);
        let properties = groups[0].schema["properties"].as_object().unwrap();
        let keys: Vec<_> = properties.keys().cloned().collect();
        assert_eq!(keys, ["product", "user"]);
        assert_eq!(groups[0].schema["required"], json!(["product", "user"]));
    }

    #[test]
    fn test_multiple_body_parameters() {
        let params = specs(vec![
            ParamDecl::new("product", product()),
            ParamDecl::new("note", TypeInfo::string()).annotation(Param::body()),
        ]);
        assert!(matches!(
            build_groups("h", &params),
            Err(ConfigError::MultipleBodyParameters { .. })
        ));
    }

    #[test]
    fn test_duplicate_alias_in_source() {
        let params = specs(vec![
            ParamDecl::new("a", TypeInfo::string()).annotation(Param::query().alias("q")),
            ParamDecl::new("b", TypeInfo::string()).annotation(Param::query().alias("q")),
        ]);
        let err = build_groups("h", &params).unwrap_err();
        assert_eq!(err.to_string(), "Duplicate parameter: [name=q, in=query]");
    }

    #[test]
    fn test_same_alias_in_different_sources_is_fine() {
        let params = specs(vec![
            ParamDecl::new("a", TypeInfo::string()).annotation(Param::query().alias("q")),
            ParamDecl::new("b", TypeInfo::string()).annotation(Param::header().alias("q")),
        ]);
        assert!(build_groups("h", &params).is_ok());
    }

    #[test]
    fn test_header_duplicates_are_case_insensitive() {
        let params = specs(vec![
            ParamDecl::new("a", TypeInfo::string()).annotation(Param::header().alias("X-Tag")),
            ParamDecl::new("b", TypeInfo::string()).annotation(Param::header().alias("x-tag")),
        ]);
        assert!(matches!(
            build_groups("h", &params),
            Err(ConfigError::DuplicateParameter { location: Source::Header, .. })
        ));
    }

    #[test]
    fn test_header_model_field_names_are_checked() {
        let headers = TypeInfo::model(
            ModelInfo::new("Headers")
                .field(FieldInfo::new("trace", TypeInfo::string()).alias("X-Trace"))
                .field(FieldInfo::new("tenant", TypeInfo::string()).alias("tenant id")),
        );
        let params = specs(vec![ParamDecl::new("headers", headers).annotation(Param::header())]);
        let err = build_groups("h", &params).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidHeaderName { ref name } if name == "tenant id"));
    }

    #[test]
    fn test_query_model_expands_into_fields() {
        let params = specs(vec![
            ParamDecl::new("paging", paging()).annotation(Param::query()),
            ParamDecl::new("skip", TypeInfo::integer()),
        ]);
        let err = build_groups("h", &params).unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateParameter { .. }));

        let params = specs(vec![ParamDecl::new("paging", paging()).annotation(Param::query())]);
        let groups = build_groups("h", &params).unwrap();
        let wires: Vec<_> = groups[0].bindings.iter().map(|b| b.wire.as_str()).collect();
        assert_eq!(wires, ["skip", "order-by"]);
        assert!(groups[0].bindings.iter().all(|b| b.model_field && b.param == "paging"));
        assert_eq!(groups[0].schema["required"], json!(["order-by"]));
    }

    #[test]
    fn test_dependencies_are_not_grouped() {
        fn noop() -> crate::dependency::Dependency {
            crate::dependency::Dependency::returning(crate::signature::HandlerSignature::new("noop"), |_| Ok(()))
        }
        let params = specs(vec![ParamDecl::new("user", TypeInfo::any())
            .annotation(Param::depends(crate::dependency::Depends::on(noop)))]);
        assert!(build_groups("h", &params).unwrap().is_empty());
    }
}
