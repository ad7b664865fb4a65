//! Request binding: fetch, validate and assemble arguments.
//!
//! Every source group of the handler and of every dependency node is fetched
//! and validated before anything runs, so one request reports all of its
//! violations at once.

use serde_json::{Map, Value};
use thales_core::{
    BoundArguments, CompiledGroup, GroupLayout, LocSegment, RouteSpec, SourceGroup, ValidationError,
    ValidationErrors, Violation,
};
use thales_extract::{fetch_group, RequestBindingContext};

/// Validated arguments of one request, before dependencies run.
#[derive(Debug, Default)]
pub(crate) struct BoundRequest {
    /// Handler arguments.
    pub handler: BoundArguments,
    /// Arguments of each dependency node, indexed like the plan's nodes.
    pub nodes: Vec<BoundArguments>,
}

/// Binds every parameter of `route` from `ctx`.
pub(crate) fn bind(route: &RouteSpec, ctx: &RequestBindingContext) -> Result<BoundRequest, ValidationErrors> {
    let mut errors = ValidationErrors::new();
    let handler = bind_groups(&route.groups, ctx, &mut errors);
    let nodes = route
        .dependencies
        .nodes
        .iter()
        .map(|node| bind_groups(&node.groups, ctx, &mut errors))
        .collect();

    if errors.is_empty() {
        Ok(BoundRequest { handler, nodes })
    } else {
        Err(errors)
    }
}

fn bind_groups(groups: &[CompiledGroup], ctx: &RequestBindingContext, errors: &mut ValidationErrors) -> BoundArguments {
    let mut args = BoundArguments::new();
    for CompiledGroup { group, compiled } in groups {
        let instance = match fetch_group(ctx, group) {
            Ok(instance) => instance,
            Err(error) => {
                push_unique(errors, error);
                continue;
            }
        };
        match compiled.validate(instance) {
            Ok(coerced) => assemble(group, coerced, &mut args),
            Err(violations) => {
                let source = LocSegment::from(group.source);
                for violation in violations {
                    push_unique(errors, located(source.clone(), violation));
                }
            }
        }
    }
    args
}

/// Shared dependencies validate the same wire values as the handler; report
/// each failure once.
fn push_unique(errors: &mut ValidationErrors, error: ValidationError) {
    if !errors.iter().any(|known| known == &error) {
        errors.push(error);
    }
}

fn located(source: LocSegment, violation: Violation) -> ValidationError {
    let mut loc = Vec::with_capacity(violation.path.len() + 1);
    loc.push(source);
    loc.extend(violation.path);
    let error = ValidationError::new(loc, violation.kind, violation.message, violation.input);
    match violation.ctx {
        Some(ctx) => error.with_ctx(ctx),
        None => error,
    }
}

/// Distributes a coerced group instance onto parameter names.
///
/// Absent values take their default; absent values without a default are
/// left out and come out of [`BoundArguments::take`] as `null`. Record
/// parameters expanded into one wire value per field are reassembled under
/// the fields' wire names.
fn assemble(group: &SourceGroup, coerced: Value, args: &mut BoundArguments) {
    if group.layout == GroupLayout::WholeBody {
        if let Some(binding) = group.bindings.first() {
            args.insert_value(binding.param.clone(), coerced);
        }
        return;
    }

    let Value::Object(mut values) = coerced else {
        return;
    };
    let mut records: Vec<(String, Map<String, Value>)> = Vec::new();
    for binding in &group.bindings {
        let value = values
            .remove(&binding.wire)
            .or_else(|| binding.default.clone());
        if binding.model_field {
            let index = match records.iter().position(|(param, _)| *param == binding.param) {
                Some(index) => index,
                None => {
                    records.push((binding.param.clone(), Map::new()));
                    records.len() - 1
                }
            };
            if let Some(value) = value {
                records[index].1.insert(binding.wire.clone(), value);
            }
        } else if let Some(value) = value {
            args.insert_value(binding.param.clone(), value);
        }
    }
    for (param, record) in records {
        args.insert_value(param, Value::Object(record));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::{Method, Uri};
    use serde_json::json;
    use thales_core::{
        FieldInfo, HandlerSignature, ModelInfo, Param, ParamDecl, RouteDefinition, TypeInfo,
    };
    use thales_validate::JsonSchemaValidator;

    fn compile(rule: &str, signature: &HandlerSignature) -> RouteSpec {
        RouteSpec::compile(
            RouteDefinition {
                rule,
                endpoint: None,
                methods: &[Method::GET],
                signature,
                dependencies: &[],
                typed: false,
            },
            &JsonSchemaValidator::new(),
        )
        .unwrap()
    }

    fn filter() -> TypeInfo {
        TypeInfo::model(
            ModelInfo::new("Filter")
                .field(FieldInfo::new("q", TypeInfo::string()))
                .field(FieldInfo::new("page", TypeInfo::integer()).default_value(1))
                .field(FieldInfo::new("tag", TypeInfo::string().nullable())),
        )
    }

    #[test]
    fn test_bind_defaults_and_absent_values() {
        let signature = HandlerSignature::new("list")
            .param(ParamDecl::new("skip", TypeInfo::integer()).default_value(0))
            .param(ParamDecl::new("q", TypeInfo::string().nullable()));
        let route = compile("/items", &signature);
        let ctx = RequestBindingContext::builder().uri(Uri::from_static("/items")).build();

        let bound = bind(&route, &ctx).unwrap();
        assert_eq!(bound.handler.value("skip"), Some(&json!(0)));
        assert_eq!(bound.handler.value("q"), None);
    }

    #[test]
    fn test_bind_reassembles_query_model() {
        let signature = HandlerSignature::new("search")
            .param(ParamDecl::new("filter", filter()).annotation(Param::query()));
        let route = compile("/search", &signature);
        let ctx = RequestBindingContext::builder()
            .uri(Uri::from_static("/search?q=lamp&page=3"))
            .build();

        let bound = bind(&route, &ctx).unwrap();
        assert_eq!(bound.handler.value("filter"), Some(&json!({"q": "lamp", "page": 3})));
    }

    #[test]
    fn test_bind_collects_errors_across_sources() {
        let signature = HandlerSignature::new("read")
            .param(ParamDecl::new("item_id", TypeInfo::integer()))
            .param(ParamDecl::new("skip", TypeInfo::integer()))
            .param(ParamDecl::new("token", TypeInfo::string()).annotation(Param::header().alias("X-Token")));
        let route = compile("/items/{item_id}", &signature);
        let ctx = RequestBindingContext::builder()
            .uri(Uri::from_static("/items/x?skip=abc"))
            .path_param("item_id", "x")
            .build();

        let errors = bind(&route, &ctx).unwrap_err();
        let locs: Vec<String> = errors.iter().map(ValidationError::dotted_loc).collect();
        assert_eq!(locs, ["path.item_id", "query.skip", "header.X-Token"]);
        assert_eq!(errors.iter().nth(2).unwrap().kind, "missing");
    }

    #[test]
    fn test_bind_whole_body() {
        let signature = HandlerSignature::new("create").param(ParamDecl::new("filter", filter()));
        let route = compile("/filters", &signature);
        let ctx = RequestBindingContext::builder()
            .uri(Uri::from_static("/filters"))
            .body(r#"{"q": "lamp"}"#)
            .build();

        let bound = bind(&route, &ctx).unwrap();
        assert_eq!(bound.handler.value("filter"), Some(&json!({"q": "lamp", "page": 1})));
    }

    #[test]
    fn test_record_defaults_match_across_sources() {
        let query = compile(
            "/query",
            &HandlerSignature::new("query").param(ParamDecl::new("filter", filter()).annotation(Param::query())),
        );
        let ctx = RequestBindingContext::builder()
            .uri(Uri::from_static("/query?q=lamp"))
            .build();
        let from_query = bind(&query, &ctx).unwrap();

        let embedded = compile(
            "/embedded",
            &HandlerSignature::new("embedded")
                .param(ParamDecl::new("filter", filter()).annotation(Param::body().embed()))
                .param(ParamDecl::new("limit", TypeInfo::integer()).annotation(Param::body())),
        );
        let ctx = RequestBindingContext::builder()
            .uri(Uri::from_static("/embedded"))
            .body(r#"{"filter": {"q": "lamp"}, "limit": 5}"#)
            .build();
        let from_body = bind(&embedded, &ctx).unwrap();

        assert_eq!(from_query.handler.value("filter"), Some(&json!({"q": "lamp", "page": 1})));
        assert_eq!(from_body.handler.value("filter"), from_query.handler.value("filter"));
        assert_eq!(from_body.handler.value("limit"), Some(&json!(5)));
    }

    #[test]
    fn test_invalid_json_body() {
        let signature = HandlerSignature::new("create").param(ParamDecl::new("filter", filter()));
        let route = compile("/filters", &signature);
        let ctx = RequestBindingContext::builder()
            .uri(Uri::from_static("/filters"))
            .body("{not json")
            .build();

        let errors = bind(&route, &ctx).unwrap_err();
        assert_eq!(errors.len(), 1);
        let error = errors.iter().next().unwrap();
        assert_eq!(error.loc, vec![LocSegment::from("body")]);
        assert_eq!(error.kind, "json_invalid");
    }

    #[test]
    fn test_located_prefixes_source() {
        let violation = Violation {
            path: vec![LocSegment::from("tags"), LocSegment::Index(1)],
            kind: "string_too_long".to_string(),
            message: "String should have at most 3 characters".to_string(),
            input: json!("toolong"),
            ctx: Some(json!({"max_length": 3})),
        };
        let error = located(LocSegment::from("query"), violation);
        assert_eq!(error.dotted_loc(), "query.tags.1");
        assert_eq!(error.ctx, Some(json!({"max_length": 3})));
    }
}
