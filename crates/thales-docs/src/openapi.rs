//! OpenAPI document types and generation.
//!
//! The generator is a read-only walk over compiled [`RouteSpec`]s: the same
//! source groups that drive request binding are rendered as parameter and
//! request-body objects, so the document cannot drift from runtime behavior.
//!
//! ## OpenAPI 3.1 Compliance
//!
//! The types in this module follow the OpenAPI 3.1 specification:
//! <https://spec.openapis.org/oas/v3.1.0>

use std::collections::HashSet;

use http::Method;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use thales_core::schema::{json_schema_with_refs, Definitions, FieldBinding, GroupLayout, SourceGroup, REF_PREFIX};
use thales_core::{BindingConfig, RouteSpec, Source, Style};

use crate::error::{DocsError, DocsResult};

/// Media type used for every body and response.
const JSON_MEDIA_TYPE: &str = "application/json";

/// OpenAPI document root object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenApi {
    /// OpenAPI version.
    pub openapi: String,
    /// API metadata.
    pub info: Info,
    /// Available servers.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub servers: Vec<Server>,
    /// API paths and operations, in registration order.
    #[serde(default)]
    pub paths: IndexMap<String, PathItem>,
    /// Reusable components.
    #[serde(default)]
    pub components: Components,
    /// Tags for API grouping.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Tag>,
}

/// API metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Info {
    /// API title.
    pub title: String,
    /// API version.
    pub version: String,
    /// Short summary.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// API description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Terms of service URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[serde(rename = "termsOfService")]
    pub terms_of_service: Option<String>,
    /// Contact information.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact: Option<Contact>,
    /// License information.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license: Option<License>,
}

/// Contact information.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    /// Contact name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Contact URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Contact email.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// License information.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct License {
    /// License name.
    pub name: String,
    /// License URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Server information.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Server {
    /// Server URL.
    pub url: String,
    /// Server description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Operations available on a single path.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PathItem {
    /// GET operation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub get: Option<Operation>,
    /// PUT operation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub put: Option<Operation>,
    /// POST operation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post: Option<Operation>,
    /// DELETE operation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delete: Option<Operation>,
    /// OPTIONS operation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Operation>,
    /// HEAD operation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub head: Option<Operation>,
    /// PATCH operation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patch: Option<Operation>,
    /// TRACE operation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace: Option<Operation>,
}

impl PathItem {
    fn slot(&mut self, method: &Method) -> Option<&mut Option<Operation>> {
        let slot = match *method {
            Method::GET => &mut self.get,
            Method::PUT => &mut self.put,
            Method::POST => &mut self.post,
            Method::DELETE => &mut self.delete,
            Method::OPTIONS => &mut self.options,
            Method::HEAD => &mut self.head,
            Method::PATCH => &mut self.patch,
            Method::TRACE => &mut self.trace,
            _ => return None,
        };
        Some(slot)
    }

    /// Returns the operation registered for `method`.
    pub fn operation(&self, method: &Method) -> Option<&Operation> {
        match *method {
            Method::GET => self.get.as_ref(),
            Method::PUT => self.put.as_ref(),
            Method::POST => self.post.as_ref(),
            Method::DELETE => self.delete.as_ref(),
            Method::OPTIONS => self.options.as_ref(),
            Method::HEAD => self.head.as_ref(),
            Method::PATCH => self.patch.as_ref(),
            Method::TRACE => self.trace.as_ref(),
            _ => None,
        }
    }
}

/// An API operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    /// Tags for grouping.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Short summary.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// Full description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Unique operation identifier.
    #[serde(rename = "operationId")]
    pub operation_id: String,
    /// Parameters.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<Parameter>,
    /// Request body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[serde(rename = "requestBody")]
    pub request_body: Option<RequestBody>,
    /// Responses keyed by status code or `default`.
    pub responses: IndexMap<String, Response>,
    /// Whether deprecated.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub deprecated: bool,
}

/// Parameter location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterIn {
    /// Query string parameter.
    Query,
    /// URL path parameter.
    Path,
    /// HTTP header.
    Header,
    /// Cookie.
    Cookie,
}

impl TryFrom<Source> for ParameterIn {
    type Error = Source;

    fn try_from(source: Source) -> Result<Self, Self::Error> {
        match source {
            Source::Path => Ok(Self::Path),
            Source::Query => Ok(Self::Query),
            Source::Header => Ok(Self::Header),
            Source::Cookie => Ok(Self::Cookie),
            other => Err(other),
        }
    }
}

/// An operation parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    /// Wire name.
    pub name: String,
    /// Parameter location.
    #[serde(rename = "in")]
    pub location: ParameterIn,
    /// Description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Whether required.
    #[serde(default)]
    pub required: bool,
    /// Whether deprecated.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub deprecated: bool,
    /// Serialization style used at request time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<Style>,
    /// Explode flag used at request time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explode: Option<bool>,
    /// Parameter schema.
    pub schema: Value,
}

/// Request body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestBody {
    /// Description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Whether required.
    #[serde(default)]
    pub required: bool,
    /// Content by media type.
    pub content: IndexMap<String, MediaType>,
}

/// Media type content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaType {
    /// Schema for this media type.
    pub schema: Value,
}

/// Response definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    /// Description (required).
    pub description: String,
    /// Response content by media type.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub content: IndexMap<String, MediaType>,
}

/// Reusable components.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Components {
    /// Reusable schemas, in first-use order.
    #[serde(default)]
    pub schemas: IndexMap<String, Value>,
}

/// API tag for grouping operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    /// Tag name.
    pub name: String,
    /// Description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

fn json_content(schema: Value) -> IndexMap<String, MediaType> {
    let mut content = IndexMap::new();
    content.insert(JSON_MEDIA_TYPE.to_string(), MediaType { schema });
    content
}

/// Schema of one entry of the validation error list.
pub fn validation_error_schema() -> Value {
    json!({
        "title": "ValidationError",
        "type": "object",
        "properties": {
            "loc": {
                "title": "Location",
                "type": "array",
                "items": {"anyOf": [{"type": "string"}, {"type": "integer"}]}
            },
            "msg": {"title": "Message", "type": "string"},
            "type": {"title": "Error Type", "type": "string"}
        },
        "required": ["loc", "msg", "type"]
    })
}

/// Schema of the validation error response body.
pub fn http_validation_error_schema() -> Value {
    json!({
        "title": "HTTPValidationError",
        "type": "object",
        "properties": {
            "errors": {
                "title": "Errors",
                "type": "array",
                "items": {"$ref": format!("{REF_PREFIX}ValidationError")}
            }
        }
    })
}

/// `sample_endpoint_get` becomes `Sample Endpoint Get`.
fn title_case(identifier: &str) -> String {
    identifier
        .split('_')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_uppercase().chain(chars).collect()
            })
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Generator turning a route registry into an OpenAPI document.
#[derive(Debug, Clone)]
pub struct OpenApiGenerator {
    openapi: String,
    title: String,
    version: String,
    summary: Option<String>,
    description: Option<String>,
    terms_of_service: Option<String>,
    servers: Vec<Server>,
    contact: Option<Contact>,
    license: Option<License>,
    tags: Vec<Tag>,
}

impl Default for OpenApiGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl OpenApiGenerator {
    /// Create a new generator with the default title `API doc` and version `0.0.0`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            openapi: "3.1.0".to_string(),
            title: "API doc".to_string(),
            version: "0.0.0".to_string(),
            summary: None,
            description: None,
            terms_of_service: None,
            servers: Vec::new(),
            contact: None,
            license: None,
            tags: Vec::new(),
        }
    }

    /// Set the API title.
    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Set the API version.
    #[must_use]
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Set the OpenAPI version written to the document.
    #[must_use]
    pub fn openapi_version(mut self, version: impl Into<String>) -> Self {
        self.openapi = version.into();
        self
    }

    /// Set the API summary.
    #[must_use]
    pub fn summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    /// Set the API description.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the terms of service URL.
    #[must_use]
    pub fn terms_of_service(mut self, url: impl Into<String>) -> Self {
        self.terms_of_service = Some(url.into());
        self
    }

    /// Add a server.
    #[must_use]
    pub fn server(mut self, url: impl Into<String>, description: Option<String>) -> Self {
        self.servers.push(Server {
            url: url.into(),
            description,
        });
        self
    }

    /// Set contact information.
    #[must_use]
    pub fn contact(mut self, contact: Contact) -> Self {
        self.contact = Some(contact);
        self
    }

    /// Set license information.
    #[must_use]
    pub fn license(mut self, name: impl Into<String>, url: Option<String>) -> Self {
        self.license = Some(License { name: name.into(), url });
        self
    }

    /// Add a top-level tag.
    #[must_use]
    pub fn tag(mut self, name: impl Into<String>, description: Option<String>) -> Self {
        self.tags.push(Tag {
            name: name.into(),
            description,
        });
        self
    }

    /// Generate the document for every bound route.
    ///
    /// Routes excluded by the binding mode and ignored methods are not
    /// documented. Records are published once under `components.schemas`.
    pub fn generate<'a, I>(&self, routes: I, config: &BindingConfig) -> DocsResult<OpenApi>
    where
        I: IntoIterator<Item = &'a RouteSpec>,
    {
        let mut definitions = Definitions::new();
        let mut paths: IndexMap<String, PathItem> = IndexMap::new();

        for route in routes {
            let methods = route.bound_methods(config);
            if methods.is_empty() {
                continue;
            }
            let shared = OperationParts::build(route, config, &mut definitions);
            let shared_id = methods.len() > 1;
            for method in methods {
                let operation = shared.operation(route, method, shared_id);
                let item = paths.entry(route.path.clone()).or_default();
                let Some(slot) = item.slot(method) else {
                    return Err(DocsError::InvalidOperation {
                        operation_id: operation.operation_id,
                        reason: format!("unsupported HTTP method: {method}"),
                    });
                };
                *slot = Some(operation);
            }
        }

        if let Some(name) = definitions.conflicts().first() {
            return Err(DocsError::SchemaConflict { name: name.clone() });
        }

        let mut schemas = IndexMap::new();
        schemas.insert("ValidationError".to_string(), validation_error_schema());
        schemas.insert("HTTPValidationError".to_string(), http_validation_error_schema());
        schemas.extend(definitions.into_schemas());

        tracing::debug!(paths = paths.len(), schemas = schemas.len(), "OpenAPI document generated");

        Ok(OpenApi {
            openapi: self.openapi.clone(),
            info: Info {
                title: self.title.clone(),
                version: self.version.clone(),
                summary: self.summary.clone(),
                description: self.description.clone(),
                terms_of_service: self.terms_of_service.clone(),
                contact: self.contact.clone(),
                license: self.license.clone(),
            },
            servers: self.servers.clone(),
            paths,
            components: Components { schemas },
            tags: self.tags.clone(),
        })
    }

    /// Generate the document as pretty-printed JSON.
    pub fn generate_json<'a, I>(&self, routes: I, config: &BindingConfig) -> DocsResult<String>
    where
        I: IntoIterator<Item = &'a RouteSpec>,
    {
        let document = self.generate(routes, config)?;
        serde_json::to_string_pretty(&document).map_err(DocsError::from)
    }

    /// Generate the document as YAML.
    pub fn generate_yaml<'a, I>(&self, routes: I, config: &BindingConfig) -> DocsResult<String>
    where
        I: IntoIterator<Item = &'a RouteSpec>,
    {
        let document = self.generate(routes, config)?;
        serde_yaml::to_string(&document).map_err(DocsError::from)
    }
}

/// Method-independent pieces of a route's operations.
struct OperationParts {
    parameters: Vec<Parameter>,
    request_body: Option<RequestBody>,
    responses: IndexMap<String, Response>,
}

impl OperationParts {
    fn build(route: &RouteSpec, config: &BindingConfig, definitions: &mut Definitions) -> Self {
        let groups: Vec<&SourceGroup> = route
            .groups
            .iter()
            .chain(route.dependencies.nodes.iter().flat_map(|node| node.groups.iter()))
            .map(|compiled| &compiled.group)
            .collect();

        let mut parameters = parameters(&groups, definitions);
        parameters.extend(route.unbound_placeholders().map(|name| Parameter {
            name: name.to_string(),
            location: ParameterIn::Path,
            description: None,
            required: true,
            deprecated: false,
            style: None,
            explode: None,
            schema: json!({"type": "string"}),
        }));

        let mut responses = IndexMap::new();
        let success = route
            .meta
            .status_code
            .map_or_else(|| "default".to_string(), |status| status.to_string());
        responses.insert(
            success,
            Response {
                description: "Success".to_string(),
                content: json_content(json!({"type": "string"})),
            },
        );
        if !groups.is_empty() {
            responses.insert(
                config.validation_error_status.to_string(),
                Response {
                    description: "Validation Error".to_string(),
                    content: json_content(json!({"$ref": format!("{REF_PREFIX}HTTPValidationError")})),
                },
            );
        }

        Self {
            parameters,
            request_body: request_body(&groups, definitions),
            responses,
        }
    }

    /// Builds the operation for `method`.
    ///
    /// An explicit operationId is suffixed with the method when the route
    /// documents several methods, keeping ids unique.
    fn operation(&self, route: &RouteSpec, method: &Method, several_methods: bool) -> Operation {
        let meta = &route.meta;
        let method_suffix = method.as_str().to_ascii_lowercase();
        let operation_id = match &meta.operation_id {
            Some(id) if several_methods => format!("{id}_{method_suffix}"),
            Some(id) => id.clone(),
            None => format!("{}_{method_suffix}", route.endpoint),
        };
        Operation {
            tags: meta.tags.clone(),
            summary: Some(meta.summary.clone().unwrap_or_else(|| title_case(&operation_id))),
            description: meta.description.clone().or_else(|| route.doc.clone()),
            operation_id,
            parameters: self.parameters.clone(),
            request_body: self.request_body.clone(),
            responses: self.responses.clone(),
            deprecated: meta.deprecated,
        }
    }
}

fn binding_schema(binding: &FieldBinding, definitions: &mut Definitions) -> Value {
    let mut schema = json_schema_with_refs(&binding.type_info, &binding.constraints, definitions);
    if let (Some(default), Value::Object(map)) = (&binding.default, &mut schema) {
        map.insert("default".to_string(), default.clone());
    }
    schema
}

fn parameters(groups: &[&SourceGroup], definitions: &mut Definitions) -> Vec<Parameter> {
    let mut seen = HashSet::new();
    let mut parameters = Vec::new();
    for group in groups {
        let Ok(location) = ParameterIn::try_from(group.source) else {
            continue;
        };
        for binding in &group.bindings {
            let key = if group.source == Source::Header {
                binding.wire.to_ascii_lowercase()
            } else {
                binding.wire.clone()
            };
            if !seen.insert((group.source, key)) {
                continue;
            }
            let constraints = &binding.constraints;
            parameters.push(Parameter {
                name: binding.wire.clone(),
                location,
                description: constraints.description.clone().or_else(|| constraints.title.clone()),
                required: binding.required,
                deprecated: constraints.deprecated,
                style: Some(binding.style),
                explode: Some(binding.explode),
                schema: binding_schema(binding, definitions),
            });
        }
    }
    parameters
}

fn request_body(groups: &[&SourceGroup], definitions: &mut Definitions) -> Option<RequestBody> {
    let bodies: Vec<&SourceGroup> = groups
        .iter()
        .copied()
        .filter(|group| group.source == Source::Body)
        .collect();

    let whole = bodies
        .iter()
        .find(|group| group.layout == GroupLayout::WholeBody)
        .and_then(|group| group.bindings.first());

    let schema = if let Some(binding) = whole {
        json_schema_with_refs(&binding.type_info, &binding.constraints, definitions)
    } else if bodies.is_empty() {
        return None;
    } else {
        let mut properties = Map::new();
        let mut required = Vec::new();
        for binding in bodies.iter().flat_map(|group| group.bindings.iter()) {
            if properties.contains_key(&binding.wire) {
                continue;
            }
            properties.insert(binding.wire.clone(), binding_schema(binding, definitions));
            if binding.required {
                required.push(Value::from(binding.wire.as_str()));
            }
        }
        json!({"type": "object", "properties": properties, "required": required})
    };

    Some(RequestBody {
        description: Some("Request Body".to_string()),
        required: true,
        content: json_content(schema),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use thales_core::{
        Dependency, Depends, FieldInfo, HandlerSignature, Mode, ModelInfo, OperationMeta, Param, ParamDecl,
        RouteDefinition, TypeInfo,
    };
    use thales_validate::JsonSchemaValidator;

    fn route(rule: &str, methods: &[Method], signature: &HandlerSignature) -> RouteSpec {
        route_with(rule, methods, signature, &[])
    }

    fn route_with(rule: &str, methods: &[Method], signature: &HandlerSignature, deps: &[Depends]) -> RouteSpec {
        RouteSpec::compile(
            RouteDefinition {
                rule,
                endpoint: None,
                methods,
                signature,
                dependencies: deps,
                typed: false,
            },
            &JsonSchemaValidator::new(),
        )
        .unwrap()
    }

    fn product() -> TypeInfo {
        TypeInfo::model(
            ModelInfo::new("Product")
                .field(FieldInfo::new("name", TypeInfo::string()))
                .field(FieldInfo::new("price", TypeInfo::number()).optional()),
        )
    }

    fn document(routes: &[RouteSpec]) -> Value {
        let doc = OpenApiGenerator::new().generate(routes, &BindingConfig::default()).unwrap();
        serde_json::to_value(doc).unwrap()
    }

    #[test]
    fn test_empty_document() {
        let doc = document(&[]);
        assert_eq!(doc["openapi"], "3.1.0");
        assert_eq!(doc["info"], json!({"title": "API doc", "version": "0.0.0"}));
        assert_eq!(doc["paths"], json!({}));
        let schemas: Vec<_> = doc["components"]["schemas"].as_object().unwrap().keys().cloned().collect();
        assert_eq!(schemas, ["ValidationError", "HTTPValidationError"]);
    }

    #[test]
    fn test_pipe_delimited_query_array() {
        let signature = HandlerSignature::new("search").param(
            ParamDecl::new("tags", TypeInfo::array(TypeInfo::string()))
                .annotation(Param::query().style(Style::PipeDelimited).explode(false)),
        );
        let doc = document(&[route("/search", &[Method::GET], &signature)]);
        let parameter = &doc["paths"]["/search"]["get"]["parameters"][0];
        assert_eq!(
            parameter,
            &json!({
                "name": "tags",
                "in": "query",
                "required": true,
                "style": "pipeDelimited",
                "explode": false,
                "schema": {"type": "array", "items": {"type": "string"}}
            })
        );
    }

    #[test]
    fn test_operation_defaults() {
        let signature = HandlerSignature::new("items")
            .doc("List items.")
            .param(ParamDecl::new("skip", TypeInfo::integer()).default_value(0));
        let doc = document(&[route("/items", &[Method::GET], &signature)]);
        let operation = &doc["paths"]["/items"]["get"];

        assert_eq!(operation["operationId"], "items_get");
        assert_eq!(operation["summary"], "Items Get");
        assert_eq!(operation["description"], "List items.");
        assert_eq!(operation["parameters"][0]["schema"], json!({"type": "integer", "default": 0}));
        assert_eq!(operation["parameters"][0]["required"], false);

        let responses: Vec<_> = operation["responses"].as_object().unwrap().keys().cloned().collect();
        assert_eq!(responses, ["default", "400"]);
        assert_eq!(
            operation["responses"]["400"]["content"]["application/json"]["schema"]["$ref"],
            "#/components/schemas/HTTPValidationError"
        );
    }

    #[test]
    fn test_operation_metadata_and_untyped_route() {
        let signature = HandlerSignature::new("health").meta(OperationMeta {
            status_code: Some(204),
            summary: Some("Health check".to_string()),
            tags: vec!["ops".to_string()],
            deprecated: true,
            operation_id: Some("probe".to_string()),
            ..OperationMeta::default()
        });
        let doc = document(&[route("/health/<int:node>", &[Method::GET], &signature)]);
        let operation = &doc["paths"]["/health/{node}"]["get"];

        assert_eq!(operation["operationId"], "probe");
        assert_eq!(operation["summary"], "Health check");
        assert_eq!(operation["tags"], json!(["ops"]));
        assert_eq!(operation["deprecated"], true);
        let responses: Vec<_> = operation["responses"].as_object().unwrap().keys().cloned().collect();
        assert_eq!(responses, ["204"]);
        assert_eq!(
            operation["parameters"],
            json!([{"name": "node", "in": "path", "required": true, "schema": {"type": "string"}}])
        );
    }

    #[test]
    fn test_query_model_expands_into_parameters() {
        let paging = TypeInfo::model(
            ModelInfo::new("Paging")
                .field(FieldInfo::new("skip", TypeInfo::integer()).default_value(0))
                .field(FieldInfo::new("limit", TypeInfo::integer()).default_value(10)),
        );
        let signature =
            HandlerSignature::new("list").param(ParamDecl::new("paging", paging).annotation(Param::query()));
        let doc = document(&[route("/list", &[Method::GET], &signature)]);

        let names: Vec<_> = doc["paths"]["/list"]["get"]["parameters"]
            .as_array()
            .unwrap()
            .iter()
            .map(|p| p["name"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(names, ["skip", "limit"]);
        assert!(doc["components"]["schemas"].get("Paging").is_none());
    }

    #[test]
    fn test_whole_body_is_a_shared_component() {
        let create = HandlerSignature::new("create").param(ParamDecl::new("product", product()));
        let update = HandlerSignature::new("update")
            .param(ParamDecl::new("product_id", TypeInfo::integer()))
            .param(ParamDecl::new("product", product()));
        let doc = document(&[
            route("/products", &[Method::POST], &create),
            route("/products/{product_id}", &[Method::PUT], &update),
        ]);

        let body = &doc["paths"]["/products"]["post"]["requestBody"];
        assert_eq!(body["description"], "Request Body");
        assert_eq!(body["required"], true);
        assert_eq!(body["content"]["application/json"]["schema"], json!({"$ref": "#/components/schemas/Product"}));

        let schemas = doc["components"]["schemas"].as_object().unwrap();
        assert_eq!(schemas.len(), 3);
        assert_eq!(schemas["Product"]["required"], json!(["name"]));
    }

    #[test]
    fn test_embedded_body_fields() {
        let signature = HandlerSignature::new("order")
            .param(ParamDecl::new("product", product()).annotation(Param::body().embed()))
            .param(ParamDecl::new("quantity", TypeInfo::integer()).annotation(Param::body().ge(1)));
        let doc = document(&[route("/orders", &[Method::POST], &signature)]);

        let schema = &doc["paths"]["/orders"]["post"]["requestBody"]["content"]["application/json"]["schema"];
        assert_eq!(
            schema,
            &json!({
                "type": "object",
                "properties": {
                    "product": {"$ref": "#/components/schemas/Product"},
                    "quantity": {"type": "integer", "minimum": 1}
                },
                "required": ["product", "quantity"]
            })
        );
    }

    #[test]
    fn test_conflicting_components() {
        let other = TypeInfo::model(ModelInfo::new("Product").field(FieldInfo::new("sku", TypeInfo::string())));
        let a = HandlerSignature::new("a").param(ParamDecl::new("product", product()));
        let b = HandlerSignature::new("b").param(ParamDecl::new("product", other));
        let err = OpenApiGenerator::new()
            .generate(
                &[route("/a", &[Method::POST], &a), route("/b", &[Method::POST], &b)],
                &BindingConfig::default(),
            )
            .unwrap_err();
        assert!(matches!(err, DocsError::SchemaConflict { name } if name == "Product"));
    }

    #[test]
    fn test_dependency_parameters_are_documented() {
        fn token() -> Dependency {
            Dependency::returning(
                HandlerSignature::new("token").param(
                    ParamDecl::new("authorization", TypeInfo::string())
                        .annotation(Param::header().alias("Authorization")),
                ),
                |mut args| Ok(args.take::<String>("authorization")?),
            )
        }
        let signature = HandlerSignature::new("me")
            .param(ParamDecl::new("token", TypeInfo::string()).annotation(Param::depends(Depends::on(token))));
        let doc = document(&[route("/me", &[Method::GET], &signature)]);
        let parameter = &doc["paths"]["/me"]["get"]["parameters"][0];
        assert_eq!(parameter["name"], "Authorization");
        assert_eq!(parameter["in"], "header");
        assert_eq!(parameter["style"], "simple");
    }

    #[test]
    fn test_ignored_methods_and_manual_mode() {
        let signature = HandlerSignature::new("items");
        let routes = [route("/items", &[Method::GET, Method::HEAD, Method::OPTIONS], &signature)];

        let doc = document(&routes);
        let item = doc["paths"]["/items"].as_object().unwrap();
        assert_eq!(item.keys().collect::<Vec<_>>(), ["get"]);

        let manual = BindingConfig {
            mode: Mode::Manual,
            ..BindingConfig::default()
        };
        let doc = OpenApiGenerator::new().generate(&routes, &manual).unwrap();
        assert!(doc.paths.is_empty());
    }

    #[test]
    fn test_methods_share_a_path_item() {
        let signature = HandlerSignature::new("items");
        let doc = OpenApiGenerator::new()
            .generate(
                &[route("/items", &[Method::POST, Method::GET], &signature)],
                &BindingConfig::default(),
            )
            .unwrap();
        let item = &doc.paths["/items"];
        assert_eq!(item.operation(&Method::GET).unwrap().operation_id, "items_get");
        assert_eq!(item.operation(&Method::POST).unwrap().operation_id, "items_post");
    }

    #[test]
    fn test_explicit_operation_id_stays_unique_across_methods() {
        let signature = HandlerSignature::new("items").meta(OperationMeta {
            operation_id: Some("items_op".to_string()),
            ..OperationMeta::default()
        });
        let doc = OpenApiGenerator::new()
            .generate(
                &[
                    route("/items", &[Method::GET, Method::POST, Method::HEAD], &signature),
                    route("/single", &[Method::GET], &signature),
                ],
                &BindingConfig::default(),
            )
            .unwrap();

        let item = &doc.paths["/items"];
        assert_eq!(item.operation(&Method::GET).unwrap().operation_id, "items_op_get");
        assert_eq!(item.operation(&Method::POST).unwrap().operation_id, "items_op_post");
        assert!(item.operation(&Method::HEAD).is_none());
        assert_eq!(doc.paths["/single"].operation(&Method::GET).unwrap().operation_id, "items_op");
    }

    #[test]
    fn test_json_and_yaml_output_are_stable() {
        let signature = HandlerSignature::new("search").param(ParamDecl::new("q", TypeInfo::string()));
        let routes = [route("/search", &[Method::GET], &signature)];
        let generator = OpenApiGenerator::new().title("Search").version("1.2.0");

        let first = generator.generate_json(&routes, &BindingConfig::default()).unwrap();
        let second = generator.generate_json(&routes, &BindingConfig::default()).unwrap();
        assert_eq!(first, second);

        let yaml = generator.generate_yaml(&routes, &BindingConfig::default()).unwrap();
        assert!(yaml.contains("openapi: 3.1.0"));
        assert!(yaml.contains("title: Search"));
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("sample_func_name"), "Sample Func Name");
        assert_eq!(title_case("get"), "Get");
    }
}
