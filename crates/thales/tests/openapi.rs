//! API document generated from a registry built with the macros.

use bytes::Bytes;
use http::Request;
use serde::Deserialize;
use serde_json::{json, Value};
use thales::{handler, BindingConfig, Describe, Mode, OpenApiGenerator, Route, TypedRoutes};

/// A product.
#[derive(Debug, Deserialize, Describe)]
#[serde(deny_unknown_fields)]
struct Product {
    name: String,
    #[describe(gt = 0, description = "Unit price")]
    price: f64,
}

#[handler(tags("search"))]
fn search(
    #[query(style = "pipeDelimited", explode = false, min_length = 1)] ids: Vec<i64>,
    #[header(alias = "X-Request-Id")] request_id: Option<String>,
) -> Value {
    json!({"ids": ids, "request_id": request_id})
}

/// Creates a product.
#[handler(status = 201)]
fn create_product(product: Product) -> Value {
    json!(product.name)
}

/// Replaces a product.
#[handler(operation_id = "replace_product", deprecated)]
fn update_product(#[path] product_id: i64, product: Product) -> Value {
    json!({"id": product_id, "name": product.name})
}

#[handler]
fn health() -> Value {
    json!("ok")
}

fn app(config: BindingConfig) -> TypedRoutes<Value> {
    let mut app = TypedRoutes::with_config(config).unwrap();
    app.route(Route::get("/search", search_endpoint()))
        .unwrap()
        .route(Route::post("/products", create_product_endpoint()))
        .unwrap()
        .route(Route::put("/products/{product_id}", update_product_endpoint()))
        .unwrap()
        .route(Route::get("/health", health_endpoint()))
        .unwrap();
    app
}

fn document(app: &TypedRoutes<Value>) -> Value {
    let generator = OpenApiGenerator::new().title("Catalog").version("1.2.0");
    serde_json::to_value(app.openapi(&generator).unwrap()).unwrap()
}

#[test]
fn test_pipe_delimited_parameter_matches_runtime() {
    let app = app(BindingConfig::default());
    let doc = document(&app);

    let parameters = &doc["paths"]["/search"]["get"]["parameters"];
    assert_eq!(
        parameters[0],
        json!({
            "name": "ids",
            "in": "query",
            "required": true,
            "style": "pipeDelimited",
            "explode": false,
            "schema": {"type": "array", "items": {"type": "integer"}, "minItems": 1}
        })
    );
    assert_eq!(parameters[1]["name"], "X-Request-Id");
    assert_eq!(parameters[1]["in"], "header");
    assert_eq!(parameters[1]["required"], false);

    let request = Request::get("/search?ids=4|5").body(Bytes::new()).unwrap();
    assert_eq!(app.dispatch(request).unwrap(), json!({"ids": [4, 5], "request_id": null}));
}

#[test]
fn test_operations() {
    let doc = document(&app(BindingConfig::default()));

    assert_eq!(doc["openapi"], "3.1.0");
    assert_eq!(doc["info"], json!({"title": "Catalog", "version": "1.2.0"}));

    let search = &doc["paths"]["/search"]["get"];
    assert_eq!(search["operationId"], "search_get");
    assert_eq!(search["summary"], "Search Get");
    assert_eq!(search["tags"], json!(["search"]));
    assert_eq!(search["responses"]["default"]["description"], "Success");
    assert_eq!(
        search["responses"]["400"]["content"]["application/json"]["schema"]["$ref"],
        "#/components/schemas/HTTPValidationError"
    );

    let create = &doc["paths"]["/products"]["post"];
    assert_eq!(create["description"], "Creates a product.");
    assert!(create["responses"]["201"].is_object());
    assert_eq!(
        create["requestBody"]["content"]["application/json"]["schema"],
        json!({"$ref": "#/components/schemas/Product"})
    );

    let update = &doc["paths"]["/products/{product_id}"]["put"];
    assert_eq!(update["operationId"], "replace_product");
    assert_eq!(update["deprecated"], true);
    assert_eq!(update["parameters"][0]["in"], "path");

    let health = &doc["paths"]["/health"]["get"];
    assert!(health.get("parameters").is_none());
    assert!(health["responses"].get("400").is_none());
}

#[test]
fn test_components_are_shared() {
    let doc = document(&app(BindingConfig::default()));
    let schemas = doc["components"]["schemas"].as_object().unwrap();

    let names: Vec<&String> = schemas.keys().collect();
    assert_eq!(names, ["ValidationError", "HTTPValidationError", "Product"]);
    assert_eq!(schemas["Product"]["description"], "A product.");
    assert_eq!(schemas["Product"]["additionalProperties"], false);
    assert_eq!(
        schemas["Product"]["properties"]["price"],
        json!({"type": "number", "exclusiveMinimum": 0, "description": "Unit price"})
    );
}

#[test]
fn test_manual_mode_documents_typed_routes_only() {
    let config = BindingConfig {
        mode: Mode::Manual,
        ..BindingConfig::default()
    };
    let mut app = app(config);
    app.route(Route::get("/typed/search", search_endpoint()).name("typed_search").typed())
        .unwrap();

    let doc = document(&app);
    let paths: Vec<&String> = doc["paths"].as_object().unwrap().keys().collect();
    assert_eq!(paths, ["/typed/search"]);
    assert_eq!(doc["paths"]["/typed/search"]["get"]["operationId"], "typed_search_get");
}

#[test]
fn test_yaml_output_is_stable() {
    let app = app(BindingConfig::default());
    let generator = OpenApiGenerator::new();
    let first = generator.generate_yaml(app.routes(), app.config()).unwrap();
    let second = generator.generate_yaml(app.routes(), app.config()).unwrap();
    assert_eq!(first, second);
    assert!(first.contains("style: pipeDelimited"));
}
