//! The route registry.

use std::borrow::Cow;
use std::sync::Arc;

use bytes::Bytes;
use http::{Request, StatusCode};
use thales_core::{BindingConfig, ConfigError, ConfigResult, RouteDefinition, RouteSpec, ValidationErrors, Validator};
use thales_docs::{DocsResult, OpenApi, OpenApiGenerator};
use thales_extract::{PathParams, RequestBindingContext};
use thales_validate::JsonSchemaValidator;

use crate::dispatch;
use crate::endpoint::Endpoint;
use crate::error::DispatchError;
use crate::response::{ErrorHandler, ErrorResponse};
use crate::route::Route;

struct Registered<R> {
    spec: RouteSpec,
    endpoint: Endpoint<R>,
}

/// Registry of typed routes, the entry point of the binding pipeline.
///
/// Registration compiles every route up front and fails on any structural
/// error. Afterwards the registry is read-only and can be shared between
/// request-handling threads.
///
/// `R` is the handler return type, typically the host framework's response.
///
/// # Example
///
/// ```
/// use http::{Method, Request};
/// use thales::{Endpoint, HandlerSignature, ParamDecl, Route, TypeInfo, TypedRoutes};
///
/// let read_item = Endpoint::new(
///     HandlerSignature::new("read_item").param(ParamDecl::new("item_id", TypeInfo::integer())),
///     |mut args| Ok(args.take::<i64>("item_id")? * 2),
/// );
///
/// let mut app = TypedRoutes::new();
/// app.route(Route::get("/items/{item_id}", read_item)).unwrap();
///
/// let request = Request::get("/items/21").body(Default::default()).unwrap();
/// assert_eq!(app.dispatch(request).unwrap(), 42);
/// ```
pub struct TypedRoutes<R> {
    config: BindingConfig,
    validator: Arc<dyn Validator>,
    error_handler: ErrorHandler,
    routes: Vec<Registered<R>>,
}

impl<R> TypedRoutes<R> {
    /// Creates a registry with the default configuration and the JSON
    /// Schema validator.
    pub fn new() -> Self {
        Self {
            config: BindingConfig::default(),
            validator: Arc::new(JsonSchemaValidator::new()),
            error_handler: ErrorHandler::default(),
            routes: Vec::new(),
        }
    }

    /// Creates a registry with `config`, which is checked first.
    pub fn with_config(config: BindingConfig) -> ConfigResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            ..Self::new()
        })
    }

    /// Replaces the validation engine.
    ///
    /// Routes compile against the engine set at registration time.
    #[must_use]
    pub fn validator(mut self, validator: impl Validator + 'static) -> Self {
        self.validator = Arc::new(validator);
        self
    }

    /// Replaces the hook rendering validation failures.
    #[must_use]
    pub fn error_handler<F>(mut self, render: F) -> Self
    where
        F: Fn(&ValidationErrors, StatusCode) -> ErrorResponse + Send + Sync + 'static,
    {
        self.error_handler = ErrorHandler::new(render);
        self
    }

    /// Compiles and registers a route.
    ///
    /// Fails on malformed annotations, duplicate wire names, dependency
    /// cycles, unknown placeholders, and on an endpoint name already
    /// registered for one of the route's methods.
    pub fn route(&mut self, route: Route<R>) -> ConfigResult<&mut Self> {
        let Route {
            rule,
            endpoint,
            methods,
            name,
            typed,
            dependencies,
        } = route;

        let spec = RouteSpec::compile(
            RouteDefinition {
                rule: &rule,
                endpoint: name.as_deref(),
                methods: &methods,
                signature: endpoint.signature(),
                dependencies: &dependencies,
                typed,
            },
            self.validator.as_ref(),
        )?;

        for existing in self.routes.iter().filter(|r| r.spec.endpoint == spec.endpoint) {
            if let Some(method) = spec.methods.iter().find(|m| existing.spec.methods.contains(m)) {
                return Err(ConfigError::DuplicateRoute {
                    name: spec.endpoint.clone(),
                    method: method.to_string(),
                });
            }
        }

        tracing::debug!(
            endpoint = %spec.endpoint,
            rule = %spec.rule,
            bound = spec.is_bound(&self.config),
            "route registered"
        );
        self.routes.push(Registered { spec, endpoint });
        Ok(self)
    }

    /// The binding configuration.
    pub fn config(&self) -> &BindingConfig {
        &self.config
    }

    /// Compiled routes in registration order.
    pub fn routes(&self) -> impl Iterator<Item = &RouteSpec> {
        self.routes.iter().map(|r| &r.spec)
    }

    /// Looks up a compiled route by endpoint name.
    pub fn get(&self, endpoint: &str) -> Option<&RouteSpec> {
        self.routes().find(|spec| spec.endpoint == endpoint)
    }

    /// Generates the API document for the registered routes.
    pub fn openapi(&self, generator: &OpenApiGenerator) -> DocsResult<OpenApi> {
        generator.generate(self.routes(), &self.config)
    }

    /// Runs a request the framework already routed to `endpoint`.
    ///
    /// The context carries the router-matched path values.
    pub fn handle(&self, endpoint: &str, ctx: RequestBindingContext) -> Result<R, DispatchError> {
        let registered = self
            .routes
            .iter()
            .find(|r| r.spec.endpoint == endpoint && r.spec.methods.contains(ctx.method()))
            .ok_or_else(|| DispatchError::NoRoute {
                method: ctx.method().clone(),
                path: endpoint.to_string(),
            })?;
        dispatch::run(
            &registered.spec,
            &registered.endpoint,
            &self.config,
            &self.error_handler,
            ctx,
        )
    }

    /// Routes and runs a request by matching its method and path against
    /// the registered templates, in registration order.
    ///
    /// Path values are percent-decoded; a value that does not decode to
    /// UTF-8 is passed on as it appears in the request target.
    pub fn dispatch(&self, request: Request<Bytes>) -> Result<R, DispatchError> {
        let path = request.uri().path().to_string();
        let matched = self.routes.iter().find_map(|registered| {
            if !registered.spec.methods.contains(request.method()) {
                return None;
            }
            let values = registered.spec.match_path(&path)?;
            let params: PathParams = values
                .into_iter()
                .map(|(name, raw)| (name, decode_segment(raw)))
                .collect();
            Some((registered, params))
        });

        let Some((registered, params)) = matched else {
            return Err(DispatchError::NoRoute {
                method: request.method().clone(),
                path,
            });
        };
        let ctx = RequestBindingContext::from_request(request, params);
        dispatch::run(
            &registered.spec,
            &registered.endpoint,
            &self.config,
            &self.error_handler,
            ctx,
        )
    }
}

fn decode_segment(raw: &str) -> Cow<'_, str> {
    urlencoding::decode(raw).unwrap_or(Cow::Borrowed(raw))
}

impl<R> Default for TypedRoutes<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> std::fmt::Debug for TypedRoutes<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypedRoutes")
            .field("config", &self.config)
            .field("routes", &self.routes.iter().map(|r| &r.spec.endpoint).collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Method;
    use thales_core::{HandlerSignature, Mode, ParamDecl, TypeInfo};

    fn echo(name: &str) -> Endpoint<String> {
        Endpoint::new(
            HandlerSignature::new(name).param(ParamDecl::new("item_id", TypeInfo::integer())),
            |mut args| Ok(args.take::<i64>("item_id")?.to_string()),
        )
    }

    #[test]
    fn test_duplicate_endpoint_method() {
        let mut app = TypedRoutes::new();
        app.route(Route::get("/items/{item_id}", echo("item"))).unwrap();
        let err = app
            .route(Route::new("/things/{item_id}", echo("item")).methods([Method::GET, Method::POST]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateRoute { ref method, .. } if method == "GET"));

        app.route(Route::post("/things/{item_id}", echo("item"))).unwrap();
        assert_eq!(app.routes().count(), 2);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = BindingConfig {
            validation_error_status: 1000,
            ..BindingConfig::default()
        };
        assert!(TypedRoutes::<String>::with_config(config).is_err());
    }

    #[test]
    fn test_handle_by_endpoint() {
        let mut app = TypedRoutes::new();
        app.route(Route::get("/items/{item_id}", echo("item")).name("read_item"))
            .unwrap();
        assert!(app.get("read_item").is_some());

        let ctx = RequestBindingContext::builder()
            .method(Method::GET)
            .path_param("item_id", "7")
            .build();
        assert_eq!(app.handle("read_item", ctx).unwrap(), "7");

        let ctx = RequestBindingContext::builder().method(Method::DELETE).build();
        assert!(matches!(
            app.handle("read_item", ctx),
            Err(DispatchError::NoRoute { .. })
        ));
    }

    #[test]
    fn test_manual_mode_passes_raw_path_values() {
        let config = BindingConfig {
            mode: Mode::Manual,
            ..BindingConfig::default()
        };
        let raw = Endpoint::new(
            HandlerSignature::new("raw").param(ParamDecl::new("item_id", TypeInfo::integer())),
            |mut args| args.take::<String>("item_id").map_err(Into::into),
        );
        let mut app = TypedRoutes::with_config(config).unwrap();
        app.route(Route::get("/raw/{item_id}", raw)).unwrap();

        let request = Request::get("/raw/abc").body(Bytes::new()).unwrap();
        assert_eq!(app.dispatch(request).unwrap(), "abc");
    }

    #[test]
    fn test_dispatch_decodes_path_values() {
        let name = Endpoint::new(
            HandlerSignature::new("by_name").param(ParamDecl::new("name", TypeInfo::string())),
            |mut args| args.take::<String>("name").map_err(Into::into),
        );
        let mut app = TypedRoutes::new();
        app.route(Route::get("/items/{name}", name)).unwrap();

        let request = Request::get("/items/a%20b%2Fc").body(Bytes::new()).unwrap();
        assert_eq!(app.dispatch(request).unwrap(), "a b/c");

        let request = Request::get("/items/%FF").body(Bytes::new()).unwrap();
        assert_eq!(app.dispatch(request).unwrap(), "%FF");
    }

    #[test]
    fn test_decode_segment() {
        assert_eq!(decode_segment("caf%C3%A9"), "café");
        assert_eq!(decode_segment("plain"), "plain");
        assert_eq!(decode_segment("%FF"), "%FF");
    }
}
