//! Route registration builder.

use http::Method;
use thales_core::Depends;

use crate::endpoint::Endpoint;

/// A route waiting to be registered with [`TypedRoutes`](crate::TypedRoutes).
///
/// ```
/// use http::Method;
/// use thales::{Endpoint, HandlerSignature, Route};
///
/// let endpoint = Endpoint::new(HandlerSignature::new("health"), |_| Ok("ok"));
/// let route = Route::new("/health", endpoint).methods([Method::GET, Method::HEAD]);
/// assert_eq!(route.rule(), "/health");
/// ```
#[derive(Debug, Clone)]
pub struct Route<R> {
    pub(crate) rule: String,
    pub(crate) endpoint: Endpoint<R>,
    pub(crate) methods: Vec<Method>,
    pub(crate) name: Option<String>,
    pub(crate) typed: bool,
    pub(crate) dependencies: Vec<Depends>,
}

impl<R> Route<R> {
    /// A `GET` route.
    pub fn new(rule: impl Into<String>, endpoint: Endpoint<R>) -> Self {
        let dependencies = endpoint.dependencies().to_vec();
        Self {
            rule: rule.into(),
            endpoint,
            methods: vec![Method::GET],
            name: None,
            typed: false,
            dependencies,
        }
    }

    /// A `GET` route.
    pub fn get(rule: impl Into<String>, endpoint: Endpoint<R>) -> Self {
        Self::new(rule, endpoint)
    }

    /// A `POST` route.
    pub fn post(rule: impl Into<String>, endpoint: Endpoint<R>) -> Self {
        Self::new(rule, endpoint).methods([Method::POST])
    }

    /// A `PUT` route.
    pub fn put(rule: impl Into<String>, endpoint: Endpoint<R>) -> Self {
        Self::new(rule, endpoint).methods([Method::PUT])
    }

    /// A `PATCH` route.
    pub fn patch(rule: impl Into<String>, endpoint: Endpoint<R>) -> Self {
        Self::new(rule, endpoint).methods([Method::PATCH])
    }

    /// A `DELETE` route.
    pub fn delete(rule: impl Into<String>, endpoint: Endpoint<R>) -> Self {
        Self::new(rule, endpoint).methods([Method::DELETE])
    }

    /// Replaces the served methods.
    #[must_use]
    pub fn methods(mut self, methods: impl IntoIterator<Item = Method>) -> Self {
        self.methods = methods.into_iter().collect();
        self
    }

    /// Overrides the endpoint name, which defaults to the handler name.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Marks the route typed, so it is bound in manual mode.
    #[must_use]
    pub fn typed(mut self) -> Self {
        self.typed = true;
        self
    }

    /// Adds a dependency run before the handler whose value is discarded.
    #[must_use]
    pub fn dependency(mut self, depends: Depends) -> Self {
        self.dependencies.push(depends);
        self
    }

    /// The route template.
    pub fn rule(&self) -> &str {
        &self.rule
    }
}
