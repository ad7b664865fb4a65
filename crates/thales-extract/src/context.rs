//! Per-request binding context.
//!
//! The [`RequestBindingContext`] owns the raw data of one request and the
//! dependency cache of that request. Query string, cookies and the JSON body
//! are parsed lazily, at most once, on first access.

use std::cell::OnceCell;
use std::collections::HashMap;

use bytes::Bytes;
use http::{header, HeaderMap, Method, Request, Uri};
use serde_json::Value;
use thales_core::DependencyValue;

use crate::params::PathParams;

/// The request body is not valid JSON.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonBodyError {
    /// Parser message.
    pub message: String,
}

/// Raw request data and request-scoped state for one binding pass.
///
/// Never shared between requests.
///
/// # Example
///
/// ```rust
/// use thales_extract::RequestBindingContext;
/// use http::{Method, Uri};
///
/// let ctx = RequestBindingContext::builder()
///     .method(Method::GET)
///     .uri(Uri::from_static("/items/42?tag=a&tag=b"))
///     .path_param("item_id", "42")
///     .header("X-Token", "secret")
///     .build();
///
/// assert_eq!(ctx.path_param("item_id"), Some("42"));
/// assert_eq!(ctx.query_values("tag"), vec!["a", "b"]);
/// assert_eq!(ctx.header_values("x-token"), vec!["secret"]);
/// ```
#[derive(Debug)]
pub struct RequestBindingContext {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
    path_params: PathParams,
    query: OnceCell<Vec<(String, String)>>,
    cookies: OnceCell<Vec<(String, String)>>,
    json: OnceCell<Result<Option<Value>, JsonBodyError>>,
    dependencies: HashMap<String, DependencyValue>,
}

impl RequestBindingContext {
    /// Creates a context from request parts.
    #[must_use]
    pub fn new(method: Method, uri: Uri, headers: HeaderMap, body: Bytes, path_params: PathParams) -> Self {
        Self {
            method,
            uri,
            headers,
            body,
            path_params,
            query: OnceCell::new(),
            cookies: OnceCell::new(),
            json: OnceCell::new(),
            dependencies: HashMap::new(),
        }
    }

    /// Creates a context from an `http` request and router-matched path values.
    #[must_use]
    pub fn from_request(request: Request<Bytes>, path_params: PathParams) -> Self {
        let (parts, body) = request.into_parts();
        Self::new(parts.method, parts.uri, parts.headers, body, path_params)
    }

    /// Returns a builder.
    #[must_use]
    pub fn builder() -> RequestBindingContextBuilder {
        RequestBindingContextBuilder::new()
    }

    /// HTTP method.
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Request URI.
    #[must_use]
    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    /// Request headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Raw body.
    #[must_use]
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Router-matched path values.
    #[must_use]
    pub fn path_params(&self) -> &PathParams {
        &self.path_params
    }

    /// One raw path value.
    #[must_use]
    pub fn path_param(&self, name: &str) -> Option<&str> {
        self.path_params.get(name)
    }

    /// Decoded query pairs in wire order.
    pub fn query_pairs(&self) -> &[(String, String)] {
        self.query.get_or_init(|| {
            let raw = self.uri.query().unwrap_or("");
            serde_urlencoded::from_str(raw).unwrap_or_else(|e| {
                tracing::debug!(error = %e, "undecodable query string ignored");
                Vec::new()
            })
        })
    }

    /// Every occurrence of a query key, in wire order.
    pub fn query_values(&self, name: &str) -> Vec<&str> {
        values_of(self.query_pairs(), name)
    }

    /// Every occurrence of a header, in wire order. Names are case-insensitive.
    pub fn header_values(&self, name: &str) -> Vec<&str> {
        self.headers
            .get_all(name)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .collect()
    }

    /// Cookie pairs from every `Cookie` header, in wire order.
    pub fn cookie_pairs(&self) -> &[(String, String)] {
        self.cookies.get_or_init(|| {
            self.headers
                .get_all(header::COOKIE)
                .iter()
                .filter_map(|v| v.to_str().ok())
                .flat_map(parse_cookie_header)
                .collect()
        })
    }

    /// Every occurrence of a cookie, in wire order.
    pub fn cookie_values(&self, name: &str) -> Vec<&str> {
        values_of(self.cookie_pairs(), name)
    }

    /// The parsed JSON body; `Ok(None)` when no body was sent.
    pub fn json_body(&self) -> Result<Option<&Value>, &JsonBodyError> {
        self.json
            .get_or_init(|| {
                if self.body.iter().all(u8::is_ascii_whitespace) {
                    return Ok(None);
                }
                serde_json::from_slice(&self.body)
                    .map(Some)
                    .map_err(|e| JsonBodyError {
                        message: e.to_string(),
                    })
            })
            .as_ref()
            .map(Option::as_ref)
    }

    /// A dependency value already resolved for this request.
    #[must_use]
    pub fn cached_dependency(&self, name: &str) -> Option<DependencyValue> {
        self.dependencies.get(name).cloned()
    }

    /// Stores a resolved dependency value for the rest of this request.
    pub fn cache_dependency(&mut self, name: impl Into<String>, value: DependencyValue) {
        self.dependencies.insert(name.into(), value);
    }
}

fn values_of<'a>(pairs: &'a [(String, String)], name: &str) -> Vec<&'a str> {
    pairs
        .iter()
        .filter(|(k, _)| k == name)
        .map(|(_, v)| v.as_str())
        .collect()
}

fn parse_cookie_header(raw: &str) -> impl Iterator<Item = (String, String)> + '_ {
    raw.split(';').filter_map(|pair| {
        let (name, value) = pair.split_once('=')?;
        let name = name.trim();
        if name.is_empty() {
            return None;
        }
        let value = value.trim();
        let value = value
            .strip_prefix('"')
            .and_then(|v| v.strip_suffix('"'))
            .unwrap_or(value);
        Some((name.to_string(), value.to_string()))
    })
}

/// Builder for [`RequestBindingContext`].
#[derive(Debug, Default)]
pub struct RequestBindingContextBuilder {
    method: Option<Method>,
    uri: Option<Uri>,
    headers: HeaderMap,
    body: Bytes,
    path_params: PathParams,
}

impl RequestBindingContextBuilder {
    /// Creates a builder for `GET /`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the method.
    #[must_use]
    pub fn method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    /// Sets the URI.
    #[must_use]
    pub fn uri(mut self, uri: Uri) -> Self {
        self.uri = Some(uri);
        self
    }

    /// Replaces all headers.
    #[must_use]
    pub fn headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    /// Appends a header; invalid names or values are skipped.
    #[must_use]
    pub fn header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (
            header::HeaderName::from_bytes(name.as_bytes()),
            header::HeaderValue::from_str(value),
        ) {
            self.headers.append(name, value);
        }
        self
    }

    /// Sets the body.
    #[must_use]
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Sets all path values.
    #[must_use]
    pub fn path_params(mut self, params: PathParams) -> Self {
        self.path_params = params;
        self
    }

    /// Adds one path value.
    #[must_use]
    pub fn path_param(mut self, name: &str, value: &str) -> Self {
        self.path_params.push(name, value);
        self
    }

    /// Builds the context.
    #[must_use]
    pub fn build(self) -> RequestBindingContext {
        RequestBindingContext::new(
            self.method.unwrap_or(Method::GET),
            self.uri.unwrap_or_else(|| Uri::from_static("/")),
            self.headers,
            self.body,
            self.path_params,
        )
    }
}
