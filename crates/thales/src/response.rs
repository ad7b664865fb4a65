//! Validation error responses and the error rendering hook.

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use http::{header, HeaderValue, Response, StatusCode};
use serde_json::Value;
use thales_core::ValidationErrors;

/// A rendered validation failure.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorResponse {
    /// Response status.
    pub status: StatusCode,
    /// JSON body.
    pub body: Value,
}

impl ErrorResponse {
    /// Creates a response.
    pub fn new(status: StatusCode, body: Value) -> Self {
        Self { status, body }
    }

    /// The default rendering: `{"errors": [...]}`.
    pub fn from_errors(errors: &ValidationErrors, status: StatusCode) -> Self {
        Self::new(status, errors.to_body())
    }

    /// Converts into an `http` response with a JSON body.
    pub fn into_http(self) -> Response<Bytes> {
        let body = Bytes::from(self.body.to_string());
        let mut response = Response::new(body);
        *response.status_mut() = self.status;
        response
            .headers_mut()
            .insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        response
    }
}

/// Hook rendering the aggregated error list of a rejected request.
///
/// Receives every error collected across all sources and the configured
/// validation status.
#[derive(Clone)]
pub struct ErrorHandler(Arc<dyn Fn(&ValidationErrors, StatusCode) -> ErrorResponse + Send + Sync>);

impl ErrorHandler {
    /// Wraps a rendering function.
    pub fn new<F>(render: F) -> Self
    where
        F: Fn(&ValidationErrors, StatusCode) -> ErrorResponse + Send + Sync + 'static,
    {
        Self(Arc::new(render))
    }

    /// Renders an error list.
    pub fn render(&self, errors: &ValidationErrors, status: StatusCode) -> ErrorResponse {
        (self.0)(errors, status)
    }
}

impl Default for ErrorHandler {
    fn default() -> Self {
        Self::new(ErrorResponse::from_errors)
    }
}

impl fmt::Debug for ErrorHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorHandler").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use thales_core::{LocSegment, ValidationError};

    fn errors() -> ValidationErrors {
        ValidationErrors::from(vec![ValidationError::new(
            vec![LocSegment::from("query"), LocSegment::from("skip")],
            "int_parsing",
            "Input should be a valid integer, unable to parse string as an integer",
            json!("abc"),
        )])
    }

    #[test]
    fn test_default_handler() {
        let response = ErrorHandler::default().render(&errors(), StatusCode::BAD_REQUEST);
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        assert_eq!(response.body["errors"][0]["loc"], json!(["query", "skip"]));
        assert_eq!(response.body["errors"][0]["type"], "int_parsing");
    }

    #[test]
    fn test_custom_handler() {
        let handler = ErrorHandler::new(|errors, _| {
            ErrorResponse::new(StatusCode::UNPROCESSABLE_ENTITY, json!({"detail": errors.len()}))
        });
        let response = handler.render(&errors(), StatusCode::BAD_REQUEST);
        assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(response.body, json!({"detail": 1}));
    }

    #[test]
    fn test_into_http() {
        let response = ErrorResponse::new(StatusCode::BAD_REQUEST, json!({"errors": []})).into_http();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");
        assert_eq!(response.body().as_ref(), br#"{"errors":[]}"#);
    }
}
