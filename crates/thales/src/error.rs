//! Request-time and bootstrap errors of the facade.

use http::Method;
use thiserror::Error;

use crate::response::ErrorResponse;

/// A request that did not reach its handler, or whose handler failed.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Validation failed; the rendered response should be sent as is.
    #[error("request rejected with status {}", .0.status)]
    Rejected(ErrorResponse),

    /// A dependency callable failed.
    #[error("dependency '{name}' failed: {source}")]
    Dependency {
        /// Dependency identity.
        name: String,
        /// The callable's error.
        source: anyhow::Error,
    },

    /// The handler failed, or its bound arguments did not convert to the
    /// declared Rust types.
    #[error("handler '{endpoint}' failed: {source}")]
    Handler {
        /// Endpoint name.
        endpoint: String,
        /// The handler's error.
        source: anyhow::Error,
    },

    /// No registered endpoint matches.
    #[error("no route for {method} {path}")]
    NoRoute {
        /// Request method.
        method: Method,
        /// Request path or endpoint name.
        path: String,
    },
}

impl DispatchError {
    /// The error response, if validation rejected the request.
    pub fn as_rejection(&self) -> Option<&ErrorResponse> {
        match self {
            Self::Rejected(response) => Some(response),
            _ => None,
        }
    }
}

/// Logging could not be initialized.
#[derive(Debug, Error)]
#[error("failed to initialize logging: {0}")]
pub struct LoggingError(pub String);
