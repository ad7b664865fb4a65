//! # Thales
//!
//! **Typed HTTP parameter binding, validation and OpenAPI generation**
//!
//! Thales binds request data (path, query string, headers, cookies, JSON
//! body) to the declared parameters of a handler, validates everything in
//! one pass and publishes the same metadata as an OpenAPI document.
//!
//! - **Explicit signatures** – `#[handler]` turns a function's argument list
//!   into a registration-time descriptor; nothing is introspected per request
//! - **OpenAPI styles** – `simple`, `form`, `spaceDelimited` and
//!   `pipeDelimited`, exploded or not
//! - **All errors at once** – violations from every source are reported
//!   together as `{"errors": [...]}`
//! - **Dependencies** – per-request memoized callables with their own
//!   validated parameters
//! - **Docs that match** – the document is generated from the structures the
//!   binder uses
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use thales::prelude::*;
//!
//! #[derive(Deserialize, Describe)]
//! struct Filter {
//!     #[describe(ge = 0)]
//!     skip: i64,
//!     tags: Option<Vec<String>>,
//! }
//!
//! #[thales::dependency]
//! fn current_user(#[header(alias = "X-User")] user: String) -> String {
//!     user
//! }
//!
//! /// Lists items.
//! #[thales::handler(tags("items"))]
//! fn list_items(
//!     #[query] filter: Filter,
//!     #[query(style = "pipeDelimited", explode = false)] ids: Vec<i64>,
//!     #[depends(current_user)] user: String,
//! ) -> String {
//!     format!("{user}: {} items from {}", ids.len(), filter.skip)
//! }
//!
//! let mut app = TypedRoutes::new();
//! app.route(Route::get("/items", list_items_endpoint()))?;
//!
//! let document = app.openapi(&OpenApiGenerator::new().title("Inventory"))?;
//! let body = app.dispatch(request)?;
//! ```
//!
//! ## Pipeline
//!
//! ```text
//! registration: signature → classify sources → group schemas → dependency plan
//! request:      fetch + style-decode → validate (all groups) → dependencies → handler
//! ```

#![doc(html_root_url = "https://docs.rs/thales/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

extern crate self as thales;

mod app;
mod binder;
mod dispatch;
mod endpoint;
mod error;
pub mod logging;
mod resolver;
mod response;
mod route;

pub use app::TypedRoutes;
pub use endpoint::Endpoint;
pub use error::{DispatchError, LoggingError};
pub use response::{ErrorHandler, ErrorResponse};
pub use route::Route;

// Registration-time model
pub use thales_core::{
    ArgumentError, BindingConfig, BoundArguments, ConfigError, ConfigLoader, ConfigResult, Constraints,
    Dependency, DependencyValue, Depends, Describe, FieldInfo, HandlerSignature, LocSegment, Mode, ModelInfo,
    OperationMeta, Param, ParamDecl, RouteSpec, Shape, Source, Style, TypeInfo, TypeKind, ValidationError,
    ValidationErrors, Validator,
};

// Request parsing
pub use thales_extract::{PathParams, RequestBindingContext};

// Default validation engine
pub use thales_validate::JsonSchemaValidator;

// API document
pub use thales_docs::{DocsError, DocsResult, OpenApi, OpenApiGenerator};

// Macros
pub use thales_macros::{dependency, handler, Describe};

pub use thales_core as core;
pub use thales_docs as docs;
pub use thales_extract as extract;
pub use thales_validate as validate;

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use thales::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        dependency, handler, BindingConfig, BoundArguments, Depends, Describe, DispatchError, Endpoint,
        ErrorResponse, OpenApiGenerator, Param, Route, Style, TypedRoutes, ValidationErrors,
    };
    pub use serde::Deserialize;
    pub use std::sync::Arc;
}

#[doc(hidden)]
pub mod __private {
    pub use anyhow;
    pub use serde_json;
}
