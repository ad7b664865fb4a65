//! # Thales Docs
//!
//! OpenAPI document generation for Thales route registries.
//!
//! The generator reads the same compiled [`RouteSpec`](thales_core::RouteSpec)s
//! that drive request binding, so parameter names, locations, styles and
//! schemas in the document always match what the binder does at request time.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use thales_docs::OpenApiGenerator;
//!
//! let generator = OpenApiGenerator::new()
//!     .title("Inventory")
//!     .version("1.0.0")
//!     .description("Inventory service");
//!
//! let json = generator.generate_json(app.routes(), app.config())?;
//! let yaml = generator.generate_yaml(app.routes(), app.config())?;
//! ```

mod error;
mod openapi;

pub use error::{DocsError, DocsResult};
pub use openapi::{
    http_validation_error_schema, validation_error_schema, Components, Contact, Info, License, MediaType,
    OpenApi, OpenApiGenerator, Operation, Parameter, ParameterIn, PathItem, RequestBody, Response, Server, Tag,
};
