//! # Thales Core
//!
//! Registration-time model of the Thales parameter binding pipeline.
//!
//! This crate turns an explicit handler descriptor into immutable, compiled
//! route metadata:
//!
//! - [`HandlerSignature`] / [`ParamDecl`] - declared parameters, usually generated by `#[handler]`
//! - [`Param`] - inline annotations (source, alias, style, explode, embed, constraints)
//! - [`ParameterSpec`] - a parameter with its source resolved
//! - [`SourceGroup`] - one composite JSON Schema per source
//! - [`DependencyPlan`] - topologically ordered dependency invocations
//! - [`RouteSpec`] - everything above for one endpoint
//! - [`BindingConfig`] - process-wide binding settings
//!
//! Request-time work (parsing, style deserialization, validation, dispatch)
//! lives in the other Thales crates and only reads these structures.

#![doc(html_root_url = "https://docs.rs/thales-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod arguments;
pub mod classify;
mod config;
mod constraints;
mod dependency;
mod error;
mod param;
pub mod route;
pub mod schema;
mod signature;
mod source;
mod types;
mod validator;

#[cfg(test)]
mod test_support;

pub use arguments::{ArgumentError, BoundArguments};
pub use config::{BindingConfig, ConfigLoader, Mode};
pub use constraints::Constraints;
pub use dependency::{
    Dependency, DependencyFn, DependencyNode, DependencyPlan, DependencyValue, Depends, Step,
};
pub use error::{ConfigError, ConfigResult, LocSegment, ValidationError, ValidationErrors};
pub use param::{Param, ParameterSpec};
pub use route::{RouteDefinition, RouteSpec};
pub use schema::{CompiledGroup, Definitions, FieldBinding, GroupLayout, SourceGroup};
pub use signature::{describe, HandlerSignature, OperationMeta, ParamDecl};
pub use source::{Source, Style};
pub use types::{Describe, FieldInfo, ModelInfo, Shape, TypeInfo, TypeKind};
pub use validator::{CompiledSchema, Validator, Violation};
