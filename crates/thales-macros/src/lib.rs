//! Procedural macros for Thales handlers.
//!
//! Handlers are plain synchronous functions. The macros turn their argument
//! lists into explicit [`HandlerSignature`]s, so the binding pipeline never
//! needs run-time introspection.
//!
//! [`HandlerSignature`]: https://docs.rs/thales-core/latest/thales_core/struct.HandlerSignature.html
//!
//! # Example
//!
//! ```rust,ignore
//! use thales::prelude::*;
//!
//! #[derive(Deserialize, Describe)]
//! struct Product {
//!     name: String,
//!     #[describe(gt = 0)]
//!     price: f64,
//! }
//!
//! /// Updates a product.
//! #[thales::handler(status = 200, tags("products"))]
//! fn update_product(
//!     #[path] product_id: i64,
//!     #[query(ge = 0, default = 0)] revision: i64,
//!     #[header(alias = "X-Request-Id")] request_id: Option<String>,
//!     product: Product,
//! ) -> String {
//!     format!("{product_id}: {}", product.name)
//! }
//!
//! let endpoint = update_product_endpoint();
//! ```
//!
//! # Macro Expansion
//!
//! `#[handler]` keeps the function and adds `<name>_endpoint()`, which
//! returns a `thales::Endpoint` holding:
//!
//! 1. the signature with one `ParamDecl` per argument
//! 2. a closure that takes each validated argument out of `BoundArguments`
//!    and calls the function
//!
//! `#[dependency]` does the same for dependency callables and adds
//! `<name>_dependency()`.

mod describe;
mod handler;
mod parse;

use proc_macro::TokenStream;
use syn::{parse_macro_input, DeriveInput};

/// Marks a function as a Thales handler.
///
/// # Attributes
///
/// - `status = 201`: success status code
/// - `summary = ".."`, `description = ".."`: documentation overrides
/// - `operation_id = ".."`: operation id override
/// - `tags("a", "b")`: documentation tags
/// - `deprecated`: marks the operation deprecated
/// - `dependencies(path, ..)`: dependencies run before the handler without
///   passing their values in
///
/// # Parameter annotations
///
/// | Annotation | Source |
/// |------------|--------|
/// | `#[path]` | path placeholder |
/// | `#[query(..)]` | query string |
/// | `#[header(..)]` | request headers |
/// | `#[cookie(..)]` | `Cookie` header |
/// | `#[body(..)]` | JSON body |
/// | `#[param(..)]` | inferred, with options |
/// | `#[depends(path, cache = false)]` | dependency value |
///
/// Options: `alias`, `style`, `explode`, `embed`, `default`, `gt`, `ge`,
/// `lt`, `le`, `multiple_of`, `min_length`, `max_length`, `pattern`,
/// `enum_values = [..]`, `title`, `description`, `example`, `deprecated`.
#[proc_macro_attribute]
pub fn handler(attr: TokenStream, item: TokenStream) -> TokenStream {
    handler::expand_handler(attr.into(), item.into())
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}

/// Marks a function as a dependency usable from `#[depends(..)]`.
///
/// Arguments accept the same annotations as handler arguments. A `Result`
/// return type is unwrapped; its error aborts the request.
#[proc_macro_attribute]
pub fn dependency(attr: TokenStream, item: TokenStream) -> TokenStream {
    handler::expand_dependency(attr.into(), item.into())
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}

/// Derives `thales::Describe` for a struct with named fields.
///
/// Honors serde's `rename`, `rename_all`, `default`, `skip` and
/// `deny_unknown_fields`. Field constraints go in `#[describe(..)]`;
/// `#[describe(rename = "..", closed)]` on the struct overrides the component
/// name and rejects unknown keys.
#[proc_macro_derive(Describe, attributes(describe, serde))]
pub fn derive_describe(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    describe::expand_describe(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}
