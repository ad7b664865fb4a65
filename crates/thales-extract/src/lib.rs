//! # Thales Extract
//!
//! Request-side half of the Thales binding pipeline.
//!
//! - [`RequestBindingContext`] owns one request's raw data and its dependency cache
//! - [`style`] turns wire strings into structured values per style and explode flag
//! - [`fetch_group`] assembles the instance validated against a source group
//!
//! # Example
//!
//! ```rust
//! use thales_core::{Shape, Style};
//! use thales_extract::{style, RequestBindingContext};
//! use http::Uri;
//!
//! let ctx = RequestBindingContext::builder()
//!     .uri(Uri::from_static("/items?ids=1,2,3"))
//!     .build();
//!
//! let ids = style::form_value(&ctx.query_values("ids"), Shape::Array, Style::Form, false);
//! assert_eq!(ids, Some(serde_json::json!(["1", "2", "3"])));
//! ```

#![doc(html_root_url = "https://docs.rs/thales-extract/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod context;
mod fetch;
mod params;
pub mod style;

pub use context::{JsonBodyError, RequestBindingContext, RequestBindingContextBuilder};
pub use fetch::fetch_group;
pub use params::PathParams;
