//! Handler descriptors.

use std::fmt;
use std::sync::Arc;

use thales_core::{BoundArguments, Depends, HandlerSignature};

type HandlerFn<R> = Arc<dyn Fn(BoundArguments) -> anyhow::Result<R> + Send + Sync>;

/// A handler together with its explicit signature.
///
/// Usually produced by `#[handler]` as `<name>_endpoint()`, but can be built
/// by hand:
///
/// ```
/// use thales::{Endpoint, HandlerSignature, ParamDecl, TypeInfo};
///
/// let endpoint = Endpoint::new(
///     HandlerSignature::new("read_item").param(ParamDecl::new("item_id", TypeInfo::integer())),
///     |mut args| {
///         let item_id: i64 = args.take("item_id")?;
///         Ok(format!("item {item_id}"))
///     },
/// );
/// assert_eq!(endpoint.signature().name, "read_item");
/// ```
pub struct Endpoint<R> {
    signature: HandlerSignature,
    call: HandlerFn<R>,
    dependencies: Vec<Depends>,
}

impl<R> Endpoint<R> {
    /// Wraps a handler.
    pub fn new<F>(signature: HandlerSignature, call: F) -> Self
    where
        F: Fn(BoundArguments) -> anyhow::Result<R> + Send + Sync + 'static,
    {
        Self {
            signature,
            call: Arc::new(call),
            dependencies: Vec::new(),
        }
    }

    /// Adds a route-level dependency run before the handler.
    #[must_use]
    pub fn dependency(mut self, depends: Depends) -> Self {
        self.dependencies.push(depends);
        self
    }

    /// The handler signature.
    pub fn signature(&self) -> &HandlerSignature {
        &self.signature
    }

    /// Route-level dependencies declared on the handler.
    pub fn dependencies(&self) -> &[Depends] {
        &self.dependencies
    }

    /// Invokes the handler.
    pub fn call(&self, args: BoundArguments) -> anyhow::Result<R> {
        (self.call)(args)
    }
}

impl<R> Clone for Endpoint<R> {
    fn clone(&self) -> Self {
        Self {
            signature: self.signature.clone(),
            call: Arc::clone(&self.call),
            dependencies: self.dependencies.clone(),
        }
    }
}

impl<R> fmt::Debug for Endpoint<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("name", &self.signature.name)
            .field("params", &self.signature.params.len())
            .field("dependencies", &self.dependencies.len())
            .finish_non_exhaustive()
    }
}
