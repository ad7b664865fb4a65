//! Request dispatcher hook.
//!
//! Invoked by the web framework once a request is routed to an endpoint:
//! binds and validates, resolves dependencies and calls the handler, or
//! short-circuits with a rendered validation error.

use http::StatusCode;
use serde_json::Value;
use thales_core::{BindingConfig, BoundArguments, RouteSpec};
use thales_extract::RequestBindingContext;

use crate::binder::bind;
use crate::endpoint::Endpoint;
use crate::error::DispatchError;
use crate::resolver::{inject, resolve};
use crate::response::ErrorHandler;

/// Runs one request through `route` and `endpoint`.
pub(crate) fn run<R>(
    route: &RouteSpec,
    endpoint: &Endpoint<R>,
    config: &BindingConfig,
    error_handler: &ErrorHandler,
    mut ctx: RequestBindingContext,
) -> Result<R, DispatchError> {
    if !route.bound_methods(config).contains(&ctx.method()) {
        return call(route, endpoint, raw_path_arguments(&ctx));
    }

    let span = tracing::debug_span!("bind", endpoint = %route.endpoint, method = %ctx.method());
    let _guard = span.enter();

    let bound = match bind(route, &ctx) {
        Ok(bound) => bound,
        Err(errors) => {
            tracing::debug!(errors = errors.len(), "request rejected");
            let status = StatusCode::from_u16(config.validation_error_status).unwrap_or(StatusCode::BAD_REQUEST);
            return Err(DispatchError::Rejected(error_handler.render(&errors, status)));
        }
    };

    let mut args = bound.handler;
    if !route.dependencies.is_empty() {
        let values = resolve(&route.dependencies, &bound.nodes, &mut ctx)?;
        inject(&route.dependencies, &values, &mut args);
    }
    call(route, endpoint, args)
}

/// Arguments of an unbound route: the raw placeholder strings.
fn raw_path_arguments(ctx: &RequestBindingContext) -> BoundArguments {
    let mut args = BoundArguments::new();
    for (name, value) in ctx.path_params().iter() {
        args.insert_value(name, Value::String(value.to_string()));
    }
    args
}

fn call<R>(route: &RouteSpec, endpoint: &Endpoint<R>, args: BoundArguments) -> Result<R, DispatchError> {
    endpoint.call(args).map_err(|source| DispatchError::Handler {
        endpoint: route.endpoint.clone(),
        source,
    })
}
