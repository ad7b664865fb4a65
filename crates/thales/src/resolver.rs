//! Request half of the dependency resolver.
//!
//! Walks the precomputed steps of a [`DependencyPlan`] in order. A cached
//! step first looks in the request's dependency cache; an uncached step
//! always invokes its callable.

use std::sync::Arc;

use thales_core::{BoundArguments, DependencyPlan, DependencyValue};
use thales_extract::RequestBindingContext;

use crate::error::DispatchError;

/// Runs every step of `plan`, returning one value per step.
///
/// `node_args` holds the validated arguments of each plan node.
pub(crate) fn resolve(
    plan: &DependencyPlan,
    node_args: &[BoundArguments],
    ctx: &mut RequestBindingContext,
) -> Result<Vec<DependencyValue>, DispatchError> {
    let mut values: Vec<DependencyValue> = Vec::with_capacity(plan.steps.len());

    for step in &plan.steps {
        let node = plan.node(step);
        if step.cached {
            if let Some(value) = ctx.cached_dependency(&node.name) {
                tracing::trace!(dependency = %node.name, "dependency cache hit");
                values.push(value);
                continue;
            }
        }

        let mut args = node_args.get(step.node).cloned().unwrap_or_default();
        for (name, input) in &step.inputs {
            if let Some(value) = values.get(*input) {
                args.insert_dependency(name.clone(), Arc::clone(value));
            }
        }

        let value = node.call(args).map_err(|source| {
            tracing::error!(dependency = %node.name, error = %source, "dependency failed");
            DispatchError::Dependency {
                name: node.name.clone(),
                source,
            }
        })?;
        if step.cached {
            ctx.cache_dependency(node.name.clone(), Arc::clone(&value));
        }
        values.push(value);
    }

    Ok(values)
}

/// Injects the handler's dependency parameters.
pub(crate) fn inject(plan: &DependencyPlan, values: &[DependencyValue], args: &mut BoundArguments) {
    for (name, step) in &plan.handler_inputs {
        if let Some(value) = values.get(*step) {
            args.insert_dependency(name.clone(), Arc::clone(value));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use http::Method;
    use thales_core::{Dependency, Depends, HandlerSignature, Param, ParamDecl, RouteDefinition, RouteSpec, TypeInfo};
    use thales_validate::JsonSchemaValidator;

    static SESSION_CALLS: AtomicUsize = AtomicUsize::new(0);

    fn session() -> Dependency {
        Dependency::returning(HandlerSignature::new("tests::session"), |_| {
            Ok(SESSION_CALLS.fetch_add(1, Ordering::SeqCst))
        })
    }

    fn user() -> Dependency {
        let signature = HandlerSignature::new("tests::user").param(
            ParamDecl::new("session", TypeInfo::any()).annotation(Param::depends(Depends::on(session))),
        );
        Dependency::returning(signature, |args| {
            let session: usize = args.dependency("session")?;
            Ok(format!("user-{session}"))
        })
    }

    fn failing() -> Dependency {
        Dependency::returning(HandlerSignature::new("tests::failing"), |_| -> anyhow::Result<()> {
            anyhow::bail!("backend unavailable")
        })
    }

    fn route(signature: &HandlerSignature) -> RouteSpec {
        RouteSpec::compile(
            RouteDefinition {
                rule: "/me",
                endpoint: None,
                methods: &[Method::GET],
                signature,
                dependencies: &[],
                typed: false,
            },
            &JsonSchemaValidator::new(),
        )
        .unwrap()
    }

    #[test]
    fn test_cached_dependency_runs_once_per_request() {
        let signature = HandlerSignature::new("me")
            .param(ParamDecl::new("session", TypeInfo::any()).annotation(Param::depends(Depends::on(session))))
            .param(ParamDecl::new("user", TypeInfo::any()).annotation(Param::depends(Depends::on(user))));
        let route = route(&signature);
        let node_args = vec![BoundArguments::new(); route.dependencies.nodes.len()];

        let before = SESSION_CALLS.load(Ordering::SeqCst);
        let mut ctx = RequestBindingContext::builder().build();
        let values = resolve(&route.dependencies, &node_args, &mut ctx).unwrap();
        assert_eq!(SESSION_CALLS.load(Ordering::SeqCst) - before, 1);

        let mut args = BoundArguments::new();
        inject(&route.dependencies, &values, &mut args);
        let session: usize = args.dependency("session").unwrap();
        let user: String = args.dependency("user").unwrap();
        assert_eq!(user, format!("user-{session}"));

        let mut next_request = RequestBindingContext::builder().build();
        resolve(&route.dependencies, &node_args, &mut next_request).unwrap();
        assert_eq!(SESSION_CALLS.load(Ordering::SeqCst) - before, 2);
    }

    #[test]
    fn test_failing_dependency() {
        let signature = HandlerSignature::new("broken")
            .param(ParamDecl::new("unit", TypeInfo::any()).annotation(Param::depends(Depends::on(failing))));
        let route = route(&signature);
        let node_args = vec![BoundArguments::new(); route.dependencies.nodes.len()];

        let mut ctx = RequestBindingContext::builder().build();
        let err = resolve(&route.dependencies, &node_args, &mut ctx).unwrap_err();
        match err {
            DispatchError::Dependency { name, source } => {
                assert_eq!(name, "tests::failing");
                assert_eq!(source.to_string(), "backend unavailable");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
