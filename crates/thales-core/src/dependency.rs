//! Dependency descriptors and the per-route dependency plan.
//!
//! A dependency is a callable whose declared parameters go through the same
//! classification and validation pipeline as a handler's. Dependencies may
//! depend on other dependencies; the graph is flattened into an ordered list
//! of [`Step`]s once at registration time, so request handling only walks a
//! precomputed topological order.
//!
//! Cached references to the same dependency share one step and therefore run
//! at most once per request. Uncached references each get their own step.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::arguments::BoundArguments;
use crate::classify::classify;
use crate::error::{ConfigError, ConfigResult};
use crate::param::ParameterSpec;
use crate::schema::{build_groups, compile_groups, CompiledGroup};
use crate::signature::{describe, HandlerSignature};
use crate::source::Source;
use crate::validator::Validator;

/// Type-erased value produced by a dependency.
pub type DependencyValue = Arc<dyn Any + Send + Sync>;

/// Type-erased dependency callable.
pub type DependencyFn =
    Arc<dyn Fn(BoundArguments) -> anyhow::Result<DependencyValue> + Send + Sync>;

/// A callable usable as a parameter source.
///
/// ```
/// use thales_core::{BoundArguments, Dependency, HandlerSignature};
///
/// let current_user = Dependency::returning(HandlerSignature::new("current_user"), |_| {
///     Ok("alice".to_string())
/// });
/// let value = current_user.call(BoundArguments::new()).unwrap();
/// assert_eq!(value.downcast_ref::<String>().map(String::as_str), Some("alice"));
/// ```
#[derive(Clone)]
pub struct Dependency {
    /// Declared parameters and identity.
    pub signature: HandlerSignature,
    call: DependencyFn,
}

impl fmt::Debug for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dependency")
            .field("name", &self.signature.name)
            .field("params", &self.signature.params.len())
            .finish_non_exhaustive()
    }
}

impl Dependency {
    /// Wraps a callable that already returns a type-erased value.
    pub fn new<F>(signature: HandlerSignature, call: F) -> Self
    where
        F: Fn(BoundArguments) -> anyhow::Result<DependencyValue> + Send + Sync + 'static,
    {
        Self {
            signature,
            call: Arc::new(call),
        }
    }

    /// Wraps a callable returning a concrete value.
    pub fn returning<T, F>(signature: HandlerSignature, call: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(BoundArguments) -> anyhow::Result<T> + Send + Sync + 'static,
    {
        Self::new(signature, move |args| {
            call(args).map(|value| Arc::new(value) as DependencyValue)
        })
    }

    /// Dependency identity.
    pub fn name(&self) -> &str {
        &self.signature.name
    }

    /// Invokes the callable.
    pub fn call(&self, args: BoundArguments) -> anyhow::Result<DependencyValue> {
        (self.call)(args)
    }
}

/// Reference to a dependency from a parameter or a route.
///
/// The factory is a plain function pointer so that dependency graphs are
/// expanded lazily and cycles can be detected instead of recursing forever.
#[derive(Clone, Copy)]
pub struct Depends {
    factory: fn() -> Dependency,
    use_cache: bool,
}

impl fmt::Debug for Depends {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dependency = (self.factory)();
        f.debug_struct("Depends")
            .field("dependency", &dependency.signature.name)
            .field("use_cache", &self.use_cache)
            .finish()
    }
}

impl Depends {
    /// References a dependency with caching enabled.
    pub fn on(factory: fn() -> Dependency) -> Self {
        Self {
            factory,
            use_cache: true,
        }
    }

    /// Enables or disables the per-request cache for this reference.
    #[must_use]
    pub fn use_cache(mut self, use_cache: bool) -> Self {
        self.use_cache = use_cache;
        self
    }

    /// Whether this reference shares the per-request cached value.
    pub fn is_cached(&self) -> bool {
        self.use_cache
    }

    /// Builds the referenced dependency.
    pub fn resolve(&self) -> Dependency {
        (self.factory)()
    }
}

/// A dependency with its parameters resolved and compiled.
#[derive(Debug)]
pub struct DependencyNode {
    /// Dependency identity.
    pub name: String,
    /// Resolved parameters.
    pub params: Vec<ParameterSpec>,
    /// Compiled source groups for the request-bound parameters.
    pub groups: Vec<CompiledGroup>,
    dependency: Dependency,
}

impl DependencyNode {
    /// Invokes the dependency.
    pub fn call(&self, args: BoundArguments) -> anyhow::Result<DependencyValue> {
        self.dependency.call(args)
    }
}

/// One invocation in the resolution order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    /// Index into [`DependencyPlan::nodes`].
    pub node: usize,
    /// The result is stored in the request cache.
    pub cached: bool,
    /// Dependency parameters of the node, as `(parameter name, step index)`.
    pub inputs: Vec<(String, usize)>,
}

/// Topologically ordered dependency steps for one route.
#[derive(Debug, Default)]
pub struct DependencyPlan {
    /// Distinct dependencies, in first-use order.
    pub nodes: Vec<DependencyNode>,
    /// Invocations; every step only refers to earlier steps.
    pub steps: Vec<Step>,
    /// Handler dependency parameters, as `(parameter name, step index)`.
    pub handler_inputs: Vec<(String, usize)>,
    /// Steps of route-level dependencies whose values are discarded.
    pub route_steps: Vec<usize>,
}

impl DependencyPlan {
    /// Builds the plan for a handler's dependency parameters and the
    /// route-level dependencies.
    ///
    /// Every dependency's own parameters are classified against the same path
    /// template and compiled with the same validator as the handler's.
    pub fn build(
        rule: &str,
        placeholders: &[String],
        handler_params: &[ParameterSpec],
        route_dependencies: &[Depends],
        validator: &dyn Validator,
    ) -> ConfigResult<Self> {
        let mut planner = Planner {
            rule,
            placeholders,
            validator,
            plan: DependencyPlan::default(),
            node_index: HashMap::new(),
            cached_steps: HashMap::new(),
            stack: Vec::new(),
        };

        for param in handler_params.iter().filter(|p| p.source == Source::Dependency) {
            if let Some(depends) = &param.depends {
                let step = planner.visit(depends)?;
                planner.plan.handler_inputs.push((param.name.clone(), step));
            }
        }
        for depends in route_dependencies {
            let step = planner.visit(depends)?;
            planner.plan.route_steps.push(step);
        }

        tracing::debug!(
            rule,
            nodes = planner.plan.nodes.len(),
            steps = planner.plan.steps.len(),
            "dependency plan built"
        );
        Ok(planner.plan)
    }

    /// True when the route uses no dependencies.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// The node invoked by a step.
    pub fn node(&self, step: &Step) -> &DependencyNode {
        &self.nodes[step.node]
    }
}

struct Planner<'a> {
    rule: &'a str,
    placeholders: &'a [String],
    validator: &'a dyn Validator,
    plan: DependencyPlan,
    node_index: HashMap<String, usize>,
    cached_steps: HashMap<usize, usize>,
    stack: Vec<String>,
}

impl Planner<'_> {
    fn visit(&mut self, depends: &Depends) -> ConfigResult<usize> {
        let dependency = depends.resolve();
        let name = dependency.name().to_string();

        if let Some(start) = self.stack.iter().position(|n| n == &name) {
            let mut cycle = self.stack[start..].to_vec();
            cycle.push(name);
            return Err(ConfigError::DependencyCycle { cycle });
        }

        if depends.is_cached() {
            if let Some(step) = self
                .node_index
                .get(&name)
                .and_then(|node| self.cached_steps.get(node))
            {
                return Ok(*step);
            }
        }

        self.stack.push(name);
        let node = self.node(dependency)?;
        let children: Vec<(String, Depends)> = self.plan.nodes[node]
            .params
            .iter()
            .filter_map(|p| p.depends.map(|d| (p.name.clone(), d)))
            .collect();

        let mut inputs = Vec::with_capacity(children.len());
        for (param, child) in children {
            inputs.push((param, self.visit(&child)?));
        }
        self.stack.pop();

        let step = self.plan.steps.len();
        self.plan.steps.push(Step {
            node,
            cached: depends.is_cached(),
            inputs,
        });
        if depends.is_cached() {
            self.cached_steps.insert(node, step);
        }
        Ok(step)
    }

    fn node(&mut self, dependency: Dependency) -> ConfigResult<usize> {
        if let Some(index) = self.node_index.get(dependency.name()) {
            return Ok(*index);
        }

        let decls = describe(&dependency.signature)?;
        let params = classify(self.rule, self.placeholders, decls)?;
        let groups = build_groups(dependency.name(), &params)?;
        let groups = compile_groups(groups, self.validator)?;

        let index = self.plan.nodes.len();
        let name = dependency.name().to_string();
        self.node_index.insert(name.clone(), index);
        self.plan.nodes.push(DependencyNode {
            name,
            params,
            groups,
            dependency,
        });
        Ok(index)
    }
}
