//! Route specifications.
//!
//! A [`RouteSpec`] is everything the binder and the document generator need
//! to know about one registered endpoint. It is built once by
//! [`RouteSpec::compile`] and never mutated afterwards.

use std::sync::OnceLock;

use http::Method;
use regex::Regex;

use crate::classify::classify;
use crate::config::{BindingConfig, Mode};
use crate::dependency::{DependencyPlan, Depends};
use crate::error::{ConfigError, ConfigResult};
use crate::param::ParameterSpec;
use crate::schema::{build_groups, compile_groups, CompiledGroup};
use crate::signature::{describe, HandlerSignature, OperationMeta};
use crate::source::Source;
use crate::validator::Validator;

/// Canonical method order used for matching and documentation.
pub const METHOD_ORDER: [Method; 9] = [
    Method::GET,
    Method::PUT,
    Method::POST,
    Method::DELETE,
    Method::OPTIONS,
    Method::HEAD,
    Method::PATCH,
    Method::TRACE,
    Method::CONNECT,
];

fn placeholder_regex() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| {
        Regex::new(r"\{(?P<brace>[^{}:]+)\}|<(?:(?P<conv>[A-Za-z_]\w*)(?:\([^)]*\))?:)?(?P<angle>[A-Za-z_]\w*)>")
            .expect("valid regex")
    })
}

/// A placeholder of a route template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholder {
    /// Placeholder name.
    pub name: String,
    /// The placeholder may span several segments (`<path:name>`).
    pub multi_segment: bool,
}

/// Extracts the placeholders of a route template in order of appearance.
///
/// Both `{name}` and `<converter:name>` forms are recognized.
///
/// ```
/// use thales_core::route::placeholders;
///
/// let names: Vec<_> = placeholders("/users/<int:user_id>/posts/{post_id}")
///     .into_iter()
///     .map(|p| p.name)
///     .collect();
/// assert_eq!(names, ["user_id", "post_id"]);
/// ```
pub fn placeholders(rule: &str) -> Vec<Placeholder> {
    placeholder_regex()
        .captures_iter(rule)
        .filter_map(|cap| {
            let name = cap.name("brace").or_else(|| cap.name("angle"))?;
            Some(Placeholder {
                name: name.as_str().trim().to_string(),
                multi_segment: cap.name("conv").is_some_and(|c| c.as_str() == "path"),
            })
        })
        .collect()
}

/// Rewrites a route template with `{name}` placeholders only.
pub fn openapi_path(rule: &str) -> String {
    placeholder_regex()
        .replace_all(rule, |cap: &regex::Captures<'_>| {
            let name = cap
                .name("brace")
                .or_else(|| cap.name("angle"))
                .map_or("", |m| m.as_str().trim());
            format!("{{{name}}}")
        })
        .into_owned()
}

fn path_matcher(rule: &str) -> ConfigResult<Regex> {
    let mut pattern = String::from("^");
    let mut last = 0;
    for cap in placeholder_regex().captures_iter(rule) {
        let Some(whole) = cap.get(0) else { continue };
        pattern.push_str(&regex::escape(&rule[last..whole.start()]));
        let multi = cap.name("conv").is_some_and(|c| c.as_str() == "path");
        pattern.push_str(if multi { "(.+)" } else { "([^/]+)" });
        last = whole.end();
    }
    pattern.push_str(&regex::escape(&rule[last..]));
    pattern.push('$');
    Regex::new(&pattern).map_err(|e| ConfigError::invalid_value("rule", e.to_string()))
}

/// Inputs of [`RouteSpec::compile`].
#[derive(Debug, Clone)]
pub struct RouteDefinition<'a> {
    /// Route template.
    pub rule: &'a str,
    /// Endpoint name override; defaults to the handler's short name.
    pub endpoint: Option<&'a str>,
    /// Methods served by the route.
    pub methods: &'a [Method],
    /// Handler descriptor.
    pub signature: &'a HandlerSignature,
    /// Route-level dependencies run before the handler.
    pub dependencies: &'a [Depends],
    /// The route was explicitly marked typed (relevant in manual mode).
    pub typed: bool,
}

/// A compiled, immutable endpoint description.
#[derive(Debug)]
pub struct RouteSpec {
    /// Endpoint name.
    pub endpoint: String,
    /// Route template as registered.
    pub rule: String,
    /// Route template with `{name}` placeholders.
    pub path: String,
    /// Methods served, in canonical order.
    pub methods: Vec<Method>,
    /// Placeholder names in template order.
    pub placeholders: Vec<String>,
    /// Resolved handler parameters in declaration order.
    pub params: Vec<ParameterSpec>,
    /// Compiled source groups of the handler.
    pub groups: Vec<CompiledGroup>,
    /// Dependency resolution order.
    pub dependencies: DependencyPlan,
    /// Operation metadata.
    pub meta: OperationMeta,
    /// Handler documentation.
    pub doc: Option<String>,
    /// Explicitly marked typed.
    pub typed: bool,
    matcher: Regex,
}

impl RouteSpec {
    /// Describes, classifies and compiles a route.
    ///
    /// Every structural error of the handler or its dependency graph is
    /// reported here, before the application serves any request.
    pub fn compile(definition: RouteDefinition<'_>, validator: &dyn Validator) -> ConfigResult<Self> {
        let RouteDefinition {
            rule,
            endpoint,
            methods,
            signature,
            dependencies,
            typed,
        } = definition;

        let placeholders: Vec<String> = placeholders(rule).into_iter().map(|p| p.name).collect();
        let decls = describe(signature)?;
        let params = classify(rule, &placeholders, decls)?;
        let groups = compile_groups(build_groups(&signature.name, &params)?, validator)?;
        let plan = DependencyPlan::build(rule, &placeholders, &params, dependencies, validator)?;

        let mut methods: Vec<Method> = methods.to_vec();
        methods.sort_by_key(method_rank);
        methods.dedup();

        let spec = Self {
            endpoint: endpoint.unwrap_or_else(|| signature.short_name()).to_string(),
            rule: rule.to_string(),
            path: openapi_path(rule),
            methods,
            placeholders,
            params,
            groups,
            dependencies: plan,
            meta: signature.meta.clone(),
            doc: signature.doc.clone(),
            typed,
            matcher: path_matcher(rule)?,
        };

        tracing::debug!(
            endpoint = %spec.endpoint,
            rule = %spec.rule,
            methods = ?spec.methods,
            params = spec.params.len(),
            dependency_steps = spec.dependencies.steps.len(),
            "route compiled"
        );
        Ok(spec)
    }

    /// Whether the route receives bound arguments under `config`.
    pub fn is_bound(&self, config: &BindingConfig) -> bool {
        (config.mode == Mode::Auto || self.typed) && !self.bound_methods(config).is_empty()
    }

    /// Methods that are neither ignored nor excluded by the mode.
    pub fn bound_methods(&self, config: &BindingConfig) -> Vec<&Method> {
        if config.mode == Mode::Manual && !self.typed {
            return Vec::new();
        }
        self.methods.iter().filter(|m| !config.is_ignored(m)).collect()
    }

    /// Path placeholders that no parameter binds to.
    pub fn unbound_placeholders(&self) -> impl Iterator<Item = &str> {
        self.placeholders.iter().map(String::as_str).filter(|name| {
            !self
                .params
                .iter()
                .chain(self.dependencies.nodes.iter().flat_map(|n| n.params.iter()))
                .any(|p| p.source == Source::Path && p.name == *name)
        })
    }

    /// Matches a request path, returning raw placeholder values in template order.
    pub fn match_path<'p>(&self, path: &'p str) -> Option<Vec<(&str, &'p str)>> {
        let caps = self.matcher.captures(path)?;
        Some(
            self.placeholders
                .iter()
                .zip(caps.iter().skip(1))
                .filter_map(|(name, m)| Some((name.as_str(), m?.as_str())))
                .collect(),
        )
    }
}

/// Position of a method in [`METHOD_ORDER`]; unknown methods sort last.
pub fn method_rank(method: &Method) -> usize {
    METHOD_ORDER
        .iter()
        .position(|m| m == method)
        .unwrap_or(METHOD_ORDER.len())
}
