//! Source classifier.
//!
//! Decides, for every described parameter, which request location it binds
//! to. Explicit annotations always win; otherwise:
//!
//! 1. a name matching a path placeholder binds to the path,
//! 2. a record type binds to the whole body,
//! 3. anything else binds to the query string.
//!
//! Path parameters never keep an alias: the placeholder name is the wire name.

use crate::error::{ConfigError, ConfigResult};
use crate::param::{Param, ParameterSpec};
use crate::signature::ParamDecl;
use crate::source::Source;

/// Resolves the source of every described parameter.
///
/// `rule` is the route template and `placeholders` its parameter names.
pub fn classify(
    rule: &str,
    placeholders: &[String],
    decls: Vec<ParamDecl>,
) -> ConfigResult<Vec<ParameterSpec>> {
    decls
        .into_iter()
        .map(|decl| classify_one(rule, placeholders, decl))
        .collect()
}

fn infer_source(decl: &ParamDecl, placeholders: &[String]) -> Source {
    if placeholders.iter().any(|p| p == &decl.name) {
        Source::Path
    } else if decl.type_info.is_model() {
        Source::Body
    } else {
        Source::Query
    }
}

/// Rejects wire names that cannot appear as an HTTP header name.
pub(crate) fn check_header_name(wire: &str) -> ConfigResult<()> {
    http::HeaderName::from_bytes(wire.as_bytes())
        .map(drop)
        .map_err(|_| ConfigError::InvalidHeaderName {
            name: wire.to_string(),
        })
}

fn classify_one(
    rule: &str,
    placeholders: &[String],
    decl: ParamDecl,
) -> ConfigResult<ParameterSpec> {
    let annotation = decl.annotation.clone().unwrap_or_else(Param::inferred);
    let source = annotation
        .source
        .unwrap_or_else(|| infer_source(&decl, placeholders));

    if source == Source::Path && !placeholders.iter().any(|p| p == &decl.name) {
        return Err(ConfigError::UnknownPlaceholder {
            param: decl.name,
            rule: rule.to_string(),
        });
    }

    let alias = match source {
        Source::Path | Source::Dependency => None,
        Source::Body if decl.type_info.is_model() && !annotation.embed => None,
        _ => annotation.alias.clone(),
    };

    if source == Source::Header {
        check_header_name(alias.as_deref().unwrap_or(&decl.name))?;
    }

    let required = decl.is_required();
    Ok(ParameterSpec {
        name: decl.name,
        type_info: decl.type_info,
        source,
        alias,
        required,
        default: decl.default,
        style: annotation.style.unwrap_or_else(|| source.default_style()),
        explode: annotation.explode.unwrap_or_else(|| source.default_explode()),
        embed: annotation.embed,
        constraints: annotation.constraints,
        depends: annotation.depends,
    })
}
