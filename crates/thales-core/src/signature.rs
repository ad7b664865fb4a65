//! Signature descriptor.
//!
//! Handlers do not get introspected at run time. Instead every handler carries
//! an explicit [`HandlerSignature`], usually produced by the `#[handler]`
//! macro, listing its parameters with their declared types, defaults and
//! inline annotations. [`describe`] checks the declarations for structural
//! errors and normalizes them before the source classifier runs.

use std::collections::HashSet;

use serde_json::Value;

use crate::error::{ConfigError, ConfigResult};
use crate::param::Param;
use crate::source::Source;
use crate::types::TypeInfo;

/// Operation-level metadata published in the API document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OperationMeta {
    /// Success status code; `None` documents a `default` response.
    pub status_code: Option<u16>,
    /// Short summary; defaults to the title-cased operation id.
    pub summary: Option<String>,
    /// Long description; defaults to the handler documentation.
    pub description: Option<String>,
    /// Tags for grouping.
    pub tags: Vec<String>,
    /// Whether the operation is deprecated.
    pub deprecated: bool,
    /// Operation id override.
    pub operation_id: Option<String>,
}

/// One declared parameter of a handler or dependency.
#[derive(Debug, Clone)]
pub struct ParamDecl {
    /// Parameter name.
    pub name: String,
    /// Declared type.
    pub type_info: TypeInfo,
    /// Default expression, already evaluated to JSON.
    pub default: Option<Value>,
    /// Inline annotation.
    pub annotation: Option<Param>,
}

impl ParamDecl {
    /// Declares a parameter without default or annotation.
    pub fn new(name: impl Into<String>, type_info: TypeInfo) -> Self {
        Self {
            name: name.into(),
            type_info,
            default: None,
            annotation: None,
        }
    }

    /// Sets the declared default.
    #[must_use]
    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Attaches an inline annotation.
    #[must_use]
    pub fn annotation(mut self, annotation: Param) -> Self {
        self.annotation = Some(annotation);
        self
    }

    /// Whether the parameter must be bound from the request.
    pub fn is_required(&self) -> bool {
        self.default.is_none() && !self.type_info.nullable
    }
}

/// Explicit description of a handler's parameter list.
#[derive(Debug, Clone)]
pub struct HandlerSignature {
    /// Handler identity, also used as the endpoint name.
    pub name: String,
    /// Handler documentation.
    pub doc: Option<String>,
    /// Parameters in declaration order.
    pub params: Vec<ParamDecl>,
    /// Operation metadata.
    pub meta: OperationMeta,
}

impl HandlerSignature {
    /// Creates an empty signature.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            doc: None,
            params: Vec::new(),
            meta: OperationMeta::default(),
        }
    }

    /// Sets the handler documentation.
    #[must_use]
    pub fn doc(mut self, doc: impl Into<String>) -> Self {
        let doc = doc.into();
        self.doc = (!doc.trim().is_empty()).then(|| cleandoc(&doc));
        self
    }

    /// Appends a parameter.
    #[must_use]
    pub fn param(mut self, param: ParamDecl) -> Self {
        self.params.push(param);
        self
    }

    /// Replaces the operation metadata.
    #[must_use]
    pub fn meta(mut self, meta: OperationMeta) -> Self {
        self.meta = meta;
        self
    }

    /// Sets the success status code.
    #[must_use]
    pub fn status_code(mut self, status: u16) -> Self {
        self.meta.status_code = Some(status);
        self
    }

    /// The endpoint name without any module path.
    pub fn short_name(&self) -> &str {
        self.name.rsplit("::").next().unwrap_or(&self.name)
    }
}

/// Strips the common indentation of a doc comment and trims blank edges.
fn cleandoc(doc: &str) -> String {
    let lines: Vec<&str> = doc.lines().collect();
    let indent = lines
        .iter()
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.len() - line.trim_start().len())
        .min()
        .unwrap_or(0);
    lines
        .iter()
        .map(|line| line.get(indent..).unwrap_or("").trim_end())
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// Checks a signature for structural errors and normalizes its declarations.
///
/// The returned declarations carry the merged default (annotation default or
/// declared default) and still have an unresolved source when no explicit
/// annotation pins one.
pub fn describe(signature: &HandlerSignature) -> ConfigResult<Vec<ParamDecl>> {
    let handler = signature.name.as_str();
    let mut seen = HashSet::new();
    let mut described = Vec::with_capacity(signature.params.len());

    for decl in &signature.params {
        if !seen.insert(decl.name.as_str()) {
            return Err(ConfigError::annotation(handler, &decl.name, "parameter declared twice"));
        }

        let mut decl = decl.clone();
        if let Some(annotation) = &decl.annotation {
            check_annotation(handler, &decl, annotation)?;
            match (&decl.default, &annotation.default) {
                (Some(declared), Some(annotated)) if declared != annotated => {
                    return Err(ConfigError::DefaultMismatch {
                        handler: handler.to_string(),
                        param: decl.name.clone(),
                    });
                }
                (None, Some(annotated)) => decl.default = Some(annotated.clone()),
                _ => {}
            }
        }
        described.push(decl);
    }

    Ok(described)
}

fn check_annotation(handler: &str, decl: &ParamDecl, annotation: &Param) -> ConfigResult<()> {
    let name = decl.name.as_str();

    if annotation.source == Some(Source::Dependency) {
        if annotation.depends.is_none() {
            return Err(ConfigError::annotation(handler, name, "dependency reference is missing"));
        }
        if annotation.has_binding_options()
            || !annotation.constraints.is_unconstrained()
            || annotation.default.is_some()
        {
            return Err(ConfigError::annotation(
                handler,
                name,
                "dependency parameters take no binding options or constraints",
            ));
        }
        return Ok(());
    }

    if let Some(source) = annotation.source {
        if annotation.embed && source != Source::Body {
            return Err(ConfigError::EmbedNotAllowed {
                param: name.to_string(),
                location: source,
            });
        }
        if let Some(style) = annotation.style {
            if !source.allows_style(style) {
                return Err(ConfigError::UnsupportedStyle {
                    param: name.to_string(),
                    style,
                    location: source,
                });
            }
        }
        if source == Source::Body
            && decl.type_info.is_model()
            && !annotation.embed
            && annotation.alias.is_some()
        {
            return Err(ConfigError::annotation(
                handler,
                name,
                "a model bound to the whole body cannot be aliased, use embed",
            ));
        }
    } else if annotation.has_binding_options() {
        return Err(ConfigError::annotation(
            handler,
            name,
            "binding options require an explicit source",
        ));
    }

    if decl.type_info.is_model() && !annotation.constraints.is_unconstrained() {
        return Err(ConfigError::annotation(
            handler,
            name,
            "constraints cannot be applied to a model",
        ));
    }

    annotation
        .constraints
        .check_applicable(&decl.type_info)
        .map_err(|reason| ConfigError::annotation(handler, name, reason))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dependency::{Dependency, Depends};
    use crate::source::Style;
    use crate::types::ModelInfo;

    fn product() -> TypeInfo {
        TypeInfo::model(ModelInfo::new("Product"))
    }

    fn sig(decl: ParamDecl) -> HandlerSignature {
        HandlerSignature::new("app::items::read_item").param(decl)
    }

    fn noop() -> Dependency {
        Dependency::returning(HandlerSignature::new("noop"), |_| Ok(()))
    }

    #[test]
    fn test_plain_declarations_pass_through() {
        let s = HandlerSignature::new("h")
            .param(ParamDecl::new("id", TypeInfo::integer()))
            .param(ParamDecl::new("skip", TypeInfo::integer()).default_value(0));
        let described = describe(&s).unwrap();
        assert_eq!(described.len(), 2);
        assert!(described[0].is_required());
        assert!(!described[1].is_required());
    }

    #[test]
    fn test_annotation_default_is_merged() {
        let s = sig(ParamDecl::new("limit", TypeInfo::integer())
            .annotation(Param::query().default_value(10)));
        let described = describe(&s).unwrap();
        assert_eq!(described[0].default, Some(Value::from(10)));
    }

    #[test]
    fn test_default_mismatch() {
        let s = sig(ParamDecl::new("limit", TypeInfo::integer())
            .default_value(5)
            .annotation(Param::query().default_value(10)));
        assert!(matches!(describe(&s), Err(ConfigError::DefaultMismatch { .. })));
    }

    #[test]
    fn test_equal_defaults_are_accepted() {
        let s = sig(ParamDecl::new("limit", TypeInfo::integer())
            .default_value(10)
            .annotation(Param::query().default_value(10)));
        assert!(describe(&s).is_ok());
    }

    #[test]
    fn test_embed_rejected_outside_body() {
        for param in [Param::path(), Param::query(), Param::cookie(), Param::header()] {
            let s = sig(ParamDecl::new("x", TypeInfo::string()).annotation(param.embed()));
            assert!(matches!(describe(&s), Err(ConfigError::EmbedNotAllowed { .. })));
        }
    }

    #[test]
    fn test_style_rules() {
        let bad = [
            (Param::path(), Style::Form),
            (Param::header(), Style::PipeDelimited),
            (Param::query(), Style::Simple),
            (Param::cookie(), Style::SpaceDelimited),
        ];
        for (param, style) in bad {
            let s = sig(ParamDecl::new("x", TypeInfo::string()).annotation(param.style(style)));
            assert!(matches!(describe(&s), Err(ConfigError::UnsupportedStyle { .. })));
        }
        let s = sig(ParamDecl::new("x", TypeInfo::array(TypeInfo::string()))
            .annotation(Param::query().style(Style::PipeDelimited)));
        assert!(describe(&s).is_ok());
    }

    #[test]
    fn test_whole_body_alias_rejected() {
        let s = sig(ParamDecl::new("product", product()).annotation(Param::body().alias("p")));
        assert!(matches!(describe(&s), Err(ConfigError::InvalidAnnotation { .. })));

        let s = sig(ParamDecl::new("product", product()).annotation(Param::body().alias("p").embed()));
        assert!(describe(&s).is_ok());
    }

    #[test]
    fn test_constraint_type_conflict() {
        let s = sig(ParamDecl::new("name", TypeInfo::string()).annotation(Param::query().gt(0)));
        let err = describe(&s).unwrap_err();
        assert!(err.to_string().contains("numeric"));
    }

    #[test]
    fn test_dependency_with_options_rejected() {
        let s = sig(ParamDecl::new("user", TypeInfo::any())
            .annotation(Param::depends(Depends::on(noop)).alias("u")));
        assert!(matches!(describe(&s), Err(ConfigError::InvalidAnnotation { .. })));
    }

    #[test]
    fn test_inferred_source_with_alias_rejected() {
        let s = sig(ParamDecl::new("q", TypeInfo::string()).annotation(Param::inferred().alias("x")));
        assert!(describe(&s).is_err());
        let s = sig(ParamDecl::new("q", TypeInfo::string()).annotation(Param::inferred().max_length(3)));
        assert!(describe(&s).is_ok());
    }

    #[test]
    fn test_duplicate_names() {
        let s = HandlerSignature::new("h")
            .param(ParamDecl::new("a", TypeInfo::string()))
            .param(ParamDecl::new("a", TypeInfo::string()));
        assert!(describe(&s).is_err());
    }

    #[test]
    fn test_doc_is_cleaned() {
        let s = HandlerSignature::new("h").doc("\n    Reads an item.\n\n    Second line.\n");
        assert_eq!(s.doc.as_deref(), Some("Reads an item.\n\nSecond line."));
        assert_eq!(HandlerSignature::new("h").doc("   ").doc, None);
        assert_eq!(sig(ParamDecl::new("x", TypeInfo::string())).short_name(), "read_item");
    }
}
