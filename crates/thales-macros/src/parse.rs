//! Parsing utilities for handler macros.
//!
//! This module provides parsing for handler attributes, parameter
//! annotations and function signatures.

use proc_macro2::{Span, TokenStream};
use quote::{quote, ToTokens};
use syn::{
    meta::ParseNestedMeta,
    parse::{Parse, ParseStream},
    punctuated::Punctuated,
    spanned::Spanned,
    Attribute, Expr, ExprArray, ExprLit, FnArg, GenericArgument, Ident, ItemFn, Lit, LitBool, LitInt,
    LitStr, Meta, Pat, PatIdent, PatType, Path, PathArguments, ReturnType, Token, Type,
};

/// Parameter annotation names recognised on handler arguments.
const PARAM_ATTRS: &[&str] = &["path", "query", "header", "cookie", "body", "param", "depends"];

/// Constraint keys forwarded to the `Param`/`Constraints` builders.
const CONSTRAINT_KEYS: &[&str] = &[
    "gt",
    "ge",
    "lt",
    "le",
    "multiple_of",
    "min_length",
    "max_length",
    "pattern",
    "title",
    "description",
    "example",
];

/// Maps an OpenAPI style name to the `Style` variant.
fn style_variant(name: &LitStr) -> syn::Result<Ident> {
    let variant = match name.value().as_str() {
        "simple" => "Simple",
        "form" => "Form",
        "spaceDelimited" => "SpaceDelimited",
        "pipeDelimited" => "PipeDelimited",
        other => {
            return Err(syn::Error::new(
                name.span(),
                format!("unknown style '{other}', expected simple, form, spaceDelimited or pipeDelimited"),
            ))
        }
    };
    Ok(Ident::new(variant, name.span()))
}

fn lit_str(expr: &Expr) -> syn::Result<LitStr> {
    match expr {
        Expr::Lit(ExprLit { lit: Lit::Str(s), .. }) => Ok(s.clone()),
        _ => Err(syn::Error::new(expr.span(), "expected string literal")),
    }
}

/// Binding options and constraints shared by parameter and field annotations.
#[derive(Default)]
pub struct Options {
    /// Wire name override.
    pub alias: Option<LitStr>,
    /// Style variant.
    pub style: Option<Ident>,
    /// Explode flag.
    pub explode: Option<LitBool>,
    /// Nest a body record under its own key.
    pub embed: bool,
    /// Default expression.
    pub default: Option<Expr>,
    /// Constraint builder calls in declaration order.
    pub constraints: Vec<(Ident, Expr)>,
    /// Allowed values.
    pub enum_values: Option<ExprArray>,
    /// Deprecated flag.
    pub deprecated: bool,
    /// Record name override (containers only).
    pub rename: Option<LitStr>,
    /// Reject unknown keys (containers only).
    pub closed: bool,
}

impl Options {
    /// Parses the arguments of an annotation, if it has any.
    pub fn from_attr(attr: &Attribute) -> syn::Result<Self> {
        let mut options = Self::default();
        if matches!(attr.meta, Meta::List(_)) {
            attr.parse_nested_meta(|meta| options.parse_entry(&meta))?;
        }
        Ok(options)
    }

    fn parse_entry(&mut self, meta: &ParseNestedMeta<'_>) -> syn::Result<()> {
        let key = meta
            .path
            .get_ident()
            .ok_or_else(|| meta.error("expected identifier"))?
            .clone();
        let name = key.to_string();
        match name.as_str() {
            "embed" => self.embed = true,
            "deprecated" => self.deprecated = true,
            "closed" => self.closed = true,
            "alias" => self.alias = Some(meta.value()?.parse()?),
            "rename" => self.rename = Some(meta.value()?.parse()?),
            "style" => self.style = Some(style_variant(&meta.value()?.parse()?)?),
            "explode" => self.explode = Some(meta.value()?.parse()?),
            "default" => self.default = Some(meta.value()?.parse()?),
            "enum_values" => self.enum_values = Some(meta.value()?.parse()?),
            _ if CONSTRAINT_KEYS.contains(&name.as_str()) => {
                let value: Expr = meta.value()?.parse()?;
                self.constraints.push((key, value));
            }
            _ => return Err(meta.error(format!("unknown option `{name}`"))),
        }
        Ok(())
    }

    /// Rejects options that make no sense outside a handler argument.
    pub fn reject_binding_options(&self, context: &str) -> syn::Result<()> {
        let offending = [
            self.alias.as_ref().map(Spanned::span),
            self.style.as_ref().map(Spanned::span),
            self.explode.as_ref().map(Spanned::span),
        ];
        if let Some(span) = offending.into_iter().flatten().next() {
            return Err(syn::Error::new(span, format!("binding options are not allowed on {context}")));
        }
        if self.embed {
            return Err(syn::Error::new(Span::call_site(), format!("`embed` is not allowed on {context}")));
        }
        Ok(())
    }

    /// Constraint builder calls, applied to `target`.
    pub fn constraint_calls(&self) -> TokenStream {
        let calls = self.constraints.iter().map(|(key, value)| quote! { .#key(#value) });
        let enum_values = self.enum_values.as_ref().map(|array| {
            let elems = array.elems.iter();
            quote! { .enum_values([#(::thales::__private::serde_json::Value::from(#elems)),*]) }
        });
        let deprecated = self.deprecated.then(|| quote! { .deprecated() });
        quote! { #(#calls)* #enum_values #deprecated }
    }
}

/// Where an annotated handler argument binds.
pub enum ParamKind {
    /// Source left to inference (`#[param]` or no annotation).
    Inferred,
    /// `#[path]`, `#[query]`, `#[header]`, `#[cookie]` or `#[body]`.
    Located(Ident),
    /// `#[depends(..)]`.
    Depends(DependsAttr),
}

/// Arguments of `#[depends(path, cache = false)]`.
pub struct DependsAttr {
    /// Path to the dependency function.
    pub path: Path,
    /// Whether the resolved value is shared within a request.
    pub cache: bool,
}

impl Parse for DependsAttr {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let path: Path = input.parse()?;
        let mut cache = true;
        while input.peek(Token![,]) {
            input.parse::<Token![,]>()?;
            if input.is_empty() {
                break;
            }
            let key: Ident = input.parse()?;
            if key != "cache" {
                return Err(syn::Error::new(key.span(), format!("unknown option `{key}`")));
            }
            input.parse::<Token![=]>()?;
            cache = input.parse::<LitBool>()?.value;
        }
        Ok(Self { path, cache })
    }
}

impl DependsAttr {
    /// Path of the generated `<name>_dependency` factory.
    pub fn factory(&self) -> Path {
        let mut path = self.path.clone();
        if let Some(last) = path.segments.last_mut() {
            last.ident = Ident::new(&format!("{}_dependency", last.ident), last.ident.span());
        }
        path
    }
}

/// A parsed handler or dependency argument.
pub struct HandlerParam {
    /// The parameter name.
    pub name: Ident,
    /// The parameter type.
    pub ty: Type,
    /// Binding kind.
    pub kind: ParamKind,
    /// Options of the annotation.
    pub options: Options,
}

impl HandlerParam {
    /// Parses a function argument and strips its Thales annotation.
    pub fn from_fn_arg(arg: &mut FnArg) -> syn::Result<Self> {
        let FnArg::Typed(PatType { attrs, pat, ty, .. }) = arg else {
            return Err(syn::Error::new(arg.span(), "handlers cannot have self parameter"));
        };
        let name = match &**pat {
            Pat::Ident(PatIdent { ident, .. }) => ident.clone(),
            other => {
                return Err(syn::Error::new(
                    other.span(),
                    "expected a plain identifier; destructuring patterns are not supported",
                ))
            }
        };

        let mut annotations = Vec::new();
        attrs.retain(|attr| {
            let ours = PARAM_ATTRS.iter().any(|known| attr.path().is_ident(known));
            if ours {
                annotations.push(attr.clone());
            }
            !ours
        });
        if annotations.len() > 1 {
            return Err(syn::Error::new(
                annotations[1].span(),
                "a parameter takes at most one source annotation",
            ));
        }

        let (kind, options) = match annotations.first() {
            None => (ParamKind::Inferred, Options::default()),
            Some(attr) if attr.path().is_ident("depends") => {
                let depends: DependsAttr = attr.parse_args()?;
                (ParamKind::Depends(depends), Options::default())
            }
            Some(attr) if attr.path().is_ident("param") => (ParamKind::Inferred, Options::from_attr(attr)?),
            Some(attr) => {
                let ident = attr
                    .path()
                    .get_ident()
                    .cloned()
                    .ok_or_else(|| syn::Error::new(attr.span(), "expected identifier"))?;
                (ParamKind::Located(ident), Options::from_attr(attr)?)
            }
        };

        Ok(Self {
            name,
            ty: (**ty).clone(),
            kind,
            options,
        })
    }

    /// Expression building the `ParamDecl` of this argument.
    pub fn declaration(&self) -> TokenStream {
        let name = self.name.to_string();
        let ty = &self.ty;
        let options = &self.options;

        let annotation = match &self.kind {
            ParamKind::Depends(depends) => {
                return quote! {
                    ::thales::ParamDecl::new(#name, ::thales::TypeInfo::any())
                        .annotation(::thales::Param::depends(#depends))
                };
            }
            ParamKind::Inferred if is_unannotated(options) => None,
            ParamKind::Inferred => Some(quote! { ::thales::Param::inferred() }),
            ParamKind::Located(source) => Some(quote! { ::thales::Param::#source() }),
        };

        let annotation = annotation.map(|base| {
            let alias = options.alias.as_ref().map(|alias| quote! { .alias(#alias) });
            let style = options.style.as_ref().map(|style| quote! { .style(::thales::Style::#style) });
            let explode = options.explode.as_ref().map(|explode| quote! { .explode(#explode) });
            let embed = options.embed.then(|| quote! { .embed() });
            let default = options.default.as_ref().map(|default| quote! { .default_value(#default) });
            let constraints = options.constraint_calls();
            quote! { .annotation(#base #alias #style #explode #embed #default #constraints) }
        });

        quote! {
            ::thales::ParamDecl::new(#name, <#ty as ::thales::Describe>::describe()) #annotation
        }
    }

    /// Statement binding this argument out of `args`.
    pub fn binding(&self) -> TokenStream {
        let name = &self.name;
        let key = name.to_string();
        let ty = &self.ty;
        match &self.kind {
            ParamKind::Depends(_) => match arc_inner(ty) {
                Some(inner) => quote! { let #name: #ty = args.dependency_arc::<#inner>(#key)?; },
                None => quote! { let #name: #ty = args.dependency::<#ty>(#key)?; },
            },
            _ => quote! { let #name: #ty = args.take::<#ty>(#key)?; },
        }
    }
}

fn is_unannotated(options: &Options) -> bool {
    options.alias.is_none()
        && options.style.is_none()
        && options.explode.is_none()
        && !options.embed
        && options.default.is_none()
        && options.constraints.is_empty()
        && options.enum_values.is_none()
        && !options.deprecated
}

/// `Arc<T>` yields `T`.
fn arc_inner(ty: &Type) -> Option<&Type> {
    let Type::Path(type_path) = ty else {
        return None;
    };
    let segment = type_path.path.segments.last()?;
    if segment.ident != "Arc" {
        return None;
    }
    match &segment.arguments {
        PathArguments::AngleBracketed(args) => match args.args.first() {
            Some(GenericArgument::Type(inner)) => Some(inner),
            _ => None,
        },
        _ => None,
    }
}

/// Parsed `#[handler(..)]` attributes.
#[derive(Default)]
pub struct HandlerAttrs {
    /// Success status code.
    pub status: Option<LitInt>,
    /// Operation summary.
    pub summary: Option<LitStr>,
    /// Operation description; defaults to the doc comment.
    pub description: Option<LitStr>,
    /// Operation id override.
    pub operation_id: Option<LitStr>,
    /// Tags.
    pub tags: Vec<LitStr>,
    /// Deprecated flag.
    pub deprecated: bool,
    /// Route-level dependencies, run before the handler.
    pub dependencies: Vec<Path>,
}

impl Parse for HandlerAttrs {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let mut attrs = Self::default();
        let meta_list: Punctuated<Meta, Token![,]> = Punctuated::parse_terminated(input)?;

        for meta in meta_list {
            let ident = meta
                .path()
                .get_ident()
                .ok_or_else(|| syn::Error::new(meta.path().span(), "expected identifier"))?
                .to_string();

            match (ident.as_str(), &meta) {
                ("deprecated", Meta::Path(_)) => attrs.deprecated = true,
                ("tags", Meta::List(list)) => {
                    attrs.tags = list
                        .parse_args_with(Punctuated::<LitStr, Token![,]>::parse_terminated)?
                        .into_iter()
                        .collect();
                }
                ("dependencies", Meta::List(list)) => {
                    attrs.dependencies = list
                        .parse_args_with(Punctuated::<Path, Token![,]>::parse_terminated)?
                        .into_iter()
                        .collect();
                }
                (_, Meta::NameValue(nv)) => match ident.as_str() {
                    "status" => match &nv.value {
                        Expr::Lit(ExprLit { lit: Lit::Int(status), .. }) => attrs.status = Some(status.clone()),
                        other => return Err(syn::Error::new(other.span(), "expected integer literal")),
                    },
                    "deprecated" => match &nv.value {
                        Expr::Lit(ExprLit { lit: Lit::Bool(flag), .. }) => attrs.deprecated = flag.value,
                        other => return Err(syn::Error::new(other.span(), "expected boolean literal")),
                    },
                    "summary" => attrs.summary = Some(lit_str(&nv.value)?),
                    "description" => attrs.description = Some(lit_str(&nv.value)?),
                    "operation_id" => attrs.operation_id = Some(lit_str(&nv.value)?),
                    _ => {
                        return Err(syn::Error::new(
                            nv.path.span(),
                            format!("unknown attribute: {ident}"),
                        ))
                    }
                },
                _ => return Err(syn::Error::new(meta.span(), format!("unknown attribute: {ident}"))),
            }
        }

        Ok(attrs)
    }
}

impl HandlerAttrs {
    /// Expression building the `OperationMeta`.
    pub fn operation_meta(&self) -> TokenStream {
        let some = |value: Option<&LitStr>| match value {
            Some(value) => quote! { ::core::option::Option::Some(::std::string::String::from(#value)) },
            None => quote! { ::core::option::Option::None },
        };
        let status = match &self.status {
            Some(status) => quote! { ::core::option::Option::Some(#status) },
            None => quote! { ::core::option::Option::None },
        };
        let summary = some(self.summary.as_ref());
        let description = some(self.description.as_ref());
        let operation_id = some(self.operation_id.as_ref());
        let tags = &self.tags;
        let deprecated = self.deprecated;
        quote! {
            ::thales::OperationMeta {
                status_code: #status,
                summary: #summary,
                description: #description,
                tags: ::std::vec![#(::std::string::String::from(#tags)),*],
                deprecated: #deprecated,
                operation_id: #operation_id,
            }
        }
    }
}

/// Parsed handler or dependency function.
pub struct HandlerFn {
    /// The function name.
    pub name: Ident,
    /// The function parameters.
    pub params: Vec<HandlerParam>,
    /// The return type; `()` when omitted.
    pub return_type: Type,
    /// Concatenated doc comment.
    pub doc: Option<String>,
    /// The original function with Thales annotations removed.
    pub item: ItemFn,
}

impl HandlerFn {
    /// Parses an `ItemFn` into a `HandlerFn`.
    pub fn parse(mut item: ItemFn) -> syn::Result<Self> {
        if let Some(asyncness) = &item.sig.asyncness {
            return Err(syn::Error::new(
                asyncness.span(),
                "handlers must be synchronous functions",
            ));
        }
        if !item.sig.generics.params.is_empty() {
            return Err(syn::Error::new(
                item.sig.generics.span(),
                "handlers cannot be generic",
            ));
        }

        let params = item
            .sig
            .inputs
            .iter_mut()
            .map(HandlerParam::from_fn_arg)
            .collect::<syn::Result<Vec<_>>>()?;

        let return_type = match &item.sig.output {
            ReturnType::Default => syn::parse_quote!(()),
            ReturnType::Type(_, ty) => (**ty).clone(),
        };

        Ok(Self {
            name: item.sig.ident.clone(),
            params,
            return_type,
            doc: doc_comment(&item.attrs),
            item,
        })
    }

    /// Returns the `Ok` type if the function returns a `Result`.
    pub fn result_ok_type(&self) -> Option<&Type> {
        let Type::Path(type_path) = &self.return_type else {
            return None;
        };
        let segment = type_path.path.segments.last()?;
        if segment.ident != "Result" {
            return None;
        }
        match &segment.arguments {
            PathArguments::AngleBracketed(args) => match args.args.first() {
                Some(GenericArgument::Type(ok)) => Some(ok),
                _ => None,
            },
            _ => None,
        }
    }

    /// `.doc(..)` call for the signature, if documented.
    pub fn doc_call(&self) -> Option<TokenStream> {
        self.doc.as_ref().map(|doc| quote! { .doc(#doc) })
    }
}

/// Joins `#[doc = ".."]` attributes.
pub fn doc_comment(attrs: &[Attribute]) -> Option<String> {
    let lines: Vec<String> = attrs
        .iter()
        .filter(|attr| attr.path().is_ident("doc"))
        .filter_map(|attr| match &attr.meta {
            Meta::NameValue(nv) => lit_str(&nv.value).ok().map(|s| s.value()),
            _ => None,
        })
        .collect();
    let doc = lines.join("\n");
    (!doc.trim().is_empty()).then_some(doc)
}

impl ToTokens for DependsAttr {
    fn to_tokens(&self, tokens: &mut TokenStream) {
        let factory = self.factory();
        let cache = self.cache;
        tokens.extend(quote! { ::thales::Depends::on(#factory).use_cache(#cache) });
    }
}
