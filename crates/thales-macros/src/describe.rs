//! `#[derive(Describe)]` implementation.
//!
//! Reads the serde attributes that change the wire shape of a record
//! (`rename`, `rename_all`, `default`, `skip`, `deny_unknown_fields`) so the
//! generated descriptor agrees with what `serde_json` will accept.

use proc_macro2::TokenStream;
use quote::quote;
use syn::{Attribute, Data, DeriveInput, Fields, LitStr};

use crate::parse::{doc_comment, Options};

/// Expands `#[derive(Describe)]`.
pub fn expand_describe(input: DeriveInput) -> syn::Result<TokenStream> {
    let Data::Struct(data) = &input.data else {
        return Err(syn::Error::new_spanned(
            &input.ident,
            "Describe can only be derived for structs with named fields",
        ));
    };
    let Fields::Named(fields) = &data.fields else {
        return Err(syn::Error::new_spanned(
            &input.ident,
            "Describe can only be derived for structs with named fields",
        ));
    };

    let ident = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let container = SerdeContainer::from_attrs(&input.attrs)?;
    let options = describe_options(&input.attrs)?;
    options.reject_binding_options("a record")?;

    let model_name = options
        .rename
        .as_ref()
        .map_or_else(|| ident.to_string(), LitStr::value);
    let description = doc_comment(&input.attrs).map(|doc| {
        let doc = cleanup(&doc);
        quote! { .description(#doc) }
    });
    let closed = (container.deny_unknown_fields || options.closed).then(|| quote! { .closed() });

    let mut field_infos = Vec::new();
    for field in &fields.named {
        let serde = SerdeField::from_attrs(&field.attrs)?;
        if serde.skip {
            continue;
        }
        let Some(field_ident) = &field.ident else {
            continue;
        };
        let name = field_ident.to_string();
        let ty = &field.ty;

        let wire = serde.rename.clone().or_else(|| {
            container
                .rename_all
                .as_ref()
                .map(|rule| apply_rename(rule, name.trim_start_matches("r#")))
        });
        let alias = wire
            .filter(|wire| *wire != name)
            .map(|wire| quote! { .alias(#wire) });

        let field_options = describe_options(&field.attrs)?;
        field_options.reject_binding_options("a record field")?;
        let default = match &field_options.default {
            Some(value) => Some(quote! { .default_value(#value) }),
            None => serde.default.then(|| quote! { .optional() }),
        };
        let constraints = if field_options.constraints.is_empty()
            && field_options.enum_values.is_none()
            && !field_options.deprecated
        {
            None
        } else {
            let calls = field_options.constraint_calls();
            Some(quote! { .constraints(::thales::Constraints::new() #calls) })
        };

        field_infos.push(quote! {
            .field(
                ::thales::FieldInfo::new(#name, <#ty as ::thales::Describe>::describe())
                    #alias #default #constraints
            )
        });
    }

    Ok(quote! {
        impl #impl_generics ::thales::Describe for #ident #ty_generics #where_clause {
            fn describe() -> ::thales::TypeInfo {
                ::thales::TypeInfo::model(
                    ::thales::ModelInfo::new(#model_name)
                        #description
                        #(#field_infos)*
                        #closed
                )
            }
        }
    })
}

fn describe_options(attrs: &[Attribute]) -> syn::Result<Options> {
    let mut options = Options::default();
    for attr in attrs.iter().filter(|attr| attr.path().is_ident("describe")) {
        let parsed = Options::from_attr(attr)?;
        options = merge(options, parsed);
    }
    Ok(options)
}

fn merge(mut base: Options, other: Options) -> Options {
    base.alias = other.alias.or(base.alias);
    base.style = other.style.or(base.style);
    base.explode = other.explode.or(base.explode);
    base.embed |= other.embed;
    base.default = other.default.or(base.default);
    base.constraints.extend(other.constraints);
    base.enum_values = other.enum_values.or(base.enum_values);
    base.deprecated |= other.deprecated;
    base.rename = other.rename.or(base.rename);
    base.closed |= other.closed;
    base
}

fn cleanup(doc: &str) -> String {
    doc.lines().map(str::trim).collect::<Vec<_>>().join("\n").trim().to_string()
}

/// Container-level serde attributes that affect the wire shape.
#[derive(Default)]
struct SerdeContainer {
    rename_all: Option<String>,
    deny_unknown_fields: bool,
}

impl SerdeContainer {
    fn from_attrs(attrs: &[Attribute]) -> syn::Result<Self> {
        let mut container = Self::default();
        for attr in attrs.iter().filter(|attr| attr.path().is_ident("serde")) {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("rename_all") {
                    let rule: LitStr = meta.value()?.parse()?;
                    if !RENAME_RULES.contains(&rule.value().as_str()) {
                        return Err(meta.error(format!("unsupported rename_all rule '{}'", rule.value())));
                    }
                    container.rename_all = Some(rule.value());
                } else if meta.path.is_ident("deny_unknown_fields") {
                    container.deny_unknown_fields = true;
                } else {
                    skip_value(&meta)?;
                }
                Ok(())
            })?;
        }
        Ok(container)
    }
}

/// Field-level serde attributes that affect the wire shape.
#[derive(Default)]
struct SerdeField {
    rename: Option<String>,
    default: bool,
    skip: bool,
}

impl SerdeField {
    fn from_attrs(attrs: &[Attribute]) -> syn::Result<Self> {
        let mut field = Self::default();
        for attr in attrs.iter().filter(|attr| attr.path().is_ident("serde")) {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("rename") {
                    let rename: LitStr = meta.value()?.parse()?;
                    field.rename = Some(rename.value());
                } else if meta.path.is_ident("default") {
                    field.default = true;
                    skip_value(&meta)?;
                } else if meta.path.is_ident("skip") || meta.path.is_ident("skip_deserializing") {
                    field.skip = true;
                } else if meta.path.is_ident("flatten") {
                    return Err(meta.error("flattened fields cannot be described"));
                } else {
                    skip_value(&meta)?;
                }
                Ok(())
            })?;
        }
        Ok(field)
    }
}

/// Consumes `= value` or `(..)` of a serde option we do not interpret.
fn skip_value(meta: &syn::meta::ParseNestedMeta<'_>) -> syn::Result<()> {
    if meta.input.peek(syn::Token![=]) {
        let _: syn::Expr = meta.value()?.parse()?;
    } else if meta.input.peek(syn::token::Paren) {
        meta.parse_nested_meta(|nested| skip_value(&nested))?;
    }
    Ok(())
}

const RENAME_RULES: &[&str] = &[
    "lowercase",
    "UPPERCASE",
    "PascalCase",
    "camelCase",
    "snake_case",
    "SCREAMING_SNAKE_CASE",
    "kebab-case",
    "SCREAMING-KEBAB-CASE",
];

/// Applies a serde `rename_all` rule to a snake_case field name.
fn apply_rename(rule: &str, field: &str) -> String {
    match rule {
        "lowercase" | "snake_case" => field.to_string(),
        "UPPERCASE" | "SCREAMING_SNAKE_CASE" => field.to_ascii_uppercase(),
        "kebab-case" => field.replace('_', "-"),
        "SCREAMING-KEBAB-CASE" => field.replace('_', "-").to_ascii_uppercase(),
        "PascalCase" | "camelCase" => {
            let mut out = String::with_capacity(field.len());
            let mut upper = rule == "PascalCase";
            for ch in field.chars() {
                if ch == '_' {
                    upper = true;
                } else if upper {
                    out.push(ch.to_ascii_uppercase());
                    upper = false;
                } else {
                    out.push(ch);
                }
            }
            out
        }
        _ => field.to_string(),
    }
}
