//! Handler and dependency macro implementation.
//!
//! Both macros keep the annotated function as written (minus the parameter
//! annotations) and emit a sibling factory function:
//!
//! - `#[handler]` on `fn get_item(..)` emits `fn get_item_endpoint() -> Endpoint<R>`
//! - `#[dependency]` on `fn current_user(..)` emits `fn current_user_dependency() -> Dependency`

use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use syn::ItemFn;

use crate::parse::{HandlerAttrs, HandlerFn};

/// Expands the `#[handler]` attribute macro.
pub fn expand_handler(attr: TokenStream, item: TokenStream) -> syn::Result<TokenStream> {
    let attrs: HandlerAttrs = syn::parse2(attr)?;
    let item_fn: ItemFn = syn::parse2(item)?;
    let handler = HandlerFn::parse(item_fn)?;

    Ok(generate_handler_code(&attrs, &handler))
}

/// Expands the `#[dependency]` attribute macro.
pub fn expand_dependency(attr: TokenStream, item: TokenStream) -> syn::Result<TokenStream> {
    if !attr.is_empty() {
        return Err(syn::Error::new_spanned(attr, "#[dependency] takes no arguments"));
    }
    let item_fn: ItemFn = syn::parse2(item)?;
    let dependency = HandlerFn::parse(item_fn)?;

    Ok(generate_dependency_code(&dependency))
}

fn generate_handler_code(attrs: &HandlerAttrs, handler: &HandlerFn) -> TokenStream {
    let fn_name = &handler.name;
    let name = fn_name.to_string();
    let vis = &handler.item.vis;
    let original_fn = &handler.item;
    let return_type = &handler.return_type;
    let factory = format_ident!("{}_endpoint", fn_name);

    let doc = handler.doc_call();
    let meta = attrs.operation_meta();
    let declarations = handler.params.iter().map(|param| param.declaration());
    let bindings = handler.params.iter().map(|param| param.binding());
    let call_args = handler.params.iter().map(|param| &param.name);
    let route_dependencies = attrs.dependencies.iter().map(|path| {
        let mut factory = path.clone();
        if let Some(last) = factory.segments.last_mut() {
            last.ident = format_ident!("{}_dependency", last.ident);
        }
        quote! { .dependency(::thales::Depends::on(#factory)) }
    });

    quote! {
        #original_fn

        #[doc = concat!("Binding descriptor for [`", #name, "`].")]
        #[allow(unused_mut, unused_variables, clippy::needless_question_mark)]
        #vis fn #factory() -> ::thales::Endpoint<#return_type> {
            let signature = ::thales::HandlerSignature::new(#name)
                #doc
                .meta(#meta)
                #(.param(#declarations))*;
            ::thales::Endpoint::new(
                signature,
                |mut args: ::thales::BoundArguments| -> ::thales::__private::anyhow::Result<#return_type> {
                    #(#bindings)*
                    ::core::result::Result::Ok(#fn_name(#(#call_args),*))
                },
            )
            #(#route_dependencies)*
        }
    }
}

fn generate_dependency_code(dependency: &HandlerFn) -> TokenStream {
    let fn_name = &dependency.name;
    let name = fn_name.to_string();
    let vis = &dependency.item.vis;
    let original_fn = &dependency.item;
    let factory = format_ident!("{}_dependency", fn_name);

    let doc = dependency.doc_call();
    let declarations = dependency.params.iter().map(|param| param.declaration());
    let bindings = dependency.params.iter().map(|param| param.binding());
    let call_args: Vec<_> = dependency.params.iter().map(|param| &param.name).collect();

    let (value_type, call) = match dependency.result_ok_type() {
        Some(ok) => (quote! { #ok }, quote! { #fn_name(#(#call_args),*)? }),
        None => {
            let ty = &dependency.return_type;
            (quote! { #ty }, quote! { #fn_name(#(#call_args),*) })
        }
    };

    quote! {
        #original_fn

        #[doc = concat!("Dependency descriptor for [`", #name, "`].")]
        #[allow(unused_mut, unused_variables, clippy::needless_question_mark)]
        #vis fn #factory() -> ::thales::Dependency {
            let signature = ::thales::HandlerSignature::new(concat!(module_path!(), "::", #name))
                #doc
                #(.param(#declarations))*;
            ::thales::Dependency::returning(
                signature,
                |mut args: ::thales::BoundArguments| -> ::thales::__private::anyhow::Result<#value_type> {
                    #(#bindings)*
                    ::core::result::Result::Ok(#call)
                },
            )
        }
    }
}
