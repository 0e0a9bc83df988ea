//! Procedural macros for ssr-lambda.
//!
//! `#[page]` turns an async render function into a type implementing
//! `ssr_lambda::page::PageModule`, ready to be registered with a
//! `PageRegistry`.
//!
//! # Example
//!
//! ```ignore
//! use ssr_lambda::prelude::*;
//!
//! #[page(path = "pages/about.js", description = "About us")]
//! async fn about(ctx: &RenderContext) -> Result<RenderOutput, PageError> {
//!     Ok(RenderOutput::html("<h1>About</h1>"))
//! }
//!
//! // Generates `AboutPage`.
//! registry.register(Box::new(AboutPage::new())).await?;
//! ```

use proc_macro::TokenStream;
use quote::{format_ident, quote};
use syn::{parse_macro_input, punctuated::Punctuated, Expr, ExprLit, ItemFn, Lit, Meta, Token};

#[derive(Default, Debug)]
struct PageAttrs {
    /// Logical module path, e.g. `pages/about.js`.
    path: Option<String>,
    description: Option<String>,
}

impl PageAttrs {
    fn parse_meta_list(metas: Punctuated<Meta, Token![,]>) -> syn::Result<Self> {
        let mut attrs = PageAttrs::default();

        for meta in metas {
            let Meta::NameValue(nv) = meta else {
                return Err(syn::Error::new_spanned(meta, "expected name = value"));
            };
            let ident = nv
                .path
                .get_ident()
                .ok_or_else(|| syn::Error::new_spanned(&nv.path, "expected identifier"))?
                .to_string();

            let value = match &nv.value {
                Expr::Lit(ExprLit {
                    lit: Lit::Str(lit_str),
                    ..
                }) => lit_str.value(),
                _ => return Err(syn::Error::new_spanned(&nv.value, "expected string literal")),
            };

            match ident.as_str() {
                "path" => attrs.path = Some(value),
                "description" => attrs.description = Some(value),
                _ => {
                    return Err(syn::Error::new_spanned(
                        nv.path,
                        format!("unknown attribute: {}", ident),
                    ));
                }
            }
        }

        Ok(attrs)
    }
}

/// Declare a page module from an async render function.
///
/// The function must take a single `&RenderContext` and return
/// `Result<RenderOutput, PageError>`. A unit struct named `<FnName>Page` is
/// generated alongside it.
///
/// # Attributes
///
/// - `path` (required): logical path the page is registered under
/// - `description` (optional): free text, exposed via `description()`
#[proc_macro_attribute]
pub fn page(args: TokenStream, input: TokenStream) -> TokenStream {
    let args = parse_macro_input!(args with Punctuated::<Meta, Token![,]>::parse_terminated);
    let input_fn = parse_macro_input!(input as ItemFn);

    match generate_page(args, input_fn) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn generate_page(
    args: Punctuated<Meta, Token![,]>,
    input_fn: ItemFn,
) -> syn::Result<proc_macro2::TokenStream> {
    let attrs = PageAttrs::parse_meta_list(args)?;

    let path = attrs.path.ok_or_else(|| {
        syn::Error::new(proc_macro2::Span::call_site(), "missing required attribute: path")
    })?;
    let description = attrs.description.unwrap_or_default();

    if input_fn.sig.asyncness.is_none() {
        return Err(syn::Error::new_spanned(&input_fn.sig, "page function must be async"));
    }
    if input_fn.sig.inputs.len() != 1 {
        return Err(syn::Error::new_spanned(
            &input_fn.sig.inputs,
            "page function takes exactly one argument: &RenderContext",
        ));
    }

    let fn_name = &input_fn.sig.ident;
    let fn_vis = &input_fn.vis;
    let struct_name = format_ident!("{}Page", to_pascal_case(&fn_name.to_string()));

    Ok(quote! {
        #input_fn

        #[derive(Debug, Default, Clone, Copy)]
        #fn_vis struct #struct_name;

        impl #struct_name {
            pub const PATH: &'static str = #path;

            pub fn new() -> Self {
                Self
            }

            pub fn description() -> &'static str {
                #description
            }
        }

        #[::ssr_lambda::prelude::async_trait]
        impl ::ssr_lambda::page::PageModule for #struct_name {
            async fn render(
                &self,
                ctx: &::ssr_lambda::page::RenderContext,
            ) -> ::std::result::Result<::ssr_lambda::page::RenderOutput, ::ssr_lambda::page::PageError> {
                #fn_name(ctx).await
            }

            fn path(&self) -> &str {
                Self::PATH
            }
        }
    })
}

/// Convert a snake_case string to PascalCase.
fn to_pascal_case(s: &str) -> String {
    s.split('_')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                None => String::new(),
                Some(first) => first.to_uppercase().chain(chars).collect(),
            }
        })
        .collect()
}
