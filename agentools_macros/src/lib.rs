//! Procedural macros for **agentools**
#![forbid(unsafe_code)]

use proc_macro::TokenStream;
use proc_macro2::{Ident, Span, TokenStream as TokenStream2};
use proc_macro_crate::{crate_name, FoundCrate};
use proc_macro_error::{abort, proc_macro_error};
use quote::{format_ident, quote};
use syn::{
    parse_macro_input, Attribute, Expr, ExprLit, FnArg, Item, ItemFn, ItemMod, Lit, LitStr, Meta,
    Pat, PatIdent, PatType, ReturnType, Signature, Type, TypePath,
};

// ============================================================================
// SHARED HELPERS
// ============================================================================

/// Path generated code uses to reach the runtime: the `agentools` facade
/// when the caller depends on it, `agentools_core` otherwise.
fn get_crate_path() -> TokenStream2 {
    let found = |name: &str| match crate_name(name) {
        // Integration tests and examples of a package are separate crates,
        // so the package is still reached by its name.
        Ok(FoundCrate::Itself) => Some(name.to_owned()),
        Ok(FoundCrate::Name(name)) => Some(name),
        Err(_) => None,
    };
    match found("agentools").or_else(|| found("agentools_core")) {
        Some(name) => {
            let ident = Ident::new(&name, Span::call_site());
            quote!(::#ident)
        }
        None => quote!(::agentools),
    }
}

/// Gather `///` doc-comments into a single string, trimming the leading space after `///`.
fn docs(attrs: &[Attribute]) -> String {
    attrs
        .iter()
        .filter_map(|a| match &a.meta {
            Meta::NameValue(nv) if a.path().is_ident("doc") => {
                if let Expr::Lit(ExprLit {
                    lit: Lit::Str(s), ..
                }) = &nv.value
                {
                    Some(s.value().trim_start().to_owned())
                } else {
                    None
                }
            }
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Renders a type the way it is written in source: `Vec < String >`
/// becomes `Vec<String>`, `HashMap < K , V >` becomes `HashMap<K, V>`.
fn type_label(ty: &Type) -> String {
    let raw = quote!(#ty).to_string();
    let chars: Vec<char> = raw.chars().collect();
    let is_word = |c: Option<char>| c.is_some_and(|c| c.is_alphanumeric() || c == '_');

    let mut out = String::with_capacity(raw.len());
    for (i, &c) in chars.iter().enumerate() {
        if c != ' ' {
            out.push(c);
            continue;
        }
        let prev = out.chars().last();
        let next = chars.get(i + 1).copied();
        if prev == Some(',') || (is_word(prev) && is_word(next)) {
            out.push(' ');
        }
    }
    out
}

fn is_result_type(ty: &Type) -> bool {
    // Any path ending in `Result` counts: `Result<T, E>`, `io::Result<T>`,
    // `anyhow::Result<T>` …
    let Type::Path(TypePath { qself: None, path }) = ty else {
        return false;
    };
    path.segments
        .last()
        .is_some_and(|last| last.ident == "Result")
}

/// Rejects parameter types that cannot be deserialised into an owned field.
fn check_owned(ty: &Type) -> syn::Result<()> {
    match ty {
        Type::Reference(_) => Err(syn::Error::new_spanned(
            ty,
            "tool arguments must be owned types, e.g. `String` instead of `&str`",
        )),
        Type::ImplTrait(_) | Type::TraitObject(_) | Type::Infer(_) => Err(
            syn::Error::new_spanned(ty, "tool arguments must be concrete types"),
        ),
        _ => Ok(()),
    }
}

/// What the generated wrapper needs to know about a tool function.
struct ToolSignature {
    ident: Ident,
    params: Vec<Ident>,
    types: Vec<Type>,
    is_async: bool,
    returns: Option<Type>,
}

impl ToolSignature {
    fn parse(sig: &Signature) -> syn::Result<Self> {
        if !sig.generics.params.is_empty() {
            return Err(syn::Error::new_spanned(
                &sig.generics,
                "tools cannot be generic",
            ));
        }

        let mut params = Vec::new();
        let mut types = Vec::new();
        for arg in &sig.inputs {
            match arg {
                FnArg::Typed(PatType { pat, ty, .. }) => {
                    let Pat::Ident(PatIdent { ident, .. }) = &**pat else {
                        return Err(syn::Error::new_spanned(
                            pat,
                            "tools support only identifier patterns",
                        ));
                    };
                    check_owned(ty)?;
                    params.push(ident.clone());
                    types.push((**ty).clone());
                }
                FnArg::Receiver(_) => {
                    return Err(syn::Error::new_spanned(
                        arg,
                        "tools may not be `self` methods",
                    ))
                }
            }
        }

        let returns = match &sig.output {
            ReturnType::Default => None,
            ReturnType::Type(_, ty) => Some((**ty).clone()),
        };

        Ok(Self {
            ident: sig.ident.clone(),
            params,
            types,
            is_async: sig.asyncness.is_some(),
            returns,
        })
    }

    fn name(&self) -> String {
        self.ident.to_string()
    }

    fn args_ident(&self) -> Ident {
        format_ident!("__TOOL_INPUT_{}", self.ident)
    }

    fn return_label(&self) -> String {
        self.returns
            .as_ref()
            .map_or_else(|| "Any".to_owned(), type_label)
    }

    /// Keyword-argument struct the JSON arguments are decoded into.
    fn args_struct(&self, crate_path: &TokenStream2) -> TokenStream2 {
        let args_ident = self.args_ident();
        let params = &self.params;
        let types = &self.types;
        let serde_path = LitStr::new(
            &format!("{crate_path}::serde").replace(' ', ""),
            Span::call_site(),
        );
        quote! {
            #[allow(non_camel_case_types)]
            #[derive(#crate_path::serde::Deserialize)]
            #[serde(crate = #serde_path)]
            struct #args_ident { #( #params : #types ),* }
        }
    }

    /// Non-capturing closure `Value -> BoxFuture<Result<Value, ToolError>>`.
    fn wrapper(&self, crate_path: &TokenStream2) -> TokenStream2 {
        let fn_ident = &self.ident;
        let fn_name = self.name();
        let args_ident = self.args_ident();
        let params = &self.params;

        let call = if self.is_async {
            quote!(#fn_ident( #( __args.#params ),* ).await)
        } else {
            quote!(#fn_ident( #( __args.#params ),* ))
        };

        let unwrap_result = match &self.returns {
            Some(ty) if is_result_type(ty) => quote! {
                let out = out.map_err(|e| #crate_path::ToolError::Failed {
                    name: ::std::borrow::Cow::Borrowed(#fn_name),
                    message: e.to_string(),
                })?;
            },
            _ => quote!(),
        };

        quote! {
            |v| ::std::boxed::Box::pin(async move {
                let __args: #args_ident =
                    #crate_path::serde_json::from_value(v)
                        .map_err(#crate_path::DeserializationError::from)?;
                let out = #call;
                #unwrap_result
                #crate_path::serde_json::to_value(out)
                    .map_err(|e| #crate_path::ToolError::Runtime(e.to_string()))
            })
        }
    }
}

// ============================================================================
// TOOL ATTRIBUTE MACRO
// ============================================================================

/// Registers a free function as a runtime tool.
///
/// The function itself is emitted unchanged. Next to it the macro submits a
/// `ToolRegistration` carrying the name, doc comment, parameter names with
/// their types, and a wrapper that takes keyword arguments as a JSON object.
#[proc_macro_error]
#[proc_macro_attribute]
pub fn tool(_attr: TokenStream, item: TokenStream) -> TokenStream {
    // ───────── Parse the user function ─────────
    let func: ItemFn = parse_macro_input!(item);
    let sig = match ToolSignature::parse(&func.sig) {
        Ok(sig) => sig,
        Err(err) => abort!(err.span(), "`#[tool]`: {}", err),
    };
    let crate_path = get_crate_path();

    let fn_name = sig.name();
    let doc_lit = LitStr::new(&docs(&func.attrs), Span::call_site());
    let arg_names = sig.params.iter().map(|p| p.to_string());
    let arg_types = sig.types.iter().map(type_label);
    let returns = sig.return_label();

    let args_struct = sig.args_struct(&crate_path);
    let wrapper = sig.wrapper(&crate_path);

    // ───────── Macro expansion ─────────
    TokenStream::from(quote! {
        #func

        #args_struct

        #crate_path::inventory::submit! {
            #crate_path::ToolRegistration::new(
                #fn_name,
                #doc_lit,
                &[ #( (#arg_names, #arg_types) ),* ],
                #returns,
                #wrapper,
            )
        }
    })
}

// ============================================================================
// TOOL MODULE ATTRIBUTE MACRO
// ============================================================================

/// Source text of the module as written, falling back to its tokens.
fn module_source(module: &ItemMod) -> String {
    let ident = &module.ident;
    let body = module
        .content
        .as_ref()
        .and_then(|(brace, _)| brace.span.join().source_text());
    match body {
        Some(body) => format!("mod {ident} {body}"),
        None => quote!(#module).to_string(),
    }
}

/// Makes an inline module importable by path.
///
/// Every free function in the module that fits the tool shape (identifier
/// parameters of owned types, no generics) becomes an attribute of the
/// module; the module's source text is kept for the model to read.
#[proc_macro_error]
#[proc_macro_attribute]
pub fn tool_module(_attr: TokenStream, item: TokenStream) -> TokenStream {
    let mut module: ItemMod = parse_macro_input!(item);
    let source = LitStr::new(&module_source(&module), Span::call_site());
    let crate_path = get_crate_path();

    let Some((_, items)) = module.content.as_mut() else {
        abort!(
            module.ident,
            "`#[tool_module]` needs an inline module body: `mod {} {{ … }}`",
            module.ident
        );
    };

    let exports: Vec<ToolSignature> = items
        .iter()
        .filter_map(|item| match item {
            Item::Fn(func) => ToolSignature::parse(&func.sig).ok(),
            _ => None,
        })
        .collect();

    let args_structs = exports.iter().map(|sig| sig.args_struct(&crate_path));
    let entries = exports.iter().map(|sig| {
        let name = sig.name();
        let wrapper = sig.wrapper(&crate_path);
        quote!(#crate_path::ModuleExport::new(#name, #wrapper))
    });

    items.push(Item::Verbatim(quote! {
        #(#args_structs)*

        #[doc(hidden)]
        static __AGENTOOLS_EXPORTS: &[#crate_path::ModuleExport] = &[ #(#entries),* ];

        #crate_path::inventory::submit! {
            #crate_path::ModuleRegistration::new(
                ::std::module_path!(),
                #source,
                __AGENTOOLS_EXPORTS,
            )
        }
    }));

    TokenStream::from(quote!(#module))
}
