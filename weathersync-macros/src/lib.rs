//! Procedural macros for weathersync

use std::collections::BTreeMap;

use darling::{FromDeriveInput, FromVariant};
use proc_macro::TokenStream;
use quote::{format_ident, quote};
use syn::{parse_macro_input, DeriveInput};

/// Container-level attributes for `#[derive(Action)]`
#[derive(Debug, FromDeriveInput)]
#[darling(attributes(action), supports(enum_any))]
struct ActionOpts {
    ident: syn::Ident,
    data: darling::ast::Data<ActionVariant, ()>,

    /// Derive categories from variant name prefixes
    #[darling(default)]
    infer_categories: bool,
}

/// Variant-level attributes
#[derive(Debug, FromVariant)]
#[darling(attributes(action))]
struct ActionVariant {
    ident: syn::Ident,

    /// Explicit category override
    #[darling(default)]
    category: Option<String>,

    /// Leave this variant uncategorized
    #[darling(default)]
    skip_category: bool,
}

/// Split a PascalCase identifier into its words
fn split_pascal_case(s: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();

    for ch in s.chars() {
        if ch.is_uppercase() && !current.is_empty() {
            parts.push(std::mem::take(&mut current));
        }
        current.push(ch);
    }
    if !current.is_empty() {
        parts.push(current);
    }
    parts
}

/// Infer a category from a variant name.
///
/// The category is everything before a `Did` marker (`ConnectionDidOpen` ->
/// `connection`), or the first word when there is no marker (`MapClick` ->
/// `map`). Single-word variants and bare `Did*` results stay uncategorized.
fn infer_category(name: &str) -> Option<String> {
    let parts = split_pascal_case(name);
    if parts.len() < 2 {
        return None;
    }

    let end = parts.iter().position(|p| p == "Did").unwrap_or(1);
    if end == 0 {
        return None;
    }

    Some(
        parts[..end]
            .iter()
            .map(|p| p.to_lowercase())
            .collect::<Vec<_>>()
            .join("_"),
    )
}

/// Derive macro for the `weathersync::Action` trait
///
/// Generates `name()` returning the variant name.
///
/// With `#[action(infer_categories)]`, also generates:
/// - an `ActionCategory` impl (`category() -> Option<&'static str>`)
/// - an `is_{category}()` predicate per discovered category
/// - a `CATEGORIES` constant listing them in sorted order
///
/// # Example
/// ```ignore
/// #[derive(Action, Clone, Debug)]
/// #[action(infer_categories)]
/// enum SyncAction {
///     ConnectionOpen,
///     ConnectionDidOpen(Session),
///     MapClick(MapPoint),
///     Shutdown, // uncategorized
/// }
///
/// assert_eq!(SyncAction::ConnectionOpen.name(), "ConnectionOpen");
/// assert_eq!(SyncAction::ConnectionOpen.category(), Some("connection"));
/// assert!(SyncAction::ConnectionOpen.is_connection());
/// ```
#[proc_macro_derive(Action, attributes(action))]
pub fn derive_action(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    let opts = match ActionOpts::from_derive_input(&input) {
        Ok(opts) => opts,
        Err(e) => return e.write_errors().into(),
    };

    let name = &opts.ident;
    let variants = match &opts.data {
        darling::ast::Data::Enum(variants) => variants,
        darling::ast::Data::Struct(_) => {
            return syn::Error::new_spanned(&input, "Action can only be derived for enums")
                .to_compile_error()
                .into();
        }
    };

    let name_arms = variants.iter().map(|v| {
        let variant = &v.ident;
        let variant_str = variant.to_string();
        quote! { #name::#variant { .. } => #variant_str }
    });

    let mut expanded = quote! {
        impl ::weathersync::Action for #name {
            fn name(&self) -> &'static str {
                match self {
                    #(#name_arms),*
                }
            }
        }
    };

    if opts.infer_categories {
        let assigned: Vec<_> = variants
            .iter()
            .map(|v| {
                let category = if v.skip_category {
                    None
                } else {
                    v.category
                        .clone()
                        .or_else(|| infer_category(&v.ident.to_string()))
                };
                (&v.ident, category)
            })
            .collect();

        let mut by_category: BTreeMap<String, Vec<&syn::Ident>> = BTreeMap::new();
        for (variant, category) in &assigned {
            if let Some(category) = category {
                by_category.entry(category.clone()).or_default().push(variant);
            }
        }

        let category_arms = assigned.iter().map(|(variant, category)| {
            let value = match category {
                Some(c) => quote! { ::core::option::Option::Some(#c) },
                None => quote! { ::core::option::Option::None },
            };
            quote! { #name::#variant { .. } => #value }
        });

        let predicates = by_category.iter().map(|(category, members)| {
            let predicate = format_ident!("is_{}", category);
            let doc = format!("Returns true if this action belongs to the `{category}` category.");
            let patterns = members.iter().map(|v| quote! { #name::#v { .. } });
            quote! {
                #[doc = #doc]
                pub fn #predicate(&self) -> bool {
                    matches!(self, #(#patterns)|*)
                }
            }
        });

        let names: Vec<&String> = by_category.keys().collect();

        expanded.extend(quote! {
            impl ::weathersync::ActionCategory for #name {
                fn category(&self) -> ::core::option::Option<&'static str> {
                    match self {
                        #(#category_arms),*
                    }
                }
            }

            impl #name {
                /// Every category inferred or declared on this action type, sorted.
                pub const CATEGORIES: &'static [&'static str] = &[#(#names),*];

                #(#predicates)*
            }
        });
    }

    expanded.into()
}
