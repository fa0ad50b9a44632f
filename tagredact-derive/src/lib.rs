//! Derive macros for `tagredact`.
//!
//! This crate generates the traversal code behind `#[derive(TagScoped)]`. It:
//! - reads `#[redact(tags)]` and `#[redact]` field attributes
//! - emits a `TagScoped` implementation that reads the node's tags and hands
//!   child fields to `ChildSlot`
//!
//! It does **not** decide anything. Decisions come from the `RedactionRule`
//! passed in at runtime.

// <https://doc.rust-lang.org/rustc/lints/listing/allowed-by-default.html>
#![warn(
    anonymous_parameters,
    bare_trait_objects,
    elided_lifetimes_in_paths,
    missing_copy_implementations,
    rust_2018_idioms,
    trivial_casts,
    trivial_numeric_casts,
    unreachable_pub,
    unsafe_code,
    unused_extern_crates,
    unused_import_braces
)]
// <https://rust-lang.github.io/rust-clippy/stable>
#![warn(
    clippy::all,
    clippy::cargo,
    clippy::dbg_macro,
    clippy::float_cmp_const,
    clippy::get_unwrap,
    clippy::mem_forget,
    clippy::nursery,
    clippy::pedantic,
    clippy::todo,
    clippy::unwrap_used,
    clippy::uninlined_format_args
)]
// Allow some clippy lints
#![allow(
    clippy::doc_markdown,
    clippy::module_name_repetitions,
    clippy::multiple_crate_versions,
    clippy::must_use_candidate,
    clippy::needless_pass_by_value,
    clippy::cargo_common_metadata,
    clippy::missing_errors_doc,
    clippy::missing_const_for_fn,
    clippy::redundant_pub_crate,
    clippy::option_if_let_else
)]
// Allow some lints while testing
#![cfg_attr(test, allow(clippy::unwrap_used))]

#[allow(unused_extern_crates)]
extern crate proc_macro;

use proc_macro2::TokenStream;
use proc_macro_crate::{crate_name, FoundCrate};
use quote::{format_ident, quote};
use syn::{parse_macro_input, spanned::Spanned, Attribute, Data, DeriveInput, Result};

mod derive_struct;
mod generics;
mod strategy;
mod types;
use derive_struct::derive_struct;
use generics::add_field_bounds;

/// Derives `tagredact::TagScoped` for structs with named fields.
///
/// # Field Attributes
///
/// - `#[redact(tags)]`: the field holding this node's access tags. Exactly one
///   field must carry it. Its type must implement `TagSource` (`Vec<String>`,
///   `BTreeSet<String>`, `Option<Vec<String>>`, ...).
///
/// - `#[redact]`: the field holds child nodes. Each child is judged on its own
///   tags and removed when pruned, so the field type must implement
///   `ChildSlot` (`Vec<T>`, `Option<T>`, `VecDeque<T>`, maps of `T`, where `T`
///   is itself a node).
///
/// - **No annotation**: the field is copied unchanged. Scalars and external
///   types need nothing.
///
/// A child is only visited when its parent descends; a pruned parent never
/// looks at its children.
///
/// Enums and unions are rejected at compile time: a node needs exactly one
/// tag field to be judged by.
#[proc_macro_derive(TagScoped, attributes(redact))]
pub fn derive_tag_scoped(input: proc_macro::TokenStream) -> proc_macro::TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand(input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.into_compile_error().into(),
    }
}

/// Returns the token stream to reference the tagredact crate root.
///
/// Handles crate renaming (e.g., `redact = { package = "tagredact", ... }`)
/// and internal usage (when derive is used inside the tagredact crate itself).
fn crate_root() -> TokenStream {
    match crate_name("tagredact") {
        Ok(FoundCrate::Itself) => quote! { crate },
        Ok(FoundCrate::Name(name)) => {
            let ident = format_ident!("{}", name);
            quote! { ::#ident }
        }
        Err(_) => quote! { ::tagredact },
    }
}

fn crate_path(item: &str) -> TokenStream {
    let root = crate_root();
    let item_ident = format_ident!("{}", item);
    quote! { #root::#item_ident }
}

fn reject_container_attributes(attrs: &[Attribute]) -> Result<()> {
    match attrs.iter().find(|attr| attr.path().is_ident("redact")) {
        Some(attr) => Err(syn::Error::new(
            attr.span(),
            "#[redact] belongs on fields, not on the struct itself",
        )),
        None => Ok(()),
    }
}

fn expand(input: DeriveInput) -> Result<TokenStream> {
    let DeriveInput {
        ident,
        generics,
        data,
        attrs,
        ..
    } = input;

    reject_container_attributes(&attrs)?;

    let output = match data {
        Data::Struct(data) => derive_struct(&ident, data)?,
        Data::Enum(data) => {
            return Err(syn::Error::new(
                data.enum_token.span(),
                "`TagScoped` cannot be derived for enums; derive it on the struct each variant wraps",
            ));
        }
        Data::Union(data) => {
            return Err(syn::Error::new(
                data.union_token.span(),
                "`TagScoped` cannot be derived for unions",
            ));
        }
    };

    let crate_root = crate_root();
    let tag_source = crate_path("TagSource");
    let child_slot = crate_path("ChildSlot");

    let bounded = add_field_bounds(generics, &output.tag_field_types, &tag_source);
    let bounded = add_field_bounds(bounded, &output.child_field_types, &child_slot);
    let (impl_generics, ty_generics, where_clause) = bounded.split_for_impl();

    let node_tags_body = &output.node_tags_body;
    let descend_body = &output.descend_body;

    Ok(quote! {
        #[automatically_derived]
        impl #impl_generics #crate_root::TagScoped for #ident #ty_generics #where_clause {
            fn node_tags(&self) -> ::std::vec::Vec<&str> {
                #node_tags_body
            }

            fn descend_with<R: #crate_root::RedactionRule + ?Sized>(self, rule: &R) -> Self {
                #descend_body
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use quote::quote;

    use super::expand;

    fn expand_err(tokens: proc_macro2::TokenStream) -> String {
        let input = syn::parse2(tokens).expect("should parse as DeriveInput");
        expand(input).unwrap_err().to_string()
    }

    #[test]
    fn expands_named_struct() {
        let input = syn::parse2(quote! {
            struct Person {
                name: String,
                #[redact(tags)]
                tags: Vec<String>,
                #[redact]
                contacts: Vec<Contact>,
            }
        })
        .unwrap();
        let tokens = expand(input).unwrap().to_string();
        assert!(tokens.contains("TagScoped for Person"));
        assert!(tokens.contains("retain_scoped"));
        assert!(tokens.contains("tag_refs"));
    }

    #[test]
    fn generic_child_fields_get_bounds() {
        let input = syn::parse2(quote! {
            struct Folder<T> {
                #[redact(tags)]
                tags: Vec<String>,
                #[redact]
                items: Vec<T>,
            }
        })
        .unwrap();
        let tokens = expand(input).unwrap().to_string();
        assert!(tokens.contains("where"));
        assert!(tokens.contains("ChildSlot"));
    }

    #[test]
    fn missing_tag_field_is_rejected() {
        let err = expand_err(quote! {
            struct Untagged { name: String }
        });
        assert!(err.contains("has no #[redact(tags)] field"));
    }

    #[test]
    fn duplicate_tag_fields_are_rejected() {
        let err = expand_err(quote! {
            struct Twice {
                #[redact(tags)]
                a: Vec<String>,
                #[redact(tags)]
                b: Vec<String>,
            }
        });
        assert!(err.contains("only one field"));
    }

    #[test]
    fn scalar_children_are_rejected() {
        let err = expand_err(quote! {
            struct Bad {
                #[redact(tags)]
                tags: Vec<String>,
                #[redact]
                count: u32,
            }
        });
        assert!(err.contains("scalar fields pass through"));
    }

    #[test]
    fn enums_unions_and_tuples_are_rejected() {
        assert!(expand_err(quote! { enum E { A } }).contains("enums"));
        assert!(expand_err(quote! { union U { a: u32 } }).contains("unions"));
        assert!(expand_err(quote! { struct T(Vec<String>); }).contains("named fields"));
        assert!(expand_err(quote! { struct Unit; }).contains("unit structs"));
    }

    #[test]
    fn container_level_attribute_is_rejected() {
        let err = expand_err(quote! {
            #[redact]
            struct Person {
                #[redact(tags)]
                tags: Vec<String>,
            }
        });
        assert!(err.contains("belongs on fields"));
    }
}
