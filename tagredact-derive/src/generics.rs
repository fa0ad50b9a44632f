//! Where-clause management for generic structs.
//!
//! Bounds are added per field type, and only for fields whose type mentions a
//! type parameter: `children: Vec<T>` yields `Vec<T>: ChildSlot`, which
//! holds exactly when `T` is a node. Pass-through fields never add bounds.
//!
//! ## PhantomData Handling
//!
//! `PhantomData<T>` is skipped when looking for type parameters, so
//! `Vec<PhantomData<T>>`-style markers do not force bounds on `T`.

use syn::{parse_quote, Ident};

pub(crate) fn collect_generics_from_type(
    ty: &syn::Type,
    generics: &syn::Generics,
    result: &mut Vec<Ident>,
) {
    match ty {
        syn::Type::Path(path) => {
            if let Some(qself) = &path.qself {
                collect_generics_from_type(&qself.ty, generics, result);
            }
            for segment in &path.path.segments {
                if segment.ident == "PhantomData" {
                    return;
                }

                if let syn::PathArguments::AngleBracketed(args) = &segment.arguments {
                    for arg in &args.args {
                        if let syn::GenericArgument::Type(inner_ty) = arg {
                            collect_generics_from_type(inner_ty, generics, result);
                        }
                    }
                }

                for param in generics.type_params() {
                    if segment.ident == param.ident && !result.iter().any(|g| g == &param.ident) {
                        result.push(param.ident.clone());
                    }
                }
            }
        }
        syn::Type::Reference(reference) => {
            collect_generics_from_type(&reference.elem, generics, result);
        }
        syn::Type::Array(array) => collect_generics_from_type(&array.elem, generics, result),
        syn::Type::Slice(slice) => collect_generics_from_type(&slice.elem, generics, result),
        syn::Type::Tuple(tuple) => {
            for elem in &tuple.elems {
                collect_generics_from_type(elem, generics, result);
            }
        }
        syn::Type::Paren(paren) => collect_generics_from_type(&paren.elem, generics, result),
        syn::Type::Group(group) => collect_generics_from_type(&group.elem, generics, result),
        _ => {}
    }
}

/// Returns `true` when `ty` mentions any of the struct's type parameters.
pub(crate) fn mentions_generics(ty: &syn::Type, generics: &syn::Generics) -> bool {
    let mut found = Vec::new();
    collect_generics_from_type(ty, generics, &mut found);
    !found.is_empty()
}

/// Adds `#ty: #bound` to the where clause for every generic field type.
pub(crate) fn add_field_bounds(
    mut generics: syn::Generics,
    field_types: &[syn::Type],
    bound: &proc_macro2::TokenStream,
) -> syn::Generics {
    let mentioned: Vec<&syn::Type> = field_types
        .iter()
        .filter(|ty| mentions_generics(ty, &generics))
        .collect();
    if mentioned.is_empty() {
        return generics;
    }
    let predicates: Vec<syn::WherePredicate> = mentioned
        .into_iter()
        .map(|ty| parse_quote!(#ty: #bound))
        .collect();
    generics.make_where_clause().predicates.extend(predicates);
    generics
}
