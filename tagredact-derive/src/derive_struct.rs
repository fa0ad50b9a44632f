//! Struct-specific `TagScoped` derivation.
//!
//! Only structs with named fields can be nodes: the tag field has to be
//! addressable by name, and exactly one field must carry `#[redact(tags)]`.

use proc_macro2::{Ident, Span, TokenStream};
use quote::{quote, quote_spanned};
use syn::{spanned::Spanned, DataStruct, Fields, Result};

use crate::{
    crate_path,
    strategy::{parse_field_strategy, Strategy},
    types::is_scalar_type,
};

pub(crate) struct StructDeriveOutput {
    pub(crate) node_tags_body: TokenStream,
    pub(crate) descend_body: TokenStream,
    pub(crate) tag_field_types: Vec<syn::Type>,
    pub(crate) child_field_types: Vec<syn::Type>,
}

pub(crate) fn derive_struct(name: &Ident, data: DataStruct) -> Result<StructDeriveOutput> {
    let fields = match data.fields {
        Fields::Named(fields) => fields,
        Fields::Unnamed(fields) => {
            return Err(syn::Error::new(
                fields.span(),
                "`TagScoped` requires named fields; tuple structs cannot name their tag field",
            ));
        }
        Fields::Unit => {
            return Err(syn::Error::new(
                name.span(),
                "`TagScoped` cannot be derived for unit structs: there is no tag field",
            ));
        }
    };

    let tag_source = crate_path("TagSource");
    let child_slot = crate_path("ChildSlot");

    let mut bindings = Vec::new();
    let mut transforms = Vec::new();
    let mut tag_field: Option<Ident> = None;
    let mut tag_field_types = Vec::new();
    let mut child_field_types = Vec::new();

    for field in fields.named {
        let span = field.span();
        let strategy = parse_field_strategy(&field.attrs)?;
        let ident = field
            .ident
            .ok_or_else(|| syn::Error::new(span, "named field without an identifier"))?;
        let ty = field.ty;

        match strategy {
            Strategy::PassThrough => {}
            Strategy::Tags => {
                if tag_field.is_some() {
                    return Err(syn::Error::new(
                        span,
                        "only one field may be marked #[redact(tags)]",
                    ));
                }
                tag_field = Some(ident.clone());
                tag_field_types.push(ty);
            }
            Strategy::Walk => {
                if is_scalar_type(&ty) {
                    return Err(syn::Error::new(
                        span,
                        "#[redact] marks a field holding child nodes; scalar fields pass through \
                        without an annotation",
                    ));
                }
                transforms.push(quote_spanned! { span =>
                    let #ident = #child_slot::retain_scoped(#ident, rule);
                });
                child_field_types.push(ty);
            }
        }
        bindings.push(ident);
    }

    let Some(tag_field) = tag_field else {
        return Err(syn::Error::new(
            Span::call_site(),
            format!("`{name}` has no #[redact(tags)] field; a node must carry its own tags"),
        ));
    };

    Ok(StructDeriveOutput {
        node_tags_body: quote! {
            #tag_source::tag_refs(&self.#tag_field)
        },
        descend_body: quote! {
            let _ = rule;
            let Self { #(#bindings),* } = self;
            #(#transforms)*
            Self { #(#bindings),* }
        },
        tag_field_types,
        child_field_types,
    })
}
