//! Parsing of `#[redact(...)]` field attributes.
//!
//! This module maps attribute syntax to traversal decisions and produces
//! structured errors for invalid forms.

use proc_macro2::Span;
use syn::{spanned::Spanned, Attribute, Meta, Result};

/// Field handling based on `#[redact(...)]` attributes.
///
/// | Attribute | Strategy | Behavior |
/// |-----------|----------|----------|
/// | None | `PassThrough` | Field copied unchanged |
/// | `#[redact(tags)]` | `Tags` | Field holds this node's tags |
/// | `#[redact]` | `Walk` | Field holds children, each judged separately |
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Strategy {
    /// No annotation: copied as-is, whatever its type.
    PassThrough,
    /// `#[redact(tags)]`: read through `TagSource`. Exactly one per struct.
    Tags,
    /// Bare `#[redact]`: pruned through `ChildSlot`.
    Walk,
}

fn set_strategy(target: &mut Option<Strategy>, next: Strategy, span: Span) -> Result<()> {
    if target.is_some() {
        return Err(syn::Error::new(
            span,
            "multiple #[redact] attributes specified on the same field",
        ));
    }
    *target = Some(next);
    Ok(())
}

pub(crate) fn parse_field_strategy(attrs: &[Attribute]) -> Result<Strategy> {
    let mut strategy: Option<Strategy> = None;
    for attr in attrs {
        if !attr.path().is_ident("redact") {
            continue;
        }

        match &attr.meta {
            Meta::Path(_) => {
                set_strategy(&mut strategy, Strategy::Walk, attr.span())?;
            }
            Meta::List(list) => {
                let mut parsed = None;
                list.parse_nested_meta(|meta| {
                    if meta.path.is_ident("tags") {
                        parsed = Some(Strategy::Tags);
                        Ok(())
                    } else {
                        Err(meta.error(format!(
                            "unknown field option `{}`; expected `tags`",
                            meta.path
                                .get_ident()
                                .map_or_else(|| "?".to_string(), ToString::to_string)
                        )))
                    }
                })?;
                let Some(parsed) = parsed else {
                    return Err(syn::Error::new(
                        attr.span(),
                        "empty #[redact()]; use #[redact] or #[redact(tags)]",
                    ));
                };
                set_strategy(&mut strategy, parsed, attr.span())?;
            }
            Meta::NameValue(_) => {
                return Err(syn::Error::new(
                    attr.span(),
                    "name-value syntax is not supported for #[redact]",
                ));
            }
        }
    }

    Ok(strategy.unwrap_or(Strategy::PassThrough))
}
