//! Semantic checks on the derive IR.

use proc_macro2::Span;
use syn::{Error, GenericParam};

use crate::ir::{DeriveInputIr, TypeFlag};

/// Returns the first semantic problem found, spanned at the offending token.
pub fn check(ir: &DeriveInputIr) -> syn::Result<()> {
    for param in &ir.generics.params {
        if let GenericParam::Lifetime(lifetime) = param {
            return Err(Error::new(
                lifetime.lifetime.span(),
                "Reflect requires 'static types; lifetime parameters are not supported",
            ));
        }
    }

    let mut seen: Vec<(TypeFlag, Span)> = Vec::new();
    for (flag, span) in &ir.attrs.flags {
        if seen.iter().any(|(f, _)| f == flag) {
            return Err(Error::new(
                *span,
                format!("duplicate `{}` flag in #[reflect(...)]", flag.keyword()),
            ));
        }
        seen.push((*flag, *span));
    }

    for field in &ir.fields {
        let attrs = &field.attrs;

        if let Some(span) = attrs.skip.get(1) {
            return Err(Error::new(*span, "duplicate `skip` in #[reflect(...)]"));
        }
        if let Some(rename) = attrs.rename.get(1) {
            return Err(Error::new(rename.span(), "duplicate `rename` in #[reflect(...)]"));
        }
        if let Some(rename) = attrs.rename.first() {
            if rename.value().trim().is_empty() {
                return Err(Error::new(rename.span(), "`rename` must not be empty"));
            }
        }

        if field.is_skipped() {
            if let Some(rule) = attrs.rules.first() {
                return Err(Error::new(
                    syn::spanned::Spanned::span(rule),
                    "a skipped field cannot carry #[rule(..)] attributes",
                ));
            }
            if let Some(rename) = attrs.rename.first() {
                return Err(Error::new(rename.span(), "a skipped field cannot be renamed"));
            }
        }
    }

    let mut names: Vec<String> = Vec::new();
    for field in ir.fields.iter().filter(|f| !f.is_skipped()) {
        let name = field.display_name();
        if names.contains(&name) {
            return Err(Error::new(field.span, format!("duplicate member name `{name}`")));
        }
        names.push(name);
    }

    Ok(())
}
