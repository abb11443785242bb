//! Parsing routines converting `syn::DeriveInput` into the derive IR.
//!
//! Only syntax is handled here. Conflicting or duplicated options are left
//! for the `validate` module.

use syn::punctuated::Punctuated;
use syn::spanned::Spanned;
use syn::{Attribute, Expr, Lit, Meta, Token};

use crate::ir::{DeriveInputIr, Field, FieldAttrs, TypeAttrs, TypeFlag};

pub fn derive_input_to_ir(input: &syn::DeriveInput) -> syn::Result<DeriveInputIr> {
    let attrs = parse_type_attrs(&input.attrs)?;

    let fields = match &input.data {
        syn::Data::Struct(data) => match &data.fields {
            syn::Fields::Named(named) => named
                .named
                .iter()
                .map(parse_field)
                .collect::<syn::Result<Vec<_>>>()?,
            syn::Fields::Unit => Vec::new(),
            syn::Fields::Unnamed(unnamed) => {
                return Err(syn::Error::new(
                    unnamed.span(),
                    "Reflect only supports structs with named fields or unit structs",
                ));
            }
        },
        syn::Data::Enum(data) => {
            return Err(syn::Error::new(
                data.enum_token.span(),
                "Reflect can only be derived for structs",
            ));
        }
        syn::Data::Union(data) => {
            return Err(syn::Error::new(
                data.union_token.span(),
                "Reflect can only be derived for structs",
            ));
        }
    };

    Ok(DeriveInputIr {
        ident: input.ident.clone(),
        generics: input.generics.clone(),
        attrs,
        fields,
    })
}

fn parse_rules(attr: &Attribute, into: &mut Vec<Expr>) -> syn::Result<()> {
    let rules = attr.parse_args_with(Punctuated::<Expr, Token![,]>::parse_terminated)?;
    if rules.is_empty() {
        return Err(syn::Error::new(attr.span(), "#[rule(..)] expects at least one rule expression"));
    }
    into.extend(rules);
    Ok(())
}

fn reflect_args(attr: &Attribute) -> syn::Result<Punctuated<Meta, Token![,]>> {
    attr.parse_args_with(Punctuated::<Meta, Token![,]>::parse_terminated)
}

fn parse_type_attrs(attrs: &[Attribute]) -> syn::Result<TypeAttrs> {
    let mut out = TypeAttrs::default();

    for attr in attrs {
        if attr.path().is_ident("rule") {
            parse_rules(attr, &mut out.rules)?;
        } else if attr.path().is_ident("reflect") {
            for meta in reflect_args(attr)? {
                let Meta::Path(path) = &meta else {
                    return Err(syn::Error::new(
                        meta.span(),
                        "expected one of `validatable`, `error_info`, `external`",
                    ));
                };
                let flag = if path.is_ident("validatable") {
                    TypeFlag::Validatable
                } else if path.is_ident("error_info") {
                    TypeFlag::ErrorInfo
                } else if path.is_ident("external") {
                    TypeFlag::External
                } else {
                    return Err(syn::Error::new(
                        path.span(),
                        "unknown flag inside #[reflect(...)]; expected `validatable`, `error_info` or `external`",
                    ));
                };
                out.flags.push((flag, path.span()));
            }
        }
    }

    Ok(out)
}

fn parse_field(field: &syn::Field) -> syn::Result<Field> {
    let ident = field
        .ident
        .clone()
        .ok_or_else(|| syn::Error::new(field.span(), "expected a named field"))?;
    let mut attrs = FieldAttrs::default();

    for attr in &field.attrs {
        if attr.path().is_ident("rule") {
            parse_rules(attr, &mut attrs.rules)?;
        } else if attr.path().is_ident("reflect") {
            for meta in reflect_args(attr)? {
                match meta {
                    Meta::Path(path) if path.is_ident("skip") => attrs.skip.push(path.span()),
                    Meta::NameValue(nv) if nv.path.is_ident("rename") => match &nv.value {
                        Expr::Lit(expr) => match &expr.lit {
                            Lit::Str(lit) => attrs.rename.push(lit.clone()),
                            other => {
                                return Err(syn::Error::new(
                                    other.span(),
                                    "`rename` expects a string literal",
                                ));
                            }
                        },
                        other => {
                            return Err(syn::Error::new(other.span(), "`rename` expects a string literal"));
                        }
                    },
                    other => {
                        return Err(syn::Error::new(
                            other.span(),
                            "unknown option inside #[reflect(...)]; expected `skip` or `rename = \"..\"`",
                        ));
                    }
                }
            }
        }
    }

    Ok(Field {
        ident,
        ty: field.ty.clone(),
        attrs,
        span: field.span(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(src: &str) -> syn::Result<DeriveInputIr> {
        let input: syn::DeriveInput = syn::parse_str(src).expect("valid Rust");
        derive_input_to_ir(&input)
    }

    #[test]
    fn parses_rules_and_flags() {
        let ir = parse(
            r#"
            #[rule(Positive, NotEmpty::new())]
            #[reflect(validatable, external)]
            struct Order {
                #[rule(Range::new(0, 10))]
                #[reflect(rename = "Quantity")]
                quantity: u32,
                #[reflect(skip)]
                cache: Vec<u8>,
                note: Option<String>,
            }
            "#,
        )
        .unwrap();

        assert_eq!(ir.attrs.rules.len(), 2);
        assert!(ir.attrs.has(TypeFlag::Validatable));
        assert!(ir.attrs.has(TypeFlag::External));
        assert!(!ir.attrs.has(TypeFlag::ErrorInfo));
        assert_eq!(ir.fields.len(), 3);
        assert_eq!(ir.fields[0].display_name(), "Quantity");
        assert_eq!(ir.fields[0].attrs.rules.len(), 1);
        assert!(ir.fields[1].is_skipped());
        assert_eq!(ir.fields[2].display_name(), "note");
    }

    #[test]
    fn raw_identifiers_lose_their_prefix() {
        let ir = parse("struct S { r#type: u8 }").unwrap();
        assert_eq!(ir.fields[0].display_name(), "type");
    }

    #[test]
    fn unit_structs_have_no_fields() {
        let ir = parse("#[rule(Always)] struct Marker;").unwrap();
        assert!(ir.fields.is_empty());
        assert_eq!(ir.attrs.rules.len(), 1);
    }

    #[test]
    fn rejects_tuple_structs_and_enums() {
        assert!(parse("struct T(u8);").is_err());
        assert!(parse("enum E { A }").is_err());
    }

    #[test]
    fn rejects_unknown_options() {
        assert!(parse("#[reflect(frozen)] struct S;").is_err());
        assert!(parse("struct S { #[reflect(hidden)] a: u8 }").is_err());
        assert!(parse("struct S { #[reflect(rename = 3)] a: u8 }").is_err());
        assert!(parse("struct S { #[rule()] a: u8 }").is_err());
    }
}
