//! Code generation: turns the IR into a `Reflect` impl.

use proc_macro2::TokenStream;
use quote::quote;
use syn::{parse_quote, GenericParam};

use crate::ir::{DeriveInputIr, Field, TypeFlag};

fn member(field: &Field) -> TokenStream {
    let ident = &field.ident;
    let ty = &field.ty;
    let name = field.display_name();
    let rules = &field.attrs.rules;

    quote! {
        .with_member(
            ::graphcheck::reflect::field::<Self, #ty>(#name, |owner| &owner.#ident)
                #( .with_attribute(#rules) )*
        )
    }
}

pub fn expand(ir: &DeriveInputIr) -> TokenStream {
    let ident = &ir.ident;

    // Every type parameter must itself be reflectable.
    let mut generics = ir.generics.clone();
    for param in generics.params.iter_mut() {
        if let GenericParam::Type(ty) = param {
            ty.bounds.push(parse_quote!(::graphcheck::reflect::Reflect));
        }
    }
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    let type_rules = &ir.attrs.rules;
    let members = ir.fields.iter().filter(|f| !f.is_skipped()).map(member);

    let origin = ir.attrs.has(TypeFlag::External).then(|| {
        quote! {
            fn origin() -> ::graphcheck::reflect::Origin {
                ::graphcheck::reflect::Origin::External
            }
        }
    });

    let capabilities = {
        let validatable = ir
            .attrs
            .has(TypeFlag::Validatable)
            .then(|| quote!(.with_validatable::<Self>()));
        let error_info = ir
            .attrs
            .has(TypeFlag::ErrorInfo)
            .then(|| quote!(.with_error_info::<Self>()));

        (validatable.is_some() || error_info.is_some()).then(|| {
            quote! {
                fn capabilities() -> ::graphcheck::capability::Capabilities {
                    ::graphcheck::capability::Capabilities::none() #validatable #error_info
                }
            }
        })
    };

    quote! {
        #[automatically_derived]
        impl #impl_generics ::graphcheck::reflect::Reflect for #ident #ty_generics #where_clause {
            fn describe() -> ::graphcheck::reflect::TypeDescriptor {
                ::graphcheck::reflect::TypeDescriptor::new()
                    #( .with_attribute(#type_rules) )*
                    #( #members )*
            }

            #origin
            #capabilities
        }
    }
}
