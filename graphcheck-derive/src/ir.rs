//! Intermediate representation for the `Reflect` derive.
//!
//! Parsing fills these plain structures; semantic checks and code generation
//! only ever look at the IR, never at raw `syn` attributes.

use proc_macro2::Span;
use syn::{Expr, Ident, LitStr, Type};

/// Struct-level `#[reflect(..)]` flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeFlag {
    /// The type implements `ValidatableObject`.
    Validatable,
    /// The type implements `DataErrorInfo`.
    ErrorInfo,
    /// Treat the type as externally defined (origin `External`).
    External,
}

impl TypeFlag {
    pub fn keyword(self) -> &'static str {
        match self {
            TypeFlag::Validatable => "validatable",
            TypeFlag::ErrorInfo => "error_info",
            TypeFlag::External => "external",
        }
    }
}

/// Everything attached to the struct itself.
#[derive(Debug, Clone, Default)]
pub struct TypeAttrs {
    /// `#[rule(..)]` expressions, in declaration order.
    pub rules: Vec<Expr>,
    pub flags: Vec<(TypeFlag, Span)>,
}

impl TypeAttrs {
    pub fn has(&self, flag: TypeFlag) -> bool {
        self.flags.iter().any(|(f, _)| *f == flag)
    }
}

/// Everything attached to one field.
#[derive(Debug, Clone, Default)]
pub struct FieldAttrs {
    pub rules: Vec<Expr>,
    /// One span per `skip` occurrence.
    pub skip: Vec<Span>,
    pub rename: Vec<LitStr>,
}

#[derive(Debug, Clone)]
pub struct Field {
    pub ident: Ident,
    pub ty: Type,
    pub attrs: FieldAttrs,
    pub span: Span,
}

impl Field {
    /// Name used in access paths.
    pub fn display_name(&self) -> String {
        match self.attrs.rename.first() {
            Some(rename) => rename.value(),
            None => {
                let name = self.ident.to_string();
                name.strip_prefix("r#").map(str::to_owned).unwrap_or(name)
            }
        }
    }

    pub fn is_skipped(&self) -> bool {
        !self.attrs.skip.is_empty()
    }
}

/// Parsed description of the whole derive input.
#[derive(Debug, Clone)]
pub struct DeriveInputIr {
    pub ident: Ident,
    pub generics: syn::Generics,
    pub attrs: TypeAttrs,
    /// Empty for unit structs.
    pub fields: Vec<Field>,
}
