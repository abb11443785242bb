//! `#[derive(Reflect)]` for graphcheck.
//!
//! Generates the `Reflect` metadata the validation compiler reads: type-level
//! rules and capabilities, plus one member descriptor per field.
//!
//! ```ignore
//! #[derive(Reflect)]
//! #[reflect(validatable)]
//! struct Order {
//!     #[rule(range(1, 100))]
//!     #[reflect(rename = "Quantity")]
//!     quantity: u32,
//!     lines: Vec<Line>,
//!     #[reflect(skip)]
//!     cache: Cache,
//! }
//! ```
//!
//! Struct attributes:
//! * `#[rule(expr, ..)]` attaches rules to the type itself.
//! * `#[reflect(validatable)]` / `#[reflect(error_info)]` declare that the type
//!   implements `ValidatableObject` / `DataErrorInfo`.
//! * `#[reflect(external)]` marks the type as externally defined.
//!
//! Field attributes:
//! * `#[rule(expr, ..)]` attaches rules to the member.
//! * `#[reflect(rename = "Name")]` sets the name used in access paths.
//! * `#[reflect(skip)]` leaves the field out of the shape.

use proc_macro::TokenStream;
use syn::{parse_macro_input, DeriveInput};

mod codegen;
mod ir;
mod parse;
mod validate;

#[proc_macro_derive(Reflect, attributes(rule, reflect))]
pub fn derive_reflect(item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as DeriveInput);

    let ir = match parse::derive_input_to_ir(&input) {
        Ok(ir) => ir,
        Err(e) => return e.to_compile_error().into(),
    };

    if let Err(e) = validate::check(&ir) {
        return e.to_compile_error().into();
    }

    codegen::expand(&ir).into()
}
