//! Data annotations for graphcheck.
//!
//! Annotate members with [`Annotation`] rules and implement
//! [`ValidatableObject`](graphcheck::ValidatableObject) for whole-object
//! checks; [`annotations_validator`] wires up the matching provider and
//! checkers.
//!
//! ```ignore
//! use graphcheck::Reflect;
//! use graphcheck_annotations::{annotations_validator, range, required};
//!
//! #[derive(Reflect)]
//! struct Person {
//!     #[rule(range(0, 120))]
//!     #[reflect(rename = "Age")]
//!     age: i32,
//!     #[rule(required())]
//!     name: Option<String>,
//! }
//!
//! let validator = annotations_validator().build();
//! let errors = validator.validate(&person, false)?;
//! ```

pub mod attribute;
pub mod checkers;
pub mod provider;

pub use attribute::{
    range, required, string_length, Annotation, Range, RangeOperand, Required, StringLength, TypedRange,
    ValidationAttribute,
};
pub use checkers::{AnnotationChecker, RangeChecker, ValidatableObjectChecker};
pub use provider::AnnotationsRuleProvider;

use graphcheck::{Validator, ValidatorBuilder};

/// A builder preconfigured with [`AnnotationsRuleProvider`] and the
/// annotation checkers, most specific first.
pub fn annotations_validator() -> ValidatorBuilder {
    Validator::builder()
        .provider(AnnotationsRuleProvider)
        .checker(ValidatableObjectChecker)
        .checker(RangeChecker)
        .checker(AnnotationChecker)
}
