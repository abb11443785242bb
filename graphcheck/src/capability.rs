//! Object capabilities: self-validation and the legacy error string.
//!
//! Both are surfaced to the compiler as capability markers
//! ([`crate::RuleInfo::capability`]) that dedicated checkers recognise.

use std::any::Any;
use std::fmt;

/// One result reported by a self-validating object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationResult {
    pub message: String,
    /// Members the message is about. Empty means the object itself.
    pub member_names: Vec<String>,
}

impl ValidationResult {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            member_names: Vec::new(),
        }
    }

    pub fn for_member(message: impl Into<String>, member: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            member_names: vec![member.into()],
        }
    }
}

/// An object that can validate itself.
pub trait ValidatableObject {
    fn validate(&self) -> Vec<ValidationResult>;
}

/// An object exposing its current error, if any.
pub trait DataErrorInfo {
    fn error(&self) -> Option<String>;
}

type ValidateFn = fn(&dyn Any) -> Vec<ValidationResult>;
type ErrorFn = fn(&dyn Any) -> Option<String>;

/// Type-erased capability table carried by [`crate::TypeRef`].
#[derive(Clone, Copy, Default)]
pub struct Capabilities {
    validate: Option<ValidateFn>,
    error: Option<ErrorFn>,
}

impl Capabilities {
    pub const fn none() -> Self {
        Self {
            validate: None,
            error: None,
        }
    }

    pub fn with_validatable<T: ValidatableObject + Any>(mut self) -> Self {
        fn call<T: ValidatableObject + Any>(value: &dyn Any) -> Vec<ValidationResult> {
            value
                .downcast_ref::<T>()
                .map(ValidatableObject::validate)
                .unwrap_or_default()
        }
        self.validate = Some(call::<T>);
        self
    }

    pub fn with_error_info<T: DataErrorInfo + Any>(mut self) -> Self {
        fn call<T: DataErrorInfo + Any>(value: &dyn Any) -> Option<String> {
            value.downcast_ref::<T>().and_then(DataErrorInfo::error)
        }
        self.error = Some(call::<T>);
        self
    }

    pub fn is_validatable(&self) -> bool {
        self.validate.is_some()
    }

    pub fn has_error_info(&self) -> bool {
        self.error.is_some()
    }

    /// Runs self-validation. `None` if the type is not self-validating.
    pub fn validate(&self, value: &dyn Any) -> Option<Vec<ValidationResult>> {
        self.validate.map(|validate| validate(value))
    }

    /// Current error string, with empty strings treated as no error.
    pub fn error(&self, value: &dyn Any) -> Option<String> {
        self.error
            .and_then(|error| error(value))
            .filter(|message| !message.is_empty())
    }
}

impl fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Capabilities")
            .field("validatable", &self.is_validatable())
            .field("error_info", &self.has_error_info())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Form {
        error: &'static str,
    }

    impl DataErrorInfo for Form {
        fn error(&self) -> Option<String> {
            Some(self.error.to_owned())
        }
    }

    impl ValidatableObject for Form {
        fn validate(&self) -> Vec<ValidationResult> {
            vec![ValidationResult::for_member(self.error, "Value1")]
        }
    }

    #[test]
    fn empty_error_string_is_no_error() {
        let caps = Capabilities::none().with_error_info::<Form>();
        assert_eq!(caps.error(&Form { error: "" }), None);
        assert_eq!(caps.error(&Form { error: "foo" }).as_deref(), Some("foo"));
    }

    #[test]
    fn missing_capability_reports_nothing() {
        let caps = Capabilities::none();
        assert!(caps.validate(&Form { error: "x" }).is_none());
        assert!(!caps.has_error_info());
    }

    #[test]
    fn self_validation_downcasts_to_the_concrete_type() {
        let caps = Capabilities::none().with_validatable::<Form>();
        let results = caps.validate(&Form { error: "bar" }).unwrap();
        assert_eq!(results, vec![ValidationResult::for_member("bar", "Value1")]);
        // A value of another type yields no results rather than a fault.
        assert_eq!(caps.validate(&5u8), Some(vec![]));
    }
}
