//! Checkers translate one rule instance, for one member type, into an
//! executable boolean check.

use std::any::Any;
use std::sync::Arc;

use crate::reflect::TypeRef;
use crate::rule::Rule;

/// A compiled check. Receives the projected member value (`None` when the
/// value is absent) and returns `true` when the value is valid.
pub type Check = Arc<dyn Fn(Option<&dyn Any>) -> bool + Send + Sync>;

/// Builds a [`Check`] from a closure.
pub fn check<F>(f: F) -> Check
where
    F: Fn(Option<&dyn Any>) -> bool + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Translates rules into checks.
///
/// Checkers are consulted in their configured order; the first one whose
/// [`Checker::can_check`] returns `true` owns the rule. Both methods must be
/// free of side effects.
pub trait Checker: Send + Sync {
    /// `rule == None` is the capability marker.
    fn can_check(&self, rule: Option<&dyn Rule>, member_type: &TypeRef) -> bool;

    fn emit_check(&self, rule: Option<&Arc<dyn Rule>>, member_type: &TypeRef) -> anyhow::Result<Check>;
}

/// Treats a non-empty [`crate::DataErrorInfo`] error string as invalid.
#[derive(Debug, Clone, Copy, Default)]
pub struct DataErrorInfoChecker;

impl Checker for DataErrorInfoChecker {
    fn can_check(&self, rule: Option<&dyn Rule>, member_type: &TypeRef) -> bool {
        rule.is_none() && member_type.capabilities().has_error_info()
    }

    fn emit_check(&self, _rule: Option<&Arc<dyn Rule>>, member_type: &TypeRef) -> anyhow::Result<Check> {
        let capabilities = *member_type.capabilities();
        Ok(check(move |value| match value {
            Some(value) => capabilities.error(value).is_none(),
            None => true,
        }))
    }
}
