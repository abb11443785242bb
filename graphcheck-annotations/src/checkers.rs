//! Checkers for annotation rules, registered in priority order by
//! [`annotations_validator`](crate::annotations_validator).

use std::sync::Arc;

use anyhow::anyhow;
use graphcheck::{check, Check, Checker, Rule, TypeRef};

use crate::attribute::Annotation;

fn annotation(rule: Option<&dyn Rule>) -> Option<&Annotation> {
    rule.and_then(|rule| rule.downcast_ref::<Annotation>())
}

/// Runs `ValidatableObject::validate` for the self-validation marker.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidatableObjectChecker;

impl Checker for ValidatableObjectChecker {
    fn can_check(&self, rule: Option<&dyn Rule>, member_type: &TypeRef) -> bool {
        rule.is_none() && member_type.capabilities().is_validatable()
    }

    fn emit_check(&self, _rule: Option<&Arc<dyn Rule>>, member_type: &TypeRef) -> anyhow::Result<Check> {
        let capabilities = *member_type.capabilities();
        Ok(check(move |value| match value {
            Some(value) => capabilities.validate(value).map_or(true, |results| results.is_empty()),
            None => true,
        }))
    }
}

/// Typed comparison for range annotations whose operand type is exactly the
/// member's value type.
#[derive(Debug, Clone, Copy, Default)]
pub struct RangeChecker;

impl Checker for RangeChecker {
    fn can_check(&self, rule: Option<&dyn Rule>, member_type: &TypeRef) -> bool {
        annotation(rule)
            .and_then(|a| a.attribute().range())
            .is_some_and(|range| range.operand_type() == member_type.type_id())
    }

    fn emit_check(&self, rule: Option<&Arc<dyn Rule>>, _member_type: &TypeRef) -> anyhow::Result<Check> {
        let range = annotation(rule.map(|r| &**r))
            .and_then(|a| a.attribute().range())
            .ok_or_else(|| anyhow!("RangeChecker was handed a rule without a range"))?;
        Ok(range.typed_check())
    }
}

/// Fallback: asks the annotation itself through `is_valid`.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnnotationChecker;

impl Checker for AnnotationChecker {
    fn can_check(&self, rule: Option<&dyn Rule>, _member_type: &TypeRef) -> bool {
        annotation(rule).is_some()
    }

    fn emit_check(&self, rule: Option<&Arc<dyn Rule>>, _member_type: &TypeRef) -> anyhow::Result<Check> {
        let annotation = annotation(rule.map(|r| &**r))
            .cloned()
            .ok_or_else(|| anyhow!("AnnotationChecker was handed a rule that is not an annotation"))?;
        Ok(check(move |value| annotation.is_valid(value)))
    }
}
