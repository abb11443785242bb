#![allow(dead_code)]

use std::sync::Arc;

use graphcheck::{check, Check, Checker, Rule, TypeRef, Validator};

/// Always passes.
#[derive(Debug)]
pub struct Valid;

/// Always fails.
#[derive(Debug)]
pub struct Invalid;

/// Passes for strictly positive `i32` values.
#[derive(Debug)]
pub struct Positive;

pub struct FixedChecker;

impl Checker for FixedChecker {
    fn can_check(&self, rule: Option<&dyn Rule>, _member_type: &TypeRef) -> bool {
        rule.is_some_and(|rule| rule.is::<Valid>() || rule.is::<Invalid>())
    }

    fn emit_check(&self, rule: Option<&Arc<dyn Rule>>, _member_type: &TypeRef) -> anyhow::Result<Check> {
        let valid = rule.is_some_and(|rule| (**rule).is::<Valid>());
        Ok(check(move |_| valid))
    }
}

pub struct PositiveChecker;

impl Checker for PositiveChecker {
    fn can_check(&self, rule: Option<&dyn Rule>, member_type: &TypeRef) -> bool {
        rule.is_some_and(|rule| rule.is::<Positive>()) && member_type.is::<i32>()
    }

    fn emit_check(&self, _rule: Option<&Arc<dyn Rule>>, _member_type: &TypeRef) -> anyhow::Result<Check> {
        Ok(check(|value| value.and_then(|v| v.downcast_ref::<i32>()).map_or(true, |v| *v > 0)))
    }
}

pub fn validator() -> Validator {
    Validator::builder().checker(FixedChecker).checker(PositiveChecker).build()
}
