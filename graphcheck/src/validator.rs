//! The public validation facade.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use tracing::trace;

use crate::cache::{CacheStrategy, OnceMap, ThreadSafe};
use crate::checker::Checker;
use crate::compiler::{Compiler, Finding, ProgramPair};
use crate::config::ValidatorConfig;
use crate::error::Result;
use crate::graph::ROOT_MEMBER_NAME;
use crate::policy::{RecursionPolicy, UserTypeRecursionPolicy};
use crate::provider::{AttributeRuleProvider, RuleProvider};
use crate::reflect::{DynReflect, Reflect, TypeRef};
use crate::rule::UNSPECIFIED_MESSAGE;
use crate::shape::ShapeAnalyzer;

/// Message of the error reported for an absent root object.
pub const ROOT_ABSENT_MESSAGE: &str = "Root object cannot be null.";

/// One caller-facing validation failure.
#[derive(Clone)]
pub struct ValidationError<'a> {
    member_path: String,
    message: String,
    object: Option<&'a dyn Any>,
}

impl<'a> ValidationError<'a> {
    pub fn new(member_path: impl Into<String>, message: impl Into<String>, object: Option<&'a dyn Any>) -> Self {
        Self {
            member_path: member_path.into(),
            message: message.into(),
            object,
        }
    }

    /// The fixed error reported when the root object is absent.
    pub fn root_absent() -> Self {
        Self::new(ROOT_MEMBER_NAME, ROOT_ABSENT_MESSAGE, None)
    }

    /// Access path of the failing member, e.g. `root.Items[].Name`.
    pub fn member_path(&self) -> &str {
        &self.member_path
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// The innermost object the failing rule was checked on.
    pub fn object(&self) -> Option<&'a dyn Any> {
        self.object
    }

    pub fn object_as<T: Any>(&self) -> Option<&'a T> {
        self.object.and_then(|object| object.downcast_ref::<T>())
    }

    pub fn is_root_absent(&self) -> bool {
        self.object.is_none() && self.member_path == ROOT_MEMBER_NAME && self.message == ROOT_ABSENT_MESSAGE
    }
}

impl PartialEq for ValidationError<'_> {
    /// Objects compare by identity.
    fn eq(&self, other: &Self) -> bool {
        let same_object = match (self.object, other.object) {
            (Some(a), Some(b)) => std::ptr::eq(a as *const dyn Any as *const u8, b as *const dyn Any as *const u8),
            (None, None) => true,
            _ => false,
        };
        same_object && self.member_path == other.member_path && self.message == other.message
    }
}

impl fmt::Debug for ValidationError<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidationError")
            .field("member_path", &self.member_path)
            .field("message", &self.message)
            .field("has_object", &self.object.is_some())
            .finish()
    }
}

impl fmt::Display for ValidationError<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.member_path, self.message)
    }
}

/// Validates objects with per-type compiled programs.
///
/// Programs are built on first use of a type and reused afterwards. With the
/// default [`ThreadSafe`] strategy the validator is `Send + Sync` and each
/// type's programs are built at most once; with [`crate::SingleWriter`] it is
/// confined to one thread.
pub struct Validator<S: CacheStrategy = ThreadSafe> {
    shapes: ShapeAnalyzer<S>,
    programs: S::ProgramCache,
    config: ValidatorConfig,
}

static DEFAULT: OnceCell<Validator> = OnceCell::new();

impl Validator {
    pub fn builder() -> ValidatorBuilder {
        ValidatorBuilder::default()
    }

    /// Installs the process-wide default instance. Fails (returning the
    /// validator) if one is already installed.
    pub fn set_default(validator: Validator) -> core::result::Result<(), Validator> {
        DEFAULT.set(validator)
    }

    pub fn default_instance() -> Option<&'static Validator> {
        DEFAULT.get()
    }
}

impl<S: CacheStrategy> Validator<S> {
    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    /// `false` when `obj` is absent, otherwise whether the fail-fast program
    /// finds nothing.
    pub fn is_valid<T: Reflect>(&self, obj: &T) -> Result<bool> {
        self.is_valid_value(T::type_ref(), obj.project())
    }

    /// Validates `obj`.
    ///
    /// Returns `Ok(None)` when `optimistic` is set and the fail-fast program
    /// finds nothing; the collect-all program is skipped entirely. Otherwise
    /// returns every error in traversal order (possibly none). An absent root
    /// yields exactly [`ValidationError::root_absent`].
    pub fn validate<'a, T: Reflect>(&self, obj: &'a T, optimistic: bool) -> Result<Option<Vec<ValidationError<'a>>>> {
        self.validate_value(T::type_ref(), obj.project(), optimistic)
    }

    /// First error in traversal order, if any.
    pub fn validate_to_first_error<'a, T: Reflect>(&self, obj: &'a T) -> Result<Option<ValidationError<'a>>> {
        self.first_error_value(T::type_ref(), obj.project())
    }

    /// [`Validator::is_valid`] using the value's own concrete type.
    pub fn is_valid_dyn(&self, obj: &dyn DynReflect) -> Result<bool> {
        self.is_valid_value(obj.dyn_type_ref(), obj.as_value())
    }

    pub fn validate_dyn<'a>(&self, obj: &'a dyn DynReflect, optimistic: bool) -> Result<Option<Vec<ValidationError<'a>>>> {
        self.validate_value(obj.dyn_type_ref(), obj.as_value(), optimistic)
    }

    pub fn validate_to_first_error_dyn<'a>(&self, obj: &'a dyn DynReflect) -> Result<Option<ValidationError<'a>>> {
        self.first_error_value(obj.dyn_type_ref(), obj.as_value())
    }

    /// Compiled programs for `ty`, built on first request.
    pub fn program(&self, ty: &TypeRef) -> Result<Arc<ProgramPair>> {
        self.programs.get_or_try_init(ty.type_id(), || {
            Compiler::new(&self.shapes, &self.config)
                .compile(ty)
                .map(Arc::new)
        })
    }

    pub fn compiled_types(&self) -> usize {
        self.programs.len()
    }

    fn is_valid_value(&self, ty: TypeRef, root: Option<&dyn Any>) -> Result<bool> {
        let Some(root) = root else {
            return Ok(false);
        };
        trace!(type_name = ty.name(), "is_valid");
        Ok(self.program(&ty)?.run_fail_fast(root).is_none())
    }

    fn validate_value<'a>(
        &self,
        ty: TypeRef,
        root: Option<&'a dyn Any>,
        optimistic: bool,
    ) -> Result<Option<Vec<ValidationError<'a>>>> {
        let Some(root) = root else {
            return Ok(Some(vec![ValidationError::root_absent()]));
        };
        trace!(type_name = ty.name(), optimistic, "validate");

        let program = self.program(&ty)?;
        if optimistic && program.run_fail_fast(root).is_none() {
            return Ok(None);
        }

        let findings = program.run_collect_all(root);
        let mut errors = Vec::with_capacity(findings.len());
        for finding in findings {
            errors.extend(resolve(&program, finding)?);
        }
        Ok(Some(errors))
    }

    fn first_error_value<'a>(&self, ty: TypeRef, root: Option<&'a dyn Any>) -> Result<Option<ValidationError<'a>>> {
        let Some(root) = root else {
            return Ok(Some(ValidationError::root_absent()));
        };
        trace!(type_name = ty.name(), "validate_to_first_error");

        let program = self.program(&ty)?;
        let Some(finding) = program.run_fail_fast(root) else {
            return Ok(None);
        };

        let mut errors = resolve(&program, finding)?;
        if errors.is_empty() {
            let member = program.graph().rule_member(finding.rule)?;
            let path = program.graph().access_path(member)?;
            return Ok(Some(ValidationError::new(path, UNSPECIFIED_MESSAGE, Some(finding.target))));
        }
        Ok(Some(errors.swap_remove(0)))
    }
}

fn resolve<'a>(program: &ProgramPair, finding: Finding<'a>) -> Result<Vec<ValidationError<'a>>> {
    Ok(program
        .graph()
        .error_messages(finding.rule, finding.target)?
        .into_iter()
        .map(|(path, message)| ValidationError::new(path, message, Some(finding.target)))
        .collect())
}

/// Configures and builds a [`Validator`].
pub struct ValidatorBuilder {
    provider: Arc<dyn RuleProvider>,
    checkers: Vec<Arc<dyn Checker>>,
    policy: Arc<dyn RecursionPolicy>,
    config: ValidatorConfig,
}

impl Default for ValidatorBuilder {
    fn default() -> Self {
        Self {
            provider: Arc::new(AttributeRuleProvider),
            checkers: Vec::new(),
            policy: Arc::new(UserTypeRecursionPolicy),
            config: ValidatorConfig::default(),
        }
    }
}

impl ValidatorBuilder {
    pub fn provider(mut self, provider: impl RuleProvider + 'static) -> Self {
        self.provider = Arc::new(provider);
        self
    }

    /// Appends a checker. Earlier checkers take priority.
    pub fn checker(mut self, checker: impl Checker + 'static) -> Self {
        self.checkers.push(Arc::new(checker));
        self
    }

    pub fn recursion_policy(mut self, policy: impl RecursionPolicy + 'static) -> Self {
        self.policy = Arc::new(policy);
        self
    }

    pub fn config(mut self, config: ValidatorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn cycle_depth(mut self, cycle_depth: usize) -> Self {
        self.config.cycle_depth = cycle_depth;
        self
    }

    pub fn max_members(mut self, max_members: usize) -> Self {
        self.config.max_members = max_members;
        self
    }

    pub fn build(self) -> Validator {
        self.build_with::<ThreadSafe>()
    }

    pub fn build_with<S: CacheStrategy>(self) -> Validator<S> {
        Validator {
            shapes: ShapeAnalyzer::new(self.provider, self.checkers, self.policy),
            programs: S::ProgramCache::default(),
            config: self.config,
        }
    }
}
