//! Compiled object-graph validation.
//!
//! Validation rules are read once per type from its [`Reflect`] metadata and
//! compiled into two programs: a fail-fast program that stops at the first
//! failing rule and a collect-all program that reports every failure. Both
//! share a [`MemberGraph`] that turns raw findings back into readable member
//! paths such as `root.Orders[].Amount` and into error text.
//!
//! ```ignore
//! use graphcheck::{DataErrorInfoChecker, Reflect, Validator};
//!
//! #[derive(Reflect)]
//! struct Person {
//!     #[rule(AgeLimit)]
//!     age: u32,
//!     nickname: Option<String>,
//! }
//!
//! let validator = Validator::builder().checker(AgeChecker).build();
//! let errors = validator.validate(&person, false)?;
//! ```
//!
//! Where rules come from ([`RuleProvider`]), how a rule is checked
//! ([`Checker`]) and how far the compiler descends ([`RecursionPolicy`]) are
//! pluggable. The `graphcheck-annotations` crate provides a ready-made set of
//! data annotations on top of these seams.

// Lets the derive macro refer to `::graphcheck` from inside this crate too.
extern crate self as graphcheck;

pub mod cache;
pub mod capability;
pub mod checker;
pub mod compiler;
pub mod config;
pub mod error;
pub mod graph;
pub mod policy;
pub mod provider;
pub mod reflect;
pub mod rule;
pub mod shape;
pub mod validator;

pub use cache::{CacheStrategy, SingleWriter, ThreadSafe};
pub use capability::{Capabilities, DataErrorInfo, ValidatableObject, ValidationResult};
pub use checker::{check, Check, Checker, DataErrorInfoChecker};
pub use compiler::{Finding, ProgramPair};
pub use config::ValidatorConfig;
pub use error::{Error, Result};
pub use graph::{MemberGraph, MemberId, MemberKind, RuleId, ROOT_MEMBER_NAME};
pub use policy::{FollowAllPolicy, PolicyOptions, RecursionPolicy, UserTypeRecursionPolicy};
pub use provider::{AttributeRuleProvider, MetadataTarget, RuleProvider};
pub use reflect::{field, DynReflect, MemberDescriptor, Origin, Reflect, TypeDescriptor, TypeRef};
pub use rule::{MemberMessage, MessageSource, Rule, RuleInfo, UNSPECIFIED_MESSAGE};
pub use validator::{ValidationError, Validator, ValidatorBuilder, ROOT_ABSENT_MESSAGE};

/// Derives [`Reflect`] for structs with named fields and unit structs.
pub use graphcheck_derive::Reflect;

pub mod prelude {
    pub use crate::{
        Checker, DataErrorInfo, Reflect, RuleInfo, RuleProvider, ValidatableObject, ValidationError,
        ValidationResult, Validator,
    };
}
