//! Type shape analysis.
//!
//! A [`TypeShape`] is the resolved view of one concrete type: its own rule
//! bindings, and for each member the rule bindings, recursion directives and
//! element type. Shapes are a pure function of the type and the configured
//! collaborators, so they are computed once and kept for the lifetime of the
//! analyzer.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::cache::{CacheStrategy, OnceMap};
use crate::checker::{Check, Checker};
use crate::error::{Error, Result};
use crate::policy::{PolicyOptions, RecursionPolicy};
use crate::provider::{MetadataTarget, RuleProvider};
use crate::reflect::{Elements, MemberDescriptor, TypeRef};
use crate::rule::RuleInfo;

/// A rule together with the check emitted by the first capable checker.
#[derive(Clone)]
pub struct RuleBinding {
    pub info: RuleInfo,
    pub check: Check,
}

impl fmt::Debug for RuleBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleBinding").field("info", &self.info).finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
pub struct MemberShape {
    pub descriptor: MemberDescriptor,
    pub rules: Vec<RuleBinding>,
    /// Present when the member is enumerable.
    pub elements: Option<Elements>,
    pub policy: PolicyOptions,
}

impl MemberShape {
    /// The member's type, unless the policy forbids following it.
    pub fn followed(&self) -> Option<TypeRef> {
        (!self.policy.forbids_follow()).then_some(self.descriptor.ty)
    }

    /// The member's elements, unless it is not enumerable or the policy
    /// forbids iterating it.
    pub fn iterated(&self) -> Option<Elements> {
        self.elements.filter(|_| !self.policy.forbids_iterate())
    }
}

#[derive(Debug, Clone)]
pub struct TypeShape {
    pub ty: TypeRef,
    /// Rules attached to the type itself.
    pub rules: Vec<RuleBinding>,
    pub members: Vec<MemberShape>,
}

impl TypeShape {
    pub fn has_rules(&self) -> bool {
        !self.rules.is_empty() || self.members.iter().any(|m| !m.rules.is_empty())
    }

    /// Types the compiler may descend into from a value of this type.
    pub fn successors(&self) -> impl Iterator<Item = TypeRef> + '_ {
        self.members.iter().flat_map(|member| {
            let element = member.iterated().map(|elements| elements.element_type());
            member.followed().into_iter().chain(element)
        })
    }
}

/// Computes and caches type shapes.
pub struct ShapeAnalyzer<S: CacheStrategy> {
    provider: Arc<dyn RuleProvider>,
    checkers: Vec<Arc<dyn Checker>>,
    policy: Arc<dyn RecursionPolicy>,
    cache: S::ShapeCache,
    reach: S::ReachCache,
}

impl<S: CacheStrategy> ShapeAnalyzer<S> {
    pub fn new(
        provider: Arc<dyn RuleProvider>,
        checkers: Vec<Arc<dyn Checker>>,
        policy: Arc<dyn RecursionPolicy>,
    ) -> Self {
        Self {
            provider,
            checkers,
            policy,
            cache: S::ShapeCache::default(),
            reach: S::ReachCache::default(),
        }
    }

    /// Shape of `ty`, analysed on first request.
    ///
    /// A failed analysis is not cached; the next request retries.
    pub fn shape(&self, ty: &TypeRef) -> Result<Arc<TypeShape>> {
        self.cache
            .get_or_try_init(ty.type_id(), || self.analyze(ty).map(Arc::new))
    }

    pub fn cached_shapes(&self) -> usize {
        self.cache.len()
    }

    /// Whether `ty`, or any type reachable from it through members the
    /// policy lets the compiler follow or iterate, has a rule binding.
    pub fn carries_rules(&self, ty: &TypeRef) -> Result<bool> {
        self.reach.get_or_try_init(ty.type_id(), || self.search_rules(ty))
    }

    fn search_rules(&self, root: &TypeRef) -> Result<bool> {
        let mut seen = HashSet::new();
        let mut pending = vec![*root];
        while let Some(ty) = pending.pop() {
            if !seen.insert(ty.type_id()) {
                continue;
            }
            // Results already published for other types short-cut the walk.
            if ty.type_id() != root.type_id() {
                match self.reach.get(&ty.type_id()) {
                    Some(true) => return Ok(true),
                    Some(false) => continue,
                    None => {}
                }
            }
            let shape = self.shape(&ty)?;
            if shape.has_rules() {
                return Ok(true);
            }
            pending.extend(shape.successors());
        }
        Ok(false)
    }

    fn analyze(&self, ty: &TypeRef) -> Result<TypeShape> {
        let descriptor = ty.descriptor();
        let rules = self.bind(ty, &MetadataTarget::Type {
            ty,
            descriptor: &descriptor,
        })?;

        let mut members = Vec::with_capacity(descriptor.members.len());
        for member in &descriptor.members {
            let target = MetadataTarget::Member { owner: ty, member };
            members.push(MemberShape {
                rules: self.bind(ty, &target)?,
                elements: member.ty.elements().copied(),
                policy: self.policy.policy(ty, member),
                descriptor: member.clone(),
            });
        }

        debug!(
            type_name = ty.name(),
            members = members.len(),
            rules = rules.len() + members.iter().map(|m| m.rules.len()).sum::<usize>(),
            "analysed type shape"
        );

        Ok(TypeShape {
            ty: *ty,
            rules,
            members,
        })
    }

    fn bind(&self, owner: &TypeRef, target: &MetadataTarget<'_>) -> Result<Vec<RuleBinding>> {
        let infos = self
            .provider
            .rule_infos(target)
            .map_err(|source| Error::Provider {
                type_name: owner.name(),
                source,
            })?;

        let value_type = target.value_type();
        let mut bindings = Vec::with_capacity(infos.len());
        for info in infos {
            let Some(checker) = self
                .checkers
                .iter()
                .find(|checker| checker.can_check(info.rule(), value_type))
            else {
                // No checker means no opinion about this rule.
                trace!(
                    type_name = owner.name(),
                    member = target.name(),
                    rule = ?info.rule(),
                    "no checker applies; rule dropped"
                );
                continue;
            };

            let check = checker
                .emit_check(info.rule_arc(), value_type)
                .map_err(|source| Error::Checker {
                    type_name: owner.name(),
                    member: target.name(),
                    source,
                })?;
            bindings.push(RuleBinding { info, check });
        }
        Ok(bindings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{SingleWriter, ThreadSafe};
    use crate::checker::check;
    use crate::policy::UserTypeRecursionPolicy;
    use crate::provider::AttributeRuleProvider;
    use crate::reflect::{field, Reflect, TypeDescriptor};
    use crate::rule::Rule;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug)]
    struct Known;

    #[derive(Debug)]
    struct Unknown;

    struct KnownChecker;

    impl Checker for KnownChecker {
        fn can_check(&self, rule: Option<&dyn Rule>, _member_type: &TypeRef) -> bool {
            rule.map_or(false, |rule| rule.is::<Known>())
        }

        fn emit_check(&self, _rule: Option<&Arc<dyn Rule>>, _member_type: &TypeRef) -> anyhow::Result<Check> {
            Ok(check(|_| true))
        }
    }

    struct Sample {
        a: i32,
        b: Vec<Sample>,
    }

    impl Reflect for Sample {
        fn describe() -> TypeDescriptor {
            TypeDescriptor::new()
                .with_attribute(Unknown)
                .with_member(
                    field::<Self, i32>("a", |s| &s.a)
                        .with_attribute(Known)
                        .with_attribute(Unknown),
                )
                .with_member(field::<Self, Vec<Sample>>("b", |s| &s.b))
        }
    }

    fn analyzer<S: CacheStrategy>() -> ShapeAnalyzer<S> {
        ShapeAnalyzer::new(
            Arc::new(AttributeRuleProvider),
            vec![Arc::new(KnownChecker)],
            Arc::new(UserTypeRecursionPolicy),
        )
    }

    #[test]
    fn drops_rules_without_a_checker() {
        let shape = analyzer::<ThreadSafe>().shape(&Sample::type_ref()).unwrap();
        assert!(shape.rules.is_empty());
        assert_eq!(shape.members.len(), 2);
        assert_eq!(shape.members[0].rules.len(), 1);
        assert!(shape.members[1].rules.is_empty());
        assert!(shape.has_rules());
    }

    #[test]
    fn records_element_type_and_policy() {
        let shape = analyzer::<SingleWriter>().shape(&Sample::type_ref()).unwrap();
        let b = &shape.members[1];
        assert!(b.elements.map_or(false, |e| e.element_type().is::<Sample>()));
        assert!(b.followed().is_none());
        assert!(b.iterated().is_some());
        // Vec is external, so the default policy does not follow into it.
        assert!(b.policy.forbids_follow());
        assert!(!b.policy.forbids_iterate());
    }

    struct Bare {
        next: Option<Box<Bare>>,
    }

    impl Reflect for Bare {
        fn describe() -> TypeDescriptor {
            TypeDescriptor::new().with_member(field::<Self, Option<Box<Bare>>>("next", |b| &b.next))
        }
    }

    struct Wrapper {
        bare: Bare,
        samples: Vec<Sample>,
    }

    impl Reflect for Wrapper {
        fn describe() -> TypeDescriptor {
            TypeDescriptor::new()
                .with_member(field::<Self, Bare>("bare", |w| &w.bare))
                .with_member(field::<Self, Vec<Sample>>("samples", |w| &w.samples))
        }
    }

    #[test]
    fn rule_reachability_follows_members_and_elements() {
        let analyzer = analyzer::<ThreadSafe>();
        assert!(!analyzer.carries_rules(&Bare::type_ref()).unwrap());
        assert!(analyzer.carries_rules(&Sample::type_ref()).unwrap());
        assert!(analyzer.carries_rules(&Wrapper::type_ref()).unwrap());

        let wrapper = analyzer.shape(&Wrapper::type_ref()).unwrap();
        assert!(!wrapper.has_rules());
        let successors: Vec<TypeRef> = wrapper.successors().collect();
        assert_eq!(successors.len(), 2);
        assert!(successors[0].is::<Bare>());
        assert!(successors[1].is::<Sample>());
    }

    #[test]
    fn shapes_are_cached_per_type() {
        let analyzer = analyzer::<ThreadSafe>();
        let first = analyzer.shape(&Sample::type_ref()).unwrap();
        let second = analyzer.shape(&<Option<Sample>>::type_ref()).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(analyzer.cached_shapes(), 1);
    }

    #[test]
    fn provider_failures_are_not_cached() {
        struct Flaky(AtomicUsize);

        impl RuleProvider for Flaky {
            fn rule_infos(&self, _target: &MetadataTarget<'_>) -> anyhow::Result<Vec<RuleInfo>> {
                if self.0.fetch_add(1, Ordering::SeqCst) == 0 {
                    anyhow::bail!("metadata unavailable");
                }
                Ok(Vec::new())
            }
        }

        let analyzer = ShapeAnalyzer::<ThreadSafe>::new(
            Arc::new(Flaky(AtomicUsize::new(0))),
            Vec::new(),
            Arc::new(UserTypeRecursionPolicy),
        );

        let err = analyzer.shape(&Sample::type_ref()).unwrap_err();
        assert!(matches!(err, Error::Provider { .. }));
        assert_eq!(analyzer.cached_shapes(), 0);
        assert!(analyzer.shape(&Sample::type_ref()).is_ok());
        assert_eq!(analyzer.cached_shapes(), 1);
    }

    #[test]
    fn checker_failures_surface_with_member_name() {
        struct Broken;

        impl Checker for Broken {
            fn can_check(&self, _rule: Option<&dyn Rule>, _member_type: &TypeRef) -> bool {
                true
            }

            fn emit_check(&self, _rule: Option<&Arc<dyn Rule>>, _member_type: &TypeRef) -> anyhow::Result<Check> {
                Err(anyhow::anyhow!("cannot translate"))
            }
        }

        struct Plain {
            value: u8,
        }

        impl Reflect for Plain {
            fn describe() -> TypeDescriptor {
                TypeDescriptor::new().with_member(field::<Self, u8>("value", |p| &p.value).with_attribute(Known))
            }
        }

        let analyzer = ShapeAnalyzer::<ThreadSafe>::new(
            Arc::new(AttributeRuleProvider),
            vec![Arc::new(Broken)],
            Arc::new(UserTypeRecursionPolicy),
        );
        let err = analyzer.shape(&Plain::type_ref()).unwrap_err();
        assert!(matches!(err, Error::Checker { member: "value", .. }));
    }
}
