//! The validation program builder.
//!
//! Expansion is driven by a FIFO work queue rather than recursion, so the
//! builder's stack depth does not depend on how deep the type graph goes.
//! Each queued expansion fills a placeholder block that its parent already
//! points at; runtime order is therefore depth-first even though the build
//! itself is breadth-first.

mod ir;
mod program;

use std::any::TypeId;
use std::collections::VecDeque;

use tracing::{debug, trace, warn};

use crate::cache::CacheStrategy;
use crate::config::ValidatorConfig;
use crate::error::{Error, Result};
use crate::graph::{MemberGraph, MemberId, MemberKind};
use crate::reflect::TypeRef;
use crate::shape::ShapeAnalyzer;

use self::ir::{BlockId, Blocks, Op};

pub use self::program::{CollectAllFn, FailFastFn, Finding, ProgramPair};

/// Types entered on the way from the root, and how many of those entries
/// repeated a type already on the path.
#[derive(Clone, Default)]
struct Lineage {
    types: Vec<TypeId>,
    repeats: usize,
}

/// One pending expansion: validate a value of `ty` reached at `member`,
/// emitting into `block`.
struct Expansion {
    block: BlockId,
    ty: TypeRef,
    member: MemberId,
    lineage: Lineage,
}

/// Mutable state of one compilation.
struct Build {
    graph: MemberGraph,
    blocks: Blocks,
    queue: VecDeque<Expansion>,
    /// Descents refused by the cycle guard.
    truncated: usize,
}

pub(crate) struct Compiler<'a, S: CacheStrategy> {
    shapes: &'a ShapeAnalyzer<S>,
    config: &'a ValidatorConfig,
}

impl<'a, S: CacheStrategy> Compiler<'a, S> {
    pub(crate) fn new(shapes: &'a ShapeAnalyzer<S>, config: &'a ValidatorConfig) -> Self {
        Self { shapes, config }
    }

    pub(crate) fn compile(&self, root: &TypeRef) -> Result<ProgramPair> {
        let mut build = Build {
            graph: MemberGraph::new(),
            blocks: Blocks::default(),
            queue: VecDeque::new(),
            truncated: 0,
        };

        let block = build.blocks.alloc();
        let member = build.graph.root();
        build.queue.push_back(Expansion {
            block,
            ty: *root,
            member,
            lineage: Lineage::default(),
        });

        while let Some(task) = build.queue.pop_front() {
            self.expand(task, &mut build)?;
            if build.graph.member_count() > self.config.max_members {
                return Err(Error::MemberBudget {
                    type_name: root.name(),
                    limit: self.config.max_members,
                });
            }
        }

        if build.truncated > 0 {
            warn!(
                type_name = root.name(),
                cycle_depth = self.config.cycle_depth,
                truncated = build.truncated,
                "cycle guard truncated recursive members; values below the cut-off are not validated"
            );
        }

        let Build {
            mut graph,
            mut blocks,
            ..
        } = build;
        let emitted = blocks.op_count();
        blocks.prune();
        graph.seal();

        debug!(
            type_name = root.name(),
            members = graph.member_count(),
            rules = graph.rule_count(),
            blocks = blocks.len(),
            ops = blocks.op_count(),
            pruned = emitted - blocks.op_count(),
            "compiled validation programs"
        );

        Ok(ProgramPair::lower(blocks, graph))
    }

    fn expand(&self, task: Expansion, build: &mut Build) -> Result<()> {
        let shape = self.shapes.shape(&task.ty)?;
        let mut lineage = task.lineage;
        lineage.types.push(task.ty.type_id());

        for binding in &shape.rules {
            let rule = build.graph.new_rule_id(task.member, binding.info.clone())?;
            build.blocks.push(
                task.block,
                Op::CheckSelf {
                    rule,
                    check: binding.check.clone(),
                },
            );
        }

        for member in &shape.members {
            let name = member.descriptor.name;
            let id = build.graph.new_member_id(task.member, name, MemberKind::Scalar)?;

            let mut checks = Vec::with_capacity(member.rules.len());
            for binding in &member.rules {
                checks.push((build.graph.new_rule_id(id, binding.info.clone())?, binding.check.clone()));
            }

            let follow = match member.followed() {
                Some(ty) => match self.enter(&lineage, &ty, name, build)? {
                    Some(child) => {
                        let block = build.blocks.alloc();
                        build.queue.push_back(Expansion {
                            block,
                            ty,
                            member: id,
                            lineage: child,
                        });
                        Some(block)
                    }
                    None => None,
                },
                None => None,
            };

            let iterate = match member.iterated() {
                Some(elements) => {
                    let element = elements.element_type();
                    match self.enter(&lineage, &element, name, build)? {
                        Some(child) => {
                            let collection = build.graph.new_member_id(task.member, name, MemberKind::Collection)?;
                            let block = build.blocks.alloc();
                            build.queue.push_back(Expansion {
                                block,
                                ty: element,
                                member: collection,
                                lineage: child,
                            });
                            Some((elements, block))
                        }
                        None => None,
                    }
                }
                None => None,
            };

            build.blocks.push(
                task.block,
                Op::Member {
                    access: member.descriptor.accessor().clone(),
                    checks,
                    follow,
                    iterate,
                },
            );
        }

        Ok(())
    }

    /// Decides whether to descend into `ty` below `lineage`, returning the
    /// child's lineage if so.
    ///
    /// Types with no reachable rules are never entered. Otherwise the cycle
    /// guard allows fewer than `cycle_depth` repeated types on the whole path,
    /// so mutually recursive types share one budget.
    fn enter(&self, lineage: &Lineage, ty: &TypeRef, member: &str, build: &mut Build) -> Result<Option<Lineage>> {
        if !self.shapes.carries_rules(ty)? {
            trace!(type_name = ty.name(), member, "no reachable rules; descent skipped");
            return Ok(None);
        }

        let repeats = lineage.repeats + usize::from(lineage.types.contains(&ty.type_id()));
        if repeats >= self.config.cycle_depth {
            debug!(
                type_name = ty.name(),
                member,
                cycle_depth = self.config.cycle_depth,
                "cycle guard stopped descent"
            );
            build.truncated += 1;
            return Ok(None);
        }

        Ok(Some(Lineage {
            types: lineage.types.clone(),
            repeats,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ThreadSafe;
    use crate::checker::{check, Check, Checker};
    use crate::policy::{FollowAllPolicy, PolicyOptions};
    use crate::provider::AttributeRuleProvider;
    use crate::reflect::{field, Reflect, TypeDescriptor};
    use crate::rule::Rule;
    use std::sync::Arc;

    #[derive(Debug)]
    struct Fail;

    #[derive(Debug)]
    struct Pass;

    struct Fixed;

    impl Checker for Fixed {
        fn can_check(&self, rule: Option<&dyn Rule>, _member_type: &TypeRef) -> bool {
            rule.map_or(false, |rule| rule.is::<Fail>() || rule.is::<Pass>())
        }

        fn emit_check(&self, rule: Option<&Arc<dyn Rule>>, _member_type: &TypeRef) -> anyhow::Result<Check> {
            let valid = rule.map_or(false, |rule| (**rule).is::<Pass>());
            Ok(check(move |_| valid))
        }
    }

    struct Node {
        label: u8,
        next: Option<Box<Node>>,
        children: Vec<Node>,
    }

    impl Reflect for Node {
        fn describe() -> TypeDescriptor {
            TypeDescriptor::new()
                .with_member(field::<Self, u8>("label", |n| &n.label).with_attribute(Fail))
                .with_member(field::<Self, Option<Box<Node>>>("next", |n| &n.next))
                .with_member(field::<Self, Vec<Node>>("children", |n| &n.children))
        }
    }

    fn leaf(label: u8) -> Node {
        Node {
            label,
            next: None,
            children: Vec::new(),
        }
    }

    fn compile_with(cycle_depth: usize, policy: PolicyOptions) -> ProgramPair {
        let shapes = ShapeAnalyzer::<ThreadSafe>::new(
            Arc::new(AttributeRuleProvider),
            vec![Arc::new(Fixed)],
            Arc::new(move |_: &TypeRef, _: &crate::reflect::MemberDescriptor| policy),
        );
        let config = ValidatorConfig {
            cycle_depth,
            ..ValidatorConfig::default()
        };
        Compiler::new(&shapes, &config).compile(&Node::type_ref()).unwrap()
    }

    #[test]
    fn cycle_guard_bounds_the_member_graph() {
        let shallow = compile_with(1, PolicyOptions::NONE);
        let deep = compile_with(3, PolicyOptions::NONE);
        assert!(shallow.graph().is_sealed());
        assert!(shallow.graph().member_count() < deep.graph().member_count());
    }

    #[test]
    fn runtime_order_is_depth_first() {
        let program = compile_with(3, PolicyOptions::NONE);
        let mut root = leaf(0);
        root.next = Some(Box::new(leaf(1)));
        root.children = vec![leaf(2), leaf(3)];

        let findings = program.run_collect_all(&root);
        let paths: Vec<&str> = findings
            .iter()
            .map(|f| {
                let member = program.graph().rule_member(f.rule).unwrap();
                program.graph().access_path(member).unwrap()
            })
            .collect();
        assert_eq!(
            paths,
            vec![
                "root.label",
                "root.next.label",
                "root.children[].label",
                "root.children[].label",
            ]
        );

        let first = program.run_fail_fast(&root).unwrap();
        assert_eq!(first.rule, findings[0].rule);
        assert!(std::ptr::eq(
            first.target as *const dyn std::any::Any as *const u8,
            &root as *const Node as *const u8
        ));
    }

    #[test]
    fn policy_can_stop_descent() {
        let program = compile_with(3, PolicyOptions::ALL);
        let mut root = leaf(0);
        root.children = vec![leaf(1)];
        assert_eq!(program.run_collect_all(&root).len(), 1);
    }

    #[test]
    fn rule_free_types_are_not_expanded() {
        struct Loose {
            left: Option<Box<Loose>>,
            right: Option<Box<Loose>>,
        }

        impl Reflect for Loose {
            fn describe() -> TypeDescriptor {
                TypeDescriptor::new()
                    .with_member(field::<Self, Option<Box<Loose>>>("left", |l| &l.left))
                    .with_member(field::<Self, Option<Box<Loose>>>("right", |l| &l.right))
            }
        }

        let shapes = ShapeAnalyzer::<ThreadSafe>::new(
            Arc::new(AttributeRuleProvider),
            vec![Arc::new(Fixed)],
            Arc::new(FollowAllPolicy),
        );
        let config = ValidatorConfig::default();
        let program = Compiler::new(&shapes, &config).compile(&Loose::type_ref()).unwrap();
        // Root plus its two members; neither is descended into.
        assert_eq!(program.graph().member_count(), 3);
    }

    #[test]
    fn member_budget_is_enforced() {
        let shapes = ShapeAnalyzer::<ThreadSafe>::new(
            Arc::new(AttributeRuleProvider),
            vec![Arc::new(Fixed)],
            Arc::new(FollowAllPolicy),
        );
        let config = ValidatorConfig {
            max_members: 5,
            ..ValidatorConfig::default()
        };
        let err = Compiler::new(&shapes, &config).compile(&Node::type_ref()).unwrap_err();
        assert!(matches!(err, Error::MemberBudget { limit: 5, .. }));
    }

    #[test]
    fn empty_shapes_compile_to_noop_programs() {
        struct Empty;

        impl Reflect for Empty {
            fn describe() -> TypeDescriptor {
                TypeDescriptor::default()
            }
        }

        let shapes = ShapeAnalyzer::<ThreadSafe>::new(
            Arc::new(AttributeRuleProvider),
            Vec::new(),
            Arc::new(FollowAllPolicy),
        );
        let config = ValidatorConfig::default();
        let program = Compiler::new(&shapes, &config).compile(&Empty::type_ref()).unwrap();
        assert!(program.run_fail_fast(&Empty).is_none());
        assert!(program.run_collect_all(&Empty).is_empty());
    }
}
