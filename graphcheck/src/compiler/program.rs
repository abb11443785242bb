//! Lowering of the block IR into the two executable programs.

use std::any::Any;
use std::fmt;

use crate::graph::{MemberGraph, RuleId};

use super::ir::{Blocks, Op};

/// A failing rule and the innermost object it was checked on.
///
/// For member rules the object is the member's owner; for type rules and
/// capability markers it is the object itself.
#[derive(Clone, Copy)]
pub struct Finding<'a> {
    pub rule: RuleId,
    pub target: &'a dyn Any,
}

impl fmt::Debug for Finding<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Finding").field("rule", &self.rule).finish_non_exhaustive()
    }
}

pub type FailFastFn = Box<dyn for<'a> Fn(&'a dyn Any) -> Option<Finding<'a>> + Send + Sync>;

pub type CollectAllFn = Box<dyn for<'a> Fn(&'a dyn Any, &mut Vec<Finding<'a>>) + Send + Sync>;

fn fail_fast<F>(f: F) -> FailFastFn
where
    F: for<'a> Fn(&'a dyn Any) -> Option<Finding<'a>> + Send + Sync + 'static,
{
    Box::new(f)
}

fn collect_all<F>(f: F) -> CollectAllFn
where
    F: for<'a> Fn(&'a dyn Any, &mut Vec<Finding<'a>>) + Send + Sync + 'static,
{
    Box::new(f)
}

/// The compiled programs for one root type and the sealed graph they report
/// against. Immutable; safe to run from many threads at once.
pub struct ProgramPair {
    fail_fast: FailFastFn,
    collect_all: CollectAllFn,
    graph: MemberGraph,
}

impl ProgramPair {
    pub(crate) fn lower(blocks: Blocks, graph: MemberGraph) -> Self {
        debug_assert!(graph.is_sealed());
        Self {
            fail_fast: lower_fail_fast(blocks.clone()),
            collect_all: lower_collect_all(blocks),
            graph,
        }
    }

    /// First failing rule in traversal order.
    pub fn run_fail_fast<'a>(&self, root: &'a dyn Any) -> Option<Finding<'a>> {
        (self.fail_fast)(root)
    }

    /// Every failing rule in traversal order.
    pub fn run_collect_all<'a>(&self, root: &'a dyn Any) -> Vec<Finding<'a>> {
        let mut findings = Vec::new();
        (self.collect_all)(root, &mut findings);
        findings
    }

    pub fn graph(&self) -> &MemberGraph {
        &self.graph
    }
}

impl fmt::Debug for ProgramPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgramPair").field("graph", &self.graph).finish_non_exhaustive()
    }
}

// Blocks are lowered from the highest id down so every child closure exists
// before the op that descends into it.
fn lower_fail_fast(blocks: Blocks) -> FailFastFn {
    let mut lowered: Vec<Option<FailFastFn>> = (0..blocks.len()).map(|_| None).collect();

    for (id, ops) in blocks.into_reverse() {
        let steps: Vec<FailFastFn> = ops
            .into_iter()
            .map(|op| match op {
                Op::CheckSelf { rule, check } => {
                    fail_fast(move |object| (!check(Some(object))).then_some(Finding { rule, target: object }))
                }
                Op::Member {
                    access,
                    checks,
                    follow,
                    iterate,
                } => {
                    let follow = follow.and_then(|block| lowered[block.index()].take());
                    let iterate = iterate
                        .and_then(|(elements, block)| lowered[block.index()].take().map(|body| (elements, body)));

                    fail_fast(move |object| {
                        let value = access(object);
                        for (rule, check) in &checks {
                            if !check(value) {
                                return Some(Finding {
                                    rule: *rule,
                                    target: object,
                                });
                            }
                        }

                        let value = value?;
                        if let Some(body) = &follow {
                            if let Some(finding) = body(value) {
                                return Some(finding);
                            }
                        }
                        if let Some((elements, body)) = &iterate {
                            return elements.iter(value).flatten().find_map(|element| body(element));
                        }
                        None
                    })
                }
            })
            .collect();

        lowered[id.index()] = Some(fail_fast(move |object| steps.iter().find_map(|step| step(object))));
    }

    lowered
        .into_iter()
        .next()
        .flatten()
        .unwrap_or_else(|| fail_fast(|_| None))
}

fn lower_collect_all(blocks: Blocks) -> CollectAllFn {
    let mut lowered: Vec<Option<CollectAllFn>> = (0..blocks.len()).map(|_| None).collect();

    for (id, ops) in blocks.into_reverse() {
        let steps: Vec<CollectAllFn> = ops
            .into_iter()
            .map(|op| match op {
                Op::CheckSelf { rule, check } => collect_all(move |object, sink| {
                    if !check(Some(object)) {
                        sink.push(Finding { rule, target: object });
                    }
                }),
                Op::Member {
                    access,
                    checks,
                    follow,
                    iterate,
                } => {
                    let follow = follow.and_then(|block| lowered[block.index()].take());
                    let iterate = iterate
                        .and_then(|(elements, block)| lowered[block.index()].take().map(|body| (elements, body)));

                    collect_all(move |object, sink| {
                        let value = access(object);
                        for (rule, check) in &checks {
                            if !check(value) {
                                sink.push(Finding {
                                    rule: *rule,
                                    target: object,
                                });
                            }
                        }

                        let Some(value) = value else { return };
                        if let Some(body) = &follow {
                            body(value, sink);
                        }
                        if let Some((elements, body)) = &iterate {
                            for element in elements.iter(value).flatten() {
                                body(element, sink);
                            }
                        }
                    })
                }
            })
            .collect();

        lowered[id.index()] = Some(collect_all(move |object, sink| {
            for step in &steps {
                step(object, sink);
            }
        }));
    }

    lowered
        .into_iter()
        .next()
        .flatten()
        .unwrap_or_else(|| collect_all(|_, _| {}))
}
