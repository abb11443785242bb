//! Block IR emitted by the expansion pass and lowered into closures.
//!
//! Every expansion writes into its own block. A parent refers to the child
//! block by id, so children always have higher ids than their parents.

use crate::checker::Check;
use crate::graph::RuleId;
use crate::reflect::{Accessor, Elements};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BlockId(u32);

impl BlockId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Clone)]
pub enum Op {
    /// A rule bound to the block's own object.
    CheckSelf { rule: RuleId, check: Check },
    /// Reads one member, checks its rules, then descends.
    ///
    /// `follow` expands the member value itself; `iterate` expands each
    /// present element. Both are skipped when the value is absent.
    Member {
        access: Accessor,
        checks: Vec<(RuleId, Check)>,
        follow: Option<BlockId>,
        iterate: Option<(Elements, BlockId)>,
    },
}

impl Op {
    fn is_noop(&self) -> bool {
        matches!(
            self,
            Op::Member {
                checks,
                follow: None,
                iterate: None,
                ..
            } if checks.is_empty()
        )
    }
}

#[derive(Clone, Default)]
pub struct Blocks {
    blocks: Vec<Vec<Op>>,
}

impl Blocks {
    pub fn alloc(&mut self) -> BlockId {
        let id = BlockId(self.blocks.len() as u32);
        self.blocks.push(Vec::new());
        id
    }

    pub fn push(&mut self, block: BlockId, op: Op) {
        self.blocks[block.index()].push(op);
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn op_count(&self) -> usize {
        self.blocks.iter().map(Vec::len).sum()
    }

    /// Drops descents into blocks that ended up empty, and member ops left
    /// with nothing to do.
    pub fn prune(&mut self) {
        let mut empty = vec![false; self.blocks.len()];
        for index in (0..self.blocks.len()).rev() {
            let block = &mut self.blocks[index];
            for op in block.iter_mut() {
                if let Op::Member { follow, iterate, .. } = op {
                    if follow.map_or(false, |child| empty[child.index()]) {
                        *follow = None;
                    }
                    if iterate.map_or(false, |(_, child)| empty[child.index()]) {
                        *iterate = None;
                    }
                }
            }
            block.retain(|op| !op.is_noop());
            empty[index] = block.is_empty();
        }
    }

    /// Consumes the arena, yielding blocks from the highest id down.
    pub fn into_reverse(self) -> impl Iterator<Item = (BlockId, Vec<Op>)> {
        self.blocks
            .into_iter()
            .enumerate()
            .rev()
            .map(|(index, ops)| (BlockId(index as u32), ops))
    }
}
