//! Work Queue
//!
//! The work queue decides the order in which invalidated components are
//! rendered during a pass. Parents must render before their descendants:
//! a parent's render may update the child in place (rendering it with new
//! props) or unmount it altogether, and either way the queued entry for the
//! child becomes redundant.
//!
//! # Algorithm
//!
//! 1. Each invalidated component is pushed with its depth in the tree.
//! 2. Entries pop shallowest first; ties pop in push order.
//! 3. The reconciler skips entries that were already rendered earlier in
//!    the pass or that are no longer mounted.
//!
//! A node can be queued at most once per pass.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashSet};

use super::node::NodeId;

#[derive(Debug, Default)]
pub(crate) struct WorkQueue {
    heap: BinaryHeap<Reverse<(usize, u64, NodeId)>>,
    queued: HashSet<NodeId>,
    seq: u64,
}

impl WorkQueue {
    /// Queue a node. Returns false if it was already queued.
    pub fn push(&mut self, node: NodeId, depth: usize) -> bool {
        if !self.queued.insert(node) {
            return false;
        }
        self.heap.push(Reverse((depth, self.seq, node)));
        self.seq += 1;
        true
    }

    /// The shallowest queued node.
    pub fn pop(&mut self) -> Option<NodeId> {
        let Reverse((_, _, node)) = self.heap.pop()?;
        self.queued.remove(&node);
        Some(node)
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }
}
