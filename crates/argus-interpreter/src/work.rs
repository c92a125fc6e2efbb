use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::fmt;
use std::hash::{Hash, Hasher};

use rustc_hash::FxHashMap;
use tracing::trace;

use argus_ir::Block;

use crate::domain::Domain;
use crate::stack::CallStack;

/// A pending control-flow edge: destination block, optional source block,
/// and the call stack it runs under. Edges key the depth map, so equality,
/// ordering and hashing all defer to the stack's inlined-location identity.
pub struct Edge<'ir, D: Domain> {
    pub dst: Block,
    pub src: Option<Block>,
    pub stk: CallStack<'ir, D>,
}

impl<'ir, D: Domain> Edge<'ir, D> {
    fn cmp_edges(&self, other: &Self) -> Ordering {
        self.dst
            .cmp(&other.dst)
            .then_with(|| self.src.cmp(&other.src))
            .then_with(|| self.stk.compare_inlined(&other.stk))
    }
}

impl<'ir, D: Domain> Clone for Edge<'ir, D> {
    fn clone(&self) -> Self {
        Edge {
            dst: self.dst,
            src: self.src,
            stk: self.stk.clone(),
        }
    }
}

impl<'ir, D: Domain> PartialEq for Edge<'ir, D> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp_edges(other) == Ordering::Equal
    }
}

impl<'ir, D: Domain> Eq for Edge<'ir, D> {}

impl<'ir, D: Domain> PartialOrd for Edge<'ir, D> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp_edges(other))
    }
}

impl<'ir, D: Domain> Ord for Edge<'ir, D> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.cmp_edges(other)
    }
}

impl<'ir, D: Domain> Hash for Edge<'ir, D> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.dst.hash(state);
        self.src.hash(state);
        self.stk.hash(state);
    }
}

impl<'ir, D: Domain> fmt::Debug for Edge<'ir, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.src {
            Some(src) => write!(f, "b{} -> b{} {:?}", src.id(), self.dst.id(), self.stk),
            None => write!(f, "-> b{} {:?}", self.dst.id(), self.stk),
        }
    }
}

/// Per-path map from edge to exploration depth, joined pointwise by max at
/// merge points. Persistent so that enqueueing a state with its depth
/// history is O(1) in sharing rather than a map copy.
pub struct Depths<'ir, D: Domain>(im::HashMap<Edge<'ir, D>, u32>);

impl<'ir, D: Domain> Depths<'ir, D> {
    pub fn new() -> Self {
        Depths(im::HashMap::new())
    }

    pub fn find(&self, edge: &Edge<'ir, D>) -> Option<u32> {
        self.0.get(edge).copied()
    }

    #[must_use]
    pub fn add(&self, edge: Edge<'ir, D>, depth: u32) -> Self {
        Depths(self.0.update(edge, depth))
    }

    pub fn join(&self, other: &Self) -> Self {
        Depths(
            self.0
                .clone()
                .union_with(other.0.clone(), |lhs, rhs| lhs.max(rhs)),
        )
    }
}

impl<'ir, D: Domain> Default for Depths<'ir, D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'ir, D: Domain> Clone for Depths<'ir, D> {
    fn clone(&self) -> Self {
        Depths(self.0.clone())
    }
}

impl<'ir, D: Domain> fmt::Debug for Depths<'ir, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.0.iter()).finish()
    }
}

struct Prio<'ir, D: Domain> {
    depth: u32,
    edge: Edge<'ir, D>,
}

impl<'ir, D: Domain> PartialEq for Prio<'ir, D> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<'ir, D: Domain> Eq for Prio<'ir, D> {}

impl<'ir, D: Domain> PartialOrd for Prio<'ir, D> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<'ir, D: Domain> Ord for Prio<'ir, D> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.depth
            .cmp(&other.depth)
            .then_with(|| self.edge.cmp(&other.edge))
    }
}

/// Priority-ordered frontier of pending edges.
///
/// Lower depth is higher priority; ties break on the structural edge order
/// so runs are reproducible. States accumulate per destination block in
/// `waiting` while their edges sit in the heap, and are drained and
/// fold-joined in one batch when the first edge for that block is dequeued.
/// A heap entry whose block has already been drained is stale and skipped.
pub struct Worklist<'ir, D: Domain> {
    queue: BinaryHeap<Reverse<Prio<'ir, D>>>,
    waiting: FxHashMap<Block, Vec<(D::State, Depths<'ir, D>)>>,
    bound: u32,
}

impl<'ir, D: Domain> Worklist<'ir, D> {
    /// A worklist holding the single harness edge into `entry` at depth 0.
    pub fn init(state: D::State, entry: Block, bound: u32) -> Self {
        let mut wl = Worklist {
            queue: BinaryHeap::new(),
            waiting: FxHashMap::default(),
            bound,
        };
        wl.add(None, false, CallStack::empty(), state, entry, &Depths::new());
        wl
    }

    /// Enqueue `state` at `dst`, incrementing the edge depth when the edge
    /// retreats. An edge past the depth bound is pruned: dropped silently,
    /// by design a completeness trade-off rather than an error.
    pub fn add(
        &mut self,
        prev: Option<Block>,
        retreating: bool,
        stk: CallStack<'ir, D>,
        state: D::State,
        dst: Block,
        depths: &Depths<'ir, D>,
    ) {
        let edge = Edge {
            dst,
            src: prev,
            stk,
        };
        let depth = depths.find(&edge).unwrap_or(0);
        let depth = if retreating { depth + 1 } else { depth };
        if depth > self.bound {
            trace!(edge = ?edge, depth, bound = self.bound, "prune");
            return;
        }
        let depths = depths.add(edge.clone(), depth);
        trace!(edge = ?edge, depth, "enqueue");
        self.queue.push(Reverse(Prio { depth, edge }));
        self.waiting.entry(dst).or_default().push((state, depths));
    }

    /// Dequeue the lowest-depth edge, draining and joining every state
    /// waiting at its destination block. Returns `None` when the frontier
    /// is exhausted.
    pub fn pop(
        &mut self,
        dom: &D,
    ) -> Option<(CallStack<'ir, D>, D::State, Block, Depths<'ir, D>)> {
        while let Some(Reverse(Prio { depth, edge })) = self.queue.pop() {
            let Some(entries) = self.waiting.remove(&edge.dst) else {
                continue;
            };
            let mut entries = entries.into_iter();
            let (mut state, mut depths) = entries.next()?;
            let mut joined = 0usize;
            for (other_state, other_depths) in entries {
                state = dom.join(&state, &other_state);
                depths = depths.join(&other_depths);
                joined += 1;
            }
            trace!(edge = ?edge, depth, joined, "dequeue");
            return Some((edge.stk, state, edge.dst, depths));
        }
        None
    }
}
