// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Self-overlap traversal.
//!
//! A work item is a pair of nodes. `(n, n)` stands for "all pairs inside
//! `n`" and expands to both children against themselves plus the children
//! against each other. A distinct pair is pruned when neither side has an
//! active descendant or the boxes are disjoint; otherwise the larger node
//! (or the only internal one) is split. Every unordered leaf pair is reached
//! exactly once.

use std::mem;

use bramble_looper::ParallelLooper;
use parking_lot::Mutex;

use super::{BoundingVolumeTree, NodeId};
use crate::entry::Entry;
use crate::pair::{try_to_add_overlap, OverlapPair, PairFilter};

/// Counters from one overlap traversal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TraversalStats {
    /// Node pairs taken off the work stack.
    pub visited: usize,
    /// Leaf pairs with overlapping boxes handed to collision rules.
    pub candidates: usize,
    /// Worker tasks scheduled (0 on the serial path).
    pub tasks: usize,
}

impl TraversalStats {
    fn absorb(&mut self, other: &Self) {
        self.visited += other.visited;
        self.candidates += other.candidates;
    }
}

enum Step {
    Pruned,
    Leaves,
    Expanded,
}

impl<E: Entry> BoundingVolumeTree<E> {
    /// Appends every admitted overlapping pair to `out` and sorts `out`.
    pub fn collect_overlaps(
        &self,
        filter: Option<&PairFilter<E>>,
        out: &mut Vec<OverlapPair>,
    ) -> TraversalStats {
        let mut stats = TraversalStats::default();
        if let Some(root) = self.root {
            self.traverse((root, root), filter, out, &mut stats);
        }
        out.sort_unstable();
        stats
    }

    /// Parallel [`Self::collect_overlaps`]: the root work item is expanded
    /// breadth-first until there are enough items to keep every worker busy,
    /// then each item is traversed by a looper task into its own buffer.
    ///
    /// The sorted output is identical to the serial traversal.
    pub fn collect_overlaps_parallel(
        &self,
        looper: &mut ParallelLooper,
        filter: Option<&PairFilter<E>>,
        out: &mut Vec<OverlapPair>,
    ) -> TraversalStats {
        let mut stats = TraversalStats::default();
        let Some(root) = self.root else {
            return stats;
        };
        let target = looper.worker_count().max(1) * looper.config().min_chunks_per_worker;
        let mut tasks = self.scratch.node_pairs.take(target * 2);
        let mut next = self.scratch.node_pairs.take(target * 2);
        tasks.push((root, root));
        while !tasks.is_empty() && tasks.len() < target {
            for &(x, y) in &tasks {
                stats.visited += 1;
                if let Step::Leaves = self.step(x, y, &mut next) {
                    stats.candidates += 1;
                    self.admit(x, y, filter, out);
                }
            }
            tasks.clear();
            mem::swap(&mut tasks, &mut next);
        }
        self.scratch.node_pairs.give_back(next);

        let slots: Vec<Mutex<Option<(Vec<OverlapPair>, TraversalStats)>>> =
            tasks.iter().map(|_| Mutex::new(None)).collect();
        {
            let work = &tasks;
            let slots = &slots;
            looper.for_loop(0, work.len(), |i| {
                let mut pairs = self.scratch.pairs.take(16);
                let mut local = TraversalStats::default();
                self.traverse(work[i], filter, &mut pairs, &mut local);
                *slots[i].lock() = Some((pairs, local));
            });
        }
        stats.tasks = tasks.len();
        self.scratch.node_pairs.give_back(tasks);
        for slot in slots {
            if let Some((pairs, local)) = slot.into_inner() {
                out.extend_from_slice(&pairs);
                stats.absorb(&local);
                self.scratch.pairs.give_back(pairs);
            }
        }
        out.sort_unstable();
        stats
    }

    fn traverse(
        &self,
        seed: (NodeId, NodeId),
        filter: Option<&PairFilter<E>>,
        out: &mut Vec<OverlapPair>,
        stats: &mut TraversalStats,
    ) {
        let mut pending = self.scratch.node_pairs.take(64);
        pending.push(seed);
        while let Some((x, y)) = pending.pop() {
            stats.visited += 1;
            if let Step::Leaves = self.step(x, y, &mut pending) {
                stats.candidates += 1;
                self.admit(x, y, filter, out);
            }
        }
        self.scratch.node_pairs.give_back(pending);
    }

    /// Expands one work item into `pending`.
    fn step(&self, x: NodeId, y: NodeId, pending: &mut Vec<(NodeId, NodeId)>) -> Step {
        let nx = self.node(x);
        if x == y {
            return match nx.children() {
                Some([c0, c1]) if nx.active => {
                    pending.push((c0, c1));
                    pending.push((c1, c1));
                    pending.push((c0, c0));
                    Step::Expanded
                }
                _ => Step::Pruned,
            };
        }
        let ny = self.node(y);
        if !(nx.active || ny.active) || !nx.aabb.overlaps(&ny.aabb) {
            return Step::Pruned;
        }
        match (nx.children(), ny.children()) {
            (None, None) => return Step::Leaves,
            (None, Some([c0, c1])) => {
                pending.push((x, c1));
                pending.push((x, c0));
            }
            (Some([c0, c1]), None) => {
                pending.push((c1, y));
                pending.push((c0, y));
            }
            (Some([x0, x1]), Some([y0, y1])) => {
                if nx.volume() >= ny.volume() {
                    pending.push((x1, y));
                    pending.push((x0, y));
                } else {
                    pending.push((x, y1));
                    pending.push((x, y0));
                }
            }
        }
        Step::Expanded
    }

    fn admit(&self, x: NodeId, y: NodeId, filter: Option<&PairFilter<E>>, out: &mut Vec<OverlapPair>) {
        if let (Some(a), Some(b)) = (self.entry_of(x), self.entry_of(y)) {
            try_to_add_overlap(a.as_ref(), b.as_ref(), filter, out);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use bramble_geom::{Aabb, Vec3};

    use crate::entry::{BoxProxy, EntryId};
    use crate::pair::OverlapPair;
    use crate::tree::BoundingVolumeTree;

    fn cube(id: u64, x: f32) -> Arc<BoxProxy> {
        Arc::new(BoxProxy::new(id, Aabb::from_center_half_extents(Vec3::new(x, 0.0, 0.0), 0.5, 0.5, 0.5)))
    }

    #[test]
    fn chain_of_touching_cubes_pairs_neighbours() {
        let mut tree = BoundingVolumeTree::default();
        for i in 0..6_u64 {
            assert!(tree.insert(cube(i, i as f32)).is_ok());
        }
        let mut out = Vec::new();
        let stats = tree.collect_overlaps(None, &mut out);
        let expected: Vec<_> = (0..5_u64).map(|i| OverlapPair { a: EntryId(i), b: EntryId(i + 1) }).collect();
        assert_eq!(out, expected);
        assert_eq!(stats.candidates, 5);
    }

    #[test]
    fn sleeping_pairs_are_skipped() {
        let mut tree = BoundingVolumeTree::default();
        let a = cube(1, 0.0);
        let b = cube(2, 0.5);
        a.set_active(false);
        b.set_active(false);
        assert!(tree.insert(a).is_ok());
        assert!(tree.insert(b).is_ok());
        let mut out = Vec::new();
        tree.collect_overlaps(None, &mut out);
        assert!(out.is_empty());
    }
}
