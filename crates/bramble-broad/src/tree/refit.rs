// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Bottom-up box maintenance.
//!
//! Subtrees are refit into record buffers without touching the arena, so
//! disjoint subtrees can be refit by worker tasks concurrently. Records are
//! applied on the caller thread; the nodes above the task frontier are then
//! refit serially from their already-updated children.

use bramble_geom::Aabb;
use bramble_looper::ParallelLooper;
use parking_lot::Mutex;

use super::{BoundingVolumeTree, NodeId, NodeKind};
use crate::entry::Entry;

#[derive(Debug, Clone, Copy)]
pub(super) enum Visit {
    Enter(NodeId),
    Exit(NodeId),
}

#[derive(Debug, Clone, Copy)]
pub(super) struct RefitRecord {
    node: NodeId,
    aabb: Aabb,
    active: bool,
    outgrown: bool,
}

/// Counters from one refit pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefitStats {
    /// Nodes whose box was recomputed.
    pub refits: usize,
    /// Subtrees rebuilt for outgrowing their threshold.
    pub revalidations: usize,
    /// Worker tasks scheduled (0 on the serial path).
    pub tasks: usize,
}

impl<E: Entry> BoundingVolumeTree<E> {
    /// Refits every node on the caller thread, then revalidates outgrown
    /// subtrees.
    pub fn refit(&mut self) -> RefitStats {
        let Some(root) = self.root else {
            return RefitStats::default();
        };
        let mut records = self.scratch.records.take(self.nodes.outstanding());
        self.refit_subtree(root, &mut records);
        let refits = records.len();
        let mut outgrown = self.scratch.nodes.take(16);
        self.apply_records(&records, &mut outgrown);
        self.scratch.records.give_back(records);
        let revalidations = self.revalidate_all(&outgrown);
        self.scratch.nodes.give_back(outgrown);
        RefitStats { refits, revalidations, tasks: 0 }
    }

    /// Refits the tree with one looper task per maximal subtree holding
    /// fewer than `task_size` leaves, then revalidates on the caller thread.
    ///
    /// Produces the same boxes and the same tree shape as [`Self::refit`].
    pub fn refit_parallel(&mut self, looper: &mut ParallelLooper, task_size: usize) -> RefitStats {
        let Some(root) = self.root else {
            return RefitStats::default();
        };
        let mut frontier = self.scratch.nodes.take(64);
        let mut upper = self.scratch.nodes.take(64);
        self.partition(root, task_size.max(1), &mut frontier, &mut upper);

        let slots: Vec<Mutex<Option<Vec<RefitRecord>>>> =
            frontier.iter().map(|_| Mutex::new(None)).collect();
        {
            let tree = &*self;
            let tasks = &frontier;
            let slots = &slots;
            looper.for_loop(0, tasks.len(), |i| {
                let task = tasks[i];
                let mut records = tree.scratch.records.take(tree.node(task).leaf_count() * 2);
                tree.refit_subtree(task, &mut records);
                *slots[i].lock() = Some(records);
            });
        }

        let mut refits = 0;
        let mut outgrown = self.scratch.nodes.take(16);
        for slot in slots {
            if let Some(records) = slot.into_inner() {
                refits += records.len();
                self.apply_records(&records, &mut outgrown);
                self.scratch.records.give_back(records);
            }
        }
        // Reverse pre-order visits every child before its parent.
        for &node in upper.iter().rev() {
            self.refit_internal(node, &mut outgrown);
            refits += 1;
        }
        let tasks = frontier.len();
        self.scratch.nodes.give_back(frontier);
        self.scratch.nodes.give_back(upper);

        let revalidations = self.revalidate_all(&outgrown);
        self.scratch.nodes.give_back(outgrown);
        RefitStats { refits, revalidations, tasks }
    }

    /// Splits the tree into task roots (subtrees under `task_size` leaves)
    /// and the internal nodes above them, the latter in pre-order.
    fn partition(
        &self,
        root: NodeId,
        task_size: usize,
        frontier: &mut Vec<NodeId>,
        upper: &mut Vec<NodeId>,
    ) {
        let mut stack = self.scratch.nodes.take(64);
        stack.push(root);
        while let Some(id) = stack.pop() {
            let node = self.node(id);
            match node.children() {
                Some([c0, c1]) if node.leaf_count() >= task_size => {
                    upper.push(id);
                    stack.push(c1);
                    stack.push(c0);
                }
                _ => frontier.push(id),
            }
        }
        self.scratch.nodes.give_back(stack);
    }

    /// Post-order refit of the subtree at `root` into `records`, reading
    /// boxes from entries and leaving the arena untouched.
    fn refit_subtree(&self, root: NodeId, records: &mut Vec<RefitRecord>) {
        let mut visits = self.scratch.visits.take(64);
        let mut values = self.scratch.values.take(64);
        visits.push(Visit::Enter(root));
        while let Some(visit) = visits.pop() {
            match visit {
                Visit::Enter(id) => match &self.node(id).kind {
                    NodeKind::Leaf { entry } => {
                        let aabb = entry.bounding_box();
                        let active = entry.is_active();
                        records.push(RefitRecord { node: id, aabb, active, outgrown: false });
                        values.push((aabb, active));
                    }
                    NodeKind::Internal { children: [c0, c1], .. } => {
                        visits.push(Visit::Exit(id));
                        visits.push(Visit::Enter(*c1));
                        visits.push(Visit::Enter(*c0));
                    }
                },
                Visit::Exit(id) => {
                    let (Some((b1, a1)), Some((b0, a0))) = (values.pop(), values.pop()) else {
                        continue;
                    };
                    let aabb = b0.union(&b1);
                    let active = a0 || a1;
                    let outgrown = match self.node(id).kind {
                        NodeKind::Internal { max_volume, .. } => aabb.volume() > max_volume,
                        NodeKind::Leaf { .. } => false,
                    };
                    records.push(RefitRecord { node: id, aabb, active, outgrown });
                    values.push((aabb, active));
                }
            }
        }
        self.scratch.visits.give_back(visits);
        self.scratch.values.give_back(values);
    }

    fn apply_records(&mut self, records: &[RefitRecord], outgrown: &mut Vec<NodeId>) {
        for record in records {
            let node = self.node_mut(record.node);
            node.aabb = record.aabb;
            node.active = record.active;
            if let NodeKind::Internal { volume, .. } = &mut node.kind {
                *volume = record.aabb.volume();
            }
            if record.outgrown {
                outgrown.push(record.node);
            }
        }
    }

    /// Recomputes internal node `id` from its children's current boxes.
    fn refit_internal(&mut self, id: NodeId, outgrown: &mut Vec<NodeId>) {
        let Some([c0, c1]) = self.node(id).children() else { return };
        let aabb = self.node(c0).aabb.union(&self.node(c1).aabb);
        let active = self.node(c0).active || self.node(c1).active;
        let node = self.node_mut(id);
        node.aabb = aabb;
        node.active = active;
        if let NodeKind::Internal { volume, max_volume, .. } = &mut node.kind {
            *volume = aabb.volume();
            if *volume > *max_volume {
                outgrown.push(id);
            }
        }
    }
}
