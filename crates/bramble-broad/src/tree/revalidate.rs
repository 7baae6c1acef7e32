// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Subtree rebuilds for nodes that outgrew their volume threshold.

use bramble_geom::Aabb;
use tracing::debug;

use super::{BoundingVolumeTree, Node, NodeId, NodeKind};
use crate::entry::Entry;

impl<E: Entry> BoundingVolumeTree<E> {
    /// Rebuilds each outgrown node, descendants first. Returns the count.
    pub(super) fn revalidate_all(&mut self, outgrown: &[NodeId]) -> usize {
        for &node in outgrown {
            self.rebuild(node);
        }
        outgrown.len()
    }

    /// Replaces the subtree at `node` with one built by re-inserting its
    /// leaves in traversal order, then re-splits lopsided nodes.
    fn rebuild(&mut self, node: NodeId) {
        let parent = self.node(node).parent;
        let mut leaves = self.scratch.nodes.take(self.node(node).leaf_count());
        self.release_subtree(node, &mut leaves);
        if parent.is_none() {
            self.root = None;
        }
        debug!(node = node.index(), leaves = leaves.len(), "revalidating subtree");
        if let Some(rebuilt) = self.build_detached(&leaves) {
            self.replace_child(parent, node, rebuilt);
            self.enforce_population(rebuilt);
        }
        self.scratch.nodes.give_back(leaves);
    }

    /// Frees every internal node under (and including) `node` and collects
    /// the leaves left to right.
    fn release_subtree(&mut self, node: NodeId, leaves: &mut Vec<NodeId>) {
        let mut stack = self.scratch.nodes.take(64);
        stack.push(node);
        while let Some(id) = stack.pop() {
            if let Some([c0, c1]) = self.node(id).children() {
                stack.push(c1);
                stack.push(c0);
                self.nodes.give_back(id.0);
            } else {
                leaves.push(id);
            }
        }
        self.scratch.nodes.give_back(stack);
    }

    /// Inserts `leaves` into a fresh detached subtree and resets its
    /// thresholds. Returns its root, or `None` for no leaves.
    fn build_detached(&mut self, leaves: &[NodeId]) -> Option<NodeId> {
        let mut root = None;
        for &leaf in leaves {
            self.node_mut(leaf).parent = None;
            root = Some(self.insert_leaf(leaf, root));
        }
        let root = root?;
        self.reset_thresholds(root);
        Some(root)
    }

    fn reset_thresholds(&mut self, root: NodeId) {
        let growth = self.tunables.growth_factor;
        let mut stack = self.scratch.nodes.take(64);
        stack.push(root);
        while let Some(id) = stack.pop() {
            let node = self.node_mut(id);
            let aabb = node.aabb;
            if let NodeKind::Internal { children, volume, max_volume, .. } = &mut node.kind {
                *volume = aabb.volume();
                *max_volume = *volume * growth;
                stack.extend_from_slice(children);
            }
        }
        self.scratch.nodes.give_back(stack);
    }

    /// Internal node with at least `2 × min_leaf_occupancy` leaves whose
    /// larger child holds more than the allowed share of them.
    fn is_lopsided(&self, id: NodeId) -> bool {
        let node = self.node(id);
        let Some([c0, c1]) = node.children() else { return false };
        let total = node.leaf_count();
        let larger = self.node(c0).leaf_count().max(self.node(c1).leaf_count());
        #[allow(clippy::cast_precision_loss)]
        let share = larger as f32 / total as f32;
        total >= 2 * self.tunables.min_leaf_occupancy && share > self.tunables.max_child_population_fraction
    }

    /// Re-splits the highest lopsided node on the parent chain from `from`
    /// up to `top`. Returns `top`, or its replacement if it was re-split.
    pub(super) fn rebalance_path(&mut self, from: NodeId, top: NodeId) -> NodeId {
        let mut highest = None;
        let mut cursor = Some(from);
        while let Some(id) = cursor {
            if self.is_lopsided(id) {
                highest = Some(id);
            }
            if id == top {
                break;
            }
            cursor = self.node(id).parent;
        }
        match highest {
            Some(node) if node == top => self.resplit(node),
            Some(node) => {
                self.resplit(node);
                top
            }
            None => top,
        }
    }

    /// Re-splits every node under `root` whose larger child holds more than
    /// the allowed share of its leaves.
    fn enforce_population(&mut self, root: NodeId) {
        let mut stack = self.scratch.nodes.take(64);
        stack.push(root);
        while let Some(id) = stack.pop() {
            if self.is_lopsided(id) {
                self.resplit(id);
            } else if let Some([c0, c1]) = self.node(id).children() {
                stack.push(c1);
                stack.push(c0);
            }
        }
        self.scratch.nodes.give_back(stack);
    }

    /// Replaces the subtree at `node` with a median-split rebuild of its
    /// leaves and links it where `node` was. Returns the new subtree root.
    fn resplit(&mut self, node: NodeId) -> NodeId {
        let parent = self.node(node).parent;
        let was_root = self.root == Some(node);
        let mut leaves = self.scratch.nodes.take(self.node(node).leaf_count());
        self.release_subtree(node, &mut leaves);
        let split = self.build_split(&mut leaves);
        self.scratch.nodes.give_back(leaves);
        let Some(split) = split else { return node };
        self.node_mut(split).parent = parent;
        match parent {
            Some(p) => self.link_child(p, node, split),
            None if was_root => self.root = Some(split),
            None => {}
        }
        split
    }

    /// Median partition of `leaves` by center along the longest axis of the
    /// center bounds, recursing until a part is too small to be lopsided.
    /// Small parts are built by insertion.
    fn build_split(&mut self, leaves: &mut [NodeId]) -> Option<NodeId> {
        if leaves.len() < (2 * self.tunables.min_leaf_occupancy).max(2) {
            return self.build_detached(leaves);
        }
        let mut centers = leaves.iter().map(|&leaf| {
            let c = self.node(leaf).aabb.center();
            Aabb::new(c, c)
        });
        let spread = centers.next().map(|first| centers.fold(first, |acc, c| acc.union(&c)));
        let axis = spread.map_or(0, |s| s.longest_axis());
        leaves.sort_by(|&a, &b| {
            let ca = self.node(a).aabb.center().axis(axis);
            let cb = self.node(b).aabb.center().axis(axis);
            ca.total_cmp(&cb).then_with(|| self.leaf_id(a).cmp(&self.leaf_id(b)))
        });

        let (lower, upper) = leaves.split_at_mut(leaves.len() / 2);
        let left = self.build_split(lower)?;
        let right = self.build_split(upper)?;
        let aabb = self.node(left).aabb.union(&self.node(right).aabb);
        let volume = aabb.volume();
        let split = NodeId(self.nodes.take(Node {
            aabb,
            parent: None,
            active: self.node(left).active || self.node(right).active,
            kind: NodeKind::Internal {
                children: [left, right],
                volume,
                max_volume: volume * self.tunables.growth_factor,
                leaf_count: self.node(left).leaf_count() + self.node(right).leaf_count(),
            },
        }));
        self.node_mut(left).parent = Some(split);
        self.node_mut(right).parent = Some(split);
        Some(split)
    }

    fn leaf_id(&self, leaf: NodeId) -> Option<crate::entry::EntryId> {
        self.entry_of(leaf).map(|entry| entry.id())
    }
}
