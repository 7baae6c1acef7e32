// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
use bramble_geom::Aabb;

use super::{BoundingVolumeTree, Node, NodeId, NodeKind};
use crate::entry::Entry;

impl<E: Entry> BoundingVolumeTree<E> {
    /// Inserts a detached `leaf` into the subtree rooted at `subtree` and
    /// returns the subtree's (possibly new) root.
    ///
    /// Visited internal nodes absorb the leaf's box on the way down. The
    /// highest node on the insertion path whose larger child holds too many
    /// leaves is then re-split. The tree root is only touched when that node
    /// is the tree root; callers relink the returned node.
    pub(super) fn insert_leaf(&mut self, leaf: NodeId, subtree: Option<NodeId>) -> NodeId {
        let Some(top) = subtree else {
            self.node_mut(leaf).parent = None;
            return leaf;
        };
        let aabb = self.node(leaf).aabb;
        let active = self.node(leaf).active;
        let growth = self.tunables.growth_factor;

        let mut current = top;
        while let Some(children) = self.absorb(current, &aabb, active) {
            current = self.choose_child(children, &aabb);
        }

        // `current` is a leaf: pair it with the new one under a fresh node.
        let parent = self.node(current).parent;
        let merged = self.node(current).aabb.union(&aabb);
        let volume = merged.volume();
        let internal = NodeId(self.nodes.take(Node {
            aabb: merged,
            parent,
            active: active || self.node(current).active,
            kind: NodeKind::Internal {
                children: [current, leaf],
                volume,
                max_volume: volume * growth,
                leaf_count: 2,
            },
        }));
        self.node_mut(current).parent = Some(internal);
        self.node_mut(leaf).parent = Some(internal);
        let top = match parent {
            None => internal,
            Some(p) => {
                self.link_child(p, current, internal);
                top
            }
        };
        self.rebalance_path(internal, top)
    }

    /// Grows internal node `id` to cover `aabb`; returns its children, or
    /// `None` if `id` is a leaf.
    fn absorb(&mut self, id: NodeId, aabb: &Aabb, active: bool) -> Option<[NodeId; 2]> {
        let growth = self.tunables.growth_factor;
        let node = self.node_mut(id);
        let NodeKind::Internal { children, volume, max_volume, leaf_count } = &mut node.kind else {
            return None;
        };
        node.aabb = node.aabb.union(aabb);
        *volume = node.aabb.volume();
        // Growth from insertion raises the threshold instead of forcing a
        // rebuild on the next refit.
        *max_volume = (*max_volume).max(*volume * growth);
        *leaf_count += 1;
        node.active |= active;
        Some(*children)
    }

    /// Child whose box grows least when merged with `aabb`. Ties go to the
    /// smaller merged volume, then to the smaller margin growth (the only
    /// signal left when every box is flat), then to the first child.
    fn choose_child(&self, [c0, c1]: [NodeId; 2], aabb: &Aabb) -> NodeId {
        let cost = |child: NodeId| {
            let current = self.node(child).aabb;
            let merged = current.union(aabb);
            (merged.volume() - current.volume(), merged.volume(), merged.margin() - current.margin())
        };
        let (growth0, merged0, margin0) = cost(c0);
        let (growth1, merged1, margin1) = cost(c1);
        let order = growth1
            .total_cmp(&growth0)
            .then(merged1.total_cmp(&merged0))
            .then(margin1.total_cmp(&margin0));
        if order.is_lt() {
            c1
        } else {
            c0
        }
    }
}
