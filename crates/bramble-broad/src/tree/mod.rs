// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Incremental bounding volume tree.
//!
//! Binary tree of AABBs stored in an [`ObjectPool`] arena: leaves reference
//! entries, internal nodes cache the union of their children, a volume, a
//! revalidation threshold and a leaf count. Parent links are arena indices.
//!
//! Per-step maintenance is refit (recompute boxes bottom-up) followed by
//! revalidation (rebuild subtrees that grew past their threshold). Overlap
//! collection is a dual traversal of the tree against itself.

use std::sync::Arc;

use bramble_geom::Aabb;
use bramble_pool::{LockingBufferPool, ObjectPool};
use rustc_hash::FxHashMap;

use crate::config::BroadPhaseConfig;
use crate::entry::{Entry, EntryId};
use crate::error::BroadPhaseError;
use crate::pair::OverlapPair;

mod insert;
mod overlap;
mod query;
mod refit;
mod revalidate;
mod validate;

pub use overlap::TraversalStats;
pub use refit::RefitStats;
pub use validate::InvariantViolation;

use refit::{RefitRecord, Visit};

/// Arena index of a tree node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(usize);

impl NodeId {
    /// Raw arena slot.
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug)]
struct Node<E> {
    aabb: Aabb,
    parent: Option<NodeId>,
    /// Leaf: entry activity. Internal: any descendant active.
    active: bool,
    kind: NodeKind<E>,
}

#[derive(Debug)]
enum NodeKind<E> {
    Leaf {
        entry: Arc<E>,
    },
    Internal {
        children: [NodeId; 2],
        volume: f32,
        max_volume: f32,
        leaf_count: usize,
    },
}

impl<E> Node<E> {
    fn leaf_count(&self) -> usize {
        match self.kind {
            NodeKind::Leaf { .. } => 1,
            NodeKind::Internal { leaf_count, .. } => leaf_count,
        }
    }

    fn volume(&self) -> f32 {
        match self.kind {
            NodeKind::Leaf { .. } => self.aabb.volume(),
            NodeKind::Internal { volume, .. } => volume,
        }
    }

    fn children(&self) -> Option<[NodeId; 2]> {
        match self.kind {
            NodeKind::Leaf { .. } => None,
            NodeKind::Internal { children, .. } => Some(children),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Tunables {
    growth_factor: f32,
    max_child_population_fraction: f32,
    min_leaf_occupancy: usize,
}

impl From<&BroadPhaseConfig> for Tunables {
    fn from(config: &BroadPhaseConfig) -> Self {
        Self {
            growth_factor: config.growth_factor,
            max_child_population_fraction: config.max_child_population_fraction,
            min_leaf_occupancy: config.min_leaf_occupancy,
        }
    }
}

/// Scratch buffers shared by the caller thread and worker tasks.
#[derive(Debug, Default)]
struct Scratch {
    nodes: LockingBufferPool<NodeId>,
    visits: LockingBufferPool<Visit>,
    values: LockingBufferPool<(Aabb, bool)>,
    records: LockingBufferPool<RefitRecord>,
    node_pairs: LockingBufferPool<(NodeId, NodeId)>,
    pairs: LockingBufferPool<OverlapPair>,
}

/// Incremental AABB tree over shared entries.
#[derive(Debug)]
pub struct BoundingVolumeTree<E> {
    nodes: ObjectPool<Node<E>>,
    root: Option<NodeId>,
    leaves: FxHashMap<EntryId, NodeId>,
    tunables: Tunables,
    scratch: Scratch,
}

impl<E: Entry> Default for BoundingVolumeTree<E> {
    fn default() -> Self {
        Self::new(&BroadPhaseConfig::default())
    }
}

impl<E: Entry> BoundingVolumeTree<E> {
    /// Creates an empty tree using the tree tunables of `config`.
    pub fn new(config: &BroadPhaseConfig) -> Self {
        Self {
            nodes: ObjectPool::new(),
            root: None,
            leaves: FxHashMap::default(),
            tunables: Tunables::from(config),
            scratch: Scratch::default(),
        }
    }

    /// Number of entries (leaves).
    pub fn len(&self) -> usize {
        self.leaves.len()
    }

    /// Returns `true` if the tree holds no entries.
    pub fn is_empty(&self) -> bool {
        self.leaves.is_empty()
    }

    /// Live arena nodes, leaves and internal nodes together.
    pub fn node_count(&self) -> usize {
        self.nodes.outstanding()
    }

    /// Root node, if any.
    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    /// Box of the root node as of the last refit.
    pub fn root_bounds(&self) -> Option<Aabb> {
        self.root.map(|root| self.node(root).aabb)
    }

    /// Returns `true` if an entry with `id` is in the tree.
    pub fn contains(&self, id: EntryId) -> bool {
        self.leaves.contains_key(&id)
    }

    /// Entry stored under `id`.
    pub fn entry(&self, id: EntryId) -> Option<&Arc<E>> {
        let leaf = self.leaves.get(&id)?;
        match &self.node(*leaf).kind {
            NodeKind::Leaf { entry } => Some(entry),
            NodeKind::Internal { .. } => None,
        }
    }

    /// Iterates stored entries in unspecified order.
    pub fn entries(&self) -> impl Iterator<Item = &Arc<E>> + '_ {
        self.leaves.values().filter_map(|leaf| match &self.node(*leaf).kind {
            NodeKind::Leaf { entry } => Some(entry),
            NodeKind::Internal { .. } => None,
        })
    }

    /// Height of the tree: 0 when empty, 1 for a lone leaf.
    pub fn depth(&self) -> usize {
        let Some(root) = self.root else { return 0 };
        let mut deepest = 0;
        let mut stack = vec![(root, 1_usize)];
        while let Some((node, depth)) = stack.pop() {
            deepest = deepest.max(depth);
            if let Some([c0, c1]) = self.node(node).children() {
                stack.push((c0, depth + 1));
                stack.push((c1, depth + 1));
            }
        }
        deepest
    }

    /// Adds an entry as a new leaf, descending by least volume growth.
    ///
    /// # Errors
    /// [`BroadPhaseError::DuplicateEntry`] if the id is already present.
    pub fn insert(&mut self, entry: Arc<E>) -> Result<(), BroadPhaseError> {
        let id = entry.id();
        if self.leaves.contains_key(&id) {
            return Err(BroadPhaseError::DuplicateEntry(id));
        }
        let aabb = entry.bounding_box();
        let active = entry.is_active();
        let leaf = NodeId(self.nodes.take(Node {
            aabb,
            parent: None,
            active,
            kind: NodeKind::Leaf { entry },
        }));
        self.leaves.insert(id, leaf);
        self.root = Some(self.insert_leaf(leaf, self.root));
        Ok(())
    }

    /// Removes the entry with `id` and returns it.
    ///
    /// Ancestor leaf counts are corrected immediately and the highest
    /// ancestor left lopsided is re-split; boxes shrink at the next refit.
    ///
    /// # Errors
    /// [`BroadPhaseError::EntryNotFound`] if the id is absent.
    pub fn remove(&mut self, id: EntryId) -> Result<Arc<E>, BroadPhaseError> {
        let leaf = self.leaves.remove(&id).ok_or(BroadPhaseError::EntryNotFound(id))?;
        if let (Some(ancestor), Some(root)) = (self.detach_leaf(leaf), self.root) {
            self.root = Some(self.rebalance_path(ancestor, root));
        }
        match self.nodes.give_back(leaf.0) {
            Some(Node { kind: NodeKind::Leaf { entry }, .. }) => Ok(entry),
            _ => Err(BroadPhaseError::EntryNotFound(id)),
        }
    }

    /// Drops every node and entry.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.leaves.clear();
        self.root = None;
    }

    fn node(&self, id: NodeId) -> &Node<E> {
        &self.nodes[id.0]
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node<E> {
        &mut self.nodes[id.0]
    }

    fn entry_of(&self, id: NodeId) -> Option<&Arc<E>> {
        match &self.node(id).kind {
            NodeKind::Leaf { entry } => Some(entry),
            NodeKind::Internal { .. } => None,
        }
    }

    /// Points `parent`'s link to `old` at `new`, or makes `new` the root.
    fn replace_child(&mut self, parent: Option<NodeId>, old: NodeId, new: NodeId) {
        self.node_mut(new).parent = parent;
        match parent {
            None => self.root = Some(new),
            Some(p) => self.link_child(p, old, new),
        }
    }

    /// Rewrites `parent`'s child slot holding `old` to `new`.
    fn link_child(&mut self, parent: NodeId, old: NodeId, new: NodeId) {
        if let NodeKind::Internal { children, .. } = &mut self.node_mut(parent).kind {
            for child in children.iter_mut().filter(|c| **c == old) {
                *child = new;
            }
        }
    }

    /// Unlinks `leaf` from the tree and frees its parent, promoting the
    /// sibling. The leaf slot itself stays allocated. Returns the nearest
    /// surviving ancestor.
    fn detach_leaf(&mut self, leaf: NodeId) -> Option<NodeId> {
        let Some(parent) = self.node(leaf).parent else {
            self.root = None;
            return None;
        };
        let [c0, c1] = self.node(parent).children()?;
        let sibling = if c0 == leaf { c1 } else { c0 };
        let grandparent = self.node(parent).parent;
        self.replace_child(grandparent, parent, sibling);
        self.nodes.give_back(parent.0);
        self.node_mut(leaf).parent = None;
        let mut cursor = grandparent;
        while let Some(ancestor) = cursor {
            let node = self.node_mut(ancestor);
            if let NodeKind::Internal { leaf_count, .. } = &mut node.kind {
                *leaf_count -= 1;
            }
            cursor = node.parent;
        }
        grandparent
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::BoxProxy;
    use bramble_geom::Vec3;

    fn proxy(id: u64, x: f32) -> Arc<BoxProxy> {
        Arc::new(BoxProxy::new(id, Aabb::from_center_half_extents(Vec3::new(x, 0.0, 0.0), 0.5, 0.5, 0.5)))
    }

    #[test]
    fn insert_and_remove_keep_arena_balanced() {
        let mut tree = BoundingVolumeTree::default();
        for i in 0..10 {
            assert!(tree.insert(proxy(i, i as f32)).is_ok());
        }
        assert_eq!(tree.len(), 10);
        assert_eq!(tree.node_count(), 19);
        for i in 0..10 {
            assert!(tree.remove(EntryId(i)).is_ok());
        }
        assert!(tree.is_empty());
        assert_eq!(tree.node_count(), 0);
        assert_eq!(tree.root(), None);
    }

    #[test]
    fn duplicate_and_missing_ids_are_errors() {
        let mut tree = BoundingVolumeTree::default();
        assert!(tree.insert(proxy(1, 0.0)).is_ok());
        assert!(matches!(tree.insert(proxy(1, 3.0)), Err(BroadPhaseError::DuplicateEntry(EntryId(1)))));
        assert!(matches!(tree.remove(EntryId(2)), Err(BroadPhaseError::EntryNotFound(EntryId(2)))));
    }

    #[test]
    fn removing_collapses_single_child_parent() {
        let mut tree = BoundingVolumeTree::default();
        assert!(tree.insert(proxy(1, 0.0)).is_ok());
        assert!(tree.insert(proxy(2, 5.0)).is_ok());
        assert_eq!(tree.depth(), 2);
        assert!(tree.remove(EntryId(1)).is_ok());
        assert_eq!(tree.depth(), 1);
        assert_eq!(tree.node_count(), 1);
        assert!(tree.validate().is_ok());
    }

    #[test]
    fn draining_one_side_keeps_depth_bounded() {
        let mut tree = BoundingVolumeTree::default();
        for i in 0..128 {
            assert!(tree.insert(proxy(i, i as f32 * 2.0)).is_ok());
        }
        // Strip the low half, leaving whatever held it empty.
        for i in 0..60 {
            assert!(tree.remove(EntryId(i)).is_ok());
            assert!(tree.validate().is_ok());
        }
        assert_eq!(tree.len(), 68);
        assert!(tree.depth() <= 20, "depth {}", tree.depth());
    }
}
