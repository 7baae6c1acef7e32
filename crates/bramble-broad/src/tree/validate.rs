// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Structural invariant checks, used by tests and debug tooling.

use thiserror::Error;

use super::{BoundingVolumeTree, NodeId, Visit};
use crate::entry::{Entry, EntryId};

/// First structural invariant found broken.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvariantViolation {
    /// A child's parent link does not point back at its parent.
    #[error("node {child} does not link back to parent {parent}")]
    ParentLink {
        /// Parent arena slot.
        parent: usize,
        /// Child arena slot.
        child: usize,
    },
    /// An internal node's box does not contain a child's box.
    #[error("node {parent} does not contain child {child}")]
    Containment {
        /// Parent arena slot.
        parent: usize,
        /// Child arena slot.
        child: usize,
    },
    /// Cached leaf count disagrees with the leaves below.
    #[error("node {node} caches {cached} leaves but holds {actual}")]
    LeafCount {
        /// Arena slot.
        node: usize,
        /// Cached count.
        cached: usize,
        /// Counted leaves.
        actual: usize,
    },
    /// An internal node's box is larger than the union of its children.
    #[error("node {0} is not the tight union of its children")]
    Loose(usize),
    /// The id map and the tree disagree about an entry.
    #[error("leaf map is out of sync for entry {0}")]
    LeafMap(EntryId),
    /// Arena holds nodes unreachable from the root.
    #[error("{reachable} nodes reachable, {allocated} allocated")]
    Orphans {
        /// Nodes reached from the root.
        reachable: usize,
        /// Nodes allocated in the arena.
        allocated: usize,
    },
}

impl<E: Entry> BoundingVolumeTree<E> {
    /// Checks links, containment, cached leaf counts and the id map.
    ///
    /// Containment holds after any refit and after inserts; removals may
    /// leave boxes loose until the next refit, which is still containment.
    ///
    /// # Errors
    /// The first violation found.
    pub fn validate(&self) -> Result<(), InvariantViolation> {
        let Some(root) = self.root else {
            return self.check_reachable(0);
        };
        if self.node(root).parent.is_some() {
            return Err(InvariantViolation::ParentLink { parent: usize::MAX, child: root.0 });
        }
        let reachable = self.count_leaves(root)?;
        self.check_reachable(reachable)?;
        for (&id, &leaf) in &self.leaves {
            match self.entry_of(leaf) {
                Some(entry) if entry.id() == id => {}
                _ => return Err(InvariantViolation::LeafMap(id)),
            }
        }
        Ok(())
    }

    fn check_reachable(&self, reachable: usize) -> Result<(), InvariantViolation> {
        let allocated = self.nodes.outstanding();
        if reachable == allocated {
            Ok(())
        } else {
            Err(InvariantViolation::Orphans { reachable, allocated })
        }
    }

    /// Like [`Self::validate`], and additionally requires every internal
    /// box to equal the union of its children's boxes, as a refit leaves it.
    ///
    /// # Errors
    /// The first violation found.
    pub fn validate_tight(&self) -> Result<(), InvariantViolation> {
        self.validate()?;
        for (slot, node) in self.nodes.iter() {
            let Some([c0, c1]) = node.children() else { continue };
            if node.aabb != self.node(c0).aabb.union(&self.node(c1).aabb) {
                return Err(InvariantViolation::Loose(slot));
            }
        }
        Ok(())
    }

    /// Post-order walk from `root` checking links, containment and cached
    /// leaf counts. Returns the number of nodes reached.
    fn count_leaves(&self, root: NodeId) -> Result<usize, InvariantViolation> {
        let mut reachable = 0;
        let mut visits = vec![Visit::Enter(root)];
        let mut counts: Vec<usize> = Vec::new();
        while let Some(visit) = visits.pop() {
            match visit {
                Visit::Enter(id) => {
                    reachable += 1;
                    let node = self.node(id);
                    let Some(children) = node.children() else {
                        counts.push(1);
                        continue;
                    };
                    for child in children {
                        let child_node = self.node(child);
                        if child_node.parent != Some(id) {
                            return Err(InvariantViolation::ParentLink { parent: id.0, child: child.0 });
                        }
                        if !node.aabb.contains(&child_node.aabb) {
                            return Err(InvariantViolation::Containment { parent: id.0, child: child.0 });
                        }
                    }
                    visits.push(Visit::Exit(id));
                    visits.push(Visit::Enter(children[1]));
                    visits.push(Visit::Enter(children[0]));
                }
                Visit::Exit(id) => {
                    let actual = counts.pop().unwrap_or(0) + counts.pop().unwrap_or(0);
                    let cached = self.node(id).leaf_count();
                    if actual != cached {
                        return Err(InvariantViolation::LeafCount { node: id.0, cached, actual });
                    }
                    counts.push(actual);
                }
            }
        }
        Ok(reachable)
    }
}
