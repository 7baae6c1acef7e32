// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
use std::sync::Arc;

use bramble_geom::Ray;

use super::{BoundingVolumeTree, NodeKind};
use crate::entry::Entry;
use crate::query::{sort_hits, QueryVolume, RayHit};

impl<E: Entry> BoundingVolumeTree<E> {
    /// Appends entries whose cached box the ray enters within `max_length`.
    pub fn ray_cast(&self, ray: &Ray, max_length: Option<f32>, hits: &mut Vec<RayHit<E>>) {
        let Some(root) = self.root else { return };
        let limit = max_length.unwrap_or(f32::INFINITY);
        let first = hits.len();
        let mut stack = self.scratch.nodes.take(64);
        stack.push(root);
        while let Some(id) = stack.pop() {
            let node = self.node(id);
            let Some(distance) = node.aabb.ray_entry(ray, limit) else { continue };
            match &node.kind {
                NodeKind::Leaf { entry } => hits.push(RayHit { entry: Arc::clone(entry), distance }),
                NodeKind::Internal { children, .. } => stack.extend_from_slice(children),
            }
        }
        self.scratch.nodes.give_back(stack);
        sort_hits(&mut hits[first..]);
    }

    /// Appends entries whose cached box intersects `volume`, ordered by id.
    pub fn query(&self, volume: &QueryVolume, out: &mut Vec<Arc<E>>) {
        let Some(root) = self.root else { return };
        let first = out.len();
        let mut stack = self.scratch.nodes.take(64);
        stack.push(root);
        while let Some(id) = stack.pop() {
            let node = self.node(id);
            if !volume.intersects(&node.aabb) {
                continue;
            }
            match &node.kind {
                NodeKind::Leaf { entry } => out.push(Arc::clone(entry)),
                NodeKind::Internal { children, .. } => stack.extend_from_slice(children),
            }
        }
        self.scratch.nodes.give_back(stack);
        out[first..].sort_by_key(|entry| entry.id());
    }
}
