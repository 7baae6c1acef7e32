// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
use std::sync::Arc;

use bramble_geom::Ray;
use parking_lot::{RwLock, RwLockReadGuard};

use super::entry_set::EntrySet;
use super::{BroadPhase, Overlaps};
use crate::entry::{Entry, EntryId};
use crate::error::BroadPhaseError;
use crate::pair::{try_to_add_overlap, OverlapPair, PairFilter};
use crate::query::{sort_hits, QueryAccelerator, QueryVolume, RayHit};
use crate::stats::UpdateStats;

/// `O(n²)` all-pairs broad phase.
///
/// Correctness and determinism baseline for the other strategies: same pair
/// identity, ordering and inclusive face overlap, no acceleration. Answers
/// every query by linear scan.
pub struct BruteForce<E: Entry> {
    state: RwLock<FlatState<E>>,
}

struct FlatState<E> {
    set: EntrySet<E>,
    overlaps: Vec<OverlapPair>,
    filter: Option<PairFilter<E>>,
}

impl<E: Entry> Default for BruteForce<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Entry> BruteForce<E> {
    /// Creates an empty baseline.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: RwLock::new(FlatState { set: EntrySet::default(), overlaps: Vec::new(), filter: None }),
        }
    }
}

impl<E: Entry> BroadPhase<E> for BruteForce<E> {
    fn name(&self) -> &'static str {
        "brute-force"
    }

    fn add(&self, entry: Arc<E>) -> Result<(), BroadPhaseError> {
        self.state.write().set.add(entry)
    }

    fn remove(&self, id: EntryId) -> Result<Arc<E>, BroadPhaseError> {
        self.state.write().set.remove(id)
    }

    fn update(&self) -> UpdateStats {
        let mut guard = self.state.write();
        let state = &mut *guard;
        state.set.refresh();
        state.overlaps.clear();
        let boxes = state.set.boxes();
        let mut pair_tests = 0;
        for i in 0..boxes.len() {
            for j in (i + 1)..boxes.len() {
                if boxes[i].overlaps(&boxes[j]) {
                    pair_tests += 1;
                    try_to_add_overlap(
                        state.set.get(i),
                        state.set.get(j),
                        state.filter.as_ref(),
                        &mut state.overlaps,
                    );
                }
            }
        }
        state.overlaps.sort_unstable();
        UpdateStats {
            entries: state.set.len(),
            refits: state.set.len(),
            pair_tests,
            overlaps: state.overlaps.len(),
            ..UpdateStats::default()
        }
    }

    fn overlaps(&self) -> Overlaps<'_> {
        RwLockReadGuard::map(self.state.read(), |s| s.overlaps.as_slice())
    }

    fn len(&self) -> usize {
        self.state.read().set.len()
    }

    fn set_pair_filter(&self, filter: Option<PairFilter<E>>) {
        self.state.write().filter = filter;
    }

    fn query_accelerator(&self) -> &dyn QueryAccelerator<E> {
        self
    }
}

impl<E: Entry> QueryAccelerator<E> for BruteForce<E> {
    fn ray_cast(
        &self,
        ray: &Ray,
        max_length: Option<f32>,
        hits: &mut Vec<RayHit<E>>,
    ) -> Result<(), BroadPhaseError> {
        let state = self.state.read();
        let limit = max_length.unwrap_or(f32::INFINITY);
        let first = hits.len();
        for (entry, aabb) in state.set.entries().iter().zip(state.set.boxes()) {
            if let Some(distance) = aabb.ray_entry(ray, limit) {
                hits.push(RayHit { entry: Arc::clone(entry), distance });
            }
        }
        sort_hits(&mut hits[first..]);
        Ok(())
    }

    fn entries(&self, volume: &QueryVolume, out: &mut Vec<Arc<E>>) -> Result<(), BroadPhaseError> {
        let state = self.state.read();
        let first = out.len();
        for (entry, aabb) in state.set.entries().iter().zip(state.set.boxes()) {
            if volume.intersects(aabb) {
                out.push(Arc::clone(entry));
            }
        }
        out[first..].sort_by_key(|e| e.id());
        Ok(())
    }
}
