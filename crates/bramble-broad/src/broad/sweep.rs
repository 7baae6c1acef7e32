// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
use std::sync::Arc;

use bramble_geom::{Aabb, Ray};
use bramble_pool::LockingBufferPool;
use parking_lot::{RwLock, RwLockReadGuard};

use super::entry_set::EntrySet;
use super::{BroadPhase, Overlaps};
use crate::entry::{Entry, EntryId};
use crate::error::BroadPhaseError;
use crate::pair::{try_to_add_overlap, OverlapPair, PairFilter};
use crate::query::{segment_bounds, sort_hits, QueryAccelerator, QueryKind, QueryVolume, RayHit};
use crate::stats::UpdateStats;

const NAME: &str = "sort-and-sweep";

/// Sort-and-sweep broad phase along one axis.
///
/// Each update picks the axis with the greatest variance of box centers,
/// sorts entries by their lower bound on it (the previous order is kept, so
/// coherent motion sorts nearly in linear time) and sweeps an active list.
///
/// Queries: boxes, spheres and bounded rays. Unbounded rays and frusta are
/// rejected with [`BroadPhaseError::UnsupportedQuery`].
pub struct SortAndSweep<E: Entry> {
    state: RwLock<SweepState<E>>,
}

struct SweepState<E> {
    set: EntrySet<E>,
    /// Slots sorted by lower bound on `axis`; stale when `dirty`.
    order: Vec<usize>,
    axis: usize,
    dirty: bool,
    overlaps: Vec<OverlapPair>,
    filter: Option<PairFilter<E>>,
    scratch: LockingBufferPool<usize>,
}

impl<E: Entry> Default for SortAndSweep<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Entry> SortAndSweep<E> {
    /// Creates an empty sweep.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: RwLock::new(SweepState {
                set: EntrySet::default(),
                order: Vec::new(),
                axis: 0,
                dirty: false,
                overlaps: Vec::new(),
                filter: None,
                scratch: LockingBufferPool::new(),
            }),
        }
    }

    /// Axis chosen by the last update.
    pub fn sweep_axis(&self) -> usize {
        self.state.read().axis
    }
}

/// Axis with the greatest variance of box centers; ties go to the lower axis.
fn widest_axis(boxes: &[Aabb]) -> usize {
    if boxes.is_empty() {
        return 0;
    }
    let mut sum = [0.0_f64; 3];
    let mut sum_sq = [0.0_f64; 3];
    for aabb in boxes {
        let c = aabb.center().to_array();
        for axis in 0..3 {
            let v = f64::from(c[axis]);
            sum[axis] += v;
            sum_sq[axis] += v * v;
        }
    }
    #[allow(clippy::cast_precision_loss)]
    let n = boxes.len() as f64;
    let variance = |axis: usize| sum_sq[axis] / n - (sum[axis] / n).powi(2);
    let mut best = 0;
    for axis in 1..3 {
        if variance(axis) > variance(best) {
            best = axis;
        }
    }
    best
}

impl<E: Entry> SweepState<E> {
    fn sort(&mut self) {
        if self.dirty || self.order.len() != self.set.len() {
            self.order.clear();
            self.order.extend(0..self.set.len());
            self.dirty = false;
        }
        self.axis = widest_axis(self.set.boxes());
        let (boxes, axis, set) = (self.set.boxes(), self.axis, &self.set);
        self.order.sort_by(|&a, &b| {
            boxes[a]
                .min()
                .axis(axis)
                .total_cmp(&boxes[b].min().axis(axis))
                .then_with(|| set.get(a).id().cmp(&set.get(b).id()))
        });
    }

    /// Slots whose box overlaps `bounds`, in sweep order. Falls back to a
    /// scan when entries changed since the last sort.
    fn candidates(&self, bounds: &Aabb, out: &mut Vec<usize>) {
        let boxes = self.set.boxes();
        if self.dirty || self.order.len() != boxes.len() {
            out.extend((0..boxes.len()).filter(|&i| boxes[i].overlaps(bounds)));
            return;
        }
        let upper = bounds.max().axis(self.axis);
        for &slot in &self.order {
            if boxes[slot].min().axis(self.axis) > upper {
                break;
            }
            if boxes[slot].overlaps(bounds) {
                out.push(slot);
            }
        }
    }
}

impl<E: Entry> BroadPhase<E> for SortAndSweep<E> {
    fn name(&self) -> &'static str {
        NAME
    }

    fn add(&self, entry: Arc<E>) -> Result<(), BroadPhaseError> {
        let mut state = self.state.write();
        state.set.add(entry)?;
        state.dirty = true;
        Ok(())
    }

    fn remove(&self, id: EntryId) -> Result<Arc<E>, BroadPhaseError> {
        let mut state = self.state.write();
        let entry = state.set.remove(id)?;
        state.dirty = true;
        Ok(entry)
    }

    fn update(&self) -> UpdateStats {
        let mut guard = self.state.write();
        let state = &mut *guard;
        state.set.refresh();
        state.sort();
        state.overlaps.clear();

        let axis = state.axis;
        let boxes = state.set.boxes();
        let mut active = state.scratch.take(64);
        let mut pair_tests = 0;
        for &slot in &state.order {
            let aabb = &boxes[slot];
            let lower = aabb.min().axis(axis);
            active.retain(|&other| boxes[other].max().axis(axis) >= lower);
            for &other in active.iter() {
                if boxes[other].overlaps(aabb) {
                    pair_tests += 1;
                    try_to_add_overlap(
                        state.set.get(other),
                        state.set.get(slot),
                        state.filter.as_ref(),
                        &mut state.overlaps,
                    );
                }
            }
            active.push(slot);
        }
        state.scratch.give_back(active);
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

impl<E: Entry> QueryAccelerator<E> for SortAndSweep<E> {
    fn ray_cast(
        &self,
        ray: &Ray,
        max_length: Option<f32>,
        hits: &mut Vec<RayHit<E>>,
    ) -> Result<(), BroadPhaseError> {
        let Some(length) = max_length.filter(|l| l.is_finite()) else {
            return Err(BroadPhaseError::UnsupportedQuery { strategy: NAME, query: QueryKind::UnboundedRay });
        };
        let state = self.state.read();
        let mut slots = state.scratch.take(16);
        state.candidates(&segment_bounds(ray, length), &mut slots);
        let first = hits.len();
        for &slot in &slots {
            if let Some(distance) = state.set.boxes()[slot].ray_entry(ray, length) {
                hits.push(RayHit { entry: Arc::clone(&state.set.entries()[slot]), distance });
            }
        }
        state.scratch.give_back(slots);
        sort_hits(&mut hits[first..]);
        Ok(())
    }

    fn entries(&self, volume: &QueryVolume, out: &mut Vec<Arc<E>>) -> Result<(), BroadPhaseError> {
        let Some(bounds) = volume.bounds() else {
            return Err(BroadPhaseError::UnsupportedQuery { strategy: NAME, query: volume.kind() });
        };
        let state = self.state.read();
        let mut slots = state.scratch.take(16);
        state.candidates(&bounds, &mut slots);
        let first = out.len();
        for &slot in &slots {
            if volume.intersects(&state.set.boxes()[slot]) {
                out.push(Arc::clone(&state.set.entries()[slot]));
            }
        }
        state.scratch.give_back(slots);
        out[first..].sort_by_key(|e| e.id());
        Ok(())
    }
}
