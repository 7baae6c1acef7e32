// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
use std::sync::Arc;

use bramble_geom::{Aabb, Ray};
use bramble_pool::LockingBufferPool;
use parking_lot::{RwLock, RwLockReadGuard};
use rustc_hash::FxHashMap;

use super::entry_set::EntrySet;
use super::{BroadPhase, Overlaps};
use crate::config::{BroadPhaseConfig, ConfigError};
use crate::entry::{Entry, EntryId};
use crate::error::BroadPhaseError;
use crate::pair::{try_to_add_overlap, OverlapPair, PairFilter};
use crate::query::{segment_bounds, sort_hits, QueryAccelerator, QueryKind, QueryVolume, RayHit};
use crate::stats::UpdateStats;

const NAME: &str = "uniform-grid";

/// Entries spanning more cells than this skip the grid and are tested
/// against everything.
const MAX_CELLS_PER_ENTRY: u64 = 64;

type Cell = [i32; 3];

/// Inclusive cell range covered by a box.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CellRange {
    lo: Cell,
    hi: Cell,
}

impl CellRange {
    #[allow(clippy::cast_possible_truncation)]
    fn of(aabb: &Aabb, cell_size: f32) -> Self {
        let cell = |v: f32| (v / cell_size).floor() as i32;
        let (min, max) = (aabb.min(), aabb.max());
        Self {
            lo: [cell(min.x()), cell(min.y()), cell(min.z())],
            hi: [cell(max.x()), cell(max.y()), cell(max.z())],
        }
    }

    fn cell_count(&self) -> u64 {
        (0..3)
            .map(|axis| u64::from(self.hi[axis].abs_diff(self.lo[axis])) + 1)
            .fold(1_u64, u64::saturating_mul)
    }

    fn cells(&self) -> impl Iterator<Item = Cell> + '_ {
        (self.lo[0]..=self.hi[0]).flat_map(move |x| {
            (self.lo[1]..=self.hi[1])
                .flat_map(move |y| (self.lo[2]..=self.hi[2]).map(move |z| [x, y, z]))
        })
    }
}

/// Hashed uniform grid broad phase.
///
/// Entries are binned into every cell their box touches; pairs are tested
/// per cell and reported only from the first cell both boxes share, so no
/// pair is emitted twice. Very large entries bypass the grid.
///
/// Queries: boxes, spheres and bounded rays. Unbounded rays and frusta are
/// rejected with [`BroadPhaseError::UnsupportedQuery`].
pub struct UniformGrid<E: Entry> {
    state: RwLock<GridState<E>>,
}

struct GridState<E> {
    set: EntrySet<E>,
    cell_size: f32,
    cells: FxHashMap<Cell, Vec<usize>>,
    /// Per slot: binned range, or `None` for oversized entries.
    ranges: Vec<Option<CellRange>>,
    oversized: Vec<usize>,
    /// Slots changed since the last update; queries scan instead.
    dirty: bool,
    overlaps: Vec<OverlapPair>,
    filter: Option<PairFilter<E>>,
    scratch: LockingBufferPool<usize>,
}

impl<E: Entry> UniformGrid<E> {
    /// Creates an empty grid with `config.grid_cell_size` cells.
    ///
    /// # Errors
    /// [`BroadPhaseError::Config`] if the configuration is invalid.
    pub fn new(config: &BroadPhaseConfig) -> Result<Self, BroadPhaseError> {
        config.validate()?;
        Ok(Self::with_cell_size_unchecked(config.grid_cell_size))
    }

    /// Creates an empty grid with the given cell edge length.
    ///
    /// # Errors
    /// [`BroadPhaseError::Config`] unless `cell_size` is finite and positive.
    pub fn with_cell_size(cell_size: f32) -> Result<Self, BroadPhaseError> {
        if !(cell_size.is_finite() && cell_size > 0.0) {
            return Err(ConfigError::InvalidTunable {
                name: "grid_cell_size",
                reason: "must be finite and > 0",
            }
            .into());
        }
        Ok(Self::with_cell_size_unchecked(cell_size))
    }

    fn with_cell_size_unchecked(cell_size: f32) -> Self {
        Self {
            state: RwLock::new(GridState {
                set: EntrySet::default(),
                cell_size,
                cells: FxHashMap::default(),
                ranges: Vec::new(),
                oversized: Vec::new(),
                dirty: false,
                overlaps: Vec::new(),
                filter: None,
                scratch: LockingBufferPool::new(),
            }),
        }
    }

    /// Cell edge length.
    pub fn cell_size(&self) -> f32 {
        self.state.read().cell_size
    }

    /// Occupied cells after the last update.
    pub fn occupied_cells(&self) -> usize {
        self.state.read().cells.values().filter(|slots| !slots.is_empty()).count()
    }
}

impl<E: Entry> GridState<E> {
    fn bin(&mut self) {
        // Keep allocations for cells used last step; drop the rest.
        self.cells.retain(|_, slots| !slots.is_empty());
        for slots in self.cells.values_mut() {
            slots.clear();
        }
        self.oversized.clear();
        self.ranges.clear();
        for (slot, aabb) in self.set.boxes().iter().enumerate() {
            let range = CellRange::of(aabb, self.cell_size);
            if range.cell_count() > MAX_CELLS_PER_ENTRY {
                self.oversized.push(slot);
                self.ranges.push(None);
                continue;
            }
            for cell in range.cells() {
                self.cells.entry(cell).or_default().push(slot);
            }
            self.ranges.push(Some(range));
        }
        self.dirty = false;
    }

    /// Slots whose box overlaps `bounds`, ascending and deduplicated.
    fn candidates(&self, bounds: &Aabb, out: &mut Vec<usize>) {
        let boxes = self.set.boxes();
        let range = CellRange::of(bounds, self.cell_size);
        if self.dirty || range.cell_count() > MAX_CELLS_PER_ENTRY * 8 {
            out.extend((0..boxes.len()).filter(|&i| boxes[i].overlaps(bounds)));
            return;
        }
        for cell in range.cells() {
            if let Some(slots) = self.cells.get(&cell) {
                out.extend(slots.iter().copied().filter(|&i| boxes[i].overlaps(bounds)));
            }
        }
        out.extend(self.oversized.iter().copied().filter(|&i| boxes[i].overlaps(bounds)));
        out.sort_unstable();
        out.dedup();
    }
}

impl<E: Entry> BroadPhase<E> for UniformGrid<E> {
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
        state.bin();
        state.overlaps.clear();

        let boxes = state.set.boxes();
        let ranges = &state.ranges;
        let mut pair_tests = 0;
        for (cell, slots) in &state.cells {
            for (k, &i) in slots.iter().enumerate() {
                for &j in &slots[k + 1..] {
                    if !boxes[i].overlaps(&boxes[j]) {
                        continue;
                    }
                    // Report from the first shared cell only.
                    let (Some(ri), Some(rj)) = (ranges[i], ranges[j]) else { continue };
                    let owner = [0, 1, 2].map(|axis| ri.lo[axis].max(rj.lo[axis]));
                    if owner != *cell {
                        continue;
                    }
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
        for &i in &state.oversized {
            for j in 0..boxes.len() {
                // Oversized pairs are visited from both sides; keep one.
                let skip = j == i || (ranges[j].is_none() && j < i);
                if skip || !boxes[i].overlaps(&boxes[j]) {
                    continue;
                }
                pair_tests += 1;
                try_to_add_overlap(
                    state.set.get(i),
                    state.set.get(j),
                    state.filter.as_ref(),
                    &mut state.overlaps,
                );
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

impl<E: Entry> QueryAccelerator<E> for UniformGrid<E> {
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
