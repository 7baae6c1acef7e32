// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Broad-phase interface and its strategies.
//!
//! Determinism contract (applies to every implementation here):
//! - Pair identity is canonicalized as `(min_id, max_id)`.
//! - The emitted pair list is strictly sorted lexicographically by that tuple.
//! - Overlap is inclusive on faces (touching AABBs are considered overlapping).
//! - Every candidate pair goes through [`crate::try_to_add_overlap`].
//!
//! All strategies emit identical pair lists for identical inputs; they differ
//! in cost profile and in which queries they can answer.

use std::sync::Arc;

use parking_lot::MappedRwLockReadGuard;

use crate::entry::{Entry, EntryId};
use crate::error::BroadPhaseError;
use crate::pair::{OverlapPair, PairFilter};
use crate::query::QueryAccelerator;
use crate::stats::UpdateStats;

/// Exhaustive all-pairs baseline.
pub mod brute;
mod entry_set;
/// Hashed uniform grid.
pub mod grid;
/// Single-axis sort and sweep.
pub mod sweep;
/// Tree-backed orchestrator.
pub mod tree_phase;

/// Read view of the pair list produced by the last update.
pub type Overlaps<'a> = MappedRwLockReadGuard<'a, [OverlapPair]>;

/// Broad-phase interface: track entries, update once per step, read pairs.
///
/// Implementations synchronize internally. `update` excludes every other
/// operation for its duration; queries and pair reads run concurrently with
/// each other.
pub trait BroadPhase<E: Entry>: QueryAccelerator<E> + Send + Sync {
    /// Short strategy name used in logs and errors.
    fn name(&self) -> &'static str;

    /// Starts tracking `entry`.
    ///
    /// # Errors
    /// [`BroadPhaseError::DuplicateEntry`] if its id is already tracked.
    fn add(&self, entry: Arc<E>) -> Result<(), BroadPhaseError>;

    /// Stops tracking the entry with `id` and returns it.
    ///
    /// # Errors
    /// [`BroadPhaseError::EntryNotFound`] if the id is not tracked.
    fn remove(&self, id: EntryId) -> Result<Arc<E>, BroadPhaseError>;

    /// Pulls fresh boxes from every entry and rebuilds the pair list.
    fn update(&self) -> UpdateStats;

    /// Pairs from the last update, sorted. Holds a read lock while alive.
    fn overlaps(&self) -> Overlaps<'_>;

    /// Number of tracked entries.
    fn len(&self) -> usize;

    /// Returns `true` if nothing is tracked.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Installs (or clears) the decision for pairs whose rule is `Defer`.
    fn set_pair_filter(&self, filter: Option<PairFilter<E>>);

    /// Query surface of this strategy.
    fn query_accelerator(&self) -> &dyn QueryAccelerator<E>;
}
