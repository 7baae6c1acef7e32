// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![doc = r"Broad-phase collision pruning for Bramble.

Given entries whose bounding boxes move every step, a broad phase produces
the set of overlapping, rule-permitted entry pairs for the narrow phase.

This crate provides:
- [`BoundingVolumeTree`]: an incremental AABB tree with insert, remove,
  refit, revalidation and self-overlap traversal, stored in a slot arena.
- [`TreeBroadPhase`]: the orchestrator. Owns the tree behind a lock, runs
  refit and traversal on a [`bramble_looper::ParallelLooper`] when the tree
  is large enough, and filters pairs through collision rules.
- [`SortAndSweep`], [`UniformGrid`] and [`BruteForce`]: comparison strategies
  behind the same [`BroadPhase`] trait with a narrower query surface.

Determinism contract (all strategies):
- Pair identity is canonicalized as `(min_id, max_id)`.
- The emitted pair list is sorted ascending by that tuple, so results do not
  depend on worker count.
- Overlap is inclusive on faces (touching AABBs overlap).
"]

/// Broad-phase trait and its implementations.
pub mod broad;
mod config;
mod entry;
mod error;
mod pair;
mod query;
mod stats;
/// Incremental bounding volume tree.
pub mod tree;

pub use broad::brute::BruteForce;
pub use broad::grid::UniformGrid;
pub use broad::sweep::SortAndSweep;
pub use broad::tree_phase::TreeBroadPhase;
pub use broad::{BroadPhase, Overlaps};
pub use config::{BroadPhaseConfig, ConfigError};
pub use entry::{BoxProxy, CollisionRule, Entry, EntryId};
pub use error::BroadPhaseError;
pub use pair::{brute_force_pairs, try_to_add_overlap, OverlapPair, PairFilter};
pub use query::{QueryAccelerator, QueryKind, QueryVolume, RayHit};
pub use stats::UpdateStats;
pub use tree::BoundingVolumeTree;
