// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
use std::sync::Arc;

use bramble_geom::{Aabb, Ray};
use bramble_looper::ParallelLooper;
use parking_lot::{RwLock, RwLockReadGuard};
use tracing::{debug, instrument, trace};

use super::{BroadPhase, Overlaps};
use crate::config::{BroadPhaseConfig, ConfigError};
use crate::entry::{Entry, EntryId};
use crate::error::BroadPhaseError;
use crate::pair::{OverlapPair, PairFilter};
use crate::query::{QueryAccelerator, QueryVolume, RayHit};
use crate::stats::UpdateStats;
use crate::tree::{BoundingVolumeTree, InvariantViolation};

/// Broad phase backed by a [`BoundingVolumeTree`].
///
/// Owns the tree, the pair list and the worker pool behind one lock.
/// `update` refits the tree, rebuilds outgrown subtrees and collects pairs;
/// when multithreading is enabled, workers exist and the tree holds at least
/// `min_multithread_entries` leaves, refit and traversal run on the pool.
/// Either way the pair list is identical.
///
/// Answers every query kind.
pub struct TreeBroadPhase<E: Entry> {
    state: RwLock<TreeState<E>>,
}

struct TreeState<E> {
    tree: BoundingVolumeTree<E>,
    overlaps: Vec<OverlapPair>,
    looper: ParallelLooper,
    config: BroadPhaseConfig,
    filter: Option<PairFilter<E>>,
}

impl<E: Entry> Default for TreeBroadPhase<E> {
    /// Default tunables, no worker threads.
    fn default() -> Self {
        let config = BroadPhaseConfig::default();
        Self::from_parts(config, ParallelLooper::new(config.looper))
    }
}

impl<E: Entry> TreeBroadPhase<E> {
    /// Validates `config` and spawns `config.workers` worker threads.
    ///
    /// # Errors
    /// [`BroadPhaseError::Config`] for invalid tunables or a failed spawn.
    pub fn new(config: BroadPhaseConfig) -> Result<Self, BroadPhaseError> {
        config.validate()?;
        let looper = ParallelLooper::with_workers(config.looper, config.workers).map_err(ConfigError::from)?;
        debug!(workers = config.workers, multithreaded = config.multithreaded, "tree broad phase ready");
        Ok(Self::from_parts(config, looper))
    }

    fn from_parts(config: BroadPhaseConfig, looper: ParallelLooper) -> Self {
        Self {
            state: RwLock::new(TreeState {
                tree: BoundingVolumeTree::new(&config),
                overlaps: Vec::new(),
                looper,
                config,
                filter: None,
            }),
        }
    }

    /// Active configuration.
    pub fn config(&self) -> BroadPhaseConfig {
        self.state.read().config
    }

    /// Toggles the parallel update path.
    pub fn set_multithreaded(&self, enabled: bool) {
        self.state.write().config.multithreaded = enabled;
    }

    /// Worker threads currently owned.
    pub fn worker_count(&self) -> usize {
        self.state.read().looper.worker_count()
    }

    /// Spawns one more worker thread.
    ///
    /// # Errors
    /// [`BroadPhaseError::Config`] if the thread cannot be spawned.
    pub fn add_worker(&self) -> Result<(), BroadPhaseError> {
        self.state.write().looper.add_thread().map_err(|e| ConfigError::from(e).into())
    }

    /// Stops one worker thread; `false` if none remain.
    pub fn remove_worker(&self) -> bool {
        self.state.write().looper.remove_thread()
    }

    /// Entry stored under `id`.
    pub fn entry(&self, id: EntryId) -> Option<Arc<E>> {
        self.state.read().tree.entry(id).cloned()
    }

    /// Pairs from the last update resolved to their entries.
    pub fn overlapping_entries(&self) -> Vec<(Arc<E>, Arc<E>)> {
        let state = self.state.read();
        state
            .overlaps
            .iter()
            .filter_map(|pair| Some((state.tree.entry(pair.a)?.clone(), state.tree.entry(pair.b)?.clone())))
            .collect()
    }

    /// Root box as of the last update.
    pub fn bounds(&self) -> Option<Aabb> {
        self.state.read().tree.root_bounds()
    }

    /// Tree height.
    pub fn depth(&self) -> usize {
        self.state.read().tree.depth()
    }

    /// Live tree nodes, leaves included.
    pub fn node_count(&self) -> usize {
        self.state.read().tree.node_count()
    }

    /// Checks the tree's structural invariants.
    ///
    /// # Errors
    /// The first violation found.
    pub fn validate(&self) -> Result<(), InvariantViolation> {
        self.state.read().tree.validate()
    }

    /// Checks the structural invariants and that every internal box is the
    /// exact union of its children. Holds right after an update.
    ///
    /// # Errors
    /// The first violation found.
    pub fn validate_tight(&self) -> Result<(), InvariantViolation> {
        self.state.read().tree.validate_tight()
    }
}

impl<E: Entry> BroadPhase<E> for TreeBroadPhase<E> {
    fn name(&self) -> &'static str {
        "tree"
    }

    fn add(&self, entry: Arc<E>) -> Result<(), BroadPhaseError> {
        let id = entry.id();
        self.state.write().tree.insert(entry)?;
        trace!(%id, "entry added");
        Ok(())
    }

    fn remove(&self, id: EntryId) -> Result<Arc<E>, BroadPhaseError> {
        let entry = self.state.write().tree.remove(id)?;
        trace!(%id, "entry removed");
        Ok(entry)
    }

    #[instrument(level = "debug", skip(self))]
    fn update(&self) -> UpdateStats {
        let mut guard = self.state.write();
        let state = &mut *guard;
        let entries = state.tree.len();
        let multithreaded = state.config.multithreaded
            && state.looper.worker_count() > 0
            && entries >= state.config.min_multithread_entries;

        let refit = if multithreaded {
            state.tree.refit_parallel(&mut state.looper, state.config.min_multithread_entries)
        } else {
            state.tree.refit()
        };
        state.overlaps.clear();
        let traversal = if multithreaded {
            state.tree.collect_overlaps_parallel(&mut state.looper, state.filter.as_ref(), &mut state.overlaps)
        } else {
            state.tree.collect_overlaps(state.filter.as_ref(), &mut state.overlaps)
        };

        let stats = UpdateStats {
            entries,
            refits: refit.refits,
            revalidations: refit.revalidations,
            pair_tests: traversal.candidates,
            overlaps: state.overlaps.len(),
            tasks: refit.tasks + traversal.tasks,
            multithreaded,
        };
        trace!(?stats, "broad phase updated");
        stats
    }

    fn overlaps(&self) -> Overlaps<'_> {
        RwLockReadGuard::map(self.state.read(), |s| s.overlaps.as_slice())
    }

    fn len(&self) -> usize {
        self.state.read().tree.len()
    }

    fn set_pair_filter(&self, filter: Option<PairFilter<E>>) {
        self.state.write().filter = filter;
    }

    fn query_accelerator(&self) -> &dyn QueryAccelerator<E> {
        self
    }
}

impl<E: Entry> QueryAccelerator<E> for TreeBroadPhase<E> {
    fn ray_cast(
        &self,
        ray: &Ray,
        max_length: Option<f32>,
        hits: &mut Vec<RayHit<E>>,
    ) -> Result<(), BroadPhaseError> {
        self.state.read().tree.ray_cast(ray, max_length, hits);
        Ok(())
    }

    fn entries(&self, volume: &QueryVolume, out: &mut Vec<Arc<E>>) -> Result<(), BroadPhaseError> {
        self.state.read().tree.query(volume, out);
        Ok(())
    }
}
