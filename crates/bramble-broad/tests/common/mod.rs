// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![allow(dead_code)]
//! Shared fixtures for broad-phase integration tests.

use std::sync::Arc;

use bramble_broad::{
    BoxProxy, BroadPhase, BroadPhaseConfig, BruteForce, OverlapPair, SortAndSweep, TreeBroadPhase,
    UniformGrid,
};
use bramble_geom::{Aabb, Prng, Vec3};

/// Worker counts every determinism test sweeps.
pub const WORKER_COUNTS: &[usize] = &[0, 1, 2, 4];

pub fn cube(id: u64, center: Vec3, half: f32) -> Arc<BoxProxy> {
    Arc::new(BoxProxy::new(id, Aabb::from_center_half_extents(center, half, half, half)))
}

/// `count` random cubes inside `[-extent, extent]³`.
pub fn random_scene(seed: u64, count: usize, extent: f32) -> Vec<Arc<BoxProxy>> {
    let mut rng = Prng::from_seed_u64(seed);
    (0..count as u64)
        .map(|id| {
            let center = Vec3::new(
                rng.next_range(-extent, extent),
                rng.next_range(-extent, extent),
                rng.next_range(-extent, extent),
            );
            let half = rng.next_range(0.2, 1.5);
            cube(id, center, half)
        })
        .collect()
}

/// Moves every proxy by a random offset of at most `step` per axis.
pub fn jitter(proxies: &[Arc<BoxProxy>], rng: &mut Prng, step: f32) {
    for proxy in proxies {
        let offset = Vec3::new(
            rng.next_range(-step, step),
            rng.next_range(-step, step),
            rng.next_range(-step, step),
        );
        proxy.translate(&offset);
    }
}

/// Tree broad phase that goes parallel from a small entry count.
pub fn tree(workers: usize) -> TreeBroadPhase<BoxProxy> {
    let config = BroadPhaseConfig { workers, min_multithread_entries: 8, ..BroadPhaseConfig::default() };
    match TreeBroadPhase::new(config) {
        Ok(bp) => bp,
        Err(e) => unreachable!("tree broad phase: {e}"),
    }
}

pub fn grid(cell_size: f32) -> UniformGrid<BoxProxy> {
    match UniformGrid::with_cell_size(cell_size) {
        Ok(g) => g,
        Err(e) => unreachable!("grid: {e}"),
    }
}

/// One instance of every strategy.
pub fn all_strategies() -> Vec<Box<dyn BroadPhase<BoxProxy>>> {
    vec![
        Box::new(tree(0)),
        Box::new(tree(2)),
        Box::new(SortAndSweep::new()),
        Box::new(grid(2.0)),
        Box::new(BruteForce::new()),
    ]
}

pub fn add_all(bp: &dyn BroadPhase<BoxProxy>, proxies: &[Arc<BoxProxy>]) {
    for proxy in proxies {
        if let Err(e) = bp.add(Arc::clone(proxy)) {
            unreachable!("add failed: {e}");
        }
    }
}

pub fn ids(pairs: &[OverlapPair]) -> Vec<(u64, u64)> {
    pairs.iter().map(|p| (p.a.0, p.b.0)).collect()
}

pub fn current_pairs(bp: &dyn BroadPhase<BoxProxy>) -> Vec<(u64, u64)> {
    ids(&bp.overlaps())
}
