// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![allow(missing_docs)]
//! Every strategy must agree with the exhaustive reference, step after step.

mod common;

use std::collections::BTreeSet;
use std::sync::Arc;

use bramble_broad::{brute_force_pairs, BoxProxy, BroadPhase, Entry};
use bramble_geom::{Aabb, Prng, Vec3};
use common::{add_all, all_strategies, cube, current_pairs, ids, jitter, random_scene, tree, WORKER_COUNTS};
use proptest::prelude::*;

#[test]
fn strategies_match_reference_over_many_steps() {
    let proxies = random_scene(7, 150, 12.0);
    let strategies = all_strategies();
    for bp in &strategies {
        add_all(bp.as_ref(), &proxies);
    }
    let mut rng = Prng::from_seed_u64(99);
    for step in 0..20 {
        let expected = ids(&brute_force_pairs(&proxies, None));
        for bp in &strategies {
            bp.update();
            assert_eq!(current_pairs(bp.as_ref()), expected, "{} at step {step}", bp.name());
        }
        jitter(&proxies, &mut rng, 0.6);
    }
}

#[test]
fn removing_random_entries_one_by_one_tracks_reference() {
    let proxies = random_scene(21, 100, 6.0);
    for workers in [0, 2] {
        let bp = tree(workers);
        add_all(&bp, &proxies);
        let mut rng = Prng::from_seed_u64(5);
        let mut remaining = proxies.clone();
        while !remaining.is_empty() {
            let gone = remaining.swap_remove(rng.next_index(remaining.len()));
            assert!(bp.remove(gone.id()).is_ok());
            bp.update();
            assert_eq!(current_pairs(&bp), ids(&brute_force_pairs(&remaining, None)), "{workers} workers");
            assert!(bp.validate().is_ok());
        }
        assert_eq!(bp.node_count(), 0);
    }
}

#[test]
fn pairs_are_canonical_unique_and_sorted() {
    let proxies = random_scene(3, 300, 8.0);
    for bp in all_strategies() {
        add_all(bp.as_ref(), &proxies);
        bp.update();
        let pairs = current_pairs(bp.as_ref());
        assert!(pairs.iter().all(|(a, b)| a < b), "{}", bp.name());
        assert!(pairs.windows(2).all(|w| w[0] < w[1]), "{}", bp.name());
        let unique: BTreeSet<_> = pairs.iter().collect();
        assert_eq!(unique.len(), pairs.len());
    }
}

#[test]
fn pair_list_is_worker_count_invariant() {
    let mut baseline = None;
    for &workers in WORKER_COUNTS {
        let proxies = random_scene(11, 400, 15.0);
        let bp = tree(workers);
        add_all(&bp, &proxies);
        let mut rng = Prng::from_seed_u64(5);
        let mut history = Vec::new();
        for _ in 0..8 {
            let stats = bp.update();
            assert_eq!(stats.multithreaded, workers > 0);
            history.push((current_pairs(&bp), bp.depth(), bp.node_count()));
            jitter(&proxies, &mut rng, 1.5);
        }
        match &baseline {
            None => baseline = Some(history),
            Some(expected) => assert_eq!(&history, expected, "{workers} workers diverged"),
        }
    }
}

#[test]
fn tree_stays_tight_after_every_refit() {
    let proxies = random_scene(21, 250, 10.0);
    let bp = tree(2);
    add_all(&bp, &proxies);
    let mut rng = Prng::from_seed_u64(8);
    for step in 0..15 {
        bp.update();
        if let Err(violation) = bp.validate_tight() {
            unreachable!("step {step}: {violation}");
        }
        jitter(&proxies, &mut rng, 2.0);
    }
}

/// Boxes with zero extent along z, scattered over the xy plane.
fn flat_scene(seed: u64, count: usize, extent: f32) -> Vec<Arc<BoxProxy>> {
    let mut rng = Prng::from_seed_u64(seed);
    (0..count as u64)
        .map(|id| {
            let center = Vec3::new(rng.next_range(-extent, extent), rng.next_range(-extent, extent), 0.0);
            let (hx, hy) = (rng.next_range(0.2, 1.5), rng.next_range(0.2, 1.5));
            Arc::new(BoxProxy::new(id, Aabb::from_center_half_extents(center, hx, hy, 0.0)))
        })
        .collect()
}

#[test]
fn flat_scene_keeps_tree_shallow_and_sound() {
    let proxies = flat_scene(31, 2000, 60.0);
    for workers in [0, 2] {
        let bp = tree(workers);
        add_all(&bp, &proxies);
        assert!(bp.depth() <= 40, "depth {} with {workers} workers", bp.depth());
        let mut rng = Prng::from_seed_u64(4);
        for _ in 0..3 {
            bp.update();
            assert_eq!(current_pairs(&bp), ids(&brute_force_pairs(&proxies, None)));
            assert!(bp.validate_tight().is_ok());
            assert!(bp.depth() <= 40, "depth {} with {workers} workers", bp.depth());
            jitter(&proxies, &mut rng, 0.5);
        }
    }
}

#[test]
fn sorted_insertion_keeps_tree_shallow() {
    let proxies: Vec<_> = (0..2000_u64).map(|i| cube(i, Vec3::new(i as f32 * 1.5, 0.0, 0.0), 1.0)).collect();
    let bp = tree(0);
    add_all(&bp, &proxies);
    assert!(bp.depth() <= 40, "depth {}", bp.depth());
    bp.update();
    assert!(bp.validate_tight().is_ok());
    // Neighbours 1.5 apart with half-extent 1 overlap; the next ones do not.
    assert_eq!(current_pairs(&bp).len(), 1999);
    assert_eq!(current_pairs(&bp), ids(&brute_force_pairs(&proxies, None)));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn tree_is_sound_and_complete(seed in any::<u64>(), count in 0usize..120, extent in 1.0f32..20.0) {
        let proxies = random_scene(seed, count, extent);
        let bp = tree(0);
        add_all(&bp, &proxies);
        bp.update();
        prop_assert_eq!(current_pairs(&bp), ids(&brute_force_pairs(&proxies, None)));
    }

    #[test]
    fn parallel_tree_is_sound_after_motion(seed in any::<u64>(), count in 8usize..200) {
        let proxies = random_scene(seed, count, 10.0);
        let bp = tree(3);
        add_all(&bp, &proxies);
        bp.update();
        let mut rng = Prng::from_seed_u64(seed ^ 0x5eed);
        jitter(&proxies, &mut rng, 3.0);
        bp.update();
        prop_assert_eq!(current_pairs(&bp), ids(&brute_force_pairs(&proxies, None)));
        prop_assert!(bp.validate().is_ok());
    }
}
