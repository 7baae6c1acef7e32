// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![allow(missing_docs)]
//! Ray and volume queries across strategies.

mod common;

use std::sync::Arc;

use bramble_broad::{
    BoxProxy, BroadPhase, BroadPhaseError, BruteForce, Entry, QueryAccelerator, QueryKind, QueryVolume,
    RayHit, SortAndSweep,
};
use bramble_geom::{Aabb, Frustum, Ray, Sphere, Vec3};
use common::{add_all, cube, grid, random_scene, tree};

fn hit_ids(hits: &[RayHit<BoxProxy>]) -> Vec<u64> {
    hits.iter().map(|h| h.entry.id().0).collect()
}

fn entry_ids(entries: &[Arc<BoxProxy>]) -> Vec<u64> {
    entries.iter().map(|e| e.id().0).collect()
}

fn volumes() -> Vec<QueryVolume> {
    vec![
        QueryVolume::Box(Aabb::from_center_half_extents(Vec3::new(1.0, -2.0, 0.5), 3.0, 2.0, 4.0)),
        QueryVolume::Sphere(Sphere::new(Vec3::new(-3.0, 1.0, 2.0), 4.5)),
        QueryVolume::Box(Aabb::from_center_half_extents(Vec3::splat(100.0), 1.0, 1.0, 1.0)),
    ]
}

#[test]
fn ray_hits_come_back_nearest_first() {
    let bp = tree(0);
    add_all(&bp, &[cube(1, Vec3::new(8.0, 0.0, 0.0), 0.5), cube(2, Vec3::new(3.0, 0.0, 0.0), 0.5), cube(3, Vec3::new(5.0, 4.0, 0.0), 0.5)]);
    bp.update();
    let ray = Ray::new(Vec3::ZERO, Vec3::UNIT_X);
    let mut hits = Vec::new();
    assert!(bp.ray_cast(&ray, None, &mut hits).is_ok());
    assert_eq!(hit_ids(&hits), vec![2, 1]);
    assert!((hits[0].distance - 2.5).abs() < 1e-6);

    hits.clear();
    assert!(bp.ray_cast(&ray, Some(5.0), &mut hits).is_ok());
    assert_eq!(hit_ids(&hits), vec![2]);
}

#[test]
fn accelerated_queries_match_linear_scan() {
    let proxies = random_scene(17, 200, 10.0);
    let reference = BruteForce::new();
    add_all(&reference, &proxies);
    reference.update();
    let candidates: Vec<Box<dyn BroadPhase<BoxProxy>>> =
        vec![Box::new(tree(0)), Box::new(tree(2)), Box::new(SortAndSweep::new()), Box::new(grid(3.0))];
    for bp in &candidates {
        add_all(bp.as_ref(), &proxies);
        bp.update();
        let accel = bp.query_accelerator();
        for volume in volumes() {
            let (mut expected, mut actual) = (Vec::new(), Vec::new());
            assert!(reference.entries(&volume, &mut expected).is_ok());
            assert!(accel.entries(&volume, &mut actual).is_ok());
            assert_eq!(entry_ids(&actual), entry_ids(&expected), "{} {volume:?}", bp.name());
        }
        for (origin, direction) in [(Vec3::splat(-12.0), Vec3::ONE), (Vec3::new(0.0, 11.0, 0.0), Vec3::new(0.1, -1.0, 0.2))] {
            let ray = Ray::new(origin, direction);
            let (mut expected, mut actual) = (Vec::new(), Vec::new());
            assert!(reference.ray_cast(&ray, Some(30.0), &mut expected).is_ok());
            assert!(accel.ray_cast(&ray, Some(30.0), &mut actual).is_ok());
            assert_eq!(hit_ids(&actual), hit_ids(&expected), "{}", bp.name());
        }
    }
}

#[test]
fn tree_answers_frustum_queries() {
    let proxies = random_scene(4, 120, 10.0);
    let bp = tree(0);
    let reference = BruteForce::new();
    add_all(&bp, &proxies);
    add_all(&reference, &proxies);
    bp.update();
    reference.update();
    let frustum = Frustum::perspective(Vec3::new(0.0, 0.0, -20.0), Vec3::UNIT_Z, Vec3::UNIT_Y, 0.6, 1.0, 0.5, 30.0);
    let volume = QueryVolume::Frustum(frustum);
    let (mut expected, mut actual) = (Vec::new(), Vec::new());
    assert!(reference.entries(&volume, &mut expected).is_ok());
    assert!(bp.entries(&volume, &mut actual).is_ok());
    assert_eq!(entry_ids(&actual), entry_ids(&expected));
}

#[test]
fn flat_strategies_reject_what_they_cannot_bound() {
    let sweep = SortAndSweep::<BoxProxy>::new();
    let cells = grid(1.0);
    let ray = Ray::new(Vec3::ZERO, Vec3::UNIT_Y);
    let frustum = QueryVolume::Frustum(Frustum::from_aabb(&Aabb::from_center_half_extents(Vec3::ZERO, 1.0, 1.0, 1.0)));
    let accelerators: [&dyn QueryAccelerator<BoxProxy>; 2] = [&sweep, &cells];
    for accel in accelerators {
        let mut hits = Vec::new();
        assert!(matches!(
            accel.ray_cast(&ray, None, &mut hits),
            Err(BroadPhaseError::UnsupportedQuery { query: QueryKind::UnboundedRay, .. })
        ));
        let mut out = Vec::new();
        assert!(matches!(
            accel.entries(&frustum, &mut out),
            Err(BroadPhaseError::UnsupportedQuery { query: QueryKind::Frustum, .. })
        ));
    }
}

#[test]
fn queries_before_first_update_see_added_entries() {
    let sweep = SortAndSweep::new();
    let cells = grid(2.0);
    let region = QueryVolume::Box(Aabb::from_center_half_extents(Vec3::ZERO, 0.1, 0.1, 0.1));
    for bp in [&sweep as &dyn BroadPhase<BoxProxy>, &cells] {
        add_all(bp, &[cube(7, Vec3::ZERO, 1.0), cube(8, Vec3::splat(9.0), 1.0)]);
        let mut out = Vec::new();
        assert!(bp.query_accelerator().entries(&region, &mut out).is_ok());
        assert_eq!(entry_ids(&out), vec![7]);
    }
}
