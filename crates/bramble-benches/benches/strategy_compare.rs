// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
// criterion_group!/criterion_main! expand to undocumented functions that cannot
// carry #[allow] (attributes on macro invocations are ignored). Crate-level
// suppress is required for benchmark binaries using Criterion.
#![allow(missing_docs)]
//! Update and query cost across broad-phase strategies on the same scene.
use std::sync::Arc;
use std::time::Duration;

use bramble_broad::{
    BoxProxy, BroadPhase, BroadPhaseConfig, BruteForce, QueryAccelerator, QueryVolume, SortAndSweep,
    TreeBroadPhase, UniformGrid,
};
use bramble_geom::{Aabb, Prng, Ray, Vec3};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

const EXTENT: f32 = 20.0;

fn make_scene(n: usize) -> Vec<Arc<BoxProxy>> {
    let mut rng = Prng::from_seed_u64(0xc0ffee);
    (0..n as u64)
        .map(|id| {
            let center = Vec3::new(
                rng.next_range(-EXTENT, EXTENT),
                rng.next_range(-EXTENT, EXTENT),
                rng.next_range(-EXTENT, EXTENT),
            );
            let half = rng.next_range(0.3, 1.0);
            Arc::new(BoxProxy::new(id, Aabb::from_center_half_extents(center, half, half, half)))
        })
        .collect()
}

fn strategies(include_brute: bool) -> Vec<Box<dyn BroadPhase<BoxProxy>>> {
    let config = BroadPhaseConfig::default();
    let mut out: Vec<Box<dyn BroadPhase<BoxProxy>>> = vec![
        Box::new(TreeBroadPhase::new(config).expect("bench: valid config")),
        Box::new(SortAndSweep::new()),
        Box::new(UniformGrid::with_cell_size(2.5).expect("bench: valid cell size")),
    ];
    if include_brute {
        out.push(Box::new(BruteForce::new()));
    }
    out
}

fn bench_update(c: &mut Criterion) {
    let mut group = c.benchmark_group("strategy_update");
    group.measurement_time(Duration::from_secs(4)).sample_size(30);

    for &n in &[250usize, 2_000] {
        group.throughput(Throughput::Elements(n as u64));
        let proxies = make_scene(n);
        for bp in strategies(n <= 250) {
            for proxy in &proxies {
                bp.add(Arc::clone(proxy)).expect("bench: unique ids");
            }
            bp.update();
            let mut rng = Prng::from_seed_u64(3);
            group.bench_with_input(BenchmarkId::new(bp.name(), n), &n, |b, _| {
                b.iter(|| {
                    for proxy in &proxies {
                        let step = Vec3::new(rng.next_range(-0.1, 0.1), rng.next_range(-0.1, 0.1), 0.0);
                        proxy.translate(&step);
                    }
                    black_box(bp.update())
                });
            });
        }
    }
    group.finish();
}

fn bench_queries(c: &mut Criterion) {
    let mut group = c.benchmark_group("strategy_query_2000");
    group.measurement_time(Duration::from_secs(3)).sample_size(50);

    let proxies = make_scene(2_000);
    let region = QueryVolume::Box(Aabb::from_center_half_extents(Vec3::ZERO, 4.0, 4.0, 4.0));
    let ray = Ray::new(Vec3::new(-EXTENT, 0.0, 0.0), Vec3::new(1.0, 0.0, 0.0));
    for bp in strategies(true) {
        for proxy in &proxies {
            bp.add(Arc::clone(proxy)).expect("bench: unique ids");
        }
        bp.update();
        let mut found = Vec::new();
        group.bench_function(BenchmarkId::new("box", bp.name()), |b| {
            b.iter(|| {
                found.clear();
                bp.entries(&region, &mut found).expect("bench: box queries are supported");
                black_box(found.len())
            });
        });
        let mut hits = Vec::new();
        group.bench_function(BenchmarkId::new("segment", bp.name()), |b| {
            b.iter(|| {
                hits.clear();
                bp.ray_cast(&ray, Some(2.0 * EXTENT), &mut hits).expect("bench: bounded rays are supported");
                black_box(hits.len())
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_update, bench_queries);
criterion_main!(benches);
