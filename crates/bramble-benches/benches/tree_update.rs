// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
// criterion_group!/criterion_main! expand to undocumented functions that cannot
// carry #[allow] (attributes on macro invocations are ignored). Crate-level
// suppress is required for benchmark binaries using Criterion.
#![allow(missing_docs)]
//! Tree broad-phase update: serial vs parallel refit and traversal.
//!
//! # Running
//!
//! ```sh
//! cargo bench --package bramble-benches --bench tree_update
//! ```
//!
//! - `serial_vs_parallel/N`: one update after jittering N boxes
//! - `worker_scaling_4000`: the same step with 1, 2, 4 and 8 workers
use std::sync::Arc;
use std::time::Duration;

use bramble_broad::{BoxProxy, BroadPhase, BroadPhaseConfig, TreeBroadPhase};
use bramble_geom::{Aabb, Prng, Vec3};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

fn make_scene(n: usize) -> Vec<Arc<BoxProxy>> {
    let mut rng = Prng::from_seed_u64(0x5eed);
    #[allow(clippy::cast_precision_loss)]
    let extent = (n as f32).cbrt() * 2.0;
    (0..n as u64)
        .map(|id| {
            let center = Vec3::new(
                rng.next_range(-extent, extent),
                rng.next_range(-extent, extent),
                rng.next_range(-extent, extent),
            );
            Arc::new(BoxProxy::new(id, Aabb::from_center_half_extents(center, 0.5, 0.5, 0.5)))
        })
        .collect()
}

fn make_tree(proxies: &[Arc<BoxProxy>], workers: usize) -> TreeBroadPhase<BoxProxy> {
    let config = BroadPhaseConfig {
        workers,
        multithreaded: workers > 0,
        ..BroadPhaseConfig::default()
    };
    let bp = TreeBroadPhase::new(config).expect("bench: valid config");
    for proxy in proxies {
        bp.add(Arc::clone(proxy)).expect("bench: unique ids");
    }
    bp.update();
    bp
}

/// Small deterministic drift so every step refits without mass rebuilds.
fn drift(proxies: &[Arc<BoxProxy>], rng: &mut Prng) {
    for proxy in proxies {
        let offset = Vec3::new(rng.next_range(-0.05, 0.05), rng.next_range(-0.05, 0.05), rng.next_range(-0.05, 0.05));
        proxy.translate(&offset);
    }
}

fn bench_serial_vs_parallel(c: &mut Criterion) {
    let mut group = c.benchmark_group("serial_vs_parallel");
    group
        .warm_up_time(Duration::from_secs(2))
        .measurement_time(Duration::from_secs(5))
        .sample_size(30);

    for &n in &[500usize, 2_000, 8_000] {
        group.throughput(Throughput::Elements(n as u64));
        let proxies = make_scene(n);

        for (label, workers) in [("serial", 0usize), ("parallel_4w", 4)] {
            let bp = make_tree(&proxies, workers);
            let mut rng = Prng::from_seed_u64(7);
            group.bench_with_input(BenchmarkId::new(label, n), &n, |b, _| {
                b.iter(|| {
                    drift(&proxies, &mut rng);
                    black_box(bp.update())
                });
            });
        }
    }
    group.finish();
}

fn bench_worker_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("worker_scaling_4000");
    group
        .warm_up_time(Duration::from_secs(2))
        .measurement_time(Duration::from_secs(5))
        .sample_size(30);

    const ENTRIES: usize = 4_000;
    group.throughput(Throughput::Elements(ENTRIES as u64));
    let proxies = make_scene(ENTRIES);
    for &workers in &[1usize, 2, 4, 8] {
        let bp = make_tree(&proxies, workers);
        let mut rng = Prng::from_seed_u64(11);
        group.bench_with_input(BenchmarkId::from_parameter(workers), &workers, |b, _| {
            b.iter(|| {
                drift(&proxies, &mut rng);
                black_box(bp.update())
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_serial_vs_parallel, bench_worker_scaling);
criterion_main!(benches);
