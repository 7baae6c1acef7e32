// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use bramble_broad::BroadPhaseConfig;
use serde::Serialize;
use tracing::info;

use crate::cli::SimulateArgs;
use crate::scene::Scene;
use crate::strategy;

/// Per-strategy outcome of a simulation run.
#[derive(Debug, Serialize)]
pub struct SimulationReport {
    pub strategy: &'static str,
    pub entries: usize,
    pub steps: usize,
    pub final_pairs: usize,
    pub mean_pairs: f64,
    pub mean_update_us: f64,
    pub max_update_us: f64,
    pub revalidations: usize,
    pub multithreaded_steps: usize,
}

/// Runs every requested strategy over the same scene and motion.
pub fn run(args: &SimulateArgs, config: &BroadPhaseConfig) -> Result<Vec<SimulationReport>> {
    let common = &args.common;
    let mut reports = Vec::with_capacity(args.strategies.len());
    for &choice in &args.strategies {
        let bp = strategy::build(choice, config)?;
        let mut scene = Scene::generate(common.seed, common.entries, common.extent);
        for proxy in &scene.proxies {
            bp.add(Arc::clone(proxy)).with_context(|| format!("adding to {}", bp.name()))?;
        }

        let mut total = Duration::ZERO;
        let mut slowest = Duration::ZERO;
        let mut pair_sum = 0_usize;
        let mut revalidations = 0;
        let mut multithreaded_steps = 0;
        let mut final_pairs = 0;
        for _ in 0..args.steps {
            let started = Instant::now();
            let stats = bp.update();
            let elapsed = started.elapsed();
            total += elapsed;
            slowest = slowest.max(elapsed);
            pair_sum += stats.overlaps;
            revalidations += stats.revalidations;
            multithreaded_steps += usize::from(stats.multithreaded);
            final_pairs = stats.overlaps;
            scene.step();
        }

        #[allow(clippy::cast_precision_loss)]
        let steps = args.steps.max(1) as f64;
        let report = SimulationReport {
            strategy: bp.name(),
            entries: bp.len(),
            steps: args.steps,
            final_pairs,
            mean_pairs: pair_sum as f64 / steps,
            mean_update_us: total.as_secs_f64() * 1e6 / steps,
            max_update_us: slowest.as_secs_f64() * 1e6,
            revalidations,
            multithreaded_steps,
        };
        info!(strategy = report.strategy, mean_us = report.mean_update_us, "simulation finished");
        reports.push(report);
    }
    Ok(reports)
}
