// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use bramble_broad::{brute_force_pairs, BoxProxy, BroadPhase, BroadPhaseConfig, OverlapPair, TreeBroadPhase};
use serde::Serialize;
use tracing::{info, warn};

use crate::cli::{Strategy, VerifyArgs};
use crate::scene::Scene;
use crate::strategy;

/// One disagreement with the exhaustive reference.
#[derive(Debug, Serialize)]
pub struct Mismatch {
    pub step: usize,
    pub strategy: String,
    pub expected_pairs: usize,
    pub actual_pairs: usize,
    /// First pair (as `[a, b]` ids) present on one side only.
    pub first_difference: Option<[u64; 2]>,
}

/// Result of a verification run.
#[derive(Debug, Serialize)]
pub struct VerifyOutcome {
    pub entries: usize,
    pub steps: usize,
    pub strategies: Vec<String>,
    pub reference_pairs: usize,
    pub mismatches: Vec<Mismatch>,
}

impl VerifyOutcome {
    /// Fails when any mismatch was recorded.
    pub fn into_result(self) -> Result<()> {
        if self.mismatches.is_empty() {
            Ok(())
        } else {
            bail!("{} mismatch(es) against the reference", self.mismatches.len())
        }
    }
}

fn first_difference(expected: &[OverlapPair], actual: &[OverlapPair]) -> Option<[u64; 2]> {
    let differing = expected.iter().zip(actual).find(|(e, a)| e != a).map(|(e, a)| (*e).min(*a));
    differing
        .or_else(|| expected.get(actual.len()).copied())
        .or_else(|| actual.get(expected.len()).copied())
        .map(|pair| [pair.a.0, pair.b.0])
}

/// Runs the tree (parallel and serial), sort-and-sweep and the grid against
/// the exhaustive reference for every step.
pub fn run(args: &VerifyArgs, config: &BroadPhaseConfig) -> Result<VerifyOutcome> {
    let common = &args.common;
    let serial = BroadPhaseConfig { multithreaded: false, workers: 0, ..*config };
    let serial_tree: Box<dyn BroadPhase<BoxProxy>> = Box::new(TreeBroadPhase::new(serial)?);
    let candidates: Vec<(String, Box<dyn BroadPhase<BoxProxy>>)> = vec![
        (format!("tree ({} workers)", config.workers), strategy::build(Strategy::Tree, config)?),
        ("tree (serial)".to_owned(), serial_tree),
        ("sort-and-sweep".to_owned(), strategy::build(Strategy::Sap, config)?),
        ("uniform-grid".to_owned(), strategy::build(Strategy::Grid, config)?),
    ];

    let mut scene = Scene::generate(common.seed, common.entries, common.extent);
    for (name, bp) in &candidates {
        for proxy in &scene.proxies {
            bp.add(Arc::clone(proxy)).with_context(|| format!("adding to {name}"))?;
        }
    }

    let mut mismatches = Vec::new();
    let mut reference_pairs = 0;
    for step in 0..args.steps {
        let expected = brute_force_pairs(&scene.proxies, None);
        reference_pairs += expected.len();
        for (name, bp) in &candidates {
            bp.update();
            let actual = bp.overlaps();
            if *actual != *expected {
                warn!(step, strategy = %name, "pair list differs from reference");
                mismatches.push(Mismatch {
                    step,
                    strategy: name.clone(),
                    expected_pairs: expected.len(),
                    actual_pairs: actual.len(),
                    first_difference: first_difference(&expected, &actual),
                });
            }
        }
        scene.step();
    }
    info!(steps = args.steps, mismatches = mismatches.len(), "verification finished");
    Ok(VerifyOutcome {
        entries: common.entries,
        steps: args.steps,
        strategies: candidates.into_iter().map(|(name, _)| name).collect(),
        reference_pairs,
        mismatches,
    })
}

#[cfg(test)]
mod tests {
    use bramble_broad::EntryId;

    use super::*;

    fn pair(a: u64, b: u64) -> OverlapPair {
        OverlapPair { a: EntryId(a), b: EntryId(b) }
    }

    #[test]
    fn first_difference_finds_missing_and_extra_pairs() {
        let expected = [pair(1, 2), pair(2, 3)];
        assert_eq!(first_difference(&expected, &expected), None);
        assert_eq!(first_difference(&expected, &[pair(1, 2)]), Some([2, 3]));
        assert_eq!(first_difference(&expected, &[pair(1, 2), pair(2, 4)]), Some([2, 3]));
        assert_eq!(first_difference(&[pair(1, 2)], &expected), Some([2, 3]));
    }
}
