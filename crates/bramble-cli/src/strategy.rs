// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
use anyhow::Result;
use bramble_broad::{
    BoxProxy, BroadPhase, BroadPhaseConfig, BruteForce, SortAndSweep, TreeBroadPhase, UniformGrid,
};

use crate::cli::Strategy;

/// Instantiates `strategy` with `config`.
pub fn build(strategy: Strategy, config: &BroadPhaseConfig) -> Result<Box<dyn BroadPhase<BoxProxy>>> {
    Ok(match strategy {
        Strategy::Tree => Box::new(TreeBroadPhase::new(*config)?),
        Strategy::Sap => Box::new(SortAndSweep::new()),
        Strategy::Grid => Box::new(UniformGrid::new(config)?),
        Strategy::Brute => Box::new(BruteForce::new()),
    })
}
