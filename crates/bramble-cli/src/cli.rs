// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(name = "bramble", author, version, about = "Bramble broad-phase driver")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Time strategies over a scene of drifting boxes.
    Simulate(SimulateArgs),
    /// Check every strategy against the exhaustive reference.
    Verify(VerifyArgs),
    /// Print the default configuration as JSON.
    Defaults,
}

/// Broad-phase strategy selectable from the command line.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Strategy {
    /// Incremental AABB tree.
    Tree,
    /// Single-axis sort and sweep.
    Sap,
    /// Hashed uniform grid.
    Grid,
    /// Exhaustive all-pairs baseline.
    Brute,
}

/// Scene and configuration flags shared by every subcommand that runs one.
#[derive(Args, Debug, Clone)]
pub struct CommonArgs {
    /// Number of boxes in the scene.
    #[arg(long, default_value_t = 1000)]
    pub entries: usize,
    /// Seed for scene generation and motion.
    #[arg(long, default_value_t = 0x00b7_a3b1_e5ee_d000)]
    pub seed: u64,
    /// Worker threads (overrides the config file).
    #[arg(long)]
    pub workers: Option<usize>,
    /// Keep refit and traversal on the caller thread.
    #[arg(long)]
    pub single_threaded: bool,
    /// Half-size of the cube the boxes drift in.
    #[arg(long, default_value_t = 50.0)]
    pub extent: f32,
    /// JSON file with a broad-phase configuration; missing fields take defaults.
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Emit JSON instead of a table.
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct SimulateArgs {
    #[command(flatten)]
    pub common: CommonArgs,
    /// Updates to run.
    #[arg(long, default_value_t = 60)]
    pub steps: usize,
    /// Strategies to run (repeatable or comma separated).
    #[arg(long = "strategy", value_enum, value_delimiter = ',', default_value = "tree")]
    pub strategies: Vec<Strategy>,
}

#[derive(Args, Debug)]
pub struct VerifyArgs {
    #[command(flatten)]
    pub common: CommonArgs,
    /// Updates to check.
    #[arg(long, default_value_t = 10)]
    pub steps: usize,
}
