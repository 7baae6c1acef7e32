// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! `bramble`: drive the broad-phase strategies over synthetic scenes.
//!
//! - `simulate` times one or more strategies over drifting boxes.
//! - `verify` checks every strategy against the exhaustive reference and
//!   exits non-zero on the first disagreement.
//! - `defaults` prints the default configuration as JSON.
//!
//! Logs go to stderr and honour `RUST_LOG`.

use std::io::Write;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod config;
mod report;
mod scene;
mod simulate;
mod strategy;
mod verify;

use cli::{Cli, Command};

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    let mut out = std::io::stdout().lock();
    match cli.command {
        Command::Simulate(args) => {
            let config = config::resolve(&args.common)?;
            let reports = simulate::run(&args, &config)?;
            if args.common.json {
                report::write_json(&mut out, &reports)?;
            } else {
                writeln!(out, "{}", report::simulation_table(&reports))?;
            }
        }
        Command::Verify(args) => {
            let config = config::resolve(&args.common)?;
            let outcome = verify::run(&args, &config)?;
            if args.common.json {
                report::write_json(&mut out, &outcome)?;
            } else {
                writeln!(out, "{}", report::verify_table(&outcome))?;
            }
            outcome.into_result()?;
        }
        Command::Defaults => {
            report::write_json(&mut out, &bramble_broad::BroadPhaseConfig::default())?;
        }
    }
    Ok(())
}
