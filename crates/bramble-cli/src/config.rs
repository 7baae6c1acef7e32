// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use bramble_broad::BroadPhaseConfig;
use tracing::debug;

use crate::cli::CommonArgs;

/// Loads the config file (if any), applies flag overrides and validates.
pub fn resolve(args: &CommonArgs) -> Result<BroadPhaseConfig> {
    let mut config = match &args.config {
        Some(path) => load(path)?,
        None => BroadPhaseConfig::default(),
    };
    if let Some(workers) = args.workers {
        config.workers = workers;
    }
    if args.single_threaded {
        config.multithreaded = false;
    }
    config.validate().context("invalid broad-phase configuration")?;
    debug!(?config, "configuration resolved");
    Ok(config)
}

fn load(path: &Path) -> Result<BroadPhaseConfig> {
    let bytes = fs::read(path).with_context(|| format!("reading config {}", path.display()))?;
    serde_json::from_slice(&bytes).with_context(|| format!("parsing config {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> CommonArgs {
        CommonArgs {
            entries: 10,
            seed: 1,
            workers: None,
            single_threaded: false,
            extent: 5.0,
            config: None,
            json: false,
        }
    }

    #[test]
    fn flags_override_defaults() {
        let mut a = args();
        a.workers = Some(3);
        a.single_threaded = true;
        let Ok(config) = resolve(&a) else { unreachable!("defaults are valid") };
        assert_eq!(config.workers, 3);
        assert!(!config.multithreaded);
    }

    #[test]
    fn missing_file_is_an_error() {
        let mut a = args();
        a.config = Some("/nonexistent/bramble.json".into());
        assert!(resolve(&a).is_err());
    }
}
