// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
use bramble_looper::{LooperConfig, LooperError};
use thiserror::Error;

/// Tunables shared by every broad-phase strategy.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct BroadPhaseConfig {
    /// Revalidation threshold multiplier: an internal node is rebuilt once its
    /// volume exceeds the volume it had when last (re)built times this.
    pub growth_factor: f32,
    /// A node whose larger child holds more than this share of its leaves is
    /// re-split during revalidation.
    pub max_child_population_fraction: f32,
    /// Leaf count below which updates stay single-threaded; also the size
    /// bound of a parallel refit task.
    pub min_multithread_entries: usize,
    /// Nodes with fewer than twice this many leaves are never re-split.
    pub min_leaf_occupancy: usize,
    /// Enables parallel refit and traversal.
    pub multithreaded: bool,
    /// Worker threads spawned at construction; zero keeps everything on the
    /// caller thread.
    pub workers: usize,
    /// Edge length of a [`crate::UniformGrid`] cell.
    pub grid_cell_size: f32,
    /// Chunk sizing for the worker pool.
    pub looper: LooperConfig,
}

impl Default for BroadPhaseConfig {
    fn default() -> Self {
        Self {
            growth_factor: 1.4,
            max_child_population_fraction: 0.8,
            min_multithread_entries: 100,
            min_leaf_occupancy: 2,
            multithreaded: true,
            workers: 0,
            grid_cell_size: 4.0,
            looper: LooperConfig::default(),
        }
    }
}

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A tunable is outside its accepted range.
    #[error("invalid {name}: {reason}")]
    InvalidTunable {
        /// Field name.
        name: &'static str,
        /// Accepted range.
        reason: &'static str,
    },
    /// Worker pool rejected its configuration or failed to start.
    #[error("worker pool: {0}")]
    Looper(#[from] LooperError),
}

impl BroadPhaseConfig {
    /// Checks every tunable against its accepted range.
    ///
    /// # Errors
    /// Returns the first out-of-range tunable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.growth_factor.is_finite() && self.growth_factor > 1.0) {
            return Err(invalid("growth_factor", "must be finite and > 1"));
        }
        if !(self.max_child_population_fraction > 0.5 && self.max_child_population_fraction <= 1.0) {
            return Err(invalid("max_child_population_fraction", "must be in (0.5, 1]"));
        }
        if self.min_multithread_entries == 0 {
            return Err(invalid("min_multithread_entries", "must be >= 1"));
        }
        if self.min_leaf_occupancy == 0 {
            return Err(invalid("min_leaf_occupancy", "must be >= 1"));
        }
        if !(self.grid_cell_size.is_finite() && self.grid_cell_size > 0.0) {
            return Err(invalid("grid_cell_size", "must be finite and > 0"));
        }
        self.looper.validate()?;
        Ok(())
    }
}

const fn invalid(name: &'static str, reason: &'static str) -> ConfigError {
    ConfigError::InvalidTunable { name, reason }
}
