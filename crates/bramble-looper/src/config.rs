// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
use crate::looper::LooperError;

/// Chunk-sizing tunables for [`crate::ParallelLooper`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct LooperConfig {
    /// Lower bound on chunks handed to each worker, so late starters still
    /// find work to claim.
    pub min_chunks_per_worker: usize,
    /// Upper bound on iterations in one chunk.
    pub max_iterations_per_chunk: usize,
}

impl Default for LooperConfig {
    fn default() -> Self {
        Self {
            min_chunks_per_worker: 3,
            max_iterations_per_chunk: 80,
        }
    }
}

impl LooperConfig {
    /// Rejects zero-valued tunables.
    pub fn validate(&self) -> Result<(), LooperError> {
        if self.min_chunks_per_worker == 0 {
            return Err(LooperError::InvalidConfig("min_chunks_per_worker must be > 0"));
        }
        if self.max_iterations_per_chunk == 0 {
            return Err(LooperError::InvalidConfig(
                "max_iterations_per_chunk must be > 0",
            ));
        }
        Ok(())
    }
}

/// How a loop range is cut into claimable chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkPlan {
    /// Iterations per chunk (the last chunk may be shorter).
    pub size: usize,
    /// Number of chunks.
    pub count: usize,
}

/// Computes the chunk plan for `total` iterations over `workers` workers.
///
/// Chunk size is `total / (workers * min_chunks_per_worker)`, clamped to
/// `1..=max_iterations_per_chunk`.
pub fn chunk_plan(total: usize, workers: usize, config: &LooperConfig) -> ChunkPlan {
    if total == 0 {
        return ChunkPlan { size: 1, count: 0 };
    }
    let target_chunks = workers.max(1).saturating_mul(config.min_chunks_per_worker.max(1));
    let size = (total / target_chunks).clamp(1, config.max_iterations_per_chunk.max(1));
    ChunkPlan {
        size,
        count: total.div_ceil(size),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_ranges_use_unit_chunks() {
        let plan = chunk_plan(10, 4, &LooperConfig::default());
        assert_eq!(plan, ChunkPlan { size: 1, count: 10 });
    }

    #[test]
    fn large_ranges_cap_chunk_size() {
        let plan = chunk_plan(100_000, 4, &LooperConfig::default());
        assert_eq!(plan.size, 80);
        assert_eq!(plan.count, 1250);
    }

    #[test]
    fn mid_ranges_give_each_worker_min_chunks() {
        let plan = chunk_plan(120, 4, &LooperConfig::default());
        assert_eq!(plan, ChunkPlan { size: 10, count: 12 });
    }

    #[test]
    fn zero_tunables_are_rejected() {
        let cfg = LooperConfig {
            min_chunks_per_worker: 0,
            ..LooperConfig::default()
        };
        assert!(cfg.validate().is_err());
    }
}
