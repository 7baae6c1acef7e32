// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

/// Counters describing one `update` call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct UpdateStats {
    /// Entries tracked during the update.
    pub entries: usize,
    /// Nodes (or entries, for flat strategies) whose box was refreshed.
    pub refits: usize,
    /// Subtrees rebuilt because they outgrew their volume threshold.
    pub revalidations: usize,
    /// Exact box tests between two entries.
    pub pair_tests: usize,
    /// Pairs emitted after collision rules.
    pub overlaps: usize,
    /// Parallel tasks scheduled (0 when single-threaded).
    pub tasks: usize,
    /// Whether refit and traversal ran on the worker pool.
    pub multithreaded: bool,
}
