// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
use thiserror::Error;

/// Pool contract violations detected by the debug-build trackers.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PoolMisuse {
    /// The buffer or slot was not handed out by this pool.
    #[error("returned buffer or slot did not originate from this pool")]
    Foreign,
    /// The slot was already returned.
    #[error("slot {0} returned twice")]
    DoubleReturn(usize),
    /// The pool requires cleared buffers and this one still holds elements.
    #[error("buffer returned with {0} elements while the pool requires cleared returns")]
    NotCleared(usize),
    /// The buffer's capacity maps to no size class.
    #[error("capacity {0} does not match any size class")]
    SizeClassMismatch(usize),
}
