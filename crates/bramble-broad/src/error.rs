// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
use thiserror::Error;

use crate::config::ConfigError;
use crate::entry::EntryId;
use crate::query::QueryKind;

/// Errors returned by broad-phase operations.
#[derive(Debug, Error)]
pub enum BroadPhaseError {
    /// `remove` was called for an entry this broad phase does not hold.
    #[error("entry not found: {0}")]
    EntryNotFound(EntryId),
    /// `add` was called with an id already present.
    #[error("duplicate entry: {0}")]
    DuplicateEntry(EntryId),
    /// The strategy cannot answer this kind of query.
    #[error("{strategy} does not support {query} queries")]
    UnsupportedQuery {
        /// Strategy name as reported by [`crate::BroadPhase::name`].
        strategy: &'static str,
        /// Query that was rejected.
        query: QueryKind,
    },
    /// Configuration rejected at construction.
    #[error(transparent)]
    Config(#[from] ConfigError),
}
