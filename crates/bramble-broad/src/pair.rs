// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
use std::sync::Arc;

use crate::entry::{CollisionRule, Entry, EntryId};

/// Canonical overlapping pair: `a < b`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OverlapPair {
    /// Lower entry id.
    pub a: EntryId,
    /// Higher entry id.
    pub b: EntryId,
}

impl OverlapPair {
    /// Orders two ids into a canonical pair.
    pub fn new(x: EntryId, y: EntryId) -> Self {
        if x <= y {
            Self { a: x, b: y }
        } else {
            Self { a: y, b: x }
        }
    }
}

/// Custom decision for pairs whose rule is [`CollisionRule::Defer`].
///
/// Arguments arrive ordered by id. Return `true` to report the pair.
pub type PairFilter<E> = Arc<dyn Fn(&E, &E) -> bool + Send + Sync>;

/// Single admission point for candidate pairs.
///
/// The caller guarantees the two boxes overlap. The pair is appended when at
/// least one side is active and the lower-id entry's rule admits it.
/// Returns whether the pair was appended.
pub fn try_to_add_overlap<E: Entry>(
    x: &E,
    y: &E,
    filter: Option<&PairFilter<E>>,
    out: &mut Vec<OverlapPair>,
) -> bool {
    let (xid, yid) = (x.id(), y.id());
    if xid == yid || !(x.is_active() || y.is_active()) {
        return false;
    }
    let (lo, hi) = if xid < yid { (x, y) } else { (y, x) };
    let admitted = match lo.collision_rule(hi) {
        CollisionRule::Allow => true,
        CollisionRule::Reject => false,
        CollisionRule::Defer => filter.map_or(true, |f| f(lo, hi)),
    };
    if admitted {
        out.push(OverlapPair { a: lo.id(), b: hi.id() });
    }
    admitted
}

/// Exhaustive O(n²) reference: every admitted overlapping pair, sorted.
pub fn brute_force_pairs<E: Entry>(
    entries: &[Arc<E>],
    filter: Option<&PairFilter<E>>,
) -> Vec<OverlapPair> {
    let boxes: Vec<_> = entries.iter().map(|e| e.bounding_box()).collect();
    let mut out = Vec::new();
    for i in 0..entries.len() {
        for j in (i + 1)..entries.len() {
            if boxes[i].overlaps(&boxes[j]) {
                try_to_add_overlap(entries[i].as_ref(), entries[j].as_ref(), filter, &mut out);
            }
        }
    }
    out.sort_unstable();
    out
}
