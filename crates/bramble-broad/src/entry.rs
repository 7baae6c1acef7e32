// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Entries: the externally owned objects a broad phase tracks.

use std::sync::atomic::{AtomicBool, Ordering};

use bramble_geom::{Aabb, Vec3};
use parking_lot::RwLock;

/// Stable identity of an entry. Pairs are canonicalized by it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EntryId(pub u64);

impl core::fmt::Display for EntryId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Outcome of a collision rule for a pair of entries.
///
/// Ordered from most to least permissive so the strictest of two rules is
/// their `max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CollisionRule {
    /// Report the pair.
    #[default]
    Allow,
    /// Let the broad phase's custom pair filter decide; without a filter the
    /// pair is reported and the narrow phase decides.
    Defer,
    /// Never report the pair.
    Reject,
}

/// Collaborator contract for objects tracked by a broad phase.
///
/// The broad phase pulls the box, activity and rule at every update; entries
/// must not change them while an update is in flight.
pub trait Entry: Send + Sync {
    /// Stable identity, unique within one broad phase.
    fn id(&self) -> EntryId;

    /// Current world-space bounding box.
    fn bounding_box(&self) -> Aabb;

    /// Inactive (sleeping) entries are only paired with active ones.
    fn is_active(&self) -> bool {
        true
    }

    /// Rule for pairing `self` with `other`. The broad phase always asks the
    /// entry with the lower id.
    fn collision_rule(&self, other: &Self) -> CollisionRule {
        let _ = other;
        CollisionRule::Allow
    }
}

/// Ready-made [`Entry`] holding an interior-mutable box.
///
/// Collision groups: entries sharing a non-zero group never pair; group 0
/// pairs with everything. A personal rule combines with the group rule, and
/// the stricter one wins.
#[derive(Debug)]
pub struct BoxProxy {
    id: EntryId,
    aabb: RwLock<Aabb>,
    active: AtomicBool,
    group: u32,
    rule: CollisionRule,
}

impl BoxProxy {
    /// Creates an active proxy in group 0 with an `Allow` personal rule.
    pub fn new(id: u64, aabb: Aabb) -> Self {
        Self {
            id: EntryId(id),
            aabb: RwLock::new(aabb),
            active: AtomicBool::new(true),
            group: 0,
            rule: CollisionRule::Allow,
        }
    }

    /// Sets the collision group.
    pub fn with_group(mut self, group: u32) -> Self {
        self.group = group;
        self
    }

    /// Sets the personal collision rule.
    pub fn with_rule(mut self, rule: CollisionRule) -> Self {
        self.rule = rule;
        self
    }

    /// Sets the activity flag.
    pub fn with_active(self, active: bool) -> Self {
        self.set_active(active);
        self
    }

    /// Replaces the bounding box.
    pub fn set_aabb(&self, aabb: Aabb) {
        *self.aabb.write() = aabb;
    }

    /// Moves the bounding box by `offset`.
    pub fn translate(&self, offset: &Vec3) {
        let mut aabb = self.aabb.write();
        *aabb = aabb.translated(offset);
    }

    /// Updates the activity flag.
    pub fn set_active(&self, active: bool) {
        self.active.store(active, Ordering::Relaxed);
    }

    /// Collision group.
    pub fn group(&self) -> u32 {
        self.group
    }
}

impl Entry for BoxProxy {
    fn id(&self) -> EntryId {
        self.id
    }

    fn bounding_box(&self) -> Aabb {
        *self.aabb.read()
    }

    fn is_active(&self) -> bool {
        self.active.load(Ordering::Relaxed)
    }

    fn collision_rule(&self, other: &Self) -> CollisionRule {
        let group = if self.group != 0 && self.group == other.group {
            CollisionRule::Reject
        } else {
            CollisionRule::Allow
        };
        self.rule.max(other.rule).max(group)
    }
}
