// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
use std::sync::Arc;

use bramble_geom::Aabb;
use rustc_hash::FxHashMap;

use crate::entry::{Entry, EntryId};
use crate::error::BroadPhaseError;

/// Dense entry storage for the flat strategies: entries and their cached
/// boxes share an index, and removal swaps the last entry into the hole.
#[derive(Debug)]
pub(crate) struct EntrySet<E> {
    entries: Vec<Arc<E>>,
    boxes: Vec<Aabb>,
    index: FxHashMap<EntryId, usize>,
}

impl<E> Default for EntrySet<E> {
    fn default() -> Self {
        Self { entries: Vec::new(), boxes: Vec::new(), index: FxHashMap::default() }
    }
}

impl<E: Entry> EntrySet<E> {
    pub(crate) fn add(&mut self, entry: Arc<E>) -> Result<(), BroadPhaseError> {
        let id = entry.id();
        if self.index.contains_key(&id) {
            return Err(BroadPhaseError::DuplicateEntry(id));
        }
        self.index.insert(id, self.entries.len());
        self.boxes.push(entry.bounding_box());
        self.entries.push(entry);
        Ok(())
    }

    pub(crate) fn remove(&mut self, id: EntryId) -> Result<Arc<E>, BroadPhaseError> {
        let slot = self.index.remove(&id).ok_or(BroadPhaseError::EntryNotFound(id))?;
        let entry = self.entries.swap_remove(slot);
        self.boxes.swap_remove(slot);
        if let Some(moved) = self.entries.get(slot) {
            self.index.insert(moved.id(), slot);
        }
        Ok(entry)
    }

    /// Re-reads every box.
    pub(crate) fn refresh(&mut self) {
        for (aabb, entry) in self.boxes.iter_mut().zip(&self.entries) {
            *aabb = entry.bounding_box();
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn entries(&self) -> &[Arc<E>] {
        &self.entries
    }

    pub(crate) fn boxes(&self) -> &[Aabb] {
        &self.boxes
    }

    pub(crate) fn get(&self, slot: usize) -> &E {
        &self.entries[slot]
    }
}
