// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Slot-recycling object pool.

use core::ops::{Index, IndexMut};

use crate::misuse::PoolMisuse;

#[derive(Debug, Clone)]
enum Slot<T> {
    Occupied(T),
    Vacant,
}

/// Arena of `T` addressed by stable `usize` indices.
///
/// `take` stores a value in a recycled slot (or a new one) and returns its
/// index; `give_back` empties the slot and files it for reuse. Indices stay
/// valid until given back, which makes them usable as ownership-free
/// back-references between pooled objects.
#[derive(Debug, Clone)]
pub struct ObjectPool<T> {
    slots: Vec<Slot<T>>,
    free: Vec<usize>,
    outstanding: usize,
}

impl<T> Default for ObjectPool<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ObjectPool<T> {
    /// Creates an empty pool.
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            outstanding: 0,
        }
    }

    /// Creates an empty pool with room for `capacity` slots.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            free: Vec::new(),
            outstanding: 0,
        }
    }

    /// Stores `value` and returns its slot index.
    pub fn take(&mut self, value: T) -> usize {
        self.outstanding += 1;
        if let Some(index) = self.free.pop() {
            self.slots[index] = Slot::Occupied(value);
            index
        } else {
            self.slots.push(Slot::Occupied(value));
            self.slots.len() - 1
        }
    }

    /// Empties slot `index` and returns its value.
    ///
    /// # Panics
    /// In debug builds, panics when `index` is out of range or already
    /// vacant. Release builds return `None` in those cases.
    pub fn give_back(&mut self, index: usize) -> Option<T> {
        let checked = self.check(index);
        debug_assert!(checked.is_ok(), "object pool misuse: {checked:?}");
        checked.ok()?;
        let slot = core::mem::replace(&mut self.slots[index], Slot::Vacant);
        self.free.push(index);
        self.outstanding -= 1;
        match slot {
            Slot::Occupied(value) => Some(value),
            Slot::Vacant => None,
        }
    }

    fn check(&self, index: usize) -> Result<(), PoolMisuse> {
        match self.slots.get(index) {
            None => Err(PoolMisuse::Foreign),
            Some(Slot::Vacant) => Err(PoolMisuse::DoubleReturn(index)),
            Some(Slot::Occupied(_)) => Ok(()),
        }
    }

    /// Value in slot `index`, if occupied.
    pub fn get(&self, index: usize) -> Option<&T> {
        match self.slots.get(index) {
            Some(Slot::Occupied(value)) => Some(value),
            _ => None,
        }
    }

    /// Mutable value in slot `index`, if occupied.
    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        match self.slots.get_mut(index) {
            Some(Slot::Occupied(value)) => Some(value),
            _ => None,
        }
    }

    /// Number of occupied slots.
    pub fn outstanding(&self) -> usize {
        self.outstanding
    }

    /// Total slots, occupied or free.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Returns `true` if no slot is occupied.
    pub fn is_empty(&self) -> bool {
        self.outstanding == 0
    }

    /// Iterates occupied slots in index order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &T)> + '_ {
        self.slots.iter().enumerate().filter_map(|(i, slot)| match slot {
            Slot::Occupied(value) => Some((i, value)),
            Slot::Vacant => None,
        })
    }

    /// Empties every slot.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
        self.outstanding = 0;
    }
}

impl<T> Index<usize> for ObjectPool<T> {
    type Output = T;

    #[track_caller]
    fn index(&self, index: usize) -> &T {
        match &self.slots[index] {
            Slot::Occupied(value) => value,
            Slot::Vacant => vacant(index),
        }
    }
}

impl<T> IndexMut<usize> for ObjectPool<T> {
    #[track_caller]
    fn index_mut(&mut self, index: usize) -> &mut T {
        match &mut self.slots[index] {
            Slot::Occupied(value) => value,
            Slot::Vacant => vacant(index),
        }
    }
}

#[cold]
#[track_caller]
fn vacant(index: usize) -> ! {
    unreachable!("object pool slot {index} is vacant")
}
