// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Power-of-two buffer pool.

#[cfg(debug_assertions)]
use rustc_hash::FxHashMap;
use tracing::trace;

use crate::misuse::PoolMisuse;

/// How returned buffers are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReturnPolicy {
    /// The pool clears buffers on return.
    #[default]
    ClearOnReturn,
    /// Callers must clear buffers before returning them; debug builds assert.
    RequireCleared,
}

/// Size class for a requested minimum length: the exponent of the smallest
/// power of two `>= min_size` (a request of 0 maps to capacity 1).
pub fn size_class(min_size: usize) -> usize {
    min_size.max(1).next_power_of_two().trailing_zeros() as usize
}

/// Non-thread-safe pool of `Vec<T>` buffers grouped by power-of-two capacity.
///
/// `take(n)` returns an empty buffer whose capacity is the smallest power of
/// two `>= n`; `give_back` files it under the class matching its capacity, so
/// a buffer that doubled while in use lands in a higher class. Buffers that
/// grew to a capacity that is not a power of two are dropped. A take after a
/// give-back of the same class reuses the allocation.
///
/// Debug builds remember the allocation of every buffer handed out and reject
/// returns they cannot attribute to one.
#[derive(Debug)]
pub struct BufferPool<T> {
    classes: Vec<Vec<Vec<T>>>,
    policy: ReturnPolicy,
    outstanding: usize,
    allocations: usize,
    /// Address of each lent allocation: (buffers lent at it, capacity).
    #[cfg(debug_assertions)]
    lent: FxHashMap<usize, (usize, usize)>,
}

impl<T> Default for BufferPool<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> BufferPool<T> {
    /// Creates an empty pool that clears buffers on return.
    pub fn new() -> Self {
        Self::with_policy(ReturnPolicy::ClearOnReturn)
    }

    /// Creates an empty pool with the given return policy.
    pub fn with_policy(policy: ReturnPolicy) -> Self {
        Self {
            classes: Vec::new(),
            policy,
            outstanding: 0,
            allocations: 0,
            #[cfg(debug_assertions)]
            lent: FxHashMap::default(),
        }
    }

    /// Takes an empty buffer with capacity of at least `min_size`.
    pub fn take(&mut self, min_size: usize) -> Vec<T> {
        let class = size_class(min_size);
        if self.classes.len() <= class {
            self.classes.resize_with(class + 1, Vec::new);
        }
        let buffer = match self.classes[class].pop() {
            Some(buffer) => buffer,
            None => {
                self.allocations += 1;
                trace!(class, "buffer pool allocating");
                Vec::with_capacity(1 << class)
            }
        };
        self.outstanding += 1;
        #[cfg(debug_assertions)]
        {
            let lent = self.lent.entry(buffer.as_ptr() as usize).or_insert((0, 0));
            lent.0 += 1;
            lent.1 = buffer.capacity();
        }
        buffer
    }

    /// Returns a buffer to the pool.
    ///
    /// # Panics
    /// In debug builds, panics if the buffer was not handed out by this pool
    /// (or was already returned), if it has no allocation, or (under
    /// [`ReturnPolicy::RequireCleared`]) if it still holds elements. Release
    /// builds do not check.
    pub fn give_back(&mut self, mut buffer: Vec<T>) {
        #[cfg(debug_assertions)]
        {
            let checked = self.check_return(&buffer);
            assert!(checked.is_ok(), "buffer pool misuse: {checked:?}");
        }
        self.outstanding = self.outstanding.saturating_sub(1);
        buffer.clear();
        let capacity = buffer.capacity();
        if !capacity.is_power_of_two() {
            trace!(capacity, "buffer pool dropping odd-sized buffer");
            return;
        }
        let class = capacity.trailing_zeros() as usize;
        if self.classes.len() <= class {
            self.classes.resize_with(class + 1, Vec::new);
        }
        self.classes[class].push(buffer);
    }

    /// Validates a return and forgets the lent allocation it settles.
    #[cfg(debug_assertions)]
    fn check_return(&mut self, buffer: &Vec<T>) -> Result<(), PoolMisuse> {
        if buffer.capacity() == 0 {
            return Err(PoolMisuse::SizeClassMismatch(0));
        }
        if self.policy == ReturnPolicy::RequireCleared && !buffer.is_empty() {
            return Err(PoolMisuse::NotCleared(buffer.len()));
        }
        let address = match self.lent.get(&(buffer.as_ptr() as usize)) {
            Some(_) => buffer.as_ptr() as usize,
            None => self.regrown_source(buffer.capacity()).ok_or(PoolMisuse::Foreign)?,
        };
        if let Some(lent) = self.lent.get_mut(&address) {
            lent.0 -= 1;
            if lent.0 == 0 {
                self.lent.remove(&address);
            }
        }
        Ok(())
    }

    /// A buffer that moved while in use must have outgrown one of the lent
    /// allocations: picks the largest lent capacity below `capacity`,
    /// lowest address first.
    #[cfg(debug_assertions)]
    fn regrown_source(&self, capacity: usize) -> Option<usize> {
        self.lent
            .iter()
            .filter(|&(_, &(_, lent))| lent < capacity)
            .max_by(|&(a, &(_, ca)), &(b, &(_, cb))| ca.cmp(&cb).then(b.cmp(a)))
            .map(|(&address, _)| address)
    }

    /// Number of buffers currently taken and not yet returned.
    pub fn outstanding(&self) -> usize {
        self.outstanding
    }

    /// Number of fresh allocations the pool has performed.
    pub fn allocations(&self) -> usize {
        self.allocations
    }

    /// Number of idle buffers filed under the class for `min_size`.
    pub fn pooled(&self, min_size: usize) -> usize {
        self.classes.get(size_class(min_size)).map_or(0, Vec::len)
    }

    /// Return policy of this pool.
    pub fn policy(&self) -> ReturnPolicy {
        self.policy
    }

    /// Drops every idle buffer. Outstanding buffers are unaffected.
    pub fn clear(&mut self) {
        self.classes.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn take_rounds_up_to_power_of_two() {
        let mut pool = BufferPool::<u32>::new();
        let buf = pool.take(5);
        assert_eq!(buf.capacity(), 8);
        assert!(buf.is_empty());
        pool.give_back(buf);
        assert_eq!(pool.take(0).capacity(), 1);
        assert_eq!(pool.take(64).capacity(), 64);
        assert_eq!(pool.take(65).capacity(), 128);
    }

    #[test]
    fn give_back_then_take_reuses_allocation() {
        let mut pool = BufferPool::<u32>::new();
        let mut buf = pool.take(7);
        buf.extend([1, 2, 3]);
        let ptr = buf.as_ptr();
        pool.give_back(buf);
        assert_eq!(pool.pooled(8), 1);
        let again = pool.take(6);
        assert_eq!(again.as_ptr(), ptr);
        assert!(again.is_empty());
        assert_eq!(pool.allocations(), 1);
        pool.give_back(again);
        assert_eq!(pool.outstanding(), 0);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "Foreign")]
    fn foreign_buffer_is_rejected_in_debug() {
        let mut pool = BufferPool::<u32>::new();
        pool.give_back(Vec::with_capacity(4));
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "NotCleared")]
    fn uncleared_return_is_rejected_when_required() {
        let mut pool = BufferPool::<u32>::with_policy(ReturnPolicy::RequireCleared);
        let mut buf = pool.take(4);
        buf.push(9);
        pool.give_back(buf);
    }

    #[test]
    fn grown_buffer_is_filed_only_at_an_exact_class() {
        let mut pool = BufferPool::<u32>::new();
        let mut buf = pool.take(2);
        for i in 0..100 {
            buf.push(i);
        }
        let capacity = buf.capacity();
        pool.give_back(buf);
        assert_eq!(pool.outstanding(), 0);
        assert_eq!(pool.pooled(2), 0);
        if capacity.is_power_of_two() {
            assert_eq!(pool.pooled(capacity), 1);
            assert_eq!(pool.take(capacity).capacity(), capacity);
            assert_eq!(pool.allocations(), 1);
        } else {
            assert_eq!(pool.pooled(capacity), 0);
        }
    }

    #[test]
    fn odd_capacity_return_never_serves_a_take() {
        let mut pool = BufferPool::<u32>::new();
        let mut buf = pool.take(2);
        buf.extend(0..100);
        pool.give_back(buf);
        assert_eq!(pool.take(64).capacity(), 64);
        assert_eq!(pool.take(100).capacity(), 128);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "Foreign")]
    fn foreign_buffer_is_rejected_while_others_are_out() {
        let mut pool = BufferPool::<u32>::new();
        let _held = pool.take(4);
        pool.give_back(Vec::with_capacity(4));
    }

    #[test]
    fn buffer_reallocated_while_out_is_accepted() {
        let mut pool = BufferPool::<u32>::new();
        let held = pool.take(4);
        let mut grown = pool.take(2);
        grown.extend(0..500);
        pool.give_back(grown);
        pool.give_back(held);
        assert_eq!(pool.outstanding(), 0);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "SizeClassMismatch")]
    fn unallocated_buffer_is_rejected_in_debug() {
        let mut pool = BufferPool::<u32>::new();
        let _held = pool.take(4);
        pool.give_back(Vec::new());
    }
}
