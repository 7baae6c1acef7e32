// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Thread-safe wrapper around [`BufferPool`].

use parking_lot::Mutex;

use crate::buffer::{BufferPool, ReturnPolicy};

/// A [`BufferPool`] shared between threads.
///
/// The lock is `parking_lot`'s adaptive mutex: a short bounded spin, then a
/// park. Critical sections are a single push or pop, so contention resolves
/// in the spin phase almost always.
#[derive(Debug)]
pub struct LockingBufferPool<T> {
    inner: Mutex<BufferPool<T>>,
}

impl<T> Default for LockingBufferPool<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> LockingBufferPool<T> {
    /// Creates an empty shared pool that clears buffers on return.
    pub fn new() -> Self {
        Self::from_pool(BufferPool::new())
    }

    /// Creates an empty shared pool with the given return policy.
    pub fn with_policy(policy: ReturnPolicy) -> Self {
        Self::from_pool(BufferPool::with_policy(policy))
    }

    /// Wraps an existing pool.
    pub fn from_pool(pool: BufferPool<T>) -> Self {
        Self {
            inner: Mutex::new(pool),
        }
    }

    /// See [`BufferPool::take`].
    pub fn take(&self, min_size: usize) -> Vec<T> {
        self.inner.lock().take(min_size)
    }

    /// See [`BufferPool::give_back`].
    pub fn give_back(&self, buffer: Vec<T>) {
        self.inner.lock().give_back(buffer);
    }

    /// Number of buffers currently taken and not yet returned.
    pub fn outstanding(&self) -> usize {
        self.inner.lock().outstanding()
    }

    /// Number of fresh allocations performed so far.
    pub fn allocations(&self) -> usize {
        self.inner.lock().allocations()
    }

    /// Consumes the wrapper and returns the inner pool.
    pub fn into_inner(self) -> BufferPool<T> {
        self.inner.into_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn concurrent_take_and_give_back_balances() {
        let pool = LockingBufferPool::<u64>::new();
        std::thread::scope(|s| {
            for t in 0..4u64 {
                let pool = &pool;
                s.spawn(move || {
                    for i in 0..200u64 {
                        let mut buf = pool.take(((i % 17) + 1) as usize);
                        buf.push(t * 1000 + i);
                        pool.give_back(buf);
                    }
                });
            }
        });
        assert_eq!(pool.outstanding(), 0);
        // Request sizes 1..=17 span six classes; each thread holds at most
        // one buffer at a time.
        assert!(pool.allocations() <= 4 * 6);
    }
}
