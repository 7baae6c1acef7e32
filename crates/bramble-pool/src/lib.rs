// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! bramble-pool: allocation recycling for the broad phase.
//!
//! Two pools live here:
//! - [`BufferPool`] hands out `Vec<T>` scratch buffers grouped by power-of-two
//!   capacity class; [`LockingBufferPool`] shares one across worker threads.
//! - [`ObjectPool`] is a slot arena: values are stored by index and freed
//!   slots are recycled, so tree nodes can be created and destroyed every
//!   frame without touching the allocator in steady state.
//!
//! Misuse (foreign buffers, double returns, uncleared returns) is checked with
//! assertions in debug builds only; release builds leave it unchecked.

mod buffer;
mod locking;
mod misuse;
mod object;

pub use buffer::{size_class, BufferPool, ReturnPolicy};
pub use locking::LockingBufferPool;
pub use misuse::PoolMisuse;
pub use object::ObjectPool;
