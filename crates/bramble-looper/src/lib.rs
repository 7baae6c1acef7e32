// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! bramble-looper: a fork-join loop engine over a fixed pool of workers.
//!
//! A [`ParallelLooper`] owns persistent OS threads. Each [`ParallelLooper::for_loop`]
//! call splits `start..end` into chunks, wakes every worker, and blocks until
//! the last worker reports completion. Workers claim chunks with an atomic
//! fetch-add, so load balances dynamically without a work queue.
//!
//! Only one loop runs at a time: `for_loop` takes `&mut self`, so a reentrant
//! call does not compile. There is no timeout and no cancellation; a loop
//! body that never returns hangs the caller.

mod config;
mod looper;
mod worker;

pub use config::{chunk_plan, ChunkPlan, LooperConfig};
pub use looper::{LooperError, ParallelLooper};
