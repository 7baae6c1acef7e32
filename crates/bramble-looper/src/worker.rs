// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Worker threads and the state they share with the looper.
//!
//! Worker lifecycle:
//! Waiting → (signalled with a body) → Claiming ⇄ Executing → Finished → Waiting;
//! Waiting → (signalled with no body) → Terminated.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::{Condvar, Mutex};
use tracing::{debug, trace};

/// Type-erased loop body.
///
/// The looper erases the body's lifetime before handing it to workers; it
/// stays valid because `for_loop` does not return until every worker has
/// finished with it.
#[derive(Clone, Copy)]
pub(crate) struct BodyRef(pub(crate) &'static (dyn Fn(usize) + Sync));

/// What a waiting worker is told to do next. `None` terminates the worker.
enum Signal {
    Idle,
    Wake(Option<BodyRef>),
}

/// Per-worker wake signal.
pub(crate) struct WorkerSignal {
    slot: Mutex<Signal>,
    cv: Condvar,
}

impl WorkerSignal {
    pub(crate) fn new() -> Self {
        Self {
            slot: Mutex::new(Signal::Idle),
            cv: Condvar::new(),
        }
    }

    /// Wakes the worker with `body`; `None` asks it to terminate.
    pub(crate) fn wake(&self, body: Option<BodyRef>) {
        let mut slot = self.slot.lock();
        *slot = Signal::Wake(body);
        self.cv.notify_one();
    }

    fn wait(&self) -> Option<BodyRef> {
        let mut slot = self.slot.lock();
        loop {
            match core::mem::replace(&mut *slot, Signal::Idle) {
                Signal::Wake(body) => return body,
                Signal::Idle => self.cv.wait(&mut slot),
            }
        }
    }
}

/// Counters and join barrier shared by the looper and every worker.
pub(crate) struct LoopState {
    pub(crate) start: AtomicUsize,
    pub(crate) end: AtomicUsize,
    pub(crate) chunk_size: AtomicUsize,
    pub(crate) chunk_count: AtomicUsize,
    pub(crate) next_chunk: AtomicUsize,
    pub(crate) outstanding: AtomicUsize,
    pub(crate) done: Mutex<bool>,
    pub(crate) done_cv: Condvar,
    pub(crate) panic: Mutex<Option<Box<dyn Any + Send>>>,
}

impl LoopState {
    pub(crate) fn new() -> Self {
        Self {
            start: AtomicUsize::new(0),
            end: AtomicUsize::new(0),
            chunk_size: AtomicUsize::new(1),
            chunk_count: AtomicUsize::new(0),
            next_chunk: AtomicUsize::new(0),
            outstanding: AtomicUsize::new(0),
            done: Mutex::new(true),
            done_cv: Condvar::new(),
            panic: Mutex::new(None),
        }
    }

    fn run_chunks(&self, body: BodyRef) {
        let start = self.start.load(Ordering::Relaxed);
        let end = self.end.load(Ordering::Relaxed);
        let size = self.chunk_size.load(Ordering::Relaxed);
        let count = self.chunk_count.load(Ordering::Relaxed);
        let result = catch_unwind(AssertUnwindSafe(|| loop {
            let chunk = self.next_chunk.fetch_add(1, Ordering::Relaxed);
            if chunk >= count {
                break;
            }
            let lo = start + chunk * size;
            let hi = (lo + size).min(end);
            for i in lo..hi {
                (body.0)(i);
            }
        }));
        if let Err(payload) = result {
            // Starve the other workers so the loop winds down quickly.
            self.next_chunk.store(count, Ordering::Relaxed);
            let mut slot = self.panic.lock();
            if slot.is_none() {
                *slot = Some(payload);
            }
        }
    }

    fn finish(&self) {
        if self.outstanding.fetch_sub(1, Ordering::AcqRel) == 1 {
            let mut done = self.done.lock();
            *done = true;
            self.done_cv.notify_all();
        }
    }
}

/// Worker thread entry point.
pub(crate) fn worker_main(index: usize, signal: &WorkerSignal, state: &LoopState) {
    debug!(worker = index, "looper worker waiting");
    while let Some(body) = signal.wait() {
        trace!(worker = index, "looper worker claiming");
        state.run_chunks(body);
        // The body must not be touched after this point.
        state.finish();
    }
    debug!(worker = index, "looper worker terminated");
}
