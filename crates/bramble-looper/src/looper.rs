// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread::JoinHandle;

use thiserror::Error;
use tracing::{debug, warn};

use crate::config::{chunk_plan, LooperConfig};
use crate::worker::{worker_main, BodyRef, LoopState, WorkerSignal};

/// Errors produced while configuring or growing a [`ParallelLooper`].
#[derive(Debug, Error)]
pub enum LooperError {
    /// The OS refused to spawn a worker thread.
    #[error("failed to spawn looper worker: {0}")]
    Spawn(#[from] std::io::Error),
    /// A tunable failed validation.
    #[error("invalid looper config: {0}")]
    InvalidConfig(&'static str),
}

struct WorkerHandle {
    signal: Arc<WorkerSignal>,
    thread: Option<JoinHandle<()>>,
}

/// Fork-join loop engine over a fixed pool of worker threads.
///
/// With no workers, [`ParallelLooper::for_loop`] runs the body inline on the
/// calling thread. The calling thread never runs chunks while workers exist;
/// it only waits on the join barrier.
pub struct ParallelLooper {
    workers: Vec<WorkerHandle>,
    state: Arc<LoopState>,
    config: LooperConfig,
    spawned: usize,
}

impl core::fmt::Debug for ParallelLooper {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ParallelLooper")
            .field("workers", &self.workers.len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Default for ParallelLooper {
    fn default() -> Self {
        Self::new(LooperConfig::default())
    }
}

impl ParallelLooper {
    /// Creates a looper with no workers.
    pub fn new(config: LooperConfig) -> Self {
        Self {
            workers: Vec::new(),
            state: Arc::new(LoopState::new()),
            config,
            spawned: 0,
        }
    }

    /// Creates a looper and spawns `workers` threads.
    pub fn with_workers(config: LooperConfig, workers: usize) -> Result<Self, LooperError> {
        config.validate()?;
        let mut looper = Self::new(config);
        for _ in 0..workers {
            looper.add_thread()?;
        }
        Ok(looper)
    }

    /// Number of worker threads.
    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Chunk-sizing tunables.
    pub fn config(&self) -> &LooperConfig {
        &self.config
    }

    /// Spawns one more worker.
    pub fn add_thread(&mut self) -> Result<(), LooperError> {
        let index = self.spawned;
        let signal = Arc::new(WorkerSignal::new());
        let thread = {
            let signal = Arc::clone(&signal);
            let state = Arc::clone(&self.state);
            std::thread::Builder::new()
                .name(format!("bramble-looper-{index}"))
                .spawn(move || worker_main(index, &signal, &state))?
        };
        self.spawned += 1;
        self.workers.push(WorkerHandle {
            signal,
            thread: Some(thread),
        });
        debug!(worker = index, total = self.workers.len(), "looper thread added");
        Ok(())
    }

    /// Terminates and joins the most recently added worker.
    ///
    /// Returns `false` if there was no worker to remove.
    pub fn remove_thread(&mut self) -> bool {
        let Some(mut handle) = self.workers.pop() else {
            return false;
        };
        shut_down(&mut handle);
        debug!(total = self.workers.len(), "looper thread removed");
        true
    }

    /// Runs `body(i)` for every `i` in `start..end` across the workers and
    /// returns once all iterations have completed.
    ///
    /// Iteration order is unspecified. If the body panics on a worker, the
    /// remaining chunks are abandoned and the first panic is resumed on the
    /// calling thread after every worker has stopped.
    pub fn for_loop<F>(&mut self, start: usize, end: usize, body: F)
    where
        F: Fn(usize) + Sync,
    {
        if end <= start {
            return;
        }
        if self.workers.is_empty() {
            (start..end).for_each(body);
            return;
        }

        let plan = chunk_plan(end - start, self.workers.len(), &self.config);
        let state = &*self.state;
        state.start.store(start, Ordering::Relaxed);
        state.end.store(end, Ordering::Relaxed);
        state.chunk_size.store(plan.size, Ordering::Relaxed);
        state.chunk_count.store(plan.count, Ordering::Relaxed);
        state.next_chunk.store(0, Ordering::Relaxed);
        state.outstanding.store(self.workers.len(), Ordering::Release);
        *state.done.lock() = false;

        // Declared before the erased body so it is dropped, and waited on,
        // while the body is still alive, unwinding included.
        let join = JoinOnDrop(state);
        let body: &(dyn Fn(usize) + Sync) = &body;
        let body = erase(body);
        for worker in &self.workers {
            worker.signal.wake(Some(body));
        }
        drop(join);

        if let Some(payload) = state.panic.lock().take() {
            std::panic::resume_unwind(payload);
        }
    }
}

/// Blocks on the join barrier when dropped.
struct JoinOnDrop<'a>(&'a LoopState);

impl Drop for JoinOnDrop<'_> {
    fn drop(&mut self) {
        let mut done = self.0.done.lock();
        while !*done {
            self.0.done_cv.wait(&mut done);
        }
    }
}

/// Extends the body reference to `'static` so it can cross into the
/// persistent worker threads.
#[allow(unsafe_code)]
fn erase<'a>(body: &'a (dyn Fn(usize) + Sync + 'a)) -> BodyRef {
    // SAFETY: `for_loop` holds a `JoinOnDrop` that blocks until every worker
    // has decremented `outstanding`, and workers drop their copy of the
    // reference before decrementing. Body panics are caught on the worker, so
    // the decrement always happens. The reference never outlives `'a`.
    let body: &'static (dyn Fn(usize) + Sync + 'static) = unsafe { core::mem::transmute(body) };
    BodyRef(body)
}

fn shut_down(handle: &mut WorkerHandle) {
    handle.signal.wake(None);
    if let Some(thread) = handle.thread.take() {
        if thread.join().is_err() {
            warn!("looper worker exited abnormally");
        }
    }
}

impl Drop for ParallelLooper {
    fn drop(&mut self) {
        for handle in &mut self.workers {
            shut_down(handle);
        }
    }
}
