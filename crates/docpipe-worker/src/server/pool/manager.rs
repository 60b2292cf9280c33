//! Fixed-size pool of worker threads.
//!
//! This module defines the [`WorkerPool`] struct, which owns the join handles
//! of `N` OS threads all running [`worker_loop`] against the same
//! [`JobQueue`]. Work distribution is whatever order idle workers reach
//! `pop()`; there is no per-worker channel.
//!
//! Shutdown is driven from outside: once the dispatcher signals the queue,
//! every worker finishes its current job, drains what is left and exits, and
//! [`WorkerPool::join`] collects their counters.

use crate::server::{
    pool::worker::{WorkerStats, worker_loop},
    sink::OutputSink,
};
use docpipe_core::{Extractor, JobQueue};
use std::io::{self, Write};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Aggregated counters for the whole pool.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    pub workers: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Results not delivered: the write failed, or the output was already broken.
    pub emit_errors: usize,
    /// Worker threads that died from a panic outside the per-job boundary.
    pub panicked: usize,
}

pub struct WorkerPool {
    handles: Vec<(usize, JoinHandle<WorkerStats>)>,
}

impl WorkerPool {
    /// Spawns `num_workers` named threads consuming from `queue`.
    ///
    /// # Errors
    ///
    /// Returns the OS error if a thread cannot be spawned. Threads that did
    /// start are shut down and joined before returning, which also signals
    /// shutdown on `queue`.
    pub fn spawn<E, W>(
        num_workers: usize,
        queue: Arc<JobQueue>,
        extractor: Arc<E>,
        sink: Arc<OutputSink<W>>,
    ) -> io::Result<Self>
    where
        E: Extractor + ?Sized + 'static,
        W: Write + Send + 'static,
    {
        let mut pool = Self {
            handles: Vec::with_capacity(num_workers),
        };

        for worker_id in 0..num_workers {
            let queue_ref = Arc::clone(&queue);
            let extractor = Arc::clone(&extractor);
            let sink = Arc::clone(&sink);

            let spawned = thread::Builder::new()
                .name(format!("docpipe-worker-{worker_id}"))
                .spawn(move || worker_loop(worker_id, &queue_ref, &*extractor, &sink));

            match spawned {
                Ok(handle) => pool.handles.push((worker_id, handle)),
                Err(e) => {
                    tracing::error!("Failed to spawn worker {worker_id}: {e}");
                    queue.signal_shutdown();
                    pool.join();
                    return Err(e);
                }
            }
        }

        tracing::debug!("Spawned {num_workers} workers");
        Ok(pool)
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// Blocks until every worker has exited.
    ///
    /// Only returns once the queue has been shut down and drained. A worker
    /// that panicked is logged and counted; the remaining workers are still
    /// joined.
    pub fn join(self) -> PoolStats {
        let mut stats = PoolStats {
            workers: self.handles.len(),
            ..PoolStats::default()
        };

        for (worker_id, handle) in self.handles {
            match handle.join() {
                Ok(worker) => {
                    tracing::trace!("Worker {worker_id} joined: {worker:?}");
                    stats.succeeded += worker.succeeded;
                    stats.failed += worker.failed;
                    stats.emit_errors += worker.emit_errors;
                }
                Err(_) => {
                    tracing::error!("Worker {worker_id} terminated by panic");
                    stats.panicked += 1;
                }
            }
        }

        stats
    }
}
