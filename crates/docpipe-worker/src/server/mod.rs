//! Process wiring: one dispatcher, one queue, one sink, `N` workers.
//!
//! ```text
//! input ─▶ FrameReader ─▶ dispatch_loop ─▶ JobQueue ─▶ worker × N ─▶ OutputSink ─▶ output
//! ```
//!
//! The dispatcher runs on its own thread. [`run`] waits on a [`StopSignal`]
//! that is tripped either by the dispatcher finishing or by the first failed
//! result write, then shuts the queue down and joins every worker. Every job
//! accepted before that point has had its result written (or its write
//! attempted) by the time [`run`] returns.
//!
//! After an output failure the dispatcher may still be blocked reading an
//! idle input pipe. It is left behind; the process exits without it.

pub mod config;
pub mod dispatcher;
pub mod pool;
pub mod sink;
pub mod stop;
pub mod telemetry;

use anyhow::Context;
use config::WorkerConfig;
use dispatcher::{DispatchCounters, DispatchEnd, DispatchStats, dispatch_loop};
use docpipe_core::{Extractor, FrameReader, JobQueue};
use pool::manager::{PoolStats, WorkerPool};
use sink::OutputSink;
use std::io::{Read, Write};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::process::ExitCode;
use std::sync::Arc;
use std::thread;
use stop::{StopReason, StopSignal};

/// Summary of one worker-process lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunReport {
    pub end: DispatchEnd,
    pub dispatch: DispatchStats,
    pub pool: PoolStats,
}

impl RunReport {
    /// Process exit code for this run.
    ///
    /// - `0`: input closed cleanly and every result was written.
    /// - `2`: input ended mid-frame.
    /// - `1`: an I/O failure on either channel, or a worker thread died.
    pub fn exit_code(&self) -> ExitCode {
        match self.end {
            DispatchEnd::Closed if self.pool.emit_errors == 0 && self.pool.panicked == 0 => {
                ExitCode::SUCCESS
            }
            DispatchEnd::Truncated => ExitCode::from(2),
            _ => ExitCode::FAILURE,
        }
    }
}

/// Runs the worker until `input` is exhausted or `output` fails, then drains
/// and shuts down.
///
/// # Errors
///
/// Returns an error only if the worker or dispatcher threads cannot be
/// started.
pub fn run<R, W>(
    config: &WorkerConfig,
    extractor: Arc<dyn Extractor>,
    input: R,
    output: W,
) -> anyhow::Result<RunReport>
where
    R: Read + Send + 'static,
    W: Write + Send + 'static,
{
    let stop = Arc::new(StopSignal::default());
    let queue = Arc::new(JobQueue::with_max_depth(config.max_queue_depth));
    let sink = Arc::new(OutputSink::with_stop_signal(output, Arc::clone(&stop)));
    let counters = Arc::new(DispatchCounters::default());
    let pool = WorkerPool::spawn(
        config.num_workers,
        Arc::clone(&queue),
        extractor,
        Arc::clone(&sink),
    )?;

    let spawned = {
        let queue = Arc::clone(&queue);
        let sink = Arc::clone(&sink);
        let counters = Arc::clone(&counters);
        let stop = Arc::clone(&stop);
        let max_frame_bytes = config.max_frame_bytes;
        thread::Builder::new()
            .name(String::from("docpipe-dispatcher"))
            .spawn(move || {
                let mut reader = FrameReader::with_max_frame_bytes(input, max_frame_bytes);
                let end = catch_unwind(AssertUnwindSafe(|| {
                    dispatch_loop(&mut reader, &queue, &sink, &counters)
                }));
                stop.trip(StopReason::DispatcherDone);
                end.unwrap_or_else(|_| {
                    tracing::error!("Dispatcher terminated by panic");
                    DispatchEnd::InputFailed
                })
            })
    };
    let dispatcher = match spawned {
        Ok(handle) => handle,
        Err(e) => {
            queue.signal_shutdown();
            pool.join();
            return Err(e).context("Failed to spawn dispatcher thread");
        }
    };

    let end = match stop.wait() {
        StopReason::DispatcherDone => dispatcher.join().unwrap_or(DispatchEnd::InputFailed),
        StopReason::OutputBroken => {
            tracing::error!("Output channel failed; stopping without waiting for input");
            DispatchEnd::OutputFailed
        }
    };

    tracing::info!(
        "Draining {} queued jobs across {} workers",
        queue.len(),
        pool.len()
    );
    queue.signal_shutdown();
    let pool = pool.join();
    let dispatch = counters.snapshot();

    tracing::info!(
        "Shutdown complete: accepted={} malformed={} oversized={} succeeded={} failed={} unsent={}",
        dispatch.accepted,
        dispatch.malformed,
        dispatch.oversized,
        pool.succeeded,
        pool.failed,
        pool.emit_errors
    );
    if pool.panicked > 0 {
        tracing::error!("{} of {} workers panicked", pool.panicked, pool.workers);
    }

    Ok(RunReport {
        end,
        dispatch,
        pool,
    })
}
