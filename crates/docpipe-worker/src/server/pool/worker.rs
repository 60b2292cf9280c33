use crate::server::sink::OutputSink;
use docpipe_core::{Extractor, Job, JobQueue, JobResult};
use std::any::Any;
use std::io::Write;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::Path;

/// Per-worker job counters, returned when the worker exits.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WorkerStats {
    pub succeeded: usize,
    pub failed: usize,
    pub emit_errors: usize,
}

/// Body of one worker thread.
///
/// Pops jobs until the queue reports that shutdown was signalled and nothing
/// is left, extracting each one and handing the result to `sink`. A job
/// claimed here always runs to completion before shutdown is observed.
///
/// Nothing a job does ends the loop: extraction errors and panics become
/// `Failed` results, and a failed emit is counted and logged. Once the sink
/// is broken, remaining jobs are still popped but not extracted; each is
/// counted as an emit error.
///
/// # Arguments
///
/// - `worker_id`: Index of this worker, used for logs.
/// - `queue`: Shared job queue.
/// - `extractor`: Text-extraction backend.
/// - `sink`: Shared output channel.
pub fn worker_loop<E, W>(
    worker_id: usize,
    queue: &JobQueue,
    extractor: &E,
    sink: &OutputSink<W>,
) -> WorkerStats
where
    E: Extractor + ?Sized,
    W: Write + Send,
{
    tracing::trace!("Worker {worker_id} started");
    let mut stats = WorkerStats::default();

    while let Some(job) = queue.pop() {
        if sink.is_broken() {
            stats.emit_errors += 1;
            tracing::trace!("Worker {worker_id} skipping job {}: output closed", job.id);
            continue;
        }
        tracing::debug!("Worker {worker_id} processing job {}", job.id);

        let result = process_job(extractor, &job);
        match result.error() {
            None => stats.succeeded += 1,
            Some(error) => {
                stats.failed += 1;
                tracing::debug!("Job {} failed: {error}", job.id);
            }
        }

        if let Err(e) = sink.emit(&result) {
            stats.emit_errors += 1;
            tracing::trace!("Worker {worker_id} dropped result for job {}: {e}", job.id);
        }
    }

    tracing::trace!("Worker {worker_id} stopped");
    stats
}

/// Runs the extractor on `job.path` and turns whatever happens into a result.
///
/// Pages are joined with a single newline between them.
pub fn process_job<E>(extractor: &E, job: &Job) -> JobResult
where
    E: Extractor + ?Sized,
{
    let path = Path::new(&job.path);
    match catch_unwind(AssertUnwindSafe(|| extractor.extract(path))) {
        Ok(Ok(pages)) => JobResult::success(&job.id, pages.join("\n")),
        Ok(Err(e)) => JobResult::failed(&job.id, e.to_string()),
        Err(panic) => {
            let reason = panic_message(panic.as_ref());
            tracing::warn!("Extraction of {} panicked: {reason}", job.path);
            JobResult::failed(&job.id, format!("extraction panicked: {reason}"))
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s
    } else {
        "unknown panic payload"
    }
}
