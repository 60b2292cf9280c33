//! Inbound read loop.
//!
//! The dispatcher is the only reader of the inbound channel. It decodes one
//! frame at a time, turns each valid payload into a [`Job`] and pushes it onto
//! the [`JobQueue`], in frame order. It never touches the queue's shutdown
//! signal itself; it returns why reading stopped and lets the caller run the
//! shutdown sequence exactly once.
//!
//! Counters live in [`DispatchCounters`] rather than on the stack so the
//! caller can still read them if it has to stop waiting for a dispatcher
//! that is blocked on input.

use crate::server::sink::OutputSink;
use docpipe_core::{Error, FrameReader, Job, JobQueue};
use portable_atomic::{AtomicUsize, Ordering};
use std::io::{Read, Write};

/// Why the dispatcher stopped reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchEnd {
    /// The peer closed the stream at a frame boundary.
    Closed,
    /// The stream ended in the middle of a frame.
    Truncated,
    /// Reading the inbound stream failed.
    InputFailed,
    /// The outbound channel failed, so further jobs could not be answered.
    OutputFailed,
}

/// Counters for what the dispatcher read.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DispatchStats {
    pub accepted: usize,
    pub malformed: usize,
    pub oversized: usize,
}

/// Live counters updated by [`dispatch_loop`].
#[derive(Debug, Default)]
pub struct DispatchCounters {
    accepted: AtomicUsize,
    malformed: AtomicUsize,
    oversized: AtomicUsize,
}

impl DispatchCounters {
    pub fn snapshot(&self) -> DispatchStats {
        DispatchStats {
            accepted: self.accepted.load(Ordering::Acquire),
            malformed: self.malformed.load(Ordering::Acquire),
            oversized: self.oversized.load(Ordering::Acquire),
        }
    }
}

/// Reads frames until the inbound stream ends or becomes unusable.
///
/// Malformed and oversized payloads are logged and skipped. With a bounded
/// queue, a full queue blocks this loop, and with it, reads from the peer.
pub fn dispatch_loop<R, W>(
    reader: &mut FrameReader<R>,
    queue: &JobQueue,
    sink: &OutputSink<W>,
    counters: &DispatchCounters,
) -> DispatchEnd
where
    R: Read,
    W: Write + Send,
{
    loop {
        if sink.is_broken() {
            tracing::error!("Output channel failed; no longer accepting jobs");
            break DispatchEnd::OutputFailed;
        }

        let payload = match reader.read_frame() {
            Ok(payload) => payload,
            Err(Error::StreamClosed) => {
                tracing::info!("Input closed");
                break DispatchEnd::Closed;
            }
            Err(e @ (Error::TruncatedHeader { .. } | Error::TruncatedPayload { .. })) => {
                tracing::error!("Input ended mid-frame: {e}");
                break DispatchEnd::Truncated;
            }
            Err(e @ Error::FrameTooLarge { .. }) => {
                tracing::warn!("Skipping frame: {e}");
                counters.oversized.fetch_add(1, Ordering::AcqRel);
                continue;
            }
            Err(e) => {
                tracing::error!("Failed to read input: {e}");
                break DispatchEnd::InputFailed;
            }
        };

        let job = match Job::from_payload(&payload) {
            Ok(job) => job,
            Err(e) => {
                tracing::warn!("Skipping message: {e}");
                counters.malformed.fetch_add(1, Ordering::AcqRel);
                continue;
            }
        };

        tracing::debug!("Accepted job {} for {}", job.id, job.path);
        if let Err(e) = queue.push(job) {
            // Shutdown was signalled while this loop was still reading.
            tracing::error!("Job queue rejected job: {e}");
            break DispatchEnd::InputFailed;
        }
        counters.accepted.fetch_add(1, Ordering::AcqRel);
    }
}
