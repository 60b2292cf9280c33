//! Single-writer output channel for result frames.
//!
//! Every worker shares one [`OutputSink`]. A result is serialized and framed
//! before the lock is taken; the lock then covers exactly one frame write and
//! the flush, so frames from different workers never interleave.
//!
//! Results are written in completion order. Two jobs submitted in order A, B
//! may be answered B, A; the peer matches them by `job_id`.

use crate::server::stop::{StopReason, StopSignal};
use docpipe_core::{Error, JobResult, Result, encode_frame};
use parking_lot::Mutex;
use portable_atomic::{AtomicBool, Ordering};
use std::io::Write;
use std::sync::Arc;

/// Largest payload the 32-bit length header can announce.
const MAX_RESULT_BYTES: usize = u32::MAX as usize;

pub struct OutputSink<W> {
    writer: Mutex<W>,
    broken: AtomicBool,
    stop: Arc<StopSignal>,
}

impl<W: Write + Send> OutputSink<W> {
    pub fn new(writer: W) -> Self {
        Self::with_stop_signal(writer, Arc::default())
    }

    /// Creates a sink that trips `stop` with [`StopReason::OutputBroken`] on
    /// its first failed write.
    pub fn with_stop_signal(writer: W, stop: Arc<StopSignal>) -> Self {
        Self {
            writer: Mutex::new(writer),
            broken: AtomicBool::new(false),
            stop,
        }
    }

    /// Writes one result frame.
    ///
    /// A result too large for a frame is replaced by a `Failed` result for the
    /// same job, so the peer still gets exactly one answer.
    ///
    /// # Errors
    ///
    /// - [`Error::OutputClosed`] if an earlier write already failed.
    /// - [`Error::Io`] if this write fails; the sink is marked broken.
    pub fn emit(&self, result: &JobResult) -> Result<()> {
        if self.is_broken() {
            return Err(Error::OutputClosed);
        }

        let frame = encode_frame(&result_payload(result, MAX_RESULT_BYTES)?)?;

        let mut writer = self.writer.lock();
        let written = writer.write_all(&frame).and_then(|()| writer.flush());
        drop(writer);

        written.map_err(|e| {
            self.broken.store(true, Ordering::Release);
            tracing::error!("Failed to write result for job {}: {e}", result.job_id);
            self.stop.trip(StopReason::OutputBroken);
            Error::Io(e)
        })
    }

    /// Returns `true` once a write has failed.
    pub fn is_broken(&self) -> bool {
        self.broken.load(Ordering::Acquire)
    }
}

/// Serializes `result`, substituting a `Failed` result when the payload
/// exceeds `max_bytes`.
fn result_payload(result: &JobResult, max_bytes: usize) -> Result<Vec<u8>> {
    let payload = result.to_payload()?;
    if payload.len() <= max_bytes {
        return Ok(payload);
    }
    tracing::error!(
        "Result for job {} is {} bytes, over the {max_bytes} byte frame limit",
        result.job_id,
        payload.len()
    );
    JobResult::failed(&result.job_id, "result too large").to_payload()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use docpipe_core::{FrameReader, HEADER_SIZE, JobStatus};
    use std::io::{self, Cursor};
    use std::thread::scope;

    /// Cloneable in-memory writer whose contents outlive the sink.
    #[derive(Clone, Default)]
    pub(crate) struct SharedBuf(pub(crate) Arc<Mutex<Vec<u8>>>);

    impl SharedBuf {
        pub(crate) fn results(&self) -> Vec<JobResult> {
            let bytes = self.0.lock().clone();
            let mut reader = FrameReader::new(Cursor::new(bytes));
            let mut out = Vec::new();
            loop {
                match reader.read_frame() {
                    Ok(payload) => out.push(JobResult::from_payload(&payload).unwrap()),
                    Err(Error::StreamClosed) => return out,
                    Err(e) => panic!("corrupt output stream: {e}"),
                }
            }
        }
    }

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            // Split writes into small pieces to give interleaving a chance.
            let n = buf.len().min(7);
            self.0.lock().extend_from_slice(&buf[..n]);
            Ok(n)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    /// Writer that fails every call, like a pipe whose reader has gone.
    pub(crate) struct ClosedPipe;

    impl Write for ClosedPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::from(io::ErrorKind::BrokenPipe))
        }

        fn flush(&mut self) -> io::Result<()> {
            Err(io::Error::from(io::ErrorKind::BrokenPipe))
        }
    }

    #[test]
    fn concurrent_emits_never_interleave() {
        const THREADS: usize = 8;
        const PER_THREAD: usize = 200;

        let buf = SharedBuf::default();
        let sink = OutputSink::new(buf.clone());
        let mut expected_bytes = 0;

        let payload_len = |r: &JobResult| r.to_payload().unwrap().len() + HEADER_SIZE;
        for t in 0..THREADS {
            for i in 0..PER_THREAD {
                expected_bytes += payload_len(&JobResult::success(
                    format!("{t}-{i}"),
                    "ü".repeat(t * 10 + i % 13),
                ));
            }
        }

        scope(|s| {
            for t in 0..THREADS {
                let sink = &sink;
                s.spawn(move || {
                    for i in 0..PER_THREAD {
                        let result =
                            JobResult::success(format!("{t}-{i}"), "ü".repeat(t * 10 + i % 13));
                        sink.emit(&result).unwrap();
                    }
                });
            }
        });

        assert_eq!(buf.0.lock().len(), expected_bytes);
        let results = buf.results();
        assert_eq!(results.len(), THREADS * PER_THREAD);
        assert!(results.iter().all(|r| r.status() == JobStatus::Success));
    }

    #[test]
    fn write_failure_breaks_the_sink() {
        let sink = OutputSink::new(ClosedPipe);
        let result = JobResult::success("a", "text");

        assert!(matches!(sink.emit(&result), Err(Error::Io(_))));
        assert!(sink.is_broken());
        assert!(matches!(sink.emit(&result), Err(Error::OutputClosed)));
    }

    #[test]
    fn write_failure_trips_the_stop_signal() {
        let stop = Arc::new(StopSignal::default());
        let sink = OutputSink::with_stop_signal(ClosedPipe, Arc::clone(&stop));

        assert!(sink.emit(&JobResult::success("a", "text")).is_err());
        assert_eq!(stop.wait(), StopReason::OutputBroken);
    }

    #[test]
    fn oversized_result_is_answered_with_failure() {
        let big = JobResult::success("big", "x".repeat(64));
        let payload = result_payload(&big, 32).unwrap();

        assert_eq!(
            JobResult::from_payload(&payload).unwrap(),
            JobResult::failed("big", "result too large")
        );

        let small = JobResult::success("small", "ok");
        let payload = result_payload(&small, 1024).unwrap();
        assert_eq!(JobResult::from_payload(&payload).unwrap(), small);
    }
}
