//! Blocking multi-consumer FIFO of pending jobs.
//!
//! [`JobQueue`] owns its lock, its wake-up conditions and its shutdown flag.
//! One instance is created per process and shared (via `Arc`) between the
//! dispatcher, which pushes, and the workers, which pop.
//!
//! ## Guarantees
//!
//! - Jobs are popped in push order, each by exactly one caller.
//! - After [`JobQueue::signal_shutdown`], queued jobs are still handed out;
//!   `pop` returns `None` only once the queue is both shut down and empty.
//! - With a maximum depth, `push` blocks while the queue is full.

use crate::{Error, Job, Result};
use core::num::NonZeroUsize;
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;

#[derive(Debug, Default)]
struct State {
    jobs: VecDeque<Job>,
    shutdown: bool,
}

#[derive(Debug, Default)]
pub struct JobQueue {
    state: Mutex<State>,
    /// Signalled when a job is pushed or shutdown is raised.
    available: Condvar,
    /// Signalled when a job is popped or shutdown is raised (bounded mode).
    space: Condvar,
    max_depth: Option<NonZeroUsize>,
}

impl JobQueue {
    /// Creates an unbounded queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a queue holding at most `max_depth` jobs; `None` is unbounded.
    pub fn with_max_depth(max_depth: Option<NonZeroUsize>) -> Self {
        Self {
            max_depth,
            ..Self::default()
        }
    }

    /// Appends a job to the tail, blocking while a bounded queue is full.
    ///
    /// # Errors
    ///
    /// Returns [`Error::QueueClosed`] if shutdown has been signalled, either
    /// before the call or while it was waiting for space. The job is dropped.
    pub fn push(&self, job: Job) -> Result<()> {
        let mut state = self.state.lock();
        if let Some(max) = self.max_depth {
            while !state.shutdown && state.jobs.len() >= max.get() {
                self.space.wait(&mut state);
            }
        }
        if state.shutdown {
            return Err(Error::QueueClosed);
        }
        state.jobs.push_back(job);
        drop(state);
        self.available.notify_one();
        Ok(())
    }

    /// Removes the job at the head, blocking until one is available.
    ///
    /// Returns `None` once shutdown has been signalled and nothing is left.
    pub fn pop(&self) -> Option<Job> {
        let mut state = self.state.lock();
        loop {
            if let Some(job) = state.jobs.pop_front() {
                drop(state);
                if self.max_depth.is_some() {
                    self.space.notify_one();
                }
                return Some(job);
            }
            if state.shutdown {
                return None;
            }
            self.available.wait(&mut state);
        }
    }

    /// Stops accepting jobs and wakes every blocked caller. Idempotent.
    pub fn signal_shutdown(&self) {
        let mut state = self.state.lock();
        if state.shutdown {
            return;
        }
        state.shutdown = true;
        drop(state);
        tracing::debug!("Job queue shutdown signalled");
        self.available.notify_all();
        self.space.notify_all();
    }

    pub fn is_shutdown(&self) -> bool {
        self.state.lock().shutdown
    }

    pub fn len(&self) -> usize {
        self.state.lock().jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().jobs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::thread::{self, scope};
    use std::time::Duration;

    fn job(n: usize) -> Job {
        Job::new(format!("job-{n}"), format!("/tmp/{n}.pdf"))
    }

    #[test]
    fn pops_in_push_order() {
        let queue = JobQueue::new();
        for n in 0..5 {
            queue.push(job(n)).unwrap();
        }
        for n in 0..5 {
            assert_eq!(queue.pop(), Some(job(n)));
        }
    }

    #[test]
    fn shutdown_drains_before_reporting_no_more_work() {
        let queue = JobQueue::new();
        queue.push(job(1)).unwrap();
        queue.push(job(2)).unwrap();
        queue.signal_shutdown();
        queue.signal_shutdown();
        assert!(queue.is_shutdown());

        assert_eq!(queue.pop(), Some(job(1)));
        assert_eq!(queue.pop(), Some(job(2)));
        assert_eq!(queue.pop(), None);
        assert_eq!(queue.pop(), None);
    }

    #[test]
    fn push_after_shutdown_is_rejected() {
        let queue = JobQueue::new();
        queue.signal_shutdown();
        assert!(matches!(queue.push(job(0)), Err(Error::QueueClosed)));
        assert!(queue.is_empty());
    }

    #[test]
    fn blocked_pop_wakes_on_push() {
        let queue = Arc::new(JobQueue::new());
        let consumer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || queue.pop())
        };
        thread::sleep(Duration::from_millis(20));
        queue.push(job(7)).unwrap();
        assert_eq!(consumer.join().unwrap(), Some(job(7)));
    }

    #[test]
    fn blocked_pops_wake_on_shutdown() {
        let queue = JobQueue::new();
        scope(|s| {
            let handles: Vec<_> = (0..4).map(|_| s.spawn(|| queue.pop())).collect();
            thread::sleep(Duration::from_millis(20));
            queue.signal_shutdown();
            for h in handles {
                assert_eq!(h.join().unwrap(), None);
            }
        });
    }

    #[test]
    fn concurrent_producers_and_consumers_see_each_job_once() {
        const PRODUCERS: usize = 4;
        const PER_PRODUCER: usize = 2_000;
        const CONSUMERS: usize = 8;

        let queue = JobQueue::new();
        let seen = scope(|s| {
            let consumers: Vec<_> = (0..CONSUMERS)
                .map(|_| {
                    s.spawn(|| {
                        let mut got = Vec::new();
                        while let Some(job) = queue.pop() {
                            got.push(job.id);
                        }
                        got
                    })
                })
                .collect();

            let producers: Vec<_> = (0..PRODUCERS)
                .map(|p| {
                    let queue = &queue;
                    s.spawn(move || {
                        for i in 0..PER_PRODUCER {
                            queue.push(job(p * PER_PRODUCER + i)).unwrap();
                        }
                    })
                })
                .collect();
            for p in producers {
                p.join().unwrap();
            }
            queue.signal_shutdown();

            consumers
                .into_iter()
                .flat_map(|c| c.join().unwrap())
                .collect::<Vec<_>>()
        });

        assert_eq!(seen.len(), PRODUCERS * PER_PRODUCER);
        let unique: HashSet<_> = seen.iter().collect();
        assert_eq!(unique.len(), PRODUCERS * PER_PRODUCER, "duplicate jobs popped");
    }

    #[test]
    fn bounded_push_blocks_until_space() {
        let queue = JobQueue::with_max_depth(NonZeroUsize::new(1));
        queue.push(job(0)).unwrap();
        let pushed = AtomicBool::new(false);

        scope(|s| {
            let producer = s.spawn(|| {
                queue.push(job(1)).unwrap();
                pushed.store(true, Ordering::SeqCst);
            });
            thread::sleep(Duration::from_millis(30));
            assert!(!pushed.load(Ordering::SeqCst), "push did not block");
            assert_eq!(queue.pop(), Some(job(0)));
            producer.join().unwrap();
        });

        assert!(pushed.load(Ordering::SeqCst));
        assert_eq!(queue.pop(), Some(job(1)));
    }

    #[test]
    fn bounded_push_waiting_for_space_fails_on_shutdown() {
        let queue = JobQueue::with_max_depth(NonZeroUsize::new(1));
        queue.push(job(0)).unwrap();
        scope(|s| {
            let producer = s.spawn(|| queue.push(job(1)));
            thread::sleep(Duration::from_millis(20));
            queue.signal_shutdown();
            assert!(matches!(producer.join().unwrap(), Err(Error::QueueClosed)));
        });
        assert_eq!(queue.len(), 1);
    }
}
