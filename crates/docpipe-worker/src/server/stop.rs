//! One-shot wake-up for the shutdown path.
//!
//! [`run`](crate::server::run) cannot rely on the dispatcher alone to notice
//! that the output channel died: the dispatcher may be parked in a blocking
//! read of an idle input pipe. Both the dispatcher and the
//! [`OutputSink`](crate::server::sink::OutputSink) trip the same
//! [`StopSignal`], and whichever gets there first decides why the process
//! stops.

use parking_lot::{Condvar, Mutex};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The dispatcher stopped reading input on its own.
    DispatcherDone,
    /// A result write failed; no further result can reach the peer.
    OutputBroken,
}

#[derive(Debug, Default)]
pub struct StopSignal {
    reason: Mutex<Option<StopReason>>,
    tripped: Condvar,
}

impl StopSignal {
    /// Records `reason` unless a reason was already recorded, and wakes every
    /// waiter.
    pub fn trip(&self, reason: StopReason) {
        let mut current = self.reason.lock();
        if current.is_some() {
            return;
        }
        *current = Some(reason);
        drop(current);
        tracing::debug!("Stop signal tripped: {reason:?}");
        self.tripped.notify_all();
    }

    /// Blocks until the signal is tripped and returns the first reason.
    pub fn wait(&self) -> StopReason {
        let mut current = self.reason.lock();
        loop {
            if let Some(reason) = *current {
                return reason;
            }
            self.tripped.wait(&mut current);
        }
    }
}
