//! Error types for the framed job protocol.
//!
//! This module defines the central `Error` enum, which captures every
//! channel-level and queue-level condition the worker can observe. Per-job
//! extraction failures are not represented here: they are reported to the
//! peer as data (see [`crate::ExtractError`]) and never surface as an `Error`.
//!
//! ## Error Cases
//! - `StreamClosed`: The inbound stream ended cleanly at a frame boundary.
//! - `TruncatedHeader`: The inbound stream ended inside a length header.
//! - `TruncatedPayload`: The inbound stream ended inside a payload.
//! - `FrameTooLarge`: A header announced a payload above the configured limit.
//! - `MalformedPayload`: A payload could not be decoded into a job request.
//! - `QueueClosed`: A job was pushed after shutdown was signalled.
//! - `OutputClosed`: The outbound channel already failed; nothing more can be
//!   written.
//! - `Io`: Any other I/O failure on either channel.

pub type Result<T> = core::result::Result<T, Error>;

/// Unified error type for the docpipe protocol and queue.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The inbound stream ended with zero bytes available at a frame boundary.
    ///
    /// This is the normal termination path and is not reported as a failure.
    #[error("Stream closed")]
    StreamClosed,

    /// The inbound stream ended after `read` of the 4 header bytes.
    #[error("Stream closed inside frame header ({read} of 4 bytes)")]
    TruncatedHeader { read: usize },

    /// The inbound stream ended after `read` of `expected` payload bytes.
    #[error("Stream closed inside frame payload ({read} of {expected} bytes)")]
    TruncatedPayload { read: usize, expected: usize },

    /// The announced payload length exceeds the configured maximum.
    #[error("Frame of {len} bytes exceeds limit of {max} bytes")]
    FrameTooLarge { len: usize, max: usize },

    /// The payload bytes did not decode into the expected structure.
    #[error("Malformed payload: {0}")]
    MalformedPayload(#[from] serde_json::Error),

    /// The job queue no longer accepts work.
    #[error("Job queue is shut down")]
    QueueClosed,

    /// A previous write on the outbound channel failed.
    #[error("Output channel is closed")]
    OutputClosed,

    /// Underlying I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
