//! Length-prefixed framing over blocking byte streams.
//!
//! A frame is a 4-byte little-endian `u32` holding the payload length,
//! followed by exactly that many payload bytes. The same layout is used in
//! both directions.
//!
//! Decoding distinguishes three ways a stream can end:
//!
//! - zero bytes available at a frame boundary: [`Error::StreamClosed`], the
//!   normal shutdown signal;
//! - end of stream inside the header: [`Error::TruncatedHeader`];
//! - end of stream inside the payload: [`Error::TruncatedPayload`].

use crate::{DEFAULT_MAX_FRAME_BYTES, Error, HEADER_SIZE, Result};
use bytes::{BufMut, Bytes, BytesMut};
use std::io::{self, ErrorKind, Read, Write};

/// Encodes `payload` into a single contiguous frame (header + payload).
///
/// # Errors
///
/// Returns [`Error::FrameTooLarge`] if the payload length does not fit in the
/// 32-bit header.
pub fn encode_frame(payload: &[u8]) -> Result<Bytes> {
    let len = u32::try_from(payload.len()).map_err(|_| Error::FrameTooLarge {
        len: payload.len(),
        max: u32::MAX as usize,
    })?;
    let mut buf = BytesMut::with_capacity(HEADER_SIZE + payload.len());
    buf.put_u32_le(len);
    buf.put_slice(payload);
    Ok(buf.freeze())
}

/// Writes one frame with a single `write_all` call.
///
/// The caller is responsible for serializing concurrent writers and for
/// flushing.
pub fn write_frame<W: Write>(writer: &mut W, payload: &[u8]) -> Result<()> {
    let frame = encode_frame(payload)?;
    writer.write_all(&frame)?;
    Ok(())
}

/// Blocking frame decoder over any [`Read`].
///
/// Payloads larger than `max_frame_bytes` are consumed from the stream and
/// dropped so that the next read starts at a frame boundary again.
#[derive(Debug)]
pub struct FrameReader<R> {
    inner: R,
    max_frame_bytes: usize,
}

impl<R: Read> FrameReader<R> {
    pub const fn new(inner: R) -> Self {
        Self {
            inner,
            max_frame_bytes: DEFAULT_MAX_FRAME_BYTES,
        }
    }

    pub const fn with_max_frame_bytes(inner: R, max_frame_bytes: usize) -> Self {
        Self {
            inner,
            max_frame_bytes,
        }
    }

    /// Reads the next complete payload, blocking until it is available.
    ///
    /// # Errors
    ///
    /// - [`Error::StreamClosed`] when the stream ends at a frame boundary.
    /// - [`Error::TruncatedHeader`] / [`Error::TruncatedPayload`] when it ends
    ///   mid-frame.
    /// - [`Error::FrameTooLarge`] when the announced length exceeds the limit;
    ///   the payload has already been skipped and the reader remains usable.
    /// - [`Error::Io`] for any other read failure.
    pub fn read_frame(&mut self) -> Result<Vec<u8>> {
        let mut header = [0_u8; HEADER_SIZE];
        match read_full(&mut self.inner, &mut header)? {
            0 => return Err(Error::StreamClosed),
            HEADER_SIZE => {}
            read => return Err(Error::TruncatedHeader { read }),
        }

        let len = u32::from_le_bytes(header) as usize;
        if len > self.max_frame_bytes {
            self.discard(len)?;
            return Err(Error::FrameTooLarge {
                len,
                max: self.max_frame_bytes,
            });
        }

        let mut payload = vec![0_u8; len];
        let read = read_full(&mut self.inner, &mut payload)?;
        if read < len {
            return Err(Error::TruncatedPayload {
                read,
                expected: len,
            });
        }
        Ok(payload)
    }

    fn discard(&mut self, len: usize) -> Result<()> {
        let skipped = io::copy(&mut (&mut self.inner).take(len as u64), &mut io::sink())?;
        if skipped < len as u64 {
            return Err(Error::TruncatedPayload {
                read: skipped as usize,
                expected: len,
            });
        }
        Ok(())
    }
}

/// Fills `buf` from `reader`, returning fewer bytes only at end of stream.
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
