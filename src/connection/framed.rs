//! Framed Stream
//!
//! Wraps a byte stream and exchanges whole NUL-terminated messages over it.
//!
//! ## Buffer Management
//!
//! TCP is a stream protocol: one read may carry half a message, or several
//! messages, or just the delimiter. Incoming bytes accumulate in a `BytesMut`
//! until a delimiter shows up. Only bytes that have not been searched yet
//! are scanned for it, so a large message arriving in many small reads costs
//! one pass.

use crate::connection::handler::{ConnectionError, ConnectionStats};
use crate::protocol::frame::{encode_frame, parse_frame, DELIMITER};
use bytes::BytesMut;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufWriter};
use tracing::{debug, trace};

/// Default upper bound for a single inbound message (16 MiB).
pub const DEFAULT_MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

/// Initial buffer capacity
const INITIAL_BUFFER_SIZE: usize = 4096;

/// A duplex stream that reads and writes NUL-delimited messages.
pub struct FramedStream<S> {
    /// The underlying stream; writes are buffered and flushed per message
    stream: BufWriter<S>,

    /// Bytes received but not yet returned as a message
    buffer: BytesMut,

    /// Prefix of `buffer` already known to contain no delimiter
    scanned: usize,

    /// Largest message accepted before giving up on the peer
    max_frame_size: usize,

    /// Connection statistics (shared)
    stats: Arc<ConnectionStats>,
}

impl<S: AsyncRead + AsyncWrite + Unpin> FramedStream<S> {
    pub fn new(stream: S, stats: Arc<ConnectionStats>) -> Self {
        Self {
            stream: BufWriter::new(stream),
            buffer: BytesMut::with_capacity(INITIAL_BUFFER_SIZE),
            scanned: 0,
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            stats,
        }
    }

    pub fn with_max_frame_size(mut self, max_frame_size: usize) -> Self {
        self.max_frame_size = max_frame_size;
        self
    }

    /// Reads the next message.
    ///
    /// Returns `Ok(None)` once the peer has closed the stream. Bytes of an
    /// unterminated trailing message are discarded at that point.
    ///
    /// A message of up to `max_frame_size` bytes (delimiter excluded) is
    /// accepted however the bytes are split across reads; a longer one
    /// fails with `FrameTooLarge`.
    pub async fn read_message(&mut self) -> Result<Option<String>, ConnectionError> {
        loop {
            if let Some(offset) = self.buffer[self.scanned..]
                .iter()
                .position(|&b| b == DELIMITER)
            {
                let size = self.scanned + offset;
                if size > self.max_frame_size {
                    return Err(ConnectionError::FrameTooLarge {
                        size,
                        max: self.max_frame_size,
                    });
                }

                self.scanned = 0;
                if let Some(message) = parse_frame(&mut self.buffer) {
                    trace!(
                        bytes = message.len(),
                        remaining = self.buffer.len(),
                        "Parsed message"
                    );
                    return Ok(Some(message));
                }
            }
            self.scanned = self.buffer.len();

            if self.buffer.len() > self.max_frame_size {
                return Err(ConnectionError::FrameTooLarge {
                    size: self.buffer.len(),
                    max: self.max_frame_size,
                });
            }

            // Ensure we have some capacity
            if self.buffer.capacity() - self.buffer.len() < 1024 {
                self.buffer.reserve(INITIAL_BUFFER_SIZE);
            }

            let n = self.stream.get_mut().read_buf(&mut self.buffer).await?;

            if n == 0 {
                if !self.buffer.is_empty() {
                    debug!(
                        discarded = self.buffer.len(),
                        "Stream closed inside a message"
                    );
                    self.buffer.clear();
                    self.scanned = 0;
                }
                return Ok(None);
            }

            self.stats.bytes_read(n);
            trace!(bytes = n, "Read data");
        }
    }

    /// Writes one message followed by the delimiter and flushes it.
    pub async fn write_message(&mut self, text: &str) -> Result<(), ConnectionError> {
        let frame = encode_frame(text);
        self.stream.write_all(&frame).await?;
        self.stream.flush().await?;
        self.stats.bytes_written(frame.len());
        trace!(bytes = frame.len(), "Sent message");
        Ok(())
    }

    /// Shuts down the write half of the stream.
    pub async fn shutdown(&mut self) -> Result<(), ConnectionError> {
        self.stream.shutdown().await?;
        Ok(())
    }
}
