//! A writer that caps the size of every write passed to its sink.
//!
//! Some transports reject writes over a fixed byte limit; wrapping their
//! sink in a [`BoundedWriter`] re-chunks larger writes transparently. A
//! single `write` call never hands the sink more than the limit, and
//! `write_all` over an N-byte input therefore reaches the sink in
//! ceil(N / L) chunks.

use std::io::{self, Write};

/// Enforces a maximum byte count per underlying write call.
#[derive(Debug)]
pub struct BoundedWriter<W> {
    inner: W,
    limit: usize,
}

impl<W> BoundedWriter<W> {
    /// Wrap a sink with a per-write byte limit.
    ///
    /// # Panics
    /// Panics if `limit` is zero.
    pub fn new(inner: W, limit: usize) -> Self {
        assert!(limit > 0, "chunk limit must be non-zero");
        Self { inner, limit }
    }

    /// The configured limit.
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Unwrap, returning the sink.
    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> Write for BoundedWriter<W> {
    /// Write at most `limit` bytes. The sink's own count is passed back
    /// untouched: a short write is flow control, not a failure, and the
    /// caller (or the `write_all` loop) continues from the new offset.
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        let cap = buf.len().min(self.limit);
        self.inner.write(&buf[..cap])
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
