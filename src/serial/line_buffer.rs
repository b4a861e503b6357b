//! Line framing over a raw byte stream.
//!
//! Serial reads return arbitrary chunks; a line may be split across reads or
//! several lines may arrive in one. Bytes are kept until a `\n` completes a
//! line, so a read that times out mid-line loses nothing.

use bytes::{Buf, BytesMut};

/// Lines longer than this without a terminator are dropped.
pub const MAX_LINE_LENGTH: usize = 1024;

/// Accumulates bytes and yields complete lines
#[derive(Debug, Default)]
pub struct LineBuffer {
    buf: BytesMut,
}

impl LineBuffer {
    #[must_use]
    pub fn new() -> Self {
        Self {
            buf: BytesMut::with_capacity(MAX_LINE_LENGTH),
        }
    }

    /// Append freshly read bytes
    pub fn extend(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);

        // Runaway data with no newline: keep only the tail
        if self.buf.len() > MAX_LINE_LENGTH && !self.buf.contains(&b'\n') {
            let excess = self.buf.len() - MAX_LINE_LENGTH;
            self.buf.advance(excess);
        }
    }

    /// Take the next complete line, without its `\r\n` / `\n` terminator
    pub fn next_line(&mut self) -> Option<String> {
        let pos = self.buf.iter().position(|&b| b == b'\n')?;
        let raw = self.buf.split_to(pos + 1);
        let text = String::from_utf8_lossy(&raw);
        Some(text.trim_end_matches(['\r', '\n']).to_string())
    }

    /// Bytes waiting for a terminator
    #[must_use]
    pub fn pending(&self) -> usize {
        self.buf.len()
    }

    pub fn clear(&mut self) {
        self.buf.clear();
    }
}
