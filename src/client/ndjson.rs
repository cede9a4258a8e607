//! Line framing for newline-delimited JSON bodies.
//!
//! HTTP chunk boundaries have nothing to do with line boundaries: one chunk
//! may carry several events, and a long event may span many chunks. The
//! framer buffers the unterminated tail between chunks and hands back only
//! complete lines.

use crate::error::UniAiError;

/// Largest line accepted from a stream, in bytes.
///
/// Events embed the incremental response text, so lines can be long; the
/// ceiling keeps a runaway body from growing the buffer without bound.
pub const MAX_LINE_BYTES: usize = 512 * 1000;

/// Splits a byte stream into lines, enforcing [`MAX_LINE_BYTES`].
#[derive(Debug)]
pub struct LineFramer {
    buf: Vec<u8>,
    /// Prefix of `buf` already known to hold no `\n`.
    scanned: usize,
    max_line: usize,
}

impl Default for LineFramer {
    fn default() -> Self {
        Self::new(MAX_LINE_BYTES)
    }
}

impl LineFramer {
    pub fn new(max_line: usize) -> Self {
        Self {
            buf: Vec::new(),
            scanned: 0,
            max_line,
        }
    }

    /// Feed one chunk; returns every line it completed, without terminators.
    ///
    /// Blank lines are dropped. Fails once a line grows past the limit, even
    /// before its terminator arrives.
    pub fn push(&mut self, chunk: &[u8]) -> Result<Vec<Vec<u8>>, UniAiError> {
        self.buf.extend_from_slice(chunk);

        let mut lines = Vec::new();
        let mut start = 0;
        let mut from = self.scanned;
        while let Some(offset) = self.buf[from..].iter().position(|&b| b == b'\n') {
            let end = from + offset;
            self.take_line(start, end, &mut lines)?;
            start = end + 1;
            from = start;
        }
        self.buf.drain(..start);
        self.scanned = self.buf.len();

        if self.buf.len() > self.max_line {
            return Err(UniAiError::LineTooLong {
                limit: self.max_line,
            });
        }
        Ok(lines)
    }

    /// Flush the unterminated tail once the body has ended.
    pub fn finish(&mut self) -> Result<Option<Vec<u8>>, UniAiError> {
        let mut lines = Vec::new();
        let len = self.buf.len();
        self.take_line(0, len, &mut lines)?;
        self.buf.clear();
        self.scanned = 0;
        Ok(lines.pop())
    }

    fn take_line(&self, start: usize, end: usize, out: &mut Vec<Vec<u8>>) -> Result<(), UniAiError> {
        let mut line = &self.buf[start..end];
        if let Some(stripped) = line.strip_suffix(b"\r") {
            line = stripped;
        }
        if line.len() > self.max_line {
            return Err(UniAiError::LineTooLong {
                limit: self.max_line,
            });
        }
        if !line.iter().all(u8::is_ascii_whitespace) {
            out.push(line.to_vec());
        }
        Ok(())
    }
}
