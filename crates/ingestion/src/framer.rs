//! Line framing
//!
//! Splits an unbounded byte stream into newline-delimited lines and keeps the
//! ones that look like a single JSON object. Everything else is framing noise:
//! boot banners, debug prints, half lines after a reconnect.

use bytes::{Buf, BytesMut};
use contracts::CandidateRecord;
use tracing::trace;

/// Default upper bound on a partial line
pub const DEFAULT_MAX_LINE_BYTES: usize = 4096;

/// Incremental newline framer
///
/// Never blocks and never fails; consumed bytes are discarded.
#[derive(Debug)]
pub struct LineFramer {
    buf: BytesMut,
    max_line_bytes: usize,
    /// Bytes already scanned for a newline (avoids rescanning on every push)
    scanned: usize,
    /// Dropping the rest of an oversized line until the next newline
    discarding: bool,
    noise: u64,
}

impl Default for LineFramer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_LINE_BYTES)
    }
}

impl LineFramer {
    pub fn new(max_line_bytes: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(max_line_bytes.min(DEFAULT_MAX_LINE_BYTES)),
            max_line_bytes,
            scanned: 0,
            discarding: false,
            noise: 0,
        }
    }

    /// Feed a chunk, returning every record completed by it
    pub fn push(&mut self, chunk: &[u8]) -> Vec<CandidateRecord> {
        self.buf.extend_from_slice(chunk);

        let mut records = Vec::new();
        while let Some(offset) = self.buf[self.scanned..].iter().position(|b| *b == b'\n') {
            let end = self.scanned + offset;
            let line = self.buf.split_to(end + 1);
            self.scanned = 0;

            if std::mem::take(&mut self.discarding) {
                // tail of an oversized line, already counted
                continue;
            }
            self.classify(&line[..end], &mut records);
        }
        self.scanned = self.buf.len();

        if self.buf.len() > self.max_line_bytes {
            trace!(len = self.buf.len(), "partial line over limit, discarding");
            if !self.discarding {
                self.noise += 1;
            }
            self.discarding = true;
            self.buf.advance(self.buf.len());
            self.scanned = 0;
        }

        records
    }

    /// Frame the trailing unterminated line at end of stream
    pub fn finish(&mut self) -> Option<CandidateRecord> {
        let rest = self.buf.split();
        self.scanned = 0;
        if std::mem::take(&mut self.discarding) || rest.is_empty() {
            return None;
        }

        let mut records = Vec::with_capacity(1);
        self.classify(&rest, &mut records);
        records.pop()
    }

    /// Lines dropped so far (not object-shaped, or oversized)
    pub fn noise(&self) -> u64 {
        self.noise
    }

    /// Bytes held for an incomplete line
    pub fn pending(&self) -> usize {
        self.buf.len()
    }

    fn classify(&mut self, line: &[u8], out: &mut Vec<CandidateRecord>) {
        let text = String::from_utf8_lossy(line);
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return;
        }
        if trimmed.starts_with('{') && trimmed.ends_with('}') {
            out.push(CandidateRecord::new(trimmed));
        } else {
            trace!(line = %trimmed, "framing noise");
            self.noise += 1;
        }
    }
}
