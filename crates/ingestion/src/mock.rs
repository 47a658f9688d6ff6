//! Scripted byte source
//!
//! Deterministic `AsyncRead` for pipeline tests without a serial device.

use std::collections::VecDeque;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, ReadBuf};

#[derive(Debug)]
enum Step {
    Bytes(Vec<u8>),
    Fail(io::ErrorKind),
    Stall,
}

/// Replays a fixed script of chunks, then reports end of stream
///
/// A `stall` step never completes, which models an idle serial link.
#[derive(Debug, Default)]
pub struct ScriptedSource {
    steps: VecDeque<Step>,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Source that yields `text` in one read
    pub fn from_text(text: &str) -> Self {
        Self::new().chunk(text.as_bytes())
    }

    /// Queue one read's worth of bytes
    pub fn chunk(mut self, bytes: impl AsRef<[u8]>) -> Self {
        self.steps.push_back(Step::Bytes(bytes.as_ref().to_vec()));
        self
    }

    /// Queue a read error
    pub fn fail(mut self, kind: io::ErrorKind) -> Self {
        self.steps.push_back(Step::Fail(kind));
        self
    }

    /// Stop producing anything, forever
    pub fn stall(mut self) -> Self {
        self.steps.push_back(Step::Stall);
        self
    }
}

impl AsyncRead for ScriptedSource {
    fn poll_read(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.steps.pop_front() {
            None => Poll::Ready(Ok(())),
            Some(Step::Bytes(mut bytes)) => {
                let n = bytes.len().min(buf.remaining());
                buf.put_slice(&bytes[..n]);
                if n < bytes.len() {
                    let rest = bytes.split_off(n);
                    self.steps.push_front(Step::Bytes(rest));
                }
                Poll::Ready(Ok(()))
            }
            Some(Step::Fail(kind)) => Poll::Ready(Err(io::Error::new(kind, "scripted failure"))),
            Some(Step::Stall) => {
                self.steps.push_front(Step::Stall);
                Poll::Pending
            }
        }
    }
}
