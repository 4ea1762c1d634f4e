//! Mock transport endpoints for exercising channel workers.
//!
//! [`ScriptedReader`] plays back a fixed byte script and then either
//! reports EOF or stays silent; [`RecordingWriter`] captures everything
//! written and can be told to fail. Both share a [`MockState`] that counts
//! I/O calls arriving after the test marks the endpoint closed — which is
//! how shutdown-ordering tests assert that no transport I/O happens once
//! `close_channel` has returned.

use std::collections::VecDeque;
use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

/// Shared observer for a pair of mock endpoints.
#[derive(Default)]
pub struct MockState {
    written: Mutex<Vec<u8>>,
    closed: AtomicBool,
    post_close_ops: AtomicUsize,
}

impl MockState {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Everything the writer half has recorded so far.
    pub fn written(&self) -> Vec<u8> {
        self.written
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Mark the endpoints closed; any read or write observed afterwards
    /// counts as a violation.
    pub fn mark_closed(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    /// Number of I/O calls observed after [`mark_closed`](Self::mark_closed).
    pub fn post_close_ops(&self) -> usize {
        self.post_close_ops.load(Ordering::SeqCst)
    }

    fn record_op(&self) {
        if self.closed.load(Ordering::SeqCst) {
            self.post_close_ops.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn record_write(&self, data: &[u8]) {
        self.written
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend_from_slice(data);
    }
}

/// Reader that yields scripted chunks, then either EOF or silence.
///
/// "Silence" means `Poll::Pending` without registering a waker: the read
/// never completes on its own, leaving the worker parked until the stop
/// signal wins its `select!`.
pub struct ScriptedReader {
    chunks: VecDeque<Vec<u8>>,
    then_eof: bool,
    state: Arc<MockState>,
}

impl ScriptedReader {
    pub fn new(
        chunks: impl IntoIterator<Item = Vec<u8>>,
        then_eof: bool,
        state: Arc<MockState>,
    ) -> Self {
        Self {
            chunks: chunks.into_iter().collect(),
            then_eof,
            state,
        }
    }

    /// A reader with nothing to say that never reaches EOF.
    pub fn silent(state: Arc<MockState>) -> Self {
        Self::new([], false, state)
    }
}

impl AsyncRead for ScriptedReader {
    fn poll_read(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        this.state.record_op();

        match this.chunks.pop_front() {
            Some(mut chunk) => {
                let n = chunk.len().min(buf.remaining());
                buf.put_slice(&chunk[..n]);
                if n < chunk.len() {
                    chunk.drain(..n);
                    this.chunks.push_front(chunk);
                }
                Poll::Ready(Ok(()))
            }
            // An empty filled buffer signals EOF to the caller.
            None if this.then_eof => Poll::Ready(Ok(())),
            None => Poll::Pending,
        }
    }
}

/// Writer that records everything, or fails every write when constructed
/// with [`failing`](Self::failing).
pub struct RecordingWriter {
    state: Arc<MockState>,
    fail_writes: bool,
}

impl RecordingWriter {
    pub fn new(state: Arc<MockState>) -> Self {
        Self {
            state,
            fail_writes: false,
        }
    }

    /// A writer whose every write fails with `BrokenPipe`.
    pub fn failing(state: Arc<MockState>) -> Self {
        Self {
            state,
            fail_writes: true,
        }
    }
}

impl AsyncWrite for RecordingWriter {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        data: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        this.state.record_op();

        if this.fail_writes {
            return Poll::Ready(Err(io::ErrorKind::BrokenPipe.into()));
        }
        this.state.record_write(data);
        Poll::Ready(Ok(data.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        self.state.record_op();
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}
