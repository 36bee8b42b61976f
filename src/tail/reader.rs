use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use tokio::io::{AsyncRead, ReadBuf};
use tracing::{debug, trace};

use super::buffer::TailBuffer;
use super::deadline::{CloseHandle, DeadlineGate};
use super::TailLimits;

/// Size of each read issued against the source.
const CHUNK_SIZE: usize = 8 * 1024;

/// Chunks pulled in a single poll before yielding back to the executor.
const CHUNK_BUDGET: usize = 32;

/// Why the fill phase ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Finish {
    Eof,
    SearchLimit,
    Deadline,
}

#[derive(Debug)]
enum State {
    Filling(TailBuffer),
    Draining { tail: Vec<u8>, pos: usize },
    Closed,
}

/// Reads a source to completion and yields only its last lines.
///
/// The reader first pulls from the source until it reports end-of-data or
/// stalls for longer than the time limit, compacting its buffer to the last
/// lines after every chunk. If the search limit is scanned without finding
/// enough line boundaries, it stops early and passes through everything
/// retained so far. It then drops the source and serves what it kept.
/// Once drained, closed or failed, every further read reports end-of-data.
///
/// ```no_run
/// # async fn demo() -> std::io::Result<()> {
/// use std::time::Duration;
/// use tokio::io::AsyncReadExt;
/// use tailgate_lib::tail::LineLimitReader;
///
/// let file = tokio::fs::File::open("/var/log/syslog").await?;
/// let mut reader = LineLimitReader::new(file, 10, 10 * 120, Duration::ZERO);
/// let mut out = Vec::new();
/// reader.read_to_end(&mut out).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct LineLimitReader<R> {
    source: Option<R>,
    state: State,
    gate: DeadlineGate,
    close: CloseHandle,
    scratch: Box<[u8]>,
}

impl<R> LineLimitReader<R> {
    pub fn new(source: R, lines: usize, search_limit: usize, time_limit: Duration) -> Self {
        Self::with_limits(
            source,
            TailLimits {
                lines,
                search_limit,
                time_limit,
            },
        )
    }

    pub fn with_limits(source: R, limits: TailLimits) -> Self {
        Self {
            source: Some(source),
            state: State::Filling(TailBuffer::new(limits.lines, limits.search_limit)),
            gate: DeadlineGate::new(limits.time_limit),
            close: CloseHandle::default(),
            scratch: vec![0; CHUNK_SIZE].into_boxed_slice(),
        }
    }

    /// Handle that can close this reader from another task, waking any read
    /// currently parked on the source.
    pub fn close_handle(&self) -> CloseHandle {
        self.close.clone()
    }

    /// Drop the source and discard anything not yet read. Idempotent.
    pub fn close(&mut self) {
        self.close.close();
        self.shutdown();
    }

    pub fn is_closed(&self) -> bool {
        matches!(self.state, State::Closed)
    }

    /// True while the source is still held, i.e. before finalization.
    pub fn is_source_open(&self) -> bool {
        self.source.is_some()
    }

    fn shutdown(&mut self) {
        if self.source.take().is_some() {
            debug!("tail source closed before completion");
        }
        self.state = State::Closed;
    }

    fn finalize(&mut self, reason: Finish) {
        self.source = None;
        if let State::Filling(buffer) = std::mem::replace(&mut self.state, State::Closed) {
            debug!(
                ?reason,
                bytes_seen = buffer.bytes_seen(),
                lines_seen = buffer.lines_seen(),
                "tail source finished"
            );
            let tail = buffer.finish();
            if !tail.is_empty() {
                self.state = State::Draining { tail, pos: 0 };
            }
        }
    }
}

impl<R: AsyncRead + Unpin> LineLimitReader<R> {
    /// Pull from the source until the fill phase is over, racing each stall
    /// against the deadline gate.
    fn poll_fill(&mut self, cx: &mut Context<'_>) -> Poll<io::Result<Finish>> {
        let State::Filling(buffer) = &mut self.state else {
            return Poll::Ready(Ok(Finish::Eof));
        };
        let Some(source) = self.source.as_mut() else {
            return Poll::Ready(Ok(Finish::Eof));
        };

        for _ in 0..CHUNK_BUDGET {
            let mut chunk = ReadBuf::new(&mut self.scratch);
            match Pin::new(&mut *source).poll_read(cx, &mut chunk) {
                Poll::Ready(Ok(())) => {
                    let filled = chunk.filled();
                    if filled.is_empty() {
                        return Poll::Ready(Ok(Finish::Eof));
                    }
                    trace!(bytes = filled.len(), "tail chunk");
                    buffer.push(filled);
                    self.gate.disarm();
                    if buffer.is_degraded() {
                        return Poll::Ready(Ok(Finish::SearchLimit));
                    }
                }
                Poll::Ready(Err(err)) => return Poll::Ready(Err(err)),
                Poll::Pending => {
                    return self.gate.poll_expired(cx).map(|()| Ok(Finish::Deadline));
                }
            }
        }

        // The source is always ready; let other tasks run before continuing.
        cx.waker().wake_by_ref();
        Poll::Pending
    }
}

impl<R: AsyncRead + Unpin> AsyncRead for LineLimitReader<R> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();

        loop {
            if this.close.is_closed() {
                this.shutdown();
            }

            match &mut this.state {
                State::Closed => return Poll::Ready(Ok(())),
                State::Draining { tail, pos } => {
                    let n = buf.remaining().min(tail.len() - *pos);
                    buf.put_slice(&tail[*pos..*pos + n]);
                    *pos += n;
                    let drained = *pos == tail.len();
                    if drained {
                        this.state = State::Closed;
                    }
                    return Poll::Ready(Ok(()));
                }
                State::Filling(_) => {}
            }

            if this.close.poll_closed(cx).is_ready() {
                continue;
            }

            match this.poll_fill(cx) {
                Poll::Ready(Ok(reason)) => this.finalize(reason),
                Poll::Ready(Err(err)) => {
                    this.shutdown();
                    return Poll::Ready(Err(err));
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}
