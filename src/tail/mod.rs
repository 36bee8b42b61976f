//! Bounded tail reading over live byte streams.
//!
//! [`LineLimitReader`] wraps any [`AsyncRead`] and yields at most the last N
//! lines of it, with a byte ceiling on how far it searches for line
//! boundaries and an idle timeout for sources that never reach end-of-data.

mod buffer;
mod deadline;
mod reader;


use std::io;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};

pub use buffer::TailBuffer;
pub use deadline::CloseHandle;
pub use reader::LineLimitReader;

/// Average line width used to derive a search limit from a line count.
pub const BYTES_PER_LINE: usize = 120;

/// Number of trailing lines shown when nothing else is configured.
pub const DEFAULT_LINES: usize = 10;

/// Limits for a single tail session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TailLimits {
    /// Trailing lines to keep. Zero produces no output.
    pub lines: usize,
    /// Bytes scanned backwards for line boundaries before giving up and
    /// passing the retained buffer through untrimmed.
    pub search_limit: usize,
    /// Longest stall tolerated between chunks. Zero waits for end-of-data.
    pub time_limit: Duration,
}

impl TailLimits {
    /// Limits for `lines` lines with a search limit of [`BYTES_PER_LINE`]
    /// bytes per line and no time limit.
    pub fn for_lines(lines: usize) -> Self {
        Self {
            lines,
            search_limit: lines.saturating_mul(BYTES_PER_LINE),
            time_limit: Duration::ZERO,
        }
    }

    pub fn with_search_limit(mut self, search_limit: usize) -> Self {
        self.search_limit = search_limit;
        self
    }

    pub fn with_time_limit(mut self, time_limit: Duration) -> Self {
        self.time_limit = time_limit;
        self
    }
}

impl Default for TailLimits {
    fn default() -> Self {
        Self::for_lines(DEFAULT_LINES)
    }
}

/// Read `source` through a [`LineLimitReader`] and collect the tail.
pub async fn read_tail<R>(source: R, limits: TailLimits) -> io::Result<Vec<u8>>
where
    R: AsyncRead + Unpin,
{
    let mut reader = LineLimitReader::with_limits(source, limits);
    let mut out = Vec::new();
    reader.read_to_end(&mut out).await?;
    Ok(out)
}
