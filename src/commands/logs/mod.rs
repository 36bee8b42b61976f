use anyhow::{bail, Context, Result};
use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::signal;
use tracing::debug;

use crate::agent::{LogKind, LogRequest};
use crate::commands::agent::connect;
use crate::config;
use crate::tail::{LineLimitReader, TailLimits};


/// Where the log bytes come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogSource {
    Stdin,
    File(PathBuf),
    Task {
        alloc_id: String,
        task: String,
        kind: LogKind,
    },
}

impl LogSource {
    /// `None` and `-` read standard input.
    pub fn from_path(path: Option<PathBuf>) -> Self {
        match path {
            Some(path) if path.as_os_str() != "-" => LogSource::File(path),
            _ => LogSource::Stdin,
        }
    }

    fn is_remote(&self) -> bool {
        matches!(self, LogSource::Task { .. })
    }
}

#[derive(Debug, Clone, Default)]
pub struct LogsOptions {
    pub lines: Option<usize>,
    pub search_limit: Option<usize>,
    pub timeout_ms: Option<u64>,
    pub address: Option<String>,
}

pub fn run(source: LogSource, options: LogsOptions) -> Result<()> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(run_logs(source, options))
}

async fn run_logs(source: LogSource, options: LogsOptions) -> Result<()> {
    let lines = options.lines.unwrap_or_else(config::get_default_lines);
    let limits = resolve_limits(lines, options.search_limit, options.timeout_ms, &source);
    debug!(?source, ?limits, "tailing logs");

    let tail = match source {
        LogSource::Stdin => tail_source(tokio::io::stdin(), limits).await?,
        LogSource::File(path) => {
            let file = tokio::fs::File::open(&path)
                .await
                .with_context(|| format!("Failed to open {}", path.display()))?;
            tail_source(file, limits).await?
        }
        LogSource::Task {
            alloc_id,
            task,
            kind,
        } => {
            if alloc_id.is_empty() || task.is_empty() {
                bail!("Both an allocation ID and a task name are required");
            }
            let client = connect(options.address)?;
            let request = LogRequest {
                alloc_id,
                task,
                kind,
                offset: limits.search_limit,
                follow: true,
            };
            let stream = client
                .stream_logs(&request)
                .await
                .context("Failed to open log stream")?;
            tail_source(stream, limits).await?
        }
    };

    let mut stdout = tokio::io::stdout();
    stdout.write_all(&tail).await?;
    if !tail.is_empty() && !tail.ends_with(b"\n") {
        stdout.write_all(b"\n").await?;
    }
    stdout.flush().await?;
    Ok(())
}

/// Work out the tail limits for a source.
///
/// The search limit defaults to the average line width times the line
/// count. Local sources wait for end-of-data unless a timeout is given,
/// remote follow streams fall back to the configured follow timeout.
pub fn resolve_limits(
    lines: usize,
    search_limit: Option<usize>,
    timeout_ms: Option<u64>,
    source: &LogSource,
) -> TailLimits {
    let mut limits = TailLimits::for_lines(lines);
    if let Some(search_limit) = search_limit {
        limits = limits.with_search_limit(search_limit);
    }

    let timeout_ms = match timeout_ms {
        Some(timeout_ms) => timeout_ms,
        None if source.is_remote() => config::get_follow_timeout_ms(),
        None => 0,
    };
    limits.with_time_limit(Duration::from_millis(timeout_ms))
}

/// Tail `source`, giving up on Ctrl+C.
async fn tail_source<R>(source: R, limits: TailLimits) -> Result<Vec<u8>>
where
    R: AsyncRead + Unpin,
{
    let ctrl_c = async {
        if signal::ctrl_c().await.is_err() {
            // No signal handler; only the source or the deadline can end the read.
            std::future::pending::<()>().await;
        }
    };
    tail_until(source, limits, ctrl_c).await
}

/// Tail `source` until it finishes or `interrupt` completes.
///
/// An interrupted read discards the partial tail and fails, so the command
/// exits non-zero instead of printing nothing as if the log were empty.
async fn tail_until<R, F>(source: R, limits: TailLimits, interrupt: F) -> Result<Vec<u8>>
where
    R: AsyncRead + Unpin,
    F: Future<Output = ()> + Send + 'static,
{
    let mut reader = LineLimitReader::with_limits(source, limits);
    let handle = reader.close_handle();
    let watcher = {
        let handle = handle.clone();
        tokio::spawn(async move {
            interrupt.await;
            handle.close();
        })
    };

    let mut out = Vec::new();
    let result = reader.read_to_end(&mut out).await;
    watcher.abort();

    result.context("Failed to read log stream")?;
    if handle.is_closed() {
        bail!("Interrupted before the log stream ended");
    }
    Ok(out)
}
