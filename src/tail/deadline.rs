//! Idle deadline and out-of-band close signalling for [`LineLimitReader`].
//!
//! [`LineLimitReader`]: super::LineLimitReader

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use futures_util::task::AtomicWaker;
use tokio::time::{Instant, Sleep};

/// Idle timer raced against each attempt to read from the source.
///
/// The timer is armed lazily on the first poll of an attempt and disarmed
/// whenever the source hands over data, so every stall is bounded on its
/// own rather than the session as a whole.
#[derive(Debug)]
pub(crate) struct DeadlineGate {
    limit: Option<Duration>,
    sleep: Option<Pin<Box<Sleep>>>,
    armed: bool,
}

impl DeadlineGate {
    /// A zero limit disables the gate.
    pub(crate) fn new(limit: Duration) -> Self {
        Self {
            limit: (!limit.is_zero()).then_some(limit),
            sleep: None,
            armed: false,
        }
    }

    /// Resolves once the current attempt has waited longer than the limit.
    /// Never resolves when the gate is disabled.
    pub(crate) fn poll_expired(&mut self, cx: &mut Context<'_>) -> Poll<()> {
        let Some(limit) = self.limit else {
            return Poll::Pending;
        };

        let deadline = Instant::now() + limit;
        let sleep = self
            .sleep
            .get_or_insert_with(|| Box::pin(tokio::time::sleep_until(deadline)));
        if !self.armed {
            sleep.as_mut().reset(deadline);
            self.armed = true;
        }
        sleep.as_mut().poll(cx)
    }

    /// Start a fresh attempt: the next poll re-arms the timer from now.
    pub(crate) fn disarm(&mut self) {
        self.armed = false;
    }
}

#[derive(Debug, Default)]
struct CloseState {
    closed: AtomicBool,
    waker: AtomicWaker,
}

/// Cloneable handle that closes a reader from another task.
///
/// Closing wakes a read that is parked on the source or on the deadline; the
/// reader then drops its source and reports end-of-data.
#[derive(Debug, Clone, Default)]
pub struct CloseHandle {
    state: Arc<CloseState>,
}

impl CloseHandle {
    /// Request the reader to close. Safe to call any number of times.
    pub fn close(&self) {
        if !self.state.closed.swap(true, Ordering::AcqRel) {
            self.state.waker.wake();
        }
    }

    pub fn is_closed(&self) -> bool {
        self.state.closed.load(Ordering::Acquire)
    }

    /// Register the current task and report whether close was requested.
    pub(crate) fn poll_closed(&self, cx: &mut Context<'_>) -> Poll<()> {
        if self.is_closed() {
            return Poll::Ready(());
        }
        self.state.waker.register(cx.waker());
        // Re-check after registering so a concurrent close is not missed.
        if self.is_closed() {
            Poll::Ready(())
        } else {
            Poll::Pending
        }
    }
}
