//! Request-scoped cancellation and deadlines
//!
//! Every lifecycle call receives a [`Context`]. Provider code threads it down
//! to the HTTP layer so a cancelled or expired request stops waiting on the
//! network.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::AbortHandle;
use tokio::time::{self, Instant};

/// Context carries the cancellation signal of one call
#[derive(Clone)]
pub struct Context {
    inner: Arc<ContextInner>,
}

struct ContextInner {
    done: watch::Receiver<bool>,
    done_tx: watch::Sender<bool>,
    /// Deadline task of a [`Context::with_timeout`] child
    timer: Option<AbortHandle>,
}

impl Drop for ContextInner {
    fn drop(&mut self) {
        if let Some(timer) = &self.timer {
            timer.abort();
        }
    }
}

impl Context {
    pub fn new() -> Self {
        let (done_tx, done) = watch::channel(false);

        Self {
            inner: Arc::new(ContextInner {
                done,
                done_tx,
                timer: None,
            }),
        }
    }

    /// Derive a context that is cancelled once `timeout` has elapsed or the
    /// parent is cancelled. Cancelling or dropping the child stops its timer.
    /// Must be called from within a tokio runtime.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        let deadline = Instant::now() + timeout;
        let (done_tx, done) = watch::channel(self.is_cancelled());

        let timer_tx = done_tx.clone();
        let timer = tokio::spawn(async move {
            tokio::select! {
                _ = time::sleep_until(deadline) => {}
                _ = self.cancelled() => {}
            }
            let _ = timer_tx.send(true);
        });

        Self {
            inner: Arc::new(ContextInner {
                done,
                done_tx,
                timer: Some(timer.abort_handle()),
            }),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        *self.inner.done.borrow()
    }

    /// Receiver that flips to `true` when work for this context should stop
    pub fn done(&self) -> watch::Receiver<bool> {
        self.inner.done.clone()
    }

    /// Resolves once the context is cancelled
    pub async fn cancelled(&self) {
        let mut done = self.done();
        // The sender lives in `inner`, so the channel cannot close while we hold `self`.
        let _ = done.wait_for(|cancelled| *cancelled).await;
    }

    pub fn cancel(&self) {
        let _ = self.inner.done_tx.send(true);
        if let Some(timer) = &self.inner.timer {
            timer.abort();
        }
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}
