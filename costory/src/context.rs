//! Request-scoped cancellation and deadlines
//!
//! Every lifecycle call and every API operation receives a [`Context`]. The
//! API client races its retry backoff against [`Context::cancelled`], so a
//! cancelled or expired context stops a request before its next attempt.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::time;

/// Why a context finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    Canceled,
    DeadlineExceeded,
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CancelReason::Canceled => f.write_str("context canceled"),
            CancelReason::DeadlineExceeded => f.write_str("context deadline exceeded"),
        }
    }
}

/// Context carries the cancellation signal and optional deadline of one
/// request. Clones share the same signal.
#[derive(Clone)]
pub struct Context {
    inner: Arc<ContextInner>,
}

struct ContextInner {
    deadline: Option<Instant>,
    done: watch::Receiver<Option<CancelReason>>,
    done_tx: watch::Sender<Option<CancelReason>>,
}

impl Context {
    pub fn new() -> Self {
        let (done_tx, done) = watch::channel(None);

        Self {
            inner: Arc::new(ContextInner {
                deadline: None,
                done,
                done_tx,
            }),
        }
    }

    /// Returns a new context that finishes with
    /// [`CancelReason::DeadlineExceeded`] once `timeout` elapses. Cancelling
    /// `self` also finishes the new context with the same reason. Must be
    /// called from within a tokio runtime.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        let deadline = Instant::now() + timeout;
        let (done_tx, done) = watch::channel(self.err());

        let timer_tx = done_tx.clone();
        tokio::spawn(async move {
            let reason = tokio::select! {
                reason = self.cancelled() => reason,
                _ = time::sleep_until(deadline.into()) => CancelReason::DeadlineExceeded,
                // Every derived context was dropped.
                _ = timer_tx.closed() => return,
            };
            timer_tx.send_if_modified(|state| {
                if state.is_none() {
                    *state = Some(reason);
                    true
                } else {
                    false
                }
            });
        });

        Self {
            inner: Arc::new(ContextInner {
                deadline: Some(deadline),
                done,
                done_tx,
            }),
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.inner.deadline
    }

    pub fn is_cancelled(&self) -> bool {
        self.err().is_some()
    }

    /// The reason this context finished, if it has.
    pub fn err(&self) -> Option<CancelReason> {
        *self.inner.done.borrow()
    }

    pub fn cancel(&self) {
        self.inner.done_tx.send_if_modified(|state| {
            if state.is_none() {
                *state = Some(CancelReason::Canceled);
                true
            } else {
                false
            }
        });
    }

    /// Resolves once the context is cancelled or its deadline passes.
    pub async fn cancelled(&self) -> CancelReason {
        let mut done = self.inner.done.clone();
        let state = done.wait_for(|state| state.is_some()).await.map(|state| *state);
        match state {
            Ok(reason) => reason.unwrap_or(CancelReason::Canceled),
            // The sender lives as long as `self`, so this branch is unreachable
            // while the context is borrowed.
            Err(_) => std::future::pending().await,
        }
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("deadline", &self.inner.deadline)
            .field("err", &self.err())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::sleep;

    #[tokio::test]
    async fn context_timeout_cancels() {
        let ctx = Context::new().with_timeout(Duration::from_millis(50));

        assert!(!ctx.is_cancelled());

        sleep(Duration::from_millis(120)).await;

        assert!(ctx.is_cancelled());
        assert_eq!(ctx.err(), Some(CancelReason::DeadlineExceeded));
    }

    #[tokio::test]
    async fn context_manual_cancel() {
        let ctx = Context::new();
        let clone = ctx.clone();

        assert!(!ctx.is_cancelled());

        clone.cancel();

        assert!(ctx.is_cancelled());
        assert_eq!(ctx.err(), Some(CancelReason::Canceled));
    }

    #[tokio::test]
    async fn first_reason_wins() {
        let ctx = Context::new().with_timeout(Duration::from_millis(20));
        ctx.cancel();

        sleep(Duration::from_millis(60)).await;

        assert_eq!(ctx.err(), Some(CancelReason::Canceled));
    }

    #[test]
    fn cancelled_is_pending_until_cancel() {
        let ctx = Context::new();
        let waiter = ctx.clone();
        let mut fut = tokio_test::task::spawn(async move { waiter.cancelled().await });

        tokio_test::assert_pending!(fut.poll());

        ctx.cancel();

        assert!(fut.is_woken());
        assert_eq!(tokio_test::assert_ready!(fut.poll()), CancelReason::Canceled);
    }

    #[tokio::test]
    async fn cancelling_parent_cancels_derived_context() {
        let parent = Context::new();
        let child = parent.clone().with_timeout(Duration::from_secs(30));

        parent.cancel();

        let reason = time::timeout(Duration::from_secs(1), child.cancelled())
            .await
            .unwrap();
        assert_eq!(reason, CancelReason::Canceled);
        assert_eq!(child.err(), Some(CancelReason::Canceled));
    }

    #[tokio::test]
    async fn derived_context_of_cancelled_parent_starts_cancelled() {
        let parent = Context::new();
        parent.cancel();

        let child = parent.with_timeout(Duration::from_secs(30));
        assert_eq!(child.err(), Some(CancelReason::Canceled));
    }

    #[tokio::test]
    async fn cancelling_derived_context_leaves_parent_running() {
        let parent = Context::new();
        let child = parent.clone().with_timeout(Duration::from_secs(30));

        child.cancel();

        assert!(child.is_cancelled());
        assert!(!parent.is_cancelled());
    }

    #[tokio::test]
    async fn context_deadline() {
        let ctx = Context::new();
        assert!(ctx.deadline().is_none());

        let ctx_with_timeout = ctx.with_timeout(Duration::from_secs(1));
        assert!(ctx_with_timeout.deadline().is_some());
    }
}
