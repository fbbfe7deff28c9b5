//! Cooperative cancellation scope handed to every pipeline stage.

use crate::{
    error::CancelCause,
    util::abort_on_drop::AbortOnDrop,
};
use std::{
    sync::{Arc, OnceLock},
    time::Duration,
};
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;


/// Cancellation scope with a cause
///
/// A thin layer over [`CancellationToken`] that remembers *why* it fired. Cloning a context yields
/// another handle to the same scope. Contexts form a tree: a [`child`](Self::child) fires when its
/// parent fires and reports the parent's cause, while cancelling a child leaves the parent alone.
///
/// Every stage in this crate races each of its blocking waits against
/// [`cancelled`](Self::cancelled), giving cancellation precedence.
#[derive(Debug, Clone)]
pub struct Context(Arc<Inner>);

#[derive(Debug)]
struct Inner {
    token: CancellationToken,
    // set at most once, by whoever fires this scope first. shared with the deadline timer task.
    cause: Arc<OnceLock<CancelCause>>,
    parent: Option<Context>,
    // aborts the deadline timer once the last handle to this scope is gone
    _deadline: Option<AbortOnDrop>,
}

impl Context {
    /// Create a root context which only fires when cancelled explicitly
    pub fn new() -> Self {
        Context(Arc::new(Inner {
            token: CancellationToken::new(),
            cause: Default::default(),
            parent: None,
            _deadline: None,
        }))
    }

    /// Create a child context
    pub fn child(&self) -> Self {
        Context(Arc::new(Inner {
            token: self.0.token.child_token(),
            cause: Default::default(),
            parent: Some(self.clone()),
            _deadline: None,
        }))
    }

    /// Create a child context which fires with [`CancelCause::DeadlineExceeded`] after `timeout`
    ///
    /// Must be called within a tokio runtime.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Create a child context which fires with [`CancelCause::DeadlineExceeded`] at `deadline`
    ///
    /// If the parent fires before the deadline the child reports the parent's cause, and a parent
    /// firing after the deadline does not change the recorded cause. When the two happen
    /// concurrently either cause may be reported.
    ///
    /// Must be called within a tokio runtime.
    pub fn with_deadline(&self, deadline: Instant) -> Self {
        let token = self.0.token.child_token();
        let cause: Arc<OnceLock<CancelCause>> = Default::default();
        let timer = AbortOnDrop::spawn({
            let token = token.clone();
            let cause = Arc::clone(&cause);
            async move {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => (),
                    _ = sleep_until(deadline) => {
                        trace!("context deadline elapsed");
                        fire(&token, &cause, CancelCause::DeadlineExceeded);
                    }
                }
            }
        });
        Context(Arc::new(Inner {
            token,
            cause,
            parent: Some(self.clone()),
            _deadline: Some(timer),
        }))
    }

    /// Cancel this context and all of its descendants
    pub fn cancel(&self) {
        fire(&self.0.token, &self.0.cause, CancelCause::Cancelled);
    }

    /// Whether this context has fired
    pub fn is_cancelled(&self) -> bool {
        self.0.token.is_cancelled()
    }

    /// Why this context fired, or `None` if it has not
    pub fn cause(&self) -> Option<CancelCause> {
        if self.is_cancelled() {
            Some(self.fired_cause())
        } else {
            None
        }
    }

    /// Wait until this context fires, resolving to the cause
    ///
    /// Cancel safe.
    pub async fn cancelled(&self) -> CancelCause {
        self.0.token.cancelled().await;
        self.fired_cause()
    }

    /// The underlying token, for handing to code that only understands tokio-util
    pub fn token(&self) -> &CancellationToken {
        &self.0.token
    }

    // cause of an already fired context. a token adopted from outside, or fired through a token
    // handed out by `token()`, reads as plain cancellation.
    fn fired_cause(&self) -> CancelCause {
        if let Some(&cause) = self.0.cause.get() {
            return cause;
        }
        match self.0.parent {
            Some(ref parent) if parent.is_cancelled() => parent.fired_cause(),
            _ => CancelCause::Cancelled,
        }
    }
}

impl Default for Context {
    fn default() -> Self {
        Context::new()
    }
}

impl From<CancellationToken> for Context {
    /// Adopt an externally owned token as a root context
    fn from(token: CancellationToken) -> Self {
        Context(Arc::new(Inner {
            token,
            cause: Default::default(),
            parent: None,
            _deadline: None,
        }))
    }
}

// record the cause unless the scope already fired through some other path, then fire. the check
// and the set are not atomic: an ancestor firing at the same moment may lose to `reason`.
fn fire(token: &CancellationToken, cause: &OnceLock<CancelCause>, reason: CancelCause) {
    if !token.is_cancelled() {
        let _ = cause.set(reason);
    }
    token.cancel();
}


#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn cancel_reports_cause() {
        let ctx = Context::new();
        assert!(!ctx.is_cancelled());
        assert_eq!(ctx.cause(), None);
        ctx.cancel();
        assert!(ctx.is_cancelled());
        assert_eq!(ctx.cause(), Some(CancelCause::Cancelled));
        assert_eq!(ctx.cancelled().await, CancelCause::Cancelled);
    }

    #[tokio::test]
    async fn child_follows_parent_but_not_the_reverse() {
        let parent = Context::new();
        let child = parent.child();
        child.cancel();
        assert!(child.is_cancelled());
        assert!(!parent.is_cancelled());

        let child = parent.child();
        parent.cancel();
        assert!(child.is_cancelled());
        assert_eq!(child.cause(), Some(CancelCause::Cancelled));
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_fires_with_its_own_cause() {
        let root = Context::new();
        let ctx = root.with_timeout(Duration::from_millis(50));
        let start = Instant::now();
        assert_eq!(ctx.cancelled().await, CancelCause::DeadlineExceeded);
        assert!(start.elapsed() >= Duration::from_millis(50));
        assert!(!root.is_cancelled());

        // a child of the timed context inherits the deadline cause
        assert_eq!(ctx.child().cause(), Some(CancelCause::DeadlineExceeded));
    }

    #[tokio::test(start_paused = true)]
    async fn earlier_parent_cancel_wins_over_deadline() {
        let root = Context::new();
        let ctx = root.with_timeout(Duration::from_millis(50));
        root.cancel();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(ctx.cause(), Some(CancelCause::Cancelled));
    }

    #[tokio::test(start_paused = true)]
    async fn later_parent_cancel_keeps_deadline_cause() {
        let root = Context::new();
        let ctx = root.with_timeout(Duration::from_millis(50));
        assert_eq!(ctx.cancelled().await, CancelCause::DeadlineExceeded);
        root.cancel();
        assert_eq!(ctx.cause(), Some(CancelCause::DeadlineExceeded));
        assert_eq!(root.cause(), Some(CancelCause::Cancelled));
    }

    #[tokio::test]
    async fn adopted_token_reads_as_cancelled() {
        let token = CancellationToken::new();
        let ctx = Context::from(token.clone());
        token.cancel();
        assert_eq!(ctx.cancelled().await, CancelCause::Cancelled);
    }
}
