//! Dispatch context.
//!
//! A [`Context`] travels alongside every event through a dispatch call. It
//! carries:
//!
//! - the caller's opaque value (`C`, `()` when there is none),
//! - a [`CancellationToken`] the host can trip from another thread,
//! - an optional deadline.
//!
//! Dispatch is synchronous, so neither cancellation nor the deadline can
//! preempt a running handler. The dispatcher checks [`Context::is_cancelled`]
//! before invoking anything, and long-running handlers are expected to poll
//! it themselves.
//!
//! ```rust,ignore
//! let token = CancellationToken::new();
//! let ctx = Context::new(app_state)
//!     .with_cancellation(token.clone())
//!     .with_timeout(Duration::from_secs(5));
//!
//! dispatcher.dispatch(&event, &ctx)?;
//! ```

use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

/// Per-dispatch context handed to handlers and fallbacks.
#[derive(Debug, Clone)]
pub struct Context<C = ()> {
    data: C,
    cancel: CancellationToken,
    deadline: Option<Instant>,
}

impl Context<()> {
    /// Creates a context with no caller data.
    pub fn empty() -> Self {
        Self::new(())
    }
}

impl Default for Context<()> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<C> Context<C> {
    /// Creates a context carrying `data`, with a fresh token and no deadline.
    pub fn new(data: C) -> Self {
        Self {
            data,
            cancel: CancellationToken::new(),
            deadline: None,
        }
    }

    /// Uses the given cancellation token instead of a fresh one.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Sets an absolute deadline.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Sets a deadline `timeout` from now.
    ///
    /// A timeout too large to represent as an [`Instant`] leaves the context
    /// without a deadline.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.deadline = Instant::now().checked_add(timeout);
        self
    }

    /// Returns the caller's data.
    pub fn data(&self) -> &C {
        &self.data
    }

    /// Consumes the context and returns the caller's data.
    pub fn into_data(self) -> C {
        self.data
    }

    /// Returns the cancellation token.
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Returns the deadline, if one was set.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Returns `true` if the deadline has passed.
    pub fn is_expired(&self) -> bool {
        self.deadline.is_some_and(|deadline| Instant::now() >= deadline)
    }

    /// Returns `true` once the token is cancelled or the deadline has passed.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled() || self.is_expired()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_context_is_live() {
        let ctx = Context::empty();
        assert!(!ctx.is_cancelled());
        assert!(ctx.deadline().is_none());
    }

    #[test]
    fn test_token_cancels_context() {
        let token = CancellationToken::new();
        let ctx = Context::new(5_u8).with_cancellation(token.clone());

        token.cancel();
        assert!(ctx.is_cancelled());
        assert_eq!(*ctx.data(), 5);
    }

    #[test]
    fn test_past_deadline_cancels_context() {
        let ctx = Context::empty().with_deadline(Instant::now() - Duration::from_millis(1));
        assert!(ctx.is_expired());
        assert!(ctx.is_cancelled());
    }

    #[test]
    fn test_future_deadline_keeps_context_live() {
        let ctx = Context::empty().with_timeout(Duration::from_secs(60));
        assert!(!ctx.is_cancelled());
    }

    #[test]
    fn test_unrepresentable_timeout_means_no_deadline() {
        let ctx = Context::empty().with_timeout(Duration::MAX);
        assert!(ctx.deadline().is_none());
        assert!(!ctx.is_expired());
        assert!(!ctx.is_cancelled());
    }
}
