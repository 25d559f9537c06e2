//! Default handlers invoked when a lookup misses.
//!
//! Every method of [`Fallback`] has a no-op default, so a bot only overrides
//! the cases it cares about:
//!
//! ```rust,ignore
//! struct Polite;
//!
//! impl Fallback<AppState> for Polite {
//!     fn on_unknown_message(
//!         &self,
//!         message: &IncomingMessage,
//!         ctx: &Context<AppState>,
//!     ) -> HandlerResult {
//!         ctx.data().reply(message.chat_id, "Sorry, I don't know that command.")
//!     }
//! }
//! ```
//!
//! [`Fallbacks`] offers the same extension points as optional closures for
//! bots that would rather not define a type.

use std::fmt;
use std::sync::Arc;

use switchyard_core::{CallbackEvent, Context, HandlerResult, IncomingMessage, StageEvent};

use crate::handler::IntoHandlerResult;

/// Extension points for lookup misses.
pub trait Fallback<C>: Send + Sync {
    /// Called when no message handler matches the text exactly.
    fn on_unknown_message(&self, _message: &IncomingMessage, _ctx: &Context<C>) -> HandlerResult {
        Ok(())
    }

    /// Called when no callback handler matches the data.
    fn on_unknown_action(&self, _callback: &CallbackEvent) -> HandlerResult {
        Ok(())
    }

    /// Called when no stage handler matches the stage key.
    fn on_unknown_stage(&self, _stage: &StageEvent, _ctx: &Context<C>) -> HandlerResult {
        Ok(())
    }
}

/// A fallback that does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoFallback;

impl<C> Fallback<C> for NoFallback {}

type MessageFn<C> = Arc<dyn Fn(&IncomingMessage, &Context<C>) -> HandlerResult + Send + Sync>;
type ActionFn = Arc<dyn Fn(&CallbackEvent) -> HandlerResult + Send + Sync>;
type StageFn<C> = Arc<dyn Fn(&StageEvent, &Context<C>) -> HandlerResult + Send + Sync>;

/// Fallbacks given as optional closures.
///
/// ```rust,ignore
/// let fallbacks = Fallbacks::new()
///     .unknown_message(|message, _ctx| warn!(text = %message.text, "unknown command"))
///     .unknown_action(|callback| debug!(data = %callback.data, "stale button"));
/// ```
pub struct Fallbacks<C> {
    message: Option<MessageFn<C>>,
    action: Option<ActionFn>,
    stage: Option<StageFn<C>>,
}

impl<C> Default for Fallbacks<C> {
    fn default() -> Self {
        Self {
            message: None,
            action: None,
            stage: None,
        }
    }
}

impl<C> Clone for Fallbacks<C> {
    fn clone(&self) -> Self {
        Self {
            message: self.message.clone(),
            action: self.action.clone(),
            stage: self.stage.clone(),
        }
    }
}

impl<C: 'static> Fallbacks<C> {
    /// Creates a set with every fallback unset.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the unknown-message fallback.
    pub fn unknown_message<F, R>(mut self, f: F) -> Self
    where
        F: Fn(&IncomingMessage, &Context<C>) -> R + Send + Sync + 'static,
        R: IntoHandlerResult + 'static,
    {
        self.message = Some(Arc::new(
            move |message: &IncomingMessage, ctx: &Context<C>| {
                f(message, ctx).into_handler_result()
            },
        ));
        self
    }

    /// Sets the unknown-action fallback.
    pub fn unknown_action<F, R>(mut self, f: F) -> Self
    where
        F: Fn(&CallbackEvent) -> R + Send + Sync + 'static,
        R: IntoHandlerResult + 'static,
    {
        self.action = Some(Arc::new(move |callback: &CallbackEvent| {
            f(callback).into_handler_result()
        }));
        self
    }

    /// Sets the unknown-stage fallback.
    pub fn unknown_stage<F, R>(mut self, f: F) -> Self
    where
        F: Fn(&StageEvent, &Context<C>) -> R + Send + Sync + 'static,
        R: IntoHandlerResult + 'static,
    {
        self.stage = Some(Arc::new(move |stage: &StageEvent, ctx: &Context<C>| {
            f(stage, ctx).into_handler_result()
        }));
        self
    }
}

impl<C> Fallback<C> for Fallbacks<C> {
    fn on_unknown_message(&self, message: &IncomingMessage, ctx: &Context<C>) -> HandlerResult {
        match &self.message {
            Some(f) => f(message, ctx),
            None => Ok(()),
        }
    }

    fn on_unknown_action(&self, callback: &CallbackEvent) -> HandlerResult {
        match &self.action {
            Some(f) => f(callback),
            None => Ok(()),
        }
    }

    fn on_unknown_stage(&self, stage: &StageEvent, ctx: &Context<C>) -> HandlerResult {
        match &self.stage {
            Some(f) => f(stage, ctx),
            None => Ok(()),
        }
    }
}

impl<C> fmt::Debug for Fallbacks<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fallbacks")
            .field("unknown_message", &self.message.is_some())
            .field("unknown_action", &self.action.is_some())
            .field("unknown_stage", &self.stage.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use switchyard_core::HandlerError;

    #[test]
    fn test_no_fallback_is_noop() {
        let fallback = NoFallback;
        let ctx = Context::empty();
        assert!(
            Fallback::<()>::on_unknown_message(&fallback, &IncomingMessage::new("?"), &ctx).is_ok()
        );
        assert!(Fallback::<()>::on_unknown_action(&fallback, &CallbackEvent::new("?")).is_ok());
    }

    #[test]
    fn test_closure_fallbacks() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);

        let fallbacks = Fallbacks::<()>::new()
            .unknown_message(move |_message, _ctx| {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .unknown_action(|callback| Err::<(), _>(format!("stale button {}", callback.data)));

        fallbacks
            .on_unknown_message(&IncomingMessage::new("?"), &Context::empty())
            .unwrap();
        let err: HandlerError = fallbacks
            .on_unknown_action(&CallbackEvent::new("old"))
            .unwrap_err();

        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(err.to_string(), "stale button old");
        assert!(
            fallbacks
                .on_unknown_stage(&StageEvent::default(), &Context::empty())
                .is_ok()
        );
    }
}
