//! Handler system for the Switchyard framework.
//!
//! A handler is anything implementing [`Handler`]. Plain closures and
//! functions are adapted through [`into_handler`], which accepts any
//! `Fn(EventRef<'_>, &Context<C>)` returning either `()` or a
//! `Result<(), E>`:
//!
//! ```rust,ignore
//! use switchyard_framework::into_handler;
//!
//! // Infallible handler
//! let greet = into_handler(|event: EventRef<'_>, _ctx: &Context| {
//!     println!("hello from {:?}", event.kind());
//! });
//!
//! // Fallible handler, using any error convertible into `BoxError`
//! let save = into_handler(|event: EventRef<'_>, ctx: &Context<Db>| {
//!     ctx.data().save(event.text().unwrap_or_default())
//! });
//! ```
//!
//! Handlers run synchronously on the dispatching thread.

use std::marker::PhantomData;
use std::sync::Arc;

use switchyard_core::{BoxError, Context, EventRef, HandlerError, HandlerResult};

// ============================================================================
// Handler Trait
// ============================================================================

/// The core trait for event handlers.
///
/// Implement this directly for stateful handler types; closures get it via
/// [`into_handler`].
pub trait Handler<C>: Send + Sync {
    /// Handles one event.
    fn call(&self, event: EventRef<'_>, ctx: &Context<C>) -> HandlerResult;
}

/// A type-erased handler that can be stored in the lookup tables.
pub type BoxedHandler<C> = Arc<dyn Handler<C>>;

// ============================================================================
// IntoHandlerResult
// ============================================================================

/// Return types a handler function may use.
pub trait IntoHandlerResult {
    /// Converts into the uniform handler result.
    fn into_handler_result(self) -> HandlerResult;
}

impl IntoHandlerResult for () {
    fn into_handler_result(self) -> HandlerResult {
        Ok(())
    }
}

impl<E> IntoHandlerResult for Result<(), E>
where
    E: Into<BoxError>,
{
    fn into_handler_result(self) -> HandlerResult {
        self.map_err(HandlerError::new)
    }
}

// ============================================================================
// HandlerFn - Convert functions into Handler trait objects
// ============================================================================

/// A wrapper that turns a function into a [`Handler`].
pub struct HandlerFn<F, R> {
    f: F,
    _marker: PhantomData<fn() -> R>,
}

impl<F, R> HandlerFn<F, R> {
    /// Creates a new handler function wrapper.
    pub fn new(f: F) -> Self {
        Self {
            f,
            _marker: PhantomData,
        }
    }
}

impl<F, C, R> Handler<C> for HandlerFn<F, R>
where
    F: Fn(EventRef<'_>, &Context<C>) -> R + Send + Sync,
    R: IntoHandlerResult,
{
    fn call(&self, event: EventRef<'_>, ctx: &Context<C>) -> HandlerResult {
        (self.f)(event, ctx).into_handler_result()
    }
}

/// Converts a handler function into a boxed handler.
pub fn into_handler<C, F, R>(f: F) -> BoxedHandler<C>
where
    C: 'static,
    F: Fn(EventRef<'_>, &Context<C>) -> R + Send + Sync + 'static,
    R: IntoHandlerResult + 'static,
{
    Arc::new(HandlerFn::new(f))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use switchyard_core::IncomingMessage;

    struct Counting(AtomicUsize);

    impl Handler<()> for Counting {
        fn call(&self, _event: EventRef<'_>, _ctx: &Context) -> HandlerResult {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn test_unit_returning_closure() {
        let handler = into_handler(|_event: EventRef<'_>, _ctx: &Context| {});
        let message = IncomingMessage::new("hi");
        assert!(handler.call(EventRef::Message(&message), &Context::empty()).is_ok());
    }

    #[test]
    fn test_result_returning_closure_propagates_error() {
        let handler = into_handler(|_event: EventRef<'_>, _ctx: &Context| {
            Err::<(), _>("database unavailable")
        });
        let message = IncomingMessage::new("hi");
        let err = handler
            .call(EventRef::Message(&message), &Context::empty())
            .unwrap_err();
        assert_eq!(err.to_string(), "database unavailable");
    }

    #[test]
    fn test_struct_handler() {
        let handler = Arc::new(Counting(AtomicUsize::new(0)));
        let boxed: BoxedHandler<()> = handler.clone();
        let message = IncomingMessage::new("hi");

        boxed.call(EventRef::Message(&message), &Context::empty()).unwrap();
        boxed.call(EventRef::Message(&message), &Context::empty()).unwrap();

        assert_eq!(handler.0.load(Ordering::SeqCst), 2);
    }
}
