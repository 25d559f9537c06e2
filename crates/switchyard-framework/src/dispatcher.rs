//! Event dispatcher for the Switchyard framework.
//!
//! The [`Dispatcher`] owns a set of frozen [`HandlerTables`] and routes one
//! event per call:
//!
//! | event       | lookup                                  | on miss                |
//! |-------------|-----------------------------------------|------------------------|
//! | message     | exact text                              | `on_unknown_message`   |
//! | callback    | exact data, then prefixes in order      | `on_unknown_action`    |
//! | stage       | exact stage key, then prefixes in order | `on_unknown_stage`     |
//! | inline query| the single inline handler               | nothing                |
//!
//! Messages never consult a prefix table. Dispatch is synchronous and takes
//! `&self`, so a built dispatcher can be shared across threads without
//! locking.
//!
//! ```rust,ignore
//! use switchyard_framework::{Dispatcher, HandlerSet};
//!
//! let dispatcher = Dispatcher::from_set(
//!     &HandlerSet::new()
//!         .on_message("/start", start)
//!         .on_callback_prefix("menu:", menu),
//! )
//! .with_fallback(MyFallback);
//!
//! let outcome = dispatcher.dispatch(&event, &Context::new(state))?;
//! ```
//!
//! # Errors
//!
//! A handler's error is returned to the caller unmodified. The dispatcher
//! does not catch, retry or swallow it.

use std::fmt;
use std::sync::Arc;

use tracing::{Level, debug, span, trace, warn};

use switchyard_core::{
    CallbackEvent, Context, Event, EventRef, HandlerError, IncomingMessage, InlineQueryEvent,
    StageEvent,
};

use crate::error::BuildResult;
use crate::fallback::{Fallback, NoFallback};
use crate::registry::{ConflictPolicy, Entry, HandlerSet, HandlerTables};

/// What a dispatch call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    /// A registered handler ran.
    Handled,
    /// Nothing matched; the fallback (if any) ran instead.
    Unmatched,
    /// The context was cancelled before anything ran.
    Cancelled,
}

impl Outcome {
    /// Returns `true` if a registered handler ran.
    pub fn is_handled(self) -> bool {
        self == Self::Handled
    }
}

/// Result type for dispatch calls.
pub type DispatchResult = Result<Outcome, HandlerError>;

/// The central event dispatcher.
///
/// # Thread Safety
///
/// `Dispatcher` is `Send + Sync`. Its tables are never written after
/// construction.
pub struct Dispatcher<C = ()> {
    tables: HandlerTables<C>,
    fallback: Arc<dyn Fallback<C>>,
}

impl<C: 'static> Dispatcher<C> {
    /// Creates a dispatcher over pre-built tables, with no fallback.
    pub fn new(tables: HandlerTables<C>) -> Self {
        Self {
            tables,
            fallback: Arc::new(NoFallback),
        }
    }

    /// Builds a dispatcher from a handler set, letting later declarations win.
    pub fn from_set(set: &HandlerSet<C>) -> Self {
        Self::new(set.build())
    }

    /// Builds a dispatcher from a handler set under the given conflict policy.
    pub fn try_from_set(set: &HandlerSet<C>, policy: ConflictPolicy) -> BuildResult<Self> {
        set.build_with(policy).map(Self::new)
    }

    /// Replaces the fallback.
    pub fn with_fallback(mut self, fallback: impl Fallback<C> + 'static) -> Self {
        self.fallback = Arc::new(fallback);
        self
    }

    /// Replaces the fallback with a shared one.
    pub fn with_shared_fallback(mut self, fallback: Arc<dyn Fallback<C>>) -> Self {
        self.fallback = fallback;
        self
    }
}

impl<C> Dispatcher<C> {
    /// Returns the lookup tables.
    pub fn tables(&self) -> &HandlerTables<C> {
        &self.tables
    }

    /// Dispatches any event to the entry point for its variant.
    pub fn dispatch(&self, event: &Event, ctx: &Context<C>) -> DispatchResult {
        match event {
            Event::Message(message) => self.dispatch_message(message, ctx),
            Event::Callback(callback) => self.dispatch_callback(callback, ctx),
            Event::InlineQuery(query) => self.dispatch_inline_query(query, ctx),
            Event::Stage(stage) => self.dispatch_stage(stage, ctx),
        }
    }

    /// Dispatches a message by exact text.
    ///
    /// Returns [`Outcome::Handled`] on a hit. On a miss the unknown-message
    /// fallback runs and the result is [`Outcome::Unmatched`]; no prefix
    /// lookup is attempted.
    pub fn dispatch_message(&self, message: &IncomingMessage, ctx: &Context<C>) -> DispatchResult {
        let span = span!(Level::DEBUG, "dispatch", kind = "message");
        let _enter = span.enter();

        if cancelled(ctx) {
            return Ok(Outcome::Cancelled);
        }

        match self.tables.message(&message.text) {
            Some(entry) => {
                invoke(entry, EventRef::Message(message), ctx)?;
                Ok(Outcome::Handled)
            }
            None => {
                debug!(text = %message.text, "No message handler matched, using fallback");
                self.fallback.on_unknown_message(message, ctx)?;
                Ok(Outcome::Unmatched)
            }
        }
    }

    /// Dispatches a callback by exact data, then by the first matching prefix.
    pub fn dispatch_callback(&self, callback: &CallbackEvent, ctx: &Context<C>) -> DispatchResult {
        let span = span!(Level::DEBUG, "dispatch", kind = "callback");
        let _enter = span.enter();

        if cancelled(ctx) {
            return Ok(Outcome::Cancelled);
        }

        match self.tables.callback().lookup(&callback.data) {
            Some(entry) => {
                invoke(entry, EventRef::Callback(callback), ctx)?;
                Ok(Outcome::Handled)
            }
            None => {
                debug!(data = %callback.data, "No callback handler matched, using fallback");
                self.fallback.on_unknown_action(callback)?;
                Ok(Outcome::Unmatched)
            }
        }
    }

    /// Dispatches an inline query to the single inline handler, if any.
    pub fn dispatch_inline_query(
        &self,
        query: &InlineQueryEvent,
        ctx: &Context<C>,
    ) -> DispatchResult {
        let span = span!(Level::DEBUG, "dispatch", kind = "inline_query");
        let _enter = span.enter();

        if cancelled(ctx) {
            return Ok(Outcome::Cancelled);
        }

        match self.tables.inline_query() {
            Some(entry) => {
                invoke(entry, EventRef::InlineQuery(query), ctx)?;
                Ok(Outcome::Handled)
            }
            None => {
                trace!("No inline query handler registered");
                Ok(Outcome::Unmatched)
            }
        }
    }

    /// Dispatches a stage event by exact stage key, then by the first
    /// matching prefix.
    ///
    /// The stage key is owned by the caller. Handlers may move the
    /// conversation to another stage as a side effect; the dispatcher does
    /// not check transitions.
    pub fn dispatch_stage(&self, stage: &StageEvent, ctx: &Context<C>) -> DispatchResult {
        let span = span!(Level::DEBUG, "dispatch", kind = "stage", stage = %stage.stage_key);
        let _enter = span.enter();

        if cancelled(ctx) {
            return Ok(Outcome::Cancelled);
        }

        match self.tables.stage().lookup(&stage.stage_key) {
            Some(entry) => {
                invoke(entry, EventRef::Stage(stage), ctx)?;
                Ok(Outcome::Handled)
            }
            None => {
                debug!("No stage handler matched, using fallback");
                self.fallback.on_unknown_stage(stage, ctx)?;
                Ok(Outcome::Unmatched)
            }
        }
    }
}

fn cancelled<C>(ctx: &Context<C>) -> bool {
    if ctx.is_cancelled() {
        debug!(expired = ctx.is_expired(), "Context cancelled, skipping dispatch");
        true
    } else {
        false
    }
}

fn invoke<C>(entry: &Entry<C>, event: EventRef<'_>, ctx: &Context<C>) -> Result<(), HandlerError> {
    trace!(handler = entry.label(), "Executing handler");
    let result = entry.handler().call(event, ctx);

    if ctx.is_expired() {
        warn!(handler = entry.label(), "Handler returned after its deadline");
    }
    if let Err(e) = &result {
        debug!(handler = entry.label(), error = %e, "Handler returned an error");
    }

    result
}

impl<C> fmt::Debug for Dispatcher<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("tables", &self.tables)
            .finish_non_exhaustive()
    }
}
