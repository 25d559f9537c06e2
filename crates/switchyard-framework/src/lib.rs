//! # Switchyard Framework
//!
//! Handler registration and event dispatch for chat bots.
//!
//! This layer provides:
//! - [`Handler`] trait and [`into_handler`] for closures and functions
//! - [`HandlerSet`] for ordered, explicit handler declaration
//! - [`HandlerTables`], the frozen lookup tables a build produces
//! - [`Dispatcher`] with exact-then-prefix lookup and [`Fallback`] hooks
//!
//! Everything here is synchronous. Callers that need concurrency share one
//! [`Dispatcher`] across threads.

pub mod dispatcher;
pub mod error;
pub mod fallback;
pub mod handler;
pub mod registry;

pub use dispatcher::{DispatchResult, Dispatcher, Outcome};
pub use error::{BuildError, BuildResult};
pub use fallback::{Fallback, Fallbacks, NoFallback};
pub use handler::{BoxedHandler, Handler, HandlerFn, IntoHandlerResult, into_handler};
pub use registry::{
    BuildReport, ConflictPolicy, Declaration, Entry, HandlerFactory, HandlerSet, HandlerSource,
    HandlerTables, KeyTable, Overwrite, RouteInfo, SkipReason, Skipped,
};

pub use switchyard_core::{
    BoxError, CallbackEvent, CancellationToken, Context, Event, EventRef, HandlerError,
    HandlerResult, IncomingMessage, InlineQueryEvent, MarkerError, MatchRule, StageEvent,
    StagePayload, TriggerKind, TriggerMarker, mark,
};
