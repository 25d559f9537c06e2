//! # Switchyard Core
//!
//! The vocabulary shared by every Switchyard layer:
//!
//! - **Events**: the decoded inbound update shapes ([`Event`], [`IncomingMessage`],
//!   [`CallbackEvent`], [`InlineQueryEvent`], [`StageEvent`])
//! - **Triggers**: declarative match descriptors ([`TriggerMarker`], [`TriggerKind`])
//! - **Context**: per-dispatch caller data and cancellation ([`Context`])
//! - **Errors**: [`HandlerError`] and [`MarkerError`]
//!
//! Turning raw provider payloads into [`Event`]s is the job of an upstream
//! decoder and is not part of this crate.

pub mod context;
pub mod error;
pub mod event;
pub mod trigger;

pub use context::Context;
pub use error::{BoxError, HandlerError, HandlerResult, MarkerError};
pub use event::{
    CallbackEvent, Event, EventRef, IncomingMessage, InlineQueryEvent, StageEvent, StagePayload,
};
pub use trigger::{MatchRule, TriggerKind, TriggerMarker, mark};

pub use tokio_util::sync::CancellationToken;
