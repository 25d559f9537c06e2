//! # Switchyard
//!
//! Declarative event routing and handler dispatch for chat bots.
//!
//! ## Overview
//!
//! A bot declares its handlers once, each tagged with one or more triggers.
//! Switchyard builds immutable lookup tables from those declarations and
//! routes every inbound event to at most one handler:
//!
//! ```text
//! ┌──────────┐     ┌────────────┐     ┌──────────────┐     ┌──────────────────────────┐
//! │ Decoder  │────▶│ BotRuntime │────▶│  Dispatcher  │────▶│ message   exact          │
//! │ (caller) │     │ (stages)   │     │              │────▶│ callback  exact, prefix  │
//! └──────────┘     └────────────┘     └──────────────┘────▶│ stage     exact, prefix  │
//!                                            │        ────▶│ inline    single slot    │
//!                                            ▼             └──────────────────────────┘
//!                                        Fallback
//! ```
//!
//! - **Core**: event shapes, trigger markers, dispatch context, errors
//! - **Framework**: handler set, registry build, dispatcher, fallbacks
//! - **Runtime**: configuration, logging, stage store, `BotRuntime`
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use switchyard::prelude::*;
//!
//! fn start(_event: EventRef<'_>, ctx: &Context<Chat>) -> HandlerResult {
//!     ctx.data().reply("Welcome!")
//! }
//!
//! fn main() -> anyhow::Result<()> {
//!     let runtime = BotRuntime::builder()
//!         .handlers(
//!             HandlerSet::new()
//!                 .on_message("/start", start)
//!                 .on_callback_prefix("menu:", menu),
//!         )
//!         .build()?;
//!
//!     runtime.route(event, chat)?;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `toml-config`: TOML configuration files (default)
//! - `yaml-config`: YAML configuration files
//! - `json-log`: JSON log output

pub use switchyard_core as core;
pub use switchyard_framework as framework;
pub use switchyard_runtime as runtime;

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use switchyard::prelude::*;
/// ```
pub mod prelude {
    // Runtime - main entry point
    pub use switchyard_runtime::{
        BotRuntime, MemoryStageStore, RuntimeError, StageStore, SwitchyardConfig,
    };

    // Declaring handlers
    pub use switchyard_framework::{
        ConflictPolicy, Declaration, Handler, HandlerSet, HandlerSource, into_handler,
    };

    // Dispatch
    pub use switchyard_framework::{Dispatcher, Fallback, Fallbacks, NoFallback, Outcome};

    // Events, triggers and context
    pub use switchyard_core::{
        CallbackEvent, CancellationToken, Context, Event, EventRef, HandlerError, HandlerResult,
        IncomingMessage, InlineQueryEvent, StageEvent, StagePayload, TriggerKind, TriggerMarker,
    };
}
