//! Switchyard Runtime - configuration and orchestration for Switchyard bots.
//!
//! This crate provides:
//! - Layered configuration loading and validation (`config`)
//! - Logging initialization (`logging`)
//! - Per-chat conversation stages (`StageStore`, `MemoryStageStore`)
//! - A runtime that builds the handler tables under the configured policy
//!   and routes events through the current stage (`BotRuntime`)
//!
//! ```ignore
//! use switchyard_runtime::BotRuntime;
//!
//! fn main() -> anyhow::Result<()> {
//!     let runtime = BotRuntime::builder()
//!         .handlers(handlers())
//!         .build()?;
//!
//!     for event in decoder.events() {
//!         runtime.route(event?, state.clone())?;
//!     }
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod runtime;
pub mod stage;

pub use config::{ConfigError, ConfigLoader, ConfigResult, SpanEvents, SwitchyardConfig};
pub use error::{RuntimeError, RuntimeResult};
pub use logging::LoggingBuilder;
pub use runtime::{BotRuntime, RuntimeBuilder};
pub use stage::{MemoryStageStore, StageStore};

/// The `tracing` version every Switchyard crate logs through.
pub use tracing;
