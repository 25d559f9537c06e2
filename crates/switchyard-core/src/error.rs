//! Error types shared by every Switchyard layer.
//!
//! Registry and runtime errors live in their own crates; this module only
//! holds what handlers and trigger markers need.

use std::error::Error as StdError;

use thiserror::Error;

use crate::trigger::TriggerKind;

/// A boxed, thread-safe error.
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

// =============================================================================
// Handler Errors
// =============================================================================

/// An error raised inside a handler body.
///
/// The dispatcher never inspects, retries or logs-and-swallows these: the
/// error a handler returns is handed back to the caller of `dispatch` as-is.
#[derive(Debug, Error)]
#[error(transparent)]
pub struct HandlerError(BoxError);

impl HandlerError {
    /// Wraps an arbitrary error.
    pub fn new<E>(error: E) -> Self
    where
        E: Into<BoxError>,
    {
        let boxed: BoxError = error.into();
        match boxed.downcast::<HandlerError>() {
            Ok(inner) => *inner,
            Err(other) => Self(other),
        }
    }

    /// Creates an error from a plain message.
    pub fn msg(message: impl Into<String>) -> Self {
        let message: String = message.into();
        Self(message.into())
    }

    /// Returns the underlying error if it is of type `E`.
    pub fn downcast_ref<E: StdError + 'static>(&self) -> Option<&E> {
        self.0.downcast_ref::<E>()
    }

    /// Consumes the wrapper and returns the boxed error.
    pub fn into_inner(self) -> BoxError {
        self.0
    }
}

/// Result type returned by handlers.
pub type HandlerResult = Result<(), HandlerError>;

// =============================================================================
// Marker Errors
// =============================================================================

/// Why a trigger marker cannot be placed into a table.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MarkerError {
    /// The kind requires a key but none was given.
    #[error("{0} trigger needs an exact key or a prefix")]
    MissingKey(TriggerKind),

    /// A prefix was given for a kind that only matches exactly.
    #[error("{0} triggers do not support prefix matching")]
    PrefixNotSupported(TriggerKind),

    /// The kind name is not recognised.
    #[error("unknown trigger kind: {0}")]
    UnknownKind(String),
}
