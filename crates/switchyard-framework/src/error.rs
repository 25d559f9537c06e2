//! Error types for the Switchyard framework.

use switchyard_core::TriggerKind;
use thiserror::Error;

/// Errors that can occur while building handler tables.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    /// Two declarations claimed the same key under
    /// [`ConflictPolicy::Reject`](crate::registry::ConflictPolicy::Reject).
    #[error("duplicate {kind} trigger '{key}': declared by {first} and {second}")]
    RegistrationConflict {
        /// The table the conflict occurred in.
        kind: TriggerKind,
        /// The contested key or prefix (empty for the inline slot).
        key: String,
        /// The earlier declaration.
        first: String,
        /// The later declaration.
        second: String,
    },
}

/// Result type for build operations.
pub type BuildResult<T> = Result<T, BuildError>;
