//! Runtime error types.

use switchyard_framework::BuildError;
use thiserror::Error;

use crate::config::ConfigError;

/// Errors that can occur while assembling a runtime.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Loading or validating configuration failed.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The handler set could not be built under the configured policy.
    #[error(transparent)]
    Build(#[from] BuildError),
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
