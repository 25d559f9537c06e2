//! Errors raised while loading or validating a [`SwitchyardConfig`].
//!
//! [`SwitchyardConfig`]: super::SwitchyardConfig

use std::path::PathBuf;

use thiserror::Error;

/// Why a configuration could not be produced.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// An explicitly requested file does not exist.
    #[error("config file {} does not exist", .0.display())]
    FileNotFound(PathBuf),

    /// Unknown extension, or its `*-config` feature is off.
    #[error("config format .{0} is not supported by this build")]
    UnsupportedFormat(String),

    /// Figment could not extract the merged sources into the schema.
    #[error("could not read configuration: {0}")]
    ParseError(String),

    /// A value parsed but breaks a rule of the schema.
    #[error("invalid configuration: {message}")]
    ValidationError { message: String },

    /// A setting another setting depends on is absent.
    #[error("configuration is missing `{field}`")]
    MissingField { field: String },

    /// A `logging.filters` entry that is not a valid filter directive.
    #[error("log filter {directive:?} does not parse: {reason}")]
    InvalidFilter { directive: String, reason: String },
}

impl ConfigError {
    /// Builds a [`ConfigError::ValidationError`].
    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
        }
    }

    /// `field` is the dotted path, e.g. `logging.file_path`.
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingField {
            field: field.into(),
        }
    }

    /// Builds a [`ConfigError::InvalidFilter`] from the parser's message.
    pub fn invalid_filter(directive: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidFilter {
            directive: directive.into(),
            reason: reason.into(),
        }
    }
}

impl From<figment::Error> for ConfigError {
    fn from(e: figment::Error) -> Self {
        Self::ParseError(e.to_string())
    }
}

/// Result of loading or validating configuration.
pub type ConfigResult<T> = Result<T, ConfigError>;
