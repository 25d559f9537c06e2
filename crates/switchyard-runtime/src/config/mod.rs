//! Configuration module for the Switchyard runtime.
//!
//! Layered loading (defaults, files, environment, overrides) through
//! figment, plus validation of the merged result.

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, Profile, load_config, load_config_from_file};
pub use schema::{
    DispatchConfig, LogFormat, LogLevel, LogOutput, LoggingConfig, SpanEvents,
    SwitchyardConfig,
};
pub use validation::validate_config;
