//! Configuration schema definitions.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use switchyard_framework::ConflictPolicy;

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SwitchyardConfig {
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Registry and dispatch settings.
    #[serde(default)]
    pub dispatch: DispatchConfig,
}

// =============================================================================
// Logging
// =============================================================================

/// Log verbosity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Everything, including declarations with no triggers.
    Trace,
    /// Per-registration and per-dispatch detail.
    Debug,
    /// Startup and build summaries.
    #[default]
    Info,
    /// Problems that do not stop the bot, such as skipped declarations.
    Warn,
    /// Handler failures only.
    Error,
}

impl LogLevel {
    /// Returns the lowercase name used in filter directives.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Log line layout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// One abbreviated line per event.
    #[default]
    Compact,
    /// One line per event with the full span context.
    Full,
    /// Multi-line output for local development.
    Pretty,
    /// Newline-delimited JSON objects.
    ///
    /// Requires the `json-log` feature. Without it this falls back to `Full`.
    Json,
}

/// Where log lines go.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    #[default]
    Stdout,
    Stderr,
    /// Append to a file, without ANSI colours.
    ///
    /// Requires [`LoggingConfig::file_path`].
    File,
}

/// Which span lifecycle events are logged.
///
/// Every dispatch runs inside a `dispatch` span, so [`SpanEvents::LIFECYCLE`]
/// prints one opening and one closing line per routed event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpanEvents {
    /// Log when a span is created.
    #[serde(default)]
    pub new: bool,
    /// Log each time a span is entered.
    #[serde(default)]
    pub enter: bool,
    /// Log each time a span is exited.
    #[serde(default)]
    pub exit: bool,
    /// Log when a span closes, with its busy and idle time.
    #[serde(default)]
    pub close: bool,
}

impl SpanEvents {
    /// No span events. This is the default.
    pub const NONE: Self = Self {
        new: false,
        enter: false,
        exit: false,
        close: false,
    };

    /// Creation and close only.
    pub const LIFECYCLE: Self = Self {
        new: true,
        enter: false,
        exit: false,
        close: true,
    };

    /// Every span event.
    pub const FULL: Self = Self {
        new: true,
        enter: true,
        exit: true,
        close: true,
    };
}

/// Logging configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Base level applied when `RUST_LOG` is unset.
    #[serde(default)]
    pub level: LogLevel,

    /// Line layout.
    #[serde(default)]
    pub format: LogFormat,

    /// Destination stream.
    #[serde(default)]
    pub output: LogOutput,

    /// Log file, used when `output` is `file`.
    #[serde(default)]
    pub file_path: Option<PathBuf>,

    /// Include thread ids in log lines.
    #[serde(default)]
    pub thread_ids: bool,

    /// Include source file and line in log lines.
    #[serde(default)]
    pub file_location: bool,

    /// Span lifecycle events to log.
    #[serde(default)]
    pub span_events: SpanEvents,

    /// Per-target overrides, e.g. `switchyard_framework = "trace"`.
    #[serde(default)]
    pub filters: BTreeMap<String, LogLevel>,
}

// =============================================================================
// Dispatch
// =============================================================================

/// Registry and dispatch configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// What to do when two handlers claim the same trigger.
    #[serde(default)]
    pub conflict_policy: ConflictPolicy,

    /// Deadline applied to every dispatch, in milliseconds.
    #[serde(default)]
    pub handler_timeout_ms: Option<u64>,
}

impl DispatchConfig {
    /// Returns the configured handler timeout.
    pub fn handler_timeout(&self) -> Option<Duration> {
        self.handler_timeout_ms.map(Duration::from_millis)
    }
}
