//! Logging setup.
//!
//! Every Switchyard layer logs through `tracing`. This module installs the
//! global subscriber from a [`LoggingConfig`]. When `RUST_LOG` is set it
//! replaces the configured base level; per-target filters are added on top
//! either way.
//!
//! ```rust,ignore
//! use switchyard_runtime::{LoggingBuilder, SpanEvents};
//!
//! LoggingBuilder::new()
//!     .directive("switchyard_framework=trace")
//!     .span_events(SpanEvents::LIFECYCLE)
//!     .init();
//! ```

use std::ffi::OsStr;
use std::io;
use std::path::{Path, PathBuf};

use tracing::warn;
use tracing_appender::rolling::RollingFileAppender;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};

use crate::config::{LogFormat, LogLevel, LogOutput, LoggingConfig, SpanEvents};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

const DEFAULT_LOG_FILE: &str = "switchyard.log";

/// Installs the global subscriber described by `config`.
///
/// Does nothing if a subscriber is already installed.
pub fn init_from_config(config: &LoggingConfig) {
    LoggingBuilder::from_config(config).init();
}

/// Builds and installs the global `tracing` subscriber.
///
/// Starts from a [`LoggingConfig`] and lets callers adjust individual
/// settings before installing. Nothing is global until [`init`] or
/// [`try_init`] runs.
///
/// [`init`]: LoggingBuilder::init
/// [`try_init`]: LoggingBuilder::try_init
#[derive(Debug, Clone)]
pub struct LoggingBuilder {
    config: LoggingConfig,
    directives: Vec<String>,
    with_target: bool,
}

impl Default for LoggingBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl LoggingBuilder {
    /// Starts from the default [`LoggingConfig`].
    pub fn new() -> Self {
        Self::from_config(&LoggingConfig::default())
    }

    /// Starts from `config`. Targets are shown in log lines.
    pub fn from_config(config: &LoggingConfig) -> Self {
        Self {
            config: config.clone(),
            directives: Vec::new(),
            with_target: true,
        }
    }

    /// Sets the base level.
    ///
    /// `RUST_LOG` still takes precedence when it is set.
    pub fn level(mut self, level: LogLevel) -> Self {
        self.config.level = level;
        self
    }

    /// Adds a raw filter directive such as `switchyard_framework=trace`.
    ///
    /// Directives apply after the configured per-target filters.
    pub fn directive(mut self, directive: impl Into<String>) -> Self {
        self.directives.push(directive.into());
        self
    }

    /// Chooses which span lifecycle events produce log lines.
    pub fn span_events(mut self, events: SpanEvents) -> Self {
        self.config.span_events = events;
        self
    }

    /// Sets the line layout.
    pub fn format(mut self, format: LogFormat) -> Self {
        self.config.format = format;
        self
    }

    /// Sets the destination stream.
    ///
    /// [`LogOutput::File`] also needs a path, see [`LoggingBuilder::file`].
    pub fn output(mut self, output: LogOutput) -> Self {
        self.config.output = output;
        self
    }

    /// Writes to `path` instead of a terminal stream.
    pub fn file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.output = LogOutput::File;
        self.config.file_path = Some(path.into());
        self
    }

    /// Shows or hides the event target (the emitting module path).
    pub fn with_target(mut self, enabled: bool) -> Self {
        self.with_target = enabled;
        self
    }

    /// Shows or hides thread ids.
    pub fn with_thread_ids(mut self, enabled: bool) -> Self {
        self.config.thread_ids = enabled;
        self
    }

    /// Shows or hides the source file and line of each event.
    pub fn with_file_location(mut self, enabled: bool) -> Self {
        self.config.file_location = enabled;
        self
    }

    /// Configured per-target filters, then extra directives.
    fn directives(&self) -> impl Iterator<Item = String> + '_ {
        self.config
            .filters
            .iter()
            .map(|(target, level)| format!("{target}={level}"))
            .chain(self.directives.iter().cloned())
    }

    /// `RUST_LOG` or the base level, plus every parsable directive.
    fn filter(&self, notices: &mut Vec<String>) -> EnvFilter {
        let mut filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(self.config.level.as_str()));

        for directive in self.directives() {
            match directive.parse() {
                Ok(parsed) => filter = filter.add_directive(parsed),
                Err(e) => notices.push(format!("Ignoring invalid log filter {directive:?}: {e}")),
            }
        }

        filter
    }

    fn writer(&self, notices: &mut Vec<String>) -> BoxMakeWriter {
        match (self.config.output, &self.config.file_path) {
            (LogOutput::Stdout, _) => BoxMakeWriter::new(io::stdout),
            (LogOutput::Stderr, _) => BoxMakeWriter::new(io::stderr),
            (LogOutput::File, Some(path)) => BoxMakeWriter::new(file_appender(path)),
            (LogOutput::File, None) => {
                notices.push("File output requested without a file path, logging to stdout".into());
                BoxMakeWriter::new(io::stdout)
            }
        }
    }

    fn layer(&self, writer: BoxMakeWriter) -> BoxedLayer {
        let layer = fmt::layer()
            .with_writer(writer)
            .with_ansi(self.config.output != LogOutput::File)
            .with_span_events(fmt_span(self.config.span_events))
            .with_target(self.with_target)
            .with_thread_ids(self.config.thread_ids)
            .with_file(self.config.file_location)
            .with_line_number(self.config.file_location);

        match self.config.format {
            LogFormat::Compact => layer.compact().boxed(),
            LogFormat::Pretty => layer.pretty().boxed(),
            #[cfg(feature = "json-log")]
            LogFormat::Json => layer.json().boxed(),
            // Json lands here without the `json-log` feature.
            _ => layer.boxed(),
        }
    }

    /// Installs the subscriber, ignoring one that is already installed.
    pub fn init(self) {
        let _ = self.try_init();
    }

    /// Installs the subscriber.
    ///
    /// Problems found while assembling it (an unparsable directive, a file
    /// output without a path) are logged through the new subscriber once it
    /// is in place.
    pub fn try_init(self) -> Result<(), TryInitError> {
        let mut notices = Vec::new();
        let filter = self.filter(&mut notices);
        let layer = self.layer(self.writer(&mut notices));

        tracing_subscriber::registry()
            .with(layer)
            .with(filter)
            .try_init()?;

        for notice in notices {
            warn!("{notice}");
        }
        Ok(())
    }
}

fn fmt_span(events: SpanEvents) -> FmtSpan {
    [
        (events.new, FmtSpan::NEW),
        (events.enter, FmtSpan::ENTER),
        (events.exit, FmtSpan::EXIT),
        (events.close, FmtSpan::CLOSE),
    ]
    .into_iter()
    .filter(|(enabled, _)| *enabled)
    .fold(FmtSpan::NONE, |acc, (_, span)| acc | span)
}

fn file_appender(path: &Path) -> RollingFileAppender {
    let dir = path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let name = path
        .file_name()
        .unwrap_or_else(|| OsStr::new(DEFAULT_LOG_FILE));
    tracing_appender::rolling::never(dir, name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fmt_span_presets() {
        assert_eq!(fmt_span(SpanEvents::NONE), FmtSpan::NONE);
        assert_eq!(fmt_span(SpanEvents::LIFECYCLE), FmtSpan::NEW | FmtSpan::CLOSE);
        assert_eq!(fmt_span(SpanEvents::FULL), FmtSpan::FULL);
    }

    #[test]
    fn test_configured_filters_come_before_directives() {
        let mut config = LoggingConfig::default();
        config
            .filters
            .insert("switchyard_runtime".to_string(), LogLevel::Warn);
        config
            .filters
            .insert("switchyard_framework".to_string(), LogLevel::Trace);

        let builder = LoggingBuilder::from_config(&config).directive("menu_bot=debug");
        let directives: Vec<_> = builder.directives().collect();

        assert_eq!(
            directives,
            vec![
                "switchyard_framework=trace",
                "switchyard_runtime=warn",
                "menu_bot=debug",
            ]
        );
    }

    #[test]
    fn test_file_shortcut_sets_output() {
        let builder = LoggingBuilder::new().file("logs/bot.log");
        assert_eq!(builder.config.output, LogOutput::File);
        assert_eq!(builder.config.file_path, Some(PathBuf::from("logs/bot.log")));
    }

    #[test]
    fn test_file_output_without_path_is_noticed() {
        let builder = LoggingBuilder::new().output(LogOutput::File);
        let mut notices = Vec::new();
        let _writer = builder.writer(&mut notices);
        assert_eq!(notices.len(), 1);
    }
}
