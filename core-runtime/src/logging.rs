//! # Logging & Tracing Infrastructure
//!
//! Installs the process-wide `tracing` subscriber used by every engine crate.
//!
//! ## Overview
//!
//! [`init_logging`] stacks three layers on a `tracing-subscriber` registry:
//! 1. an `EnvFilter` (engine crates at the configured level, decoder and
//!    device libraries at `warn`)
//! 2. a formatter writing to stdout as pretty text, compact text or JSON
//! 3. a [`HostSinkLayer`] mirroring surviving events into the host's
//!    [`LoggerSink`], if one was configured
//!
//! The engine logs one event per lifecycle transition (decode, spawn, close,
//! device failure). The device callback only emits `trace` events, so the
//! default `info` filter keeps the audio thread quiet.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::logging::{init_logging, LogFormat, LoggingConfig};
//! use bridge_traits::logging::{ConsoleLogger, LogLevel};
//! use std::sync::Arc;
//!
//! let config = LoggingConfig::default()
//!     .with_format(LogFormat::Compact)
//!     .with_level(LogLevel::Debug)
//!     .with_logger_sink(Arc::new(ConsoleLogger::default()));
//!
//! init_logging(config)?;
//! tracing::info!(file = "click.wav", "Sound loaded");
//! ```

use crate::error::{Error, Result};
use bridge_traits::logging::{LogEntry, LogLevel, LoggerSink};
use std::fmt;
use std::io;
use std::sync::Arc;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Crates whose events follow the configured level when no custom filter is set.
const ENGINE_TARGETS: &[&str] = &[
    "sound_engine_workspace",
    "core_runtime",
    "core_playback",
    "bridge_desktop",
    "bridge_traits",
];

/// Third-party crates that are capped at `warn` by the default filter.
const QUIET_DEPENDENCIES: &[&str] = &["symphonia", "cpal"];

/// Output format of the stdout layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Multi-line, human-oriented output
    Pretty,
    /// One JSON object per event
    Json,
    /// Single-line text
    Compact,
}

impl Default for LogFormat {
    /// Pretty in debug builds, JSON in release builds.
    fn default() -> Self {
        if cfg!(debug_assertions) {
            Self::Pretty
        } else {
            Self::Json
        }
    }
}

/// Settings for [`init_logging`].
#[derive(Clone)]
pub struct LoggingConfig {
    pub format: LogFormat,
    /// Level applied to the engine crates by the default filter
    pub level: LogLevel,
    /// Full `EnvFilter` directive string replacing the default filter
    /// (e.g. `"core_playback=trace,bridge_desktop=debug"`)
    pub filter: Option<String>,
    /// Host sink receiving a copy of every event that passes the filter
    pub logger_sink: Option<Arc<dyn LoggerSink>>,
    /// Report span lifecycle (decode and spawn spans) in the output
    pub enable_spans: bool,
    pub display_target: bool,
    /// Print thread names and ids, which tells the device thread apart
    pub display_thread_info: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            level: LogLevel::Info,
            filter: None,
            logger_sink: None,
            enable_spans: true,
            display_target: true,
            display_thread_info: false,
        }
    }
}

impl LoggingConfig {
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    /// Replace the default filter with an `EnvFilter` directive string.
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    pub fn with_logger_sink(mut self, sink: Arc<dyn LoggerSink>) -> Self {
        self.logger_sink = Some(sink);
        self
    }

    pub fn with_spans(mut self, enable: bool) -> Self {
        self.enable_spans = enable;
        self
    }

    pub fn with_target(mut self, display: bool) -> Self {
        self.display_target = display;
        self
    }

    pub fn with_thread_info(mut self, display: bool) -> Self {
        self.display_thread_info = display;
        self
    }
}

/// Install the global subscriber.
///
/// Call once at startup, before the first sound is loaded.
///
/// # Errors
///
/// `Error::Config` if the filter string does not parse or a global
/// subscriber is already installed.
pub fn init_logging(config: LoggingConfig) -> Result<()> {
    let filter = build_filter(&config)?;
    let output = stdout_layer(&config);
    let sink = HostSinkLayer::new(config.logger_sink);

    tracing_subscriber::registry()
        .with(filter)
        .with(output)
        .with(sink)
        .try_init()
        .map_err(|e| Error::Config(format!("Failed to initialize logging: {}", e)))
}

fn build_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    let directives = match &config.filter {
        Some(custom) => custom.clone(),
        None => default_directives(config.level),
    };

    EnvFilter::try_new(&directives)
        .map_err(|e| Error::Config(format!("Invalid log filter '{}': {}", directives, e)))
}

fn default_directives(level: LogLevel) -> String {
    let level = level_name(level);
    ENGINE_TARGETS
        .iter()
        .map(|target| format!("{}={}", target, level))
        .chain(QUIET_DEPENDENCIES.iter().map(|target| format!("{}=warn", target)))
        .collect::<Vec<_>>()
        .join(",")
}

fn level_name(level: LogLevel) -> &'static str {
    match level {
        LogLevel::Trace => "trace",
        LogLevel::Debug => "debug",
        LogLevel::Info => "info",
        LogLevel::Warn => "warn",
        LogLevel::Error => "error",
    }
}

fn stdout_layer<S>(config: &LoggingConfig) -> Box<dyn Layer<S> + Send + Sync>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    let spans = if config.enable_spans {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    let base = tracing_subscriber::fmt::layer()
        .with_writer(io::stdout)
        .with_target(config.display_target)
        .with_thread_ids(config.display_thread_info)
        .with_thread_names(config.display_thread_info);

    match config.format {
        LogFormat::Pretty => base.pretty().with_span_events(spans).boxed(),
        LogFormat::Compact => base.compact().with_span_events(spans).boxed(),
        LogFormat::Json => base
            .json()
            .flatten_event(true)
            .with_current_span(config.enable_spans)
            .with_span_list(false)
            .boxed(),
    }
}

/// Layer mirroring events into a host [`LoggerSink`].
///
/// Events below the sink's `min_level` are dropped before any field is
/// formatted. Sink failures are reported on stderr and otherwise ignored.
pub struct HostSinkLayer {
    sink: Option<Arc<dyn LoggerSink>>,
}

impl HostSinkLayer {
    /// `None` yields a layer that does nothing.
    pub fn new(sink: Option<Arc<dyn LoggerSink>>) -> Self {
        Self { sink }
    }
}

impl<S> Layer<S> for HostSinkLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let Some(sink) = &self.sink else {
            return;
        };

        let metadata = event.metadata();
        let level = sink_level(metadata.level());
        if level < sink.min_level() {
            return;
        }

        let mut fields = EventFields::default();
        event.record(&mut fields);

        let message = fields.message.unwrap_or_else(|| metadata.name().to_string());
        let entry = fields.pairs.into_iter().fold(
            LogEntry::new(level, metadata.target(), message),
            |entry, (key, value)| entry.with_field(key, value),
        );
        let entry = match ctx.event_span(event) {
            Some(span) => entry.with_span_id(span.name()),
            None => entry,
        };

        if let Err(err) = sink.log(entry) {
            eprintln!("LoggerSink error: {}", err);
        }
    }
}

/// Message and key/value pairs of one event, rendered as strings.
#[derive(Default)]
struct EventFields {
    message: Option<String>,
    pairs: Vec<(&'static str, String)>,
}

impl EventFields {
    fn push(&mut self, field: &Field, value: String) {
        match field.name() {
            "message" => self.message = Some(value),
            name => self.pairs.push((name, value)),
        }
    }
}

impl Visit for EventFields {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.push(field, value.to_owned());
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        self.push(field, value.to_string());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.push(field, format!("{:?}", value));
    }
}

fn sink_level(level: &Level) -> LogLevel {
    match *level {
        Level::ERROR => LogLevel::Error,
        Level::WARN => LogLevel::Warn,
        Level::INFO => LogLevel::Info,
        Level::DEBUG => LogLevel::Debug,
        Level::TRACE => LogLevel::Trace,
    }
}

/// Reduce a file path to its final component.
///
/// Asset paths are logged on every decode and spawn; this keeps user
/// directories out of shipped logs. Both `/` and `\` separate components.
///
/// ```
/// use core_runtime::logging::strip_path;
///
/// assert_eq!(strip_path("/home/player/game/sounds/click.wav"), "click.wav");
/// ```
pub fn strip_path(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}
