//! Structured logging for belief queries.
//!
//! Rewriters emit `tracing` events: `trace` on entry to every rewriter,
//! `debug` when a case of an algorithm is selected, `info` on query phase
//! changes and `warn` when iteration stops at the configured bound. This
//! module installs a `tracing-subscriber` to print them.
//!
//! # Examples
//!
//! ```no_run
//! use liftlogic_lbp::logging::{LogFormat, LogLevel, TracingLogger};
//!
//! let _logger = TracingLogger::builder()
//!     .with_format(LogFormat::Compact)
//!     .with_level(LogLevel::Debug)
//!     .build()
//!     .expect("logger already installed");
//!
//! tracing::info!(model = "epidemic", "starting belief query");
//! ```

use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use crate::error::{LbpError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Multi-line, colored output for development.
    Pretty,
    /// One line per event, no colors.
    Compact,
    /// Newline-delimited JSON.
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Every rewriter call.
    Trace,
    /// Case selection inside rewriters.
    Debug,
    /// Query phases.
    Info,
    Warn,
    Error,
}

impl LogLevel {
    fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

#[derive(Debug, Clone)]
pub struct TracingLoggerBuilder {
    format: LogFormat,
    level: LogLevel,
    env_filter: Option<String>,
    with_targets: bool,
    with_thread_ids: bool,
    with_span_events: bool,
}

impl Default for TracingLoggerBuilder {
    fn default() -> Self {
        Self {
            format: LogFormat::Pretty,
            level: LogLevel::Info,
            env_filter: None,
            with_targets: true,
            with_thread_ids: false,
            with_span_events: false,
        }
    }
}

impl TracingLoggerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    /// Custom filter directives, taking precedence over the level.
    ///
    /// ```
    /// # use liftlogic_lbp::logging::TracingLoggerBuilder;
    /// let builder = TracingLoggerBuilder::new()
    ///     .with_env_filter("liftlogic_lbp=debug,liftlogic_ir=info");
    /// ```
    pub fn with_env_filter(mut self, filter: impl Into<String>) -> Self {
        self.env_filter = Some(filter.into());
        self
    }

    pub fn with_targets(mut self, enabled: bool) -> Self {
        self.with_targets = enabled;
        self
    }

    /// Useful when several queries run on parallel threads.
    pub fn with_thread_ids(mut self, enabled: bool) -> Self {
        self.with_thread_ids = enabled;
        self
    }

    pub fn with_span_events(mut self, enabled: bool) -> Self {
        self.with_span_events = enabled;
        self
    }

    /// Installs the global subscriber. Fails if one is already installed.
    pub fn build(self) -> Result<TracingLogger> {
        let env_filter = match self.env_filter {
            Some(directives) => EnvFilter::try_new(directives).map_err(|e| {
                LbpError::InvalidConfiguration(format!("invalid log filter: {}", e))
            })?,
            None => EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(self.level.as_str())),
        };

        let span_events = if self.with_span_events {
            FmtSpan::NEW | FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        };

        let layer = fmt::layer()
            .with_target(self.with_targets)
            .with_thread_ids(self.with_thread_ids)
            .with_span_events(span_events);
        let installed = match self.format {
            LogFormat::Pretty => tracing_subscriber::registry()
                .with(env_filter)
                .with(layer.pretty())
                .try_init(),
            LogFormat::Compact => tracing_subscriber::registry()
                .with(env_filter)
                .with(layer.with_ansi(false).compact())
                .try_init(),
            LogFormat::Json => tracing_subscriber::registry()
                .with(env_filter)
                .with(layer.json())
                .try_init(),
        };
        installed.map_err(|e| {
            LbpError::InvalidConfiguration(format!("failed to initialize tracing: {}", e))
        })?;

        Ok(TracingLogger {
            format: self.format,
        })
    }
}

/// Handle on the installed subscriber.
#[derive(Debug)]
pub struct TracingLogger {
    format: LogFormat,
}

impl TracingLogger {
    pub fn builder() -> TracingLoggerBuilder {
        TracingLoggerBuilder::new()
    }

    /// Pretty output at info level.
    pub fn init() -> Result<Self> {
        Self::builder().build()
    }

    /// Compact output showing which case of each rewriter ran.
    pub fn init_debugging() -> Result<Self> {
        Self::builder()
            .with_format(LogFormat::Compact)
            .with_level(LogLevel::Debug)
            .build()
    }

    pub fn format(&self) -> LogFormat {
        self.format
    }
}
