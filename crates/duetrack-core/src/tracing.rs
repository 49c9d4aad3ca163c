//! Logging setup shared by the duetrack crates.
//!
//! ```ignore
//! use duetrack_core::tracing::{init_tracing, TracingConfig};
//!
//! init_tracing(TracingConfig::cli())?;
//! ```

use thiserror::Error;
use tracing::Level;
use tracing_subscriber::{
    EnvFilter,
    fmt::{
        self, FormatFields,
        format::{FmtSpan, Format},
    },
    prelude::*,
};

/// Filter target covering every duetrack crate.
const FILTER_TARGET: &str = "duetrack";

/// Errors that can occur during tracing initialization
#[derive(Debug, Error)]
pub enum TracingError {
    #[error("failed to set global tracing subscriber: {0}")]
    SetGlobalSubscriber(#[from] tracing::subscriber::SetGlobalDefaultError),

    #[error("failed to parse env filter: {0}")]
    EnvFilter(#[from] tracing_subscriber::filter::ParseError),
}

/// Output format for log lines
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TracingOutputFormat {
    #[default]
    Pretty,
    Compact,
    /// One JSON object per event
    Json,
}

/// Configuration for tracing initialization
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Level used when `RUST_LOG` is not set
    pub default_level: Level,
    pub output_format: TracingOutputFormat,
    /// Include file and line of the event
    pub include_location: bool,
    pub include_target: bool,
    pub include_timestamp: bool,
    /// Emit span open/close events (useful when tracing a scrape)
    pub include_span_events: bool,
    /// Explicit filter directive, takes precedence over `default_level`
    pub env_filter: Option<String>,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            default_level: Level::INFO,
            output_format: TracingOutputFormat::Pretty,
            include_location: false,
            include_target: true,
            include_timestamp: true,
            include_span_events: false,
            env_filter: None,
        }
    }
}

impl TracingConfig {
    /// Quiet compact output on stderr for regular CLI use.
    #[must_use]
    pub fn cli() -> Self {
        Self {
            default_level: Level::WARN,
            output_format: TracingOutputFormat::Compact,
            include_location: false,
            include_target: false,
            include_timestamp: false,
            include_span_events: false,
            env_filter: None,
        }
    }

    /// Verbose output for `--debug`.
    #[must_use]
    pub fn cli_debug() -> Self {
        Self {
            default_level: Level::DEBUG,
            output_format: TracingOutputFormat::Compact,
            include_location: true,
            include_target: true,
            include_timestamp: false,
            include_span_events: true,
            env_filter: None,
        }
    }

    #[must_use]
    pub fn with_level(mut self, level: Level) -> Self {
        self.default_level = level;
        self
    }

    #[must_use]
    pub fn with_format(mut self, format: TracingOutputFormat) -> Self {
        self.output_format = format;
        self
    }

    #[must_use]
    pub fn with_env_filter(mut self, filter: impl Into<String>) -> Self {
        self.env_filter = Some(filter.into());
        self
    }

    /// The directive used when neither `env_filter` nor `RUST_LOG` is set.
    pub fn default_directive(&self) -> String {
        format!("{FILTER_TARGET}={}", self.default_level)
    }

    fn env_filter(&self) -> Result<EnvFilter, TracingError> {
        match self.env_filter {
            Some(ref filter) => Ok(EnvFilter::try_new(filter)?),
            None => Ok(EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(self.default_directive()))),
        }
    }

    fn span_events(&self) -> FmtSpan {
        if self.include_span_events {
            FmtSpan::NEW | FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        }
    }

    /// Applies the location, target and span settings to a formatting layer.
    fn decorate<S, N, L, T, W>(
        &self,
        layer: fmt::Layer<S, N, Format<L, T>, W>,
    ) -> fmt::Layer<S, N, Format<L, T>, W>
    where
        N: for<'writer> FormatFields<'writer> + 'static,
    {
        layer
            .with_file(self.include_location)
            .with_line_number(self.include_location)
            .with_target(self.include_target)
            .with_span_events(self.span_events())
    }
}

/// Installs the global subscriber, writing to stderr. Call once per process.
///
/// `RUST_LOG` overrides the configured default level.
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed or if the
/// filter directive does not parse.
pub fn init_tracing(config: TracingConfig) -> Result<(), TracingError> {
    let env_filter = config.env_filter()?;
    let layer = match config.output_format {
        TracingOutputFormat::Pretty => config
            .decorate(fmt::layer().pretty())
            .with_writer(std::io::stderr)
            .boxed(),
        TracingOutputFormat::Compact if config.include_timestamp => config
            .decorate(fmt::layer().compact())
            .with_writer(std::io::stderr)
            .boxed(),
        TracingOutputFormat::Compact => config
            .decorate(fmt::layer().compact().without_time())
            .with_writer(std::io::stderr)
            .boxed(),
        TracingOutputFormat::Json => config
            .decorate(fmt::layer().json())
            .with_writer(std::io::stderr)
            .boxed(),
    };

    let subscriber = tracing_subscriber::registry().with(env_filter).with(layer);
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}
