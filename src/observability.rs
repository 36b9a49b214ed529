//! Tracing subscriber setup
//!
//! The library itself only emits `tracing` events and spans. Hosts that do
//! not install their own subscriber can call `init_tracing`.
//!
//! ## Example
//!
//! ```rust,ignore
//! use llm_relay::observability::{init_tracing, OutputFormat, TracingConfig};
//!
//! let _guard = init_tracing(
//!     TracingConfig::builder()
//!         .log_level(tracing::Level::DEBUG)
//!         .output_format(OutputFormat::Json)
//!         .build(),
//! )?;
//! ```

use std::path::PathBuf;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use crate::error::LlmError;

/// Output format for tracing logs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Multi-line human-readable output
    Pretty,
    /// Single-line human-readable output
    #[default]
    Compact,
    /// One JSON object per line
    Json,
}

/// Configuration for the tracing subscriber
#[derive(Debug, Clone)]
pub struct TracingConfig {
    pub log_level: tracing::Level,
    pub output_format: OutputFormat,
    /// Daily-rolling log directory; logs go to stdout when unset
    pub log_dir: Option<PathBuf>,
    pub file_prefix: String,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            log_level: tracing::Level::INFO,
            output_format: OutputFormat::Compact,
            log_dir: None,
            file_prefix: "llm-relay.log".to_string(),
        }
    }
}

impl TracingConfig {
    pub fn builder() -> TracingConfigBuilder {
        TracingConfigBuilder::default()
    }

    /// Debug level, pretty output.
    pub fn debug() -> Self {
        Self {
            log_level: tracing::Level::DEBUG,
            output_format: OutputFormat::Pretty,
            ..Default::default()
        }
    }

    /// Warn level, JSON written to a daily-rolling file.
    pub fn production(log_dir: PathBuf) -> Self {
        Self {
            log_level: tracing::Level::WARN,
            output_format: OutputFormat::Json,
            log_dir: Some(log_dir),
            ..Default::default()
        }
    }

    /// Default directive when `RUST_LOG` is unset.
    fn default_directive(&self) -> String {
        let level = self.log_level.as_str().to_ascii_lowercase();
        format!("llm_relay={level}")
    }
}

/// Builder for TracingConfig
#[derive(Debug, Default)]
pub struct TracingConfigBuilder {
    log_level: Option<tracing::Level>,
    output_format: Option<OutputFormat>,
    log_dir: Option<PathBuf>,
    file_prefix: Option<String>,
}

impl TracingConfigBuilder {
    pub fn log_level(mut self, level: tracing::Level) -> Self {
        self.log_level = Some(level);
        self
    }

    /// Set the log level from a string
    pub fn log_level_str(mut self, level: &str) -> Result<Self, LlmError> {
        let level = level.parse::<tracing::Level>().map_err(|_| {
            LlmError::ConfigurationError(format!(
                "Invalid log level: {level}. Valid options: trace, debug, info, warn, error"
            ))
        })?;
        self.log_level = Some(level);
        Ok(self)
    }

    pub fn output_format(mut self, format: OutputFormat) -> Self {
        self.output_format = Some(format);
        self
    }

    pub fn log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.log_dir = Some(dir.into());
        self
    }

    pub fn file_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.file_prefix = Some(prefix.into());
        self
    }

    pub fn build(self) -> TracingConfig {
        let defaults = TracingConfig::default();
        TracingConfig {
            log_level: self.log_level.unwrap_or(defaults.log_level),
            output_format: self.output_format.unwrap_or_default(),
            log_dir: self.log_dir,
            file_prefix: self.file_prefix.unwrap_or(defaults.file_prefix),
        }
    }
}

/// Install a global fmt subscriber.
///
/// `RUST_LOG` overrides the configured level. Returns the non-blocking writer
/// guard; keep it alive for the life of the program or buffered lines are
/// lost. Calling this when a global subscriber is already installed is not an
/// error and returns `None`.
pub fn init_tracing(config: TracingConfig) -> Result<Option<WorkerGuard>, LlmError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.default_directive()))
        .map_err(|e| LlmError::ConfigurationError(format!("Invalid log filter: {e}")))?;

    let (writer, guard) = match &config.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, &config.file_prefix);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (writer, Some(guard))
        }
        None => {
            let (writer, guard) = tracing_appender::non_blocking(std::io::stdout());
            (writer, Some(guard))
        }
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(writer);

    let init_result = match config.output_format {
        OutputFormat::Json => builder.json().with_current_span(true).try_init(),
        OutputFormat::Pretty => builder.pretty().try_init(),
        OutputFormat::Compact => builder.compact().try_init(),
    };

    match init_result {
        Ok(()) => Ok(guard),
        Err(e) => {
            let error_msg = e.to_string();
            if error_msg.contains("already") {
                Ok(None)
            } else {
                Err(LlmError::ConfigurationError(format!(
                    "Failed to initialize tracing: {e}"
                )))
            }
        }
    }
}
