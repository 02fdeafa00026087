//! Logging System
//!
//! Structured logging via the `tracing` crate: configurable level, text or
//! JSON format, stdout or stderr destination. Module-level overrides ride on
//! the standard `EnvFilter` directive syntax.

use crate::error::SyncError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing_subscriber::fmt::time::ChronoUtc;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error, off
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format: json, text (default: text)
    #[serde(default = "default_format")]
    pub format: String,

    /// Output destination: stdout, stderr
    #[serde(default = "default_output")]
    pub output: String,

    /// Enable colored output (text format only)
    #[serde(default = "default_true")]
    pub color: bool,

    /// Module-specific log levels
    #[serde(default)]
    pub modules: HashMap<String, String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_format() -> String {
    "text".to_string()
}

fn default_output() -> String {
    "stderr".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: default_log_level(),
            format: default_format(),
            output: default_output(),
            color: true,
            modules: HashMap::new(),
        }
    }
}

impl LoggingConfig {
    fn env_filter(&self) -> EnvFilter {
        let mut directives = self.level.clone();
        for (module, level) in &self.modules {
            directives.push_str(&format!(",{}={}", module, level));
        }
        EnvFilter::try_new(directives).unwrap_or_else(|_| EnvFilter::new("info"))
    }
}

/// Initialize the global subscriber. `RUST_LOG` overrides the configured
/// directives when set. Safe to call more than once; later calls are no-ops.
pub fn init_logging(config: Option<&LoggingConfig>) -> Result<(), SyncError> {
    let default_config = LoggingConfig::default();
    let config = config.unwrap_or(&default_config);

    let filter = match std::env::var("RUST_LOG") {
        Ok(directives) if !directives.is_empty() => {
            EnvFilter::try_new(directives).unwrap_or_else(|_| config.env_filter())
        }
        _ => config.env_filter(),
    };

    let timer = ChronoUtc::new("%Y-%m-%dT%H:%M:%S%.3fZ".to_string());
    let to_stdout = config.output == "stdout";

    let result = if config.format == "json" {
        let layer = fmt::layer()
            .json()
            .with_timer(timer)
            .with_writer(if to_stdout {
                fmt::writer::BoxMakeWriter::new(std::io::stdout)
            } else {
                fmt::writer::BoxMakeWriter::new(std::io::stderr)
            });
        Registry::default().with(filter).with(layer).try_init()
    } else {
        let layer = fmt::layer()
            .with_timer(timer)
            .with_ansi(config.color)
            .with_writer(if to_stdout {
                fmt::writer::BoxMakeWriter::new(std::io::stdout)
            } else {
                fmt::writer::BoxMakeWriter::new(std::io::stderr)
            });
        Registry::default().with(filter).with(layer).try_init()
    };

    // A second init (tests, embedding) keeps the existing subscriber.
    let _ = result;
    Ok(())
}
