// Named-event logger handed to every startup stage

use crate::config::Config;
use crate::core::errors::ConfigurationError;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, error, info, trace, warn};

/// Severity of an emitted event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(level: &str) -> Result<Self, Self::Err> {
        match level.to_lowercase().as_str() {
            "trace" => Ok(Severity::Trace),
            "debug" => Ok(Severity::Debug),
            "info" => Ok(Severity::Info),
            "warn" => Ok(Severity::Warn),
            "error" => Ok(Severity::Error),
            _ => Err(format!("Invalid log level: {}", level)),
        }
    }
}

impl From<Severity> for tracing::Level {
    fn from(severity: Severity) -> Self {
        match severity {
            Severity::Trace => tracing::Level::TRACE,
            Severity::Debug => tracing::Level::DEBUG,
            Severity::Info => tracing::Level::INFO,
            Severity::Warn => tracing::Level::WARN,
            Severity::Error => tracing::Level::ERROR,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Severity::Trace => "trace",
            Severity::Debug => "debug",
            Severity::Info => "info",
            Severity::Warn => "warn",
            Severity::Error => "error",
        };
        f.write_str(name)
    }
}

/// Emits named events through `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct Logger;

impl Logger {
    pub fn new() -> Self {
        Self
    }

    pub fn emit(&self, event: &str, severity: Severity, message: &str) {
        match severity {
            Severity::Trace => trace!(event = %event, "{}", message),
            Severity::Debug => debug!(event = %event, "{}", message),
            Severity::Info => info!(event = %event, "{}", message),
            Severity::Warn => warn!(event = %event, "{}", message),
            Severity::Error => error!(event = %event, "{}", message),
        }
    }
}

/// Initialize tracing subscriber based on configuration
///
/// RUST_LOG takes precedence over LOG_LEVEL. Only the first call in a process
/// installs a subscriber; later calls keep the existing one.
pub fn init_tracing(config: &Config) -> Result<(), ConfigurationError> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let level: Severity = config
        .log_level
        .parse()
        .map_err(ConfigurationError::Unusable)?;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = fmt()
        .with_max_level(tracing::Level::from(level))
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_env_filter(filter);

    // try_init fails only when a global subscriber is already installed
    let installed = if config.log_format == "json" {
        subscriber.json().try_init().is_ok()
    } else {
        subscriber.try_init().is_ok()
    };

    if !installed {
        debug!("tracing subscriber already installed");
    }

    Ok(())
}
