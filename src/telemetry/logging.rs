//! Logging configuration and initialization for the integrity engine.
//!
//! JSON or pretty output, filtered by an `EnvFilter` directive, written to
//! stderr or appended to a file. Integrity events at warning level and
//! above stay enabled unless the directive names their target explicitly.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use thiserror::Error;
use tracing_subscriber::{
    filter::{Directive, ParseError},
    fmt,
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use super::integrity_log::INTEGRITY_TARGET;

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// JSON structured logging (default for production).
    #[default]
    Json,
    /// Human-readable pretty printing (for development).
    Pretty,
}

impl std::str::FromStr for LogFormat {
    type Err = LogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "pretty" => Ok(Self::Pretty),
            other => Err(LogError::UnknownFormat(other.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub format: LogFormat,
    /// Filter directive (e.g. "info", "killswitch_core=debug").
    pub level: String,
    /// Log file. Stderr when `None`.
    pub output_path: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Json,
            level: "info".to_string(),
            output_path: None,
        }
    }
}

impl LogConfig {
    /// Read `KILLSWITCH_LOG_FORMAT`, `KILLSWITCH_LOG_LEVEL` and
    /// `KILLSWITCH_LOG_FILE`, keeping defaults for missing or invalid values.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            format: std::env::var("KILLSWITCH_LOG_FORMAT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.format),
            level: std::env::var("KILLSWITCH_LOG_LEVEL").unwrap_or(defaults.level),
            output_path: std::env::var_os("KILLSWITCH_LOG_FILE").map(PathBuf::from),
        }
    }
}

#[derive(Debug, Error)]
pub enum LogError {
    #[error("Invalid log filter: {0}")]
    InvalidFilter(String),
    #[error("Unknown log format: {0}")]
    UnknownFormat(String),
    #[error("Failed to open log file: {0}")]
    FileOpen(String),
    #[error("Subscriber already initialized")]
    AlreadyInitialized,
}

/// Parse `level` and keep integrity warnings audible under it.
pub fn build_filter(level: &str) -> Result<EnvFilter, LogError> {
    let filter = EnvFilter::try_new(level).map_err(|e| LogError::InvalidFilter(e.to_string()))?;
    if level.contains(INTEGRITY_TARGET) {
        return Ok(filter);
    }
    let floor: Directive = format!("{}=warn", INTEGRITY_TARGET)
        .parse()
        .map_err(|e: ParseError| LogError::InvalidFilter(e.to_string()))?;
    Ok(filter.add_directive(floor))
}

fn open_log_file(path: &Path) -> Result<Mutex<std::fs::File>, LogError> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map(Mutex::new)
        .map_err(|e| LogError::FileOpen(format!("{}: {}", path.display(), e)))
}

/// Install the global subscriber. Call once at startup.
pub fn init_logging(config: &LogConfig) -> Result<(), LogError> {
    let registry = tracing_subscriber::registry().with(build_filter(&config.level)?);
    let installed = match (config.format, config.output_path.as_deref()) {
        (LogFormat::Json, Some(path)) => registry
            .with(fmt::layer().json().with_writer(open_log_file(path)?))
            .try_init(),
        (LogFormat::Json, None) => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init(),
        (LogFormat::Pretty, Some(path)) => registry
            .with(fmt::layer().pretty().with_ansi(false).with_writer(open_log_file(path)?))
            .try_init(),
        (LogFormat::Pretty, None) => registry
            .with(fmt::layer().pretty().with_writer(std::io::stderr))
            .try_init(),
    };
    installed.map_err(|_| LogError::AlreadyInitialized)
}
