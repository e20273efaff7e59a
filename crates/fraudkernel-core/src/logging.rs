//! Structured logging.
//!
//! Thin configuration layer over `tracing-subscriber`. The engine itself only
//! emits `tracing` events; binaries and tests decide how they are rendered.
//!
//! # Example
//!
//! ```rust,ignore
//! use fraudkernel_core::logging::LogConfig;
//!
//! LogConfig::production().init()?;
//! tracing::info!(business_id = 7, "Verdict emitted");
//! ```

use crate::config::EnvSource;
use serde::{Deserialize, Serialize};

/// Log level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Trace level (most verbose)
    Trace,
    /// Debug level
    Debug,
    /// Info level
    #[default]
    Info,
    /// Warning level
    Warn,
    /// Error level
    Error,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Trace => write!(f, "trace"),
            Self::Debug => write!(f, "debug"),
            Self::Info => write!(f, "info"),
            Self::Warn => write!(f, "warn"),
            Self::Error => write!(f, "error"),
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(Self::Trace),
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            _ => Err(format!("Invalid log level: {}", s)),
        }
    }
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Default log level
    pub level: LogLevel,
    /// Enable structured JSON output
    pub structured: bool,
    /// Include caller location
    pub include_location: bool,
    /// Include thread IDs
    pub include_thread_ids: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            structured: false,
            include_location: false,
            include_thread_ids: false,
        }
    }
}

impl LogConfig {
    /// Development configuration
    pub fn development() -> Self {
        Self {
            level: LogLevel::Debug,
            structured: false,
            include_location: true,
            ..Default::default()
        }
    }

    /// Production configuration
    pub fn production() -> Self {
        Self {
            level: LogLevel::Info,
            structured: true,
            include_thread_ids: true,
            ..Default::default()
        }
    }

    /// Apply `FRAUDKERNEL_LOG_LEVEL` and `FRAUDKERNEL_LOG_JSON` overrides.
    pub fn with_env(mut self, env: &impl EnvSource) -> Self {
        if let Some(raw) = env.get("FRAUDKERNEL_LOG_LEVEL") {
            match raw.parse() {
                Ok(level) => self.level = level,
                Err(e) => tracing::warn!(error = %e, "Ignoring FRAUDKERNEL_LOG_LEVEL"),
            }
        }
        self.structured = env.flag_or("FRAUDKERNEL_LOG_JSON", self.structured);
        self
    }

    /// Initialize the global subscriber, writing to stderr.
    ///
    /// `RUST_LOG` takes precedence over the configured level. Calling this
    /// more than once is harmless; later calls leave the first subscriber in
    /// place.
    pub fn init(&self) -> crate::error::Result<()> {
        use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(self.level.to_string()));

        let subscriber = tracing_subscriber::registry().with(filter);

        if self.structured {
            let layer = fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .with_thread_ids(self.include_thread_ids)
                .with_file(self.include_location)
                .with_line_number(self.include_location);

            subscriber.with(layer).try_init().ok();
        } else {
            let layer = fmt::layer()
                .with_writer(std::io::stderr)
                .with_thread_ids(self.include_thread_ids)
                .with_file(self.include_location)
                .with_line_number(self.include_location);

            subscriber.with(layer).try_init().ok();
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_log_level_parse() {
        assert_eq!("WARNING".parse::<LogLevel>().unwrap(), LogLevel::Warn);
        assert_eq!("debug".parse::<LogLevel>().unwrap(), LogLevel::Debug);
        assert!("loud".parse::<LogLevel>().is_err());
    }

    #[test]
    fn test_presets() {
        assert_eq!(LogConfig::development().level, LogLevel::Debug);
        assert!(LogConfig::production().structured);
        assert!(!LogConfig::default().structured);
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<String, String> = [
            ("FRAUDKERNEL_LOG_LEVEL".to_string(), "error".to_string()),
            ("FRAUDKERNEL_LOG_JSON".to_string(), "true".to_string()),
        ]
        .into_iter()
        .collect();

        let config = LogConfig::default().with_env(&env);
        assert_eq!(config.level, LogLevel::Error);
        assert!(config.structured);
    }

    #[test]
    fn test_bad_env_level_keeps_default() {
        let env: HashMap<String, String> =
            [("FRAUDKERNEL_LOG_LEVEL".to_string(), "shouty".to_string())]
                .into_iter()
                .collect();

        assert_eq!(LogConfig::default().with_env(&env).level, LogLevel::Info);
    }

    #[test]
    fn test_init_twice_is_ok() {
        assert!(LogConfig::default().init().is_ok());
        assert!(LogConfig::development().init().is_ok());
    }
}
