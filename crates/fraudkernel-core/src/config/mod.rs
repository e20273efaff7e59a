//! Configuration helpers.
//!
//! Engine configuration is layered: compiled-in defaults, then an optional
//! TOML file, then `FRAUDKERNEL_*` environment overrides. Environment values
//! never fail the load: a value that does not parse falls back to the
//! default it was meant to replace and a warning is logged.
//!
//! # Example
//!
//! ```rust,ignore
//! use fraudkernel_core::config::{EnvSource, ProcessEnv};
//!
//! let limit: u32 = ProcessEnv.parse_or("FRAUDKERNEL_RULE_VELOCITY_1H", 8);
//! ```

use crate::error::{FraudError, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::fmt::Display;
use std::path::Path;
use std::str::FromStr;

/// Prefix shared by every environment variable the engine reads.
pub const ENV_PREFIX: &str = "FRAUDKERNEL_";

/// A source of string configuration values keyed by variable name.
pub trait EnvSource {
    /// Look up a raw value.
    fn get(&self, key: &str) -> Option<String>;

    /// Parse a value, falling back to `default` when absent or malformed.
    fn parse_or<T>(&self, key: &str, default: T) -> T
    where
        T: FromStr + Display,
    {
        match self.get(key) {
            None => default,
            Some(raw) => match raw.trim().parse::<T>() {
                Ok(value) => value,
                Err(_) => {
                    tracing::warn!(
                        key,
                        value = %raw,
                        default = %default,
                        "Unparseable configuration value, using default"
                    );
                    default
                }
            },
        }
    }

    /// Parse a boolean flag (`1/0`, `true/false`, `yes/no`, `on/off`).
    fn flag_or(&self, key: &str, default: bool) -> bool {
        match self.get(key) {
            None => default,
            Some(raw) => match raw.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" => false,
                _ => {
                    tracing::warn!(key, value = %raw, default, "Unparseable flag, using default");
                    default
                }
            },
        }
    }
}

/// Reads from the process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

impl EnvSource for HashMap<String, String> {
    fn get(&self, key: &str) -> Option<String> {
        HashMap::get(self, key).cloned()
    }
}

/// Load a configuration value from a TOML file.
pub fn load_toml<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T> {
    let content = std::fs::read_to_string(path.as_ref())
        .map_err(|e| FraudError::ConfigError(format!("Failed to read config: {}", e)))?;

    toml::from_str(&content)
        .map_err(|e| FraudError::ConfigError(format!("Failed to parse config: {}", e)))
}

/// Save a configuration value to a TOML file.
pub fn save_toml<T: Serialize>(value: &T, path: impl AsRef<Path>) -> Result<()> {
    let content = toml::to_string_pretty(value)
        .map_err(|e| FraudError::ConfigError(format!("Failed to serialize config: {}", e)))?;

    std::fs::write(path.as_ref(), content)
        .map_err(|e| FraudError::ConfigError(format!("Failed to write config: {}", e)))?;

    Ok(())
}
