//! # FraudKernel Core
//!
//! Shared infrastructure for the FraudKernels decision core.
//!
//! This crate provides:
//! - The error taxonomy used across the workspace
//! - Environment and TOML configuration helpers
//! - Structured logging initialisation
//! - A synchronous circuit breaker used to isolate external collaborators

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod logging;
pub mod resilience;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{EnvSource, load_toml, save_toml};
    pub use crate::error::{FraudError, Result};
    pub use crate::logging::{LogConfig, LogLevel};
    pub use crate::resilience::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
}

/// Round a score to four decimal places, the precision verdicts are reported at.
#[must_use]
pub fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}
