//! Engine configuration.
//!
//! # Example
//!
//! ```rust,ignore
//! use fraudkernel_verdict::EngineConfig;
//!
//! let config = EngineConfig::from_env();
//! config.logging.init()?;
//! config.to_file("fraudkernel.toml")?;
//! ```

use fraudkernel_core::config::{EnvSource, ProcessEnv, load_toml, save_toml};
use fraudkernel_core::error::Result;
use fraudkernel_core::logging::LogConfig;
use fraudkernel_core::resilience::CircuitBreakerConfig;
use fraudkernel_graph::GraphConfig;
use fraudkernel_rules::RuleThresholds;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Explainer settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplainerConfig {
    /// Maximum number of reason strings per verdict.
    pub top_n: usize,
}

impl Default for ExplainerConfig {
    fn default() -> Self {
        Self { top_n: 4 }
    }
}

impl ExplainerConfig {
    /// Apply `FRAUDKERNEL_EXPLAINER_TOP_N` over these settings.
    #[must_use]
    pub fn with_env(self, env: &impl EnvSource) -> Self {
        let top_n = env.parse_or("FRAUDKERNEL_EXPLAINER_TOP_N", self.top_n);
        Self { top_n }.sanitized()
    }

    /// Replace a zero `top_n` with the default.
    #[must_use]
    pub fn sanitized(self) -> Self {
        if self.top_n == 0 {
            tracing::warn!("explainer top_n must be positive, using default");
            return Self::default();
        }
        self
    }
}

/// Everything a [`crate::VerdictEngine`] is configured with.
///
/// Fusion weights and verdict thresholds are not part of it; they are
/// constants of the verdict model.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Rule thresholds.
    pub rules: RuleThresholds,
    /// Vendor graph settings.
    pub graph: GraphConfig,
    /// Explainer settings.
    pub explainer: ExplainerConfig,
    /// Breaker guarding the classifier.
    pub classifier_breaker: CircuitBreakerConfig,
    /// Logging.
    pub logging: LogConfig,
}

impl EngineConfig {
    /// Defaults overridden by `FRAUDKERNEL_*` environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_env_source(&ProcessEnv)
    }

    /// Defaults overridden by an arbitrary variable source.
    #[must_use]
    pub fn from_env_source(env: &impl EnvSource) -> Self {
        Self::default().with_env(env)
    }

    /// Load from a TOML file, then apply `FRAUDKERNEL_*` overrides.
    ///
    /// Missing sections take their defaults. Out-of-range values from
    /// either layer fall back to defaults with a warning.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_file_with_env(path, &ProcessEnv)
    }

    /// Load from a TOML file, then apply overrides from `env`.
    pub fn from_file_with_env(path: impl AsRef<Path>, env: &impl EnvSource) -> Result<Self> {
        let config: Self = load_toml(path)?;
        Ok(config.with_env(env))
    }

    /// Apply environment overrides over this configuration.
    #[must_use]
    pub fn with_env(self, env: &impl EnvSource) -> Self {
        Self {
            rules: self.rules.with_env(env),
            explainer: self.explainer.with_env(env),
            logging: self.logging.with_env(env),
            ..self
        }
        .sanitized()
    }

    /// Replace out-of-range values in every section with their defaults.
    #[must_use]
    pub fn sanitized(self) -> Self {
        Self {
            rules: self.rules.sanitized(),
            graph: self.graph.sanitized(),
            explainer: self.explainer.sanitized(),
            classifier_breaker: self.classifier_breaker.sanitized(),
            logging: self.logging,
        }
    }

    /// Write to a TOML file.
    pub fn to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        save_toml(self, path)
    }
}
