//! Error types for FraudKernels.

use thiserror::Error;

/// Result type alias using `FraudError`.
pub type Result<T> = std::result::Result<T, FraudError>;

/// Errors that can occur in the decision core.
///
/// Most variants never reach a caller of the verdict pipeline: the
/// orchestrator converts collaborator and network failures into their
/// documented fallbacks. They surface from the lower-level APIs and in logs.
#[derive(Debug, Error)]
pub enum FraudError {
    /// Configuration could not be loaded or written.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// The statistical classifier could not produce a probability.
    #[error("Classifier unavailable: {0}")]
    ClassifierUnavailable(String),

    /// The explainer could not produce reasons.
    #[error("Explainer unavailable: {0}")]
    ExplainerUnavailable(String),

    /// The vendor network layer failed.
    #[error("Network layer failure: {0}")]
    NetworkLayer(String),

    /// A circuit breaker rejected the call.
    #[error("Circuit breaker is open for {0}")]
    CircuitOpen(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl FraudError {
    /// Create a classifier-unavailable error.
    #[must_use]
    pub fn classifier(msg: impl Into<String>) -> Self {
        FraudError::ClassifierUnavailable(msg.into())
    }

    /// Create an explainer-unavailable error.
    #[must_use]
    pub fn explainer(msg: impl Into<String>) -> Self {
        FraudError::ExplainerUnavailable(msg.into())
    }

    /// Create a network layer error.
    #[must_use]
    pub fn network(msg: impl Into<String>) -> Self {
        FraudError::NetworkLayer(msg.into())
    }

    /// Returns true if the pipeline degrades gracefully on this error.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            FraudError::ClassifierUnavailable(_)
                | FraudError::ExplainerUnavailable(_)
                | FraudError::NetworkLayer(_)
                | FraudError::CircuitOpen(_)
        )
    }
}

impl From<serde_json::Error> for FraudError {
    fn from(err: serde_json::Error) -> Self {
        FraudError::Serialization(err.to_string())
    }
}
