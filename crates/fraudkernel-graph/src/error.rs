//! Graph errors.

use thiserror::Error;

/// Result type for graph operations.
pub type Result<T> = std::result::Result<T, GraphError>;

/// Failures of the shared vendor graph.
#[derive(Debug, Error)]
pub enum GraphError {
    /// A writer panicked while holding the graph lock.
    #[error("Graph lock poisoned: {0}")]
    LockPoisoned(&'static str),

    /// Amounts must be finite to keep edge weights and totals meaningful.
    #[error("Non-finite amount: {0}")]
    NonFiniteAmount(f64),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = GraphError::NonFiniteAmount(f64::NAN);
        assert_eq!(err.to_string(), "Non-finite amount: NaN");
        assert_eq!(
            GraphError::LockPoisoned("vendor graph").to_string(),
            "Graph lock poisoned: vendor graph"
        );
    }
}
