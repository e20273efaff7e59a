//! Resilience patterns for external collaborators.
//!
//! The verdict pipeline calls a statistical classifier and an explainer that
//! live outside this crate. Neither may abort verdict construction, and a
//! collaborator that keeps failing should stop being called for a while.
//!
//! - **Circuit Breaker**: fail fast after repeated collaborator failures

pub mod circuit_breaker;

pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitBreakerStats, CircuitState};
