//! # FraudKernel
//!
//! Decision core of a transaction fraud-detection service. Given one
//! transaction plus business context, it fuses independent risk signals
//! into a single verdict, explains the contributing factors and flags
//! transactions for human review.
//!
//! ## Layers
//!
//! - **Rules** (`fraudkernel-rules`): eight pure threshold rules, every one
//!   evaluated on every call
//! - **Network** (`fraudkernel-graph`): a shared, append-only business →
//!   vendor graph scored with concentration, weighted PageRank and in-degree
//! - **Verdict** (`fraudkernel-verdict`): classifier and explainer isolation,
//!   fixed-weight fusion and override policy
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use fraudkernel::prelude::*;
//!
//! let config = EngineConfig::from_env();
//! config.logging.init()?;
//!
//! let engine = VerdictEngine::new(config).with_classifier(model);
//!
//! let mut ctx = TransactionContext::from_json(&record);
//! let verdict = engine.analyze(&mut ctx, business_id, business_avg);
//! if verdict.review_required {
//!     queue.push(verdict);
//! }
//! ```
//!
//! ## Fusion
//!
//! `final = 0.50·ml + 0.35·rules + 0.15·network`, floored at 0.75 on a
//! critical rule hit. Fraud at 0.45, review at 0.30.

#![warn(missing_docs)]
#![warn(clippy::all)]

// Re-export crates
pub use fraudkernel_core as core;
pub use fraudkernel_graph as graph;
pub use fraudkernel_rules as rules;
pub use fraudkernel_verdict as verdict;

/// Prelude module for convenient imports.
///
/// Import everything you need with:
/// ```rust,ignore
/// use fraudkernel::prelude::*;
/// ```
pub mod prelude {
    pub use fraudkernel_core::prelude::*;
    pub use fraudkernel_graph::{
        CollusionSignal, GraphConfig, GraphSnapshot, GraphStats, NetworkAnalysis, VendorGraph,
    };
    pub use fraudkernel_rules::{
        FlagResult, Rule, RuleEngine, RuleEvaluation, RuleThresholds, Severity,
        TransactionContext,
    };
    pub use fraudkernel_verdict::prelude::*;
}

/// Version information.
pub mod version {
    /// Crate version.
    pub const VERSION: &str = env!("CARGO_PKG_VERSION");
}
