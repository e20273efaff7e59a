//! # FraudKernel Verdict
//!
//! The orchestrator of the decision core. For each transaction it runs the
//! rule catalog, asks the external classifier and explainer, updates the
//! shared vendor graph, and fuses the three signals into one immutable
//! [`Verdict`].
//!
//! ## Pipeline stages
//!
//! | Stage | Reads | Writes on the working context |
//! |---|---|---|
//! | seed | `business_avg_amount` argument | `business_avg_amount` |
//! | rules | context | nothing |
//! | classifier / explainer | feature vector | nothing |
//! | network | context | `vendor_risk_score` (raise only) |
//! | fuse | layer signals | nothing |
//!
//! A failing layer degrades to its documented fallback; a verdict is always
//! produced.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod collaborators;
pub mod config;
pub mod engine;
pub mod features;
pub mod verdict;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::collaborators::*;
    pub use crate::config::*;
    pub use crate::engine::*;
    pub use crate::features::*;
    pub use crate::verdict::*;
}

pub use collaborators::{AttributionExplainer, AttributionSource, Classifier, Explainer};
pub use config::{EngineConfig, ExplainerConfig};
pub use engine::{BatchReport, BatchRow, VerdictEngine, business_average};
pub use features::{FEATURE_COUNT, FEATURE_NAMES, FeatureVector};
pub use verdict::{ReviewStatus, RiskLevel, Verdict, VerdictSource};
