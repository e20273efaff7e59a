//! # FraudKernel Rules
//!
//! Layer one of the decision core: a fixed, ordered catalog of threshold
//! rules evaluated over a single transaction.
//!
//! ## Rules
//! - `R1` large amount / spike against the business average
//! - `R2` velocity in the last hour
//! - `R3` velocity in the last 24 hours
//! - `R4` high-risk jurisdiction (vendor and/or origin)
//! - `R5` origin/vendor country mismatch
//! - `R6` after-hours and crypto payments
//! - `R7` round amount to a new vendor
//! - `R8` vendor risk score band
//!
//! Every rule runs on every call; evaluation is pure and never fails.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod context;
pub mod engine;
pub mod thresholds;
pub mod types;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::context::*;
    pub use crate::engine::*;
    pub use crate::thresholds::*;
    pub use crate::types::*;
}

pub use context::TransactionContext;
pub use engine::{Rule, RuleEngine};
pub use thresholds::RuleThresholds;
pub use types::{FlagResult, RuleEvaluation, Severity};
