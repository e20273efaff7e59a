//! # FraudKernel Graph
//!
//! Layer two of the decision core: a shared, append-only graph of
//! business → vendor money flow.
//!
//! ## Operations
//! - `record` - accumulate one payment onto the graph
//! - `vendor_risk_score` - concentration / centrality / in-degree blend
//! - `detect_collusion` - many distinct payers into one vendor
//! - `export_subgraph` - visualization snapshot
//! - `analyze` - all of the above for one transaction
//!
//! Centrality is weighted PageRank over a CSR view of the graph, cached
//! per graph generation.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod centrality;
pub mod error;
pub mod types;
pub mod vendor_graph;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::centrality::*;
    pub use crate::error::*;
    pub use crate::types::*;
    pub use crate::vendor_graph::*;
}

pub use error::{GraphError, Result};
pub use types::{CollusionSignal, GraphSnapshot, GraphStats, NetworkAnalysis};
pub use vendor_graph::{COLLUSION_CRITICAL_PAYERS, COLLUSION_HIGH_PAYERS, GraphConfig, VendorGraph};
