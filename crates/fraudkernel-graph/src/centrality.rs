//! Weighted PageRank centrality.
//!
//! Power iteration with teleportation over edge weights. Nodes without
//! positive outgoing weight are dangling; their mass is spread uniformly.
//!
//! # Example
//!
//! ```rust,ignore
//! use fraudkernel_graph::centrality::{PageRank, PageRankConfig};
//!
//! let result = PageRank::run_to_convergence(&graph, &PageRankConfig::default());
//! let top = result.normalized(vendor_index);
//! ```

use crate::types::CsrGraph;
use serde::{Deserialize, Serialize};

// ============================================================================
// Configuration
// ============================================================================

/// PageRank parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageRankConfig {
    /// Damping factor.
    pub damping: f64,
    /// Iteration cap.
    pub max_iterations: u32,
    /// Per-node tolerance; convergence when the L1 change is below `n × tolerance`.
    pub tolerance: f64,
}

impl Default for PageRankConfig {
    fn default() -> Self {
        Self {
            damping: 0.85,
            max_iterations: 100,
            tolerance: 1e-6,
        }
    }
}

impl PageRankConfig {
    /// Replace out-of-range parameters with their defaults.
    #[must_use]
    pub fn sanitized(mut self) -> Self {
        let d = Self::default();

        if !(self.damping.is_finite() && self.damping > 0.0 && self.damping < 1.0) {
            tracing::warn!(
                value = self.damping,
                "PageRank damping must be in (0, 1), using default"
            );
            self.damping = d.damping;
        }
        if self.max_iterations == 0 {
            tracing::warn!("PageRank max_iterations must be positive, using default");
            self.max_iterations = d.max_iterations;
        }
        if !(self.tolerance.is_finite() && self.tolerance > 0.0) {
            tracing::warn!(
                value = self.tolerance,
                "PageRank tolerance must be positive, using default"
            );
            self.tolerance = d.tolerance;
        }

        self
    }
}

// ============================================================================
// Result
// ============================================================================

/// Centrality scores indexed by CSR node index.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CentralityResult {
    /// Score per node.
    pub scores: Vec<f64>,
    /// Iterations run.
    pub iterations: u32,
    /// Whether the tolerance was reached.
    pub converged: bool,
}

impl CentralityResult {
    /// Highest score, or 0 for an empty graph.
    #[must_use]
    pub fn max_score(&self) -> f64 {
        self.scores.iter().copied().fold(0.0, f64::max)
    }

    /// Score divided by the maximum, in `[0, 1]`.
    #[must_use]
    pub fn normalized(&self, node: usize) -> f64 {
        let max = self.max_score();
        match self.scores.get(node) {
            Some(score) if max > 0.0 => (score / max).clamp(0.0, 1.0),
            _ => 0.0,
        }
    }
}

// ============================================================================
// PageRank
// ============================================================================

/// Iteration state.
#[derive(Debug, Clone)]
pub struct PageRankState {
    /// Current scores.
    pub scores: Vec<f64>,
    /// Previous scores (for convergence check).
    pub prev_scores: Vec<f64>,
    /// Incoming edges: `incoming.neighbors(v)` are the sources pointing at `v`.
    pub incoming: CsrGraph,
    /// Positive outgoing weight per node.
    pub out_weights: Vec<f64>,
    /// Damping factor.
    pub damping: f64,
    /// Current iteration.
    pub iteration: u32,
}

/// Weighted PageRank.
#[derive(Debug, Clone, Copy, Default)]
pub struct PageRank;

impl PageRank {
    /// Initialize state for a graph, starting from the uniform distribution.
    #[must_use]
    pub fn initialize_state(graph: &CsrGraph, damping: f64) -> PageRankState {
        let n = graph.num_nodes;
        let start = if n > 0 { 1.0 / n as f64 } else { 0.0 };

        PageRankState {
            scores: vec![start; n],
            prev_scores: vec![0.0; n],
            incoming: graph.transpose(),
            out_weights: (0..n).map(|i| graph.out_weight(i)).collect(),
            damping,
            iteration: 0,
        }
    }

    /// Perform one iteration. Returns the L1 change.
    pub fn iterate_step(state: &mut PageRankState) -> f64 {
        let n = state.scores.len();
        if n == 0 {
            return 0.0;
        }

        let d = state.damping;

        // Swap buffers
        std::mem::swap(&mut state.scores, &mut state.prev_scores);

        let dangling: f64 = state
            .prev_scores
            .iter()
            .zip(&state.out_weights)
            .filter(|(_, w)| **w <= 0.0)
            .map(|(score, _)| *score)
            .sum();
        let base = (1.0 - d) / n as f64 + d * dangling / n as f64;

        let mut l1_diff = 0.0f64;

        for v in 0..n {
            let mut rank_sum = 0.0f64;

            // Sum weighted contributions from incoming edges
            let sources = state.incoming.neighbors(v);
            let weights = state.incoming.edge_weights(v);
            for (&u, &w) in sources.iter().zip(weights) {
                let out = state.out_weights[u];
                if w > 0.0 && out > 0.0 {
                    rank_sum += state.prev_scores[u] * w / out;
                }
            }

            let new_score = base + d * rank_sum;
            state.scores[v] = new_score;
            l1_diff += (new_score - state.prev_scores[v]).abs();
        }

        state.iteration += 1;
        l1_diff
    }

    /// Run PageRank to convergence or the iteration cap.
    #[must_use]
    pub fn run_to_convergence(graph: &CsrGraph, config: &PageRankConfig) -> CentralityResult {
        if graph.num_nodes == 0 {
            return CentralityResult {
                converged: true,
                ..Default::default()
            };
        }

        let mut state = Self::initialize_state(graph, config.damping);
        let threshold = graph.num_nodes as f64 * config.tolerance;
        let mut converged = false;

        for _ in 0..config.max_iterations {
            let diff = Self::iterate_step(&mut state);
            if diff < threshold {
                converged = true;
                break;
            }
        }

        if !converged {
            tracing::warn!(
                iterations = state.iteration,
                nodes = graph.num_nodes,
                "PageRank did not converge"
            );
        }

        CentralityResult {
            scores: state.scores,
            iterations: state.iteration,
            converged,
        }
    }
}
