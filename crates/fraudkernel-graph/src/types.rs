//! Graph data structures and result types.

use fraudkernel_rules::Severity;
use serde::{Deserialize, Serialize};

// ============================================================================
// CSR Graph
// ============================================================================

/// Weighted graph in Compressed Sparse Row (CSR) format.
///
/// Built from a consistent view of the vendor graph for one centrality run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CsrGraph {
    /// Number of nodes.
    pub num_nodes: usize,
    /// Number of edges.
    pub num_edges: usize,
    /// Row offsets (length: num_nodes + 1).
    pub row_offsets: Vec<usize>,
    /// Column indices (length: num_edges).
    pub col_indices: Vec<usize>,
    /// Edge weights (length: num_edges).
    pub weights: Vec<f64>,
}

impl CsrGraph {
    /// Create an empty graph.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            num_nodes: 0,
            num_edges: 0,
            row_offsets: vec![0],
            col_indices: Vec::new(),
            weights: Vec::new(),
        }
    }

    /// Create a graph from a weighted edge list.
    ///
    /// Edges referencing nodes outside `0..num_nodes` are skipped.
    #[must_use]
    pub fn from_weighted_edges(num_nodes: usize, edges: &[(usize, usize, f64)]) -> Self {
        let edges: Vec<_> = edges
            .iter()
            .filter(|(src, dst, _)| *src < num_nodes && *dst < num_nodes)
            .collect();

        let mut row_counts = vec![0usize; num_nodes];
        for (src, _, _) in &edges {
            row_counts[*src] += 1;
        }

        let mut row_offsets = vec![0usize; num_nodes + 1];
        for i in 0..num_nodes {
            row_offsets[i + 1] = row_offsets[i] + row_counts[i];
        }

        let mut col_indices = vec![0usize; edges.len()];
        let mut weights = vec![0.0f64; edges.len()];
        let mut current_pos = row_offsets.clone();

        for (src, dst, weight) in &edges {
            let pos = current_pos[*src];
            col_indices[pos] = *dst;
            weights[pos] = *weight;
            current_pos[*src] += 1;
        }

        Self {
            num_nodes,
            num_edges: edges.len(),
            row_offsets,
            col_indices,
            weights,
        }
    }

    /// Same nodes, every edge reversed.
    #[must_use]
    pub fn transpose(&self) -> Self {
        let mut reversed = Vec::with_capacity(self.num_edges);
        for src in 0..self.num_nodes {
            for (dst, weight) in self.neighbors(src).iter().zip(self.edge_weights(src)) {
                reversed.push((*dst, src, *weight));
            }
        }
        Self::from_weighted_edges(self.num_nodes, &reversed)
    }

    /// Get the out-degree of a node.
    #[must_use]
    pub fn out_degree(&self, node: usize) -> usize {
        if node >= self.num_nodes {
            return 0;
        }
        self.row_offsets[node + 1] - self.row_offsets[node]
    }

    /// Get the neighbors of a node.
    #[must_use]
    pub fn neighbors(&self, node: usize) -> &[usize] {
        if node >= self.num_nodes {
            return &[];
        }
        &self.col_indices[self.row_offsets[node]..self.row_offsets[node + 1]]
    }

    /// Weights of the edges returned by [`CsrGraph::neighbors`].
    #[must_use]
    pub fn edge_weights(&self, node: usize) -> &[f64] {
        if node >= self.num_nodes {
            return &[];
        }
        &self.weights[self.row_offsets[node]..self.row_offsets[node + 1]]
    }

    /// Sum of positive outgoing weights.
    #[must_use]
    pub fn out_weight(&self, node: usize) -> f64 {
        self.edge_weights(node).iter().filter(|w| **w > 0.0).sum()
    }
}

// ============================================================================
// Analysis Results
// ============================================================================

/// Structural collusion indicator for one vendor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollusionSignal {
    /// Whether enough distinct businesses pay this vendor.
    pub detected: bool,
    /// Distinct paying businesses (vendor in-degree).
    pub shared_businesses: usize,
    /// `high` or `critical` when detected, `none` otherwise.
    pub severity: Severity,
    /// Explanation when detected, empty otherwise.
    pub message: String,
}

impl CollusionSignal {
    /// No collusion.
    #[must_use]
    pub fn none(shared_businesses: usize) -> Self {
        Self {
            detected: false,
            shared_businesses,
            severity: Severity::None,
            message: String::new(),
        }
    }

    /// Collusion at the given severity.
    #[must_use]
    pub fn detected(shared_businesses: usize, severity: Severity) -> Self {
        Self {
            detected: true,
            shared_businesses,
            severity,
            message: format!(
                "Vendor receiving payments from {} businesses",
                shared_businesses
            ),
        }
    }
}

/// Network-layer signals for one transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkAnalysis {
    /// Vendor risk score after recording the transaction.
    pub vendor_risk_score: f64,
    /// `vendor_risk_score × 0.6 + 0.4·collusion`, 4 dp.
    pub network_score: f64,
    /// Collusion signal for the vendor.
    pub collusion: CollusionSignal,
}

/// Graph size counters.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GraphStats {
    /// Business nodes.
    pub business_count: usize,
    /// Vendor nodes.
    pub vendor_count: usize,
    /// Business → vendor edges.
    pub edge_count: usize,
    /// Sum of all recorded amounts.
    pub total_volume: f64,
}

// ============================================================================
// Visualization Snapshot
// ============================================================================

/// Node kind in a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// Paying business.
    Business,
    /// Receiving vendor.
    Vendor,
}

/// Node in a visualization snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotNode {
    /// `biz_<id>` or `vendor_<name>`.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Node kind.
    #[serde(rename = "type")]
    pub kind: NodeKind,
    /// Business id (business nodes only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business_id: Option<u64>,
    /// Vendor risk score (vendor nodes only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_score: Option<f64>,
    /// Cumulative amount received (vendor nodes only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_received: Option<f64>,
    /// Payments received (vendor nodes only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub txn_count: Option<u64>,
}

/// Edge in a visualization snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotEdge {
    /// Source node id.
    pub source: String,
    /// Target node id.
    pub target: String,
    /// Cumulative amount.
    pub weight: f64,
    /// Payments along this edge.
    pub txn_count: u64,
}

/// Point-in-time copy of (part of) the graph.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GraphSnapshot {
    /// Nodes.
    pub nodes: Vec<SnapshotNode>,
    /// Edges between included nodes.
    pub links: Vec<SnapshotEdge>,
    /// Number of nodes.
    pub total_nodes: usize,
}

impl GraphSnapshot {
    /// Find a node by id.
    #[must_use]
    pub fn node(&self, id: &str) -> Option<&SnapshotNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Returns true if the snapshot has no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Node id of a business.
#[must_use]
pub fn business_node_id(business_id: u64) -> String {
    format!("biz_{}", business_id)
}

/// Node id of a vendor. Exact, case-sensitive.
#[must_use]
pub fn vendor_node_id(vendor_name: &str) -> String {
    format!("vendor_{}", vendor_name)
}
