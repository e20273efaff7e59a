//! Shared vendor relationship graph.
//!
//! Directed business → vendor edges carry the cumulative amount paid and the
//! number of payments. The graph only grows. One `VendorGraph` instance is
//! shared by every concurrent analysis call; each `record` is atomic under a
//! single write lock, and readers (scoring, export) work against a
//! read-locked view so edge weight and count are never torn.
//!
//! # Example
//!
//! ```rust,ignore
//! use fraudkernel_graph::VendorGraph;
//!
//! let graph = VendorGraph::default();
//! graph.record(1, "Acme Supplies", 2_500.0)?;
//! let risk = graph.vendor_risk_score("Acme Supplies")?;
//! let collusion = graph.detect_collusion("Acme Supplies")?;
//! ```

use crate::centrality::{CentralityResult, PageRank, PageRankConfig};
use crate::error::{GraphError, Result};
use crate::types::{
    CollusionSignal, CsrGraph, GraphSnapshot, GraphStats, NetworkAnalysis, NodeKind, SnapshotEdge,
    SnapshotNode, business_node_id, vendor_node_id,
};
use fraudkernel_core::round4;
use fraudkernel_rules::{Severity, TransactionContext};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard};

/// Risk score of a vendor the graph has never seen.
pub const UNSEEN_VENDOR_SCORE: f64 = 0.05;

/// Centrality is only meaningful from this many nodes on.
pub const MIN_NODES_FOR_CENTRALITY: usize = 3;

/// Distinct payers for a `high` collusion signal.
pub const COLLUSION_HIGH_PAYERS: usize = 5;

/// Distinct payers for a `critical` collusion signal.
pub const COLLUSION_CRITICAL_PAYERS: usize = 10;

// ============================================================================
// Configuration
// ============================================================================

/// Vendor graph configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// PageRank parameters for the centrality term.
    pub pagerank: PageRankConfig,
}

impl GraphConfig {
    /// Replace out-of-range values with their defaults.
    #[must_use]
    pub fn sanitized(self) -> Self {
        Self {
            pagerank: self.pagerank.sanitized(),
        }
    }
}

// ============================================================================
// Graph State
// ============================================================================

#[derive(Debug, Clone)]
struct VendorEntry {
    name: String,
    total_received: f64,
    txn_count: u64,
    in_degree: usize,
}

#[derive(Debug, Clone, Copy, Default)]
struct EdgeEntry {
    weight: f64,
    txn_count: u64,
}

#[derive(Debug, Default)]
struct GraphState {
    /// Business ids, sorted; position is the CSR node index.
    businesses: BTreeMap<u64, ()>,
    /// Vendors in insertion order; CSR index is `businesses.len() + position`.
    vendors: Vec<VendorEntry>,
    vendor_index: HashMap<String, usize>,
    /// Keyed by `(business_id, vendor position)`.
    edges: BTreeMap<(u64, usize), EdgeEntry>,
    total_received: f64,
    generation: u64,
}

impl GraphState {
    fn node_count(&self) -> usize {
        self.businesses.len() + self.vendors.len()
    }

    fn vendor(&self, name: &str) -> Option<(usize, &VendorEntry)> {
        let pos = *self.vendor_index.get(name)?;
        self.vendors.get(pos).map(|v| (pos, v))
    }

    fn vendor_node(&self, pos: usize) -> usize {
        self.businesses.len() + pos
    }

    fn to_csr(&self) -> CsrGraph {
        let business_nodes: HashMap<u64, usize> = self
            .businesses
            .keys()
            .enumerate()
            .map(|(i, id)| (*id, i))
            .collect();

        let edges: Vec<(usize, usize, f64)> = self
            .edges
            .iter()
            .filter_map(|((business_id, pos), edge)| {
                let src = *business_nodes.get(business_id)?;
                Some((src, self.vendor_node(*pos), edge.weight))
            })
            .collect();

        CsrGraph::from_weighted_edges(self.node_count(), &edges)
    }

    fn concentration(&self, vendor: &VendorEntry) -> f64 {
        if self.total_received > 0.0 {
            (vendor.total_received / self.total_received).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }

    fn business_edges(&self, business_id: u64) -> impl Iterator<Item = (usize, &EdgeEntry)> {
        self.edges
            .range((business_id, 0)..=(business_id, usize::MAX))
            .map(|((_, pos), edge)| (*pos, edge))
    }
}

#[derive(Debug)]
struct CentralityCache {
    generation: u64,
    result: Arc<CentralityResult>,
}

// ============================================================================
// Vendor Graph
// ============================================================================

/// Process-wide business → vendor money-flow graph.
#[derive(Debug, Default)]
pub struct VendorGraph {
    config: GraphConfig,
    state: RwLock<GraphState>,
    centrality: Mutex<Option<CentralityCache>>,
}

impl VendorGraph {
    /// Create an empty graph. Out-of-range settings fall back to defaults.
    #[must_use]
    pub fn new(config: GraphConfig) -> Self {
        Self {
            config: config.sanitized(),
            state: RwLock::new(GraphState::default()),
            centrality: Mutex::new(None),
        }
    }

    /// Configuration in effect.
    #[must_use]
    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, GraphState>> {
        self.state
            .read()
            .map_err(|_| GraphError::LockPoisoned("vendor graph"))
    }

    /// Record one payment from a business to a vendor.
    ///
    /// Creates missing nodes and the edge, otherwise accumulates weight and
    /// count. The whole update happens under one write lock.
    pub fn record(&self, business_id: u64, vendor_name: &str, amount: f64) -> Result<()> {
        if !amount.is_finite() {
            return Err(GraphError::NonFiniteAmount(amount));
        }

        let mut state = self
            .state
            .write()
            .map_err(|_| GraphError::LockPoisoned("vendor graph"))?;
        let state = &mut *state;

        state.businesses.entry(business_id).or_default();

        let pos = match state.vendor_index.get(vendor_name) {
            Some(pos) => *pos,
            None => {
                let pos = state.vendors.len();
                state.vendors.push(VendorEntry {
                    name: vendor_name.to_string(),
                    total_received: 0.0,
                    txn_count: 0,
                    in_degree: 0,
                });
                state.vendor_index.insert(vendor_name.to_string(), pos);
                pos
            }
        };

        let vendor = &mut state.vendors[pos];
        let edge = state.edges.entry((business_id, pos)).or_insert_with(|| {
            vendor.in_degree += 1;
            EdgeEntry::default()
        });
        edge.weight += amount;
        edge.txn_count += 1;

        vendor.total_received += amount;
        vendor.txn_count += 1;
        state.total_received += amount;
        state.generation += 1;

        tracing::trace!(
            business_id,
            vendor = vendor_name,
            amount,
            generation = state.generation,
            "Recorded payment"
        );

        Ok(())
    }

    /// Vendor risk score in `[0, 1]`; [`UNSEEN_VENDOR_SCORE`] for unknown vendors.
    pub fn vendor_risk_score(&self, vendor_name: &str) -> Result<f64> {
        let state = self.read()?;
        let Some((pos, vendor)) = state.vendor(vendor_name) else {
            return Ok(UNSEEN_VENDOR_SCORE);
        };

        let centrality = self.centrality_for(&state, vendor.in_degree > 1);
        Ok(self.score_vendor(&state, pos, vendor, centrality.as_deref()))
    }

    /// Structural collusion signal: distinct businesses paying this vendor.
    pub fn detect_collusion(&self, vendor_name: &str) -> Result<CollusionSignal> {
        let state = self.read()?;
        let shared = state.vendor(vendor_name).map_or(0, |(_, v)| v.in_degree);
        Ok(self.classify_collusion(shared))
    }

    /// Export the whole graph, or one business and the vendors it pays.
    ///
    /// Every vendor node carries a risk score computed from a single
    /// centrality run. An unknown business yields an empty snapshot.
    pub fn export_subgraph(&self, business_id: Option<u64>) -> Result<GraphSnapshot> {
        let state = self.read()?;

        let (businesses, vendor_positions): (Vec<u64>, Vec<usize>) = match business_id {
            Some(id) if !state.businesses.contains_key(&id) => {
                return Ok(GraphSnapshot::default());
            }
            Some(id) => (vec![id], state.business_edges(id).map(|(pos, _)| pos).collect()),
            None => (
                state.businesses.keys().copied().collect(),
                (0..state.vendors.len()).collect(),
            ),
        };

        let needs_centrality = vendor_positions
            .iter()
            .any(|pos| state.vendors[*pos].in_degree > 1);
        let centrality = self.centrality_for(&state, needs_centrality);

        let mut nodes = Vec::with_capacity(businesses.len() + vendor_positions.len());
        nodes.extend(businesses.iter().map(|id| SnapshotNode {
            id: business_node_id(*id),
            name: format!("Business #{}", id),
            kind: NodeKind::Business,
            business_id: Some(*id),
            risk_score: None,
            total_received: None,
            txn_count: None,
        }));
        nodes.extend(vendor_positions.iter().map(|pos| {
            let vendor = &state.vendors[*pos];
            SnapshotNode {
                id: vendor_node_id(&vendor.name),
                name: vendor.name.clone(),
                kind: NodeKind::Vendor,
                business_id: None,
                risk_score: Some(self.score_vendor(&state, *pos, vendor, centrality.as_deref())),
                total_received: Some(vendor.total_received),
                txn_count: Some(vendor.txn_count),
            }
        }));

        let view: &GraphState = &state;
        let links = businesses
            .iter()
            .flat_map(|&id| {
                view.business_edges(id).map(move |(pos, edge)| SnapshotEdge {
                    source: business_node_id(id),
                    target: vendor_node_id(&view.vendors[pos].name),
                    weight: edge.weight,
                    txn_count: edge.txn_count,
                })
            })
            .collect();

        Ok(GraphSnapshot {
            total_nodes: nodes.len(),
            nodes,
            links,
        })
    }

    /// Record the transaction, then score its vendor and check collusion.
    ///
    /// Raises `ctx.vendor_risk_score` when the fresh score is higher; never
    /// lowers it and writes no other field.
    pub fn analyze(
        &self,
        ctx: &mut TransactionContext,
        business_id: u64,
    ) -> Result<NetworkAnalysis> {
        let vendor = ctx.vendor_key().to_string();

        self.record(business_id, &vendor, ctx.amount)?;
        let vendor_risk_score = self.vendor_risk_score(&vendor)?;
        let collusion = self.detect_collusion(&vendor)?;

        if !ctx.vendor_risk_score.is_finite() || vendor_risk_score > ctx.vendor_risk_score {
            ctx.vendor_risk_score = vendor_risk_score;
        }

        let collusion_bonus = if collusion.detected { 0.4 } else { 0.0 };
        let network_score = round4((vendor_risk_score * 0.6 + collusion_bonus).clamp(0.0, 1.0));

        tracing::debug!(
            business_id,
            vendor = %vendor,
            vendor_risk_score,
            network_score,
            collusion = collusion.detected,
            shared_businesses = collusion.shared_businesses,
            "Network analysis complete"
        );

        Ok(NetworkAnalysis {
            vendor_risk_score,
            network_score,
            collusion,
        })
    }

    /// Graph size counters.
    pub fn stats(&self) -> Result<GraphStats> {
        let state = self.read()?;
        Ok(GraphStats {
            business_count: state.businesses.len(),
            vendor_count: state.vendors.len(),
            edge_count: state.edges.len(),
            total_volume: state.total_received,
        })
    }

    fn classify_collusion(&self, shared: usize) -> CollusionSignal {
        if shared >= COLLUSION_CRITICAL_PAYERS {
            CollusionSignal::detected(shared, Severity::Critical)
        } else if shared >= COLLUSION_HIGH_PAYERS {
            CollusionSignal::detected(shared, Severity::High)
        } else {
            CollusionSignal::none(shared)
        }
    }

    fn score_vendor(
        &self,
        state: &GraphState,
        pos: usize,
        vendor: &VendorEntry,
        centrality: Option<&CentralityResult>,
    ) -> f64 {
        let concentration = state.concentration(vendor);

        let score = if vendor.in_degree <= 1 {
            concentration * 1.5
        } else {
            let centrality_norm =
                centrality.map_or(0.0, |c| c.normalized(state.vendor_node(pos)));
            let payers = (vendor.in_degree as f64 / 10.0).min(1.0);
            (0.3 * centrality_norm + 0.4 * concentration + 0.3 * payers) * 2.5
        };

        round4(score.clamp(0.0, 1.0))
    }

    /// Cached PageRank for the current generation, if wanted and meaningful.
    fn centrality_for(&self, state: &GraphState, wanted: bool) -> Option<Arc<CentralityResult>> {
        if !wanted || state.node_count() < MIN_NODES_FOR_CENTRALITY {
            return None;
        }

        // The cache is derived data; a poisoned guard still holds a usable value.
        let mut cache = self
            .centrality
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        if let Some(cached) = cache.as_ref().filter(|c| c.generation == state.generation) {
            return Some(Arc::clone(&cached.result));
        }

        let result = Arc::new(PageRank::run_to_convergence(
            &state.to_csr(),
            &self.config.pagerank,
        ));
        tracing::debug!(
            generation = state.generation,
            nodes = state.node_count(),
            iterations = result.iterations,
            "Recomputed vendor centrality"
        );

        *cache = Some(CentralityCache {
            generation: state.generation,
            result: Arc::clone(&result),
        });
        Some(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use rand::seq::SliceRandom;

    #[test]
    fn test_new_sanitizes_config() {
        let config = GraphConfig {
            pagerank: PageRankConfig {
                damping: -3.0,
                max_iterations: 0,
                tolerance: 0.0,
            },
        };
        let graph = VendorGraph::new(config);
        assert_eq!(graph.config(), &GraphConfig::default());

        // A single payer never trips collusion, whatever the configuration
        graph.record(1, "Fresh Vendor", 500.0).unwrap();
        assert!(!graph.detect_collusion("Fresh Vendor").unwrap().detected);
    }

    #[test]
    fn test_unseen_vendor_score() {
        let graph = VendorGraph::default();
        assert_eq!(graph.vendor_risk_score("Nobody").unwrap(), 0.05);

        graph.record(1, "Acme", 100.0).unwrap();
        assert_eq!(graph.vendor_risk_score("acme").unwrap(), 0.05);
    }

    #[test]
    fn test_record_accumulates_edge() {
        let graph = VendorGraph::default();
        graph.record(1, "Acme", 100.0).unwrap();
        graph.record(1, "Acme", 250.0).unwrap();

        let snapshot = graph.export_subgraph(None).unwrap();
        assert_eq!(snapshot.total_nodes, 2);
        assert_eq!(snapshot.links.len(), 1);
        assert_eq!(snapshot.links[0].weight, 350.0);
        assert_eq!(snapshot.links[0].txn_count, 2);

        let vendor = snapshot.node("vendor_Acme").unwrap();
        assert_eq!(vendor.total_received, Some(350.0));
        assert_eq!(vendor.txn_count, Some(2));
    }

    #[test]
    fn test_single_payer_concentration() {
        let graph = VendorGraph::default();
        graph.record(1, "Drain Co", 800.0).unwrap();
        graph.record(2, "Small Co", 200.0).unwrap();

        assert_eq!(graph.vendor_risk_score("Drain Co").unwrap(), 1.0);
        assert_eq!(graph.vendor_risk_score("Small Co").unwrap(), 0.3);
    }

    #[test]
    fn test_multi_payer_blend() {
        let graph = VendorGraph::default();
        graph.record(1, "Shared", 100.0).unwrap();
        graph.record(2, "Shared", 100.0).unwrap();
        for b in 3..=6 {
            graph.record(b, "Big", 5_000.0).unwrap();
        }

        let score = graph.vendor_risk_score("Shared").unwrap();

        let state = graph.read().unwrap();
        let (pos, vendor) = state.vendor("Shared").unwrap();
        let centrality = graph.centrality_for(&state, true).unwrap();
        let pr = centrality.normalized(state.vendor_node(pos));
        let concentration = 200.0 / 20_200.0;
        let expected = round4(((0.3 * pr + 0.4 * concentration + 0.3 * 0.2) * 2.5).min(1.0));

        assert_eq!(vendor.in_degree, 2);
        assert!(pr > 0.0 && pr < 1.0);
        assert_eq!(score, expected);
    }

    #[test]
    fn test_collusion_bands() {
        let graph = VendorGraph::default();
        assert!(!graph.detect_collusion("Hub").unwrap().detected);

        for b in 1..=12u64 {
            graph.record(b, "Hub", 10.0).unwrap();
            let signal = graph.detect_collusion("Hub").unwrap();
            assert_eq!(signal.shared_businesses, b as usize);
            match b {
                0..=4 => assert!(!signal.detected),
                5..=9 => {
                    assert!(signal.detected);
                    assert_eq!(signal.severity, Severity::High);
                }
                _ => {
                    assert!(signal.detected);
                    assert_eq!(signal.severity, Severity::Critical);
                }
            }
        }
    }

    #[test]
    fn test_repeat_payer_is_not_collusion() {
        let graph = VendorGraph::default();
        for _ in 0..20 {
            graph.record(1, "Hub", 10.0).unwrap();
        }
        let signal = graph.detect_collusion("Hub").unwrap();
        assert_eq!(signal.shared_businesses, 1);
        assert!(!signal.detected);
    }

    #[test]
    fn test_ten_businesses_is_critical() {
        let graph = VendorGraph::default();
        for b in 0..10 {
            graph.record(b, "Hub", 1_000.0).unwrap();
        }

        let signal = graph.detect_collusion("Hub").unwrap();
        assert_eq!(
            signal,
            CollusionSignal {
                detected: true,
                shared_businesses: 10,
                severity: Severity::Critical,
                message: "Vendor receiving payments from 10 businesses".to_string(),
            }
        );
    }

    #[test]
    fn test_record_order_independent() {
        let mut events: Vec<(u64, &str, f64)> = Vec::new();
        for i in 0..60u64 {
            let vendor = ["Acme", "Globex", "Initech", "Umbrella"][(i % 4) as usize];
            events.push((i % 7, vendor, (i * 37 % 500) as f64 + 1.0));
        }

        let summarize = |events: &[(u64, &str, f64)]| {
            let graph = VendorGraph::default();
            for (b, v, a) in events {
                graph.record(*b, v, *a).unwrap();
            }
            let snapshot = graph.export_subgraph(None).unwrap();
            let edges: BTreeMap<(String, String), (f64, u64)> = snapshot
                .links
                .iter()
                .map(|e| ((e.source.clone(), e.target.clone()), (e.weight, e.txn_count)))
                .collect();
            let totals: BTreeMap<String, (Option<f64>, Option<u64>)> = snapshot
                .nodes
                .iter()
                .map(|n| (n.id.clone(), (n.total_received, n.txn_count)))
                .collect();
            (edges, totals)
        };

        let baseline = summarize(&events);
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..5 {
            events.shuffle(&mut rng);
            assert_eq!(summarize(&events), baseline);
        }
    }

    #[test]
    fn test_concurrent_records() {
        let graph = VendorGraph::default();

        std::thread::scope(|s| {
            for t in 0..8u64 {
                let graph = &graph;
                s.spawn(move || {
                    for i in 0..100u64 {
                        graph.record(t, "Shared", 10.0).unwrap();
                        graph.record(t, &format!("Own-{}", t), (i + 1) as f64).unwrap();
                        let _ = graph.vendor_risk_score("Shared").unwrap();
                    }
                });
            }
        });

        let stats = graph.stats().unwrap();
        assert_eq!(stats.business_count, 8);
        assert_eq!(stats.vendor_count, 9);
        assert_eq!(stats.edge_count, 16);
        assert_eq!(stats.total_volume, 8.0 * (1_000.0 + 5_050.0));

        let snapshot = graph.export_subgraph(Some(3)).unwrap();
        let shared = snapshot
            .links
            .iter()
            .find(|e| e.target == "vendor_Shared")
            .unwrap();
        assert_eq!((shared.weight, shared.txn_count), (1_000.0, 100));
    }

    #[test]
    fn test_export_business_subgraph() {
        let graph = VendorGraph::default();
        graph.record(1, "Acme", 100.0).unwrap();
        graph.record(1, "Globex", 300.0).unwrap();
        graph.record(2, "Acme", 50.0).unwrap();
        graph.record(2, "Initech", 75.0).unwrap();

        let snapshot = graph.export_subgraph(Some(1)).unwrap();
        assert_eq!(snapshot.total_nodes, 3);
        assert_eq!(snapshot.links.len(), 2);
        assert!(snapshot.node("vendor_Initech").is_none());
        assert!(snapshot.links.iter().all(|e| e.source == "biz_1"));

        let business = snapshot.node("biz_1").unwrap();
        assert_eq!(business.name, "Business #1");
        assert_eq!(business.kind, NodeKind::Business);
        assert!(business.risk_score.is_none());

        for vendor in snapshot.nodes.iter().filter(|n| n.kind == NodeKind::Vendor) {
            let expected = graph.vendor_risk_score(&vendor.name).unwrap();
            assert_eq!(vendor.risk_score, Some(expected));
        }

        assert!(graph.export_subgraph(Some(99)).unwrap().is_empty());
        assert_eq!(graph.export_subgraph(None).unwrap().total_nodes, 5);
    }

    #[test]
    fn test_analyze_feeds_back_vendor_risk() {
        let graph = VendorGraph::default();
        let mut ctx = TransactionContext::new(5_000.0, "Solo");

        let analysis = graph.analyze(&mut ctx, 1).unwrap();
        assert_eq!(analysis.vendor_risk_score, 1.0);
        assert_eq!(analysis.network_score, 0.6);
        assert!(!analysis.collusion.detected);
        assert_eq!(ctx.vendor_risk_score, 1.0);

        // Never lowered
        let mut ctx = TransactionContext::new(1.0, "Other");
        ctx.vendor_risk_score = 0.99;
        let analysis = graph.analyze(&mut ctx, 2).unwrap();
        assert!(analysis.vendor_risk_score < 0.99);
        assert_eq!(ctx.vendor_risk_score, 0.99);
    }

    #[test]
    fn test_analyze_collusion_bonus() {
        let graph = VendorGraph::default();
        for b in 0..4 {
            graph.record(b, "Hub", 100.0).unwrap();
        }
        let mut ctx = TransactionContext::new(100.0, "Hub");
        let analysis = graph.analyze(&mut ctx, 4).unwrap();

        assert!(analysis.collusion.detected);
        assert_eq!(
            analysis.network_score,
            round4(analysis.vendor_risk_score * 0.6 + 0.4)
        );
    }

    #[test]
    fn test_analyze_unknown_vendor_key() {
        let graph = VendorGraph::default();
        let mut ctx = TransactionContext::new(10.0, "");
        graph.analyze(&mut ctx, 1).unwrap();
        assert!(graph.export_subgraph(None).unwrap().node("vendor_unknown").is_some());
    }

    #[test]
    fn test_non_finite_amount_rejected() {
        let graph = VendorGraph::default();
        let err = graph.record(1, "Acme", f64::INFINITY).unwrap_err();
        assert!(matches!(err, GraphError::NonFiniteAmount(_)));
        assert_eq!(graph.stats().unwrap(), GraphStats::default());
    }

    #[test]
    fn test_centrality_cached_per_generation() {
        let graph = VendorGraph::default();
        graph.record(1, "Hub", 100.0).unwrap();
        graph.record(2, "Hub", 100.0).unwrap();
        graph.vendor_risk_score("Hub").unwrap();

        let cached_generation = |graph: &VendorGraph| {
            graph
                .centrality
                .lock()
                .unwrap()
                .as_ref()
                .map(|c| c.generation)
        };
        assert_eq!(cached_generation(&graph), Some(2));

        graph.record(3, "Hub", 100.0).unwrap();
        assert_eq!(cached_generation(&graph), Some(2));
        graph.vendor_risk_score("Hub").unwrap();
        assert_eq!(cached_generation(&graph), Some(3));
    }
}
