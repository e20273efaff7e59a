//! Verdict orchestrator.
//!
//! `VerdictEngine` threads one working [`TransactionContext`] through the
//! pipeline stages and fuses their signals into a [`Verdict`]:
//!
//! 1. seed `business_avg_amount`
//! 2. rules (read-only)
//! 3. classifier, behind a circuit breaker
//! 4. explainer, only when the classifier answered
//! 5. network layer (may raise `vendor_risk_score`)
//! 6. fuse
//!
//! Every external or shared layer is isolated: an error or a panic degrades
//! that layer to its fallback and the verdict is still produced.
//!
//! # Example
//!
//! ```rust,ignore
//! use fraudkernel_verdict::prelude::*;
//!
//! let engine = VerdictEngine::new(EngineConfig::from_env())
//!     .with_classifier(model)
//!     .with_explainer(AttributionExplainer::new(shap));
//!
//! let verdict = engine.analyze(&mut ctx, business_id, business_avg);
//! ```

use crate::collaborators::{Classifier, Explainer};
use crate::config::EngineConfig;
use crate::features::FeatureVector;
use crate::verdict::{LayerSignals, Verdict};
use fraudkernel_core::error::{FraudError, Result};
use fraudkernel_core::resilience::CircuitBreaker;
use fraudkernel_graph::{NetworkAnalysis, VendorGraph};
use fraudkernel_rules::{FlagResult, RuleEngine, Severity, TransactionContext};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use uuid::Uuid;

/// Rule id of the synthesized collusion flag.
pub const COLLUSION_RULE_ID: &str = "NET1";

/// Score delta of the synthesized collusion flag.
pub const COLLUSION_DELTA: f64 = 0.25;

// ============================================================================
// Verdict Engine
// ============================================================================

/// Per-transaction decision pipeline over a shared vendor graph.
pub struct VerdictEngine {
    config: EngineConfig,
    rules: RuleEngine,
    graph: Arc<VendorGraph>,
    classifier: Option<Box<dyn Classifier>>,
    explainer: Option<Box<dyn Explainer>>,
    classifier_breaker: CircuitBreaker,
}

impl std::fmt::Debug for VerdictEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VerdictEngine")
            .field("config", &self.config)
            .field("has_classifier", &self.classifier.is_some())
            .field("has_explainer", &self.explainer.is_some())
            .field("classifier_breaker", &self.classifier_breaker.state())
            .finish_non_exhaustive()
    }
}

impl Default for VerdictEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl VerdictEngine {
    /// Create an engine with its own empty vendor graph and no collaborators.
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        let rules = RuleEngine::new(config.rules.clone());
        let graph = Arc::new(VendorGraph::new(config.graph.clone()));
        let classifier_breaker =
            CircuitBreaker::new("classifier", config.classifier_breaker.clone());

        Self {
            config,
            rules,
            graph,
            classifier: None,
            explainer: None,
            classifier_breaker,
        }
    }

    /// Share an existing vendor graph.
    #[must_use]
    pub fn with_graph(mut self, graph: Arc<VendorGraph>) -> Self {
        self.graph = graph;
        self
    }

    /// Attach the statistical classifier.
    #[must_use]
    pub fn with_classifier(mut self, classifier: impl Classifier + 'static) -> Self {
        self.classifier = Some(Box::new(classifier));
        self
    }

    /// Attach the explainer.
    #[must_use]
    pub fn with_explainer(mut self, explainer: impl Explainer + 'static) -> Self {
        self.explainer = Some(Box::new(explainer));
        self
    }

    /// Configuration in effect.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The rule engine.
    #[must_use]
    pub fn rules(&self) -> &RuleEngine {
        &self.rules
    }

    /// The shared vendor graph.
    #[must_use]
    pub fn graph(&self) -> &Arc<VendorGraph> {
        &self.graph
    }

    /// Breaker guarding the classifier.
    #[must_use]
    pub fn classifier_breaker(&self) -> &CircuitBreaker {
        &self.classifier_breaker
    }

    /// Run the full pipeline for one transaction.
    ///
    /// Always returns a verdict. `ctx` is the working context: this call may
    /// set `business_avg_amount` and raise `vendor_risk_score`.
    pub fn analyze(
        &self,
        ctx: &mut TransactionContext,
        business_id: u64,
        business_avg_amount: f64,
    ) -> Verdict {
        let span = tracing::info_span!(
            "verdict",
            request_id = %Uuid::new_v4(),
            business_id
        );
        let _guard = span.enter();

        // Seed
        if business_avg_amount.is_finite() && business_avg_amount > 0.0 {
            ctx.business_avg_amount = Some(business_avg_amount);
        }

        // Rules
        let rules = self.rules.evaluate(ctx);

        // Classifier and explainer
        let features = FeatureVector::from_context(ctx, self.rules.thresholds());
        let ml_confidence = self.classify(&features);
        let reasons = match ml_confidence {
            Some(_) => self.explain(&features),
            None => Vec::new(),
        };

        // Network
        let (network_score, extra_flags) = match self.network(ctx, business_id) {
            Some(analysis) => {
                let flags: Vec<FlagResult> = collusion_flag(&analysis).into_iter().collect();
                (analysis.network_score, flags)
            }
            None => (0.0, Vec::new()),
        };

        let verdict = Verdict::fuse(LayerSignals {
            ml_confidence: ml_confidence.unwrap_or(0.0),
            rules,
            network_score,
            extra_flags,
            reasons,
        });

        tracing::info!(
            vendor = ctx.vendor_key(),
            amount = ctx.amount,
            is_fraud = verdict.is_fraud,
            risk_level = %verdict.risk_level,
            final_score = verdict.final_score,
            flags = verdict.flags.len(),
            "Verdict"
        );

        verdict
    }

    /// Analyze loosely typed rows in order for one business.
    pub fn analyze_batch(
        &self,
        rows: &[Value],
        business_id: u64,
        business_avg_amount: f64,
    ) -> BatchReport {
        let results: Vec<BatchRow> = rows
            .iter()
            .enumerate()
            .map(|(row, record)| {
                let mut ctx = TransactionContext::from_json(record);
                let verdict = self.analyze(&mut ctx, business_id, business_avg_amount);
                BatchRow {
                    row,
                    vendor: ctx.vendor_key().to_string(),
                    amount: ctx.amount,
                    verdict,
                }
            })
            .collect();

        let report = BatchReport {
            total: results.len(),
            fraud_count: results.iter().filter(|r| r.verdict.is_fraud).count(),
            results,
        };

        tracing::info!(
            business_id,
            total = report.total,
            fraud_count = report.fraud_count,
            risk_percent = report.risk_percent(),
            "Batch analyzed"
        );

        report
    }

    /// Classifier probability, or `None` when the layer is unavailable.
    fn classify(&self, features: &FeatureVector) -> Option<f64> {
        let Some(classifier) = self.classifier.as_deref() else {
            tracing::debug!("No classifier attached, confidence 0");
            return None;
        };

        let outcome = self.classifier_breaker.call(|| {
            let probability = isolated(
                || classifier.predict(features),
                |m| FraudError::classifier(m),
            )?;
            if probability.is_finite() {
                Ok(probability.clamp(0.0, 1.0))
            } else {
                Err(FraudError::classifier(format!(
                    "non-finite probability {}",
                    probability
                )))
            }
        });

        match outcome {
            Ok(probability) => {
                tracing::debug!(probability, "Classifier answered");
                Some(probability)
            }
            Err(error) => {
                tracing::warn!(%error, "Classifier unavailable, confidence 0");
                None
            }
        }
    }

    /// Explainer reasons, or an empty list when the layer is unavailable.
    fn explain(&self, features: &FeatureVector) -> Vec<String> {
        let Some(explainer) = self.explainer.as_deref() else {
            return Vec::new();
        };

        let top_n = self.config.explainer.top_n;
        match isolated(|| explainer.explain(features, top_n), |m| FraudError::explainer(m)) {
            Ok(mut reasons) => {
                reasons.truncate(top_n);
                reasons
            }
            Err(error) => {
                tracing::warn!(%error, "Explainer unavailable, no reasons");
                Vec::new()
            }
        }
    }

    /// Network analysis, or `None` when the layer failed.
    fn network(&self, ctx: &mut TransactionContext, business_id: u64) -> Option<NetworkAnalysis> {
        let outcome = isolated(
            || {
                self.graph
                    .analyze(ctx, business_id)
                    .map_err(|e| FraudError::network(e.to_string()))
            },
            |m| FraudError::network(m),
        );

        match outcome {
            Ok(analysis) => Some(analysis),
            Err(error) => {
                tracing::warn!(%error, "Network layer failed, network score 0");
                None
            }
        }
    }
}

/// `NET1` flag for a detected collusion signal.
fn collusion_flag(analysis: &NetworkAnalysis) -> Option<FlagResult> {
    if !analysis.collusion.detected {
        return None;
    }

    let message = if analysis.collusion.message.is_empty() {
        "Collusion pattern detected".to_string()
    } else {
        analysis.collusion.message.clone()
    };

    Some(FlagResult::flag(
        COLLUSION_RULE_ID,
        Severity::High,
        message,
        COLLUSION_DELTA,
    ))
}

/// Run `f`, turning a panic into the layer's error.
fn isolated<T>(
    f: impl FnOnce() -> Result<T>,
    on_panic: impl FnOnce(String) -> FraudError,
) -> Result<T> {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(payload) => Err(on_panic(panic_message(payload.as_ref()))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("panicked: {}", message)
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("panicked: {}", message)
    } else {
        "panicked".to_string()
    }
}

// ============================================================================
// Batch Analysis
// ============================================================================

/// One analyzed row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchRow {
    /// Zero-based position in the input.
    pub row: usize,
    /// Vendor name as analyzed.
    pub vendor: String,
    /// Amount as analyzed.
    pub amount: f64,
    /// The verdict.
    pub verdict: Verdict,
}

/// Result of [`VerdictEngine::analyze_batch`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BatchReport {
    /// Rows analyzed.
    pub total: usize,
    /// Rows judged fraudulent.
    pub fraud_count: usize,
    /// Per-row results, in input order.
    pub results: Vec<BatchRow>,
}

impl BatchReport {
    /// Share of fraudulent rows as a percentage, 2 dp; 0 for an empty batch.
    #[must_use]
    pub fn risk_percent(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        let percent = self.fraud_count as f64 / self.total as f64 * 100.0;
        (percent * 100.0).round() / 100.0
    }

    /// Rows routed to human review.
    #[must_use]
    pub fn pending_review(&self) -> usize {
        self.results
            .iter()
            .filter(|r| r.verdict.review_required)
            .count()
    }
}

/// Mean of a business's prior non-zero amounts; 0 when there are none.
#[must_use]
pub fn business_average(amounts: &[f64]) -> f64 {
    let (sum, count) = amounts
        .iter()
        .filter(|a| a.is_finite() && **a != 0.0)
        .fold((0.0, 0usize), |(sum, count), a| (sum + a, count + 1));

    if count == 0 { 0.0 } else { sum / count as f64 }
}
