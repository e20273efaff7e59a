//! The verdict model: fusion weights, thresholds and the immutable
//! [`Verdict`] record.

use fraudkernel_core::round4;
use fraudkernel_rules::{FlagResult, RuleEvaluation};
use serde::{Deserialize, Serialize};

// ============================================================================
// Fusion Constants
// ============================================================================

/// Weight of the classifier confidence.
pub const WEIGHT_ML: f64 = 0.50;
/// Weight of the rule score.
pub const WEIGHT_RULES: f64 = 0.35;
/// Weight of the network score.
pub const WEIGHT_NETWORK: f64 = 0.15;

/// Final score at or above which a transaction is fraud.
pub const FRAUD_THRESHOLD: f64 = 0.45;
/// Final score at or above which a transaction goes to human review.
pub const REVIEW_THRESHOLD: f64 = 0.30;
/// Floor applied to the final score on a critical rule hit.
pub const CRITICAL_FLOOR: f64 = 0.75;

/// Weighted composite of the three layers, floored on a critical hit,
/// clamped to `[0, 1]` and rounded to 4 dp.
#[must_use]
pub fn composite_score(
    ml_confidence: f64,
    rule_score: f64,
    network_score: f64,
    critical_hit: bool,
) -> f64 {
    let weighted =
        WEIGHT_ML * ml_confidence + WEIGHT_RULES * rule_score + WEIGHT_NETWORK * network_score;
    let weighted = if weighted.is_finite() { weighted } else { 0.0 };

    let floored = if critical_hit {
        weighted.max(CRITICAL_FLOOR)
    } else {
        weighted
    };

    round4(floored.clamp(0.0, 1.0))
}

// ============================================================================
// Enumerations
// ============================================================================

/// Risk band of a verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    /// Below 0.35.
    Low,
    /// 0.35 and above.
    Medium,
    /// 0.60 and above.
    High,
    /// 0.80 and above, or any critical rule hit.
    Critical,
}

impl RiskLevel {
    /// Band for a final score.
    #[must_use]
    pub fn from_score(final_score: f64, critical_hit: bool) -> Self {
        if critical_hit || final_score >= 0.80 {
            RiskLevel::Critical
        } else if final_score >= 0.60 {
            RiskLevel::High
        } else if final_score >= 0.35 {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }

    /// Returns the level name as a string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::Critical => "critical",
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Layer credited with a verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerdictSource {
    /// The classifier dominated, or nothing contributed.
    Ml,
    /// A critical rule decided.
    Rules,
    /// Rules contributed alongside the other layers.
    Combined,
}

impl VerdictSource {
    /// Attribute a verdict to a layer.
    ///
    /// With no signal from any layer this is still `Ml`.
    #[must_use]
    pub fn decide(critical_hit: bool, ml_confidence: f64, rule_score: f64) -> Self {
        if critical_hit {
            VerdictSource::Rules
        } else if ml_confidence > 0.0 && ml_confidence > rule_score {
            VerdictSource::Ml
        } else if rule_score > 0.0 {
            VerdictSource::Combined
        } else {
            VerdictSource::Ml
        }
    }
}

/// Human review queue status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    /// Waiting for a reviewer.
    PendingReview,
    /// No review needed.
    AutoCleared,
}

impl ReviewStatus {
    /// Returns the status name as a string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            ReviewStatus::PendingReview => "pending_review",
            ReviewStatus::AutoCleared => "auto_cleared",
        }
    }
}

// ============================================================================
// Verdict
// ============================================================================

/// Raw signals collected by the pipeline for one transaction.
#[derive(Debug, Clone, Default)]
pub struct LayerSignals {
    /// Classifier probability; 0 when unavailable.
    pub ml_confidence: f64,
    /// Rule engine result.
    pub rules: RuleEvaluation,
    /// Network score; 0 when the network layer failed.
    pub network_score: f64,
    /// Flags synthesized outside the rule engine (collusion).
    pub extra_flags: Vec<FlagResult>,
    /// Explainer reasons.
    pub reasons: Vec<String>,
}

/// Final fused fraud decision for one transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    /// Fraud decision.
    pub is_fraud: bool,
    /// Risk band.
    pub risk_level: RiskLevel,
    /// Classifier probability.
    pub confidence: f64,
    /// Rule score.
    pub rule_score: f64,
    /// Network score.
    pub network_score: f64,
    /// Weighted composite.
    pub final_score: f64,
    /// Triggered rule flags, then synthesized flags.
    pub flags: Vec<FlagResult>,
    /// Explainer reasons.
    pub shap_reasons: Vec<String>,
    /// Any rule fired at its highest tier.
    pub critical_hit: bool,
    /// Route to human review.
    pub review_required: bool,
    /// Layer credited with the decision.
    pub verdict_source: VerdictSource,
}

impl Verdict {
    /// Fuse layer signals under the fixed weights and overrides.
    #[must_use]
    pub fn fuse(signals: LayerSignals) -> Self {
        let LayerSignals {
            ml_confidence,
            rules,
            network_score,
            extra_flags,
            reasons,
        } = signals;

        let ml_confidence = unit(ml_confidence);
        let network_score = unit(network_score);
        let rule_score = unit(rules.rule_score);
        let critical_hit = rules.critical_hit;

        let final_score = composite_score(ml_confidence, rule_score, network_score, critical_hit);

        let mut flags = rules.flags;
        flags.extend(extra_flags);

        Self {
            is_fraud: final_score >= FRAUD_THRESHOLD || critical_hit,
            risk_level: RiskLevel::from_score(final_score, critical_hit),
            confidence: round4(ml_confidence),
            rule_score: round4(rule_score),
            network_score: round4(network_score),
            final_score,
            flags,
            shap_reasons: reasons,
            critical_hit,
            review_required: final_score >= REVIEW_THRESHOLD,
            verdict_source: VerdictSource::decide(critical_hit, ml_confidence, rule_score),
        }
    }

    /// Review queue status.
    #[must_use]
    pub fn review_status(&self) -> ReviewStatus {
        if self.review_required {
            ReviewStatus::PendingReview
        } else {
            ReviewStatus::AutoCleared
        }
    }

    /// Messages of all flags, in order.
    #[must_use]
    pub fn flag_messages(&self) -> Vec<&str> {
        self.flags.iter().map(|f| f.message.as_str()).collect()
    }
}

fn unit(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.0
    }
}
