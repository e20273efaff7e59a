//! Rule catalog and engine.
//!
//! Rules are tagged variants behind one `evaluate` interface and are run
//! from the `CATALOG` table in a fixed order. A rule reads the context and
//! thresholds and nothing else.

use crate::context::TransactionContext;
use crate::thresholds::RuleThresholds;
use crate::types::{FlagResult, RuleEvaluation, Severity, format_amount};
use serde::{Deserialize, Serialize};

// ============================================================================
// Rule Catalog
// ============================================================================

/// One entry of the threshold rule catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Rule {
    /// R1: absolute amount and ratio to the business average.
    LargeTransaction,
    /// R2: transactions in the last hour.
    VelocityHour,
    /// R3: transactions in the last 24 hours.
    VelocityDay,
    /// R4: vendor and/or origin country on the denylist.
    HighRiskCountry,
    /// R5: origin country differs from vendor country.
    CountryMismatch,
    /// R6: after-hours window and crypto payments.
    AfterHoursCrypto,
    /// R7: round amount, worse when paid to a new vendor.
    RoundAmountNewVendor,
    /// R8: vendor risk score band.
    VendorRiskScore,
}

/// The catalog, in evaluation order.
pub const CATALOG: [Rule; 8] = [
    Rule::LargeTransaction,
    Rule::VelocityHour,
    Rule::VelocityDay,
    Rule::HighRiskCountry,
    Rule::CountryMismatch,
    Rule::AfterHoursCrypto,
    Rule::RoundAmountNewVendor,
    Rule::VendorRiskScore,
];

impl Rule {
    /// Stable rule identifier.
    #[must_use]
    pub const fn id(&self) -> &'static str {
        match self {
            Rule::LargeTransaction => "R1",
            Rule::VelocityHour => "R2",
            Rule::VelocityDay => "R3",
            Rule::HighRiskCountry => "R4",
            Rule::CountryMismatch => "R5",
            Rule::AfterHoursCrypto => "R6",
            Rule::RoundAmountNewVendor => "R7",
            Rule::VendorRiskScore => "R8",
        }
    }

    /// Short description for catalogs and CLIs.
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Rule::LargeTransaction => "Amount above threshold or spike against business average",
            Rule::VelocityHour => "Too many transactions in the past hour",
            Rule::VelocityDay => "Too many transactions in the past 24 hours",
            Rule::HighRiskCountry => "Vendor or origin in a high-risk jurisdiction",
            Rule::CountryMismatch => "Origin country differs from vendor country",
            Rule::AfterHoursCrypto => "Crypto payment and/or after-hours activity",
            Rule::RoundAmountNewVendor => "Suspiciously round amount, worse to a new vendor",
            Rule::VendorRiskScore => "Vendor risk score band",
        }
    }

    /// Evaluate this rule. Total: never panics, never fails.
    #[must_use]
    pub fn evaluate(&self, ctx: &TransactionContext, t: &RuleThresholds) -> FlagResult {
        match self {
            Rule::LargeTransaction => Self::check_large_transaction(ctx, t),
            Rule::VelocityHour => Self::check_velocity_hour(ctx, t),
            Rule::VelocityDay => Self::check_velocity_day(ctx, t),
            Rule::HighRiskCountry => Self::check_high_risk_country(ctx, t),
            Rule::CountryMismatch => Self::check_country_mismatch(ctx),
            Rule::AfterHoursCrypto => Self::check_after_hours_crypto(ctx, t),
            Rule::RoundAmountNewVendor => Self::check_round_amount(ctx, t),
            Rule::VendorRiskScore => Self::check_vendor_risk(ctx, t),
        }
    }

    fn check_large_transaction(ctx: &TransactionContext, t: &RuleThresholds) -> FlagResult {
        let amount = finite_or_zero(ctx.amount);
        let limit = t.large_txn_threshold;
        let ratio = ctx.amount_vs_avg_ratio();

        if amount >= limit * 5.0 {
            FlagResult::flag(
                "R1",
                Severity::Critical,
                format!("Amount ${} is 5x+ above threshold", format_amount(amount)),
                0.35,
            )
        } else if amount >= limit {
            FlagResult::flag(
                "R1",
                Severity::High,
                format!(
                    "Amount ${} exceeds ${} threshold",
                    format_amount(amount),
                    format_amount(limit)
                ),
                0.20,
            )
        } else if ratio.is_finite() && ratio >= t.ratio_spike {
            FlagResult::flag(
                "R1",
                Severity::Medium,
                format!("Amount is {:.1}x business average", ratio),
                0.12,
            )
        } else {
            FlagResult::clear("R1")
        }
    }

    fn check_velocity_hour(ctx: &TransactionContext, t: &RuleThresholds) -> FlagResult {
        let count = ctx.num_txns_last_1h;
        let limit = t.velocity_1h_limit;
        let message = format!("{} transactions in past hour (limit: {})", count, limit);

        if count >= limit.saturating_mul(2) {
            FlagResult::flag("R2", Severity::Critical, message, 0.30)
        } else if count >= limit {
            FlagResult::flag("R2", Severity::High, message, 0.18)
        } else {
            FlagResult::clear("R2")
        }
    }

    fn check_velocity_day(ctx: &TransactionContext, t: &RuleThresholds) -> FlagResult {
        let count = ctx.num_txns_last_24h;
        let limit = t.velocity_24h_limit;

        if count >= limit {
            FlagResult::flag(
                "R3",
                Severity::Medium,
                format!("{} transactions in past 24h (limit: {})", count, limit),
                0.10,
            )
        } else {
            FlagResult::clear("R3")
        }
    }

    fn check_high_risk_country(ctx: &TransactionContext, t: &RuleThresholds) -> FlagResult {
        let vendor = ctx.vendor_country.as_str();
        let origin = ctx.origin_country.as_str();

        match (t.is_high_risk_country(vendor), t.is_high_risk_country(origin)) {
            (true, true) => FlagResult::flag(
                "R4",
                Severity::Critical,
                format!(
                    "Both vendor ({}) and origin ({}) in high-risk country",
                    vendor, origin
                ),
                0.35,
            ),
            (true, false) => FlagResult::flag(
                "R4",
                Severity::High,
                format!("Vendor in high-risk country: {}", vendor),
                0.22,
            ),
            (false, true) => FlagResult::flag(
                "R4",
                Severity::Medium,
                format!("Request origin in high-risk country: {}", origin),
                0.12,
            ),
            (false, false) => FlagResult::clear("R4"),
        }
    }

    fn check_country_mismatch(ctx: &TransactionContext) -> FlagResult {
        let vendor = ctx.vendor_country.as_str();
        let origin = ctx.origin_country.as_str();

        if !vendor.is_empty() && !origin.is_empty() && vendor != origin {
            FlagResult::flag(
                "R5",
                Severity::Medium,
                format!("Country mismatch: origin={} vs vendor={}", origin, vendor),
                0.10,
            )
        } else {
            FlagResult::clear("R5")
        }
    }

    fn check_after_hours_crypto(ctx: &TransactionContext, t: &RuleThresholds) -> FlagResult {
        let hour = ctx.resolved_hour();
        let after_hours = t.is_after_hours(hour);

        match (ctx.is_crypto(), after_hours) {
            (true, true) => FlagResult::flag(
                "R6",
                Severity::High,
                format!("Crypto payment at {:02}:00 (after hours)", hour),
                0.25,
            ),
            (true, false) => {
                FlagResult::flag("R6", Severity::Low, "Cryptocurrency payment detected", 0.05)
            }
            (false, true) => FlagResult::flag(
                "R6",
                Severity::Low,
                format!("Transaction at {:02}:00 (after hours)", hour),
                0.03,
            ),
            (false, false) => FlagResult::clear("R6"),
        }
    }

    fn check_round_amount(ctx: &TransactionContext, t: &RuleThresholds) -> FlagResult {
        let amount = finite_or_zero(ctx.amount);
        let is_round =
            amount >= t.round_amount_min && (amount % 1000.0 < 1.0 || amount % 500.0 < 1.0);

        match (is_round, ctx.is_new_vendor) {
            (true, true) => FlagResult::flag(
                "R7",
                Severity::High,
                format!("Round amount ${} to new/unknown vendor", format_amount(amount)),
                0.22,
            ),
            (true, false) => FlagResult::flag(
                "R7",
                Severity::Low,
                format!("Round amount: ${}", format_amount(amount)),
                0.04,
            ),
            _ => FlagResult::clear("R7"),
        }
    }

    fn check_vendor_risk(ctx: &TransactionContext, t: &RuleThresholds) -> FlagResult {
        let score = finite_or_zero(ctx.vendor_risk_score);

        if score >= 0.90 {
            FlagResult::flag(
                "R8",
                Severity::Critical,
                format!("Vendor risk score: {:.2} (critically high)", score),
                0.35,
            )
        } else if score >= t.vendor_risk_high {
            FlagResult::flag(
                "R8",
                Severity::High,
                format!("Vendor risk score: {:.2}", score),
                0.20,
            )
        } else if score >= 0.40 {
            FlagResult::flag(
                "R8",
                Severity::Medium,
                format!("Vendor risk score: {:.2} (elevated)", score),
                0.08,
            )
        } else {
            FlagResult::clear("R8")
        }
    }
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() { value } else { 0.0 }
}

// ============================================================================
// Rule Engine
// ============================================================================

/// Stateless evaluator for the rule catalog.
///
/// Holds only thresholds, so one engine can be shared freely across threads.
#[derive(Debug, Clone, Default)]
pub struct RuleEngine {
    thresholds: RuleThresholds,
}

impl RuleEngine {
    /// Create an engine with sanitized thresholds.
    #[must_use]
    pub fn new(thresholds: RuleThresholds) -> Self {
        Self {
            thresholds: thresholds.sanitized(),
        }
    }

    /// Thresholds in effect.
    #[must_use]
    pub fn thresholds(&self) -> &RuleThresholds {
        &self.thresholds
    }

    /// Run every rule and aggregate the triggered ones.
    ///
    /// No short-circuiting: all eight rules run on every call.
    #[must_use]
    pub fn evaluate(&self, ctx: &TransactionContext) -> RuleEvaluation {
        let evaluation = RuleEvaluation::from_results(self.evaluate_all(ctx));

        tracing::debug!(
            triggered = evaluation.triggered_count,
            rule_score = evaluation.rule_score,
            critical_hit = evaluation.critical_hit,
            "Rules evaluated"
        );

        evaluation
    }

    /// Every rule's outcome, triggered or not, in catalog order.
    #[must_use]
    pub fn evaluate_all(&self, ctx: &TransactionContext) -> Vec<FlagResult> {
        CATALOG
            .iter()
            .map(|rule| rule.evaluate(ctx, &self.thresholds))
            .collect()
    }
}
