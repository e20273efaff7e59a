//! Classifier feature vector.
//!
//! The external classifier and explainer both consume the same fixed-length,
//! order-sensitive vector. [`FEATURE_NAMES`] is the column order.

use fraudkernel_core::round4;
use fraudkernel_rules::{RuleThresholds, TransactionContext};
use serde::{Deserialize, Serialize};

/// Number of features.
pub const FEATURE_COUNT: usize = 16;

/// Feature names, in vector order.
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "amount",
    "hour_of_day",
    "day_of_week",
    "time_since_last_txn",
    "num_txns_last_1h",
    "num_txns_last_24h",
    "amount_vs_avg_ratio",
    "country_mismatch",
    "high_risk_country",
    "is_crypto_category",
    "is_new_vendor",
    "vendor_risk_score",
    "payment_method_encoded",
    "balance_drop_ratio",
    "round_amount",
    "is_after_hours",
];

/// Human-readable labels, in vector order.
pub const FEATURE_LABELS: [&str; FEATURE_COUNT] = [
    "Transaction amount",
    "Hour of day",
    "Day of week",
    "Time since last transaction",
    "Number of transactions in last 1h",
    "Number of transactions in last 24h",
    "Amount vs business average ratio",
    "Country mismatch (IP vs vendor)",
    "High-risk vendor country",
    "Cryptocurrency category",
    "New/unknown vendor",
    "Vendor risk score",
    "Payment method",
    "Balance drain ratio",
    "Suspiciously round amount",
    "After business hours",
];

/// Vendor risk score fed to the classifier when the context carries none.
pub const DEFAULT_VENDOR_RISK_FEATURE: f64 = 0.1;

/// Numeric code of a payment method; unknown methods encode as 0.
#[must_use]
pub fn encode_payment_method(method: &str) -> f64 {
    match method.trim().to_lowercase().as_str() {
        "credit_card" => 0.0,
        "debit_card" => 1.0,
        "wire_transfer" => 2.0,
        "crypto" => 3.0,
        "ach" => 4.0,
        _ => 0.0,
    }
}

/// Index of a feature by name.
#[must_use]
pub fn feature_index(name: &str) -> Option<usize> {
    FEATURE_NAMES.iter().position(|n| *n == name)
}

/// Ordered feature values for one transaction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    values: [f64; FEATURE_COUNT],
}

impl FeatureVector {
    /// Wrap raw values in column order.
    #[must_use]
    pub fn new(values: [f64; FEATURE_COUNT]) -> Self {
        Self { values }
    }

    /// Build the vector from a working context.
    ///
    /// `thresholds` supplies the high-risk country denylist.
    #[must_use]
    pub fn from_context(ctx: &TransactionContext, thresholds: &RuleThresholds) -> Self {
        let amount = finite(ctx.amount);
        let hour = ctx.resolved_hour();

        let prev_balance = if finite(ctx.previous_balance) == 0.0 {
            1.0
        } else {
            finite(ctx.previous_balance)
        };
        let balance_drop = (prev_balance - finite(ctx.new_balance)).max(0.0);
        let balance_drop_ratio = balance_drop / prev_balance.max(1.0);

        let vendor = ctx.vendor_country.as_str();
        let origin = ctx.origin_country.as_str();
        let country_mismatch = !vendor.is_empty() && !origin.is_empty() && vendor != origin;

        let is_new_vendor =
            ctx.is_new_vendor || ctx.vendor_name.to_lowercase().contains("new");

        let vendor_risk = match finite(ctx.vendor_risk_score) {
            score if score == 0.0 => DEFAULT_VENDOR_RISK_FEATURE,
            score => score,
        };

        let round_amount = amount > 0.0 && (amount % 1000.0 < 1.0 || amount % 500.0 < 1.0);
        let after_hours = hour < 5 || hour > 22;

        Self::new([
            amount,
            f64::from(hour),
            f64::from(ctx.resolved_day_of_week()),
            ctx.effective_time_since_last_txn(),
            f64::from(ctx.num_txns_last_1h),
            f64::from(ctx.num_txns_last_24h),
            round4(finite(ctx.amount_vs_avg_ratio())),
            flag(country_mismatch),
            flag(thresholds.is_high_risk_country(vendor)),
            flag(ctx.category.to_lowercase().contains("crypto")),
            flag(is_new_vendor),
            vendor_risk,
            encode_payment_method(&ctx.payment_method),
            round4(balance_drop_ratio),
            flag(round_amount),
            flag(after_hours),
        ])
    }

    /// Values in column order.
    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    /// Value of a named feature.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<f64> {
        feature_index(name).map(|i| self.values[i])
    }

    /// `(name, value)` pairs in column order.
    pub fn named(&self) -> impl Iterator<Item = (&'static str, f64)> + '_ {
        FEATURE_NAMES.iter().copied().zip(self.values.iter().copied())
    }
}

fn finite(value: f64) -> f64 {
    if value.is_finite() { value } else { 0.0 }
}

fn flag(value: bool) -> f64 {
    if value { 1.0 } else { 0.0 }
}
