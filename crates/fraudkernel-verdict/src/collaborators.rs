//! External collaborators: the statistical classifier and its explainer.
//!
//! Both live outside the decision core. The engine only sees these traits,
//! and every call through them is fault-isolated by the engine.
//!
//! # Example
//!
//! ```rust,ignore
//! use fraudkernel_verdict::prelude::*;
//!
//! let classifier = |fv: &FeatureVector| Ok(model.predict_proba(fv.as_slice()));
//! let explainer = AttributionExplainer::new(|fv: &FeatureVector| Ok(shap.values(fv)));
//! ```

use crate::features::{FEATURE_COUNT, FEATURE_LABELS, FEATURE_NAMES, FeatureVector};
use fraudkernel_core::error::Result;

/// Attributions at or below this value do not count as pushing toward fraud.
pub const MIN_ATTRIBUTION: f64 = 0.001;

// ============================================================================
// Traits
// ============================================================================

/// Calibrated fraud probability for a feature vector.
pub trait Classifier: Send + Sync {
    /// Probability in `[0, 1]`, or an error when the model is unavailable.
    fn predict(&self, features: &FeatureVector) -> Result<f64>;
}

impl<F> Classifier for F
where
    F: Fn(&FeatureVector) -> Result<f64> + Send + Sync,
{
    fn predict(&self, features: &FeatureVector) -> Result<f64> {
        self(features)
    }
}

/// Ordered human-readable reasons for a prediction.
pub trait Explainer: Send + Sync {
    /// At most `top_n` reasons, strongest first.
    fn explain(&self, features: &FeatureVector, top_n: usize) -> Result<Vec<String>>;
}

impl<F> Explainer for F
where
    F: Fn(&FeatureVector, usize) -> Result<Vec<String>> + Send + Sync,
{
    fn explain(&self, features: &FeatureVector, top_n: usize) -> Result<Vec<String>> {
        self(features, top_n)
    }
}

/// Per-feature contributions toward fraud (e.g. tree SHAP values), in
/// feature-vector order.
pub trait AttributionSource: Send + Sync {
    /// One attribution per feature.
    fn attributions(&self, features: &FeatureVector) -> Result<[f64; FEATURE_COUNT]>;
}

impl<F> AttributionSource for F
where
    F: Fn(&FeatureVector) -> Result<[f64; FEATURE_COUNT]> + Send + Sync,
{
    fn attributions(&self, features: &FeatureVector) -> Result<[f64; FEATURE_COUNT]> {
        self(features)
    }
}

// ============================================================================
// Attribution Explainer
// ============================================================================

/// Turns feature attributions into reason sentences.
///
/// Features are ranked by attribution, strongest first. Ranking stops at the
/// first attribution at or below [`MIN_ATTRIBUTION`].
#[derive(Debug, Clone)]
pub struct AttributionExplainer<S> {
    source: S,
}

impl<S: AttributionSource> AttributionExplainer<S> {
    /// Wrap an attribution source.
    #[must_use]
    pub fn new(source: S) -> Self {
        Self { source }
    }
}

impl<S: AttributionSource> Explainer for AttributionExplainer<S> {
    fn explain(&self, features: &FeatureVector, top_n: usize) -> Result<Vec<String>> {
        let attributions = self
            .source
            .attributions(features)?
            .map(|a| if a.is_nan() { 0.0 } else { a });

        let mut ranked: Vec<usize> = (0..FEATURE_COUNT).collect();
        ranked.sort_by(|a, b| attributions[*b].total_cmp(&attributions[*a]));

        let values = features.as_slice();
        Ok(ranked
            .into_iter()
            .take(top_n)
            .take_while(|i| attributions[*i] > MIN_ATTRIBUTION)
            .map(|i| format_reason(i, values[i]))
            .collect())
    }
}

/// Sentence for one feature at its raw value.
#[must_use]
pub fn format_reason(index: usize, value: f64) -> String {
    let Some(name) = FEATURE_NAMES.get(index) else {
        return format!("Feature #{} flagged", index);
    };
    let label = FEATURE_LABELS[index];
    let v = value;

    match *name {
        "amount" => format!("Large transaction amount: ${}", format_currency(v)),
        "vendor_risk_score" => format!("High vendor risk score: {:.2}/1.00", v),
        "amount_vs_avg_ratio" => format!("Amount is {:.1}x business average", v),
        "num_txns_last_1h" => {
            format!("{} transactions in past hour (unusual velocity)", v as i64)
        }
        "num_txns_last_24h" => {
            format!("{} transactions in past 24 hours (elevated activity)", v as i64)
        }
        "balance_drop_ratio" => {
            format!("Transaction drains {:.0}% of account balance", v * 100.0)
        }
        "is_after_hours" if v > 0.5 => "Transaction outside normal business hours".to_string(),
        "is_crypto_category" if v > 0.5 => "Cryptocurrency payment detected".to_string(),
        "high_risk_country" if v > 0.5 => "Vendor located in high-risk jurisdiction".to_string(),
        "country_mismatch" if v > 0.5 => "IP country does not match vendor country".to_string(),
        "is_new_vendor" if v > 0.5 => "Payment to new/unknown vendor".to_string(),
        "round_amount" if v > 0.5 => "Suspiciously round transaction amount".to_string(),
        "time_since_last_txn" if (v as i64) < 60 => {
            format!("Only {}s since last transaction (rapid-fire)", v as i64)
        }
        _ => format!("{}: {:.2} (elevated risk factor)", label, v),
    }
}

/// `1234567.891` → `1,234,567.89`.
fn format_currency(value: f64) -> String {
    let fixed = format!("{:.2}", value.abs());
    let (whole, cents) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if value < 0.0 { "-" } else { "" };
    format!("{}{}.{}", sign, grouped, cents)
}
