//! Rule result types.

use serde::{Deserialize, Serialize};

// ============================================================================
// Severity
// ============================================================================

/// Severity of a flag.
///
/// Ordered, so `Severity::Critical > Severity::High` and so on.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Rule did not fire.
    #[default]
    None,
    /// Weak signal.
    Low,
    /// Worth a look.
    Medium,
    /// Strong signal.
    High,
    /// Highest tier; floors the composite score.
    Critical,
}

impl Severity {
    /// Returns the severity name as a string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Severity::None => "none",
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Flag Result
// ============================================================================

/// Outcome of one rule evaluation, or a flag synthesized by the orchestrator.
///
/// Serializes to the persistence shape `{rule_id, severity, message,
/// score_delta}`; `triggered` is implied by a flag being persisted at all.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlagResult {
    /// Rule identifier (`R1`..`R8`, or `NET1` for collusion).
    pub rule_id: String,
    /// Whether the rule fired.
    #[serde(skip_serializing, default = "default_triggered")]
    pub triggered: bool,
    /// Severity band.
    pub severity: Severity,
    /// Human-readable explanation; empty when not triggered.
    pub message: String,
    /// Additive risk contribution in `[0, 1]`.
    pub score_delta: f64,
}

fn default_triggered() -> bool {
    true
}

impl FlagResult {
    /// A fired flag.
    #[must_use]
    pub fn flag(
        rule_id: impl Into<String>,
        severity: Severity,
        message: impl Into<String>,
        score_delta: f64,
    ) -> Self {
        Self {
            rule_id: rule_id.into(),
            triggered: true,
            severity,
            message: message.into(),
            score_delta: score_delta.clamp(0.0, 1.0),
        }
    }

    /// A rule that evaluated and did not fire.
    #[must_use]
    pub fn clear(rule_id: impl Into<String>) -> Self {
        Self {
            rule_id: rule_id.into(),
            triggered: false,
            severity: Severity::None,
            message: String::new(),
            score_delta: 0.0,
        }
    }

    /// Returns true for a triggered flag at the highest tier.
    #[must_use]
    pub fn is_critical(&self) -> bool {
        self.triggered && self.severity == Severity::Critical
    }
}

// ============================================================================
// Rule Evaluation
// ============================================================================

/// Aggregate result of running the whole catalog.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RuleEvaluation {
    /// Triggered flags, in catalog order.
    pub flags: Vec<FlagResult>,
    /// `min(1, Σ score_delta)` over triggered flags, 4 dp.
    pub rule_score: f64,
    /// Any triggered flag is critical.
    pub critical_hit: bool,
    /// Number of triggered flags.
    pub triggered_count: usize,
}

impl RuleEvaluation {
    /// Aggregate a set of rule outcomes; untriggered results are dropped.
    #[must_use]
    pub fn from_results(results: impl IntoIterator<Item = FlagResult>) -> Self {
        let flags: Vec<FlagResult> = results.into_iter().filter(|f| f.triggered).collect();
        let raw_score: f64 = flags.iter().map(|f| f.score_delta).sum();
        let critical_hit = flags.iter().any(FlagResult::is_critical);

        Self {
            rule_score: fraudkernel_core::round4(raw_score.min(1.0)),
            critical_hit,
            triggered_count: flags.len(),
            flags,
        }
    }

    /// Highest severity among triggered flags.
    #[must_use]
    pub fn max_severity(&self) -> Severity {
        self.flags
            .iter()
            .map(|f| f.severity)
            .max()
            .unwrap_or_default()
    }
}

/// Format an amount with thousands separators and no decimals, e.g. `20,000`.
pub(crate) fn format_amount(amount: f64) -> String {
    let rounded = amount.round();
    let negative = rounded < 0.0;
    let digits = format!("{:.0}", rounded.abs());

    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }

    if negative { format!("-{}", out) } else { out }
}
