//! Rule thresholds.
//!
//! Thresholds are global, engine-level settings. Defaults can be overridden
//! from `FRAUDKERNEL_RULE_*` environment variables or a TOML file; any value
//! that is missing, malformed or out of range falls back to its default.

use fraudkernel_core::config::EnvSource;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Jurisdictions treated as high-risk by R4 and the feature vector.
pub const DEFAULT_HIGH_RISK_COUNTRIES: [&str; 8] = ["NG", "RU", "KP", "IR", "VE", "UA", "BY", "MM"];

/// Configurable thresholds for the rule catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleThresholds {
    /// R1: absolute amount threshold; 5× this is critical.
    pub large_txn_threshold: f64,
    /// R1: ratio to the business average that counts as a spike.
    pub ratio_spike: f64,
    /// R2: transactions per hour; 2× this is critical.
    pub velocity_1h_limit: u32,
    /// R3: transactions per 24 hours.
    pub velocity_24h_limit: u32,
    /// R6: first after-hours hour (inclusive).
    pub after_hours_start: u32,
    /// R6: first business hour after the night window (exclusive end).
    pub after_hours_end: u32,
    /// R7: smallest amount that can count as round.
    pub round_amount_min: f64,
    /// R8: vendor risk score that counts as high.
    pub vendor_risk_high: f64,
    /// R4: high-risk jurisdiction denylist.
    pub high_risk_countries: BTreeSet<String>,
}

impl Default for RuleThresholds {
    fn default() -> Self {
        Self {
            large_txn_threshold: 15_000.0,
            ratio_spike: 5.0,
            velocity_1h_limit: 8,
            velocity_24h_limit: 30,
            after_hours_start: 22,
            after_hours_end: 5,
            round_amount_min: 5_000.0,
            vendor_risk_high: 0.65,
            high_risk_countries: DEFAULT_HIGH_RISK_COUNTRIES
                .iter()
                .map(|c| c.to_string())
                .collect(),
        }
    }
}

impl RuleThresholds {
    /// Load thresholds from `FRAUDKERNEL_RULE_*` variables.
    pub fn from_env(env: &impl EnvSource) -> Self {
        Self::default().with_env(env)
    }

    /// Override these thresholds with any `FRAUDKERNEL_RULE_*` variables set.
    #[must_use]
    pub fn with_env(self, env: &impl EnvSource) -> Self {
        let mut thresholds = Self {
            large_txn_threshold: env
                .parse_or("FRAUDKERNEL_RULE_LARGE_TXN", self.large_txn_threshold),
            ratio_spike: env.parse_or("FRAUDKERNEL_RULE_RATIO_SPIKE", self.ratio_spike),
            velocity_1h_limit: env
                .parse_or("FRAUDKERNEL_RULE_VELOCITY_1H", self.velocity_1h_limit),
            velocity_24h_limit: env
                .parse_or("FRAUDKERNEL_RULE_VELOCITY_24H", self.velocity_24h_limit),
            after_hours_start: env
                .parse_or("FRAUDKERNEL_RULE_AFTER_HOURS_START", self.after_hours_start),
            after_hours_end: env
                .parse_or("FRAUDKERNEL_RULE_AFTER_HOURS_END", self.after_hours_end),
            round_amount_min: env
                .parse_or("FRAUDKERNEL_RULE_ROUND_AMOUNT_MIN", self.round_amount_min),
            vendor_risk_high: env.parse_or("FRAUDKERNEL_RULE_VENDOR_RISK", self.vendor_risk_high),
            high_risk_countries: self.high_risk_countries,
        };

        if let Some(raw) = env.get("FRAUDKERNEL_RULE_HIGH_RISK_COUNTRIES") {
            let parsed: BTreeSet<String> = raw
                .split(',')
                .map(|c| c.trim().to_ascii_uppercase())
                .filter(|c| !c.is_empty())
                .collect();
            if !parsed.is_empty() {
                thresholds.high_risk_countries = parsed;
            }
        }

        thresholds.sanitized()
    }

    /// Replace out-of-range values with their defaults.
    #[must_use]
    pub fn sanitized(mut self) -> Self {
        let d = Self::default();

        fn positive(value: f64, default: f64, name: &str) -> f64 {
            if value.is_finite() && value > 0.0 {
                value
            } else {
                tracing::warn!(
                    threshold = name,
                    value,
                    default,
                    "Invalid threshold, using default"
                );
                default
            }
        }

        self.large_txn_threshold =
            positive(self.large_txn_threshold, d.large_txn_threshold, "large_txn_threshold");
        self.ratio_spike = positive(self.ratio_spike, d.ratio_spike, "ratio_spike");
        self.round_amount_min =
            positive(self.round_amount_min, d.round_amount_min, "round_amount_min");

        if !(self.vendor_risk_high.is_finite()
            && self.vendor_risk_high > 0.0
            && self.vendor_risk_high <= 1.0)
        {
            tracing::warn!(
                value = self.vendor_risk_high,
                "Invalid vendor_risk_high, using default"
            );
            self.vendor_risk_high = d.vendor_risk_high;
        }

        if self.velocity_1h_limit == 0 {
            tracing::warn!("velocity_1h_limit must be positive, using default");
            self.velocity_1h_limit = d.velocity_1h_limit;
        }
        if self.velocity_24h_limit == 0 {
            tracing::warn!("velocity_24h_limit must be positive, using default");
            self.velocity_24h_limit = d.velocity_24h_limit;
        }

        if self.after_hours_start > 23 {
            tracing::warn!(value = self.after_hours_start, "after_hours_start out of range");
            self.after_hours_start = d.after_hours_start;
        }
        if self.after_hours_end > 23 {
            tracing::warn!(value = self.after_hours_end, "after_hours_end out of range");
            self.after_hours_end = d.after_hours_end;
        }

        self
    }

    /// Whether a country code is on the denylist. Empty codes never are.
    #[must_use]
    pub fn is_high_risk_country(&self, code: &str) -> bool {
        !code.is_empty() && self.high_risk_countries.contains(code)
    }

    /// Whether an hour falls in the after-hours window.
    ///
    /// The window runs from `after_hours_start` up to `after_hours_end`,
    /// wrapping past midnight when start > end.
    #[must_use]
    pub fn is_after_hours(&self, hour: u32) -> bool {
        let (start, end) = (self.after_hours_start, self.after_hours_end);
        match start.cmp(&end) {
            std::cmp::Ordering::Greater => hour >= start || hour < end,
            std::cmp::Ordering::Less => hour >= start && hour < end,
            std::cmp::Ordering::Equal => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults() {
        let t = RuleThresholds::default();
        assert_eq!(t.large_txn_threshold, 15_000.0);
        assert_eq!(t.velocity_1h_limit, 8);
        assert_eq!(t.velocity_24h_limit, 30);
        assert_eq!(t.vendor_risk_high, 0.65);
        assert_eq!(t.high_risk_countries.len(), 8);
    }

    #[test]
    fn test_from_env_overrides() {
        let t = RuleThresholds::from_env(&env(&[
            ("FRAUDKERNEL_RULE_LARGE_TXN", "20000"),
            ("FRAUDKERNEL_RULE_VELOCITY_1H", "4"),
            ("FRAUDKERNEL_RULE_HIGH_RISK_COUNTRIES", "ng, xx ,"),
        ]));

        assert_eq!(t.large_txn_threshold, 20_000.0);
        assert_eq!(t.velocity_1h_limit, 4);
        assert!(t.is_high_risk_country("XX"));
        assert!(!t.is_high_risk_country("RU"));
    }

    #[test]
    fn test_from_env_bad_values_use_defaults() {
        let t = RuleThresholds::from_env(&env(&[
            ("FRAUDKERNEL_RULE_LARGE_TXN", "-5"),
            ("FRAUDKERNEL_RULE_VELOCITY_24H", "thirty"),
            ("FRAUDKERNEL_RULE_VENDOR_RISK", "1.7"),
            ("FRAUDKERNEL_RULE_AFTER_HOURS_START", "25"),
        ]));

        assert_eq!(t, RuleThresholds::default());
    }

    #[test]
    fn test_with_env_layers_over_existing() {
        let base = RuleThresholds {
            large_txn_threshold: 9_000.0,
            velocity_24h_limit: 12,
            ..Default::default()
        };
        let t = base.with_env(&env(&[
            ("FRAUDKERNEL_RULE_VELOCITY_1H", "3"),
            ("FRAUDKERNEL_RULE_VELOCITY_24H", "thirty"),
        ]));

        assert_eq!(t.large_txn_threshold, 9_000.0);
        assert_eq!(t.velocity_1h_limit, 3);
        assert_eq!(t.velocity_24h_limit, 12);
    }

    #[test]
    fn test_sanitized_rejects_nan() {
        let t = RuleThresholds {
            ratio_spike: f64::NAN,
            velocity_1h_limit: 0,
            ..Default::default()
        }
        .sanitized();

        assert_eq!(t.ratio_spike, 5.0);
        assert_eq!(t.velocity_1h_limit, 8);
    }

    #[test]
    fn test_after_hours_window() {
        let t = RuleThresholds::default();
        assert!(t.is_after_hours(22));
        assert!(t.is_after_hours(23));
        assert!(t.is_after_hours(0));
        assert!(t.is_after_hours(4));
        assert!(!t.is_after_hours(5));
        assert!(!t.is_after_hours(12));
        assert!(!t.is_after_hours(21));

        let daytime = RuleThresholds {
            after_hours_start: 1,
            after_hours_end: 4,
            ..Default::default()
        };
        assert!(daytime.is_after_hours(2));
        assert!(!daytime.is_after_hours(23));
    }

    #[test]
    fn test_empty_country_is_never_high_risk() {
        assert!(!RuleThresholds::default().is_high_risk_country(""));
    }

    #[test]
    fn test_toml_partial_uses_defaults() {
        let t: RuleThresholds = toml::from_str("large_txn_threshold = 9000.0").unwrap();
        assert_eq!(t.large_txn_threshold, 9000.0);
        assert_eq!(t.velocity_1h_limit, 8);
    }
}
