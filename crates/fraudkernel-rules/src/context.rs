//! Transaction context.
//!
//! One `TransactionContext` describes one transaction plus the business
//! context it arrived with. It is created per analysis call and threaded
//! through the pipeline as the working context.
//!
//! # Coercion policy
//!
//! Nothing about a context can fail. Missing or malformed inputs coerce to
//! neutral defaults:
//!
//! | Field | Default |
//! |---|---|
//! | numeric amounts, balances, risk score | `0` |
//! | counters | `0` (negative or non-numeric inputs too) |
//! | strings | empty |
//! | `is_new_vendor` | `false` |
//! | `timestamp`, `hour_of_day`, `business_avg_amount`, `time_since_last_txn` | unset |

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Hour used when neither a timestamp nor an explicit hour is available.
pub const DEFAULT_HOUR: u32 = 12;

/// Seconds since the previous transaction when unknown.
pub const DEFAULT_TIME_SINCE_LAST_TXN: f64 = 3600.0;

/// Vendor identity used when a transaction names none.
pub const UNKNOWN_VENDOR: &str = "unknown";

/// Explicit record of the fields the rules, the feature vector and the
/// network layer read.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransactionContext {
    /// Transaction amount.
    pub amount: f64,
    /// Vendor identity, matched exactly and case-sensitively.
    pub vendor_name: String,
    /// ISO country code of the vendor.
    pub vendor_country: String,
    /// ISO country code the request originated from.
    #[serde(alias = "ip_country")]
    pub origin_country: String,
    /// Merchant category.
    pub category: String,
    /// Payment method (`credit_card`, `wire_transfer`, `crypto`, ...).
    pub payment_method: String,
    /// ISO-8601 timestamp of the transaction.
    #[serde(alias = "date")]
    pub timestamp: Option<String>,
    /// Explicit hour of day, used when `timestamp` is absent or unparseable.
    pub hour_of_day: Option<u32>,
    /// Seconds since the business's previous transaction.
    pub time_since_last_txn: Option<f64>,
    /// Transactions by this business in the last hour.
    pub num_txns_last_1h: u32,
    /// Transactions by this business in the last 24 hours.
    pub num_txns_last_24h: u32,
    /// Historical average transaction amount of the business.
    pub business_avg_amount: Option<f64>,
    /// Vendor risk score in `[0, 1]`; the network stage may raise it.
    pub vendor_risk_score: f64,
    /// Vendor has not been seen before.
    pub is_new_vendor: bool,
    /// Account balance before the transaction.
    pub previous_balance: f64,
    /// Account balance after the transaction.
    pub new_balance: f64,
}

impl TransactionContext {
    /// Create a context for an amount paid to a vendor.
    #[must_use]
    pub fn new(amount: f64, vendor_name: impl Into<String>) -> Self {
        Self {
            amount,
            vendor_name: vendor_name.into(),
            ..Default::default()
        }
    }

    /// Build a context from a loosely typed record.
    ///
    /// Numbers may be JSON numbers, numeric strings, booleans or null.
    /// Anything that cannot be read coerces to the field default, and a
    /// missing or empty vendor name becomes `"unknown"`. Non-object input
    /// yields an empty context for the unknown vendor.
    #[must_use]
    pub fn from_json(record: &Value) -> Self {
        let Some(obj) = record.as_object() else {
            return Self::new(0.0, UNKNOWN_VENDOR);
        };
        let field = |key: &str| obj.get(key);

        Self {
            amount: field("amount").and_then(lenient_f64).unwrap_or(0.0),
            vendor_name: field("vendor_name")
                .map(lenient_string)
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| UNKNOWN_VENDOR.to_string()),
            vendor_country: field("vendor_country").map(lenient_string).unwrap_or_default(),
            origin_country: field("origin_country")
                .or_else(|| field("ip_country"))
                .map(lenient_string)
                .unwrap_or_default(),
            category: field("category").map(lenient_string).unwrap_or_default(),
            payment_method: field("payment_method").map(lenient_string).unwrap_or_default(),
            timestamp: field("timestamp")
                .or_else(|| field("date"))
                .map(lenient_string)
                .filter(|s| !s.is_empty()),
            hour_of_day: field("hour_of_day")
                .and_then(lenient_f64)
                .filter(|h| (0.0..24.0).contains(h))
                .map(|h| h as u32),
            time_since_last_txn: field("time_since_last_txn").and_then(lenient_f64),
            num_txns_last_1h: field("num_txns_last_1h").map(lenient_count).unwrap_or(0),
            num_txns_last_24h: field("num_txns_last_24h").map(lenient_count).unwrap_or(0),
            business_avg_amount: field("business_avg_amount").and_then(lenient_f64),
            vendor_risk_score: field("vendor_risk_score").and_then(lenient_f64).unwrap_or(0.0),
            is_new_vendor: field("is_new_vendor").is_some_and(lenient_bool),
            previous_balance: field("previous_balance").and_then(lenient_f64).unwrap_or(0.0),
            new_balance: field("new_balance").and_then(lenient_f64).unwrap_or(0.0),
        }
    }

    /// Vendor identity used as the graph key; `"unknown"` when empty.
    #[must_use]
    pub fn vendor_key(&self) -> &str {
        if self.vendor_name.is_empty() {
            UNKNOWN_VENDOR
        } else {
            &self.vendor_name
        }
    }

    /// Business average to compare against; the amount itself when unset.
    #[must_use]
    pub fn effective_business_avg(&self) -> f64 {
        match self.business_avg_amount {
            Some(avg) if avg.is_finite() && avg != 0.0 => avg,
            _ => self.amount,
        }
    }

    /// Ratio of the amount to the business average (denominator ≥ 1).
    #[must_use]
    pub fn amount_vs_avg_ratio(&self) -> f64 {
        self.amount / self.effective_business_avg().max(1.0)
    }

    /// Seconds since the previous transaction, defaulting to one hour.
    #[must_use]
    pub fn effective_time_since_last_txn(&self) -> f64 {
        match self.time_since_last_txn {
            Some(secs) if secs.is_finite() && secs != 0.0 => secs,
            _ => DEFAULT_TIME_SINCE_LAST_TXN,
        }
    }

    /// Hour of day: from the timestamp, else `hour_of_day`, else 12.
    #[must_use]
    pub fn resolved_hour(&self) -> u32 {
        self.parsed_timestamp()
            .map(|ts| ts.hour())
            .or(self.hour_of_day.filter(|h| *h < 24))
            .unwrap_or(DEFAULT_HOUR)
    }

    /// Day of week from the timestamp (Monday = 0), else 0.
    #[must_use]
    pub fn resolved_day_of_week(&self) -> u32 {
        self.parsed_timestamp()
            .map(|ts| ts.weekday().num_days_from_monday())
            .unwrap_or(0)
    }

    /// Category or payment method mentions crypto.
    #[must_use]
    pub fn is_crypto(&self) -> bool {
        self.category.to_lowercase().contains("crypto")
            || self.payment_method.to_lowercase().contains("crypto")
    }

    /// Parse the timestamp as local wall-clock time.
    ///
    /// Accepts RFC 3339 (including a trailing `Z`), naive ISO date-times with
    /// `T` or space separators, and bare dates (midnight).
    fn parsed_timestamp(&self) -> Option<NaiveDateTime> {
        let raw = self.timestamp.as_deref()?.trim();
        if raw.is_empty() {
            return None;
        }

        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(dt.naive_local());
        }

        ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"]
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
            .or_else(|| {
                NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                    .ok()
                    .and_then(|d| d.and_hms_opt(0, 0, 0))
            })
    }
}

fn lenient_f64(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    };
    parsed.filter(|v| v.is_finite())
}

fn lenient_count(value: &Value) -> u32 {
    lenient_f64(value)
        .filter(|v| *v > 0.0)
        .map(|v| v.trunc().min(f64::from(u32::MAX)) as u32)
        .unwrap_or(0)
}

fn lenient_bool(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::String(s) => matches!(
            s.trim().to_ascii_lowercase().as_str(),
            "true" | "yes" | "y"
        ) || lenient_f64(value).is_some_and(|v| v != 0.0),
        _ => lenient_f64(value).is_some_and(|v| v != 0.0),
    }
}

fn lenient_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_json_well_formed() {
        let ctx = TransactionContext::from_json(&json!({
            "amount": 1250.5,
            "vendor_name": "Acme Supplies",
            "vendor_country": "US",
            "ip_country": "GB",
            "num_txns_last_1h": 3,
            "is_new_vendor": 1,
            "timestamp": "2024-03-09T23:15:00Z",
        }));

        assert_eq!(ctx.amount, 1250.5);
        assert_eq!(ctx.vendor_name, "Acme Supplies");
        assert_eq!(ctx.origin_country, "GB");
        assert_eq!(ctx.num_txns_last_1h, 3);
        assert!(ctx.is_new_vendor);
        assert_eq!(ctx.resolved_hour(), 23);
    }

    #[test]
    fn test_from_json_malformed_coerces() {
        let ctx = TransactionContext::from_json(&json!({
            "amount": "not a number",
            "num_txns_last_1h": "4.7",
            "num_txns_last_24h": -3,
            "vendor_risk_score": null,
            "vendor_name": 42,
            "is_new_vendor": "no",
            "hour_of_day": 99,
        }));

        assert_eq!(ctx.amount, 0.0);
        assert_eq!(ctx.num_txns_last_1h, 4);
        assert_eq!(ctx.num_txns_last_24h, 0);
        assert_eq!(ctx.vendor_risk_score, 0.0);
        assert_eq!(ctx.vendor_name, "42");
        assert!(!ctx.is_new_vendor);
        assert_eq!(ctx.hour_of_day, None);
    }

    #[test]
    fn test_from_json_non_object() {
        assert_eq!(
            TransactionContext::from_json(&json!([1, 2, 3])),
            TransactionContext::new(0.0, UNKNOWN_VENDOR)
        );
    }

    #[test]
    fn test_from_json_missing_vendor_is_unknown() {
        let absent = TransactionContext::from_json(&json!({"amount": 10}));
        let empty = TransactionContext::from_json(&json!({"vendor_name": ""}));
        let null = TransactionContext::from_json(&json!({"vendor_name": null}));

        for ctx in [absent, empty, null] {
            assert_eq!(ctx.vendor_name, UNKNOWN_VENDOR);
            assert_eq!(ctx.vendor_key(), UNKNOWN_VENDOR);
        }
    }

    #[test]
    fn test_vendor_key_defaults_to_unknown() {
        assert_eq!(TransactionContext::default().vendor_key(), UNKNOWN_VENDOR);
        assert_eq!(TransactionContext::new(1.0, "Zeta").vendor_key(), "Zeta");
    }

    #[test]
    fn test_amount_vs_avg_ratio() {
        let mut ctx = TransactionContext::new(6000.0, "v");
        assert_eq!(ctx.amount_vs_avg_ratio(), 1.0);

        ctx.business_avg_amount = Some(1000.0);
        assert_eq!(ctx.amount_vs_avg_ratio(), 6.0);

        ctx.business_avg_amount = Some(0.5);
        assert_eq!(ctx.amount_vs_avg_ratio(), 6000.0);
    }

    #[test]
    fn test_resolved_hour_fallbacks() {
        let mut ctx = TransactionContext::default();
        assert_eq!(ctx.resolved_hour(), DEFAULT_HOUR);

        ctx.hour_of_day = Some(3);
        assert_eq!(ctx.resolved_hour(), 3);

        ctx.timestamp = Some("2024-01-15 07:45:00".to_string());
        assert_eq!(ctx.resolved_hour(), 7);

        ctx.timestamp = Some("garbage".to_string());
        assert_eq!(ctx.resolved_hour(), 3);

        ctx.timestamp = Some("2024-01-15".to_string());
        assert_eq!(ctx.resolved_hour(), 0);
    }

    #[test]
    fn test_resolved_day_of_week() {
        let mut ctx = TransactionContext::default();
        assert_eq!(ctx.resolved_day_of_week(), 0);

        // 2024-03-09 is a Saturday
        ctx.timestamp = Some("2024-03-09T10:00:00+02:00".to_string());
        assert_eq!(ctx.resolved_day_of_week(), 5);
    }

    #[test]
    fn test_is_crypto() {
        let mut ctx = TransactionContext::default();
        assert!(!ctx.is_crypto());
        ctx.payment_method = "Crypto".to_string();
        assert!(ctx.is_crypto());
        ctx.payment_method.clear();
        ctx.category = "cryptocurrency".to_string();
        assert!(ctx.is_crypto());
    }

    #[test]
    fn test_serde_aliases() {
        let ctx: TransactionContext = serde_json::from_value(json!({
            "amount": 10.0,
            "ip_country": "NG",
            "date": "2024-01-01T02:00:00"
        }))
        .unwrap();

        assert_eq!(ctx.origin_country, "NG");
        assert_eq!(ctx.resolved_hour(), 2);
    }
}
