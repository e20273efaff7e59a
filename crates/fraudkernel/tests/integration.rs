//! Integration tests for FraudKernel
//!
//! End-to-end scenarios across the rule, network and verdict layers.

use fraudkernel::prelude::*;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;

// ============================================================================
// Rule Layer
// ============================================================================

#[test]
fn test_rule_score_matches_triggered_sum() {
    let engine = RuleEngine::default();
    let amounts = [0.0, 499.0, 5_000.0, 15_000.0, 74_999.0, 75_000.0, 1e9];
    let velocities = [0, 7, 8, 16, 30];
    let countries = ["", "US", "RU", "NG"];

    for amount in amounts {
        for velocity in velocities {
            for vendor_country in countries {
                for origin_country in countries {
                    let mut ctx = TransactionContext::new(amount, "v");
                    ctx.num_txns_last_1h = velocity;
                    ctx.num_txns_last_24h = velocity * 2;
                    ctx.vendor_country = vendor_country.to_string();
                    ctx.origin_country = origin_country.to_string();

                    let eval = engine.evaluate(&ctx);
                    let sum: f64 = eval.flags.iter().map(|f| f.score_delta).sum();

                    assert!((0.0..=1.0).contains(&eval.rule_score));
                    assert!((eval.rule_score - sum.min(1.0)).abs() < 1e-4);
                    assert_eq!(
                        eval.critical_hit,
                        eval.flags.iter().any(|f| f.severity == Severity::Critical)
                    );
                }
            }
        }
    }
}

#[test]
fn test_large_transaction_scenario() {
    let thresholds = RuleThresholds {
        large_txn_threshold: 15_000.0,
        ..Default::default()
    };
    let eval = RuleEngine::new(thresholds).evaluate(&TransactionContext::new(20_000.0, "v"));
    let r1 = eval.flags.iter().find(|f| f.rule_id == "R1").unwrap();

    assert_eq!(r1.severity, Severity::High);
    assert_eq!(r1.score_delta, 0.20);
}

#[test]
fn test_malformed_record_never_fails() {
    let engine = VerdictEngine::default();
    let record = json!({
        "amount": "not a number",
        "vendor_name": 42,
        "num_txns_last_1h": -3,
        "num_txns_last_24h": "12",
        "is_new_vendor": "yes",
        "timestamp": "yesterday",
        "vendor_risk_score": null
    });

    let mut ctx = TransactionContext::from_json(&record);
    let verdict = engine.analyze(&mut ctx, 1, 0.0);

    assert_eq!(ctx.amount, 0.0);
    assert_eq!(ctx.num_txns_last_1h, 0);
    assert_eq!(ctx.num_txns_last_24h, 12);
    assert!((0.0..=1.0).contains(&verdict.final_score));
}

// ============================================================================
// Network Layer
// ============================================================================

#[test]
fn test_unseen_vendor_floor() {
    let graph = VendorGraph::default();
    assert_eq!(graph.vendor_risk_score("Never Seen").unwrap(), 0.05);
}

#[test]
fn test_collusion_bands_by_payer_count() {
    for payers in 0..=12u64 {
        let graph = VendorGraph::default();
        graph.record(999, "Other", 1.0).unwrap();
        for b in 0..payers {
            graph.record(b, "Hub", 100.0).unwrap();
        }

        let signal = graph.detect_collusion("Hub").unwrap();
        assert_eq!(signal.shared_businesses, payers as usize);
        match payers {
            0..=4 => assert!(!signal.detected),
            5..=9 => assert_eq!((signal.detected, signal.severity), (true, Severity::High)),
            _ => assert_eq!((signal.detected, signal.severity), (true, Severity::Critical)),
        }
    }
}

#[test]
fn test_ten_business_collusion_scenario() {
    let graph = VendorGraph::default();
    for b in 1..=10 {
        graph.record(b, "Shell Co", 2_500.0).unwrap();
    }

    let signal = graph.detect_collusion("Shell Co").unwrap();
    assert!(signal.detected);
    assert_eq!(signal.severity, Severity::Critical);
    assert_eq!(signal.shared_businesses, 10);
}

#[test]
fn test_single_payer_concentration_scenario() {
    let graph = VendorGraph::default();
    graph.record(1, "Drain", 8_000.0).unwrap();
    graph.record(2, "A", 1_000.0).unwrap();
    graph.record(3, "B", 1_000.0).unwrap();

    assert_eq!(graph.vendor_risk_score("Drain").unwrap(), 1.0);
}

#[test]
fn test_record_order_independence() {
    let mut events = Vec::new();
    for i in 0..120u64 {
        let vendor = format!("vendor-{}", i % 9);
        events.push((i % 13, vendor, ((i * 131) % 1_000) as f64));
    }

    let apply = |events: &[(u64, String, f64)]| {
        let graph = VendorGraph::default();
        for (b, v, a) in events {
            graph.record(*b, v, *a).unwrap();
        }
        let mut links: Vec<(String, String, f64, u64)> = graph
            .export_subgraph(None)
            .unwrap()
            .links
            .into_iter()
            .map(|e| (e.source, e.target, e.weight, e.txn_count))
            .collect();
        links.sort_by(|a, b| (&a.0, &a.1).cmp(&(&b.0, &b.1)));
        (links, graph.stats().unwrap())
    };

    let expected = apply(&events);
    let mut rng = StdRng::seed_from_u64(0x5eed);
    for _ in 0..10 {
        events.shuffle(&mut rng);
        assert_eq!(apply(&events), expected);
    }
}

#[test]
fn test_subgraph_export_for_visualization() {
    let engine = VerdictEngine::default();
    let rows = vec![
        json!({"amount": 100, "vendor_name": "Acme"}),
        json!({"amount": 200, "vendor_name": "Globex"}),
    ];
    engine.analyze_batch(&rows, 5, 0.0);
    engine.analyze_batch(&[json!({"amount": 50, "vendor_name": "Acme"})], 6, 0.0);

    let snapshot = engine.graph().export_subgraph(Some(5)).unwrap();
    let json = serde_json::to_value(&snapshot).unwrap();

    assert_eq!(json["total_nodes"], 3);
    assert_eq!(json["links"].as_array().unwrap().len(), 2);
    for node in json["nodes"].as_array().unwrap() {
        match node["type"].as_str().unwrap() {
            "business" => {
                assert_eq!(node["name"], "Business #5");
                assert!(node.get("risk_score").is_none());
            }
            "vendor" => assert!(node["risk_score"].is_number()),
            other => panic!("unexpected node type {}", other),
        }
    }
}

// ============================================================================
// Verdict Pipeline
// ============================================================================

#[test]
fn test_classifier_unavailable_scenario() {
    let verdict = Verdict::fuse(LayerSignals {
        ml_confidence: 0.0,
        rules: RuleEvaluation::from_results(vec![
            FlagResult::flag("R2", Severity::High, "velocity", 0.18),
            FlagResult::flag("R4", Severity::High, "country", 0.22),
            FlagResult::flag("R3", Severity::Medium, "daily", 0.10),
        ]),
        network_score: 0.2,
        ..Default::default()
    });

    assert_eq!(verdict.rule_score, 0.5);
    assert_eq!(verdict.final_score, 0.205);
    assert!(!verdict.is_fraud);
    assert!(!verdict.review_required);
}

#[test]
fn test_critical_hit_forces_fraud() {
    let engine = VerdictEngine::default()
        .with_classifier(|_: &FeatureVector| -> Result<f64> { Ok(0.0) });

    let mut ctx = TransactionContext::new(150.0, "Night Owl");
    ctx.num_txns_last_1h = 20;

    let verdict = engine.analyze(&mut ctx, 1, 0.0);

    assert!(verdict.critical_hit);
    assert!(verdict.is_fraud);
    assert!(verdict.final_score >= 0.75);
    assert_eq!(verdict.risk_level, RiskLevel::Critical);
    assert_eq!(verdict.verdict_source, VerdictSource::Rules);
    assert_eq!(verdict.review_status(), ReviewStatus::PendingReview);
}

#[test]
fn test_fraud_iff_threshold_or_critical() {
    let engine = VerdictEngine::default();
    let rows: Vec<_> = (0..40)
        .map(|i| {
            json!({
                "amount": (i * 2_500) as f64,
                "vendor_name": format!("v{}", i % 5),
                "num_txns_last_1h": i % 12,
                "vendor_country": if i % 7 == 0 { "RU" } else { "US" },
                "ip_country": if i % 3 == 0 { "NG" } else { "US" },
                "payment_method": if i % 4 == 0 { "crypto" } else { "ach" },
                "hour_of_day": (i * 5) % 24,
            })
        })
        .collect();

    let report = engine.analyze_batch(&rows, 3, 1_000.0);

    for row in &report.results {
        let v = &row.verdict;
        assert_eq!(v.is_fraud, v.final_score >= 0.45 || v.critical_hit);
        assert_eq!(v.review_required, v.final_score >= 0.30);
        if v.critical_hit {
            assert!(v.final_score >= 0.75);
            assert_eq!(v.risk_level, RiskLevel::Critical);
        }
    }
    assert_eq!(
        report.fraud_count,
        report.results.iter().filter(|r| r.verdict.is_fraud).count()
    );
}

#[test]
fn test_engines_share_one_graph() {
    let graph = Arc::new(VendorGraph::default());
    let engines: Vec<VerdictEngine> = (0..3)
        .map(|_| VerdictEngine::default().with_graph(Arc::clone(&graph)))
        .collect();

    std::thread::scope(|s| {
        for (i, engine) in engines.iter().enumerate() {
            s.spawn(move || {
                for b in 0..4u64 {
                    let mut ctx = TransactionContext::new(100.0, "Common Vendor");
                    engine.analyze(&mut ctx, i as u64 * 10 + b, 0.0);
                }
            });
        }
    });

    let signal = graph.detect_collusion("Common Vendor").unwrap();
    assert_eq!(signal.shared_businesses, 12);
    assert_eq!(signal.severity, Severity::Critical);

    // The next payment to the vendor carries the collusion flag
    let mut ctx = TransactionContext::new(100.0, "Common Vendor");
    let verdict = engines[0].analyze(&mut ctx, 99, 0.0);
    assert!(verdict.flags.iter().any(|f| f.rule_id == "NET1"));
    assert!(verdict.network_score >= 0.4);
}

#[test]
fn test_config_drives_engine() {
    let mut config = EngineConfig::default();
    config.rules.large_txn_threshold = 1_000.0;

    let engine = VerdictEngine::new(config);
    let verdict = engine.analyze(&mut TransactionContext::new(1_200.0, "Acme"), 1, 0.0);

    assert!(verdict.flags.iter().any(|f| f.rule_id == "R1"));
}

#[test]
fn test_config_file_cannot_move_collusion_bands() {
    let path = std::env::temp_dir().join(format!(
        "fraudkernel-integration-bands-{}.toml",
        std::process::id()
    ));
    std::fs::write(
        &path,
        "[graph]\ncollusion_high = 0\ncollusion_critical = 1\n\n\
         [graph.pagerank]\ndamping = -3.0\nmax_iterations = 0\n",
    )
    .unwrap();

    let no_env: HashMap<String, String> = HashMap::new();
    let config = EngineConfig::from_file_with_env(&path, &no_env).unwrap();
    std::fs::remove_file(&path).ok();

    let engine = VerdictEngine::new(config);
    let verdict = engine.analyze(&mut TransactionContext::new(250.0, "First Vendor"), 1, 0.0);

    assert!(verdict.flags.iter().all(|f| f.rule_id != "NET1"));
    assert_eq!(engine.graph().config(), &GraphConfig::default());
}

#[test]
fn test_batch_rows_name_unknown_vendor() {
    let engine = VerdictEngine::default();
    let rows = vec![json!({"amount": null}), json!({"amount": 10, "vendor_name": ""})];

    let report = engine.analyze_batch(&rows, 7, 0.0);

    assert!(report.results.iter().all(|r| r.vendor == "unknown"));
    assert_eq!(engine.graph().stats().unwrap().vendor_count, 1);
}
