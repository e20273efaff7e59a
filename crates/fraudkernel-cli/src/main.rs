//! FraudKernel CLI tool.
//!
//! Runs transaction batches through the decision core and prints the
//! effective rule catalog and configuration.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use fraudkernel::prelude::*;
use fraudkernel::graph::{COLLUSION_CRITICAL_PAYERS, COLLUSION_HIGH_PAYERS};
use fraudkernel::rules::engine::CATALOG;
use serde_json::Value;

#[derive(Parser)]
#[command(name = "fraudkernel")]
#[command(version, about = "Transaction fraud decision core", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Configuration file (TOML); `FRAUDKERNEL_*` variables override it
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a JSON array of transactions for one business
    Analyze {
        /// Input file holding a JSON array of transaction records
        #[arg(short, long)]
        input: PathBuf,

        /// Business identifier the transactions belong to
        #[arg(short, long)]
        business: u64,

        /// Historical average amount of the business (computed from the batch if omitted)
        #[arg(short, long)]
        avg: Option<f64>,

        /// Also print the business subgraph
        #[arg(long)]
        export_graph: bool,
    },

    /// Show the rule catalog with effective thresholds
    Rules,

    /// Show the effective configuration as TOML
    Config,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = load_config(cli.config.as_deref())?;
    if cli.verbose {
        config.logging.level = LogLevel::Debug;
    }
    config.logging.init()?;

    match cli.command {
        Commands::Analyze {
            input,
            business,
            avg,
            export_graph,
        } => {
            cmd_analyze(config, &input, business, avg, export_graph)?;
        }

        Commands::Rules => {
            cmd_rules(&config);
        }

        Commands::Config => {
            cmd_config(&config)?;
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> anyhow::Result<EngineConfig> {
    match path {
        Some(path) => EngineConfig::from_file(path)
            .with_context(|| format!("loading config from {}", path.display())),
        None => Ok(EngineConfig::from_env()),
    }
}

fn cmd_analyze(
    config: EngineConfig,
    input: &Path,
    business_id: u64,
    avg: Option<f64>,
    export_graph: bool,
) -> anyhow::Result<()> {
    let raw = std::fs::read_to_string(input)
        .with_context(|| format!("reading {}", input.display()))?;
    let parsed: Value =
        serde_json::from_str(&raw).with_context(|| format!("parsing {}", input.display()))?;
    let Value::Array(rows) = parsed else {
        anyhow::bail!("{} must hold a JSON array of transactions", input.display());
    };

    let business_avg = avg.unwrap_or_else(|| {
        let amounts: Vec<f64> = rows
            .iter()
            .map(|row| TransactionContext::from_json(row).amount)
            .collect();
        business_average(&amounts)
    });

    tracing::info!(
        input = %input.display(),
        rows = rows.len(),
        business_id,
        business_avg,
        "Analyzing batch"
    );

    let engine = VerdictEngine::new(config);
    let report = engine.analyze_batch(&rows, business_id, business_avg);

    println!("{}", serde_json::to_string_pretty(&report)?);

    if export_graph {
        let snapshot = engine
            .graph()
            .export_subgraph(Some(business_id))
            .context("exporting business subgraph")?;
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    }

    eprintln!(
        "{} transactions, {} flagged ({:.2}%), {} pending review",
        report.total,
        report.fraud_count,
        report.risk_percent(),
        report.pending_review()
    );

    Ok(())
}

fn cmd_rules(config: &EngineConfig) {
    let t = &config.rules;

    println!("FraudKernel Rule Catalog");
    println!("========================\n");

    for rule in CATALOG {
        println!("  [{}] {:<16} {}", rule.id(), rule_threshold(rule, t), rule.description());
    }

    let countries: Vec<&str> = t.high_risk_countries.iter().map(String::as_str).collect();
    println!("\nHigh-risk countries: {}", countries.join(", "));
    println!(
        "Collusion: high at {} payers, critical at {}",
        COLLUSION_HIGH_PAYERS, COLLUSION_CRITICAL_PAYERS
    );
}

fn rule_threshold(rule: Rule, t: &RuleThresholds) -> String {
    match rule {
        Rule::LargeTransaction => format!(">= ${:.0}", t.large_txn_threshold),
        Rule::VelocityHour => format!(">= {}/h", t.velocity_1h_limit),
        Rule::VelocityDay => format!(">= {}/24h", t.velocity_24h_limit),
        Rule::HighRiskCountry => format!("{} countries", t.high_risk_countries.len()),
        Rule::CountryMismatch => "origin != vendor".to_string(),
        Rule::AfterHoursCrypto => {
            format!("{:02}:00-{:02}:00", t.after_hours_start, t.after_hours_end)
        }
        Rule::RoundAmountNewVendor => format!(">= ${:.0}", t.round_amount_min),
        Rule::VendorRiskScore => format!(">= {:.2}", t.vendor_risk_high),
    }
}

fn cmd_config(config: &EngineConfig) -> anyhow::Result<()> {
    print!("{}", toml::to_string_pretty(config)?);
    Ok(())
}
