//! bllvm-attribution - payment failure attribution
//!
//! Reads a failed payment attempt (route, failure source, decoded failure) as
//! JSON and prints who is to blame, as consumed by the reputation store.

use anyhow::{Context, Result};
use bllvm_attribution::classifier::FailureClassifier;
use bllvm_attribution::scenario::Scenario;
use clap::Parser;
use std::io::Read;
use std::path::PathBuf;
use tracing::{error, info};

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Scenario JSON file (reads stdin when absent)
    #[arg(long)]
    scenario: Option<PathBuf>,

    /// Pretty-print the attribution result
    #[arg(long)]
    pretty: bool,
}

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    // Scenario path from args or environment
    let scenario_path = args
        .scenario
        .or_else(|| std::env::var("ATTRIBUTION_SCENARIO").ok().map(PathBuf::from));

    let input = match &scenario_path {
        Some(path) => {
            info!("Reading scenario from {:?}", path);
            std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read scenario {:?}", path))?
        }
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read scenario from stdin")?;
            buf
        }
    };

    let scenario: Scenario = serde_json::from_str(&input).context("Invalid scenario JSON")?;

    let classifier = FailureClassifier::new();
    let result = match scenario.classify(&classifier) {
        Ok(result) => result,
        Err(e) => {
            error!("Failed to classify scenario: {}", e);
            return Err(anyhow::anyhow!("Classification failed: {}", e));
        }
    };

    let output = if args.pretty {
        serde_json::to_string_pretty(&result)?
    } else {
        serde_json::to_string(&result)?
    };
    println!("{}", output);

    info!(
        "Attribution done (terminal={}, pairs={})",
        result.is_terminal(),
        result.pair_results.len()
    );
    Ok(())
}
