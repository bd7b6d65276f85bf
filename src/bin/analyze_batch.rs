//! Analyze Batch - one-shot swap forensics worker
//!
//! Reads a job file, runs the analysis engine and prints the report JSON.
//!
//! ## Usage
//!
//! ```bash
//! cargo run --release --bin analyze_batch -- job.json [--output report.json] [--compact]
//! ```
//!
//! The job file is either an array of swap records or
//! `{ "swaps": [...], "pool": {...}, "walletProfiles": [...], "history": {...} }`.
//!
//! ## Environment Variables
//!
//! - POOLFLOW_TOP_WALLETS - Size of the top wallet / trader lists (default: 10)
//! - POOLFLOW_PARALLEL_DETECTORS - Run detectors on all cores (default: true)
//! - POOLFLOW_MAX_FINDINGS_IN_NARRATIVE - Findings named in the narrative (default: 5)
//! - RUST_LOG - Logging level (optional, default: info)

use poolflow::job_file::{load_job, render_report, save_report};
use poolflow::config::load_environment;
use poolflow::{AnalysisEngine, EngineConfig};
use std::env;
use std::path::PathBuf;

#[derive(Debug)]
struct BatchArgs {
    input: PathBuf,
    output: Option<PathBuf>,
    compact: bool,
}

fn parse_args() -> Result<BatchArgs, String> {
    let args: Vec<String> = env::args().skip(1).collect();
    let mut input = None;
    let mut output = None;
    let mut compact = false;

    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--output" | "-o" => {
                let path = iter.next().ok_or("--output requires a path")?;
                output = Some(PathBuf::from(path));
            }
            "--compact" => compact = true,
            flag if flag.starts_with('-') => return Err(format!("unknown flag {}", flag)),
            path => input = Some(PathBuf::from(path)),
        }
    }

    Ok(BatchArgs {
        input: input.ok_or("usage: analyze_batch <job.json> [--output <path>] [--compact]")?,
        output,
        compact,
    })
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    load_environment(None).init();

    let args = parse_args()?;
    let config = EngineConfig::from_env();

    log::info!("Analyzing {}", args.input.display());
    log::info!("   Top wallets: {}", config.top_wallets);
    log::info!("   Parallel detectors: {}", config.parallel_detectors);

    let payload = load_job(&args.input)?;
    let engine = AnalysisEngine::new(config);
    let report = engine.analyze_value(&payload)?;

    log::info!(
        "{} swaps, {} findings, risk {} ({})",
        report.summary.total_transactions,
        report.summary.findings.len(),
        report.risk.total_score,
        report.risk.tier.as_str()
    );
    for skipped in &report.skipped_detectors {
        log::warn!("   skipped {}: {}", skipped.name, skipped.reason);
    }

    match &args.output {
        Some(path) => save_report(&report, path, args.compact)?,
        None => println!("{}", render_report(&report, args.compact)?),
    }

    Ok(())
}
