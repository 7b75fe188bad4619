//! bim Clocks Simulator CLI
//!
//! Runs the agent scenarios against in-memory collaborators.

use bim_sim::{ScenarioId, ScenarioResult, ScenarioRunner};
use clap::Parser;
use serde::Serialize;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

/// bim clocks agent scenario runner
#[derive(Parser, Debug)]
#[command(name = "bim-sim")]
#[command(about = "Run end-to-end scenarios for the bim clocks agent", long_about = None)]
struct Args {
    /// Master seed for the simulator offsets (0 = random from time)
    #[arg(short, long, default_value = "42")]
    seed: u64,

    /// Scenario to run (bootstrap_add, disable, mixed, renotify, malformed,
    /// simulator, time_change, withdraw_missing, bus_outage, burst, all)
    #[arg(short = 'S', long, default_value = "all")]
    scenario: String,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// JSON output for CI parsing
    #[arg(long)]
    json: bool,
}

/// `--json` summary of a run.
#[derive(Serialize)]
struct Summary<'a> {
    seed: u64,
    total: usize,
    passed: usize,
    failed: usize,
    results: &'a [ScenarioResult],
}

fn main() {
    let args = Args::parse();

    // Initialize logging
    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");

    let scenarios: Vec<ScenarioId> = if args.scenario == "all" {
        ScenarioId::all()
    } else {
        vec![args.scenario.parse().unwrap_or_else(|e| {
            eprintln!("Error: {}", e);
            let names: Vec<&str> = ScenarioId::all().iter().map(ScenarioId::name).collect();
            eprintln!("Available scenarios: {}, all", names.join(", "));
            std::process::exit(1);
        })]
    };

    let seed = if args.seed == 0 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(1)
    } else {
        args.seed
    };

    let runner = ScenarioRunner::new(seed);
    let results: Vec<ScenarioResult> = scenarios
        .iter()
        .map(|scenario| {
            let result = runner.run(*scenario);
            if !args.json {
                if result.passed {
                    info!("✓ {} - {}", scenario.name(), scenario.description());
                } else {
                    error!(
                        "✗ {} FAILED: {}",
                        scenario.name(),
                        result.failure_reason.as_deref().unwrap_or("unknown")
                    );
                }
            }
            result
        })
        .collect();

    let failed_count = results.iter().filter(|r| !r.passed).count();

    if args.json {
        let summary = Summary {
            seed,
            total: results.len(),
            passed: results.len() - failed_count,
            failed: failed_count,
            results: &results,
        };
        match serde_json::to_string_pretty(&summary) {
            Ok(text) => println!("{}", text),
            Err(e) => error!("Failed to render summary: {}", e),
        }
    } else if failed_count == 0 {
        info!("All {} scenarios passed (seed={})", results.len(), seed);
    } else {
        error!("{}/{} scenarios failed (seed={})", failed_count, results.len(), seed);
    }

    if failed_count > 0 {
        std::process::exit(1);
    }
}
