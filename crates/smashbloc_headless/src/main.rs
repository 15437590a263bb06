//! Headless SmashBloc runner.
//!
//! # Usage
//!
//! ```bash
//! # Run the built-in skirmish
//! cargo run -p smashbloc_headless -- run
//!
//! # Run a scenario file with another seed
//! cargo run -p smashbloc_headless -- run --scenario scenarios/skirmish.ron --seed 7
//!
//! # Run a batch and save the results
//! cargo run -p smashbloc_headless -- batch --count 500 --output results/batch.json
//!
//! # Check a seed replays identically
//! cargo run -p smashbloc_headless -- verify --seed 12345 --runs 5
//! ```
//!
//! Reports are written to stdout as JSON; logs go to stderr.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use smashbloc_headless::batch::{run_batch, verify_determinism, BatchConfig};
use smashbloc_headless::runner::run_scenario;
use smashbloc_headless::scenario::Scenario;

/// Headless SmashBloc runner
#[derive(Parser)]
#[command(name = "smashbloc_headless")]
#[command(about = "Headless scenario runner for SmashBloc", long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single scenario and print its report
    Run {
        /// Scenario file (RON); defaults to the built-in skirmish
        #[arg(short, long)]
        scenario: Option<PathBuf>,

        /// Override the scenario's seed
        #[arg(long)]
        seed: Option<u64>,

        /// Override the number of ticks
        #[arg(short, long)]
        ticks: Option<u64>,
    },

    /// Run a scenario across many seeds
    Batch {
        /// Scenario file (RON); defaults to the built-in skirmish
        #[arg(short, long)]
        scenario: Option<PathBuf>,

        /// Number of runs
        #[arg(short, long, default_value = "100")]
        count: u32,

        /// Parallel runs (0 = auto)
        #[arg(short, long, default_value = "0")]
        parallel: u32,

        /// Starting seed
        #[arg(long, default_value = "0")]
        seed: u64,

        /// Save full results to this JSON file instead of printing the summary
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Verify determinism by running the same seed several times
    Verify {
        /// Scenario file (RON); defaults to the built-in skirmish
        #[arg(short, long)]
        scenario: Option<PathBuf>,

        /// Seed to verify
        #[arg(long, default_value = "12345")]
        seed: u64,

        /// Number of verification runs
        #[arg(short, long, default_value = "5")]
        runs: u32,
    },
}

fn main() {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries JSON
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(true),
        )
        .with(filter)
        .init();

    match cli.command {
        Some(Commands::Run {
            scenario,
            seed,
            ticks,
        }) => cmd_run(scenario, seed, ticks),
        Some(Commands::Batch {
            scenario,
            count,
            parallel,
            seed,
            output,
        }) => cmd_batch(scenario, count, parallel, seed, output),
        Some(Commands::Verify {
            scenario,
            seed,
            runs,
        }) => cmd_verify(scenario, seed, runs),
        None => cmd_run(None, None, None),
    }
}

/// Load a scenario file, or fall back to the built-in skirmish.
fn load_scenario(path: Option<&PathBuf>) -> Scenario {
    let Some(path) = path else {
        return Scenario::skirmish();
    };
    match Scenario::load(path) {
        Ok(scenario) => {
            tracing::info!("Loaded scenario '{}' from {}", scenario.name, path.display());
            scenario
        }
        Err(e) => {
            tracing::error!("{}", e);
            std::process::exit(2);
        }
    }
}

fn print_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{json}"),
        Err(e) => {
            tracing::error!("Failed to serialize output: {}", e);
            std::process::exit(1);
        }
    }
}

/// Run one scenario
fn cmd_run(scenario: Option<PathBuf>, seed: Option<u64>, ticks: Option<u64>) {
    let mut scenario = load_scenario(scenario.as_ref());
    if let Some(seed) = seed {
        scenario.config.seed = seed;
    }
    if let Some(ticks) = ticks {
        scenario.ticks = ticks;
    }

    match run_scenario(&scenario) {
        Ok(report) => print_json(&report),
        Err(e) => {
            tracing::error!("Scenario failed: {}", e);
            std::process::exit(1);
        }
    }
}

/// Run a batch of seeds
fn cmd_batch(
    scenario_path: Option<PathBuf>,
    count: u32,
    parallel: u32,
    seed: u64,
    output: Option<PathBuf>,
) {
    let scenario = load_scenario(scenario_path.as_ref());
    let mut config = BatchConfig::new(count).with_seed(seed);
    config.parallel_runs = parallel;
    if let Some(path) = scenario_path {
        config = config.with_scenario_path(path);
    }

    let results = run_batch(&scenario, config);

    match output {
        Some(path) => {
            if let Err(e) = results.save(&path) {
                tracing::error!("Failed to save results to {}: {}", path.display(), e);
                std::process::exit(1);
            }
            tracing::info!("Results saved to {}", path.display());
        }
        None => print_json(&results.summary),
    }

    if !results.errors.is_empty() {
        std::process::exit(1);
    }
}

/// Verify determinism for one seed
fn cmd_verify(scenario: Option<PathBuf>, seed: u64, runs: u32) {
    let scenario = load_scenario(scenario.as_ref());
    tracing::info!(
        "Verifying determinism: {} with seed {} ({} runs)",
        scenario.name,
        seed,
        runs
    );

    if verify_determinism(&scenario, seed, runs) {
        eprintln!("PASS: All {runs} runs produced identical results");
    } else {
        eprintln!("FAIL: Non-determinism detected!");
        std::process::exit(1);
    }
}
