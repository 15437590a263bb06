//! Batch scenario runner.
//!
//! Runs one scenario across many seeds in parallel using rayon. Worlds are
//! single-threaded, so every job builds its own from the shared scenario.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::runner::{run_scenario, RunReport};
use crate::scenario::Scenario;

/// Configuration for a batch run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Path of the scenario file, if it came from disk
    pub scenario_path: Option<PathBuf>,
    /// Number of runs
    pub run_count: u32,
    /// Maximum parallel runs (0 = use rayon default)
    pub parallel_runs: u32,
    /// Seed of the first run; run `i` uses `seed_start + i`
    pub seed_start: u64,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            scenario_path: None,
            run_count: 100,
            parallel_runs: 0,
            seed_start: 0,
        }
    }
}

impl BatchConfig {
    /// Create config for a number of runs
    pub fn new(run_count: u32) -> Self {
        Self {
            run_count,
            ..Default::default()
        }
    }

    /// Set seed start
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed_start = seed;
        self
    }

    /// Record where the scenario was loaded from
    pub fn with_scenario_path(mut self, path: PathBuf) -> Self {
        self.scenario_path = Some(path);
        self
    }
}

/// Aggregate statistics over a batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Runs that completed.
    pub runs: u32,
    /// Runs each team finished holding the most cities.
    pub leads: BTreeMap<String, u32>,
    /// Runs with no single leader.
    pub ties: u32,
    /// Mean captures per run.
    pub mean_captures: f64,
    /// Mean mobile units destroyed per run.
    pub mean_units_destroyed: f64,
    /// Distinct final state hashes.
    pub distinct_outcomes: usize,
}

impl BatchSummary {
    /// Summarize completed runs.
    pub fn from_reports(reports: &[RunReport]) -> Self {
        let mut summary = Self {
            runs: u32::try_from(reports.len()).unwrap_or(u32::MAX),
            ..Self::default()
        };
        if reports.is_empty() {
            return summary;
        }

        for report in reports {
            match report.leader() {
                Some(team) => *summary.leads.entry(team.to_string()).or_insert(0) += 1,
                None => summary.ties += 1,
            }
        }

        let count = reports.len() as f64;
        summary.mean_captures = reports.iter().map(|r| r.captures.len() as f64).sum::<f64>() / count;
        summary.mean_units_destroyed =
            reports.iter().map(|r| f64::from(r.units_destroyed)).sum::<f64>() / count;

        let mut hashes: Vec<u64> = reports.iter().map(|r| r.state_hash).collect();
        hashes.sort_unstable();
        hashes.dedup();
        summary.distinct_outcomes = hashes.len();

        summary
    }
}

/// Results from a batch run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResults {
    /// Configuration used
    pub config: BatchConfig,
    /// Scenario name
    pub scenario: String,
    /// Individual run reports, in seed order
    pub reports: Vec<RunReport>,
    /// Aggregate summary
    pub summary: BatchSummary,
    /// Total runtime
    pub duration_seconds: f64,
    /// Errors encountered
    pub errors: Vec<BatchError>,
}

impl BatchResults {
    /// Save results to JSON file
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }

    /// Load results from JSON file
    pub fn load(path: &Path) -> std::io::Result<Self> {
        let json = std::fs::read_to_string(path)?;
        serde_json::from_str(&json).map_err(std::io::Error::other)
    }
}

/// Error during batch run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchError {
    /// Run index
    pub run_index: u32,
    /// Seed used
    pub seed: u64,
    /// Error message
    pub message: String,
}

/// Run `scenario` once per seed in parallel.
pub fn run_batch(scenario: &Scenario, config: BatchConfig) -> BatchResults {
    let start = Instant::now();

    info!(
        scenario = %scenario.name,
        runs = config.run_count,
        seed_start = config.seed_start,
        "Starting batch"
    );

    if config.parallel_runs > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(config.parallel_runs as usize)
            .build_global()
            .ok(); // Ignore if already set
    }

    let results: Vec<Result<RunReport, BatchError>> = (0..config.run_count)
        .into_par_iter()
        .map(|i| {
            let seed = config.seed_start.wrapping_add(u64::from(i));
            match run_scenario(&scenario.with_seed(seed)) {
                Ok(report) => {
                    debug!(run = i, seed, captures = report.captures.len(), "Run complete");
                    Ok(report)
                }
                Err(e) => {
                    warn!("Run {} failed: {}", i, e);
                    Err(BatchError {
                        run_index: i,
                        seed,
                        message: e.to_string(),
                    })
                }
            }
        })
        .collect();

    let (reports, errors): (Vec<_>, Vec<_>) = results.into_iter().partition(Result::is_ok);
    let reports: Vec<RunReport> = reports.into_iter().filter_map(Result::ok).collect();
    let errors: Vec<BatchError> = errors.into_iter().filter_map(Result::err).collect();

    let summary = BatchSummary::from_reports(&reports);
    let duration_seconds = start.elapsed().as_secs_f64();

    info!(
        "Batch complete: {} runs in {:.1}s ({} failed)",
        reports.len(),
        duration_seconds,
        errors.len()
    );

    BatchResults {
        config,
        scenario: scenario.name.clone(),
        reports,
        summary,
        duration_seconds,
        errors,
    }
}

/// Run the same seed `runs` times and check every report matches.
pub fn verify_determinism(scenario: &Scenario, seed: u64, runs: u32) -> bool {
    let scenario = scenario.with_seed(seed);
    let hashes: Vec<Option<u64>> = (0..runs)
        .into_par_iter()
        .map(|_| run_scenario(&scenario).ok().map(|report| report.state_hash))
        .collect();

    let deterministic = hashes.iter().all(Option::is_some) && hashes.windows(2).all(|w| w[0] == w[1]);
    if !deterministic {
        warn!(seed, ?hashes, "Scenario diverged between runs");
    }
    deterministic
}
