//! Headless scenario runner for SmashBloc.
//!
//! Drives the simulation core without a renderer or physics engine so that
//! matches can be replayed in CI and swept across seeds:
//!
//! - **Scenarios**: RON files describing teams, cities, units and a script
//!   of actions ([`scenario`])
//! - **Runs**: one scenario against an in-memory physics arena, summarized
//!   as a JSON report ([`runner`])
//! - **Batches**: many seeds in parallel with aggregate statistics
//!   ([`batch`])
//!
//! # Output
//!
//! - **stdout**: JSON reports
//! - **stderr**: logs (human-readable)
//!
//! # Example
//!
//! ```bash
//! # Run one scenario
//! cargo run -p smashbloc_headless -- run --scenario crates/smashbloc_headless/scenarios/skirmish.ron
//!
//! # Sweep 200 seeds
//! cargo run -p smashbloc_headless -- batch --count 200 --output results/batch.json
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod batch;
pub mod runner;
pub mod scenario;

pub use batch::{run_batch, BatchConfig, BatchResults, BatchSummary};
pub use runner::{run_scenario, ArenaPhysics, RunReport, ScenarioRunner};
pub use scenario::{Scenario, ScenarioError};
