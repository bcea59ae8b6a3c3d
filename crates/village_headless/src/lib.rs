//! Headless village defense runner for balance runs and CI verification.
//!
//! This crate drives the [`village_core`] simulation without a window:
//!
//! - **Scenarios**: RON files (or built-ins) fixing configuration, starting
//!   stockpile and pre-placed structures
//! - **Batch runs**: many seeds in parallel, aggregated into a summary
//! - **Determinism checks**: the same seed replayed and hashed
//! - **Inspection**: turret balance tables and ASCII snapshots
//!
//! # Output
//!
//! - **stdout**: JSON results
//! - **stderr**: logs and human-readable summaries
//!
//! # Example
//!
//! ```bash
//! # One run of a built-in scenario
//! cargo run -p village_headless -- run --scenario defended --seed 7
//!
//! # Batch balance test
//! cargo run -p village_headless -- batch --scenario scenarios/default.ron --count 200
//!
//! # Verify determinism
//! cargo run -p village_headless -- verify --scenario defended --seed 1 --runs 5
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod ascii;
pub mod batch;
pub mod metrics;
pub mod runner;
pub mod scenario;
pub mod stats;

pub use ascii::{render_ascii, AsciiCanvas, AsciiConfig};
pub use batch::{run_batch, verify_determinism, BatchConfig, BatchResults, DeterminismReport};
pub use metrics::{BatchSummary, MetricsCollector, Outcome, RunMetrics};
pub use runner::{run_scenario, ScenarioRunner};
pub use scenario::{Placement, Scenario, ScenarioError};
pub use stats::{turret_table, TurretStats};
