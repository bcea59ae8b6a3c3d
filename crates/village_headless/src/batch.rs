//! Many seeds of one scenario, run in parallel with rayon.
//!
//! Run `i` of a batch uses seed `seed_start + i`, so a batch is reproducible
//! from its [`BatchConfig`] alone.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Instant;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::metrics::{BatchSummary, Outcome, RunMetrics};
use crate::runner::run_scenario;
use crate::scenario::{Scenario, ScenarioError};

/// Runs between progress log lines.
const LOG_EVERY: u32 = 50;

/// What to run and where to put the results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Built-in scenario name or RON path.
    pub scenario: String,
    /// Seeds to run.
    pub run_count: u32,
    /// Worker threads; 0 lets rayon decide.
    pub parallel_runs: u32,
    /// Directory the caller saves results into.
    pub output_dir: PathBuf,
    /// Seed of run 0.
    pub seed_start: u64,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self::new("default", 100)
    }
}

impl BatchConfig {
    /// `run_count` seeds of `scenario`, starting at seed 0.
    #[must_use]
    pub fn new(scenario: &str, run_count: u32) -> Self {
        Self {
            scenario: scenario.to_owned(),
            run_count,
            parallel_runs: 0,
            output_dir: PathBuf::from("results"),
            seed_start: 0,
        }
    }

    /// Replace the output directory.
    #[must_use]
    pub fn with_output(self, output_dir: PathBuf) -> Self {
        Self { output_dir, ..self }
    }

    /// Replace the first seed.
    #[must_use]
    pub fn with_seed(self, seed_start: u64) -> Self {
        Self { seed_start, ..self }
    }

    fn seed_of(&self, run_index: u32) -> u64 {
        self.seed_start.wrapping_add(u64::from(run_index))
    }
}

/// Everything a batch produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResults {
    /// The configuration that produced these results.
    pub config: BatchConfig,
    /// Completed runs, in seed order.
    pub runs: Vec<RunMetrics>,
    /// Aggregate over `runs`.
    pub summary: BatchSummary,
    /// Wall-clock seconds for the whole batch.
    pub duration_seconds: f64,
    /// Runs whose scenario failed to build.
    pub errors: Vec<BatchError>,
}

impl BatchResults {
    /// Write as pretty JSON, creating missing parent directories.
    ///
    /// # Errors
    ///
    /// Returns an I/O error when the file cannot be created or written.
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)?;
        }
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(writer, self).map_err(std::io::Error::other)
    }

    /// Read results written by [`BatchResults::save`].
    ///
    /// # Errors
    ///
    /// Returns an I/O error when the file is missing or is not valid results JSON.
    pub fn load(path: &Path) -> std::io::Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        serde_json::from_reader(reader).map_err(std::io::Error::other)
    }
}

/// A seed whose run never started.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchError {
    /// Index within the batch.
    pub run_index: u32,
    /// Seed of that run.
    pub seed: u64,
    /// Why the scenario could not be built.
    pub message: String,
}

/// Running totals updated from the worker threads.
#[derive(Debug)]
struct Tally {
    planned: u32,
    finished: AtomicU32,
    house_stood: AtomicU32,
    started: Instant,
}

impl Tally {
    fn new(planned: u32) -> Self {
        Self {
            planned,
            finished: AtomicU32::new(0),
            house_stood: AtomicU32::new(0),
            started: Instant::now(),
        }
    }

    /// Count one finished run; returns how many have finished so far.
    fn finish(&self, outcome: Outcome) -> u32 {
        if outcome == Outcome::Survived {
            self.house_stood.fetch_add(1, Ordering::Relaxed);
        }
        self.finished.fetch_add(1, Ordering::Relaxed) + 1
    }

    fn survival_rate(&self) -> f64 {
        match self.finished.load(Ordering::Relaxed) {
            0 => 0.0,
            n => f64::from(self.house_stood.load(Ordering::Relaxed)) / f64::from(n),
        }
    }

    /// Seconds left if the remaining runs take as long as the finished ones.
    fn remaining_seconds(&self) -> f64 {
        let finished = self.finished.load(Ordering::Relaxed);
        if finished == 0 {
            return 0.0;
        }
        let left = self.planned.saturating_sub(finished);
        self.started.elapsed().as_secs_f64() * f64::from(left) / f64::from(finished)
    }

    fn log(&self, finished: u32) {
        info!(
            finished,
            planned = self.planned,
            survival = format_args!("{:.1}%", self.survival_rate() * 100.0),
            remaining = format_args!("{:.0}s", self.remaining_seconds()),
            "batch progress"
        );
    }
}

/// Run every seed of the batch.
///
/// # Errors
///
/// Returns an error when the scenario cannot be resolved or the worker pool
/// cannot be created. Runs that fail individually end up in
/// [`BatchResults::errors`].
pub fn run_batch(config: BatchConfig) -> Result<BatchResults, ScenarioError> {
    let scenario = Scenario::resolve(&config.scenario)?;
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.parallel_runs as usize)
        .build()
        .map_err(|e| ScenarioError::Invalid(format!("worker pool: {e}")))?;
    let tally = Tally::new(config.run_count);
    info!(scenario = %scenario.name, runs = config.run_count, seed_start = config.seed_start, "batch started");

    let outcomes: Vec<Result<RunMetrics, BatchError>> = pool.install(|| {
        (0..config.run_count)
            .into_par_iter()
            .map(|run_index| {
                let seed = config.seed_of(run_index);
                let metrics = run_scenario(&scenario, seed).map_err(|e| {
                    warn!(run_index, seed, error = %e, "run failed");
                    BatchError {
                        run_index,
                        seed,
                        message: e.to_string(),
                    }
                })?;
                let finished = tally.finish(metrics.outcome);
                debug!(seed, wave = metrics.wave_reached, outcome = ?metrics.outcome, "run finished");
                if finished % LOG_EVERY == 0 {
                    tally.log(finished);
                }
                Ok(metrics)
            })
            .collect()
    });

    let mut runs = Vec::with_capacity(outcomes.len());
    let mut errors = Vec::new();
    for outcome in outcomes {
        match outcome {
            Ok(metrics) => runs.push(metrics),
            Err(error) => errors.push(error),
        }
    }

    let summary = BatchSummary::from_runs(&runs);
    let duration_seconds = tally.started.elapsed().as_secs_f64();
    info!(
        completed = runs.len(),
        failed = errors.len(),
        seconds = format_args!("{duration_seconds:.1}"),
        survival = format_args!("{:.1}%", summary.survival_rate * 100.0),
        "batch finished"
    );

    Ok(BatchResults {
        config,
        runs,
        summary,
        duration_seconds,
        errors,
    })
}

/// Final hashes from replaying one seed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeterminismReport {
    /// Scenario name.
    pub scenario: String,
    /// Seed shared by every replay.
    pub seed: u64,
    /// Final state hash of each replay.
    pub final_hashes: Vec<u64>,
}

impl DeterminismReport {
    /// True when every replay ended in the same state.
    #[must_use]
    pub fn is_deterministic(&self) -> bool {
        self.final_hashes
            .iter()
            .all(|h| Some(h) == self.final_hashes.first())
    }
}

/// Replay `seed` of `scenario` `runs` times on the rayon pool.
///
/// # Errors
///
/// Returns the first build failure of the scenario.
pub fn verify_determinism(
    scenario: &Scenario,
    seed: u64,
    runs: u32,
) -> Result<DeterminismReport, ScenarioError> {
    let final_hashes = (0..runs)
        .into_par_iter()
        .map(|_| run_scenario(scenario, seed).map(|m| m.final_state_hash))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(DeterminismReport {
        scenario: scenario.name.clone(),
        seed,
        final_hashes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_scenario(dir: &Path, seconds: f64) -> String {
        let path = dir.join("brief.ron");
        std::fs::write(
            &path,
            format!("(name: \"brief\", duration_seconds: {seconds:?})"),
        )
        .unwrap();
        path.to_str().unwrap().to_owned()
    }

    // =========================================================================
    // Configuration
    // =========================================================================

    #[test]
    fn test_default_config_runs_default_scenario() {
        let config = BatchConfig::default();
        assert_eq!(config.scenario, "default");
        assert_eq!(config.parallel_runs, 0);
        assert_eq!(config.seed_of(0), 0);
    }

    #[test]
    fn test_builder_sets_seed_and_output() {
        let config = BatchConfig::new("economy", 40)
            .with_seed(900)
            .with_output(PathBuf::from("out/economy"));
        assert_eq!(config.run_count, 40);
        assert_eq!(config.output_dir, PathBuf::from("out/economy"));
        assert_eq!(config.seed_of(39), 939);
    }

    #[test]
    fn test_seeds_wrap_at_u64_max() {
        let config = BatchConfig::new("default", 2).with_seed(u64::MAX);
        assert_eq!(config.seed_of(1), 0);
    }

    // =========================================================================
    // Tally
    // =========================================================================

    #[test]
    fn test_tally_counts_survivors() {
        let tally = Tally::new(8);
        assert_eq!(tally.survival_rate(), 0.0);
        assert_eq!(tally.remaining_seconds(), 0.0);

        assert_eq!(tally.finish(Outcome::Survived), 1);
        assert_eq!(tally.finish(Outcome::HouseDestroyed), 2);
        assert_eq!(tally.finish(Outcome::Survived), 3);
        assert_eq!(tally.finish(Outcome::Survived), 4);

        assert!((tally.survival_rate() - 0.75).abs() < 1e-12);
    }

    // =========================================================================
    // Running
    // =========================================================================

    #[test]
    fn test_batch_covers_consecutive_seeds() {
        let dir = tempfile::tempdir().unwrap();
        let config = BatchConfig::new(&write_scenario(dir.path(), 3.0), 5).with_seed(20);
        let results = run_batch(config).unwrap();

        assert!(results.errors.is_empty());
        assert_eq!(results.summary.total_runs, 5);
        let mut seeds: Vec<u64> = results.runs.iter().map(|r| r.seed).collect();
        seeds.sort_unstable();
        assert_eq!(seeds, (20..25).collect::<Vec<_>>());
    }

    #[test]
    fn test_single_thread_pool_matches_default_pool() {
        let dir = tempfile::tempdir().unwrap();
        let scenario = write_scenario(dir.path(), 2.0);
        let threaded = run_batch(BatchConfig::new(&scenario, 3)).unwrap();
        let serial = run_batch(BatchConfig {
            parallel_runs: 1,
            ..BatchConfig::new(&scenario, 3)
        })
        .unwrap();
        let hashes = |r: &BatchResults| {
            let mut h: Vec<(u64, u64)> = r.runs.iter().map(|m| (m.seed, m.final_state_hash)).collect();
            h.sort_unstable();
            h
        };
        assert_eq!(hashes(&threaded), hashes(&serial));
    }

    #[test]
    fn test_unresolvable_scenario_is_an_error() {
        assert!(matches!(
            run_batch(BatchConfig::new("nowhere/at/all.ron", 1)),
            Err(ScenarioError::FileNotFound(_) | ScenarioError::UnknownScenario(_))
        ));
    }

    #[test]
    fn test_results_survive_json_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let results = run_batch(BatchConfig::new(&write_scenario(dir.path(), 2.0), 2)).unwrap();

        let out = dir.path().join("nested").join("batch_results.json");
        results.save(&out).unwrap();
        let loaded = BatchResults::load(&out).unwrap();

        assert_eq!(loaded.config.scenario, results.config.scenario);
        assert_eq!(loaded.summary.total_runs, 2);
        assert!(loaded
            .runs
            .iter()
            .zip(&results.runs)
            .all(|(a, b)| a.final_state_hash == b.final_state_hash));
    }

    #[test]
    fn test_loading_missing_results_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(BatchResults::load(&dir.path().join("absent.json")).is_err());
    }

    // =========================================================================
    // Determinism report
    // =========================================================================

    #[test]
    fn test_defended_seed_replays_identically() {
        let scenario = Scenario {
            duration_seconds: 10.0,
            ..Scenario::defended()
        };
        let report = verify_determinism(&scenario, 4242, 3).unwrap();
        assert_eq!(report.final_hashes.len(), 3);
        assert!(report.is_deterministic());
    }

    #[test]
    fn test_report_flags_mismatch() {
        let report = DeterminismReport {
            scenario: "default".into(),
            seed: 1,
            final_hashes: vec![9, 9, 8],
        };
        assert!(!report.is_deterministic());
    }
}
