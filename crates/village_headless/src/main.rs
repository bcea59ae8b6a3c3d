//! Headless village defense runner.
//!
//! # Usage
//!
//! ```bash
//! # Run one seed and print its metrics as JSON
//! cargo run -p village_headless -- run --scenario defended --seed 7
//!
//! # Run a batch balance test
//! cargo run -p village_headless -- batch --scenario economy --count 500 --output results/
//!
//! # Summarize saved batch results
//! cargo run -p village_headless -- summary --input results/batch_results.json
//!
//! # Verify determinism
//! cargo run -p village_headless -- verify --scenario defended --seed 1 --runs 5
//!
//! # Turret balance table
//! cargo run -p village_headless -- stats
//!
//! # ASCII snapshot after 90 simulated seconds
//! cargo run -p village_headless -- view --scenario defended --seconds 90
//! ```
//!
//! JSON goes to stdout, logs and summaries to stderr.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use village_core::config::SimConfig;
use village_headless::{
    ascii::{render_ascii, AsciiConfig},
    batch::{run_batch, verify_determinism, BatchConfig, BatchResults},
    metrics::BatchSummary,
    runner::{run_scenario, ScenarioRunner},
    scenario::Scenario,
    stats::{format_table, turret_table},
};

#[derive(Parser)]
#[command(name = "village_headless")]
#[command(about = "Headless village defense runner for balance runs and CI")]
#[command(version)]
struct Cli {
    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single seed and print its metrics
    Run {
        /// Built-in scenario name or RON file
        #[arg(short, long, default_value = "default")]
        scenario: String,

        /// Random seed
        #[arg(long, default_value = "0")]
        seed: u64,

        /// Configuration RON file replacing the scenario's
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Simulated seconds (overrides the scenario duration)
        #[arg(long)]
        seconds: Option<f64>,
    },

    /// Run a batch of seeds for balance testing
    Batch {
        /// Built-in scenario name or RON file
        #[arg(short, long, default_value = "default")]
        scenario: String,

        /// Number of runs
        #[arg(short, long, default_value = "100")]
        count: u32,

        /// Maximum parallel runs (0 = auto)
        #[arg(short, long, default_value = "0")]
        parallel: u32,

        /// Output directory for results
        #[arg(short, long, default_value = "results")]
        output: PathBuf,

        /// Starting random seed
        #[arg(long, default_value = "0")]
        seed: u64,
    },

    /// Print the summary of saved batch results
    Summary {
        /// Batch results JSON file
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Verify determinism by replaying one seed
    Verify {
        /// Built-in scenario name or RON file
        #[arg(short, long, default_value = "defended")]
        scenario: String,

        /// Random seed
        #[arg(long, default_value = "12345")]
        seed: u64,

        /// Number of runs to compare
        #[arg(short, long, default_value = "3")]
        runs: u32,
    },

    /// Print the turret balance table
    Stats {
        /// Configuration RON file (defaults otherwise)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Print JSON instead of a text table
        #[arg(long)]
        json: bool,
    },

    /// Render an ASCII snapshot of a run
    View {
        /// Built-in scenario name or RON file
        #[arg(short, long, default_value = "defended")]
        scenario: String,

        /// Random seed
        #[arg(long, default_value = "0")]
        seed: u64,

        /// Simulated seconds before the snapshot
        #[arg(long, default_value = "60")]
        seconds: f64,

        /// Grid width
        #[arg(long, default_value = "80")]
        width: usize,

        /// Grid height
        #[arg(long, default_value = "24")]
        height: usize,

        /// Disable ANSI colors
        #[arg(long)]
        no_color: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries JSON
    let log_level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(true),
        )
        .with(tracing_subscriber::filter::LevelFilter::from_level(
            log_level,
        ))
        .init();

    match cli.command {
        Some(Commands::Run {
            scenario,
            seed,
            config,
            seconds,
        }) => cmd_run(&scenario, seed, config.as_deref(), seconds),
        Some(Commands::Batch {
            scenario,
            count,
            parallel,
            output,
            seed,
        }) => cmd_batch(scenario, count, parallel, output, seed),
        Some(Commands::Summary { input }) => cmd_summary(&input),
        Some(Commands::Verify {
            scenario,
            seed,
            runs,
        }) => cmd_verify(&scenario, seed, runs),
        Some(Commands::Stats { config, json }) => cmd_stats(config.as_deref(), json),
        Some(Commands::View {
            scenario,
            seed,
            seconds,
            width,
            height,
            no_color,
        }) => cmd_view(&scenario, seed, seconds, width, height, no_color),
        None => cmd_run("default", 0, None, None),
    }
}

fn load_scenario(name: &str) -> Scenario {
    match Scenario::resolve(name) {
        Ok(scenario) => scenario,
        Err(e) => {
            eprintln!("FATAL: {e}");
            std::process::exit(1);
        }
    }
}

fn print_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{json}"),
        Err(e) => {
            eprintln!("FATAL: Failed to encode JSON: {e}");
            std::process::exit(1);
        }
    }
}

fn load_config(path: &Path) -> SimConfig {
    match SimConfig::load(path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("FATAL: {e}");
            std::process::exit(1);
        }
    }
}

/// Run one seed
fn cmd_run(scenario: &str, seed: u64, config: Option<&Path>, seconds: Option<f64>) {
    let mut scenario = load_scenario(scenario);
    if let Some(path) = config {
        scenario.config = load_config(path);
    }
    if let Some(seconds) = seconds {
        scenario.duration_seconds = seconds;
    }
    tracing::info!(
        scenario = %scenario.name,
        seed,
        duration = scenario.duration_seconds,
        "Starting run"
    );

    match run_scenario(&scenario, seed) {
        Ok(metrics) => print_json(&metrics),
        Err(e) => {
            eprintln!("FATAL: {e}");
            std::process::exit(1);
        }
    }
}

/// Run a batch balance test
fn cmd_batch(scenario: String, count: u32, parallel: u32, output: PathBuf, seed: u64) {
    tracing::info!(
        scenario = %scenario,
        count,
        parallel,
        seed,
        output = %output.display(),
        "Batch configuration"
    );

    let config = BatchConfig {
        scenario,
        run_count: count,
        parallel_runs: parallel,
        output_dir: output.clone(),
        seed_start: seed,
    };

    let results = match run_batch(config) {
        Ok(results) => results,
        Err(e) => {
            eprintln!("FATAL: {e}");
            std::process::exit(1);
        }
    };

    let results_path = output.join("batch_results.json");
    if let Err(e) = results.save(&results_path) {
        tracing::error!(error = %e, path = %results_path.display(), "Failed to save results");
        eprintln!("FATAL: Failed to save results: {e}");
        std::process::exit(1);
    }

    eprintln!(
        "\n{} runs of '{}' in {:.1}s",
        results.runs.len(),
        results.config.scenario,
        results.duration_seconds
    );
    print_summary(&results.summary);

    if !results.errors.is_empty() {
        eprintln!("\n{} runs failed to start:", results.errors.len());
        for error in results.errors.iter().take(10) {
            eprintln!("  seed {} (run {}): {}", error.seed, error.run_index, error.message);
        }
    }

    eprintln!("\nResults saved to: {}", results_path.display());
}

/// Summarize saved batch results
fn cmd_summary(input: &Path) {
    tracing::info!(path = %input.display(), "loading batch results");
    let results = match BatchResults::load(input) {
        Ok(results) => results,
        Err(e) => {
            eprintln!("Failed to load results: {e}");
            std::process::exit(1);
        }
    };
    eprintln!("Scenario: {}", results.config.scenario);
    print_summary(&results.summary);
    print_json(&results.summary);
}

fn print_summary(summary: &BatchSummary) {
    eprintln!(
        "Survival: {}/{} ({:.1}%)",
        summary.survived,
        summary.total_runs,
        summary.survival_rate * 100.0
    );
    eprintln!(
        "Waves: avg {:.2}, min {}, max {}",
        summary.avg_wave, summary.min_wave, summary.max_wave
    );
    eprintln!("Enemies killed per run: {:.1}", summary.avg_enemies_killed);
    if !summary.avg_kills_by_turret.is_empty() {
        eprintln!("\nKills per run by turret:");
        for (kind, kills) in &summary.avg_kills_by_turret {
            eprintln!("  {kind}: {kills:.2}");
        }
    }
    if !summary.round_counts.is_empty() {
        eprintln!("\nRounds chosen:");
        for (round, count) in &summary.round_counts {
            eprintln!("  {round}: {count}");
        }
    }
}

/// Verify determinism
fn cmd_verify(scenario: &str, seed: u64, runs: u32) {
    let scenario = load_scenario(scenario);
    tracing::info!(scenario = %scenario.name, seed, runs, "replaying seed");

    match verify_determinism(&scenario, seed, runs) {
        Ok(report) if report.is_deterministic() => {
            eprintln!("seed {seed}: {runs} replays agree");
            print_json(&report);
        }
        Ok(report) => {
            eprintln!("seed {seed}: replays disagree");
            print_json(&report);
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("FATAL: {e}");
            std::process::exit(1);
        }
    }
}

/// Print turret balance numbers
fn cmd_stats(config: Option<&Path>, json: bool) {
    let config = config.map_or_else(SimConfig::default, load_config);
    let rows = turret_table(&config);
    if json {
        print_json(&rows);
    } else {
        print!("{}", format_table(&rows));
    }
}

/// Render an ASCII snapshot
fn cmd_view(scenario: &str, seed: u64, seconds: f64, width: usize, height: usize, no_color: bool) {
    let scenario = Scenario {
        duration_seconds: seconds,
        ..load_scenario(scenario)
    };
    let mut runner = match ScenarioRunner::new(&scenario, seed) {
        Ok(runner) => runner,
        Err(e) => {
            eprintln!("FATAL: {e}");
            std::process::exit(1);
        }
    };
    runner.run();

    let config = AsciiConfig {
        width,
        height,
        show_legend: true,
        use_color: !no_color,
    };
    print!("{}", render_ascii(runner.simulation(), &config));
}
