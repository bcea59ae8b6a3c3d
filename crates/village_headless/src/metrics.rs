//! Run metrics collection for balance analysis.
//!
//! [`MetricsCollector`] folds the per-step [`TickEvents`] of one run into a
//! [`RunMetrics`] record; [`BatchSummary`] aggregates many records.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use village_core::components::EntityKind;
use village_core::economy::Inventory;
use village_core::simulation::{GameState, Simulation, TickEvents};

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// The duration elapsed with the house standing.
    Survived,
    /// The house fell.
    HouseDestroyed,
}

/// Complete metrics for a single run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunMetrics {
    /// Scenario name.
    pub scenario: String,
    /// Random seed used.
    pub seed: u64,
    /// Steps simulated.
    pub ticks: u64,
    /// Simulated seconds.
    pub simulated_seconds: f64,
    /// How the run ended.
    pub outcome: Outcome,
    /// Wave reached.
    pub wave_reached: u32,
    /// Enemies spawned by the scheduler.
    pub enemies_spawned: u32,
    /// Enemies removed with no health left.
    pub enemies_killed: u32,
    /// Kills credited per turret kind.
    pub kills_by_turret: BTreeMap<String, u32>,
    /// Materials credited to the player.
    pub gathered: Inventory,
    /// Damage applied to enemies.
    pub damage_to_enemies: f64,
    /// Damage applied to the house.
    pub damage_to_house: f64,
    /// Round ids in the order they were chosen.
    pub rounds: Vec<String>,
    /// House health at the end.
    pub house_health: f64,
    /// Turrets and buildings standing at the end.
    pub structures: usize,
    /// Final simulation state hash (for determinism validation).
    pub final_state_hash: u64,
}

/// Accumulates [`TickEvents`] for one run.
#[derive(Debug, Clone)]
pub struct MetricsCollector {
    scenario: String,
    seed: u64,
    enemies_spawned: u32,
    enemies_killed: u32,
    gathered: Inventory,
    damage_to_enemies: f64,
    damage_to_house: f64,
    rounds: Vec<String>,
}

impl MetricsCollector {
    /// Create a collector for a run of `scenario` with `seed`.
    #[must_use]
    pub fn new(scenario: impl Into<String>, seed: u64) -> Self {
        Self {
            scenario: scenario.into(),
            seed,
            enemies_spawned: 0,
            enemies_killed: 0,
            gathered: Inventory::new(),
            damage_to_enemies: 0.0,
            damage_to_house: 0.0,
            rounds: Vec::new(),
        }
    }

    /// Fold one step's events.
    pub fn record(&mut self, events: &TickEvents) {
        self.enemies_spawned += events.enemies_spawned;
        self.enemies_killed += events.enemies_killed;
        self.gathered.add_all(&events.gathered);
        for event in &events.damage_events {
            match event.target_kind {
                EntityKind::Enemy => self.damage_to_enemies += event.amount,
                EntityKind::House => self.damage_to_house += event.amount,
                _ => {}
            }
        }
        if let Some(round) = &events.round_selected {
            self.rounds.push(round.clone());
        }
    }

    /// Close the record against the final simulation state.
    #[must_use]
    pub fn finish(self, sim: &Simulation) -> RunMetrics {
        let mut kills_by_turret = BTreeMap::new();
        for turret in sim.entities().iter().filter_map(|e| e.as_turret()) {
            *kills_by_turret
                .entry(turret.kind.name().to_string())
                .or_insert(0) += turret.kill_count;
        }
        let outcome = if sim.state() == GameState::GameOver {
            Outcome::HouseDestroyed
        } else {
            Outcome::Survived
        };

        RunMetrics {
            scenario: self.scenario,
            seed: self.seed,
            ticks: sim.get_tick(),
            simulated_seconds: sim.time(),
            outcome,
            wave_reached: sim.wave(),
            enemies_spawned: self.enemies_spawned,
            enemies_killed: self.enemies_killed,
            kills_by_turret,
            gathered: self.gathered,
            damage_to_enemies: self.damage_to_enemies,
            damage_to_house: self.damage_to_house,
            rounds: self.rounds,
            house_health: sim.house_health().map_or(0.0, |h| h.current),
            structures: sim.index().structure_count(),
            final_state_hash: sim.state_hash(),
        }
    }
}

/// Summary statistics across multiple runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Total runs.
    pub total_runs: u32,
    /// Runs where the house survived.
    pub survived: u32,
    /// Share of runs where the house survived.
    pub survival_rate: f64,
    /// Average wave reached.
    pub avg_wave: f64,
    /// Lowest wave reached.
    pub min_wave: u32,
    /// Highest wave reached.
    pub max_wave: u32,
    /// Average simulated seconds.
    pub avg_seconds: f64,
    /// Average enemies killed per run.
    pub avg_enemies_killed: f64,
    /// Average kills per run by turret kind.
    pub avg_kills_by_turret: BTreeMap<String, f64>,
    /// Times each round was chosen, across all runs.
    pub round_counts: BTreeMap<String, u32>,
}

impl BatchSummary {
    /// Calculate summary from a list of run metrics.
    #[must_use]
    pub fn from_runs(runs: &[RunMetrics]) -> Self {
        if runs.is_empty() {
            return Self::default();
        }
        let n = runs.len() as f64;

        let mut summary = Self {
            total_runs: runs.len() as u32,
            min_wave: u32::MAX,
            ..Self::default()
        };
        let mut wave_sum = 0.0;
        let mut seconds_sum = 0.0;
        let mut kills_sum = 0.0;

        for run in runs {
            if run.outcome == Outcome::Survived {
                summary.survived += 1;
            }
            wave_sum += f64::from(run.wave_reached);
            summary.min_wave = summary.min_wave.min(run.wave_reached);
            summary.max_wave = summary.max_wave.max(run.wave_reached);
            seconds_sum += run.simulated_seconds;
            kills_sum += f64::from(run.enemies_killed);

            for (kind, kills) in &run.kills_by_turret {
                *summary
                    .avg_kills_by_turret
                    .entry(kind.clone())
                    .or_insert(0.0) += f64::from(*kills);
            }
            for round in &run.rounds {
                *summary.round_counts.entry(round.clone()).or_insert(0) += 1;
            }
        }

        summary.survival_rate = f64::from(summary.survived) / n;
        summary.avg_wave = wave_sum / n;
        summary.avg_seconds = seconds_sum / n;
        summary.avg_enemies_killed = kills_sum / n;
        for total in summary.avg_kills_by_turret.values_mut() {
            *total /= n;
        }
        summary
    }
}
