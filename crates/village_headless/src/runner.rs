//! Single-run driver.
//!
//! Steps a scenario's simulation at the fixed step until the duration
//! elapses or the house falls, feeding every step's events to a
//! [`MetricsCollector`].

use tracing::{debug, info};

use village_core::simulation::{GameState, Simulation, TickEvents};

use crate::metrics::{MetricsCollector, RunMetrics};
use crate::scenario::{Scenario, ScenarioError};

/// Drives one run of a scenario.
#[derive(Debug)]
pub struct ScenarioRunner {
    sim: Simulation,
    collector: MetricsCollector,
    max_ticks: u64,
}

impl ScenarioRunner {
    /// Build the scenario's simulation for `seed`.
    ///
    /// # Errors
    ///
    /// Returns an error if the scenario is invalid or a placement fails.
    pub fn new(scenario: &Scenario, seed: u64) -> Result<Self, ScenarioError> {
        let sim = scenario.build(seed)?;
        Ok(Self {
            sim,
            collector: MetricsCollector::new(scenario.name.clone(), seed),
            max_ticks: scenario.max_ticks(),
        })
    }

    /// The simulation being driven.
    #[must_use]
    pub fn simulation(&self) -> &Simulation {
        &self.sim
    }

    /// Whether the run has ended.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.sim.state() == GameState::GameOver || self.sim.get_tick() >= self.max_ticks
    }

    /// Advance one fixed step and record its events.
    pub fn step(&mut self) -> TickEvents {
        let events = self.sim.tick();
        self.collector.record(&events);
        if let Some(wave) = events.wave_started {
            debug!(tick = self.sim.get_tick(), wave, "Wave started");
        }
        if let Some(round) = &events.round_selected {
            debug!(tick = self.sim.get_tick(), round = %round, "Round selected");
        }
        events
    }

    /// Step until the run ends.
    pub fn run(&mut self) {
        while !self.is_finished() {
            self.step();
        }
    }

    /// Close the run and return its metrics.
    #[must_use]
    pub fn finish(self) -> RunMetrics {
        let metrics = self.collector.finish(&self.sim);
        info!(
            scenario = %metrics.scenario,
            seed = metrics.seed,
            ticks = metrics.ticks,
            wave = metrics.wave_reached,
            outcome = ?metrics.outcome,
            "Run finished"
        );
        metrics
    }
}

/// Run `scenario` to completion with `seed`.
///
/// # Errors
///
/// Returns an error if the scenario cannot be built.
pub fn run_scenario(scenario: &Scenario, seed: u64) -> Result<RunMetrics, ScenarioError> {
    let mut runner = ScenarioRunner::new(scenario, seed)?;
    runner.run();
    Ok(runner.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::Outcome;
    use village_core::config::SimConfig;

    fn short(seconds: f64) -> Scenario {
        Scenario {
            duration_seconds: seconds,
            ..Scenario::defended()
        }
    }

    #[test]
    fn test_run_stops_at_duration() {
        let metrics = run_scenario(&short(5.0), 7).unwrap();
        assert_eq!(metrics.ticks, 300);
        assert_eq!(metrics.outcome, Outcome::Survived);
        assert_eq!(metrics.scenario, "defended");
        assert_eq!(metrics.seed, 7);
    }

    #[test]
    fn test_same_seed_same_metrics() {
        let scenario = short(20.0);
        let a = run_scenario(&scenario, 99).unwrap();
        let b = run_scenario(&scenario, 99).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_fragile_house_ends_run_early() {
        let scenario = Scenario {
            duration_seconds: 600.0,
            config: SimConfig {
                house_max_health: 1.0,
                player_attack_damage: 0.0,
                ..SimConfig::default()
            },
            ..Scenario::default()
        };
        let metrics = run_scenario(&scenario, 3).unwrap();
        assert_eq!(metrics.outcome, Outcome::HouseDestroyed);
        assert!(metrics.ticks < scenario.max_ticks());
        assert!(metrics.damage_to_house >= 1.0);
    }

    #[test]
    fn test_step_records_events() {
        let mut runner = ScenarioRunner::new(&short(1.0), 1).unwrap();
        assert!(!runner.is_finished());
        runner.run();
        assert!(runner.is_finished());
        assert_eq!(runner.simulation().get_tick(), 60);
    }
}
