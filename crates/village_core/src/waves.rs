//! Wave progression, round selection and enemy spawn planning.
//!
//! The wave counter starts at 1 and advances every `wave_timer` seconds.
//! The first spawn of each wave picks a *round* from the [`RoundCatalog`]
//! by weight; every spawn in that wave then draws its enemy kind from the
//! round's weighted enemy table.
//!
//! # Power
//!
//! ```text
//! n     = enemy_base_power × enemy_power_scaling^(wave − 1) × round.power_multiplier
//! power = n/k + (k·n − n/k) · t^k        t ~ U(0, 1), k = enemy_power_variance
//! ```
//!
//! Most spawns land near `n/k`; a few approach `k·n`.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::SimConfig;
use crate::enemy::EnemyKind;
use crate::error::{GameError, Result};
use crate::rng::SimRng;

/// Interval ceiling before the minimum clamp is applied.
const SPAWN_RATE_BASE: f64 = 1.5;

fn one() -> f64 {
    1.0
}

/// A weighted enemy composition for one wave.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundDefinition {
    /// Unique name, e.g. `swarm`.
    pub id: String,
    /// Relative selection weight.
    pub weight: f64,
    /// Enemy kinds with their relative spawn weights.
    pub enemies: Vec<(EnemyKind, f64)>,
    /// Scales the spawn interval (lower spawns faster).
    #[serde(default = "one")]
    pub spawn_rate_multiplier: f64,
    /// Scales the base power of every spawn.
    #[serde(default = "one")]
    pub power_multiplier: f64,
    /// Announcement text.
    #[serde(default)]
    pub description: String,
}

impl RoundDefinition {
    fn new(id: &str, weight: f64, enemies: &[(EnemyKind, f64)], description: &str) -> Self {
        Self {
            id: id.to_string(),
            weight,
            enemies: enemies.to_vec(),
            spawn_rate_multiplier: 1.0,
            power_multiplier: 1.0,
            description: description.to_string(),
        }
    }

    fn rates(mut self, spawn_rate_multiplier: f64, power_multiplier: f64) -> Self {
        self.spawn_rate_multiplier = spawn_rate_multiplier;
        self.power_multiplier = power_multiplier;
        self
    }

    /// Draw an enemy kind. Falls back to [`EnemyKind::Normal`] when the
    /// table is empty.
    pub fn pick_enemy(&self, rng: &mut SimRng) -> EnemyKind {
        let total: f64 = self.enemies.iter().map(|(_, w)| w).sum();
        let roll = rng.next_f64() * total;
        weighted_pick(self.enemies.iter().map(|(_, w)| *w), roll)
            .map_or(EnemyKind::Normal, |i| self.enemies[i].0)
    }
}

/// The set of rounds a wave can be.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundCatalog {
    rounds: Vec<RoundDefinition>,
}

impl Default for RoundCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl RoundCatalog {
    /// The standard twenty rounds.
    #[must_use]
    pub fn builtin() -> Self {
        use EnemyKind::{
            Boss, Disruptor, Fast, GlassCannon, Glitch, Kamikaze, Normal, Orbital, Regenerator,
            Shielded, Spiral, Splitter, Stealth, Stopgo, Tank, Teleporter, Vampire, Void, Zigzag,
        };
        let rounds = vec![
            RoundDefinition::new(
                "standard",
                10.0,
                &[(Normal, 10.0), (Fast, 2.0), (Tank, 1.0)],
                "Standard mix of enemies.",
            ),
            RoundDefinition::new(
                "swarm",
                5.0,
                &[(Fast, 10.0), (Normal, 2.0)],
                "A swarm of fast, weak enemies.",
            )
            .rates(0.5, 0.6),
            RoundDefinition::new(
                "heavies",
                5.0,
                &[(Tank, 8.0), (Normal, 2.0)],
                "Heavy armored units approaching.",
            )
            .rates(1.5, 1.5),
            RoundDefinition::new(
                "disruptors",
                3.0,
                &[(Disruptor, 8.0), (Normal, 2.0)],
                "Turret disruptors detected.",
            ),
            RoundDefinition::new("spirals", 4.0, &[(Spiral, 10.0)], "Enemies moving in spiral patterns."),
            RoundDefinition::new("stopgo", 4.0, &[(Stopgo, 10.0)], "Enemies with erratic movement."),
            RoundDefinition::new(
                "boss_rush",
                1.0,
                &[(Boss, 10.0)],
                "WARNING: High power signatures detected.",
            )
            .rates(3.0, 3.0),
            RoundDefinition::new("zigzag", 4.0, &[(Zigzag, 10.0)], "Enemies moving in zigzag patterns."),
            RoundDefinition::new("stealth", 3.0, &[(Stealth, 10.0)], "Stealth units (hard to see)."),
            RoundDefinition::new(
                "regenerator",
                3.0,
                &[(Regenerator, 10.0)],
                "Enemies that regenerate health.",
            ),
            RoundDefinition::new("splitter", 2.0, &[(Splitter, 10.0)], "Enemies that split on death."),
            RoundDefinition::new(
                "shielded",
                3.0,
                &[(Shielded, 10.0)],
                "Enemies with protective shields.",
            ),
            RoundDefinition::new("kamikaze", 3.0, &[(Kamikaze, 10.0)], "Explosive enemies."),
            RoundDefinition::new(
                "mixed_chaos",
                2.0,
                &[(Normal, 5.0), (Fast, 5.0), (Tank, 5.0), (Spiral, 5.0), (Zigzag, 5.0)],
                "Chaotic mix of all types.",
            ),
            RoundDefinition::new(
                "glass_cannon",
                3.0,
                &[(GlassCannon, 10.0)],
                "High damage, low health enemies.",
            )
            .rates(1.0, 2.0),
            RoundDefinition::new("vampire", 2.0, &[(Vampire, 10.0)], "Enemies that heal on attack."),
            RoundDefinition::new(
                "teleporter",
                2.0,
                &[(Teleporter, 10.0)],
                "Enemies that teleport short distances.",
            ),
            RoundDefinition::new("orbital", 2.0, &[(Orbital, 10.0)], "Enemies orbiting the base."),
            RoundDefinition::new("glitch", 1.0, &[(Glitch, 10.0)], "Glitch entities detected."),
            RoundDefinition::new("void", 1.0, &[(Void, 10.0)], "Void creatures approaching.")
                .rates(1.0, 2.5),
        ];
        Self { rounds }
    }

    /// Load and validate a catalog from a RON file.
    ///
    /// # Errors
    ///
    /// [`GameError::ConfigParse`] if the file cannot be read or parsed,
    /// [`GameError::InvalidConfig`] if [`validate`](Self::validate) fails.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| GameError::ConfigParse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::parse(&contents, &path.display().to_string())
    }

    /// Parse and validate a catalog from a RON string.
    ///
    /// # Errors
    ///
    /// Same as [`RoundCatalog::load`].
    pub fn from_ron_str(ron: &str) -> Result<Self> {
        Self::parse(ron, "<string>")
    }

    fn parse(ron: &str, label: &str) -> Result<Self> {
        let catalog: Self = ron::from_str(ron).map_err(|e| GameError::ConfigParse {
            path: label.to_string(),
            message: e.to_string(),
        })?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// At least one round, positive weights, non-empty enemy tables.
    ///
    /// # Errors
    ///
    /// [`GameError::InvalidConfig`] naming the first offending round.
    pub fn validate(&self) -> Result<()> {
        if self.rounds.is_empty() {
            return Err(GameError::InvalidConfig {
                field: "rounds",
                reason: "catalog is empty".to_string(),
            });
        }
        for round in &self.rounds {
            let weights_ok = round.weight.is_finite()
                && round.weight > 0.0
                && !round.enemies.is_empty()
                && round.enemies.iter().all(|(_, w)| w.is_finite() && *w > 0.0);
            if !weights_ok {
                return Err(GameError::InvalidConfig {
                    field: "rounds",
                    reason: format!("round '{}' needs positive weights and enemies", round.id),
                });
            }
            if !(round.spawn_rate_multiplier > 0.0 && round.power_multiplier > 0.0) {
                return Err(GameError::InvalidConfig {
                    field: "rounds",
                    reason: format!("round '{}' has a non-positive multiplier", round.id),
                });
            }
        }
        Ok(())
    }

    /// All rounds in catalog order.
    #[must_use]
    pub fn rounds(&self) -> &[RoundDefinition] {
        &self.rounds
    }

    /// Round at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&RoundDefinition> {
        self.rounds.get(index)
    }

    /// Index of the round named `id`.
    #[must_use]
    pub fn position(&self, id: &str) -> Option<usize> {
        self.rounds.iter().position(|r| r.id == id)
    }

    /// Draw a round index by weight.
    pub fn pick(&self, rng: &mut SimRng) -> usize {
        let total: f64 = self.rounds.iter().map(|r| r.weight).sum();
        let roll = rng.next_f64() * total;
        weighted_pick(self.rounds.iter().map(|r| r.weight), roll).unwrap_or(0)
    }
}

/// Index of the first weight at which the running remainder of `roll`
/// reaches zero.
///
/// `roll` should be uniform in `[0, Σweights)`. Returns `None` only for an
/// empty or all-zero table.
pub fn weighted_pick(weights: impl IntoIterator<Item = f64>, roll: f64) -> Option<usize> {
    let mut remaining = roll;
    let mut last = None;
    for (i, weight) in weights.into_iter().enumerate() {
        if weight <= 0.0 {
            continue;
        }
        remaining -= weight;
        last = Some(i);
        if remaining <= 0.0 {
            return Some(i);
        }
    }
    last
}

/// Base power for `wave` before variance.
#[must_use]
pub fn base_power(config: &SimConfig, wave: u32, power_multiplier: f64) -> f64 {
    let exponent = f64::from(wave.saturating_sub(1));
    config.enemy_base_power * config.enemy_power_scaling.powf(exponent) * power_multiplier
}

/// The variance curve `n/k + (k·n − n/k)·t^k`.
#[must_use]
pub fn power_from_sample(n: f64, k: f64, t: f64) -> f64 {
    n / k + (k * n - n / k) * t.powf(k)
}

/// Draw a power for base power `n`.
pub fn sample_power(n: f64, config: &SimConfig, rng: &mut SimRng) -> f64 {
    power_from_sample(n, config.enemy_power_variance, rng.next_f64())
}

/// Seconds until the next spawn after a spawn in `wave`.
#[must_use]
pub fn spawn_interval(config: &SimConfig, wave: u32, spawn_rate_multiplier: f64) -> f64 {
    let mut interval =
        (SPAWN_RATE_BASE - f64::from(wave) * config.spawn_rate_scaling).max(config.spawn_rate_min);
    if wave % 3 == 0 {
        interval /= 2.0;
    }
    interval * spawn_rate_multiplier
}

/// What the next spawn should be.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpawnPlan {
    /// Kind to spawn.
    pub kind: EnemyKind,
    /// Power after variance.
    pub power: f64,
    /// Round index, if this spawn selected a new one.
    pub new_round: Option<usize>,
}

/// Wave counter and spawn timers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaveScheduler {
    /// Current wave, starting at 1.
    pub wave: u32,
    /// Seconds until the next wave.
    pub wave_timer: f64,
    /// Seconds until the next spawn.
    pub spawn_timer: f64,
    /// Round chosen for `round_wave`.
    pub round: Option<usize>,
    /// Wave the current round was chosen for.
    pub round_wave: u32,
}

impl WaveScheduler {
    /// Scheduler at wave 1.
    #[must_use]
    pub fn new(config: &SimConfig) -> Self {
        Self {
            wave: 1,
            wave_timer: config.wave_timer,
            spawn_timer: config.spawn_timer_start,
            round: None,
            round_wave: 0,
        }
    }

    /// Count down the wave timer. Returns `true` when a new wave began.
    pub fn advance_wave(&mut self, dt: f64, config: &SimConfig) -> bool {
        self.wave_timer -= dt;
        if self.wave_timer > 0.0 {
            return false;
        }
        self.wave += 1;
        self.wave_timer = config.wave_timer;
        tracing::debug!(wave = self.wave, "Wave started");
        true
    }

    /// Count down the spawn timer. Returns `true` when a spawn is due.
    pub fn spawn_due(&mut self, dt: f64) -> bool {
        self.spawn_timer -= dt;
        self.spawn_timer <= 0.0
    }

    /// Round in effect for the current wave, if one was chosen.
    #[must_use]
    pub fn current_round<'c>(&self, catalog: &'c RoundCatalog) -> Option<&'c RoundDefinition> {
        if self.round_wave != self.wave {
            return None;
        }
        self.round.and_then(|i| catalog.get(i))
    }

    /// Choose the kind and power of the next enemy, selecting this wave's
    /// round first if needed.
    pub fn plan_spawn(
        &mut self,
        catalog: &RoundCatalog,
        config: &SimConfig,
        rng: &mut SimRng,
    ) -> SpawnPlan {
        let mut new_round = None;
        if self.round.is_none() || self.round_wave != self.wave {
            let index = catalog.pick(rng);
            self.round = Some(index);
            self.round_wave = self.wave;
            new_round = Some(index);
            if let Some(round) = catalog.get(index) {
                tracing::debug!(wave = self.wave, round = %round.id, "Round selected");
            }
        }

        let round = self
            .round
            .and_then(|i| catalog.get(i))
            .or_else(|| catalog.rounds().first());
        let (kind, multiplier) = match round {
            Some(round) => (round.pick_enemy(rng), round.power_multiplier),
            None => (EnemyKind::Normal, 1.0),
        };
        let n = base_power(config, self.wave, multiplier);
        SpawnPlan {
            kind,
            power: sample_power(n, config, rng),
            new_round,
        }
    }

    /// Reset the spawn timer after a spawn.
    pub fn reset_spawn_timer(&mut self, catalog: &RoundCatalog, config: &SimConfig) {
        let multiplier = self
            .current_round(catalog)
            .map_or(1.0, |r| r.spawn_rate_multiplier);
        self.spawn_timer = spawn_interval(config, self.wave, multiplier);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_power_extremes() {
        let config = SimConfig::default();
        let n = base_power(&config, 1, 1.0);
        assert!((n - 0.25).abs() < 1e-12);
        assert!((power_from_sample(n, 6.0, 0.0) - 0.25 / 6.0).abs() < 1e-12);
        assert!((power_from_sample(n, 6.0, 1.0) - 1.5).abs() < 1e-12);
    }

    #[test]
    fn test_base_power_scales_per_wave() {
        let config = SimConfig::default();
        let w3 = base_power(&config, 3, 2.0);
        assert!((w3 - 0.25 * 1.3 * 1.3 * 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_spawn_interval_cadence() {
        let config = SimConfig::default();
        assert!((spawn_interval(&config, 1, 1.0) - 3.0).abs() < 1e-12);
        assert!((spawn_interval(&config, 3, 1.0) - 1.5).abs() < 1e-12);
        assert!((spawn_interval(&config, 6, 0.5) - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_weighted_pick_boundaries() {
        let weights = [10.0, 5.0, 5.0];
        assert_eq!(weighted_pick(weights, 0.0), Some(0));
        assert_eq!(weighted_pick(weights, 10.0), Some(0));
        assert_eq!(weighted_pick(weights, 10.5), Some(1));
        assert_eq!(weighted_pick(weights, 19.9), Some(2));
        assert_eq!(weighted_pick([0.0, 0.0], 0.0), None);
        assert_eq!(weighted_pick(Vec::<f64>::new(), 0.0), None);
    }

    #[test]
    fn test_builtin_catalog() {
        let catalog = RoundCatalog::builtin();
        assert_eq!(catalog.rounds().len(), 20);
        assert!(catalog.validate().is_ok());
        let swarm = &catalog.rounds()[catalog.position("swarm").unwrap()];
        assert_eq!(swarm.spawn_rate_multiplier, 0.5);
        assert_eq!(swarm.power_multiplier, 0.6);
        let total: f64 = catalog.rounds().iter().map(|r| r.weight).sum();
        assert_eq!(total, 63.0);
    }

    #[test]
    fn test_catalog_from_ron() {
        let catalog = RoundCatalog::from_ron_str(
            r#"(rounds: [(id: "only_tanks", weight: 1.0, enemies: [(tank, 1.0)], power_multiplier: 2.0)])"#,
        )
        .unwrap();
        let round = catalog.get(0).unwrap();
        assert_eq!(round.enemies, vec![(EnemyKind::Tank, 1.0)]);
        assert_eq!(round.spawn_rate_multiplier, 1.0);

        let mut rng = SimRng::from_seed(5);
        assert_eq!(round.pick_enemy(&mut rng), EnemyKind::Tank);
    }

    #[test]
    fn test_empty_catalog_rejected() {
        let err = RoundCatalog::from_ron_str("(rounds: [])").unwrap_err();
        assert!(matches!(err, GameError::InvalidConfig { field: "rounds", .. }));
    }

    #[test]
    fn test_round_chosen_once_per_wave() {
        let config = SimConfig::default();
        let catalog = RoundCatalog::builtin();
        let mut rng = SimRng::from_seed(11);
        let mut scheduler = WaveScheduler::new(&config);

        let first = scheduler.plan_spawn(&catalog, &config, &mut rng);
        assert!(first.new_round.is_some());
        let second = scheduler.plan_spawn(&catalog, &config, &mut rng);
        assert!(second.new_round.is_none());

        scheduler.advance_wave(config.wave_timer, &config);
        assert_eq!(scheduler.wave, 2);
        assert!(scheduler.current_round(&catalog).is_none());
        let third = scheduler.plan_spawn(&catalog, &config, &mut rng);
        assert!(third.new_round.is_some());
    }

    #[test]
    fn test_spawn_timer_uses_round_multiplier() {
        let config = SimConfig::default();
        let catalog = RoundCatalog::from_ron_str(
            r#"(rounds: [(id: "slow", weight: 1.0, enemies: [(normal, 1.0)], spawn_rate_multiplier: 2.0)])"#,
        )
        .unwrap();
        let mut rng = SimRng::from_seed(0);
        let mut scheduler = WaveScheduler::new(&config);
        scheduler.plan_spawn(&catalog, &config, &mut rng);
        scheduler.reset_spawn_timer(&catalog, &config);
        assert!((scheduler.spawn_timer - 6.0).abs() < 1e-12);
    }
}
