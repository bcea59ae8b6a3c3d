//! Simulation configuration.
//!
//! [`SimConfig`] is built once (defaults, or a RON file) and then shared
//! read-only with every component for the lifetime of a simulation.
//!
//! # Example
//!
//! ```
//! use village_core::config::SimConfig;
//!
//! let config = SimConfig::from_ron_str("(seed: 7, wave_timer: 10.0)").unwrap();
//! assert_eq!(config.seed, 7);
//! assert_eq!(config.enemy_power_variance, 6.0);
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::economy::Material;
use crate::error::{GameError, Result};

/// Tunable constants for one simulation.
///
/// Every field has a default, so a RON file only has to name what it
/// overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Seed for the simulation RNG.
    pub seed: u64,

    /// Side length of the playable square; the player is clamped to ±half.
    pub world_size: f64,
    /// Seconds per wave.
    pub wave_timer: f64,
    /// Delay before the first enemy spawn.
    pub spawn_timer_start: f64,
    /// Lower bound of the spawn interval.
    pub spawn_rate_min: f64,
    /// Spawn interval reduction per wave.
    pub spawn_rate_scaling: f64,
    /// Delay before the first ambient resource spawn.
    pub resource_spawn_timer: f64,
    /// Ambient resource spawn interval range `[min, max)`.
    pub resource_spawn_interval: (f64, f64),
    /// Ambient resource spawns stop while this many resources are alive.
    pub max_resources: usize,
    /// Resources placed around the house when the simulation is created.
    pub initial_resources: usize,
    /// Distance band around the house for ambient resource spawns.
    pub resource_spawn_distance: (f64, f64),

    /// Seconds until a seed bursts.
    pub seed_growth_time: f64,
    /// Production interval of generator buildings.
    pub generator_production_time: f64,
    /// Production interval of alchemy buildings.
    pub alchemy_interval: f64,

    /// Base enemy power on wave 1.
    pub enemy_base_power: f64,
    /// Power multiplier per wave.
    pub enemy_power_scaling: f64,
    /// Variance factor `k` of the power distribution.
    pub enemy_power_variance: f64,

    /// Player movement speed.
    pub player_speed: f64,
    /// Seconds between player auto-attacks.
    pub player_attack_cooldown: f64,
    /// Seconds between player builds.
    pub player_build_cooldown: f64,
    /// Player auto-attack reach.
    pub player_attack_range: f64,
    /// Player auto-attack damage before buffs.
    pub player_attack_damage: f64,

    /// House hit points.
    pub house_max_health: f64,
    /// Health restored to the house on each wave transition.
    pub wave_heal: f64,

    /// Simulation step in seconds.
    pub fixed_step: f64,
    /// Upper bound on real time accepted per frame.
    pub max_frame_time: f64,
    /// Viewport width used for spawn distance and culling.
    pub viewport_width: f64,
    /// Viewport height used for spawn distance and culling.
    pub viewport_height: f64,

    /// Rarity score per material for craft difficulty.
    pub material_rarity: BTreeMap<Material, f64>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            world_size: 4000.0,
            wave_timer: 30.0,
            spawn_timer_start: 3.0,
            spawn_rate_min: 3.0,
            spawn_rate_scaling: 0.0005,
            resource_spawn_timer: 2.0,
            resource_spawn_interval: (2.0, 4.0),
            max_resources: 50,
            initial_resources: 20,
            resource_spawn_distance: (200.0, 600.0),
            seed_growth_time: 60.0,
            generator_production_time: 1.0,
            alchemy_interval: 50.0,
            enemy_base_power: 0.25,
            enemy_power_scaling: 1.3,
            enemy_power_variance: 6.0,
            player_speed: 200.0,
            player_attack_cooldown: 0.2,
            player_build_cooldown: 0.2,
            player_attack_range: 60.0,
            player_attack_damage: 1.0,
            house_max_health: 2000.0,
            wave_heal: 100.0,
            fixed_step: 1.0 / 60.0,
            max_frame_time: 0.1,
            viewport_width: 1280.0,
            viewport_height: 720.0,
            material_rarity: Material::ALL
                .iter()
                .map(|&m| (m, m.default_rarity()))
                .collect(),
        }
    }
}

impl SimConfig {
    /// Load and validate a configuration from a RON file.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::ConfigParse`] when the file cannot be read or
    /// parsed, and [`GameError::InvalidConfig`] when a value is out of range.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| GameError::ConfigParse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::parse(&contents, &path.display().to_string())
    }

    /// Parse and validate a configuration from a RON string.
    ///
    /// # Errors
    ///
    /// Same as [`SimConfig::load`].
    pub fn from_ron_str(ron: &str) -> Result<Self> {
        Self::parse(ron, "<string>")
    }

    fn parse(ron: &str, label: &str) -> Result<Self> {
        let config: Self = ron::from_str(ron).map_err(|e| GameError::ConfigParse {
            path: label.to_string(),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check that every value is inside its accepted range.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvalidConfig`] for the first offending field.
    pub fn validate(&self) -> Result<()> {
        fn positive(field: &'static str, value: f64) -> Result<()> {
            if value.is_finite() && value > 0.0 {
                Ok(())
            } else {
                Err(GameError::InvalidConfig {
                    field,
                    reason: format!("must be positive, got {value}"),
                })
            }
        }

        positive("fixed_step", self.fixed_step)?;
        positive("max_frame_time", self.max_frame_time)?;
        positive("wave_timer", self.wave_timer)?;
        positive("spawn_rate_min", self.spawn_rate_min)?;
        positive("generator_production_time", self.generator_production_time)?;
        positive("alchemy_interval", self.alchemy_interval)?;
        positive("seed_growth_time", self.seed_growth_time)?;
        positive("enemy_base_power", self.enemy_base_power)?;
        positive("enemy_power_scaling", self.enemy_power_scaling)?;
        positive("house_max_health", self.house_max_health)?;
        positive("world_size", self.world_size)?;
        positive("viewport_width", self.viewport_width)?;
        positive("viewport_height", self.viewport_height)?;

        if self.enemy_power_variance.is_nan() || self.enemy_power_variance < 1.0 {
            return Err(GameError::InvalidConfig {
                field: "enemy_power_variance",
                reason: format!("must be at least 1, got {}", self.enemy_power_variance),
            });
        }
        if self.max_frame_time < self.fixed_step {
            return Err(GameError::InvalidConfig {
                field: "max_frame_time",
                reason: "must not be shorter than fixed_step".to_string(),
            });
        }
        let (lo, hi) = self.resource_spawn_interval;
        if lo.is_nan() || hi.is_nan() || lo <= 0.0 || hi < lo {
            return Err(GameError::InvalidConfig {
                field: "resource_spawn_interval",
                reason: format!("expected 0 < min <= max, got ({lo}, {hi})"),
            });
        }
        let (lo, hi) = self.resource_spawn_distance;
        if lo.is_nan() || hi.is_nan() || lo < 0.0 || hi < lo {
            return Err(GameError::InvalidConfig {
                field: "resource_spawn_distance",
                reason: format!("expected 0 <= min <= max, got ({lo}, {hi})"),
            });
        }
        Ok(())
    }

    /// Rarity of `material`, falling back to 1 for unlisted materials.
    #[must_use]
    pub fn rarity(&self, material: Material) -> f64 {
        self.material_rarity.get(&material).copied().unwrap_or(1.0)
    }

    /// Radius from the house at which enemies spawn for the given zoom.
    #[must_use]
    pub fn spawn_distance(&self, zoom: f64) -> f64 {
        let base = self.viewport_width.max(self.viewport_height) / 2.0 + 100.0;
        base / zoom.max(f64::EPSILON)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = SimConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.rarity(Material::Gold), 15.0);
    }

    #[test]
    fn test_partial_ron_overrides() {
        let config = SimConfig::from_ron_str("(enemy_base_power: 0.5, max_resources: 10)").unwrap();
        assert_eq!(config.enemy_base_power, 0.5);
        assert_eq!(config.max_resources, 10);
        assert_eq!(config.wave_timer, 30.0);
    }

    #[test]
    fn test_rejects_low_variance() {
        let err = SimConfig::from_ron_str("(enemy_power_variance: 0.5)").unwrap_err();
        assert!(matches!(
            err,
            GameError::InvalidConfig {
                field: "enemy_power_variance",
                ..
            }
        ));
    }

    #[test]
    fn test_rejects_zero_step() {
        let err = SimConfig::from_ron_str("(fixed_step: 0.0)").unwrap_err();
        assert!(matches!(err, GameError::InvalidConfig { field: "fixed_step", .. }));
    }

    #[test]
    fn test_parse_error_reported() {
        let err = SimConfig::from_ron_str("(seed: \"nope\")").unwrap_err();
        assert!(matches!(err, GameError::ConfigParse { .. }));
    }

    #[test]
    fn test_spawn_distance_scales_with_zoom() {
        let config = SimConfig::default();
        assert_eq!(config.spawn_distance(1.0), 740.0);
        assert_eq!(config.spawn_distance(0.5), 1480.0);
    }
}
