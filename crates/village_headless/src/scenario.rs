//! Scenario loading and setup.
//!
//! A scenario fixes everything about a run except the seed: configuration
//! overrides, an optional round catalog, the player's starting stockpile,
//! structures placed before the first step and a constant movement input.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use village_core::config::SimConfig;
use village_core::economy::Material;
use village_core::error::GameError;
use village_core::math::DVec2;
use village_core::player::PlayerInput;
use village_core::simulation::Simulation;
use village_core::waves::RoundCatalog;

/// Names accepted by [`Scenario::builtin`].
pub const BUILTIN_SCENARIOS: [&str; 3] = ["default", "defended", "economy"];

/// Why a scenario could not be loaded or built.
#[derive(Error, Debug)]
pub enum ScenarioError {
    /// File not found.
    #[error("No scenario file at {0}")]
    FileNotFound(String),
    /// Not a built-in name and not a file.
    #[error("Unknown scenario '{0}' (built-in: default, defended, economy)")]
    UnknownScenario(String),
    /// Failed to read file.
    #[error("Could not read scenario: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse RON.
    #[error("Malformed scenario RON: {0}")]
    ParseError(#[from] ron::error::SpannedError),
    /// A scenario field is out of range.
    #[error("Invalid scenario: {0}")]
    Invalid(String),
    /// A pre-placed structure could not be built.
    #[error("Placement {index} ('{recipe}') failed: {source}")]
    Placement {
        /// Position in the placement list.
        index: usize,
        /// Recipe id.
        recipe: String,
        /// Why the build was rejected.
        source: GameError,
    },
    /// The simulation rejected the setup.
    #[error("Simulation setup failed: {0}")]
    Game(#[from] GameError),
}

/// A structure placed before the first step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    /// Recipe id, e.g. `turret_tesla`.
    pub recipe: String,
    /// World position; snapped to the build grid.
    pub position: (f64, f64),
}

impl Placement {
    /// Create a new placement.
    #[must_use]
    pub fn new(recipe: impl Into<String>, x: f64, y: f64) -> Self {
        Self {
            recipe: recipe.into(),
            position: (x, y),
        }
    }
}

/// A reproducible starting point for headless runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Scenario {
    /// Scenario name.
    pub name: String,
    /// One line shown in listings.
    pub description: String,
    /// Simulated seconds before the run stops.
    pub duration_seconds: f64,
    /// Simulation configuration; the seed is replaced per run.
    pub config: SimConfig,
    /// Round catalog override.
    pub rounds: Option<RoundCatalog>,
    /// Materials credited before placements are paid for.
    pub starting_inventory: Vec<(Material, u32)>,
    /// Structures built in order, paid from the inventory.
    pub placements: Vec<Placement>,
    /// Constant player movement input.
    pub movement: (f64, f64),
}

impl Default for Scenario {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            description: "Bare village, no defenses".to_string(),
            duration_seconds: 300.0,
            config: SimConfig::default(),
            rounds: None,
            starting_inventory: Vec::new(),
            placements: Vec::new(),
            movement: (0.0, 0.0),
        }
    }
}

impl Scenario {
    /// Read and validate a RON scenario file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ScenarioError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ScenarioError::FileNotFound(path.display().to_string()));
        }
        let contents = std::fs::read_to_string(path)?;
        Self::from_ron_str(&contents)
    }

    /// Parse and validate scenario RON held in memory.
    pub fn from_ron_str(ron: &str) -> Result<Self, ScenarioError> {
        let scenario: Scenario = ron::from_str(ron)?;
        scenario.validate()?;
        Ok(scenario)
    }

    /// A built-in scenario by name.
    #[must_use]
    pub fn builtin(name: &str) -> Option<Self> {
        match name {
            "default" => Some(Self::default()),
            "defended" => Some(Self::defended()),
            "economy" => Some(Self::economy()),
            _ => None,
        }
    }

    /// A built-in name, or else a path to a RON file.
    pub fn resolve(name_or_path: &str) -> Result<Self, ScenarioError> {
        if let Some(scenario) = Self::builtin(name_or_path) {
            return Ok(scenario);
        }
        let path = Path::new(name_or_path);
        if path.exists() {
            return Self::load(path);
        }
        Err(ScenarioError::UnknownScenario(name_or_path.to_string()))
    }

    /// A ring of mixed turrets around the house.
    #[must_use]
    pub fn defended() -> Self {
        let starting_inventory = Material::ALL.iter().map(|&m| (m, 3000)).collect();
        let placements = vec![
            Placement::new("turret_basic", 100.0, 0.0),
            Placement::new("turret_basic", -100.0, 0.0),
            Placement::new("turret_tesla", 0.0, 100.0),
            Placement::new("turret_aoe", 0.0, -100.0),
            Placement::new("turret_missile", 150.0, 150.0),
            Placement::new("turret_sniper", -150.0, -150.0),
            Placement::new("turret_gatling", 150.0, -150.0),
            Placement::new("turret_money", -150.0, 150.0),
            Placement::new("mega_wall", 250.0, 0.0),
            Placement::new("buff_attack_1", 100.0, 50.0),
        ];
        Self {
            name: "defended".to_string(),
            description: "Eight turrets, a mega wall and an attack buff".to_string(),
            duration_seconds: 600.0,
            starting_inventory,
            placements,
            ..Self::default()
        }
    }

    /// Collectors and generators with light defenses.
    #[must_use]
    pub fn economy() -> Self {
        let starting_inventory = vec![
            (Material::Wood, 500),
            (Material::Stone, 500),
            (Material::Iron, 100),
        ];
        let placements = vec![
            Placement::new("universal_col", 300.0, 0.0),
            Placement::new("wood_col", -300.0, 0.0),
            Placement::new("stone_col", 0.0, 300.0),
            Placement::new("wood_gen", 0.0, -300.0),
            Placement::new("turret_basic", 100.0, 0.0),
            Placement::new("turret_basic", -100.0, 0.0),
        ];
        Self {
            name: "economy".to_string(),
            description: "Collectors feeding the stockpile behind two basic turrets".to_string(),
            duration_seconds: 300.0,
            starting_inventory,
            placements,
            ..Self::default()
        }
    }

    /// Reject durations that cannot be run.
    pub fn validate(&self) -> Result<(), ScenarioError> {
        if !(self.duration_seconds.is_finite() && self.duration_seconds > 0.0) {
            return Err(ScenarioError::Invalid(format!(
                "duration_seconds must be positive, got {}",
                self.duration_seconds
            )));
        }
        Ok(())
    }

    /// Fixed steps needed to cover the duration.
    #[must_use]
    pub fn max_ticks(&self) -> u64 {
        (self.duration_seconds / self.config.fixed_step).round() as u64
    }

    /// Build and start a simulation for `seed`.
    pub fn build(&self, seed: u64) -> Result<Simulation, ScenarioError> {
        self.validate()?;
        let config = SimConfig {
            seed,
            ..self.config.clone()
        };
        let catalog = self.rounds.clone().unwrap_or_default();
        let mut sim = Simulation::with_catalog(config, catalog)?;
        sim.start()?;

        for &(material, amount) in &self.starting_inventory {
            sim.give_player(material, amount)?;
        }
        for (index, placement) in self.placements.iter().enumerate() {
            let (x, y) = placement.position;
            sim.place(&placement.recipe, DVec2::new(x, y))
                .map_err(|source| ScenarioError::Placement {
                    index,
                    recipe: placement.recipe.clone(),
                    source,
                })?;
        }

        let (mx, my) = self.movement;
        sim.set_input(PlayerInput {
            movement: DVec2::new(mx, my),
            build_at: None,
        });
        tracing::debug!(
            scenario = %self.name,
            seed,
            structures = sim.index().structure_count(),
            "Scenario built"
        );
        Ok(sim)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtins_build() {
        for name in BUILTIN_SCENARIOS {
            let scenario = Scenario::builtin(name).unwrap();
            let sim = scenario.build(1).unwrap();
            assert_eq!(sim.index().structure_count(), scenario.placements.len());
        }
    }

    #[test]
    fn test_unknown_builtin() {
        assert!(Scenario::builtin("nope").is_none());
        assert!(matches!(
            Scenario::resolve("nope"),
            Err(ScenarioError::UnknownScenario(_))
        ));
    }

    #[test]
    fn test_max_ticks() {
        let scenario = Scenario {
            duration_seconds: 2.0,
            ..Scenario::default()
        };
        assert_eq!(scenario.max_ticks(), 120);
    }

    #[test]
    fn test_partial_ron_fills_defaults() {
        let ron = r#"
            Scenario(
                name: "outpost",
                duration_seconds: 10.0,
                config: (wave_timer: 5.0),
                starting_inventory: [(wood, 10), (stone, 10)],
                placements: [(recipe: "turret_basic", position: (200.0, 0.0))],
            )
        "#;
        let scenario = Scenario::from_ron_str(ron).unwrap();
        assert_eq!(scenario.name, "outpost");
        assert_eq!(scenario.config.wave_timer, 5.0);
        assert_eq!(scenario.config.house_max_health, 2000.0);
        assert_eq!(scenario.placements[0], Placement::new("turret_basic", 200.0, 0.0));
        assert_eq!(scenario.movement, (0.0, 0.0));
    }

    #[test]
    fn test_rejects_zero_duration() {
        let err = Scenario::from_ron_str("(duration_seconds: 0.0)").unwrap_err();
        assert!(matches!(err, ScenarioError::Invalid(_)));
    }

    #[test]
    fn test_unaffordable_placement_reports_index() {
        let scenario = Scenario {
            placements: vec![Placement::new("turret_basic", 200.0, 0.0)],
            ..Scenario::default()
        };
        match scenario.build(0) {
            Err(ScenarioError::Placement { index, recipe, .. }) => {
                assert_eq!(index, 0);
                assert_eq!(recipe, "turret_basic");
            }
            other => panic!("expected placement error, got {other:?}"),
        }
    }
}
