//! Test fixtures and helpers.
//!
//! Pre-built configurations and game states for consistent testing.

use village_core::config::SimConfig;
use village_core::economy::Material;
use village_core::math::DVec2;
use village_core::simulation::Simulation;

/// Default configuration with `seed`.
#[must_use]
pub fn config(seed: u64) -> SimConfig {
    SimConfig {
        seed,
        ..SimConfig::default()
    }
}

/// A world with no scheduled enemies and no resources besides what a test
/// inserts. Waves still tick.
#[must_use]
pub fn quiet_config() -> SimConfig {
    SimConfig {
        spawn_timer_start: 1.0e9,
        resource_spawn_timer: 1.0e9,
        initial_resources: 0,
        ..SimConfig::default()
    }
}

/// Started simulation with default rules and `seed`.
///
/// # Panics
///
/// Panics if the default configuration is rejected.
#[must_use]
pub fn playing(seed: u64) -> Simulation {
    start(config(seed))
}

/// Started simulation built from `config`.
///
/// # Panics
///
/// Panics if `config` is rejected.
#[must_use]
pub fn start(config: SimConfig) -> Simulation {
    let mut sim = Simulation::new(config).expect("fixture config is valid");
    sim.start().expect("fresh simulation can start");
    sim
}

/// Give the player `amount` of every material.
///
/// # Panics
///
/// Panics if the simulation has no player.
pub fn stock_player(sim: &mut Simulation, amount: u32) {
    for material in Material::ALL {
        sim.give_player(material, amount).expect("simulation has a player");
    }
}

/// Seed 42 with a ring of mixed turrets and a collector around the house.
///
/// # Panics
///
/// Panics if any placement fails.
#[must_use]
pub fn defended_village() -> Simulation {
    let mut sim = playing(42);
    stock_player(&mut sim, 5000);
    let layout = [
        ("turret_basic", DVec2::new(100.0, 0.0)),
        ("turret_tesla", DVec2::new(-100.0, 0.0)),
        ("turret_aoe", DVec2::new(0.0, 100.0)),
        ("turret_missile", DVec2::new(0.0, -100.0)),
        ("turret_railgun", DVec2::new(150.0, 150.0)),
        ("turret_money", DVec2::new(-150.0, -150.0)),
        ("universal_col", DVec2::new(-150.0, 150.0)),
        ("wood_gen", DVec2::new(150.0, -150.0)),
    ];
    for (recipe, point) in layout {
        sim.place(recipe, point).expect("fixture layout is free");
    }
    sim
}

/// Serialize `config` as pretty RON, e.g. for scenario files in tests.
///
/// # Panics
///
/// Panics if serialization fails.
#[must_use]
pub fn config_to_ron(config: &SimConfig) -> String {
    ron::ser::to_string_pretty(config, ron::ser::PrettyConfig::default())
        .expect("config serializes")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quiet_config_is_valid() {
        assert!(quiet_config().validate().is_ok());
    }

    #[test]
    fn test_defended_village_layout() {
        let sim = defended_village();
        assert_eq!(sim.index().turrets.len(), 6);
        assert_eq!(sim.index().buildings.len(), 2);
    }

    #[test]
    fn test_config_ron_roundtrip() {
        let original = config(9);
        let parsed = SimConfig::from_ron_str(&config_to_ron(&original)).unwrap();
        assert_eq!(parsed, original);
    }
}
