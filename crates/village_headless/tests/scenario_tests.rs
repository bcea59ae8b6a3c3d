//! Scenario files and end-to-end headless runs.

use std::io::Write;
use std::path::PathBuf;

use village_core::economy::Material;
use village_headless::batch::{run_batch, verify_determinism, BatchConfig, BatchResults};
use village_headless::metrics::Outcome;
use village_headless::runner::run_scenario;
use village_headless::scenario::{Scenario, ScenarioError, BUILTIN_SCENARIOS};
use village_test_utils::fixtures::config_to_ron;

fn scenario_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("scenarios")
}

// =============================================================================
// Bundled files
// =============================================================================

#[test]
fn test_bundled_scenarios_load_and_build() {
    let mut found = 0;
    for entry in std::fs::read_dir(scenario_dir()).unwrap() {
        let path = entry.unwrap().path();
        if path.extension().is_some_and(|e| e == "ron") {
            let scenario = Scenario::load(&path).unwrap();
            let sim = scenario.build(1).unwrap();
            assert_eq!(
                sim.index().structure_count(),
                scenario.placements.len(),
                "{}",
                path.display()
            );
            found += 1;
        }
    }
    assert!(found >= 3);
}

#[test]
fn test_bundled_files_match_builtins() {
    for name in ["default", "defended"] {
        let file = Scenario::load(scenario_dir().join(format!("{name}.ron"))).unwrap();
        let builtin = Scenario::builtin(name).unwrap();
        assert_eq!(file.placements, builtin.placements);
        assert_eq!(file.duration_seconds, builtin.duration_seconds);
        let mut file_stock = file.starting_inventory.clone();
        let mut builtin_stock = builtin.starting_inventory.clone();
        file_stock.sort();
        builtin_stock.sort();
        assert_eq!(file_stock, builtin_stock);
    }
}

#[test]
fn test_siege_uses_custom_rounds() {
    let scenario = Scenario {
        duration_seconds: 30.0,
        ..Scenario::load(scenario_dir().join("siege.ron")).unwrap()
    };
    let metrics = run_scenario(&scenario, 5).unwrap();
    assert!(!metrics.rounds.is_empty());
    assert!(metrics
        .rounds
        .iter()
        .all(|r| r == "armor" || r == "warlord"));
}

#[test]
fn test_resolve_prefers_builtin_names() {
    for name in BUILTIN_SCENARIOS {
        assert_eq!(Scenario::resolve(name).unwrap().name, name);
    }
}

// =============================================================================
// Files written at runtime
// =============================================================================

#[test]
fn test_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = Scenario::load(dir.path().join("absent.ron")).unwrap_err();
    assert!(matches!(err, ScenarioError::FileNotFound(_)));
}

#[test]
fn test_malformed_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.ron");
    std::fs::write(&path, "(name: \"broken\", duration_seconds: ").unwrap();
    assert!(matches!(
        Scenario::load(&path),
        Err(ScenarioError::ParseError(_))
    ));
}

#[test]
fn test_invalid_config_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad_config.ron");
    std::fs::write(&path, "(config: (fixed_step: 0.0))").unwrap();
    let scenario = Scenario::load(&path).unwrap();
    assert!(matches!(scenario.build(0), Err(ScenarioError::Game(_))));
}

#[test]
fn test_config_written_by_fixture_round_trips() {
    let mut config = village_test_utils::fixtures::config(9);
    config.wave_timer = 12.0;
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tuned.ron");
    let mut file = std::fs::File::create(&path).unwrap();
    writeln!(
        file,
        "(name: \"tuned\", duration_seconds: 15.0, config: {}, starting_inventory: [(wood, 25)])",
        config_to_ron(&config)
    )
    .unwrap();

    let scenario = Scenario::resolve(path.to_str().unwrap()).unwrap();
    assert_eq!(scenario.config.wave_timer, 12.0);
    let sim = scenario.build(3).unwrap();
    assert_eq!(sim.player().unwrap().inventory.get(Material::Wood), 25);
    // Seed comes from the run, not the file.
    assert_eq!(sim.config().seed, 3);
}

// =============================================================================
// End to end
// =============================================================================

#[test]
fn test_defended_outlasts_bare_village() {
    let bare = Scenario {
        duration_seconds: 120.0,
        ..Scenario::default()
    };
    let defended = Scenario {
        duration_seconds: 120.0,
        ..Scenario::defended()
    };
    let bare = run_scenario(&bare, 21).unwrap();
    let defended = run_scenario(&defended, 21).unwrap();
    assert_eq!(defended.outcome, Outcome::Survived);
    assert!(defended.damage_to_house <= bare.damage_to_house);
    assert!(defended.kills_by_turret.values().sum::<u32>() > 0);
}

#[test]
fn test_batch_from_file_saves_results() {
    let dir = tempfile::tempdir().unwrap();
    let scenario_path = dir.path().join("quick.ron");
    std::fs::write(
        &scenario_path,
        "(name: \"quick\", duration_seconds: 4.0, starting_inventory: [(wood, 10), (stone, 10)], \
         placements: [(recipe: \"turret_basic\", position: (100.0, 0.0))])",
    )
    .unwrap();

    let config = BatchConfig::new(scenario_path.to_str().unwrap(), 4)
        .with_seed(100)
        .with_output(dir.path().join("results"));
    let results = run_batch(config).unwrap();
    assert_eq!(results.summary.total_runs, 4);
    assert_eq!(results.summary.survived, 4);

    let out = results.config.output_dir.join("batch_results.json");
    results.save(&out).unwrap();
    let loaded = BatchResults::load(&out).unwrap();
    assert_eq!(loaded.runs.len(), 4);
    assert!(loaded.runs.iter().all(|r| r.scenario == "quick" && r.structures == 1));
}

#[test]
fn test_economy_determinism_report() {
    let scenario = Scenario {
        duration_seconds: 20.0,
        ..Scenario::economy()
    };
    let report = verify_determinism(&scenario, 77, 3).unwrap();
    assert!(report.is_deterministic());
    assert_eq!(report.scenario, "economy");
}
