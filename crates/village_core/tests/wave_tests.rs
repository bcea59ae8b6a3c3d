//! Wave scheduler and power curve tests.

use proptest::prelude::*;
use village_core::config::SimConfig;
use village_core::rng::SimRng;
use village_core::waves::{
    base_power, power_from_sample, spawn_interval, weighted_pick, RoundCatalog, WaveScheduler,
};
use village_test_utils::determinism::strategies;
use village_test_utils::fixtures;

const EPSILON: f64 = 1e-9;

// =============================================================================
// Power curve
// =============================================================================

#[test]
fn test_wave_one_power_bounds() {
    let config = SimConfig::default();
    let n = base_power(&config, 1, 1.0);
    assert!((n - 0.25).abs() < EPSILON);

    let k = config.enemy_power_variance;
    assert!((power_from_sample(n, k, 0.0) - 0.25 / 6.0).abs() < EPSILON);
    assert!((power_from_sample(n, k, 1.0) - 1.5).abs() < EPSILON);
}

#[test]
fn test_power_scales_per_wave() {
    let config = SimConfig::default();
    let w1 = base_power(&config, 1, 1.0);
    let w2 = base_power(&config, 2, 1.0);
    let w3 = base_power(&config, 3, 2.0);
    assert!((w2 / w1 - 1.3).abs() < EPSILON);
    assert!((w3 - 0.25 * 1.3 * 1.3 * 2.0).abs() < EPSILON);
}

#[test]
fn test_spawn_interval_halves_every_third_wave() {
    let config = SimConfig::default();
    assert!((spawn_interval(&config, 1, 1.0) - 3.0).abs() < EPSILON);
    assert!((spawn_interval(&config, 3, 1.0) - 1.5).abs() < EPSILON);
    assert!((spawn_interval(&config, 4, 0.5) - 1.5).abs() < EPSILON);
}

// =============================================================================
// Rounds
// =============================================================================

#[test]
fn test_weighted_pick_boundaries() {
    let weights = [1.0, 0.0, 3.0];
    assert_eq!(weighted_pick(weights, 0.0), Some(0));
    assert_eq!(weighted_pick(weights, 1.0), Some(0));
    assert_eq!(weighted_pick(weights, 1.5), Some(2));
    assert_eq!(weighted_pick(weights, 3.999), Some(2));
    // Overshoot falls back to the last positive weight.
    assert_eq!(weighted_pick(weights, 10.0), Some(2));
    assert_eq!(weighted_pick(std::iter::empty::<f64>(), 0.5), None);
    assert_eq!(weighted_pick([0.0, 0.0], 0.5), None);
}

#[test]
fn test_round_chosen_on_first_spawn_and_each_wave() {
    let config = SimConfig::default();
    let catalog = RoundCatalog::builtin();
    let mut rng = SimRng::from_seed(5);
    let mut scheduler = WaveScheduler::new(&config);

    let first = scheduler.plan_spawn(&catalog, &config, &mut rng);
    assert!(first.new_round.is_some());
    let second = scheduler.plan_spawn(&catalog, &config, &mut rng);
    assert!(second.new_round.is_none());

    assert!(scheduler.advance_wave(config.wave_timer, &config));
    assert_eq!(scheduler.wave, 2);
    let third = scheduler.plan_spawn(&catalog, &config, &mut rng);
    assert!(third.new_round.is_some());
}

#[test]
fn test_custom_catalog_from_ron() {
    let ron = r#"(
        rounds: [
            (
                id: "only_tanks",
                weight: 1.0,
                enemies: [(tank, 1.0)],
                spawn_rate_multiplier: 1.0,
                description: "Nothing but tanks.",
            ),
        ],
    )"#;
    let catalog = RoundCatalog::from_ron_str(ron).unwrap();
    let mut sim =
        village_core::simulation::Simulation::with_catalog(fixtures::config(3), catalog).unwrap();
    sim.start().unwrap();

    let mut round = None;
    for _ in 0..400 {
        round = round.or(sim.tick().round_selected);
    }
    assert_eq!(round.as_deref(), Some("only_tanks"));
    for &id in &sim.index().enemies {
        let enemy = sim.get_entity(id).unwrap().as_enemy().unwrap();
        assert_eq!(enemy.kind, village_core::enemy::EnemyKind::Tank);
    }
}

#[test]
fn test_empty_catalog_is_rejected() {
    let catalog = RoundCatalog::from_ron_str("(rounds: [])");
    assert!(catalog.is_err());
}

// =============================================================================
// Properties
// =============================================================================

proptest! {
    #[test]
    fn prop_power_within_variance_bounds(
        wave in strategies::arb_wave(),
        k in strategies::arb_variance(),
        t in 0.0f64..=1.0,
    ) {
        let config = SimConfig::default();
        let n = base_power(&config, wave, 1.0);
        let p = power_from_sample(n, k, t);
        prop_assert!(p >= n / k - EPSILON * n);
        prop_assert!(p <= n * k + EPSILON * n * k);
    }

    #[test]
    fn prop_power_monotonic_in_sample(
        k in strategies::arb_variance(),
        a in 0.0f64..=1.0,
        b in 0.0f64..=1.0,
    ) {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(power_from_sample(1.0, k, lo) <= power_from_sample(1.0, k, hi));
    }

    #[test]
    fn prop_most_spawns_are_weak(seed in strategies::arb_seed()) {
        // With k = 6, t^6 < 0.1 for t below ~0.68, so most draws stay under
        // n/k + 0.1 * (k*n - n/k).
        let config = SimConfig::default();
        let n = 1.0;
        let k = config.enemy_power_variance;
        let threshold = n / k + 0.1 * (k * n - n / k);
        let mut rng = SimRng::from_seed(seed);
        let weak = (0..400)
            .filter(|_| village_core::waves::sample_power(n, &config, &mut rng) < threshold)
            .count();
        prop_assert!(weak > 200, "only {} of 400 below threshold", weak);
    }

    #[test]
    fn prop_weighted_pick_in_range(unit in 0.0f64..1.0) {
        let catalog = RoundCatalog::builtin();
        let total: f64 = catalog.rounds().iter().map(|r| r.weight).sum();
        let picked = weighted_pick(catalog.rounds().iter().map(|r| r.weight), unit * total);
        prop_assert!(picked.is_some_and(|i| i < catalog.rounds().len()));
    }
}
