//! Replay harness for the village simulation.
//!
//! The step is only reproducible if every random branch draws from the
//! simulation's seeded stream, entities are visited in ascending id order,
//! and a restored snapshot carries the stream position with it. Each helper
//! here replays a setup and compares [`Simulation::state_hash`] values.

use village_core::simulation::Simulation;

/// Final hashes of several replays of the same setup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayReport {
    /// Final hash of each replay, in replay order.
    pub final_hashes: Vec<u64>,
    /// Steps taken by every replay.
    pub ticks: u64,
}

impl ReplayReport {
    /// True when every replay ended on the same hash.
    #[must_use]
    pub fn is_deterministic(&self) -> bool {
        self.final_hashes.iter().all(|h| Some(h) == self.final_hashes.first())
    }

    /// Number of different final hashes seen.
    #[must_use]
    pub fn distinct_outcomes(&self) -> usize {
        let mut seen = self.final_hashes.clone();
        seen.sort_unstable();
        seen.dedup();
        seen.len()
    }

    /// # Panics
    ///
    /// Panics listing every final hash when the replays disagree.
    pub fn assert_deterministic(&self) {
        assert!(
            self.is_deterministic(),
            "{} replays of {} ticks ended in {} different states: {:x?}",
            self.final_hashes.len(),
            self.ticks,
            self.distinct_outcomes(),
            self.final_hashes
        );
    }
}

/// Build a state with `setup`, advance it `ticks` times with `step`, and
/// record `hash` of the result; repeat `runs` times.
///
/// ```
/// use village_test_utils::determinism::verify_determinism;
///
/// let report = verify_determinism(3, 10, || 0u64, |n| *n += 2, |n| *n);
/// report.assert_deterministic();
/// assert_eq!(report.final_hashes, vec![20, 20, 20]);
/// ```
pub fn verify_determinism<S>(
    runs: usize,
    ticks: u64,
    setup: impl Fn() -> S,
    step: impl Fn(&mut S),
    hash: impl Fn(&S) -> u64,
) -> ReplayReport {
    let final_hashes = (0..runs)
        .map(|_| {
            let mut state = setup();
            (0..ticks).for_each(|_| step(&mut state));
            hash(&state)
        })
        .collect();
    ReplayReport {
        final_hashes,
        ticks,
    }
}

/// Replay `setup` twice with plain ticks and report whether both agree.
pub fn verify_simulation_determinism(setup: impl Fn() -> Simulation, ticks: u64) -> bool {
    verify_determinism(
        2,
        ticks,
        setup,
        |sim| {
            sim.tick();
        },
        Simulation::state_hash,
    )
    .is_deterministic()
}

/// Step two copies of `setup` side by side and return the first tick after
/// which their hashes differ (0 when they already differ when built).
pub fn find_first_divergence(setup: impl Fn() -> Simulation, ticks: u64) -> Option<u64> {
    let (mut left, mut right) = (setup(), setup());
    let mut tick = 0;
    loop {
        let (a, b) = (left.state_hash(), right.state_hash());
        if a != b {
            tracing::warn!(tick, left = a, right = b, "replays diverged");
            return Some(tick);
        }
        if tick == ticks {
            return None;
        }
        left.tick();
        right.tick();
        tick += 1;
    }
}

/// Advance `setup` by `warmup` ticks, snapshot and restore it, then check the
/// restored copy matches the live one now and after `follow` more ticks.
pub fn verify_serialization_determinism(
    setup: impl Fn() -> Simulation,
    warmup: u64,
    follow: u64,
) -> bool {
    let mut live = setup();
    (0..warmup).for_each(|_| {
        live.tick();
    });

    let restored = live
        .serialize()
        .ok()
        .and_then(|bytes| Simulation::deserialize(&bytes).ok());
    let Some(mut restored) = restored else {
        tracing::warn!(warmup, "snapshot round trip failed");
        return false;
    };

    for step in 0..=follow {
        if restored.state_hash() != live.state_hash() {
            tracing::warn!(warmup, step, "restored snapshot drifted");
            return false;
        }
        if step < follow {
            live.tick();
            restored.tick();
        }
    }
    true
}

/// Proptest strategies over simulation inputs.
pub mod strategies {
    use proptest::prelude::*;
    use village_core::enemy::EnemyKind;
    use village_core::math::DVec2;
    use village_core::player::PlayerInput;

    /// Any simulation seed.
    pub fn arb_seed() -> impl Strategy<Value = u64> {
        any::<u64>()
    }

    /// Wave numbers a long game reaches.
    pub fn arb_wave() -> impl Strategy<Value = u32> {
        1u32..40u32
    }

    /// Power variance factor `k`.
    pub fn arb_variance() -> impl Strategy<Value = f64> {
        1.0f64..12.0f64
    }

    /// Any enemy kind.
    pub fn arb_enemy_kind() -> impl Strategy<Value = EnemyKind> {
        proptest::sample::select(EnemyKind::ALL.to_vec())
    }

    /// A point inside the playable area.
    pub fn arb_world_point() -> impl Strategy<Value = DVec2> {
        (-2000.0f64..2000.0, -2000.0f64..2000.0).prop_map(|(x, y)| DVec2::new(x, y))
    }

    /// Movement-only player input.
    pub fn arb_movement_input() -> impl Strategy<Value = PlayerInput> {
        (-1.0f64..1.0, -1.0f64..1.0).prop_map(|(x, y)| PlayerInput {
            movement: DVec2::new(x, y),
            build_at: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use proptest::prelude::*;
    use village_core::config::SimConfig;

    // =========================================================================
    // Harness behaviour
    // =========================================================================

    #[test]
    fn test_counter_replays_agree() {
        let report = verify_determinism(4, 60, || 1u64, |n| *n *= 3, |n| *n % 1_000_007);
        assert!(report.is_deterministic());
        assert_eq!(report.distinct_outcomes(), 1);
        assert_eq!(report.ticks, 60);
    }

    #[test]
    fn test_fresh_state_each_replay_is_caught() {
        let builds = std::cell::Cell::new(0u64);
        let report = verify_determinism(
            3,
            1,
            || {
                builds.set(builds.get() + 1);
                builds.get()
            },
            |_| {},
            |n| *n,
        );
        assert!(!report.is_deterministic());
        assert_eq!(report.distinct_outcomes(), 3);
    }

    #[test]
    #[should_panic(expected = "different states")]
    fn test_assert_reports_disagreement() {
        ReplayReport {
            final_hashes: vec![1, 2],
            ticks: 5,
        }
        .assert_deterministic();
    }

    #[test]
    fn test_zero_replays_count_as_deterministic() {
        let report = verify_determinism(0, 10, || 0u8, |_| {}, |_| 0);
        assert!(report.is_deterministic());
        assert_eq!(report.distinct_outcomes(), 0);
    }

    // =========================================================================
    // Village simulation
    // =========================================================================

    #[test]
    fn test_playing_village_replays() {
        assert!(verify_simulation_determinism(|| fixtures::playing(7), 600));
    }

    #[test]
    fn test_defended_village_never_diverges() {
        assert_eq!(find_first_divergence(fixtures::defended_village, 900), None);
    }

    #[test]
    fn test_divergent_seeds_flagged_at_build() {
        let seeds = std::cell::Cell::new(0u64);
        let setup = || {
            seeds.set(seeds.get() + 1);
            fixtures::playing(seeds.get())
        };
        assert_eq!(find_first_divergence(setup, 10), Some(0));
    }

    #[test]
    fn test_snapshot_of_defended_village_continues() {
        assert!(verify_serialization_determinism(fixtures::defended_village, 300, 300));
    }

    #[test]
    fn test_unstarted_village_stays_frozen() {
        let sim = Simulation::new(SimConfig::default()).unwrap();
        let report = verify_determinism(
            2,
            50,
            || sim.clone(),
            |s| {
                s.tick();
            },
            Simulation::state_hash,
        );
        report.assert_deterministic();
        assert_eq!(report.final_hashes[0], sim.state_hash());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(8))]

        #[test]
        fn prop_any_seed_replays(seed in strategies::arb_seed()) {
            prop_assert!(verify_simulation_determinism(|| fixtures::playing(seed), 120));
        }

        #[test]
        fn prop_held_movement_replays(
            seed in strategies::arb_seed(),
            input in strategies::arb_movement_input(),
        ) {
            let setup = || {
                let mut sim = fixtures::playing(seed);
                sim.set_input(input);
                sim
            };
            prop_assert!(verify_simulation_determinism(setup, 120));
        }
    }
}
