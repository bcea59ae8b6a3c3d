//! Simulation benchmarks for village_core.
//!
//! Run with: `cargo bench -p village_core`

// Benchmark binaries don't need docs on macro-generated functions
#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use village_core::enemy::EnemyKind;
use village_core::math::polar;
use village_core::simulation::Simulation;
use village_test_utils::fixtures;

/// A defended village with a crowd of enemies closing in.
fn crowded() -> Simulation {
    let mut sim = fixtures::defended_village();
    for i in 0..150 {
        let angle = f64::from(i) * 0.37;
        let kind = EnemyKind::ALL[i as usize % EnemyKind::ALL.len()];
        sim.spawn_enemy_at(kind, 2.0, polar(angle, 700.0))
            .unwrap();
    }
    sim
}

pub fn simulation_benchmark(c: &mut Criterion) {
    c.bench_function("tick_default_world", |b| {
        b.iter_batched(
            || fixtures::playing(1),
            |mut sim| {
                for _ in 0..60 {
                    black_box(sim.tick());
                }
                sim
            },
            BatchSize::SmallInput,
        )
    });

    c.bench_function("tick_crowded_world", |b| {
        b.iter_batched(
            crowded,
            |mut sim| {
                for _ in 0..60 {
                    black_box(sim.tick());
                }
                sim
            },
            BatchSize::SmallInput,
        )
    });

    let sim = crowded();
    c.bench_function("state_hash", |b| b.iter(|| black_box(sim.state_hash())));
    c.bench_function("snapshot_roundtrip", |b| {
        b.iter(|| {
            let bytes = sim.serialize().unwrap();
            black_box(Simulation::deserialize(&bytes).unwrap())
        })
    });
}

criterion_group!(benches, simulation_benchmark);
criterion_main!(benches);
