//! Combat tests that drive whole simulation steps.
//!
//! Each test builds a quiet world (no scheduled enemies, no ambient
//! resources), places entities by hand and checks the outcome after a few
//! fixed steps.

use village_core::components::{Color, EntityKind};
use village_core::economy::Material;
use village_core::enemy::{damage_for_power, Enemy, EnemyKind};
use village_core::math::DVec2;
use village_core::projectile::Projectile;
use village_core::rng::SimRng;
use village_core::simulation::{Simulation, TickEvents};
use village_core::turret::{Turret, TurretKind};
use village_test_utils::fixtures;

fn quiet() -> Simulation {
    fixtures::start(fixtures::quiet_config())
}

/// Far from the house and the player.
const FIELD: DVec2 = DVec2::new(1000.0, 1000.0);

fn turret_at(sim: &mut Simulation, kind: TurretKind, position: DVec2) -> u64 {
    let turret = Turret::spawn(kind, position, sim.recipes());
    sim.insert_entity(turret)
}

fn damage_from(events: &TickEvents, source: u64, target: u64) -> Vec<f64> {
    events
        .damage_events
        .iter()
        .filter(|e| e.source == Some(source) && e.target == target)
        .map(|e| e.amount)
        .collect()
}

fn spawned_projectiles(sim: &Simulation, events: &TickEvents) -> Vec<u64> {
    events
        .spawned
        .iter()
        .copied()
        .filter(|&id| sim.get_entity(id).is_some_and(|e| e.kind() == EntityKind::Projectile))
        .collect()
}

fn health_of(sim: &Simulation, id: u64) -> (f64, f64) {
    let health = sim.get_entity(id).unwrap().health().unwrap();
    (health.current, health.max)
}

// =============================================================================
// Area damage
// =============================================================================

#[test]
fn test_aoe_turret_hits_only_enemies_in_range() {
    let mut sim = quiet();
    let origin = DVec2::new(1000.0, 1000.0);
    let turret = Turret::spawn(TurretKind::Aoe, origin, sim.recipes());
    let turret_id = sim.insert_entity(turret);

    let near = sim
        .spawn_enemy_at(EnemyKind::Tank, 50.0, origin + DVec2::new(50.0, 0.0))
        .unwrap();
    let mid = sim
        .spawn_enemy_at(EnemyKind::Tank, 50.0, origin + DVec2::new(100.0, 0.0))
        .unwrap();
    let far = sim
        .spawn_enemy_at(EnemyKind::Tank, 50.0, origin + DVec2::new(200.0, 0.0))
        .unwrap();

    sim.tick();

    let (near_hp, near_max) = health_of(&sim, near);
    let (mid_hp, mid_max) = health_of(&sim, mid);
    let (far_hp, far_max) = health_of(&sim, far);
    assert!(near_hp < near_max);
    assert!(mid_hp < mid_max);
    assert_eq!(far_hp, far_max);

    let turret = sim.get_entity(turret_id).unwrap().as_turret().unwrap();
    assert!(turret.cooldown > 0.0);
}

// =============================================================================
// Projectiles
// =============================================================================

#[test]
fn test_piercing_shot_hits_each_enemy_once() {
    let mut sim = quiet();
    let ids: Vec<_> = [1000.0, 1100.0, 1200.0]
        .into_iter()
        .map(|x| {
            sim.spawn_enemy_at(EnemyKind::Tank, 100.0, DVec2::new(x, 0.0))
                .unwrap()
        })
        .collect();

    let shot = Projectile::new(1.0, 2000.0, None)
        .piercing()
        .aimed(0.0)
        .spawn(DVec2::new(900.0, 0.0), Color(0xff_ff_ff));
    let shot_id = sim.insert_entity(shot);

    for _ in 0..30 {
        sim.tick();
    }

    for id in ids {
        let (current, max) = health_of(&sim, id);
        assert_eq!(current, max - 1.0, "enemy {id} should be hit exactly once");
    }
    let projectile = sim.get_entity(shot_id).unwrap().as_projectile().unwrap();
    assert_eq!(projectile.hit_list.len(), 3);
}

#[test]
fn test_shot_leaving_world_is_removed() {
    let mut sim = quiet();
    let shot = Projectile::new(1.0, 2000.0, None)
        .aimed(0.0)
        .spawn(DVec2::new(4900.0, 0.0), Color(0xff_ff_ff));
    let shot_id = sim.insert_entity(shot);

    let mut removed = false;
    for _ in 0..10 {
        removed |= sim.tick().deaths.contains(&shot_id);
    }
    assert!(removed);
    assert!(sim.get_entity(shot_id).is_none());
}

// =============================================================================
// Shields
// =============================================================================

#[test]
fn test_shielded_damage_converges() {
    let mut rng = SimRng::from_seed(1234);
    let mut enemy = Enemy::new(EnemyKind::Shielded, 1.0e6, 1, 0.0);

    let total: f64 = (0..1000)
        .map(|_| enemy.take_damage(100.0, None, &mut rng).applied)
        .sum();

    // Expected 1000 x 100 x (0.5 x 1.0 + 0.5 x 0.1); sd of the sum is about 1.4k.
    assert!((total - 55_000.0).abs() < 5_000.0, "total damage {total}");
}

#[test]
fn test_unshielded_damage_is_exact() {
    let mut rng = SimRng::from_seed(1234);
    let mut enemy = Enemy::new(EnemyKind::Normal, 1.0e6, 1, 0.0);
    let total: f64 = (0..100)
        .map(|_| enemy.take_damage(100.0, None, &mut rng).applied)
        .sum();
    assert_eq!(total, 10_000.0);
}

// =============================================================================
// House
// =============================================================================

#[test]
fn test_enemy_at_house_deals_damage() {
    let mut sim = quiet();
    let max = sim.house_health().unwrap().max;
    sim.spawn_enemy_at(EnemyKind::Normal, 10.0, DVec2::new(80.0, -80.0))
        .unwrap();

    for _ in 0..300 {
        sim.tick();
    }
    assert!(sim.house_health().unwrap().current < max);
}

// =============================================================================
// Tesla chain
// =============================================================================

#[test]
fn test_tesla_chain_falls_off_and_stops_after_two_hops() {
    let mut sim = quiet();
    let tesla = turret_at(&mut sim, TurretKind::Tesla, FIELD);
    let enemies: Vec<u64> = [50.0, 180.0, 310.0, 460.0]
        .into_iter()
        .map(|dx| {
            sim.spawn_enemy_at(EnemyKind::Tank, 1000.0, FIELD + DVec2::new(dx, 0.0))
                .unwrap()
        })
        .collect();
    let damage = sim.get_entity(tesla).unwrap().as_turret().unwrap().damage;

    let events = sim.tick();

    assert_eq!(damage_from(&events, tesla, enemies[0]), vec![damage]);
    assert_eq!(damage_from(&events, tesla, enemies[1]), vec![damage * 0.8]);
    assert_eq!(damage_from(&events, tesla, enemies[2]), vec![damage * 0.8]);
    assert!(damage_from(&events, tesla, enemies[3]).is_empty());
}

#[test]
fn test_tesla_link_range_is_measured_from_previous_link() {
    let mut sim = quiet();
    let tesla = turret_at(&mut sim, TurretKind::Tesla, FIELD);
    let first = sim
        .spawn_enemy_at(EnemyKind::Tank, 1000.0, FIELD + DVec2::new(50.0, 0.0))
        .unwrap();
    // In turret range, but 160 units from the first link.
    let beyond = sim
        .spawn_enemy_at(EnemyKind::Tank, 1000.0, FIELD + DVec2::new(-110.0, 0.0))
        .unwrap();

    let events = sim.tick();

    assert_eq!(damage_from(&events, tesla, first).len(), 1);
    assert!(damage_from(&events, tesla, beyond).is_empty());
}

#[test]
fn test_tesla_never_rehits_a_chained_enemy() {
    let mut sim = quiet();
    let tesla = turret_at(&mut sim, TurretKind::Tesla, FIELD);
    let a = sim
        .spawn_enemy_at(EnemyKind::Tank, 1000.0, FIELD + DVec2::new(50.0, 0.0))
        .unwrap();
    let b = sim
        .spawn_enemy_at(EnemyKind::Tank, 1000.0, FIELD + DVec2::new(100.0, 0.0))
        .unwrap();

    let events = sim.tick();

    assert_eq!(damage_from(&events, tesla, a).len(), 1);
    assert_eq!(damage_from(&events, tesla, b).len(), 1);
    let from_tesla = events
        .damage_events
        .iter()
        .filter(|e| e.source == Some(tesla))
        .count();
    assert_eq!(from_tesla, 2);
}

// =============================================================================
// Shotgun and teleport turrets
// =============================================================================

#[test]
fn test_shotgun_fans_five_pellets() {
    let mut sim = quiet();
    turret_at(&mut sim, TurretKind::Shotgun, FIELD);
    sim.spawn_enemy_at(EnemyKind::Tank, 1000.0, FIELD + DVec2::new(100.0, 0.0))
        .unwrap();

    let events = sim.tick();
    let pellets = spawned_projectiles(&sim, &events);
    assert_eq!(pellets.len(), 5);

    let mut angles: Vec<f64> = pellets
        .iter()
        .map(|&id| {
            let velocity = sim.get_entity(id).unwrap().as_projectile().unwrap().velocity;
            velocity.y.atan2(velocity.x)
        })
        .collect();
    angles.sort_by(f64::total_cmp);
    for (angle, expected) in angles.iter().zip([-0.3, -0.15, 0.0, 0.15, 0.3]) {
        assert!((angle - expected).abs() < 1e-9, "pellet at {angle}");
    }
}

#[test]
fn test_teleport_turret_pushes_enemy_away() {
    let mut sim = quiet();
    let turret = turret_at(&mut sim, TurretKind::Teleport, FIELD);
    let enemy = sim
        .spawn_enemy_at(EnemyKind::Tank, 1000.0, FIELD + DVec2::new(100.0, 0.0))
        .unwrap();
    let (before, _) = health_of(&sim, enemy);

    sim.tick();

    // Pushed 200 units, then one step of its own walk.
    let distance = sim.get_entity(enemy).unwrap().position().distance(FIELD);
    assert!((distance - 300.0).abs() < 1.0, "enemy at {distance}");
    assert_eq!(health_of(&sim, enemy).0, before);
    let turret = sim.get_entity(turret).unwrap().as_turret().unwrap();
    assert_eq!(turret.cooldown, turret.fire_rate);
}

// =============================================================================
// Disruptors
// =============================================================================

#[test]
fn test_disruptor_paralyzes_turret_and_vanishes() {
    let mut sim = quiet();
    let house_max = sim.house_health().unwrap().max;
    let turret = turret_at(&mut sim, TurretKind::Basic, FIELD);
    let disruptor = sim
        .spawn_enemy_at(EnemyKind::Disruptor, 1000.0, FIELD + DVec2::new(40.0, 0.0))
        .unwrap();
    // Stays in range of the turret until long after the paralysis ends.
    sim.spawn_enemy_at(EnemyKind::Teleporter, 1000.0, FIELD + DVec2::new(120.0, 120.0))
        .unwrap();
    let paralyzed = |sim: &Simulation| {
        sim.get_entity(turret)
            .unwrap()
            .as_turret()
            .unwrap()
            .is_paralyzed()
    };

    let mut ticks = 0;
    while !paralyzed(&sim) {
        sim.tick();
        ticks += 1;
        assert!(ticks < 60, "disruptor never reached the turret");
    }
    assert!(sim.get_entity(disruptor).is_none());
    assert_eq!(sim.house_health().unwrap().current, house_max);

    for _ in 0..295 {
        let events = sim.tick();
        assert!(paralyzed(&sim));
        assert!(spawned_projectiles(&sim, &events).is_empty());
    }

    let mut fired = false;
    for _ in 0..120 {
        let events = sim.tick();
        fired |= !spawned_projectiles(&sim, &events).is_empty();
    }
    assert!(!paralyzed(&sim));
    assert!(fired, "turret should fire again once the paralysis wears off");
}

// =============================================================================
// Kill rewards
// =============================================================================

fn kill_with(kind: TurretKind) -> (TickEvents, u32) {
    let mut sim = quiet();
    let turret = turret_at(&mut sim, kind, FIELD);
    sim.spawn_enemy_at(EnemyKind::Normal, 0.01, FIELD + DVec2::new(60.0, 0.0))
        .unwrap();

    let mut events = TickEvents::default();
    for _ in 0..120 {
        events.merge(sim.tick());
    }
    let kills = sim.get_entity(turret).unwrap().as_turret().unwrap().kill_count;
    (events, kills)
}

#[test]
fn test_money_turret_kill_drops_five_of_one_material() {
    let (events, kills) = kill_with(TurretKind::Money);
    assert_eq!(events.enemies_killed, 1);
    assert_eq!(kills, 1);
    assert_eq!(events.gathered.total(), 5);

    let looted: Vec<Material> = events
        .gathered
        .iter()
        .filter(|&(_, amount)| amount > 0)
        .map(|(material, _)| material)
        .collect();
    assert_eq!(looted.len(), 1);
    assert!([Material::Wood, Material::Stone, Material::Iron, Material::Crystal]
        .contains(&looted[0]));
}

#[test]
fn test_regular_turret_kill_drops_nothing() {
    let (events, kills) = kill_with(TurretKind::Basic);
    assert_eq!(events.enemies_killed, 1);
    assert_eq!(kills, 1);
    assert_eq!(events.gathered.total(), 0);
}

// =============================================================================
// Enemy attacks
// =============================================================================

#[test]
fn test_enemy_attacks_house_once_per_second() {
    let mut sim = quiet();
    let house = sim.index().house.unwrap();
    sim.spawn_enemy_at(EnemyKind::Normal, 1000.0, DVec2::new(50.0, 0.0))
        .unwrap();

    let mut hits = Vec::new();
    for tick in 0..100 {
        let events = sim.tick();
        for event in events.damage_events.iter().filter(|e| e.target == house) {
            assert_eq!(event.amount, damage_for_power(1000.0));
            hits.push(tick);
        }
    }

    assert_eq!(hits.len(), 2, "hits on ticks {hits:?}");
    assert_eq!(hits[0], 0);
    assert!((60..=61).contains(&hits[1]), "second hit on tick {}", hits[1]);
}
