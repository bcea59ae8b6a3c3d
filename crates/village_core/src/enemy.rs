//! Enemy kinds, stats and behaviour.
//!
//! Each [`EnemyKind`] maps to a stat profile, a movement strategy and an
//! attack style. Adding a kind means adding one row to each table below;
//! the update loop itself never matches on individual kinds.
//!
//! # Stats
//!
//! An enemy's strength is a single scalar *power*:
//! - health = `power × 20 × health_multiplier`
//! - damage = `10 × log2(power + 1)`

use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};

use serde::{Deserialize, Serialize};

use crate::combat::DamageEvent;
use crate::components::{Color, EntityId, EntityKind, Health, StatusEffects};
use crate::entity::{DamageOutcome, Entity, EntityBody, EntityCore, Neighbors, TickContext};
use crate::math::{bearing, direction, polar, DVec2};
use crate::particles::Burst;
use crate::rng::SimRng;

/// Health regenerated per second by regenerators, as a share of max.
const REGEN_RATE: f64 = 0.05;

/// Seconds between attacks.
const ATTACK_COOLDOWN: f64 = 1.0;

/// Seconds a disruptor paralyzes a turret.
const PARALYZE_TIME: f64 = 5.0;

/// Power share inherited by each splitter child.
const SPLIT_POWER: f64 = 0.4;

/// Radius of splitter children; parents at or below it do not split.
const SPLIT_RADIUS: f64 = 10.0;

/// Behaviour tag of an enemy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnemyKind {
    /// Plain walker.
    Normal,
    /// Quick and fragile.
    Fast,
    /// Slow and tough.
    Tank,
    /// Hunts turrets and paralyzes them.
    Disruptor,
    /// Approaches at a 45° offset.
    Spiral,
    /// Alternates standing still and dashing.
    Stopgo,
    /// Weaves left and right.
    Zigzag,
    /// Huge and very tough.
    Boss,
    /// Hard to see.
    Stealth,
    /// Heals over time.
    Regenerator,
    /// Splits into two fast enemies on death.
    Splitter,
    /// Randomly blocks most of a hit.
    Shielded,
    /// Explodes on contact.
    Kamikaze,
    /// Fast with very little health.
    GlassCannon,
    /// Heals by the damage it deals.
    Vampire,
    /// Jumps instead of walking.
    Teleporter,
    /// Circles the target, closing in slowly.
    Orbital,
    /// Jitters randomly.
    Glitch,
    /// Slow with lots of health.
    Void,
}

/// Base stats of an enemy kind.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnemyProfile {
    /// Units per second.
    pub speed: f64,
    /// Collision radius.
    pub radius: f64,
    /// Scales the power-derived health.
    pub health_multiplier: f64,
    /// Display color.
    pub color: Color,
}

/// How an enemy closes in on its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Movement {
    /// Straight at the target.
    Direct,
    /// Stop for 1.5s, dash at 4× speed for 0.5s.
    StopGo,
    /// Jump 100 units every 2s; never walks.
    Teleport,
    /// Bearing rotated by 45°.
    Spiral,
    /// Bearing oscillating by `sin(t·5)·90°`.
    Zigzag,
    /// Follow a slowly shrinking orbit.
    Orbital,
    /// Occasional random displacement, otherwise direct.
    Glitch,
}

/// What happens when an enemy reaches its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttackStyle {
    /// Deal damage.
    Strike,
    /// Paralyze a turret and self-destruct.
    Paralyze,
    /// Deal triple damage and self-destruct.
    Explode,
    /// Deal damage and heal by the same amount.
    Drain,
}

impl EnemyKind {
    /// Every kind.
    pub const ALL: [EnemyKind; 19] = [
        EnemyKind::Normal,
        EnemyKind::Fast,
        EnemyKind::Tank,
        EnemyKind::Disruptor,
        EnemyKind::Spiral,
        EnemyKind::Stopgo,
        EnemyKind::Zigzag,
        EnemyKind::Boss,
        EnemyKind::Stealth,
        EnemyKind::Regenerator,
        EnemyKind::Splitter,
        EnemyKind::Shielded,
        EnemyKind::Kamikaze,
        EnemyKind::GlassCannon,
        EnemyKind::Vampire,
        EnemyKind::Teleporter,
        EnemyKind::Orbital,
        EnemyKind::Glitch,
        EnemyKind::Void,
    ];

    /// Base stats for this kind.
    #[must_use]
    pub const fn profile(self) -> EnemyProfile {
        let (speed, radius, health_multiplier, color) = match self {
            EnemyKind::Normal => (50.0, 15.0, 1.0, 0xe7_4c_3c),
            EnemyKind::Fast => (100.0, 10.0, 0.6, 0xf1_c4_0f),
            EnemyKind::Tank => (25.0, 25.0, 3.0, 0x2c_3e_50),
            EnemyKind::Disruptor => (50.0, 15.0, 1.0, 0xe6_7e_22),
            EnemyKind::Spiral => (60.0, 15.0, 1.0, 0x9b_59_b6),
            EnemyKind::Stopgo => (50.0, 15.0, 1.0, 0x34_98_db),
            EnemyKind::Zigzag => (60.0, 15.0, 1.0, 0x1a_bc_9c),
            EnemyKind::Boss => (20.0, 40.0, 10.0, 0x8e_44_ad),
            EnemyKind::Stealth => (40.0, 15.0, 1.0, 0x64_64_64),
            EnemyKind::Regenerator => (50.0, 15.0, 1.5, 0x2e_cc_71),
            EnemyKind::Splitter => (50.0, 20.0, 1.2, 0xd3_54_00),
            EnemyKind::Shielded => (50.0, 15.0, 2.0, 0x95_a5_a6),
            EnemyKind::Kamikaze => (80.0, 15.0, 0.5, 0xc0_39_2b),
            EnemyKind::GlassCannon => (70.0, 15.0, 0.3, 0xec_f0_f1),
            EnemyKind::Vampire => (50.0, 15.0, 1.0, 0x7f_8c_8d),
            EnemyKind::Teleporter => (0.0, 15.0, 1.0, 0x8e_44_ad),
            EnemyKind::Orbital => (60.0, 15.0, 1.0, 0x29_80_b9),
            EnemyKind::Glitch => (100.0, 15.0, 1.0, 0xff_00_ff),
            EnemyKind::Void => (30.0, 15.0, 4.0, 0x00_00_00),
        };
        EnemyProfile {
            speed,
            radius,
            health_multiplier,
            color: Color(color),
        }
    }

    /// Movement strategy for this kind.
    #[must_use]
    pub const fn movement(self) -> Movement {
        match self {
            EnemyKind::Stopgo => Movement::StopGo,
            EnemyKind::Teleporter => Movement::Teleport,
            EnemyKind::Spiral => Movement::Spiral,
            EnemyKind::Zigzag => Movement::Zigzag,
            EnemyKind::Orbital => Movement::Orbital,
            EnemyKind::Glitch => Movement::Glitch,
            _ => Movement::Direct,
        }
    }

    /// Attack style for this kind.
    #[must_use]
    pub const fn attack_style(self) -> AttackStyle {
        match self {
            EnemyKind::Disruptor => AttackStyle::Paralyze,
            EnemyKind::Kamikaze => AttackStyle::Explode,
            EnemyKind::Vampire => AttackStyle::Drain,
            _ => AttackStyle::Strike,
        }
    }

    /// Whether this kind goes after the nearest turret instead of the house.
    #[must_use]
    pub const fn hunts_turrets(self) -> bool {
        matches!(self, EnemyKind::Disruptor)
    }

    /// Whether this kind heals over time.
    #[must_use]
    pub const fn regenerates(self) -> bool {
        matches!(self, EnemyKind::Regenerator)
    }

    /// Whether incoming hits may be blocked.
    #[must_use]
    pub const fn shielded(self) -> bool {
        matches!(self, EnemyKind::Shielded)
    }

    /// Lowercase name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            EnemyKind::Normal => "normal",
            EnemyKind::Fast => "fast",
            EnemyKind::Tank => "tank",
            EnemyKind::Disruptor => "disruptor",
            EnemyKind::Spiral => "spiral",
            EnemyKind::Stopgo => "stopgo",
            EnemyKind::Zigzag => "zigzag",
            EnemyKind::Boss => "boss",
            EnemyKind::Stealth => "stealth",
            EnemyKind::Regenerator => "regenerator",
            EnemyKind::Splitter => "splitter",
            EnemyKind::Shielded => "shielded",
            EnemyKind::Kamikaze => "kamikaze",
            EnemyKind::GlassCannon => "glass_cannon",
            EnemyKind::Vampire => "vampire",
            EnemyKind::Teleporter => "teleporter",
            EnemyKind::Orbital => "orbital",
            EnemyKind::Glitch => "glitch",
            EnemyKind::Void => "void",
        }
    }
}

/// Health for `power`, before the kind multiplier.
#[must_use]
pub fn health_for_power(power: f64) -> f64 {
    power * 20.0
}

/// Attack damage for `power`.
#[must_use]
pub fn damage_for_power(power: f64) -> f64 {
    10.0 * (power + 1.0).log2()
}

/// Enemy state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Enemy {
    /// Behaviour tag.
    pub kind: EnemyKind,
    /// Strength scalar.
    pub power: f64,
    /// Hit points.
    pub health: Health,
    /// Damage per attack.
    pub damage: f64,
    /// Speed before effects and patterns.
    pub base_speed: f64,
    /// Default target (the house).
    pub target: EntityId,
    /// Seconds until the next attack is allowed.
    pub attack_cooldown: f64,
    /// Timer for patterned movement.
    pub state_timer: f64,
    /// Phase for patterned movement (stop/go).
    pub state: u8,
    /// Current orbit angle (orbital kind).
    pub orbit_angle: f64,
    /// Active status effects.
    pub effects: StatusEffects,
    /// Last entity that hit this enemy with a recorded source.
    pub last_hit_source: Option<EntityId>,
}

impl Enemy {
    /// Create enemy state of `kind` and `power` heading for `target`.
    #[must_use]
    pub fn new(kind: EnemyKind, power: f64, target: EntityId, orbit_angle: f64) -> Self {
        let profile = kind.profile();
        Self {
            kind,
            power,
            health: Health::new(health_for_power(power) * profile.health_multiplier),
            damage: damage_for_power(power),
            base_speed: profile.speed,
            target,
            attack_cooldown: 0.0,
            state_timer: 0.0,
            state: 0,
            orbit_angle,
            effects: StatusEffects::default(),
            last_hit_source: None,
        }
    }

    /// Build an enemy entity at `position` targeting the entity `target`
    /// located at `target_position`.
    #[must_use]
    pub fn spawn(
        kind: EnemyKind,
        power: f64,
        position: DVec2,
        target: EntityId,
        target_position: DVec2,
    ) -> Entity {
        let profile = kind.profile();
        let orbit_angle = bearing(target_position, position);
        Entity::new(
            position,
            profile.radius,
            profile.color,
            EntityBody::Enemy(Self::new(kind, power, target, orbit_angle)),
        )
    }

    /// Apply damage. Shielded enemies block 90% of a hit half of the time.
    pub fn take_damage(
        &mut self,
        amount: f64,
        source: Option<EntityId>,
        rng: &mut SimRng,
    ) -> DamageOutcome {
        let mut amount = amount;
        if self.kind.shielded() && rng.roll_above(0.5) {
            amount *= 0.1;
        }
        if source.is_some() {
            self.last_hit_source = source;
        }
        DamageOutcome {
            applied: amount,
            killed: self.health.apply_damage(amount),
        }
    }

    /// Children spawned when this enemy dies, if it is a large splitter.
    #[must_use]
    pub fn split(&self, core: &EntityCore, target_position: DVec2, rng: &mut SimRng) -> Vec<Entity> {
        if self.kind != EnemyKind::Splitter || core.radius <= SPLIT_RADIUS {
            return Vec::new();
        }
        (0..2)
            .map(|_| {
                let offset = DVec2::new(rng.jitter(10.0), rng.jitter(10.0));
                let mut child = Self::spawn(
                    EnemyKind::Fast,
                    self.power * SPLIT_POWER,
                    core.position + offset,
                    self.target,
                    target_position,
                );
                child.core.radius = SPLIT_RADIUS;
                child
            })
            .collect()
    }

    pub(crate) fn update(
        &mut self,
        core: &mut EntityCore,
        others: &mut Neighbors<'_>,
        ctx: &mut TickContext<'_>,
    ) {
        let dt = ctx.dt;
        if self.health.is_dead() {
            core.marked_for_deletion = true;
            return;
        }

        let effect = self.effects.tick(dt);
        let mut speed = self.base_speed * effect.speed_multiplier;
        for dot in [effect.burn_damage, effect.poison_damage].into_iter().flatten() {
            let outcome = self.take_damage(dot, None, ctx.rng);
            ctx.events.damage_events.push(DamageEvent {
                target: core.id,
                target_kind: EntityKind::Enemy,
                source: None,
                amount: outcome.applied,
                killed: outcome.killed,
            });
        }
        if self.kind.regenerates() {
            self.health.heal(self.health.max * REGEN_RATE * dt);
        }
        if self.health.is_dead() {
            core.marked_for_deletion = true;
            return;
        }

        let target_id = self.pick_target(core.position, others, ctx);
        let Some(target) = others.get_active(target_id) else {
            return;
        };
        let target_position = target.position();
        let target_radius = target.core.radius;

        let delta = target_position - core.position;
        let distance = delta.length();
        let angle = bearing(core.position, target_position);
        let movement = self.kind.movement();
        let mut heading: Option<DVec2> = None;

        match movement {
            Movement::Direct => {}
            Movement::StopGo => {
                self.state_timer += dt;
                if self.state == 0 {
                    speed = 0.0;
                    if self.state_timer > 1.5 {
                        self.state = 1;
                        self.state_timer = 0.0;
                    }
                } else {
                    speed = self.base_speed * 4.0;
                    if self.state_timer > 0.5 {
                        self.state = 0;
                        self.state_timer = 0.0;
                    }
                }
            }
            Movement::Teleport => {
                self.state_timer += dt;
                if self.state_timer > 2.0 {
                    core.position += polar(angle, 100.0);
                    self.state_timer = 0.0;
                    ctx.particles
                        .emit(core.position, core.color, 10, Burst::new(100.0, 0.5));
                }
                speed = 0.0;
            }
            Movement::Spiral => heading = Some(polar(angle + FRAC_PI_4, 1.0)),
            Movement::Zigzag => {
                self.state_timer += dt;
                let offset = (self.state_timer * 5.0).sin() * FRAC_PI_2;
                heading = Some(polar(angle + offset, 1.0));
            }
            Movement::Orbital => {
                self.orbit_angle += dt * 0.5;
                let orbit_distance = (distance - 50.0 * dt).max(200.0);
                let waypoint = target_position + polar(self.orbit_angle, orbit_distance);
                heading = direction(core.position, waypoint);
            }
            Movement::Glitch => {
                if ctx.rng.roll_above(0.9) {
                    core.position.x += ctx.rng.jitter(25.0);
                    core.position.y += ctx.rng.jitter(25.0);
                }
            }
        }

        if heading.is_none() && movement != Movement::Teleport && distance > 0.0 {
            heading = Some(delta / distance);
        }

        if distance > target_radius + core.radius {
            if let Some(heading) = heading {
                core.position += heading * speed * dt;
            }
        } else if self.attack_cooldown <= 0.0 {
            self.attack(core, target_id, others, ctx);
            self.attack_cooldown = ATTACK_COOLDOWN;
        }

        if self.attack_cooldown > 0.0 {
            self.attack_cooldown -= dt;
        }
    }

    fn pick_target(
        &self,
        position: DVec2,
        others: &Neighbors<'_>,
        ctx: &TickContext<'_>,
    ) -> EntityId {
        if !self.kind.hunts_turrets() {
            return self.target;
        }
        let mut best: Option<(EntityId, f64)> = None;
        for &id in &ctx.index.turrets {
            let Some(turret) = others.get_active(id) else {
                continue;
            };
            let distance = turret.position().distance(position);
            if best.map_or(true, |(_, d)| distance < d) {
                best = Some((id, distance));
            }
        }
        best.map_or(self.target, |(id, _)| id)
    }

    fn attack(
        &mut self,
        core: &mut EntityCore,
        target_id: EntityId,
        others: &mut Neighbors<'_>,
        ctx: &mut TickContext<'_>,
    ) {
        let Some(target) = others.get_mut(target_id) else {
            return;
        };
        let amount = match self.kind.attack_style() {
            AttackStyle::Paralyze => {
                if let Some(turret) = target.as_turret_mut() {
                    turret.paralyze(PARALYZE_TIME);
                    core.marked_for_deletion = true;
                    return;
                }
                self.damage
            }
            AttackStyle::Explode => {
                core.marked_for_deletion = true;
                self.damage * 3.0
            }
            AttackStyle::Strike | AttackStyle::Drain => self.damage,
        };

        let target_kind = target.kind();
        let outcome = target.take_damage(amount, Some(core.id), ctx.rng);
        ctx.events.damage_events.push(DamageEvent {
            target: target_id,
            target_kind,
            source: Some(core.id),
            amount: outcome.applied,
            killed: outcome.killed,
        });
        if self.kind.attack_style() == AttackStyle::Drain {
            self.health.heal(self.damage);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_from_power() {
        let enemy = Enemy::new(EnemyKind::Normal, 1.0, 1, 0.0);
        assert_eq!(enemy.health.max, 20.0);
        assert_eq!(enemy.damage, 10.0);

        let tank = Enemy::new(EnemyKind::Tank, 1.0, 1, 0.0);
        assert_eq!(tank.health.max, 60.0);
    }

    #[test]
    fn test_damage_is_exact_for_unshielded() {
        let mut rng = SimRng::from_seed(3);
        let mut enemy = Enemy::new(EnemyKind::Normal, 10.0, 1, 0.0);
        let before = enemy.health.current;
        let outcome = enemy.take_damage(25.0, None, &mut rng);
        assert_eq!(outcome.applied, 25.0);
        assert_eq!(enemy.health.current, before - 25.0);
        assert!(!outcome.killed);
    }

    #[test]
    fn test_shield_blocks_ninety_percent_or_nothing() {
        let mut rng = SimRng::from_seed(11);
        let mut enemy = Enemy::new(EnemyKind::Shielded, 1000.0, 1, 0.0);
        for _ in 0..100 {
            let before = enemy.health.current;
            let outcome = enemy.take_damage(100.0, None, &mut rng);
            let lost = before - enemy.health.current;
            assert!(
                (lost - 100.0).abs() < 1e-9 || (lost - 10.0).abs() < 1e-9,
                "unexpected damage {lost}"
            );
            assert!((outcome.applied - lost).abs() < 1e-9);
        }
    }

    #[test]
    fn test_last_hit_source_kept_on_sourceless_hits() {
        let mut rng = SimRng::from_seed(0);
        let mut enemy = Enemy::new(EnemyKind::Normal, 10.0, 1, 0.0);
        enemy.take_damage(1.0, Some(7), &mut rng);
        enemy.take_damage(1.0, None, &mut rng);
        assert_eq!(enemy.last_hit_source, Some(7));
    }

    #[test]
    fn test_splitter_children() {
        let mut rng = SimRng::from_seed(0);
        let parent = Enemy::spawn(EnemyKind::Splitter, 5.0, DVec2::new(100.0, 0.0), 1, DVec2::ZERO);
        let EntityBody::Enemy(state) = &parent.body else {
            panic!("not an enemy");
        };
        let children = state.split(&parent.core, DVec2::ZERO, &mut rng);
        assert_eq!(children.len(), 2);
        for child in &children {
            let enemy = child.as_enemy().unwrap();
            assert_eq!(enemy.kind, EnemyKind::Fast);
            assert!((enemy.power - 2.0).abs() < 1e-12);
            assert_eq!(child.core.radius, 10.0);
            assert!(child.position().distance(parent.position()) < 15.0);
        }

        // Children are too small to split again.
        let child = &children[0];
        let grandchildren = child
            .as_enemy()
            .unwrap()
            .split(&child.core, DVec2::ZERO, &mut rng);
        assert!(grandchildren.is_empty());
    }

    #[test]
    fn test_profiles_table() {
        assert_eq!(EnemyKind::Boss.profile().radius, 40.0);
        assert_eq!(EnemyKind::Teleporter.profile().speed, 0.0);
        assert_eq!(EnemyKind::Void.profile().health_multiplier, 4.0);
        assert_eq!(EnemyKind::Disruptor.attack_style(), AttackStyle::Paralyze);
        assert_eq!(EnemyKind::Orbital.movement(), Movement::Orbital);
        assert_eq!(EnemyKind::ALL.len(), 19);
    }
}
