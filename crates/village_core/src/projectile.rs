//! Turret shots.
//!
//! A projectile either homes on a target id (re-aiming every tick until it
//! is within [`HOMING_HIT_DISTANCE`]) or flies along a fixed heading and
//! collides with whatever enemy it passes. Piercing shots keep flying and
//! remember every enemy they have damaged.

use serde::{Deserialize, Serialize};

use crate::combat::{credit_kill, enemies_within, strike};
use crate::components::{Color, Element, EntityId};
use crate::entity::{Entity, EntityBody, EntityCore, Neighbors, TickContext};
use crate::math::{direction, polar, DVec2};
use crate::particles::Burst;

/// Collision radius of a projectile.
pub const PROJECTILE_RADIUS: f64 = 4.0;

/// A homing shot resolves once this close to its target.
pub const HOMING_HIT_DISTANCE: f64 = 20.0;

/// Padding added to an enemy's radius for unguided collisions.
const COLLISION_PADDING: f64 = 10.0;

/// Blast radius of missile payloads.
pub const MISSILE_BLAST_RADIUS: f64 = 60.0;

/// Shots beyond this distance on either axis are discarded.
const WORLD_LIMIT: f64 = 5000.0;

/// What a shot does when it arrives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Payload {
    /// Damage the target only.
    Bullet,
    /// Damage every enemy near the impact point.
    Missile,
}

/// Projectile state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Projectile {
    /// Homing target; cleared when the target dies.
    pub target: Option<EntityId>,
    /// Units per second.
    pub velocity: DVec2,
    /// Speed magnitude.
    pub speed: f64,
    /// Damage per hit.
    pub damage: f64,
    /// On-hit element.
    pub element: Option<Element>,
    /// Turret credited with kills.
    pub source: Option<EntityId>,
    /// Arrival behaviour.
    pub payload: Payload,
    /// Keep flying after a hit.
    pub piercing: bool,
    /// Enemies already damaged by this shot.
    pub hit_list: Vec<EntityId>,
}

impl Projectile {
    /// Motionless bullet; aim it with [`aimed`](Self::aimed) or
    /// [`homing`](Self::homing).
    #[must_use]
    pub fn new(damage: f64, speed: f64, source: Option<EntityId>) -> Self {
        Self {
            target: None,
            velocity: DVec2::ZERO,
            speed,
            damage,
            element: None,
            source,
            payload: Payload::Bullet,
            piercing: false,
            hit_list: Vec::new(),
        }
    }

    /// Set the on-hit element.
    #[must_use]
    pub fn with_element(mut self, element: Option<Element>) -> Self {
        self.element = element;
        self
    }

    /// Set the arrival payload.
    #[must_use]
    pub fn with_payload(mut self, payload: Payload) -> Self {
        self.payload = payload;
        self
    }

    /// Make the shot piercing.
    #[must_use]
    pub fn piercing(mut self) -> Self {
        self.piercing = true;
        self
    }

    /// Fly along `angle` without a target.
    #[must_use]
    pub fn aimed(mut self, angle: f64) -> Self {
        self.velocity = polar(angle, self.speed);
        self
    }

    /// Home on `target`, starting from `origin`.
    #[must_use]
    pub fn homing(mut self, target: EntityId, origin: DVec2, target_position: DVec2) -> Self {
        self.target = Some(target);
        self.velocity = direction(origin, target_position).unwrap_or(DVec2::ZERO) * self.speed;
        self
    }

    /// Projectile entity at `origin`.
    #[must_use]
    pub fn spawn(self, origin: DVec2, color: Color) -> Entity {
        Entity::new(origin, PROJECTILE_RADIUS, color, EntityBody::Projectile(self))
    }

    pub(crate) fn update(
        &mut self,
        core: &mut EntityCore,
        others: &mut Neighbors<'_>,
        ctx: &mut TickContext<'_>,
    ) {
        if let Some(target_id) = self.target {
            let target = others
                .get_active(target_id)
                .filter(|e| e.health().is_some_and(|h| !h.is_dead()))
                .map(Entity::position);
            match target {
                None => self.target = None,
                Some(target_position) => {
                    let delta = target_position - core.position;
                    let distance = delta.length();
                    if distance > 0.0 {
                        self.velocity = delta / distance * self.speed;
                    }
                    if distance < HOMING_HIT_DISTANCE {
                        self.arrive(core, target_id, others, ctx);
                        if !self.piercing {
                            core.marked_for_deletion = true;
                        }
                        return;
                    }
                }
            }
        }

        core.position += self.velocity * ctx.dt;

        if self.target.is_none() || self.piercing {
            self.collide(core, others, ctx);
            if core.position.x.abs() > WORLD_LIMIT || core.position.y.abs() > WORLD_LIMIT {
                core.marked_for_deletion = true;
            }
        }
    }

    fn arrive(
        &mut self,
        core: &EntityCore,
        target_id: EntityId,
        others: &mut Neighbors<'_>,
        ctx: &mut TickContext<'_>,
    ) {
        match self.payload {
            Payload::Missile => {
                let blast =
                    enemies_within(others, &ctx.index.enemies, core.position, MISSILE_BLAST_RADIUS);
                for id in blast {
                    self.damage_enemy(id, others, ctx);
                }
                ctx.particles
                    .emit(core.position, Color(0xf3_9c_12), 12, Burst::new(120.0, 0.4));
            }
            Payload::Bullet => self.damage_enemy(target_id, others, ctx),
        }
    }

    fn collide(
        &mut self,
        core: &mut EntityCore,
        others: &mut Neighbors<'_>,
        ctx: &mut TickContext<'_>,
    ) {
        let index = ctx.index;
        for &id in &index.enemies {
            if self.hit_list.contains(&id) {
                continue;
            }
            let touching = others.get_active(id).is_some_and(|enemy| {
                enemy.position().distance(core.position) < enemy.core.radius + COLLISION_PADDING
            });
            if !touching {
                continue;
            }
            self.damage_enemy(id, others, ctx);
            if self.piercing {
                self.hit_list.push(id);
            } else {
                core.marked_for_deletion = true;
                return;
            }
        }
    }

    fn damage_enemy(&self, id: EntityId, others: &mut Neighbors<'_>, ctx: &mut TickContext<'_>) {
        let outcome = strike(others, id, self.damage, self.source, self.element, ctx);
        if outcome.is_some_and(|o| o.killed) {
            credit_kill(others, self.source);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aimed_velocity() {
        let shot = Projectile::new(5.0, 600.0, None).aimed(0.0);
        assert!((shot.velocity.x - 600.0).abs() < 1e-9);
        assert!(shot.velocity.y.abs() < 1e-9);
        assert!(shot.target.is_none());
    }

    #[test]
    fn test_homing_velocity_points_at_target() {
        let shot = Projectile::new(5.0, 800.0, Some(3)).homing(
            9,
            DVec2::ZERO,
            DVec2::new(0.0, -50.0),
        );
        assert_eq!(shot.target, Some(9));
        assert!((shot.velocity.y + 800.0).abs() < 1e-9);
    }

    #[test]
    fn test_homing_on_own_position_is_still() {
        let shot = Projectile::new(5.0, 800.0, None).homing(1, DVec2::ONE, DVec2::ONE);
        assert_eq!(shot.velocity, DVec2::ZERO);
    }

    #[test]
    fn test_builder_flags() {
        let shot = Projectile::new(1.0, 2000.0, None)
            .piercing()
            .with_payload(Payload::Missile)
            .with_element(Some(Element::Fire));
        assert!(shot.piercing);
        assert_eq!(shot.payload, Payload::Missile);
        assert_eq!(shot.element, Some(Element::Fire));
        let entity = shot.spawn(DVec2::ZERO, Color::WHITE);
        assert_eq!(entity.core.radius, PROJECTILE_RADIUS);
    }
}
