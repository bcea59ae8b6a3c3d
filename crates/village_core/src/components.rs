//! Shared value types used by every entity kind.
//!
//! Components here are plain data; behaviour lives with the entity kinds
//! that use them.

use serde::{Deserialize, Serialize};

/// Unique identifier for entities.
///
/// Ids are handed out in increasing order and never reused, so holding an id
/// is a weak reference: lookup fails once the entity is gone.
pub type EntityId = u64;

/// Coarse category of an entity, replacing type checks by constructor name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// The controllable villager.
    Player,
    /// The house the enemies march on.
    House,
    /// Hostile walker.
    Enemy,
    /// Defensive structure.
    Turret,
    /// Production or buff structure.
    Building,
    /// Collector worker (owned by its building).
    Worker,
    /// Harvestable node.
    Resource,
    /// Growing resource cluster.
    Seed,
    /// Turret shot.
    Projectile,
}

impl EntityKind {
    /// Whether this kind blocks the build grid.
    #[must_use]
    pub const fn is_structure(self) -> bool {
        matches!(self, EntityKind::Turret | EntityKind::Building | EntityKind::House)
    }
}

/// Opaque display color (`0xRRGGBB`). The simulation never reads it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Color(pub u32);

impl Color {
    /// White.
    pub const WHITE: Self = Self(0xff_ff_ff);
}

/// Hit points.
///
/// Health is allowed to go negative; the owner checks [`Health::is_dead`]
/// and schedules deletion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Health {
    /// Current health points.
    pub current: f64,
    /// Maximum health points.
    pub max: f64,
}

impl Health {
    /// Create new health component at full health.
    #[must_use]
    pub const fn new(max: f64) -> Self {
        Self { current: max, max }
    }

    /// Check if entity is dead (health <= 0).
    #[must_use]
    pub fn is_dead(&self) -> bool {
        self.current <= 0.0
    }

    /// Subtract `amount`.
    ///
    /// Returns `true` when this call took health from above zero to zero or
    /// below, which is the moment a kill is credited.
    pub fn apply_damage(&mut self, amount: f64) -> bool {
        let was_alive = !self.is_dead();
        self.current -= amount;
        was_alive && self.is_dead()
    }

    /// Heal by `amount`, capped at max.
    pub fn heal(&mut self, amount: f64) {
        self.current = self.max.min(self.current + amount);
    }

    /// Health as a fraction of max, clamped to `[0, 1]`.
    #[must_use]
    pub fn fraction(&self) -> f64 {
        if self.max <= 0.0 {
            0.0
        } else {
            (self.current / self.max).clamp(0.0, 1.0)
        }
    }
}

/// Elemental payload carried by some turrets and their projectiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Element {
    /// Applies burning.
    Fire,
    /// Applies frozen.
    Ice,
    /// Applies poisoned.
    Poison,
}

/// Seconds an elemental effect lasts after a hit.
pub const EFFECT_DURATION: f64 = 2.0;

/// Damage-over-time share of the hit that applied it.
pub const EFFECT_DPS_RATIO: f64 = 0.2;

/// A timed damage-over-time effect.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DamageOverTime {
    /// Remaining seconds.
    pub duration: f64,
    /// Damage per second while active.
    pub dps: f64,
}

/// Timed modifiers on an enemy.
///
/// Re-applying an effect overwrites its timer and strength.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct StatusEffects {
    /// Remaining frozen seconds (halves speed).
    pub frozen: f64,
    /// Burning damage over time.
    pub burning: DamageOverTime,
    /// Poison damage over time.
    pub poisoned: DamageOverTime,
}

/// Outcome of advancing status effects by one step.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EffectTick {
    /// Multiplier for this tick's movement speed.
    pub speed_multiplier: f64,
    /// Burn damage to apply this tick.
    pub burn_damage: Option<f64>,
    /// Poison damage to apply this tick.
    pub poison_damage: Option<f64>,
}

impl StatusEffects {
    /// Apply the effect matching `element` for the standard duration, with
    /// damage over time derived from the hit's damage.
    pub fn apply(&mut self, element: Element, hit_damage: f64) {
        let dps = hit_damage * EFFECT_DPS_RATIO;
        match element {
            Element::Ice => self.frozen = EFFECT_DURATION,
            Element::Fire => {
                self.burning = DamageOverTime {
                    duration: EFFECT_DURATION,
                    dps,
                };
            }
            Element::Poison => {
                self.poisoned = DamageOverTime {
                    duration: EFFECT_DURATION,
                    dps,
                };
            }
        }
    }

    /// Whether any effect is still running.
    #[must_use]
    pub fn any_active(&self) -> bool {
        self.frozen > 0.0 || self.burning.duration > 0.0 || self.poisoned.duration > 0.0
    }

    /// Count down all effects by `dt` and report what they do this tick.
    pub fn tick(&mut self, dt: f64) -> EffectTick {
        let mut out = EffectTick {
            speed_multiplier: 1.0,
            ..EffectTick::default()
        };
        if self.frozen > 0.0 {
            self.frozen -= dt;
            out.speed_multiplier = 0.5;
        }
        if self.burning.duration > 0.0 {
            self.burning.duration -= dt;
            out.burn_damage = Some(self.burning.dps * dt);
        }
        if self.poisoned.duration > 0.0 {
            self.poisoned.duration -= dt;
            out.poison_damage = Some(self.poisoned.dps * dt);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_kill_edge() {
        let mut health = Health::new(10.0);
        assert!(!health.apply_damage(4.0));
        assert!(health.apply_damage(6.0));
        assert!(health.is_dead());
        // Already dead: no second kill.
        assert!(!health.apply_damage(1.0));
        assert_eq!(health.current, -1.0);
    }

    #[test]
    fn test_health_heal_capped() {
        let mut health = Health::new(100.0);
        health.apply_damage(30.0);
        health.heal(50.0);
        assert_eq!(health.current, 100.0);
    }

    #[test]
    fn test_frozen_halves_speed_for_duration() {
        let mut effects = StatusEffects::default();
        effects.apply(Element::Ice, 50.0);

        let tick = effects.tick(1.0);
        assert_eq!(tick.speed_multiplier, 0.5);
        let tick = effects.tick(1.0);
        assert_eq!(tick.speed_multiplier, 0.5);
        let tick = effects.tick(1.0);
        assert_eq!(tick.speed_multiplier, 1.0);
        assert!(!effects.any_active());
    }

    #[test]
    fn test_burning_damage_per_tick() {
        let mut effects = StatusEffects::default();
        effects.apply(Element::Fire, 100.0);
        assert_eq!(effects.burning.dps, 20.0);

        let tick = effects.tick(0.5);
        assert_eq!(tick.burn_damage, Some(10.0));
        assert_eq!(tick.poison_damage, None);
    }

    #[test]
    fn test_structure_kinds() {
        assert!(EntityKind::Turret.is_structure());
        assert!(EntityKind::House.is_structure());
        assert!(!EntityKind::Resource.is_structure());
    }
}
