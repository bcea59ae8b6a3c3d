//! Combat resolution helpers shared by turrets, projectiles, buildings and
//! enemies.
//!
//! Damage always goes through [`strike`], which applies shields, elemental
//! effects and records a [`DamageEvent`]. Kill credit is given to the
//! recorded source turret exactly when a hit takes its target from alive to
//! dead.

use serde::{Deserialize, Serialize};

use crate::components::{Element, EntityId, EntityKind};
use crate::entity::{DamageOutcome, Neighbors, TickContext};
use crate::math::DVec2;

/// A single application of damage.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DamageEvent {
    /// Entity that took the damage.
    pub target: EntityId,
    /// Kind of the damaged entity.
    pub target_kind: EntityKind,
    /// Entity credited with the hit, if any.
    pub source: Option<EntityId>,
    /// Damage actually applied.
    pub amount: f64,
    /// Whether the hit was lethal.
    pub killed: bool,
}

/// A live enemy found by a targeting query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnemyHit {
    /// Enemy id.
    pub id: EntityId,
    /// Enemy position at query time.
    pub position: DVec2,
    /// Distance from the query origin.
    pub distance: f64,
}

/// Nearest live enemy strictly within `range` of `origin`, skipping `exclude`.
#[must_use]
pub fn nearest_enemy(
    others: &Neighbors<'_>,
    enemies: &[EntityId],
    origin: DVec2,
    range: f64,
    exclude: &[EntityId],
) -> Option<EnemyHit> {
    let mut best: Option<EnemyHit> = None;
    for &id in enemies {
        if exclude.contains(&id) {
            continue;
        }
        let Some(enemy) = others.get_active(id) else {
            continue;
        };
        let distance = enemy.position().distance(origin);
        let limit = best.map_or(range, |b| b.distance);
        if distance < limit {
            best = Some(EnemyHit {
                id,
                position: enemy.position(),
                distance,
            });
        }
    }
    best
}

/// Every live enemy strictly within `range` of `origin`, in id order.
#[must_use]
pub fn enemies_within(
    others: &Neighbors<'_>,
    enemies: &[EntityId],
    origin: DVec2,
    range: f64,
) -> Vec<EntityId> {
    enemies
        .iter()
        .copied()
        .filter(|&id| {
            others
                .get_active(id)
                .is_some_and(|e| e.position().distance(origin) < range)
        })
        .collect()
}

/// Damage `target` on behalf of `source`, then apply `element`.
///
/// Returns `None` when the target no longer resolves.
pub(crate) fn strike(
    others: &mut Neighbors<'_>,
    target: EntityId,
    amount: f64,
    source: Option<EntityId>,
    element: Option<Element>,
    ctx: &mut TickContext<'_>,
) -> Option<DamageOutcome> {
    let entity = others.get_mut(target)?;
    let target_kind = entity.kind();
    let outcome = entity.take_damage(amount, source, ctx.rng);
    if let (Some(element), Some(enemy)) = (element, entity.as_enemy_mut()) {
        enemy.effects.apply(element, amount);
    }
    ctx.events.damage_events.push(DamageEvent {
        target,
        target_kind,
        source,
        amount: outcome.applied,
        killed: outcome.killed,
    });
    Some(outcome)
}

/// Increment the kill counter of `source` if it is a turret among `others`.
pub(crate) fn credit_kill(others: &mut Neighbors<'_>, source: Option<EntityId>) {
    if let Some(turret) = source
        .and_then(|id| others.get_mut(id))
        .and_then(|e| e.as_turret_mut())
    {
        turret.kill_count += 1;
    }
}
