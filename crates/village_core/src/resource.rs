//! Passive world objects: resource nodes, seeds and the house.

use serde::{Deserialize, Serialize};

use crate::components::{Color, Health};
use crate::economy::ResourceKind;
use crate::entity::{Entity, EntityBody, EntityCore, TickContext};
use crate::math::{polar, DVec2, TAU};
use crate::particles::Burst;

/// Collision radius of a resource node.
pub const RESOURCE_RADIUS: f64 = 15.0;

/// Hit points of a resource node.
pub const RESOURCE_HEALTH: f64 = 5.0;

/// Resources produced when a seed matures.
const SEED_YIELD: usize = 5;

/// Radius of the house.
pub const HOUSE_RADIUS: f64 = 40.0;

/// A harvestable node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    /// What the node yields.
    pub kind: ResourceKind,
    /// Hit points.
    pub health: Health,
    /// Set when a worker broke the node; the worker already holds the yield.
    pub worker_harvested: bool,
}

impl Resource {
    /// Node state of `kind` at full health.
    #[must_use]
    pub const fn new(kind: ResourceKind) -> Self {
        Self {
            kind,
            health: Health::new(RESOURCE_HEALTH),
            worker_harvested: false,
        }
    }

    /// Node entity at `position`.
    #[must_use]
    pub fn spawn(position: DVec2, kind: ResourceKind) -> Entity {
        Entity::new(
            position,
            RESOURCE_RADIUS,
            Color(kind.color()),
            EntityBody::Resource(Self::new(kind)),
        )
    }

    pub(crate) fn update(&mut self, core: &mut EntityCore) {
        if self.health.is_dead() {
            core.marked_for_deletion = true;
        }
    }
}

/// A planted seed that bursts into resources when it matures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Seed {
    /// Kind of the resources it grows into.
    pub kind: ResourceKind,
    /// Seconds until maturity.
    pub timer: f64,
}

impl Seed {
    /// Seed entity at `position` maturing after `growth_time`.
    #[must_use]
    pub fn spawn(position: DVec2, kind: ResourceKind, growth_time: f64) -> Entity {
        Entity::new(
            position,
            RESOURCE_RADIUS,
            Color(kind.color()),
            EntityBody::Seed(Self {
                kind,
                timer: growth_time,
            }),
        )
    }

    /// Growth progress in `[0, 1]` for a seed planted with `growth_time`.
    #[must_use]
    pub fn progress(&self, growth_time: f64) -> f64 {
        if growth_time <= 0.0 {
            return 1.0;
        }
        (1.0 - self.timer / growth_time).clamp(0.0, 1.0)
    }

    pub(crate) fn update(&mut self, core: &mut EntityCore, ctx: &mut TickContext<'_>) {
        self.timer -= ctx.dt;
        if self.timer > 0.0 {
            return;
        }
        ctx.particles
            .emit(core.position, core.color, 20, Burst::new(100.0, 1.0));
        for i in 0..SEED_YIELD {
            let angle = TAU / SEED_YIELD as f64 * i as f64;
            let distance = ctx.rng.range(30.0, 50.0);
            ctx.spawns
                .push(Resource::spawn(core.position + polar(angle, distance), self.kind));
        }
        core.marked_for_deletion = true;
    }
}

/// The house the enemies march on. Reaching zero health ends the game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct House {
    /// Hit points.
    pub health: Health,
}

impl House {
    /// House entity at `position`.
    #[must_use]
    pub fn spawn(position: DVec2, max_health: f64) -> Entity {
        Entity::new(
            position,
            HOUSE_RADIUS,
            Color(0x8b_45_13),
            EntityBody::House(Self {
                health: Health::new(max_health),
            }),
        )
    }
}
