//! Read-only drawing interface.
//!
//! The simulation owns no drawing code. A front end implements [`Renderer`]
//! and receives one [`EntityView`] per visible entity, already culled to the
//! camera viewport.

use serde::{Deserialize, Serialize};

use crate::building::{WORKER_COLOR, WORKER_RADIUS};
use crate::camera::{Camera, Viewport};
use crate::components::{Color, EntityId, EntityKind};
use crate::entity::{Entity, EntityBody};
use crate::math::DVec2;
use crate::particles::Particle;

/// What a renderer needs to draw one entity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EntityView {
    /// Entity id; for workers, the id of the owning building.
    pub id: EntityId,
    /// Kind discriminator.
    pub kind: EntityKind,
    /// World position.
    pub position: DVec2,
    /// Collision radius.
    pub radius: f64,
    /// Display color.
    pub color: Color,
    /// Health as a share of max, for kinds that have health.
    pub health: Option<f64>,
}

impl EntityView {
    /// View of `entity` itself.
    #[must_use]
    pub fn of(entity: &Entity) -> Self {
        Self {
            id: entity.id(),
            kind: entity.kind(),
            position: entity.position(),
            radius: entity.core.radius,
            color: entity.core.color,
            health: entity.health().map(|h| h.fraction()),
        }
    }
}

/// A drawing back end.
pub trait Renderer {
    /// Called once before any entity, with the current camera.
    fn begin_frame(&mut self, _camera: &Camera) {}

    /// Draw one visible entity.
    fn draw_entity(&mut self, view: &EntityView);

    /// Draw one visible particle.
    fn draw_particle(&mut self, _particle: &Particle) {}

    /// Called once after everything was drawn.
    fn end_frame(&mut self) {}
}

/// Collects views; handy for tests and text front ends.
impl Renderer for Vec<EntityView> {
    fn draw_entity(&mut self, view: &EntityView) {
        self.push(*view);
    }
}

/// Every view inside `viewport`, in id order. Workers follow their building.
pub fn visible_views<'a>(
    entities: impl IntoIterator<Item = &'a Entity>,
    viewport: &Viewport,
) -> Vec<EntityView> {
    let mut views = Vec::new();
    for entity in entities {
        if viewport.overlaps(entity.position(), entity.core.radius) {
            views.push(EntityView::of(entity));
        }
        if let EntityBody::Building(building) = &entity.body {
            if let Some(worker) = &building.worker {
                if viewport.overlaps(worker.position, WORKER_RADIUS) {
                    views.push(EntityView {
                        id: entity.id(),
                        kind: EntityKind::Worker,
                        position: worker.position,
                        radius: WORKER_RADIUS,
                        color: WORKER_COLOR,
                        health: None,
                    });
                }
            }
        }
    }
    views
}
