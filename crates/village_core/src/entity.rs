//! Entity model and storage.
//!
//! Every game object is an [`Entity`]: a shared [`EntityCore`] (id, position,
//! radius, color, deletion flag) plus a kind-specific [`EntityBody`].
//! Cross-entity references are plain [`EntityId`]s resolved through
//! [`EntityStorage`] (or a [`Neighbors`] view during the update pass), so a
//! deleted target simply stops resolving.
//!
//! # Update pass borrowing
//!
//! Entities live in one `Vec` in ascending id order. While entity `i` is
//! updated, [`EntityStorage::split_at`] hands out `&mut` to it together with
//! a [`Neighbors`] view over every other entity, so behaviour code can damage,
//! push or paralyze siblings without aliasing.

use serde::{Deserialize, Serialize};

use crate::building::Building;
use crate::components::{Color, EntityId, EntityKind, Health};
use crate::config::SimConfig;
use crate::enemy::Enemy;
use crate::math::DVec2;
use crate::particles::ParticleSystem;
use crate::player::{Player, PlayerInput};
use crate::projectile::Projectile;
use crate::recipes::RecipeBook;
use crate::resource::{House, Resource, Seed};
use crate::rng::SimRng;
use crate::simulation::TickEvents;
use crate::turret::Turret;

/// Data shared by every entity kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityCore {
    /// Unique identifier, assigned on insertion.
    pub id: EntityId,
    /// World position.
    pub position: DVec2,
    /// Collision radius.
    pub radius: f64,
    /// Display color.
    pub color: Color,
    /// Set when the entity should be removed after the current pass.
    pub marked_for_deletion: bool,
}

/// Kind-specific state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EntityBody {
    /// The player.
    Player(Player),
    /// The house.
    House(House),
    /// A hostile walker.
    Enemy(Enemy),
    /// A defensive structure.
    Turret(Turret),
    /// A production or buff structure (owns its worker).
    Building(Building),
    /// A harvestable node.
    Resource(Resource),
    /// A growing resource cluster.
    Seed(Seed),
    /// A turret shot.
    Projectile(Projectile),
}

/// A game object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// Shared data.
    pub core: EntityCore,
    /// Kind-specific data.
    pub body: EntityBody,
}

/// Result of one damage application.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DamageOutcome {
    /// Damage actually subtracted (after shields).
    pub applied: f64,
    /// Whether this hit took the target from alive to dead.
    pub killed: bool,
}

impl Entity {
    /// Create an entity. The id is assigned by [`EntityStorage::insert`].
    #[must_use]
    pub fn new(position: DVec2, radius: f64, color: Color, body: EntityBody) -> Self {
        Self {
            core: EntityCore {
                id: 0,
                position,
                radius,
                color,
                marked_for_deletion: false,
            },
            body,
        }
    }

    /// Entity id.
    #[must_use]
    pub fn id(&self) -> EntityId {
        self.core.id
    }

    /// World position.
    #[must_use]
    pub fn position(&self) -> DVec2 {
        self.core.position
    }

    /// Kind discriminator.
    #[must_use]
    pub fn kind(&self) -> EntityKind {
        match self.body {
            EntityBody::Player(_) => EntityKind::Player,
            EntityBody::House(_) => EntityKind::House,
            EntityBody::Enemy(_) => EntityKind::Enemy,
            EntityBody::Turret(_) => EntityKind::Turret,
            EntityBody::Building(_) => EntityKind::Building,
            EntityBody::Resource(_) => EntityKind::Resource,
            EntityBody::Seed(_) => EntityKind::Seed,
            EntityBody::Projectile(_) => EntityKind::Projectile,
        }
    }

    /// Whether the entity is still taking part in the simulation.
    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.core.marked_for_deletion
    }

    /// Health, for kinds that have it.
    #[must_use]
    pub fn health(&self) -> Option<&Health> {
        match &self.body {
            EntityBody::House(h) => Some(&h.health),
            EntityBody::Enemy(e) => Some(&e.health),
            EntityBody::Resource(r) => Some(&r.health),
            _ => None,
        }
    }

    /// Enemy state, if this is an enemy.
    #[must_use]
    pub fn as_enemy(&self) -> Option<&Enemy> {
        match &self.body {
            EntityBody::Enemy(e) => Some(e),
            _ => None,
        }
    }

    /// Mutable enemy state, if this is an enemy.
    pub fn as_enemy_mut(&mut self) -> Option<&mut Enemy> {
        match &mut self.body {
            EntityBody::Enemy(e) => Some(e),
            _ => None,
        }
    }

    /// Turret state, if this is a turret.
    #[must_use]
    pub fn as_turret(&self) -> Option<&Turret> {
        match &self.body {
            EntityBody::Turret(t) => Some(t),
            _ => None,
        }
    }

    /// Mutable turret state, if this is a turret.
    pub fn as_turret_mut(&mut self) -> Option<&mut Turret> {
        match &mut self.body {
            EntityBody::Turret(t) => Some(t),
            _ => None,
        }
    }

    /// Building state, if this is a building.
    #[must_use]
    pub fn as_building(&self) -> Option<&Building> {
        match &self.body {
            EntityBody::Building(b) => Some(b),
            _ => None,
        }
    }

    /// Player state, if this is the player.
    #[must_use]
    pub fn as_player(&self) -> Option<&Player> {
        match &self.body {
            EntityBody::Player(p) => Some(p),
            _ => None,
        }
    }

    /// Mutable player state, if this is the player.
    pub fn as_player_mut(&mut self) -> Option<&mut Player> {
        match &mut self.body {
            EntityBody::Player(p) => Some(p),
            _ => None,
        }
    }

    /// Resource state, if this is a resource.
    #[must_use]
    pub fn as_resource(&self) -> Option<&Resource> {
        match &self.body {
            EntityBody::Resource(r) => Some(r),
            _ => None,
        }
    }

    /// Mutable resource state, if this is a resource.
    pub fn as_resource_mut(&mut self) -> Option<&mut Resource> {
        match &mut self.body {
            EntityBody::Resource(r) => Some(r),
            _ => None,
        }
    }

    /// Projectile state, if this is a projectile.
    #[must_use]
    pub fn as_projectile(&self) -> Option<&Projectile> {
        match &self.body {
            EntityBody::Projectile(p) => Some(p),
            _ => None,
        }
    }

    /// Apply `amount` damage, recording `source` for kill attribution.
    ///
    /// Enemies and resources are flagged for deletion as soon as their
    /// health reaches zero. The house is never deleted; the simulation ends
    /// the game instead. Kinds without health ignore damage.
    pub fn take_damage(
        &mut self,
        amount: f64,
        source: Option<EntityId>,
        rng: &mut SimRng,
    ) -> DamageOutcome {
        let outcome = match &mut self.body {
            EntityBody::Enemy(enemy) => enemy.take_damage(amount, source, rng),
            EntityBody::Resource(resource) => DamageOutcome {
                applied: amount,
                killed: resource.health.apply_damage(amount),
            },
            EntityBody::House(house) => DamageOutcome {
                applied: amount,
                killed: house.health.apply_damage(amount),
            },
            _ => DamageOutcome::default(),
        };
        if outcome.killed && !matches!(self.body, EntityBody::House(_)) {
            self.core.marked_for_deletion = true;
        }
        outcome
    }

    /// Run this entity's behaviour for one step.
    pub(crate) fn update(&mut self, others: &mut Neighbors<'_>, ctx: &mut TickContext<'_>) {
        let Entity { core, body } = self;
        match body {
            EntityBody::Player(player) => player.update(core, others, ctx),
            EntityBody::House(_) => {}
            EntityBody::Enemy(enemy) => enemy.update(core, others, ctx),
            EntityBody::Turret(turret) => turret.update(core, others, ctx),
            EntityBody::Building(building) => building.update(core, others, ctx),
            EntityBody::Resource(resource) => resource.update(core),
            EntityBody::Seed(seed) => seed.update(core, ctx),
            EntityBody::Projectile(projectile) => projectile.update(core, others, ctx),
        }
    }
}

/// Everything an entity may touch during its update besides its siblings.
pub(crate) struct TickContext<'a> {
    /// Immutable configuration.
    pub config: &'a SimConfig,
    /// Recipe table.
    pub recipes: &'a RecipeBook,
    /// Gameplay RNG.
    pub rng: &'a mut SimRng,
    /// Type partition as of tick start.
    pub index: &'a TypeIndex,
    /// Player input for this step.
    pub input: &'a PlayerInput,
    /// Step length in seconds.
    pub dt: f64,
    /// Entities created during the pass, appended after it.
    pub spawns: &'a mut Vec<Entity>,
    /// Events collected for the caller.
    pub events: &'a mut TickEvents,
    /// Decoration sink.
    pub particles: &'a mut ParticleSystem,
}

fn search(slice: &[Entity], id: EntityId) -> Option<usize> {
    slice.binary_search_by_key(&id, |e| e.core.id).ok()
}

/// Every entity except the one being updated.
///
/// Both halves keep ascending id order, so lookups are binary searches.
pub struct Neighbors<'a> {
    before: &'a mut [Entity],
    after: &'a mut [Entity],
}

impl<'a> Neighbors<'a> {
    /// Look up an entity by id.
    #[must_use]
    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        if let Some(i) = search(self.before, id) {
            return Some(&self.before[i]);
        }
        search(self.after, id).map(|i| &self.after[i])
    }

    /// Look up an entity by id for mutation.
    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        if let Some(i) = search(self.before, id) {
            return Some(&mut self.before[i]);
        }
        match search(self.after, id) {
            Some(i) => Some(&mut self.after[i]),
            None => None,
        }
    }

    /// Look up an entity that is not flagged for deletion.
    #[must_use]
    pub fn get_active(&self, id: EntityId) -> Option<&Entity> {
        self.get(id).filter(|e| e.is_active())
    }

    /// Iterate over all other entities in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.before.iter().chain(self.after.iter())
    }

    /// Iterate mutably over all other entities in id order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Entity> {
        self.before.iter_mut().chain(self.after.iter_mut())
    }
}

/// Every live entity, keyed by ascending id.
///
/// A `Vec` kept in ascending id order: ids are assigned monotonically and
/// entities are only appended, so order is preserved without sorting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityStorage {
    entities: Vec<Entity>,
    next_id: EntityId,
}

impl EntityStorage {
    /// Storage with no entities; the first id handed out is 1.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entities: Vec::new(),
            next_id: 1,
        }
    }

    /// Assign the next id to `entity`, store it and return the id.
    pub fn insert(&mut self, mut entity: Entity) -> EntityId {
        let id = self.next_id;
        self.next_id += 1;
        entity.core.id = id;
        self.entities.push(entity);
        id
    }

    /// Get an entity by ID.
    #[must_use]
    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        search(&self.entities, id).map(|i| &self.entities[i])
    }

    /// Mutable access to a live entity.
    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        match search(&self.entities, id) {
            Some(i) => Some(&mut self.entities[i]),
            None => None,
        }
    }

    /// Position of `id` in iteration order, for use with [`split_at`](Self::split_at).
    #[must_use]
    pub fn index_of(&self, id: EntityId) -> Option<usize> {
        search(&self.entities, id)
    }

    /// True while `id` is alive.
    #[must_use]
    pub fn contains(&self, id: EntityId) -> bool {
        search(&self.entities, id).is_some()
    }

    /// Live entity count.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// True when no entity is alive.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Entity IDs in ascending order.
    #[must_use]
    pub fn sorted_ids(&self) -> Vec<EntityId> {
        self.entities.iter().map(|e| e.core.id).collect()
    }

    /// Iterate over all entities in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.iter()
    }

    /// Iterate mutably over all entities in id order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Entity> {
        self.entities.iter_mut()
    }

    /// Borrow the entity at `index` together with a view of all others.
    pub fn split_at(&mut self, index: usize) -> Option<(&mut Entity, Neighbors<'_>)> {
        if index >= self.entities.len() {
            return None;
        }
        let (before, rest) = self.entities.split_at_mut(index);
        let (current, after) = rest.split_first_mut()?;
        Some((current, Neighbors { before, after }))
    }

    /// Remove and return every entity flagged for deletion, keeping order.
    pub fn drain_deleted(&mut self) -> Vec<Entity> {
        let mut removed = Vec::new();
        let mut kept = Vec::with_capacity(self.entities.len());
        for entity in self.entities.drain(..) {
            if entity.core.marked_for_deletion {
                removed.push(entity);
            } else {
                kept.push(entity);
            }
        }
        self.entities = kept;
        removed
    }
}

impl Default for EntityStorage {
    fn default() -> Self {
        Self::new()
    }
}

/// Ids partitioned by kind, rebuilt by full scan after each deletion pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeIndex {
    /// Live enemies.
    pub enemies: Vec<EntityId>,
    /// Live turrets.
    pub turrets: Vec<EntityId>,
    /// Live resources.
    pub resources: Vec<EntityId>,
    /// Live buildings.
    pub buildings: Vec<EntityId>,
    /// The player, if present.
    pub player: Option<EntityId>,
    /// The house, if present.
    pub house: Option<EntityId>,
}

impl TypeIndex {
    /// Scan `storage` and rebuild every list.
    pub fn rebuild(&mut self, storage: &EntityStorage) {
        self.enemies.clear();
        self.turrets.clear();
        self.resources.clear();
        self.buildings.clear();
        self.player = None;
        self.house = None;

        for entity in storage.iter() {
            let id = entity.core.id;
            match entity.kind() {
                EntityKind::Enemy => self.enemies.push(id),
                EntityKind::Turret => self.turrets.push(id),
                EntityKind::Resource => self.resources.push(id),
                EntityKind::Building => self.buildings.push(id),
                EntityKind::Player => self.player = Some(id),
                EntityKind::House => self.house = Some(id),
                _ => {}
            }
        }
    }

    /// Turrets plus buildings; drives the camera zoom.
    #[must_use]
    pub fn structure_count(&self) -> usize {
        self.turrets.len() + self.buildings.len()
    }
}
