//! The fixed-timestep simulation loop.
//!
//! # Step order
//!
//! Each step runs, in this order:
//! 1. **Wave timer** - advance the wave and heal the house
//! 2. **Spawn timer** - spawn the next scheduled enemy
//! 3. **Resource timer** - spawn an ambient resource while under the cap
//! 4. **Entity pass** - update every entity in id order
//! 5. **Pending spawns** - append entities created during the pass
//! 6. **Particles** - advance decorations
//! 7. **Deletion filter** - remove flagged entities, applying death effects once
//! 8. **Index** - rebuild the per-kind id lists
//! 9. **Camera** - ease the zoom
//! 10. **Game over** - end the game once the house has no health left

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::camera::Camera;
use crate::clock::FixedStepClock;
use crate::combat::DamageEvent;
use crate::components::{EntityId, EntityKind, Health};
use crate::config::SimConfig;
use crate::economy::{Inventory, Material, ResourceKind};
use crate::enemy::{Enemy, EnemyKind};
use crate::entity::{Entity, EntityBody, EntityStorage, TickContext, TypeIndex};
use crate::error::{GameError, Result};
use crate::math::{polar, DVec2};
use crate::particles::{Burst, ParticleSystem};
use crate::player::{Player, PlayerInput, PLAYER_START};
use crate::recipes::RecipeBook;
use crate::render::{visible_views, Renderer};
use crate::resource::{House, Resource};
use crate::rng::SimRng;
use crate::waves::{RoundCatalog, WaveScheduler};

/// Materials a money turret kill can drop.
const LOOT_TABLE: [Material; 4] = [Material::Wood, Material::Stone, Material::Iron, Material::Crystal];

/// Amount of a loot drop.
const LOOT_AMOUNT: u32 = 5;

/// Lifecycle of a game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameState {
    /// Waiting for [`Simulation::start`].
    Start,
    /// Steps are applied.
    Playing,
    /// The house fell; steps are ignored.
    GameOver,
}

/// Events generated during a simulation step.
///
/// These can drive effects, notifications and metrics in a front end.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TickEvents {
    /// Every damage application this tick, in resolution order.
    pub damage_events: Vec<DamageEvent>,
    /// Entities removed this step.
    pub deaths: Vec<EntityId>,
    /// Enemies removed with no health left.
    pub enemies_killed: u32,
    /// Entities added this step.
    pub spawned: Vec<EntityId>,
    /// Enemies spawned by the wave scheduler.
    pub enemies_spawned: u32,
    /// Materials credited to the player.
    pub gathered: Inventory,
    /// New wave number, if a wave started.
    pub wave_started: Option<u32>,
    /// Id of the round chosen this step, if any.
    pub round_selected: Option<String>,
    /// Set on the step the house fell.
    pub game_over: bool,
}

impl TickEvents {
    /// Fold `other` into `self`.
    pub fn merge(&mut self, other: TickEvents) {
        self.damage_events.extend(other.damage_events);
        self.deaths.extend(other.deaths);
        self.enemies_killed += other.enemies_killed;
        self.spawned.extend(other.spawned);
        self.enemies_spawned += other.enemies_spawned;
        self.gathered.add_all(&other.gathered);
        if other.wave_started.is_some() {
            self.wave_started = other.wave_started;
        }
        if other.round_selected.is_some() {
            self.round_selected = other.round_selected;
        }
        self.game_over |= other.game_over;
    }
}

/// The village defense simulation.
///
/// Owns every entity and all random state, so two simulations built from the
/// same configuration and fed the same inputs stay identical step for step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Simulation {
    tick: u64,
    time: f64,
    state: GameState,
    config: SimConfig,
    recipes: RecipeBook,
    catalog: RoundCatalog,
    entities: EntityStorage,
    index: TypeIndex,
    scheduler: WaveScheduler,
    resource_spawn_timer: f64,
    rng: SimRng,
    particles: ParticleSystem,
    camera: Camera,
    clock: FixedStepClock,
    input: PlayerInput,
}

impl Simulation {
    /// Create a simulation with the built-in round catalog.
    ///
    /// The world starts with the house at the origin, the player nearby and
    /// `initial_resources` trees and rocks scattered around.
    ///
    /// # Example
    ///
    /// ```
    /// use village_core::config::SimConfig;
    /// use village_core::simulation::{GameState, Simulation};
    ///
    /// let sim = Simulation::new(SimConfig::default()).unwrap();
    /// assert_eq!(sim.get_tick(), 0);
    /// assert_eq!(sim.state(), GameState::Start);
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvalidConfig`] if `config` fails validation.
    pub fn new(config: SimConfig) -> Result<Self> {
        Self::with_catalog(config, RoundCatalog::builtin())
    }

    /// Create a simulation with a custom round catalog.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvalidConfig`] if `config` or `catalog` fails
    /// validation.
    pub fn with_catalog(config: SimConfig, catalog: RoundCatalog) -> Result<Self> {
        config.validate()?;
        catalog.validate()?;

        let mut sim = Self {
            tick: 0,
            time: 0.0,
            state: GameState::Start,
            recipes: RecipeBook::new(&config),
            catalog,
            entities: EntityStorage::new(),
            index: TypeIndex::default(),
            scheduler: WaveScheduler::new(&config),
            resource_spawn_timer: config.resource_spawn_timer,
            rng: SimRng::from_seed(config.seed),
            particles: ParticleSystem::new(config.seed),
            camera: Camera::new(DVec2::ZERO),
            clock: FixedStepClock::new(config.fixed_step, config.max_frame_time),
            input: PlayerInput::default(),
            config,
        };
        sim.populate();
        Ok(sim)
    }

    fn populate(&mut self) {
        self.entities
            .insert(House::spawn(self.camera.center, self.config.house_max_health));
        self.entities.insert(Player::spawn(PLAYER_START));

        let (near, far) = self.config.resource_spawn_distance;
        for _ in 0..self.config.initial_resources {
            let angle = self.rng.angle();
            let distance = self.rng.range(near, far);
            let kind = if self.rng.roll_above(0.5) {
                ResourceKind::Rock
            } else {
                ResourceKind::Tree
            };
            self.entities
                .insert(Resource::spawn(self.camera.center + polar(angle, distance), kind));
        }
        self.index.rebuild(&self.entities);
    }

    /// Fixed steps taken since the game started.
    #[must_use]
    pub const fn get_tick(&self) -> u64 {
        self.tick
    }

    /// Simulated seconds so far.
    #[must_use]
    pub const fn time(&self) -> f64 {
        self.time
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> GameState {
        self.state
    }

    /// Current wave number.
    #[must_use]
    pub const fn wave(&self) -> u32 {
        self.scheduler.wave
    }

    /// Wave and spawn timers.
    #[must_use]
    pub fn scheduler(&self) -> &WaveScheduler {
        &self.scheduler
    }

    /// Configuration in use.
    #[must_use]
    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Recipe book in use.
    #[must_use]
    pub fn recipes(&self) -> &RecipeBook {
        &self.recipes
    }

    /// Round catalog in use.
    #[must_use]
    pub fn catalog(&self) -> &RoundCatalog {
        &self.catalog
    }

    /// All entities.
    #[must_use]
    pub fn entities(&self) -> &EntityStorage {
        &self.entities
    }

    /// Per-kind id lists as of the end of the last step.
    #[must_use]
    pub fn index(&self) -> &TypeIndex {
        &self.index
    }

    /// Camera state.
    #[must_use]
    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    /// Decoration particles.
    #[must_use]
    pub fn particles(&self) -> &ParticleSystem {
        &self.particles
    }

    /// Look up an entity.
    #[must_use]
    pub fn get_entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(id)
    }

    /// Player state.
    #[must_use]
    pub fn player(&self) -> Option<&Player> {
        self.index
            .player
            .and_then(|id| self.entities.get(id))
            .and_then(Entity::as_player)
    }

    /// House health.
    #[must_use]
    pub fn house_health(&self) -> Option<Health> {
        self.index
            .house
            .and_then(|id| self.entities.get(id))
            .and_then(Entity::health)
            .copied()
    }

    /// Leave the start screen.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvalidState`] once the game is over.
    pub fn start(&mut self) -> Result<()> {
        match self.state {
            GameState::Start => {
                self.state = GameState::Playing;
                Ok(())
            }
            GameState::Playing => Ok(()),
            GameState::GameOver => Err(GameError::InvalidState(
                "cannot start a finished game".to_string(),
            )),
        }
    }

    /// Player input applied to every following step.
    pub fn set_input(&mut self, input: PlayerInput) {
        self.input = input;
    }

    /// Current player input.
    #[must_use]
    pub fn input(&self) -> &PlayerInput {
        &self.input
    }

    fn player_mut(&mut self) -> Result<&mut Player> {
        let id = self
            .index
            .player
            .ok_or_else(|| GameError::InvalidState("no player".to_string()))?;
        self.entities
            .get_mut(id)
            .and_then(Entity::as_player_mut)
            .ok_or(GameError::EntityNotFound(id))
    }

    /// Choose the recipe placed by build input.
    ///
    /// # Errors
    ///
    /// [`GameError::UnknownRecipe`] for an unknown id.
    pub fn select_build(&mut self, recipe_id: &str) -> Result<()> {
        self.recipes.require(recipe_id)?;
        self.player_mut()?.selected_build = Some(recipe_id.to_string());
        Ok(())
    }

    /// Add materials to the player's inventory.
    ///
    /// # Errors
    ///
    /// [`GameError::InvalidState`] if there is no player.
    pub fn give_player(&mut self, material: Material, amount: u32) -> Result<()> {
        self.player_mut()?.inventory.add(material, amount);
        Ok(())
    }

    /// Build `recipe_id` at `point` on behalf of the player, paying its cost.
    ///
    /// Ignores the build cooldown. The structure is inserted immediately.
    ///
    /// # Errors
    ///
    /// Same as [`Player::try_build`], plus [`GameError::InvalidState`] if
    /// there is no player.
    pub fn place(&mut self, recipe_id: &str, point: DVec2) -> Result<EntityId> {
        let player_id = self
            .index
            .player
            .ok_or_else(|| GameError::InvalidState("no player".to_string()))?;
        let slot = self
            .entities
            .index_of(player_id)
            .ok_or(GameError::EntityNotFound(player_id))?;
        let (entity, others) = self
            .entities
            .split_at(slot)
            .ok_or(GameError::EntityNotFound(player_id))?;
        let player = entity
            .as_player_mut()
            .ok_or(GameError::EntityNotFound(player_id))?;
        let built = player.try_build(&self.recipes, &self.config, others.iter(), recipe_id, point)?;
        Ok(self.insert_entity(built))
    }

    /// Spawn an enemy aimed at the house outside the regular schedule.
    ///
    /// # Errors
    ///
    /// [`GameError::InvalidState`] if there is no house to target.
    pub fn spawn_enemy_at(&mut self, kind: EnemyKind, power: f64, position: DVec2) -> Result<EntityId> {
        let (house_id, house_position) = self
            .house()
            .ok_or_else(|| GameError::InvalidState("no house".to_string()))?;
        Ok(self.insert_entity(Enemy::spawn(kind, power, position, house_id, house_position)))
    }

    /// Insert a pre-built entity and refresh the index.
    pub fn insert_entity(&mut self, entity: Entity) -> EntityId {
        let id = self.entities.insert(entity);
        self.index.rebuild(&self.entities);
        id
    }

    fn house(&self) -> Option<(EntityId, DVec2)> {
        let id = self.index.house?;
        self.entities.get(id).map(|e| (id, e.position()))
    }

    /// Advance by one fixed step.
    ///
    /// # Example
    ///
    /// ```
    /// use village_core::config::SimConfig;
    /// use village_core::simulation::Simulation;
    ///
    /// let mut sim = Simulation::new(SimConfig::default()).unwrap();
    /// sim.start().unwrap();
    /// sim.tick();
    /// assert_eq!(sim.get_tick(), 1);
    /// ```
    pub fn tick(&mut self) -> TickEvents {
        self.update(self.config.fixed_step)
    }

    /// Feed real frame time through the fixed-step clock, running as many
    /// steps as it yields.
    pub fn advance_frame(&mut self, frame_dt: f64) -> TickEvents {
        let mut events = TickEvents::default();
        if self.state != GameState::Playing {
            return events;
        }
        let steps = self.clock.advance(frame_dt);
        for _ in 0..steps {
            events.merge(self.tick());
        }
        events
    }

    /// Advance by `dt` seconds. Does nothing unless the game is playing.
    pub fn update(&mut self, dt: f64) -> TickEvents {
        let mut events = TickEvents::default();
        if self.state != GameState::Playing {
            return events;
        }

        // 1. Waves
        if self.scheduler.advance_wave(dt, &self.config) {
            events.wave_started = Some(self.scheduler.wave);
            self.heal_house(self.config.wave_heal);
        }

        // 2. Enemy spawns
        if self.scheduler.spawn_due(dt) {
            self.spawn_scheduled_enemy(&mut events);
            self.scheduler.reset_spawn_timer(&self.catalog, &self.config);
        }

        // 3. Ambient resources
        if self.index.resources.len() < self.config.max_resources {
            self.resource_spawn_timer -= dt;
            if self.resource_spawn_timer <= 0.0 {
                self.spawn_ambient_resource(&mut events);
                let (lo, hi) = self.config.resource_spawn_interval;
                self.resource_spawn_timer = self.rng.range(lo, hi);
            }
        }

        // 4-5. Entity pass and pending spawns
        self.run_entity_pass(dt, &mut events);

        // 6. Particles
        self.particles.update(dt);

        // 7. Deletion filter
        self.remove_deleted(&mut events);

        // 8. Index
        self.index.rebuild(&self.entities);

        // 9. Camera
        self.camera.update(self.index.structure_count(), dt);

        // 10. Game over
        if self.house_health().is_some_and(|h| h.is_dead()) {
            self.state = GameState::GameOver;
            events.game_over = true;
            tracing::info!(tick = self.tick, wave = self.scheduler.wave, "Game over");
        }

        self.tick += 1;
        self.time += dt;

        #[cfg(debug_assertions)]
        {
            let hash = self.state_hash();
            tracing::trace!(tick = self.tick, state_hash = hash, "Simulation state hash");
        }

        #[cfg(feature = "debug-validation")]
        {
            let checked = self.check_invariants();
            if let Err(err) = &checked {
                tracing::error!(tick = self.tick, %err, "Invariant violated");
            }
            debug_assert!(checked.is_ok(), "tick {}: {:?}", self.tick, checked);
        }

        events
    }

    fn heal_house(&mut self, amount: f64) {
        let house = self.index.house.and_then(|id| self.entities.get_mut(id));
        if let Some(EntityBody::House(house)) = house.map(|e| &mut e.body) {
            house.health.heal(amount);
        }
    }

    fn spawn_scheduled_enemy(&mut self, events: &mut TickEvents) {
        let Some((house_id, house_position)) = self.house() else {
            return;
        };
        let angle = self.rng.angle();
        let distance = self.config.spawn_distance(self.camera.zoom);
        let position = self.camera.center + polar(angle, distance);

        let plan = self
            .scheduler
            .plan_spawn(&self.catalog, &self.config, &mut self.rng);
        if let Some(round) = plan.new_round.and_then(|i| self.catalog.get(i)) {
            events.round_selected = Some(round.id.clone());
        }

        let id = self.entities.insert(Enemy::spawn(
            plan.kind,
            plan.power,
            position,
            house_id,
            house_position,
        ));
        self.index.enemies.push(id);
        events.spawned.push(id);
        events.enemies_spawned += 1;
        tracing::debug!(id, kind = plan.kind.name(), power = plan.power, "Enemy spawned");
    }

    fn spawn_ambient_resource(&mut self, events: &mut TickEvents) {
        let angle = self.rng.angle();
        let (near, far) = self.config.resource_spawn_distance;
        let distance = self.rng.range(near, far);
        let kind = ResourceKind::for_ambient_spawn(self.rng.next_f64(), self.scheduler.wave);
        let id = self
            .entities
            .insert(Resource::spawn(self.camera.center + polar(angle, distance), kind));
        self.index.resources.push(id);
        events.spawned.push(id);
    }

    fn run_entity_pass(&mut self, dt: f64, events: &mut TickEvents) {
        let mut spawns = Vec::new();
        {
            let Self {
                config,
                recipes,
                entities,
                index,
                rng,
                particles,
                input,
                ..
            } = self;
            let mut ctx = TickContext {
                config,
                recipes,
                rng,
                index,
                input,
                dt,
                spawns: &mut spawns,
                events: &mut *events,
                particles,
            };
            for slot in 0..entities.len() {
                let Some((entity, mut others)) = entities.split_at(slot) else {
                    break;
                };
                if entity.is_active() {
                    entity.update(&mut others, &mut ctx);
                }
            }
        }
        for entity in spawns {
            let id = self.entities.insert(entity);
            events.spawned.push(id);
        }
    }

    fn remove_deleted(&mut self, events: &mut TickEvents) {
        let removed = self.entities.drain_deleted();
        let house_position = self.house().map_or(self.camera.center, |(_, p)| p);
        let mut children = Vec::new();

        for entity in &removed {
            events.deaths.push(entity.id());
            match &entity.body {
                EntityBody::Resource(resource) => {
                    self.particles
                        .emit(entity.position(), entity.core.color, 8, Burst::new(80.0, 0.6));
                    if resource.health.is_dead() && !resource.worker_harvested {
                        let material = resource.kind.material();
                        self.credit_player(material, resource.kind.death_yield(), events);
                    }
                }
                EntityBody::Enemy(enemy) if enemy.health.is_dead() => {
                    events.enemies_killed += 1;
                    self.particles
                        .emit(entity.position(), entity.core.color, 15, Burst::new(150.0, 0.8));
                    let drops_loot = enemy
                        .last_hit_source
                        .and_then(|id| self.entities.get(id))
                        .and_then(Entity::as_turret)
                        .is_some_and(|t| t.kind.drops_loot());
                    if drops_loot {
                        let material = LOOT_TABLE[self.rng.index(LOOT_TABLE.len())];
                        self.credit_player(material, LOOT_AMOUNT, events);
                    }
                    children.extend(enemy.split(&entity.core, house_position, &mut self.rng));
                }
                _ => {}
            }
        }

        for child in children {
            let id = self.entities.insert(child);
            events.spawned.push(id);
        }
    }

    fn credit_player(&mut self, material: Material, amount: u32, events: &mut TickEvents) {
        let player = self.index.player.and_then(|id| self.entities.get_mut(id));
        if let Some(player) = player.and_then(Entity::as_player_mut) {
            player.inventory.add(material, amount);
            events.gathered.add(material, amount);
        }
    }

    /// Draw the entities and particles inside the camera's viewport.
    pub fn render<R: Renderer + ?Sized>(&self, renderer: &mut R) {
        let viewport = self
            .camera
            .viewport(self.config.viewport_width, self.config.viewport_height);
        renderer.begin_frame(&self.camera);
        for view in visible_views(self.entities.iter(), &viewport) {
            renderer.draw_entity(&view);
        }
        for particle in self.particles.particles() {
            if viewport.overlaps(particle.position, particle.size) {
                renderer.draw_particle(particle);
            }
        }
        renderer.end_frame();
    }

    /// Check the bookkeeping every tick relies on.
    ///
    /// Entities must be stored in strictly ascending id order, each id in the
    /// type index must name a live entity of that kind, and every health and
    /// position must be a real number with health never above its maximum.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvalidState`] describing the first violation.
    pub fn check_invariants(&self) -> Result<()> {
        let mut previous: Option<EntityId> = None;
        for entity in self.entities.iter() {
            let id = entity.id();
            if previous.is_some_and(|p| p >= id) {
                return Err(GameError::InvalidState(format!(
                    "entity {id} stored out of id order"
                )));
            }
            previous = Some(id);

            let position = entity.position();
            if !position.is_finite() {
                return Err(GameError::InvalidState(format!(
                    "entity {id} at non-finite position {position}"
                )));
            }
            if let Some(health) = entity.health() {
                if health.current.is_nan() || health.current > health.max {
                    return Err(GameError::InvalidState(format!(
                        "entity {id} health {} outside max {}",
                        health.current, health.max
                    )));
                }
            }
        }

        let index = &self.index;
        let listed = [
            (EntityKind::Enemy, index.enemies.as_slice()),
            (EntityKind::Turret, index.turrets.as_slice()),
            (EntityKind::Resource, index.resources.as_slice()),
            (EntityKind::Building, index.buildings.as_slice()),
            (EntityKind::Player, index.player.as_slice()),
            (EntityKind::House, index.house.as_slice()),
        ];
        for (kind, ids) in listed {
            for &id in ids {
                match self.entities.get(id).map(Entity::kind) {
                    Some(found) if found == kind => {}
                    found => {
                        return Err(GameError::InvalidState(format!(
                            "index lists {id} as {kind:?}, storage has {found:?}"
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    /// Hash of everything that affects future ticks, for replay comparison.
    ///
    /// Two simulations with identical state produce identical hashes.
    /// Decorations are excluded.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();

        self.tick.hash(&mut hasher);
        self.state.hash(&mut hasher);
        self.scheduler.wave.hash(&mut hasher);
        self.scheduler.round.hash(&mut hasher);

        self.entities.len().hash(&mut hasher);

        for entity in self.entities.iter() {
            entity.id().hash(&mut hasher);
            entity.kind().hash(&mut hasher);
            entity.core.position.x.to_bits().hash(&mut hasher);
            entity.core.position.y.to_bits().hash(&mut hasher);

            if let Some(health) = entity.health() {
                health.current.to_bits().hash(&mut hasher);
                health.max.to_bits().hash(&mut hasher);
            }

            match &entity.body {
                EntityBody::Player(player) => {
                    for (material, amount) in player.inventory.iter() {
                        material.hash(&mut hasher);
                        amount.hash(&mut hasher);
                    }
                }
                EntityBody::Turret(turret) => {
                    turret.cooldown.to_bits().hash(&mut hasher);
                    turret.kill_count.hash(&mut hasher);
                }
                EntityBody::Building(building) => {
                    building.timer.to_bits().hash(&mut hasher);
                    if let Some(worker) = &building.worker {
                        worker.position.x.to_bits().hash(&mut hasher);
                        worker.position.y.to_bits().hash(&mut hasher);
                        worker.carried().hash(&mut hasher);
                    }
                }
                EntityBody::Projectile(projectile) => {
                    projectile.target.hash(&mut hasher);
                    projectile.velocity.x.to_bits().hash(&mut hasher);
                    projectile.velocity.y.to_bits().hash(&mut hasher);
                }
                _ => {}
            }
        }

        hasher.finish()
    }

    /// Serialize the simulation state for snapshots or replays.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvalidState`] when bincode rejects the state.
    pub fn serialize(&self) -> Result<Vec<u8>> {
        bincode::serialize(self)
            .map_err(|e| GameError::InvalidState(format!("snapshot encode failed: {e}")))
    }

    /// Restore a snapshot written by [`Simulation::serialize`].
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvalidState`] when the bytes are not a snapshot.
    pub fn deserialize(data: &[u8]) -> Result<Self> {
        bincode::deserialize(data).map_err(|e| {
            GameError::InvalidState(format!("snapshot decode failed: {e}"))
        })
    }
}
