//! Production, defensive and buff buildings, plus collector workers.
//!
//! A building runs its [`BuildingAction`] whenever its timer expires.
//! Collector buildings own their [`Worker`] outright: the worker is not a
//! separate entity and is updated as part of its post.

use serde::{Deserialize, Serialize};

use crate::combat::{enemies_within, strike};
use crate::components::{Color, EntityId};
use crate::config::SimConfig;
use crate::economy::{Inventory, Material, ResourceKind};
use crate::entity::{Entity, EntityBody, EntityCore, Neighbors, TickContext};
use crate::math::{polar, step_towards, DVec2};
use crate::player::BuffStat;
use crate::resource::Resource;

/// Radius of regular buildings.
pub const BUILDING_RADIUS: f64 = 25.0;

/// Radius of mega buildings.
pub const MEGA_RADIUS: f64 = 50.0;

/// Distance from the player within which buff buildings apply.
pub const BUFF_RANGE: f64 = 200.0;

/// Collector polling interval.
const COLLECTOR_INTERVAL: f64 = 1.0;

/// Mega building pulse interval.
const MEGA_INTERVAL: f64 = 0.5;

/// Building subtype.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[allow(missing_docs)]
pub enum BuildingKind {
    WoodGen,
    StoneGen,
    IronGen,
    CrystalGen,
    ObsidianGen,
    DiamondGen,
    EmeraldGen,
    RubyGen,
    SapphireGen,
    WoodCol,
    StoneCol,
    IronCol,
    UniversalCol,
    CollectorNovice,
    Alchemy,
    MegaWall,
    MegaFort,
    BuffAttack1,
    BuffAttack2,
    BuffAttack3,
    BuffSpeed1,
    BuffSpeed2,
    BuffSpeed3,
}

/// Worker capabilities for a collector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorkerSpec {
    /// Kind gathered, or any kind when `None`.
    pub filter: Option<ResourceKind>,
    /// Items carried before returning.
    pub max_inventory: u32,
    /// Units per second.
    pub speed: f64,
}

/// What a building does when its timer fires.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BuildingAction {
    /// Spawn a resource of this kind nearby.
    Generate(ResourceKind),
    /// Keep a worker gathering resources.
    Collect(WorkerSpec),
    /// Give the player one gold.
    Transmute,
    /// Damage every enemy within `radius`.
    Pulse {
        /// Damage per pulse.
        damage: f64,
        /// Reach.
        radius: f64,
    },
    /// Spawn a tree and a rock, then pulse.
    Fortify {
        /// Damage per pulse.
        damage: f64,
        /// Reach.
        radius: f64,
    },
    /// Boost a player stat while the player is near.
    Buff {
        /// Boosted stat.
        stat: BuffStat,
        /// Multiplier granted.
        multiplier: f64,
    },
}

impl BuildingKind {
    /// Recipe id and lowercase name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            BuildingKind::WoodGen => "wood_gen",
            BuildingKind::StoneGen => "stone_gen",
            BuildingKind::IronGen => "iron_gen",
            BuildingKind::CrystalGen => "crystal_gen",
            BuildingKind::ObsidianGen => "obsidian_gen",
            BuildingKind::DiamondGen => "diamond_gen",
            BuildingKind::EmeraldGen => "emerald_gen",
            BuildingKind::RubyGen => "ruby_gen",
            BuildingKind::SapphireGen => "sapphire_gen",
            BuildingKind::WoodCol => "wood_col",
            BuildingKind::StoneCol => "stone_col",
            BuildingKind::IronCol => "iron_col",
            BuildingKind::UniversalCol => "universal_col",
            BuildingKind::CollectorNovice => "collector_novice",
            BuildingKind::Alchemy => "alchemy",
            BuildingKind::MegaWall => "mega_wall",
            BuildingKind::MegaFort => "mega_fort",
            BuildingKind::BuffAttack1 => "buff_attack_1",
            BuildingKind::BuffAttack2 => "buff_attack_2",
            BuildingKind::BuffAttack3 => "buff_attack_3",
            BuildingKind::BuffSpeed1 => "buff_speed_1",
            BuildingKind::BuffSpeed2 => "buff_speed_2",
            BuildingKind::BuffSpeed3 => "buff_speed_3",
        }
    }

    /// Behaviour of this kind.
    #[must_use]
    pub const fn action(self) -> BuildingAction {
        match self {
            BuildingKind::WoodGen => BuildingAction::Generate(ResourceKind::Tree),
            BuildingKind::StoneGen => BuildingAction::Generate(ResourceKind::Rock),
            BuildingKind::IronGen => BuildingAction::Generate(ResourceKind::Iron),
            BuildingKind::CrystalGen => BuildingAction::Generate(ResourceKind::Crystal),
            BuildingKind::ObsidianGen => BuildingAction::Generate(ResourceKind::Obsidian),
            BuildingKind::DiamondGen => BuildingAction::Generate(ResourceKind::Diamond),
            BuildingKind::EmeraldGen => BuildingAction::Generate(ResourceKind::Emerald),
            BuildingKind::RubyGen => BuildingAction::Generate(ResourceKind::Ruby),
            BuildingKind::SapphireGen => BuildingAction::Generate(ResourceKind::Sapphire),
            BuildingKind::WoodCol => collect(Some(ResourceKind::Tree), WORKER_CAPACITY, WORKER_SPEED),
            BuildingKind::StoneCol => collect(Some(ResourceKind::Rock), WORKER_CAPACITY, WORKER_SPEED),
            BuildingKind::IronCol => collect(Some(ResourceKind::Iron), WORKER_CAPACITY, WORKER_SPEED),
            BuildingKind::UniversalCol => collect(None, WORKER_CAPACITY, WORKER_SPEED),
            BuildingKind::CollectorNovice => collect(None, 1, 50.0),
            BuildingKind::Alchemy => BuildingAction::Transmute,
            BuildingKind::MegaWall => BuildingAction::Pulse {
                damage: 50.0,
                radius: 150.0,
            },
            BuildingKind::MegaFort => BuildingAction::Fortify {
                damage: 30.0,
                radius: 200.0,
            },
            BuildingKind::BuffAttack1 => buff(BuffStat::AttackDamage, 1.5),
            BuildingKind::BuffAttack2 => buff(BuffStat::AttackDamage, 2.0),
            BuildingKind::BuffAttack3 => buff(BuffStat::AttackDamage, 3.0),
            BuildingKind::BuffSpeed1 => buff(BuffStat::Speed, 1.5),
            BuildingKind::BuffSpeed2 => buff(BuffStat::Speed, 2.0),
            BuildingKind::BuffSpeed3 => buff(BuffStat::Speed, 2.5),
        }
    }

    /// Seconds between actions.
    #[must_use]
    pub fn interval(self, config: &SimConfig) -> f64 {
        match self.action() {
            BuildingAction::Collect(_) => COLLECTOR_INTERVAL,
            BuildingAction::Transmute => config.alchemy_interval,
            BuildingAction::Pulse { .. } | BuildingAction::Fortify { .. } => MEGA_INTERVAL,
            BuildingAction::Generate(_) | BuildingAction::Buff { .. } => {
                config.generator_production_time
            }
        }
    }

    /// Collision radius.
    #[must_use]
    pub const fn radius(self) -> f64 {
        match self {
            BuildingKind::MegaWall | BuildingKind::MegaFort => MEGA_RADIUS,
            _ => BUILDING_RADIUS,
        }
    }

    /// Display color.
    #[must_use]
    pub const fn color(self) -> Color {
        Color(match self {
            BuildingKind::WoodGen => 0x2e_cc_71,
            BuildingKind::StoneGen => 0x95_a5_a6,
            BuildingKind::IronGen => 0x7f_8c_8d,
            BuildingKind::CrystalGen => 0x9b_59_b6,
            BuildingKind::ObsidianGen => 0x2c_3e_50,
            BuildingKind::DiamondGen => 0x34_98_db,
            BuildingKind::EmeraldGen | BuildingKind::WoodCol => 0x27_ae_60,
            BuildingKind::RubyGen => 0xc0_39_2b,
            BuildingKind::SapphireGen => 0x29_80_b9,
            BuildingKind::StoneCol => 0x7f_8c_8d,
            BuildingKind::IronCol => 0x34_49_5e,
            BuildingKind::UniversalCol => 0xf3_9c_12,
            BuildingKind::CollectorNovice => 0xbd_c3_c7,
            BuildingKind::Alchemy => 0xf1_c4_0f,
            BuildingKind::MegaWall => 0x8b_45_13,
            BuildingKind::MegaFort => 0x2c_3e_50,
            BuildingKind::BuffAttack1 | BuildingKind::BuffAttack2 | BuildingKind::BuffAttack3 => {
                0xe7_4c_3c
            }
            BuildingKind::BuffSpeed1 | BuildingKind::BuffSpeed2 | BuildingKind::BuffSpeed3 => {
                0x27_ae_60
            }
        })
    }
}

const fn collect(filter: Option<ResourceKind>, max_inventory: u32, speed: f64) -> BuildingAction {
    BuildingAction::Collect(WorkerSpec {
        filter,
        max_inventory,
        speed,
    })
}

const fn buff(stat: BuffStat, multiplier: f64) -> BuildingAction {
    BuildingAction::Buff { stat, multiplier }
}

/// Building state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Building {
    /// Subtype.
    pub kind: BuildingKind,
    /// Seconds until the next action.
    pub timer: f64,
    /// Seconds between actions.
    pub interval: f64,
    /// Resources spawned so far (generators).
    pub generated: u32,
    /// Owned worker (collectors), created on the first action.
    pub worker: Option<Worker>,
}

impl Building {
    /// Building state for `kind`.
    #[must_use]
    pub fn new(kind: BuildingKind, config: &SimConfig) -> Self {
        let interval = kind.interval(config);
        Self {
            kind,
            timer: interval,
            interval,
            generated: 0,
            worker: None,
        }
    }

    /// Building entity at `position`.
    #[must_use]
    pub fn spawn(kind: BuildingKind, position: DVec2, config: &SimConfig) -> Entity {
        Entity::new(
            position,
            kind.radius(),
            kind.color(),
            EntityBody::Building(Self::new(kind, config)),
        )
    }

    pub(crate) fn update(
        &mut self,
        core: &mut EntityCore,
        others: &mut Neighbors<'_>,
        ctx: &mut TickContext<'_>,
    ) {
        self.timer -= ctx.dt;
        if self.timer <= 0.0 {
            self.perform(core, others, ctx);
            self.timer = self.interval;
        }
        if let Some(worker) = &mut self.worker {
            worker.update(core.position, others, ctx);
        }
        if let BuildingAction::Buff { stat, multiplier } = self.kind.action() {
            apply_buff(core, stat, multiplier, others, ctx);
        }
    }

    fn perform(
        &mut self,
        core: &EntityCore,
        others: &mut Neighbors<'_>,
        ctx: &mut TickContext<'_>,
    ) {
        match self.kind.action() {
            BuildingAction::Generate(kind) => {
                spawn_nearby(core.position, kind, ctx);
                self.generated += 1;
            }
            BuildingAction::Collect(spec) => {
                if self.worker.is_none() {
                    self.worker = Some(Worker::new(core.position, spec));
                }
            }
            BuildingAction::Transmute => {
                let player = ctx.index.player.and_then(|id| others.get_mut(id));
                if let Some(player) = player.and_then(Entity::as_player_mut) {
                    player.inventory.add(Material::Gold, 1);
                    ctx.events.gathered.add(Material::Gold, 1);
                }
            }
            BuildingAction::Pulse { damage, radius } => pulse(core, damage, radius, others, ctx),
            BuildingAction::Fortify { damage, radius } => {
                spawn_nearby(core.position, ResourceKind::Tree, ctx);
                spawn_nearby(core.position, ResourceKind::Rock, ctx);
                pulse(core, damage, radius, others, ctx);
            }
            BuildingAction::Buff { .. } => {}
        }
    }
}

fn spawn_nearby(origin: DVec2, kind: ResourceKind, ctx: &mut TickContext<'_>) {
    let angle = ctx.rng.angle();
    let distance = ctx.rng.range(40.0, 80.0);
    ctx.spawns
        .push(Resource::spawn(origin + polar(angle, distance), kind));
}

fn pulse(
    core: &EntityCore,
    damage: f64,
    radius: f64,
    others: &mut Neighbors<'_>,
    ctx: &mut TickContext<'_>,
) {
    for id in enemies_within(others, &ctx.index.enemies, core.position, radius) {
        strike(others, id, damage, None, None, ctx);
    }
}

/// Claim, keep or release the player's buff for `stat`.
///
/// Only one building per stat owns the buff: the nearest one in range.
fn apply_buff(
    core: &EntityCore,
    stat: BuffStat,
    multiplier: f64,
    others: &mut Neighbors<'_>,
    ctx: &TickContext<'_>,
) {
    let Some(player_id) = ctx.index.player else {
        return;
    };
    let Some(player_entity) = others.get(player_id) else {
        return;
    };
    let player_position = player_entity.position();
    let Some(owner) = player_entity.as_player().map(|p| p.buff_sources.get(stat)) else {
        return;
    };
    let distance = player_position.distance(core.position);
    let in_range = distance < BUFF_RANGE;

    let claim = in_range
        && match owner {
            None => true,
            Some(id) if id == core.id => true,
            Some(id) => others
                .get(id)
                .map_or(true, |o| distance < o.position().distance(player_position)),
        };
    let release = !in_range && owner == Some(core.id);

    let Some(player) = others.get_mut(player_id).and_then(Entity::as_player_mut) else {
        return;
    };
    if claim {
        player.buffs.set(stat, multiplier);
        player.buff_sources.set(stat, Some(core.id));
    } else if release {
        player.buffs.set(stat, 1.0);
        player.buff_sources.set(stat, None);
    }
}

/// Items a regular worker carries.
pub const WORKER_CAPACITY: u32 = 3;

/// Regular worker speed.
pub const WORKER_SPEED: f64 = 100.0;

/// Worker collision radius (display only).
pub const WORKER_RADIUS: f64 = 8.0;

/// Worker display color.
pub const WORKER_COLOR: Color = Color(0xec_f0_f1);

/// Resources farther than this from the post are ignored.
const GATHER_RANGE: f64 = 300.0;

/// Distance at which the worker touches its target or post.
const REACH: f64 = 20.0;

/// Damage dealt to a resource per harvest.
const HARVEST_DAMAGE: f64 = 10.0;

/// Worker state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkerState {
    /// Looking for something to do.
    Idle,
    /// Walking to a resource.
    Gathering,
    /// Walking back to the post to deposit.
    Returning,
}

/// A collector's worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Worker {
    /// World position.
    pub position: DVec2,
    /// Current state.
    pub state: WorkerState,
    /// Resource being walked to.
    pub target: Option<EntityId>,
    /// Carried items by material.
    pub load: Inventory,
    /// Kind gathered, or any when `None`.
    pub filter: Option<ResourceKind>,
    /// Items carried before returning.
    pub max_inventory: u32,
    /// Units per second.
    pub speed: f64,
}

impl Worker {
    /// Idle worker at its post.
    #[must_use]
    pub fn new(post: DVec2, spec: WorkerSpec) -> Self {
        Self {
            position: post,
            state: WorkerState::Idle,
            target: None,
            load: Inventory::new(),
            filter: spec.filter,
            max_inventory: spec.max_inventory,
            speed: spec.speed,
        }
    }

    /// Items currently carried.
    #[must_use]
    pub fn carried(&self) -> u32 {
        self.load.total()
    }

    fn accepts(&self, kind: ResourceKind) -> bool {
        self.filter.map_or(true, |f| f == kind)
    }

    pub(crate) fn update(&mut self, post: DVec2, others: &mut Neighbors<'_>, ctx: &mut TickContext<'_>) {
        match self.state {
            WorkerState::Idle => {
                if self.carried() < self.max_inventory {
                    self.find_resource(post, others, ctx);
                } else {
                    self.state = WorkerState::Returning;
                }
            }
            WorkerState::Gathering => self.gather(others, ctx),
            WorkerState::Returning => self.return_to(post, others, ctx),
        }
    }

    fn find_resource(&mut self, post: DVec2, others: &Neighbors<'_>, ctx: &TickContext<'_>) {
        let mut best: Option<(EntityId, f64)> = None;
        for &id in &ctx.index.resources {
            let Some(entity) = others.get_active(id) else {
                continue;
            };
            let Some(resource) = entity.as_resource() else {
                continue;
            };
            if !self.accepts(resource.kind) || entity.position().distance(post) >= GATHER_RANGE {
                continue;
            }
            let distance = entity.position().distance(self.position);
            if best.map_or(true, |(_, d)| distance < d) {
                best = Some((id, distance));
            }
        }
        match best {
            Some((id, _)) => {
                self.target = Some(id);
                self.state = WorkerState::Gathering;
            }
            None => self.state = WorkerState::Returning,
        }
    }

    fn gather(&mut self, others: &mut Neighbors<'_>, ctx: &mut TickContext<'_>) {
        let Some(target) = self.target.and_then(|id| others.get_mut(id)).filter(|e| e.is_active())
        else {
            self.target = None;
            self.state = WorkerState::Idle;
            return;
        };
        let target_position = target.position();
        if target_position.distance(self.position) >= REACH {
            step_towards(&mut self.position, target_position, self.speed, ctx.dt);
            return;
        }

        let outcome = target.take_damage(HARVEST_DAMAGE, None, ctx.rng);
        if let Some(resource) = target.as_resource_mut() {
            if outcome.killed {
                resource.worker_harvested = true;
            }
            self.load.add(resource.kind.material(), 1);
        }
        self.target = None;
        self.state = WorkerState::Idle;
    }

    fn return_to(&mut self, post: DVec2, others: &mut Neighbors<'_>, ctx: &mut TickContext<'_>) {
        if post.distance(self.position) >= REACH {
            step_towards(&mut self.position, post, self.speed, ctx.dt);
            return;
        }
        let player = ctx.index.player.and_then(|id| others.get_mut(id));
        if let Some(player) = player.and_then(Entity::as_player_mut) {
            player.inventory.add_all(&self.load);
            ctx.events.gathered.add_all(&self.load);
            self.load.clear();
            self.state = WorkerState::Idle;
        }
    }
}
