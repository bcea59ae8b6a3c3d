//! The player: movement, auto-attack, building and buffs.

use serde::{Deserialize, Serialize};

use crate::combat::strike;
use crate::components::{Color, EntityId};
use crate::config::SimConfig;
use crate::economy::Inventory;
use crate::entity::{Entity, EntityBody, EntityCore, Neighbors, TickContext};
use crate::error::{GameError, Result};
use crate::math::{snap_to_grid, DVec2};
use crate::recipes::{RecipeBook, BASIC_TURRET};

/// Collision radius of the player.
pub const PLAYER_RADIUS: f64 = 15.0;

/// Where the player starts.
pub const PLAYER_START: DVec2 = DVec2::new(100.0, 100.0);

/// Build positions snap to this grid.
pub const BUILD_GRID: f64 = 50.0;

/// A cell is taken if a structure stands closer than this.
const OCCUPIED_DISTANCE: f64 = 10.0;

/// Player stat a buff building can boost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BuffStat {
    /// Auto-attack damage.
    AttackDamage,
    /// Movement speed.
    Speed,
}

/// Active multipliers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Buffs {
    /// Auto-attack damage multiplier.
    pub attack_damage: f64,
    /// Movement speed multiplier.
    pub speed: f64,
}

impl Default for Buffs {
    fn default() -> Self {
        Self {
            attack_damage: 1.0,
            speed: 1.0,
        }
    }
}

impl Buffs {
    /// Multiplier for `stat`.
    #[must_use]
    pub fn get(&self, stat: BuffStat) -> f64 {
        match stat {
            BuffStat::AttackDamage => self.attack_damage,
            BuffStat::Speed => self.speed,
        }
    }

    /// Set the multiplier for `stat`.
    pub fn set(&mut self, stat: BuffStat, value: f64) {
        match stat {
            BuffStat::AttackDamage => self.attack_damage = value,
            BuffStat::Speed => self.speed = value,
        }
    }
}

/// Building currently owning each buff.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuffSources {
    /// Owner of the attack buff.
    pub attack_damage: Option<EntityId>,
    /// Owner of the speed buff.
    pub speed: Option<EntityId>,
}

impl BuffSources {
    /// Owner of `stat`.
    #[must_use]
    pub fn get(&self, stat: BuffStat) -> Option<EntityId> {
        match stat {
            BuffStat::AttackDamage => self.attack_damage,
            BuffStat::Speed => self.speed,
        }
    }

    /// Set the owner of `stat`.
    pub fn set(&mut self, stat: BuffStat, owner: Option<EntityId>) {
        match stat {
            BuffStat::AttackDamage => self.attack_damage = owner,
            BuffStat::Speed => self.speed = owner,
        }
    }
}

/// Per-step player intent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerInput {
    /// Desired direction; normalized before use.
    pub movement: DVec2,
    /// Build the selected recipe at this world point.
    pub build_at: Option<DVec2>,
}

/// Player state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    /// Carried materials.
    pub inventory: Inventory,
    /// Active multipliers.
    pub buffs: Buffs,
    /// Building owning each buff.
    pub buff_sources: BuffSources,
    /// Seconds until the next auto-attack.
    pub attack_cooldown: f64,
    /// Seconds until the next build.
    pub build_cooldown: f64,
    /// Recipe placed by build input.
    pub selected_build: Option<String>,
}

impl Default for Player {
    fn default() -> Self {
        Self {
            inventory: Inventory::new(),
            buffs: Buffs::default(),
            buff_sources: BuffSources::default(),
            attack_cooldown: 0.0,
            build_cooldown: 0.0,
            selected_build: Some(BASIC_TURRET.to_string()),
        }
    }
}

impl Player {
    /// Player entity at `position`.
    #[must_use]
    pub fn spawn(position: DVec2) -> Entity {
        Entity::new(
            position,
            PLAYER_RADIUS,
            Color(0x34_98_db),
            EntityBody::Player(Self::default()),
        )
    }

    /// Validate and pay for building `recipe_id` at `point`.
    ///
    /// `point` is snapped to the build grid. Returns the new entity, which
    /// the caller inserts.
    ///
    /// # Errors
    ///
    /// [`GameError::UnknownRecipe`] for an unknown id,
    /// [`GameError::CellOccupied`] if a turret, building or house stands on
    /// the cell, and [`GameError::InsufficientResources`] if the inventory
    /// does not cover the cost. Nothing is spent on error.
    pub fn try_build<'e>(
        &mut self,
        recipes: &RecipeBook,
        config: &SimConfig,
        structures: impl IntoIterator<Item = &'e Entity>,
        recipe_id: &str,
        point: DVec2,
    ) -> Result<Entity> {
        let recipe = recipes.require(recipe_id)?;
        let cell = snap_to_grid(point, BUILD_GRID);
        let occupied = structures.into_iter().any(|e| {
            e.is_active()
                && e.kind().is_structure()
                && e.position().distance(cell) < OCCUPIED_DISTANCE
        });
        if occupied {
            return Err(GameError::CellOccupied {
                x: cell.x,
                y: cell.y,
            });
        }
        self.inventory.spend(&recipe.cost)?;
        self.build_cooldown = config.player_build_cooldown;
        Ok(recipe.output.spawn(cell, recipes, config))
    }

    pub(crate) fn update(
        &mut self,
        core: &mut EntityCore,
        others: &mut Neighbors<'_>,
        ctx: &mut TickContext<'_>,
    ) {
        let config = ctx.config;
        let heading = ctx.input.movement.normalize_or_zero();
        let half = config.world_size / 2.0;
        core.position += heading * config.player_speed * self.buffs.speed * ctx.dt;
        core.position = core.position.clamp(DVec2::splat(-half), DVec2::splat(half));

        self.build_cooldown -= ctx.dt;
        self.attack_cooldown -= ctx.dt;
        if self.attack_cooldown <= 0.0 {
            self.attack(core, others, ctx);
        }

        if let (Some(point), Some(recipe_id)) = (ctx.input.build_at, self.selected_build.clone()) {
            if self.build_cooldown <= 0.0 {
                match self.try_build(ctx.recipes, config, others.iter(), &recipe_id, point) {
                    Ok(entity) => ctx.spawns.push(entity),
                    Err(err) => tracing::debug!(recipe = %recipe_id, %err, "Build rejected"),
                }
            }
        }
    }

    /// Hit the nearest enemy in reach, or failing that the nearest resource.
    fn attack(&mut self, core: &EntityCore, others: &mut Neighbors<'_>, ctx: &mut TickContext<'_>) {
        let reach = ctx.config.player_attack_range;
        let index = ctx.index;
        let target = nearest_in_reach(others, &index.enemies, core.position, reach)
            .or_else(|| nearest_in_reach(others, &index.resources, core.position, reach));
        let Some(target) = target else {
            return;
        };
        let damage = ctx.config.player_attack_damage * self.buffs.attack_damage;
        strike(others, target, damage, Some(core.id), None, ctx);
        self.attack_cooldown = ctx.config.player_attack_cooldown;
    }
}

/// Nearest active entity among `ids` whose edge is within `reach`.
fn nearest_in_reach(
    others: &Neighbors<'_>,
    ids: &[EntityId],
    origin: DVec2,
    reach: f64,
) -> Option<EntityId> {
    ids.iter()
        .filter_map(|&id| {
            let entity = others.get_active(id)?;
            let distance = entity.position().distance(origin);
            (distance < reach + entity.core.radius).then_some((id, distance))
        })
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(id, _)| id)
}
