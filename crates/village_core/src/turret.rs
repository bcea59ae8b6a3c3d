//! Turret catalog and firing logic.
//!
//! Every turret kind is a row in [`TurretKind::profile`] plus a
//! [`FiringMode`]. Damage is balanced from the recipe's craft difficulty:
//! a turret costing twice the basic turret deals twice the basic DPS.

use serde::{Deserialize, Serialize};

use crate::combat::{enemies_within, nearest_enemy, strike};
use crate::components::{Color, Element, EntityId};
use crate::entity::{Entity, EntityBody, EntityCore, Neighbors, TickContext};
use crate::math::{bearing, polar, DVec2};
use crate::projectile::{Payload, Projectile};
use crate::recipes::RecipeBook;

/// Collision radius of every turret.
pub const TURRET_RADIUS: f64 = 20.0;

/// Range used when a profile does not override it.
const DEFAULT_RANGE: f64 = 200.0;

/// Damage of the basic turret, the balance anchor.
pub const BASE_DPS: f64 = 10.0;

/// Tesla chain hops after the first target.
const CHAIN_HOPS: usize = 2;

/// Maximum distance between two tesla links.
const CHAIN_RANGE: f64 = 150.0;

/// Damage share of each tesla chain hop.
const CHAIN_FALLOFF: f64 = 0.8;

/// Shotgun pellets per volley.
const SPREAD_PELLETS: i32 = 5;

/// Angle between neighbouring shotgun pellets, in radians.
const SPREAD_STEP: f64 = 0.15;

/// Distance an enemy is pushed by a teleport turret.
const DISPLACE_DISTANCE: f64 = 200.0;

macro_rules! turret_kinds {
    ($($variant:ident => $name:literal),* $(,)?) => {
        /// Turret subtype.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        #[allow(missing_docs)]
        pub enum TurretKind {
            $($variant),*
        }

        impl TurretKind {
            /// Every kind, in catalog order.
            pub const ALL: &'static [TurretKind] = &[$(TurretKind::$variant),*];

            /// Lowercase name, also the suffix of the `turret_*` recipe id.
            #[must_use]
            pub const fn name(self) -> &'static str {
                match self {
                    $(TurretKind::$variant => $name),*
                }
            }
        }
    };
}

turret_kinds! {
    Basic => "basic",
    Wood => "wood",
    Stone => "stone",
    Iron => "iron",
    Gold => "gold",
    Crystal => "crystal",
    Obsidian => "obsidian",
    Diamond => "diamond",
    Emerald => "emerald",
    Ruby => "ruby",
    Sapphire => "sapphire",
    Sniper => "sniper",
    Gatling => "gatling",
    Shotgun => "shotgun",
    Flamethrower => "flamethrower",
    Tesla => "tesla",
    Laser => "laser",
    Mortar => "mortar",
    Missile => "missile",
    Railgun => "railgun",
    Money => "money",
    Pushback => "pushback",
    SlowField => "slow_field",
    Executioner => "executioner",
    Buffer => "buffer",
    Debuffer => "debuffer",
    Teleport => "teleport",
    Blackhole => "blackhole",
    Confuse => "confuse",
    PoisonCloud => "poison_cloud",
    HeavyWood => "heavy_wood",
    HeavyStone => "heavy_stone",
    Alloy => "alloy",
    GemCore => "gem_core",
    ObsidianWall => "obsidian_wall",
    CrystalSpire => "crystal_spire",
    King => "king",
    Queen => "queen",
    Void => "void",
    Sun => "sun",
    Moon => "moon",
    FireIce => "fire_ice",
    PoisonStone => "poison_stone",
    GoldDiamond => "gold_diamond",
    ObsidianGold => "obsidian_gold",
    Ultimate => "ultimate",
    Omega => "omega",
    Alpha => "alpha",
    Chaos => "chaos",
    Order => "order",
    Aoe => "aoe",
    Luxe => "luxe",
    Multicolor => "multicolor",
    GoldMini => "gold_mini",
    GoldCanon => "gold_canon",
}

/// How a turret's damage is derived from its target DPS.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DamageRule {
    /// `target_dps × fire_rate × factor`.
    PerShot(f64),
    /// `target_dps × factor`, independent of the fire rate.
    PerSecond(f64),
    /// A constant.
    Fixed(f64),
}

/// Static stats of a turret kind.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TurretProfile {
    /// Targeting range.
    pub range: f64,
    /// Seconds between shots.
    pub fire_rate: f64,
    /// Damage derivation.
    pub damage: DamageRule,
    /// On-hit element.
    pub element: Option<Element>,
    /// Display color.
    pub color: Color,
}

/// Targeting and delivery behaviour.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FiringMode {
    /// Damage every enemy in range at once.
    Area,
    /// Hit the nearest enemy and chain to two more.
    Chain,
    /// Fan of unguided pellets.
    Spread,
    /// One fast piercing slug.
    Pierce,
    /// Push the nearest enemy away, no damage.
    Displace,
    /// One homing projectile.
    Homing {
        /// Projectile speed.
        speed: f64,
        /// What happens on arrival.
        payload: Payload,
    },
}

impl TurretKind {
    /// Stat row for this kind.
    #[must_use]
    pub const fn profile(self) -> TurretProfile {
        use DamageRule::{Fixed, PerSecond, PerShot};
        use Element::{Fire, Ice, Poison};

        let standard = PerShot(1.0);
        let (range, fire_rate, damage, element, color) = match self {
            TurretKind::Basic => (DEFAULT_RANGE, 1.0, Fixed(BASE_DPS), None, 0x9b_59_b6),
            TurretKind::Wood => (DEFAULT_RANGE, 0.3, standard, None, 0xa0_7f_70),
            TurretKind::Stone => (DEFAULT_RANGE, 2.0, standard, None, 0x95_a5_a6),
            TurretKind::Aoe => (150.0, 2.0, PerShot(0.8), None, 0xe7_4c_3c),
            TurretKind::Iron => (DEFAULT_RANGE, 0.5, standard, None, 0x7f_8c_8d),
            TurretKind::Gold => (DEFAULT_RANGE, 0.8, standard, None, 0xff_d7_00),
            TurretKind::Crystal => (DEFAULT_RANGE, 0.75, standard, None, 0x9b_59_b6),
            TurretKind::Obsidian => (DEFAULT_RANGE, 1.0, standard, None, 0x2c_3e_50),
            TurretKind::Diamond => (300.0, 0.8, standard, None, 0x34_98_db),
            TurretKind::Emerald => (DEFAULT_RANGE, 1.0, standard, Some(Poison), 0x27_ae_60),
            TurretKind::Ruby => (DEFAULT_RANGE, 0.75, standard, Some(Fire), 0xc0_39_2b),
            TurretKind::Sapphire => (DEFAULT_RANGE, 1.2, standard, Some(Ice), 0x29_80_b9),

            TurretKind::Sniper => (600.0, 3.0, standard, None, 0x2c_3e_50),
            TurretKind::Gatling => (150.0, 0.1, standard, None, 0x7f_8c_8d),
            TurretKind::Shotgun => (150.0, 1.5, standard, None, 0x95_a5_a6),
            TurretKind::Flamethrower => (100.0, 0.05, standard, Some(Fire), 0xe7_4c_3c),
            TurretKind::Tesla => (DEFAULT_RANGE, 0.5, standard, None, 0x34_98_db),
            TurretKind::Laser => (400.0, 2.0, standard, None, 0xe7_4c_3c),
            TurretKind::Mortar => (400.0, 3.0, standard, None, 0x2c_3e_50),
            TurretKind::Missile => (500.0, 2.5, standard, None, 0x44_44_44),
            TurretKind::Railgun => (800.0, 4.0, standard, None, 0x8e_44_ad),

            TurretKind::Money => (DEFAULT_RANGE, 1.0, PerSecond(0.5), None, 0xf1_c4_0f),
            TurretKind::Pushback => (DEFAULT_RANGE, 1.0, Fixed(5.0), None, 0xec_f0_f1),
            TurretKind::SlowField => (200.0, 0.5, Fixed(2.0), Some(Ice), 0x34_98_db),
            TurretKind::Executioner => (DEFAULT_RANGE, 2.0, standard, None, 0x00_00_00),
            TurretKind::Teleport => (DEFAULT_RANGE, 5.0, Fixed(0.0), None, 0x9b_59_b6),
            TurretKind::PoisonCloud => (150.0, 2.0, standard, Some(Poison), 0x2e_cc_71),

            TurretKind::HeavyWood => (DEFAULT_RANGE, 0.4, standard, None, 0x8d_6e_63),
            TurretKind::HeavyStone => (DEFAULT_RANGE, 2.5, standard, None, 0x7f_8c_8d),
            TurretKind::Alloy => (DEFAULT_RANGE, 0.6, standard, None, 0xbd_c3_c7),
            TurretKind::GemCore => (DEFAULT_RANGE, 0.5, standard, None, 0xe6_7e_22),
            TurretKind::ObsidianWall => (DEFAULT_RANGE, 1.0, PerSecond(2.0), None, 0x00_00_00),
            TurretKind::CrystalSpire => (DEFAULT_RANGE, 0.2, standard, None, 0x9b_59_b6),

            TurretKind::King => (250.0, 1.0, standard, None, 0xf1_c4_0f),
            TurretKind::Queen => (250.0, 0.5, standard, None, 0xe7_4c_3c),
            TurretKind::Void => (300.0, 1.5, standard, None, 0x00_00_00),
            TurretKind::Sun => (300.0, 0.2, standard, Some(Fire), 0xf3_9c_12),
            TurretKind::Moon => (300.0, 1.0, standard, Some(Ice), 0xbd_c3_c7),

            TurretKind::FireIce => (DEFAULT_RANGE, 0.8, standard, None, 0x8e_44_ad),
            TurretKind::PoisonStone => (DEFAULT_RANGE, 1.5, standard, Some(Poison), 0x27_ae_60),

            TurretKind::Ultimate => (400.0, 0.1, standard, None, 0xff_ff_ff),
            TurretKind::Omega => (1000.0, 5.0, standard, None, 0x00_00_00),
            TurretKind::Alpha => (500.0, 0.05, standard, None, 0xff_ff_ff),
            TurretKind::Chaos => (300.0, 0.5, standard, None, 0xff_00_ff),

            TurretKind::GoldMini => (150.0, 0.4, standard, None, 0xff_d7_00),
            TurretKind::GoldCanon => (500.0, 3.0, standard, None, 0xff_d7_00),

            TurretKind::Buffer
            | TurretKind::Debuffer
            | TurretKind::Blackhole
            | TurretKind::Confuse
            | TurretKind::GoldDiamond
            | TurretKind::ObsidianGold
            | TurretKind::Order
            | TurretKind::Luxe
            | TurretKind::Multicolor => (DEFAULT_RANGE, 1.0, standard, None, 0x9b_59_b6),
        };
        TurretProfile {
            range,
            fire_rate,
            damage,
            element,
            color: Color(color),
        }
    }

    /// Firing behaviour for this kind.
    #[must_use]
    pub const fn firing_mode(self) -> FiringMode {
        match self {
            TurretKind::Aoe | TurretKind::PoisonCloud | TurretKind::SlowField => FiringMode::Area,
            TurretKind::Tesla => FiringMode::Chain,
            TurretKind::Shotgun => FiringMode::Spread,
            TurretKind::Railgun => FiringMode::Pierce,
            TurretKind::Teleport => FiringMode::Displace,
            TurretKind::Sniper => FiringMode::Homing {
                speed: 1500.0,
                payload: Payload::Bullet,
            },
            TurretKind::Missile | TurretKind::Mortar => FiringMode::Homing {
                speed: 800.0,
                payload: Payload::Missile,
            },
            _ => FiringMode::Homing {
                speed: 800.0,
                payload: Payload::Bullet,
            },
        }
    }

    /// Whether kills by this turret drop a bonus resource.
    #[must_use]
    pub const fn drops_loot(self) -> bool {
        matches!(self, TurretKind::Money)
    }

    /// Id of the recipe that builds this kind.
    #[must_use]
    pub fn recipe_id(self) -> String {
        format!("turret_{}", self.name())
    }
}

/// Turret state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turret {
    /// Subtype.
    pub kind: TurretKind,
    /// Targeting range.
    pub range: f64,
    /// Seconds between shots.
    pub fire_rate: f64,
    /// Damage per shot.
    pub damage: f64,
    /// On-hit element.
    pub element: Option<Element>,
    /// Seconds until the next shot.
    pub cooldown: f64,
    /// Enemies killed by this turret.
    pub kill_count: u32,
    /// Remaining paralysis; blocks firing while positive.
    pub paralyzed: f64,
}

impl Turret {
    /// Turret of `kind` with damage balanced from its recipe.
    #[must_use]
    pub fn new(kind: TurretKind, recipes: &RecipeBook) -> Self {
        let profile = kind.profile();
        let target_dps = recipes.target_dps(kind);
        let damage = match profile.damage {
            DamageRule::PerShot(factor) => target_dps * profile.fire_rate * factor,
            DamageRule::PerSecond(factor) => target_dps * factor,
            DamageRule::Fixed(value) => value,
        };
        Self {
            kind,
            range: profile.range,
            fire_rate: profile.fire_rate,
            damage,
            element: profile.element,
            cooldown: 0.0,
            kill_count: 0,
            paralyzed: 0.0,
        }
    }

    /// Turret entity at `position`.
    #[must_use]
    pub fn spawn(kind: TurretKind, position: DVec2, recipes: &RecipeBook) -> Entity {
        Entity::new(
            position,
            TURRET_RADIUS,
            kind.profile().color,
            EntityBody::Turret(Self::new(kind, recipes)),
        )
    }

    /// Block firing for `seconds`.
    pub fn paralyze(&mut self, seconds: f64) {
        self.paralyzed = seconds;
    }

    /// Whether firing is currently blocked.
    #[must_use]
    pub fn is_paralyzed(&self) -> bool {
        self.paralyzed > 0.0
    }

    pub(crate) fn update(
        &mut self,
        core: &mut EntityCore,
        others: &mut Neighbors<'_>,
        ctx: &mut TickContext<'_>,
    ) {
        if self.paralyzed > 0.0 {
            self.paralyzed -= ctx.dt;
            return;
        }
        if self.cooldown > 0.0 {
            self.cooldown -= ctx.dt;
        }
        if self.cooldown > 0.0 {
            return;
        }

        let fired = match self.kind.firing_mode() {
            FiringMode::Area => self.fire_area(core, others, ctx),
            FiringMode::Chain => self.fire_chain(core, others, ctx),
            FiringMode::Spread => self.fire_spread(core, others, ctx),
            FiringMode::Pierce => self.fire_pierce(core, others, ctx),
            FiringMode::Displace => self.displace(core, others, ctx),
            FiringMode::Homing { speed, payload } => {
                self.fire_homing(core, others, ctx, speed, payload)
            }
        };
        if fired {
            self.cooldown = self.fire_rate;
        }
    }

    fn hit(
        &mut self,
        core: &EntityCore,
        target: EntityId,
        amount: f64,
        element: Option<Element>,
        others: &mut Neighbors<'_>,
        ctx: &mut TickContext<'_>,
    ) {
        let outcome = strike(others, target, amount, Some(core.id), element, ctx);
        if outcome.is_some_and(|o| o.killed) {
            self.kill_count += 1;
        }
    }

    fn fire_area(
        &mut self,
        core: &EntityCore,
        others: &mut Neighbors<'_>,
        ctx: &mut TickContext<'_>,
    ) -> bool {
        let targets = enemies_within(others, &ctx.index.enemies, core.position, self.range);
        for &id in &targets {
            self.hit(core, id, self.damage, self.element, others, ctx);
        }
        !targets.is_empty()
    }

    fn fire_chain(
        &mut self,
        core: &EntityCore,
        others: &mut Neighbors<'_>,
        ctx: &mut TickContext<'_>,
    ) -> bool {
        let Some(first) = nearest_enemy(others, &ctx.index.enemies, core.position, self.range, &[])
        else {
            return false;
        };
        self.hit(core, first.id, self.damage, self.element, others, ctx);

        let mut chained = vec![first.id];
        let mut link = first.position;
        for _ in 0..CHAIN_HOPS {
            let Some(next) = nearest_enemy(others, &ctx.index.enemies, link, CHAIN_RANGE, &chained)
            else {
                break;
            };
            self.hit(core, next.id, self.damage * CHAIN_FALLOFF, None, others, ctx);
            chained.push(next.id);
            link = next.position;
        }
        true
    }

    fn fire_spread(
        &mut self,
        core: &EntityCore,
        others: &mut Neighbors<'_>,
        ctx: &mut TickContext<'_>,
    ) -> bool {
        let Some(target) = nearest_enemy(others, &ctx.index.enemies, core.position, self.range, &[])
        else {
            return false;
        };
        let angle = bearing(core.position, target.position);
        let half = SPREAD_PELLETS / 2;
        for i in -half..=half {
            let pellet = Projectile::new(self.damage, 600.0, Some(core.id))
                .with_element(self.element)
                .aimed(angle + f64::from(i) * SPREAD_STEP);
            ctx.spawns.push(pellet.spawn(core.position, core.color));
        }
        true
    }

    fn fire_pierce(
        &mut self,
        core: &EntityCore,
        others: &mut Neighbors<'_>,
        ctx: &mut TickContext<'_>,
    ) -> bool {
        let Some(target) = nearest_enemy(others, &ctx.index.enemies, core.position, self.range, &[])
        else {
            return false;
        };
        let slug = Projectile::new(self.damage, 2000.0, Some(core.id))
            .with_element(self.element)
            .piercing()
            .aimed(bearing(core.position, target.position));
        ctx.spawns.push(slug.spawn(core.position, Color(0x00_ff_ff)));
        true
    }

    fn displace(
        &mut self,
        core: &EntityCore,
        others: &mut Neighbors<'_>,
        ctx: &TickContext<'_>,
    ) -> bool {
        let Some(target) = nearest_enemy(others, &ctx.index.enemies, core.position, self.range, &[])
        else {
            return false;
        };
        if let Some(enemy) = others.get_mut(target.id) {
            let angle = bearing(core.position, enemy.core.position);
            enemy.core.position += polar(angle, DISPLACE_DISTANCE);
        }
        true
    }

    fn fire_homing(
        &mut self,
        core: &EntityCore,
        others: &mut Neighbors<'_>,
        ctx: &mut TickContext<'_>,
        speed: f64,
        payload: Payload,
    ) -> bool {
        let Some(target) = nearest_enemy(others, &ctx.index.enemies, core.position, self.range, &[])
        else {
            return false;
        };
        let shot = Projectile::new(self.damage, speed, Some(core.id))
            .with_element(self.element)
            .with_payload(payload)
            .homing(target.id, core.position, target.position);
        ctx.spawns.push(shot.spawn(core.position, core.color));
        true
    }
}
