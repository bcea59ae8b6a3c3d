//! Build recipes and craft difficulty.
//!
//! Every placeable thing (turret, building, seed) has a recipe with a
//! material cost. The recipe's craft difficulty is computed once when the
//! book is built and drives turret damage balancing.
//!
//! # Example
//!
//! ```
//! use village_core::config::SimConfig;
//! use village_core::recipes::RecipeBook;
//!
//! let book = RecipeBook::new(&SimConfig::default());
//! let basic = book.get("turret_basic").unwrap();
//! assert_eq!(basic.craft_difficulty, book.basic_difficulty());
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::building::{Building, BuildingKind};
use crate::config::SimConfig;
use crate::economy::{Inventory, Material, ResourceKind};
use crate::entity::Entity;
use crate::error::{GameError, Result};
use crate::math::DVec2;
use crate::resource::Seed;
use crate::turret::{Turret, TurretKind, BASE_DPS};

/// Id of the recipe every turret is balanced against.
pub const BASIC_TURRET: &str = "turret_basic";

/// What a recipe places.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BuildOutput {
    /// A turret.
    Turret(TurretKind),
    /// A production, buff or defensive building.
    Building(BuildingKind),
    /// A seed growing into resources of the given kind.
    Seed(ResourceKind),
}

impl BuildOutput {
    /// Entity for this output at `position`.
    #[must_use]
    pub fn spawn(self, position: DVec2, recipes: &RecipeBook, config: &SimConfig) -> Entity {
        match self {
            BuildOutput::Turret(kind) => Turret::spawn(kind, position, recipes),
            BuildOutput::Building(kind) => Building::spawn(kind, position, config),
            BuildOutput::Seed(kind) => Seed::spawn(position, kind, config.seed_growth_time),
        }
    }

    /// Category label.
    #[must_use]
    pub const fn category(self) -> &'static str {
        match self {
            BuildOutput::Turret(_) => "turret",
            BuildOutput::Building(_) => "building",
            BuildOutput::Seed(_) => "seed",
        }
    }
}

/// A build recipe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    /// Unique id, e.g. `turret_tesla`.
    pub id: String,
    /// What gets placed.
    pub output: BuildOutput,
    /// Materials consumed.
    pub cost: Inventory,
    /// Human-readable summary.
    pub description: String,
    /// Balance score derived from the cost.
    pub craft_difficulty: f64,
}

/// Craft difficulty of a cost: `Σ(rarity × amount) × (0.9 + unique/10)^1.1`.
///
/// An empty cost has difficulty 1.
#[must_use]
pub fn craft_difficulty(cost: &Inventory, config: &SimConfig) -> f64 {
    if cost.is_empty() {
        return 1.0;
    }
    let weighted: f64 = cost
        .iter()
        .map(|(material, amount)| config.rarity(material) * f64::from(amount))
        .sum();
    let unique = cost.distinct() as f64;
    weighted * (0.9 + unique / 10.0).powf(1.1)
}

/// Every recipe, keyed by id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeBook {
    recipes: BTreeMap<String, Recipe>,
    basic_difficulty: f64,
}

impl RecipeBook {
    /// Build the standard recipe set, scoring costs with `config`'s rarities.
    #[must_use]
    pub fn new(config: &SimConfig) -> Self {
        let recipes: BTreeMap<String, Recipe> = builtin()
            .into_iter()
            .map(|(id, output, cost, description)| {
                let cost = Inventory::from_pairs(cost);
                let recipe = Recipe {
                    id: id.clone(),
                    output,
                    craft_difficulty: craft_difficulty(&cost, config),
                    cost,
                    description: description.to_string(),
                };
                (id, recipe)
            })
            .collect();
        let basic_difficulty = recipes
            .get(BASIC_TURRET)
            .map_or(1.0, |r| r.craft_difficulty);
        Self {
            recipes,
            basic_difficulty,
        }
    }

    /// Look up a recipe.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Recipe> {
        self.recipes.get(id)
    }

    /// Look up a recipe that must exist.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::UnknownRecipe`] if there is no such recipe.
    pub fn require(&self, id: &str) -> Result<&Recipe> {
        self.get(id)
            .ok_or_else(|| GameError::UnknownRecipe(id.to_string()))
    }

    /// All recipes in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Recipe> {
        self.recipes.values()
    }

    /// Number of recipes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.recipes.len()
    }

    /// Whether the book is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.recipes.is_empty()
    }

    /// Difficulty of the basic turret.
    #[must_use]
    pub fn basic_difficulty(&self) -> f64 {
        self.basic_difficulty
    }

    /// Target damage per second for a turret kind.
    ///
    /// Kinds without a recipe are balanced like the basic turret.
    #[must_use]
    pub fn target_dps(&self, kind: TurretKind) -> f64 {
        let difficulty = self
            .get(&kind.recipe_id())
            .map_or(self.basic_difficulty, |r| r.craft_difficulty);
        difficulty / self.basic_difficulty * BASE_DPS
    }
}

type RecipeRow = (String, BuildOutput, &'static [(Material, u32)], &'static str);

fn turret(kind: TurretKind, cost: &'static [(Material, u32)], description: &'static str) -> RecipeRow {
    (kind.recipe_id(), BuildOutput::Turret(kind), cost, description)
}

fn building(
    kind: BuildingKind,
    cost: &'static [(Material, u32)],
    description: &'static str,
) -> RecipeRow {
    (kind.name().to_string(), BuildOutput::Building(kind), cost, description)
}

fn seed(kind: ResourceKind, cost: &'static [(Material, u32)], description: &'static str) -> RecipeRow {
    (
        format!("seed_{}", kind_slug(kind)),
        BuildOutput::Seed(kind),
        cost,
        description,
    )
}

const fn kind_slug(kind: ResourceKind) -> &'static str {
    match kind {
        ResourceKind::Tree => "tree",
        ResourceKind::Rock => "rock",
        ResourceKind::Iron => "iron",
        ResourceKind::Crystal => "crystal",
        ResourceKind::Obsidian => "obsidian",
        ResourceKind::Diamond => "diamond",
        ResourceKind::Emerald => "emerald",
        ResourceKind::Ruby => "ruby",
        ResourceKind::Sapphire => "sapphire",
    }
}

#[allow(clippy::too_many_lines)]
fn builtin() -> Vec<RecipeRow> {
    use BuildingKind as B;
    use Material::{Crystal, Diamond, Emerald, Gold, Iron, Obsidian, Ruby, Sapphire, Stone, Wood};
    use TurretKind as T;

    vec![
        turret(T::Basic, &[(Wood, 10), (Stone, 10)], "Basic defense turret."),
        turret(T::Wood, &[(Wood, 20)], "Fast firing wooden turret."),
        turret(T::Iron, &[(Iron, 10)], "Strong iron turret."),
        turret(T::Gold, &[(Gold, 10)], "A solid gold turret."),
        turret(T::Crystal, &[(Crystal, 10)], "High damage crystal turret."),
        turret(T::Obsidian, &[(Obsidian, 10)], "Very heavy damage."),
        turret(T::Diamond, &[(Diamond, 10)], "Long range, high damage."),
        turret(T::Emerald, &[(Emerald, 10)], "Poison effect."),
        turret(T::Ruby, &[(Ruby, 10)], "Fire effect."),
        turret(T::Sapphire, &[(Sapphire, 10)], "Ice/Freeze effect."),
        turret(T::Sniper, &[(Wood, 50), (Iron, 20)], "Extreme range, slow fire."),
        turret(T::Gatling, &[(Iron, 50), (Gold, 5)], "Very fast fire rate, low damage."),
        turret(T::Shotgun, &[(Stone, 50), (Iron, 10)], "Fires multiple projectiles."),
        turret(T::Flamethrower, &[(Iron, 30), (Ruby, 5)], "Short range, continuous fire damage."),
        turret(T::Tesla, &[(Iron, 30), (Sapphire, 5)], "Chains damage to nearby enemies."),
        turret(T::Laser, &[(Crystal, 20), (Diamond, 5)], "Instant hit beam."),
        turret(T::Mortar, &[(Stone, 50), (Obsidian, 10)], "Lobbed explosive shells."),
        turret(T::Missile, &[(Iron, 50), (Obsidian, 20)], "Homing missiles."),
        turret(T::Railgun, &[(Obsidian, 50), (Diamond, 10)], "Pierces through enemies."),
        turret(T::Money, &[(Gold, 50)], "Drops resources on kill."),
        turret(T::Pushback, &[(Wood, 100), (Iron, 10)], "Knocks enemies back."),
        turret(T::SlowField, &[(Sapphire, 20), (Crystal, 20)], "Slows all enemies in range."),
        turret(T::Executioner, &[(Obsidian, 50), (Ruby, 20)], "Heavy single shots."),
        turret(T::Buffer, &[(Gold, 20), (Crystal, 20)], "Gilded crystal turret."),
        turret(T::Debuffer, &[(Emerald, 20), (Obsidian, 10)], "Dark emerald turret."),
        turret(T::Teleport, &[(Crystal, 50), (Diamond, 10)], "Pushes enemies far away."),
        turret(T::Blackhole, &[(Obsidian, 100), (Diamond, 50)], "Dense void turret."),
        turret(T::Confuse, &[(Emerald, 30), (Sapphire, 30)], "Twin gem turret."),
        turret(T::PoisonCloud, &[(Emerald, 50)], "Poisons every enemy in range."),
        turret(T::HeavyWood, &[(Wood, 100)], "Reinforced wooden turret."),
        turret(T::HeavyStone, &[(Stone, 100)], "Reinforced stone turret."),
        turret(T::Alloy, &[(Iron, 50), (Stone, 50)], "Durable alloy turret."),
        turret(
            T::GemCore,
            &[(Diamond, 10), (Ruby, 10), (Sapphire, 10), (Emerald, 10)],
            "Multi-gem core.",
        ),
        turret(T::ObsidianWall, &[(Obsidian, 50)], "Slow, crushing shots."),
        turret(T::CrystalSpire, &[(Crystal, 50)], "Rapid fire crystal shards."),
        turret(T::King, &[(Gold, 100), (Diamond, 20)], "Royal defense."),
        turret(T::Queen, &[(Gold, 100), (Ruby, 20)], "Royal offense."),
        turret(T::Void, &[(Obsidian, 100), (Diamond, 100)], "Harnesses void energy."),
        turret(T::Sun, &[(Gold, 200), (Ruby, 50)], "Burns everything."),
        turret(T::Moon, &[(Iron, 200), (Sapphire, 50)], "Freezes everything."),
        turret(T::FireIce, &[(Ruby, 25), (Sapphire, 25)], "Thermal shock damage."),
        turret(T::PoisonStone, &[(Emerald, 25), (Stone, 100)], "Poisonous projectiles."),
        turret(T::GoldDiamond, &[(Gold, 50), (Diamond, 50)], "Precious metal destruction."),
        turret(T::ObsidianGold, &[(Obsidian, 50), (Gold, 50)], "Dark wealth."),
        turret(
            T::Ultimate,
            &[(Diamond, 50), (Emerald, 50), (Ruby, 50), (Sapphire, 50), (Obsidian, 100)],
            "The ultimate defense.",
        ),
        turret(
            T::Omega,
            &[(Wood, 1000), (Stone, 1000), (Gold, 100), (Diamond, 100)],
            "Endgame destruction.",
        ),
        turret(
            T::Alpha,
            &[(Iron, 500), (Crystal, 500), (Obsidian, 500)],
            "The beginning of the end.",
        ),
        turret(T::Chaos, &[(Ruby, 100), (Emerald, 100), (Sapphire, 100)], "Triple gem barrage."),
        turret(T::Order, &[(Diamond, 100), (Gold, 100)], "Perfect accuracy."),
        turret(T::Aoe, &[(Wood, 10), (Stone, 10), (Iron, 10)], "Area of effect damage."),
        turret(T::Luxe, &[(Wood, 20), (Stone, 20), (Gold, 1)], "A turret with gold accents."),
        turret(
            T::Multicolor,
            &[(Diamond, 2), (Emerald, 2), (Sapphire, 2), (Ruby, 2)],
            "A vibrant turret using multiple gems.",
        ),
        turret(T::GoldMini, &[(Gold, 5)], "A small golden turret."),
        turret(T::GoldCanon, &[(Gold, 20)], "A massive golden canon with extreme range."),
        building(B::WoodGen, &[(Wood, 1), (Stone, 20)], "Generates wood over time."),
        building(B::StoneGen, &[(Stone, 10)], "Generates stone over time."),
        building(B::IronGen, &[(Stone, 20), (Iron, 1)], "Generates iron over time."),
        building(B::CrystalGen, &[(Stone, 20), (Crystal, 1)], "Generates crystal over time."),
        building(B::ObsidianGen, &[(Stone, 20), (Obsidian, 1)], "Generates obsidian over time."),
        building(B::DiamondGen, &[(Stone, 20), (Diamond, 1)], "Generates diamond over time."),
        building(B::EmeraldGen, &[(Stone, 20), (Emerald, 1)], "Generates emerald over time."),
        building(B::RubyGen, &[(Stone, 20), (Ruby, 1)], "Generates ruby over time."),
        building(B::SapphireGen, &[(Stone, 20), (Sapphire, 1)], "Generates sapphire over time."),
        building(B::WoodCol, &[(Wood, 30), (Stone, 10)], "A worker gathers nearby trees."),
        building(B::StoneCol, &[(Wood, 10), (Stone, 30)], "A worker gathers nearby rocks."),
        building(B::IronCol, &[(Stone, 30), (Iron, 10)], "A worker gathers nearby iron."),
        building(
            B::UniversalCol,
            &[(Wood, 50), (Stone, 50), (Iron, 20)],
            "A worker gathers any nearby resource.",
        ),
        building(B::CollectorNovice, &[(Wood, 15)], "A slow worker carrying one item at a time."),
        building(B::Alchemy, &[(Wood, 50), (Stone, 50)], "Transmutes time into gold."),
        building(B::MegaWall, &[(Stone, 500), (Obsidian, 200)], "Massive defensive wall."),
        building(
            B::MegaFort,
            &[(Stone, 1000), (Obsidian, 500), (Iron, 500)],
            "Heavily armed fortress.",
        ),
        building(B::BuffAttack1, &[(Stone, 50), (Iron, 10)], "Player attack ×1.5 nearby."),
        building(B::BuffAttack2, &[(Iron, 50), (Crystal, 20)], "Player attack ×2 nearby."),
        building(B::BuffAttack3, &[(Obsidian, 50), (Diamond, 10)], "Player attack ×3 nearby."),
        building(B::BuffSpeed1, &[(Wood, 50), (Stone, 20)], "Player speed ×1.5 nearby."),
        building(B::BuffSpeed2, &[(Iron, 30), (Crystal, 20)], "Player speed ×2 nearby."),
        building(B::BuffSpeed3, &[(Crystal, 50), (Sapphire, 10)], "Player speed ×2.5 nearby."),
        seed(ResourceKind::Tree, &[(Wood, 10)], "Grows into five trees."),
        seed(ResourceKind::Rock, &[(Stone, 10)], "Grows into five rocks."),
        seed(ResourceKind::Iron, &[(Stone, 20), (Iron, 5)], "Grows into five iron nodes."),
        seed(ResourceKind::Crystal, &[(Stone, 20), (Crystal, 5)], "Grows into five crystals."),
        seed(ResourceKind::Obsidian, &[(Stone, 30), (Obsidian, 5)], "Grows into five obsidian nodes."),
        seed(ResourceKind::Diamond, &[(Stone, 50), (Diamond, 3)], "Grows into five diamonds."),
        seed(ResourceKind::Emerald, &[(Stone, 50), (Emerald, 3)], "Grows into five emeralds."),
        seed(ResourceKind::Ruby, &[(Stone, 50), (Ruby, 3)], "Grows into five rubies."),
        seed(ResourceKind::Sapphire, &[(Stone, 50), (Sapphire, 3)], "Grows into five sapphires."),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_craft_difficulty_formula() {
        let config = SimConfig::default();
        let cost = Inventory::from_pairs(&[(Material::Wood, 10), (Material::Stone, 10)]);
        let expected = 20.0 * 1.1f64.powf(1.1);
        assert!((craft_difficulty(&cost, &config) - expected).abs() < 1e-9);
    }

    #[test]
    fn test_empty_cost_difficulty() {
        assert_eq!(craft_difficulty(&Inventory::new(), &SimConfig::default()), 1.0);
    }

    #[test]
    fn test_rarity_drives_difficulty() {
        let config = SimConfig::default();
        let gold = Inventory::from_pairs(&[(Material::Gold, 10)]);
        let wood = Inventory::from_pairs(&[(Material::Wood, 10)]);
        assert!(craft_difficulty(&gold, &config) > craft_difficulty(&wood, &config) * 10.0);
    }

    #[test]
    fn test_require_unknown() {
        let book = RecipeBook::new(&SimConfig::default());
        assert!(matches!(
            book.require("turret_banana"),
            Err(GameError::UnknownRecipe(id)) if id == "turret_banana"
        ));
    }

    #[test]
    fn test_every_turret_recipe_resolves() {
        let book = RecipeBook::new(&SimConfig::default());
        for recipe in book.iter() {
            if let BuildOutput::Turret(kind) = recipe.output {
                assert_eq!(recipe.id, kind.recipe_id());
            }
        }
        assert!(book.get("seed_tree").is_some());
        assert!(book.get("mega_fort").is_some());
        assert!(book.get("buff_speed_3").is_some());
    }

    #[test]
    fn test_target_dps_relative_to_basic() {
        let book = RecipeBook::new(&SimConfig::default());
        assert!((book.target_dps(TurretKind::Basic) - BASE_DPS).abs() < 1e-9);
        assert!(book.target_dps(TurretKind::Omega) > book.target_dps(TurretKind::Wood));
    }
}
