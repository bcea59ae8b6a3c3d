//! Materials, harvestable resource kinds and the player inventory.
//!
//! All amounts are whole units. Costs, yields and worker deposits are
//! integer arithmetic on [`Inventory`].

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{GameError, Result};

/// A stockpiled material.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Material {
    /// Harvested from trees.
    Wood,
    /// Harvested from rocks.
    Stone,
    /// Only produced by alchemy and money drops.
    Gold,
    /// Ore.
    Iron,
    /// Ore.
    Crystal,
    /// Ore.
    Obsidian,
    /// Gem.
    Diamond,
    /// Gem.
    Emerald,
    /// Gem.
    Ruby,
    /// Gem.
    Sapphire,
}

impl Material {
    /// Every material in inventory display order.
    pub const ALL: [Material; 10] = [
        Material::Wood,
        Material::Stone,
        Material::Gold,
        Material::Iron,
        Material::Crystal,
        Material::Obsidian,
        Material::Diamond,
        Material::Emerald,
        Material::Ruby,
        Material::Sapphire,
    ];

    /// Default rarity score used by craft difficulty.
    #[must_use]
    pub const fn default_rarity(self) -> f64 {
        match self {
            Material::Wood | Material::Stone => 1.0,
            Material::Iron => 3.5,
            Material::Crystal => 4.5,
            Material::Obsidian => 5.0,
            Material::Gold => 15.0,
            Material::Emerald => 7.0,
            Material::Ruby => 8.0,
            Material::Sapphire => 8.5,
            Material::Diamond => 9.0,
        }
    }

    /// Lowercase name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Material::Wood => "wood",
            Material::Stone => "stone",
            Material::Gold => "gold",
            Material::Iron => "iron",
            Material::Crystal => "crystal",
            Material::Obsidian => "obsidian",
            Material::Diamond => "diamond",
            Material::Emerald => "emerald",
            Material::Ruby => "ruby",
            Material::Sapphire => "sapphire",
        }
    }
}

impl fmt::Display for Material {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Kind of a harvestable resource node on the map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// Yields wood.
    Tree,
    /// Yields stone.
    Rock,
    /// Ore node.
    Iron,
    /// Ore node.
    Crystal,
    /// Ore node.
    Obsidian,
    /// Gem node.
    Diamond,
    /// Gem node.
    Emerald,
    /// Gem node.
    Ruby,
    /// Gem node.
    Sapphire,
}

impl ResourceKind {
    /// Material granted when this resource is harvested.
    #[must_use]
    pub const fn material(self) -> Material {
        match self {
            ResourceKind::Tree => Material::Wood,
            ResourceKind::Rock => Material::Stone,
            ResourceKind::Iron => Material::Iron,
            ResourceKind::Crystal => Material::Crystal,
            ResourceKind::Obsidian => Material::Obsidian,
            ResourceKind::Diamond => Material::Diamond,
            ResourceKind::Emerald => Material::Emerald,
            ResourceKind::Ruby => Material::Ruby,
            ResourceKind::Sapphire => Material::Sapphire,
        }
    }

    /// Amount granted to the player when the node is broken by hand or by a turret.
    #[must_use]
    pub const fn death_yield(self) -> u32 {
        match self {
            ResourceKind::Tree | ResourceKind::Rock => 5,
            ResourceKind::Iron | ResourceKind::Crystal | ResourceKind::Obsidian => 2,
            ResourceKind::Diamond
            | ResourceKind::Emerald
            | ResourceKind::Ruby
            | ResourceKind::Sapphire => 1,
        }
    }

    /// Display color (`0xRRGGBB`).
    #[must_use]
    pub const fn color(self) -> u32 {
        match self {
            ResourceKind::Tree => 0x2e_cc_71,
            ResourceKind::Rock => 0x95_a5_a6,
            ResourceKind::Iron => 0x7f_8c_8d,
            ResourceKind::Crystal => 0x9b_59_b6,
            ResourceKind::Obsidian => 0x2c_3e_50,
            ResourceKind::Diamond => 0x34_98_db,
            ResourceKind::Emerald => 0x27_ae_60,
            ResourceKind::Ruby => 0xc0_39_2b,
            ResourceKind::Sapphire => 0x29_80_b9,
        }
    }

    /// Pick the kind of an ambient resource spawn from a uniform `roll`.
    ///
    /// Rarer kinds unlock as the wave counter grows; later thresholds
    /// override earlier ones.
    #[must_use]
    pub fn for_ambient_spawn(roll: f64, wave: u32) -> Self {
        let mut kind = ResourceKind::Tree;
        if roll > 0.4 {
            kind = ResourceKind::Rock;
        }
        if wave >= 2 && roll > 0.7 {
            kind = ResourceKind::Iron;
        }
        if wave >= 3 && roll > 0.8 {
            kind = ResourceKind::Crystal;
        }
        if wave >= 4 && roll > 0.85 {
            kind = ResourceKind::Obsidian;
        }
        if wave >= 5 {
            if roll > 0.98 {
                kind = ResourceKind::Sapphire;
            } else if roll > 0.96 {
                kind = ResourceKind::Ruby;
            } else if roll > 0.93 {
                kind = ResourceKind::Emerald;
            } else if roll > 0.9 {
                kind = ResourceKind::Diamond;
            }
        }
        kind
    }
}

/// Material amounts keyed by [`Material`].
///
/// Used for the player stockpile, recipe costs and per-kind worker loads.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inventory {
    amounts: BTreeMap<Material, u32>,
}

impl Inventory {
    /// Create an empty inventory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an inventory from `(material, amount)` pairs.
    #[must_use]
    pub fn from_pairs(pairs: &[(Material, u32)]) -> Self {
        let mut inventory = Self::new();
        for &(material, amount) in pairs {
            inventory.add(material, amount);
        }
        inventory
    }

    /// Amount held of `material`.
    #[must_use]
    pub fn get(&self, material: Material) -> u32 {
        self.amounts.get(&material).copied().unwrap_or(0)
    }

    /// Add `amount` of `material`.
    pub fn add(&mut self, material: Material, amount: u32) {
        if amount == 0 {
            return;
        }
        *self.amounts.entry(material).or_insert(0) += amount;
    }

    /// Add every amount of `other`.
    pub fn add_all(&mut self, other: &Inventory) {
        for (material, amount) in other.iter() {
            self.add(material, amount);
        }
    }

    /// Whether every amount in `cost` is covered.
    #[must_use]
    pub fn can_afford(&self, cost: &Inventory) -> bool {
        cost.iter().all(|(material, amount)| self.get(material) >= amount)
    }

    /// Remove `cost` atomically.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InsufficientResources`] naming the first missing
    /// material; the inventory is unchanged in that case.
    pub fn spend(&mut self, cost: &Inventory) -> Result<()> {
        for (material, required) in cost.iter() {
            let available = self.get(material);
            if available < required {
                return Err(GameError::InsufficientResources {
                    resource: material.to_string(),
                    required,
                    available,
                });
            }
        }
        for (material, amount) in cost.iter() {
            if let Some(held) = self.amounts.get_mut(&material) {
                *held -= amount;
            }
        }
        Ok(())
    }

    /// Total units across all materials.
    #[must_use]
    pub fn total(&self) -> u32 {
        self.amounts.values().sum()
    }

    /// Number of distinct materials with a non-zero amount.
    #[must_use]
    pub fn distinct(&self) -> usize {
        self.amounts.values().filter(|&&a| a > 0).count()
    }

    /// Whether the inventory holds nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    /// Remove everything.
    pub fn clear(&mut self) {
        self.amounts.clear();
    }

    /// Iterate `(material, amount)` pairs with non-zero amounts in material order.
    pub fn iter(&self) -> impl Iterator<Item = (Material, u32)> + '_ {
        self.amounts
            .iter()
            .filter(|(_, &amount)| amount > 0)
            .map(|(&material, &amount)| (material, amount))
    }
}
