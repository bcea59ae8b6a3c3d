//! Turret balance table.
//!
//! Every turret's damage is derived from the craft difficulty of its recipe
//! relative to the basic turret. This module lays those numbers side by side.

use serde::Serialize;

use village_core::config::SimConfig;
use village_core::recipes::{BuildOutput, RecipeBook};
use village_core::turret::Turret;

/// One turret recipe's balance numbers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TurretStats {
    /// Recipe id.
    pub recipe: String,
    /// Craft difficulty of the recipe.
    pub craft_difficulty: f64,
    /// Difficulty relative to the basic turret.
    pub relative_cost: f64,
    /// DPS the turret is balanced towards.
    pub target_dps: f64,
    /// Damage per shot.
    pub damage: f64,
    /// Seconds between shots.
    pub fire_rate: f64,
    /// Targeting range.
    pub range: f64,
    /// Single-target damage per second, `damage / fire_rate`.
    pub single_target_dps: f64,
}

/// Balance numbers for every turret recipe, sorted by craft difficulty.
#[must_use]
pub fn turret_table(config: &SimConfig) -> Vec<TurretStats> {
    let recipes = RecipeBook::new(config);
    let basic = recipes.basic_difficulty();

    let mut rows: Vec<TurretStats> = recipes
        .iter()
        .filter_map(|recipe| match recipe.output {
            BuildOutput::Turret(kind) => {
                let turret = Turret::new(kind, &recipes);
                let single_target_dps = if turret.fire_rate > 0.0 {
                    turret.damage / turret.fire_rate
                } else {
                    0.0
                };
                Some(TurretStats {
                    recipe: recipe.id.clone(),
                    craft_difficulty: recipe.craft_difficulty,
                    relative_cost: recipe.craft_difficulty / basic,
                    target_dps: recipes.target_dps(kind),
                    damage: turret.damage,
                    fire_rate: turret.fire_rate,
                    range: turret.range,
                    single_target_dps,
                })
            }
            _ => None,
        })
        .collect();

    rows.sort_by(|a, b| {
        a.craft_difficulty
            .total_cmp(&b.craft_difficulty)
            .then_with(|| a.recipe.cmp(&b.recipe))
    });
    rows
}

/// Render the table as aligned text.
#[must_use]
pub fn format_table(rows: &[TurretStats]) -> String {
    let mut out = format!(
        "{:<24} {:>10} {:>7} {:>9} {:>9} {:>6} {:>6} {:>9}\n",
        "recipe", "difficulty", "x basic", "target", "damage", "rate", "range", "dps"
    );
    out.push_str(&"-".repeat(87));
    out.push('\n');
    for row in rows {
        out.push_str(&format!(
            "{:<24} {:>10.1} {:>7.2} {:>9.1} {:>9.2} {:>6.2} {:>6.0} {:>9.1}\n",
            row.recipe,
            row.craft_difficulty,
            row.relative_cost,
            row.target_dps,
            row.damage,
            row.fire_rate,
            row.range,
            row.single_target_dps
        ));
    }
    out
}
