//! # Village Core
//!
//! Deterministic simulation core for a village tower-defense game.
//!
//! This crate contains **only** simulation logic:
//! - No rendering (front ends implement [`render::Renderer`])
//! - No IO apart from loading RON configuration
//! - No system randomness (one seeded stream per simulation)
//!
//! This separation enables:
//! - Headless runs and batch balancing
//! - Snapshots and replays
//! - Determinism testing
//!
//! ## Crate Structure
//!
//! - [`simulation`] - Fixed-timestep loop, spawning and death handling
//! - [`entity`] - Entity model, storage and per-kind index
//! - [`enemy`], [`turret`], [`projectile`], [`building`], [`player`],
//!   [`resource`] - Per-kind state and behaviour
//! - [`combat`] - Targeting queries and damage resolution
//! - [`waves`] - Wave counter, round catalog and power curve
//! - [`recipes`], [`economy`] - Build costs, materials and craft difficulty
//! - [`config`] - Tunable constants loaded from RON

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod building;
pub mod camera;
pub mod clock;
pub mod combat;
pub mod components;
pub mod config;
pub mod economy;
pub mod enemy;
pub mod entity;
pub mod error;
pub mod math;
pub mod particles;
pub mod player;
pub mod projectile;
pub mod recipes;
pub mod render;
pub mod resource;
pub mod rng;
pub mod simulation;
pub mod turret;
pub mod waves;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::building::{Building, BuildingKind, Worker, WorkerState};
    pub use crate::components::*;
    pub use crate::config::SimConfig;
    pub use crate::economy::{Inventory, Material, ResourceKind};
    pub use crate::enemy::{Enemy, EnemyKind};
    pub use crate::entity::{Entity, EntityBody, EntityStorage, TypeIndex};
    pub use crate::error::{GameError, Result};
    pub use crate::math::DVec2;
    pub use crate::player::{Player, PlayerInput};
    pub use crate::recipes::{Recipe, RecipeBook};
    pub use crate::render::{EntityView, Renderer};
    pub use crate::simulation::{GameState, Simulation, TickEvents};
    pub use crate::turret::{Turret, TurretKind};
    pub use crate::waves::{RoundCatalog, RoundDefinition};
}
