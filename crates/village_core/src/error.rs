//! Errors raised at the simulation's API boundary.
//!
//! The simulation itself never fails: numeric edge cases are clamped and lost
//! targets fall back to idle behaviour. Errors only surface at the API
//! boundary (commands, configuration, snapshots).

use thiserror::Error;

/// Shorthand for results carrying a [`GameError`].
pub type Result<T> = std::result::Result<T, GameError>;

/// Everything a command, config load or snapshot call can reject.
#[derive(Debug, Error)]
pub enum GameError {
    /// No live entity has this id.
    #[error("No entity with id {0}")]
    EntityNotFound(u64),

    /// No recipe with the given identifier.
    #[error("Unknown recipe: {0}")]
    UnknownRecipe(String),

    /// The build cell is already taken by a structure.
    #[error("Build cell ({x}, {y}) is occupied")]
    CellOccupied {
        /// Grid-snapped x coordinate.
        x: f64,
        /// Grid-snapped y coordinate.
        y: f64,
    },

    /// The player cannot pay a recipe cost.
    #[error("Not enough {resource}: {available} held, {required} needed")]
    InsufficientResources {
        /// Material name.
        resource: String,
        /// Units the cost asks for.
        required: u32,
        /// Units in the player's inventory.
        available: u32,
    },

    /// Config file parsing error.
    #[error("Failed to parse config '{path}': {message}")]
    ConfigParse {
        /// Path (or source label) of the file that failed to parse.
        path: String,
        /// Error message.
        message: String,
    },

    /// A configuration value is out of its accepted range.
    #[error("Invalid config value for {field}: {reason}")]
    InvalidConfig {
        /// Field name.
        field: &'static str,
        /// Why the value was rejected.
        reason: String,
    },

    /// The simulation cannot perform the request in its current state.
    #[error("Simulation state error: {0}")]
    InvalidState(String),
}
