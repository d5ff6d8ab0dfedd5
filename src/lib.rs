//! # Tilebattle
//!
//! A tile-matching battle engine: the player swaps tiles on a match-3 board,
//! matched tiles are converted into combat effects, and an enemy answers on its
//! own turn.
//!
//! ## Architecture Overview
//!
//! The engine is organised around a handful of cooperating pieces:
//!
//! - **Board**: grid storage, match detection, swap legality and gravity refill
//! - **Effects**: turns a tally of matched tiles into damage, healing and status stacks
//! - **Combat**: HP/shield bookkeeping, enemy turns, victory and level-ups
//! - **State**: an explicit `EngineState` advanced by the `apply_event` reducer
//! - **Generation**: initial boards, scaled encounters and loot rolls
//! - **Persistence**: loading and fire-and-forget saving of player progression
//!
//! All randomness flows through the [`RandomSource`] port so that crits,
//! refills and enemy abilities can be replayed exactly in tests.

pub mod game;
pub mod generation;
pub mod input;
pub mod persistence;
pub mod rendering;
pub mod utils;

// Core module re-exports
pub use game::*;
pub use generation::*;
pub use input::*;
pub use persistence::*;
pub use rendering::*;
pub use utils::*;

/// Core error type for the battle engine.
#[derive(thiserror::Error, Debug)]
pub enum BattleError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// Engine state is invalid
    #[error("Invalid engine state: {0}")]
    InvalidState(String),

    /// Action cannot be performed
    #[error("Invalid action: {0}")]
    InvalidAction(String),

    /// Generation failed
    #[error("Generation failed: {0}")]
    GenerationFailed(String),

    /// Balance or generation configuration is unusable
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Progression store could not complete a request
    #[error("Persistence error: {0}")]
    Persistence(String),
}

/// Result type used throughout the tilebattle codebase.
pub type BattleResult<T> = Result<T, BattleError>;

/// Version information for the engine.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Engine configuration constants.
pub mod config {
    /// Default board edge length in cells
    pub const DEFAULT_BOARD_SIZE: usize = 8;

    /// Draws per cell before the board generator accepts a run
    pub const DEFAULT_PLACEMENT_ATTEMPTS: u32 = 10;

    /// Rate of the host tick driver
    pub const TICK_RATE_HZ: u64 = 60;

    /// Upper bound on resolution ticks within one player turn
    pub const MAX_CASCADE_TICKS: u32 = 100;

    /// Seconds between periodic progression saves in the CLI host
    pub const DEFAULT_AUTOSAVE_SECS: u64 = 30;
}
