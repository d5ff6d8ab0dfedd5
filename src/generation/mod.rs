//! # Generation Module
//!
//! Procedural content for battles: starting boards, scaled encounters and
//! loot rolls.
//!
//! Every generator draws from the injected [`RandomSource`], so a seeded run
//! produces the same boards and enemies every time.

pub mod board;
pub mod encounters;
pub mod items;

pub use board::*;
pub use encounters::*;
pub use items::*;

use crate::config::{DEFAULT_BOARD_SIZE, DEFAULT_PLACEMENT_ATTEMPTS};
use crate::{BattleError, BattleResult, RandomSource};
use serde::{Deserialize, Serialize};

/// Configuration for procedural generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Random seed for reproducible generation
    pub seed: u64,
    /// Board edge length in cells
    pub board_size: usize,
    /// Draws per cell before the board generator accepts a run
    pub placement_attempts: u32,
    /// Attempts at producing a board with at least one legal swap
    pub playable_attempts: u32,
}

impl GenerationConfig {
    /// Creates a default generation configuration.
    ///
    /// # Examples
    ///
    /// ```
    /// use tilebattle::GenerationConfig;
    ///
    /// let config = GenerationConfig::new(12345);
    /// assert_eq!(config.board_size, 8);
    /// assert_eq!(config.placement_attempts, 10);
    /// ```
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            board_size: DEFAULT_BOARD_SIZE,
            placement_attempts: DEFAULT_PLACEMENT_ATTEMPTS,
            playable_attempts: 20,
        }
    }

    /// Creates a configuration for testing with a smaller board.
    pub fn for_testing(seed: u64) -> Self {
        Self {
            seed,
            board_size: 6,
            placement_attempts: DEFAULT_PLACEMENT_ATTEMPTS,
            playable_attempts: 20,
        }
    }

    /// Rejects sizes the match rules cannot work with.
    pub fn validate(&self) -> BattleResult<()> {
        if self.board_size < 3 {
            return Err(BattleError::InvalidConfig(format!(
                "board_size must be at least 3, got {}",
                self.board_size
            )));
        }
        if self.placement_attempts == 0 || self.playable_attempts == 0 {
            return Err(BattleError::InvalidConfig(
                "attempt counts must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self::new(42)
    }
}

/// Trait for procedural generators.
///
/// All generation systems implement this trait, allowing for consistent
/// interfaces and easy substitution in tests.
pub trait Generator<T> {
    /// Generates content using the provided configuration and random source.
    fn generate(&self, config: &GenerationConfig, rng: &mut dyn RandomSource) -> BattleResult<T>;

    /// Validates that the generated content meets requirements.
    fn validate(&self, content: &T, config: &GenerationConfig) -> BattleResult<()>;

    /// Gets the generator type name for logging and debugging.
    fn generator_type(&self) -> &'static str;
}
