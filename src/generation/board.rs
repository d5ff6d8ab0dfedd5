//! # Board Generation
//!
//! Fills a fresh board so that no run of three exists at the start of an
//! encounter, and regenerates boards that offer the player no legal swap.

use crate::{
    BattleError, BattleResult, Board, GenerationConfig, Generator, GravityEngine, MatchDetector,
    Position, RandomSource, TileFactory, TileType,
};
use log::{debug, warn};

/// Generates starting boards from the spawnable tile catalog.
///
/// Cells are filled row by row. A draw that would complete a run of three
/// with the two cells to its left or the two above is redrawn, up to
/// `placement_attempts` times; after that the last draw is kept and the
/// run is cleared later by settling.
#[derive(Debug, Clone, Default)]
pub struct BoardGenerator {
    factory: TileFactory,
}

impl BoardGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a generator that draws from a custom factory.
    pub fn with_factory(factory: TileFactory) -> Self {
        Self { factory }
    }

    /// Generates a board, settles any accidental runs and retries until the
    /// board has at least one legal swap.
    ///
    /// The final attempt is returned even if it has no legal swap; the engine
    /// reshuffles again when the player's turn begins.
    pub fn generate_playable(
        &self,
        config: &GenerationConfig,
        rng: &mut dyn RandomSource,
    ) -> BattleResult<Board> {
        let gravity = GravityEngine::new(self.factory.clone());
        let max_passes = crate::config::MAX_CASCADE_TICKS;
        let mut board = self.generate(config, rng)?;

        for attempt in 1..=config.playable_attempts {
            board.settle(&gravity, rng, max_passes);
            if board.has_legal_move() {
                debug!("Generated playable board on attempt {}", attempt);
                return Ok(board);
            }
            board = self.generate(config, rng)?;
        }

        warn!(
            "No playable board after {} attempts, keeping the last one",
            config.playable_attempts
        );
        board.settle(&gravity, rng, max_passes);
        Ok(board)
    }
}

impl Generator<Board> for BoardGenerator {
    fn generate(&self, config: &GenerationConfig, rng: &mut dyn RandomSource) -> BattleResult<Board> {
        config.validate()?;
        let size = config.board_size;
        let mut board = Board::empty(size);

        for row in 0..size {
            for col in 0..size {
                let pos = Position::new(row as i32, col as i32);
                let mut tile = self.factory.create(rng);
                let mut attempts = 1;
                while attempts < config.placement_attempts
                    && board.would_complete_run(pos, tile.tile_type)
                {
                    tile = self.factory.create(rng);
                    attempts += 1;
                }
                board.set(pos, Some(tile))?;
            }
        }

        Ok(board)
    }

    fn validate(&self, board: &Board, config: &GenerationConfig) -> BattleResult<()> {
        if board.size() != config.board_size {
            return Err(BattleError::GenerationFailed(format!(
                "Board size {} does not match configured {}",
                board.size(),
                config.board_size
            )));
        }
        if !board.is_full() {
            return Err(BattleError::GenerationFailed(
                "Board has empty cells".to_string(),
            ));
        }
        if board.count_type(TileType::Curse) > 0 {
            return Err(BattleError::GenerationFailed(
                "Board contains curse tiles".to_string(),
            ));
        }
        if !MatchDetector::find_matches(board).is_empty() {
            return Err(BattleError::GenerationFailed(
                "Board starts with a run of three".to_string(),
            ));
        }
        Ok(())
    }

    fn generator_type(&self) -> &'static str {
        "BoardGenerator"
    }
}
