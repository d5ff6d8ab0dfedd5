//! # Game Module
//!
//! Core battle state, board physics, and combat rules.
//!
//! This module contains the fundamental building blocks of the battle engine:
//! - Tiles, the board, match detection and gravity refill
//! - Player and enemy records with upgrades, weapons and status effects
//! - Effect resolution and the combat rules that apply it
//! - The explicit engine state, its reducer, and the engine facade

pub mod balance;
pub mod board;
pub mod combat;
pub mod effects;
pub mod engine;
pub mod entities;
pub mod events;
pub mod state;
pub mod tiles;

pub use balance::*;
pub use board::*;
pub use combat::*;
pub use effects::*;
pub use engine::*;
pub use entities::*;
pub use events::*;
pub use state::*;
pub use tiles::*;

use serde::{Deserialize, Serialize};

/// A cell coordinate on the board. Row 0 is the top row.
///
/// Coordinates are signed so that out-of-bounds requests from the host can be
/// represented and rejected instead of wrapping.
///
/// # Examples
///
/// ```
/// use tilebattle::Position;
///
/// let pos = Position::new(3, 4);
/// assert_eq!(pos.row, 3);
/// assert_eq!(pos.col, 4);
///
/// assert!(pos.is_adjacent(Position::new(3, 5)));
/// assert!(!pos.is_adjacent(Position::new(4, 5)));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub row: i32,
    pub col: i32,
}

impl Position {
    /// Creates a new position with the given coordinates.
    pub fn new(row: i32, col: i32) -> Self {
        Self { row, col }
    }

    /// Calculates the Manhattan distance to another position.
    ///
    /// # Examples
    ///
    /// ```
    /// use tilebattle::Position;
    ///
    /// let pos1 = Position::new(0, 0);
    /// let pos2 = Position::new(3, 4);
    /// assert_eq!(pos1.manhattan_distance(pos2), 7);
    /// ```
    pub fn manhattan_distance(self, other: Position) -> u32 {
        self.row
            .abs_diff(other.row)
            .saturating_add(self.col.abs_diff(other.col))
    }

    /// True when the two cells share an edge. Diagonal neighbours are not adjacent.
    pub fn is_adjacent(self, other: Position) -> bool {
        self.manhattan_distance(other) == 1
    }
}

// Host coordinates are unchecked; saturate so stepping off the edge stays out of bounds.
impl std::ops::Add for Position {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self::new(
            self.row.saturating_add(other.row),
            self.col.saturating_add(other.col),
        )
    }
}

impl std::ops::Sub for Position {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        Self::new(
            self.row.saturating_sub(other.row),
            self.col.saturating_sub(other.col),
        )
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// Swap directions. Only the four cardinal directions are legal on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    North,
    South,
    East,
    West,
}

impl Direction {
    /// Converts a direction to a position delta.
    ///
    /// # Examples
    ///
    /// ```
    /// use tilebattle::{Direction, Position};
    ///
    /// let delta = Direction::North.to_delta();
    /// assert_eq!(delta, Position::new(-1, 0));
    /// ```
    pub fn to_delta(self) -> Position {
        match self {
            Direction::North => Position::new(-1, 0),
            Direction::South => Position::new(1, 0),
            Direction::East => Position::new(0, 1),
            Direction::West => Position::new(0, -1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_creation() {
        let pos = Position::new(5, 10);
        assert_eq!(pos.row, 5);
        assert_eq!(pos.col, 10);
    }

    #[test]
    fn test_position_manhattan_distance() {
        let pos1 = Position::new(0, 0);
        let pos2 = Position::new(3, 4);
        assert_eq!(pos1.manhattan_distance(pos2), 7);
    }

    #[test]
    fn test_position_adjacency() {
        let pos = Position::new(3, 3);
        assert!(pos.is_adjacent(Position::new(3, 4)));
        assert!(pos.is_adjacent(Position::new(2, 3)));
        assert!(!pos.is_adjacent(Position::new(4, 4))); // diagonal
        assert!(!pos.is_adjacent(pos));
    }

    #[test]
    fn test_extreme_coordinates_do_not_overflow() {
        let low = Position::new(i32::MIN, 0);
        let high = Position::new(i32::MAX, 0);
        assert_eq!(low.manhattan_distance(high), u32::MAX);
        assert!(!low.is_adjacent(high));
        assert!(!low.is_adjacent(Position::new(0, 0)));
        assert!(Position::new(i32::MIN, 0).is_adjacent(Position::new(i32::MIN + 1, 0)));
        assert_eq!(low + Direction::North.to_delta(), low);
        assert_eq!(high - Position::new(-1, 0), high);
    }

    #[test]
    fn test_position_arithmetic() {
        let pos1 = Position::new(5, 10);
        let pos2 = Position::new(3, 2);
        assert_eq!(pos1 + pos2, Position::new(8, 12));
        assert_eq!(pos1 - pos2, Position::new(2, 8));
    }

    #[test]
    fn test_direction_deltas() {
        assert_eq!(Direction::South.to_delta(), Position::new(1, 0));
        assert_eq!(Direction::East.to_delta(), Position::new(0, 1));
        assert_eq!(Direction::West.to_delta(), Position::new(0, -1));
    }
}
