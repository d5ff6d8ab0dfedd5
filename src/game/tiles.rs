//! # Tiles
//!
//! The tile catalog and the factory that draws random tiles from it.

use crate::RandomSource;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Every kind of tile that can occupy a board cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TileType {
    Sword,
    Shield,
    Potion,
    Mana,
    Fire,
    Ice,
    Lightning,
    /// Only ever placed by enemy abilities, never by generation or refill.
    Curse,
}

impl TileType {
    /// Full catalog in resolution order.
    pub const ALL: [TileType; 8] = [
        TileType::Sword,
        TileType::Shield,
        TileType::Potion,
        TileType::Mana,
        TileType::Fire,
        TileType::Ice,
        TileType::Lightning,
        TileType::Curse,
    ];

    /// Catalog used for generation and refill.
    pub const SPAWNABLE: [TileType; 7] = [
        TileType::Sword,
        TileType::Shield,
        TileType::Potion,
        TileType::Mana,
        TileType::Fire,
        TileType::Ice,
        TileType::Lightning,
    ];

    /// Whether generation and refill may produce this tile.
    pub fn is_spawnable(self) -> bool {
        self != TileType::Curse
    }

    /// Single-character glyph used by text renderers and board fixtures.
    pub fn symbol(self) -> char {
        match self {
            TileType::Sword => 'S',
            TileType::Shield => 'D',
            TileType::Potion => 'P',
            TileType::Mana => 'M',
            TileType::Fire => 'F',
            TileType::Ice => 'I',
            TileType::Lightning => 'L',
            TileType::Curse => 'C',
        }
    }

    /// Inverse of [`TileType::symbol`].
    pub fn from_symbol(symbol: char) -> Option<TileType> {
        TileType::ALL
            .iter()
            .copied()
            .find(|tile_type| tile_type.symbol() == symbol.to_ascii_uppercase())
    }
}

impl fmt::Display for TileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TileType::Sword => "sword",
            TileType::Shield => "shield",
            TileType::Potion => "potion",
            TileType::Mana => "mana",
            TileType::Fire => "fire",
            TileType::Ice => "ice",
            TileType::Lightning => "lightning",
            TileType::Curse => "curse",
        };
        f.write_str(name)
    }
}

/// A tile is a plain value; its position is implied by the grid cell holding it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tile {
    pub tile_type: TileType,
}

impl Tile {
    /// Creates a tile of the given type.
    pub fn new(tile_type: TileType) -> Self {
        Self { tile_type }
    }

    /// Curse tile, as inserted by enemy abilities.
    pub fn curse() -> Self {
        Self::new(TileType::Curse)
    }
}

impl From<TileType> for Tile {
    fn from(tile_type: TileType) -> Self {
        Tile::new(tile_type)
    }
}

/// Produces random tiles from a fixed catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileFactory {
    catalog: Vec<TileType>,
}

impl Default for TileFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl TileFactory {
    /// Creates a factory over the spawnable catalog (everything but curses).
    pub fn new() -> Self {
        Self {
            catalog: TileType::SPAWNABLE.to_vec(),
        }
    }

    /// Creates a factory over a custom catalog. Curse tiles are filtered out,
    /// and an empty result falls back to the spawnable catalog.
    pub fn with_catalog(catalog: &[TileType]) -> Self {
        let filtered: Vec<TileType> = catalog
            .iter()
            .copied()
            .filter(|tile_type| tile_type.is_spawnable())
            .collect();
        if filtered.is_empty() {
            Self::new()
        } else {
            Self { catalog: filtered }
        }
    }

    /// The tile types this factory can produce.
    pub fn catalog(&self) -> &[TileType] {
        &self.catalog
    }

    /// Draws a random tile.
    pub fn create<R: RandomSource + ?Sized>(&self, rng: &mut R) -> Tile {
        let index = rng.index(self.catalog.len());
        Tile::new(self.catalog[index])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ScriptedRng, SeededRng};

    #[test]
    fn test_factory_never_produces_curse() {
        let factory = TileFactory::new();
        let mut rng = SeededRng::new(12345);
        for _ in 0..2000 {
            assert_ne!(factory.create(&mut rng).tile_type, TileType::Curse);
        }
    }

    #[test]
    fn test_factory_covers_catalog() {
        let factory = TileFactory::new();
        let mut rng = ScriptedRng::new(vec![0.0, 0.15, 0.3, 0.45, 0.6, 0.75, 0.9]);
        let drawn: Vec<TileType> = (0..7).map(|_| factory.create(&mut rng).tile_type).collect();
        assert_eq!(drawn, TileType::SPAWNABLE.to_vec());
    }

    #[test]
    fn test_custom_catalog_filters_curse() {
        let factory = TileFactory::with_catalog(&[TileType::Curse, TileType::Fire]);
        assert_eq!(factory.catalog(), &[TileType::Fire]);

        let fallback = TileFactory::with_catalog(&[TileType::Curse]);
        assert_eq!(fallback.catalog().len(), 7);
    }

    #[test]
    fn test_symbols_round_trip() {
        for tile_type in TileType::ALL {
            assert_eq!(TileType::from_symbol(tile_type.symbol()), Some(tile_type));
        }
        assert_eq!(TileType::from_symbol('s'), Some(TileType::Sword));
        assert_eq!(TileType::from_symbol('?'), None);
    }
}
