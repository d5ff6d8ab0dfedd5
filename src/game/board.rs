//! # Board Module
//!
//! Grid storage plus the three pieces of board physics: the match detector,
//! swap legality, and the gravity engine that compacts and refills columns.
//!
//! Cells are addressed by [`Position`] with row 0 at the top. Gravity pulls
//! tiles toward the highest row index.

use crate::{
    BattleError, BattleResult, Direction, MatchTally, Position, RandomSource, Tile, TileFactory,
    TileType,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Square grid of tiles. A cell is `None` only transiently, between match
/// removal and the gravity refill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    size: usize,
    cells: Vec<Vec<Option<Tile>>>,
}

/// Matched coordinates from one scan, with the per-type tally built by
/// walking the coordinate set. A cell matched both horizontally and
/// vertically appears once in `cells` and counts once in `tally`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MatchResult {
    pub cells: BTreeSet<Position>,
    pub tally: MatchTally,
}

impl MatchResult {
    /// Whether the scan found nothing.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Number of matched cells.
    pub fn len(&self) -> usize {
        self.cells.len()
    }
}

impl Board {
    /// Creates a board of `size`×`size` empty cells.
    pub fn empty(size: usize) -> Self {
        Self {
            size,
            cells: vec![vec![None; size]; size],
        }
    }

    /// Builds a board from rows of tile symbols (see [`TileType::symbol`]).
    /// A `.` marks an empty cell.
    ///
    /// # Examples
    ///
    /// ```
    /// use tilebattle::{Board, Position, TileType};
    ///
    /// let board = Board::from_rows(&["SDP", "MFI", "LSD"]).unwrap();
    /// assert_eq!(board.size(), 3);
    /// assert_eq!(board.tile_type_at(Position::new(1, 1)), Some(TileType::Fire));
    /// ```
    pub fn from_rows(rows: &[&str]) -> BattleResult<Self> {
        let size = rows.len();
        let mut board = Board::empty(size);
        for (row, line) in rows.iter().enumerate() {
            let symbols: Vec<char> = line.chars().filter(|c| !c.is_whitespace()).collect();
            if symbols.len() != size {
                return Err(BattleError::InvalidState(format!(
                    "Row {} has {} cells, expected {}",
                    row,
                    symbols.len(),
                    size
                )));
            }
            for (col, symbol) in symbols.into_iter().enumerate() {
                board.cells[row][col] = match symbol {
                    '.' => None,
                    other => Some(Tile::new(TileType::from_symbol(other).ok_or_else(|| {
                        BattleError::InvalidState(format!("Unknown tile symbol '{}'", other))
                    })?)),
                };
            }
        }
        Ok(board)
    }

    /// Edge length of the board.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Checks if a position lies on the board.
    pub fn in_bounds(&self, pos: Position) -> bool {
        pos.row >= 0 && pos.col >= 0 && (pos.row as usize) < self.size && (pos.col as usize) < self.size
    }

    /// Gets the tile at a position, if any.
    pub fn get(&self, pos: Position) -> Option<Tile> {
        if !self.in_bounds(pos) {
            return None;
        }
        self.cells[pos.row as usize][pos.col as usize]
    }

    /// Gets the tile type at a position, if any.
    pub fn tile_type_at(&self, pos: Position) -> Option<TileType> {
        self.get(pos).map(|tile| tile.tile_type)
    }

    /// Sets or clears a cell.
    pub fn set(&mut self, pos: Position, tile: Option<Tile>) -> BattleResult<()> {
        if !self.in_bounds(pos) {
            return Err(BattleError::InvalidAction(format!("{} is off the board", pos)));
        }
        self.cells[pos.row as usize][pos.col as usize] = tile;
        Ok(())
    }

    /// All positions in row-major order.
    pub fn positions(&self) -> impl Iterator<Item = Position> + '_ {
        (0..self.size).flat_map(move |row| {
            (0..self.size).map(move |col| Position::new(row as i32, col as i32))
        })
    }

    /// True when every cell holds a tile.
    pub fn is_full(&self) -> bool {
        self.cells.iter().all(|row| row.iter().all(Option::is_some))
    }

    /// Number of occupied cells in a column.
    pub fn column_tile_count(&self, col: usize) -> usize {
        self.cells
            .iter()
            .filter(|row| row.get(col).map(Option::is_some).unwrap_or(false))
            .count()
    }

    /// Number of cells holding the given tile type.
    pub fn count_type(&self, tile_type: TileType) -> usize {
        self.cells
            .iter()
            .flat_map(|row| row.iter())
            .filter(|cell| cell.map(|tile| tile.tile_type) == Some(tile_type))
            .count()
    }

    /// Scans the board for runs of three or more. See [`MatchDetector`].
    pub fn find_matches(&self) -> BTreeSet<Position> {
        MatchDetector::find_matches(self)
    }

    /// Scans the board and tallies matched tile types.
    pub fn match_result(&self) -> MatchResult {
        MatchDetector::scan(self)
    }

    /// Exchanges two adjacent cells without checking for matches.
    pub fn swap(&mut self, a: Position, b: Position) -> BattleResult<()> {
        if !self.in_bounds(a) || !self.in_bounds(b) {
            return Err(BattleError::InvalidAction(format!(
                "Swap {} <-> {} leaves the board",
                a, b
            )));
        }
        if !a.is_adjacent(b) {
            return Err(BattleError::InvalidAction(format!(
                "Cells {} and {} are not edge-adjacent",
                a, b
            )));
        }
        let first = self.get(a);
        let second = self.get(b);
        self.cells[a.row as usize][a.col as usize] = second;
        self.cells[b.row as usize][b.col as usize] = first;
        Ok(())
    }

    /// A swap is legal when it succeeds and the resulting board has a match.
    ///
    /// # Examples
    ///
    /// ```
    /// use tilebattle::{Board, Position};
    ///
    /// let board = Board::from_rows(&["SSD", "DPS", "PMI"]).unwrap();
    /// assert!(board.is_legal_swap(Position::new(0, 2), Position::new(1, 2)));
    /// assert!(!board.is_legal_swap(Position::new(0, 0), Position::new(1, 1)));
    /// ```
    pub fn is_legal_swap(&self, a: Position, b: Position) -> bool {
        if self.get(a).is_none() || self.get(b).is_none() {
            return false;
        }
        let mut candidate = self.clone();
        match candidate.swap(a, b) {
            Ok(()) => !candidate.find_matches().is_empty(),
            Err(_) => false,
        }
    }

    /// Performs the swap only if it is legal. Returns whether it happened.
    pub fn try_swap(&mut self, a: Position, b: Position) -> bool {
        if !self.is_legal_swap(a, b) {
            return false;
        }
        self.swap(a, b).is_ok()
    }

    /// Every legal swap, each pair listed once with the first cell above or
    /// left of the second.
    pub fn legal_swaps(&self) -> Vec<(Position, Position)> {
        let mut swaps = Vec::new();
        for pos in self.positions() {
            for neighbour in [pos + Position::new(0, 1), pos + Position::new(1, 0)] {
                if self.is_legal_swap(pos, neighbour) {
                    swaps.push((pos, neighbour));
                }
            }
        }
        swaps
    }

    /// Whether the player has any legal swap available.
    pub fn has_legal_move(&self) -> bool {
        self.positions().any(|pos| {
            [pos + Position::new(0, 1), pos + Position::new(1, 0)]
                .into_iter()
                .any(|neighbour| self.is_legal_swap(pos, neighbour))
        })
    }

    /// Clears the given cells. Returns how many tiles were removed.
    pub fn remove_cells(&mut self, cells: &BTreeSet<Position>) -> usize {
        let mut removed = 0;
        for &pos in cells {
            if self.in_bounds(pos) && self.cells[pos.row as usize][pos.col as usize].take().is_some() {
                removed += 1;
            }
        }
        removed
    }

    /// Removes runs and refills until the board is stable, without producing
    /// any combat effect. Returns the number of passes taken.
    pub fn settle<R: RandomSource + ?Sized>(
        &mut self,
        gravity: &GravityEngine,
        rng: &mut R,
        max_passes: u32,
    ) -> u32 {
        let mut passes = 0;
        while passes < max_passes {
            let matches = self.find_matches();
            if matches.is_empty() {
                break;
            }
            self.remove_cells(&matches);
            *self = gravity.apply(self, rng);
            passes += 1;
        }
        passes
    }

    /// Whether a `tile_type` tile at `pos` would sit in a run of three or more,
    /// counting matching neighbours on both sides along each axis.
    pub fn would_complete_run(&self, pos: Position, tile_type: TileType) -> bool {
        let reach = |direction: Direction| {
            let step = direction.to_delta();
            let mut cursor = pos + step;
            let mut count = 0;
            while self.tile_type_at(cursor) == Some(tile_type) {
                count += 1;
                cursor = cursor + step;
            }
            count
        };
        1 + reach(Direction::West) + reach(Direction::East) >= 3
            || 1 + reach(Direction::North) + reach(Direction::South) >= 3
    }

    /// Replaces up to `count` distinct random cells with curse tiles.
    /// Returns the cursed positions.
    ///
    /// Cells that already hold a curse, or whose curse would complete a run,
    /// are never chosen, so a run-free board stays run-free.
    pub fn insert_curses<R: RandomSource + ?Sized>(&mut self, count: usize, rng: &mut R) -> Vec<Position> {
        let mut cursed = Vec::new();
        while cursed.len() < count {
            let candidates: Vec<Position> = self
                .positions()
                .filter(|&pos| {
                    self.tile_type_at(pos) != Some(TileType::Curse)
                        && !self.would_complete_run(pos, TileType::Curse)
                })
                .collect();
            if candidates.is_empty() {
                break;
            }
            let pos = candidates[rng.index(candidates.len())];
            self.cells[pos.row as usize][pos.col as usize] = Some(Tile::curse());
            cursed.push(pos);
        }
        cursed
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in &self.cells {
            let line: String = row
                .iter()
                .map(|cell| cell.map(|tile| tile.tile_type.symbol()).unwrap_or('.'))
                .collect();
            writeln!(f, "{}", line)?;
        }
        Ok(())
    }
}

/// Finds every cell that belongs to a horizontal or vertical run of three or
/// more same-typed tiles.
pub struct MatchDetector;

impl MatchDetector {
    /// Returns matched coordinates. Runs longer than three are marked in full
    /// and a cell shared by a row run and a column run appears once.
    pub fn find_matches(board: &Board) -> BTreeSet<Position> {
        let mut matched = BTreeSet::new();
        let size = board.size() as i32;

        // Horizontal pass
        for row in 0..size {
            Self::scan_line(board, &mut matched, (0..size).map(|col| Position::new(row, col)).collect());
        }

        // Vertical pass
        for col in 0..size {
            Self::scan_line(board, &mut matched, (0..size).map(|row| Position::new(row, col)).collect());
        }

        matched
    }

    /// Scans the board and builds the tally from the matched coordinate set.
    pub fn scan(board: &Board) -> MatchResult {
        let cells = Self::find_matches(board);
        let tally = MatchTally::from_cells(board, &cells);
        MatchResult { cells, tally }
    }

    fn scan_line(board: &Board, matched: &mut BTreeSet<Position>, line: Vec<Position>) {
        if line.len() < 3 {
            return;
        }
        for start in 0..line.len() - 2 {
            let Some(tile_type) = board.tile_type_at(line[start]) else {
                continue;
            };
            if board.tile_type_at(line[start + 1]) != Some(tile_type)
                || board.tile_type_at(line[start + 2]) != Some(tile_type)
            {
                continue;
            }
            matched.extend(&line[start..start + 3]);
            let mut next = start + 3;
            while next < line.len() && board.tile_type_at(line[next]) == Some(tile_type) {
                matched.insert(line[next]);
                next += 1;
            }
        }
    }
}

/// Compacts each column downward and refills the vacated cells from the top.
#[derive(Debug, Clone, Default)]
pub struct GravityEngine {
    factory: TileFactory,
}

impl GravityEngine {
    /// Creates a gravity engine that refills from the given factory.
    pub fn new(factory: TileFactory) -> Self {
        Self { factory }
    }

    /// The factory used for refills.
    pub fn factory(&self) -> &TileFactory {
        &self.factory
    }

    /// Returns a new board with every column compacted and refilled. Surviving
    /// tiles keep their relative order; new tiles never include curses.
    /// Newly formed runs are left for the next detector pass.
    pub fn apply<R: RandomSource + ?Sized>(&self, board: &Board, rng: &mut R) -> Board {
        let size = board.size();
        let mut next = Board::empty(size);

        for col in 0..size {
            let survivors: Vec<Tile> = (0..size)
                .rev()
                .filter_map(|row| board.cells[row][col])
                .collect();

            // Survivors land from the bottom up in their original order.
            for (offset, tile) in survivors.iter().enumerate() {
                next.cells[size - 1 - offset][col] = Some(*tile);
            }

            let vacated = size - survivors.len();
            for row in 0..vacated {
                next.cells[row][col] = Some(self.factory.create(rng));
            }
        }

        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ScriptedRng, SeededRng};

    fn quiet_rows() -> Vec<String> {
        // (row + 2*col) mod 7 over the spawnable catalog never lines up three.
        (0..8)
            .map(|row| {
                (0..8)
                    .map(|col| TileType::SPAWNABLE[(row + 2 * col) % 7].symbol())
                    .collect()
            })
            .collect()
    }

    fn quiet_board() -> Board {
        let rows = quiet_rows();
        let refs: Vec<&str> = rows.iter().map(String::as_str).collect();
        Board::from_rows(&refs).unwrap()
    }

    #[test]
    fn test_quiet_board_has_no_matches() {
        assert!(quiet_board().find_matches().is_empty());
    }

    #[test]
    fn test_horizontal_run_of_three() {
        let board = Board::from_rows(&["SSSD", "DPMI", "PMID", "MIDP"]).unwrap();
        let matches = board.find_matches();
        assert_eq!(matches.len(), 3);
        assert!(matches.contains(&Position::new(0, 0)));
        assert!(matches.contains(&Position::new(0, 2)));
    }

    #[test]
    fn test_runs_longer_than_three_are_fully_marked() {
        let board = Board::from_rows(&["FFFFF", "DPMID", "PMIDP", "MIDPM", "IDPMI"]).unwrap();
        let result = board.match_result();
        assert_eq!(result.len(), 5);
        assert_eq!(result.tally.count(TileType::Fire), 5);
    }

    #[test]
    fn test_vertical_run() {
        let board = Board::from_rows(&["LDP", "LPM", "LMD"]).unwrap();
        let matches = board.find_matches();
        assert_eq!(matches.len(), 3);
        assert!(matches.iter().all(|pos| pos.col == 0));
    }

    #[test]
    fn test_l_shaped_match_counts_corner_once() {
        let board = Board::from_rows(&["SSS", "SDP", "SPD"]).unwrap();
        let result = board.match_result();
        assert_eq!(result.len(), 5);
        assert_eq!(result.tally.count(TileType::Sword), 5);
    }

    #[test]
    fn test_empty_cells_never_match() {
        let board = Board::from_rows(&["...", "SDP", "PSD"]).unwrap();
        assert!(board.find_matches().is_empty());
    }

    #[test]
    fn test_swap_legality() {
        let mut board = quiet_board();
        // Row 3 reads M I S P F L D M. Put swords at (3,3) and (3,4) so the row
        // holds S S S at columns 2..=4, then swap two swords vertically.
        board.set(Position::new(3, 3), Some(Tile::new(TileType::Sword))).unwrap();
        board.set(Position::new(3, 4), Some(Tile::new(TileType::Sword))).unwrap();
        board.set(Position::new(2, 4), Some(Tile::new(TileType::Sword))).unwrap();
        assert!(board.is_legal_swap(Position::new(3, 4), Position::new(2, 4)));
    }

    #[test]
    fn test_swap_without_match_is_illegal() {
        let board = quiet_board();
        // Row 0 reads S P F L D M I S; trading the first two lines nothing up.
        assert!(!board.is_legal_swap(Position::new(0, 0), Position::new(0, 1)));
    }

    #[test]
    fn test_diagonal_and_out_of_bounds_swaps_rejected() {
        let mut board = Board::from_rows(&["SSD", "DPS", "PMI"]).unwrap();
        let before = board.clone();
        assert!(!board.try_swap(Position::new(0, 0), Position::new(1, 1)));
        assert!(!board.try_swap(Position::new(0, 2), Position::new(0, 3)));
        assert!(!board.try_swap(Position::new(-1, 0), Position::new(0, 0)));
        assert_eq!(board, before);
    }

    #[test]
    fn test_try_swap_mutates_legal_swap() {
        let mut board = Board::from_rows(&["SSD", "DPS", "PMI"]).unwrap();
        assert!(board.try_swap(Position::new(0, 2), Position::new(1, 2)));
        assert_eq!(board.tile_type_at(Position::new(0, 2)), Some(TileType::Sword));
        assert_eq!(board.find_matches().len(), 3);
    }

    #[test]
    fn test_legal_swaps_lists_hint() {
        let board = Board::from_rows(&["SSD", "DPS", "PMI"]).unwrap();
        let swaps = board.legal_swaps();
        assert!(swaps.contains(&(Position::new(0, 2), Position::new(1, 2))));
        assert!(board.has_legal_move());
    }

    #[test]
    fn test_gravity_compacts_and_refills() {
        let mut board = Board::from_rows(&["SDP", "M.I", "L.F"]).unwrap();
        board.set(Position::new(2, 0), None).unwrap();
        let gravity = GravityEngine::default();
        let mut rng = ScriptedRng::constant(0.0);
        let next = gravity.apply(&board, &mut rng);

        assert!(next.is_full());
        // Column 0: S, M survive and settle at the bottom in order.
        assert_eq!(next.tile_type_at(Position::new(1, 0)), Some(TileType::Sword));
        assert_eq!(next.tile_type_at(Position::new(2, 0)), Some(TileType::Mana));
        // Column 1: only D survives.
        assert_eq!(next.tile_type_at(Position::new(2, 1)), Some(TileType::Shield));
        // Column 2 was full and is unchanged.
        assert_eq!(next.tile_type_at(Position::new(0, 2)), Some(TileType::Potion));
        assert_eq!(next.tile_type_at(Position::new(2, 2)), Some(TileType::Fire));
        // Refills come from the factory (index 0 = sword).
        assert_eq!(next.tile_type_at(Position::new(0, 0)), Some(TileType::Sword));
        assert_eq!(next.tile_type_at(Position::new(0, 1)), Some(TileType::Sword));
    }

    #[test]
    fn test_gravity_never_refills_curse() {
        let board = Board::empty(6);
        let gravity = GravityEngine::default();
        let mut rng = SeededRng::new(4242);
        let next = gravity.apply(&board, &mut rng);
        assert!(next.is_full());
        assert_eq!(next.count_type(TileType::Curse), 0);
    }

    #[test]
    fn test_settle_removes_all_runs() {
        let mut board = Board::from_rows(&["SSSD", "DPMI", "PMID", "LLLP"]).unwrap();
        let gravity = GravityEngine::default();
        let mut rng = SeededRng::new(7);
        board.settle(&gravity, &mut rng, 100);
        assert!(board.is_full());
        assert!(board.find_matches().is_empty());
    }

    #[test]
    fn test_insert_curses_picks_distinct_cells() {
        let mut board = quiet_board();
        let mut rng = SeededRng::new(99);
        let cursed = board.insert_curses(3, &mut rng);
        assert_eq!(cursed.len(), 3);
        let unique: BTreeSet<Position> = cursed.iter().copied().collect();
        assert_eq!(unique.len(), 3);
        assert_eq!(board.count_type(TileType::Curse), 3);
    }

    #[test]
    fn test_would_complete_run_checks_both_sides() {
        let board = Board::from_rows(&["CSC", "DPM", "CMI"]).unwrap();
        assert!(board.would_complete_run(Position::new(0, 1), TileType::Curse));
        assert!(board.would_complete_run(Position::new(1, 0), TileType::Curse));
        assert!(!board.would_complete_run(Position::new(1, 1), TileType::Curse));
        assert!(!board.would_complete_run(Position::new(2, 2), TileType::Curse));
    }

    #[test]
    fn test_insert_curses_never_forms_runs() {
        for seed in 0..200 {
            let mut board = Board::from_rows(&["SCDP", "CMIS", "PDCM", "DSMC"]).unwrap();
            let mut rng = SeededRng::new(seed);
            let cursed = board.insert_curses(6, &mut rng);
            assert!(!cursed.is_empty());
            assert!(board.find_matches().is_empty(), "seed {}:\n{}", seed, board);
        }
    }

    #[test]
    fn test_insert_curses_stops_when_no_cell_is_safe() {
        let mut board = Board::from_rows(&["CC", "CC"]).unwrap();
        let mut rng = SeededRng::new(1);
        assert!(board.insert_curses(3, &mut rng).is_empty());
    }

    #[test]
    fn test_from_rows_rejects_ragged_input() {
        assert!(Board::from_rows(&["SS", "S"]).is_err());
        assert!(Board::from_rows(&["S?", "SS"]).is_err());
    }
}
