use crate::cell::Cell;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Smallest supported board
pub const MIN_SIZE: usize = 2;
/// Largest supported board
pub const MAX_SIZE: usize = 80;
/// Board size used at startup
pub const DEFAULT_SIZE: usize = 10;
/// Longest ship considered by default
pub const DEFAULT_MAX_SHIP_LEN: u32 = 4;

/// A cell position on the board
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Position {
    pub row: usize,
    pub col: usize,
}

impl Position {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

/// The editable puzzle: an `n`x`n` board of cell hints, one occupancy target
/// per row and per column, and the maximum ship length `K`.
///
/// Targets always have length `n`. Coordinates outside the board are a
/// contract violation and panic. Deserialized data is checked against the
/// same shape before it becomes a `Puzzle`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "PuzzleData")]
pub struct Puzzle {
    size: usize,
    max_ship_len: u32,
    cells: Vec<Cell>,
    row_targets: Vec<u32>,
    col_targets: Vec<u32>,
}

/// Serialized puzzle whose shape does not hold together
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidPuzzle {
    #[error("board size {size} outside {}..={}", MIN_SIZE, MAX_SIZE)]
    Size { size: usize },

    #[error("{what} has {found} entries, expected {expected}")]
    Length {
        what: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("maximum ship length must be at least 1")]
    MaxShipLen,
}

/// Unchecked wire form of [`Puzzle`]
#[derive(Deserialize)]
struct PuzzleData {
    size: usize,
    max_ship_len: u32,
    cells: Vec<Cell>,
    row_targets: Vec<u32>,
    col_targets: Vec<u32>,
}

impl TryFrom<PuzzleData> for Puzzle {
    type Error = InvalidPuzzle;

    fn try_from(data: PuzzleData) -> Result<Self, Self::Error> {
        let size = data.size;
        if !(MIN_SIZE..=MAX_SIZE).contains(&size) {
            return Err(InvalidPuzzle::Size { size });
        }
        if data.max_ship_len == 0 {
            return Err(InvalidPuzzle::MaxShipLen);
        }
        for (what, expected, found) in [
            ("cells", size * size, data.cells.len()),
            ("row_targets", size, data.row_targets.len()),
            ("col_targets", size, data.col_targets.len()),
        ] {
            if found != expected {
                return Err(InvalidPuzzle::Length {
                    what,
                    expected,
                    found,
                });
            }
        }
        Ok(Self::from_parts(
            size,
            data.max_ship_len,
            data.cells,
            data.row_targets,
            data.col_targets,
        ))
    }
}

impl Default for Puzzle {
    fn default() -> Self {
        Self::new(DEFAULT_SIZE, DEFAULT_MAX_SHIP_LEN)
    }
}

impl Puzzle {
    /// Create an all-`Unknown` puzzle with zero targets
    pub fn new(size: usize, max_ship_len: u32) -> Self {
        assert!(
            (MIN_SIZE..=MAX_SIZE).contains(&size),
            "board size {} outside {}..={}",
            size,
            MIN_SIZE,
            MAX_SIZE
        );
        Self {
            size,
            max_ship_len: max_ship_len.max(1),
            cells: vec![Cell::Unknown; size * size],
            row_targets: vec![0; size],
            col_targets: vec![0; size],
        }
    }

    /// Assemble a puzzle from already validated parts
    pub(crate) fn from_parts(
        size: usize,
        max_ship_len: u32,
        cells: Vec<Cell>,
        row_targets: Vec<u32>,
        col_targets: Vec<u32>,
    ) -> Self {
        debug_assert_eq!(cells.len(), size * size);
        debug_assert_eq!(row_targets.len(), size);
        debug_assert_eq!(col_targets.len(), size);
        Self {
            size,
            max_ship_len,
            cells,
            row_targets,
            col_targets,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn max_ship_len(&self) -> u32 {
        self.max_ship_len
    }

    /// Set `K`; values below 1 are raised to 1
    pub fn set_max_ship_len(&mut self, k: u32) {
        self.max_ship_len = k.max(1);
    }

    fn index(&self, pos: Position) -> usize {
        assert!(
            pos.row < self.size && pos.col < self.size,
            "position ({}, {}) outside {}x{} board",
            pos.row,
            pos.col,
            self.size,
            self.size
        );
        pos.row * self.size + pos.col
    }

    pub fn cell(&self, pos: Position) -> Cell {
        self.cells[self.index(pos)]
    }

    /// Direct assignment (keyboard shortcuts)
    pub fn set_cell(&mut self, pos: Position, cell: Cell) {
        let idx = self.index(pos);
        self.cells[idx] = cell;
    }

    /// Unknown <-> Water flip; ship states stay as they are
    pub fn toggle(&mut self, pos: Position) -> Cell {
        let idx = self.index(pos);
        self.cells[idx] = self.cells[idx].toggled();
        self.cells[idx]
    }

    /// Advance through the ship cycle
    pub fn cycle(&mut self, pos: Position) -> Cell {
        let idx = self.index(pos);
        self.cells[idx] = self.cells[idx].cycled();
        self.cells[idx]
    }

    /// Row-major view of all cells
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn row(&self, row: usize) -> &[Cell] {
        let start = self.index(Position::new(row, 0));
        &self.cells[start..start + self.size]
    }

    pub fn row_targets(&self) -> &[u32] {
        &self.row_targets
    }

    pub fn col_targets(&self) -> &[u32] {
        &self.col_targets
    }

    pub fn row_target(&self, row: usize) -> u32 {
        self.row_targets[row]
    }

    pub fn col_target(&self, col: usize) -> u32 {
        self.col_targets[col]
    }

    /// Store a row target, clamping negatives to 0
    pub fn set_row_target(&mut self, row: usize, value: i64) {
        self.row_targets[row] = clamp_target(value);
    }

    /// Store a column target, clamping negatives to 0
    pub fn set_col_target(&mut self, col: usize, value: i64) {
        self.col_targets[col] = clamp_target(value);
    }

    pub fn adjust_row_target(&mut self, row: usize, delta: i64) -> u32 {
        let value = self.row_targets[row] as i64 + delta;
        self.set_row_target(row, value);
        self.row_targets[row]
    }

    pub fn adjust_col_target(&mut self, col: usize, delta: i64) -> u32 {
        let value = self.col_targets[col] as i64 + delta;
        self.set_col_target(col, value);
        self.col_targets[col]
    }

    /// Number of occupied cells in a row
    pub fn occupied_in_row(&self, row: usize) -> u32 {
        self.row(row).iter().filter(|c| c.is_occupied()).count() as u32
    }

    /// Number of occupied cells in a column
    pub fn occupied_in_col(&self, col: usize) -> u32 {
        (0..self.size)
            .filter(|&row| self.cell(Position::new(row, col)).is_occupied())
            .count() as u32
    }

    /// Overwrite every target with the occupied count of its line
    pub fn recalculate_targets(&mut self) {
        self.row_targets = (0..self.size).map(|r| self.occupied_in_row(r)).collect();
        self.col_targets = (0..self.size).map(|c| self.occupied_in_col(c)).collect();
    }

    /// Reallocate to `new_size`, keeping the overlapping top-left block of
    /// cells and the overlapping prefix of each target list.
    pub fn resize(&mut self, new_size: usize) {
        assert!(
            (MIN_SIZE..=MAX_SIZE).contains(&new_size),
            "board size {} outside {}..={}",
            new_size,
            MIN_SIZE,
            MAX_SIZE
        );
        let keep = self.size.min(new_size);

        let mut cells = vec![Cell::Unknown; new_size * new_size];
        for row in 0..keep {
            let src = row * self.size;
            let dst = row * new_size;
            cells[dst..dst + keep].copy_from_slice(&self.cells[src..src + keep]);
        }

        self.row_targets.resize(new_size, 0);
        self.col_targets.resize(new_size, 0);
        self.cells = cells;
        self.size = new_size;
    }
}

fn clamp_target(value: i64) -> u32 {
    value.clamp(0, u32::MAX as i64) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(size: usize) -> Puzzle {
        let mut puzzle = Puzzle::new(size, 3);
        for row in 0..size {
            for col in 0..size {
                let cell = Cell::ALL[(row * 3 + col) % Cell::ALL.len()];
                puzzle.set_cell(Position::new(row, col), cell);
            }
            puzzle.set_row_target(row, row as i64 + 1);
            puzzle.set_col_target(row, (size - row) as i64);
        }
        puzzle
    }

    #[test]
    fn test_new_puzzle_is_blank() {
        let puzzle = Puzzle::new(4, 2);
        assert_eq!(puzzle.size(), 4);
        assert!(puzzle.cells().iter().all(|c| *c == Cell::Unknown));
        assert_eq!(puzzle.row_targets(), &[0, 0, 0, 0]);
        assert_eq!(puzzle.col_targets(), &[0, 0, 0, 0]);
    }

    #[test]
    fn test_resize_preserves_overlap() {
        for (from, to) in [(5, 8), (8, 5), (6, 6), (2, 9), (9, 2)] {
            let original = sample(from);
            let mut resized = original.clone();
            resized.resize(to);
            let keep = from.min(to);

            assert_eq!(resized.size(), to);
            assert_eq!(resized.row_targets().len(), to);
            assert_eq!(resized.col_targets().len(), to);
            for row in 0..to {
                for col in 0..to {
                    let pos = Position::new(row, col);
                    if row < keep && col < keep {
                        assert_eq!(resized.cell(pos), original.cell(pos));
                    } else {
                        assert_eq!(resized.cell(pos), Cell::Unknown);
                    }
                }
            }
            for i in 0..to {
                if i < keep {
                    assert_eq!(resized.row_target(i), original.row_target(i));
                    assert_eq!(resized.col_target(i), original.col_target(i));
                } else {
                    assert_eq!(resized.row_target(i), 0);
                    assert_eq!(resized.col_target(i), 0);
                }
            }
        }
    }

    #[test]
    fn test_negative_targets_clamp_to_zero() {
        let mut puzzle = Puzzle::new(3, 2);
        puzzle.set_row_target(0, -4);
        puzzle.set_col_target(1, -1);
        assert_eq!(puzzle.row_target(0), 0);
        assert_eq!(puzzle.col_target(1), 0);

        puzzle.set_row_target(2, 1);
        assert_eq!(puzzle.adjust_row_target(2, -3), 0);
        assert_eq!(puzzle.adjust_col_target(2, 2), 2);
    }

    #[test]
    fn test_toggle_and_cycle() {
        let mut puzzle = Puzzle::new(3, 2);
        let pos = Position::new(1, 2);
        assert_eq!(puzzle.toggle(pos), Cell::Water);
        assert_eq!(puzzle.cycle(pos), Cell::ShipBody);
        assert_eq!(puzzle.toggle(pos), Cell::ShipBody);
        assert_eq!(puzzle.cycle(pos), Cell::ShipUp);
    }

    #[test]
    fn test_recalculate_targets() {
        let mut puzzle = Puzzle::new(3, 2);
        puzzle.set_cell(Position::new(0, 0), Cell::ShipLeft);
        puzzle.set_cell(Position::new(0, 1), Cell::ShipRight);
        puzzle.set_cell(Position::new(2, 1), Cell::ShipSingle);
        puzzle.set_cell(Position::new(1, 1), Cell::Water);
        puzzle.set_row_target(1, 5);

        puzzle.recalculate_targets();
        assert_eq!(puzzle.row_targets(), &[2, 0, 1]);
        assert_eq!(puzzle.col_targets(), &[1, 2, 0]);
    }

    #[test]
    fn test_max_ship_len_floor() {
        let mut puzzle = Puzzle::new(3, 0);
        assert_eq!(puzzle.max_ship_len(), 1);
        puzzle.set_max_ship_len(5);
        assert_eq!(puzzle.max_ship_len(), 5);
    }

    #[test]
    fn test_serialization() {
        let puzzle = sample(4);
        let json = serde_json::to_string(&puzzle).unwrap();
        let loaded: Puzzle = serde_json::from_str(&json).unwrap();
        assert_eq!(loaded, puzzle);
    }

    #[test]
    fn test_deserialize_rejects_bad_shape() {
        let good = serde_json::to_value(Puzzle::new(2, 2)).unwrap();

        let mut short_cells = good.clone();
        short_cells["cells"].as_array_mut().unwrap().pop();
        let err = serde_json::from_value::<Puzzle>(short_cells).unwrap_err();
        assert!(err.to_string().contains("cells has 3 entries, expected 4"), "{}", err);

        let mut long_targets = good.clone();
        long_targets["col_targets"].as_array_mut().unwrap().push(0.into());
        assert!(serde_json::from_value::<Puzzle>(long_targets).is_err());

        let mut too_big = good.clone();
        too_big["size"] = 81.into();
        let err = serde_json::from_value::<Puzzle>(too_big).unwrap_err();
        assert!(err.to_string().contains("board size 81"), "{}", err);

        let mut no_ships = good.clone();
        no_ships["max_ship_len"] = 0.into();
        assert!(serde_json::from_value::<Puzzle>(no_ships).is_err());

        // a consistent puzzle still loads, and loaded puzzles stay usable
        let mut loaded: Puzzle = serde_json::from_value(good).unwrap();
        loaded.toggle(Position::new(1, 1));
        assert_eq!(loaded.occupied_in_col(1), 0);
    }

    #[test]
    #[should_panic(expected = "outside")]
    fn test_out_of_range_panics() {
        let puzzle = Puzzle::new(3, 2);
        puzzle.cell(Position::new(3, 0));
    }
}
