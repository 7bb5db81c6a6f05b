//! Board grid, cell and coordinate types.
//!
//! The board is a fixed 8x8 grid stored as a flat row-major array.
//! Coordinates are `(row, col)` with row 0 at the top; gravity pulls
//! tiles toward row 7.

use std::fmt;

use thiserror::Error;

/// Number of rows on the board.
pub const BOARD_ROWS: usize = 8;
/// Number of columns on the board.
pub const BOARD_COLS: usize = 8;
/// Total number of cells.
pub const BOARD_CELLS: usize = BOARD_ROWS * BOARD_COLS;
/// Number of distinct tile colors (colors are `1..=NUM_COLORS`).
pub const NUM_COLORS: u8 = 6;

/// A tile color in `1..=NUM_COLORS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Color(u8);

impl Color {
    /// Create a color from its wire value. Returns `None` outside `1..=6`.
    pub const fn new(value: u8) -> Option<Self> {
        if value >= 1 && value <= NUM_COLORS {
            Some(Self(value))
        } else {
            None
        }
    }

    /// Wire value of the color.
    pub const fn get(self) -> u8 {
        self.0
    }

    /// Color for a zero-based index, wrapping modulo `NUM_COLORS`.
    pub const fn from_index(index: usize) -> Self {
        Self((index % NUM_COLORS as usize) as u8 + 1)
    }

    /// All colors in ascending order.
    pub fn all() -> impl Iterator<Item = Color> {
        (1..=NUM_COLORS).map(Color)
    }
}

/// A single board cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Cell {
    #[default]
    Empty,
    Tile(Color),
}

impl Cell {
    /// Decode a raw cell byte (0 = empty). Returns `None` for values above
    /// `NUM_COLORS`.
    pub const fn from_raw(value: u8) -> Option<Self> {
        if value == 0 {
            return Some(Cell::Empty);
        }
        match Color::new(value) {
            Some(color) => Some(Cell::Tile(color)),
            None => None,
        }
    }

    /// Raw cell byte as sent on the wire and stored in flash.
    pub const fn raw(self) -> u8 {
        match self {
            Cell::Empty => 0,
            Cell::Tile(color) => color.get(),
        }
    }

    pub const fn color(self) -> Option<Color> {
        match self {
            Cell::Empty => None,
            Cell::Tile(color) => Some(color),
        }
    }

    pub const fn is_empty(self) -> bool {
        matches!(self, Cell::Empty)
    }
}

/// Grid coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Pos {
    pub row: u8,
    pub col: u8,
}

impl Pos {
    pub const fn new(row: u8, col: u8) -> Self {
        Self { row, col }
    }

    /// Whether the coordinate lies on the board.
    pub const fn in_bounds(self) -> bool {
        (self.row as usize) < BOARD_ROWS && (self.col as usize) < BOARD_COLS
    }

    /// Flat row-major index. Only meaningful when `in_bounds()`.
    #[inline(always)]
    pub(crate) const fn index(self) -> usize {
        self.row as usize * BOARD_COLS + self.col as usize
    }

    pub(crate) const fn from_index(index: usize) -> Self {
        Self {
            row: (index / BOARD_COLS) as u8,
            col: (index % BOARD_COLS) as u8,
        }
    }

    /// Manhattan distance between two coordinates.
    pub fn distance(self, other: Pos) -> u32 {
        (self.row.abs_diff(other.row) as u32) + (self.col.abs_diff(other.col) as u32)
    }
}

impl fmt::Display for Pos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.row, self.col)
    }
}

/// Why a move was rejected.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveError {
    #[error("Coordinate out of range: {pos}")]
    OutOfBounds { pos: Pos },

    #[error("Cells {from} and {to} are not adjacent")]
    NotAdjacent { from: Pos, to: Pos },

    #[error("Swapping {from} and {to} forms no match")]
    NoMatch { from: Pos, to: Pos },
}

/// A swap request between two cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Move {
    pub from: Pos,
    pub to: Pos,
}

impl Move {
    pub const fn new(r1: u8, c1: u8, r2: u8, c2: u8) -> Self {
        Self {
            from: Pos::new(r1, c1),
            to: Pos::new(r2, c2),
        }
    }

    /// Check bounds and 4-adjacency.
    pub fn validate(&self) -> Result<(), MoveError> {
        for pos in [self.from, self.to] {
            if !pos.in_bounds() {
                return Err(MoveError::OutOfBounds { pos });
            }
        }
        if self.from.distance(self.to) != 1 {
            return Err(MoveError::NotAdjacent {
                from: self.from,
                to: self.to,
            });
        }
        Ok(())
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}<->{}", self.from, self.to)
    }
}

/// The 8x8 game board.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Board {
    cells: [Cell; BOARD_CELLS],
}

impl Board {
    /// A board with every cell empty.
    pub const fn empty() -> Self {
        Self {
            cells: [Cell::Empty; BOARD_CELLS],
        }
    }

    /// Cell at `pos`, or `None` when out of bounds.
    pub fn get(&self, pos: Pos) -> Option<Cell> {
        pos.in_bounds().then(|| self.cells[pos.index()])
    }

    /// Set the cell at `pos`. Returns false when out of bounds.
    pub fn set(&mut self, pos: Pos, cell: Cell) -> bool {
        if !pos.in_bounds() {
            return false;
        }
        self.cells[pos.index()] = cell;
        true
    }

    #[inline(always)]
    pub(crate) fn at(&self, row: usize, col: usize) -> Cell {
        self.cells[row * BOARD_COLS + col]
    }

    #[inline(always)]
    pub(crate) fn put(&mut self, row: usize, col: usize, cell: Cell) {
        self.cells[row * BOARD_COLS + col] = cell;
    }

    /// Exchange two in-bounds cells.
    pub(crate) fn swap_cells(&mut self, a: Pos, b: Pos) {
        self.cells.swap(a.index(), b.index());
    }

    /// Iterate `(pos, cell)` in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = (Pos, Cell)> + '_ {
        self.cells
            .iter()
            .enumerate()
            .map(|(i, &cell)| (Pos::from_index(i), cell))
    }

    /// Number of empty cells.
    pub fn empty_count(&self) -> usize {
        self.cells.iter().filter(|c| c.is_empty()).count()
    }

    /// Raw byte image, row-major.
    pub fn to_raw(&self) -> [u8; BOARD_CELLS] {
        let mut raw = [0u8; BOARD_CELLS];
        for (dst, cell) in raw.iter_mut().zip(self.cells.iter()) {
            *dst = cell.raw();
        }
        raw
    }

    /// Decode a raw row-major byte image. Returns `None` if the slice is
    /// not exactly 64 bytes or holds a value outside `0..=6`.
    pub fn from_raw(raw: &[u8]) -> Option<Self> {
        if raw.len() != BOARD_CELLS {
            return None;
        }
        let mut board = Self::empty();
        for (dst, &value) in board.cells.iter_mut().zip(raw) {
            *dst = Cell::from_raw(value)?;
        }
        Some(board)
    }

    /// Build a board from row arrays of raw values.
    pub fn from_rows(rows: [[u8; BOARD_COLS]; BOARD_ROWS]) -> Option<Self> {
        Self::from_raw(rows.as_flattened())
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in 0..BOARD_ROWS {
            for col in 0..BOARD_COLS {
                match self.at(row, col) {
                    Cell::Empty => write!(f, ".")?,
                    Cell::Tile(color) => write!(f, "{}", color.get())?,
                }
            }
            if row + 1 < BOARD_ROWS {
                writeln!(f)?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Board(")?;
        writeln!(f, "{}", self)?;
        write!(f, ")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_raw_roundtrip() {
        assert_eq!(Cell::from_raw(0), Some(Cell::Empty));
        assert_eq!(Cell::from_raw(6).map(Cell::raw), Some(6));
        assert_eq!(Cell::from_raw(7), None);
        assert_eq!(Cell::from_raw(0xFF), None);
    }

    #[test]
    fn test_move_validation() {
        assert!(Move::new(0, 0, 0, 1).validate().is_ok());
        assert!(Move::new(3, 3, 4, 3).validate().is_ok());
        assert_eq!(
            Move::new(0, 0, 1, 1).validate(),
            Err(MoveError::NotAdjacent {
                from: Pos::new(0, 0),
                to: Pos::new(1, 1)
            })
        );
        assert!(matches!(
            Move::new(0, 0, 0, 0).validate(),
            Err(MoveError::NotAdjacent { .. })
        ));
        assert!(matches!(
            Move::new(7, 7, 8, 7).validate(),
            Err(MoveError::OutOfBounds { .. })
        ));
    }

    #[test]
    fn test_display_renders_grid() {
        let mut board = Board::empty();
        board.set(Pos::new(0, 0), Cell::Tile(Color::new(3).unwrap()));
        let text = board.to_string();
        let first = text.lines().next().unwrap();
        assert_eq!(first, "3.......");
        assert_eq!(text.lines().count(), BOARD_ROWS);
    }

    #[test]
    fn test_from_raw_rejects_bad_values() {
        let mut raw = [1u8; BOARD_CELLS];
        assert!(Board::from_raw(&raw).is_some());
        raw[10] = 9;
        assert!(Board::from_raw(&raw).is_none());
        assert!(Board::from_raw(&raw[..10]).is_none());
    }
}
