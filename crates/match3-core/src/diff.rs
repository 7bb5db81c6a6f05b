//! Incremental board updates for the host display.
//!
//! The notifier remembers the last board the host has seen and turns a new
//! board into `0x16` cell frames for the cells that differ.

use crate::board::{Board, Cell, Pos};
use crate::protocol::{Frame, RSP_CELL, STATUS_OK};

/// Cell update frame `[0x16, r, c, color, 0xAA]`.
pub fn cell_frame(pos: Pos, cell: Cell) -> Frame {
    Frame::new(RSP_CELL, pos.row, pos.col, cell.raw(), STATUS_OK)
}

/// Tracks the host's view of the board.
#[derive(Debug, Clone)]
pub struct DiffNotifier {
    snapshot: Board,
}

impl DiffNotifier {
    pub fn new(seen: Board) -> Self {
        Self { snapshot: seen }
    }

    /// Record `board` as seen without emitting anything.
    pub fn observe(&mut self, board: &Board) {
        self.snapshot = *board;
    }

    pub fn snapshot(&self) -> &Board {
        &self.snapshot
    }

    /// Cells of `board` that differ from the snapshot, row-major.
    pub fn changes<'a>(&'a self, board: &'a Board) -> impl Iterator<Item = (Pos, Cell)> + 'a {
        board
            .iter()
            .zip(self.snapshot.iter())
            .filter(|((_, now), (_, seen))| now != seen)
            .map(|((pos, now), _)| (pos, now))
    }

    /// Frames for every changed cell; the snapshot becomes `board`.
    pub fn diff(&mut self, board: &Board) -> Vec<Frame> {
        let frames = self
            .changes(board)
            .map(|(pos, cell)| cell_frame(pos, cell))
            .collect();
        self.snapshot = *board;
        frames
    }

    /// Frames for all 64 cells; the snapshot becomes `board`.
    pub fn full(&mut self, board: &Board) -> Vec<Frame> {
        self.snapshot = *board;
        board.iter().map(|(pos, cell)| cell_frame(pos, cell)).collect()
    }
}

impl Default for DiffNotifier {
    fn default() -> Self {
        Self::new(Board::empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Color;

    fn tile(value: u8) -> Cell {
        Cell::Tile(Color::new(value).unwrap())
    }

    #[test]
    fn test_no_change_no_frames() {
        let board = Board::from_raw(&[2u8; 64]).unwrap();
        let mut notifier = DiffNotifier::new(board);
        assert!(notifier.diff(&board).is_empty());
    }

    #[test]
    fn test_only_changed_cells_are_sent() {
        let before = Board::from_raw(&[2u8; 64]).unwrap();
        let mut after = before;
        after.set(Pos::new(0, 1), Cell::Empty);
        after.set(Pos::new(7, 7), tile(5));

        let mut notifier = DiffNotifier::new(before);
        let frames = notifier.diff(&after);
        assert_eq!(
            frames,
            vec![
                Frame::new(RSP_CELL, 0, 1, 0, STATUS_OK),
                Frame::new(RSP_CELL, 7, 7, 5, STATUS_OK),
            ]
        );
        assert_eq!(notifier.snapshot(), &after);
        assert!(notifier.diff(&after).is_empty());
    }

    #[test]
    fn test_full_sends_every_cell() {
        let board = Board::from_raw(&[3u8; 64]).unwrap();
        let mut notifier = DiffNotifier::default();
        let frames = notifier.full(&board);
        assert_eq!(frames.len(), 64);
        assert_eq!(frames[9], Frame::new(RSP_CELL, 1, 1, 3, STATUS_OK));
        assert!(notifier.diff(&board).is_empty());
    }
}
