//! Match detection.
//!
//! A match is a maximal horizontal or vertical run of three or more cells
//! of the same color. Every row is scanned, then every column; cells marked
//! by either orientation are collected in one [`MatchMask`], so a cell that
//! sits on a crossing of two runs is counted once.

use super::grid::{BOARD_CELLS, BOARD_COLS, BOARD_ROWS, Board, Cell, Pos};

/// Minimum run length that counts as a match.
pub const MIN_RUN: usize = 3;

/// Set of board cells marked for removal, one bit per cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MatchMask {
    bits: u64,
}

impl MatchMask {
    pub fn is_empty(&self) -> bool {
        self.bits == 0
    }

    /// Number of marked cells.
    pub fn count(&self) -> u32 {
        self.bits.count_ones()
    }

    pub fn contains(&self, pos: Pos) -> bool {
        pos.in_bounds() && self.bits & (1u64 << pos.index()) != 0
    }

    fn mark(&mut self, row: usize, col: usize) {
        self.bits |= 1u64 << (row * BOARD_COLS + col);
    }

    /// Marked positions in row-major order.
    pub fn positions(&self) -> impl Iterator<Item = Pos> + '_ {
        (0..BOARD_CELLS)
            .filter(|&i| self.bits & (1u64 << i) != 0)
            .map(Pos::from_index)
    }
}

/// Find every cell that belongs to a run of `MIN_RUN` or more.
pub fn find_matches(board: &Board) -> MatchMask {
    let mut mask = MatchMask::default();

    for row in 0..BOARD_ROWS {
        scan_line(BOARD_COLS, |i| board.at(row, i), |i| mask.mark(row, i));
    }
    for col in 0..BOARD_COLS {
        scan_line(BOARD_ROWS, |i| board.at(i, col), |i| mask.mark(i, col));
    }

    mask
}

/// Whether any run of `MIN_RUN` exists. Stops at the first hit.
pub fn has_match(board: &Board) -> bool {
    for row in 0..BOARD_ROWS {
        if line_has_run(BOARD_COLS, |i| board.at(row, i)) {
            return true;
        }
    }
    for col in 0..BOARD_COLS {
        if line_has_run(BOARD_ROWS, |i| board.at(i, col)) {
            return true;
        }
    }
    false
}

fn scan_line(len: usize, cell: impl Fn(usize) -> Cell, mut mark: impl FnMut(usize)) {
    let mut start = 0;
    while start < len {
        let current = cell(start);
        let mut end = start + 1;
        while end < len && cell(end) == current {
            end += 1;
        }
        if !current.is_empty() && end - start >= MIN_RUN {
            (start..end).for_each(&mut mark);
        }
        start = end;
    }
}

fn line_has_run(len: usize, cell: impl Fn(usize) -> Cell) -> bool {
    let mut run = 1;
    for i in 1..len {
        let current = cell(i);
        if !current.is_empty() && current == cell(i - 1) {
            run += 1;
            if run >= MIN_RUN {
                return true;
            }
        } else {
            run = 1;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    // Checkerboard of two colors never has a run.
    fn quiet_rows() -> [[u8; 8]; 8] {
        let mut rows = [[0u8; 8]; 8];
        for (r, row) in rows.iter_mut().enumerate() {
            for (c, cell) in row.iter_mut().enumerate() {
                *cell = if (r + c) % 2 == 0 { 1 } else { 2 };
            }
        }
        rows
    }

    #[test]
    fn test_no_match_on_checkerboard() {
        let board = Board::from_rows(quiet_rows()).unwrap();
        assert!(find_matches(&board).is_empty());
        assert!(!has_match(&board));
    }

    #[test]
    fn test_horizontal_run_of_four() {
        let mut rows = quiet_rows();
        rows[2][1..5].copy_from_slice(&[5, 5, 5, 5]);
        let board = Board::from_rows(rows).unwrap();

        let mask = find_matches(&board);
        assert_eq!(mask.count(), 4);
        assert!(mask.contains(Pos::new(2, 1)));
        assert!(mask.contains(Pos::new(2, 4)));
        assert!(!mask.contains(Pos::new(2, 5)));
        assert!(has_match(&board));
    }

    #[test]
    fn test_crossing_runs_count_shared_cell_once() {
        let mut rows = quiet_rows();
        // Horizontal 3 on row 4, vertical 3 on column 3, sharing (4,3).
        rows[4][2..5].copy_from_slice(&[6, 6, 6]);
        rows[3][3] = 6;
        rows[5][3] = 6;
        let board = Board::from_rows(rows).unwrap();

        let mask = find_matches(&board);
        assert_eq!(mask.count(), 5);
    }

    #[test]
    fn test_empty_cells_never_match() {
        let mut rows = quiet_rows();
        rows[0][0..4].copy_from_slice(&[0, 0, 0, 0]);
        let board = Board::from_rows(rows).unwrap();
        assert!(find_matches(&board).is_empty());
        assert!(!has_match(&board));
    }

    #[test]
    fn test_run_at_column_end() {
        let mut rows = quiet_rows();
        rows[5][7] = 4;
        rows[6][7] = 4;
        rows[7][7] = 4;
        let board = Board::from_rows(rows).unwrap();
        let positions: Vec<Pos> = find_matches(&board).positions().collect();
        assert_eq!(
            positions,
            vec![Pos::new(5, 7), Pos::new(6, 7), Pos::new(7, 7)]
        );
    }
}
