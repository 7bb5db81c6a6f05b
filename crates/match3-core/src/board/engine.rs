//! Board engine: owns the grid, the score and the current player name.
//!
//! The engine has no I/O. Everything observable about a move (cleared
//! cells, falling tiles, refills, chain reactions) is exposed through the
//! return values of [`Engine::swap`] and the [`Cascade`] iterator.

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use tracing::{debug, trace};

use super::cascade::{Cascade, CascadeSummary};
use super::grid::{BOARD_COLS, BOARD_ROWS, Board, Cell, Color, Move, MoveError, NUM_COLORS, Pos};
use super::matcher::{find_matches, has_match};
use super::name::{DEFAULT_PLAYER_NAME, PlayerName};
use super::scoring::score_for_count;

/// Upper bound on rejection-sampling draws for one cell during `init`.
const MAX_COLOR_DRAWS: u32 = 32;

/// Result of a committed swap, before the cascade runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapOutcome {
    /// Cells cleared by the swap itself.
    pub removed: u32,
    /// Points awarded for those cells.
    pub points: u32,
}

/// Result of [`Engine::play`]: the swap plus its whole cascade.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveOutcome {
    pub swap: SwapOutcome,
    pub cascade: CascadeSummary,
}

impl MoveOutcome {
    pub fn total_points(&self) -> u32 {
        self.swap.points + self.cascade.points
    }
}

/// The match-3 engine.
pub struct Engine {
    board: Board,
    score: u32,
    name: PlayerName,
    rng: Pcg32,
    /// Final score already offered to the leaderboard.
    finished: bool,
}

impl Engine {
    /// Create an engine and deal a fresh board.
    ///
    /// `seed` makes the color sequence reproducible; `None` seeds from the
    /// OS.
    pub fn new(seed: Option<u64>) -> Self {
        let mut engine = Self::with_board(Board::empty(), seed);
        engine.init();
        engine
    }

    /// Create an engine around an existing board (score 0).
    pub fn with_board(board: Board, seed: Option<u64>) -> Self {
        let seed = seed.unwrap_or_else(rand::random);
        Self {
            board,
            score: 0,
            finished: false,
            name: PlayerName::new(DEFAULT_PLAYER_NAME),
            rng: Pcg32::seed_from_u64(seed),
        }
    }

    /// Reset the score and deal a board with no run of three.
    ///
    /// Each cell is drawn uniformly and redrawn while it would complete a
    /// run with the two cells to its left or the two cells above it.
    pub fn init(&mut self) {
        self.score = 0;
        self.finished = false;
        self.board = Board::empty();
        for row in 0..BOARD_ROWS {
            for col in 0..BOARD_COLS {
                let color = self.draw_start_color(row, col);
                self.board.put(row, col, Cell::Tile(color));
            }
        }
        debug!(board = %self.board, "Board initialized");
    }

    fn draw_start_color(&mut self, row: usize, col: usize) -> Color {
        for _ in 0..MAX_COLOR_DRAWS {
            let color = self.random_color();
            if self.start_color_allowed(row, col, color) {
                return color;
            }
        }
        // At most two colors can be excluded, so this always finds one.
        Color::all()
            .find(|&color| self.start_color_allowed(row, col, color))
            .unwrap_or(Color::from_index(0))
    }

    fn start_color_allowed(&self, row: usize, col: usize, color: Color) -> bool {
        let tile = Cell::Tile(color);
        let left = col >= 2 && self.board.at(row, col - 1) == tile && self.board.at(row, col - 2) == tile;
        let above = row >= 2 && self.board.at(row - 1, col) == tile && self.board.at(row - 2, col) == tile;
        !left && !above
    }

    fn random_color(&mut self) -> Color {
        Color::from_index(self.rng.random_range(0..NUM_COLORS as usize))
    }

    /// Attempt a swap.
    ///
    /// On success the swap is committed, matched cells are cleared to empty
    /// and scored, and the board is left with holes for [`Engine::cascade`]
    /// to resolve. On failure the board is unchanged.
    pub fn swap(&mut self, mv: Move) -> Result<SwapOutcome, MoveError> {
        mv.validate()?;

        self.board.swap_cells(mv.from, mv.to);
        match self.clear_matches() {
            Some((removed, points)) => {
                debug!(mv = %mv, removed, points, score = self.score, "Swap committed");
                Ok(SwapOutcome { removed, points })
            }
            None => {
                self.board.swap_cells(mv.from, mv.to);
                trace!(mv = %mv, "Swap reverted");
                Err(MoveError::NoMatch {
                    from: mv.from,
                    to: mv.to,
                })
            }
        }
    }

    /// Lazily resolve the board after a committed swap.
    pub fn cascade(&mut self) -> Cascade<'_> {
        Cascade::new(self)
    }

    /// Run gravity, refill and match removal until the board is stable.
    pub fn run_gravity_cascade(&mut self) -> CascadeSummary {
        let summary = self.cascade().finish();
        debug!(
            passes = summary.passes,
            removed = summary.removed,
            points = summary.points,
            "Cascade finished"
        );
        summary
    }

    /// Swap and fully resolve.
    pub fn play(&mut self, mv: Move) -> Result<MoveOutcome, MoveError> {
        let swap = self.swap(mv)?;
        let cascade = self.run_gravity_cascade();
        Ok(MoveOutcome { swap, cascade })
    }

    /// Whether any single adjacent swap would create a match.
    ///
    /// Every cell is tried against its right and bottom neighbour on a
    /// scratch copy; the live board is never touched.
    pub fn has_possible_moves(&self) -> bool {
        self.hint().is_some()
    }

    /// First adjacent swap (row-major, right before down) that would create a
    /// match.
    pub fn hint(&self) -> Option<Move> {
        let mut scratch = self.board;
        for row in 0..BOARD_ROWS as u8 {
            for col in 0..BOARD_COLS as u8 {
                let here = Pos::new(row, col);
                let neighbours = [Pos::new(row, col + 1), Pos::new(row + 1, col)];
                for there in neighbours.into_iter().filter(|p| p.in_bounds()) {
                    scratch.swap_cells(here, there);
                    let matched = has_match(&scratch);
                    scratch.swap_cells(here, there);
                    if matched {
                        return Some(Move { from: here, to: there });
                    }
                }
            }
        }
        None
    }

    /// Compact every column toward the bottom, preserving tile order.
    pub(crate) fn apply_gravity(&mut self) {
        for col in 0..BOARD_COLS {
            let mut write_row = BOARD_ROWS;
            for read_row in (0..BOARD_ROWS).rev() {
                let cell = self.board.at(read_row, col);
                if cell.is_empty() {
                    continue;
                }
                write_row -= 1;
                if write_row != read_row {
                    self.board.put(write_row, col, cell);
                    self.board.put(read_row, col, Cell::Empty);
                }
            }
        }
    }

    /// Fill every empty cell with a fresh random color. Refills may form
    /// matches.
    pub(crate) fn refill(&mut self) {
        for row in 0..BOARD_ROWS {
            for col in 0..BOARD_COLS {
                if self.board.at(row, col).is_empty() {
                    let color = self.random_color();
                    self.board.put(row, col, Cell::Tile(color));
                }
            }
        }
    }

    /// Clear every matched cell and award points. Returns `None` when the
    /// board has no match.
    pub(crate) fn clear_matches(&mut self) -> Option<(u32, u32)> {
        let mask = find_matches(&self.board);
        if mask.is_empty() {
            return None;
        }
        for pos in mask.positions() {
            self.board.set(pos, Cell::Empty);
        }
        let removed = mask.count();
        let points = score_for_count(removed);
        self.score = self.score.saturating_add(points);
        Some((removed, points))
    }

    /// Cell at `pos`, `None` when out of range.
    pub fn cell(&self, pos: Pos) -> Option<Cell> {
        self.board.get(pos)
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn player_name(&self) -> &PlayerName {
        &self.name
    }

    pub fn player_name_mut(&mut self) -> &mut PlayerName {
        &mut self.name
    }

    pub fn set_player_name(&mut self, name: PlayerName) {
        self.name = name;
    }

    /// Replace score, name and board wholesale (restoring a save).
    pub fn load_state(&mut self, score: u32, name: PlayerName, board: Board) {
        self.score = score;
        self.name = name;
        self.board = board;
        self.finished = false;
    }

    /// Whether this game's score has been recorded. Cleared by
    /// [`Engine::init`] and [`Engine::load_state`].
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn mark_finished(&mut self) {
        self.finished = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::matcher::find_matches;
    use proptest::prelude::*;

    // Rows of two alternating colors shifted each row: no runs, and a single
    // planted pattern decides what moves exist.
    fn stripes() -> [[u8; 8]; 8] {
        let mut rows = [[0u8; 8]; 8];
        for (r, row) in rows.iter_mut().enumerate() {
            for (c, cell) in row.iter_mut().enumerate() {
                *cell = if (r + c) % 2 == 0 { 1 } else { 2 };
            }
        }
        rows
    }

    fn engine_with(rows: [[u8; 8]; 8]) -> Engine {
        Engine::with_board(Board::from_rows(rows).unwrap(), Some(7))
    }

    #[test]
    fn test_init_has_no_runs() {
        for seed in 0..50 {
            let engine = Engine::new(Some(seed));
            assert!(find_matches(engine.board()).is_empty(), "seed {seed}");
            assert_eq!(engine.board().empty_count(), 0);
            assert_eq!(engine.score(), 0);
        }
    }

    #[test]
    fn test_non_adjacent_swap_is_rejected() {
        let mut engine = Engine::new(Some(1));
        let before = *engine.board();
        let err = engine.swap(Move::new(0, 0, 2, 0)).unwrap_err();
        assert!(matches!(err, MoveError::NotAdjacent { .. }));
        assert_eq!(*engine.board(), before);
    }

    #[test]
    fn test_out_of_range_swap_is_rejected() {
        let mut engine = Engine::new(Some(1));
        let before = *engine.board();
        let err = engine.swap(Move::new(7, 7, 7, 8)).unwrap_err();
        assert!(matches!(err, MoveError::OutOfBounds { .. }));
        assert_eq!(*engine.board(), before);
    }

    #[test]
    fn test_swap_without_match_reverts() {
        let mut engine = engine_with(stripes());
        let before = *engine.board();
        let err = engine.swap(Move::new(0, 0, 0, 1)).unwrap_err();
        assert!(matches!(err, MoveError::NoMatch { .. }));
        assert_eq!(*engine.board(), before);
        assert_eq!(engine.score(), 0);
    }

    // Row 7 reads 3 3 4 with a 3 above the 4: swapping (6,2) down makes
    // exactly one run of three.
    fn planted_three() -> [[u8; 8]; 8] {
        let mut rows = stripes();
        rows[7][0] = 3;
        rows[7][1] = 3;
        rows[7][2] = 4;
        rows[6][2] = 3;
        rows
    }

    #[test]
    fn test_swap_clears_and_scores_three() {
        let mut engine = engine_with(planted_three());
        let outcome = engine.swap(Move::new(6, 2, 7, 2)).unwrap();
        assert_eq!(outcome, SwapOutcome { removed: 3, points: 30 });
        assert_eq!(engine.score(), 30);
        assert_eq!(engine.cell(Pos::new(6, 2)), Some(Cell::from_raw(4).unwrap()));
        for col in 0..3 {
            assert_eq!(engine.cell(Pos::new(7, col)), Some(Cell::Empty));
        }
    }

    #[test]
    fn test_swap_clears_and_scores_four() {
        let mut rows = stripes();
        // Row 7: 3 3 4 3 -> moving (6,2) down into (7,2) completes 3 3 3 3.
        rows[7][0] = 3;
        rows[7][1] = 3;
        rows[7][3] = 3;
        rows[6][2] = 3;
        rows[7][2] = 4;
        let mut engine = engine_with(rows);

        let outcome = engine.swap(Move::new(6, 2, 7, 2)).unwrap();
        assert_eq!(outcome.removed, 4);
        assert_eq!(outcome.points, 60);
        assert_eq!(engine.score(), 60);
        assert_eq!(engine.cell(Pos::new(7, 0)), Some(Cell::Empty));
        assert_eq!(engine.cell(Pos::new(7, 3)), Some(Cell::Empty));
    }

    #[test]
    fn test_gravity_preserves_column_order() {
        let mut rows = stripes();
        rows[5][4] = 0;
        rows[7][4] = 0;
        let mut engine = engine_with(rows);
        let column_before: Vec<Cell> = (0..8)
            .map(|r| engine.cell(Pos::new(r, 4)).unwrap())
            .filter(|c| !c.is_empty())
            .collect();

        engine.apply_gravity();

        assert_eq!(engine.cell(Pos::new(0, 4)), Some(Cell::Empty));
        assert_eq!(engine.cell(Pos::new(1, 4)), Some(Cell::Empty));
        let column_after: Vec<Cell> = (2..8).map(|r| engine.cell(Pos::new(r, 4)).unwrap()).collect();
        assert_eq!(column_before, column_after);
        // Other columns untouched.
        assert_eq!(engine.cell(Pos::new(0, 3)), Some(Cell::from_raw(2).unwrap()));
    }

    #[test]
    fn test_cascade_leaves_stable_full_board() {
        let mut engine = engine_with(planted_three());
        engine.swap(Move::new(6, 2, 7, 2)).unwrap();

        let steps: Vec<_> = engine.cascade().collect();
        assert!(steps.len() >= 2);
        assert_eq!(steps[0].phase, crate::board::CascadePhase::Gravity);
        assert_eq!(steps[1].phase, crate::board::CascadePhase::Refill);
        assert_eq!(engine.board().empty_count(), 0);
        assert!(find_matches(engine.board()).is_empty());
    }

    #[test]
    fn test_has_possible_moves_on_deadlock() {
        // Four colors tiled so no single swap lines up three.
        let mut rows = [[0u8; 8]; 8];
        for (r, row) in rows.iter_mut().enumerate() {
            for (c, cell) in row.iter_mut().enumerate() {
                *cell = [1, 2, 3, 4][(c + 2 * (r % 2)) % 4];
            }
        }
        let engine = engine_with(rows);
        assert!(find_matches(engine.board()).is_empty());
        assert!(!engine.has_possible_moves());
        assert_eq!(engine.hint(), None);
    }

    #[test]
    fn test_hint_finds_planted_move() {
        let mut rows = stripes();
        rows[0][0] = 5;
        rows[0][1] = 5;
        rows[1][2] = 5;
        let engine = engine_with(rows);
        let before = *engine.board();
        let hint = engine.hint().unwrap();
        assert_eq!(hint, Move::new(0, 2, 1, 2));
        assert!(engine.has_possible_moves());
        assert_eq!(*engine.board(), before);
    }

    #[test]
    fn test_play_accumulates_score() {
        let mut engine = engine_with(planted_three());
        let outcome = engine.play(Move::new(6, 2, 7, 2)).unwrap();
        assert_eq!(outcome.swap.points, 30);
        assert_eq!(engine.score(), outcome.total_points());
    }

    #[test]
    fn test_finished_flag_clears_with_a_new_game() {
        let mut engine = engine_with(planted_three());
        assert!(!engine.is_finished());
        engine.mark_finished();
        assert!(engine.is_finished());
        engine.init();
        assert!(!engine.is_finished());

        engine.mark_finished();
        let board = *engine.board();
        engine.load_state(40, PlayerName::default(), board);
        assert!(!engine.is_finished());
    }

    proptest! {
        #[test]
        fn prop_init_never_deals_a_run(seed in any::<u64>()) {
            let engine = Engine::new(Some(seed));
            prop_assert!(find_matches(engine.board()).is_empty());
        }

        #[test]
        fn prop_move_search_is_side_effect_free(seed in any::<u64>()) {
            let engine = Engine::new(Some(seed));
            let before = *engine.board();
            for _ in 0..3 {
                engine.has_possible_moves();
            }
            prop_assert_eq!(*engine.board(), before);
        }

        #[test]
        fn prop_failed_swap_keeps_board(
            seed in any::<u64>(),
            r1 in 0u8..10, c1 in 0u8..10, r2 in 0u8..10, c2 in 0u8..10,
        ) {
            let mut engine = Engine::new(Some(seed));
            let before = *engine.board();
            let score = engine.score();
            if engine.swap(Move::new(r1, c1, r2, c2)).is_err() {
                prop_assert_eq!(*engine.board(), before);
                prop_assert_eq!(engine.score(), score);
            }
        }

        #[test]
        fn prop_resolved_board_is_stable(seed in any::<u64>()) {
            let mut engine = Engine::new(Some(seed));
            if let Some(mv) = engine.hint() {
                engine.play(mv).unwrap();
                prop_assert!(find_matches(engine.board()).is_empty());
                prop_assert_eq!(engine.board().empty_count(), 0);
                prop_assert!(engine.score() >= 30);
            }
        }

        #[test]
        fn prop_no_moves_means_no_swap_matches(seed in any::<u64>()) {
            let engine = Engine::new(Some(seed));
            let expected = (0..8u8).any(|r| (0..8u8).any(|c| {
                [Move::new(r, c, r, c + 1), Move::new(r, c, r + 1, c)]
                    .into_iter()
                    .filter(|m| m.validate().is_ok())
                    .any(|m| {
                        let mut scratch = *engine.board();
                        scratch.swap_cells(m.from, m.to);
                        !find_matches(&scratch).is_empty()
                    })
            }));
            prop_assert_eq!(engine.has_possible_moves(), expected);
        }
    }
}
