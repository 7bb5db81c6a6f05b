//! Board module - the match-3 engine.
//!
//! Pure game logic with no I/O: grid types, match detection, scoring,
//! the player name buffer and the cascade iterator.

pub mod cascade;
pub mod engine;
pub mod grid;
pub mod matcher;
pub mod name;
pub mod scoring;

pub use cascade::{Cascade, CascadePhase, CascadeStep, CascadeSummary};
pub use engine::{Engine, MoveOutcome, SwapOutcome};
pub use grid::{
    BOARD_CELLS, BOARD_COLS, BOARD_ROWS, Board, Cell, Color, Move, MoveError, NUM_COLORS, Pos,
};
pub use matcher::{MIN_RUN, MatchMask, find_matches, has_match};
pub use name::{DEFAULT_PLAYER_NAME, NAME_CHUNK_LEN, NAME_LEN, PlayerName};
pub use scoring::score_for_count;
