//! Wire constants for the board's serial protocol.
//!
//! Every packet in both directions is six bytes: a command byte, four
//! argument bytes and a CRC-8 over the first five.

// ============================================================================
// Framing
// ============================================================================

/// Length of every frame on the wire.
pub const FRAME_LEN: usize = 6;
/// Bytes covered by the checksum.
pub const PAYLOAD_LEN: usize = FRAME_LEN - 1;

/// Idle gap after which a partial frame is discarded.
pub const DEFAULT_FRAME_TIMEOUT_MS: u32 = 10;
/// Pause between consecutive diff frames.
pub const DEFAULT_FRAME_GAP_MS: u32 = 2;
/// Pause between cascade animation steps.
pub const DEFAULT_ANIM_STEP_MS: u32 = 300;

// ============================================================================
// Requests (Host -> Device)
// ============================================================================

/// Deal a fresh board.
pub const CMD_NEW_GAME: u8 = 0x10;
/// Swap two cells: `a,b` = first cell, `c,d` = second cell.
pub const CMD_SWAP: u8 = 0x11;
/// End the game now and record the score.
pub const CMD_FORCE_FINISH: u8 = 0x12;
/// Read one cell: `a` = row, `b` = col.
pub const CMD_GET_CELL: u8 = 0x14;
/// Read the score.
pub const CMD_GET_SCORE: u8 = 0x15;
/// Write three name bytes: `a` = chunk index, `b,c,d` = bytes.
pub const CMD_SET_NAME: u8 = 0x20;
/// Save to slot `a`.
pub const CMD_SAVE: u8 = 0x30;
/// Load slot `a`.
pub const CMD_LOAD: u8 = 0x31;
/// Read the player name stored in slot `a`.
pub const CMD_QUERY_SLOT: u8 = 0x32;
/// Read the leaderboard.
pub const CMD_LEADERBOARD: u8 = 0x40;

// ============================================================================
// Responses (Device -> Host)
// ============================================================================

/// Unsolicited cell update: `[0x16, r, c, color, 0xAA]`.
pub const RSP_CELL: u8 = 0x16;
/// Name chunk sent while loading a slot: `[0x32, i, n0, n1, n2]`.
pub const RSP_LOAD_NAME: u8 = 0x32;
/// First of the four slot-name chunk codes (`0x33..=0x36`).
pub const RSP_SLOT_NAME_BASE: u8 = 0x33;
/// Number of chunk frames answering a slot-name query.
pub const SLOT_NAME_CHUNKS: usize = 4;
/// Leaderboard name chunks 0..3, 3..6, 6..9 and the single byte 9.
pub const RSP_LB_NAME_0: u8 = 0x41;
pub const RSP_LB_NAME_1: u8 = 0x43;
pub const RSP_LB_NAME_2: u8 = 0x44;
pub const RSP_LB_NAME_3: u8 = 0x45;
/// Leaderboard score, low 24 bits big-endian.
pub const RSP_LB_SCORE: u8 = 0x42;
/// Checksum mismatch diagnostic: `[0xEE, computed, received, 0xEE, 0xEE]`.
pub const RSP_BAD_CRC: u8 = 0xEE;

// ============================================================================
// Status bytes (argument `d`)
// ============================================================================

pub const STATUS_OK: u8 = 0xAA;
pub const STATUS_FAIL: u8 = 0xEE;
/// Board has no remaining moves.
pub const STATUS_DEADLOCK: u8 = 0xDD;
/// Command byte not recognised.
pub const STATUS_UNKNOWN: u8 = 0xFF;

/// Name chunk frames sent while loading a slot.
pub const LOAD_NAME_CHUNKS: u8 = 6;
