//! On-flash record layouts.
//!
//! All words are little-endian, matching the target MCU.
//!
//! ```text
//! SaveRecord (88 bytes)        Leaderboard (104 bytes)
//!   0  magic   u32               0  magic u32
//!   4  score   u32               4  5 x { score u32, name [u8; 16] }
//!   8  name    [u8; 16]
//!  24  board   [u8; 64]
//! ```

use std::io::{Cursor, Read};

use byteorder::{LittleEndian, ReadBytesExt};

use crate::board::{BOARD_CELLS, Board, NAME_LEN, PlayerName};

/// Marker that makes a record valid.
pub const SAVE_MAGIC: u32 = 0xABBA_1234;
/// Number of save slots.
pub const SAVE_SLOTS: u8 = 3;
/// Encoded size of one save slot.
pub const SAVE_RECORD_LEN: usize = 4 + 4 + NAME_LEN + BOARD_CELLS;
/// Encoded size of all save slots together.
pub const SAVE_AREA_LEN: usize = SAVE_RECORD_LEN * SAVE_SLOTS as usize;
/// Entries kept in the leaderboard.
pub const LEADERBOARD_LEN: usize = 5;
/// Encoded size of one leaderboard entry.
pub const LEADERBOARD_ENTRY_LEN: usize = 4 + NAME_LEN;
/// Encoded size of the leaderboard.
pub const LEADERBOARD_RECORD_LEN: usize = 4 + LEADERBOARD_LEN * LEADERBOARD_ENTRY_LEN;

/// Offset of the name field inside a save record.
pub(crate) const SAVE_NAME_OFFSET: usize = 8;

/// One save slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveRecord {
    pub score: u32,
    pub name: PlayerName,
    pub board: Board,
}

impl SaveRecord {
    pub fn encode(&self) -> [u8; SAVE_RECORD_LEN] {
        let mut out = [0u8; SAVE_RECORD_LEN];
        out[..4].copy_from_slice(&SAVE_MAGIC.to_le_bytes());
        out[4..SAVE_NAME_OFFSET].copy_from_slice(&self.score.to_le_bytes());
        out[SAVE_NAME_OFFSET..SAVE_NAME_OFFSET + NAME_LEN].copy_from_slice(self.name.as_bytes());
        out[SAVE_NAME_OFFSET + NAME_LEN..].copy_from_slice(&self.board.to_raw());
        out
    }

    /// Decode a slot. `None` when the marker is missing or the board holds
    /// values that are not colors.
    pub fn decode(bytes: &[u8]) -> Option<Self> {
        let mut cursor = Cursor::new(bytes);
        if cursor.read_u32::<LittleEndian>().ok()? != SAVE_MAGIC {
            return None;
        }
        let score = cursor.read_u32::<LittleEndian>().ok()?;
        let mut name = [0u8; NAME_LEN];
        cursor.read_exact(&mut name).ok()?;
        let mut raw = [0u8; BOARD_CELLS];
        cursor.read_exact(&mut raw).ok()?;
        Some(Self {
            score,
            name: PlayerName::from_bytes(&name),
            board: Board::from_raw(&raw)?,
        })
    }
}

/// Whether an encoded slot carries the marker.
pub fn slot_is_valid(bytes: &[u8]) -> bool {
    bytes
        .get(..4)
        .map(|m| u32::from_le_bytes([m[0], m[1], m[2], m[3]]) == SAVE_MAGIC)
        .unwrap_or(false)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LeaderboardEntry {
    pub score: u32,
    pub name: PlayerName,
}

/// Top scores, highest first. Unused positions have score 0 and an empty
/// name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Leaderboard {
    entries: [LeaderboardEntry; LEADERBOARD_LEN],
}

impl Leaderboard {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[LeaderboardEntry; LEADERBOARD_LEN] {
        &self.entries
    }

    /// Insert a score above the first entry it beats. Lower entries shift
    /// down and the last one falls off. Returns the rank taken, or `None`
    /// when the score beats nothing (including ties).
    pub fn insert(&mut self, score: u32, name: &PlayerName) -> Option<usize> {
        let rank = self.entries.iter().position(|e| score > e.score)?;
        self.entries[rank..].rotate_right(1);
        self.entries[rank] = LeaderboardEntry { score, name: *name };
        Some(rank)
    }

    pub fn encode(&self) -> [u8; LEADERBOARD_RECORD_LEN] {
        let mut out = [0u8; LEADERBOARD_RECORD_LEN];
        out[..4].copy_from_slice(&SAVE_MAGIC.to_le_bytes());
        for (entry, chunk) in self
            .entries
            .iter()
            .zip(out[4..].chunks_exact_mut(LEADERBOARD_ENTRY_LEN))
        {
            chunk[..4].copy_from_slice(&entry.score.to_le_bytes());
            chunk[4..].copy_from_slice(entry.name.as_bytes());
        }
        out
    }

    /// Decode the record, `None` when the marker is missing.
    pub fn decode(bytes: &[u8]) -> Option<Self> {
        let mut cursor = Cursor::new(bytes);
        if cursor.read_u32::<LittleEndian>().ok()? != SAVE_MAGIC {
            return None;
        }
        let mut board = Self::empty();
        for entry in board.entries.iter_mut() {
            let score = cursor.read_u32::<LittleEndian>().ok()?;
            let mut name = [0u8; NAME_LEN];
            cursor.read_exact(&mut name).ok()?;
            *entry = LeaderboardEntry {
                score,
                name: PlayerName::from_bytes(&name),
            };
        }
        Some(board)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_board() -> Board {
        let raw: Vec<u8> = (0..BOARD_CELLS).map(|i| (i % 6) as u8 + 1).collect();
        Board::from_raw(&raw).unwrap()
    }

    #[test]
    fn test_layout_sizes() {
        assert_eq!(SAVE_RECORD_LEN, 88);
        assert_eq!(LEADERBOARD_RECORD_LEN, 104);
        assert_eq!(SAVE_AREA_LEN % 4, 0);
        assert_eq!(LEADERBOARD_RECORD_LEN % 4, 0);
    }

    #[test]
    fn test_save_record_layout() {
        let record = SaveRecord {
            score: 500,
            name: PlayerName::new("Ann"),
            board: sample_board(),
        };
        let bytes = record.encode();
        assert_eq!(&bytes[..4], &[0x34, 0x12, 0xBA, 0xAB]);
        assert_eq!(&bytes[4..8], &500u32.to_le_bytes());
        assert_eq!(&bytes[8..11], b"Ann");
        assert_eq!(bytes[11], 0);
        assert_eq!(bytes[24], 1);
        assert!(slot_is_valid(&bytes));
        assert_eq!(SaveRecord::decode(&bytes), Some(record));
    }

    #[test]
    fn test_erased_slot_is_empty() {
        let erased = [0xFFu8; SAVE_RECORD_LEN];
        assert!(!slot_is_valid(&erased));
        assert_eq!(SaveRecord::decode(&erased), None);
    }

    #[test]
    fn test_corrupt_board_reads_as_empty() {
        let mut bytes = SaveRecord {
            score: 1,
            name: PlayerName::new("x"),
            board: sample_board(),
        }
        .encode();
        bytes[30] = 0x7F;
        assert_eq!(SaveRecord::decode(&bytes), None);
    }

    #[test]
    fn test_leaderboard_ordering() {
        let mut board = Leaderboard::empty();
        let name = PlayerName::new("p");
        let ranks: Vec<_> = [100, 500, 300, 50, 900, 10]
            .into_iter()
            .map(|s| board.insert(s, &name))
            .collect();
        assert_eq!(
            ranks,
            vec![Some(0), Some(0), Some(1), Some(3), Some(0), None]
        );
        let scores: Vec<u32> = board.entries().iter().map(|e| e.score).collect();
        assert_eq!(scores, vec![900, 500, 300, 100, 50]);
    }

    #[test]
    fn test_leaderboard_ties_do_not_displace() {
        let mut board = Leaderboard::empty();
        let name = PlayerName::new("p");
        for s in [50, 40, 30, 20, 10] {
            board.insert(s, &name);
        }
        assert_eq!(board.insert(10, &name), None);
        assert_eq!(board.insert(0, &name), None);
        assert_eq!(board.insert(30, &PlayerName::new("q")), Some(3));
        assert_eq!(board.entries()[2].name, name);
        assert_eq!(board.entries()[3].name, PlayerName::new("q"));
    }

    #[test]
    fn test_leaderboard_record_layout() {
        let mut board = Leaderboard::empty();
        board.insert(0x0102_0304, &PlayerName::new("Bob"));
        let bytes = board.encode();
        assert_eq!(&bytes[4..8], &[0x04, 0x03, 0x02, 0x01]);
        assert_eq!(&bytes[8..11], b"Bob");
        assert_eq!(Leaderboard::decode(&bytes), Some(board));
        assert_eq!(Leaderboard::decode(&[0xFF; LEADERBOARD_RECORD_LEN]), None);
    }
}
