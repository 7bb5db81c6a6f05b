//! Player name buffer.
//!
//! A fixed 16-byte, NUL-terminated buffer. The host writes it three bytes
//! at a time (`0x20` frames); saves and leaderboard entries copy it.

use std::fmt;

/// Size of the name buffer including the terminator.
pub const NAME_LEN: usize = 16;
/// Longest name that fits before the terminator.
pub const NAME_MAX_CHARS: usize = NAME_LEN - 1;
/// Bytes carried by one name chunk frame.
pub const NAME_CHUNK_LEN: usize = 3;
/// Number of chunk indices accepted from the host (`0..6`).
pub const NAME_CHUNKS_IN: u8 = 6;

/// Name the firmware starts with.
pub const DEFAULT_PLAYER_NAME: &str = "Player1";

#[derive(Clone, Copy, PartialEq, Eq, Default)]
pub struct PlayerName {
    bytes: [u8; NAME_LEN],
}

impl PlayerName {
    /// Build a name from a string, truncated to 15 bytes.
    pub fn new(name: &str) -> Self {
        let mut bytes = [0u8; NAME_LEN];
        let len = name.len().min(NAME_MAX_CHARS);
        bytes[..len].copy_from_slice(&name.as_bytes()[..len]);
        Self { bytes }
    }

    /// Build a name from a raw buffer. The last byte is forced to NUL and
    /// everything after the first NUL is cleared.
    pub fn from_bytes(raw: &[u8; NAME_LEN]) -> Self {
        let mut bytes = [0u8; NAME_LEN];
        let len = raw
            .iter()
            .take(NAME_MAX_CHARS)
            .position(|&b| b == 0)
            .unwrap_or(NAME_MAX_CHARS);
        bytes[..len].copy_from_slice(&raw[..len]);
        Self { bytes }
    }

    /// Raw 16-byte buffer.
    pub fn as_bytes(&self) -> &[u8; NAME_LEN] {
        &self.bytes
    }

    /// Bytes up to the terminator.
    pub fn trimmed(&self) -> &[u8] {
        let len = self.bytes.iter().position(|&b| b == 0).unwrap_or(NAME_LEN);
        &self.bytes[..len]
    }

    pub fn is_empty(&self) -> bool {
        self.bytes[0] == 0
    }

    /// Write one 3-byte chunk at `index * 3`.
    ///
    /// Indices `>= 6` are ignored. Bytes that would land past the buffer are
    /// dropped, and chunk 5 (the last one) forces the terminator. Returns
    /// whether the chunk was accepted.
    pub fn write_chunk(&mut self, index: u8, chunk: [u8; NAME_CHUNK_LEN]) -> bool {
        if index >= NAME_CHUNKS_IN {
            return false;
        }
        let base = index as usize * NAME_CHUNK_LEN;
        for (offset, byte) in chunk.into_iter().enumerate() {
            if let Some(slot) = self.bytes.get_mut(base + offset) {
                *slot = byte;
            }
        }
        if index == NAME_CHUNKS_IN - 1 {
            self.bytes[NAME_MAX_CHARS] = 0;
        }
        true
    }

    /// The 3-byte chunk at `index * 3`, zero-padded past the buffer.
    pub fn chunk(&self, index: usize) -> [u8; NAME_CHUNK_LEN] {
        let mut out = [0u8; NAME_CHUNK_LEN];
        let base = index * NAME_CHUNK_LEN;
        for (offset, dst) in out.iter_mut().enumerate() {
            *dst = self.bytes.get(base + offset).copied().unwrap_or(0);
        }
        out
    }
}

impl fmt::Display for PlayerName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(self.trimmed()))
    }
}

impl fmt::Debug for PlayerName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PlayerName({:?})", self.to_string())
    }
}

impl From<&str> for PlayerName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}
