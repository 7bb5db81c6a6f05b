//! Save slots and leaderboard on top of a [`FlashInterface`].
//!
//! Every update is a read-modify-write of a whole page: the current page
//! contents are copied into a staging buffer, the target record is
//! replaced, the page is erased and the staging buffer programmed back word
//! by word. Programmed bytes are read back and compared.

use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use super::flash::{FLASH_WORD_SIZE, FlashError, FlashInterface, LEADERBOARD_PAGE_ADDR, SAVE_PAGE_ADDR};
use super::records::{
    LEADERBOARD_RECORD_LEN, Leaderboard, SAVE_AREA_LEN, SAVE_NAME_OFFSET, SAVE_RECORD_LEN,
    SAVE_SLOTS, SaveRecord, slot_is_valid,
};
use crate::board::{NAME_LEN, PlayerName};

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Invalid save slot {slot} (valid: 0..{max})", max = SAVE_SLOTS)]
    InvalidSlot { slot: u8 },

    #[error("Read-back mismatch at 0x{address:08X}")]
    VerifyFailed { address: u32 },

    #[error("Flash error: {0}")]
    Flash(#[from] FlashError),
}

/// Persistent game data.
pub struct PersistenceStore<F: FlashInterface> {
    flash: F,
    save_addr: u32,
    leaderboard_addr: u32,
}

impl<F: FlashInterface> PersistenceStore<F> {
    pub fn new(flash: F) -> Self {
        Self {
            flash,
            save_addr: SAVE_PAGE_ADDR,
            leaderboard_addr: LEADERBOARD_PAGE_ADDR,
        }
    }

    pub fn flash(&self) -> &F {
        &self.flash
    }

    pub fn into_inner(self) -> F {
        self.flash
    }

    fn slot_addr(&self, slot: u8) -> Result<u32, StorageError> {
        if slot >= SAVE_SLOTS {
            return Err(StorageError::InvalidSlot { slot });
        }
        Ok(self.save_addr + slot as u32 * SAVE_RECORD_LEN as u32)
    }

    /// Write `record` into `slot`, leaving the other slots as they were.
    #[instrument(skip(self, record), fields(score = record.score))]
    pub fn save(&mut self, slot: u8, record: &SaveRecord) -> Result<(), StorageError> {
        let addr = self.slot_addr(slot)?;
        let mut staging = [0u8; SAVE_AREA_LEN];
        self.flash.read(self.save_addr, &mut staging)?;

        let offset = (addr - self.save_addr) as usize;
        staging[offset..offset + SAVE_RECORD_LEN].copy_from_slice(&record.encode());

        self.write_page(self.save_addr, &staging)?;
        info!(slot, name = %record.name, "Game saved");
        Ok(())
    }

    /// Contents of `slot`, or `None` when it has never been written.
    #[instrument(skip(self))]
    pub fn load(&self, slot: u8) -> Result<Option<SaveRecord>, StorageError> {
        let addr = self.slot_addr(slot)?;
        let mut buf = [0u8; SAVE_RECORD_LEN];
        self.flash.read(addr, &mut buf)?;
        let record = SaveRecord::decode(&buf);
        if record.is_none() && slot_is_valid(&buf) {
            warn!(slot, "Slot has a marker but an unreadable board");
        }
        Ok(record)
    }

    /// Player name stored in `slot`, without reading the board.
    pub fn slot_name(&self, slot: u8) -> Result<Option<PlayerName>, StorageError> {
        let addr = self.slot_addr(slot)?;
        let mut head = [0u8; SAVE_NAME_OFFSET + NAME_LEN];
        self.flash.read(addr, &mut head)?;
        if !slot_is_valid(&head) {
            return Ok(None);
        }
        let mut name = [0u8; NAME_LEN];
        name.copy_from_slice(&head[SAVE_NAME_OFFSET..]);
        Ok(Some(PlayerName::from_bytes(&name)))
    }

    /// Current table. An unwritten page reads as an empty table.
    pub fn leaderboard(&self) -> Result<Leaderboard, StorageError> {
        let mut buf = [0u8; LEADERBOARD_RECORD_LEN];
        self.flash.read(self.leaderboard_addr, &mut buf)?;
        Ok(Leaderboard::decode(&buf).unwrap_or_default())
    }

    /// Offer a final score to the leaderboard. Flash is only touched when
    /// the score earns a place; the rank is returned in that case.
    #[instrument(skip(self, name), fields(name = %name))]
    pub fn submit_score(&mut self, score: u32, name: &PlayerName) -> Result<Option<usize>, StorageError> {
        let mut table = self.leaderboard()?;
        let Some(rank) = table.insert(score, name) else {
            debug!("Score did not place");
            return Ok(None);
        };
        self.write_page(self.leaderboard_addr, &table.encode())?;
        info!(rank, "Leaderboard updated");
        Ok(Some(rank))
    }

    /// Erase the page at `addr` and program `data` from its start.
    fn write_page(&mut self, addr: u32, data: &[u8]) -> Result<(), StorageError> {
        self.flash.erase_page(addr)?;
        for (i, word) in data.chunks_exact(FLASH_WORD_SIZE as usize).enumerate() {
            let word = u32::from_le_bytes([word[0], word[1], word[2], word[3]]);
            self.flash
                .program_word(addr + i as u32 * FLASH_WORD_SIZE, word)?;
        }

        let mut readback = vec![0u8; data.len()];
        self.flash.read(addr, &mut readback)?;
        if let Some(pos) = readback.iter().zip(data).position(|(a, b)| a != b) {
            let address = addr + pos as u32;
            warn!(address = %format!("0x{:08X}", address), "Flash verify failed");
            return Err(StorageError::VerifyFailed { address });
        }
        debug!(addr = %format!("0x{:08X}", addr), len = data.len(), "Page written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{BOARD_CELLS, Board};
    use crate::storage::mock::{Fault, MockFlash};

    fn board_of(value: u8) -> Board {
        Board::from_raw(&[value; BOARD_CELLS]).unwrap()
    }

    fn record(score: u32, name: &str, value: u8) -> SaveRecord {
        SaveRecord {
            score,
            name: PlayerName::new(name),
            board: board_of(value),
        }
    }

    #[test]
    fn test_fresh_flash_is_empty() {
        let store = PersistenceStore::new(MockFlash::new());
        for slot in 0..SAVE_SLOTS {
            assert_eq!(store.load(slot).unwrap(), None);
            assert_eq!(store.slot_name(slot).unwrap(), None);
        }
        assert_eq!(store.leaderboard().unwrap(), Leaderboard::empty());
    }

    #[test]
    fn test_save_load_roundtrip_keeps_other_slots() {
        let flash = MockFlash::new();
        let mut store = PersistenceStore::new(flash.clone());
        store.save(0, &record(10, "Zed", 2)).unwrap();
        let slot0_before = flash.peek(SAVE_PAGE_ADDR, SAVE_RECORD_LEN);
        let slot2_before = flash.peek(SAVE_PAGE_ADDR + 2 * SAVE_RECORD_LEN as u32, SAVE_RECORD_LEN);

        let ann = record(500, "Ann", 4);
        store.save(1, &ann).unwrap();

        assert_eq!(store.load(1).unwrap(), Some(ann));
        assert_eq!(flash.peek(SAVE_PAGE_ADDR, SAVE_RECORD_LEN), slot0_before);
        assert_eq!(
            flash.peek(SAVE_PAGE_ADDR + 2 * SAVE_RECORD_LEN as u32, SAVE_RECORD_LEN),
            slot2_before
        );
        assert_eq!(store.load(2).unwrap(), None);
        assert_eq!(store.slot_name(1).unwrap(), Some(PlayerName::new("Ann")));
    }

    #[test]
    fn test_invalid_slot() {
        let mut store = PersistenceStore::new(MockFlash::new());
        assert!(matches!(
            store.save(3, &record(1, "x", 1)),
            Err(StorageError::InvalidSlot { slot: 3 })
        ));
        assert!(matches!(
            store.load(7),
            Err(StorageError::InvalidSlot { slot: 7 })
        ));
    }

    #[test]
    fn test_leaderboard_sequence() {
        let flash = MockFlash::new();
        let mut store = PersistenceStore::new(flash.clone());
        for score in [100, 500, 300, 50, 900] {
            store.submit_score(score, &PlayerName::new("p")).unwrap();
        }
        let erases = flash.erase_count();
        assert_eq!(store.submit_score(10, &PlayerName::new("p")).unwrap(), None);
        assert_eq!(flash.erase_count(), erases, "no write when nothing placed");

        let scores: Vec<u32> = store
            .leaderboard()
            .unwrap()
            .entries()
            .iter()
            .map(|e| e.score)
            .collect();
        assert_eq!(scores, vec![900, 500, 300, 100, 50]);
    }

    #[test]
    fn test_zero_score_never_places() {
        let flash = MockFlash::new();
        let mut store = PersistenceStore::new(flash.clone());
        assert_eq!(store.submit_score(0, &PlayerName::default()).unwrap(), None);
        assert_eq!(flash.erase_count(), 0);
    }

    #[test]
    fn test_erase_failure_is_reported() {
        let flash = MockFlash::new();
        let mut store = PersistenceStore::new(flash.clone());
        store.save(0, &record(10, "a", 1)).unwrap();

        flash.inject(Fault::Erase);
        let err = store.save(1, &record(20, "b", 2)).unwrap_err();
        assert!(matches!(
            err,
            StorageError::Flash(FlashError::EraseFailed { .. })
        ));
        // Page untouched, slot 0 still there.
        assert_eq!(store.load(0).unwrap().map(|r| r.score), Some(10));
        assert_eq!(store.load(1).unwrap(), None);
    }

    #[test]
    fn test_program_failure_is_reported() {
        let flash = MockFlash::new();
        let mut store = PersistenceStore::new(flash.clone());
        flash.inject(Fault::Program { after_words: 3 });
        assert!(matches!(
            store.save(0, &record(10, "a", 1)),
            Err(StorageError::Flash(FlashError::ProgramFailed { .. }))
        ));
    }

    #[test]
    fn test_stuck_bit_fails_verify() {
        let flash = MockFlash::new();
        let mut store = PersistenceStore::new(flash.clone());
        let address = SAVE_PAGE_ADDR + 4;
        flash.inject(Fault::StuckLow { address, mask: 0x80 });
        // Score 0x80 needs bit 7 of byte 4 set.
        let err = store.save(0, &record(0x80, "a", 1)).unwrap_err();
        assert!(matches!(err, StorageError::VerifyFailed { address: a } if a == address));
    }

    #[test]
    fn test_corrupt_board_reads_as_empty_slot() {
        let flash = MockFlash::new();
        let mut store = PersistenceStore::new(flash.clone());
        store.save(0, &record(10, "Ann", 3)).unwrap();

        let board_start = SAVE_PAGE_ADDR + (SAVE_NAME_OFFSET + NAME_LEN) as u32;
        flash.poke(board_start + 17, &[9]);

        assert_eq!(store.load(0).unwrap(), None);
        // The name sits before the board and is still readable.
        assert_eq!(store.slot_name(0).unwrap(), Some(PlayerName::new("Ann")));
    }
}
