//! Flash interface trait and memory map.
//!
//! Flash is erased a page at a time (every byte becomes 0xFF) and
//! programmed a 32-bit word at a time. Programming can only clear bits, so
//! a page must be erased before it is rewritten.
//!
//! # Memory Layout
//!
//! ```text
//! [Leaderboard page]  0x0800_F800 - 0x0800_FC00 (1 KiB)
//! [Save slot page]    0x0800_FC00 - 0x0801_0000 (1 KiB)
//! ```

use thiserror::Error;

/// Erase unit.
pub const FLASH_PAGE_SIZE: u32 = 1024;
/// Program unit.
pub const FLASH_WORD_SIZE: u32 = 4;
/// Value of every byte after an erase.
pub const ERASED_BYTE: u8 = 0xFF;

/// Page holding the three save slots.
pub const SAVE_PAGE_ADDR: u32 = 0x0800_FC00;
/// Page holding the leaderboard.
pub const LEADERBOARD_PAGE_ADDR: u32 = 0x0800_F800;
/// Lowest address used for game data.
pub const DATA_REGION_START: u32 = LEADERBOARD_PAGE_ADDR;
/// Size of the game data region (two pages).
pub const DATA_REGION_LEN: u32 = 2 * FLASH_PAGE_SIZE;

#[derive(Error, Debug)]
pub enum FlashError {
    #[error("Address 0x{address:08X} (+{len}) is outside flash")]
    InvalidAddress { address: u32, len: usize },

    #[error("Address 0x{address:08X} is not {align}-byte aligned")]
    Unaligned { address: u32, align: u32 },

    #[error("Erase of page 0x{page:08X} failed")]
    EraseFailed { page: u32 },

    #[error("Program of word at 0x{address:08X} failed")]
    ProgramFailed { address: u32 },

    #[error("Flash image IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Byte-addressed flash device.
pub trait FlashInterface: Send {
    /// Read `buf.len()` bytes starting at `address`.
    fn read(&self, address: u32, buf: &mut [u8]) -> Result<(), FlashError>;

    /// Erase the page starting at `page_address` to 0xFF.
    fn erase_page(&mut self, page_address: u32) -> Result<(), FlashError>;

    /// Program one little-endian word at a word-aligned `address`.
    fn program_word(&mut self, address: u32, word: u32) -> Result<(), FlashError>;

    /// Erase unit in bytes.
    fn page_size(&self) -> u32 {
        FLASH_PAGE_SIZE
    }
}

impl<T: FlashInterface + ?Sized> FlashInterface for Box<T> {
    fn read(&self, address: u32, buf: &mut [u8]) -> Result<(), FlashError> {
        (**self).read(address, buf)
    }

    fn erase_page(&mut self, page_address: u32) -> Result<(), FlashError> {
        (**self).erase_page(page_address)
    }

    fn program_word(&mut self, address: u32, word: u32) -> Result<(), FlashError> {
        (**self).program_word(address, word)
    }

    fn page_size(&self) -> u32 {
        (**self).page_size()
    }
}

/// Bounds check shared by the back-ends.
pub(crate) fn check_range(base: u32, size: usize, address: u32, len: usize) -> Result<usize, FlashError> {
    let offset = address
        .checked_sub(base)
        .map(|o| o as usize)
        .filter(|&o| o.checked_add(len).is_some_and(|end| end <= size));
    offset.ok_or(FlashError::InvalidAddress { address, len })
}

pub(crate) fn check_aligned(address: u32, align: u32) -> Result<(), FlashError> {
    if address % align != 0 {
        return Err(FlashError::Unaligned { address, align });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_range() {
        let base = DATA_REGION_START;
        let size = DATA_REGION_LEN as usize;
        assert_eq!(check_range(base, size, base, 4).unwrap(), 0);
        assert_eq!(check_range(base, size, SAVE_PAGE_ADDR, 1024).unwrap(), 1024);
        assert!(check_range(base, size, base - 1, 1).is_err());
        assert!(check_range(base, size, SAVE_PAGE_ADDR + 1021, 4).is_err());
    }

    #[test]
    fn test_check_aligned() {
        assert!(check_aligned(SAVE_PAGE_ADDR, FLASH_WORD_SIZE).is_ok());
        assert!(matches!(
            check_aligned(SAVE_PAGE_ADDR + 2, FLASH_WORD_SIZE),
            Err(FlashError::Unaligned { align: 4, .. })
        ));
    }
}
