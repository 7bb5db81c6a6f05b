//! Flash image backed by a file, so a host run keeps its saves.
//!
//! The whole data region is mirrored in memory and written back after
//! every erase or program.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::flash::{
    DATA_REGION_LEN, DATA_REGION_START, ERASED_BYTE, FLASH_PAGE_SIZE, FLASH_WORD_SIZE,
    FlashError, FlashInterface, check_aligned, check_range,
};

pub struct FileFlash {
    path: PathBuf,
    base: u32,
    mem: Vec<u8>,
}

impl FileFlash {
    /// Open an image, creating an erased one if the file is missing.
    ///
    /// An image of the wrong size is treated as corrupt and replaced by an
    /// erased one.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, FlashError> {
        let path = path.as_ref().to_path_buf();
        let size = DATA_REGION_LEN as usize;
        let mem = match fs::read(&path) {
            Ok(data) if data.len() == size => {
                info!(path = %path.display(), "Loaded flash image");
                data
            }
            Ok(data) => {
                info!(path = %path.display(), len = data.len(), "Flash image has wrong size, starting erased");
                vec![ERASED_BYTE; size]
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %path.display(), "Creating erased flash image");
                vec![ERASED_BYTE; size]
            }
            Err(e) => return Err(e.into()),
        };
        let flash = Self {
            path,
            base: DATA_REGION_START,
            mem,
        };
        flash.persist()?;
        Ok(flash)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self) -> Result<(), FlashError> {
        fs::write(&self.path, &self.mem)?;
        Ok(())
    }
}

impl FlashInterface for FileFlash {
    fn read(&self, address: u32, buf: &mut [u8]) -> Result<(), FlashError> {
        let offset = check_range(self.base, self.mem.len(), address, buf.len())?;
        buf.copy_from_slice(&self.mem[offset..offset + buf.len()]);
        Ok(())
    }

    fn erase_page(&mut self, page_address: u32) -> Result<(), FlashError> {
        check_aligned(page_address, FLASH_PAGE_SIZE)?;
        let offset = check_range(self.base, self.mem.len(), page_address, FLASH_PAGE_SIZE as usize)?;
        self.mem[offset..offset + FLASH_PAGE_SIZE as usize].fill(ERASED_BYTE);
        debug!(page = %format!("0x{:08X}", page_address), "Page erased");
        self.persist()
    }

    fn program_word(&mut self, address: u32, word: u32) -> Result<(), FlashError> {
        check_aligned(address, FLASH_WORD_SIZE)?;
        let offset = check_range(self.base, self.mem.len(), address, FLASH_WORD_SIZE as usize)?;
        for (cell, byte) in self.mem[offset..offset + 4].iter_mut().zip(word.to_le_bytes()) {
            *cell &= byte;
        }
        self.persist()
    }
}
