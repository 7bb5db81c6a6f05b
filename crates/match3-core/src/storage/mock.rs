//! In-memory NOR flash model for testing.

use std::sync::{Arc, Mutex};

use super::flash::{
    DATA_REGION_LEN, DATA_REGION_START, ERASED_BYTE, FLASH_PAGE_SIZE, FLASH_WORD_SIZE,
    FlashError, FlashInterface, check_aligned, check_range,
};

/// A failure to inject into the next matching operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// The next erase fails and leaves the page untouched.
    Erase,
    /// Programming fails once `after_words` more words have been written.
    Program { after_words: usize },
    /// Bits in `mask` of the byte at `address` read back as 0 forever.
    StuckLow { address: u32, mask: u8 },
}

#[derive(Default)]
struct FaultState {
    erase: bool,
    program_after: Option<usize>,
    stuck: Vec<(u32, u8)>,
}

/// Flash that behaves like NOR: erase sets 0xFF, programming ANDs the
/// word into memory, accesses are bounds and alignment checked.
#[derive(Clone)]
pub struct MockFlash {
    base: u32,
    mem: Arc<Mutex<Vec<u8>>>,
    faults: Arc<Mutex<FaultState>>,
    erase_count: Arc<Mutex<u32>>,
}

impl MockFlash {
    /// Fresh, fully erased flash covering the game data pages.
    pub fn new() -> Self {
        Self::with_region(DATA_REGION_START, DATA_REGION_LEN as usize)
    }

    pub fn with_region(base: u32, size: usize) -> Self {
        Self {
            base,
            mem: Arc::new(Mutex::new(vec![ERASED_BYTE; size])),
            faults: Arc::new(Mutex::new(FaultState::default())),
            erase_count: Arc::new(Mutex::new(0)),
        }
    }

    /// Arm a fault.
    pub fn inject(&self, fault: Fault) {
        let mut faults = self.faults.lock().unwrap();
        match fault {
            Fault::Erase => faults.erase = true,
            Fault::Program { after_words } => faults.program_after = Some(after_words),
            Fault::StuckLow { address, mask } => faults.stuck.push((address, mask)),
        }
    }

    /// Copy of `len` bytes at `address`, bypassing the trait.
    pub fn peek(&self, address: u32, len: usize) -> Vec<u8> {
        let offset = (address - self.base) as usize;
        self.mem.lock().unwrap()[offset..offset + len].to_vec()
    }

    /// Overwrite raw bytes, bypassing erase/program rules.
    pub fn poke(&self, address: u32, bytes: &[u8]) {
        let offset = (address - self.base) as usize;
        self.mem.lock().unwrap()[offset..offset + bytes.len()].copy_from_slice(bytes);
    }

    /// Number of successful page erases.
    pub fn erase_count(&self) -> u32 {
        *self.erase_count.lock().unwrap()
    }

    fn apply_stuck_bits(&self, mem: &mut [u8]) {
        let faults = self.faults.lock().unwrap();
        for &(address, mask) in &faults.stuck {
            if let Some(byte) = address
                .checked_sub(self.base)
                .and_then(|o| mem.get_mut(o as usize))
            {
                *byte &= !mask;
            }
        }
    }
}

impl Default for MockFlash {
    fn default() -> Self {
        Self::new()
    }
}

impl FlashInterface for MockFlash {
    fn read(&self, address: u32, buf: &mut [u8]) -> Result<(), FlashError> {
        let mem = self.mem.lock().unwrap();
        let offset = check_range(self.base, mem.len(), address, buf.len())?;
        buf.copy_from_slice(&mem[offset..offset + buf.len()]);
        Ok(())
    }

    fn erase_page(&mut self, page_address: u32) -> Result<(), FlashError> {
        check_aligned(page_address, FLASH_PAGE_SIZE)?;
        let mut mem = self.mem.lock().unwrap();
        let offset = check_range(self.base, mem.len(), page_address, FLASH_PAGE_SIZE as usize)?;
        {
            let mut faults = self.faults.lock().unwrap();
            if std::mem::take(&mut faults.erase) {
                return Err(FlashError::EraseFailed { page: page_address });
            }
        }
        mem[offset..offset + FLASH_PAGE_SIZE as usize].fill(ERASED_BYTE);
        self.apply_stuck_bits(&mut mem);
        *self.erase_count.lock().unwrap() += 1;
        Ok(())
    }

    fn program_word(&mut self, address: u32, word: u32) -> Result<(), FlashError> {
        check_aligned(address, FLASH_WORD_SIZE)?;
        let mut mem = self.mem.lock().unwrap();
        let offset = check_range(self.base, mem.len(), address, FLASH_WORD_SIZE as usize)?;
        {
            let mut faults = self.faults.lock().unwrap();
            match faults.program_after {
                Some(0) => {
                    faults.program_after = None;
                    return Err(FlashError::ProgramFailed { address });
                }
                Some(n) => faults.program_after = Some(n - 1),
                None => {}
            }
        }
        for (cell, byte) in mem[offset..offset + 4].iter_mut().zip(word.to_le_bytes()) {
            *cell &= byte;
        }
        self.apply_stuck_bits(&mut mem);
        Ok(())
    }
}
