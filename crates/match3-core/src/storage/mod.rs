//! Storage module - flash access, record layouts and the persistence store.

pub mod file;
pub mod flash;
pub mod mock;
pub mod records;
pub mod store;

pub use file::FileFlash;
pub use flash::{FlashError, FlashInterface, LEADERBOARD_PAGE_ADDR, SAVE_PAGE_ADDR};
pub use mock::{Fault, MockFlash};
pub use records::{LEADERBOARD_LEN, Leaderboard, LeaderboardEntry, SAVE_SLOTS, SaveRecord};
pub use store::{PersistenceStore, StorageError};
