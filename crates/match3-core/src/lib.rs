//! Match3-Core: firmware for a serial-controlled match-3 board.
//!
//! This crate holds everything the controller does: the 8x8 board engine,
//! the 6-byte checksummed frame protocol a host speaks over UART, and the
//! flash-backed save slots and leaderboard.
//!
//! # Architecture
//!
//! The crate is organized into layers:
//!
//! - **Board**: Grid types, match detection, scoring, cascade iterator
//! - **Protocol**: Constants, frame codec (CRC-8/SMBUS), receive-line assembler
//! - **Transport**: Serial and clock abstraction (host, mock)
//! - **Storage**: Flash abstraction (file, mock), record layouts, persistence store
//! - **Diff**: Board change tracking for the host view
//! - **State**: Per-command handlers
//! - **Events**: Observer pattern for UI decoupling
//! - **Session**: Device main loop and configuration
//!
//! # Example
//!
//! ```no_run
//! use std::sync::atomic::AtomicBool;
//! use match3_core::session::{Device, FirmwareConfig};
//! use match3_core::storage::MockFlash;
//! use match3_core::transport::{StdClock, WriterSerial};
//!
//! let config = FirmwareConfig {
//!     seed: Some(42),
//!     ..Default::default()
//! };
//!
//! let serial = WriterSerial::new(std::io::stdout());
//! let mut device = Device::new(config, serial, MockFlash::new(), StdClock::new());
//! let rx = device.rx_line();
//! // feed bytes with rx.on_byte(..) from a reader thread
//! device.run(&AtomicBool::new(false));
//! ```

pub mod board;
pub mod diff;
pub mod events;
pub mod protocol;
pub mod session;
pub mod state;
pub mod storage;
pub mod transport;

// Re-exports for convenience
pub use board::{Board, Cell, Color, Engine, Move, MoveError, PlayerName, Pos};
pub use diff::DiffNotifier;
pub use events::{GameEvent, GameObserver, LogLevel, NullObserver, TracingObserver};
pub use protocol::{Command, Frame, FrameError, RxLine, crc8};
pub use session::{Device, DeviceStats, FirmwareConfig};
pub use state::HandleResult;
pub use storage::{FileFlash, FlashInterface, MockFlash, PersistenceStore, StorageError};
pub use transport::{Clock, ManualClock, MockSerial, SerialPort, StdClock, TransportError};
