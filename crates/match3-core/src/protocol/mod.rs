//! Protocol module - framing, checksums and request parsing.

pub mod assembler;
pub mod command;
pub mod constants;
pub mod frame;

pub use assembler::{RxLine, RxStats};
pub use command::Command;
pub use constants::*;
pub use frame::{Frame, FrameError, crc8};
