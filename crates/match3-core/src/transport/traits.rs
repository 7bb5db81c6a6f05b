//! Collaborator traits for the serial line and the system tick.
//!
//! The firmware logic only talks to these traits, so the same code runs
//! against the in-memory mocks in tests and against host I/O in the CLI.

use std::sync::Arc;

use thiserror::Error;

use crate::protocol::Frame;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Write failed: {0}")]
    WriteFailed(String),

    #[error("Serial line disconnected")]
    Disconnected,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Outbound half of the serial line.
pub trait SerialPort: Send + Sync {
    /// Transmit raw bytes. Blocks until they are queued.
    fn send(&self, bytes: &[u8]) -> Result<(), TransportError>;

    /// Encode and transmit one frame.
    fn send_frame(&self, frame: &Frame) -> Result<(), TransportError> {
        self.send(&frame.encode())
    }
}

/// Millisecond tick source.
pub trait Clock: Send + Sync {
    /// Milliseconds since an arbitrary epoch; wraps at `u32::MAX`.
    fn now_ms(&self) -> u32;

    /// Busy-wait or sleep for `ms` milliseconds.
    fn delay_ms(&self, ms: u32);
}

/// A clock shared between the device and a producer thread.
impl<T: Clock + ?Sized> Clock for Arc<T> {
    fn now_ms(&self) -> u32 {
        (**self).now_ms()
    }

    fn delay_ms(&self, ms: u32) {
        (**self).delay_ms(ms)
    }
}
