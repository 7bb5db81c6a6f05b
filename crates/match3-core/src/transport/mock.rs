//! Mock serial line and clock for testing.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use super::traits::{Clock, SerialPort, TransportError};
use crate::protocol::{FRAME_LEN, Frame};

/// Captures everything the firmware transmits.
#[derive(Clone)]
pub struct MockSerial {
    /// Captured bytes, in send order.
    write_log: Arc<Mutex<Vec<u8>>>,
    /// Whether the line is "connected".
    connected: Arc<Mutex<bool>>,
}

impl MockSerial {
    pub fn new() -> Self {
        Self {
            write_log: Arc::new(Mutex::new(Vec::new())),
            connected: Arc::new(Mutex::new(true)),
        }
    }

    /// All captured bytes.
    pub fn bytes(&self) -> Vec<u8> {
        self.write_log.lock().unwrap().clone()
    }

    /// Captured output split into 6-byte frames. The checksum is not
    /// checked; use [`Frame::decode`] on [`MockSerial::bytes`] for that.
    pub fn frames(&self) -> Vec<Frame> {
        self.write_log
            .lock()
            .unwrap()
            .chunks_exact(FRAME_LEN)
            .map(|c| Frame::new(c[0], c[1], c[2], c[3], c[4]))
            .collect()
    }

    /// Captured frames, clearing the log.
    pub fn take_frames(&self) -> Vec<Frame> {
        let frames = self.frames();
        self.clear();
        frames
    }

    /// Clear captured output.
    pub fn clear(&self) {
        self.write_log.lock().unwrap().clear();
    }

    /// Simulate the host going away.
    pub fn disconnect(&self) {
        *self.connected.lock().unwrap() = false;
    }

    pub fn reconnect(&self) {
        *self.connected.lock().unwrap() = true;
    }
}

impl Default for MockSerial {
    fn default() -> Self {
        Self::new()
    }
}

impl SerialPort for MockSerial {
    fn send(&self, bytes: &[u8]) -> Result<(), TransportError> {
        if !*self.connected.lock().unwrap() {
            return Err(TransportError::Disconnected);
        }
        self.write_log.lock().unwrap().extend_from_slice(bytes);
        Ok(())
    }
}

/// Clock that only moves when told to. `delay_ms` advances it instantly.
#[derive(Clone, Default)]
pub struct ManualClock {
    now: Arc<AtomicU32>,
    /// Sum of all requested delays.
    delayed: Arc<AtomicU32>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn starting_at(ms: u32) -> Self {
        let clock = Self::default();
        clock.set(ms);
        clock
    }

    pub fn set(&self, ms: u32) {
        self.now.store(ms, Ordering::SeqCst);
    }

    pub fn advance(&self, ms: u32) {
        let now = self.now.load(Ordering::SeqCst);
        self.now.store(now.wrapping_add(ms), Ordering::SeqCst);
    }

    /// Total milliseconds spent in `delay_ms`.
    pub fn total_delay(&self) -> u32 {
        self.delayed.load(Ordering::SeqCst)
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u32 {
        self.now.load(Ordering::SeqCst)
    }

    fn delay_ms(&self, ms: u32) {
        self.delayed.fetch_add(ms, Ordering::SeqCst);
        self.advance(ms);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_frame_capture() {
        let serial = MockSerial::new();
        serial.send_frame(&Frame::new(0x10, 0, 0, 0, 0xAA)).unwrap();
        serial.send_frame(&Frame::new(0x16, 1, 2, 3, 0xAA)).unwrap();

        let bytes = serial.bytes();
        assert_eq!(bytes.len(), 12);
        assert!(Frame::decode(&bytes[..6]).is_ok());

        let frames = serial.take_frames();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[1], Frame::new(0x16, 1, 2, 3, 0xAA));
        assert!(serial.frames().is_empty());
    }

    #[test]
    fn test_mock_disconnect() {
        let serial = MockSerial::new();
        serial.disconnect();
        assert!(matches!(
            serial.send(b"x"),
            Err(TransportError::Disconnected)
        ));
        serial.reconnect();
        assert!(serial.send(b"x").is_ok());
    }

    #[test]
    fn test_manual_clock() {
        let clock = ManualClock::starting_at(100);
        clock.delay_ms(300);
        clock.advance(5);
        assert_eq!(clock.now_ms(), 405);
        assert_eq!(clock.total_delay(), 300);
    }

    #[test]
    fn test_shared_clock_sees_one_time() {
        let clock = Arc::new(ManualClock::starting_at(1_000));
        let other = Arc::clone(&clock);
        clock.advance(10);
        other.delay_ms(5);
        assert_eq!(Clock::now_ms(&clock), 1_015);
        assert_eq!(Clock::now_ms(&other), 1_015);
        assert_eq!(clock.total_delay(), 5);
    }
}
