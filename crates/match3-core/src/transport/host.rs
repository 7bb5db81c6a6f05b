//! Host-side collaborators: wall clock and a writer-backed serial line.

use std::io::Write;
use std::sync::Mutex;
use std::thread;
use std::time::{Duration, Instant};

use super::traits::{Clock, SerialPort, TransportError};

/// Milliseconds since construction, backed by `Instant`.
pub struct StdClock {
    start: Instant,
}

impl StdClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for StdClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for StdClock {
    fn now_ms(&self) -> u32 {
        // Truncation gives the same wraparound as a 32-bit tick counter.
        self.start.elapsed().as_millis() as u32
    }

    fn delay_ms(&self, ms: u32) {
        if ms > 0 {
            thread::sleep(Duration::from_millis(ms as u64));
        }
    }
}

/// Serial line that writes to any `Write` sink (a pipe, a file, a pty).
pub struct WriterSerial<W: Write + Send> {
    inner: Mutex<W>,
}

impl<W: Write + Send> WriterSerial<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner: Mutex::new(inner),
        }
    }

    pub fn into_inner(self) -> Result<W, TransportError> {
        self.inner
            .into_inner()
            .map_err(|_| TransportError::WriteFailed("writer lock poisoned".into()))
    }
}

impl<W: Write + Send> SerialPort for WriterSerial<W> {
    fn send(&self, bytes: &[u8]) -> Result<(), TransportError> {
        let mut inner = self
            .inner
            .lock()
            .map_err(|_| TransportError::WriteFailed("writer lock poisoned".into()))?;
        inner.write_all(bytes)?;
        inner.flush()?;
        Ok(())
    }
}
