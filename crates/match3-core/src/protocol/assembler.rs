//! Receive-side frame assembly shared between the byte producer (the UART
//! receive context) and the main loop.
//!
//! Ownership of the frame buffer is handed over through the `ready` flag:
//!
//! - the producer writes buffer cells only while `ready` is clear, and sets
//!   it with `Release` once six bytes are in;
//! - the consumer reads the buffer only after observing `ready` with
//!   `Acquire`, and clears it with `Release` once the frame is dispatched.
//!
//! Bytes arriving while a frame is waiting are dropped (drop-newest), and a
//! gap longer than the frame timeout discards a partial frame.
//!
//! While the consumer is programming flash, reception is suspended. Bytes
//! that arrive then are lost, unless a park queue was configured, in which
//! case they are parked with their arrival time. Parked bytes are replayed
//! in order once reception is live and no frame is waiting, either by the
//! producer on its next byte or by the consumer when it polls or releases a
//! frame. Assembly and queue pops only happen while holding the `owner`
//! flag, so at most one context touches the write index at a time.

use std::sync::atomic::{AtomicBool, AtomicU8, AtomicU32, AtomicUsize, Ordering};

use tracing::trace;

use super::constants::{DEFAULT_FRAME_TIMEOUT_MS, FRAME_LEN};

const LIVE: u8 = 0;
const SUSPENDED: u8 = 1;

/// Snapshot of the receive counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RxStats {
    /// Complete frames handed to the main loop.
    pub frames: u32,
    /// Bytes dropped because a frame was still waiting.
    pub dropped_busy: u32,
    /// Bytes lost while reception was suspended.
    pub dropped_suspended: u32,
    /// Bytes parked and replayed later.
    pub parked: u32,
    /// Partial frames discarded by the inter-byte timeout.
    pub stale_resets: u32,
    /// Line errors reported by the UART.
    pub line_errors: u32,
}

#[derive(Default)]
struct Counters {
    frames: AtomicU32,
    dropped_busy: AtomicU32,
    dropped_suspended: AtomicU32,
    parked: AtomicU32,
    stale_resets: AtomicU32,
    line_errors: AtomicU32,
}

impl Counters {
    fn bump(counter: &AtomicU32) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Byte ring with arrival stamps. Only the producer pushes; only the holder
/// of the line's `owner` flag pops.
struct ParkQueue {
    bytes: Box<[AtomicU8]>,
    stamps: Box<[AtomicU32]>,
    head: AtomicUsize,
    tail: AtomicUsize,
}

impl ParkQueue {
    fn new(depth: usize) -> Self {
        // One slot stays free to tell full from empty.
        Self {
            bytes: (0..depth + 1).map(|_| AtomicU8::new(0)).collect(),
            stamps: (0..depth + 1).map(|_| AtomicU32::new(0)).collect(),
            head: AtomicUsize::new(0),
            tail: AtomicUsize::new(0),
        }
    }

    fn push(&self, byte: u8, at_ms: u32) -> bool {
        let tail = self.tail.load(Ordering::Relaxed);
        let next = (tail + 1) % self.bytes.len();
        if next == self.head.load(Ordering::Acquire) {
            return false;
        }
        self.bytes[tail].store(byte, Ordering::Relaxed);
        self.stamps[tail].store(at_ms, Ordering::Relaxed);
        self.tail.store(next, Ordering::Release);
        true
    }

    fn pop(&self) -> Option<(u8, u32)> {
        let head = self.head.load(Ordering::Relaxed);
        if head == self.tail.load(Ordering::Acquire) {
            return None;
        }
        let byte = self.bytes[head].load(Ordering::Relaxed);
        let at_ms = self.stamps[head].load(Ordering::Relaxed);
        self.head.store((head + 1) % self.bytes.len(), Ordering::Release);
        Some((byte, at_ms))
    }

    fn is_empty(&self) -> bool {
        self.head.load(Ordering::Acquire) == self.tail.load(Ordering::Acquire)
    }
}

/// The shared receive line. Wrap it in an `Arc` to hand one end to a
/// producer thread.
pub struct RxLine {
    buf: [AtomicU8; FRAME_LEN],
    index: AtomicUsize,
    ready: AtomicBool,
    last_byte_ms: AtomicU32,
    mode: AtomicU8,
    /// Held by whoever is assembling.
    owner: AtomicBool,
    /// Line error seen; the next assembly starts from index 0.
    reset: AtomicBool,
    timeout_ms: u32,
    park: Option<ParkQueue>,
    counters: Counters,
}

impl RxLine {
    pub fn new() -> Self {
        Self::with_config(DEFAULT_FRAME_TIMEOUT_MS, 0)
    }

    /// `park_depth == 0` disables the park queue.
    pub fn with_config(timeout_ms: u32, park_depth: usize) -> Self {
        Self {
            buf: Default::default(),
            index: AtomicUsize::new(0),
            ready: AtomicBool::new(false),
            last_byte_ms: AtomicU32::new(0),
            mode: AtomicU8::new(LIVE),
            owner: AtomicBool::new(false),
            reset: AtomicBool::new(false),
            timeout_ms,
            park: (park_depth > 0).then(|| ParkQueue::new(park_depth)),
            counters: Counters::default(),
        }
    }

    // ------------------------------------------------------------------
    // Producer side
    // ------------------------------------------------------------------

    /// Deliver one received byte at time `now_ms`.
    pub fn on_byte(&self, byte: u8, now_ms: u32) {
        if self.mode.load(Ordering::Acquire) == SUSPENDED {
            self.park_byte(byte, now_ms);
            return;
        }
        let Some(park) = &self.park else {
            self.assemble(byte, now_ms);
            return;
        };
        if !self.try_own() {
            // The consumer is replaying; queue behind the parked bytes.
            self.park_byte(byte, now_ms);
            return;
        }
        self.replay(park);
        if park.is_empty() {
            self.assemble(byte, now_ms);
        } else {
            // A replayed frame is waiting and older bytes are still parked.
            Counters::bump(&self.counters.dropped_busy);
        }
        self.disown();
    }

    /// UART framing or overrun error: drop the partial frame and any
    /// waiting one.
    pub fn on_line_error(&self) {
        Counters::bump(&self.counters.line_errors);
        self.reset.store(true, Ordering::Release);
        self.ready.store(false, Ordering::Release);
        trace!("Line error, receive state reset");
    }

    fn park_byte(&self, byte: u8, now_ms: u32) {
        match &self.park {
            Some(park) if park.push(byte, now_ms) => Counters::bump(&self.counters.parked),
            _ => Counters::bump(&self.counters.dropped_suspended),
        }
    }

    fn try_own(&self) -> bool {
        self.owner
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
    }

    fn disown(&self) {
        self.owner.store(false, Ordering::Release);
    }

    /// Feed parked bytes until the queue is empty or a frame completes.
    /// Caller holds `owner`.
    fn replay(&self, park: &ParkQueue) {
        while !self.ready.load(Ordering::Acquire) {
            let Some((byte, at_ms)) = park.pop() else {
                break;
            };
            self.assemble(byte, at_ms);
        }
    }

    fn assemble(&self, byte: u8, now_ms: u32) {
        let mut index = self.index.load(Ordering::Relaxed);
        if self.reset.swap(false, Ordering::Acquire) {
            index = 0;
        }
        let last = self.last_byte_ms.swap(now_ms, Ordering::Relaxed);
        if index > 0 && now_ms.wrapping_sub(last) > self.timeout_ms {
            Counters::bump(&self.counters.stale_resets);
            trace!(index, gap_ms = now_ms.wrapping_sub(last), "Partial frame timed out");
            index = 0;
        }

        if self.ready.load(Ordering::Acquire) {
            self.index.store(index, Ordering::Relaxed);
            Counters::bump(&self.counters.dropped_busy);
            return;
        }

        self.buf[index].store(byte, Ordering::Relaxed);
        index += 1;
        if index >= FRAME_LEN {
            self.index.store(0, Ordering::Relaxed);
            Counters::bump(&self.counters.frames);
            self.ready.store(true, Ordering::Release);
        } else {
            self.index.store(index, Ordering::Relaxed);
        }
    }

    // ------------------------------------------------------------------
    // Consumer side
    // ------------------------------------------------------------------

    /// Replay parked bytes from the consumer side when nothing is waiting.
    /// Skipped if the producer is assembling; it drains on its own.
    fn drain_parked(&self) {
        let Some(park) = &self.park else {
            return;
        };
        if self.mode.load(Ordering::Acquire) == SUSPENDED
            || park.is_empty()
            || self.ready.load(Ordering::Acquire)
        {
            return;
        }
        if self.try_own() {
            self.replay(park);
            self.disown();
        }
    }

    /// Copy of the waiting frame, if one is ready. The frame stays owned by
    /// the consumer until [`RxLine::release`].
    pub fn pending(&self) -> Option<[u8; FRAME_LEN]> {
        self.drain_parked();
        if !self.ready.load(Ordering::Acquire) {
            return None;
        }
        let mut out = [0u8; FRAME_LEN];
        for (dst, cell) in out.iter_mut().zip(self.buf.iter()) {
            *dst = cell.load(Ordering::Relaxed);
        }
        Some(out)
    }

    /// Hand the buffer back to the producer. Bytes parked during the frame
    /// are replayed right away.
    pub fn release(&self) {
        self.ready.store(false, Ordering::Release);
        self.drain_parked();
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    /// No frame waiting and nothing parked.
    pub fn is_idle(&self) -> bool {
        !self.is_ready() && self.park.as_ref().is_none_or(ParkQueue::is_empty)
    }

    /// Stop accepting bytes (flash erase/program in progress).
    pub fn suspend(&self) {
        self.mode.store(SUSPENDED, Ordering::Release);
    }

    /// Accept bytes again. Parked bytes are replayed once no frame is
    /// waiting.
    pub fn resume(&self) {
        self.mode.store(LIVE, Ordering::Release);
    }

    pub fn is_suspended(&self) -> bool {
        self.mode.load(Ordering::Acquire) == SUSPENDED
    }

    pub fn stats(&self) -> RxStats {
        let c = &self.counters;
        RxStats {
            frames: c.frames.load(Ordering::Relaxed),
            dropped_busy: c.dropped_busy.load(Ordering::Relaxed),
            dropped_suspended: c.dropped_suspended.load(Ordering::Relaxed),
            parked: c.parked.load(Ordering::Relaxed),
            stale_resets: c.stale_resets.load(Ordering::Relaxed),
            line_errors: c.line_errors.load(Ordering::Relaxed),
        }
    }
}

impl Default for RxLine {
    fn default() -> Self {
        Self::new()
    }
}
