//! Event system for UI decoupling.
//!
//! The device reports what it does through [`GameEvent`]s so a host
//! harness, a test or a logger can follow a game without reaching into the
//! engine.

use std::fmt;

use crate::board::{CascadePhase, Move, MoveError};
use crate::protocol::Command;

/// Log level for events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

/// Serial direction, seen from the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketDirection {
    Tx, // Device -> Host
    Rx, // Host -> Device
}

impl fmt::Display for PacketDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PacketDirection::Tx => write!(f, "TX"),
            PacketDirection::Rx => write!(f, "RX"),
        }
    }
}

/// Why a game ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameEnd {
    /// No move left on the board.
    Deadlock,
    /// Host asked to finish.
    Forced,
}

impl fmt::Display for GameEnd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameEnd::Deadlock => write!(f, "deadlock"),
            GameEnd::Forced => write!(f, "forced"),
        }
    }
}

/// Events emitted by the device.
#[derive(Debug, Clone)]
pub enum GameEvent {
    /// A verified request is about to be handled.
    CommandReceived { command: Command },
    /// A frame failed its checksum.
    ChecksumMismatch { computed: u8, received: u8 },
    /// New board dealt.
    GameStarted,
    /// Swap refused; the board is unchanged.
    MoveRejected { mv: Move, reason: MoveError },
    /// Swap accepted.
    MoveCommitted {
        mv: Move,
        removed: u32,
        points: u32,
        score: u32,
    },
    /// One cascade phase finished.
    CascadeStep { phase: CascadePhase, changed: usize },
    /// Game over, with the leaderboard rank it earned.
    GameOver {
        reason: GameEnd,
        score: u32,
        rank: Option<usize>,
    },
    /// Save slot written.
    Saved { slot: u8 },
    /// Save slot restored.
    Loaded { slot: u8, score: u32 },
    /// Flash or slot error.
    StorageFailed { op: &'static str, message: String },
    /// Raw frame on the wire.
    Packet {
        direction: PacketDirection,
        data: Vec<u8>,
    },
    /// Log message.
    Log { level: LogLevel, message: String },
}

/// Observer trait for receiving device events.
///
/// Implement this trait in a harness to follow the game.
pub trait GameObserver: Send + Sync {
    /// Called when an event occurs.
    fn on_event(&self, event: &GameEvent);
}

/// No-op observer that discards all events.
pub struct NullObserver;

impl GameObserver for NullObserver {
    fn on_event(&self, _event: &GameEvent) {}
}

/// Observer that logs events using tracing.
pub struct TracingObserver;

impl GameObserver for TracingObserver {
    fn on_event(&self, event: &GameEvent) {
        match event {
            GameEvent::CommandReceived { command } => {
                tracing::debug!(command = %command, "Command received");
            }
            GameEvent::ChecksumMismatch { computed, received } => {
                tracing::warn!(
                    computed = %format!("{:02X}", computed),
                    received = %format!("{:02X}", received),
                    "Checksum mismatch"
                );
            }
            GameEvent::GameStarted => {
                tracing::info!("New game");
            }
            GameEvent::MoveRejected { mv, reason } => {
                tracing::debug!(mv = %mv, "Move rejected: {}", reason);
            }
            GameEvent::MoveCommitted {
                mv,
                removed,
                points,
                score,
            } => {
                tracing::info!(mv = %mv, removed, points, score, "Move committed");
            }
            GameEvent::CascadeStep { phase, changed } => {
                tracing::trace!(phase = ?phase, changed, "Cascade step");
            }
            GameEvent::GameOver {
                reason,
                score,
                rank,
            } => {
                tracing::info!(reason = %reason, score, rank = ?rank, "Game over");
            }
            GameEvent::Saved { slot } => {
                tracing::info!(slot, "Saved");
            }
            GameEvent::Loaded { slot, score } => {
                tracing::info!(slot, score, "Loaded");
            }
            GameEvent::StorageFailed { op, message } => {
                tracing::error!(op = %op, "Storage error: {}", message);
            }
            GameEvent::Packet { direction, data } => {
                tracing::trace!(dir = %direction, data = %format!("{:02X?}", data), "Frame");
            }
            GameEvent::Log { level, message } => match level {
                LogLevel::Trace => tracing::trace!("{}", message),
                LogLevel::Debug => tracing::debug!("{}", message),
                LogLevel::Info => tracing::info!("{}", message),
                LogLevel::Warn => tracing::warn!("{}", message),
                LogLevel::Error => tracing::error!("{}", message),
            },
        }
    }
}

/// Observer that keeps every event, for tests and the host harness.
#[derive(Default)]
pub struct RecordingObserver {
    events: std::sync::Mutex<Vec<GameEvent>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drain recorded events.
    pub fn take(&self) -> Vec<GameEvent> {
        self.events
            .lock()
            .map(|mut events| std::mem::take(&mut *events))
            .unwrap_or_default()
    }
}

impl GameObserver for RecordingObserver {
    fn on_event(&self, event: &GameEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}
