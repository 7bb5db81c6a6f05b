//! Command handlers - dispatch logic for each request.
//!
//! This module is split into submodules by functionality:
//! - `game`: board commands (new game, swap, finish, cell and score reads)
//! - `profile`: player name upload
//! - `storage`: save, load and slot-name queries
//! - `leaderboard`: leaderboard read and final-score submission

mod game;
mod leaderboard;
mod profile;
mod storage;

use anyhow::Result;
use tracing::trace;

use crate::board::{Board, Engine};
use crate::diff::DiffNotifier;
use crate::events::{GameEvent, GameObserver, LogLevel};
use crate::protocol::{Command, Frame, FrameError, RxLine, STATUS_UNKNOWN};
use crate::storage::{FlashInterface, PersistenceStore};
use crate::transport::{Clock, SerialPort};

use game::{handle_force_finish, handle_get_cell, handle_get_score, handle_new_game, handle_swap};
use leaderboard::handle_leaderboard;
use profile::handle_set_name;
use storage::{handle_load, handle_query_slot, handle_save};

pub(crate) use leaderboard::record_final_score;

/// Result of handling a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleResult {
    /// Reply sent, keep going.
    Continue,
    /// Checksum failed; diagnostic sent, nothing dispatched.
    Rejected,
    /// The game ended and the score was offered to the leaderboard.
    GameOver { score: u32, rank: Option<usize> },
}

/// Delays applied while streaming replies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    /// Between consecutive cell frames.
    pub frame_gap_ms: u32,
    /// After each animation step.
    pub anim_step_ms: u32,
}

/// Handler context containing all resources.
pub struct HandlerContext<'a, S: SerialPort, F: FlashInterface, C: Clock, O: GameObserver> {
    pub serial: &'a S,
    pub clock: &'a C,
    pub observer: &'a O,
    pub rx: &'a RxLine,
    pub engine: &'a mut Engine,
    pub store: &'a mut PersistenceStore<F>,
    pub notifier: &'a mut DiffNotifier,
    pub pacing: Pacing,
}

impl<'a, S: SerialPort, F: FlashInterface, C: Clock, O: GameObserver> HandlerContext<'a, S, F, C, O> {
    pub(crate) fn emit(&self, event: GameEvent) {
        self.observer.on_event(&event);
    }

    pub(crate) fn log(&self, level: LogLevel, message: impl Into<String>) {
        self.emit(GameEvent::Log {
            level,
            message: message.into(),
        });
    }

    /// Send one frame.
    pub(crate) fn reply(&self, frame: Frame) -> Result<()> {
        trace!(frame = %frame, "Reply");
        self.serial.send_frame(&frame)?;
        Ok(())
    }

    /// Send a run of frames with the inter-frame gap.
    pub(crate) fn reply_all(&self, frames: &[Frame]) -> Result<()> {
        send_paced(self.serial, self.clock, frames, self.pacing.frame_gap_ms)
    }

    /// Send cell frames for everything that changed and mark it seen.
    pub(crate) fn push_diff(&mut self) -> Result<usize> {
        let board = *self.engine.board();
        push_diff(self.serial, self.clock, self.notifier, &board, self.pacing)
    }

    /// Run a flash operation with reception suspended.
    pub(crate) fn with_rx_suspended<T>(
        &mut self,
        op: impl FnOnce(&mut PersistenceStore<F>) -> T,
    ) -> T {
        self.rx.suspend();
        let result = op(self.store);
        self.rx.resume();
        result
    }
}

pub(crate) fn send_paced<S: SerialPort, C: Clock>(
    serial: &S,
    clock: &C,
    frames: &[Frame],
    gap_ms: u32,
) -> Result<()> {
    for frame in frames {
        serial.send_frame(frame)?;
        if gap_ms > 0 {
            clock.delay_ms(gap_ms);
        }
    }
    Ok(())
}

/// Diff `board` against what the host has seen, send it, then hold for one
/// animation step if anything changed. Free-standing so it can run while
/// the engine is borrowed by a cascade.
pub(crate) fn push_diff<S: SerialPort, C: Clock>(
    serial: &S,
    clock: &C,
    notifier: &mut DiffNotifier,
    board: &Board,
    pacing: Pacing,
) -> Result<usize> {
    let frames = notifier.diff(board);
    send_paced(serial, clock, &frames, pacing.frame_gap_ms)?;
    if !frames.is_empty() && pacing.anim_step_ms > 0 {
        clock.delay_ms(pacing.anim_step_ms);
    }
    Ok(frames.len())
}

/// Verify a raw frame and run the matching handler.
pub fn handle_frame<S: SerialPort, F: FlashInterface, C: Clock, O: GameObserver>(
    raw: &[u8],
    ctx: &mut HandlerContext<'_, S, F, C, O>,
) -> Result<HandleResult> {
    let frame = match Frame::decode(raw) {
        Ok(frame) => frame,
        Err(FrameError::BadChecksum { computed, received }) => {
            ctx.emit(GameEvent::ChecksumMismatch { computed, received });
            ctx.reply(Frame::bad_checksum(computed, received))?;
            return Ok(HandleResult::Rejected);
        }
        Err(e) => return Err(e.into()),
    };

    let command = Command::parse(&frame);
    ctx.emit(GameEvent::CommandReceived { command });

    match command {
        Command::NewGame => handle_new_game(ctx),
        Command::Swap(mv) => handle_swap(ctx, mv),
        Command::ForceFinish => handle_force_finish(ctx),
        Command::GetCell { row, col } => handle_get_cell(ctx, row, col),
        Command::GetScore => handle_get_score(ctx),
        Command::SetNameChunk { index, bytes } => handle_set_name(ctx, index, bytes),
        Command::Save { slot } => handle_save(ctx, slot),
        Command::Load { slot } => handle_load(ctx, slot),
        Command::QuerySlotName { slot } => handle_query_slot(ctx, slot),
        Command::GetLeaderboard => handle_leaderboard(ctx),
        Command::Unknown(code) => {
            ctx.log(LogLevel::Warn, format!("Unknown command 0x{:02X}", code));
            ctx.reply(Frame::new(code, 0, 0, 0, STATUS_UNKNOWN))?;
            Ok(HandleResult::Continue)
        }
    }
}
