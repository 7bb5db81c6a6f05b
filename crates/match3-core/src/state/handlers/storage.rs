//! Save slot handlers.

use anyhow::Result;
use tracing::warn;

use crate::events::{GameEvent, GameObserver, LogLevel};
use crate::protocol::{
    CMD_LOAD, CMD_QUERY_SLOT, CMD_SAVE, Frame, LOAD_NAME_CHUNKS, RSP_LOAD_NAME,
    RSP_SLOT_NAME_BASE, SLOT_NAME_CHUNKS, STATUS_FAIL, STATUS_OK,
};
use crate::storage::{FlashInterface, SaveRecord, StorageError};
use crate::transport::{Clock, SerialPort};

use super::game::score_frame;
use super::{HandleResult, HandlerContext};

fn report<S: SerialPort, F: FlashInterface, C: Clock, O: GameObserver>(
    ctx: &HandlerContext<'_, S, F, C, O>,
    op: &'static str,
    error: &StorageError,
) {
    warn!(op, error = %error, "Storage operation failed");
    ctx.emit(GameEvent::StorageFailed {
        op,
        message: error.to_string(),
    });
}

/// 0x30 - save the current game to a slot.
pub fn handle_save<S: SerialPort, F: FlashInterface, C: Clock, O: GameObserver>(
    ctx: &mut HandlerContext<'_, S, F, C, O>,
    slot: u8,
) -> Result<HandleResult> {
    let record = SaveRecord {
        score: ctx.engine.score(),
        name: *ctx.engine.player_name(),
        board: *ctx.engine.board(),
    };
    let status = match ctx.with_rx_suspended(|store| store.save(slot, &record)) {
        Ok(()) => {
            ctx.emit(GameEvent::Saved { slot });
            STATUS_OK
        }
        Err(e) => {
            report(ctx, "save", &e);
            STATUS_FAIL
        }
    };
    ctx.reply(Frame::new(CMD_SAVE, slot, 0, 0, status))?;
    Ok(HandleResult::Continue)
}

/// 0x31 - restore a slot.
///
/// On success: AA, six name chunks, the score frame and the full board.
/// An empty or invalid slot answers EE and changes nothing.
pub fn handle_load<S: SerialPort, F: FlashInterface, C: Clock, O: GameObserver>(
    ctx: &mut HandlerContext<'_, S, F, C, O>,
    slot: u8,
) -> Result<HandleResult> {
    let record = match ctx.store.load(slot) {
        Ok(Some(record)) => record,
        Ok(None) => {
            ctx.log(LogLevel::Info, format!("Slot {slot} is empty"));
            ctx.reply(Frame::new(CMD_LOAD, slot, 0, 0, STATUS_FAIL))?;
            return Ok(HandleResult::Continue);
        }
        Err(e) => {
            report(ctx, "load", &e);
            ctx.reply(Frame::new(CMD_LOAD, slot, 0, 0, STATUS_FAIL))?;
            return Ok(HandleResult::Continue);
        }
    };

    ctx.engine
        .load_state(record.score, record.name, record.board);
    ctx.emit(GameEvent::Loaded {
        slot,
        score: record.score,
    });

    ctx.reply(Frame::new(CMD_LOAD, slot, 0, 0, STATUS_OK))?;
    let name = ctx.engine.player_name();
    let mut frames: Vec<Frame> = (0..LOAD_NAME_CHUNKS)
        .map(|i| {
            let [x, y, z] = name.chunk(i as usize);
            Frame::new(RSP_LOAD_NAME, i, x, y, z)
        })
        .collect();
    frames.push(score_frame(record.score));
    ctx.reply_all(&frames)?;

    let board = ctx.notifier.full(ctx.engine.board());
    ctx.reply_all(&board)?;
    Ok(HandleResult::Continue)
}

/// 0x32 - name stored in a slot, as four 3-byte chunks (`0x33..=0x36`)
/// followed by a status frame.
pub fn handle_query_slot<S: SerialPort, F: FlashInterface, C: Clock, O: GameObserver>(
    ctx: &mut HandlerContext<'_, S, F, C, O>,
    slot: u8,
) -> Result<HandleResult> {
    let name = match ctx.store.slot_name(slot) {
        Ok(name) => name,
        Err(e) => {
            report(ctx, "slot_name", &e);
            None
        }
    };
    let Some(name) = name else {
        ctx.reply(Frame::new(CMD_QUERY_SLOT, slot, 0, 0, STATUS_FAIL))?;
        return Ok(HandleResult::Continue);
    };

    let frames: Vec<Frame> = (0..SLOT_NAME_CHUNKS)
        .map(|i| {
            let [x, y, z] = name.chunk(i);
            Frame::new(RSP_SLOT_NAME_BASE + i as u8, slot, x, y, z)
        })
        .collect();
    ctx.reply_all(&frames)?;
    ctx.reply(Frame::new(CMD_QUERY_SLOT, slot, 0, 0, STATUS_OK))?;
    Ok(HandleResult::Continue)
}
