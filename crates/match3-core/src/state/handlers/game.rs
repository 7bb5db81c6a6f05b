//! Board command handlers.

use anyhow::Result;
use tracing::debug;

use crate::board::{Move, Pos};
use crate::events::{GameEnd, GameEvent, GameObserver, LogLevel};
use crate::protocol::{
    CMD_FORCE_FINISH, CMD_GET_CELL, CMD_GET_SCORE, CMD_NEW_GAME, CMD_SWAP, Frame, STATUS_DEADLOCK,
    STATUS_FAIL, STATUS_OK,
};
use crate::storage::FlashInterface;
use crate::transport::{Clock, SerialPort};

use super::{HandleResult, HandlerContext, push_diff, record_final_score};

/// 0x10 - deal a new board and send all of it.
pub fn handle_new_game<S: SerialPort, F: FlashInterface, C: Clock, O: GameObserver>(
    ctx: &mut HandlerContext<'_, S, F, C, O>,
) -> Result<HandleResult> {
    ctx.engine.init();
    ctx.emit(GameEvent::GameStarted);
    ctx.reply(Frame::new(CMD_NEW_GAME, 0, 0, 0, STATUS_OK))?;
    let frames = ctx.notifier.full(ctx.engine.board());
    ctx.reply_all(&frames)?;
    Ok(HandleResult::Continue)
}

/// 0x11 - swap two cells.
///
/// On success: AA, a diff of the cleared cells, one diff per cascade
/// step, then DD if the settled board has no move left. On failure: EE
/// and nothing else.
pub fn handle_swap<S: SerialPort, F: FlashInterface, C: Clock, O: GameObserver>(
    ctx: &mut HandlerContext<'_, S, F, C, O>,
    mv: Move,
) -> Result<HandleResult> {
    ctx.notifier.observe(ctx.engine.board());

    let outcome = match ctx.engine.swap(mv) {
        Ok(outcome) => outcome,
        Err(reason) => {
            ctx.emit(GameEvent::MoveRejected { mv, reason });
            ctx.reply(Frame::new(CMD_SWAP, 0, 0, 0, STATUS_FAIL))?;
            return Ok(HandleResult::Continue);
        }
    };

    ctx.emit(GameEvent::MoveCommitted {
        mv,
        removed: outcome.removed,
        points: outcome.points,
        score: ctx.engine.score(),
    });
    ctx.reply(Frame::new(CMD_SWAP, 0, 0, 0, STATUS_OK))?;
    ctx.push_diff()?;

    let mut cascade = ctx.engine.cascade();
    for step in cascade.by_ref() {
        let changed = push_diff(ctx.serial, ctx.clock, ctx.notifier, &step.board, ctx.pacing)?;
        ctx.observer.on_event(&GameEvent::CascadeStep {
            phase: step.phase,
            changed,
        });
    }
    let summary = cascade.summary();
    debug!(passes = summary.passes, points = summary.points, "Cascade settled");

    if ctx.engine.has_possible_moves() {
        return Ok(HandleResult::Continue);
    }

    ctx.log(LogLevel::Info, "No moves left");
    ctx.reply(Frame::new(CMD_SWAP, 0, 0, 0, STATUS_DEADLOCK))?;
    let score = ctx.engine.score();
    let rank = record_final_score(ctx, GameEnd::Deadlock);
    Ok(HandleResult::GameOver { score, rank })
}

/// 0x12 - end the game now: offer the score to the leaderboard and reset.
///
/// A game that already ended in deadlock was recorded then; it is only
/// reset.
pub fn handle_force_finish<S: SerialPort, F: FlashInterface, C: Clock, O: GameObserver>(
    ctx: &mut HandlerContext<'_, S, F, C, O>,
) -> Result<HandleResult> {
    let recorded = ctx.engine.is_finished();
    let score = ctx.engine.score();
    let rank = record_final_score(ctx, GameEnd::Forced);
    ctx.engine.init();
    ctx.log(LogLevel::Info, format!("Game finished by host, score {score}"));
    ctx.reply(Frame::new(CMD_FORCE_FINISH, 0, 0, 0, STATUS_OK))?;
    if recorded {
        return Ok(HandleResult::Continue);
    }
    Ok(HandleResult::GameOver { score, rank })
}

/// 0x14 - read one cell.
pub fn handle_get_cell<S: SerialPort, F: FlashInterface, C: Clock, O: GameObserver>(
    ctx: &mut HandlerContext<'_, S, F, C, O>,
    row: u8,
    col: u8,
) -> Result<HandleResult> {
    let frame = match ctx.engine.cell(Pos::new(row, col)) {
        Some(cell) => Frame::new(CMD_GET_CELL, row, col, cell.raw(), STATUS_OK),
        None => Frame::new(CMD_GET_CELL, row, col, 0, STATUS_FAIL),
    };
    ctx.reply(frame)?;
    Ok(HandleResult::Continue)
}

/// Score frame `[0x15, s3, s2, s1, s0]`, big-endian.
pub(crate) fn score_frame(score: u32) -> Frame {
    let [s3, s2, s1, s0] = score.to_be_bytes();
    Frame::new(CMD_GET_SCORE, s3, s2, s1, s0)
}

/// 0x15 - read the score.
pub fn handle_get_score<S: SerialPort, F: FlashInterface, C: Clock, O: GameObserver>(
    ctx: &mut HandlerContext<'_, S, F, C, O>,
) -> Result<HandleResult> {
    ctx.reply(score_frame(ctx.engine.score()))?;
    Ok(HandleResult::Continue)
}
