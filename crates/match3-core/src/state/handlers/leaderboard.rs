//! Leaderboard handlers.

use anyhow::Result;
use tracing::warn;

use crate::events::{GameEnd, GameEvent, GameObserver, LogLevel};
use crate::protocol::{
    CMD_LEADERBOARD, Frame, RSP_LB_NAME_0, RSP_LB_NAME_1, RSP_LB_NAME_2, RSP_LB_NAME_3,
    RSP_LB_SCORE, STATUS_FAIL,
};
use crate::storage::FlashInterface;
use crate::transport::{Clock, SerialPort};

use super::{HandleResult, HandlerContext};

/// Offer the current score to the leaderboard, once per game. Storage
/// errors are reported as events and not retried; the game still ends.
pub(crate) fn record_final_score<S: SerialPort, F: FlashInterface, C: Clock, O: GameObserver>(
    ctx: &mut HandlerContext<'_, S, F, C, O>,
    reason: GameEnd,
) -> Option<usize> {
    if ctx.engine.is_finished() {
        ctx.log(LogLevel::Debug, "Score already recorded for this game");
        return None;
    }
    let score = ctx.engine.score();
    let name = *ctx.engine.player_name();
    let rank = match ctx.with_rx_suspended(|store| store.submit_score(score, &name)) {
        Ok(rank) => rank,
        Err(e) => {
            warn!(error = %e, "Leaderboard update failed");
            ctx.emit(GameEvent::StorageFailed {
                op: "leaderboard",
                message: e.to_string(),
            });
            None
        }
    };
    ctx.engine.mark_finished();
    ctx.emit(GameEvent::GameOver {
        reason,
        score,
        rank,
    });
    rank
}

/// 0x40 - stream the table.
///
/// Per entry `i`: name bytes 0..3, 3..6, 6..9 and 9 (`0x41`, `0x43`,
/// `0x44`, `0x45`), then the low 24 bits of the score (`0x42`).
pub fn handle_leaderboard<S: SerialPort, F: FlashInterface, C: Clock, O: GameObserver>(
    ctx: &mut HandlerContext<'_, S, F, C, O>,
) -> Result<HandleResult> {
    let table = match ctx.store.leaderboard() {
        Ok(table) => table,
        Err(e) => {
            ctx.emit(GameEvent::StorageFailed {
                op: "leaderboard",
                message: e.to_string(),
            });
            ctx.reply(Frame::new(CMD_LEADERBOARD, 0, 0, 0, STATUS_FAIL))?;
            return Ok(HandleResult::Continue);
        }
    };

    let mut frames = Vec::with_capacity(table.entries().len() * 5);
    for (i, entry) in table.entries().iter().enumerate() {
        let i = i as u8;
        let n = entry.name.as_bytes();
        let [_, s2, s1, s0] = entry.score.to_be_bytes();
        frames.push(Frame::new(RSP_LB_NAME_0, i, n[0], n[1], n[2]));
        frames.push(Frame::new(RSP_LB_NAME_1, i, n[3], n[4], n[5]));
        frames.push(Frame::new(RSP_LB_NAME_2, i, n[6], n[7], n[8]));
        frames.push(Frame::new(RSP_LB_NAME_3, i, n[9], 0, 0));
        frames.push(Frame::new(RSP_LB_SCORE, i, s2, s1, s0));
    }
    ctx.reply_all(&frames)?;
    Ok(HandleResult::Continue)
}
