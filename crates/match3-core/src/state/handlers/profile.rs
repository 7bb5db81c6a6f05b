//! Player name upload.

use anyhow::Result;
use tracing::debug;

use crate::events::{GameObserver, LogLevel};
use crate::protocol::{CMD_SET_NAME, Frame, STATUS_OK};
use crate::storage::FlashInterface;
use crate::transport::{Clock, SerialPort};

use super::{HandleResult, HandlerContext};

/// 0x20 - write three name bytes at `index * 3`.
///
/// Always acknowledged, even for an index the buffer ignores.
pub fn handle_set_name<S: SerialPort, F: FlashInterface, C: Clock, O: GameObserver>(
    ctx: &mut HandlerContext<'_, S, F, C, O>,
    index: u8,
    bytes: [u8; 3],
) -> Result<HandleResult> {
    let accepted = ctx.engine.player_name_mut().write_chunk(index, bytes);
    debug!(index, accepted, name = %ctx.engine.player_name(), "Name chunk");
    if !accepted {
        ctx.log(LogLevel::Warn, format!("Name chunk {index} out of range, ignored"));
    }
    ctx.reply(Frame::new(CMD_SET_NAME, index, 0, 0, STATUS_OK))?;
    Ok(HandleResult::Continue)
}
