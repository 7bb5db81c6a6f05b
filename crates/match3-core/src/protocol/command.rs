//! Typed request parsing.
//!
//! A verified [`Frame`] is turned into a [`Command`] before dispatch, so
//! handlers never look at raw argument bytes.

use std::fmt;

use super::constants::*;
use super::frame::Frame;
use crate::board::Move;

/// A host request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    NewGame,
    Swap(Move),
    ForceFinish,
    GetCell { row: u8, col: u8 },
    GetScore,
    SetNameChunk { index: u8, bytes: [u8; 3] },
    Save { slot: u8 },
    Load { slot: u8 },
    QuerySlotName { slot: u8 },
    GetLeaderboard,
    /// Any command byte not listed above.
    Unknown(u8),
}

impl Command {
    /// Interpret a checksum-verified frame.
    pub fn parse(frame: &Frame) -> Self {
        let [a, b, c, d] = frame.args;
        match frame.cmd {
            CMD_NEW_GAME => Command::NewGame,
            CMD_SWAP => Command::Swap(Move::new(a, b, c, d)),
            CMD_FORCE_FINISH => Command::ForceFinish,
            CMD_GET_CELL => Command::GetCell { row: a, col: b },
            CMD_GET_SCORE => Command::GetScore,
            CMD_SET_NAME => Command::SetNameChunk {
                index: a,
                bytes: [b, c, d],
            },
            CMD_SAVE => Command::Save { slot: a },
            CMD_LOAD => Command::Load { slot: a },
            CMD_QUERY_SLOT => Command::QuerySlotName { slot: a },
            CMD_LEADERBOARD => Command::GetLeaderboard,
            other => Command::Unknown(other),
        }
    }

    /// Command byte on the wire.
    pub fn opcode(&self) -> u8 {
        match self {
            Command::NewGame => CMD_NEW_GAME,
            Command::Swap(_) => CMD_SWAP,
            Command::ForceFinish => CMD_FORCE_FINISH,
            Command::GetCell { .. } => CMD_GET_CELL,
            Command::GetScore => CMD_GET_SCORE,
            Command::SetNameChunk { .. } => CMD_SET_NAME,
            Command::Save { .. } => CMD_SAVE,
            Command::Load { .. } => CMD_LOAD,
            Command::QuerySlotName { .. } => CMD_QUERY_SLOT,
            Command::GetLeaderboard => CMD_LEADERBOARD,
            Command::Unknown(code) => *code,
        }
    }

    /// Request frame for this command (used by hosts and tests).
    pub fn to_frame(&self) -> Frame {
        let cmd = self.opcode();
        match *self {
            Command::Swap(mv) => Frame::new(cmd, mv.from.row, mv.from.col, mv.to.row, mv.to.col),
            Command::GetCell { row, col } => Frame::new(cmd, row, col, 0, 0),
            Command::SetNameChunk { index, bytes } => {
                Frame::new(cmd, index, bytes[0], bytes[1], bytes[2])
            }
            Command::Save { slot } | Command::Load { slot } | Command::QuerySlotName { slot } => {
                Frame::new(cmd, slot, 0, 0, 0)
            }
            _ => Frame::new(cmd, 0, 0, 0, 0),
        }
    }
}

impl From<&Frame> for Command {
    fn from(frame: &Frame) -> Self {
        Command::parse(frame)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::NewGame => write!(f, "NewGame"),
            Command::Swap(mv) => write!(f, "Swap {}", mv),
            Command::ForceFinish => write!(f, "ForceFinish"),
            Command::GetCell { row, col } => write!(f, "GetCell ({},{})", row, col),
            Command::GetScore => write!(f, "GetScore"),
            Command::SetNameChunk { index, .. } => write!(f, "SetNameChunk #{}", index),
            Command::Save { slot } => write!(f, "Save slot {}", slot),
            Command::Load { slot } => write!(f, "Load slot {}", slot),
            Command::QuerySlotName { slot } => write!(f, "QuerySlotName slot {}", slot),
            Command::GetLeaderboard => write!(f, "GetLeaderboard"),
            Command::Unknown(code) => write!(f, "Unknown 0x{:02X}", code),
        }
    }
}
