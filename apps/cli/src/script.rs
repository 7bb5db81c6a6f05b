//! Text commands typed by the user and the replies printed back.

use anyhow::{Context, Result, anyhow, bail};
use match3_core::board::{Board, Cell, Move, PlayerName, Pos};
use match3_core::protocol::*;

/// One parsed input line.
#[derive(Debug, PartialEq, Eq)]
pub enum Action {
    /// Raw byte groups to put on the wire, one reply burst per group.
    Send(Vec<Vec<u8>>),
    /// Print the board as the host has seen it.
    ShowBoard,
    Help,
    Quit,
    /// Blank line or comment.
    Nothing,
}

pub const HELP: &str = "\
commands:
  new                    deal a new board
  swap R1 C1 R2 C2       swap two cells
  cell R C               read one cell
  score                  read the score
  name NAME              upload the player name
  save N | load N        save or restore slot N
  slot N                 name stored in slot N
  leaders                read the leaderboard
  finish                 end the game now
  raw HEX..              send bytes (5 bytes get a checksum appended)
  board                  show the host view of the board
  quit";

fn arg<T: std::str::FromStr>(parts: &[&str], i: usize, what: &str) -> Result<T> {
    let text = parts
        .get(i)
        .ok_or_else(|| anyhow!("missing {what}"))?;
    text.parse()
        .map_err(|_| anyhow!("bad {what}: {text}"))
}

fn frames(commands: impl IntoIterator<Item = Command>) -> Action {
    Action::Send(
        commands
            .into_iter()
            .map(|c| c.to_frame().encode().to_vec())
            .collect(),
    )
}

/// Parse one line of input.
pub fn parse_line(line: &str) -> Result<Action> {
    let line = line.split('#').next().unwrap_or("").trim();
    let parts: Vec<&str> = line.split_whitespace().collect();
    let Some(&word) = parts.first() else {
        return Ok(Action::Nothing);
    };

    let action = match word {
        "new" => frames([Command::NewGame]),
        "swap" => frames([Command::Swap(Move::new(
            arg(&parts, 1, "row")?,
            arg(&parts, 2, "col")?,
            arg(&parts, 3, "row")?,
            arg(&parts, 4, "col")?,
        ))]),
        "cell" => frames([Command::GetCell {
            row: arg(&parts, 1, "row")?,
            col: arg(&parts, 2, "col")?,
        }]),
        "score" => frames([Command::GetScore]),
        "name" => {
            let text = line["name".len()..].trim();
            if text.is_empty() {
                bail!("missing name");
            }
            let name = PlayerName::new(text);
            frames((0..LOAD_NAME_CHUNKS).map(|index| Command::SetNameChunk {
                index,
                bytes: name.chunk(index as usize),
            }))
        }
        "save" => frames([Command::Save {
            slot: arg(&parts, 1, "slot")?,
        }]),
        "load" => frames([Command::Load {
            slot: arg(&parts, 1, "slot")?,
        }]),
        "slot" => frames([Command::QuerySlotName {
            slot: arg(&parts, 1, "slot")?,
        }]),
        "leaders" => frames([Command::GetLeaderboard]),
        "finish" => frames([Command::ForceFinish]),
        "raw" => Action::Send(vec![parse_raw(&parts[1..])?]),
        "board" => Action::ShowBoard,
        "help" | "?" => Action::Help,
        "quit" | "exit" => Action::Quit,
        other => bail!("unknown command '{other}', try 'help'"),
    };
    Ok(action)
}

fn parse_raw(words: &[&str]) -> Result<Vec<u8>> {
    let mut bytes = words
        .iter()
        .map(|w| {
            let w = w.trim_start_matches("0x");
            u8::from_str_radix(w, 16).with_context(|| format!("bad hex byte '{w}'"))
        })
        .collect::<Result<Vec<u8>>>()?;
    match bytes.len() {
        PAYLOAD_LEN => bytes.push(crc8(&bytes)),
        FRAME_LEN => {}
        n => bail!("raw needs 5 or 6 bytes, got {n}"),
    }
    Ok(bytes)
}

/// Human-readable line for a reply frame.
pub fn describe(frame: &Frame) -> String {
    let [a, b, c, d] = frame.args;
    let status = match d {
        STATUS_OK => "ok",
        STATUS_FAIL => "fail",
        STATUS_DEADLOCK => "no moves left",
        STATUS_UNKNOWN => "unknown command",
        _ => "",
    };
    let text = |bytes: &[u8]| -> String {
        bytes
            .iter()
            .take_while(|&&b| b != 0)
            .map(|&b| b as char)
            .collect()
    };
    let detail = match frame.cmd {
        RSP_CELL => format!("cell ({a},{b}) = {c}"),
        CMD_GET_SCORE => format!("score {}", u32::from_be_bytes([a, b, c, d])),
        RSP_BAD_CRC => format!("checksum mismatch: computed {a:02X}, received {b:02X}"),
        RSP_LOAD_NAME if d != STATUS_OK && d != STATUS_FAIL => {
            format!("name[{}] \"{}\"", a, text(&[b, c, d]))
        }
        cmd if (RSP_SLOT_NAME_BASE..RSP_SLOT_NAME_BASE + SLOT_NAME_CHUNKS as u8).contains(&cmd) => {
            format!("slot {a} name part \"{}\"", text(&[b, c, d]))
        }
        RSP_LB_NAME_0 | RSP_LB_NAME_1 | RSP_LB_NAME_2 | RSP_LB_NAME_3 => {
            format!("#{} name part \"{}\"", a + 1, text(&[b, c, d]))
        }
        RSP_LB_SCORE => format!("#{} score {}", a + 1, u32::from_be_bytes([0, b, c, d])),
        CMD_GET_CELL => format!("cell ({a},{b}) = {c} {status}"),
        _ => status.to_string(),
    };
    format!("{frame}  {detail}")
}

/// Board as the host knows it, rebuilt from cell frames.
#[derive(Debug, Default)]
pub struct HostView {
    board: Board,
}

impl HostView {
    /// Apply a reply. Returns true if it was a cell update.
    pub fn apply(&mut self, frame: &Frame) -> bool {
        if frame.cmd != RSP_CELL {
            return false;
        }
        match Cell::from_raw(frame.c()) {
            Some(cell) => self.board.set(Pos::new(frame.a(), frame.b()), cell),
            None => false,
        }
    }

    pub fn board(&self) -> &Board {
        &self.board
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sent(action: Action) -> Vec<Frame> {
        match action {
            Action::Send(groups) => groups
                .iter()
                .map(|g| Frame::decode(g).unwrap())
                .collect(),
            other => panic!("expected frames, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_swap() {
        let frames = sent(parse_line("swap 6 2 7 2").unwrap());
        assert_eq!(frames, vec![Frame::new(CMD_SWAP, 6, 2, 7, 2)]);
    }

    #[test]
    fn test_parse_name_makes_six_chunks() {
        let frames = sent(parse_line("name Ann Lee").unwrap());
        assert_eq!(frames.len(), 6);
        assert_eq!(frames[0], Frame::new(CMD_SET_NAME, 0, b'A', b'n', b'n'));
        assert_eq!(frames[1], Frame::new(CMD_SET_NAME, 1, b' ', b'L', b'e'));
        assert_eq!(frames[2], Frame::new(CMD_SET_NAME, 2, b'e', 0, 0));
    }

    #[test]
    fn test_parse_raw_appends_checksum() {
        match parse_line("raw 10 00 00 00 00").unwrap() {
            Action::Send(groups) => assert_eq!(groups, vec![vec![0x10, 0, 0, 0, 0, 0x32]]),
            other => panic!("unexpected {other:?}"),
        }
        match parse_line("raw 10 00 00 00 00 FF").unwrap() {
            Action::Send(groups) => assert_eq!(groups[0][5], 0xFF),
            other => panic!("unexpected {other:?}"),
        }
        assert!(parse_line("raw 10 00").is_err());
        assert!(parse_line("raw zz 00 00 00 00").is_err());
    }

    #[test]
    fn test_parse_errors_and_local_commands() {
        assert!(parse_line("swap 1 2 3").is_err());
        assert!(parse_line("cell x 1").is_err());
        assert!(parse_line("dance").is_err());
        assert_eq!(parse_line("   # comment").unwrap(), Action::Nothing);
        assert_eq!(parse_line("board").unwrap(), Action::ShowBoard);
        assert_eq!(parse_line("quit").unwrap(), Action::Quit);
    }

    #[test]
    fn test_describe() {
        assert!(describe(&Frame::new(CMD_GET_SCORE, 0, 0, 0x01, 0xF4)).ends_with("score 500"));
        assert!(describe(&Frame::new(RSP_LB_SCORE, 0, 0, 0x01, 0xF4)).ends_with("#1 score 500"));
        assert!(describe(&Frame::new(CMD_SWAP, 0, 0, 0, STATUS_DEADLOCK)).ends_with("no moves left"));
        assert!(describe(&Frame::new(RSP_LOAD_NAME, 0, b'A', b'n', b'n')).ends_with("name[0] \"Ann\""));
    }

    #[test]
    fn test_host_view_applies_cells() {
        let mut view = HostView::default();
        assert!(view.apply(&Frame::new(RSP_CELL, 2, 3, 5, STATUS_OK)));
        assert!(!view.apply(&Frame::new(CMD_SWAP, 0, 0, 0, STATUS_OK)));
        assert_eq!(view.board().get(Pos::new(2, 3)), Cell::from_raw(5));
    }
}
