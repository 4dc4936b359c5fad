// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// RFC 1179 daemon commands (§3–§7) and the opening-line parser.

use std::fmt;

/// The five daemon commands a connection may open with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    /// `0x01`: print any waiting jobs.
    NoOp,
    /// `0x02`: receive a printer job.
    ReceiveJob,
    /// `0x03`: send queue state (short).
    ShortStatus,
    /// `0x04`: send queue state (long).
    LongStatus,
    /// `0x05`: remove jobs.
    RemoveJobs,
}

impl CommandKind {
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0x01 => Some(Self::NoOp),
            0x02 => Some(Self::ReceiveJob),
            0x03 => Some(Self::ShortStatus),
            0x04 => Some(Self::LongStatus),
            0x05 => Some(Self::RemoveJobs),
            _ => None,
        }
    }

    pub fn code(self) -> u8 {
        match self {
            Self::NoOp => 0x01,
            Self::ReceiveJob => 0x02,
            Self::ShortStatus => 0x03,
            Self::LongStatus => 0x04,
            Self::RemoveJobs => 0x05,
        }
    }
}

/// A parsed opening line.  Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub kind: CommandKind,
    /// Queue name, optionally `queue/instance`.
    pub destination: String,
    /// Everything after the destination: a user/job list, or for removal
    /// the agent followed by the list.
    pub argument: String,
}

/// The opening line carried a command byte we do not implement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownCommand {
    pub code: u8,
    pub rest: String,
}

impl fmt::Display for UnknownCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown LPD command 0x{:02X} ({})", self.code, self.rest)
    }
}

impl Command {
    /// Parse the opening line (terminator already stripped).
    ///
    /// Byte 0 is the command code.  The remainder splits on its first
    /// whitespace run into destination and argument.  A receive-job line has
    /// no operands after the queue, so its whole remainder is the
    /// destination; this keeps queue descriptions containing spaces intact.
    pub fn parse(line: &[u8]) -> Result<Self, UnknownCommand> {
        let code = line.first().copied().unwrap_or(0);
        let rest = String::from_utf8_lossy(line.get(1..).unwrap_or_default()).into_owned();

        let Some(kind) = CommandKind::from_code(code) else {
            return Err(UnknownCommand { code, rest });
        };

        let (destination, argument) = if kind == CommandKind::ReceiveJob {
            (rest.trim_end().to_string(), String::new())
        } else {
            let (dest, arg) = split_first_word(&rest);
            (dest.to_string(), arg.to_string())
        };

        Ok(Self {
            kind,
            destination,
            argument,
        })
    }

    /// For `RemoveJobs`: the acting agent and the remaining job list.
    pub fn removal_operands(&self) -> (&str, &str) {
        split_first_word(&self.argument)
    }
}

/// Split at the first whitespace run: `("word", "rest of line")`.
pub fn split_first_word(s: &str) -> (&str, &str) {
    match s.find(char::is_whitespace) {
        Some(at) => (&s[..at], s[at..].trim_start()),
        None => (s, ""),
    }
}

/// Parse a leading positive job id the way `atoi` would, returning the id
/// and the list with that id (and the whitespace after it) consumed.
///
/// Returns `None` when the list does not start with a positive integer.
pub fn split_leading_job_id(list: &str) -> Option<(i32, &str)> {
    let list = list.trim_start();
    let digits = list.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return None;
    }

    let id: i32 = list[..digits].parse().ok()?;
    if id <= 0 {
        return None;
    }

    Some((id, list[digits..].trim_start()))
}
