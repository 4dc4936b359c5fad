// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The byte-counted frame sub-protocol used while receiving a job (RFC 1179 §6).
//
// One frame is:
//
//   <subcmd><count> <name>\n      server acks with 0 (or 1 and aborts)
//   <count bytes of payload>
//   <one transfer-status byte>    server echoes it back
//
// A connection that closes, or sends an empty line, between frames ends the
// session normally.  Everything else that goes wrong fails the whole session.

use sha2::{Digest, Sha256};
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, warn};

use lpdgate_core::error::{LpdgateError, Result};

use super::connection::{LpdConnection, ProtocolStatus};
use super::transaction::{FileKind, JobTransaction, PendingFile};

/// Receive-job sub-commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubCommand {
    /// `0x01`: abort job.
    Abort,
    /// `0x02`: receive control file.
    ReceiveControl,
    /// `0x03`: receive data file.
    ReceiveData,
}

impl SubCommand {
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0x01 => Some(Self::Abort),
            0x02 => Some(Self::ReceiveControl),
            0x03 => Some(Self::ReceiveData),
            _ => None,
        }
    }
}

/// A parsed sub-command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameHeader {
    pub subcommand: SubCommand,
    /// Declared payload length; zero for `Abort`.
    pub length: u64,
    pub name: String,
}

/// Parse `<subcmd><count> <name>` (terminator already stripped).
pub fn parse_frame_line(line: &[u8]) -> Result<FrameHeader> {
    let (&code, rest) = line
        .split_first()
        .ok_or_else(|| LpdgateError::Protocol("empty sub-command line".into()))?;

    let subcommand = SubCommand::from_code(code)
        .ok_or_else(|| LpdgateError::Protocol(format!("unknown sub-command 0x{code:02X}")))?;

    if subcommand == SubCommand::Abort {
        return Ok(FrameHeader {
            subcommand,
            length: 0,
            name: String::new(),
        });
    }

    let rest = String::from_utf8_lossy(rest);
    let (count, name) = super::command::split_first_word(rest.trim());
    let length: u64 = count
        .parse()
        .map_err(|_| LpdgateError::Protocol(format!("bad byte count {count:?}")))?;

    Ok(FrameHeader {
        subcommand,
        length,
        name: name.trim().to_string(),
    })
}

/// How a call to [`TransferChannel::next_frame`] ended.
#[derive(Debug)]
pub enum Frame {
    /// The client closed the session normally.
    End,
    /// One file was received completely and acknowledged.
    Received(PendingFile),
}

/// Drives the frame sub-protocol over one connection.
pub struct TransferChannel<'c, R, W> {
    conn: &'c mut LpdConnection<R, W>,
}

impl<'c, R, W> TransferChannel<'c, R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(conn: &'c mut LpdConnection<R, W>) -> Self {
        Self { conn }
    }

    /// Receive the next frame into `txn`.
    ///
    /// Any `Err` means the session is over and must be reported as failed.
    pub async fn next_frame(&mut self, txn: &mut JobTransaction) -> Result<Frame> {
        let line = match self.conn.read_line().await {
            Ok(None) => return Ok(Frame::End),
            Ok(Some(line)) if line.is_empty() => return Ok(Frame::End),
            Ok(Some(line)) => line,
            Err(e @ LpdgateError::Protocol(_)) => return self.reject(e).await,
            Err(e) => return Err(e),
        };

        let header = match parse_frame_line(&line) {
            Ok(header) => header,
            Err(e) => return self.reject(e).await,
        };

        let kind = match header.subcommand {
            SubCommand::Abort => {
                return self
                    .reject(LpdgateError::Protocol("job aborted by client".into()))
                    .await;
            }
            SubCommand::ReceiveControl => FileKind::Control,
            SubCommand::ReceiveData => FileKind::Data,
        };

        if header.name.chars().count() < 2 {
            return self
                .reject(LpdgateError::Protocol(format!(
                    "bad file name {:?}",
                    header.name
                )))
                .await;
        }

        let opened = match kind {
            FileKind::Control => txn.open_control().await,
            FileKind::Data => txn.open_data(&header.name),
        };
        let (mut sink, path) = match opened {
            Ok(opened) => opened,
            Err(e) => return self.reject(e).await,
        };

        self.conn.write_status(ProtocolStatus::Accepted).await?;

        let mut digest = Sha256::new();
        self.conn
            .copy_exact(header.length, &mut sink, &mut digest)
            .await?;
        drop(sink);

        // Any non-zero trailing byte is echoed as 1.
        let trailing = ProtocolStatus::from_byte(self.conn.read_byte().await?);
        self.conn.write_status(trailing).await?;
        if !trailing.is_accepted() {
            return Err(LpdgateError::Protocol(format!(
                "client reported failed transfer of {}",
                header.name
            )));
        }

        debug!(
            kind = ?kind,
            name = %header.name,
            bytes = header.length,
            sha256 = %hex::encode(digest.finalize()),
            "file received"
        );

        Ok(Frame::Received(PendingFile {
            kind,
            declared_length: header.length,
            remote_name: header.name,
            path,
        }))
    }

    async fn reject(&mut self, error: LpdgateError) -> Result<Frame> {
        warn!(error = %error, "rejecting frame");
        self.conn.write_status(ProtocolStatus::Rejected).await?;
        Err(error)
    }
}
