// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Byte-level transport for one LPD client connection.
//
// Everything that touches raw protocol bytes lives here: line reads with a
// hard length cap, single status bytes, exact-length payload copies, and
// plain-text report output.  The rest of the protocol code works with
// `ProtocolStatus` and never sees the `0x00`/`0x01` wire values.

use sha2::{Digest, Sha256};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::debug;

use lpdgate_core::error::{LpdgateError, Result};

/// Chunk size used when copying payload bytes to a spool file.
const COPY_CHUNK_BYTES: usize = 8192;

/// The single status byte RFC 1179 uses for every acknowledgement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolStatus {
    /// `0x00`: accepted / success.
    Accepted,
    /// Any non-zero byte: rejected / failure.
    Rejected,
}

impl ProtocolStatus {
    /// Wire encoding.
    pub fn to_byte(self) -> u8 {
        match self {
            Self::Accepted => 0x00,
            Self::Rejected => 0x01,
        }
    }

    /// Decode a status byte received from the client.
    pub fn from_byte(byte: u8) -> Self {
        if byte == 0 {
            Self::Accepted
        } else {
            Self::Rejected
        }
    }

    pub fn is_accepted(self) -> bool {
        self == Self::Accepted
    }
}

/// A client connection split into a buffered reader and a writer.
pub struct LpdConnection<R, W> {
    reader: BufReader<R>,
    writer: W,
    max_line_bytes: usize,
}

impl<R, W> LpdConnection<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(reader: R, writer: W, max_line_bytes: usize) -> Self {
        Self {
            reader: BufReader::new(reader),
            writer,
            max_line_bytes,
        }
    }

    /// Read one line, stripping the trailing `\n` or `\r\n`.
    ///
    /// Returns `Ok(None)` when the connection is closed before any byte of a
    /// new line arrives.  A final line without a terminator is returned as is.
    /// Lines longer than the configured cap are a protocol error.
    pub async fn read_line(&mut self) -> Result<Option<Vec<u8>>> {
        let mut line = Vec::new();
        let limit = self.max_line_bytes as u64 + 1;
        let read = (&mut self.reader)
            .take(limit)
            .read_until(b'\n', &mut line)
            .await
            .map_err(|e| LpdgateError::Transport(format!("read line: {e}")))?;

        if read == 0 {
            return Ok(None);
        }

        if line.last() == Some(&b'\n') {
            line.pop();
        } else if line.len() as u64 >= limit {
            return Err(LpdgateError::Protocol(format!(
                "line exceeds {} bytes",
                self.max_line_bytes
            )));
        }
        if line.last() == Some(&b'\r') {
            line.pop();
        }

        Ok(Some(line))
    }

    /// Read a single byte (the trailing transfer-status byte of a frame).
    pub async fn read_byte(&mut self) -> Result<u8> {
        self.reader
            .read_u8()
            .await
            .map_err(|e| LpdgateError::Transport(format!("read status byte: {e}")))
    }

    /// Copy exactly `len` payload bytes into `sink`, feeding `digest` as we go.
    ///
    /// Interrupted reads are retried.  End of stream before `len` bytes is a
    /// protocol error; any other read failure is a transport error.
    pub async fn copy_exact<S>(&mut self, len: u64, sink: &mut S, digest: &mut Sha256) -> Result<()>
    where
        S: AsyncWrite + Unpin,
    {
        let mut buf = vec![0u8; COPY_CHUNK_BYTES];
        let mut remaining = len;

        while remaining > 0 {
            let want = remaining.min(COPY_CHUNK_BYTES as u64) as usize;
            let n = match self.reader.read(&mut buf[..want]).await {
                Ok(n) => n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    return Err(LpdgateError::Transport(format!(
                        "read payload ({remaining} of {len} bytes outstanding): {e}"
                    )));
                }
            };

            if n == 0 {
                return Err(LpdgateError::Protocol(format!(
                    "connection closed with {remaining} of {len} payload bytes outstanding"
                )));
            }

            sink.write_all(&buf[..n]).await?;
            digest.update(&buf[..n]);
            remaining -= n as u64;
        }

        sink.flush().await?;
        debug!(bytes = len, "payload copied");
        Ok(())
    }

    /// Write one status byte and flush it to the client.
    pub async fn write_status(&mut self, status: ProtocolStatus) -> Result<()> {
        self.write_bytes(&[status.to_byte()]).await
    }

    /// Write plain report text (status and removal output).
    pub async fn write_text(&mut self, text: &str) -> Result<()> {
        self.write_bytes(text.as_bytes()).await
    }

    async fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.writer
            .write_all(bytes)
            .await
            .map_err(|e| LpdgateError::Transport(format!("write: {e}")))?;
        self.writer
            .flush()
            .await
            .map_err(|e| LpdgateError::Transport(format!("flush: {e}")))
    }

    #[cfg(test)]
    pub(crate) fn written(&self) -> &W {
        &self.writer
    }

    /// Flush and close the write side.
    pub async fn shutdown(&mut self) -> Result<()> {
        self.writer
            .shutdown()
            .await
            .map_err(|e| LpdgateError::Transport(format!("shutdown: {e}")))
    }
}
