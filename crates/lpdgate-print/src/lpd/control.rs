// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// LPD control-file directives (RFC 1179 §7).
//
// A control file is a list of one-letter directives, one per line.  Parsing
// is deliberately shallow: each line becomes a `(code, value)` pair and is
// classified, but values are never validated here.  The receiver applies
// the directives in file order.

use std::io;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};

/// One control-file line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlLine {
    pub code: char,
    pub value: String,
}

/// Print styles requested by the lower-case print directives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrintStyle {
    /// `c`: plot CIF file.
    Cif,
    /// `d`: print DVI file.
    Dvi,
    /// `f`: print formatted file.
    Formatted,
    /// `g`: plot file.
    Plot,
    /// `l`: print file leaving control characters.
    Raw,
    /// `n`: print ditroff output.
    Ditroff,
    /// `o`: print PostScript output.
    PostScript,
    /// `p`: print with `pr` format.
    Pr,
    /// `r`: print with FORTRAN carriage control.
    Fortran,
    /// `t`: print troff output.
    Troff,
    /// `v`: print raster file.
    Raster,
}

impl PrintStyle {
    pub fn from_code(code: char) -> Option<Self> {
        Some(match code {
            'c' => Self::Cif,
            'd' => Self::Dvi,
            'f' => Self::Formatted,
            'g' => Self::Plot,
            'l' => Self::Raw,
            'n' => Self::Ditroff,
            'o' => Self::PostScript,
            'p' => Self::Pr,
            'r' => Self::Fortran,
            't' => Self::Troff,
            'v' => Self::Raster,
            _ => return None,
        })
    }

    /// The job option this style adds, if any.
    pub fn job_option(self) -> Option<(&'static str, &'static str)> {
        match self {
            Self::Raw => Some(("raw", "")),
            Self::Pr => Some(("prettyprint", "")),
            _ => None,
        }
    }
}

/// What a control line means to the receiver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Directive {
    /// `J`: job name (title).
    JobName,
    /// `N`: document name.
    DocumentName,
    /// `P`: requesting user.
    User,
    /// `L`: print banner page.
    Banner,
    /// Print the data file named by the value.
    Print(PrintStyle),
    /// Anything else (`H`, `M`, `U`, `S`, font and width directives, ...).
    Ignored,
}

impl ControlLine {
    /// Parse one line (terminator already stripped).  Empty lines yield `None`.
    ///
    /// The code is byte 0; the value is the rest of the line with
    /// surrounding whitespace removed.
    pub fn parse(line: &[u8]) -> Option<Self> {
        let (&code, value) = line.split_first()?;
        Some(Self {
            code: code as char,
            value: String::from_utf8_lossy(value).trim().to_string(),
        })
    }

    pub fn directive(&self) -> Directive {
        match self.code {
            'J' => Directive::JobName,
            'N' => Directive::DocumentName,
            'P' => Directive::User,
            'L' => Directive::Banner,
            code => PrintStyle::from_code(code).map_or(Directive::Ignored, Directive::Print),
        }
    }
}

/// Reads a control file one directive at a time.
///
/// Accepts `\n` and `\r\n` line endings.  Lines longer than `max_line_bytes`
/// are truncated and the rest of the line is discarded unread; blank lines
/// are skipped.  At most one line is buffered at a time.
pub struct ControlReader<R> {
    reader: R,
    max_line_bytes: usize,
    line: Vec<u8>,
}

impl<R> ControlReader<R>
where
    R: AsyncBufRead + Unpin,
{
    pub fn new(reader: R, max_line_bytes: usize) -> Self {
        Self {
            reader,
            max_line_bytes,
            line: Vec::new(),
        }
    }

    /// The next directive, or `None` at end of file.
    pub async fn next_line(&mut self) -> io::Result<Option<ControlLine>> {
        loop {
            self.line.clear();
            let read = (&mut self.reader)
                .take(self.max_line_bytes as u64)
                .read_until(b'\n', &mut self.line)
                .await?;
            if read == 0 {
                return Ok(None);
            }

            if self.line.last() == Some(&b'\n') {
                self.line.pop();
            } else if self.line.len() >= self.max_line_bytes {
                self.skip_rest_of_line().await?;
            }
            if self.line.last() == Some(&b'\r') {
                self.line.pop();
            }

            if let Some(line) = ControlLine::parse(&self.line) {
                return Ok(Some(line));
            }
        }
    }

    async fn skip_rest_of_line(&mut self) -> io::Result<()> {
        loop {
            let buf = self.reader.fill_buf().await?;
            if buf.is_empty() {
                return Ok(());
            }
            let (consumed, done) = match buf.iter().position(|&b| b == b'\n') {
                Some(at) => (at + 1, true),
                None => (buf.len(), false),
            };
            self.reader.consume(consumed);
            if done {
                return Ok(());
            }
        }
    }
}
