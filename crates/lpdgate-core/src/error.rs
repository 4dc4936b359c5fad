// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for lpdgate.

use thiserror::Error;

/// Top-level error type for all lpdgate operations.
#[derive(Debug, Error)]
pub enum LpdgateError {
    // -- Client connection --
    #[error("connection error: {0}")]
    Transport(String),

    #[error("protocol error: {0}")]
    Protocol(String),

    // -- Control file processing --
    #[error("control file directive failed: {0}")]
    Directive(String),

    // -- Print-queue service --
    #[error("print-queue request failed: {0}")]
    PrintQueue(String),

    #[error("job submission failed: {0}")]
    Submission(String),

    #[error("cancel of job {job_id} failed: {reason}")]
    Cancellation { job_id: i32, reason: String },

    #[error("unknown destination: {0}")]
    UnknownDestination(String),

    // -- Server / configuration --
    #[error("LPD server error: {0}")]
    Server(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, LpdgateError>;
