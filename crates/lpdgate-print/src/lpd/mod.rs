// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// RFC 1179 Line Printer Daemon protocol.
//
// Layering, bottom up:
//   - connection   raw bytes: lines, status bytes, payload copies
//   - command      the opening line
//   - transfer     receive-job frames, written into a `transaction`
//   - control      control-file directives
//   - receiver / status / cancel   the command handlers
//   - dispatcher   one session per connection

pub mod cancel;
pub mod command;
pub mod connection;
pub mod control;
pub mod destination;
pub mod dispatcher;
pub mod receiver;
pub mod status;
pub mod transaction;
pub mod transfer;

#[cfg(test)]
pub(crate) mod fake_queue;

pub use cancel::JobCanceller;
pub use command::{Command, CommandKind};
pub use connection::{LpdConnection, ProtocolStatus};
pub use control::{ControlLine, ControlReader, Directive, PrintStyle};
pub use dispatcher::LpdSession;
pub use receiver::JobReceiver;
pub use status::{StatusReporter, render_report};
pub use transaction::JobTransaction;
pub use transfer::TransferChannel;
