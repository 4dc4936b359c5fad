// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// lpdgate Print: the RFC 1179 LPD protocol, the print-queue client seam and
// its IPP implementation, and the TCP listener.  This crate bridges between
// the core domain types defined in `lpdgate-core` and the print server.

pub mod ipp_client;
pub mod lpd;
pub mod lpd_server;
pub mod queue_client;

pub use ipp_client::IppQueueClient;
pub use lpd::{LpdSession, ProtocolStatus};
pub use lpd_server::LpdServer;
pub use queue_client::PrintQueueClient;
