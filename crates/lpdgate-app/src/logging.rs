// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Tracing subscriber setup.

use tracing_subscriber::EnvFilter;

/// Install the global subscriber.  `RUST_LOG` wins over `default_level`.
///
/// Logs always go to stderr: in inetd mode stdout is the client connection.
pub(crate) fn init(default_level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();
}
