// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Mapping LPD queue names onto print-queue service printers.

use tracing::debug;

use lpdgate_core::error::{LpdgateError, Result};
use lpdgate_core::types::PrinterInfo;

use crate::queue_client::PrintQueueClient;

/// Resolve an LPD destination to a printer.
///
/// `queue/instance` addresses `queue`.  Names containing a space cannot be
/// queue names, so they are matched case-insensitively against each
/// printer's description instead.
pub async fn resolve_destination(
    client: &dyn PrintQueueClient,
    destination: &str,
) -> Result<PrinterInfo> {
    if destination.is_empty() {
        return Err(LpdgateError::UnknownDestination(destination.into()));
    }

    if destination.contains(' ') {
        let printers = client.printers().await?;
        let found = printers.into_iter().find(|p| {
            p.info
                .as_deref()
                .is_some_and(|info| info.eq_ignore_ascii_case(destination))
        });
        return match found {
            Some(printer) => {
                debug!(destination, printer = %printer.name, "matched printer description");
                Ok(printer)
            }
            None => Err(LpdgateError::UnknownDestination(destination.into())),
        };
    }

    let queue = destination
        .split_once('/')
        .map_or(destination, |(queue, _instance)| queue);
    client.printer(queue).await
}
