// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The print-queue service seen from the LPD side.
//
// One implementation is shared by every connection the server handles, so
// it must be `Send + Sync` and hold no per-connection state.

use async_trait::async_trait;

use lpdgate_core::error::Result;
use lpdgate_core::types::{JobQuery, JobRecord, JobSubmission, PrinterInfo, PrinterState};

#[async_trait]
pub trait PrintQueueClient: Send + Sync {
    /// Look up one queue by its canonical name.
    async fn printer(&self, name: &str) -> Result<PrinterInfo>;

    /// List every queue the service knows about.
    async fn printers(&self) -> Result<Vec<PrinterInfo>>;

    /// Submit one document.  Returns the service-assigned job id.
    async fn submit(&self, submission: &JobSubmission) -> Result<i32>;

    /// Jobs on `queue` matching `query`, in queue order.
    async fn jobs(&self, queue: &str, query: &JobQuery) -> Result<Vec<JobRecord>>;

    /// Cancel `job_id`, acting as `agent`.
    async fn cancel(&self, job_id: i32, agent: &str) -> Result<()>;

    /// Current processing state of `queue`.
    async fn printer_state(&self, queue: &str) -> Result<PrinterState> {
        Ok(self.printer(queue).await?.state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lpd::fake_queue::FakeQueue;

    #[tokio::test]
    async fn printer_state_follows_printer_lookup() {
        let queue = FakeQueue::with_printer("lp");
        assert_eq!(queue.printer_state("lp").await.unwrap(), PrinterState::Idle);

        queue.update_printer("lp", |p| p.state = PrinterState::Stopped);
        assert_eq!(queue.printer_state("lp").await.unwrap(), PrinterState::Stopped);

        assert!(queue.printer_state("nowhere").await.is_err());
    }
}
