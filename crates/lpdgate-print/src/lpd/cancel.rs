// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Remove-jobs (0x05) handling.

use tracing::{info, warn};

use lpdgate_core::error::Result;

use super::command::split_leading_job_id;
use super::connection::ProtocolStatus;
use crate::queue_client::PrintQueueClient;

pub struct JobCanceller<'a> {
    client: &'a dyn PrintQueueClient,
}

impl<'a> JobCanceller<'a> {
    pub fn new(client: &'a dyn PrintQueueClient) -> Self {
        Self { client }
    }

    /// Cancel each job id at the start of `list`, acting as `agent`.
    ///
    /// Stops at the first token that is not a positive job id.  The first
    /// failed cancellation fails the command; jobs already cancelled stay
    /// cancelled.  Job ids are global to the print-queue service, so
    /// `destination` is only used for logging.
    pub async fn remove_jobs(&self, destination: &str, agent: &str, list: &str) -> ProtocolStatus {
        match self.cancel_all(destination, agent, list).await {
            Ok(count) => {
                info!(destination, agent, count, "jobs removed");
                ProtocolStatus::Accepted
            }
            Err(e) => {
                warn!(destination, agent, error = %e, "remove-jobs failed");
                ProtocolStatus::Rejected
            }
        }
    }

    async fn cancel_all(&self, destination: &str, agent: &str, list: &str) -> Result<usize> {
        let mut rest = list;
        let mut count = 0;
        while let Some((job_id, tail)) = split_leading_job_id(rest) {
            self.client.cancel(job_id, agent).await?;
            info!(destination, job_id, agent, "job cancelled");
            count += 1;
            rest = tail;
        }
        Ok(count)
    }
}
