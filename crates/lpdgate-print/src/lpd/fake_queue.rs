// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// In-memory print-queue service for protocol tests.  Records every call so
// tests can assert on what the LPD side asked for.

use std::collections::HashSet;
use std::sync::Mutex;
use std::sync::atomic::{AtomicI32, Ordering};

use async_trait::async_trait;

use lpdgate_core::error::{LpdgateError, Result};
use lpdgate_core::types::{
    JobQuery, JobRecord, JobState, JobSubmission, PrinterInfo, PrinterState,
};

use crate::queue_client::PrintQueueClient;

/// A submission as the fake saw it, with the data file read at submit time
/// (the spool file is gone once the session ends).
#[derive(Debug, Clone)]
pub(crate) struct Submitted {
    pub submission: JobSubmission,
    pub payload: Vec<u8>,
}

#[derive(Default)]
pub(crate) struct FakeQueue {
    printers: Mutex<Vec<PrinterInfo>>,
    jobs: Mutex<Vec<JobRecord>>,
    submitted: Mutex<Vec<Submitted>>,
    cancels: Mutex<Vec<(i32, String)>>,
    queries: Mutex<Vec<(String, JobQuery)>>,
    failing_cancels: Mutex<HashSet<i32>>,
    failing_titles: Mutex<HashSet<String>>,
    next_job_id: AtomicI32,
}

impl FakeQueue {
    /// A fake with one idle, accepting, shared printer.
    pub fn with_printer(name: &str) -> Self {
        let queue = Self {
            next_job_id: AtomicI32::new(100),
            ..Self::default()
        };
        queue.add_printer(PrinterInfo {
            name: name.into(),
            info: None,
            state: PrinterState::Idle,
            accepting: true,
            shared: true,
        });
        queue
    }

    pub fn add_printer(&self, printer: PrinterInfo) {
        self.printers.lock().unwrap().push(printer);
    }

    pub fn update_printer(&self, name: &str, update: impl FnOnce(&mut PrinterInfo)) {
        let mut printers = self.printers.lock().unwrap();
        let printer = printers
            .iter_mut()
            .find(|p| p.name == name)
            .expect("printer exists");
        update(printer);
    }

    pub fn describe(&self, name: &str, info: &str) {
        self.update_printer(name, |p| p.info = Some(info.into()));
    }

    pub fn add_job(&self, job: JobRecord) {
        self.jobs.lock().unwrap().push(job);
    }

    pub fn fail_cancel(&self, job_id: i32) {
        self.failing_cancels.lock().unwrap().insert(job_id);
    }

    pub fn fail_submit(&self, title: &str) {
        self.failing_titles.lock().unwrap().insert(title.into());
    }

    pub fn submitted(&self) -> Vec<Submitted> {
        self.submitted.lock().unwrap().clone()
    }

    pub fn cancels(&self) -> Vec<(i32, String)> {
        self.cancels.lock().unwrap().clone()
    }

    pub fn queries(&self) -> Vec<(String, JobQuery)> {
        self.queries.lock().unwrap().clone()
    }
}

/// A pending job owned by `owner` on `queue`.
pub(crate) fn job(id: i32, owner: &str, queue: &str, name: &str) -> JobRecord {
    JobRecord {
        id,
        owner: Some(owner.into()),
        destination: Some(queue.into()),
        name: Some(name.into()),
        size_bytes: 1024,
        state: JobState::Pending,
        copies: 1,
    }
}

#[async_trait]
impl PrintQueueClient for FakeQueue {
    async fn printer(&self, name: &str) -> Result<PrinterInfo> {
        self.printers
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.name == name)
            .cloned()
            .ok_or_else(|| LpdgateError::UnknownDestination(name.into()))
    }

    async fn printers(&self) -> Result<Vec<PrinterInfo>> {
        Ok(self.printers.lock().unwrap().clone())
    }

    async fn submit(&self, submission: &JobSubmission) -> Result<i32> {
        if self.failing_titles.lock().unwrap().contains(&submission.title) {
            return Err(LpdgateError::Submission(format!(
                "{} rejected",
                submission.title
            )));
        }

        let payload = std::fs::read(&submission.file_path)?;
        self.submitted.lock().unwrap().push(Submitted {
            submission: submission.clone(),
            payload,
        });
        Ok(self.next_job_id.fetch_add(1, Ordering::SeqCst))
    }

    async fn jobs(&self, queue: &str, query: &JobQuery) -> Result<Vec<JobRecord>> {
        self.queries
            .lock()
            .unwrap()
            .push((queue.to_string(), query.clone()));

        let jobs = self.jobs.lock().unwrap();
        Ok(jobs
            .iter()
            .filter(|j| j.destination.as_deref().is_none_or(|d| d == queue))
            .filter(|j| match query {
                JobQuery::Job(id) => j.id == *id,
                JobQuery::User(user) => j.owner.as_deref() == Some(user.as_str()),
                JobQuery::All => true,
            })
            .cloned()
            .collect())
    }

    async fn cancel(&self, job_id: i32, agent: &str) -> Result<()> {
        self.cancels
            .lock()
            .unwrap()
            .push((job_id, agent.to_string()));
        if self.failing_cancels.lock().unwrap().contains(&job_id) {
            return Err(LpdgateError::Cancellation {
                job_id,
                reason: "not permitted".into(),
            });
        }
        Ok(())
    }
}
