// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the lpdgate LPD gateway.
//
// These describe the request/response shapes exchanged with the print-queue
// service.  The LPD wire types (commands, status bytes, frames) live next to
// the protocol code in `lpdgate-print`.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

/// Job title used when the control file carries no `J` directive.
pub const DEFAULT_JOB_TITLE: &str = "untitled";

/// Unique identifier for one client connection (one LPD transaction).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Processing state of a printer queue (RFC 8011 §5.4.11 `printer-state`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PrinterState {
    Idle,
    Processing,
    Stopped,
}

impl PrinterState {
    /// Map an IPP `printer-state` enum value.  Unknown values are treated
    /// as stopped, matching what a client would see for an unusable queue.
    pub fn from_ipp_enum(value: i32) -> Self {
        match value {
            3 => Self::Idle,
            4 => Self::Processing,
            _ => Self::Stopped,
        }
    }
}

/// What the print-queue service reports about one printer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrinterInfo {
    /// Canonical queue name (`printer-name`).
    pub name: String,
    /// Free-text description (`printer-info`).
    pub info: Option<String>,
    pub state: PrinterState,
    /// `printer-is-accepting-jobs`.
    pub accepting: bool,
    /// `printer-is-shared`.
    pub shared: bool,
}

/// Lifecycle states of a queued job (RFC 8011 §5.3.7 `job-state`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobState {
    Pending,
    Held,
    Processing,
    Stopped,
    Canceled,
    Aborted,
    Completed,
}

impl JobState {
    /// Map an IPP `job-state` enum value.  Unknown values read as pending.
    pub fn from_ipp_enum(value: i32) -> Self {
        match value {
            4 => Self::Held,
            5 => Self::Processing,
            6 => Self::Stopped,
            7 => Self::Canceled,
            8 => Self::Aborted,
            9 => Self::Completed,
            _ => Self::Pending,
        }
    }

    /// Whether the job has left the queue for good.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Canceled | Self::Aborted | Self::Completed)
    }
}

/// One job as listed by the print-queue service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRecord {
    pub id: i32,
    /// `job-originating-user-name`; absent while the job is still being created.
    pub owner: Option<String>,
    /// Queue name taken from `job-printer-uri`.
    pub destination: Option<String>,
    /// `job-name`, if the job has one.
    pub name: Option<String>,
    pub size_bytes: u64,
    pub state: JobState,
    pub copies: u32,
}

/// Selects which jobs a status request lists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobQuery {
    /// A single job by id.
    Job(i32),
    /// Jobs submitted by this user on the queue.
    User(String),
    /// Every job on the queue.
    All,
}

/// Ordered set of `name=value` job options.
///
/// Setting a name that is already present replaces its value in place, so
/// the first-set position of an option is stable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobOptions(Vec<(String, String)>);

impl JobOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an option.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.0.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = value,
            None => self.0.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Apply every option of `other` on top of this set.
    pub fn merge(&mut self, other: &JobOptions) {
        for (name, value) in other.iter() {
            self.set(name, value);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Parse a whitespace-separated `name=value` option string.
    ///
    /// Values may be single- or double-quoted to embed spaces.  A bare
    /// `name` yields an empty value.
    pub fn parse(input: &str) -> Self {
        let mut options = Self::new();
        let mut chars = input.chars().peekable();

        loop {
            while chars.next_if(|c| c.is_whitespace()).is_some() {}
            if chars.peek().is_none() {
                break;
            }

            let mut name = String::new();
            while let Some(c) = chars.next_if(|c| !c.is_whitespace() && *c != '=') {
                name.push(c);
            }

            let mut value = String::new();
            if chars.next_if_eq(&'=').is_some() {
                match chars.peek().copied() {
                    Some(quote @ ('"' | '\'')) => {
                        chars.next();
                        for c in chars.by_ref() {
                            if c == quote {
                                break;
                            }
                            value.push(c);
                        }
                    }
                    _ => {
                        while let Some(c) = chars.next_if(|c| !c.is_whitespace()) {
                            value.push(c);
                        }
                    }
                }
            }

            if !name.is_empty() {
                options.set(name, value);
            }
        }

        options
    }
}

impl<N: Into<String>, V: Into<String>> FromIterator<(N, V)> for JobOptions {
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        let mut options = Self::new();
        for (name, value) in iter {
            options.set(name, value);
        }
        options
    }
}

/// One print request handed to the print-queue service.
///
/// Built while scanning a control file; one submission per print directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobSubmission {
    /// Resolved queue name.
    pub queue: String,
    /// Spooled data file to print.
    pub file_path: PathBuf,
    pub title: String,
    /// Document name from an `N` directive; may be empty.
    pub document_name: String,
    /// Requesting user from the `P` directive; never empty.
    pub user: String,
    pub options: JobOptions,
    /// Address of the LPD client, sent as `job-originating-host-name`.
    pub origin_host: Option<String>,
}

/// Lifecycle state of the LPD listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServerStatus {
    Stopped,
    Starting,
    Running,
    Error,
}
