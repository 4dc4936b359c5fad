// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Spool-file ownership for one receive-job session.
//
// Every control and data file received on a connection is created through a
// `JobTransaction`, which owns the on-disk paths.  Paths are `tempfile`
// `TempPath`s, so the files are removed when the transaction is cleaned up
// or dropped, whichever comes first, on every exit path.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tempfile::TempPath;
use tokio::fs::{File, OpenOptions};
use tracing::{debug, warn};

use lpdgate_core::error::{LpdgateError, Result};

/// Which kind of file a frame carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Control,
    Data,
}

/// A file received (or being received) in the current session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingFile {
    pub kind: FileKind,
    pub declared_length: u64,
    /// Name the client uses for this file in the control file.
    pub remote_name: String,
    /// Local spool path.
    pub path: PathBuf,
}

/// Scoped owner of all spool files for one job.
pub struct JobTransaction {
    spool_dir: PathBuf,
    max_data_files: usize,
    control: Option<TempPath>,
    data: Vec<TempPath>,
    /// Remote data-file name to spool path.  The first file with a given
    /// name wins.
    data_by_name: HashMap<String, PathBuf>,
}

impl JobTransaction {
    pub fn new(spool_dir: impl Into<PathBuf>, max_data_files: usize) -> Self {
        Self {
            spool_dir: spool_dir.into(),
            max_data_files,
            control: None,
            data: Vec::new(),
            data_by_name: HashMap::new(),
        }
    }

    /// Open the control file for writing.
    ///
    /// A second control file in the same session is appended to the first;
    /// some clients split the control file across several frames.
    pub async fn open_control(&mut self) -> Result<(File, PathBuf)> {
        if let Some(path) = &self.control {
            let file = OpenOptions::new().append(true).open(path).await?;
            debug!(path = %path.display(), "appending to control file");
            return Ok((file, path.to_path_buf()));
        }

        let (file, path) = self.create_spool_file("cf")?;
        let local = path.to_path_buf();
        self.control = Some(path);
        Ok((file, local))
    }

    /// Create a spool file for a data file the client calls `remote_name`.
    pub fn open_data(&mut self, remote_name: &str) -> Result<(File, PathBuf)> {
        if self.data.len() >= self.max_data_files {
            return Err(LpdgateError::Protocol(format!(
                "too many data files ({})",
                self.data.len()
            )));
        }

        let (file, path) = self.create_spool_file("df")?;
        let local = path.to_path_buf();
        self.data_by_name
            .entry(remote_name.to_string())
            .or_insert_with(|| local.clone());
        self.data.push(path);
        Ok((file, local))
    }

    fn create_spool_file(&self, prefix: &str) -> Result<(File, TempPath)> {
        let named = tempfile::Builder::new()
            .prefix(&format!("lpdgate-{prefix}"))
            .tempfile_in(&self.spool_dir)
            .map_err(|e| {
                LpdgateError::Io(std::io::Error::new(
                    e.kind(),
                    format!("create spool file in {}: {e}", self.spool_dir.display()),
                ))
            })?;
        let (file, path) = named.into_parts();
        Ok((File::from_std(file), path))
    }

    pub fn control_path(&self) -> Option<&Path> {
        self.control.as_deref()
    }

    /// Spool path of the data file the client named `remote_name`.
    pub fn data_file(&self, remote_name: &str) -> Option<&Path> {
        self.data_by_name.get(remote_name).map(PathBuf::as_path)
    }

    pub fn data_file_count(&self) -> usize {
        self.data.len()
    }

    /// Delete every spool file now, logging (not failing on) removal errors.
    pub fn cleanup(mut self) {
        let paths = self.control.take().into_iter().chain(self.data.drain(..));
        for path in paths {
            let shown = path.display().to_string();
            match path.close() {
                Ok(()) => debug!(path = %shown, "spool file removed"),
                Err(e) => warn!(path = %shown, error = %e, "failed to remove spool file"),
            }
        }
    }
}
