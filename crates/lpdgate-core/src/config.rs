// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Gateway configuration.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{LpdgateError, Result};
use crate::types::JobOptions;

/// IANA-assigned LPD port.
pub const DEFAULT_LPD_PORT: u16 = 515;

/// Upper bound on any single protocol or control-file line.
pub const DEFAULT_MAX_LINE_BYTES: usize = 64 * 1024;

/// Data files accepted in one job transaction.
pub const DEFAULT_MAX_DATA_FILES: usize = 100;

/// Settings read from the gateway's TOML file.  Every field has a default,
/// so an empty file (or no file) is a valid configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Bind address for standalone mode.
    pub listen: SocketAddr,
    /// Base URI of the print-queue service.
    pub ipp_server: String,
    /// Scratch directory for spooled control/data files.  `None` uses the
    /// system temp directory.
    pub spool_dir: Option<PathBuf>,
    pub max_line_bytes: usize,
    pub max_data_files: usize,
    /// Host name shown in long status reports.
    pub report_host: String,
    /// Fallback tracing filter when `RUST_LOG` is unset.
    pub log_level: String,
    /// Options applied to every submitted job.
    pub default_options: BTreeMap<String, String>,
    /// Per-queue settings keyed by queue name.
    pub queues: BTreeMap<String, QueueConfig>,
}

/// Per-queue settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Options applied to every job submitted to this queue.
    pub options: BTreeMap<String, String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from(([0, 0, 0, 0], DEFAULT_LPD_PORT)),
            ipp_server: "ipp://localhost:631".into(),
            spool_dir: None,
            max_line_bytes: DEFAULT_MAX_LINE_BYTES,
            max_data_files: DEFAULT_MAX_DATA_FILES,
            report_host: "localhost".into(),
            log_level: "info".into(),
            default_options: BTreeMap::new(),
            queues: BTreeMap::new(),
        }
    }
}

impl GatewayConfig {
    /// Parse a configuration from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(text).map_err(|e| LpdgateError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| LpdgateError::Config(format!("read {}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    fn validate(&self) -> Result<()> {
        if self.max_line_bytes < 2 {
            return Err(LpdgateError::Config(
                "max_line_bytes must be at least 2".into(),
            ));
        }
        if self.ipp_server.trim().is_empty() {
            return Err(LpdgateError::Config("ipp_server must not be empty".into()));
        }
        Ok(())
    }

    /// Directory used for spooled files.
    pub fn spool_dir(&self) -> PathBuf {
        self.spool_dir.clone().unwrap_or_else(std::env::temp_dir)
    }

    /// Gateway-wide default options as an ordered set.
    pub fn default_job_options(&self) -> JobOptions {
        self.default_options
            .iter()
            .map(|(n, v)| (n.as_str(), v.as_str()))
            .collect()
    }

    /// Options configured for one queue (empty if the queue has no entry).
    pub fn queue_options(&self, queue: &str) -> JobOptions {
        self.queues
            .get(queue)
            .map(|q| q.options.iter().map(|(n, v)| (n.as_str(), v.as_str())).collect())
            .unwrap_or_default()
    }
}
