// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Command-line interface.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;

use lpdgate_core::config::GatewayConfig;
use lpdgate_core::error::Result;
use lpdgate_core::types::JobOptions;

#[derive(Parser, Debug)]
#[command(
    name = "lpdgate",
    version,
    about = "RFC 1179 line-printer daemon that forwards jobs to an IPP print server"
)]
pub(crate) struct Args {
    /// TOML configuration file.
    #[arg(short, long, value_name = "PATH")]
    pub(crate) config: Option<PathBuf>,
    /// Address to listen on (overrides `listen`).
    #[arg(long, value_name = "ADDR")]
    pub(crate) listen: Option<SocketAddr>,
    /// IPP server base URI (overrides `ipp_server`).
    #[arg(long, value_name = "URI")]
    pub(crate) ipp_server: Option<String>,
    /// Serve one connection on stdin/stdout, as started by inetd.
    #[arg(long, default_value_t = false)]
    pub(crate) inetd: bool,
    /// Default job options, `name=value[ name=value...]`.  Repeatable.
    #[arg(short = 'o', value_name = "OPTIONS")]
    pub(crate) options: Vec<String>,
}

impl Args {
    /// Load the configuration file (if any) and apply command-line overrides.
    pub(crate) fn load_config(&self) -> Result<GatewayConfig> {
        let mut config = match &self.config {
            Some(path) => GatewayConfig::load(path)?,
            None => GatewayConfig::default(),
        };
        self.apply(&mut config);
        Ok(config)
    }

    fn apply(&self, config: &mut GatewayConfig) {
        if let Some(listen) = self.listen {
            config.listen = listen;
        }
        if let Some(uri) = &self.ipp_server {
            config.ipp_server = uri.clone();
        }
        for arg in &self.options {
            for (name, value) in JobOptions::parse(arg).iter() {
                config
                    .default_options
                    .insert(name.to_string(), value.to_string());
            }
        }
    }
}
