// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// lpdgate: RFC 1179 line-printer gateway.
//
// Entry point.  Loads configuration, initialises logging, and either runs the
// standalone TCP listener or serves a single inetd-style connection on
// stdin/stdout.

mod cli;
mod logging;

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};

use lpdgate_core::config::GatewayConfig;
use lpdgate_core::error::Result;
use lpdgate_print::{IppQueueClient, LpdServer, LpdSession, PrintQueueClient};

use crate::cli::Args;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let config = match args.load_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("lpdgate: {e}");
            return ExitCode::FAILURE;
        }
    };

    logging::init(&config.log_level);
    info!(version = env!("CARGO_PKG_VERSION"), inetd = args.inetd, "lpdgate starting");

    let result = if args.inetd {
        run_inetd(config).await
    } else {
        run_standalone(config).await
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            error!(error = %e, "lpdgate failed");
            ExitCode::FAILURE
        }
    }
}

fn queue_client(config: &GatewayConfig) -> Result<Arc<dyn PrintQueueClient>> {
    Ok(Arc::new(IppQueueClient::new(&config.ipp_server)?))
}

/// Serve the one connection inetd handed us and exit with its status byte.
async fn run_inetd(config: GatewayConfig) -> Result<ExitCode> {
    let client = queue_client(&config)?;
    let session = LpdSession::new(client, Arc::new(config), None);
    let status = session
        .serve(tokio::io::stdin(), tokio::io::stdout())
        .await;
    Ok(ExitCode::from(status.to_byte()))
}

/// Listen until interrupted.
async fn run_standalone(config: GatewayConfig) -> Result<ExitCode> {
    let client = queue_client(&config)?;
    let mut server = LpdServer::new(config.listen);
    server.start(client, Arc::new(config)).await?;

    tokio::signal::ctrl_c().await?;
    info!("interrupt received");

    server.stop().await?;
    Ok(ExitCode::SUCCESS)
}
