// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Standalone LPD listener.
//
// Accepts TCP connections on the configured address (port 515 by default)
// and runs one `LpdSession` per connection in its own task.  The sessions
// share the print-queue client and configuration; nothing else.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use lpdgate_core::config::GatewayConfig;
use lpdgate_core::error::{LpdgateError, Result};
use lpdgate_core::types::ServerStatus;

use crate::lpd::dispatcher::LpdSession;
use crate::queue_client::PrintQueueClient;

// ---------------------------------------------------------------------------
// Shared state passed to connection handlers
// ---------------------------------------------------------------------------

struct SharedState {
    client: Arc<dyn PrintQueueClient>,
    config: Arc<GatewayConfig>,
    active_connections: Arc<AtomicU32>,
}

// ---------------------------------------------------------------------------
// LpdServer
// ---------------------------------------------------------------------------

/// RFC 1179 line-printer daemon front end.
pub struct LpdServer {
    /// Requested bind address.
    listen: SocketAddr,
    /// Address actually bound, once running (differs when port 0 was asked for).
    local_addr: Option<SocketAddr>,
    status: ServerStatus,
    shutdown_signal: Arc<Notify>,
    task_handle: Option<JoinHandle<()>>,
    active_connections: Arc<AtomicU32>,
}

impl LpdServer {
    /// Create a server for `listen`.  It starts in `Stopped` state.
    pub fn new(listen: SocketAddr) -> Self {
        Self {
            listen,
            local_addr: None,
            status: ServerStatus::Stopped,
            shutdown_signal: Arc::new(Notify::new()),
            task_handle: None,
            active_connections: Arc::new(AtomicU32::new(0)),
        }
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    pub fn status(&self) -> ServerStatus {
        self.status
    }

    /// Number of client connections currently being served.
    pub fn active_connections(&self) -> u32 {
        self.active_connections.load(Ordering::Relaxed)
    }

    /// Bind the listener and spawn the accept loop.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is already in use or cannot be bound
    /// (port 515 normally needs elevated privileges).
    pub async fn start(
        &mut self,
        client: Arc<dyn PrintQueueClient>,
        config: Arc<GatewayConfig>,
    ) -> Result<()> {
        if self.status == ServerStatus::Running {
            debug!(listen = %self.listen, "LPD server already running");
            return Ok(());
        }

        self.status = ServerStatus::Starting;

        let listener = match TcpListener::bind(self.listen).await {
            Ok(listener) => listener,
            Err(e) => {
                self.status = ServerStatus::Error;
                return Err(LpdgateError::Server(format!("bind {}: {e}", self.listen)));
            }
        };
        let local_addr = listener.local_addr()?;
        info!(addr = %local_addr, "LPD server listening");

        let shared = Arc::new(SharedState {
            client,
            config,
            active_connections: Arc::clone(&self.active_connections),
        });
        let shutdown = Arc::clone(&self.shutdown_signal);

        let handle = tokio::spawn(async move {
            Self::accept_loop(listener, shutdown, shared).await;
        });

        self.local_addr = Some(local_addr);
        self.task_handle = Some(handle);
        self.status = ServerStatus::Running;
        Ok(())
    }

    /// Stop accepting connections and wait for the accept loop to exit.
    /// Sessions already in progress run to completion.
    pub async fn stop(&mut self) -> Result<()> {
        if self.status != ServerStatus::Running {
            return Ok(());
        }

        info!(addr = ?self.local_addr, "stopping LPD server");
        self.shutdown_signal.notify_one();

        if let Some(handle) = self.task_handle.take() {
            handle
                .await
                .map_err(|e| LpdgateError::Server(format!("task join: {e}")))?;
        }

        self.status = ServerStatus::Stopped;
        info!("LPD server stopped");
        Ok(())
    }

    async fn accept_loop(listener: TcpListener, shutdown: Arc<Notify>, shared: Arc<SharedState>) {
        loop {
            tokio::select! {
                _ = shutdown.notified() => {
                    debug!("accept loop received shutdown signal");
                    break;
                }

                accept_result = listener.accept() => {
                    match accept_result {
                        Ok((stream, peer_addr)) => {
                            info!(peer = %peer_addr, "incoming LPD connection");
                            let state = Arc::clone(&shared);
                            tokio::spawn(async move {
                                state.active_connections.fetch_add(1, Ordering::Relaxed);
                                Self::handle_connection(stream, peer_addr, &state).await;
                                state.active_connections.fetch_sub(1, Ordering::Relaxed);
                            });
                        }
                        Err(e) => {
                            error!(error = %e, "failed to accept connection");
                        }
                    }
                }
            }
        }
    }

    async fn handle_connection(stream: TcpStream, peer_addr: SocketAddr, state: &SharedState) {
        if let Err(e) = stream.set_nodelay(true) {
            warn!(peer = %peer_addr, error = %e, "failed to set TCP_NODELAY");
        }

        let session = LpdSession::new(
            Arc::clone(&state.client),
            Arc::clone(&state.config),
            Some(peer_addr.ip().to_string()),
        );
        let (reader, writer) = stream.into_split();
        let status = session.serve(reader, writer).await;
        debug!(peer = %peer_addr, session = %session.id(), status = ?status, "connection finished");
    }
}
