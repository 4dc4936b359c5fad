// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// One LPD session: read the single command a connection may carry, route it
// to its handler, and close.

use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, error, info, instrument, warn};

use lpdgate_core::config::GatewayConfig;
use lpdgate_core::types::SessionId;

use super::cancel::JobCanceller;
use super::command::{Command, CommandKind};
use super::connection::{LpdConnection, ProtocolStatus};
use super::receiver::JobReceiver;
use super::status::StatusReporter;
use crate::queue_client::PrintQueueClient;

/// Everything one connection needs.  Cheap to build per connection; the
/// print-queue client and configuration are shared.
pub struct LpdSession {
    id: SessionId,
    client: Arc<dyn PrintQueueClient>,
    config: Arc<GatewayConfig>,
    /// Client address, attached to submitted jobs as the originating host.
    peer: Option<String>,
}

impl LpdSession {
    pub fn new(
        client: Arc<dyn PrintQueueClient>,
        config: Arc<GatewayConfig>,
        peer: Option<String>,
    ) -> Self {
        Self {
            id: SessionId::new(),
            client,
            config,
            peer,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Serve the connection to completion and return the command's status.
    ///
    /// RFC 1179 allows exactly one command per connection, so the writer is
    /// shut down before this returns.
    #[instrument(
        name = "lpd_session",
        skip_all,
        fields(session = %self.id, peer = self.peer.as_deref().unwrap_or("-"))
    )]
    pub async fn serve<R, W>(&self, reader: R, writer: W) -> ProtocolStatus
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut conn = LpdConnection::new(reader, writer, self.config.max_line_bytes);

        let status = match conn.read_line().await {
            Ok(Some(line)) => match Command::parse(&line) {
                Ok(command) => self.dispatch(&mut conn, &command).await,
                Err(unknown) => {
                    error!(code = unknown.code, rest = %unknown.rest, "unknown LPD command");
                    reject(&mut conn).await
                }
            },
            Ok(None) => {
                error!("connection closed before a command was received");
                reject(&mut conn).await
            }
            Err(e) => {
                error!(error = %e, "unable to read command line");
                reject(&mut conn).await
            }
        };

        if let Err(e) = conn.shutdown().await {
            warn!(error = %e, "connection shutdown failed");
        }
        info!(status = ?status, "closing connection");
        status
    }

    async fn dispatch<R, W>(&self, conn: &mut LpdConnection<R, W>, command: &Command) -> ProtocolStatus
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        info!(
            command = command.kind.code(),
            destination = %command.destination,
            argument = %command.argument,
            "command received"
        );

        // Receive-job acceptance depends on the destination, so the receiver
        // writes its own acceptance byte.
        if command.kind != CommandKind::ReceiveJob {
            if let Err(e) = conn.write_status(ProtocolStatus::Accepted).await {
                warn!(error = %e, "failed to acknowledge command");
                return ProtocolStatus::Rejected;
            }
        }

        let client = self.client.as_ref();
        match command.kind {
            CommandKind::NoOp => ProtocolStatus::Accepted,
            CommandKind::ReceiveJob => {
                JobReceiver::new(client, &self.config, self.peer.as_deref())
                    .receive(conn, &command.destination)
                    .await
            }
            CommandKind::ShortStatus | CommandKind::LongStatus => {
                StatusReporter::new(client, &self.config.report_host)
                    .send_state(
                        conn,
                        &command.destination,
                        &command.argument,
                        command.kind == CommandKind::LongStatus,
                    )
                    .await
            }
            CommandKind::RemoveJobs => {
                let (agent, list) = command.removal_operands();
                JobCanceller::new(client)
                    .remove_jobs(&command.destination, agent, list)
                    .await
            }
        }
    }
}

/// Send the `1` status byte for a command that could not be served.
async fn reject<R, W>(conn: &mut LpdConnection<R, W>) -> ProtocolStatus
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    if let Err(e) = conn.write_status(ProtocolStatus::Rejected).await {
        debug!(error = %e, "failed to send rejection");
    }
    ProtocolStatus::Rejected
}
