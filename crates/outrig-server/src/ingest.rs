// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Unix-domain-socket listener the SDK connects to.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use outrig_protocol::{
    handshake::parse_handshake_line, AppRunId, HandshakeAck, Packet, ProtocolError,
    PROTOCOL_VERSION,
};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::apprun::AppRunRegistry;
use crate::error::ServerError;

/// Bind the ingest socket, removing a stale file left over from an
/// unclean shutdown first.
pub fn bind(socket_path: &Path) -> std::io::Result<UnixListener> {
    if socket_path.exists() {
        std::fs::remove_file(socket_path)?;
    }
    UnixListener::bind(socket_path)
}

/// Accept connections until `shutdown` fires, spawning one reader task
/// per connection.
pub async fn run(
    listener: UnixListener,
    registry: Arc<AppRunRegistry>,
    shutdown: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                debug!("ingest listener shutting down");
                return;
            }
            accepted = listener.accept() => {
                match accepted {
                    Ok((stream, _addr)) => {
                        let registry = registry.clone();
                        let shutdown = shutdown.clone();
                        tokio::spawn(async move {
                            if let Err(err) = handle_connection(stream, registry, shutdown).await {
                                warn!(%err, "ingest connection closed with error");
                            }
                        });
                    }
                    Err(err) => warn!(%err, "failed to accept ingest connection"),
                }
            }
        }
    }
}

async fn handle_connection(
    mut stream: UnixStream,
    registry: Arc<AppRunRegistry>,
    shutdown: CancellationToken,
) -> Result<(), ServerError> {
    let mut reader = BufReader::new(&mut stream);
    let mut handshake = String::new();
    reader.read_line(&mut handshake).await.map_err(|_| ServerError::ParseError)?;

    let app_run_id = parse_handshake_line(handshake.trim_end()).ok_or(ServerError::ParseError)?;
    let app_run_id = AppRunId::from(app_run_id.to_string());

    let ack = HandshakeAck { http_port: 0, protocol_version: PROTOCOL_VERSION };
    let ack_line =
        serde_json::to_string(&ack).map_err(|_| ServerError::ParseError)? + "\n";
    stream.write_all(ack_line.as_bytes()).await.map_err(|_| ServerError::ParseError)?;

    info!(app_run_id = %app_run_id, "ingest connection handshake complete");
    let peer = registry.get_or_create(app_run_id.clone()).await;

    let mut reader = BufReader::new(stream);
    let mut line = String::new();
    let mut warned_kinds: HashSet<String> = HashSet::new();
    loop {
        line.clear();
        let read = tokio::select! {
            _ = shutdown.cancelled() => break,
            n = reader.read_line(&mut line) => n,
        };

        let n = read.map_err(|_| ServerError::ParseError)?;
        if n == 0 {
            break;
        }
        let trimmed = line.trim_end();
        if trimmed.is_empty() {
            continue;
        }

        match Packet::from_line(trimmed) {
            Ok(packet) => peer.ingest(packet.0).await,
            Err(ProtocolError::UnknownKind(kind)) => {
                if warned_kinds.insert(kind.clone()) {
                    warn!(app_run_id = %app_run_id, %kind, "dropping packet of unknown kind");
                }
            }
            Err(err) => warn!(app_run_id = %app_run_id, %err, "dropping malformed packet"),
        }
    }

    if !peer.is_done().await {
        warn!(app_run_id = %app_run_id, "ingest connection closed without AppDone");
        registry.mark_disconnected(&app_run_id).await;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventHub;
    use outrig_protocol::{handshake_line, LogLine, LogSource, PacketBody};
    use tokio::io::AsyncReadExt;

    #[tokio::test]
    async fn handshake_then_log_line_lands_in_the_peer_ring() {
        let (mut client, server) = UnixStream::pair().expect("socket pair");
        let registry = Arc::new(AppRunRegistry::new(16, EventHub::new()));
        let shutdown = CancellationToken::new();

        let registry_for_task = registry.clone();
        let shutdown_for_task = shutdown.clone();
        let task = tokio::spawn(async move {
            let _ = handle_connection(server, registry_for_task, shutdown_for_task).await;
        });

        client
            .write_all(format!("{}\n", handshake_line("run-1")).as_bytes())
            .await
            .expect("write handshake");

        let mut ack_buf = vec![0u8; 256];
        let n = client.read(&mut ack_buf).await.expect("read ack");
        let ack: HandshakeAck = serde_json::from_slice(&ack_buf[..n]).expect("ack should decode");
        assert_eq!(ack.protocol_version, PROTOCOL_VERSION);

        let packet = Packet(PacketBody::Log(LogLine {
            line_num: 1,
            ts: 1,
            source: LogSource::Stdout,
            msg: "hello".into(),
        }));
        client
            .write_all(format!("{}\n", packet.to_line().expect("packet should encode")).as_bytes())
            .await
            .expect("write log line");

        // Give the reader task a moment to process before we tear it down.
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        shutdown.cancel();
        let _ = task.await;

        let peer = registry.get(&AppRunId::from("run-1".to_string())).await.expect("peer registered on handshake");
        assert_eq!(peer.logs.size().await, 1);
    }

    #[tokio::test]
    async fn unknown_kind_packet_is_dropped_without_breaking_the_connection() {
        let (mut client, server) = UnixStream::pair().expect("socket pair");
        let registry = Arc::new(AppRunRegistry::new(16, EventHub::new()));
        let shutdown = CancellationToken::new();

        let registry_for_task = registry.clone();
        let shutdown_for_task = shutdown.clone();
        let task = tokio::spawn(async move {
            let _ = handle_connection(server, registry_for_task, shutdown_for_task).await;
        });

        client
            .write_all(format!("{}\n", handshake_line("run-2")).as_bytes())
            .await
            .expect("write handshake");
        let mut ack_buf = vec![0u8; 256];
        client.read(&mut ack_buf).await.expect("read ack");

        client
            .write_all(b"{\"type\":\"bogus\",\"data\":{}}\n")
            .await
            .expect("write unknown-kind packet");

        let packet = Packet(PacketBody::Log(LogLine {
            line_num: 1,
            ts: 1,
            source: LogSource::Stdout,
            msg: "still works".into(),
        }));
        client
            .write_all(format!("{}\n", packet.to_line().expect("packet should encode")).as_bytes())
            .await
            .expect("write log line");

        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        shutdown.cancel();
        let _ = task.await;

        let peer = registry.get(&AppRunId::from("run-2".to_string())).await.expect("peer registered on handshake");
        assert_eq!(peer.logs.size().await, 1);
    }
}
