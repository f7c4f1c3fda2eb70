// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Connection to the Outrig server: handshake, the bounded per-peer send
//! queue, and log-line batching.

pub mod accumulator;
pub mod handshake;
pub mod peer;

pub use accumulator::LogAccumulator;
pub use handshake::perform_handshake;
pub use peer::PeerHandle;

use std::collections::HashMap;

use outrig_protocol::AppRunId;
use tokio::net::UnixStream;
use tokio::sync::Mutex;

use crate::error::SdkError;

/// Connect to the server's Unix domain socket and complete the handshake,
/// returning a live [`PeerHandle`] on success.
pub async fn connect(socket_path: &str, app_run_id: &AppRunId) -> Result<PeerHandle, SdkError> {
    let mut stream =
        UnixStream::connect(socket_path).await.map_err(|_| SdkError::HandshakeRejected)?;
    handshake::perform_handshake(&mut stream, app_run_id.as_str()).await?;
    Ok(PeerHandle::spawn(stream))
}

/// Zero or more active peer connections, keyed by a human-readable peer
/// name (typically the socket path, possibly with a sequence number
/// appended for a host that fans out to more than one server).
///
/// Registering a peer under a name that's already present evicts and
/// shuts down the prior one first, so a rolling restart that reconnects
/// under the same name never leaks a writer task.
#[derive(Default)]
pub struct Transport {
    peers: Mutex<HashMap<String, PeerHandle>>,
}

impl Transport {
    pub fn new() -> Self {
        Self { peers: Mutex::new(HashMap::new()) }
    }

    /// Connect to `socket_path` and register the resulting peer under
    /// `name`, evicting any existing peer registered under that name.
    pub async fn connect(
        &self,
        name: &str,
        socket_path: &str,
        app_run_id: &AppRunId,
    ) -> Result<PeerHandle, SdkError> {
        let peer = connect(socket_path, app_run_id).await?;
        self.insert(name, peer.clone()).await;
        Ok(peer)
    }

    /// Register `peer` under `name`, evicting and shutting down any
    /// existing peer with that name.
    pub async fn insert(&self, name: &str, peer: PeerHandle) {
        let mut peers = self.peers.lock().await;
        if let Some(evicted) = peers.insert(name.to_string(), peer) {
            evicted.shutdown();
        }
    }

    pub async fn get(&self, name: &str) -> Option<PeerHandle> {
        self.peers.lock().await.get(name).cloned()
    }

    /// Remove and shut down the peer registered under `name`, if any.
    pub async fn remove(&self, name: &str) -> Option<PeerHandle> {
        let peer = self.peers.lock().await.remove(name);
        if let Some(peer) = &peer {
            peer.shutdown();
        }
        peer
    }

    pub async fn is_empty(&self) -> bool {
        self.peers.lock().await.is_empty()
    }

    /// Shut down every registered peer and clear the map.
    pub async fn shutdown_all(&self) {
        let mut peers = self.peers.lock().await;
        for peer in peers.values() {
            peer.shutdown();
        }
        peers.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use outrig_protocol::{LogLine, LogSource, Packet, PacketBody};

    fn log_packet() -> Packet {
        Packet(PacketBody::Log(LogLine { line_num: 1, ts: 1, source: LogSource::Stdout, msg: "hi".into() }))
    }

    #[tokio::test]
    async fn inserting_under_an_existing_name_evicts_the_prior_peer() {
        let transport = Transport::new();
        let (a, _a_client) = UnixStream::pair().expect("socket pair");
        let (b, _b_client) = UnixStream::pair().expect("socket pair");

        let first = PeerHandle::spawn(a);
        transport.insert("server-1", first.clone()).await;
        assert!(first.is_alive());

        let second = PeerHandle::spawn(b);
        transport.insert("server-1", second.clone()).await;

        // Give the evicted peer's writer task a moment to observe shutdown.
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert!(!first.is_alive());
        assert!(second.is_alive());
        assert!(transport.get("server-1").await.expect("second peer registered").try_send(log_packet()));
    }

    #[tokio::test]
    async fn remove_shuts_down_and_drops_the_peer() {
        let transport = Transport::new();
        let (a, _client) = UnixStream::pair().expect("socket pair");
        transport.insert("server-1", PeerHandle::spawn(a)).await;

        let removed = transport.remove("server-1").await.expect("peer was registered");
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert!(!removed.is_alive());
        assert!(transport.get("server-1").await.is_none());
        assert!(transport.is_empty().await);
    }
}
