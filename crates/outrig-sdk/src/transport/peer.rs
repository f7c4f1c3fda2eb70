// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use outrig_protocol::Packet;
use tokio::io::AsyncWriteExt;
use tokio::net::UnixStream;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Send queue depth per peer connection.
const QUEUE_DEPTH: usize = 100;

/// Deadline for a single packet write before the connection is considered
/// wedged and torn down.
const WRITE_DEADLINE: Duration = Duration::from_secs(10);

/// Handle to a live connection's writer task.
///
/// Cloning is cheap; every collector and the controller itself holds one.
/// Sends are non-blocking: a full queue means the oldest pressure is on
/// the writer, not the caller, so `try_send` simply drops and counts it.
#[derive(Clone)]
pub struct PeerHandle {
    tx: mpsc::Sender<Packet>,
    queued: Arc<AtomicU64>,
    dropped: Arc<AtomicU64>,
    alive: Arc<AtomicBool>,
    shutdown: CancellationToken,
}

impl PeerHandle {
    /// Spawn the writer task over an already-handshaken stream.
    pub fn spawn(stream: UnixStream) -> Self {
        let (tx, rx) = mpsc::channel(QUEUE_DEPTH);
        let queued = Arc::new(AtomicU64::new(0));
        let dropped = Arc::new(AtomicU64::new(0));
        let alive = Arc::new(AtomicBool::new(true));
        let shutdown = CancellationToken::new();

        tokio::spawn(writer_loop(stream, rx, alive.clone(), shutdown.clone()));

        Self { tx, queued, dropped, alive, shutdown }
    }

    /// Enqueue a packet for this peer. Returns `false` if the queue is
    /// full or the connection has already died; the caller counts this
    /// as dropped but does not treat it as an error.
    pub fn try_send(&self, packet: Packet) -> bool {
        if !self.alive.load(Ordering::Relaxed) {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            return false;
        }
        match self.tx.try_send(packet) {
            Ok(()) => {
                self.queued.fetch_add(1, Ordering::Relaxed);
                true
            }
            Err(_) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Relaxed)
    }

    pub fn queued(&self) -> u64 {
        self.queued.load(Ordering::Relaxed)
    }

    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Stop the writer task, e.g. on `app_done`.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }
}

async fn writer_loop(
    mut stream: UnixStream,
    mut rx: mpsc::Receiver<Packet>,
    alive: Arc<AtomicBool>,
    shutdown: CancellationToken,
) {
    loop {
        let packet = tokio::select! {
            _ = shutdown.cancelled() => break,
            maybe = rx.recv() => match maybe {
                Some(p) => p,
                None => break,
            },
        };

        let line = match packet.to_line() {
            Ok(line) => line,
            Err(err) => {
                warn!(%err, "dropping packet that failed to encode");
                continue;
            }
        };

        let write = stream.write_all(format!("{line}\n").as_bytes());
        match tokio::time::timeout(WRITE_DEADLINE, write).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                warn!(%err, "peer write failed, tearing down connection");
                break;
            }
            Err(_) => {
                warn!("peer write deadline exceeded, tearing down connection");
                break;
            }
        }
    }

    debug!("peer writer task exiting");
    alive.store(false, Ordering::Relaxed);
}

#[cfg(test)]
mod tests {
    use super::*;
    use outrig_protocol::{LogLine, LogSource, PacketBody};
    use tokio::io::AsyncReadExt;

    fn log_packet(msg: &str) -> Packet {
        Packet(PacketBody::Log(LogLine { line_num: 1, ts: 1, source: LogSource::Stdout, msg: msg.into() }))
    }

    #[tokio::test]
    async fn delivers_packets_to_the_socket() {
        let (a, mut b) = UnixStream::pair().expect("socket pair");
        let peer = PeerHandle::spawn(a);

        assert!(peer.try_send(log_packet("hello")));

        let mut buf = vec![0u8; 256];
        let n = tokio::time::timeout(Duration::from_secs(1), b.read(&mut buf))
            .await
            .expect("read timed out")
            .expect("read failed");
        let text = String::from_utf8_lossy(&buf[..n]);
        assert!(text.contains("hello"));
        assert_eq!(peer.queued(), 1);
    }

    #[tokio::test]
    async fn shutdown_marks_peer_dead_and_future_sends_drop() {
        let (a, _b) = UnixStream::pair().expect("socket pair");
        let peer = PeerHandle::spawn(a);
        peer.shutdown();

        // Give the writer task a moment to observe cancellation.
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!peer.is_alive());
        assert!(!peer.try_send(log_packet("after shutdown")));
        assert_eq!(peer.dropped(), 1);
    }
}
