// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::collections::HashMap;
use std::sync::Arc;

use outrig_protocol::{
    AppInfo, AppRunId, GoroutineSnapshot, LogLine, PacketBody, PacketKind, RuntimeStatsSample,
    WatchSample,
};
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, info};

use crate::events::{EventHub, ServerEvent};
use crate::ring::RingBuffer;

/// Internal per-peer notification, distinct from the server-wide
/// [`ServerEvent`] hub: a `SearchManager` subscribes to this to know when
/// to re-pull from the ring it's watching, without the ingest path
/// needing to know anything about search at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerEvent {
    Appended(PacketKind),
    Done,
}

/// Where an app-run sits in its connection lifecycle.
///
/// `Running -> Disconnected -> Running` on a reconnect under the same
/// app-run-id, or `Running -> Done` once the host sends `AppDone`.
/// `Done` is terminal: a peer never leaves it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerStatus {
    Running,
    Disconnected,
    Done,
}

/// One connected (or recently disconnected) app-run: identity, the four
/// packet-kind ring buffers, and a notification channel.
pub struct AppRunPeer {
    pub app_run_id: AppRunId,
    info: RwLock<Option<AppInfo>>,
    status: RwLock<PeerStatus>,
    pub logs: RingBuffer<LogLine>,
    pub goroutines: RingBuffer<GoroutineSnapshot>,
    pub watches: RingBuffer<WatchSample>,
    pub runtimestats: RingBuffer<RuntimeStatsSample>,
    events: broadcast::Sender<PeerEvent>,
}

/// Capacity of the per-peer notification channel. Small: a slow
/// `SearchManager` re-pulls from the ring directly on its own schedule,
/// so missing a notification just delays a refresh rather than losing data.
const PEER_EVENT_CHANNEL_CAPACITY: usize = 64;

impl AppRunPeer {
    pub fn new(app_run_id: AppRunId, ring_capacity: usize) -> Self {
        let (events, _rx) = broadcast::channel(PEER_EVENT_CHANNEL_CAPACITY);
        Self {
            app_run_id,
            info: RwLock::new(None),
            status: RwLock::new(PeerStatus::Running),
            logs: RingBuffer::new(ring_capacity),
            goroutines: RingBuffer::new(ring_capacity),
            watches: RingBuffer::new(ring_capacity),
            runtimestats: RingBuffer::new(ring_capacity),
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PeerEvent> {
        self.events.subscribe()
    }

    pub async fn info(&self) -> Option<AppInfo> {
        self.info.read().await.clone()
    }

    pub async fn status(&self) -> PeerStatus {
        *self.status.read().await
    }

    pub async fn is_done(&self) -> bool {
        *self.status.read().await == PeerStatus::Done
    }

    /// Move `Running -> Disconnected`. A no-op once `Done`.
    pub async fn mark_disconnected(&self) {
        let mut status = self.status.write().await;
        if *status == PeerStatus::Running {
            *status = PeerStatus::Disconnected;
        }
    }

    /// Move `Disconnected -> Running` on reconnect. Returns `true` if a
    /// transition happened, so the registry can publish `RouteUp` only
    /// when the peer was actually down.
    async fn mark_reconnected(&self) -> bool {
        let mut status = self.status.write().await;
        if *status == PeerStatus::Disconnected {
            *status = PeerStatus::Running;
            true
        } else {
            false
        }
    }

    /// Route one decoded packet body into the matching ring, by single
    /// writer (the ingest connection's reader task)
    pub async fn ingest(&self, body: PacketBody) {
        match body {
            PacketBody::Appinfo(info) => {
                *self.info.write().await = Some(info);
            }
            PacketBody::Log(line) => {
                self.logs.append(line).await;
                self.notify(PacketKind::Log);
            }
            PacketBody::Multilog(batch) => {
                for line in batch.log_lines {
                    self.logs.append(line).await;
                }
                self.notify(PacketKind::Log);
            }
            PacketBody::Goroutine(snapshot) => {
                self.goroutines.append(snapshot).await;
                self.notify(PacketKind::Goroutine);
            }
            PacketBody::Watch(sample) => {
                self.watches.append(sample).await;
                self.notify(PacketKind::Watch);
            }
            PacketBody::Runtimestats(sample) => {
                self.runtimestats.append(sample).await;
                self.notify(PacketKind::Runtimestats);
            }
            PacketBody::Collectorstatus(status) => {
                debug!(app_run_id = %self.app_run_id, collector = %status.collector, enabled = status.enabled, "collector status");
            }
            PacketBody::Appdone(_) => {
                *self.status.write().await = PeerStatus::Done;
                let _ = self.events.send(PeerEvent::Done);
            }
        }
    }

    fn notify(&self, kind: PacketKind) {
        let _ = self.events.send(PeerEvent::Appended(kind));
    }
}

/// Registry of all app-runs the server currently knows about.
pub struct AppRunRegistry {
    peers: RwLock<HashMap<AppRunId, Arc<AppRunPeer>>>,
    ring_capacity: usize,
    events: EventHub,
}

impl AppRunRegistry {
    pub fn new(ring_capacity: usize, events: EventHub) -> Self {
        Self { peers: RwLock::new(HashMap::new()), ring_capacity, events }
    }

    /// Fetch the peer for `app_run_id`, creating and registering it (and
    /// publishing `RouteUp`) if this is the first time it's been seen.
    pub async fn get_or_create(&self, app_run_id: AppRunId) -> Arc<AppRunPeer> {
        if let Some(peer) = self.peers.read().await.get(&app_run_id) {
            if peer.mark_reconnected().await {
                info!(app_run_id = %app_run_id, "app-run reconnected");
                self.events.publish(ServerEvent::RouteUp { app_run_id });
            }
            return peer.clone();
        }

        let mut peers = self.peers.write().await;
        if let Some(peer) = peers.get(&app_run_id) {
            if peer.mark_reconnected().await {
                info!(app_run_id = %app_run_id, "app-run reconnected");
                self.events.publish(ServerEvent::RouteUp { app_run_id });
            }
            return peer.clone();
        }

        info!(app_run_id = %app_run_id, "app-run connected");
        let peer = Arc::new(AppRunPeer::new(app_run_id.clone(), self.ring_capacity));
        peers.insert(app_run_id.clone(), peer.clone());
        self.events.publish(ServerEvent::RouteUp { app_run_id });
        peer
    }

    pub async fn get(&self, app_run_id: &AppRunId) -> Option<Arc<AppRunPeer>> {
        self.peers.read().await.get(app_run_id).cloned()
    }

    pub async fn list(&self) -> Vec<AppRunId> {
        self.peers.read().await.keys().cloned().collect()
    }

    /// Mark a still-registered app-run's connection as lost without
    /// removing its history, publishing `RouteDown`. A later `get_or_create`
    /// for the same `app_run_id` flips it back to `Running` and publishes
    /// `RouteUp` again.
    pub async fn mark_disconnected(&self, app_run_id: &AppRunId) {
        if let Some(peer) = self.peers.read().await.get(app_run_id) {
            peer.mark_disconnected().await;
            self.events.publish(ServerEvent::RouteDown { app_run_id: app_run_id.clone() });
        }
    }

    /// Remove a finished app-run's peer, publishing `RouteDown`.
    pub async fn remove(&self, app_run_id: &AppRunId) {
        if self.peers.write().await.remove(app_run_id).is_some() {
            info!(app_run_id = %app_run_id, "app-run removed");
            self.events.publish(ServerEvent::RouteDown { app_run_id: app_run_id.clone() });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use outrig_protocol::{AppDoneBody, LogSource};

    fn log(n: i64, msg: &str) -> LogLine {
        LogLine { line_num: n, ts: n, source: LogSource::Stdout, msg: msg.into() }
    }

    #[tokio::test]
    async fn ingest_log_appends_and_notifies() {
        let peer = AppRunPeer::new(AppRunId::generate(), 16);
        let mut rx = peer.subscribe();

        peer.ingest(PacketBody::Log(log(1, "hi"))).await;

        assert_eq!(peer.logs.size().await, 1);
        assert_eq!(rx.recv().await.expect("appended event"), PeerEvent::Appended(PacketKind::Log));
    }

    #[tokio::test]
    async fn multilog_appends_all_lines_as_one_notification() {
        let peer = AppRunPeer::new(AppRunId::generate(), 16);
        let mut rx = peer.subscribe();

        peer.ingest(PacketBody::Multilog(outrig_protocol::packet::MultiLogBody {
            log_lines: vec![log(1, "a"), log(2, "b")],
        }))
        .await;

        assert_eq!(peer.logs.size().await, 2);
        assert_eq!(rx.recv().await.expect("appended event"), PeerEvent::Appended(PacketKind::Log));
    }

    #[tokio::test]
    async fn appdone_marks_peer_done() {
        let peer = AppRunPeer::new(AppRunId::generate(), 16);
        assert!(!peer.is_done().await);
        peer.ingest(PacketBody::Appdone(AppDoneBody { ts: 0 })).await;
        assert!(peer.is_done().await);
    }

    #[tokio::test]
    async fn disconnect_then_reconnect_round_trips_status_and_history() {
        let hub = EventHub::new();
        let mut rx = hub.subscribe();
        let registry = AppRunRegistry::new(16, hub);
        let id = AppRunId::generate();

        let peer = registry.get_or_create(id.clone()).await;
        assert!(matches!(rx.recv().await.expect("route up event"), ServerEvent::RouteUp { .. }));
        peer.ingest(PacketBody::Log(log(1, "before disconnect"))).await;

        registry.mark_disconnected(&id).await;
        assert_eq!(peer.status().await, PeerStatus::Disconnected);
        assert!(matches!(rx.recv().await.expect("route down event"), ServerEvent::RouteDown { .. }));

        let reconnected = registry.get_or_create(id.clone()).await;
        assert!(Arc::ptr_eq(&peer, &reconnected));
        assert_eq!(reconnected.status().await, PeerStatus::Running);
        assert!(matches!(rx.recv().await.expect("route up event on reconnect"), ServerEvent::RouteUp { .. }));
        assert_eq!(reconnected.logs.size().await, 1);
    }

    #[tokio::test]
    async fn mark_disconnected_is_a_no_op_once_done() {
        let registry = AppRunRegistry::new(16, EventHub::new());
        let id = AppRunId::generate();
        let peer = registry.get_or_create(id.clone()).await;
        peer.ingest(PacketBody::Appdone(AppDoneBody { ts: 0 })).await;

        registry.mark_disconnected(&id).await;
        assert_eq!(peer.status().await, PeerStatus::Done);
    }

    #[tokio::test]
    async fn registry_reuses_existing_peer_for_same_app_run() {
        let registry = AppRunRegistry::new(16, EventHub::new());
        let id = AppRunId::generate();
        let a = registry.get_or_create(id.clone()).await;
        let b = registry.get_or_create(id.clone()).await;
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(registry.list().await, vec![id]);
    }

    #[tokio::test]
    async fn registry_publishes_route_up_and_down() {
        let hub = EventHub::new();
        let mut rx = hub.subscribe();
        let registry = AppRunRegistry::new(16, hub);
        let id = AppRunId::generate();

        registry.get_or_create(id.clone()).await;
        assert!(matches!(rx.recv().await.expect("route up event"), ServerEvent::RouteUp { .. }));

        registry.remove(&id).await;
        assert!(matches!(rx.recv().await.expect("route down event"), ServerEvent::RouteDown { .. }));
        assert!(registry.get(&id).await.is_none());
    }
}
