// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use outrig_protocol::{AppRunId, LogLine, WatchSample};
use tokio::sync::broadcast;

/// Capacity of the broadcast channel backing [`EventHub`]. Slow
/// subscribers that fall this far behind miss intermediate events rather
/// than backpressuring the ingest path.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Server-wide push events, the RPC surface the search UI and any other
/// collaborator subscribes to.
#[derive(Debug, Clone)]
pub enum ServerEvent {
    /// A new app-run connected.
    RouteUp { app_run_id: AppRunId },
    /// An app-run finished (`AppDone`) or its connection was lost.
    RouteDown { app_run_id: AppRunId },
    /// A watch value changed.
    WatchUpdate { app_run_id: AppRunId, sample: WatchSample },
    /// A registered search's filtered window gained a new matching line.
    StreamUpdate {
        app_run_id: AppRunId,
        widget_id: String,
        filtered_count: usize,
        searched_count: usize,
        total_count: usize,
        trimmed_lines: u64,
        /// Absolute index of the first line in `lines` within the
        /// filtered window (after any front-trim).
        offset: usize,
        lines: Vec<LogLine>,
    },
}

/// Broadcast hub for [`ServerEvent`]s.
#[derive(Clone)]
pub struct EventHub {
    tx: broadcast::Sender<ServerEvent>,
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new()
    }
}

impl EventHub {
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ServerEvent> {
        self.tx.subscribe()
    }

    pub fn publish(&self, event: ServerEvent) {
        // No receivers is the common case when nothing is watching yet;
        // that's not a failure.
        let _ = self.tx.send(event);
    }
}
