// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use outrig_protocol::{CollectorStatusBody, DeliveryMode, WatchKind, WatchSample};
use parking_lot::Mutex;
use tokio::sync::RwLock;

use crate::collectors::Collector;

fn now_ms() -> i64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_millis() as i64).unwrap_or(0)
}

/// A function the collector calls on each poll tick to read a watch's
/// current value. `PollFn`, `PollAtomic`, and `PollSync` registrations all
/// resolve to this one shape — what the host's closure is allowed to touch
/// (an arbitrary function, an atomic load, or a mutex-guarded read) is
/// already enforced by Rust's closure capture rules at the call site,
/// rather than needing three separate registration paths.
pub type PollFn = Arc<dyn Fn() -> serde_json::Value + Send + Sync>;

struct WatchEntry {
    tags: Vec<String>,
    watch_type: String,
    kind: WatchKind,
    delivery: DeliveryMode,
    poll: Option<PollFn>,
    state: Mutex<(serde_json::Value, i64)>,
}

impl WatchEntry {
    fn sample(&self, name: &str) -> WatchSample {
        let (value, ts) = self.state.lock().clone();
        WatchSample {
            name: name.to_string(),
            tags: self.tags.clone(),
            watch_type: self.watch_type.clone(),
            kind: self.kind,
            delivery: self.delivery,
            last_value: value,
            last_ts: ts,
        }
    }
}

/// Registry of named watches.
pub struct WatchCollector {
    enabled: AtomicBool,
    entries: RwLock<HashMap<String, WatchEntry>>,
}

impl Default for WatchCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl WatchCollector {
    pub fn new() -> Self {
        Self { enabled: AtomicBool::new(true), entries: RwLock::new(HashMap::new()) }
    }

    /// Register a watch that is sampled on each poll tick (`PollFn`,
    /// `PollAtomic`, or `PollSync` depending on what `delivery` the caller
    /// passes).
    pub async fn register_poll(
        &self,
        name: impl Into<String>,
        tags: Vec<String>,
        watch_type: impl Into<String>,
        kind: WatchKind,
        delivery: DeliveryMode,
        poll: PollFn,
    ) {
        let initial = poll();
        self.entries.write().await.insert(
            name.into(),
            WatchEntry {
                tags,
                watch_type: watch_type.into(),
                kind,
                delivery,
                poll: Some(poll),
                state: Mutex::new((initial, now_ms())),
            },
        );
    }

    /// Register a watch whose value never changes after registration.
    pub async fn register_static(
        &self,
        name: impl Into<String>,
        tags: Vec<String>,
        watch_type: impl Into<String>,
        kind: WatchKind,
        value: serde_json::Value,
    ) {
        self.entries.write().await.insert(
            name.into(),
            WatchEntry {
                tags,
                watch_type: watch_type.into(),
                kind,
                delivery: DeliveryMode::Static,
                poll: None,
                state: Mutex::new((value, now_ms())),
            },
        );
    }

    /// Push a new value for a `Push`-delivery watch, upserting it if this
    /// is the first observation. Returns the updated sample so the caller
    /// can send it immediately rather than waiting for the next tick.
    pub async fn push(
        &self,
        name: impl Into<String>,
        tags: Vec<String>,
        watch_type: impl Into<String>,
        kind: WatchKind,
        value: serde_json::Value,
    ) -> WatchSample {
        let name = name.into();
        let mut entries = self.entries.write().await;
        let entry = entries.entry(name.clone()).or_insert_with(|| WatchEntry {
            tags,
            watch_type: watch_type.into(),
            kind,
            delivery: DeliveryMode::Push,
            poll: None,
            state: Mutex::new((serde_json::Value::Null, now_ms())),
        });
        *entry.state.lock() = (value, now_ms());
        entry.sample(&name)
    }

    /// Re-sample every poll-backed watch; called once per poll tick from
    /// the collector's background task. Returns the fresh sample set.
    pub async fn tick(&self) -> Vec<WatchSample> {
        let entries = self.entries.read().await;
        let mut out = Vec::with_capacity(entries.len());
        for (name, entry) in entries.iter() {
            if let Some(poll) = &entry.poll {
                *entry.state.lock() = (poll(), now_ms());
            }
            out.push(entry.sample(name));
        }
        out
    }
}

impl Collector for WatchCollector {
    fn name(&self) -> &'static str {
        "watch"
    }

    fn enable(&self) {
        self.enabled.store(true, Ordering::Relaxed);
    }

    fn disable(&self) {
        self.enabled.store(false, Ordering::Relaxed);
    }

    fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    fn get_status(&self) -> CollectorStatusBody {
        CollectorStatusBody {
            collector: self.name().to_string(),
            enabled: self.is_enabled(),
            detail: None,
        }
    }
}
