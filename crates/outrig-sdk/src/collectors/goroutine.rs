// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use outrig_protocol::{CollectorStatusBody, GoroutineSnapshot, GoroutineStack};
use tokio::task::{AbortHandle, Id, JoinHandle};
use tokio::sync::RwLock;

use crate::collectors::Collector;

fn now_ms() -> i64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_millis() as i64).unwrap_or(0)
}

struct GoroutineEntry {
    go_id: u64,
    name: Option<String>,
    tags: Vec<String>,
    abort: AbortHandle,
}

/// Tracks named tokio tasks as the SDK's analogue of goroutines.
///
/// `tokio::task::Id` is the registry key (unique per spawned task) but is
/// opaque on stable Rust, so each entry is also assigned a small `go_id`
/// for the wire format. A task's real call stack cannot be captured
/// safely from outside itself, so `full_stack`/`top_frame` describe the
/// task by name and tags rather than by unwinding it.
pub struct GoroutineCollector {
    enabled: AtomicBool,
    registry: RwLock<HashMap<Id, GoroutineEntry>>,
    next_go_id: AtomicU64,
    /// Live count, shared with `RuntimeStatsCollector` for its
    /// `goroutine_count` field.
    active_count: Arc<AtomicU64>,
}

impl GoroutineCollector {
    pub fn new(active_count: Arc<AtomicU64>) -> Self {
        Self {
            enabled: AtomicBool::new(true),
            registry: RwLock::new(HashMap::new()),
            next_go_id: AtomicU64::new(1),
            active_count,
        }
    }

    /// Shared counter this collector keeps in sync with its registry size,
    /// handed to [`super::runtimestats::RuntimeStatsCollector`] at
    /// construction time.
    pub fn active_count_handle(&self) -> Arc<AtomicU64> {
        self.active_count.clone()
    }

    /// Spawn `fut` as a tokio task and register it under `name`/`tags`.
    pub async fn spawn_named<F>(
        &self,
        name: impl Into<String>,
        tags: Vec<String>,
        fut: F,
    ) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        let handle = tokio::spawn(fut);
        let id = handle.id();
        let go_id = self.next_go_id.fetch_add(1, Ordering::Relaxed);

        self.registry.write().await.insert(
            id,
            GoroutineEntry { go_id, name: Some(name.into()), tags, abort: handle.abort_handle() },
        );
        self.active_count.fetch_add(1, Ordering::Relaxed);

        handle
    }

    /// Rename an already-registered task, e.g. after its purpose becomes
    /// known partway through its lifetime.
    pub async fn set_goroutine_name(&self, id: Id, name: impl Into<String>) {
        if let Some(entry) = self.registry.write().await.get_mut(&id) {
            entry.name = Some(name.into());
        }
    }

    /// Drop entries for tasks that have already finished. Run once per
    /// collector tick.
    pub async fn sweep_finished(&self) {
        let mut registry = self.registry.write().await;
        let before = registry.len();
        registry.retain(|_, entry| !entry.abort.is_finished());
        let removed = (before - registry.len()) as u64;
        if removed > 0 {
            self.active_count.fetch_sub(removed, Ordering::Relaxed);
        }
    }

    /// Build a full snapshot of all currently-registered live tasks.
    pub async fn snapshot(&self) -> GoroutineSnapshot {
        let registry = self.registry.read().await;
        let stacks = registry
            .values()
            .filter(|e| !e.abort.is_finished())
            .map(|e| GoroutineStack {
                go_id: e.go_id,
                name: e.name.clone(),
                tags: e.tags.clone(),
                state_group: "running".to_string(),
                top_frame: e.name.clone().unwrap_or_else(|| format!("task-{}", e.go_id)),
                full_stack: e.name.clone().unwrap_or_else(|| format!("task-{}", e.go_id)),
            })
            .collect();
        GoroutineSnapshot { ts: now_ms(), stacks, full: true }
    }
}

impl Collector for GoroutineCollector {
    fn name(&self) -> &'static str {
        "goroutine"
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

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn spawned_task_appears_in_snapshot() {
        let collector = GoroutineCollector::new(Arc::new(AtomicU64::new(0)));
        let _handle = collector
            .spawn_named("worker", vec!["pool".into()], async {
                tokio::time::sleep(Duration::from_millis(200)).await;
            })
            .await;

        let snap = collector.snapshot().await;
        assert_eq!(snap.stacks.len(), 1);
        assert_eq!(snap.stacks[0].name.as_deref(), Some("worker"));
        assert_eq!(snap.stacks[0].tags, vec!["pool".to_string()]);
        assert_eq!(collector.active_count_handle().load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn finished_task_is_swept() {
        let collector = GoroutineCollector::new(Arc::new(AtomicU64::new(0)));
        let handle = collector.spawn_named("quick", vec![], async {}).await;
        handle.await.expect("spawned task should join");

        // Give the abort handle's finished flag time to flip.
        tokio::time::sleep(Duration::from_millis(20)).await;
        collector.sweep_finished().await;

        let snap = collector.snapshot().await;
        assert!(snap.stacks.is_empty());
        assert_eq!(collector.active_count_handle().load(Ordering::Relaxed), 0);
    }
}
