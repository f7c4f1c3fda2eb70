// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Global `SearchManager` registry: bounded, evicting.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use outrig_protocol::AppRunId;
use parking_lot::Mutex;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::apprun::AppRunRegistry;
use crate::error::ServerError;
use crate::events::EventHub;
use crate::search::manager::{run_live_feed, SearchManager};

/// Default cap on live `SearchManager`s, used when not overridden via `ServerConfig`.
pub const DEFAULT_MAX_MANAGERS: usize = 5;
/// Default idle threshold before a manager becomes evictable (spec
/// §4.5: "idle more than 1 minute").
pub const DEFAULT_IDLE_THRESHOLD: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct Key {
    app_run_id: AppRunId,
    widget_id: String,
}

struct Entry {
    manager: Arc<SearchManager>,
    last_used: Mutex<Instant>,
    feed_shutdown: CancellationToken,
}

impl Entry {
    fn touch(&self) {
        *self.last_used.lock() = Instant::now();
    }

    fn idle_for(&self) -> Duration {
        self.last_used.lock().elapsed()
    }
}

/// Owns every live `SearchManager`, creating them on demand and evicting
/// the least-recently-used ones to stay within [`MAX_MANAGERS`].
pub struct SearchManagerRegistry {
    apprun_registry: Arc<AppRunRegistry>,
    events: EventHub,
    ring_capacity: usize,
    max_managers: usize,
    idle_threshold: Duration,
    entries: RwLock<HashMap<Key, Entry>>,
}

impl SearchManagerRegistry {
    pub fn new(apprun_registry: Arc<AppRunRegistry>, events: EventHub, ring_capacity: usize) -> Self {
        Self::with_limits(apprun_registry, events, ring_capacity, DEFAULT_MAX_MANAGERS, DEFAULT_IDLE_THRESHOLD)
    }

    pub fn with_limits(
        apprun_registry: Arc<AppRunRegistry>,
        events: EventHub,
        ring_capacity: usize,
        max_managers: usize,
        idle_threshold: Duration,
    ) -> Self {
        Self {
            apprun_registry,
            events,
            ring_capacity,
            max_managers,
            idle_threshold,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Fetch (or create) the manager for `(app_run_id, widget_id)`,
    /// evicting another manager first if the registry is full.
    pub async fn get_or_create(
        &self,
        app_run_id: AppRunId,
        widget_id: String,
    ) -> Result<Arc<SearchManager>, ServerError> {
        let key = Key { app_run_id: app_run_id.clone(), widget_id: widget_id.clone() };

        if let Some(entry) = self.entries.read().await.get(&key) {
            entry.touch();
            return Ok(entry.manager.clone());
        }

        let peer = self.apprun_registry.get(&app_run_id).await.ok_or(ServerError::UnknownAppRun)?;

        let mut entries = self.entries.write().await;
        if let Some(entry) = entries.get(&key) {
            entry.touch();
            return Ok(entry.manager.clone());
        }

        if entries.len() >= self.max_managers {
            self.evict_one(&mut entries);
        }

        let manager = Arc::new(SearchManager::new(peer, widget_id, self.ring_capacity, self.events.clone()));
        let feed_shutdown = CancellationToken::new();
        let feed_manager = manager.clone();
        let feed_token = feed_shutdown.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = feed_token.cancelled() => {}
                _ = run_live_feed(feed_manager) => {}
            }
        });

        entries.insert(key, Entry { manager: manager.clone(), last_used: Mutex::new(Instant::now()), feed_shutdown });
        Ok(manager)
    }

    /// Evicts the idle-longest manager if any exceed the idle
    /// threshold, else the globally oldest-`lastUsed` one.
    fn evict_one(&self, entries: &mut HashMap<Key, Entry>) {
        let victim = entries
            .iter()
            .filter(|(_, e)| e.idle_for() > self.idle_threshold)
            .max_by_key(|(_, e)| e.idle_for())
            .map(|(k, _)| k.clone())
            .or_else(|| entries.iter().max_by_key(|(_, e)| e.idle_for()).map(|(k, _)| k.clone()));

        if let Some(key) = victim {
            if let Some(entry) = entries.remove(&key) {
                info!(app_run_id = %key.app_run_id, widget_id = %key.widget_id, "evicting search manager");
                entry.feed_shutdown.cancel();
            }
        }
    }

    /// Periodic housekeeping: evicts every manager idle past the
    /// configured threshold, regardless of whether the registry is full.
    pub async fn sweep_idle(&self) {
        let mut entries = self.entries.write().await;
        let idle_keys: Vec<Key> =
            entries.iter().filter(|(_, e)| e.idle_for() > self.idle_threshold).map(|(k, _)| k.clone()).collect();
        for key in idle_keys {
            if let Some(entry) = entries.remove(&key) {
                info!(app_run_id = %key.app_run_id, widget_id = %key.widget_id, "sweeping idle search manager");
                entry.feed_shutdown.cancel();
            }
        }
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}

/// Spawns the background sweep task, run every `interval` until
/// `shutdown` fires.
pub async fn run_sweep_loop(registry: Arc<SearchManagerRegistry>, interval: Duration, shutdown: CancellationToken) {
    let mut ticker = tokio::time::interval(interval);
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => return,
            _ = ticker.tick() => registry.sweep_idle().await,
        }
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
