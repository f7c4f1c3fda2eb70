// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Outrig server: ingests SDK packets over a Unix domain socket,
//! keeps one ring-buffered `AppRunPeer` per app-run, and serves log
//! search over them via `SearchManager`.

pub mod apprun;
pub mod config;
pub mod error;
pub mod events;
pub mod ingest;
pub mod ring;
pub mod search;

pub use apprun::{AppRunPeer, AppRunRegistry, PeerStatus};
pub use config::ServerConfig;
pub use error::ServerError;
pub use events::{EventHub, ServerEvent};
pub use ring::RingBuffer;
pub use search::{SearchManager, SearchManagerRegistry};

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

/// Wires the ingest listener, app-run registry, event hub, and search
/// registry together and runs until `shutdown` fires.
pub async fn run(config: ServerConfig, shutdown: CancellationToken) -> anyhow::Result<()> {
    let events = EventHub::new();
    let apprun_registry = Arc::new(AppRunRegistry::new(config.ring_capacity, events.clone()));
    let search_registry = Arc::new(SearchManagerRegistry::with_limits(
        apprun_registry.clone(),
        events.clone(),
        config.ring_capacity,
        config.max_search_managers,
        config.search_idle_threshold(),
    ));

    tokio::spawn(search::run_sweep_loop(
        search_registry.clone(),
        config.search_sweep_interval(),
        shutdown.clone(),
    ));

    let listener = ingest::bind(&config.domain_socket)?;
    tracing::info!(socket = %config.domain_socket.display(), "outrig-serverd listening");
    ingest::run(listener, apprun_registry, shutdown).await;

    Ok(())
}
