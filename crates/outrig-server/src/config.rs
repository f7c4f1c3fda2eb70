// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;

use clap::Parser;

/// Configuration for `outrig-serverd`.
#[derive(Debug, Clone, Parser)]
#[command(name = "outrig-serverd", version, about)]
pub struct ServerConfig {
    /// Unix domain socket path the SDK connects to.
    #[arg(long, default_value = "/tmp/outrig.sock", env = "OUTRIG_DOMAIN_SOCKET")]
    pub domain_socket: PathBuf,

    /// Per-app-run ring buffer capacity, in entries, for each of the four
    /// ring kinds (logs, goroutine snapshots, watch samples, runtime
    /// stats).
    #[arg(long, default_value_t = 10_000, env = "OUTRIG_RING_CAPACITY")]
    pub ring_capacity: usize,

    /// Maximum number of concurrently cached `SearchManager`s across all
    /// app runs.
    #[arg(long, default_value_t = 5, env = "OUTRIG_MAX_SEARCH_MANAGERS")]
    pub max_search_managers: usize,

    /// How often the search-manager registry sweeps for idle entries to
    /// evict, in milliseconds.
    #[arg(long, default_value_t = 10_000, env = "OUTRIG_SEARCH_SWEEP_MS")]
    pub search_sweep_ms: u64,

    /// Idle threshold before a search manager becomes evictable, in
    /// milliseconds.
    #[arg(long, default_value_t = 60_000, env = "OUTRIG_SEARCH_IDLE_MS")]
    pub search_idle_ms: u64,

    /// Log format (json or text).
    #[arg(long, default_value = "json", env = "OUTRIG_LOG_FORMAT")]
    pub log_format: String,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info", env = "OUTRIG_LOG_LEVEL")]
    pub log_level: String,
}

impl ServerConfig {
    pub fn search_sweep_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.search_sweep_ms)
    }

    pub fn search_idle_threshold(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.search_idle_ms)
    }
}
