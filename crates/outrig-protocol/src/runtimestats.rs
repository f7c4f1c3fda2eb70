// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use serde::{Deserialize, Serialize};

/// One runtime-stats snapshot.
///
/// Calculation of sub-fields is delegated to `sysinfo` and a shared task
/// counter; `gc_cycles` is an approximate stand-in described on the field
/// itself, since a Rust process has no tracing GC to count passes of.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeStatsSample {
    /// Epoch milliseconds.
    pub ts: i64,
    pub pid: i32,
    pub uptime_secs: u64,
    pub alloc_bytes: u64,
    pub sys_bytes: u64,
    /// Approximate count of allocator bookkeeping passes; see Open Questions.
    pub gc_cycles: u64,
    /// Number of live scheduled tasks.
    pub goroutine_count: u64,
    pub cpu_percent: f32,
}
