// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use serde::{Deserialize, Serialize};

/// A single scheduled-task stack captured at snapshot time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoroutineStack {
    /// Runtime task id (the SDK's analogue of a goroutine id).
    pub go_id: u64,
    /// User-assigned name, bound via `Go(name).Run` or `SetGoRoutineName`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Coarse scheduler state: running, waiting, blocked, etc.
    pub state_group: String,
    pub top_frame: String,
    pub full_stack: String,
}

/// All live tasks captured on one 1s tick.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoroutineSnapshot {
    /// Epoch milliseconds.
    pub ts: i64,
    pub stacks: Vec<GoroutineStack>,
    /// Whether this is a full dump (always sent on a new connection) or
    /// could, in principle, be computed as a delta against the previous
    /// snapshot. The server is the one that actually diffs; the SDK always
    /// sends full snapshots and tags the first one after connect.
    pub full: bool,
}
