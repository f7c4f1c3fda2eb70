// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared helpers for the end-to-end scenario tests under `tests/`.

use std::sync::Arc;

use outrig_protocol::{AppRunId, LogLine, LogSource, PacketBody};
use outrig_server::{AppRunPeer, AppRunRegistry, EventHub};

pub fn log_line(line_num: i64, msg: &str) -> LogLine {
    LogLine { line_num, ts: line_num, source: LogSource::Stdout, msg: msg.to_string() }
}

/// Builds a fresh, unregistered `AppRunPeer` and ingests `msgs` into it
/// as log lines numbered from zero.
pub async fn peer_with_lines(ring_capacity: usize, msgs: &[&str]) -> Arc<AppRunPeer> {
    let peer = Arc::new(AppRunPeer::new(AppRunId::generate(), ring_capacity));
    for (i, msg) in msgs.iter().enumerate() {
        peer.ingest(PacketBody::Log(log_line(i as i64, msg))).await;
    }
    peer
}

pub fn new_apprun_registry(ring_capacity: usize) -> Arc<AppRunRegistry> {
    Arc::new(AppRunRegistry::new(ring_capacity, EventHub::new()))
}
