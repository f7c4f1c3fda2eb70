// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! No-op stand-in for `controller`, compiled in when the `noop` feature is
//! enabled. Every public signature matches `controller` exactly so a host
//! program can flip the feature without touching call sites.

use outrig_protocol::packet::CollectorStatusBody;
use outrig_protocol::{AppRunId, PacketBody};

use crate::collectors::goroutine::GoroutineCollector;
use crate::collectors::log::LogCollector;
use crate::collectors::watch::WatchCollector;
use crate::error::SdkError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SdkState {
    Standby,
    Enabled,
    Disabled,
}

pub fn init() -> Result<(), SdkError> {
    Ok(())
}

pub fn enable() {}

pub fn disable(_disconnect: bool) {}

pub fn is_enabled() -> bool {
    false
}

pub fn state() -> Option<SdkState> {
    Some(SdkState::Disabled)
}

pub fn get_app_run_id() -> Option<AppRunId> {
    None
}

pub async fn send_packet(_body: PacketBody) -> Result<bool, SdkError> {
    Err(SdkError::Disabled)
}

pub async fn app_done() -> Result<(), SdkError> {
    Ok(())
}

pub fn log_collector() -> Option<std::sync::Arc<LogCollector>> {
    None
}

pub fn goroutine_collector() -> Option<std::sync::Arc<GoroutineCollector>> {
    None
}

pub fn watch_collector() -> Option<std::sync::Arc<WatchCollector>> {
    None
}

pub fn collector_statuses() -> Vec<CollectorStatusBody> {
    Vec::new()
}
