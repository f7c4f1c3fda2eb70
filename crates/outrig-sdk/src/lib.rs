// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Development-time observability SDK. Embed this in a host program to
//! stream logs, goroutine-analogue snapshots, watches, and runtime stats
//! to a running Outrig server over a Unix domain socket.
//!
//! The public surface is a handful of free functions (`init`, `enable`,
//! `disable`, `send_packet`, `app_done`, `get_app_run_id`) backed by a
//! process-global singleton: `is_enabled()` is one atomic load and safe
//! to call from any hot path.
//!
//! Build with the `noop` feature to compile every one of these to an
//! inert stub (see [`build_stub`]) — useful for release builds that must
//! not carry the SDK's runtime cost at all.

pub mod collectors;
pub mod config;
pub mod error;
pub mod transport;

#[cfg(not(feature = "noop"))]
mod controller;
#[cfg(feature = "noop")]
mod build_stub;

#[cfg(not(feature = "noop"))]
pub use controller::{
    app_done, collector_statuses, disable, enable, get_app_run_id, goroutine_collector, init,
    is_enabled, log_collector, send_packet, state, watch_collector, SdkState,
};

#[cfg(feature = "noop")]
pub use build_stub::{
    app_done, collector_statuses, disable, enable, get_app_run_id, goroutine_collector, init,
    is_enabled, log_collector, send_packet, state, watch_collector, SdkState,
};

pub use config::SdkConfig;
pub use error::SdkError;
