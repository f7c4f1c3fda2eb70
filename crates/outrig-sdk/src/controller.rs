// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use outrig_protocol::packet::{AppDoneBody, CollectorStatusBody, MultiLogBody};
use outrig_protocol::{AppInfo, AppRunId, Packet, PacketBody};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::collectors::goroutine::GoroutineCollector;
use crate::collectors::log::LogCollector;
use crate::collectors::runtimestats::RuntimeStatsCollector;
use crate::collectors::watch::WatchCollector;
use crate::collectors::Collector;
use crate::config::SdkConfig;
use crate::error::SdkError;
use crate::transport::{LogAccumulator, Transport};

/// How often the background poller retries a dead connection, and how
/// often connected collectors are re-sampled and the log accumulator
/// flushed.
const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Bound on how long `app_done` will busy-wait for the accumulator to
/// drain before giving up.
const APP_DONE_DRAIN_BUDGET: Duration = Duration::from_millis(50);

/// Publicly observable lifecycle state.
///
/// `Uninitialized` is implicit: it is simply the absence of a global
/// [`Controller`], so it has no variant here — every public entry point
/// treats a missing controller as [`SdkError::NotInitialized`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SdkState {
    /// Not yet connected; the background poller is retrying.
    Standby,
    /// Connected and sending.
    Enabled,
    /// Either `OUTRIG_DISABLED` was set, the handshake was permanently
    /// rejected, or `disable()` was called.
    Disabled,
}

static CONTROLLER: OnceLock<Controller> = OnceLock::new();

struct Controller {
    config: SdkConfig,
    app_run_id: AppRunId,
    started_at: i64,
    enabled: AtomicBool,
    force_disabled: AtomicBool,
    transport: Transport,
    log_accumulator: Arc<LogAccumulator>,
    log: Arc<LogCollector>,
    goroutine: Arc<GoroutineCollector>,
    watch: Arc<WatchCollector>,
    runtimestats: Arc<RuntimeStatsCollector>,
    shutdown: CancellationToken,
}

impl Controller {
    fn new(config: SdkConfig) -> Self {
        let app_run_id =
            config.app_run_id.clone().map(AppRunId::from).unwrap_or_else(AppRunId::generate);

        let log_accumulator = Arc::new(LogAccumulator::new());
        let gc_epoch = Arc::new(AtomicU64::new(0));
        let active_tasks = Arc::new(AtomicU64::new(0));

        Self {
            app_run_id,
            started_at: now_ms(),
            enabled: AtomicBool::new(false),
            force_disabled: AtomicBool::new(config.disabled),
            transport: Transport::new(),
            log_accumulator: log_accumulator.clone(),
            log: Arc::new(LogCollector::new(log_accumulator)),
            goroutine: Arc::new(GoroutineCollector::new(active_tasks.clone())),
            watch: Arc::new(WatchCollector::new()),
            runtimestats: Arc::new(RuntimeStatsCollector::new(gc_epoch, active_tasks)),
            shutdown: CancellationToken::new(),
            config,
        }
    }

    fn state(&self) -> SdkState {
        if self.force_disabled.load(Ordering::Relaxed) {
            SdkState::Disabled
        } else if self.enabled.load(Ordering::Relaxed) {
            SdkState::Enabled
        } else {
            SdkState::Standby
        }
    }

    /// Retry connecting to the server once per `POLL_INTERVAL` while not
    /// yet enabled, driven off the process-global `'static` instance.
    async fn connect_loop(&'static self) {
        loop {
            if self.shutdown.is_cancelled() {
                return;
            }
            let skip = self.force_disabled.load(Ordering::Relaxed)
                || self.enabled.load(Ordering::Relaxed);
            if !skip {
                let socket = &self.config.domain_socket;
                match self.transport.connect(socket, socket, &self.app_run_id).await {
                    Ok(_peer) => {
                        info!(app_run_id = %self.app_run_id, "connected to outrig server");
                        self.enabled.store(true, Ordering::Relaxed);
                        let _ = self.send_packet(PacketBody::Appinfo(self.app_info())).await;
                    }
                    Err(SdkError::HandshakeRejected) => {
                        debug!("outrig handshake rejected, will retry");
                    }
                    Err(_) => {}
                }
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    /// Re-sample every poll-backed collector and flush pending logs, once
    /// per `POLL_INTERVAL` while connected.
    async fn tick_loop(&'static self) {
        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => return,
                _ = tokio::time::sleep(POLL_INTERVAL) => {}
            }
            if !self.enabled.load(Ordering::Relaxed) {
                continue;
            }

            self.goroutine.sweep_finished().await;
            let snapshot = self.goroutine.snapshot().await;
            let _ = self.send_packet(PacketBody::Goroutine(snapshot)).await;

            for sample in self.watch.tick().await {
                let _ = self.send_packet(PacketBody::Watch(sample)).await;
            }

            let stats = self.runtimestats.sample();
            let _ = self.send_packet(PacketBody::Runtimestats(stats)).await;

            self.flush_logs().await;
        }
    }

    async fn flush_logs(&self) {
        let pending = self.log_accumulator.drain();
        if !pending.is_empty() {
            let _ = self.send_packet(PacketBody::Multilog(MultiLogBody { log_lines: pending })).await;
        }
    }

    fn app_info(&self) -> AppInfo {
        AppInfo {
            app_run_id: self.app_run_id.clone(),
            app_name: std::env::var("CARGO_PKG_NAME").unwrap_or_default(),
            module_name: String::new(),
            start_time: self.started_at,
            pid: std::process::id() as i32,
            hostname: hostname(),
            user: std::env::var("USER").unwrap_or_default(),
            args: std::env::args().collect(),
            env: std::collections::HashMap::new(),
            executable: std::env::current_exe().ok().and_then(|p| p.to_str().map(str::to_string)),
            sdk_version: env!("CARGO_PKG_VERSION").to_string(),
            build_info: None,
        }
    }

    /// Dispatch one packet to the live peer. Returns `Ok(accepted)`:
    /// `accepted` is `false` when the peer's send queue is full, mirroring
    /// [`PeerHandle::try_send`] rather than papering over a drop as success.
    async fn send_packet(&self, body: PacketBody) -> Result<bool, SdkError> {
        if self.force_disabled.load(Ordering::Relaxed) {
            return Err(SdkError::Disabled);
        }
        match self.transport.get(&self.config.domain_socket).await {
            Some(peer) if peer.is_alive() => Ok(peer.try_send(Packet(body))),
            _ => Err(SdkError::NotInitialized),
        }
    }

    /// Tear down the active connection, if any. `Disable(disconnect:
    /// false)` never reaches here: it only flips `force_disabled`, which
    /// already makes `send_packet` refuse to send without touching the
    /// socket.
    async fn disconnect(&self) {
        self.transport.remove(&self.config.domain_socket).await;
        self.enabled.store(false, Ordering::Relaxed);
    }
}

fn now_ms() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_millis() as i64).unwrap_or(0)
}

fn hostname() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "unknown".to_string())
}

/// Initialize the global controller from the process environment. Must be
/// called exactly once, as early as possible in the host program's startup.
pub fn init() -> Result<(), SdkError> {
    if CONTROLLER.set(Controller::new(SdkConfig::from_env())).is_err() {
        return Err(SdkError::AlreadyInitialized);
    }

    // `get()` cannot miss here: this call site is the only writer, and the
    // `set` above just succeeded, so a `None` would mean `set` lied.
    if let Some(controller) = CONTROLLER.get() {
        if !controller.force_disabled.load(Ordering::Relaxed) {
            tokio::spawn(controller.connect_loop());
            tokio::spawn(controller.tick_loop());
        }
    }
    Ok(())
}

/// Re-enable after a prior `disable()`. A no-op if never initialized or if
/// the SDK was disabled via `OUTRIG_DISABLED` at startup — that form of
/// disablement is permanent for the process.
pub fn enable() {
    if let Some(controller) = CONTROLLER.get() {
        if controller.config.disabled {
            warn!("ignoring enable(): OUTRIG_DISABLED set at startup");
            return;
        }
        controller.force_disabled.store(false, Ordering::Relaxed);
    }
}

/// Disable the SDK for the rest of the process. The background poller
/// keeps running but treats `force_disabled` as a gate, so no new
/// connection attempt is made. `disconnect=true` also tears down any live
/// connection immediately; `disconnect=false` only stops sending, leaving
/// the socket open so a later `enable()` can resume on it.
pub fn disable(disconnect: bool) {
    if let Some(controller) = CONTROLLER.get() {
        controller.force_disabled.store(true, Ordering::Relaxed);
        if disconnect {
            tokio::spawn(controller.disconnect());
        }
    }
}

/// One atomic load, no allocation: safe to call on every hot-path log/watch
/// call site.
pub fn is_enabled() -> bool {
    match CONTROLLER.get() {
        Some(controller) => {
            controller.enabled.load(Ordering::Relaxed)
                && !controller.force_disabled.load(Ordering::Relaxed)
        }
        None => false,
    }
}

pub fn state() -> Option<SdkState> {
    CONTROLLER.get().map(Controller::state)
}

pub fn get_app_run_id() -> Option<AppRunId> {
    CONTROLLER.get().map(|c| c.app_run_id.clone())
}

/// Send one packet immediately, bypassing the log accumulator (which is
/// instead drained on every tick via [`Controller::flush_logs`]).
///
/// Returns `Ok(accepted)`: `accepted=false` when the peer's send queue is
/// full. An `Err` means the packet was never attempted (disabled or not
/// initialized), not that it was dropped on the wire.
pub async fn send_packet(body: PacketBody) -> Result<bool, SdkError> {
    let controller = CONTROLLER.get().ok_or(SdkError::NotInitialized)?;
    controller.send_packet(body).await
}

/// Record application shutdown. Attempts a best-effort bounded drain of
/// the pending log accumulator rather than
/// awaiting a server acknowledgement, then sends `AppDone` and tears down
/// the connection.
pub async fn app_done() -> Result<(), SdkError> {
    let controller = CONTROLLER.get().ok_or(SdkError::NotInitialized)?;

    let deadline = tokio::time::Instant::now() + APP_DONE_DRAIN_BUDGET;
    while !controller.log_accumulator.is_empty() && tokio::time::Instant::now() < deadline {
        controller.flush_logs().await;
        tokio::time::sleep(Duration::from_millis(1)).await;
    }

    let _ = controller.send_packet(PacketBody::Appdone(AppDoneBody { ts: now_ms() })).await;
    controller.disconnect().await;
    Ok(())
}

/// Access to the log collector for host programs wiring up `io::Write` tees.
pub fn log_collector() -> Option<Arc<LogCollector>> {
    CONTROLLER.get().map(|c| c.log.clone())
}

/// Access to the goroutine collector for `spawn_named`/`set_goroutine_name`.
pub fn goroutine_collector() -> Option<Arc<GoroutineCollector>> {
    CONTROLLER.get().map(|c| c.goroutine.clone())
}

/// Access to the watch collector for `register_poll`/`register_static`/`push`.
pub fn watch_collector() -> Option<Arc<WatchCollector>> {
    CONTROLLER.get().map(|c| c.watch.clone())
}

/// Collector status for all four collectors, for diagnostics.
pub fn collector_statuses() -> Vec<CollectorStatusBody> {
    match CONTROLLER.get() {
        Some(c) => vec![
            c.log.get_status(),
            c.goroutine.get_status(),
            c.watch.get_status(),
            c.runtimestats.get_status(),
        ],
        None => Vec::new(),
    }
}

#[cfg(test)]
#[path = "controller_tests.rs"]
mod tests;
