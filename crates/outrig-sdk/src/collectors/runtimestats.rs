// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use outrig_protocol::{CollectorStatusBody, RuntimeStatsSample};
use sysinfo::{CpuRefreshKind, Pid, ProcessExt, RefreshKind, System, SystemExt};

use crate::collectors::Collector;

fn now_ms() -> i64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_millis() as i64).unwrap_or(0)
}

/// Process and scheduler introspection.
///
/// `gc_cycles` has no literal analogue in a non-GC'd process; it is a
/// process-wide epoch bumped whenever another collector trims one of its
/// rings, which is the closest thing this runtime has to a GC pass.
/// `goroutine_count` mirrors `GoroutineCollector`'s live-task count via a
/// shared counter rather than tokio's (still-unstable) runtime metrics API.
pub struct RuntimeStatsCollector {
    enabled: AtomicBool,
    sys: parking_lot::Mutex<System>,
    pid: Pid,
    started_at: Instant,
    gc_epoch: std::sync::Arc<AtomicU64>,
    active_tasks: std::sync::Arc<AtomicU64>,
}

impl RuntimeStatsCollector {
    pub fn new(gc_epoch: std::sync::Arc<AtomicU64>, active_tasks: std::sync::Arc<AtomicU64>) -> Self {
        let refresh = RefreshKind::new().with_cpu(CpuRefreshKind::everything()).with_memory();
        let mut sys = System::new_with_specifics(refresh);
        sys.refresh_all();
        let pid = Pid::from(std::process::id() as usize);

        Self {
            enabled: AtomicBool::new(true),
            sys: parking_lot::Mutex::new(sys),
            pid,
            started_at: Instant::now(),
            gc_epoch,
            active_tasks,
        }
    }

    /// Take one sample. Called once per tick from the collector's
    /// background task.
    pub fn sample(&self) -> RuntimeStatsSample {
        let mut sys = self.sys.lock();
        sys.refresh_process(self.pid);
        sys.refresh_cpu();

        let (alloc_bytes, cpu_percent) = match sys.process(self.pid) {
            Some(proc) => (proc.memory() * 1024, proc.cpu_usage()),
            None => (0, 0.0),
        };

        RuntimeStatsSample {
            ts: now_ms(),
            pid: self.pid.as_u32() as i32,
            uptime_secs: self.started_at.elapsed().as_secs(),
            alloc_bytes,
            sys_bytes: sys.total_memory() * 1024,
            gc_cycles: self.gc_epoch.load(Ordering::Relaxed),
            goroutine_count: self.active_tasks.load(Ordering::Relaxed),
            cpu_percent,
        }
    }
}

impl Collector for RuntimeStatsCollector {
    fn name(&self) -> &'static str {
        "runtimestats"
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
