// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::io;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use outrig_protocol::{CollectorStatusBody, LogLine, LogSource};

use crate::collectors::Collector;
use crate::transport::LogAccumulator;

fn now_ms() -> i64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_millis() as i64).unwrap_or(0)
}

/// Tees stdout/stderr (and any named custom stream) into the log
/// accumulator, stamping each line with a monotonically increasing
/// `line_num` scoped to the app run.
pub struct LogCollector {
    enabled: AtomicBool,
    accumulator: Arc<LogAccumulator>,
    next_line_num: AtomicI64,
}

impl LogCollector {
    pub fn new(accumulator: Arc<LogAccumulator>) -> Self {
        Self { enabled: AtomicBool::new(true), accumulator, next_line_num: AtomicI64::new(1) }
    }

    /// Record one line from the given source. A no-op while disabled.
    pub fn record(&self, source: LogSource, msg: impl Into<String>) {
        if !self.is_enabled() {
            return;
        }
        let line_num = self.next_line_num.fetch_add(1, Ordering::Relaxed);
        self.accumulator.push(LogLine { line_num, ts: now_ms(), source, msg: msg.into() });
    }

    /// A writer that tees everything written through it to both the real
    /// underlying stream and this collector, tagged with `source`.
    pub fn make_log_stream(self: &Arc<Self>, source: LogSource) -> TeeWriter {
        TeeWriter { collector: self.clone(), source, underlying: UnderlyingStream::from(&source) }
    }
}

impl Collector for LogCollector {
    fn name(&self) -> &'static str {
        "log"
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
            detail: Some(format!("next_line_num={}", self.next_line_num.load(Ordering::Relaxed))),
        }
    }
}

enum UnderlyingStream {
    Stdout,
    Stderr,
    /// Custom named streams have no real OS handle to tee to; they exist
    /// purely so host code can route application-level event logs through
    /// the collector without touching process stdio.
    None,
}

impl From<&LogSource> for UnderlyingStream {
    fn from(source: &LogSource) -> Self {
        match source {
            LogSource::Stdout => Self::Stdout,
            LogSource::Stderr => Self::Stderr,
            LogSource::Custom(_) => Self::None,
        }
    }
}

/// `io::Write` adapter returned by [`LogCollector::make_log_stream`].
pub struct TeeWriter {
    collector: Arc<LogCollector>,
    source: LogSource,
    underlying: UnderlyingStream,
}

impl io::Write for TeeWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self.underlying {
            UnderlyingStream::Stdout => io::stdout().write_all(buf)?,
            UnderlyingStream::Stderr => io::stderr().write_all(buf)?,
            UnderlyingStream::None => {}
        }
        for line in String::from_utf8_lossy(buf).lines() {
            if !line.is_empty() {
                self.collector.record(self.source.clone(), line.to_string());
            }
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.underlying {
            UnderlyingStream::Stdout => io::stdout().flush(),
            UnderlyingStream::Stderr => io::stderr().flush(),
            UnderlyingStream::None => Ok(()),
        }
    }
}
