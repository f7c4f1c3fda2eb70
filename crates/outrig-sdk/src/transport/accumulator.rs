// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use outrig_protocol::LogLine;
use parking_lot::Mutex;

/// Coalesces log lines produced between transport flush ticks into a
/// single `MultiLog` packet instead of sending one packet per line.
///
/// Guarded by a `parking_lot::Mutex` rather than a tokio one: every
/// critical section here is a `Vec::push` or a detach-and-swap, short
/// enough that blocking briefly is cheaper than the async machinery
/// (the same tradeoff the host program's own hot-path log calls make).
#[derive(Debug, Default)]
pub struct LogAccumulator {
    pending: Mutex<Vec<LogLine>>,
}

impl LogAccumulator {
    pub fn new() -> Self {
        Self { pending: Mutex::new(Vec::new()) }
    }

    /// Append one line to the pending batch.
    pub fn push(&self, line: LogLine) {
        self.pending.lock().push(line);
    }

    /// Detach and return everything accumulated so far, leaving the
    /// accumulator empty. Called by the writer task at each flush tick.
    pub fn drain(&self) -> Vec<LogLine> {
        std::mem::take(&mut *self.pending.lock())
    }

    /// Number of lines currently pending, for the `AppDone` bounded drain.
    pub fn len(&self) -> usize {
        self.pending.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use outrig_protocol::LogSource;

    fn line(n: i64, msg: &str) -> LogLine {
        LogLine { line_num: n, ts: n, source: LogSource::Stdout, msg: msg.into() }
    }

    #[test]
    fn drain_empties_and_returns_in_order() {
        let acc = LogAccumulator::new();
        acc.push(line(1, "a"));
        acc.push(line(2, "b"));
        assert_eq!(acc.len(), 2);

        let drained = acc.drain();
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].msg, "a");
        assert_eq!(drained[1].msg, "b");
        assert!(acc.is_empty());
    }

    #[test]
    fn second_drain_is_empty() {
        let acc = LogAccumulator::new();
        acc.push(line(1, "a"));
        acc.drain();
        assert!(acc.drain().is_empty());
    }
}
