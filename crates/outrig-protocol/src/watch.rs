// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use serde::{Deserialize, Serialize};

/// How a watch's value is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WatchKind {
    Counter,
    Value,
}

/// How a watch's value is produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeliveryMode {
    PollFn,
    PollAtomic,
    PollSync,
    Push,
    Static,
}

/// One sampled or pushed watch value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchSample {
    pub name: String,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Free-form rendering hint (e.g. `"json"`, `"gostring"`, `"string"`).
    pub watch_type: String,
    pub kind: WatchKind,
    pub delivery: DeliveryMode,
    pub last_value: serde_json::Value,
    /// Epoch milliseconds.
    pub last_ts: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delivery_mode_renders_kebab_case() {
        assert_eq!(serde_json::to_value(DeliveryMode::PollAtomic).expect("mode should serialize"), "poll-atomic");
        assert_eq!(serde_json::to_value(DeliveryMode::Push).expect("mode should serialize"), "push");
        assert_eq!(serde_json::to_value(DeliveryMode::Static).expect("mode should serialize"), "static");
    }
}
