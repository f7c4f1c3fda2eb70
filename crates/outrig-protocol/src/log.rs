// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Where a log line originated.
///
/// Serializes as a bare string on the wire (`"stdout"`, `"stderr"`, or the
/// user-chosen stream name) rather than as a tagged enum, matching spec
/// §3's `source: "stdout"|"stderr"|<user-stream>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogSource {
    Stdout,
    Stderr,
    /// A user-named stream created via `MakeLogStream`.
    Custom(String),
}

impl LogSource {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Stdout => "stdout",
            Self::Stderr => "stderr",
            Self::Custom(name) => name,
        }
    }
}

impl From<&str> for LogSource {
    fn from(s: &str) -> Self {
        match s {
            "stdout" => Self::Stdout,
            "stderr" => Self::Stderr,
            other => Self::Custom(other.to_owned()),
        }
    }
}

impl Serialize for LogSource {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for LogSource {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(LogSource::from(s.as_str()))
    }
}

/// One line of captured output.
///
/// `line_num` is strictly increasing within an app-run — the single writer
/// in `outrig-server`'s ingest path is responsible for assigning it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogLine {
    pub line_num: i64,
    /// Epoch milliseconds.
    pub ts: i64,
    pub source: LogSource,
    pub msg: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_as_str_roundtrips_builtin_variants() {
        assert_eq!(LogSource::Stdout.as_str(), "stdout");
        assert_eq!(LogSource::Stderr.as_str(), "stderr");
    }

    #[test]
    fn custom_source_keeps_its_name() {
        let s = LogSource::Custom("audit".to_owned());
        assert_eq!(s.as_str(), "audit");
    }

    #[test]
    fn log_line_serializes_as_bare_string_source() {
        let line = LogLine { line_num: 1, ts: 1000, source: LogSource::Stdout, msg: "hi".into() };
        let v = serde_json::to_value(&line).expect("log line should serialize");
        assert_eq!(v["line_num"], 1);
        assert_eq!(v["source"], "stdout");
    }

    #[test]
    fn log_source_deserializes_custom_stream() {
        let s: LogSource = serde_json::from_str("\"audit\"").expect("source should decode");
        assert_eq!(s, LogSource::Custom("audit".to_owned()));
    }
}
