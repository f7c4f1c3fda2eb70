// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use serde::{Deserialize, Serialize};

use crate::apprun::AppInfo;
use crate::goroutine::GoroutineSnapshot;
use crate::log::LogLine;
use crate::runtimestats::RuntimeStatsSample;
use crate::watch::WatchSample;

/// The `type` discriminant of a [`Packet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PacketKind {
    Appinfo,
    Log,
    Multilog,
    Goroutine,
    Watch,
    Runtimestats,
    Collectorstatus,
    Appdone,
}

/// A reported collector's enable/disable status, used by `CollectorStatus`
/// packets`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectorStatusBody {
    pub collector: String,
    pub enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// A batch of log lines, sent instead of N individual `Log` packets when
/// the transport's accumulator has coalesced more than one line (spec
/// §4.2: adaptive log batching).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MultiLogBody {
    pub log_lines: Vec<LogLine>,
}

/// Sent once, just before the connection closes cleanly, when the host
/// calls `Controller::app_done`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppDoneBody {
    /// Epoch milliseconds the host considered itself done.
    pub ts: i64,
}

/// The strongly-typed payload carried by a [`Packet`].
///
/// Tagged internally on `type`/`data` so the wire shape is exactly
/// `{ "type": "<kind>", "data": <kind-specific object> }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum PacketBody {
    Appinfo(AppInfo),
    Log(LogLine),
    Multilog(MultiLogBody),
    Goroutine(GoroutineSnapshot),
    Watch(WatchSample),
    Runtimestats(RuntimeStatsSample),
    Collectorstatus(CollectorStatusBody),
    Appdone(AppDoneBody),
}

impl PacketBody {
    pub fn kind(&self) -> PacketKind {
        match self {
            Self::Appinfo(_) => PacketKind::Appinfo,
            Self::Log(_) => PacketKind::Log,
            Self::Multilog(_) => PacketKind::Multilog,
            Self::Goroutine(_) => PacketKind::Goroutine,
            Self::Watch(_) => PacketKind::Watch,
            Self::Runtimestats(_) => PacketKind::Runtimestats,
            Self::Collectorstatus(_) => PacketKind::Collectorstatus,
            Self::Appdone(_) => PacketKind::Appdone,
        }
    }
}

/// The wire unit exchanged over the SDK ↔ server Unix domain socket, one
/// per newline-delimited JSON line.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Packet(pub PacketBody);

impl Packet {
    pub fn kind(&self) -> PacketKind {
        self.0.kind()
    }

    /// Serialize as a single JSON line, without the trailing `\n`.
    pub fn to_line(&self) -> Result<String, crate::ProtocolError> {
        serde_json::to_string(self).map_err(|e| crate::ProtocolError::Malformed(e.to_string()))
    }

    /// Parse a single JSON line (without the trailing `\n`).
    ///
    /// Checks `type` against the known [`PacketKind`] set before the full
    /// decode, so a packet from a newer/older SDK build surfaces as
    /// [`crate::ProtocolError::UnknownKind`] rather than the generic
    /// [`crate::ProtocolError::Malformed`] serde would otherwise report
    /// for an internally-tagged enum with no matching variant.
    pub fn from_line(line: &str) -> Result<Self, crate::ProtocolError> {
        let value: serde_json::Value =
            serde_json::from_str(line).map_err(|e| crate::ProtocolError::Malformed(e.to_string()))?;

        if let Some(kind) = value.get("type").and_then(|t| t.as_str()) {
            let known = serde_json::from_value::<PacketKind>(serde_json::Value::String(kind.to_string()));
            if known.is_err() {
                return Err(crate::ProtocolError::UnknownKind(kind.to_string()));
            }
        }

        serde_json::from_value(value).map_err(|e| crate::ProtocolError::Malformed(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::LogSource;

    #[test]
    fn log_packet_roundtrips_through_json() {
        let pk = Packet(PacketBody::Log(LogLine {
            line_num: 1,
            ts: 42,
            source: LogSource::Stdout,
            msg: "hello".into(),
        }));
        let line = pk.to_line().expect("packet should encode");
        assert!(line.contains("\"type\":\"log\""));
        assert!(line.contains("\"data\":"));

        let parsed = Packet::from_line(&line).expect("line should decode");
        assert_eq!(parsed.kind(), PacketKind::Log);
        match parsed.0 {
            PacketBody::Log(line) => assert_eq!(line.msg, "hello"),
            other => panic!("expected Log, got {other:?}"),
        }
    }

    #[test]
    fn multilog_packet_carries_logs_array() {
        let pk = Packet(PacketBody::Multilog(MultiLogBody {
            log_lines: vec![LogLine {
                line_num: 1,
                ts: 1,
                source: LogSource::Stderr,
                msg: "a".into(),
            }],
        }));
        let v = serde_json::to_value(&pk).expect("packet should serialize");
        assert_eq!(v["type"], "multilog");
        assert_eq!(v["data"]["log_lines"].as_array().expect("log_lines is an array").len(), 1);
    }

    #[test]
    fn unknown_kind_is_distinguished_from_malformed() {
        let err = Packet::from_line(r#"{"type":"bogus","data":{}}"#).unwrap_err();
        assert_eq!(err, crate::ProtocolError::UnknownKind("bogus".to_string()));
    }

    #[test]
    fn invalid_json_is_malformed() {
        let err = Packet::from_line("not json").unwrap_err();
        assert!(matches!(err, crate::ProtocolError::Malformed(_)));
    }

    #[test]
    fn known_kind_with_bad_data_shape_is_malformed() {
        let err = Packet::from_line(r#"{"type":"log","data":{}}"#).unwrap_err();
        assert!(matches!(err, crate::ProtocolError::Malformed(_)));
    }
}
