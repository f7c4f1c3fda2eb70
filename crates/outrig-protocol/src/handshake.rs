// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use serde::{Deserialize, Serialize};

/// Server's JSON acknowledgement of the SDK's handshake line.
///
/// The SDK writes `PACKET <app-run-id>\n`, then reads one JSON line back.
/// A `protocol_version` mismatch is a permanent error: the SDK disables
/// itself for the rest of the process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandshakeAck {
    pub http_port: u16,
    pub protocol_version: u32,
}

/// Prefix of the handshake line the SDK writes on connect.
pub const HANDSHAKE_PREFIX: &str = "PACKET ";

/// Build the handshake line for the given app-run-id (without trailing `\n`).
pub fn handshake_line(app_run_id: &str) -> String {
    format!("{HANDSHAKE_PREFIX}{app_run_id}")
}

/// Parse an app-run-id out of a handshake line (without trailing `\n`).
pub fn parse_handshake_line(line: &str) -> Option<&str> {
    line.strip_prefix(HANDSHAKE_PREFIX).map(str::trim).filter(|s| !s.is_empty())
}
