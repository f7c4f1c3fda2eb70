// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::fmt;

/// Errors that can arise while encoding or decoding wire packets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// A `Packet`'s `type` field didn't match any known [`crate::PacketKind`].
    UnknownKind(String),
    /// A line couldn't be parsed as JSON, or its JSON didn't match the
    /// expected packet shape.
    Malformed(String),
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownKind(kind) => write!(f, "unknown packet kind: {kind}"),
            Self::Malformed(detail) => write!(f, "malformed packet: {detail}"),
        }
    }
}

impl std::error::Error for ProtocolError {}
