// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::fmt;

/// Errors the SDK's public API can return.
///
/// These are deliberately few: most failure modes (connect refused,
/// handshake rejected, queue full) are swallowed internally and turned
/// into a disabled/standby state rather than propagated, since a host
/// program must never be able to fail because its observability SDK did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SdkError {
    /// `init()` was called a second time.
    AlreadyInitialized,
    /// A call was made before `init()`.
    NotInitialized,
    /// The server rejected the handshake (protocol version mismatch).
    /// Permanent: the controller moves to `Disabled` and stays there.
    HandshakeRejected,
    /// The SDK is disabled, either by `OUTRIG_DISABLED` or by `disable()`.
    Disabled,
}

impl SdkError {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AlreadyInitialized => "ALREADY_INITIALIZED",
            Self::NotInitialized => "NOT_INITIALIZED",
            Self::HandshakeRejected => "HANDSHAKE_REJECTED",
            Self::Disabled => "DISABLED",
        }
    }
}

impl fmt::Display for SdkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::error::Error for SdkError {}
