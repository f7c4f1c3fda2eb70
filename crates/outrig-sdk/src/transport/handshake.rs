// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use outrig_protocol::{handshake_line, HandshakeAck, PROTOCOL_VERSION};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;

use crate::error::SdkError;

/// Write the handshake line and read back the server's [`HandshakeAck`].
///
/// A protocol version mismatch is surfaced as [`SdkError::HandshakeRejected`]
/// and is permanent for the caller's retry loop to act on: the controller
/// moves to `Disabled` rather than retrying.
pub async fn perform_handshake(
    stream: &mut UnixStream,
    app_run_id: &str,
) -> Result<HandshakeAck, SdkError> {
    let line = handshake_line(app_run_id);
    stream
        .write_all(format!("{line}\n").as_bytes())
        .await
        .map_err(|_| SdkError::HandshakeRejected)?;

    let mut reader = BufReader::new(&mut *stream);
    let mut ack_line = String::new();
    reader.read_line(&mut ack_line).await.map_err(|_| SdkError::HandshakeRejected)?;

    let ack: HandshakeAck =
        serde_json::from_str(ack_line.trim_end()).map_err(|_| SdkError::HandshakeRejected)?;

    if ack.protocol_version != PROTOCOL_VERSION {
        return Err(SdkError::HandshakeRejected);
    }

    Ok(ack)
}
