// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire types shared by the Outrig SDK and the Outrig server.
//!
//! Both sides of the Unix domain socket speak newline-delimited JSON
//! [`Packet`] frames. Keeping the types in one crate means the SDK and the
//! server cannot drift on field names or tagging.

pub mod apprun;
pub mod error;
pub mod goroutine;
pub mod handshake;
pub mod log;
pub mod packet;
pub mod runtimestats;
pub mod watch;

pub use apprun::{AppInfo, AppRunId};
pub use error::ProtocolError;
pub use goroutine::{GoroutineSnapshot, GoroutineStack};
pub use handshake::HandshakeAck;
pub use log::{LogLine, LogSource};
pub use packet::{Packet, PacketBody, PacketKind};
pub use runtimestats::RuntimeStatsSample;
pub use watch::{DeliveryMode, WatchKind, WatchSample};

/// Current wire protocol version. Bumped on any incompatible change to
/// [`Packet`] framing or the handshake. The SDK self-disables for the rest
/// of the process if the server reports a different version.
pub const PROTOCOL_VERSION: u32 = 1;
