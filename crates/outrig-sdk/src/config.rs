// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::env;

/// Environment-driven SDK configuration.
///
/// A host program never constructs this by hand in normal use: `init()`
/// reads it from the process environment once. The SDK has no command line
/// of its own, so the fields are populated with plain `env::var` lookups
/// rather than a `clap::Parser`, but the env var names and the "absent
/// means default" semantics match the rest of the workspace's config
/// structs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SdkConfig {
    /// `OUTRIG_DISABLED`: if set to a truthy value, `init()` goes straight
    /// to `Disabled` and never attempts to connect.
    pub disabled: bool,
    /// `OUTRIG_APPRUNID`: override the generated app-run-id, e.g. to keep
    /// the same identity across a supervised restart.
    pub app_run_id: Option<String>,
    /// `OUTRIG_DOMAIN_SOCKET`: path to the server's Unix domain socket.
    pub domain_socket: String,
    /// `OUTRIG_NOTELEMETRY`: opt out of anonymous usage telemetry to the
    /// server-side upload endpoint. That endpoint lives outside this SDK
    /// (CLI/packaging/telemetry-upload are handled elsewhere), so this
    /// flag has no effect on `AppInfo`, logs, or any other in-scope
    /// packet — it's parsed and carried here only so the rest of the
    /// external-interface surface stays complete.
    pub no_telemetry: bool,
}

/// Default Unix domain socket path the server listens on.
pub const DEFAULT_DOMAIN_SOCKET: &str = "/tmp/outrig.sock";

impl Default for SdkConfig {
    fn default() -> Self {
        Self {
            disabled: false,
            app_run_id: None,
            domain_socket: DEFAULT_DOMAIN_SOCKET.to_string(),
            no_telemetry: false,
        }
    }
}

impl SdkConfig {
    /// Build a config from the process environment, falling back to
    /// defaults for anything unset.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            disabled: env_bool("OUTRIG_DISABLED").unwrap_or(defaults.disabled),
            app_run_id: env::var("OUTRIG_APPRUNID").ok().filter(|s| !s.is_empty()),
            domain_socket: env::var("OUTRIG_DOMAIN_SOCKET").unwrap_or(defaults.domain_socket),
            no_telemetry: env_bool("OUTRIG_NOTELEMETRY").unwrap_or(defaults.no_telemetry),
        }
    }
}

fn env_bool(key: &str) -> Option<bool> {
    let raw = env::var(key).ok()?;
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
