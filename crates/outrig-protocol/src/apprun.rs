// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::fmt;

use serde::{Deserialize, Serialize};

/// Unique identifier for a single execution of the host program.
///
/// Stable across reconnects by the same process: either taken from
/// `OUTRIG_APPRUNID` or minted once at first init and held for the rest of
/// the process's lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AppRunId(pub String);

impl AppRunId {
    /// Mint a fresh random app-run-id.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AppRunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for AppRunId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Metadata about a host process, sent once as the first packet on a new
/// connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppInfo {
    pub app_run_id: AppRunId,
    pub app_name: String,
    pub module_name: String,
    /// Epoch milliseconds the host process started.
    pub start_time: i64,
    pub pid: i32,
    pub hostname: String,
    pub user: String,
    pub args: Vec<String>,
    pub env: std::collections::HashMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub executable: Option<String>,
    pub sdk_version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build_info: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_ids_are_unique() {
        let a = AppRunId::generate();
        let b = AppRunId::generate();
        assert_ne!(a, b);
    }

    #[test]
    fn display_matches_inner_string() {
        let id = AppRunId::from("abc-123".to_owned());
        assert_eq!(id.to_string(), "abc-123");
        assert_eq!(id.as_str(), "abc-123");
    }
}
