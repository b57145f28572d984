// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Agent configuration file.
//!
//! A TOML file with the collector endpoint, the meeting and the delivery
//! tunables. Every field is optional; command-line flags override the file.
//!
//! ```toml
//! endpoint = "wss://collector.example/stats"
//! meeting_id = "standup"
//! keep_alive_interval_ms = 30000
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use tl_core::backoff::{DEFAULT_BASE_MS, DEFAULT_JITTER_CEILING_MS};
use tl_core::buffer::DEFAULT_CAPACITY;
use tl_core::delivery::MAX_RECONNECT_ATTEMPTS;

use crate::error::{Error, Result};
use crate::trace::TraceOptions;

/// Settings read by the `tracelink` agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    /// Collector base URL (`ws://` or `wss://`).
    pub endpoint: Option<String>,
    pub meeting_id: Option<String>,
    #[serde(default)]
    pub use_legacy_protocol: bool,
    /// Mask IP addresses in stats entries (default: true).
    #[serde(default = "default_obfuscate")]
    pub obfuscate: bool,
    /// Keep-alive period in milliseconds (default: 30000). 0 = disabled.
    #[serde(default = "default_keep_alive_interval_ms")]
    pub keep_alive_interval_ms: u64,
    /// Events kept until acknowledged (default: 1000).
    #[serde(default = "default_buffer_capacity")]
    pub buffer_capacity: usize,
    /// Reconnect timer expiries before giving up (default: 8).
    #[serde(default = "default_max_reconnect_attempts")]
    pub max_reconnect_attempts: u32,
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    #[serde(default = "default_jitter_ceiling_ms")]
    pub jitter_ceiling_ms: u64,
}

fn default_obfuscate() -> bool {
    true
}

fn default_keep_alive_interval_ms() -> u64 {
    30_000
}

fn default_buffer_capacity() -> usize {
    DEFAULT_CAPACITY
}

fn default_max_reconnect_attempts() -> u32 {
    MAX_RECONNECT_ATTEMPTS
}

fn default_base_delay_ms() -> u64 {
    DEFAULT_BASE_MS
}

fn default_jitter_ceiling_ms() -> u64 {
    DEFAULT_JITTER_CEILING_MS
}

impl Default for AgentConfig {
    fn default() -> Self {
        AgentConfig {
            endpoint: None,
            meeting_id: None,
            use_legacy_protocol: false,
            obfuscate: default_obfuscate(),
            keep_alive_interval_ms: default_keep_alive_interval_ms(),
            buffer_capacity: default_buffer_capacity(),
            max_reconnect_attempts: default_max_reconnect_attempts(),
            base_delay_ms: default_base_delay_ms(),
            jitter_ceiling_ms: default_jitter_ceiling_ms(),
        }
    }
}

impl AgentConfig {
    /// Loads configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("failed to read config {}: {}", path.display(), e))
        })?;
        let config: AgentConfig = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;
        Ok(config)
    }

    /// Converts into trace options. Endpoint and meeting id are required.
    pub fn into_options(self) -> Result<TraceOptions> {
        let endpoint = self.endpoint.ok_or(Error::MissingSetting("endpoint"))?;
        let meeting_id = self.meeting_id.ok_or(Error::MissingSetting("meeting"))?;

        let mut options = TraceOptions::new(endpoint, meeting_id);
        options.use_legacy_protocol = self.use_legacy_protocol;
        options.obfuscate = self.obfuscate;
        options.keep_alive_interval = Duration::from_millis(self.keep_alive_interval_ms);
        options.buffer_capacity = self.buffer_capacity;
        options.max_reconnect_attempts = self.max_reconnect_attempts;
        options.base_delay_ms = self.base_delay_ms;
        options.jitter_ceiling_ms = self.jitter_ceiling_ms;
        Ok(options)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
