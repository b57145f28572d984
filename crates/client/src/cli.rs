// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;

use clap::Parser;

use crate::config::AgentConfig;
use crate::error::Result;

/// tracelink: stream telemetry events from stdin to a collector
#[derive(Parser, Debug)]
#[command(name = "tracelink", version)]
#[command(about = "Streams identity and stats entries read from stdin to a telemetry collector")]
pub struct Cli {
    /// TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Collector URL (ws:// or wss://)
    #[arg(long)]
    pub endpoint: Option<String>,

    /// Meeting identifier
    #[arg(long)]
    pub meeting: Option<String>,

    /// Negotiate the legacy protocol variant
    #[arg(long)]
    pub legacy: bool,

    /// Send stats entries without masking IP addresses
    #[arg(long)]
    pub no_obfuscate: bool,

    /// Continue a previous session as its child
    #[arg(long)]
    pub continuation: bool,

    /// Seconds to wait for the close handshake on exit
    #[arg(long, default_value = "5")]
    pub grace: u64,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Write logs to this file instead of stderr
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

impl Cli {
    /// Loads the config file, if any, and applies command-line overrides.
    pub fn agent_config(&self) -> Result<AgentConfig> {
        let mut config = match &self.config {
            Some(path) => AgentConfig::load(path)?,
            None => AgentConfig::default(),
        };

        if let Some(endpoint) = &self.endpoint {
            config.endpoint = Some(endpoint.clone());
        }
        if let Some(meeting) = &self.meeting {
            config.meeting_id = Some(meeting.clone());
        }
        if self.legacy {
            config.use_legacy_protocol = true;
        }
        if self.no_obfuscate {
            config.obfuscate = false;
        }
        Ok(config)
    }
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
