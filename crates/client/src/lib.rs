// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! tracelink - client-side telemetry agent.
//!
//! Streams identity records, stats entries and keep-alives to a collector
//! over a WebSocket. Events are sequence-numbered and kept in a bounded
//! buffer until the collector acknowledges them, so a dropped connection
//! loses nothing that still fits in the buffer.
//!
//! # Main Components
//!
//! - [`Trace`] - Clonable handle to a running trace
//! - [`TraceOptions`] - Endpoint, meeting and delivery tunables
//! - [`AgentConfig`] - TOML configuration for the `tracelink` binary
//! - [`Scrubber`] - Redaction applied to stats entries
//!
//! ```rust,ignore
//! use tracelink::{Trace, TraceOptions};
//!
//! let trace = Trace::start(TraceOptions::new("wss://collector.example", "standup"))?;
//! trace.identity(vec![json!("identity"), json!(null), json!({"user": "u1"})]);
//! trace.connect(false);
//! trace.stats_entry(&mut [json!("getstats"), stats]);
//! trace.shutdown(Duration::from_secs(2)).await;
//! ```

mod agent;
mod cli;
pub mod config;
pub mod error;
pub mod input;
pub mod logging;
pub mod scrub;
pub mod trace;

pub use agent::{forward_lines, run};
pub use cli::Cli;
pub use config::AgentConfig;
pub use error::{Error, Result};
pub use scrub::{IpScrubber, NoopScrubber, Scrubber};
pub use trace::{CloseCallback, Trace, TraceOptions};
pub use tl_core::{ChannelState, CloseInfo};
