// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! tl-collector: reference collector for tracelink agents.
//!
//! Receives telemetry events over WebSocket, tracks per-session watermarks and
//! acknowledges delivery so agents can trim their buffers. Optionally appends
//! every received event to a JSON lines file.

mod server;
mod state;

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// tl-collector: telemetry collector
#[derive(Parser, Debug)]
#[command(name = "tl-collector")]
#[command(about = "WebSocket collector that acknowledges tracelink telemetry")]
struct Args {
    /// Address to bind the server to
    #[arg(short, long, default_value = "127.0.0.1:7890")]
    bind: SocketAddr,

    /// Acknowledge after this many events per session (0 = only on connect)
    #[arg(long, default_value = "10")]
    ack_every: u64,

    /// Append received events to this file as JSON lines
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    info!("Starting tl-collector");
    info!("  Bind address: {}", args.bind);
    info!("  Ack every: {}", args.ack_every);
    if let Some(out) = &args.out {
        info!("  Output: {}", out.display());
    }

    let state = state::CollectorState::new(args.ack_every, args.out.as_deref()).await?;
    server::run(args.bind, state).await
}
