// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![deny(unsafe_code)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

use clap::Parser;
use tracelink::logging::setup_logging;
use tracelink::Cli;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    setup_logging(cli.verbose, cli.log_file.as_deref());

    if let Err(e) = tracelink::run(cli).await {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
