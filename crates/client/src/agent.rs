// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! The `tracelink` agent: forwards stdin lines to a trace.

use std::time::Duration;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use crate::cli::Cli;
use crate::error::Result;
use crate::input::InputLine;
use crate::trace::Trace;

/// Runs the agent until stdin is exhausted, then closes intentionally.
pub async fn run(cli: Cli) -> Result<()> {
    let options = cli.agent_config()?.into_options()?.on_close(|close| {
        info!(code = close.code, reason = %close.reason, "collector connection closed");
    });
    info!(endpoint = %options.endpoint, meeting = %options.meeting_id, "starting trace");

    let trace = Trace::start(options)?;
    trace.connect(cli.continuation);

    let forwarded = forward_lines(&trace, BufReader::new(tokio::io::stdin())).await?;
    info!(forwarded, buffered = trace.buffered(), "input exhausted, closing");

    if !trace.shutdown(Duration::from_secs(cli.grace)).await {
        warn!(grace_secs = cli.grace, "close did not complete within the grace period");
    }
    Ok(())
}

/// Records every well-formed line on `trace`; malformed lines are skipped.
///
/// Returns the number of events recorded.
pub async fn forward_lines<R>(trace: &Trace, reader: R) -> Result<usize>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut forwarded = 0;
    let mut line_no = 0usize;

    while let Some(line) = lines.next_line().await? {
        line_no += 1;
        if line.trim().is_empty() {
            continue;
        }

        match InputLine::parse(&line) {
            Ok(InputLine::Identity(values)) => trace.identity(values),
            Ok(InputLine::StatsEntry(mut values)) => trace.stats_entry(&mut values),
            Err(e) => {
                warn!(line = line_no, error = %e, "skipping input line");
                continue;
            }
        }
        forwarded += 1;
    }
    Ok(forwarded)
}

#[cfg(test)]
#[path = "agent_tests.rs"]
mod tests;
