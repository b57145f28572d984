// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use tl_core::{EventKind, SystemClock};

use super::*;
use crate::trace::test_helpers::{CountingIds, MockTransport};
use crate::trace::TraceOptions;

#[tokio::test(start_paused = true)]
async fn forwards_valid_lines_and_skips_the_rest() {
    let (transport, mock) = MockTransport::new();
    let trace = Trace::with_parts(
        TraceOptions::new("ws://collector.test", "room"),
        transport,
        Arc::new(SystemClock),
        Arc::new(CountingIds::new()),
    )
    .unwrap();
    trace.connect(false);
    tokio::time::sleep(Duration::from_millis(1)).await;
    mock.open();
    tokio::time::sleep(Duration::from_millis(1)).await;

    let input = concat!(
        "{\"type\": \"identity\", \"data\": [\"identity\", null, {\"user\": \"u1\"}]}\n",
        "\n",
        "not json\n",
        "[\"getstats\", \"pc0\", {\"ip\": \"10.0.0.9\"}]\n",
        "{\"type\": \"stats-entry\", \"data\": [\"getstats\"]}\n",
    );
    let forwarded = forward_lines(&trace, input.as_bytes()).await.unwrap();
    tokio::time::sleep(Duration::from_millis(1)).await;

    assert_eq!(forwarded, 3);
    let sent = mock.sent();
    let kinds: Vec<_> = sent.iter().map(|m| m.kind).collect();
    assert_eq!(kinds, vec![EventKind::Identity, EventKind::StatsEntry, EventKind::StatsEntry]);
    assert_eq!(sent[1].data.as_ref().unwrap()[2]["ip"], "10.0.0.x");
}

#[tokio::test]
async fn run_requires_endpoint() {
    let cli = <Cli as clap::Parser>::try_parse_from(["tracelink", "--meeting", "room"]).unwrap();
    let err = run(cli).await.unwrap_err();
    assert!(err.to_string().contains("--endpoint"));
}
