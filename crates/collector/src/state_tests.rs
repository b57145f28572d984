// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use serde_json::json;

fn stats(session: &str, sequence: u64) -> ClientMessage {
    ClientMessage {
        stats_session_id: session.to_string(),
        kind: EventKind::StatsEntry,
        data: Some(vec![json!("getstats"), json!(1_700_000_000_000u64), json!(sequence)]),
    }
}

fn keepalive(session: &str) -> ClientMessage {
    ClientMessage { stats_session_id: session.to_string(), kind: EventKind::Keepalive, data: None }
}

#[tokio::test]
async fn unknown_session_has_zero_watermark() {
    let state = CollectorState::new(10, None).await.unwrap();
    assert_eq!(state.watermark("s1").await, 0);
}

#[tokio::test]
async fn watermark_tracks_highest_sequence() {
    let state = CollectorState::new(10, None).await.unwrap();

    state.record("room", "s1", &stats("s1", 1)).await.unwrap();
    state.record("room", "s1", &stats("s1", 3)).await.unwrap();
    state.record("room", "s2", &stats("s2", 7)).await.unwrap();

    assert_eq!(state.session("s1").await, SessionRecord { watermark: 3, received: 2 });
    assert_eq!(state.watermark("s2").await, 7);
}

#[tokio::test]
async fn late_replay_does_not_lower_watermark() {
    let state = CollectorState::new(10, None).await.unwrap();

    state.record("room", "s1", &stats("s1", 4)).await.unwrap();
    state.record("room", "s1", &stats("s1", 2)).await.unwrap();
    state.record("room", "s1", &stats("s1", 3)).await.unwrap();

    assert_eq!(state.session("s1").await, SessionRecord { watermark: 4, received: 3 });
}

#[tokio::test]
async fn ack_due_every_n_events() {
    let state = CollectorState::new(2, None).await.unwrap();

    assert_eq!(state.record("room", "s1", &stats("s1", 1)).await.unwrap(), None);
    assert_eq!(state.record("room", "s1", &stats("s1", 2)).await.unwrap(), Some(2));
    assert_eq!(state.record("room", "s1", &keepalive("s1")).await.unwrap(), None);
    assert_eq!(state.record("room", "s1", &stats("s1", 4)).await.unwrap(), None);
    assert_eq!(state.record("room", "s1", &stats("s1", 5)).await.unwrap(), Some(5));
}

#[tokio::test]
async fn zero_disables_periodic_acks() {
    let state = CollectorState::new(0, None).await.unwrap();
    for sequence in 1..=20 {
        assert_eq!(state.record("room", "s1", &stats("s1", sequence)).await.unwrap(), None);
    }
    assert_eq!(state.watermark("s1").await, 20);
}

#[tokio::test]
async fn appends_json_lines_to_output() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("events.jsonl");
    let state = CollectorState::new(10, Some(&path)).await.unwrap();

    state.record("room", "s1", &stats("s1", 1)).await.unwrap();
    state.record("room", "s1", &keepalive("s1")).await.unwrap();

    let content = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<StoredEvent> =
        content.lines().map(|line| serde_json::from_str(line).unwrap()).collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0].meeting_id, "room");
    assert_eq!(lines[0].kind, EventKind::StatsEntry);
    assert_eq!(lines[0].data.as_ref().unwrap()[2], json!(1));
    assert_eq!(lines[1].kind, EventKind::Keepalive);
    assert!(lines[1].data.is_none());
    assert!(content.lines().nth(1).unwrap().contains(r#""meetingId":"room""#));
}
