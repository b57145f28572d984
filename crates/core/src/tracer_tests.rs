// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]
#![allow(clippy::panic)]

use super::*;
use crate::delivery::CloseInfo;
use crate::protocol::{ClientMessage, ServerMessage, ABNORMAL_CLOSURE_CODE, CONFERENCE_LEAVE_CODE};
use crate::session::PARENT_SESSION_FIELD;
use crate::test_helpers::{CountingIds, ManualClock};
use serde_json::json;
use yare::parameterized;

fn config() -> TracerConfig {
    TracerConfig::new("ws://collector.test/", "room")
}

fn tracer_with(config: TracerConfig) -> (Tracer, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(1_000));
    let tracer = Tracer::new(config, clock.clone(), Arc::new(CountingIds::new())).unwrap();
    (tracer, clock)
}

fn tracer() -> Tracer {
    tracer_with(config()).0
}

/// Connects and confirms the open, returning the connection generation.
fn connect_open(tracer: &mut Tracer, is_continuation: bool) -> u64 {
    tracer.connect(is_continuation);
    let generation = tracer.generation();
    tracer.on_open(generation);
    generation
}

fn sent(effects: &[Effect]) -> Vec<&ClientMessage> {
    effects
        .iter()
        .filter_map(|effect| match effect {
            Effect::Send(msg) => Some(msg),
            _ => None,
        })
        .collect()
}

fn opened(effects: &[Effect]) -> Option<&ConnectRequest> {
    effects.iter().find_map(|effect| match effect {
        Effect::Open { request, .. } => Some(request),
        _ => None,
    })
}

#[parameterized(
    empty_endpoint = { "", "room" },
    http_endpoint = { "http://collector", "room" },
    empty_meeting = { "ws://collector", "" },
)]
fn invalid_config_is_rejected(endpoint: &str, meeting: &str) {
    let result = Tracer::new(
        TracerConfig::new(endpoint, meeting),
        Arc::new(ManualClock::new(0)),
        Arc::new(CountingIds::new()),
    );
    assert!(matches!(result, Err(Error::InvalidConfig(_))));
}

#[test]
fn new_tracer_is_disconnected_with_fresh_session() {
    let tracer = tracer();
    assert_eq!(tracer.session_id(), "id-1");
    assert_eq!(tracer.parent_session_id(), None);
    assert_eq!(tracer.channel_state(), ChannelState::Disconnected);
    assert!(!tracer.is_connected());
    assert!(!tracer.is_closed());
    assert_eq!(tracer.next_sequence(), 1);
}

#[parameterized(
    standard = { false, "3.1_STANDARD" },
    legacy = { true, "3.1_LEGACY" },
)]
fn connect_opens_session_url(use_legacy: bool, protocol: &str) {
    let (mut tracer, _) = tracer_with(TracerConfig { use_legacy_protocol: use_legacy, ..config() });

    let effects = tracer.connect(false);

    let request = opened(&effects).unwrap();
    assert_eq!(request.url, "ws://collector.test/room?statsSessionId=id-1");
    assert_eq!(request.protocol, protocol);
    assert_eq!(tracer.channel_state(), ChannelState::Connecting);
}

#[test]
fn events_before_open_are_buffered_only() {
    let mut tracer = tracer();
    tracer.connect(false);

    let effects = tracer.stats_entry(vec![json!("getstats"), json!({"a": 1})]);

    assert!(sent(&effects).is_empty());
    assert_eq!(tracer.buffer().sequences(), vec![1]);
}

#[test]
fn events_while_open_are_sent_and_buffered() {
    let (mut tracer, clock) = tracer_with(config());
    connect_open(&mut tracer, false);
    clock.advance(500);

    let effects = tracer.stats_entry(vec![json!("getstats"), json!({"a": 1})]);

    let msgs = sent(&effects);
    assert_eq!(msgs.len(), 1);
    assert_eq!(msgs[0].stats_session_id, "id-1");
    assert_eq!(msgs[0].kind, EventKind::StatsEntry);
    assert_eq!(
        msgs[0].data.as_deref().unwrap(),
        &[json!("getstats"), json!({"a": 1}), json!(1_500), json!(1)]
    );
    assert_eq!(tracer.buffer().sequences(), vec![1]);
}

#[test]
fn keep_alive_is_sequenced_without_data() {
    let mut tracer = tracer();
    connect_open(&mut tracer, false);
    tracer.identity(vec![json!("identity")]);

    let effects = tracer.keep_alive();

    let msgs = sent(&effects);
    assert_eq!(msgs[0].kind, EventKind::Keepalive);
    assert_eq!(msgs[0].data, None);
    assert_eq!(tracer.buffer().sequences(), vec![1, 2]);
}

#[test]
fn full_buffer_drops_new_events_but_still_sends_them() {
    let (mut tracer, _) = tracer_with(TracerConfig { buffer_capacity: 2, ..config() });
    connect_open(&mut tracer, false);

    tracer.stats_entry(vec![json!(1)]);
    tracer.stats_entry(vec![json!(2)]);
    let effects = tracer.stats_entry(vec![json!(3)]);

    assert_eq!(sent(&effects)[0].sequence(), Some(3));
    assert_eq!(tracer.buffer().sequences(), vec![1, 2]);
}

#[test]
fn initial_ack_trims_and_replays() {
    let mut tracer = tracer();
    tracer.connect(false);
    for n in 0..3 {
        tracer.stats_entry(vec![json!(n)]);
    }
    let generation = tracer.generation();
    tracer.on_open(generation);

    let ack = ServerMessage::resumption(2, "initial").to_json().unwrap();
    let effects = tracer.on_message(generation, &ack);

    assert_eq!(tracer.buffer().sequences(), vec![3]);
    let replayed: Vec<_> = sent(&effects).iter().map(|m| m.sequence()).collect();
    assert_eq!(replayed, vec![Some(3)]);
    assert_eq!(tracer.attempts(), 0);
}

#[test]
fn bare_ack_only_trims() {
    let mut tracer = tracer();
    let generation = connect_open(&mut tracer, false);
    tracer.stats_entry(vec![json!(1)]);
    tracer.stats_entry(vec![json!(2)]);

    let effects = tracer.on_message(generation, &ServerMessage::watermark(1).to_json().unwrap());

    assert!(effects.is_empty());
    assert_eq!(tracer.buffer().sequences(), vec![2]);
}

#[parameterized(
    not_json = { "garbage" },
    other_type = { r#"{"type":"hello","body":1}"# },
    bad_body = { r#"{"type":"sn","body":"two"}"# },
    negative = { r#"{"type":"sn","body":-1}"# },
)]
fn unusable_messages_are_ignored(text: &str) {
    let mut tracer = tracer();
    let generation = connect_open(&mut tracer, false);
    tracer.stats_entry(vec![json!(1)]);

    let effects = tracer.on_message(generation, text);

    assert!(effects.is_empty());
    assert_eq!(tracer.buffer().sequences(), vec![1]);
}

#[test]
fn message_from_replaced_connection_is_ignored() {
    let mut tracer = tracer();
    let old = connect_open(&mut tracer, false);
    tracer.stats_entry(vec![json!(1)]);
    connect_open(&mut tracer, false);

    tracer.on_message(old, &ServerMessage::watermark(1).to_json().unwrap());

    assert_eq!(tracer.buffer().sequences(), vec![1]);
}

#[test]
fn reconnect_after_failure_keeps_session_and_sequence() {
    let mut tracer = tracer();
    let generation = connect_open(&mut tracer, false);
    tracer.stats_entry(vec![json!(1)]);

    let effects = tracer.on_close(generation, ABNORMAL_CLOSURE_CODE, "lost");
    assert!(effects.iter().any(|e| matches!(e, Effect::ScheduleReconnect(_))));
    assert!(effects.contains(&Effect::NotifyClosed(CloseInfo {
        code: ABNORMAL_CLOSURE_CODE,
        reason: "lost".into()
    })));

    let effects = tracer.on_reconnect_timer();
    let request = opened(&effects).unwrap();
    assert_eq!(request.url, "ws://collector.test/room?statsSessionId=id-1");
    assert_eq!(tracer.attempts(), 1);

    tracer.on_open(tracer.generation());
    let effects = tracer.stats_entry(vec![json!(2)]);
    assert_eq!(sent(&effects)[0].sequence(), Some(2));
}

#[test]
fn continuation_records_parent_and_rewrites_buffer() {
    let mut tracer = tracer();
    tracer.identity(vec![json!("identity"), json!(null), json!({"name": "a"})]);
    tracer.stats_entry(vec![json!("getstats")]);

    let effects = tracer.connect(true);

    assert_eq!(tracer.parent_session_id(), Some("id-1"));
    assert_eq!(tracer.session_id(), "id-2");
    assert_eq!(opened(&effects).unwrap().url, "ws://collector.test/room?statsSessionId=id-2");
    assert!(tracer.buffer().replay_all().all(|e| e.session_id == "id-2"));

    let buffered_identity = tracer.buffer().replay_all().next().unwrap();
    assert_eq!(buffered_identity.payload.as_ref().unwrap()[2][PARENT_SESSION_FIELD], json!("id-1"));
}

#[test]
fn identity_after_continuation_carries_parent() {
    let mut tracer = tracer();
    connect_open(&mut tracer, true);

    let effects = tracer.identity(vec![json!("identity"), json!(null), json!({"name": "a"})]);

    let data = sent(&effects)[0].data.clone().unwrap();
    assert_eq!(data[2][PARENT_SESSION_FIELD], json!("id-1"));
}

#[test]
fn retry_after_continuation_rotates_again_but_keeps_parent() {
    let mut tracer = tracer();
    let generation = connect_open(&mut tracer, true);
    assert_eq!(tracer.session_id(), "id-2");

    tracer.on_close(generation, ABNORMAL_CLOSURE_CODE, "");
    tracer.on_reconnect_timer();

    assert_eq!(tracer.session_id(), "id-3");
    assert_eq!(tracer.parent_session_id(), Some("id-1"));
}

#[test]
fn close_sends_leave_code_and_never_retries() {
    let mut tracer = tracer();
    let generation = connect_open(&mut tracer, false);

    let effects = tracer.close();
    assert!(effects.contains(&Effect::Close { code: CONFERENCE_LEAVE_CODE, reason: String::new() }));

    let effects = tracer.on_close(generation, CONFERENCE_LEAVE_CODE, "");
    assert!(!effects.iter().any(|e| matches!(e, Effect::ScheduleReconnect(_))));
    assert!(tracer.is_closed());
    assert!(tracer.on_reconnect_timer().is_empty());
}

#[test]
fn connect_after_close_revives_tracer() {
    let mut tracer = tracer();
    let generation = connect_open(&mut tracer, false);
    tracer.close();
    tracer.on_close(generation, CONFERENCE_LEAVE_CODE, "");

    connect_open(&mut tracer, false);

    assert!(tracer.is_connected());
    assert!(!tracer.is_closed());
}

#[test]
fn gives_up_after_max_attempts() {
    let (mut tracer, _) = tracer_with(TracerConfig { max_reconnect_attempts: 3, ..config() });
    tracer.connect(false);

    let mut opens = 0;
    for _ in 0..10 {
        tracer.on_close(tracer.generation(), ABNORMAL_CLOSURE_CODE, "");
        if opened(&tracer.on_reconnect_timer()).is_some() {
            opens += 1;
        }
    }

    assert_eq!(opens, 2);
    assert!(tracer.is_closed());
}
