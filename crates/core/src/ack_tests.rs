// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use crate::delivery::{ChannelConfig, ConnectRequest};
use crate::event::{EventKind, Sequencer};
use crate::protocol::ABNORMAL_CLOSURE_CODE;
use serde_json::json;

fn buffer_with(count: usize) -> EventBuffer {
    let mut sequencer = Sequencer::new();
    let mut buffer = EventBuffer::new(10);
    for _ in 0..count {
        buffer.append(sequencer.stamp(EventKind::StatsEntry, "s1", Some(vec![json!("x")]), 5));
    }
    buffer
}

fn open_channel() -> DeliveryChannel {
    let mut channel = DeliveryChannel::new(ChannelConfig::default());
    let mut effects = Vec::new();
    channel.open(
        ConnectRequest { url: "ws://c/m?statsSessionId=s1".into(), protocol: "3.1_STANDARD".into() },
        &mut effects,
    );
    channel.on_open(channel.generation(), &mut effects);
    channel
}

fn sent_sequences(effects: &[Effect]) -> Vec<u64> {
    effects
        .iter()
        .filter_map(|effect| match effect {
            Effect::Send(msg) => msg.sequence(),
            _ => None,
        })
        .collect()
}

#[test]
fn bare_watermark_trims_without_replay() {
    let mut buffer = buffer_with(3);
    let mut channel = open_channel();
    let mut effects = Vec::new();

    let outcome = process_ack(
        Ack { watermark: 2, is_initial_resumption: false },
        &mut buffer,
        &mut channel,
        &mut effects,
    );

    assert_eq!(outcome, AckOutcome { trimmed: 2, replayed: 0 });
    assert_eq!(buffer.sequences(), vec![3]);
    assert!(effects.is_empty());
}

#[test]
fn initial_resumption_trims_resets_and_replays_remaining() {
    let mut buffer = buffer_with(3);
    let mut channel = open_channel();
    let mut effects = Vec::new();

    // One failed connection so there is an attempt to reset.
    channel.on_close(channel.generation(), ABNORMAL_CLOSURE_CODE, "", &mut effects);
    channel.on_reconnect_timer();
    channel.open(
        ConnectRequest { url: "ws://c/m?statsSessionId=s1".into(), protocol: "3.1_STANDARD".into() },
        &mut effects,
    );
    channel.on_open(channel.generation(), &mut effects);
    assert_eq!(channel.attempts(), 1);
    effects.clear();

    let ack = Ack::parse(r#"{"type":"sn","body":{"value":2,"state":"initial"}}"#).unwrap();
    let outcome = process_ack(ack, &mut buffer, &mut channel, &mut effects);

    assert_eq!(outcome, AckOutcome { trimmed: 2, replayed: 1 });
    assert_eq!(buffer.sequences(), vec![3]);
    assert_eq!(channel.attempts(), 0);
    assert_eq!(sent_sequences(&effects), vec![3]);
}

#[test]
fn replay_keeps_events_buffered() {
    let mut buffer = buffer_with(3);
    let mut channel = open_channel();
    let mut effects = Vec::new();

    process_ack(
        Ack { watermark: 0, is_initial_resumption: true },
        &mut buffer,
        &mut channel,
        &mut effects,
    );

    assert_eq!(sent_sequences(&effects), vec![1, 2, 3]);
    assert_eq!(buffer.len(), 3);
}

#[test]
fn non_initial_structured_state_does_not_replay() {
    let mut buffer = buffer_with(2);
    let mut channel = open_channel();
    let mut effects = Vec::new();

    let ack = Ack::parse(r#"{"type":"sn","body":{"value":1,"state":"running"}}"#).unwrap();
    let outcome = process_ack(ack, &mut buffer, &mut channel, &mut effects);

    assert_eq!(outcome.replayed, 0);
    assert_eq!(buffer.sequences(), vec![2]);
}

#[test]
fn watermark_beyond_buffer_empties_it() {
    let mut buffer = buffer_with(3);
    let mut channel = open_channel();
    let mut effects = Vec::new();

    process_ack(
        Ack { watermark: 99, is_initial_resumption: true },
        &mut buffer,
        &mut channel,
        &mut effects,
    );

    assert!(buffer.is_empty());
    assert!(sent_sequences(&effects).is_empty());
}
