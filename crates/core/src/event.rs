// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Telemetry events and sequence numbering.
//!
//! Every event carries a sequence number assigned at creation. Sequence
//! numbers are strictly increasing for the lifetime of a trace and are never
//! reset on reconnect, which is what lets the collector report a single
//! watermark covering everything it has durably received.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::protocol::ClientMessage;

/// The kind of a telemetry event, as named on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventKind {
    Identity,
    StatsEntry,
    Keepalive,
}

impl EventKind {
    /// Returns the wire name of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Identity => "identity",
            EventKind::StatsEntry => "stats-entry",
            EventKind::Keepalive => "keepalive",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One telemetry record awaiting delivery.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub kind: EventKind,
    /// Session the event is attributed to. Rewritten in place while the event
    /// is buffered if the session identity rotates.
    pub session_id: String,
    /// Ordered payload values; `None` for keep-alives.
    pub payload: Option<Vec<Value>>,
    /// Wall clock milliseconds at creation.
    pub timestamp: u64,
    pub sequence: u64,
}

impl Event {
    /// Creates a new event. Prefer [`Sequencer::stamp`], which assigns the
    /// sequence number.
    pub fn new(
        kind: EventKind,
        session_id: impl Into<String>,
        payload: Option<Vec<Value>>,
        timestamp: u64,
        sequence: u64,
    ) -> Self {
        Event { kind, session_id: session_id.into(), payload, timestamp, sequence }
    }

    /// Builds the outbound wire message for this event.
    ///
    /// Identity and stats-entry payloads are sent inline with
    /// `[timestamp, sequence]` appended; keep-alives carry no data.
    pub fn to_wire(&self) -> ClientMessage {
        let data = match self.kind {
            EventKind::Keepalive => None,
            EventKind::Identity | EventKind::StatsEntry => {
                let mut data = self.payload.clone().unwrap_or_default();
                data.push(Value::from(self.timestamp));
                data.push(Value::from(self.sequence));
                Some(data)
            }
        };

        ClientMessage { stats_session_id: self.session_id.clone(), kind: self.kind, data }
    }
}

/// Assigns strictly increasing sequence numbers, starting at 1.
#[derive(Debug)]
pub struct Sequencer {
    next: u64,
}

impl Sequencer {
    pub fn new() -> Self {
        Sequencer { next: 1 }
    }

    /// Returns the sequence number the next event will receive.
    pub fn peek(&self) -> u64 {
        self.next
    }

    /// Creates an event stamped with the next sequence number.
    pub fn stamp(
        &mut self,
        kind: EventKind,
        session_id: &str,
        payload: Option<Vec<Value>>,
        timestamp: u64,
    ) -> Event {
        let sequence = self.next;
        self.next += 1;
        Event::new(kind, session_id, payload, timestamp, sequence)
    }
}

impl Default for Sequencer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
