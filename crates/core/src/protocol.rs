// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! WebSocket protocol messages exchanged with the collector.
//!
//! The protocol is simple:
//! - Client sends `identity`, `stats-entry` and `keepalive` messages
//! - Server reports the highest sequence number it has durably received
//!   (`sn` messages), either as a bare integer or as `{value, state}`

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::event::EventKind;

/// Protocol iteration negotiated during the handshake.
pub const PROTOCOL_ITERATION: &str = "3.1";

/// Close code a client uses to signal an intentional leave. Suppresses
/// reconnection.
pub const CONFERENCE_LEAVE_CODE: u16 = 3001;

/// Normal closure, used when a connection is replaced by a new one.
pub const NORMAL_CLOSURE_CODE: u16 = 1000;

/// Reported when a connection drops without a close frame or fails to open.
pub const ABNORMAL_CLOSURE_CODE: u16 = 1006;

/// Wire tag of sequence-number acknowledgments.
pub const SEQUENCE_NUMBER_TYPE: &str = "sn";

/// Builds the sub-protocol token sent during the handshake.
pub fn protocol_version(use_legacy: bool) -> String {
    if use_legacy {
        format!("{PROTOCOL_ITERATION}_LEGACY")
    } else {
        format!("{PROTOCOL_ITERATION}_STANDARD")
    }
}

/// Builds the connection URL: `<endpoint>/<meeting_id>?statsSessionId=<id>`.
pub fn connection_url(endpoint: &str, meeting_id: &str, session_id: &str) -> String {
    format!("{}/{}?statsSessionId={}", endpoint.trim_end_matches('/'), meeting_id, session_id)
}

/// Message sent from client to collector.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClientMessage {
    #[serde(rename = "statsSessionId")]
    pub stats_session_id: String,
    #[serde(rename = "type")]
    pub kind: EventKind,
    /// Payload followed by `[timestamp, sequence]`; absent for keep-alives.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<Value>>,
}

impl ClientMessage {
    /// Returns the sequence number carried in the trailing data element.
    pub fn sequence(&self) -> Option<u64> {
        self.data.as_ref()?.last()?.as_u64()
    }

    /// Serializes the message to JSON.
    pub fn to_json(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserializes the message from JSON.
    pub fn from_json(s: &str) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

/// Body of an `sn` message, in either of the shapes collectors send.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum AckBody {
    /// Bare watermark.
    Watermark(u64),
    /// Watermark with resumption state.
    Structured {
        value: u64,
        #[serde(default)]
        state: String,
    },
}

/// Message sent from collector to client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerMessage {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub body: Value,
}

impl ServerMessage {
    /// Creates a bare-integer `sn` message.
    pub fn watermark(value: u64) -> Self {
        ServerMessage { kind: SEQUENCE_NUMBER_TYPE.to_string(), body: Value::from(value) }
    }

    /// Creates a structured `sn` message.
    pub fn resumption(value: u64, state: impl Into<String>) -> Self {
        let state: String = state.into();
        ServerMessage {
            kind: SEQUENCE_NUMBER_TYPE.to_string(),
            body: serde_json::json!({ "value": value, "state": state }),
        }
    }

    /// Serializes the message to JSON.
    pub fn to_json(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserializes the message from JSON.
    pub fn from_json(s: &str) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

/// Normalized acknowledgment handed to the acknowledgment processor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ack {
    /// Highest sequence number the collector has durably received.
    pub watermark: u64,
    /// True when the collector has just resumed this session and is reporting
    /// its watermark for the first time since the connection opened.
    pub is_initial_resumption: bool,
}

impl Ack {
    /// Parses an inbound text frame into an acknowledgment.
    ///
    /// Returns `UnsupportedMessage` for well-formed messages of other types
    /// and `MalformedAck` for `sn` messages whose body has neither shape.
    pub fn parse(text: &str) -> Result<Ack> {
        let msg = ServerMessage::from_json(text)?;
        Ack::try_from(msg)
    }
}

impl TryFrom<ServerMessage> for Ack {
    type Error = Error;

    fn try_from(msg: ServerMessage) -> Result<Ack> {
        if msg.kind != SEQUENCE_NUMBER_TYPE {
            return Err(Error::UnsupportedMessage(msg.kind));
        }

        let body: AckBody = serde_json::from_value(msg.body.clone())
            .map_err(|_| Error::MalformedAck(msg.body.to_string()))?;

        Ok(match body {
            AckBody::Watermark(watermark) => Ack { watermark, is_initial_resumption: false },
            AckBody::Structured { value, state } => {
                Ack { watermark: value, is_initial_resumption: state == "initial" }
            }
        })
    }
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;
