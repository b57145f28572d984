// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! The tracing engine.
//!
//! [`Tracer`] composes the sequencer, buffer, session identity and delivery
//! channel behind the operations a producer and a transport runtime need.
//! Every operation returns the effects the runtime must execute.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::debug;

use crate::ack::process_ack;
use crate::backoff::Backoff;
use crate::buffer::{EventBuffer, DEFAULT_CAPACITY};
use crate::clock::ClockSource;
use crate::delivery::{
    ChannelConfig, ChannelState, ConnectRequest, DeliveryChannel, Effect,
    DEFAULT_KEEP_ALIVE_INTERVAL, MAX_RECONNECT_ATTEMPTS,
};
use crate::error::{Error, Result};
use crate::event::{EventKind, Sequencer};
use crate::protocol::{connection_url, protocol_version, Ack};
use crate::session::{IdGenerator, SessionIdentity};

/// Construction parameters for a [`Tracer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TracerConfig {
    /// Collector base URL, `ws://` or `wss://`.
    pub endpoint: String,
    pub meeting_id: String,
    pub use_legacy_protocol: bool,
    /// Zero disables keep-alives.
    pub keep_alive_interval: Duration,
    pub buffer_capacity: usize,
    pub max_reconnect_attempts: u32,
    pub backoff: Backoff,
}

impl TracerConfig {
    /// Creates a config with default tunables.
    pub fn new(endpoint: impl Into<String>, meeting_id: impl Into<String>) -> Self {
        TracerConfig {
            endpoint: endpoint.into(),
            meeting_id: meeting_id.into(),
            use_legacy_protocol: false,
            keep_alive_interval: DEFAULT_KEEP_ALIVE_INTERVAL,
            buffer_capacity: DEFAULT_CAPACITY,
            max_reconnect_attempts: MAX_RECONNECT_ATTEMPTS,
            backoff: Backoff::default(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.endpoint.is_empty() {
            return Err(Error::InvalidConfig("endpoint must not be empty".to_string()));
        }
        if !(self.endpoint.starts_with("ws://") || self.endpoint.starts_with("wss://")) {
            return Err(Error::InvalidConfig(format!(
                "endpoint '{}' must use ws:// or wss://",
                self.endpoint
            )));
        }
        if self.meeting_id.is_empty() {
            return Err(Error::InvalidConfig("meeting id must not be empty".to_string()));
        }
        Ok(())
    }

    fn channel_config(&self) -> ChannelConfig {
        ChannelConfig {
            max_reconnect_attempts: self.max_reconnect_attempts,
            keep_alive_interval: self.keep_alive_interval,
            backoff: self.backoff,
        }
    }
}

/// Sans-IO trace engine for a single telemetry stream.
pub struct Tracer {
    config: TracerConfig,
    clock: Arc<dyn ClockSource>,
    ids: Arc<dyn IdGenerator>,
    session: SessionIdentity,
    sequencer: Sequencer,
    buffer: EventBuffer,
    channel: DeliveryChannel,
}

impl Tracer {
    /// Creates a tracer with a freshly generated session id.
    pub fn new(
        config: TracerConfig,
        clock: Arc<dyn ClockSource>,
        ids: Arc<dyn IdGenerator>,
    ) -> Result<Self> {
        config.validate()?;
        let session = SessionIdentity::new(ids.generate());
        Ok(Tracer {
            buffer: EventBuffer::new(config.buffer_capacity),
            channel: DeliveryChannel::new(config.channel_config()),
            sequencer: Sequencer::new(),
            config,
            clock,
            ids,
            session,
        })
    }

    pub fn config(&self) -> &TracerConfig {
        &self.config
    }

    pub fn session_id(&self) -> &str {
        self.session.current_id()
    }

    pub fn parent_session_id(&self) -> Option<&str> {
        self.session.parent_id()
    }

    pub fn buffer(&self) -> &EventBuffer {
        &self.buffer
    }

    pub fn channel_state(&self) -> ChannelState {
        self.channel.state()
    }

    pub fn attempts(&self) -> u32 {
        self.channel.attempts()
    }

    /// Generation of the most recent connection attempt.
    pub fn generation(&self) -> u64 {
        self.channel.generation()
    }

    /// Sequence number the next event will receive.
    pub fn next_sequence(&self) -> u64 {
        self.sequencer.peek()
    }

    pub fn is_connected(&self) -> bool {
        self.channel.is_open()
    }

    pub fn is_closed(&self) -> bool {
        self.channel.is_closed()
    }

    /// Records an identity event, linking it to the parent session if any.
    pub fn identity(&mut self, mut payload: Vec<Value>) -> Vec<Effect> {
        self.session.link_identity(&mut payload);
        self.record(EventKind::Identity, Some(payload))
    }

    /// Records a stats entry. The payload is expected to be scrubbed already.
    pub fn stats_entry(&mut self, payload: Vec<Value>) -> Vec<Effect> {
        self.record(EventKind::StatsEntry, Some(payload))
    }

    pub fn keep_alive(&mut self) -> Vec<Effect> {
        self.record(EventKind::Keepalive, None)
    }

    /// Starts a new connection cycle.
    ///
    /// Resets reconnect bookkeeping, runs the continuity step and replaces any
    /// existing connection.
    pub fn connect(&mut self, is_continuation: bool) -> Vec<Effect> {
        let mut effects = Vec::new();
        self.channel.restart(is_continuation, &mut effects);
        self.open_connection(&mut effects);
        effects
    }

    /// Intentionally closes the connection. No reconnect follows.
    pub fn close(&mut self) -> Vec<Effect> {
        let mut effects = Vec::new();
        self.channel.close(&mut effects);
        effects
    }

    pub fn on_open(&mut self, generation: u64) -> Vec<Effect> {
        let mut effects = Vec::new();
        self.channel.on_open(generation, &mut effects);
        effects
    }

    pub fn on_close(&mut self, generation: u64, code: u16, reason: &str) -> Vec<Effect> {
        let mut effects = Vec::new();
        self.channel.on_close(generation, code, reason, &mut effects);
        effects
    }

    /// Handles an inbound text frame. Anything but a well-formed `sn` report
    /// is logged and ignored.
    pub fn on_message(&mut self, generation: u64, text: &str) -> Vec<Effect> {
        let mut effects = Vec::new();
        if generation != self.channel.generation() {
            debug!(generation, "ignoring message from replaced connection");
            return effects;
        }

        match Ack::parse(text) {
            Ok(ack) => {
                process_ack(ack, &mut self.buffer, &mut self.channel, &mut effects);
            }
            Err(Error::UnsupportedMessage(kind)) => debug!(%kind, "ignoring unsupported message"),
            Err(e) => debug!(error = %e, "ignoring malformed message"),
        }
        effects
    }

    /// Handles the reconnect timer firing.
    pub fn on_reconnect_timer(&mut self) -> Vec<Effect> {
        let mut effects = Vec::new();
        if self.channel.on_reconnect_timer() {
            self.open_connection(&mut effects);
        }
        effects
    }

    fn open_connection(&mut self, effects: &mut Vec<Effect>) {
        self.session.begin_continuity_transition(
            self.channel.is_continuation(),
            self.ids.as_ref(),
            &mut self.buffer,
        );

        let request = ConnectRequest {
            url: connection_url(
                &self.config.endpoint,
                &self.config.meeting_id,
                self.session.current_id(),
            ),
            protocol: protocol_version(self.config.use_legacy_protocol),
        };
        self.channel.open(request, effects);
    }

    fn record(&mut self, kind: EventKind, payload: Option<Vec<Value>>) -> Vec<Effect> {
        let mut effects = Vec::new();
        let event =
            self.sequencer.stamp(kind, self.session.current_id(), payload, self.clock.now_ms());
        self.channel.transmit(&event, &mut effects);

        let sequence = event.sequence;
        if !self.buffer.append(event) {
            debug!(sequence, %kind, capacity = self.buffer.capacity(), "buffer full, event not retained");
        }
        effects
    }
}

#[cfg(test)]
#[path = "tracer_tests.rs"]
mod tests;
